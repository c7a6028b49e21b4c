use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Session {
	pub session_id: String,
	#[sqlx(json)]
	pub metadata: Metadata,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Message {
	pub message_id: Uuid,
	pub seq: i64,
	pub session_id: String,
	pub role: String,
	pub content: String,
	#[sqlx(json)]
	pub metadata: Metadata,
	pub created_at: OffsetDateTime,
	pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct NewMessage {
	pub role: String,
	pub content: String,
	pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Summary {
	pub summary_id: Uuid,
	pub seq: i64,
	pub session_id: String,
	pub content: String,
	#[sqlx(json)]
	pub metadata: Metadata,
	pub summary_point_id: Uuid,
	pub created_at: OffsetDateTime,
	pub deleted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewSummary {
	pub content: String,
	pub metadata: Metadata,
	/// Last message, inclusive, that this summary accounts for.
	pub summary_point_id: Uuid,
}

/// A vector to persist for the message or summary identified by `text_id`.
#[derive(Debug, Clone)]
pub struct TextEmbedding {
	pub text_id: Uuid,
	pub embedding: Vec<f32>,
}

/// A stored vector joined back to the text it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedText {
	pub text_id: Uuid,
	pub text: String,
	pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
	pub items: Vec<T>,
	/// Active rows across every page.
	pub total_count: i64,
}
