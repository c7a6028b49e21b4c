use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, MemoryService, Result};
use mneme_storage::{
	message_embeddings,
	models::{EmbeddedText, TextEmbedding},
	summary_embeddings,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingInput {
	pub text_id: Uuid,
	pub embedding: Vec<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PutEmbeddingsRequest {
	pub session_id: String,
	/// A missing batch is a malformed request; an empty one is rejected as an empty batch.
	pub embeddings: Option<Vec<EmbeddingInput>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingItem {
	pub text_id: Uuid,
	pub text: String,
	pub embedding: Vec<f32>,
}
impl From<EmbeddedText> for EmbeddingItem {
	fn from(row: EmbeddedText) -> Self {
		Self { text_id: row.text_id, text: row.text, embedding: row.embedding }
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
	pub embeddings: Vec<EmbeddingItem>,
}

impl MemoryService {
	/// Stores caller-computed message vectors. The whole batch lands or none of it does.
	pub async fn put_message_embeddings(&self, req: PutEmbeddingsRequest) -> Result<()> {
		let rows = embedding_rows(req.embeddings)?;

		message_embeddings::put_message_embeddings(&self.db.pool, &req.session_id, &rows).await?;

		tracing::info!(session_id = %req.session_id, count = rows.len(), "Stored message vectors.");

		Ok(())
	}

	pub async fn put_summary_embeddings(&self, req: PutEmbeddingsRequest) -> Result<()> {
		let rows = embedding_rows(req.embeddings)?;

		summary_embeddings::put_summary_embeddings(&self.db.pool, &req.session_id, &rows).await?;

		tracing::info!(session_id = %req.session_id, count = rows.len(), "Stored summary vectors.");

		Ok(())
	}

	pub async fn message_embeddings(&self, session_id: &str) -> Result<EmbeddingsResponse> {
		let rows = message_embeddings::get_message_embeddings(&self.db.pool, session_id).await?;

		Ok(EmbeddingsResponse { embeddings: rows.into_iter().map(EmbeddingItem::from).collect() })
	}

	pub async fn summary_embeddings(&self, session_id: &str) -> Result<EmbeddingsResponse> {
		let rows = summary_embeddings::get_summary_embeddings(&self.db.pool, session_id).await?;

		Ok(EmbeddingsResponse { embeddings: rows.into_iter().map(EmbeddingItem::from).collect() })
	}
}

fn embedding_rows(embeddings: Option<Vec<EmbeddingInput>>) -> Result<Vec<TextEmbedding>> {
	let Some(embeddings) = embeddings else {
		return Err(Error::InvalidRequest { message: "embeddings are required.".to_string() });
	};

	Ok(embeddings
		.into_iter()
		.map(|input| TextEmbedding { text_id: input.text_id, embedding: input.embedding })
		.collect())
}
