use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, MemoryService, Result, SummaryItem};
use mneme_storage::{
	message_embeddings, messages,
	models::{Message, NewMessage, TextEmbedding},
	summaries,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageInput {
	pub role: String,
	pub content: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageItem {
	pub message_id: Uuid,
	pub role: String,
	pub content: String,
	pub metadata: Map<String, Value>,
	#[serde(with = "crate::timestamp")]
	pub created_at: OffsetDateTime,
}
impl From<Message> for MessageItem {
	fn from(message: Message) -> Self {
		Self {
			message_id: message.message_id,
			role: message.role,
			content: message.content,
			metadata: message.metadata,
			created_at: message.created_at,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddMessagesRequest {
	pub session_id: String,
	pub messages: Vec<MessageInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddMessagesResponse {
	pub messages: Vec<MessageItem>,
	/// Messages whose vectors were stored during this call.
	pub embedded: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetMemoryRequest {
	pub session_id: String,
	/// Defaults to `memory.message_window`.
	pub last_n: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryResponse {
	pub summary: Option<SummaryItem>,
	/// Messages newer than the summary point, oldest first.
	pub messages: Vec<MessageItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListMessagesRequest {
	pub session_id: String,
	pub page_number: u32,
	pub page_size: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageListResponse {
	pub messages: Vec<MessageItem>,
	pub total_count: i64,
	pub total_pages: i64,
}

impl MemoryService {
	/// Appends messages and, when `memory.embed_on_write` is set, embeds them right away.
	///
	/// Messages are committed before embedding starts. If embedding fails they stay in the log
	/// without vectors and [`MemoryService::embed_pending_messages`] picks them up later.
	pub async fn add_messages(&self, req: AddMessagesRequest) -> Result<AddMessagesResponse> {
		let batch = req
			.messages
			.into_iter()
			.map(|input| NewMessage {
				role: input.role,
				content: input.content,
				metadata: input.metadata,
			})
			.collect::<Vec<_>>();
		let stored = messages::put_messages(&self.db, &req.session_id, &batch).await?;

		tracing::info!(session_id = %req.session_id, count = stored.len(), "Stored messages.");

		let embedded = if self.cfg.memory.embed_on_write {
			self.embed_messages(&req.session_id, &stored).await.inspect_err(|err| {
				tracing::warn!(
					session_id = %req.session_id,
					error = %err,
					"Messages stored without embeddings."
				);
			})?
		} else {
			0
		};

		Ok(AddMessagesResponse {
			messages: stored.into_iter().map(MessageItem::from).collect(),
			embedded,
		})
	}

	/// Embeds up to `memory.embedding_batch_size` messages that have no vector yet.
	pub async fn embed_pending_messages(&self, session_id: &str) -> Result<usize> {
		let pending = messages::get_unembedded_messages(
			&self.db.pool,
			session_id,
			self.cfg.memory.embedding_batch_size,
		)
		.await?;

		if pending.is_empty() {
			tracing::debug!(session_id, "No messages awaiting embeddings.");

			return Ok(0);
		}

		let embedded = self.embed_messages(session_id, &pending).await?;

		tracing::info!(session_id, count = embedded, "Embedded pending messages.");

		Ok(embedded)
	}

	/// The current summary plus the newest messages it does not cover yet.
	pub async fn get_memory(&self, req: GetMemoryRequest) -> Result<MemoryResponse> {
		let last_n = req.last_n.unwrap_or(self.cfg.memory.message_window);

		if last_n == 0 {
			return Err(Error::InvalidRequest {
				message: "last_n must be 1 or greater.".to_string(),
			});
		}

		let summary = summaries::get_summary(&self.db.pool, &req.session_id).await?;
		let recent = messages::get_messages(&self.db.pool, &req.session_id, last_n).await?;

		Ok(MemoryResponse {
			summary: summary.map(SummaryItem::from),
			messages: recent.into_iter().map(MessageItem::from).collect(),
		})
	}

	pub async fn list_messages(&self, req: ListMessagesRequest) -> Result<MessageListResponse> {
		self.check_page_size(req.page_size)?;

		let page =
			messages::get_message_list(&self.db, &req.session_id, req.page_number, req.page_size)
				.await?;

		Ok(MessageListResponse {
			total_pages: crate::total_pages(page.total_count, req.page_size),
			total_count: page.total_count,
			messages: page.items.into_iter().map(MessageItem::from).collect(),
		})
	}

	pub async fn delete_message(&self, session_id: &str, message_id: Uuid) -> Result<()> {
		messages::delete_message(&self.db.pool, session_id, message_id).await?;

		tracing::info!(session_id, %message_id, "Deleted message.");

		Ok(())
	}

	pub async fn delete_session(&self, session_id: &str) -> Result<()> {
		mneme_storage::sessions::delete_session(&self.db, session_id).await?;

		tracing::info!(session_id, "Deleted session.");

		Ok(())
	}

	async fn embed_messages(&self, session_id: &str, batch: &[Message]) -> Result<usize> {
		let chunk_size = self.cfg.memory.embedding_batch_size.max(1) as usize;
		let mut embedded = 0;

		for chunk in batch.chunks(chunk_size) {
			let texts = chunk.iter().map(|message| message.content.clone()).collect::<Vec<_>>();
			let vectors = self.embed_texts(&texts).await?;
			let rows = chunk
				.iter()
				.zip(vectors)
				.map(|(message, embedding)| TextEmbedding { text_id: message.message_id, embedding })
				.collect::<Vec<_>>();

			message_embeddings::put_message_embeddings(&self.db.pool, session_id, &rows).await?;

			embedded += rows.len();
		}

		Ok(embedded)
	}
}
