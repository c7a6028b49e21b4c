use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, MemoryService, MessageItem, Result, SummaryItem};
use mneme_storage::{
	messages,
	models::{NewSummary, TextEmbedding},
	summaries, summary_embeddings,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummarizeRequest {
	pub session_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
	/// `None` when too few new messages have arrived since the current summary.
	pub summary: Option<SummaryItem>,
	pub embedded: bool,
}

impl MemoryService {
	/// Folds the messages after the current summary point into a new summary.
	///
	/// The new summary becomes current immediately. Its vector is written afterwards; when that
	/// step fails the summary stays and [`MemoryService::embed_pending_summary`] can finish it.
	pub async fn summarize(&self, req: SummarizeRequest) -> Result<SummarizeResponse> {
		let session_id = req.session_id.as_str();
		let previous = summaries::get_summary(&self.db.pool, session_id).await?;
		let window = messages::get_messages_after(
			&self.db,
			session_id,
			previous.as_ref().map(|summary| summary.summary_point_id),
			self.cfg.memory.summary_window,
		)
		.await?;

		let pending = window.len();
		let Some(summary_point_id) = window.last().map(|message| message.message_id) else {
			tracing::debug!(session_id, "No new messages to summarize.");

			return Ok(SummarizeResponse { summary: None, embedded: false });
		};

		if pending < self.cfg.memory.min_messages_to_summarize as usize {
			tracing::debug!(session_id, pending, "Not enough messages to summarize.");

			return Ok(SummarizeResponse { summary: None, embedded: false });
		}

		let items = window.into_iter().map(MessageItem::from).collect::<Vec<_>>();
		let content = self
			.providers
			.summarizer
			.summarize(previous.as_ref().map(|summary| summary.content.as_str()), &items)
			.await?;
		let content = content.trim();

		if content.is_empty() {
			return Err(Error::Provider {
				message: "Summarizer returned empty content.".to_string(),
			});
		}

		let mut metadata = Map::new();

		metadata.insert("message_count".to_string(), Value::from(items.len()));

		if let Some(previous) = previous.as_ref() {
			metadata.insert(
				"previous_summary_id".to_string(),
				Value::String(previous.summary_id.to_string()),
			);
		}

		let summary = summaries::put_summary(
			&self.db.pool,
			session_id,
			&NewSummary { content: content.to_string(), metadata, summary_point_id },
		)
		.await?;

		tracing::info!(
			session_id,
			summary_id = %summary.summary_id,
			message_count = items.len(),
			"Stored summary."
		);

		self.embed_summary(session_id, summary.summary_id, &summary.content).await.inspect_err(
			|err| {
				tracing::warn!(
					session_id,
					summary_id = %summary.summary_id,
					error = %err,
					"Summary stored without embedding."
				);
			},
		)?;

		Ok(SummarizeResponse { summary: Some(summary.into()), embedded: true })
	}

	/// Embeds the current summary if its vector is missing. Returns whether a vector was written.
	pub async fn embed_pending_summary(&self, session_id: &str) -> Result<bool> {
		let Some(summary) = summaries::get_summary(&self.db.pool, session_id).await? else {
			return Ok(false);
		};

		if summary_embeddings::is_summary_embedded(&self.db.pool, summary.summary_id).await? {
			return Ok(false);
		}

		self.embed_summary(session_id, summary.summary_id, &summary.content).await?;

		tracing::info!(session_id, summary_id = %summary.summary_id, "Embedded pending summary.");

		Ok(true)
	}

	async fn embed_summary(
		&self,
		session_id: &str,
		summary_id: Uuid,
		content: &str,
	) -> Result<()> {
		let mut vectors = self.embed_texts(&[content.to_string()]).await?;
		let Some(embedding) = vectors.pop() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vector.".to_string(),
			});
		};

		summary_embeddings::put_summary_embeddings(
			&self.db.pool,
			session_id,
			&[TextEmbedding { text_id: summary_id, embedding }],
		)
		.await?;

		Ok(())
	}
}
