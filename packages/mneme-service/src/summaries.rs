use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{MemoryService, Result};
use mneme_storage::{models::Summary, summaries};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryItem {
	pub summary_id: Uuid,
	pub content: String,
	pub metadata: Map<String, Value>,
	pub summary_point_id: Uuid,
	#[serde(with = "crate::timestamp")]
	pub created_at: OffsetDateTime,
}
impl From<Summary> for SummaryItem {
	fn from(summary: Summary) -> Self {
		Self {
			summary_id: summary.summary_id,
			content: summary.content,
			metadata: summary.metadata,
			summary_point_id: summary.summary_point_id,
			created_at: summary.created_at,
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListSummariesRequest {
	pub session_id: String,
	pub page_number: u32,
	pub page_size: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryListResponse {
	pub summaries: Vec<SummaryItem>,
	pub total_count: i64,
	pub total_pages: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateSummaryMetadataRequest {
	pub session_id: String,
	pub summary_id: Uuid,
	/// Replaces the stored metadata wholesale.
	pub metadata: Map<String, Value>,
}

impl MemoryService {
	pub async fn current_summary(&self, session_id: &str) -> Result<Option<SummaryItem>> {
		let summary = summaries::get_summary(&self.db.pool, session_id).await?;

		Ok(summary.map(SummaryItem::from))
	}

	pub async fn summary_by_id(&self, session_id: &str, summary_id: Uuid) -> Result<SummaryItem> {
		let summary = summaries::get_summary_by_uuid(&self.db.pool, session_id, summary_id).await?;

		Ok(summary.into())
	}

	pub async fn list_summaries(&self, req: ListSummariesRequest) -> Result<SummaryListResponse> {
		self.check_page_size(req.page_size)?;

		let page =
			summaries::get_summary_list(&self.db, &req.session_id, req.page_number, req.page_size)
				.await?;

		Ok(SummaryListResponse {
			total_pages: crate::total_pages(page.total_count, req.page_size),
			total_count: page.total_count,
			summaries: page.items.into_iter().map(SummaryItem::from).collect(),
		})
	}

	pub async fn update_summary_metadata(
		&self,
		req: UpdateSummaryMetadataRequest,
	) -> Result<SummaryItem> {
		let mut tx = self.db.pool.begin().await.map_err(mneme_storage::Error::from)?;
		let mut summary =
			summaries::get_summary_by_uuid(&mut *tx, &req.session_id, req.summary_id).await?;

		summary.metadata = req.metadata;

		let updated = summaries::update_summary_metadata(&mut *tx, &summary).await?;

		tx.commit().await.map_err(mneme_storage::Error::from)?;

		tracing::info!(
			session_id = %req.session_id,
			summary_id = %req.summary_id,
			"Updated summary metadata."
		);

		Ok(updated.into())
	}

	pub async fn delete_summary(&self, session_id: &str, summary_id: Uuid) -> Result<()> {
		summaries::delete_summary(&self.db.pool, session_id, summary_id).await?;

		tracing::info!(session_id, %summary_id, "Deleted summary.");

		Ok(())
	}
}
