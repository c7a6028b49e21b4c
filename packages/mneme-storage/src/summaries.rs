use sqlx::{PgExecutor, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{NewSummary, Page, Summary},
	validate,
};

/// Appends a summary. Earlier summaries are left untouched; which one is current is decided at
/// read time by recency.
///
/// The summary point must be a message of the same session. A point from another session, or one
/// that does not exist, inserts nothing and is reported as a storage error.
pub async fn put_summary<'e, E>(executor: E, session_id: &str, summary: &NewSummary) -> Result<Summary>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;

	sqlx::query_as::<_, Summary>(
		"\
INSERT INTO summaries (summary_id, session_id, content, metadata, summary_point_id)
SELECT $1, $2, $3, $4, m.message_id
FROM messages m
WHERE m.message_id = $5 AND m.session_id = $2
RETURNING summary_id, seq, session_id, content, metadata, summary_point_id, created_at, deleted_at",
	)
	.bind(Uuid::new_v4())
	.bind(session_id)
	.bind(summary.content.as_str())
	.bind(Json(&summary.metadata))
	.bind(summary.summary_point_id)
	.fetch_optional(executor)
	.await
	.map_err(Error::storage("Failed to insert summary."))?
	.ok_or_else(|| Error::Storage {
		message: format!(
			"Failed to insert summary: summary point {} is not a message of this session.",
			summary.summary_point_id
		),
		source: None,
	})
}

/// The newest active summary, or `None` when the session has none.
pub async fn get_summary<'e, E>(executor: E, session_id: &str) -> Result<Option<Summary>>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;

	sqlx::query_as::<_, Summary>(
		"\
SELECT summary_id, seq, session_id, content, metadata, summary_point_id, created_at, deleted_at
FROM summaries
WHERE session_id = $1 AND deleted_at IS NULL
ORDER BY created_at DESC, seq DESC
LIMIT 1",
	)
	.bind(session_id)
	.fetch_optional(executor)
	.await
	.map_err(Error::storage("Failed to get summary."))
}

pub async fn get_summary_by_uuid<'e, E>(
	executor: E,
	session_id: &str,
	summary_id: Uuid,
) -> Result<Summary>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;

	sqlx::query_as::<_, Summary>(
		"\
SELECT summary_id, seq, session_id, content, metadata, summary_point_id, created_at, deleted_at
FROM summaries
WHERE session_id = $1 AND summary_id = $2 AND deleted_at IS NULL",
	)
	.bind(session_id)
	.bind(summary_id)
	.fetch_optional(executor)
	.await
	.map_err(Error::storage("Failed to get summary by uuid."))?
	.ok_or_else(|| Error::NotFound(format!("Summary {summary_id} not found.")))
}

/// Pages through active summaries oldest first. New summaries only ever extend the last page.
pub async fn get_summary_list(
	db: &Db,
	session_id: &str,
	page_number: u32,
	page_size: u32,
) -> Result<Page<Summary>> {
	let session_id = validate::session_id(session_id)?;
	let (limit, offset) = validate::page_window(page_number, page_size)?;
	let mut tx = db.pool.begin().await?;

	sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
		.execute(&mut *tx)
		.await?;

	let total_count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM summaries WHERE session_id = $1 AND deleted_at IS NULL",
	)
	.bind(session_id)
	.fetch_one(&mut *tx)
	.await
	.map_err(Error::storage("Failed to count summaries."))?;
	let items = sqlx::query_as::<_, Summary>(
		"\
SELECT summary_id, seq, session_id, content, metadata, summary_point_id, created_at, deleted_at
FROM summaries
WHERE session_id = $1 AND deleted_at IS NULL
ORDER BY created_at ASC, seq ASC
LIMIT $2 OFFSET $3",
	)
	.bind(session_id)
	.bind(limit)
	.bind(offset)
	.fetch_all(&mut *tx)
	.await
	.map_err(Error::storage("Failed to get summary list."))?;

	tx.commit().await?;

	Ok(Page { items, total_count })
}

/// Replaces the metadata of an active summary. Nothing else about a summary is mutable.
pub async fn update_summary_metadata<'e, E>(executor: E, summary: &Summary) -> Result<Summary>
where
	E: PgExecutor<'e>,
{
	sqlx::query_as::<_, Summary>(
		"\
UPDATE summaries
SET metadata = $1
WHERE summary_id = $2 AND deleted_at IS NULL
RETURNING summary_id, seq, session_id, content, metadata, summary_point_id, created_at, deleted_at",
	)
	.bind(Json(&summary.metadata))
	.bind(summary.summary_id)
	.fetch_optional(executor)
	.await
	.map_err(Error::storage("Failed to update summary metadata."))?
	.ok_or_else(|| Error::NotFound(format!("Summary {} not found.", summary.summary_id)))
}

pub async fn delete_summary<'e, E>(executor: E, session_id: &str, summary_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;
	let result = sqlx::query(
		"\
UPDATE summaries
SET deleted_at = $1
WHERE session_id = $2 AND summary_id = $3 AND deleted_at IS NULL",
	)
	.bind(OffsetDateTime::now_utc())
	.bind(session_id)
	.bind(summary_id)
	.execute(executor)
	.await
	.map_err(Error::storage("Failed to delete summary."))?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Summary {summary_id} not found.")));
	}

	Ok(())
}
