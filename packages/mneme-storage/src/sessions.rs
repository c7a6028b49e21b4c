use sqlx::{PgExecutor, types::Json};
use time::OffsetDateTime;

use crate::{
	Error, Result,
	db::Db,
	models::{Metadata, Session},
	validate,
};

pub async fn create_session<'e, E>(
	executor: E,
	session_id: &str,
	metadata: &Metadata,
) -> Result<Session>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;

	sqlx::query_as::<_, Session>(
		"\
INSERT INTO sessions (session_id, metadata)
VALUES ($1, $2)
RETURNING session_id, metadata, created_at, updated_at, deleted_at",
	)
	.bind(session_id)
	.bind(Json(metadata))
	.fetch_one(executor)
	.await
	.map_err(Error::storage("Failed to create session."))
}

pub async fn get_session<'e, E>(executor: E, session_id: &str) -> Result<Option<Session>>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;

	sqlx::query_as::<_, Session>(
		"\
SELECT session_id, metadata, created_at, updated_at, deleted_at
FROM sessions
WHERE session_id = $1 AND deleted_at IS NULL",
	)
	.bind(session_id)
	.fetch_optional(executor)
	.await
	.map_err(Error::storage("Failed to get session."))
}

/// Soft-deletes the session together with its messages and summaries.
pub async fn delete_session(db: &Db, session_id: &str) -> Result<()> {
	let session_id = validate::session_id(session_id)?;
	let now = OffsetDateTime::now_utc();
	let mut tx = db.pool.begin().await?;
	let deleted = sqlx::query(
		"UPDATE sessions SET deleted_at = $1, updated_at = $1 WHERE session_id = $2 AND deleted_at IS NULL",
	)
	.bind(now)
	.bind(session_id)
	.execute(&mut *tx)
	.await
	.map_err(Error::storage("Failed to delete session."))?;

	if deleted.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Session {session_id:?} not found.")));
	}

	for (table, message) in [
		("messages", "Failed to delete session messages."),
		("summaries", "Failed to delete session summaries."),
	] {
		sqlx::query(&format!(
			"UPDATE {table} SET deleted_at = $1 WHERE session_id = $2 AND deleted_at IS NULL"
		))
		.bind(now)
		.bind(session_id)
		.execute(&mut *tx)
		.await
		.map_err(Error::storage(message))?;
	}

	tx.commit().await?;

	Ok(())
}

/// Registers the session when it is not known yet. A soft-deleted session stays deleted.
pub(crate) async fn ensure_session<'e, E>(executor: E, session_id: &str) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("INSERT INTO sessions (session_id) VALUES ($1) ON CONFLICT (session_id) DO NOTHING")
		.bind(session_id)
		.execute(executor)
		.await
		.map_err(Error::storage("Failed to register session."))?;

	Ok(())
}
