use sqlx::{PgExecutor, Postgres, QueryBuilder, types::Json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{Message, NewMessage, Page},
	sessions, validate,
};

/// Largest batch accepted by a single multi-row insert. Keeps the statement well under the
/// Postgres bind parameter limit.
pub const MAX_BATCH_ROWS: usize = 4_096;

/// Appends messages to the session log and returns them in input order. Unknown sessions are
/// registered on the fly.
pub async fn put_messages(
	db: &Db,
	session_id: &str,
	messages: &[NewMessage],
) -> Result<Vec<Message>> {
	let session_id = validate::session_id(session_id)?;

	if messages.is_empty() {
		return Err(Error::EmptyBatch("no messages received.".to_string()));
	}
	if messages.len() > MAX_BATCH_ROWS {
		return Err(Error::InvalidArgument(format!(
			"at most {MAX_BATCH_ROWS} messages can be stored per call."
		)));
	}

	let mut tx = db.pool.begin().await?;

	sessions::ensure_session(&mut *tx, session_id).await?;

	let mut builder = QueryBuilder::<Postgres>::new(
		"INSERT INTO messages (message_id, session_id, role, content, metadata) ",
	);

	builder.push_values(messages, |mut row, message| {
		row.push_bind(Uuid::new_v4())
			.push_bind(session_id)
			.push_bind(message.role.as_str())
			.push_bind(message.content.as_str())
			.push_bind(Json(&message.metadata));
	});
	builder.push(" RETURNING message_id, seq, session_id, role, content, metadata, created_at, deleted_at");

	let mut inserted: Vec<Message> = builder
		.build_query_as()
		.fetch_all(&mut *tx)
		.await
		.map_err(Error::storage("Failed to insert messages."))?;

	tx.commit().await?;

	// Identity values are drawn in VALUES order within one statement.
	inserted.sort_by_key(|message| message.seq);

	Ok(inserted)
}

/// Returns up to `last_n` of the newest active messages in chronological order. Messages already
/// covered by the current summary are excluded.
pub async fn get_messages<'e, E>(executor: E, session_id: &str, last_n: u32) -> Result<Vec<Message>>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;
	let limit = validate::limit(last_n, "last_n")?;

	sqlx::query_as::<_, Message>(
		"\
WITH summary_point AS (
	SELECT m.seq
	FROM summaries s
	JOIN messages m ON m.message_id = s.summary_point_id AND m.session_id = s.session_id
	WHERE s.session_id = $1 AND s.deleted_at IS NULL
	ORDER BY s.created_at DESC, s.seq DESC
	LIMIT 1
)
SELECT *
FROM (
	SELECT message_id, seq, session_id, role, content, metadata, created_at, deleted_at
	FROM messages
	WHERE session_id = $1
		AND deleted_at IS NULL
		AND seq > COALESCE((SELECT seq FROM summary_point), 0)
	ORDER BY seq DESC
	LIMIT $2
) recent
ORDER BY seq ASC",
	)
	.bind(session_id)
	.bind(limit)
	.fetch_all(executor)
	.await
	.map_err(Error::storage("Failed to get messages."))
}

/// Returns up to `limit` active messages strictly after `after`, oldest first. `None` starts from
/// the beginning of the log. The cursor may itself be soft-deleted.
pub async fn get_messages_after(
	db: &Db,
	session_id: &str,
	after: Option<Uuid>,
	limit: u32,
) -> Result<Vec<Message>> {
	let session_id = validate::session_id(session_id)?;
	let limit = validate::limit(limit, "limit")?;
	let after_seq = match after {
		Some(message_id) => sqlx::query_scalar::<_, i64>(
			"SELECT seq FROM messages WHERE message_id = $1 AND session_id = $2",
		)
		.bind(message_id)
		.bind(session_id)
		.fetch_optional(&db.pool)
		.await
		.map_err(Error::storage("Failed to resolve message cursor."))?
		.ok_or_else(|| Error::NotFound(format!("Message {message_id} not found.")))?,
		None => 0,
	};

	sqlx::query_as::<_, Message>(
		"\
SELECT message_id, seq, session_id, role, content, metadata, created_at, deleted_at
FROM messages
WHERE session_id = $1 AND deleted_at IS NULL AND seq > $2
ORDER BY seq ASC
LIMIT $3",
	)
	.bind(session_id)
	.bind(after_seq)
	.bind(limit)
	.fetch_all(&db.pool)
	.await
	.map_err(Error::storage("Failed to get messages after cursor."))
}

/// Pages through the active log oldest first, so appends only ever extend the last page.
pub async fn get_message_list(
	db: &Db,
	session_id: &str,
	page_number: u32,
	page_size: u32,
) -> Result<Page<Message>> {
	let session_id = validate::session_id(session_id)?;
	let (limit, offset) = validate::page_window(page_number, page_size)?;
	let mut tx = db.pool.begin().await?;

	// Count and page must come from one snapshot.
	sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
		.execute(&mut *tx)
		.await?;

	let total_count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM messages WHERE session_id = $1 AND deleted_at IS NULL",
	)
	.bind(session_id)
	.fetch_one(&mut *tx)
	.await
	.map_err(Error::storage("Failed to count messages."))?;
	let items = sqlx::query_as::<_, Message>(
		"\
SELECT message_id, seq, session_id, role, content, metadata, created_at, deleted_at
FROM messages
WHERE session_id = $1 AND deleted_at IS NULL
ORDER BY seq ASC
LIMIT $2 OFFSET $3",
	)
	.bind(session_id)
	.bind(limit)
	.bind(offset)
	.fetch_all(&mut *tx)
	.await
	.map_err(Error::storage("Failed to get message list."))?;

	tx.commit().await?;

	Ok(Page { items, total_count })
}

pub async fn get_messages_by_uuid<'e, E>(
	executor: E,
	session_id: &str,
	message_ids: &[Uuid],
) -> Result<Vec<Message>>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;

	if message_ids.is_empty() {
		return Ok(Vec::new());
	}

	sqlx::query_as::<_, Message>(
		"\
SELECT message_id, seq, session_id, role, content, metadata, created_at, deleted_at
FROM messages
WHERE session_id = $1 AND message_id = ANY($2) AND deleted_at IS NULL
ORDER BY seq ASC",
	)
	.bind(session_id)
	.bind(message_ids)
	.fetch_all(executor)
	.await
	.map_err(Error::storage("Failed to get messages by uuid."))
}

/// Active messages that have no embedding row yet, oldest first.
pub async fn get_unembedded_messages<'e, E>(
	executor: E,
	session_id: &str,
	limit: u32,
) -> Result<Vec<Message>>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;
	let limit = validate::limit(limit, "limit")?;

	sqlx::query_as::<_, Message>(
		"\
SELECT
	m.message_id,
	m.seq,
	m.session_id,
	m.role,
	m.content,
	m.metadata,
	m.created_at,
	m.deleted_at
FROM messages m
LEFT JOIN message_embeddings e ON e.message_id = m.message_id
WHERE m.session_id = $1 AND m.deleted_at IS NULL AND e.message_id IS NULL
ORDER BY m.seq ASC
LIMIT $2",
	)
	.bind(session_id)
	.bind(limit)
	.fetch_all(executor)
	.await
	.map_err(Error::storage("Failed to get unembedded messages."))
}

pub async fn delete_message<'e, E>(executor: E, session_id: &str, message_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;
	let result = sqlx::query(
		"\
UPDATE messages
SET deleted_at = $1
WHERE session_id = $2 AND message_id = $3 AND deleted_at IS NULL",
	)
	.bind(OffsetDateTime::now_utc())
	.bind(session_id)
	.bind(message_id)
	.execute(executor)
	.await
	.map_err(Error::storage("Failed to delete message."))?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Message {message_id} not found.")));
	}

	Ok(())
}
