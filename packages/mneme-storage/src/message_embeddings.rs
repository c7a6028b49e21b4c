use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
	Error, Result,
	messages::MAX_BATCH_ROWS,
	models::{EmbeddedText, TextEmbedding},
	validate, vector,
};

#[derive(sqlx::FromRow)]
struct EmbeddingRow {
	message_id: Uuid,
	content: String,
	embedding_text: String,
}

/// Returns one record per embedded, active message of the session. Order is unspecified.
pub async fn get_message_embeddings<'e, E>(
	executor: E,
	session_id: &str,
) -> Result<Vec<EmbeddedText>>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;
	let rows = sqlx::query_as::<_, EmbeddingRow>(
		"\
SELECT
	e.message_id,
	m.content,
	e.embedding::text AS embedding_text
FROM message_embeddings e
JOIN messages m ON m.message_id = e.message_id
WHERE e.session_id = $1 AND m.deleted_at IS NULL",
	)
	.bind(session_id)
	.fetch_all(executor)
	.await
	.map_err(Error::storage("Failed to get message vectors."))?;

	rows.into_iter()
		.map(|row| {
			Ok(EmbeddedText {
				text_id: row.message_id,
				text: row.content,
				embedding: vector::parse_vector_text(&row.embedding_text)?,
			})
		})
		.collect()
}

/// Inserts one embedding row per entry in a single statement. Existing rows are never
/// overwritten; a duplicate surfaces as a storage error and nothing from the batch lands.
pub async fn put_message_embeddings<'e, E>(
	executor: E,
	session_id: &str,
	embeddings: &[TextEmbedding],
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let session_id = validate::session_id(session_id)?;

	check_batch(embeddings)?;

	let mut builder = QueryBuilder::<Postgres>::new(
		"INSERT INTO message_embeddings (message_id, session_id, embedding, is_embedded) ",
	);

	push_embedding_values(&mut builder, session_id, embeddings);

	builder
		.build()
		.execute(executor)
		.await
		.map_err(Error::storage("Failed to insert message vectors."))?;

	Ok(())
}

pub(crate) fn check_batch(embeddings: &[TextEmbedding]) -> Result<()> {
	if embeddings.is_empty() {
		return Err(Error::EmptyBatch("no embeddings received.".to_string()));
	}
	if embeddings.len() > MAX_BATCH_ROWS {
		return Err(Error::InvalidArgument(format!(
			"at most {MAX_BATCH_ROWS} embeddings can be stored per call."
		)));
	}

	Ok(())
}

pub(crate) fn push_embedding_values<'args>(
	builder: &mut QueryBuilder<'args, Postgres>,
	session_id: &'args str,
	embeddings: &'args [TextEmbedding],
) {
	builder.push_values(embeddings, |mut row, embedding| {
		row.push_bind(embedding.text_id)
			.push_bind(session_id)
			.push_bind(vector::format_vector_text(&embedding.embedding))
			.push_unseparated("::text::vector")
			.push_bind(true);
	});
}
