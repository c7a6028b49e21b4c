use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
	Error, Result,
	message_embeddings::{check_batch, push_embedding_values},
	models::{EmbeddedText, TextEmbedding},
	validate, vector,
};

#[derive(sqlx::FromRow)]
struct EmbeddingRow {
	summary_id: Uuid,
	content: String,
	embedding_text: String,
}

pub async fn get_summary_embeddings<'e, E>(
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
	e.summary_id,
	s.content,
	e.embedding::text AS embedding_text
FROM summary_embeddings e
JOIN summaries s ON s.summary_id = e.summary_id
WHERE e.session_id = $1 AND s.deleted_at IS NULL",
	)
	.bind(session_id)
	.fetch_all(executor)
	.await
	.map_err(Error::storage("Failed to get summary vectors."))?;

	rows.into_iter()
		.map(|row| {
			Ok(EmbeddedText {
				text_id: row.summary_id,
				text: row.content,
				embedding: vector::parse_vector_text(&row.embedding_text)?,
			})
		})
		.collect()
}

/// Same contract as message embeddings, keyed by summary id.
pub async fn put_summary_embeddings<'e, E>(
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
		"INSERT INTO summary_embeddings (summary_id, session_id, embedding, is_embedded) ",
	);

	push_embedding_values(&mut builder, session_id, embeddings);

	builder
		.build()
		.execute(executor)
		.await
		.map_err(Error::storage("Failed to insert summary vectors."))?;

	Ok(())
}

/// Whether the summary already has its vector. Bridges the gap between inserting a summary and
/// inserting its embedding.
pub async fn is_summary_embedded<'e, E>(executor: E, summary_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	sqlx::query_scalar::<_, bool>(
		"SELECT COALESCE((SELECT is_embedded FROM summary_embeddings WHERE summary_id = $1), false)",
	)
	.bind(summary_id)
	.fetch_one(executor)
	.await
	.map_err(Error::storage("Failed to check summary vector."))
}
