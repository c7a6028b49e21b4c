pub mod embeddings;
pub mod memory;
pub mod summaries;
pub mod summarize;
pub mod timestamp;

mod error;

pub use embeddings::{EmbeddingInput, EmbeddingItem, EmbeddingsResponse, PutEmbeddingsRequest};
pub use error::{Error, Result};
pub use memory::{
	AddMessagesRequest, AddMessagesResponse, GetMemoryRequest, ListMessagesRequest,
	MessageInput, MessageItem, MessageListResponse, MemoryResponse,
};
pub use summaries::{
	ListSummariesRequest, SummaryItem, SummaryListResponse, UpdateSummaryMetadataRequest,
};
pub use summarize::{SummarizeRequest, SummarizeResponse};

use std::{future::Future, pin::Pin, sync::Arc};

use mneme_config::{Config, Embedding};
use mneme_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns text into vectors of `cfg.dimensions` width, one per input, in input order.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a Embedding,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Condenses a window of messages, folding in the previous summary when there is one.
pub trait SummarizerProvider
where
	Self: Send + Sync,
{
	fn summarize<'a>(
		&'a self,
		previous_summary: Option<&'a str>,
		messages: &'a [MessageItem],
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub summarizer: Arc<dyn SummarizerProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		summarizer: Arc<dyn SummarizerProvider>,
	) -> Self {
		Self { embedding, summarizer }
	}
}

pub struct MemoryService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}
impl MemoryService {
	pub fn new(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}

	/// Embeds `texts` and checks that the provider answered once per input.
	pub(crate) async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors = self.providers.embedding.embed(&self.cfg.embedding, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} texts.",
					vectors.len(),
					texts.len()
				),
			});
		}

		Ok(vectors)
	}

	pub(crate) fn check_page_size(&self, page_size: u32) -> Result<()> {
		if page_size > self.cfg.memory.max_page_size {
			return Err(Error::InvalidRequest {
				message: format!(
					"page_size must be at most {}.",
					self.cfg.memory.max_page_size
				),
			});
		}

		Ok(())
	}
}

/// Pages needed to show `total_count` rows at `page_size` per page.
pub fn total_pages(total_count: i64, page_size: u32) -> i64 {
	if total_count <= 0 {
		return 0;
	}

	let page_size = i64::from(page_size.max(1));

	(total_count + page_size - 1) / page_size
}
