use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub embedding: Embedding,
	#[serde(default)]
	pub memory: Memory,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	/// Upper bound on waiting for a pooled connection. Unset keeps the driver default.
	#[serde(default)]
	pub acquire_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Embedding {
	/// Width of every stored vector. Baked into the `vector(<dim>)` columns at bootstrap.
	pub dimensions: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Memory {
	/// Most recent messages returned alongside the current summary.
	pub message_window: u32,
	/// Maximum messages handed to the summarizer in one pass.
	pub summary_window: u32,
	pub min_messages_to_summarize: u32,
	pub embedding_batch_size: u32,
	pub max_page_size: u32,
	pub embed_on_write: bool,
}
impl Default for Memory {
	fn default() -> Self {
		Self {
			message_window: 12,
			summary_window: 64,
			min_messages_to_summarize: 4,
			embedding_batch_size: 32,
			max_page_size: 100,
			embed_on_write: true,
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
