mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Embedding, Memory, Postgres, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } => Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	if let Some(timeout) = cfg.storage.postgres.acquire_timeout_ms
		&& timeout == 0
	{
		return Err(Error::Validation {
			message: "storage.postgres.acquire_timeout_ms must be greater than zero.".to_string(),
		});
	}

	// pgvector caps indexed and stored vector widths at 16000.
	if cfg.embedding.dimensions == 0 || cfg.embedding.dimensions > 16_000 {
		return Err(Error::Validation {
			message: "embedding.dimensions must be in the range 1-16000.".to_string(),
		});
	}

	for (label, value) in [
		("memory.message_window", cfg.memory.message_window),
		("memory.summary_window", cfg.memory.summary_window),
		("memory.embedding_batch_size", cfg.memory.embedding_batch_size),
		("memory.max_page_size", cfg.memory.max_page_size),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.memory.min_messages_to_summarize > cfg.memory.summary_window {
		return Err(Error::Validation {
			message:
				"memory.min_messages_to_summarize must not exceed memory.summary_window.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.storage.postgres.dsn = cfg.storage.postgres.dsn.trim().to_string();
}
