pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Empty batch: {message}")]
	EmptyBatch { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error(transparent)]
	Storage(mneme_storage::Error),
}
impl From<mneme_storage::Error> for Error {
	fn from(err: mneme_storage::Error) -> Self {
		match err {
			mneme_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			mneme_storage::Error::EmptyBatch(message) => Self::EmptyBatch { message },
			mneme_storage::Error::NotFound(message) => Self::NotFound { message },
			err @ mneme_storage::Error::Storage { .. } => Self::Storage(err),
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
