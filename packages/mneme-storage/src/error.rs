#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Empty batch: {0}")]
	EmptyBatch(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Storage error: {message}")]
	Storage {
		message: String,
		#[source]
		source: Option<sqlx::Error>,
	},
}
impl Error {
	/// Wraps an engine failure with the operation that produced it.
	pub(crate) fn storage(message: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
		move |err| Self::Storage { message: message.to_string(), source: Some(err) }
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: "Database operation failed.".to_string(), source: Some(err) }
	}
}
