pub mod db;
pub mod message_embeddings;
pub mod messages;
pub mod models;
pub mod schema;
pub mod sessions;
pub mod summaries;
pub mod summary_embeddings;
pub mod vector;

mod error;
mod validate;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
