use std::path::PathBuf;

use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use mneme_service::{
	MessageItem, MessageListResponse, SummaryItem, SummaryListResponse, total_pages,
};
use mneme_storage::{db::Db, messages, summaries};

#[derive(Debug, Parser)]
#[command(
	version = env!("CARGO_PKG_VERSION"),
	rename_all = "kebab",
	styles = styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Create the extension, tables and indexes if they are missing.
	Bootstrap,
	/// Print the most recent active summary of a session.
	CurrentSummary {
		#[arg(long)]
		session: String,
	},
	ListSummaries {
		#[arg(long)]
		session: String,
		#[arg(long, default_value_t = 1)]
		page: u32,
		#[arg(long, default_value_t = 20)]
		page_size: u32,
	},
	ListMessages {
		#[arg(long)]
		session: String,
		#[arg(long, default_value_t = 1)]
		page: u32,
		#[arg(long, default_value_t = 20)]
		page_size: u32,
	},
	/// List messages that are still waiting for a vector.
	PendingEmbeddings {
		#[arg(long)]
		session: String,
		#[arg(long, default_value_t = 100)]
		limit: u32,
	},
}

#[derive(Serialize)]
struct PendingEmbeddings {
	session_id: String,
	message_ids: Vec<Uuid>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = mneme_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let db = Db::connect(&config.storage.postgres).await?;

	match args.command {
		Command::Bootstrap => {
			db.ensure_schema(config.embedding.dimensions).await?;

			tracing::info!(dimensions = config.embedding.dimensions, "Schema is ready.");
		},
		Command::CurrentSummary { session } => {
			let summary = summaries::get_summary(&db.pool, &session).await?;

			print_json(&summary.map(SummaryItem::from))?;
		},
		Command::ListSummaries { session, page, page_size } => {
			let listed = summaries::get_summary_list(&db, &session, page, page_size).await?;

			print_json(&SummaryListResponse {
				total_pages: total_pages(listed.total_count, page_size),
				total_count: listed.total_count,
				summaries: listed.items.into_iter().map(SummaryItem::from).collect(),
			})?;
		},
		Command::ListMessages { session, page, page_size } => {
			let listed = messages::get_message_list(&db, &session, page, page_size).await?;

			print_json(&MessageListResponse {
				total_pages: total_pages(listed.total_count, page_size),
				total_count: listed.total_count,
				messages: listed.items.into_iter().map(MessageItem::from).collect(),
			})?;
		},
		Command::PendingEmbeddings { session, limit } => {
			let pending = messages::get_unembedded_messages(&db.pool, &session, limit).await?;

			tracing::debug!(session_id = %session, count = pending.len(), "Loaded pending messages.");

			print_json(&PendingEmbeddings {
				session_id: session,
				message_ids: pending.into_iter().map(|message| message.message_id).collect(),
			})?;
		},
	}

	Ok(())
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn parses_list_messages_with_defaults() {
		let args = Args::parse_from([
			"mneme-admin",
			"--config",
			"mneme.toml",
			"list-messages",
			"--session",
			"s1",
		]);

		match args.command {
			Command::ListMessages { session, page, page_size } => {
				assert_eq!(session, "s1");
				assert_eq!(page, 1);
				assert_eq!(page_size, 20);
			},
			other => panic!("Unexpected command: {other:?}."),
		}
	}
}
