use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = mneme_admin::Args::parse();
	mneme_admin::run(args).await
}
