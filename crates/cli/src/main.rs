use clap::Parser;
use deluge_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let code = commands::dispatch(cli).await;
	std::process::exit(code);
}
