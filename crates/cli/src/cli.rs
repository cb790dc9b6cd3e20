use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default() | Effects::BOLD)
		.usage(AnsiColor::Green.on_default() | Effects::BOLD)
		.literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "deluge-tools")]
#[command(about = "Label, move and pause torrents on a Deluge daemon through its web UI")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (default: ~/.config/deluge-tools/config.json)
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Web UI JSON-RPC endpoint, overrides the config file
	#[arg(long, global = true, value_name = "URL")]
	pub endpoint: Option<String>,

	/// Web UI password, overrides the config file
	#[arg(long, global = true, env = "DELUGE_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Apply limiter, not-met and imported labels, then drop legacy labels
	Label(LabelArgs),

	/// Pause torrents in the age window, run the mover, resume them
	Move(MoveArgs),

	/// Pause torrents missing from the cache for a while, then resume them
	Pause(PauseArgs),

	/// Log in, bind the web UI to a daemon and count torrents
	Check,
}

#[derive(Args, Debug, Default)]
pub struct LabelArgs {
	/// Classify and report without changing any label
	#[arg(long)]
	pub dry_run: bool,
}

#[derive(Args, Debug, Default)]
pub struct MoveArgs {
	/// Select and report without pausing or running the mover
	#[arg(long)]
	pub dry_run: bool,

	/// Minimum torrent age in days
	#[arg(long, value_name = "DAYS")]
	pub min_age: Option<u32>,

	/// Maximum torrent age in days (0 = no limit)
	#[arg(long, value_name = "DAYS")]
	pub max_age: Option<u32>,

	/// Only move torrents found under the cache root
	#[arg(long)]
	pub check_cache: bool,
}

#[derive(Args, Debug, Default)]
pub struct PauseArgs {
	/// Select and report without pausing
	#[arg(long)]
	pub dry_run: bool,

	/// Hours to keep the torrents paused
	#[arg(long, value_name = "HOURS")]
	pub hold_hours: Option<u64>,
}
