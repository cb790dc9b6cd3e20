//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays reserved for the run report.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

	// A second init (tests) is harmless.
	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(true))
		.try_init();
}

fn default_directive(verbose: u8) -> &'static str {
	match verbose {
		0 => "warn",
		1 => "deluge=info,deluge_cli=info,warn",
		2 => "deluge=debug,deluge_cli=debug,info",
		_ => "trace",
	}
}
