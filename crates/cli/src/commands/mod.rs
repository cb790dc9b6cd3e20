//! Command entry points.
//!
//! Every command opens one session, runs its workflow and closes the session
//! on the way out, whatever the workflow returned.

mod batch;
pub mod check;
pub mod label;
pub mod mover;
pub mod pause;

use deluge::{Connectivity, Session, Transport, ensure_connected};
use serde::Serialize;
use tracing::error;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;
use crate::output::{CheckReport, OutputFormat, ResultBuilder, TextReport, print_result};

/// Resolved settings shared by all commands.
#[derive(Debug, Clone)]
pub struct CommandContext {
	pub config: Config,
	pub format: OutputFormat,
}

impl CommandContext {
	/// Loads the config file and applies the global flag overrides.
	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let mut config = Config::load(cli.config.as_deref())?;
		if let Some(endpoint) = &cli.endpoint {
			config.endpoint = endpoint.clone();
		}
		if let Some(password) = &cli.password {
			config.password = password.clone();
		}
		Ok(Self {
			config,
			format: cli.format,
		})
	}

	pub fn open_session(&self) -> Result<Session> {
		Ok(Session::connect(
			&self.config.endpoint,
			self.config.password.clone(),
			self.config.request_timeout(),
		)?)
	}
}

/// Runs the selected command and returns the process exit code.
pub async fn dispatch(cli: Cli) -> i32 {
	let format = cli.format;
	let ctx = match CommandContext::from_cli(&cli) {
		Ok(ctx) => ctx,
		Err(err) => return finish::<CheckReport>(command_name(&cli.command), Err(err), format),
	};

	match cli.command {
		Commands::Label(args) => finish("label", label::execute(&ctx, args).await, format),
		Commands::Move(args) => finish("move", mover::execute(&ctx, args).await, format),
		Commands::Pause(args) => finish("pause", pause::execute(&ctx, args).await, format),
		Commands::Check => finish("check", check::execute(&ctx).await, format),
	}
}

fn command_name(command: &Commands) -> &'static str {
	match command {
		Commands::Label(_) => "label",
		Commands::Move(_) => "move",
		Commands::Pause(_) => "pause",
		Commands::Check => "check",
	}
}

fn finish<T: Serialize + TextReport>(command: &str, outcome: Result<T>, format: OutputFormat) -> i32 {
	let builder = ResultBuilder::new(command);
	let (result, code) = match outcome {
		Ok(report) => (builder.data(report).build(), 0),
		Err(err) => {
			error!(target = "deluge", command, error = %err, "command failed");
			let code = err.exit_code();
			(builder.error(&err).build(), code)
		}
	};
	print_result(&result, format);
	code
}

/// Logs in and binds the web UI to a daemon.
pub(crate) async fn prepare<T: Transport>(session: &mut Session<T>) -> Result<Connectivity> {
	session.login().await?;
	Ok(ensure_connected(session).await?)
}

/// Closes `session` after `outcome` is known.
pub(crate) async fn close_with<T: Transport, R>(session: Session<T>, outcome: Result<R>) -> Result<R> {
	session.close().await;
	outcome
}

/// Errors that end a batch. Server-side errors for one torrent do not.
pub(crate) fn aborts_batch(err: &deluge::Error) -> bool {
	!matches!(err, deluge::Error::Rpc { .. })
}
