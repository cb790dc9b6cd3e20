use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
	#[error(transparent)]
	Deluge(#[from] deluge::Error),

	#[error(transparent)]
	Runtime(#[from] deluge_runtime::Error),

	#[error("Invalid config {}: {message}", .path.display())]
	Config { path: PathBuf, message: String },

	#[error("Mover {command} exited with {}", exit_label(.code))]
	MigrationFailed { command: String, code: Option<i32> },

	/// Paused torrents could not be resumed. Needs an operator.
	#[error("{} torrent(s) left paused and need a manual resume ({cause}): {}", .ids.len(), .ids.join(", "))]
	Stranded { ids: Vec<String>, cause: String },
}

fn exit_label(code: &Option<i32>) -> String {
	match code {
		Some(code) => format!("status {code}"),
		None => "a signal".to_string(),
	}
}

impl ToolError {
	pub fn exit_code(&self) -> i32 {
		match self {
			ToolError::Stranded { .. } => 2,
			_ => 1,
		}
	}

	/// Stable machine-readable code for JSON output.
	pub fn code(&self) -> &'static str {
		match self {
			ToolError::Deluge(deluge::Error::Transport { .. }) => "TRANSPORT",
			ToolError::Deluge(deluge::Error::Decode { .. }) => "DECODE",
			ToolError::Deluge(deluge::Error::Rpc { .. }) => "RPC",
			ToolError::Deluge(deluge::Error::ReauthenticationFailed | deluge::Error::LoginRejected) => "AUTH",
			ToolError::Deluge(deluge::Error::Connectivity(_)) => "CONNECTIVITY",
			ToolError::Deluge(deluge::Error::Snapshot(_)) => "SNAPSHOT",
			ToolError::Deluge(deluge::Error::InvalidEndpoint(_) | deluge::Error::Pattern(_)) => "INVALID_INPUT",
			ToolError::Runtime(_) => "MOVER",
			ToolError::Config { .. } => "CONFIG",
			ToolError::MigrationFailed { .. } => "MOVER",
			ToolError::Stranded { .. } => "STRANDED",
		}
	}
}

pub type Result<T> = std::result::Result<T, ToolError>;
