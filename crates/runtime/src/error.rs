use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("{context}: {source}")]
	Io {
		context: String,
		#[source]
		source: std::io::Error,
	},

	#[error("No mover executable found (tried {})", display_paths(.0))]
	NoExecutable(Vec<PathBuf>),
}

impl Error {
	pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
		Error::Io {
			context: context.into(),
			source,
		}
	}
}

fn display_paths(paths: &[PathBuf]) -> String {
	if paths.is_empty() {
		return "none configured".to_string();
	}
	paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
