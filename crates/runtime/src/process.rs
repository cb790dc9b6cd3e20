//! External storage mover invocation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// How the mover process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
	pub program: PathBuf,
	/// Exit code; `None` when the process was killed by a signal.
	pub code: Option<i32>,
}

impl MigrationOutcome {
	pub fn success(&self) -> bool {
		self.code == Some(0)
	}
}

/// The storage-migration step run between pausing and resuming.
pub trait Migration: Send {
	/// Runs the migration and waits for it to exit.
	fn run<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<MigrationOutcome>> + Send + 'a>>;

	/// Human-readable command line for reports and dry runs.
	fn describe(&self) -> String;
}

/// Runs the first existing executable through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellMigration {
	executables: Vec<PathBuf>,
	args: Vec<String>,
}

impl ShellMigration {
	/// `executables` are tried in order; the first regular file wins.
	pub fn new(executables: Vec<PathBuf>, args: Vec<String>) -> Self {
		Self { executables, args }
	}

	/// Picks the executable that would run.
	pub fn resolve(&self) -> Result<&Path> {
		self.executables
			.iter()
			.find(|candidate| candidate.is_file())
			.map(PathBuf::as_path)
			.ok_or_else(|| Error::NoExecutable(self.executables.clone()))
	}
}

impl Migration for ShellMigration {
	fn run<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = Result<MigrationOutcome>> + Send + 'a>> {
		Box::pin(async move {
			let program = self.resolve()?.to_path_buf();
			info!(target = "deluge.runtime", program = %program.display(), args = ?self.args, "running mover");

			// "$0" "$@" passes the program and arguments through without re-quoting.
			let status = Command::new("sh")
				.arg("-c")
				.arg("exec \"$0\" \"$@\"")
				.arg(&program)
				.args(&self.args)
				.stdin(Stdio::null())
				.status()
				.await
				.map_err(|e| Error::io(format!("Failed to run {}", program.display()), e))?;

			debug!(target = "deluge.runtime", status = %status, "mover exited");
			Ok(MigrationOutcome {
				program,
				code: status.code(),
			})
		})
	}

	fn describe(&self) -> String {
		let program = match self.resolve() {
			Ok(path) => path.display().to_string(),
			Err(_) => self
				.executables
				.first()
				.map(|p| p.display().to_string())
				.unwrap_or_else(|| "<no mover>".to_string()),
		};
		std::iter::once(program)
			.chain(self.args.iter().cloned())
			.collect::<Vec<_>>()
			.join(" ")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[cfg(unix)]
	fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
		use std::os::unix::fs::PermissionsExt;

		let path = dir.join(name);
		std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
		path
	}

	#[test]
	fn resolve_prefers_first_existing_candidate() {
		let dir = tempfile::tempdir().unwrap();
		let alternate = dir.path().join("mover.old");
		std::fs::write(&alternate, "").unwrap();

		let migration = ShellMigration::new(vec![dir.path().join("missing"), alternate.clone()], vec![]);
		assert_eq!(migration.resolve().unwrap(), alternate.as_path());
	}

	#[test]
	fn directories_are_not_executables() {
		let dir = tempfile::tempdir().unwrap();
		let migration = ShellMigration::new(vec![dir.path().to_path_buf()], vec![]);
		assert!(matches!(migration.resolve(), Err(Error::NoExecutable(ref tried)) if tried.len() == 1));
	}

	#[test]
	fn describe_shows_command_line() {
		let migration = ShellMigration::new(vec![PathBuf::from("/usr/local/sbin/mover")], vec!["start".into()]);
		assert_eq!(migration.describe(), "/usr/local/sbin/mover start");
		assert_eq!(ShellMigration::new(vec![], vec![]).describe(), "<no mover>");
	}

	#[tokio::test]
	async fn missing_executable_is_an_error() {
		let mut migration = ShellMigration::new(vec![PathBuf::from("/nonexistent/mover")], vec![]);
		let err = migration.run().await.unwrap_err();
		assert!(err.to_string().contains("/nonexistent/mover"));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn runs_script_with_arguments_and_waits() {
		let dir = tempfile::tempdir().unwrap();
		let marker = dir.path().join("ran");
		let mover = script(dir.path(), "mover", &format!("echo \"$1\" > '{}'", marker.display()));

		let mut migration = ShellMigration::new(vec![mover.clone()], vec!["start".into()]);
		let outcome = migration.run().await.unwrap();

		assert!(outcome.success());
		assert_eq!(outcome.program, mover);
		assert_eq!(std::fs::read_to_string(&marker).unwrap().trim(), "start");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn non_zero_exit_is_reported_not_raised() {
		let dir = tempfile::tempdir().unwrap();
		let mover = script(dir.path(), "mover", "exit 3");

		let outcome = ShellMigration::new(vec![mover], vec![]).run().await.unwrap();
		assert!(!outcome.success());
		assert_eq!(outcome.code, Some(3));
	}
}
