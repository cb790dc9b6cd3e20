use std::io;
use std::time::Instant;

use colored::Colorize;
use serde::Serialize;

use crate::error::ToolError;
use crate::output::data::TextReport;
use crate::output::format::OutputFormat;
use crate::output::model::{CommandError, CommandResult, SCHEMA_VERSION};

/// Builder for constructing command results.
pub struct ResultBuilder<T> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, error: &ToolError) -> Self {
		self.error = Some(CommandError {
			code: error.code().to_string(),
			message: error.to_string(),
			exit_code: error.exit_code(),
		});
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			schema_version: SCHEMA_VERSION,
			ok: self.error.is_none(),
			command: self.command,
			data: self.data,
			error: self.error,
			duration_ms: Some(self.start_time.elapsed().as_millis() as u64),
		}
	}
}

/// Print a command result to stdout in the specified format.
pub fn print_result<T: Serialize + TextReport>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: TextReport>(result: &CommandResult<T>) {
	if let Some(ref data) = result.data {
		let mut stdout = io::stdout().lock();
		let _ = data.write_text(&mut stdout);
	}

	if let Some(ref error) = result.error {
		let label = if error.exit_code == 2 { "FATAL" } else { "Error" };
		eprintln!("{} [{}]: {}", label.red().bold(), error.code, error.message);
	}
}
