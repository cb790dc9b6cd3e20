//! Report payloads of the individual commands.

use std::io::{self, Write};
use std::path::PathBuf;

use colored::Colorize;
use deluge::ClassifyMode;
use serde::Serialize;

/// Renders a report for the text output format.
pub trait TextReport {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Outcome of one mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
	/// Dry run; nothing was sent.
	Planned,
	Applied,
	Failed,
}

impl ActionStatus {
	pub fn from_result<E>(dry_run: bool, result: &Result<(), E>) -> Self {
		match (dry_run, result) {
			(true, _) => ActionStatus::Planned,
			(false, Ok(())) => ActionStatus::Applied,
			(false, Err(_)) => ActionStatus::Failed,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelReport {
	pub dry_run: bool,
	pub torrents: usize,
	pub passes: Vec<LabelPass>,
	pub removed_labels: Vec<LabelRemoval>,
}

impl LabelReport {
	/// Mutating calls issued, or planned in a dry run.
	pub fn mutation_count(&self) -> usize {
		self.passes.iter().map(|p| p.changes.len()).sum::<usize>() + self.removed_labels.len()
	}

	pub fn eligible(&self, mode: ClassifyMode) -> usize {
		self.passes
			.iter()
			.find(|p| p.mode == mode)
			.map_or(0, |p| p.changes.len())
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPass {
	pub mode: ClassifyMode,
	pub label: String,
	pub changes: Vec<LabelChange>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelChange {
	pub id: String,
	pub name: String,
	pub from: String,
	pub to: String,
	pub trackers: Vec<String>,
	pub status: ActionStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRemoval {
	pub label: String,
	pub status: ActionStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl TextReport for LabelReport {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		for pass in &self.passes {
			let header = format!("[{}]", "deluge-labeler".green());
			if pass.changes.is_empty() {
				writeln!(out, "{header}: {}", format!("no eligible '{}' torrents.", pass.label).bold())?;
				continue;
			}
			writeln!(
				out,
				"{header}: {}",
				format!("found {} eligible '{}' torrents.", pass.changes.len(), pass.label).bold()
			)?;
			for change in &pass.changes {
				writeln!(out, "[{}]: {}", "label.set_torrent".red(), change.name.bold())?;
				writeln!(out, "\t{}: {}", "info_hash".yellow(), change.id)?;
				writeln!(out, "\t{}: {}", "tracker".yellow(), change.trackers.join(", "))?;
				writeln!(
					out,
					"\t{}: {} -> {}{}",
					"label_activity".yellow(),
					display_label(&change.from),
					change.to,
					status_suffix(change.status, change.error.as_deref())
				)?;
			}
		}

		for removal in &self.removed_labels {
			writeln!(
				out,
				"[{}]: {}{}",
				"label.remove".red(),
				removal.label.bold(),
				status_suffix(removal.status, removal.error.as_deref())
			)?;
		}

		if self.dry_run {
			writeln!(out, "{}", format!("dry run: {} change(s) not applied", self.mutation_count()).cyan())?;
		}
		Ok(())
	}
}

/// Shared report of the mover and pauser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldReport {
	pub workflow: String,
	pub dry_run: bool,
	pub torrents: usize,
	pub selected: Vec<HeldTorrent>,
	pub paused: Vec<String>,
	pub resumed: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub failures: Vec<ItemFailure>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub migration: Option<MigrationReport>,
	pub hold_secs: u64,
}

impl HoldReport {
	pub fn new(workflow: &str, dry_run: bool, torrents: usize) -> Self {
		Self {
			workflow: workflow.to_string(),
			dry_run,
			torrents,
			selected: Vec::new(),
			paused: Vec::new(),
			resumed: Vec::new(),
			failures: Vec::new(),
			migration: None,
			hold_secs: 0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldTorrent {
	pub id: String,
	pub name: String,
	/// Where the payload is expected to be.
	pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
	pub id: String,
	pub action: String,
	pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exit_code: Option<i32>,
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl TextReport for HoldReport {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		let header = format!("[{}]", self.workflow.green());
		if self.selected.is_empty() {
			writeln!(out, "{header}: {}", "no eligible torrents. script completed.".bold())?;
			return Ok(());
		}

		for torrent in &self.selected {
			let verb = if self.dry_run { "would pause" } else { "pause_torrent" };
			writeln!(out, "[{}]: {}", verb.red(), torrent.name.bold())?;
			writeln!(out, "\t{}: {}", "info_hash".yellow(), torrent.id)?;
			writeln!(out, "\t{}: {}", "save_path".yellow(), torrent.path.display())?;
		}

		if self.dry_run {
			writeln!(out, "{}", format!("dry run: {} torrent(s) not paused", self.selected.len()).cyan())?;
			return Ok(());
		}

		writeln!(
			out,
			"[{}]: paused {} torrents",
			"pause_summary".red(),
			self.paused.len().to_string().yellow().bold()
		)?;
		if let Some(migration) = &self.migration {
			let outcome = match (&migration.error, migration.exit_code) {
				(Some(error), _) => error.red().to_string(),
				(None, Some(code)) if migration.success => format!("exit {code}").green().to_string(),
				(None, Some(code)) => format!("exit {code}").red().to_string(),
				(None, None) => "killed by signal".red().to_string(),
			};
			writeln!(out, "[{}]: {} ({outcome})", "mover".red(), migration.command)?;
		}
		writeln!(
			out,
			"[{}]: resumed {} torrents",
			"resume_summary".red(),
			self.resumed.len().to_string().yellow().bold()
		)?;
		for failure in &self.failures {
			writeln!(out, "\t{} {}: {}", failure.action.red(), failure.id, failure.error)?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
	pub endpoint: String,
	/// `already-connected` or `connected`.
	pub connectivity: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub host: Option<String>,
	pub torrents: usize,
}

impl TextReport for CheckReport {
	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "[{}]: {}", "deluge-tools".green(), self.endpoint.bold())?;
		match &self.host {
			Some(host) => writeln!(out, "\t{}: connected to {host}", "daemon".yellow())?,
			None => writeln!(out, "\t{}: already connected", "daemon".yellow())?,
		}
		writeln!(out, "\t{}: {}", "torrents".yellow(), self.torrents)
	}
}

fn display_label(label: &str) -> &str {
	if label.is_empty() { "<none>" } else { label }
}

fn status_suffix(status: ActionStatus, error: Option<&str>) -> String {
	match status {
		ActionStatus::Planned => format!(" {}", "(dry run)".cyan()),
		ActionStatus::Applied => String::new(),
		ActionStatus::Failed => format!(" {}", format!("(failed: {})", error.unwrap_or("unknown error")).red()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn render(report: &dyn TextReport) -> String {
		colored::control::set_override(false);
		let mut out = Vec::new();
		report.write_text(&mut out).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn empty_label_passes_are_reported() {
		let report = LabelReport {
			dry_run: false,
			torrents: 0,
			passes: ClassifyMode::ALL
				.into_iter()
				.map(|mode| LabelPass {
					mode,
					label: mode.target_label().to_string(),
					changes: Vec::new(),
				})
				.collect(),
			removed_labels: Vec::new(),
		};
		let text = render(&report);
		assert!(text.contains("no eligible 'limiter' torrents."));
		assert!(text.contains("no eligible 'imported' torrents."));
		assert_eq!(report.mutation_count(), 0);
	}

	#[test]
	fn label_change_shows_transition() {
		let report = LabelReport {
			dry_run: true,
			torrents: 1,
			passes: vec![LabelPass {
				mode: ClassifyMode::Limiting,
				label: "limiter".into(),
				changes: vec![LabelChange {
					id: "abc".into(),
					name: "Show.S01E01".into(),
					from: "cross-seed".into(),
					to: "limiter".into(),
					trackers: vec!["https://t1/announce".into()],
					status: ActionStatus::Planned,
					error: None,
				}],
			}],
			removed_labels: Vec::new(),
		};
		let text = render(&report);
		assert!(text.contains("cross-seed -> limiter (dry run)"));
		assert!(text.contains("dry run: 1 change(s) not applied"));
		assert_eq!(report.eligible(ClassifyMode::Limiting), 1);
		assert_eq!(report.eligible(ClassifyMode::Imported), 0);
	}

	#[test]
	fn hold_report_serializes_camel_case() {
		let mut report = HoldReport::new("deluge-mover", false, 3);
		report.selected.push(HeldTorrent {
			id: "abc".into(),
			name: "Movie".into(),
			path: PathBuf::from("/mnt/cache/Movie"),
		});
		report.paused.push("abc".into());
		report.resumed.push("abc".into());
		report.migration = Some(MigrationReport {
			command: "/usr/local/sbin/mover start".into(),
			exit_code: Some(0),
			success: true,
			error: None,
		});

		let json = serde_json::to_value(&report).unwrap();
		assert_eq!(json["dryRun"], false);
		assert_eq!(json["selected"][0]["path"], "/mnt/cache/Movie");
		assert_eq!(json["migration"]["exitCode"], 0);
		assert!(json.get("failures").is_none());

		let text = render(&report);
		assert!(text.contains("paused 1 torrents"));
		assert!(text.contains("/usr/local/sbin/mover start (exit 0)"));
	}
}
