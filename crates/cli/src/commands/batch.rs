//! Per-torrent mutation batches and the pause/resume hold cycle.

use std::time::Duration;

use deluge::protocol::method::{CORE_PAUSE_TORRENT, CORE_RESUME_TORRENT};
use deluge::{Session, Transport};
use deluge_runtime::Migration;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::aborts_batch;
use crate::error::{Result, ToolError};
use crate::output::{HoldReport, ItemFailure, MigrationReport};

pub(crate) struct BatchOutcome {
	pub done: Vec<String>,
	pub failures: Vec<ItemFailure>,
	/// Error that stopped the batch early.
	pub aborted: Option<deluge::Error>,
}

/// Calls `method [id]` for every id, in order.
pub(crate) async fn for_each_torrent<T: Transport>(
	session: &mut Session<T>,
	method: &str,
	ids: &[String],
) -> BatchOutcome {
	let mut outcome = BatchOutcome {
		done: Vec::with_capacity(ids.len()),
		failures: Vec::new(),
		aborted: None,
	};

	for id in ids {
		match session.request::<Value>(method, vec![json!(id)]).await {
			Ok(_) => outcome.done.push(id.clone()),
			Err(err) if aborts_batch(&err) => {
				error!(target = "deluge", method, id = %id, error = %err, "batch aborted");
				outcome.aborted = Some(err);
				break;
			}
			Err(err) => {
				warn!(target = "deluge", method, id = %id, error = %err, "call failed, continuing");
				outcome.failures.push(ItemFailure {
					id: id.clone(),
					action: method.to_string(),
					error: err.to_string(),
				});
			}
		}
	}

	outcome
}

/// Waits and the optional migration between pausing and resuming.
pub(crate) struct HoldPlan<'m> {
	/// Wait after pausing.
	pub settle: Duration,
	pub migration: Option<&'m mut dyn Migration>,
	/// Wait after the migration; skipped without one.
	pub quiet: Duration,
	pub fail_on_error: bool,
}

/// Pauses every selected torrent, holds, then resumes exactly the ones that
/// were paused.
///
/// # Errors
///
/// [`ToolError::Stranded`] when any paused torrent could not be resumed.
/// Otherwise the pause abort or migration failure, reported after resuming.
pub(crate) async fn hold<T: Transport>(
	session: &mut Session<T>,
	report: &mut HoldReport,
	plan: HoldPlan<'_>,
) -> Result<()> {
	let ids: Vec<String> = report.selected.iter().map(|t| t.id.clone()).collect();
	let paused = for_each_torrent(session, CORE_PAUSE_TORRENT, &ids).await;
	report.paused = paused.done;
	report.failures.extend(paused.failures);

	if let Some(err) = paused.aborted {
		resume_paused(session, report).await?;
		return Err(err.into());
	}
	if report.paused.is_empty() {
		warn!(target = "deluge", "no torrent could be paused");
		return Ok(());
	}

	info!(
		target = "deluge",
		paused = report.paused.len(),
		wait_secs = plan.settle.as_secs(),
		"torrents paused"
	);
	tokio::time::sleep(plan.settle).await;

	let mut migration_err = None;
	if let Some(migration) = plan.migration {
		let command = migration.describe();
		match migration.run().await {
			Ok(outcome) => {
				if !outcome.success() {
					warn!(target = "deluge", command = %command, code = ?outcome.code, "mover exited unsuccessfully");
					if plan.fail_on_error {
						migration_err = Some(ToolError::MigrationFailed {
							command: command.clone(),
							code: outcome.code,
						});
					}
				}
				report.migration = Some(MigrationReport {
					command,
					exit_code: outcome.code,
					success: outcome.success(),
					error: None,
				});
			}
			Err(err) => {
				error!(target = "deluge", command = %command, error = %err, "mover did not run");
				report.migration = Some(MigrationReport {
					command,
					exit_code: None,
					success: false,
					error: Some(err.to_string()),
				});
				migration_err = Some(err.into());
			}
		}
		tokio::time::sleep(plan.quiet).await;
	}

	resume_paused(session, report).await?;
	migration_err.map_or(Ok(()), Err)
}

/// Resumes `report.paused`; anything left paused is stranded.
async fn resume_paused<T: Transport>(session: &mut Session<T>, report: &mut HoldReport) -> Result<()> {
	if report.paused.is_empty() {
		return Ok(());
	}

	let resumed = for_each_torrent(session, CORE_RESUME_TORRENT, &report.paused).await;
	report.resumed = resumed.done;
	report.failures.extend(resumed.failures);

	let stranded: Vec<String> = report
		.paused
		.iter()
		.filter(|id| !report.resumed.contains(id))
		.cloned()
		.collect();
	if stranded.is_empty() {
		info!(target = "deluge", resumed = report.resumed.len(), "torrents resumed");
		return Ok(());
	}

	let cause = match resumed.aborted {
		Some(err) => err.to_string(),
		None => "resume rejected by Deluge".to_string(),
	};
	error!(
		target = "deluge",
		stranded = ?stranded,
		cause = %cause,
		"torrents left paused, resume them manually"
	);
	Err(ToolError::Stranded { ids: stranded, cause })
}

#[cfg(test)]
mod tests {
	use std::future::Future;
	use std::path::PathBuf;
	use std::pin::Pin;
	use std::sync::{Arc, Mutex};

	use deluge::fake_transport::{FakeReply, FakeTransport, FakeTransportBuilder, FakeTransportController};
	use deluge_runtime::MigrationOutcome;

	use super::*;
	use crate::output::HeldTorrent;

	/// Records the methods sent before it ran.
	struct FakeMigration {
		code: Option<i32>,
		controller: FakeTransportController,
		seen: Arc<Mutex<Option<Vec<String>>>>,
	}

	impl Migration for FakeMigration {
		fn run<'a>(
			&'a mut self,
		) -> Pin<Box<dyn Future<Output = deluge_runtime::Result<MigrationOutcome>> + Send + 'a>> {
			Box::pin(async move {
				*self.seen.lock().unwrap() = Some(self.controller.methods());
				Ok(MigrationOutcome {
					program: PathBuf::from("/usr/local/sbin/mover"),
					code: self.code,
				})
			})
		}

		fn describe(&self) -> String {
			"/usr/local/sbin/mover start".to_string()
		}
	}

	fn selected(ids: &[&str]) -> HoldReport {
		let mut report = HoldReport::new("deluge-mover", false, ids.len());
		report.selected = ids
			.iter()
			.map(|id| HeldTorrent {
				id: id.to_string(),
				name: format!("name-{id}"),
				path: PathBuf::from(format!("/data/{id}")),
			})
			.collect();
		report
	}

	fn fake_session(builder: FakeTransportBuilder) -> (Session<FakeTransport>, FakeTransportController) {
		let (transport, controller) = builder.build();
		(Session::new(transport, "deluged"), controller)
	}

	fn plan(migration: Option<&mut dyn Migration>, fail_on_error: bool) -> HoldPlan<'_> {
		HoldPlan {
			settle: Duration::ZERO,
			migration,
			quiet: Duration::ZERO,
			fail_on_error,
		}
	}

	fn ok_everything() -> FakeTransportBuilder {
		FakeTransportBuilder::new()
			.always("core.pause_torrent", FakeReply::result(Value::Null))
			.always("core.resume_torrent", FakeReply::result(Value::Null))
	}

	fn resumed_ids(controller: &FakeTransportController) -> Vec<Value> {
		controller
			.sent_for("core.resume_torrent")
			.into_iter()
			.map(|r| r.params[0].clone())
			.collect()
	}

	#[tokio::test]
	async fn migration_runs_between_pause_and_resume() {
		let (mut session, controller) = fake_session(ok_everything());
		let seen = Arc::new(Mutex::new(None));
		let mut migration = FakeMigration {
			code: Some(0),
			controller: controller.clone(),
			seen: seen.clone(),
		};
		let mut report = selected(&["a", "b"]);

		hold(&mut session, &mut report, plan(Some(&mut migration), false)).await.unwrap();

		let before = seen.lock().unwrap().clone().unwrap();
		assert_eq!(before, vec!["core.pause_torrent", "core.pause_torrent"]);
		assert_eq!(report.paused, vec!["a", "b"]);
		assert_eq!(report.resumed, vec!["a", "b"]);
		assert!(report.migration.as_ref().unwrap().success);
	}

	#[tokio::test]
	async fn resume_set_is_exactly_the_paused_set() {
		let (mut session, controller) = fake_session(
			FakeTransportBuilder::new()
				.reply("core.pause_torrent", FakeReply::result(Value::Null))
				.reply("core.pause_torrent", FakeReply::error(3, "Torrent not found"))
				.always("core.pause_torrent", FakeReply::result(Value::Null))
				.always("core.resume_torrent", FakeReply::result(Value::Null)),
		);
		let mut report = selected(&["a", "gone", "c"]);

		hold(&mut session, &mut report, plan(None, false)).await.unwrap();

		assert_eq!(report.paused, vec!["a", "c"]);
		assert_eq!(resumed_ids(&controller), vec![json!("a"), json!("c")]);
		assert_eq!(report.failures.len(), 1);
		assert_eq!(report.failures[0].id, "gone");
	}

	#[tokio::test]
	async fn failed_resume_is_stranded() {
		let (mut session, _controller) = fake_session(
			FakeTransportBuilder::new()
				.always("core.pause_torrent", FakeReply::result(Value::Null))
				.reply("core.resume_torrent", FakeReply::network_failure())
				.always("core.resume_torrent", FakeReply::result(Value::Null)),
		);
		let mut report = selected(&["a", "b"]);

		let err = hold(&mut session, &mut report, plan(None, false)).await.unwrap_err();
		match err {
			ToolError::Stranded { ids, .. } => assert_eq!(ids, vec!["a", "b"]),
			other => panic!("expected stranded, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn rejected_resume_is_stranded_after_finishing_batch() {
		let (mut session, controller) = fake_session(
			FakeTransportBuilder::new()
				.always("core.pause_torrent", FakeReply::result(Value::Null))
				.reply("core.resume_torrent", FakeReply::error(4, "boom"))
				.always("core.resume_torrent", FakeReply::result(Value::Null)),
		);
		let mut report = selected(&["a", "b"]);

		let err = hold(&mut session, &mut report, plan(None, false)).await.unwrap_err();
		assert_eq!(err.exit_code(), 2);
		assert_eq!(controller.calls("core.resume_torrent"), 2);
		assert_eq!(report.resumed, vec!["b"]);
	}

	#[tokio::test]
	async fn aborted_pause_resumes_what_was_paused() {
		let (mut session, controller) = fake_session(
			FakeTransportBuilder::new()
				.reply("core.pause_torrent", FakeReply::result(Value::Null))
				.reply("core.pause_torrent", FakeReply::body("<html>proxy error</html>"))
				.always("core.resume_torrent", FakeReply::result(Value::Null)),
		);
		let mut report = selected(&["a", "b", "c"]);

		let err = hold(&mut session, &mut report, plan(None, false)).await.unwrap_err();
		assert!(matches!(err, ToolError::Deluge(deluge::Error::Decode { .. })), "{err:?}");
		assert_eq!(controller.calls("core.pause_torrent"), 2);
		assert_eq!(resumed_ids(&controller), vec![json!("a")]);
	}

	#[tokio::test]
	async fn failing_mover_still_resumes() {
		let (mut session, controller) = fake_session(ok_everything());
		let mut migration = FakeMigration {
			code: Some(1),
			controller: controller.clone(),
			seen: Arc::new(Mutex::new(None)),
		};
		let mut report = selected(&["a"]);

		let err = hold(&mut session, &mut report, plan(Some(&mut migration), true)).await.unwrap_err();
		assert!(matches!(err, ToolError::MigrationFailed { code: Some(1), .. }));
		assert_eq!(report.resumed, vec!["a"]);

		let (mut session, _controller) = fake_session(ok_everything());
		let mut report = selected(&["a"]);
		hold(&mut session, &mut report, plan(Some(&mut migration), false)).await.unwrap();
		assert!(!report.migration.unwrap().success);
	}
}
