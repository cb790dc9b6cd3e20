//! Pause torrents missing from the cache for a fixed hold, then resume them.

use std::path::Path;

use deluge::{Error, Session, Snapshot, Transport, fetch_all};
use deluge_runtime::CacheProbe;
use tracing::info;

use super::batch::{HoldPlan, hold};
use super::{CommandContext, close_with, prepare};
use crate::cli::PauseArgs;
use crate::config::PauserConfig;
use crate::error::Result;
use crate::output::{HeldTorrent, HoldReport};

const WORKFLOW: &str = "deluge-pauser";

pub async fn execute(ctx: &CommandContext, args: PauseArgs) -> Result<HoldReport> {
	let mut config = ctx.config.pauser.clone();
	if let Some(hours) = args.hold_hours {
		config.hold_hours = hours;
	}

	let mut session = ctx.open_session()?;
	let outcome = run(&mut session, &config, args.dry_run).await;
	close_with(session, outcome).await
}

/// Torrents whose payload is not under `cache_root`.
///
/// # Errors
///
/// A torrent without `time_added` means the daemon state is corrupted; the
/// whole selection fails so nothing gets paused.
pub fn select(snapshot: &Snapshot, cache_root: &Path) -> deluge::Result<Vec<HeldTorrent>> {
	if let Some(torrent) = snapshot.values().find(|t| t.time_added.is_none()) {
		return Err(Error::Snapshot(format!(
			"torrent {} has no time_added; Deluge state is corrupted, restart Deluge to correct this",
			torrent.id
		)));
	}

	let probe = CacheProbe::new(cache_root).matching_dirs(true);
	Ok(snapshot
		.values()
		.filter(|torrent| !probe.contains(&torrent.name))
		.map(|torrent| HeldTorrent {
			id: torrent.id.clone(),
			name: torrent.name.clone(),
			path: Path::new(&torrent.save_path).join(&torrent.name),
		})
		.collect())
}

pub async fn run<T: Transport>(session: &mut Session<T>, config: &PauserConfig, dry_run: bool) -> Result<HoldReport> {
	prepare(session).await?;
	let snapshot = fetch_all(session, &super::mover::FIELDS).await?;

	let mut report = HoldReport::new(WORKFLOW, dry_run, snapshot.len());
	report.selected = select(&snapshot, &config.cache_root)?;
	report.hold_secs = config.hold().as_secs();
	info!(
		target = "deluge.pauser",
		cache_root = %config.cache_root.display(),
		selected = report.selected.len(),
		torrents = snapshot.len(),
		"selected torrents"
	);

	if report.selected.is_empty() || dry_run {
		return Ok(report);
	}

	let plan = HoldPlan {
		settle: config.hold(),
		migration: None,
		quiet: std::time::Duration::ZERO,
		fail_on_error: false,
	};
	hold(session, &mut report, plan).await?;
	Ok(report)
}
