//! Pause, run the mover, resume.

use std::path::{Path, PathBuf};

use deluge::protocol::{Torrent, TorrentField};
use deluge::{AgeWindow, Session, Snapshot, Transport, fetch_all, now_epoch};
use deluge_runtime::{CacheProbe, Migration, ShellMigration};
use tracing::{debug, info, warn};

use super::batch::{HoldPlan, hold};
use super::{CommandContext, close_with, prepare};
use crate::cli::MoveArgs;
use crate::config::MoverConfig;
use crate::error::Result;
use crate::output::{HeldTorrent, HoldReport};

const WORKFLOW: &str = "deluge-mover";

pub(crate) const FIELDS: [TorrentField; 4] = [
	TorrentField::Name,
	TorrentField::SavePath,
	TorrentField::Progress,
	TorrentField::TimeAdded,
];

pub async fn execute(ctx: &CommandContext, args: MoveArgs) -> Result<HoldReport> {
	let mut config = ctx.config.mover.clone();
	if let Some(min) = args.min_age {
		config.min_age_days = min;
	}
	if let Some(max) = args.max_age {
		config.max_age_days = max;
	}
	config.check_cache |= args.check_cache;

	let mut migration = ShellMigration::new(config.executables.clone(), config.args.clone());
	let mut session = ctx.open_session()?;
	let outcome = run(&mut session, &config, &mut migration, args.dry_run).await;
	close_with(session, outcome).await
}

/// Torrents inside the age window, with their effective payload path.
pub fn select(snapshot: &Snapshot, config: &MoverConfig, now: i64) -> Vec<HeldTorrent> {
	let window = config.window();
	let probe = config.check_cache.then(|| CacheProbe::new(&config.cache_root));

	snapshot
		.values()
		.filter_map(|torrent| {
			let Some(time_added) = torrent.time_added else {
				warn!(target = "deluge.mover", id = %torrent.id, "torrent has no time_added, skipping");
				return None;
			};
			if !window.contains(now, time_added) {
				return None;
			}
			let path = effective_path(torrent, probe.as_ref(), &config.cache_root, window)?;
			Some(HeldTorrent {
				id: torrent.id.clone(),
				name: torrent.name.clone(),
				path,
			})
		})
		.collect()
}

fn effective_path(torrent: &Torrent, probe: Option<&CacheProbe>, cache_root: &Path, window: AgeWindow) -> Option<PathBuf> {
	match probe {
		Some(probe) => {
			if probe.contains(&torrent.name) {
				Some(cache_root.join(&torrent.name))
			} else {
				debug!(target = "deluge.mover", name = %torrent.name, window = %window, "not on cache");
				None
			}
		}
		None => Some(Path::new(&torrent.save_path).join(&torrent.name)),
	}
}

pub async fn run<T: Transport, M: Migration>(
	session: &mut Session<T>,
	config: &MoverConfig,
	migration: &mut M,
	dry_run: bool,
) -> Result<HoldReport> {
	prepare(session).await?;
	let snapshot = fetch_all(session, &FIELDS).await?;

	let mut report = HoldReport::new(WORKFLOW, dry_run, snapshot.len());
	report.selected = select(&snapshot, config, now_epoch());
	report.hold_secs = config.settle_secs.saturating_add(config.quiet_secs);
	info!(
		target = "deluge.mover",
		window = %config.window(),
		selected = report.selected.len(),
		torrents = snapshot.len(),
		"selected torrents"
	);

	if report.selected.is_empty() || dry_run {
		return Ok(report);
	}

	let plan = HoldPlan {
		settle: config.settle(),
		migration: Some(migration),
		quiet: config.quiet(),
		fail_on_error: config.fail_on_error,
	};
	hold(session, &mut report, plan).await?;
	Ok(report)
}
