//! Labeling workflow.
//!
//! All three passes are planned from one frozen snapshot before any label is
//! changed, so the result does not depend on the order of mutations.

use std::collections::BTreeSet;

use deluge::protocol::method::{LABEL_REMOVE, LABEL_SET_TORRENT};
use deluge::protocol::{Torrent, TorrentField};
use deluge::{ClassifyMode, Classifier, Session, Snapshot, Transport, fetch_all};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{CommandContext, aborts_batch, close_with, prepare};
use crate::cli::LabelArgs;
use crate::config::LabelerConfig;
use crate::error::Result;
use crate::output::{ActionStatus, LabelChange, LabelPass, LabelRemoval, LabelReport};

const FIELDS: [TorrentField; 4] = [
	TorrentField::Name,
	TorrentField::Tracker,
	TorrentField::Trackers,
	TorrentField::Label,
];

pub async fn execute(ctx: &CommandContext, args: LabelArgs) -> Result<LabelReport> {
	let mut session = ctx.open_session()?;
	let outcome = run(&mut session, &ctx.config.labeler, args.dry_run).await;
	close_with(session, outcome).await
}

/// Eligible torrents per mode, in evaluation order.
pub fn plan<'a>(classifier: &Classifier, snapshot: &'a Snapshot) -> Vec<(ClassifyMode, Vec<&'a Torrent>)> {
	ClassifyMode::ALL
		.into_iter()
		.map(|mode| (mode, classifier.eligible(snapshot, mode)))
		.collect()
}

pub async fn run<T: Transport>(session: &mut Session<T>, config: &LabelerConfig, dry_run: bool) -> Result<LabelReport> {
	let classifier = Classifier::new(config.policy.clone())?;
	prepare(session).await?;
	let snapshot = fetch_all(session, &FIELDS).await?;

	let mut report = LabelReport {
		dry_run,
		torrents: snapshot.len(),
		passes: Vec::with_capacity(ClassifyMode::ALL.len()),
		removed_labels: Vec::new(),
	};

	for (mode, eligible) in plan(&classifier, &snapshot) {
		let label = mode.target_label();
		info!(target = "deluge.label", mode = %mode, eligible = eligible.len(), "classified torrents");

		let mut pass = LabelPass {
			mode,
			label: label.to_string(),
			changes: Vec::with_capacity(eligible.len()),
		};
		for torrent in eligible {
			let result = if dry_run {
				Ok(())
			} else {
				set_label(session, &torrent.id, label).await
			};
			let status = ActionStatus::from_result(dry_run, &result);
			let error = match result {
				Ok(()) => None,
				Err(err) if aborts_batch(&err) => return Err(err.into()),
				Err(err) => {
					warn!(target = "deluge.label", id = %torrent.id, error = %err, "label not applied");
					Some(err.to_string())
				}
			};

			debug!(target = "deluge.label", name = %torrent.name, from = %torrent.label, to = label, "label change");
			pass.changes.push(LabelChange {
				id: torrent.id.clone(),
				name: torrent.name.clone(),
				from: torrent.label.clone(),
				to: label.to_string(),
				trackers: torrent.trackers.clone(),
				status,
				error,
			});
		}
		report.passes.push(pass);
	}

	for label in stale_labels(&classifier, &snapshot, &config.remove_labels) {
		let result = if dry_run {
			Ok(())
		} else {
			session.request::<Value>(LABEL_REMOVE, vec![json!(label)]).await.map(|_| ())
		};
		let status = ActionStatus::from_result(dry_run, &result);
		let error = match result {
			Ok(()) => None,
			Err(err) if err.is_session_fatal() => return Err(err.into()),
			Err(err) => {
				warn!(target = "deluge.label", label, error = %err, "label not removed");
				Some(err.to_string())
			}
		};
		report.removed_labels.push(LabelRemoval {
			label: label.to_string(),
			status,
			error,
		});
	}

	info!(
		target = "deluge.label",
		torrents = report.torrents,
		mutations = report.mutation_count(),
		dry_run,
		"labeling finished"
	);
	Ok(report)
}

/// Configured legacy labels still carried by some torrent.
///
/// Labels owned by an upstream integration stay in place: removing one would
/// clear the torrent's label and make it a candidate again on the next run.
fn stale_labels<'a>(classifier: &Classifier, snapshot: &Snapshot, configured: &'a [String]) -> Vec<&'a str> {
	let present: BTreeSet<&str> = snapshot.values().map(|t| t.label.as_str()).collect();
	configured
		.iter()
		.map(String::as_str)
		.filter(|label| present.contains(label) && !classifier.is_externally_managed(label))
		.collect()
}

async fn set_label<T: Transport>(session: &mut Session<T>, id: &str, label: &str) -> deluge::Result<()> {
	session
		.request::<Value>(LABEL_SET_TORRENT, vec![json!(id), json!(label)])
		.await
		.map(|_| ())
}
