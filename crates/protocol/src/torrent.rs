//! Torrent rows as returned by `web.update_ui`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Torrent status keys that can be requested from `web.update_ui`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TorrentField {
	Name,
	Tracker,
	Trackers,
	Label,
	TimeAdded,
	SavePath,
	Progress,
}

impl TorrentField {
	pub fn as_str(self) -> &'static str {
		match self {
			TorrentField::Name => "name",
			TorrentField::Tracker => "tracker",
			TorrentField::Trackers => "trackers",
			TorrentField::Label => "label",
			TorrentField::TimeAdded => "time_added",
			TorrentField::SavePath => "save_path",
			TorrentField::Progress => "progress",
		}
	}
}

impl std::fmt::Display for TorrentField {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One managed torrent.
///
/// `id` is the info-hash; it is the key of the `torrents` map on the wire and
/// is filled in by the snapshot fetcher. Fields that were not requested
/// deserialize to their empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TorrentRow")]
pub struct Torrent {
	pub id: String,
	pub name: String,
	pub trackers: Vec<String>,
	pub label: String,
	pub time_added: Option<i64>,
	pub save_path: String,
	pub progress: f64,
}

impl Torrent {
	/// Returns a copy keyed by `id`.
	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = id.into();
		self
	}
}

/// Raw row shape. Deluge reports the current tracker as a `tracker` string
/// and the full tracker list as `trackers` (strings or `{url, tier}` objects).
#[derive(Debug, Default, Deserialize)]
struct TorrentRow {
	#[serde(default)]
	id: Option<String>,
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	tracker: Option<Value>,
	#[serde(default)]
	trackers: Option<Value>,
	#[serde(default)]
	label: Option<String>,
	#[serde(default)]
	time_added: Option<Value>,
	#[serde(default)]
	save_path: Option<String>,
	#[serde(default)]
	progress: Option<f64>,
}

impl From<TorrentRow> for Torrent {
	fn from(row: TorrentRow) -> Self {
		let mut trackers = Vec::new();
		collect_trackers(row.tracker.as_ref(), &mut trackers);
		collect_trackers(row.trackers.as_ref(), &mut trackers);

		Self {
			id: row.id.unwrap_or_default(),
			name: row.name.unwrap_or_default(),
			trackers,
			label: row.label.unwrap_or_default(),
			time_added: row.time_added.as_ref().and_then(epoch_seconds),
			save_path: row.save_path.unwrap_or_default(),
			progress: row.progress.unwrap_or_default(),
		}
	}
}

fn collect_trackers(value: Option<&Value>, out: &mut Vec<String>) {
	match value {
		Some(Value::String(url)) => push_tracker(url, out),
		Some(Value::Array(items)) => {
			for item in items {
				match item {
					Value::String(url) => push_tracker(url, out),
					Value::Object(map) => {
						if let Some(Value::String(url)) = map.get("url") {
							push_tracker(url, out);
						}
					}
					_ => {}
				}
			}
		}
		_ => {}
	}
}

fn push_tracker(url: &str, out: &mut Vec<String>) {
	let url = url.trim();
	if !url.is_empty() && !out.iter().any(|existing| existing == url) {
		out.push(url.to_string());
	}
}

fn epoch_seconds(value: &Value) -> Option<i64> {
	match value {
		Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
		_ => None,
	}
}
