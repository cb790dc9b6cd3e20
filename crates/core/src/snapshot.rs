//! Fetching the current torrent set.

use std::collections::BTreeMap;

use deluge_protocol::method::WEB_UPDATE_UI;
use deluge_protocol::{Torrent, TorrentField};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::Transport;

/// Torrents keyed by info-hash, in stable hash order.
pub type Snapshot = BTreeMap<String, Torrent>;

/// Fetches every torrent with the requested `fields`.
///
/// An empty listing is an empty snapshot, not an error.
///
/// # Errors
///
/// [`Error::Snapshot`] when the reply lacks the `torrents` structure.
pub async fn fetch_all<T: Transport>(session: &mut Session<T>, fields: &[TorrentField]) -> Result<Snapshot> {
	let field_names: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
	let result: Value = session
		.request(WEB_UPDATE_UI, vec![json!(field_names), Value::Object(Map::new())])
		.await?;

	let snapshot = parse_snapshot(result)?;
	debug!(target = "deluge.snapshot", torrents = snapshot.len(), "fetched torrent snapshot");
	Ok(snapshot)
}

/// Extracts the torrent map from a `web.update_ui` result.
pub fn parse_snapshot(result: Value) -> Result<Snapshot> {
	let Value::Object(mut payload) = result else {
		return Err(Error::Snapshot(format!("expected an object, got {result}")));
	};

	match payload.remove("torrents") {
		Some(Value::Object(rows)) => rows
			.into_iter()
			.map(|(id, row)| {
				let torrent: Torrent =
					serde_json::from_value(row).map_err(|e| Error::Snapshot(format!("torrent {id}: {e}")))?;
				Ok((id.clone(), torrent.with_id(id)))
			})
			.collect(),
		Some(Value::Null) => Err(Error::Snapshot(
			"torrent list is null; the WebUI is likely not connected to the daemon".to_string(),
		)),
		Some(other) => Err(Error::Snapshot(format!("torrents is not an object: {other}"))),
		None => Err(Error::Snapshot("reply has no torrents entry".to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fake_transport::{FakeReply, FakeTransportBuilder};

	#[test]
	fn empty_listing_is_empty_snapshot() {
		let snapshot = parse_snapshot(json!({"torrents": {}, "connected": true})).unwrap();
		assert!(snapshot.is_empty());
	}

	#[test]
	fn rows_are_keyed_and_tagged_with_hash() {
		let snapshot = parse_snapshot(json!({
			"torrents": {
				"bbb": {"name": "B", "tracker": "https://t/announce", "label": ""},
				"aaa": {"name": "A", "tracker": "", "label": "imported"}
			}
		}))
		.unwrap();
		let ids: Vec<&str> = snapshot.keys().map(String::as_str).collect();
		assert_eq!(ids, vec!["aaa", "bbb"]);
		assert_eq!(snapshot["bbb"].id, "bbb");
		assert_eq!(snapshot["aaa"].label, "imported");
	}

	#[test]
	fn malformed_structures_are_snapshot_errors() {
		assert!(matches!(parse_snapshot(json!(null)), Err(Error::Snapshot(_))));
		assert!(matches!(parse_snapshot(json!({"stats": {}})), Err(Error::Snapshot(_))));
		assert!(matches!(parse_snapshot(json!({"torrents": null})), Err(Error::Snapshot(_))));
		assert!(matches!(parse_snapshot(json!({"torrents": []})), Err(Error::Snapshot(_))));
		assert!(matches!(
			parse_snapshot(json!({"torrents": {"x": "not a row"}})),
			Err(Error::Snapshot(_))
		));
	}

	#[tokio::test]
	async fn requests_fields_and_empty_filter() {
		let (transport, controller) = FakeTransportBuilder::new()
			.always("web.update_ui", FakeReply::result(json!({"torrents": {}})))
			.build();
		let mut session = Session::new(transport, "deluged");

		let snapshot = fetch_all(&mut session, &[TorrentField::Name, TorrentField::Tracker, TorrentField::Label])
			.await
			.unwrap();
		assert!(snapshot.is_empty());

		let sent = controller.sent_for("web.update_ui");
		assert_eq!(sent[0].params, vec![json!(["name", "tracker", "label"]), json!({})]);
	}
}
