//! Daemon host rows from `web.get_hosts` and `web.get_host_status`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A daemon known to the web front-end's connection manager.
///
/// On the wire this is a positional array: `[id, host, port, username]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct HostEntry {
	pub id: String,
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
}

impl TryFrom<Vec<Value>> for HostEntry {
	type Error = String;

	fn try_from(row: Vec<Value>) -> Result<Self, Self::Error> {
		let id = row
			.first()
			.and_then(Value::as_str)
			.ok_or_else(|| format!("host row without id: {row:?}"))?
			.to_string();
		let host = row.get(1).and_then(Value::as_str).unwrap_or_default().to_string();
		let port = row
			.get(2)
			.and_then(Value::as_u64)
			.and_then(|p| u16::try_from(p).ok())
			.unwrap_or_default();
		let username = row.get(3).and_then(Value::as_str).map(str::to_string);
		Ok(Self { id, host, port, username })
	}
}

impl std::fmt::Display for HostEntry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{} ({})", self.host, self.port, self.id)
	}
}

/// Connection state reported for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
	/// Daemon reachable and free to connect.
	Online,
	/// Daemon unreachable.
	Offline,
	/// The front-end is already bound to this daemon.
	Connected,
	Unknown,
}

impl HostState {
	pub fn parse(status: &str) -> Self {
		match status {
			"Online" => HostState::Online,
			"Offline" => HostState::Offline,
			"Connected" => HostState::Connected,
			_ => HostState::Unknown,
		}
	}
}

/// Reply of `web.get_host_status`: `[id, status, version]`.
///
/// Older web front-ends interleave host and port before the status, so the
/// status is taken as the first recognised state string after the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct HostStatus {
	pub id: String,
	pub state: HostState,
	pub version: Option<String>,
}

impl TryFrom<Vec<Value>> for HostStatus {
	type Error = String;

	fn try_from(row: Vec<Value>) -> Result<Self, Self::Error> {
		let id = row
			.first()
			.and_then(Value::as_str)
			.ok_or_else(|| format!("host status without id: {row:?}"))?
			.to_string();

		let mut state = HostState::Unknown;
		let mut state_index = None;
		for (index, value) in row.iter().enumerate().skip(1) {
			if let Some(parsed) = value.as_str().map(HostState::parse).filter(|s| *s != HostState::Unknown) {
				state = parsed;
				state_index = Some(index);
				break;
			}
		}

		let version = state_index
			.and_then(|index| row.get(index + 1))
			.and_then(Value::as_str)
			.filter(|v| !v.is_empty())
			.map(str::to_string);

		Ok(Self { id, state, version })
	}
}
