//! Binding the web front-end to a daemon.
//!
//! The web UI is only a proxy: until it is connected to a daemon host, every
//! torrent call fails. [`ensure_connected`] checks the binding and, when it is
//! missing, walks the connection manager's host list to establish one.

use deluge_protocol::method::{WEB_CONNECT, WEB_CONNECTED, WEB_DISCONNECT, WEB_GET_HOST_STATUS, WEB_GET_HOSTS};
use deluge_protocol::{HostEntry, HostState, HostStatus};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::Transport;

/// How the binding was established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connectivity {
	/// The front-end was already bound to a daemon.
	AlreadyConnected,
	/// The front-end was bound to `host` during this call.
	Connected { host: HostEntry },
}

/// Ensures the web front-end is bound to a daemon.
///
/// Hosts that report `Connected` are disconnected first and then treated as
/// candidates; `Online` hosts are candidates; anything else is skipped.
/// Candidates are tried in listing order until `web.connected` confirms.
///
/// # Errors
///
/// [`Error::Connectivity`] when no candidate could be bound. Session-level
/// failures propagate unchanged.
pub async fn ensure_connected<T: Transport>(session: &mut Session<T>) -> Result<Connectivity> {
	if session.request::<bool>(WEB_CONNECTED, vec![]).await? {
		debug!(target = "deluge.connect", "web UI already connected to a daemon");
		return Ok(Connectivity::AlreadyConnected);
	}

	let hosts: Vec<HostEntry> = session.request(WEB_GET_HOSTS, vec![]).await?;
	if hosts.is_empty() {
		return Err(Error::Connectivity("no daemon hosts are configured in the connection manager".to_string()));
	}

	let mut candidates = Vec::new();
	for host in hosts {
		let status = match session.request::<HostStatus>(WEB_GET_HOST_STATUS, vec![json!(host.id)]).await {
			Ok(status) => status,
			Err(err @ Error::Rpc { .. }) => {
				warn!(target = "deluge.connect", host = %host, error = %err, "host status unavailable; skipping");
				continue;
			}
			Err(err) => return Err(err),
		};

		match status.state {
			HostState::Connected => {
				info!(target = "deluge.connect", host = %host, "host reports a stale connection; disconnecting");
				session.request::<Value>(WEB_DISCONNECT, vec![]).await?;
				candidates.push(host);
			}
			HostState::Online => candidates.push(host),
			HostState::Offline | HostState::Unknown => {
				debug!(target = "deluge.connect", host = %host, state = ?status.state, "host not available");
			}
		}
	}

	for host in candidates {
		match session.request::<Value>(WEB_CONNECT, vec![json!(host.id)]).await {
			Ok(_) => {}
			Err(err @ Error::Rpc { .. }) => {
				warn!(target = "deluge.connect", host = %host, error = %err, "connect failed; trying next host");
				continue;
			}
			Err(err) => return Err(err),
		}

		if session.request::<bool>(WEB_CONNECTED, vec![]).await? {
			info!(target = "deluge.connect", host = %host, "web UI connected to daemon");
			return Ok(Connectivity::Connected { host });
		}
		warn!(target = "deluge.connect", host = %host, "connect accepted but web UI still disconnected");
	}

	Err(Error::Connectivity(
		"no daemon host could be connected; open the WebUI connection manager to resolve this".to_string(),
	))
}
