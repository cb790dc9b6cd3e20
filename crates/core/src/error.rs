//! Error types for the Deluge client.

use thiserror::Error;

/// Result alias used throughout the client.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the transport, session and fetch layers.
#[derive(Debug, Error)]
pub enum Error {
	/// The endpoint could not be reached or answered with an HTTP error.
	#[error("Failed to connect to Deluge at {endpoint}: {message}")]
	Transport { endpoint: String, message: String },

	/// The body was not JSON or not a response envelope.
	#[error("Deluge method {method} response was not a valid envelope: {reason}")]
	Decode { method: String, reason: String },

	/// The server reported an application error for the call.
	#[error("Deluge method {method} failed (code {code}): {message}")]
	Rpc { method: String, code: i64, message: String },

	/// The session was lost and logging in again did not restore it.
	#[error("Connection lost with Deluge. Reauthentication failed.")]
	ReauthenticationFailed,

	/// `auth.login` answered `false` for the configured password.
	#[error("Deluge rejected the configured password")]
	LoginRejected,

	/// The web front-end could not be bound to any daemon host.
	#[error("WebUI is not connectable to a Deluge daemon: {0}")]
	Connectivity(String),

	/// The torrent listing did not have the expected structure.
	#[error("Malformed torrent listing: {0}")]
	Snapshot(String),

	#[error("Invalid endpoint URL {0:?}")]
	InvalidEndpoint(String),

	/// A configured name pattern set could not be compiled.
	#[error("Invalid name patterns: {0}")]
	Pattern(#[from] regex_lite::Error),
}

impl Error {
	/// `true` when no further call on this session can succeed.
	///
	/// Batches treat these as aborting; any other error affects only the call
	/// that produced it.
	pub fn is_session_fatal(&self) -> bool {
		matches!(self, Error::Transport { .. } | Error::ReauthenticationFailed | Error::LoginRejected)
	}

	/// Returns the server error code for [`Error::Rpc`].
	pub fn rpc_code(&self) -> Option<i64> {
		match self {
			Error::Rpc { code, .. } => Some(*code),
			_ => None,
		}
	}
}
