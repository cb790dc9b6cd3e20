//! JSON-RPC request/response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method names consumed by this workspace.
pub mod method {
	pub const AUTH_LOGIN: &str = "auth.login";
	pub const AUTH_DELETE_SESSION: &str = "auth.delete_session";
	pub const WEB_CONNECTED: &str = "web.connected";
	pub const WEB_GET_HOSTS: &str = "web.get_hosts";
	pub const WEB_GET_HOST_STATUS: &str = "web.get_host_status";
	pub const WEB_CONNECT: &str = "web.connect";
	pub const WEB_DISCONNECT: &str = "web.disconnect";
	pub const WEB_UPDATE_UI: &str = "web.update_ui";
	pub const CORE_PAUSE_TORRENT: &str = "core.pause_torrent";
	pub const CORE_RESUME_TORRENT: &str = "core.resume_torrent";
	pub const LABEL_SET_TORRENT: &str = "label.set_torrent";
	pub const LABEL_REMOVE: &str = "label.remove";
}

/// Request body posted to the web front-end.
///
/// ```json
/// { "method": "label.set_torrent", "params": ["<hash>", "limiter"], "id": 1804289383 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
	/// Method name to invoke
	pub method: String,
	/// Positional parameters
	pub params: Vec<Value>,
	/// Correlation id; not checked against the response
	pub id: u32,
}

impl RpcRequest {
	pub fn new(method: impl Into<String>, params: Vec<Value>, id: u32) -> Self {
		Self {
			method: method.into(),
			params,
			id,
		}
	}
}

/// Response envelope returned by the web front-end.
///
/// Success:
/// ```json
/// { "result": true, "error": null, "id": 1804289383 }
/// ```
///
/// Failure:
/// ```json
/// { "result": null, "error": { "message": "Not authenticated", "code": 1 }, "id": 1804289383 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
	#[serde(default)]
	pub result: Option<Value>,
	#[serde(default)]
	pub error: Option<RpcErrorPayload>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<Value>,
}

impl RpcResponse {
	/// Builds a success envelope.
	pub fn success(result: Value) -> Self {
		Self {
			result: Some(result),
			error: None,
			id: None,
		}
	}

	/// Builds an error envelope.
	pub fn failure(code: i64, message: impl Into<String>) -> Self {
		Self {
			result: None,
			error: Some(RpcErrorPayload {
				code,
				message: message.into(),
			}),
			id: None,
		}
	}

	/// Returns the error code classification, if this is an error envelope.
	pub fn error_code(&self) -> Option<ErrorCode> {
		self.error.as_ref().map(|e| ErrorCode::from_code(e.code))
	}

	/// `true` when the server rejected the call because the session is not authenticated.
	pub fn is_auth_failure(&self) -> bool {
		self.error_code() == Some(ErrorCode::NoAuth)
	}
}

/// Error payload inside a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorPayload {
	#[serde(default)]
	pub message: String,
	pub code: i64,
}

/// Error codes sent by `deluge-web`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
	NoAuth,
	BadMethod,
	CallError,
	RpcFailure,
	BadJson,
	Other(i64),
}

impl ErrorCode {
	pub fn from_code(code: i64) -> Self {
		match code {
			1 => ErrorCode::NoAuth,
			2 => ErrorCode::BadMethod,
			3 => ErrorCode::CallError,
			4 => ErrorCode::RpcFailure,
			5 => ErrorCode::BadJson,
			other => ErrorCode::Other(other),
		}
	}

	pub fn code(self) -> i64 {
		match self {
			ErrorCode::NoAuth => 1,
			ErrorCode::BadMethod => 2,
			ErrorCode::CallError => 3,
			ErrorCode::RpcFailure => 4,
			ErrorCode::BadJson => 5,
			ErrorCode::Other(code) => code,
		}
	}
}
