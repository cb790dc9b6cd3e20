//! Session-authenticated RPC calls.
//!
//! [`Session`] owns the cookie issued by the web front-end. Every call
//! carries it, every decoded reply may rotate it, and a reply saying the
//! session is not authenticated triggers exactly one login-and-retry cycle.
//! All other RPC errors are handed back unchanged for the caller to
//! interpret.

use std::time::Duration;

use deluge_protocol::RpcResponse;
use deluge_protocol::method::{AUTH_DELETE_SESSION, AUTH_LOGIN};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::transport::{HttpTransport, Transport, new_request};

/// Sequential RPC session over one transport.
///
/// Calls take `&mut self`, so a session can never have two calls in flight.
/// [`Session::close`] consumes the session and releases the transport.
pub struct Session<T: Transport = HttpTransport> {
	transport: T,
	password: String,
	cookie: Option<String>,
}

impl Session<HttpTransport> {
	/// Opens an HTTP session against `endpoint`. No request is made yet.
	pub fn connect(endpoint: &str, password: impl Into<String>, timeout: Duration) -> Result<Self> {
		Ok(Self::new(HttpTransport::new(endpoint, timeout)?, password))
	}
}

impl<T: Transport> Session<T> {
	/// Wraps `transport`; `password` is used for the initial and any later login.
	pub fn new(transport: T, password: impl Into<String>) -> Self {
		Self {
			transport,
			password: password.into(),
			cookie: None,
		}
	}

	/// Endpoint the session talks to.
	pub fn endpoint(&self) -> &str {
		self.transport.endpoint()
	}

	/// Whether a session cookie is currently held.
	pub fn is_authenticated(&self) -> bool {
		self.cookie.is_some()
	}

	/// Performs `auth.login` without the retry path.
	///
	/// # Errors
	///
	/// Returns [`Error::LoginRejected`] when the server answers `false`, and
	/// [`Error::Rpc`] for an error envelope.
	pub async fn login(&mut self) -> Result<()> {
		info!(target = "deluge.session", endpoint = %self.transport.endpoint(), "connecting to Deluge");

		let password = self.password.clone();
		let response = self.exchange(AUTH_LOGIN, &[json!(password)]).await?;
		let accepted: bool = into_result(AUTH_LOGIN, response)?;
		if !accepted {
			return Err(Error::LoginRejected);
		}

		debug!(target = "deluge.session", has_cookie = self.cookie.is_some(), "login accepted");
		Ok(())
	}

	/// Issues `method` with `params`, re-authenticating once on session loss.
	///
	/// The returned envelope may still carry an RPC error; only the
	/// not-authenticated case is handled here.
	///
	/// # Errors
	///
	/// Transport and decode failures propagate. [`Error::ReauthenticationFailed`]
	/// is returned when the re-login yields no cookie or the retried call is
	/// still not authenticated.
	pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<RpcResponse> {
		let response = self.exchange(method, &params).await?;
		if !response.is_auth_failure() {
			return Ok(response);
		}

		warn!(target = "deluge.session", %method, "session rejected; logging in again");
		self.cookie = None;

		let password = self.password.clone();
		let login = self.exchange(AUTH_LOGIN, &[json!(password)]).await?;
		if self.cookie.is_none() {
			debug!(target = "deluge.session", error = ?login.error, "re-login yielded no cookie");
			return Err(Error::ReauthenticationFailed);
		}

		let retried = self.exchange(method, &params).await?;
		if retried.is_auth_failure() {
			self.cookie = None;
			return Err(Error::ReauthenticationFailed);
		}
		Ok(retried)
	}

	/// Calls `method` and deserializes its result.
	///
	/// # Errors
	///
	/// Error envelopes become [`Error::Rpc`]; a result of the wrong shape
	/// becomes [`Error::Decode`].
	pub async fn request<R: DeserializeOwned>(&mut self, method: &str, params: Vec<Value>) -> Result<R> {
		let response = self.call(method, params).await?;
		into_result(method, response)
	}

	/// Ends the server-side session and releases the transport.
	///
	/// Failures are logged, not returned: closing runs on error paths too.
	pub async fn close(mut self) {
		if self.cookie.is_some() {
			match self.exchange(AUTH_DELETE_SESSION, &[]).await {
				Ok(response) if response.error.is_none() => {
					debug!(target = "deluge.session", "server session deleted");
				}
				Ok(response) => {
					debug!(target = "deluge.session", error = ?response.error, "server refused to delete session");
				}
				Err(err) => {
					debug!(target = "deluge.session", error = %err, "failed to delete server session");
				}
			}
		}
		self.cookie = None;
		self.transport.close();
		debug!(target = "deluge.session", "session closed");
	}

	/// One exchange with the current cookie, capturing any rotated cookie.
	async fn exchange(&mut self, method: &str, params: &[Value]) -> Result<RpcResponse> {
		let request = new_request(method, params.to_vec());
		let reply = self.transport.send(&request, self.cookie.as_deref()).await?;
		if let Some(cookie) = reply.set_cookie {
			self.cookie = Some(cookie);
		}
		Ok(reply.response)
	}
}

/// Converts an envelope into a typed result.
pub fn into_result<R: DeserializeOwned>(method: &str, response: RpcResponse) -> Result<R> {
	if let Some(error) = response.error {
		return Err(Error::Rpc {
			method: method.to_string(),
			code: error.code,
			message: error.message,
		});
	}

	let result = response.result.unwrap_or(Value::Null);
	serde_json::from_value(result).map_err(|e| Error::Decode {
		method: method.to_string(),
		reason: format!("unexpected result shape: {e}"),
	})
}
