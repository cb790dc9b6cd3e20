//! Fake transport for unit testing session handling and workflows.
//!
//! Replies are scripted per method: queued replies are consumed first, then
//! a sticky default for the method applies, and an unscripted method answers
//! with an "Unknown method" error envelope. Every request is recorded with
//! the cookie it carried.
//!
//! # Example
//!
//! ```ignore
//! let (transport, controller) = FakeTransportBuilder::new()
//!     .always("auth.login", FakeReply::result(json!(true)).with_cookie("_session_id=1"))
//!     .always("web.connected", FakeReply::result(json!(true)))
//!     .build();
//! let mut session = Session::new(transport, "deluged");
//! session.login().await?;
//! assert_eq!(controller.calls("auth.login"), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use deluge_protocol::{ErrorCode, RpcRequest, RpcResponse};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportReply, decode_envelope, session_token};

const FAKE_ENDPOINT: &str = "fake://deluge/json";

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum FakeReply {
	/// A decoded envelope, optionally with a `Set-Cookie` header value.
	Envelope {
		response: RpcResponse,
		set_cookie: Option<String>,
	},
	/// A raw body run through envelope decoding.
	Body(String),
	/// The request never reached the server.
	NetworkFailure(String),
}

impl FakeReply {
	pub fn result(result: Value) -> Self {
		FakeReply::Envelope {
			response: RpcResponse::success(result),
			set_cookie: None,
		}
	}

	pub fn error(code: i64, message: &str) -> Self {
		FakeReply::Envelope {
			response: RpcResponse::failure(code, message),
			set_cookie: None,
		}
	}

	/// Error envelope with the not-authenticated code.
	pub fn not_authenticated() -> Self {
		Self::error(ErrorCode::NoAuth.code(), "Not authenticated")
	}

	pub fn body(body: &str) -> Self {
		FakeReply::Body(body.to_string())
	}

	pub fn network_failure() -> Self {
		FakeReply::NetworkFailure("connection refused".to_string())
	}

	/// Attaches a raw `Set-Cookie` header value to an envelope reply.
	pub fn with_cookie(self, header: &str) -> Self {
		match self {
			FakeReply::Envelope { response, .. } => FakeReply::Envelope {
				response,
				set_cookie: Some(header.to_string()),
			},
			other => other,
		}
	}
}

/// A request observed by the fake transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SentRequest {
	pub method: String,
	pub params: Vec<Value>,
	pub id: u32,
	pub cookie: Option<String>,
}

#[derive(Default)]
struct FakeState {
	queued: HashMap<String, VecDeque<FakeReply>>,
	defaults: HashMap<String, FakeReply>,
	sent: Vec<SentRequest>,
	closed: usize,
}

impl FakeState {
	fn next_reply(&mut self, method: &str) -> FakeReply {
		if let Some(reply) = self.queued.get_mut(method).and_then(VecDeque::pop_front) {
			return reply;
		}
		self.defaults
			.get(method)
			.cloned()
			.unwrap_or_else(|| FakeReply::error(ErrorCode::BadMethod.code(), &format!("Unknown method: {method}")))
	}
}

fn lock(state: &Mutex<FakeState>) -> MutexGuard<'_, FakeState> {
	state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {
	state: FakeState,
}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues a one-shot reply for `method`.
	pub fn reply(mut self, method: &str, reply: FakeReply) -> Self {
		self.state.queued.entry(method.to_string()).or_default().push_back(reply);
		self
	}

	/// Sets the reply used for `method` once its queue is drained.
	pub fn always(mut self, method: &str, reply: FakeReply) -> Self {
		self.state.defaults.insert(method.to_string(), reply);
		self
	}

	/// Returns the transport and a controller sharing its state.
	pub fn build(self) -> (FakeTransport, FakeTransportController) {
		let state = Arc::new(Mutex::new(self.state));
		(
			FakeTransport {
				state: Arc::clone(&state),
			},
			FakeTransportController { state },
		)
	}
}

/// In-memory [`Transport`].
pub struct FakeTransport {
	state: Arc<Mutex<FakeState>>,
}

impl Transport for FakeTransport {
	fn send<'a>(
		&'a mut self,
		request: &'a RpcRequest,
		cookie: Option<&'a str>,
	) -> Pin<Box<dyn Future<Output = Result<TransportReply>> + Send + 'a>> {
		let reply = {
			let mut state = lock(&self.state);
			state.sent.push(SentRequest {
				method: request.method.clone(),
				params: request.params.clone(),
				id: request.id,
				cookie: cookie.map(str::to_string),
			});
			state.next_reply(&request.method)
		};

		Box::pin(async move {
			match reply {
				FakeReply::Envelope { response, set_cookie } => Ok(TransportReply {
					response,
					set_cookie: set_cookie.as_deref().and_then(session_token),
				}),
				FakeReply::Body(body) => Ok(TransportReply {
					response: decode_envelope(&request.method, body.as_bytes())?,
					set_cookie: None,
				}),
				FakeReply::NetworkFailure(message) => Err(Error::Transport {
					endpoint: FAKE_ENDPOINT.to_string(),
					message,
				}),
			}
		})
	}

	fn endpoint(&self) -> &str {
		FAKE_ENDPOINT
	}

	fn close(&mut self) {
		lock(&self.state).closed += 1;
	}
}

/// Controller for scripting replies and inspecting sent requests.
#[derive(Clone)]
pub struct FakeTransportController {
	state: Arc<Mutex<FakeState>>,
}

impl FakeTransportController {
	/// Queues a one-shot reply for `method`.
	pub fn push(&self, method: &str, reply: FakeReply) {
		lock(&self.state).queued.entry(method.to_string()).or_default().push_back(reply);
	}

	/// Replaces the sticky reply for `method`.
	pub fn set_default(&self, method: &str, reply: FakeReply) {
		lock(&self.state).defaults.insert(method.to_string(), reply);
	}

	/// All requests sent so far, in order.
	pub fn sent(&self) -> Vec<SentRequest> {
		lock(&self.state).sent.clone()
	}

	/// Takes all sent requests, clearing the buffer.
	pub fn take_sent(&self) -> Vec<SentRequest> {
		std::mem::take(&mut lock(&self.state).sent)
	}

	/// Sent requests for one method.
	pub fn sent_for(&self, method: &str) -> Vec<SentRequest> {
		lock(&self.state).sent.iter().filter(|r| r.method == method).cloned().collect()
	}

	/// Number of requests sent for `method`.
	pub fn calls(&self, method: &str) -> usize {
		lock(&self.state).sent.iter().filter(|r| r.method == method).count()
	}

	/// Sent method names, in order.
	pub fn methods(&self) -> Vec<String> {
		lock(&self.state).sent.iter().map(|r| r.method.clone()).collect()
	}

	/// How many times the transport was closed.
	pub fn close_count(&self) -> usize {
		lock(&self.state).closed
	}
}
