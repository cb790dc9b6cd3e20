//! HTTP transport for the Deluge web JSON-RPC endpoint.
//!
//! A transport performs exactly one request/response exchange per call:
//! it posts the JSON body, attaches the session cookie when one is given, and
//! returns the decoded envelope together with the `Set-Cookie` token the
//! server sent back. It never retries and never interprets RPC errors; that
//! is the session's job.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use deluge_protocol::{RpcRequest, RpcResponse};
use rand::Rng;
use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use serde_json::Value;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};

/// Decoded reply of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportReply {
	pub response: RpcResponse,
	/// Session token from `Set-Cookie`, already cut at the first `;`.
	pub set_cookie: Option<String>,
}

/// One request/response exchange with the web front-end.
pub trait Transport: Send {
	/// Sends `request`, attaching `cookie` as the `Cookie` header when present.
	fn send<'a>(
		&'a mut self,
		request: &'a RpcRequest,
		cookie: Option<&'a str>,
	) -> Pin<Box<dyn Future<Output = Result<TransportReply>> + Send + 'a>>;

	/// Endpoint description used in logs and errors.
	fn endpoint(&self) -> &str;

	/// Releases the underlying connection resources.
	fn close(&mut self);
}

/// Builds a request with a fresh random correlation id.
pub fn new_request(method: &str, params: Vec<Value>) -> RpcRequest {
	let id = rand::rng().random_range(0..=0x7FFF_FFFF_u32);
	RpcRequest::new(method, params, id)
}

/// Keeps only the token part of a `Set-Cookie` header value.
pub fn session_token(set_cookie: &str) -> Option<String> {
	let token = set_cookie.split(';').next().unwrap_or_default().trim();
	(!token.is_empty()).then(|| token.to_string())
}

/// Parses a response body into an envelope.
///
/// The body must be a JSON object with a `result` or an `error` key;
/// anything else is a [`Error::Decode`], never an empty result.
pub fn decode_envelope(method: &str, body: &[u8]) -> Result<RpcResponse> {
	let decode_err = |reason: String| Error::Decode {
		method: method.to_string(),
		reason,
	};

	let value: Value = serde_json::from_slice(body).map_err(|e| decode_err(format!("non-JSON body: {e}")))?;
	let Value::Object(map) = &value else {
		return Err(decode_err(format!("expected a JSON object, got {value}")));
	};
	if !map.contains_key("result") && !map.contains_key("error") {
		return Err(decode_err("envelope has neither result nor error".to_string()));
	}

	serde_json::from_value(value).map_err(|e| decode_err(e.to_string()))
}

/// [`Transport`] over `reqwest`.
pub struct HttpTransport {
	client: Option<reqwest::Client>,
	endpoint: Url,
	endpoint_str: String,
}

impl HttpTransport {
	/// Creates a transport for `endpoint` (the web UI's `/json` URL).
	pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
		let url = Url::parse(endpoint).map_err(|_| Error::InvalidEndpoint(endpoint.to_string()))?;
		if !matches!(url.scheme(), "http" | "https") {
			return Err(Error::InvalidEndpoint(endpoint.to_string()));
		}

		let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| Error::Transport {
			endpoint: endpoint.to_string(),
			message: format!("Failed to create HTTP client: {e}"),
		})?;

		Ok(Self {
			client: Some(client),
			endpoint_str: url.to_string(),
			endpoint: url,
		})
	}

	fn transport_err(&self, message: impl std::fmt::Display) -> Error {
		Error::Transport {
			endpoint: self.endpoint_str.clone(),
			message: message.to_string(),
		}
	}
}

impl Transport for HttpTransport {
	fn send<'a>(
		&'a mut self,
		request: &'a RpcRequest,
		cookie: Option<&'a str>,
	) -> Pin<Box<dyn Future<Output = Result<TransportReply>> + Send + 'a>> {
		Box::pin(async move {
			let client = self.client.as_ref().ok_or_else(|| self.transport_err("transport already closed"))?;

			let mut builder = client
				.post(self.endpoint.clone())
				.header(CONTENT_TYPE, "application/json")
				.json(request);
			if let Some(cookie) = cookie {
				builder = builder.header(COOKIE, cookie);
			}

			trace!(target = "deluge.rpc", method = %request.method, id = request.id, "sending request");

			let response = builder.send().await.map_err(|e| self.transport_err(e))?;
			let response = response.error_for_status().map_err(|e| self.transport_err(e))?;

			let set_cookie = response
				.headers()
				.get(SET_COOKIE)
				.and_then(|value| value.to_str().ok())
				.and_then(session_token);

			let body = response.bytes().await.map_err(|e| self.transport_err(e))?;
			let response = decode_envelope(&request.method, &body)?;

			Ok(TransportReply { response, set_cookie })
		})
	}

	fn endpoint(&self) -> &str {
		&self.endpoint_str
	}

	fn close(&mut self) {
		self.client = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn request_ids_stay_in_positive_i32_range() {
		for _ in 0..64 {
			let request = new_request("web.connected", vec![]);
			assert!(request.id <= 0x7FFF_FFFF);
		}
	}

	#[test]
	fn session_token_keeps_first_segment() {
		assert_eq!(
			session_token("_session_id=abc123; Expires=Tue, 01 Jan 2030 00:00:00 GMT; Path=/json").as_deref(),
			Some("_session_id=abc123")
		);
		assert_eq!(session_token("_session_id=abc123").as_deref(), Some("_session_id=abc123"));
		assert_eq!(session_token("  ; Path=/"), None);
	}

	#[test]
	fn envelope_with_result_decodes() {
		let response = decode_envelope("web.connected", br#"{"result": false, "error": null, "id": 3}"#).unwrap();
		assert_eq!(response.result, Some(json!(false)));
	}

	#[test]
	fn non_json_body_is_decode_error() {
		let err = decode_envelope("web.connected", b"<html>502</html>").unwrap_err();
		assert!(matches!(err, Error::Decode { ref method, .. } if method == "web.connected"));
	}

	#[test]
	fn object_without_envelope_keys_is_decode_error() {
		let err = decode_envelope("web.update_ui", br#"{"torrents": {}}"#).unwrap_err();
		assert!(matches!(err, Error::Decode { .. }));
		let err = decode_envelope("web.update_ui", b"[1, 2]").unwrap_err();
		assert!(matches!(err, Error::Decode { .. }));
	}

	#[test]
	fn rejects_non_http_endpoint() {
		assert!(matches!(
			HttpTransport::new("ftp://127.0.0.1/json", Duration::from_secs(1)),
			Err(Error::InvalidEndpoint(_))
		));
		assert!(matches!(
			HttpTransport::new("not a url", Duration::from_secs(1)),
			Err(Error::InvalidEndpoint(_))
		));
	}

	#[tokio::test]
	async fn closed_transport_refuses_to_send() {
		let mut transport = HttpTransport::new("http://127.0.0.1:8112/json", Duration::from_secs(1)).unwrap();
		transport.close();
		let request = new_request("web.connected", vec![]);
		let err = transport.send(&request, None).await.unwrap_err();
		assert!(matches!(err, Error::Transport { .. }));
	}
}
