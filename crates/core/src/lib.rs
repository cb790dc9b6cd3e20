//! Client for the Deluge web JSON-RPC interface.
//!
//! The crate is layered leaves first:
//!
//! - [`transport`]: one HTTP POST per call, carrying the session cookie
//! - [`session`]: owns the cookie and re-authenticates once on session loss
//! - [`connectivity`]: binds the web front-end to a daemon host
//! - [`snapshot`]: fetches the current torrent set
//! - [`classify`]: pure label rules over one torrent
//! - [`age`]: the time-added window used by the mover
//!
//! [`fake_transport`] provides a scripted in-memory transport for tests.

pub mod age;
pub mod classify;
pub mod connectivity;
pub mod error;
pub mod fake_transport;
pub mod session;
pub mod snapshot;
pub mod transport;

pub use age::{AgeWindow, now_epoch};
pub use classify::{ClassifyMode, Classifier, Decision, LabelPolicy, NamePatterns, SkipReason};
pub use connectivity::{Connectivity, ensure_connected};
pub use deluge_protocol as protocol;
pub use error::{Error, Result};
pub use session::Session;
pub use snapshot::{Snapshot, fetch_all};
pub use transport::{HttpTransport, Transport, TransportReply};
