//! Wire types for the Deluge web JSON-RPC protocol.
//!
//! This crate contains the serde-serializable types exchanged with the
//! Deluge web front-end at its `/json` endpoint. These types represent the
//! "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and lookups
//! * 1:1 with protocol: Match what `deluge-web` actually sends and accepts
//! * Stable: Changes only when the wire protocol changes
//!
//! Session handling, retries and classification are built on top of these
//! types in `deluge-rs`.

pub mod host;
pub mod rpc;
pub mod torrent;

pub use host::*;
pub use rpc::*;
pub use torrent::*;
