//! Side-effecting host helpers used by the deluge-tools workflows.
//!
//! - [`process`]: locating and running the external storage mover
//! - [`cache`]: checking whether a torrent's payload sits under a cache root

pub mod cache;
pub mod error;
pub mod process;

pub use cache::CacheProbe;
pub use error::{Error, Result};
pub use process::{Migration, MigrationOutcome, ShellMigration};
