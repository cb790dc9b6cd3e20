//! deluge-tools: labeling, mover and pauser workflows for a Deluge daemon.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
