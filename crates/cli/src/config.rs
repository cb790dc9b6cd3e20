//! JSON configuration file.
//!
//! Every key is optional; missing keys take the defaults of a stock Unraid
//! setup. The file lives at `$XDG_CONFIG_HOME/deluge-tools/config.json`
//! unless `--config` points elsewhere.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use deluge::{AgeWindow, LabelPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolError};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8112/json";
pub const DEFAULT_PASSWORD: &str = "deluged";

const CONFIG_DIR: &str = "deluge-tools";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Web UI JSON-RPC endpoint, ending in `/json`.
	pub endpoint: String,
	pub password: String,
	pub request_timeout_secs: u64,
	pub labeler: LabelerConfig,
	pub mover: MoverConfig,
	pub pauser: PauserConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_ENDPOINT.to_string(),
			password: DEFAULT_PASSWORD.to_string(),
			request_timeout_secs: 30,
			labeler: LabelerConfig::default(),
			mover: MoverConfig::default(),
			pauser: PauserConfig::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelerConfig {
	#[serde(flatten)]
	pub policy: LabelPolicy,
	/// Legacy labels deleted after the label passes.
	pub remove_labels: Vec<String>,
}

impl Default for LabelerConfig {
	fn default() -> Self {
		Self {
			policy: LabelPolicy::default(),
			remove_labels: [
				"sonarr.cross-seed",
				"radarr.cross-seed",
				"non-imported.cross-seed",
				"not-met.cross-seed",
				"imported.cross-seed",
				"cross-seed.cross-seed",
				"limiter.cross-seed",
			]
			.into_iter()
			.map(String::from)
			.collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoverConfig {
	pub min_age_days: u32,
	/// Zero disables the upper bound.
	pub max_age_days: u32,
	/// Only move torrents found under `cache_root`.
	pub check_cache: bool,
	pub cache_root: PathBuf,
	pub settle_secs: u64,
	pub quiet_secs: u64,
	/// Mover candidates, first existing file wins.
	pub executables: Vec<PathBuf>,
	pub args: Vec<String>,
	/// Treat a non-zero mover exit as a failed run.
	pub fail_on_error: bool,
}

impl MoverConfig {
	pub fn window(&self) -> AgeWindow {
		AgeWindow::new(self.min_age_days, self.max_age_days)
	}

	pub fn settle(&self) -> Duration {
		Duration::from_secs(self.settle_secs)
	}

	pub fn quiet(&self) -> Duration {
		Duration::from_secs(self.quiet_secs)
	}
}

impl Default for MoverConfig {
	fn default() -> Self {
		Self {
			min_age_days: 2,
			max_age_days: 5,
			check_cache: false,
			cache_root: PathBuf::from("/mnt/cache/torrents/completed"),
			settle_secs: 10,
			quiet_secs: 10,
			executables: vec![PathBuf::from("/usr/local/sbin/mover"), PathBuf::from("/usr/local/bin/mover")],
			args: vec!["start".to_string()],
			fail_on_error: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PauserConfig {
	/// Torrents whose payload is absent from here get paused.
	pub cache_root: PathBuf,
	pub hold_hours: u64,
}

impl PauserConfig {
	pub fn hold(&self) -> Duration {
		Duration::from_secs(self.hold_hours.saturating_mul(60 * 60))
	}
}

impl Default for PauserConfig {
	fn default() -> Self {
		Self {
			cache_root: PathBuf::from("/mnt/user/data/torrents/completed"),
			hold_hours: 6,
		}
	}
}

impl Config {
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
	}

	/// Loads `explicit`, or the default file when present.
	///
	/// A missing default file means all defaults; a missing explicit file is
	/// an error.
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		match explicit {
			Some(path) => Self::load_from(path),
			None => match Self::default_path() {
				Some(path) if path.is_file() => Self::load_from(&path),
				_ => Ok(Self::default()),
			},
		}
	}

	pub fn load_from(path: &Path) -> Result<Self> {
		let config_err = |message: String| ToolError::Config {
			path: path.to_path_buf(),
			message,
		};

		let content = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
		let config: Config = serde_json::from_str(&content).map_err(|e| config_err(e.to_string()))?;
		config.validate().map_err(config_err)?;
		Ok(config)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs.max(1))
	}

	fn validate(&self) -> std::result::Result<(), String> {
		let window = self.mover.window();
		if !window.is_unbounded() && window.max_days <= window.min_days {
			return Err(format!(
				"mover.maxAgeDays ({}) must be greater than mover.minAgeDays ({}) or 0",
				window.max_days, window.min_days
			));
		}
		if self.labeler.policy.cross_seed_marker.is_empty() {
			return Err("labeler.crossSeedMarker must not be empty".to_string());
		}
		Ok(())
	}
}
