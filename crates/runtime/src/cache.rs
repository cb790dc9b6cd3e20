//! Cache presence checks.
//!
//! A torrent is on the cache when `root/name` exists, or when an entry called
//! `name` appears anywhere below `root`. Names that are not a single plain
//! path component never match.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct CacheProbe {
	root: PathBuf,
	match_dirs: bool,
}

impl CacheProbe {
	/// Probe that matches regular files only in the recursive search.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			match_dirs: false,
		}
	}

	/// Also accept directories named `name` in the recursive search.
	pub fn matching_dirs(mut self, match_dirs: bool) -> Self {
		self.match_dirs = match_dirs;
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Path of the first entry named `name`, exact location first.
	pub fn locate(&self, name: &str) -> Option<PathBuf> {
		if !is_plain_name(name) {
			debug!(target = "deluge.runtime", name, "torrent name is not a plain file name");
			return None;
		}

		let direct = self.root.join(name);
		if direct.exists() {
			return Some(direct);
		}

		WalkDir::new(&self.root)
			.min_depth(1)
			.into_iter()
			.filter_map(|entry| match entry {
				Ok(entry) => Some(entry),
				Err(err) => {
					trace!(target = "deluge.runtime", error = %err, "skipping unreadable cache entry");
					None
				}
			})
			.find(|entry| {
				let kind = entry.file_type();
				entry.file_name() == name && (kind.is_file() || (self.match_dirs && kind.is_dir()))
			})
			.map(|entry| entry.into_path())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.locate(name).is_some()
	}
}

fn is_plain_name(name: &str) -> bool {
	let mut components = Path::new(name).components();
	matches!(
		(components.next(), components.next()),
		(Some(Component::Normal(_)), None)
	)
}
