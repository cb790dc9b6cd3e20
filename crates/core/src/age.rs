//! Time-added window used to select torrents for migration.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const SECS_PER_DAY: i64 = 86_400;

/// Half-open age window `[min_days, max_days)`; `max_days == 0` leaves it unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeWindow {
	pub min_days: u32,
	pub max_days: u32,
}

impl AgeWindow {
	pub fn new(min_days: u32, max_days: u32) -> Self {
		Self { min_days, max_days }
	}

	pub fn is_unbounded(&self) -> bool {
		self.max_days == 0
	}

	/// Whether a torrent added at `time_added` is inside the window at `now`.
	/// Both are epoch seconds.
	pub fn contains(&self, now: i64, time_added: i64) -> bool {
		let age = now.saturating_sub(time_added);
		if age < i64::from(self.min_days) * SECS_PER_DAY {
			return false;
		}
		self.is_unbounded() || age < i64::from(self.max_days) * SECS_PER_DAY
	}
}

impl Default for AgeWindow {
	fn default() -> Self {
		Self::new(2, 5)
	}
}

impl std::fmt::Display for AgeWindow {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_unbounded() {
			write!(f, "[{}d, ∞)", self.min_days)
		} else {
			write!(f, "[{}d, {}d)", self.min_days, self.max_days)
		}
	}
}

/// Current time in epoch seconds.
pub fn now_epoch() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs() as i64)
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	const NOW: i64 = 1_700_000_000;

	fn added_days_ago(days: f64) -> i64 {
		NOW - (days * SECS_PER_DAY as f64) as i64
	}

	#[test]
	fn bounded_window_is_half_open() {
		let window = AgeWindow::new(2, 5);
		assert!(!window.contains(NOW, added_days_ago(1.99)));
		assert!(window.contains(NOW, NOW - 2 * SECS_PER_DAY));
		assert!(window.contains(NOW, added_days_ago(4.99)));
		assert!(!window.contains(NOW, NOW - 5 * SECS_PER_DAY));
		assert!(!window.contains(NOW, added_days_ago(30.0)));
	}

	#[test]
	fn zero_max_is_unbounded() {
		let window = AgeWindow::new(2, 0);
		assert!(window.is_unbounded());
		assert!(!window.contains(NOW, added_days_ago(1.0)));
		assert!(window.contains(NOW, added_days_ago(2.0)));
		assert!(window.contains(NOW, added_days_ago(3650.0)));
	}

	#[test]
	fn future_timestamps_are_too_young() {
		let window = AgeWindow::new(0, 1);
		assert!(window.contains(NOW, NOW));
		assert!(!AgeWindow::new(1, 0).contains(NOW, NOW + SECS_PER_DAY));
	}

	#[test]
	fn matches_reference_formula() {
		for (min, max) in [(0, 0), (2, 5), (1, 1), (3, 0)] {
			let window = AgeWindow::new(min, max);
			for age in (-2..40).map(|h| h * 3_600 * 3) {
				let lower = age >= i64::from(min) * SECS_PER_DAY;
				let upper = max == 0 || age < i64::from(max) * SECS_PER_DAY;
				assert_eq!(window.contains(NOW, NOW - age), lower && upper, "{window} age={age}");
			}
		}
	}

	#[test]
	fn displays_bounds() {
		assert_eq!(AgeWindow::default().to_string(), "[2d, 5d)");
		assert_eq!(AgeWindow::new(2, 0).to_string(), "[2d, ∞)");
	}
}
