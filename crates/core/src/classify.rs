//! Label rules.
//!
//! [`Classifier::decide`] maps one torrent and a [`ClassifyMode`] to a
//! [`Decision`]. It performs no I/O and every path ends in an explicit
//! decision. Rules apply in a fixed order and the first match wins:
//!
//! 1. no trackers: skip
//! 2. already carries the mode's target label: skip
//! 3. label owned by an external integration: skip
//! 4. per-mode rules, see [`ClassifyMode`]
//!
//! The three modes are mutually exclusive: for one torrent at most one of
//! them is eligible.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use deluge_protocol::Torrent;

use crate::error::Result;
use crate::snapshot::Snapshot;

/// Label applied to torrents whose seeding is throttled.
pub const LIMITER: &str = "limiter";
/// Label applied to releases whose seeding requirement is not met.
pub const NOT_MET: &str = "not-met";
/// Label applied to imported high-value releases.
pub const IMPORTED: &str = "imported";
/// Terminal label set by hand for releases that were never imported.
pub const NON_IMPORTED: &str = "non-imported";

/// Which label pass is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifyMode {
	/// Cross-seeds and imported releases on ordinary trackers get `limiter`.
	Limiting,
	/// Denylisted release names get `not-met`.
	NotMet,
	/// Releases on high-value trackers get `imported`.
	Imported,
}

impl ClassifyMode {
	/// Evaluation order of the labeling workflow.
	pub const ALL: [ClassifyMode; 3] = [ClassifyMode::Limiting, ClassifyMode::NotMet, ClassifyMode::Imported];

	/// Label an eligible torrent receives.
	pub fn target_label(self) -> &'static str {
		match self {
			ClassifyMode::Limiting => LIMITER,
			ClassifyMode::NotMet => NOT_MET,
			ClassifyMode::Imported => IMPORTED,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			ClassifyMode::Limiting => "limiting",
			ClassifyMode::NotMet => "not-met",
			ClassifyMode::Imported => "imported",
		}
	}
}

impl std::fmt::Display for ClassifyMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Why a torrent was not eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
	NoTrackers,
	AlreadyLabeled,
	ExternallyManaged,
	/// Not-met pass: the name matches no denylist pattern.
	NameNotMatched,
	/// The label is already terminal for this pass.
	TerminalLabel,
	/// Limiting pass: high-value trackers are never throttled.
	HighValueExempt,
	/// The name is denylisted, so the not-met pass owns the torrent.
	NotMetRelease,
	/// Limiting pass: the label is neither a cross-seed variant nor `imported`.
	LabelShape,
	/// Imported pass: no high-value tracker matched.
	NotHighValue,
}

impl SkipReason {
	pub fn as_str(self) -> &'static str {
		match self {
			SkipReason::NoTrackers => "no trackers",
			SkipReason::AlreadyLabeled => "already labeled",
			SkipReason::ExternallyManaged => "externally managed",
			SkipReason::NameNotMatched => "name not denylisted",
			SkipReason::TerminalLabel => "terminal label",
			SkipReason::HighValueExempt => "high-value tracker",
			SkipReason::NotMetRelease => "not-met release",
			SkipReason::LabelShape => "label shape",
			SkipReason::NotHighValue => "not a high-value tracker",
		}
	}
}

impl std::fmt::Display for SkipReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	Eligible,
	Skip(SkipReason),
}

impl Decision {
	pub fn is_eligible(self) -> bool {
		matches!(self, Decision::Eligible)
	}
}

/// Configurable inputs of the rule engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelPolicy {
	/// Announce-URL substrings exempt from throttling.
	pub high_value_trackers: Vec<String>,
	/// Case-insensitive name substrings of releases whose seeding requirement is never met.
	pub not_met_patterns: Vec<String>,
	/// Labels owned by upstream automation.
	pub managed_labels: Vec<String>,
	/// Suffix marking a label added by the cross-seeding integration.
	pub cross_seed_marker: String,
	/// When false, `<managed>.<marker>` labels also count as externally managed.
	pub managed_cross_seed_eligible: bool,
}

impl Default for LabelPolicy {
	fn default() -> Self {
		Self {
			high_value_trackers: Vec::new(),
			not_met_patterns: [
				"daily.show",
				"colbert",
				"bill.maher",
				"ethel",
				"edith",
				"syncopy",
				"cbfm",
				"eleanor",
				"accomplishedyak",
			]
			.into_iter()
			.map(String::from)
			.collect(),
			managed_labels: vec!["sonarr".to_string(), "radarr".to_string()],
			cross_seed_marker: "cross-seed".to_string(),
			managed_cross_seed_eligible: true,
		}
	}
}

/// Case-insensitive substring set compiled into one regex.
#[derive(Debug, Clone)]
pub struct NamePatterns {
	regex: Option<Regex>,
}

impl NamePatterns {
	pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
		let escaped: Vec<String> = patterns
			.iter()
			.map(|p| p.as_ref().trim())
			.filter(|p| !p.is_empty())
			.map(regex_lite::escape)
			.collect();

		let regex = if escaped.is_empty() {
			None
		} else {
			Some(Regex::new(&format!("(?i){}", escaped.join("|")))?)
		};
		Ok(Self { regex })
	}

	pub fn is_empty(&self) -> bool {
		self.regex.is_none()
	}

	pub fn matches(&self, name: &str) -> bool {
		self.regex.as_ref().is_some_and(|regex| regex.is_match(name))
	}
}

/// Compiled [`LabelPolicy`].
#[derive(Debug, Clone)]
pub struct Classifier {
	policy: LabelPolicy,
	not_met: NamePatterns,
	high_value: Vec<String>,
}

impl Classifier {
	pub fn new(policy: LabelPolicy) -> Result<Self> {
		let not_met = NamePatterns::new(&policy.not_met_patterns)?;
		let high_value = policy
			.high_value_trackers
			.iter()
			.map(|t| t.trim().to_lowercase())
			.filter(|t| !t.is_empty())
			.collect();
		Ok(Self {
			policy,
			not_met,
			high_value,
		})
	}

	pub fn policy(&self) -> &LabelPolicy {
		&self.policy
	}

	pub fn decide(&self, torrent: &Torrent, mode: ClassifyMode) -> Decision {
		use Decision::{Eligible, Skip};

		let label = torrent.label.as_str();

		if torrent.trackers.is_empty() {
			return Skip(SkipReason::NoTrackers);
		}
		if label == mode.target_label() {
			return Skip(SkipReason::AlreadyLabeled);
		}
		if self.is_externally_managed(label) {
			return Skip(SkipReason::ExternallyManaged);
		}

		match mode {
			ClassifyMode::NotMet => {
				if !self.not_met.matches(&torrent.name) {
					Skip(SkipReason::NameNotMatched)
				} else if label == NOT_MET || label == NON_IMPORTED {
					Skip(SkipReason::TerminalLabel)
				} else {
					Eligible
				}
			}
			ClassifyMode::Limiting => {
				if self.is_high_value(torrent) {
					Skip(SkipReason::HighValueExempt)
				} else if self.not_met.matches(&torrent.name) {
					Skip(SkipReason::NotMetRelease)
				} else if self.is_cross_seed(label) || label == IMPORTED {
					Eligible
				} else {
					Skip(SkipReason::LabelShape)
				}
			}
			ClassifyMode::Imported => {
				if !self.is_high_value(torrent) {
					Skip(SkipReason::NotHighValue)
				} else if self.not_met.matches(&torrent.name) {
					Skip(SkipReason::NotMetRelease)
				} else if matches!(label, NOT_MET | IMPORTED | NON_IMPORTED) {
					Skip(SkipReason::TerminalLabel)
				} else {
					Eligible
				}
			}
		}
	}

	/// Eligible torrents of `snapshot` for `mode`, in hash order.
	pub fn eligible<'a>(&self, snapshot: &'a Snapshot, mode: ClassifyMode) -> Vec<&'a Torrent> {
		snapshot
			.values()
			.filter(|torrent| self.decide(torrent, mode).is_eligible())
			.collect()
	}

	pub fn is_high_value(&self, torrent: &Torrent) -> bool {
		torrent.trackers.iter().any(|url| {
			let url = url.to_lowercase();
			self.high_value.iter().any(|hv| url.contains(hv.as_str()))
		})
	}

	pub fn is_cross_seed(&self, label: &str) -> bool {
		let marker = self.policy.cross_seed_marker.as_str();
		!marker.is_empty() && label.ends_with(marker)
	}

	/// `true` when `label` belongs to an upstream integration and must be left alone.
	pub fn is_externally_managed(&self, label: &str) -> bool {
		self.policy.managed_labels.iter().any(|managed| {
			if label == managed {
				return true;
			}
			!self.policy.managed_cross_seed_eligible
				&& label
					.strip_prefix(managed.as_str())
					.and_then(|rest| rest.strip_prefix('.'))
					.is_some_and(|rest| rest == self.policy.cross_seed_marker)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn torrent(id: &str, trackers: &[&str], label: &str, name: &str) -> Torrent {
		Torrent {
			id: id.to_string(),
			name: name.to_string(),
			trackers: trackers.iter().map(|t| t.to_string()).collect(),
			label: label.to_string(),
			..Torrent::default()
		}
	}

	fn classifier(high_value: &[&str]) -> Classifier {
		Classifier::new(LabelPolicy {
			high_value_trackers: high_value.iter().map(|t| t.to_string()).collect(),
			..LabelPolicy::default()
		})
		.unwrap()
	}

	fn eligible_modes(classifier: &Classifier, t: &Torrent) -> Vec<ClassifyMode> {
		ClassifyMode::ALL
			.into_iter()
			.filter(|mode| classifier.decide(t, *mode).is_eligible())
			.collect()
	}

	#[test]
	fn cross_seed_on_ordinary_tracker_is_limited() {
		let c = classifier(&[]);
		let t = torrent("a", &["t1"], "cross-seed", "Show.S01E01");
		assert_eq!(c.decide(&t, ClassifyMode::Limiting), Decision::Eligible);
		assert_eq!(eligible_modes(&c, &t), vec![ClassifyMode::Limiting]);
	}

	#[test]
	fn not_met_name_overrides_high_value() {
		let c = classifier(&["hv"]);
		let t = torrent("a", &["hv"], "", "Daily.Show.2023");
		assert_eq!(
			c.decide(&t, ClassifyMode::Imported),
			Decision::Skip(SkipReason::NotMetRelease)
		);
		assert_eq!(c.decide(&t, ClassifyMode::NotMet), Decision::Eligible);
	}

	#[test]
	fn no_trackers_is_never_eligible() {
		let c = classifier(&["hv"]);
		let t = torrent("a", &[], "cross-seed", "Daily.Show.2023");
		for mode in ClassifyMode::ALL {
			assert_eq!(c.decide(&t, mode), Decision::Skip(SkipReason::NoTrackers));
		}
	}

	#[test]
	fn managed_labels_are_never_eligible() {
		let c = classifier(&["hv"]);
		for label in ["sonarr", "radarr"] {
			let t = torrent("a", &["https://hv.example/announce"], label, "Colbert.2024");
			assert!(eligible_modes(&c, &t).is_empty(), "{label}");
		}
	}

	#[test]
	fn managed_cross_seed_labels_follow_policy() {
		let t = torrent("a", &["t1"], "sonarr.cross-seed", "Show.S01E01");

		let eligible = classifier(&[]);
		assert!(eligible.decide(&t, ClassifyMode::Limiting).is_eligible());

		let strict = Classifier::new(LabelPolicy {
			managed_cross_seed_eligible: false,
			..LabelPolicy::default()
		})
		.unwrap();
		assert_eq!(
			strict.decide(&t, ClassifyMode::Limiting),
			Decision::Skip(SkipReason::ExternallyManaged)
		);
	}

	#[test]
	fn high_value_trackers_are_never_limited() {
		let c = classifier(&["hv.example"]);
		for label in ["", "cross-seed", "imported", "radarr.cross-seed", "tv"] {
			let t = torrent("a", &["https://tracker.HV.example/announce/abc"], label, "Movie.2020");
			assert!(!c.decide(&t, ClassifyMode::Limiting).is_eligible(), "{label}");
		}
	}

	#[test]
	fn high_value_release_is_imported_once() {
		let c = classifier(&["hv"]);
		let fresh = torrent("a", &["hv"], "tv", "Movie.2020");
		assert_eq!(c.decide(&fresh, ClassifyMode::Imported), Decision::Eligible);

		let done = torrent("a", &["hv"], "imported", "Movie.2020");
		assert_eq!(
			c.decide(&done, ClassifyMode::Imported),
			Decision::Skip(SkipReason::AlreadyLabeled)
		);
		for label in ["not-met", "non-imported"] {
			let terminal = torrent("a", &["hv"], label, "Movie.2020");
			assert_eq!(
				c.decide(&terminal, ClassifyMode::Imported),
				Decision::Skip(SkipReason::TerminalLabel)
			);
		}
	}

	#[test]
	fn imported_on_ordinary_tracker_is_limited() {
		let c = classifier(&["hv"]);
		let t = torrent("a", &["t1"], "imported", "Movie.2020");
		assert_eq!(eligible_modes(&c, &t), vec![ClassifyMode::Limiting]);
	}

	#[test]
	fn other_labels_on_ordinary_trackers_are_left_alone() {
		let c = classifier(&["hv"]);
		for label in ["", "tv", "limiter", "non-imported", "not-met"] {
			let t = torrent("a", &["t1"], label, "Movie.2020");
			assert!(eligible_modes(&c, &t).is_empty(), "{label}");
		}
	}

	#[test]
	fn not_met_terminal_labels_are_skipped() {
		let c = classifier(&[]);
		let t = torrent("a", &["t1"], "non-imported", "The.Daily.Show.2024");
		assert_eq!(
			c.decide(&t, ClassifyMode::NotMet),
			Decision::Skip(SkipReason::TerminalLabel)
		);
		let t = torrent("a", &["t1"], "not-met", "The.Daily.Show.2024");
		assert_eq!(
			c.decide(&t, ClassifyMode::NotMet),
			Decision::Skip(SkipReason::AlreadyLabeled)
		);
	}

	#[test]
	fn modes_are_mutually_exclusive() {
		let c = classifier(&["hv"]);
		let trackers: [&[&str]; 3] = [&["t1"], &["hv"], &["t1", "hv"]];
		let labels = [
			"",
			"tv",
			"cross-seed",
			"sonarr.cross-seed",
			"imported",
			"limiter",
			"not-met",
			"non-imported",
			"sonarr",
		];
		let names = ["Movie.2020", "Real.Time.With.Bill.Maher.S22E01", "EDITH.2019"];

		for tracker_set in trackers {
			for label in labels {
				for name in names {
					let t = torrent("a", tracker_set, label, name);
					let modes = eligible_modes(&c, &t);
					assert!(modes.len() <= 1, "{tracker_set:?} {label} {name}: {modes:?}");
				}
			}
		}
	}

	#[test]
	fn relabeled_torrents_are_stable() {
		let c = classifier(&["hv"]);
		let cases = [
			torrent("a", &["t1"], "cross-seed", "Movie.2020"),
			torrent("b", &["hv"], "", "Movie.2021"),
			torrent("c", &["t1"], "tv", "Colbert.2024"),
			torrent("d", &["t1"], "imported", "Movie.2022"),
		];

		for mut t in cases {
			for mode in ClassifyMode::ALL {
				if c.decide(&t, mode).is_eligible() {
					t.label = mode.target_label().to_string();
				}
			}
			assert!(eligible_modes(&c, &t).is_empty(), "{} -> {}", t.id, t.label);
		}
	}

	#[test]
	fn eligible_filters_snapshot() {
		let c = classifier(&[]);
		let mut snapshot = Snapshot::new();
		for t in [
			torrent("b", &["t1"], "cross-seed", "B"),
			torrent("a", &["t1"], "imported", "A"),
			torrent("c", &["t1"], "tv", "C"),
		] {
			snapshot.insert(t.id.clone(), t);
		}

		let ids: Vec<&str> = c
			.eligible(&snapshot, ClassifyMode::Limiting)
			.into_iter()
			.map(|t| t.id.as_str())
			.collect();
		assert_eq!(ids, vec!["a", "b"]);
		assert!(c.eligible(&Snapshot::new(), ClassifyMode::Imported).is_empty());
	}

	#[test]
	fn name_patterns_are_case_insensitive_literals() {
		let patterns = NamePatterns::new(&["daily.show", " ", "a+b"]).unwrap();
		assert!(patterns.matches("The.DAILY.SHOW.2024"));
		assert!(!patterns.matches("The.DailyXShow.2024"));
		assert!(patterns.matches("x.A+B.y"));
		assert!(!patterns.is_empty());

		let empty = NamePatterns::new::<&str>(&[]).unwrap();
		assert!(empty.is_empty());
		assert!(!empty.matches("anything"));
		assert!(NamePatterns::new(&["", "  "]).unwrap().is_empty());
	}

	#[test]
	fn policy_deserializes_camel_case_with_defaults() {
		let policy: LabelPolicy =
			serde_json::from_str(r#"{"highValueTrackers": ["hv"], "managedCrossSeedEligible": false}"#).unwrap();
		assert_eq!(policy.high_value_trackers, vec!["hv"]);
		assert!(!policy.managed_cross_seed_eligible);
		assert_eq!(policy.cross_seed_marker, "cross-seed");
		assert_eq!(policy.managed_labels, vec!["sonarr", "radarr"]);
	}
}
