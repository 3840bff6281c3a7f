//! Trial records produced by the click-choice presentation layer
//!
//! The experiment front end writes one JSON object per trial. Field names on
//! the wire follow that log (`choice_idx`, `rt`, `stims`, ...); the Rust
//! names describe what the fields mean. Records are read-only once parsed.

use crate::error::{QcError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Sentinel stored in `choice_index` and `reaction_time_ms` for a missed trial
pub const MISSED: i64 = -1;

/// `trial_type` tag of click-choice trials in a mixed experiment log
pub const CLICK_CHOICE_TRIAL_TYPE: &str = "click-choice";

/// Task framing for a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Pick the item that best exhibits the attribute
    Keep,
    /// Pick the item that least exhibits the attribute
    Reject,
}

/// Identifier that may arrive as a JSON number or string
///
/// Group keys and item identities come from different generators, some
/// emitting integers and some strings. Both normalize to the same text so
/// `5` and `"5"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawKey", into = "String")]
pub struct Key(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKey {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<RawKey> for Key {
    fn from(raw: RawKey) -> Self {
        match raw {
            RawKey::Int(value) => Self(value.to_string()),
            RawKey::Float(value) => Self(value.to_string()),
            RawKey::Text(value) => Self(value),
        }
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for Key {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One image shown in a trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    #[serde(default)]
    pub id: String,
    pub file: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Stimulus {
    /// Stimulus whose id is the file stem, as the task generator assigns it
    pub fn from_file(file: impl Into<String>) -> Self {
        let file = file.into();
        let id = file
            .rsplit('/')
            .next()
            .and_then(|name| name.split('.').next())
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            file,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

fn missed() -> i64 {
    MISSED
}

/// A single finalized click-choice trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub action_type: ActionType,

    #[serde(rename = "stims", alias = "trial_images", default)]
    pub stimuli: Vec<Stimulus>,

    /// Index into `stimuli`, or negative when the participant did not respond
    #[serde(rename = "choice_idx", default = "missed")]
    pub choice_index: i64,

    /// Id of the clicked stimulus (display only)
    #[serde(rename = "choice", default, skip_serializing_if = "Option::is_none")]
    pub choice_id: Option<Key>,

    /// Milliseconds from onset to click, `-1` when missed
    #[serde(rename = "rt", default = "missed")]
    pub reaction_time_ms: i64,

    /// Pairs a keep trial with the reject trial over the same item set
    #[serde(
        rename = "global_tup_idx",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub group_key: Option<Key>,

    /// Choice index → stable identity of the underlying item
    #[serde(
        rename = "image_idx_map",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub item_identity_map: Option<Vec<Key>>,
}

impl TrialRecord {
    /// Answered trial choosing `choice_index` after `reaction_time_ms`
    pub fn answered(
        action_type: ActionType,
        stimuli: Vec<Stimulus>,
        choice_index: usize,
        reaction_time_ms: i64,
    ) -> Self {
        let choice_id = stimuli
            .get(choice_index)
            .map(|stimulus| Key(stimulus.id.clone()));
        Self {
            action_type,
            stimuli,
            choice_index: choice_index as i64,
            choice_id,
            reaction_time_ms,
            group_key: None,
            item_identity_map: None,
        }
    }

    /// Trial that timed out without a click
    pub fn missed(action_type: ActionType, stimuli: Vec<Stimulus>) -> Self {
        Self {
            action_type,
            stimuli,
            choice_index: MISSED,
            choice_id: None,
            reaction_time_ms: MISSED,
            group_key: None,
            item_identity_map: None,
        }
    }

    pub fn with_group_key(mut self, key: impl Into<Key>) -> Self {
        self.group_key = Some(key.into());
        self
    }

    pub fn with_item_identities<K: Into<Key>>(mut self, identities: Vec<K>) -> Self {
        self.item_identity_map = Some(identities.into_iter().map(Into::into).collect());
        self
    }

    /// Chosen position, `None` for a missed trial
    pub fn choice(&self) -> Option<usize> {
        usize::try_from(self.choice_index).ok()
    }

    pub fn is_missed(&self) -> bool {
        self.choice_index < 0
    }

    /// Number of positions shown in this trial
    pub fn item_count(&self) -> usize {
        self.stimuli.len()
    }

    /// The stimulus the participant clicked
    pub fn chosen_stimulus(&self) -> Option<&Stimulus> {
        self.choice().and_then(|index| self.stimuli.get(index))
    }

    /// Stable identity of the chosen item
    ///
    /// Prefers the identity map; without one, falls back to the chosen
    /// stimulus' id and then its file so the same image at two different
    /// positions still compares equal.
    pub fn chosen_identity(&self) -> Option<Key> {
        let index = self.choice()?;
        if let Some(identity) = self
            .item_identity_map
            .as_ref()
            .and_then(|map| map.get(index))
        {
            return Some(identity.clone());
        }
        let stimulus = self.stimuli.get(index)?;
        if stimulus.id.is_empty() {
            Some(Key(stimulus.file.clone()))
        } else {
            Some(Key(stimulus.id.clone()))
        }
    }

    /// Check the record invariants
    ///
    /// `choice_index` must be the sentinel or index into `stimuli`, and an
    /// answered trial must carry a non-negative reaction time.
    pub fn validate(&self, index: usize) -> Result<()> {
        if let Some(choice) = self.choice() {
            if choice >= self.stimuli.len() {
                return Err(QcError::InvalidTrial {
                    index,
                    reason: format!(
                        "choice index {} out of range for {} stimuli",
                        choice,
                        self.stimuli.len()
                    ),
                });
            }
            if self.reaction_time_ms < 0 {
                return Err(QcError::InvalidTrial {
                    index,
                    reason: format!(
                        "answered trial has negative reaction time {}",
                        self.reaction_time_ms
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Validate every record of a trial sequence
pub fn validate_trials(trials: &[TrialRecord]) -> Result<()> {
    trials
        .iter()
        .enumerate()
        .try_for_each(|(index, trial)| trial.validate(index))
}

/// Parse the click-choice trials out of an experiment's JSON response log
///
/// The log is a JSON array mixing trial objects with instruction and
/// survey entries; only entries tagged `"trial_type": "click-choice"` (or
/// untagged entries) are kept.
///
/// # Example
/// ```
/// use screener::trial::parse_trial_log;
///
/// let log = r#"[
///     {"trial_type": "text", "rt": 5000},
///     {"trial_type": "click-choice", "action_type": "keep",
///      "stims": [{"id": "a", "file": "img/a.jpg"}, {"id": "b", "file": "img/b.jpg"}],
///      "choice": "b", "choice_idx": 1, "rt": 812}
/// ]"#;
/// let trials = parse_trial_log(log).unwrap();
/// assert_eq!(trials.len(), 1);
/// assert_eq!(trials[0].choice(), Some(1));
/// ```
pub fn parse_trial_log(json: &str) -> anyhow::Result<Vec<TrialRecord>> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(json).context("Trial log must be a JSON array")?;

    let mut trials = Vec::new();
    for (position, entry) in entries.into_iter().enumerate() {
        let trial_type = entry.get("trial_type").and_then(|value| value.as_str());
        if matches!(trial_type, Some(kind) if kind != CLICK_CHOICE_TRIAL_TYPE) {
            tracing::trace!(position, ?trial_type, "skipping non-trial log entry");
            continue;
        }
        let trial: TrialRecord = serde_json::from_value(entry)
            .with_context(|| format!("Malformed trial at log position {}", position))?;
        trial
            .validate(trials.len())
            .with_context(|| format!("Invalid trial at log position {}", position))?;
        trials.push(trial);
    }

    tracing::debug!(trials = trials.len(), "parsed trial log");
    Ok(trials)
}

/// Read and parse a trial log file
pub fn load_trial_log<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TrialRecord>> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read trial log: {}", path.as_ref().display()))?;
    parse_trial_log(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_images() -> Vec<Stimulus> {
        vec![
            Stimulus::from_file("img/cat.jpg"),
            Stimulus::from_file("img/dog.jpg"),
            Stimulus::from_file("img/owl.jpg"),
        ]
    }

    #[test]
    fn test_stimulus_id_from_file_stem() {
        let stimulus = Stimulus::from_file("https://cdn.example.org/set/owl.large.jpg");
        assert_eq!(stimulus.id, "owl");
    }

    #[test]
    fn test_choice_and_missed() {
        let answered = TrialRecord::answered(ActionType::Keep, three_images(), 2, 640);
        assert_eq!(answered.choice(), Some(2));
        assert!(!answered.is_missed());
        assert_eq!(answered.choice_id, Some(Key::from("owl")));

        let missed = TrialRecord::missed(ActionType::Reject, three_images());
        assert_eq!(missed.choice(), None);
        assert!(missed.is_missed());
        assert_eq!(missed.reaction_time_ms, MISSED);
    }

    #[test]
    fn test_chosen_identity_prefers_identity_map() {
        let trial = TrialRecord::answered(ActionType::Keep, three_images(), 1, 500)
            .with_item_identities(vec![40u64, 41, 42]);
        assert_eq!(trial.chosen_identity(), Some(Key::from(41u64)));
    }

    #[test]
    fn test_chosen_identity_falls_back_to_stimulus() {
        let trial = TrialRecord::answered(ActionType::Keep, three_images(), 0, 500);
        assert_eq!(trial.chosen_identity(), Some(Key::from("cat")));

        let mut anonymous = trial.clone();
        anonymous.stimuli[0].id.clear();
        assert_eq!(anonymous.chosen_identity(), Some(Key::from("img/cat.jpg")));
    }

    #[test]
    fn test_validate_rejects_out_of_range_choice() {
        let mut trial = TrialRecord::answered(ActionType::Keep, three_images(), 0, 500);
        trial.choice_index = 3;
        assert!(matches!(
            trial.validate(7),
            Err(QcError::InvalidTrial { index: 7, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_rt_on_answered_trial() {
        let trial = TrialRecord::answered(ActionType::Keep, three_images(), 0, -1);
        assert!(trial.validate(0).is_err());
        assert!(TrialRecord::missed(ActionType::Keep, three_images())
            .validate(0)
            .is_ok());
    }

    #[test]
    fn test_parse_skips_non_trial_entries_and_defaults_sentinels() {
        let log = r#"[
            {"trial_type": "instructions", "rt": 12000},
            {"trial_type": "click-choice", "action_type": "reject",
             "stims": [{"id": "a", "file": "a.jpg"}, {"id": "b", "file": "b.jpg"}],
             "choice": -1}
        ]"#;
        let trials = parse_trial_log(log).unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].action_type, ActionType::Reject);
        assert!(trials[0].is_missed());
        assert_eq!(trials[0].reaction_time_ms, MISSED);
    }

    #[test]
    fn test_parse_normalizes_numeric_and_string_keys() {
        let log = r#"[
            {"action_type": "keep", "trial_images": [{"file": "a.jpg"}, {"file": "b.jpg"}],
             "choice_idx": 0, "rt": 900, "global_tup_idx": 17, "image_idx_map": [5, 6]},
            {"action_type": "reject", "stims": [{"file": "b.jpg"}, {"file": "a.jpg"}],
             "choice_idx": 1, "rt": 700, "global_tup_idx": "17", "image_idx_map": ["6", "5"]}
        ]"#;
        let trials = parse_trial_log(log).unwrap();
        assert_eq!(trials[0].group_key, trials[1].group_key);
        assert_eq!(trials[0].chosen_identity(), trials[1].chosen_identity());
        assert_eq!(trials[0].chosen_identity(), Some(Key::from(5u64)));
    }

    #[test]
    fn test_parse_rejects_invalid_choice_index() {
        let log = r#"[
            {"action_type": "keep", "stims": [{"file": "a.jpg"}], "choice_idx": 4, "rt": 300}
        ]"#;
        let err = parse_trial_log(log).unwrap_err();
        assert!(format!("{:#}", err).contains("out of range"));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_trial_log(r#"{"trials": []}"#).is_err());
    }
}
