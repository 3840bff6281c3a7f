// Contradiction check: did the participant pick the same item as both the
// most and the least exemplar of the attribute?
//
// Each item set is shown twice, once framed "keep" and once "reject", and
// the two trials share a group key. A contradiction is a group key whose keep
// choice and reject choice resolve to the same underlying item, even when the
// item appeared at different screen positions.

use crate::error::{QcError, Result};
use crate::qc::verdict::{escape_html, floor_percent, CheckKind, Verdict};
use crate::trial::{validate_trials, ActionType, Key, Stimulus, TrialRecord};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Contradictions found in a trial sequence
#[derive(Debug, Clone, PartialEq)]
pub struct ContradictionSummary {
    /// Number of answered trials
    pub answered: usize,

    /// Group keys whose keep and reject choices picked the same item
    pub contradicted_groups: Vec<Key>,

    /// `2 * contradictions / answered`
    ///
    /// Each contradiction involves two answered trials (its keep and its
    /// reject half) but is counted once, hence the factor of two.
    pub rate: f64,

    /// Index of the first trial of the last contradicted group in listing
    /// order (see `listing_order`)
    pub exemplar: Option<usize>,
}

impl ContradictionSummary {
    pub fn count(&self) -> usize {
        self.contradicted_groups.len()
    }
}

/// Order in which the debrief page lists group keys
///
/// Canonical non-negative integers come first in numeric order, then every
/// other key in text order.
fn listing_order(left: &Key, right: &Key) -> Ordering {
    fn as_index(key: &Key) -> Option<u64> {
        key.as_str()
            .parse::<u64>()
            .ok()
            .filter(|index| index.to_string() == key.as_str())
    }
    match (as_index(left), as_index(right)) {
        (Some(l), Some(r)) => l.cmp(&r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}

/// Pair keep and reject choices by group key and count identical picks
///
/// A later trial with the same group key and framing replaces an earlier
/// one. Answered trials without a group key count toward `answered` but
/// cannot contradict anything.
///
/// # Errors
/// - `InsufficientData` when no trial was answered
/// - `InvalidTrial` when a record violates its invariants
pub fn find_contradictions(trials: &[TrialRecord]) -> Result<ContradictionSummary> {
    validate_trials(trials)?;

    let mut kept: BTreeMap<&Key, Key> = BTreeMap::new();
    let mut rejected: BTreeMap<&Key, Key> = BTreeMap::new();
    let mut answered = 0usize;

    for trial in trials.iter().filter(|trial| !trial.is_missed()) {
        answered += 1;
        let (Some(group), Some(identity)) = (trial.group_key.as_ref(), trial.chosen_identity())
        else {
            continue;
        };
        match trial.action_type {
            ActionType::Keep => kept.insert(group, identity),
            ActionType::Reject => rejected.insert(group, identity),
        };
    }

    if answered == 0 {
        return Err(QcError::insufficient(
            "no answered trials to pair for contradictions",
        ));
    }

    let contradicted_groups: Vec<Key> = kept
        .iter()
        .filter(|(group, identity)| rejected.get(*group) == Some(*identity))
        .map(|(group, _)| (*group).clone())
        .collect();

    let exemplar_group = contradicted_groups
        .iter()
        .max_by(|left, right| listing_order(left, right));
    let exemplar = exemplar_group.and_then(|group| {
        trials
            .iter()
            .position(|trial| trial.group_key.as_ref() == Some(group))
    });

    let rate = contradicted_groups.len() as f64 * 2.0 / answered as f64;

    tracing::debug!(
        answered,
        contradictions = contradicted_groups.len(),
        rate,
        "contradiction pairing complete"
    );

    Ok(ContradictionSummary {
        answered,
        contradicted_groups,
        rate,
        exemplar,
    })
}

fn image_tag(stimulus: &Stimulus) -> String {
    format!(
        "<img src=\"{}\" style=\"width:{}px;height:{}px;\">",
        escape_html(&stimulus.file),
        stimulus.width,
        stimulus.height
    )
}

/// Evaluate the contradiction rate
///
/// Fails when the rate exceeds `max_frac_contradictions`. `attribute` is the
/// judged property ("interesting") used in the explanation text.
///
/// # Errors
/// `InsufficientData` when no trial was answered.
pub fn evaluate_contradictions(
    trials: &[TrialRecord],
    max_frac_contradictions: f64,
    attribute: &str,
) -> Result<Verdict> {
    let summary = find_contradictions(trials)?;
    let attribute = escape_html(attribute);

    let mut explanation = format!(
        "The last measure, but possibly the most important, is the number of times a worker \
         contradicts themselves. If they pick the same image as both the most {0} and the \
         least {0} then it is clear that they are not following directions.<br><br>",
        attribute
    );

    let Some(exemplar) = summary.exemplar.and_then(|index| trials.get(index)) else {
        explanation.push_str(
            "<font color=\"green\">However, you never contradicted yourself! Congratulations.</font>",
        );
        return Ok(Verdict::pass(
            CheckKind::Contradiction,
            summary.rate,
            max_frac_contradictions,
            explanation,
        ));
    };

    explanation.push_str("For instance, when asked to choose among these images: <br><br><center>");
    for stimulus in &exemplar.stimuli {
        explanation.push_str(&image_tag(stimulus));
    }
    explanation.push_str("</center><br><br>you chose<br><br>");
    if let Some(chosen) = exemplar.chosen_stimulus() {
        explanation.push_str(&format!("<center>{}</center>", image_tag(chosen)));
    }
    explanation.push_str(&format!(
        "<br><br>as both the most {0} and the least {0}. In total, <strong>{1}%</strong> of \
         choices were contradicted. <br><br>",
        attribute,
        floor_percent(summary.rate)
    ));

    Ok(Verdict::against_threshold(
        CheckKind::Contradiction,
        summary.rate,
        max_frac_contradictions,
        explanation,
        "You are within limits for contradictions.",
        "Unfortunately you made too many contradictions! Please repeat the practice.",
    ))
}
