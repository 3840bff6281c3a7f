// Position-bias check: is the participant clicking the same screen position?
//
// Images are shuffled across positions, so an attentive participant's clicks
// should be spread uniformly. The chi-square goodness-of-fit p-value measures
// how compatible the click tally is with uniform placement; the check fails
// when `1 - p` is too high.

use crate::distribution::{self, CategoryCounts};
use crate::error::{QcError, Result};
use crate::qc::verdict::{round_percent, CheckKind, Verdict};
use crate::trial::{validate_trials, TrialRecord};

/// Click counts per screen position over answered trials
#[derive(Debug, Clone, PartialEq)]
pub struct PositionTally {
    pub counts: CategoryCounts,

    /// Number of answered trials
    pub answered: u64,

    /// Number of positions tested: the largest item count seen in any trial
    pub category_count: usize,
}

impl PositionTally {
    /// Share of answered trials that chose `position`, in [0, 1]
    pub fn share(&self, position: usize) -> f64 {
        if self.answered == 0 {
            return 0.0;
        }
        self.counts.get(&position).copied().unwrap_or(0) as f64 / self.answered as f64
    }
}

/// Tally chosen positions
///
/// Trials showing fewer items than the largest trial contribute zero counts
/// to the positions they lack; a warning is logged when item counts differ
/// because the uniform null then overstates the expected count of the
/// missing positions.
///
/// # Errors
/// `InvalidTrial` when a choice points past its trial's stimuli.
pub fn tally_positions(trials: &[TrialRecord]) -> Result<PositionTally> {
    validate_trials(trials)?;

    let category_count = trials.iter().map(TrialRecord::item_count).max().unwrap_or(0);
    let smallest = trials.iter().map(TrialRecord::item_count).min().unwrap_or(0);
    if smallest != category_count {
        tracing::warn!(
            smallest,
            largest = category_count,
            "trials show different numbers of items; testing against the largest"
        );
    }

    let mut counts = CategoryCounts::new();
    let mut answered = 0;
    for choice in trials.iter().filter_map(TrialRecord::choice) {
        *counts.entry(choice).or_insert(0) += 1;
        answered += 1;
    }

    Ok(PositionTally {
        counts,
        answered,
        category_count,
    })
}

/// Evaluate whether clicks are spread across positions
///
/// Fails when `1 - p > max_prob_random`, where `p` is the chi-square
/// goodness-of-fit p-value of the position tally.
///
/// # Errors
/// - `InsufficientData` when no trial was answered
/// - `InvalidTrial` when a record violates its invariants
///
/// # Example
/// ```
/// use screener::qc::evaluate_position_bias;
/// use screener::trial::{ActionType, Stimulus, TrialRecord};
///
/// let stimuli = vec![Stimulus::from_file("a.jpg"), Stimulus::from_file("b.jpg")];
/// let trials: Vec<_> = (0..100)
///     .map(|i| TrialRecord::answered(ActionType::Keep, stimuli.clone(), i % 2, 900))
///     .collect();
///
/// let verdict = evaluate_position_bias(&trials, 0.8).unwrap();
/// assert!(verdict.passed);
/// ```
pub fn evaluate_position_bias(trials: &[TrialRecord], max_prob_random: f64) -> Result<Verdict> {
    let tally = tally_positions(trials)?;
    if tally.answered == 0 {
        return Err(QcError::insufficient("no answered trials to tally"));
    }

    let p_value = distribution::chi_square_goodness_of_fit_p_value(
        &tally.counts,
        tally.answered,
        tally.category_count,
    )?;
    let prob_random = 1.0 - p_value;

    let mut explanation = format!(
        "Because the images are randomly arranged, you should click in any given position \
         about {}% of the time. Some workers try to cheat the system by clicking in one \
         place repeatedly without actually looking at the images. To avoid this, we measure \
         the positions in which people click to make sure they are not clicking in the same \
         place over and over just to get through the experiment as quickly as possible. \
         Let's see how you did.<br><br>",
        round_percent(1.0 / tally.category_count as f64)
    );
    for position in 0..tally.category_count {
        explanation.push_str(&format!(
            "You clicked on the image in position {} <strong>{}%</strong> of the time<br>",
            position + 1,
            round_percent(tally.share(position))
        ));
    }
    explanation.push_str("<br>");

    Ok(Verdict::against_threshold(
        CheckKind::PositionBias,
        prob_random,
        max_prob_random,
        explanation,
        "Your probability is within limits for behaving randomly.",
        "Your probability is too high! Please repeat the practice.",
    ))
}
