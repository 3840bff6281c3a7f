// Reaction-time check: fraction of answered trials faster than a human can
// plausibly decide.
//
// The fraction is compared unrounded against the threshold; only the
// percentage shown to the participant is truncated.

use crate::error::{QcError, Result};
use crate::qc::verdict::{floor_percent, CheckKind, Verdict};
use crate::trial::TrialRecord;
use serde::Serialize;

/// Reaction-time statistics over answered trials
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactionTimeSummary {
    pub answered: usize,

    /// Answered trials with `reaction_time_ms <= min_speed_ms`
    pub too_fast: usize,

    /// Mean reaction time in whole milliseconds (floored)
    pub mean_ms: i64,

    /// `too_fast / answered`, unrounded
    pub fraction_too_fast: f64,
}

/// Summarize reaction times of answered trials
///
/// # Errors
/// `InsufficientData` when no trial was answered.
///
/// # Example
/// ```
/// use screener::qc::summarize_reaction_times;
/// use screener::trial::{ActionType, Stimulus, TrialRecord};
///
/// let stimuli = vec![Stimulus::from_file("a.jpg"), Stimulus::from_file("b.jpg")];
/// let trials: Vec<_> = [100, 100, 100, 5000]
///     .into_iter()
///     .map(|rt| TrialRecord::answered(ActionType::Keep, stimuli.clone(), 0, rt))
///     .collect();
///
/// let summary = summarize_reaction_times(&trials, 200).unwrap();
/// assert_eq!(summary.fraction_too_fast, 0.75);
/// assert_eq!(summary.mean_ms, 1325);
/// ```
pub fn summarize_reaction_times(
    trials: &[TrialRecord],
    min_speed_ms: i64,
) -> Result<ReactionTimeSummary> {
    let reaction_times: Vec<i64> = trials
        .iter()
        .filter(|trial| !trial.is_missed())
        .map(|trial| trial.reaction_time_ms)
        .collect();

    if reaction_times.is_empty() {
        return Err(QcError::insufficient(
            "no answered trials to measure reaction time",
        ));
    }

    let answered = reaction_times.len();
    let too_fast = reaction_times
        .iter()
        .filter(|&&rt| rt <= min_speed_ms)
        .count();
    // Widened so a log of huge reaction times cannot overflow the sum
    let total: i128 = reaction_times.iter().map(|&rt| i128::from(rt)).sum();
    let mean_ms = i64::try_from(total.div_euclid(answered as i128)).unwrap_or(i64::MAX);

    Ok(ReactionTimeSummary {
        answered,
        too_fast,
        mean_ms,
        fraction_too_fast: too_fast as f64 / answered as f64,
    })
}

/// Evaluate the fraction of too-fast responses against `max_frac_too_fast`
///
/// # Errors
/// `InsufficientData` when no trial was answered.
pub fn evaluate_reaction_times(
    trials: &[TrialRecord],
    max_frac_too_fast: f64,
    min_speed_ms: i64,
) -> Result<Verdict> {
    let summary = summarize_reaction_times(trials, min_speed_ms)?;

    let explanation = format!(
        "Some workers try to speed through the experiment by clicking as fast as possible. \
         To avoid this, we measure your mean reaction time; in other words, how quickly you \
         make decisions. If a worker goes faster than a human can reasonably make decisions, \
         we exclude their data.<br><br>\
         Let's see how you did.<br><br>\
         Your average reaction time was: <strong>{}</strong> milliseconds.<br><br>\
         <strong>{}%</strong> of your trials are too fast.<br><br>",
        summary.mean_ms,
        floor_percent(summary.fraction_too_fast)
    );

    Ok(Verdict::against_threshold(
        CheckKind::ReactionTime,
        summary.fraction_too_fast,
        max_frac_too_fast,
        explanation,
        "You are within limits for reaction time.",
        "Too many of your trials went too fast!",
    ))
}
