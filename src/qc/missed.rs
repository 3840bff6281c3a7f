// Missed-trial check: fraction of trials that timed out without a click

use crate::error::{QcError, Result};
use crate::qc::verdict::{floor_percent, CheckKind, Verdict};
use crate::trial::TrialRecord;

/// Fraction of all trials (answered or not) that carry the missed sentinel
///
/// # Errors
/// `InsufficientData` for an empty trial sequence.
pub fn missed_fraction(trials: &[TrialRecord]) -> Result<f64> {
    if trials.is_empty() {
        return Err(QcError::insufficient("no trials were recorded"));
    }
    let missed = trials.iter().filter(|trial| trial.is_missed()).count();
    Ok(missed as f64 / trials.len() as f64)
}

/// Evaluate the missed-trial fraction against `max_frac_unanswered`
///
/// # Errors
/// `InsufficientData` for an empty trial sequence.
pub fn evaluate_missed_trials(trials: &[TrialRecord], max_frac_unanswered: f64) -> Result<Verdict> {
    let fraction = missed_fraction(trials)?;

    let explanation = format!(
        "If a worker misses too many trials, in other words fails to respond before the \
         trial ends, then their data cannot be used.<br><br>\
         You missed <strong>{}%</strong> of trials.<br><br>",
        floor_percent(fraction)
    );

    Ok(Verdict::against_threshold(
        CheckKind::MissedTrials,
        fraction,
        max_frac_unanswered,
        explanation,
        "You are within limits for missed trials.",
        "You missed too many trials! Please repeat the practice.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::{ActionType, Stimulus};

    fn ten_trials_with_missed(missed: usize) -> Vec<TrialRecord> {
        let stimuli = vec![Stimulus::from_file("a.jpg"), Stimulus::from_file("b.jpg")];
        (0..10)
            .map(|i| {
                if i < missed {
                    TrialRecord::missed(ActionType::Keep, stimuli.clone())
                } else {
                    TrialRecord::answered(ActionType::Keep, stimuli.clone(), i % 2, 650)
                }
            })
            .collect()
    }

    #[test]
    fn test_missed_fraction() {
        let trials = ten_trials_with_missed(3);
        assert!((missed_fraction(&trials).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_fails_only_below_measured_fraction() {
        let trials = ten_trials_with_missed(3);

        let strict = evaluate_missed_trials(&trials, 0.29).unwrap();
        assert!(!strict.passed);
        assert!(strict.narrative.contains("You missed too many trials!"));

        let at_limit = evaluate_missed_trials(&trials, 0.3).unwrap();
        assert!(at_limit.passed);

        let loose = evaluate_missed_trials(&trials, 0.5).unwrap();
        assert!(loose.passed);
        assert!(loose.narrative.contains("<strong>30%</strong>"));
    }

    #[test]
    fn test_everything_missed() {
        let verdict = evaluate_missed_trials(&ten_trials_with_missed(10), 0.3).unwrap();
        assert_eq!(verdict.metric, 1.0);
        assert!(!verdict.passed);
    }

    #[test]
    fn test_empty_log_is_insufficient_data() {
        assert!(matches!(
            evaluate_missed_trials(&[], 0.3),
            Err(QcError::InsufficientData { .. })
        ));
    }
}
