// Aggregate gate: run all four checks and decide whether the participant
// may proceed.
//
// A failed gate means the whole practice block must be repeated; there is no
// partial retry. Each call builds its own verdicts, so the same gate can be
// run for repeated attempts or many participants without shared state.

use crate::error::{QcError, Result};
use crate::qc::bias::evaluate_position_bias;
use crate::qc::config::QualityConfig;
use crate::qc::contradiction::evaluate_contradictions;
use crate::qc::missed::evaluate_missed_trials;
use crate::qc::reaction_time::evaluate_reaction_times;
use crate::qc::verdict::{CheckKind, Verdict};
use crate::trial::{validate_trials, TrialRecord};
use serde::Serialize;

/// Order in which failing checks are reported as the rejection reason
const REJECTION_PRIORITY: [CheckKind; 4] = [
    CheckKind::MissedTrials,
    CheckKind::ReactionTime,
    CheckKind::Contradiction,
    CheckKind::PositionBias,
];

/// The four per-task numbers stored alongside accepted or rejected work
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationStatistics {
    /// 1 - chi-square goodness-of-fit p-value of the click positions
    pub prob_random: f64,
    pub frac_contradictions: f64,
    pub frac_unanswered: f64,
    pub frac_too_fast: f64,
}

/// Combined result of all quality-control checks
#[derive(Debug, Clone, Serialize)]
pub struct GateReport {
    /// `true` only if every check passed
    pub all_passed: bool,

    /// One verdict per check, in display order
    pub verdicts: Vec<Verdict>,

    pub statistics: ValidationStatistics,

    /// Number of trials evaluated
    pub trial_count: usize,
}

impl GateReport {
    /// Verdict produced by `check`
    pub fn verdict(&self, check: CheckKind) -> Option<&Verdict> {
        self.verdicts.iter().find(|verdict| verdict.check == check)
    }

    /// Checks that failed, in display order
    pub fn failed_checks(&self) -> Vec<CheckKind> {
        self.verdicts
            .iter()
            .filter(|verdict| !verdict.passed)
            .map(|verdict| verdict.check)
            .collect()
    }

    /// Feedback for the highest-priority failing check, if any failed
    ///
    /// Priority: missed trials, reaction time, contradictions, position bias.
    pub fn rejection_reason(&self) -> Option<&'static str> {
        REJECTION_PRIORITY
            .iter()
            .copied()
            .find(|check| self.verdict(*check).is_some_and(|verdict| !verdict.passed))
            .map(CheckKind::rejection_reason)
    }

    /// All four narratives concatenated for the debrief page
    pub fn narrative(&self) -> String {
        self.verdicts
            .iter()
            .map(|verdict| verdict.narrative.as_str())
            .collect::<Vec<_>>()
            .join("<br><br><hr><br>")
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        if self.all_passed {
            report.push_str("✅ PARTICIPANT PASSED QUALITY CONTROL\n\n");
        } else {
            report.push_str(&format!(
                "❌ PARTICIPANT FAILED QUALITY CONTROL ({} of {} checks)\n\n",
                self.failed_checks().len(),
                self.verdicts.len()
            ));
        }
        report.push_str(&format!("Trials evaluated: {}\n", self.trial_count));

        report.push_str("\n📊 Checks:\n");
        for verdict in &self.verdicts {
            let mark = if verdict.passed { "pass" } else { "FAIL" };
            match &verdict.insufficient_data {
                Some(reason) => report.push_str(&format!(
                    "  {} [{}] insufficient data: {}\n",
                    verdict.check, mark, reason
                )),
                None => report.push_str(&format!(
                    "  {} [{}] metric={:.4} threshold={:.4}\n",
                    verdict.check, mark, verdict.metric, verdict.threshold
                )),
            }
        }

        if let Some(reason) = self.rejection_reason() {
            report.push_str(&format!("\nReason: {}\n", reason));
        }

        report
    }
}

/// Turn a check's `InsufficientData` error into a failing verdict
fn settle(check: CheckKind, threshold: f64, outcome: Result<Verdict>) -> Result<Verdict> {
    match outcome {
        Err(QcError::InsufficientData { reason }) => {
            Ok(Verdict::insufficient_data(check, threshold, reason))
        }
        other => other,
    }
}

/// Run all quality-control checks over a finalized trial sequence
///
/// A check with nothing to evaluate fails rather than erroring: a
/// participant who answered nothing cannot pass.
///
/// # Errors
/// - `InvalidConfig` if `config` fails validation
/// - `InvalidTrial` if a record violates its invariants
/// - `DidNotConverge` if a p-value computation fails to converge
///
/// # Example
/// ```
/// use screener::qc::{run_gate, QualityConfig};
/// use screener::trial::{ActionType, Stimulus, TrialRecord};
///
/// let stimuli: Vec<_> = ["a.jpg", "b.jpg", "c.jpg"].into_iter().map(Stimulus::from_file).collect();
/// let trials: Vec<_> = (0..30)
///     .map(|i| TrialRecord::answered(ActionType::Keep, stimuli.clone(), i % 3, 850))
///     .collect();
///
/// let report = run_gate(&trials, &QualityConfig::default()).unwrap();
/// assert!(report.all_passed);
/// assert_eq!(report.rejection_reason(), None);
/// ```
pub fn run_gate(trials: &[TrialRecord], config: &QualityConfig) -> Result<GateReport> {
    config.validate().map_err(QcError::InvalidConfig)?;
    validate_trials(trials)?;

    let bias = settle(
        CheckKind::PositionBias,
        config.max_prob_random,
        evaluate_position_bias(trials, config.max_prob_random),
    )?;
    let missed = settle(
        CheckKind::MissedTrials,
        config.max_frac_unanswered,
        evaluate_missed_trials(trials, config.max_frac_unanswered),
    )?;
    let reaction_time = settle(
        CheckKind::ReactionTime,
        config.max_frac_too_fast,
        evaluate_reaction_times(trials, config.max_frac_too_fast, config.min_trial_rt_ms),
    )?;
    let contradiction = settle(
        CheckKind::Contradiction,
        config.max_frac_contradictions,
        evaluate_contradictions(trials, config.max_frac_contradictions, &config.attribute),
    )?;

    let statistics = ValidationStatistics {
        prob_random: bias.metric,
        frac_contradictions: contradiction.metric,
        frac_unanswered: missed.metric,
        frac_too_fast: reaction_time.metric,
    };

    let verdicts = vec![bias, missed, reaction_time, contradiction];
    let all_passed = verdicts.iter().all(|verdict| verdict.passed);

    tracing::info!(
        trials = trials.len(),
        all_passed,
        prob_random = statistics.prob_random,
        frac_contradictions = statistics.frac_contradictions,
        frac_unanswered = statistics.frac_unanswered,
        frac_too_fast = statistics.frac_too_fast,
        "quality gate evaluated"
    );

    Ok(GateReport {
        all_passed,
        verdicts,
        statistics,
        trial_count: trials.len(),
    })
}
