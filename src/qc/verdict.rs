// Per-check verdicts and the narrative markup shared by all evaluators
//
// A verdict is created fresh by each evaluation call. Nothing here is
// global: the pass/fail flag travels inside the value and the gate combines
// flags explicitly.

use serde::Serialize;
use std::fmt;

const PASS_COLOR: &str = "green";
const FAIL_COLOR: &str = "red";

/// Which quality-control check produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Clicks concentrated on screen positions (chi-square randomness test)
    PositionBias,
    /// Same item chosen as both most and least exemplar
    Contradiction,
    /// Trials that timed out without a response
    MissedTrials,
    /// Responses faster than a human can plausibly decide
    ReactionTime,
}

impl CheckKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::PositionBias => "position bias",
            Self::Contradiction => "contradictions",
            Self::MissedTrials => "missed trials",
            Self::ReactionTime => "reaction time",
        }
    }

    /// Feedback shown to a participant whose work is rejected by this check
    pub fn rejection_reason(self) -> &'static str {
        match self {
            Self::PositionBias => {
                "You are clicking in the same place too often. Pleased click based on \
                 the images themselves, not their position."
            }
            Self::Contradiction => {
                "You are making too many contradictions. Please do not click around \
                 randomly, but make deliberate choices."
            }
            Self::MissedTrials => "You are not answering too many of the trials.",
            Self::ReactionTime => {
                "Your responses are too fast! Be sure you are not clicking randomly."
            }
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one quality-control check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub check: CheckKind,

    /// Whether the participant is within limits for this check
    pub passed: bool,

    /// The statistic compared against `threshold`
    ///
    /// - position bias: 1 - goodness-of-fit p-value
    /// - contradiction, missed, reaction time: a fraction in [0, 1]
    pub metric: f64,

    pub threshold: f64,

    /// HTML fragment explaining the result to the participant
    pub narrative: String,

    /// Set when the check could not be computed from the trials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insufficient_data: Option<String>,
}

impl Verdict {
    /// Verdict for a metric where exceeding `threshold` fails
    ///
    /// The colored closing sentence is appended to `explanation`.
    pub(crate) fn against_threshold(
        check: CheckKind,
        metric: f64,
        threshold: f64,
        mut explanation: String,
        pass_message: &str,
        fail_message: &str,
    ) -> Self {
        let passed = metric <= threshold;
        if passed {
            explanation.push_str(&colored(PASS_COLOR, pass_message));
        } else {
            explanation.push_str(&colored(FAIL_COLOR, fail_message));
        }

        tracing::debug!(check = %check, metric, threshold, passed, "quality check evaluated");

        Self {
            check,
            passed,
            metric,
            threshold,
            narrative: explanation,
            insufficient_data: None,
        }
    }

    /// Passing verdict with a fixed success narrative
    pub(crate) fn pass(check: CheckKind, metric: f64, threshold: f64, explanation: String) -> Self {
        Self {
            check,
            passed: true,
            metric,
            threshold,
            narrative: explanation,
            insufficient_data: None,
        }
    }

    /// Failing verdict for a check that had nothing to evaluate
    pub fn insufficient_data(check: CheckKind, threshold: f64, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(check = %check, %reason, "quality check had insufficient data");

        let narrative = colored(
            FAIL_COLOR,
            &format!(
                "We could not evaluate your {} ({}). Please repeat the practice.",
                check.label(),
                escape_html(&reason)
            ),
        );

        Self {
            check,
            passed: false,
            metric: 0.0,
            threshold,
            narrative,
            insufficient_data: Some(reason),
        }
    }
}

/// Wrap `text` in the color markup the debrief page renders
pub(crate) fn colored(color: &str, text: &str) -> String {
    format!("<font color=\"{}\">{}</font>", color, text)
}

/// Percentage for display, truncated toward zero
pub(crate) fn floor_percent(fraction: f64) -> i64 {
    (fraction * 100.0).floor() as i64
}

/// Percentage for display, nearest whole number with halves rounded up
pub(crate) fn round_percent(fraction: f64) -> i64 {
    (fraction * 100.0 + 0.5).floor() as i64
}

/// Escape HTML special characters in interpolated values
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
