// Participant Quality Control
//
// Four independent checks over a finalized trial sequence, combined by a
// gate into a single pass/fail decision:
//
// - Position bias: chi-square goodness-of-fit of click positions against a
//   uniform null (images are shuffled, so attentive clicks spread evenly)
// - Contradiction: the same item chosen as both the most and the least
//   exemplar of the attribute across a keep/reject pair
// - Missed trials: fraction of trials that timed out
// - Reaction time: fraction of answered trials at or below a speed floor
//
// Every check returns an explicit `Verdict`. There is no process-wide
// "passed" flag; the gate ANDs the verdicts it was handed.

mod bias;
mod config;
mod contradiction;
mod gate;
mod missed;
mod reaction_time;
mod verdict;

pub use bias::{evaluate_position_bias, tally_positions, PositionTally};
pub use config::QualityConfig;
pub use contradiction::{evaluate_contradictions, find_contradictions, ContradictionSummary};
pub use gate::{run_gate, GateReport, ValidationStatistics};
pub use missed::{evaluate_missed_trials, missed_fraction};
pub use reaction_time::{evaluate_reaction_times, summarize_reaction_times, ReactionTimeSummary};
pub use verdict::{CheckKind, Verdict};
