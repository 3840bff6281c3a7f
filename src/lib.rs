//! Screener - Participant quality control for crowdsourced image rating
//!
//! This library provides the statistical checks used to decide whether a
//! participant's practice trials are good enough to continue: a chi-square
//! position-bias test, keep/reject contradiction pairing, missed-trial and
//! reaction-time limits, and the gate that combines them into one verdict
//! with participant-facing feedback.

pub mod cli;
pub mod distribution;
pub mod error;
pub mod qc;
pub mod special;
pub mod trial;

pub use error::{QcError, Result};
