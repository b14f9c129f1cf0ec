//! Errors raised by the nemesis surface.
//!
//! Per-node lifecycle failures are never errors - they travel as
//! `NodeOutcome::Failed` inside the completed operation. These variants cover
//! contract violations and partitioner-level failures only.

use thiserror::Error;

use crate::history::FaultKind;

/// Failure of a nemesis invocation or lifecycle call.
#[derive(Debug, Error)]
pub enum NemesisError {
    /// The operation's `f` is outside the nemesis's declared fault set.
    /// Indicates a misassembled composition.
    #[error("fault {0:?} is not declared by this nemesis")]
    UnsupportedFault(FaultKind),

    /// The operation carried a payload shape the nemesis cannot interpret.
    #[error("unexpected operation payload: {0}")]
    InvalidValue(String),

    /// The underlying partitioner reported a failure.
    #[error("partitioner error: {0}")]
    Partitioner(String),
}
