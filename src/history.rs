//! Operation history - the wire contract between workload, nemesis, and checker.
//!
//! Every component that produces or consumes operations speaks this shape:
//! `{process, kind, f, value, time}`. The nemesis completes invocations by
//! replacing `value` with its per-node results; the checker only ever reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cluster::grudge::PartitionSpec;
use crate::cluster::select::NodeSpec;
use crate::cluster::Node;

/// Register key. Single-register scalar histories use the empty key.
pub type Key = String;

/// Observed/written register value.
pub type Val = i64;

/// Process slot reserved for nemesis-originated operations.
pub const NEMESIS_PROCESS: i64 = -1;

/// What an operation's `f` field names: either a fault to inject or a
/// workload action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    /// Start (or restart) database processes on the selected nodes.
    Start,
    /// Kill database processes on the selected nodes.
    Kill,
    /// Pause (SIGSTOP-style) database processes.
    Pause,
    /// Resume previously paused processes.
    Resume,
    /// Apply a network partition.
    StartPartition,
    /// Heal all network partitions.
    StopPartition,
    /// Workload read.
    Read,
    /// Workload write.
    Write,
}

/// Operation lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpKind {
    /// The operation was submitted.
    Invoke,
    /// The operation completed successfully.
    Ok,
    /// The operation definitely did not take effect.
    Fail,
    /// Indeterminate or informational (nemesis completions).
    Info,
}

/// Result of one lifecycle action on one node, captured as data.
///
/// A node that is unreachable or refuses an action yields `Failed` here;
/// it never aborts the surrounding nemesis invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeOutcome {
    /// The action succeeded; payload is an action-specific detail string.
    Ok(String),
    /// The action failed on this node; payload is the reason.
    Failed(String),
}

/// Payload of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpValue {
    /// No payload (heals, plain invocations).
    None,
    /// A node selection to resolve at invocation time.
    Nodes(NodeSpec),
    /// A partition shape to resolve at invocation time.
    Partition(PartitionSpec),
    /// Per-node lifecycle results, filled in by the process nemesis.
    NodeResults(BTreeMap<Node, NodeOutcome>),
    /// Free-form completion detail (partition application, failures).
    Applied(String),
    /// Single-register workload value.
    Scalar(Val),
    /// Multi-register workload value: key -> observed/written value.
    Registers(BTreeMap<Key, Val>),
}

/// One step of the workload or the nemesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Logical process that performed the step; `NEMESIS_PROCESS` for faults.
    pub process: i64,
    /// Lifecycle stage.
    pub kind: OpKind,
    /// What the step does.
    pub f: FaultKind,
    /// Stage-dependent payload.
    pub value: OpValue,
    /// Capture timestamp in nanoseconds, when known.
    pub time: Option<u64>,
}

impl Operation {
    /// An invocation by the given process.
    pub fn invoke(process: i64, f: FaultKind, value: OpValue) -> Self {
        Operation {
            process,
            kind: OpKind::Invoke,
            f,
            value,
            time: None,
        }
    }

    /// A nemesis invocation.
    pub fn nemesis(f: FaultKind, value: OpValue) -> Self {
        Self::invoke(NEMESIS_PROCESS, f, value)
    }

    /// A completed workload read.
    pub fn ok_read(process: i64, value: OpValue) -> Self {
        Operation {
            process,
            kind: OpKind::Ok,
            f: FaultKind::Read,
            value,
            time: None,
        }
    }

    /// A completed workload write.
    pub fn ok_write(process: i64, value: OpValue) -> Self {
        Operation {
            process,
            kind: OpKind::Ok,
            f: FaultKind::Write,
            value,
            time: None,
        }
    }
}

/// An ordered record of everything that happened during a run.
pub type History = Vec<Operation>;
