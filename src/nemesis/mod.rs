//! Fault injectors and the capability seams they drive.
//!
//! A nemesis declares the set of operation kinds it understands, and is
//! driven purely through operations: the driver invokes it with an op whose
//! `f` is in that set, and gets back the op completed with results. Setup
//! and teardown bracket a run; teardown is idempotent and safe to call
//! after a partial setup or no invocations at all.

pub mod compose;
pub mod partition;
pub mod process;

use std::collections::BTreeSet;

use rand::RngCore;

use crate::cluster::grudge::Grudge;
use crate::cluster::{Node, TestContext};
use crate::error::NemesisError;
use crate::history::{FaultKind, Operation};

/// A fault injector driven by operations.
pub trait Nemesis: Send {
    /// The operation kinds this nemesis handles. Routing in a composed
    /// nemesis dispatches on this set; an op outside it is a contract
    /// violation.
    fn fs(&self) -> BTreeSet<FaultKind>;

    /// Acquire whatever the nemesis needs before the run.
    fn setup(&mut self, test: &TestContext) -> Result<(), NemesisError>;

    /// Apply one fault operation and return it, completed with results.
    fn invoke(
        &mut self,
        test: &TestContext,
        rng: &mut dyn RngCore,
        op: Operation,
    ) -> Result<Operation, NemesisError>;

    /// Release resources. Must tolerate repeated calls and partial setup.
    fn teardown(&mut self, test: &TestContext) -> Result<(), NemesisError>;
}

/// Which lifecycle actions a database supports.
///
/// The package assembler queries this descriptor at composition time and
/// only schedules actions the database can honor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbCaps {
    pub can_start: bool,
    pub can_kill: bool,
    pub can_pause: bool,
    pub can_resume: bool,
}

impl DbCaps {
    /// Full process-lifecycle support.
    pub fn all() -> Self {
        DbCaps {
            can_start: true,
            can_kill: true,
            can_pause: true,
            can_resume: true,
        }
    }
}

/// Process-lifecycle control over a single database node.
///
/// Per-node failures surface as `Err(reason)` values and are folded into the
/// invocation's result map; they never abort the invocation. The default
/// bodies decline every action, so implementors opt in per capability.
pub trait ProcessDb: Send + Sync {
    /// Which of the four actions this database honors.
    fn capabilities(&self) -> DbCaps;

    /// Start (or restart) the database process on `node`.
    fn start(&self, test: &TestContext, node: &Node) -> Result<String, String> {
        let _ = (test, node);
        Err("start is not supported".to_string())
    }

    /// Kill the database process on `node`.
    fn kill(&self, test: &TestContext, node: &Node) -> Result<String, String> {
        let _ = (test, node);
        Err("kill is not supported".to_string())
    }

    /// Pause the database process on `node`.
    fn pause(&self, test: &TestContext, node: &Node) -> Result<String, String> {
        let _ = (test, node);
        Err("pause is not supported".to_string())
    }

    /// Resume the database process on `node`.
    fn resume(&self, test: &TestContext, node: &Node) -> Result<String, String> {
        let _ = (test, node);
        Err("resume is not supported".to_string())
    }
}

/// The generic partitioner's own two-word vocabulary.
///
/// Public `start-partition`/`stop-partition` operations are translated to
/// this before delegation and translated back on return, so one partitioner
/// implementation serves every partition-spec vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionerOp {
    /// Apply the given grudge.
    Start(Grudge),
    /// Heal all partitions.
    Stop,
}

/// Network-partition capability over the cluster.
pub trait Partitioner: Send {
    /// Install whatever rule plumbing the partitioner needs.
    fn setup(&mut self, test: &TestContext) -> Result<(), NemesisError>;

    /// Apply or heal a partition; returns a human-readable detail string.
    fn invoke(&mut self, test: &TestContext, op: PartitionerOp) -> Result<String, NemesisError>;

    /// Remove rule plumbing. Must tolerate repeated calls and partial setup.
    fn teardown(&mut self, test: &TestContext) -> Result<(), NemesisError>;
}
