//! Process-lifecycle nemesis: start/kill/pause/resume across a node set.
//!
//! Actions are dispatched to the selected nodes in parallel, one thread per
//! node, and the invocation blocks until every node has reported. A slow or
//! failing node delays the invocation but cannot corrupt other nodes'
//! results.

use std::collections::{BTreeMap, BTreeSet};
use std::thread;

use crossbeam_channel::unbounded;
use rand::RngCore;
use tracing::debug;

use crate::cluster::select::{self, NodeSpec};
use crate::cluster::{Node, TestContext};
use crate::error::NemesisError;
use crate::history::{FaultKind, NodeOutcome, OpKind, OpValue, Operation};
use crate::nemesis::{Nemesis, ProcessDb};

/// Nemesis controlling database process lifecycles via a [`ProcessDb`].
///
/// Holds no resources of its own: setup and teardown are no-ops.
pub struct ProcessNemesis<D> {
    db: D,
}

impl<D: ProcessDb> ProcessNemesis<D> {
    /// Wrap a database capability.
    pub fn new(db: D) -> Self {
        ProcessNemesis { db }
    }

    /// Run `f`'s lifecycle action against every node in parallel, collecting
    /// one outcome per node.
    fn dispatch(
        &self,
        test: &TestContext,
        f: FaultKind,
        nodes: &[Node],
    ) -> BTreeMap<Node, NodeOutcome> {
        let db = &self.db;
        let (tx, rx) = unbounded();
        let mut results = BTreeMap::new();
        thread::scope(|scope| {
            for node in nodes {
                let tx = tx.clone();
                scope.spawn(move || {
                    let outcome = match f {
                        FaultKind::Start => db.start(test, node),
                        FaultKind::Kill => db.kill(test, node),
                        FaultKind::Pause => db.pause(test, node),
                        FaultKind::Resume => db.resume(test, node),
                        _ => unreachable!("non-lifecycle fault routed to process nemesis"),
                    };
                    let outcome = match outcome {
                        Ok(detail) => NodeOutcome::Ok(detail),
                        Err(reason) => NodeOutcome::Failed(reason),
                    };
                    let _ = tx.send((node.clone(), outcome));
                });
            }
            drop(tx);
            // Drains until every per-node thread has reported.
            while let Ok((node, outcome)) = rx.recv() {
                results.insert(node, outcome);
            }
        });
        results
    }
}

impl<D: ProcessDb> Nemesis for ProcessNemesis<D> {
    fn fs(&self) -> BTreeSet<FaultKind> {
        let caps = self.db.capabilities();
        let mut fs = BTreeSet::new();
        if caps.can_start {
            fs.insert(FaultKind::Start);
        }
        if caps.can_kill {
            fs.insert(FaultKind::Kill);
        }
        if caps.can_pause {
            fs.insert(FaultKind::Pause);
        }
        if caps.can_resume {
            fs.insert(FaultKind::Resume);
        }
        fs
    }

    fn setup(&mut self, _test: &TestContext) -> Result<(), NemesisError> {
        Ok(())
    }

    fn invoke(
        &mut self,
        test: &TestContext,
        rng: &mut dyn RngCore,
        mut op: Operation,
    ) -> Result<Operation, NemesisError> {
        match op.f {
            FaultKind::Start | FaultKind::Kill | FaultKind::Pause | FaultKind::Resume => {}
            other => return Err(NemesisError::UnsupportedFault(other)),
        }

        let spec = match &op.value {
            OpValue::Nodes(spec) => spec.clone(),
            OpValue::None => NodeSpec::Any,
            other => {
                return Err(NemesisError::InvalidValue(format!(
                    "process nemesis expects a node spec, got {:?}",
                    other
                )))
            }
        };

        let nodes = select::resolve(&test.nodes, &spec, rng);
        debug!(f = ?op.f, ?nodes, "dispatching lifecycle action");
        let results = self.dispatch(test, op.f, &nodes);

        op.kind = OpKind::Info;
        op.value = OpValue::NodeResults(results);
        Ok(op)
    }

    fn teardown(&mut self, _test: &TestContext) -> Result<(), NemesisError> {
        Ok(())
    }
}
