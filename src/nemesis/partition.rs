//! Partition nemesis: a vocabulary-rewriting wrapper over a generic
//! partitioner.
//!
//! The public operations are `start-partition`/`stop-partition`; the wrapped
//! partitioner only knows `start`/`stop`. The wrapper resolves the partition
//! spec to a concrete grudge, rewrites the vocabulary, delegates, and
//! rewrites back, so callers never observe the internal words. This is what
//! lets one partitioner implementation serve every partition-spec flavor.

use std::collections::BTreeSet;

use rand::RngCore;
use tracing::debug;

use crate::cluster::grudge;
use crate::cluster::TestContext;
use crate::error::NemesisError;
use crate::history::{FaultKind, OpKind, OpValue, Operation};
use crate::nemesis::{Nemesis, Partitioner, PartitionerOp};

/// Nemesis translating partition specs into grudges for a [`Partitioner`].
pub struct PartitionNemesis<P> {
    partitioner: P,
}

impl<P: Partitioner> PartitionNemesis<P> {
    /// Wrap a partitioner capability.
    pub fn new(partitioner: P) -> Self {
        PartitionNemesis { partitioner }
    }
}

impl<P: Partitioner> Nemesis for PartitionNemesis<P> {
    fn fs(&self) -> BTreeSet<FaultKind> {
        [FaultKind::StartPartition, FaultKind::StopPartition]
            .into_iter()
            .collect()
    }

    fn setup(&mut self, test: &TestContext) -> Result<(), NemesisError> {
        self.partitioner.setup(test)
    }

    fn invoke(
        &mut self,
        test: &TestContext,
        rng: &mut dyn RngCore,
        mut op: Operation,
    ) -> Result<Operation, NemesisError> {
        let detail = match op.f {
            FaultKind::StartPartition => {
                let spec = match &op.value {
                    OpValue::Partition(spec) => spec.clone(),
                    other => {
                        return Err(NemesisError::InvalidValue(format!(
                            "partition nemesis expects a partition spec, got {:?}",
                            other
                        )))
                    }
                };
                let grudge = grudge::resolve(&test.nodes, &spec, rng);
                debug!(?grudge, "applying partition");
                self.partitioner.invoke(test, PartitionerOp::Start(grudge))?
            }
            FaultKind::StopPartition => {
                debug!("healing partitions");
                self.partitioner.invoke(test, PartitionerOp::Stop)?
            }
            other => return Err(NemesisError::UnsupportedFault(other)),
        };

        // `op.f` is left untouched: the public vocabulary survives the
        // round-trip through the partitioner's internal one.
        op.kind = OpKind::Info;
        op.value = OpValue::Applied(detail);
        Ok(op)
    }

    fn teardown(&mut self, test: &TestContext) -> Result<(), NemesisError> {
        self.partitioner.teardown(test)
    }
}
