//! Packages: a nemesis bundled with its schedule, cleanup, and reporting
//! metadata - and the composition of many packages into one.
//!
//! Composition routes each operation to the one sub-nemesis that declares
//! its `f`, mixes the main schedules, and concatenates the cleanup
//! schedules in package order: the run is randomized, the cleanup is not.

use std::collections::BTreeSet;
use std::time::Duration;

use rand::RngCore;

use crate::cluster::grudge::PartitionSpec;
use crate::cluster::select::NodeSpec;
use crate::cluster::TestContext;
use crate::error::NemesisError;
use crate::generator::{Choice, Concat, Delay, FlipFlop, Generator, Mix, Repeat, Seq};
use crate::history::{FaultKind, OpValue, Operation};
use crate::nemesis::partition::PartitionNemesis;
use crate::nemesis::process::ProcessNemesis;
use crate::nemesis::{Nemesis, Partitioner, ProcessDb};

/// Reporting annotation: which `f`s open and close a shaded region on a
/// timeline plot. Never consumed by checking logic; preserved verbatim
/// through composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfSpec {
    pub name: String,
    pub start: BTreeSet<FaultKind>,
    pub stop: BTreeSet<FaultKind>,
    pub fill_color: String,
}

/// One fault type, ready to run: its nemesis, its main schedule, its
/// cleanup schedule, and its reporting metadata.
pub struct Package {
    pub nemesis: Box<dyn Nemesis>,
    pub generator: Box<dyn Generator>,
    pub final_generator: Box<dyn Generator>,
    pub perf: Vec<PerfSpec>,
}

/// Options shared by the package builders.
#[derive(Debug, Clone)]
pub struct PackageOpts {
    /// Minimum spacing between operations of each fault schedule.
    pub interval: Duration,
}

impl Default for PackageOpts {
    fn default() -> Self {
        PackageOpts {
            interval: Duration::from_secs(5),
        }
    }
}

/// A nemesis made of several sub-nemeses, each owning a disjoint fault set.
pub struct ComposedNemesis {
    parts: Vec<Box<dyn Nemesis>>,
}

impl ComposedNemesis {
    pub fn new(parts: Vec<Box<dyn Nemesis>>) -> Self {
        ComposedNemesis { parts }
    }
}

impl Nemesis for ComposedNemesis {
    fn fs(&self) -> BTreeSet<FaultKind> {
        self.parts.iter().flat_map(|p| p.fs()).collect()
    }

    fn setup(&mut self, test: &TestContext) -> Result<(), NemesisError> {
        for part in &mut self.parts {
            part.setup(test)?;
        }
        Ok(())
    }

    fn invoke(
        &mut self,
        test: &TestContext,
        rng: &mut dyn RngCore,
        op: Operation,
    ) -> Result<Operation, NemesisError> {
        // Route to the sub-nemesis declaring this f. Fault sets are disjoint
        // by construction, so the first match is the only match.
        for part in &mut self.parts {
            if part.fs().contains(&op.f) {
                return part.invoke(test, rng, op);
            }
        }
        Err(NemesisError::UnsupportedFault(op.f))
    }

    fn teardown(&mut self, test: &TestContext) -> Result<(), NemesisError> {
        // Every part gets torn down even if an earlier one fails; the first
        // failure is reported afterwards.
        let mut first_err = None;
        for part in &mut self.parts {
            if let Err(e) = part.teardown(test) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Merge packages into one: union of fault sets, mixed main schedules,
/// cleanup schedules concatenated in package order, perf annotations
/// set-unioned.
pub fn compose(packages: Vec<Package>) -> Package {
    let mut nemeses = Vec::new();
    let mut gens: Vec<Box<dyn Generator>> = Vec::new();
    let mut finals: Vec<Box<dyn Generator>> = Vec::new();
    let mut perf: Vec<PerfSpec> = Vec::new();

    for package in packages {
        nemeses.push(package.nemesis);
        gens.push(package.generator);
        finals.push(package.final_generator);
        for spec in package.perf {
            if !perf.contains(&spec) {
                perf.push(spec);
            }
        }
    }

    Package {
        nemesis: Box::new(ComposedNemesis::new(nemeses)),
        generator: Box::new(Mix::new(gens)),
        final_generator: Box::new(Concat::new(finals)),
        perf,
    }
}

/// Build a process-lifecycle package for `db`, scheduling only the actions
/// its capability descriptor supports: a kill/start flip-flop with a
/// trailing start, and a pause/resume flip-flop with a trailing resume.
pub fn process_package<D: ProcessDb + 'static>(db: D, opts: &PackageOpts) -> Package {
    let caps = db.capabilities();
    let mut gens: Vec<Box<dyn Generator>> = Vec::new();
    let mut finals: Vec<Box<dyn Generator>> = Vec::new();
    let mut perf = Vec::new();

    if caps.can_kill && caps.can_start {
        gens.push(Box::new(Delay::new(
            opts.interval,
            Box::new(FlipFlop::new(
                Box::new(Repeat::new(Operation::nemesis(
                    FaultKind::Kill,
                    OpValue::Nodes(NodeSpec::Any),
                ))),
                Box::new(Repeat::new(Operation::nemesis(
                    FaultKind::Start,
                    OpValue::Nodes(NodeSpec::All),
                ))),
            )),
        )));
        finals.push(Box::new(Seq::new(vec![Operation::nemesis(
            FaultKind::Start,
            OpValue::Nodes(NodeSpec::All),
        )])));
        perf.push(PerfSpec {
            name: "kill".to_string(),
            start: [FaultKind::Kill].into_iter().collect(),
            stop: [FaultKind::Start].into_iter().collect(),
            fill_color: "#E9A4A0".to_string(),
        });
    }

    if caps.can_pause && caps.can_resume {
        gens.push(Box::new(Delay::new(
            opts.interval,
            Box::new(FlipFlop::new(
                Box::new(Repeat::new(Operation::nemesis(
                    FaultKind::Pause,
                    OpValue::Nodes(NodeSpec::Any),
                ))),
                Box::new(Repeat::new(Operation::nemesis(
                    FaultKind::Resume,
                    OpValue::Nodes(NodeSpec::All),
                ))),
            )),
        )));
        finals.push(Box::new(Seq::new(vec![Operation::nemesis(
            FaultKind::Resume,
            OpValue::Nodes(NodeSpec::All),
        )])));
        perf.push(PerfSpec {
            name: "pause".to_string(),
            start: [FaultKind::Pause].into_iter().collect(),
            stop: [FaultKind::Resume].into_iter().collect(),
            fill_color: "#A0B1E9".to_string(),
        });
    }

    Package {
        nemesis: Box::new(ProcessNemesis::new(db)),
        generator: Box::new(Mix::new(gens)),
        final_generator: Box::new(Concat::new(finals)),
        perf,
    }
}

/// Build a partition package: a flip-flop alternating randomly-shaped
/// partitions with heals, and a trailing heal as cleanup.
pub fn partition_package<P: Partitioner + 'static>(partitioner: P, opts: &PackageOpts) -> Package {
    let starts = vec![
        Operation::nemesis(
            FaultKind::StartPartition,
            OpValue::Partition(PartitionSpec::One),
        ),
        Operation::nemesis(
            FaultKind::StartPartition,
            OpValue::Partition(PartitionSpec::Majority),
        ),
        Operation::nemesis(
            FaultKind::StartPartition,
            OpValue::Partition(PartitionSpec::MajoritiesRing),
        ),
    ];
    let stop = Operation::nemesis(FaultKind::StopPartition, OpValue::None);

    Package {
        nemesis: Box::new(PartitionNemesis::new(partitioner)),
        generator: Box::new(Delay::new(
            opts.interval,
            Box::new(FlipFlop::new(
                Box::new(Choice::new(starts)),
                Box::new(Repeat::new(stop.clone())),
            )),
        )),
        final_generator: Box::new(Seq::new(vec![stop])),
        perf: vec![PerfSpec {
            name: "partition".to_string(),
            start: [FaultKind::StartPartition].into_iter().collect(),
            stop: [FaultKind::StopPartition].into_iter().collect(),
            fill_color: "#E9DCA0".to_string(),
        }],
    }
}

/// Build the full fault package for a database and (optionally) a
/// partitioner: every supported lifecycle schedule plus the partition
/// schedule, composed into one package.
pub fn db_package<D, P>(db: D, partitioner: Option<P>, opts: &PackageOpts) -> Package
where
    D: ProcessDb + 'static,
    P: Partitioner + 'static,
{
    let mut packages = vec![process_package(db, opts)];
    if let Some(p) = partitioner {
        packages.push(partition_package(p, opts));
    }
    compose(packages)
}
