//! Harness integration tests.
//!
//! Drives composed fault packages against in-memory capabilities and runs
//! the checker over synthesized workload histories, end to end.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::checker;
use crate::cluster::grudge::Grudge;
use crate::cluster::TestContext;
use crate::driver::drive;
use crate::error::NemesisError;
use crate::history::{FaultKind, History, Key, OpKind, OpValue, Operation, Val};
use crate::nemesis::compose::{db_package, PackageOpts};
use crate::nemesis::{DbCaps, Partitioner, PartitionerOp, ProcessDb};

/// In-memory cluster state shared by the fake database and partitioner.
#[derive(Default)]
struct ClusterState {
    down: BTreeMap<String, bool>,
    paused: BTreeMap<String, bool>,
    grudge: Option<Grudge>,
    partitioner_setups: usize,
    partitioner_teardowns: usize,
}

#[derive(Clone, Default)]
struct FakeDb {
    state: Arc<Mutex<ClusterState>>,
}

impl ProcessDb for FakeDb {
    fn capabilities(&self) -> DbCaps {
        DbCaps::all()
    }

    fn start(&self, _test: &TestContext, node: &String) -> Result<String, String> {
        self.state.lock().unwrap().down.insert(node.clone(), false);
        Ok("started".to_string())
    }

    fn kill(&self, _test: &TestContext, node: &String) -> Result<String, String> {
        self.state.lock().unwrap().down.insert(node.clone(), true);
        Ok("killed".to_string())
    }

    fn pause(&self, _test: &TestContext, node: &String) -> Result<String, String> {
        self.state.lock().unwrap().paused.insert(node.clone(), true);
        Ok("paused".to_string())
    }

    fn resume(&self, _test: &TestContext, node: &String) -> Result<String, String> {
        self.state.lock().unwrap().paused.insert(node.clone(), false);
        Ok("resumed".to_string())
    }
}

#[derive(Clone, Default)]
struct FakePartitioner {
    state: Arc<Mutex<ClusterState>>,
}

impl Partitioner for FakePartitioner {
    fn setup(&mut self, _test: &TestContext) -> Result<(), NemesisError> {
        self.state.lock().unwrap().partitioner_setups += 1;
        Ok(())
    }

    fn invoke(&mut self, _test: &TestContext, op: PartitionerOp) -> Result<String, NemesisError> {
        let mut state = self.state.lock().unwrap();
        match op {
            PartitionerOp::Start(grudge) => {
                let detail = format!("partitioned {} nodes", grudge.len());
                state.grudge = Some(grudge);
                Ok(detail)
            }
            PartitionerOp::Stop => {
                state.grudge = None;
                Ok("healed".to_string())
            }
        }
    }

    fn teardown(&mut self, _test: &TestContext) -> Result<(), NemesisError> {
        let mut state = self.state.lock().unwrap();
        state.grudge = None;
        state.partitioner_teardowns += 1;
        Ok(())
    }
}

fn fast_opts() -> PackageOpts {
    PackageOpts {
        interval: Duration::from_millis(0),
    }
}

#[test]
fn full_package_drives_all_fault_types_and_heals() {
    let test = TestContext::from_names(&["n1", "n2", "n3", "n4", "n5"]);
    let state = Arc::new(Mutex::new(ClusterState::default()));
    let db = FakeDb {
        state: state.clone(),
    };
    let partitioner = FakePartitioner {
        state: state.clone(),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(70);

    let mut package = db_package(db, Some(partitioner), &fast_opts());
    let history = drive(&mut package, &test, &mut rng, 60);

    // Every scheduled op completed; nothing failed.
    assert!(history.iter().all(|op| op.kind != OpKind::Fail));
    let completed: Vec<FaultKind> = history
        .iter()
        .filter(|op| op.kind == OpKind::Info)
        .map(|op| op.f)
        .collect();
    for f in [
        FaultKind::Kill,
        FaultKind::Start,
        FaultKind::Pause,
        FaultKind::Resume,
        FaultKind::StartPartition,
        FaultKind::StopPartition,
    ] {
        assert!(completed.contains(&f), "{:?} never ran", f);
    }

    // Cleanup healed the cluster and tore the partitioner down.
    let state = state.lock().unwrap();
    assert!(state.grudge.is_none(), "partitions healed at the end");
    assert_eq!(state.partitioner_setups, 1);
    assert_eq!(state.partitioner_teardowns, 1);
    assert!(state.down.values().all(|down| !down), "all nodes restarted");
    assert!(
        state.paused.values().all(|paused| !paused),
        "all nodes resumed"
    );
}

#[test]
fn cleanup_ops_trail_the_main_schedule() {
    let test = TestContext::from_names(&["n1", "n2", "n3"]);
    let state = Arc::new(Mutex::new(ClusterState::default()));
    let db = FakeDb {
        state: state.clone(),
    };
    let partitioner = FakePartitioner { state };
    let mut rng = ChaCha8Rng::seed_from_u64(71);

    let mut package = db_package(db, Some(partitioner), &fast_opts());
    let history = drive(&mut package, &test, &mut rng, 20);

    // The final three completions are the deterministic cleanup sequence:
    // process package finals (start, resume) then the partition heal.
    let completions: Vec<FaultKind> = history
        .iter()
        .filter(|op| op.kind == OpKind::Info)
        .map(|op| op.f)
        .collect();
    let tail = &completions[completions.len() - 3..];
    assert_eq!(
        tail,
        [
            FaultKind::Start,
            FaultKind::Resume,
            FaultKind::StopPartition,
        ]
    );
}

#[test]
fn teardown_after_teardown_is_safe() {
    let test = TestContext::from_names(&["n1", "n2"]);
    let state = Arc::new(Mutex::new(ClusterState::default()));
    let db = FakeDb {
        state: state.clone(),
    };
    let partitioner = FakePartitioner {
        state: state.clone(),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(72);

    let mut package = db_package(db, Some(partitioner), &fast_opts());
    drive(&mut package, &test, &mut rng, 5);

    // Calling teardown again - as an unconditional cleanup path would -
    // must not fail.
    package.nemesis.teardown(&test).unwrap();
    package.nemesis.teardown(&test).unwrap();
    assert_eq!(state.lock().unwrap().partitioner_teardowns, 3);
}

/// Synthesize a workload history: `processes` processes, `keys` registers,
/// a mix of reads and writes. Writes bump a per-key counter; reads observe
/// the current value, so the result is monotone per key.
fn monotone_history(
    rng: &mut ChaCha8Rng,
    ops: usize,
    processes: i64,
    key_names: &[&str],
) -> History {
    let mut counters: BTreeMap<Key, Val> = key_names
        .iter()
        .map(|k| (k.to_string(), 0))
        .collect();
    let mut history = History::new();
    for _ in 0..ops {
        let process = rng.gen_range(0..processes);
        let key = key_names[rng.gen_range(0..key_names.len())].to_string();
        if rng.gen_bool(0.5) {
            let next = counters[&key] + 1;
            counters.insert(key.clone(), next);
            let regs: BTreeMap<Key, Val> = [(key, next)].into_iter().collect();
            history.push(Operation::ok_write(process, OpValue::Registers(regs)));
        } else {
            let regs: BTreeMap<Key, Val> =
                [(key.clone(), counters[&key])].into_iter().collect();
            history.push(Operation::ok_read(process, OpValue::Registers(regs)));
        }
    }
    history
}

#[test]
fn large_mixed_history_checks_deterministically() {
    let mut rng = ChaCha8Rng::seed_from_u64(73);
    let history = monotone_history(&mut rng, 10_000, 100, &["x", "y"]);

    let first = checker::check(&history);
    let second = checker::check(&history);

    assert!(first.valid, "monotone history must check clean");
    assert_eq!(first, second, "same input, same verdict");
    assert_eq!(first.stats.ops_examined, 10_000);
    assert_eq!(first.stats.keys_checked, 2);
}

#[test]
fn stale_read_in_a_large_history_is_caught() {
    let mut rng = ChaCha8Rng::seed_from_u64(74);
    let mut history = monotone_history(&mut rng, 10_000, 100, &["x", "y"]);

    // One process sees x go backwards.
    let regs_hi: BTreeMap<Key, Val> = [("x".to_string(), 1_000_000)].into_iter().collect();
    let regs_lo: BTreeMap<Key, Val> = [("x".to_string(), 2)].into_iter().collect();
    history.push(Operation::ok_read(7, OpValue::Registers(regs_hi)));
    history.push(Operation::ok_read(7, OpValue::Registers(regs_lo)));
    let regs_hi: BTreeMap<Key, Val> = [("x".to_string(), 1_000_000)].into_iter().collect();
    history.push(Operation::ok_read(7, OpValue::Registers(regs_hi)));

    let result = checker::check(&history);
    assert!(!result.valid);
    assert!(result.errors.contains_key("x"));
    assert!(!result.errors.contains_key("y"));
}

#[test]
fn nemesis_history_does_not_disturb_the_checker() {
    // Nemesis ops interleaved with a monotone workload: the checker only
    // consumes ok reads, so the verdict stays clean.
    let mut rng = ChaCha8Rng::seed_from_u64(75);
    let mut history = monotone_history(&mut rng, 200, 5, &["x"]);
    history.insert(
        0,
        Operation::nemesis(FaultKind::Kill, OpValue::Nodes(crate::NodeSpec::One)),
    );
    history.push(Operation::nemesis(FaultKind::StopPartition, OpValue::None));

    let result = checker::check(&history);
    assert!(result.valid);
}
