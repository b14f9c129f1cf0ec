//! Schedule driver: pulls operations from a package and runs its nemesis.
//!
//! The main schedule runs up to an operation budget; the cleanup schedule
//! and teardown then run unconditionally, including after invocation
//! failures, so a crashed workload still leaves the cluster healed.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use tracing::{info, warn};

use crate::cluster::TestContext;
use crate::history::{History, OpKind, OpValue, Operation};
use crate::nemesis::compose::Package;

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Run one invocation, recording the invocation and its completion.
fn step(
    package: &mut Package,
    test: &TestContext,
    rng: &mut dyn RngCore,
    op: Operation,
    history: &mut History,
) {
    let f = op.f;
    let mut invocation = op.clone();
    invocation.time = Some(now_nanos());
    history.push(invocation);

    match package.nemesis.invoke(test, rng, op) {
        Ok(mut done) => {
            done.time = Some(now_nanos());
            history.push(done);
        }
        Err(e) => {
            warn!(error = %e, "nemesis invocation failed");
            let mut failed = Operation::nemesis(f, OpValue::Applied(e.to_string()));
            failed.kind = OpKind::Fail;
            failed.time = Some(now_nanos());
            history.push(failed);
        }
    }
}

/// Drive a package: setup, up to `max_ops` scheduled operations, then the
/// cleanup schedule and teardown. Returns everything that happened.
pub fn drive(
    package: &mut Package,
    test: &TestContext,
    rng: &mut dyn RngCore,
    max_ops: usize,
) -> History {
    let mut history = History::new();

    let ready = match package.nemesis.setup(test) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "nemesis setup failed; skipping main schedule");
            false
        }
    };

    if ready {
        for _ in 0..max_ops {
            let Some(op) = package.generator.next_op(rng) else {
                break;
            };
            step(package, test, rng, op, &mut history);
        }
    }

    // Cleanup runs no matter what happened above.
    while let Some(op) = package.final_generator.next_op(rng) {
        step(package, test, rng, op, &mut history);
    }

    if let Err(e) = package.nemesis.teardown(test) {
        warn!(error = %e, "nemesis teardown failed");
    }

    info!(ops = history.len(), "schedule complete");
    history
}
