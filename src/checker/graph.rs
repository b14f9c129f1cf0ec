//! Precedence-graph construction.
//!
//! For each register key, an edge `u -> v` means some process observed `u`
//! and then observed `v` on its very next (non-identical) read of that key.
//! Writes and non-ok reads contribute nothing; a malformed or empty history
//! degrades to empty graphs rather than an error.

use std::collections::{BTreeMap, BTreeSet};

use crate::history::{FaultKind, History, Key, OpKind, OpValue, Val};

/// Adjacency map: observed value -> values seen immediately afterwards.
/// Every observed value is present as a key, even with no outgoing edges.
pub type DiGraph = BTreeMap<Val, BTreeSet<Val>>;

/// Build one precedence graph per register key.
///
/// Keys are walked independently and never cross-linked; a scalar-valued
/// read addresses the implicit empty-string key.
pub fn build_graphs(history: &History) -> BTreeMap<Key, DiGraph> {
    let mut graphs: BTreeMap<Key, DiGraph> = BTreeMap::new();
    // Last observed value per (process, key); exact consecutive repeats are
    // dropped here so they add neither edges nor duplicate nodes.
    let mut last_read: BTreeMap<(i64, Key), Val> = BTreeMap::new();

    for op in history {
        if op.kind != OpKind::Ok || op.f != FaultKind::Read {
            continue;
        }
        let observed: Vec<(Key, Val)> = match &op.value {
            OpValue::Scalar(v) => vec![(Key::new(), *v)],
            OpValue::Registers(regs) => regs.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            _ => continue,
        };

        for (key, v) in observed {
            let graph = graphs.entry(key.clone()).or_default();
            graph.entry(v).or_default();

            match last_read.get(&(op.process, key.clone())) {
                Some(&prev) if prev == v => {}
                Some(&prev) => {
                    graph.entry(prev).or_default().insert(v);
                    last_read.insert((op.process, key), v);
                }
                None => {
                    last_read.insert((op.process, key), v);
                }
            }
        }
    }

    graphs
}
