//! Monotonicity checking over a captured history.
//!
//! Pipeline per register key: precedence graph -> strongly connected
//! components -> violation detection. A value that reappears "before" an
//! earlier one shows up as a multi-node component; the verdict reports those
//! components as data and never raises.

pub mod graph;
pub mod scc;

use std::collections::{BTreeMap, BTreeSet};

use crate::history::{FaultKind, History, Key, OpKind, Val};

/// A strongly connected component of observed values.
pub type Component = BTreeSet<Val>;

/// Counters describing one checker run. Reporting only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStats {
    /// Operations in the history.
    pub ops_examined: usize,
    /// Ok reads that fed the graphs.
    pub ok_reads: usize,
    /// Register keys that ran the full pipeline.
    pub keys_checked: usize,
    /// Total graph nodes across keys.
    pub nodes: usize,
    /// Total graph edges across keys.
    pub edges: usize,
    /// Total components across keys.
    pub components: usize,
}

/// Verdict over a history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// True iff no key has a violating component.
    pub valid: bool,
    /// Violating components per key; clean keys are absent.
    pub errors: BTreeMap<Key, Vec<Component>>,
    /// Run counters.
    pub stats: CheckStats,
}

/// The components that signify a monotonicity violation: those with more
/// than one node. Singletons - including self-loop-only nodes - are fine.
pub fn violations(components: &[Component]) -> Vec<Component> {
    components
        .iter()
        .filter(|c| c.len() > 1)
        .cloned()
        .collect()
}

/// Check a history for monotonicity violations.
///
/// Pure function of the history: stateless, repeatable, side-effect-free.
/// An empty or malformed history yields a vacuously valid verdict.
pub fn check(history: &History) -> CheckResult {
    let graphs = graph::build_graphs(history);

    let mut stats = CheckStats {
        ops_examined: history.len(),
        ok_reads: history
            .iter()
            .filter(|op| op.kind == OpKind::Ok && op.f == FaultKind::Read)
            .count(),
        keys_checked: graphs.len(),
        ..CheckStats::default()
    };

    let mut errors: BTreeMap<Key, Vec<Component>> = BTreeMap::new();
    for (key, graph) in &graphs {
        stats.nodes += graph.len();
        stats.edges += graph.values().map(|targets| targets.len()).sum::<usize>();

        let components = scc::components(graph);
        stats.components += components.len();

        let bad = violations(&components);
        if !bad.is_empty() {
            errors.insert(key.clone(), bad);
        }
    }

    CheckResult {
        valid: errors.is_empty(),
        errors,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{OpValue, Operation};

    fn scalar_read(process: i64, v: Val) -> Operation {
        Operation::ok_read(process, OpValue::Scalar(v))
    }

    fn keyed_read(process: i64, pairs: &[(&str, Val)]) -> Operation {
        let regs: BTreeMap<Key, Val> =
            pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        Operation::ok_read(process, OpValue::Registers(regs))
    }

    #[test]
    fn empty_history_is_vacuously_valid() {
        let result = check(&Vec::new());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.stats.keys_checked, 0);
    }

    #[test]
    fn monotone_reads_are_valid() {
        let history = vec![
            keyed_read(0, &[("x", 0)]),
            keyed_read(0, &[("x", 1)]),
            keyed_read(1, &[("y", 1)]),
            keyed_read(1, &[("y", 1)]),
            keyed_read(1, &[("y", 2)]),
            keyed_read(1, &[("y", 2)]),
        ];
        let result = check(&history);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.stats.keys_checked, 2);
        assert_eq!(result.stats.ok_reads, 6);
    }

    #[test]
    fn returning_value_is_a_violation() {
        let history = vec![
            keyed_read(0, &[("x", 0)]),
            keyed_read(0, &[("x", 1)]),
            keyed_read(0, &[("x", 0)]),
        ];
        let result = check(&history);
        assert!(!result.valid);
        let bad = &result.errors["x"];
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0], [0, 1].into_iter().collect::<Component>());
    }

    #[test]
    fn violations_are_scoped_to_their_key() {
        let history = vec![
            keyed_read(0, &[("x", 0), ("y", 0)]),
            keyed_read(0, &[("x", 1), ("y", 1)]),
            keyed_read(0, &[("x", 0), ("y", 2)]),
        ];
        let result = check(&history);
        assert!(!result.valid);
        assert!(result.errors.contains_key("x"));
        assert!(!result.errors.contains_key("y"));
    }

    #[test]
    fn single_implicit_key_runs_the_full_pipeline() {
        let history = vec![scalar_read(0, 0), scalar_read(0, 1), scalar_read(0, 0)];
        let result = check(&history);
        assert!(!result.valid);
        assert_eq!(result.stats.keys_checked, 1);
        assert!(result.errors.contains_key(""));
    }

    #[test]
    fn checking_is_repeatable() {
        let history = vec![scalar_read(0, 0), scalar_read(0, 1), scalar_read(0, 0)];
        assert_eq!(check(&history), check(&history));
    }
}
