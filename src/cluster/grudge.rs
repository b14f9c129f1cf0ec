//! Grudge construction: resolving a `PartitionSpec` to a concrete partition.
//!
//! A grudge maps each node to the set of nodes it cannot communicate with.
//! The map is directed; the canonical shapes below happen to be symmetric,
//! but a custom grudge need not be.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::select::majority;
use super::Node;

/// Node -> nodes it cannot reach.
pub type Grudge = BTreeMap<Node, BTreeSet<Node>>;

/// Abstract description of a partition shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionSpec {
    /// Isolate one random node from everything else.
    One,
    /// Bisect the cluster into two mutually isolated halves.
    Majority,
    /// Overlapping majorities arranged in a ring: every node keeps contact
    /// with some majority, but no strict global majority stays connected.
    MajoritiesRing,
    /// An already-concrete grudge, passed through as-is.
    Custom(Grudge),
}

/// Resolve `spec` against the cluster's node list.
pub fn resolve(all: &[Node], spec: &PartitionSpec, rng: &mut dyn RngCore) -> Grudge {
    match spec {
        PartitionSpec::One => {
            if all.is_empty() {
                return Grudge::new();
            }
            let isolated = all[rng.gen_range(0..all.len())].clone();
            let rest: Vec<Node> = all.iter().filter(|n| **n != isolated).cloned().collect();
            complete_grudge(&[vec![isolated], rest])
        }
        PartitionSpec::Majority => {
            let mut shuffled = all.to_vec();
            shuffled.shuffle(rng);
            let rest = shuffled.split_off(shuffled.len() / 2);
            complete_grudge(&[shuffled, rest])
        }
        PartitionSpec::MajoritiesRing => majorities_ring(all, rng),
        PartitionSpec::Custom(grudge) => grudge.clone(),
    }
}

/// A grudge in which every node refuses contact with every node outside its
/// own component.
fn complete_grudge(components: &[Vec<Node>]) -> Grudge {
    let mut grudge = Grudge::new();
    for (i, component) in components.iter().enumerate() {
        let others: BTreeSet<Node> = components
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, c)| c.iter().cloned())
            .collect();
        for node in component {
            grudge.insert(node.clone(), others.clone());
        }
    }
    grudge
}

/// Arrange the nodes in a shuffled ring; each node keeps contact with the
/// `ceil(n/2)` consecutive ring members starting at itself and holds a grudge
/// against the rest. Majorities overlap, so no global majority is cleanly
/// separable.
fn majorities_ring(all: &[Node], rng: &mut dyn RngCore) -> Grudge {
    let mut ring = all.to_vec();
    ring.shuffle(rng);
    let n = ring.len();
    let m = majority(n);
    let mut grudge = Grudge::new();
    for i in 0..n {
        let visible: BTreeSet<&Node> = (0..m).map(|k| &ring[(i + k) % n]).collect();
        let hated: BTreeSet<Node> = ring
            .iter()
            .filter(|node| !visible.contains(node))
            .cloned()
            .collect();
        grudge.insert(ring[i].clone(), hated);
    }
    grudge
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn nodes(n: usize) -> Vec<Node> {
        (1..=n).map(|i| format!("n{}", i)).collect()
    }

    fn assert_within_cluster(grudge: &Grudge, all: &[Node]) {
        for (node, hated) in grudge {
            assert!(all.contains(node));
            for h in hated {
                assert!(all.contains(h));
                assert_ne!(h, node, "no self-grudges");
            }
        }
    }

    #[test]
    fn one_isolates_exactly_one_node() {
        let all = nodes(5);
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let grudge = resolve(&all, &PartitionSpec::One, &mut rng);
        assert_within_cluster(&grudge, &all);

        let isolated: Vec<&Node> = grudge
            .iter()
            .filter(|(_, hated)| hated.len() == all.len() - 1)
            .map(|(n, _)| n)
            .collect();
        assert_eq!(isolated.len(), 1);
        let isolated = isolated[0];
        for (node, hated) in &grudge {
            if node != isolated {
                assert_eq!(hated.len(), 1);
                assert!(hated.contains(isolated));
            }
        }
    }

    #[test]
    fn majority_bisects_into_two_halves() {
        let all = nodes(5);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let grudge = resolve(&all, &PartitionSpec::Majority, &mut rng);
        assert_within_cluster(&grudge, &all);
        assert_eq!(grudge.len(), 5);

        // Each node hates exactly the opposite half.
        let sizes: Vec<usize> = grudge.values().map(|h| h.len()).collect();
        let hating_three = sizes.iter().filter(|&&s| s == 3).count();
        let hating_two = sizes.iter().filter(|&&s| s == 2).count();
        assert_eq!(hating_three, 2, "minority half hates the majority half");
        assert_eq!(hating_two, 3, "majority half hates the minority half");

        // Symmetric: a hates b iff b hates a.
        for (a, hated) in &grudge {
            for b in hated {
                assert!(grudge[b].contains(a));
            }
        }
    }

    #[test]
    fn majorities_ring_keeps_a_majority_per_node() {
        let all = nodes(5);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let grudge = resolve(&all, &PartitionSpec::MajoritiesRing, &mut rng);
        assert_within_cluster(&grudge, &all);
        assert_eq!(grudge.len(), 5);

        let m = majority(5);
        for (_, hated) in &grudge {
            // Visible set (self included) is exactly a majority.
            assert_eq!(5 - hated.len(), m);
        }
        // Every node is excluded from some node's visible majority.
        for node in &all {
            assert!(
                grudge.values().any(|hated| hated.contains(node)),
                "{} must be hated by someone",
                node
            );
        }
    }

    #[test]
    fn custom_passes_through() {
        let all = nodes(3);
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut custom = Grudge::new();
        custom.insert("n1".to_string(), [String::from("n2")].into_iter().collect());
        let grudge = resolve(&all, &PartitionSpec::Custom(custom.clone()), &mut rng);
        assert_eq!(grudge, custom);
    }

    #[test]
    fn empty_cluster_yields_empty_grudge() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        assert!(resolve(&[], &PartitionSpec::One, &mut rng).is_empty());
        assert!(resolve(&[], &PartitionSpec::Majority, &mut rng).is_empty());
        assert!(resolve(&[], &PartitionSpec::MajoritiesRing, &mut rng).is_empty());
    }
}
