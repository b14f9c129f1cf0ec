//! Node selection: resolving an abstract `NodeSpec` to concrete nodes.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::Node;

/// Abstract description of which nodes a fault should target.
///
/// Resolution re-samples on every call, so repeated resolution of the same
/// spec may yield different node sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeSpec {
    /// A uniformly random non-empty subset.
    Any,
    /// Exactly one random node.
    One,
    /// A strict minority: `ceil(n/2) - 1` nodes, sampled without replacement.
    Minority,
    /// `ceil(n/2)` nodes, sampled without replacement.
    Majority,
    /// Every node.
    All,
    /// An explicit list, passed through unvalidated.
    Named(Vec<Node>),
}

/// Number of nodes in a majority of `n`: `ceil(n/2)`.
pub fn majority(n: usize) -> usize {
    (n + 1) / 2
}

/// Resolve `spec` against `all`, drawing randomness from `rng`.
pub fn resolve(all: &[Node], spec: &NodeSpec, rng: &mut dyn RngCore) -> Vec<Node> {
    match spec {
        NodeSpec::Any => {
            if all.is_empty() {
                return Vec::new();
            }
            // Coin-flip membership, rejecting the empty draw: uniform over
            // non-empty subsets, so the full set and singletons all occur.
            loop {
                let picked: Vec<Node> = all
                    .iter()
                    .filter(|_| rng.gen_bool(0.5))
                    .cloned()
                    .collect();
                if !picked.is_empty() {
                    return picked;
                }
            }
        }
        NodeSpec::One => sample(all, 1.min(all.len()), rng),
        NodeSpec::Minority => sample(all, majority(all.len()).saturating_sub(1), rng),
        NodeSpec::Majority => sample(all, majority(all.len()), rng),
        NodeSpec::All => all.to_vec(),
        NodeSpec::Named(nodes) => nodes.clone(),
    }
}

/// `count` nodes sampled without replacement.
fn sample(all: &[Node], count: usize, rng: &mut dyn RngCore) -> Vec<Node> {
    let mut pool = all.to_vec();
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}
