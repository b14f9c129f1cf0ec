//! Strongly connected components via iterative Tarjan.
//!
//! Histories can produce graphs that are one long path over tens of
//! thousands of values; the depth-first walk therefore keeps its own frame
//! stack instead of recursing, so a linear graph cannot exhaust the call
//! stack.

use std::collections::{BTreeMap, BTreeSet};

use super::graph::DiGraph;
use crate::history::Val;

const UNVISITED: usize = usize::MAX;

/// Partition the graph's nodes into strongly connected components.
///
/// Every node lands in exactly one component. Isolated nodes and nodes whose
/// only edge is a self-loop are singletons; any multi-node mutual
/// reachability collapses into one component.
pub fn components(graph: &DiGraph) -> Vec<BTreeSet<Val>> {
    // Index nodes densely; edge targets missing from the key set still get
    // a slot so hand-built graphs behave.
    let mut ids: BTreeMap<Val, usize> = BTreeMap::new();
    let mut nodes: Vec<Val> = Vec::new();
    let intern = |v: Val, ids: &mut BTreeMap<Val, usize>, nodes: &mut Vec<Val>| {
        *ids.entry(v).or_insert_with(|| {
            nodes.push(v);
            nodes.len() - 1
        })
    };
    for (&u, targets) in graph {
        intern(u, &mut ids, &mut nodes);
        for &v in targets {
            intern(v, &mut ids, &mut nodes);
        }
    }
    let n = nodes.len();
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (u, targets) in graph {
        let ui = ids[u];
        for v in targets {
            adj[ui].push(ids[v]);
        }
    }

    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut result: Vec<BTreeSet<Val>> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        // (node, next edge to examine) frames replace recursion.
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(&(v, cursor)) = frames.last() {
            if cursor == 0 {
                index[v] = next_index;
                lowlink[v] = next_index;
                next_index += 1;
                stack.push(v);
                on_stack[v] = true;
            }
            if cursor < adj[v].len() {
                frames.last_mut().expect("frame present").1 += 1;
                let w = adj[v][cursor];
                if index[w] == UNVISITED {
                    frames.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[v]);
                }
                if lowlink[v] == index[v] {
                    let mut component = BTreeSet::new();
                    loop {
                        let w = stack.pop().expect("tarjan stack underflow");
                        on_stack[w] = false;
                        component.insert(nodes[w]);
                        if w == v {
                            break;
                        }
                    }
                    result.push(component);
                }
            }
        }
    }

    result
}
