//! Arborescent search over imposed-term sets.
//!
//! A single greedy regression pass can commit to a poor first term and then
//! need extra terms to compensate. The arborescence re-runs the pass with
//! different terms forced in first:
//!
//! - the root imposes nothing
//! - a node imposing `I` whose solution is `L` spawns one child per
//!   `ℓ ∈ L \ I`, imposing `I ++ [ℓ]`
//! - a child whose imposed set was already visited (as a set) is pruned
//! - a child imposing at least as many terms as the shortest solution found so
//!   far is pruned, since it cannot produce a shorter model
//!
//! The tree is expanded breadth-first. Nodes of one level are evaluated in
//! parallel and consumed in generation order, so the outcome does not depend
//! on scheduling.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::SearchConfig;
use crate::error::Result;
use crate::fit::forlsr::{orthogonal_regression, Regression};

/// One evaluated node of the arborescence.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub depth: usize,
    /// Imposed dictionary indices, in imposition order.
    pub imposed: Vec<usize>,
    pub regression: Regression,
}

/// All evaluated nodes plus bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchTree {
    /// Nodes in generation (breadth-first) order; `nodes[i].id == i`.
    pub nodes: Vec<SearchNode>,
    /// Children skipped as duplicates, as too long, or by the node budget.
    pub pruned: usize,
    /// Deepest level that produced at least one node.
    pub depth_reached: usize,
}

impl SearchTree {
    /// Length of the shortest solution in the tree.
    pub fn shortest(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.regression.terms.len())
            .min()
            .unwrap_or(0)
    }
}

/// Expand the arborescence for target `y` over candidate matrix `matrix`.
pub fn arborescence(y: &DVector<f64>, matrix: &DMatrix<f64>, opts: &SearchConfig) -> Result<SearchTree> {
    opts.validate()?;

    let root = orthogonal_regression(y, matrix, &[], opts)?;
    let mut shortest = root.terms.len();
    let mut nodes = vec![SearchNode {
        id: 0,
        parent: None,
        depth: 0,
        imposed: Vec::new(),
        regression: root,
    }];

    let mut visited: HashSet<Vec<usize>> = HashSet::new();
    visited.insert(Vec::new());

    let mut pruned = 0usize;
    let mut depth_reached = 0usize;
    let mut frontier = vec![0usize];

    for depth in 1..=opts.max_depth {
        let mut specs: Vec<(usize, Vec<usize>)> = Vec::new();
        for &pid in &frontier {
            let parent = &nodes[pid];
            for &term in &parent.regression.terms {
                if parent.imposed.contains(&term) {
                    continue;
                }
                let mut imposed = parent.imposed.clone();
                imposed.push(term);

                let mut key = imposed.clone();
                key.sort_unstable();
                if !visited.insert(key) || imposed.len() >= shortest {
                    pruned += 1;
                    continue;
                }
                specs.push((pid, imposed));
            }
        }

        let budget = opts.max_nodes.saturating_sub(nodes.len());
        if specs.len() > budget {
            pruned += specs.len() - budget;
            specs.truncate(budget);
        }
        if specs.is_empty() {
            break;
        }

        let results: Vec<Result<Regression>> = specs
            .par_iter()
            .map(|(_, imposed)| orthogonal_regression(y, matrix, imposed, opts))
            .collect();

        let mut next = Vec::with_capacity(specs.len());
        for ((pid, imposed), result) in specs.into_iter().zip(results) {
            let regression = result?;
            shortest = shortest.min(regression.terms.len());
            let id = nodes.len();
            nodes.push(SearchNode {
                id,
                parent: Some(pid),
                depth,
                imposed,
                regression,
            });
            next.push(id);
        }

        debug!(depth, nodes = next.len(), shortest, "arborescence level evaluated");
        depth_reached = depth;
        frontier = next;
    }

    info!(
        nodes = nodes.len(),
        pruned,
        depth = depth_reached,
        shortest,
        "arborescence search finished"
    );

    Ok(SearchTree {
        nodes,
        pruned,
        depth_reached,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y is built from columns 2 and 3; column 0 is a decoy that correlates
    /// strongly with y but is not part of it.
    fn decoy_problem() -> (DMatrix<f64>, DVector<f64>) {
        let n = 60;
        let base = DMatrix::from_fn(n, 3, |i, j| {
            let t = i as f64;
            match j {
                0 => (t * 0.21).sin(),
                1 => (t * 0.53).cos(),
                _ => (t * 0.87).sin() * (t * 0.05).cos(),
            }
        });
        let m = DMatrix::from_fn(n, 4, |i, j| match j {
            0 => base[(i, 1)] + base[(i, 2)] + 0.3 * base[(i, 0)],
            1 => base[(i, 0)],
            2 => base[(i, 1)],
            _ => base[(i, 2)],
        });
        let y = DVector::from_fn(n, |i, _| base[(i, 1)] + base[(i, 2)]);
        (m, y)
    }

    fn opts() -> SearchConfig {
        SearchConfig {
            rho: 1e-10,
            max_depth: 3,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn tree_finds_solution_at_most_as_long_as_root() {
        let (m, y) = decoy_problem();
        let tree = arborescence(&y, &m, &opts()).unwrap();
        let root_len = tree.nodes[0].regression.terms.len();
        assert!(tree.shortest() <= root_len);
        assert_eq!(tree.shortest(), 2);
    }

    #[test]
    fn search_is_deterministic() {
        let (m, y) = decoy_problem();
        let a = arborescence(&y, &m, &opts()).unwrap();
        let b = arborescence(&y, &m, &opts()).unwrap();
        assert_eq!(a.nodes.len(), b.nodes.len());
        for (na, nb) in a.nodes.iter().zip(b.nodes.iter()) {
            assert_eq!(na.imposed, nb.imposed);
            assert_eq!(na.regression.terms, nb.regression.terms);
        }
    }

    #[test]
    fn depth_zero_is_a_single_pass() {
        let (m, y) = decoy_problem();
        let cfg = SearchConfig {
            max_depth: 0,
            ..opts()
        };
        let tree = arborescence(&y, &m, &cfg).unwrap();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.depth_reached, 0);
    }

    #[test]
    fn node_budget_is_respected() {
        let (m, y) = decoy_problem();
        let cfg = SearchConfig {
            max_nodes: 2,
            ..opts()
        };
        let tree = arborescence(&y, &m, &cfg).unwrap();
        assert!(tree.nodes.len() <= 2);
    }

    #[test]
    fn imposed_sets_are_unique() {
        let (m, y) = decoy_problem();
        let tree = arborescence(&y, &m, &opts()).unwrap();
        let mut keys: Vec<Vec<usize>> = tree
            .nodes
            .iter()
            .map(|n| {
                let mut k = n.imposed.clone();
                k.sort_unstable();
                k
            })
            .collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }
}
