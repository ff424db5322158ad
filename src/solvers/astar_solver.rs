
use crate::cost_model::{CostMatrix, CostModel, PhasingError};
use crate::solvers::{SolveStats, Solution, WcspSolver};

use log::{debug, trace};
use priority_queue::PriorityQueue;
use std::cmp::Reverse;

/// Default upper bound on the number of nodes in the queue before pruning starts
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100000;

/// Ranked by minimum total cost -> most assigned variables -> earliest node index
type NodePriority = (Reverse<u64>, usize, Reverse<u64>);

/// A node in the A* search tree, i.e. an assignment to the first N variables.
#[derive(Eq,Hash,PartialEq)]
struct AstarNode {
    /// The node index
    node_index: u64,
    /// The cost of all pairwise functions where both variables are assigned
    frozen_cost: u64,
    /// A lower bound on the cost of all pairwise functions with an unassigned variable
    heuristic_cost: u64,
    /// The values assigned so far, in variable order
    assignment: Vec<u8>
}

impl std::fmt::Debug for AstarNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AstarNode")
            .field("frozen_cost", &self.frozen_cost)
            .field("heuristic_cost", &self.heuristic_cost)
            .field("assignment.len()", &self.assignment.len())
            .finish()
    }
}

impl AstarNode {
    /// Returns a new empty root node with a heuristic cost.
    /// # Arguments
    /// * `max_heuristic` - the estimate cost for the full problem
    fn new(max_heuristic: u64) -> AstarNode {
        AstarNode {
            node_index: 0,
            frozen_cost: 0,
            heuristic_cost: max_heuristic,
            assignment: vec![]
        }
    }

    /// Creates a node extending a parent by one more variable.
    /// # Arguments
    /// * `node_index` - the index to use for this node, generally the order nodes are generated
    /// * `parent_node` - the node we are extending
    /// * `value` - the value for the next variable
    /// * `search_space` - the cost functions indexed for the search
    fn new_extended_node(node_index: u64, parent_node: &AstarNode, value: u8, search_space: &SearchSpace) -> AstarNode {
        let mut assignment: Vec<u8> = parent_node.assignment.clone();
        assignment.push(value);
        let variable: usize = assignment.len() - 1;

        // everything that ends on this variable is now fully assigned
        let mut frozen_cost: u64 = parent_node.frozen_cost;
        for &(lower, matrix) in search_space.closing[variable].iter() {
            frozen_cost = frozen_cost.saturating_add(matrix.cost(assignment[lower], value));
        }

        let heuristic_cost: u64 = search_space.heuristic(&assignment);
        AstarNode {
            node_index,
            frozen_cost,
            heuristic_cost,
            assignment
        }
    }

    fn get_total_cost(&self) -> u64 {
        self.frozen_cost.saturating_add(self.heuristic_cost)
    }

    fn get_priority(&self) -> NodePriority {
        (Reverse(self.get_total_cost()), self.assignment.len(), Reverse(self.node_index))
    }

    /// Returns a priority that floats to the top of the queue, used to force pruning
    fn get_cleared_priority(&self) -> NodePriority {
        (Reverse(0), self.assignment.len(), Reverse(self.node_index))
    }

    fn get_assigned_count(&self) -> usize {
        self.assignment.len()
    }
}

/// The cost model re-indexed for a left-to-right search over the variables.
struct SearchSpace<'a> {
    /// For each variable, the functions whose larger variable is this one: (smaller variable, costs)
    closing: Vec<Vec<(usize, &'a CostMatrix)>>,
    /// Every function as (smaller variable, larger variable, costs)
    functions: Vec<(usize, usize, &'a CostMatrix)>,
    /// The allowed values per variable after the fixed constraints
    domains: Vec<Vec<u8>>
}

impl<'a> SearchSpace<'a> {
    fn new(model: &'a CostModel) -> Result<SearchSpace<'a>, PhasingError> {
        let num_variables: usize = model.num_variables();
        let mut closing: Vec<Vec<(usize, &CostMatrix)>> = vec![vec![]; num_variables];
        let mut functions: Vec<(usize, usize, &CostMatrix)> = Vec::with_capacity(model.pairwise().len());
        for (&(k, l), pc) in model.pairwise().iter() {
            if k >= l || l >= num_variables {
                return Err(PhasingError::SolverFailure(format!("invalid pairwise function over variables ({k}, {l})")));
            }
            closing[l].push((k, pc.matrix()));
            functions.push((k, l, pc.matrix()));
        }

        let mut domains: Vec<Vec<u8>> = vec![vec![0, 1]; num_variables];
        for fc in model.fixed().iter() {
            if fc.variable >= num_variables || fc.value > 1 {
                return Err(PhasingError::SolverFailure(format!("invalid fixed constraint {fc:?}")));
            }
            domains[fc.variable].retain(|&v| v == fc.value);
        }

        Ok(SearchSpace {
            closing,
            functions,
            domains
        })
    }

    /// Lower bound on the cost of all functions that are not fully assigned yet.
    /// Each function contributes its cheapest cell that is consistent with whatever is assigned.
    /// # Arguments
    /// * `assignment` - values for the first `assignment.len()` variables
    fn heuristic(&self, assignment: &[u8]) -> u64 {
        let assigned: usize = assignment.len();
        self.functions.iter()
            .filter(|(_k, l, _m)| *l >= assigned)
            .map(|&(k, _l, m)| m.min_cost(assignment.get(k).copied(), None))
            .fold(0, u64::saturating_add)
    }
}

/// Best-first search over partial assignments in variable order.
/// Without pruning the first complete assignment popped from the queue is optimal.
/// When the queue grows past `max_queue_size`, partial assignments that lag behind the search front are discarded to bound memory.
pub struct AstarSolver {
    /// the queue limit, 0 disables pruning
    max_queue_size: usize
}

impl AstarSolver {
    pub fn new(max_queue_size: usize) -> AstarSolver {
        AstarSolver {
            max_queue_size
        }
    }
}

impl Default for AstarSolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUE_SIZE)
    }
}

impl WcspSolver for AstarSolver {
    fn name(&self) -> &str {
        "astar"
    }

    fn solve(&self, model: &CostModel) -> Result<Solution, PhasingError> {
        let search_space = SearchSpace::new(model)?;
        let num_variables: usize = model.num_variables();
        let prune_enabled: bool = self.max_queue_size > 0;

        let estimated_cost: u64 = search_space.heuristic(&[]);
        let mut pqueue: PriorityQueue<AstarNode, NodePriority> = PriorityQueue::new();
        let initial_node = AstarNode::new(estimated_cost);
        let initial_priority = initial_node.get_priority();
        pqueue.push(initial_node, initial_priority);
        let mut next_node_index: u64 = 1;

        // statistics we want to gather
        let mut explored_nodes: u64 = 0;
        let mut pruned_nodes: u64 = 0;

        // anything with fewer assigned variables than this gets discarded when popped
        let mut min_progress: usize = 0;
        let mut next_expected: usize = 0;

        loop {
            let (top_node, top_priority) = match pqueue.pop() {
                Some(entry) => entry,
                None => {
                    return Err(PhasingError::SolverFailure("search queue emptied before a full assignment was found".to_string()));
                }
            };
            let assigned_count: usize = top_node.get_assigned_count();
            if assigned_count == num_variables {
                debug!("astar ({}/{}, {:?} {}) => {:?}", next_expected, num_variables, top_priority, pqueue.len(), top_node);
                debug!("astar explored {} nodes, pruned {}, estimate {} => cost {}", explored_nodes, pruned_nodes, estimated_cost, top_node.frozen_cost);
                assert!(top_node.frozen_cost >= estimated_cost);
                return Ok(Solution {
                    statistics: SolveStats {
                        explored_nodes,
                        pruned_nodes,
                        estimated_cost: Some(estimated_cost),
                        cost: top_node.frozen_cost
                    },
                    assignment: top_node.assignment
                });
            }

            if assigned_count < min_progress {
                pruned_nodes += 1;
                continue;
            }

            explored_nodes += 1;
            if assigned_count == next_expected {
                trace!("astar ({}/{}, {:?} {}) => {:?}", next_expected, num_variables, top_priority, pqueue.len(), top_node);
                next_expected += 1;
            }

            for &value in search_space.domains[assigned_count].iter() {
                let new_node = AstarNode::new_extended_node(next_node_index, &top_node, value, &search_space);
                next_node_index += 1;
                let new_priority = new_node.get_priority();
                pqueue.push(new_node, new_priority);
            }

            // bound memory by raising the minimum progress and flushing everything behind it
            if prune_enabled && pqueue.len() > self.max_queue_size && min_progress < next_expected {
                min_progress += 1;
                let mut prune_count: usize = 0;
                for (node, priority) in pqueue.iter_mut() {
                    if node.get_assigned_count() < min_progress {
                        *priority = node.get_cleared_priority();
                        prune_count += 1;
                    }
                }
                debug!("astar min_progress={}, flushing {} nodes", min_progress, prune_count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_model::build_costs;
    use crate::data_types::marker_pair::{MarkerPair, PairCounts};
    use crate::solvers::brute_force::BruteForceSolver;
    use std::collections::BTreeMap;

    /// Builds a model over `num_markers` markers from (a, b, discordant, concordant) tuples
    fn build_model(num_markers: usize, edges: &[(usize, usize, u64, u64)]) -> CostModel {
        let mut pairs: BTreeMap<MarkerPair, PairCounts> = BTreeMap::new();
        for &(a, b, disc, conc) in edges.iter() {
            pairs.insert(MarkerPair::new(a, b), PairCounts::new(disc, conc));
        }
        let markers: Vec<usize> = (0..num_markers).collect();
        let rate = |i: usize, j: usize| 0.01 * i.abs_diff(j) as f64;
        build_costs(&markers, &pairs, &rate).unwrap()
    }

    /// Deterministic pseudo-random edges so we can compare against brute force
    fn pseudo_random_edges(num_markers: usize, seed: u64) -> Vec<(usize, usize, u64, u64)> {
        let mut state: u64 = seed;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            state >> 33
        };
        let mut edges = vec![];
        for a in 0..num_markers {
            for b in (a+1)..num_markers.min(a+4) {
                edges.push((a, b, next() % 4, next() % 4));
            }
        }
        edges
    }

    #[test]
    fn test_astarnode() {
        let model = build_model(3, &[(0, 1, 2, 0), (1, 2, 0, 2)]);
        let search_space = SearchSpace::new(&model).unwrap();
        assert_eq!(search_space.domains, vec![vec![0], vec![0, 1], vec![0, 1]]);

        let root = AstarNode::new(search_space.heuristic(&[]));
        assert_eq!(root.get_total_cost(), 0);
        assert_eq!(root.get_assigned_count(), 0);

        let n1 = AstarNode::new_extended_node(1, &root, 0, &search_space);
        assert_eq!(n1.frozen_cost, 0);
        // 0 and 1 agreeing costs the flip penalty
        let n2 = AstarNode::new_extended_node(2, &n1, 0, &search_space);
        let flip_penalty = model.pairwise()[&(0, 1)].matrix().agree_cost();
        assert!(flip_penalty > 0);
        assert_eq!(n2.frozen_cost, flip_penalty);
        assert_eq!(n2.get_priority(), (Reverse(flip_penalty), 2, Reverse(2)));
        assert_eq!(n2.get_cleared_priority(), (Reverse(0), 2, Reverse(2)));

        let n3 = AstarNode::new_extended_node(3, &n1, 1, &search_space);
        assert_eq!(n3.get_total_cost(), 0);
    }

    #[test]
    fn test_astar_matches_brute_force() {
        for seed in 0..20 {
            let model = build_model(9, &pseudo_random_edges(9, seed));
            let astar = AstarSolver::default().solve(&model).unwrap();
            let brute = BruteForceSolver::default().solve(&model).unwrap();
            assert_eq!(astar.statistics.cost, brute.statistics.cost, "seed {seed}");
            assert_eq!(model.total_cost(&astar.assignment), astar.statistics.cost);
            assert!(model.is_feasible(&astar.assignment));
            assert_eq!(astar.statistics.pruned_nodes, 0);
            assert!(astar.statistics.estimated_cost.unwrap() <= astar.statistics.cost);
        }
    }

    #[test]
    fn test_astar_pruned_still_solves() {
        let model = build_model(14, &pseudo_random_edges(14, 7));
        let solution = AstarSolver::new(4).solve(&model).unwrap();
        assert_eq!(solution.assignment.len(), 14);
        assert_eq!(solution.assignment[0], 0);
        assert_eq!(model.total_cost(&solution.assignment), solution.statistics.cost);

        assert!(solution.statistics.pruned_nodes > 0);

        let optimal = BruteForceSolver::default().solve(&model).unwrap();
        assert!(solution.statistics.cost >= optimal.statistics.cost);
    }

    #[test]
    fn test_astar_extreme_weights() {
        // every pair carries the largest weight; the sums must not overflow
        let markers: Vec<usize> = (0..4).collect();
        let mut pairs: BTreeMap<MarkerPair, PairCounts> = BTreeMap::new();
        for a in 0..4 {
            for b in (a+1)..4 {
                pairs.insert(MarkerPair::new(a, b), PairCounts::new(1_000_000_000_000_000, 0));
            }
        }
        let rate = |_i: usize, _j: usize| 1e-300;
        let model = build_costs(&markers, &pairs, &rate).unwrap();

        let solution = AstarSolver::default().solve(&model).unwrap();
        let optimal = BruteForceSolver::default().solve(&model).unwrap();
        assert_eq!(solution.statistics.cost, optimal.statistics.cost);
        // a frustrated clique of 4 can satisfy at most 4 of the 6 "disagree" pairs
        assert_eq!(solution.statistics.cost, 2 * crate::cost_model::MAX_PAIR_WEIGHT as u64);
    }

    #[test]
    fn test_astar_disconnected() {
        // two independent components, the second one can be flipped freely so the first solution found wins
        let model = build_model(4, &[(0, 1, 3, 0), (2, 3, 0, 3)]);
        let solution = AstarSolver::default().solve(&model).unwrap();
        assert_eq!(solution.statistics.cost, 0);
        assert_eq!(solution.assignment[0], 0);
        assert_eq!(solution.assignment[1], 1);
        assert_eq!(solution.assignment[2], solution.assignment[3]);
    }
}
