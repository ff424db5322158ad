
use crate::cost_model::{CostModel, PhasingError};
use crate::solvers::{SolveStats, Solution, WcspSolver};

use log::debug;

/// Above this, enumeration takes far too long to be useful
pub const DEFAULT_MAX_VARIABLES: usize = 24;

/// Enumerates every assignment of the free variables and keeps the cheapest.
/// Ties keep the first assignment encountered, where variable 1 is the lowest bit.
pub struct BruteForceSolver {
    /// problems with more variables than this are rejected
    max_variables: usize
}

impl BruteForceSolver {
    pub fn new(max_variables: usize) -> BruteForceSolver {
        BruteForceSolver {
            max_variables
        }
    }
}

impl Default for BruteForceSolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VARIABLES)
    }
}

impl WcspSolver for BruteForceSolver {
    fn name(&self) -> &str {
        "brute-force"
    }

    fn solve(&self, model: &CostModel) -> Result<Solution, PhasingError> {
        let num_variables: usize = model.num_variables();
        if num_variables > self.max_variables {
            return Err(PhasingError::SolverFailure(format!(
                "brute-force solver supports at most {} variables, model has {}", self.max_variables, num_variables
            )));
        }

        // seed the fixed values and figure out which variables we get to flip
        let mut assignment: Vec<u8> = vec![0; num_variables];
        let mut is_fixed: Vec<bool> = vec![false; num_variables];
        for fc in model.fixed().iter() {
            if fc.variable >= num_variables || fc.value > 1 {
                return Err(PhasingError::SolverFailure(format!("invalid fixed constraint {fc:?}")));
            }
            assignment[fc.variable] = fc.value;
            is_fixed[fc.variable] = true;
        }
        let free_variables: Vec<usize> = (0..num_variables)
            .filter(|&v| !is_fixed[v])
            .collect();

        let mut best: Option<(u64, Vec<u8>)> = None;
        let mut explored_nodes: u64 = 0;
        for mask in 0..(1_u64 << free_variables.len()) {
            for (bit, &v) in free_variables.iter().enumerate() {
                assignment[v] = ((mask >> bit) & 1) as u8;
            }
            explored_nodes += 1;

            let cost: u64 = model.total_cost(&assignment);
            let is_better = match best.as_ref() {
                Some((best_cost, _)) => cost < *best_cost,
                None => true
            };
            if is_better {
                best = Some((cost, assignment.clone()));
            }
        }

        match best {
            Some((cost, assignment)) => {
                debug!("brute-force explored {} assignments, best cost {}", explored_nodes, cost);
                Ok(Solution {
                    assignment,
                    statistics: SolveStats {
                        explored_nodes,
                        pruned_nodes: 0,
                        estimated_cost: None,
                        cost
                    }
                })
            },
            None => Err(PhasingError::SolverFailure("no assignments were enumerated".to_string()))
        }
    }
}
