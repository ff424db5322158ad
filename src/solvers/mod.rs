
/// Best-first search with a queue-size pruning strategy, the default solver
pub mod astar_solver;
/// Exhaustive enumeration, only usable for small problems
pub mod brute_force;
/// Adapter that runs an external toulbar2 binary on an exported .wcsp file
pub mod toulbar2;

use crate::cost_model::{CostModel, PhasingError};

use std::path::PathBuf;

/// Statistics reported by a solver for a single model.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SolveStats {
    /// The number of partial or full assignments evaluated
    pub explored_nodes: u64,
    /// The number of partial assignments discarded to bound memory; if this is 0 the solution is optimal
    pub pruned_nodes: u64,
    /// For heuristic solvers, the estimated cost prior to searching
    pub estimated_cost: Option<u64>,
    /// The total pairwise cost of the returned assignment
    pub cost: u64
}

/// The result from a solver: one binary value per variable and the search statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub assignment: Vec<u8>,
    pub statistics: SolveStats
}

/// Capability to minimize a binary pairwise cost model.
/// Implementations must honor the fixed constraints in the model and return one 0/1 value per variable.
pub trait WcspSolver {
    /// Short name used for logging
    fn name(&self) -> &str;

    /// Finds an assignment that minimizes the total pairwise cost.
    /// # Errors
    /// * `PhasingError::SolverFailure` if no assignment could be produced
    fn solve(&self, model: &CostModel) -> Result<Solution, PhasingError>;
}

/// Solver implementations that can be selected from the command line
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum SolverKind {
    Astar,
    BruteForce,
    #[strum(serialize = "toulbar2")]
    Toulbar2
}

/// Everything needed to construct any of the solvers
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Which solver to build
    pub kind: SolverKind,
    /// Queue size limit for A*; 0 disables pruning
    pub max_queue_size: usize,
    /// Maximum number of variables the brute-force solver will accept
    pub max_brute_force_variables: usize,
    /// Path or name of the toulbar2 executable
    pub toulbar2_path: PathBuf
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            kind: SolverKind::Astar,
            max_queue_size: astar_solver::DEFAULT_MAX_QUEUE_SIZE,
            max_brute_force_variables: brute_force::DEFAULT_MAX_VARIABLES,
            toulbar2_path: PathBuf::from("toulbar2")
        }
    }
}

/// Creates a solver from the configuration
pub fn create_solver(config: &SolverConfig) -> Box<dyn WcspSolver + Send + Sync> {
    match config.kind {
        SolverKind::Astar => Box::new(astar_solver::AstarSolver::new(config.max_queue_size)),
        SolverKind::BruteForce => Box::new(brute_force::BruteForceSolver::new(config.max_brute_force_variables)),
        SolverKind::Toulbar2 => Box::new(toulbar2::Toulbar2Solver::new(config.toulbar2_path.clone()))
    }
}
