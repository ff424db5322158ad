
use crate::cost_model::{CostModel, PhasingError, decode};
use crate::data_types::observations::FamilyObservations;
use crate::data_types::recombination::RecombinationModel;
use crate::evidence::{PairEvidence, aggregate};
use crate::solvers::{SolveStats, WcspSolver};

use log::{debug, warn};

/// Everything produced while phasing a single family.
#[derive(Clone, Debug)]
pub struct PhaseResult {
    /// The family (shared parent) identifier
    pub family_id: String,
    /// The number of offspring in the family
    pub num_offspring: usize,
    /// The number of marker positions in the observations
    pub num_markers: usize,
    /// The aggregated pairwise evidence
    pub evidence: PairEvidence,
    /// The cost model that was solved, None if the family was not phased
    pub model: Option<CostModel>,
    /// Phase calls, aligned with `evidence.informative_markers()`; empty if the family was not phased
    pub phases: Vec<u8>,
    /// Optional statistics from the solver
    pub statistics: Option<SolveStats>,
    /// CPU time spent in the solver, in seconds
    pub solve_cputime: f64
}

impl PhaseResult {
    /// Returns true if this result carries phase calls
    pub fn is_phased(&self) -> bool {
        !self.phases.is_empty()
    }

    /// Returns (marker position, phase) for every phased marker
    pub fn phase_calls(&self) -> Vec<(usize, u8)> {
        self.evidence.informative_markers().iter()
            .copied()
            .zip(self.phases.iter().copied())
            .collect()
    }
}

/// Runs the full phasing pipeline for one family: aggregate, build costs, solve, validate, and decode.
/// # Arguments
/// * `family` - the offspring observations for a single shared parent
/// * `rate_model` - the recombination model used to weight each pair
/// * `solver` - the WCSP solver used to find the phase assignment
/// # Errors
/// * `DegenerateProblem` if fewer than 2 informative markers were found
/// * `InvalidRate` if the rate model produces an unusable rate
/// * `SolverFailure` or `DecodeLengthMismatch` if the solver does not produce a usable assignment
pub fn phase_family<R: RecombinationModel + ?Sized>(
    family: &FamilyObservations,
    rate_model: &R,
    solver: &dyn WcspSolver
) -> Result<PhaseResult, PhasingError> {
    let evidence: PairEvidence = aggregate(family.iter());
    debug!(
        "Family {:?}: {}/{} informative offspring, {} informative markers, {} pairs",
        family.family_id(), evidence.informative_offspring(), family.num_offspring(),
        evidence.informative_markers().len(), evidence.num_pairs()
    );

    let model: CostModel = CostModel::from_evidence(&evidence, rate_model)?;

    let solve_start = cpu_time::ThreadTime::now();
    let solution = solver.solve(&model)?;
    let solve_cputime: f64 = solve_start.elapsed().as_secs_f64();
    debug!("Family {:?}: {} solved in {} seconds, stats: {:?}", family.family_id(), solver.name(), solve_cputime, solution.statistics);

    // the solver is external, so verify it honored the contract before decoding
    model.check_assignment(&solution.assignment)?;
    let phases: Vec<u8> = decode(&model, &solution.assignment)?;
    if solution.statistics.pruned_nodes > 0 {
        warn!("Family {:?}: {} partial solutions were pruned, result may not be optimal", family.family_id(), solution.statistics.pruned_nodes);
    }

    Ok(PhaseResult {
        family_id: family.family_id().to_string(),
        num_offspring: family.num_offspring(),
        num_markers: family.num_markers(),
        evidence,
        model: Some(model),
        phases,
        statistics: Some(solution.statistics),
        solve_cputime
    })
}

/// Creates a result for a family that will not be phased, e.g. it has fewer than 2 informative markers.
/// The evidence is still collected so it can be reported.
/// # Arguments
/// * `family` - the family that is getting skipped
pub fn create_unphased_result(family: &FamilyObservations) -> PhaseResult {
    PhaseResult {
        family_id: family.family_id().to_string(),
        num_offspring: family.num_offspring(),
        num_markers: family.num_markers(),
        evidence: aggregate(family.iter()),
        model: None,
        phases: vec![],
        statistics: None,
        solve_cputime: 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::observations::PhaseObservation;
    use crate::data_types::recombination::HaldaneModel;
    use crate::solvers::Solution;
    use crate::solvers::astar_solver::AstarSolver;
    use crate::solvers::brute_force::BruteForceSolver;

    fn get_example_family() -> FamilyObservations {
        let mut family = FamilyObservations::new("sire_1".to_string());
        family.insert("T1".to_string(), PhaseObservation::from_values(&[1, 2, 2, 0, 1, 2, 1]));
        family.insert("T2".to_string(), PhaseObservation::from_values(&[2, 2, 2, 0, 1, 2, 0]));
        family.insert("T3".to_string(), PhaseObservation::from_values(&[0, 2, 2, 2, 0, 2, 0]));
        family.insert("T4".to_string(), PhaseObservation::from_values(&[2, 2, 2, 2, 2, 2, 2]));
        family
    }

    /// Returns a fixed assignment regardless of the model
    struct FixedSolver {
        assignment: Vec<u8>
    }

    impl WcspSolver for FixedSolver {
        fn name(&self) -> &str {
            "fixed"
        }

        fn solve(&self, _model: &CostModel) -> Result<Solution, PhasingError> {
            Ok(Solution {
                assignment: self.assignment.clone(),
                statistics: Default::default()
            })
        }
    }

    /// Always fails
    struct FailingSolver;

    impl WcspSolver for FailingSolver {
        fn name(&self) -> &str {
            "failing"
        }

        fn solve(&self, _model: &CostModel) -> Result<Solution, PhasingError> {
            Err(PhasingError::SolverFailure("no solution".to_string()))
        }
    }

    #[test]
    fn test_phase_example() {
        let family = get_example_family();
        let model = HaldaneModel::default();
        let result = phase_family(&family, &model, &AstarSolver::default()).unwrap();

        assert_eq!(result.family_id, "sire_1");
        assert_eq!(result.num_offspring, 4);
        assert_eq!(result.num_markers, 7);
        assert!(result.is_phased());
        assert_eq!(result.phase_calls(), vec![(0, 0), (3, 1), (4, 0), (6, 0)]);
        assert_eq!(result.statistics.as_ref().unwrap().cost, 0);

        let brute = phase_family(&family, &model, &BruteForceSolver::default()).unwrap();
        assert_eq!(brute.phases, result.phases);
    }

    #[test]
    fn test_phase_degenerate() {
        let mut family = FamilyObservations::new("sire_2".to_string());
        family.insert("A".to_string(), PhaseObservation::from_values(&[2, 1, 2]));
        family.insert("B".to_string(), PhaseObservation::from_values(&[2, 2, 2]));
        let result = phase_family(&family, &HaldaneModel::default(), &AstarSolver::default());
        assert_eq!(result.unwrap_err(), PhasingError::DegenerateProblem { num_markers: 0 });

        let unphased = create_unphased_result(&family);
        assert!(!unphased.is_phased());
        assert!(unphased.phase_calls().is_empty());
        assert!(unphased.model.is_none());
        assert_eq!(unphased.num_offspring, 2);
    }

    #[test]
    fn test_phase_bad_solvers() {
        let family = get_example_family();
        let model = HaldaneModel::default();

        let short = FixedSolver { assignment: vec![0, 1] };
        assert_eq!(
            phase_family(&family, &model, &short).unwrap_err(),
            PhasingError::DecodeLengthMismatch { expected: 4, found: 2 }
        );

        let flipped_root = FixedSolver { assignment: vec![1, 0, 1, 1] };
        assert!(matches!(phase_family(&family, &model, &flipped_root), Err(PhasingError::SolverFailure(_))));

        let non_binary = FixedSolver { assignment: vec![0, 3, 0, 0] };
        assert!(matches!(phase_family(&family, &model, &non_binary), Err(PhasingError::SolverFailure(_))));

        assert!(matches!(phase_family(&family, &model, &FailingSolver), Err(PhasingError::SolverFailure(_))));

        // a well-formed answer is passed through as-is, even if it is not optimal
        let suboptimal = FixedSolver { assignment: vec![0, 0, 0, 0] };
        let result = phase_family(&family, &model, &suboptimal).unwrap();
        assert_eq!(result.phases, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_phase_invalid_rate() {
        let family = get_example_family();
        let zero_rate = |_i: usize, _j: usize| 0.0;
        assert!(matches!(
            phase_family(&family, &zero_rate, &AstarSolver::default()),
            Err(PhasingError::InvalidRate { .. })
        ));
    }
}
