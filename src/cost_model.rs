
use crate::data_types::marker_pair::{MarkerPair, PairCounts};
use crate::data_types::recombination::RecombinationModel;
use crate::evidence::PairEvidence;

use log::{debug, trace};
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum PhasingError {
    #[error("invalid recombination rate {rate} between markers {first} and {second}; rate must be in (0, 1)")]
    InvalidRate { first: usize, second: usize, rate: f64 },
    #[error("phasing requires at least 2 informative markers, found {num_markers}")]
    DegenerateProblem { num_markers: usize },
    #[error("marker {marker} has pair evidence but is not an informative marker")]
    UnknownMarker { marker: usize },
    #[error("solver failure: {0}")]
    SolverFailure(String),
    #[error("assignment has {found} values, but the model has {expected} variables")]
    DecodeLengthMismatch { expected: usize, found: usize }
}

/// A 2x2 cost table indexed by the phase values of the two variables in a pair.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct CostMatrix {
    /// costs[phase_first][phase_second]
    costs: [[u64; 2]; 2]
}

impl CostMatrix {
    pub fn new(costs: [[u64; 2]; 2]) -> CostMatrix {
        CostMatrix {
            costs
        }
    }

    /// Builds the matrix from a signed pair weight.
    /// Negative weights favor the same phase, so disagreeing assignments cost `-weight`.
    /// Non-negative weights favor a flipped phase, so agreeing assignments cost `weight`.
    /// # Arguments
    /// * `weight` - the rounded log-likelihood weight for the pair
    pub fn from_weight(weight: i64) -> CostMatrix {
        let penalty: u64 = weight.unsigned_abs();
        if weight < 0 {
            CostMatrix::new([
                [0, penalty],
                [penalty, 0]
            ])
        } else {
            CostMatrix::new([
                [penalty, 0],
                [0, penalty]
            ])
        }
    }

    /// Returns the cost for a pair of phase values
    /// # Panics
    /// * if either value is not 0 or 1
    pub fn cost(&self, phase_first: u8, phase_second: u8) -> u64 {
        self.costs[phase_first as usize][phase_second as usize]
    }

    /// The cost when both variables take the same value, (0,0) or (1,1)
    pub fn agree_cost(&self) -> u64 {
        self.costs[0][0].max(self.costs[1][1])
    }

    /// The cost when the variables take different values, (0,1) or (1,0)
    pub fn disagree_cost(&self) -> u64 {
        self.costs[0][1].max(self.costs[1][0])
    }

    /// The smallest cost achievable given optionally fixed values for either side
    /// # Arguments
    /// * `phase_first` - the value of the first variable, or None if unassigned
    /// * `phase_second` - the value of the second variable, or None if unassigned
    pub fn min_cost(&self, phase_first: Option<u8>, phase_second: Option<u8>) -> u64 {
        let first_range = match phase_first {
            Some(p) => p..p+1,
            None => 0..2
        };
        let mut best: u64 = u64::MAX;
        for a in first_range {
            let second_range = match phase_second {
                Some(p) => p..p+1,
                None => 0..2
            };
            for b in second_range {
                best = best.min(self.cost(a, b));
            }
        }
        best
    }

    /// Swaps the roles of the two variables
    pub fn transposed(&self) -> CostMatrix {
        CostMatrix::new([
            [self.costs[0][0], self.costs[1][0]],
            [self.costs[0][1], self.costs[1][1]]
        ])
    }

    /// Returns all cells as a flat array in (0,0), (0,1), (1,0), (1,1) order
    pub fn cells(&self) -> [u64; 4] {
        [self.costs[0][0], self.costs[0][1], self.costs[1][0], self.costs[1][1]]
    }
}

/// A binary cost function over two phase variables, along with the evidence it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct PairwiseCost {
    /// the marker positions for this cost
    pair: MarkerPair,
    /// the observation counts that were converted
    counts: PairCounts,
    /// the recombination rate used to weight the counts
    rate: f64,
    /// the rounded signed weight
    weight: i64,
    /// the resulting cost table
    matrix: CostMatrix
}

impl PairwiseCost {
    pub fn pair(&self) -> MarkerPair {
        self.pair
    }

    pub fn counts(&self) -> PairCounts {
        self.counts
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }

    pub fn matrix(&self) -> &CostMatrix {
        &self.matrix
    }
}

/// Hard unary constraint pinning a variable to a value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixedConstraint {
    pub variable: usize,
    pub value: u8
}

/// The full WCSP model for one family: binary variables, pairwise costs, and fixed values.
#[derive(Clone, Debug, PartialEq)]
pub struct CostModel {
    /// marker position for each phase variable
    variables: Vec<usize>,
    /// pairwise costs keyed by (variable index, variable index), first < second
    pairwise: BTreeMap<(usize, usize), PairwiseCost>,
    /// hard constraints, currently only variable 0 == 0
    fixed: Vec<FixedConstraint>
}

impl CostModel {
    /// Convenience wrapper around `build_costs` for aggregated evidence
    pub fn from_evidence<R: RecombinationModel + ?Sized>(evidence: &PairEvidence, rate_model: &R) -> Result<CostModel, PhasingError> {
        build_costs(evidence.informative_markers(), evidence.pairs(), rate_model)
    }

    /// Marker positions in variable order
    pub fn variables(&self) -> &[usize] {
        &self.variables
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn pairwise(&self) -> &BTreeMap<(usize, usize), PairwiseCost> {
        &self.pairwise
    }

    pub fn fixed(&self) -> &[FixedConstraint] {
        &self.fixed
    }

    /// Returns the sum of all pairwise costs for a full assignment.
    /// Fixed constraints are hard and are not included, see `is_feasible(...)`.
    /// # Panics
    /// * if `assignment` is shorter than the number of variables
    pub fn total_cost(&self, assignment: &[u8]) -> u64 {
        self.pairwise.iter()
            .map(|(&(k, l), pc)| pc.matrix().cost(assignment[k], assignment[l]))
            .fold(0, u64::saturating_add)
    }

    /// Returns true if every fixed constraint is satisfied by the assignment
    pub fn is_feasible(&self, assignment: &[u8]) -> bool {
        self.fixed.iter()
            .all(|fc| assignment.get(fc.variable) == Some(&fc.value))
    }

    /// Sum of the largest cell of every pairwise cost, an upper bound on any solution cost
    pub fn max_total_cost(&self) -> u64 {
        self.pairwise.values()
            .map(|pc| pc.matrix().cells().iter().copied().max().unwrap_or(0))
            .fold(0, u64::saturating_add)
    }

    /// Checks that a solver result is usable: correct length, binary values, and all fixed constraints hold.
    /// # Arguments
    /// * `assignment` - the raw solver output
    /// # Errors
    /// * `DecodeLengthMismatch` if the length is wrong
    /// * `SolverFailure` if a value is not 0/1 or a fixed constraint is violated
    pub fn check_assignment(&self, assignment: &[u8]) -> Result<(), PhasingError> {
        if assignment.len() != self.variables.len() {
            return Err(PhasingError::DecodeLengthMismatch {
                expected: self.variables.len(),
                found: assignment.len()
            });
        }
        if let Some((index, value)) = assignment.iter().enumerate().find(|(_i, &v)| v > 1) {
            return Err(PhasingError::SolverFailure(format!("non-binary value {value} assigned to variable {index}")));
        }
        if !self.is_feasible(assignment) {
            return Err(PhasingError::SolverFailure("assignment violates a fixed constraint".to_string()));
        }
        Ok(())
    }
}

/// Largest magnitude allowed for a single pair weight, keeps the summed costs far from `u64::MAX`
pub const MAX_PAIR_WEIGHT: i64 = 1 << 40;

/// Converts pair counts and a recombination rate into the signed, rounded pair weight.
/// `W = (N_discordant - N_concordant) * ln((1 - r) / r)`, clamped to `+-MAX_PAIR_WEIGHT`
/// # Arguments
/// * `counts` - the observations for the pair
/// * `rate` - the recombination rate, must already be validated
pub fn pair_weight(counts: &PairCounts, rate: f64) -> i64 {
    let log_ratio: f64 = ((1.0 - rate) / rate).ln();
    let bound: f64 = MAX_PAIR_WEIGHT as f64;
    (counts.excess_discordant() as f64 * log_ratio).clamp(-bound, bound).round() as i64
}

/// Builds the pairwise cost model from aggregated pair evidence.
/// The variable ordering follows `informative_markers`, and variable 0 is fixed to 0 since only relative phase is identifiable.
/// # Arguments
/// * `informative_markers` - the marker positions to use as variables, in variable order
/// * `pair_evidence` - counts for each canonical marker pair
/// * `rate_model` - provides the recombination rate for each pair
/// # Errors
/// * `DegenerateProblem` if there are fewer than 2 informative markers
/// * `UnknownMarker` if a pair refers to a marker outside `informative_markers`
/// * `InvalidRate` if the model returns a rate that is not in (0, 1)
pub fn build_costs<R: RecombinationModel + ?Sized>(
    informative_markers: &[usize],
    pair_evidence: &BTreeMap<MarkerPair, PairCounts>,
    rate_model: &R
) -> Result<CostModel, PhasingError> {
    if informative_markers.len() < 2 {
        return Err(PhasingError::DegenerateProblem { num_markers: informative_markers.len() });
    }

    let variable_lookup: HashMap<usize, usize> = informative_markers.iter()
        .enumerate()
        .map(|(k, &marker)| (marker, k))
        .collect();

    let mut pairwise: BTreeMap<(usize, usize), PairwiseCost> = BTreeMap::new();
    for (&pair, &counts) in pair_evidence.iter() {
        let k: usize = *variable_lookup.get(&pair.first())
            .ok_or(PhasingError::UnknownMarker { marker: pair.first() })?;
        let l: usize = *variable_lookup.get(&pair.second())
            .ok_or(PhasingError::UnknownMarker { marker: pair.second() })?;

        let rate: f64 = rate_model.rate(pair.first(), pair.second());
        // NaN fails both comparisons, and subnormal rates overflow the log ratio
        if !(rate > 0.0 && rate < 1.0) || !((1.0 - rate) / rate).ln().is_finite() {
            return Err(PhasingError::InvalidRate {
                first: pair.first(),
                second: pair.second(),
                rate
            });
        }

        let weight: i64 = pair_weight(&counts, rate);
        let matrix = CostMatrix::from_weight(weight);
        trace!("{:?} {:?} r={} W={} => {:?}", pair, counts.as_array(), rate, weight, matrix);

        // keep the key canonical even if the caller provided markers out of order
        let key = if k < l { (k, l) } else { (l, k) };
        let matrix = if k < l { matrix } else { matrix.transposed() };
        pairwise.insert(key, PairwiseCost {
            pair,
            counts,
            rate,
            weight,
            matrix
        });
    }

    debug!("Built cost model with {} variables and {} pairwise costs", informative_markers.len(), pairwise.len());
    Ok(CostModel {
        variables: informative_markers.to_vec(),
        pairwise,
        fixed: vec![FixedConstraint { variable: 0, value: 0 }]
    })
}

/// Maps a solver assignment back onto the informative markers.
/// This is an identity mapping by position, the i-th phase call belongs to `model.variables()[i]`.
/// # Arguments
/// * `model` - the model that was solved
/// * `assignment` - one value per variable, in variable order
/// # Errors
/// * `DecodeLengthMismatch` if the assignment length differs from the number of variables
pub fn decode(model: &CostModel, assignment: &[u8]) -> Result<Vec<u8>, PhasingError> {
    if assignment.len() != model.num_variables() {
        return Err(PhasingError::DecodeLengthMismatch {
            expected: model.num_variables(),
            found: assignment.len()
        });
    }
    Ok(assignment.to_vec())
}
