
use rustc_hash::FxHashMap as HashMap;

/// A single phase call for one marker in one offspring.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, strum_macros::FromRepr)]
pub enum PhaseAllele {
    Zero=0,
    One=1,
    Unknown=2
}

impl PhaseAllele {
    /// Parses a single call token, `0`/`1` are known values and `*`, `.`, or `-` are unknown.
    /// Returns None for anything else.
    pub fn from_token(token: &str) -> Option<PhaseAllele> {
        match token.trim() {
            "0" => Some(PhaseAllele::Zero),
            "1" => Some(PhaseAllele::One),
            "*" | "." | "-" => Some(PhaseAllele::Unknown),
            _ => None
        }
    }

    /// Returns true if this call is a resolved 0 or 1
    pub fn is_known(&self) -> bool {
        *self < PhaseAllele::Unknown
    }
}

/// The phase calls for one offspring across the shared marker ordering.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseObservation {
    /// the calls, one per marker position
    alleles: Vec<PhaseAllele>
}

impl PhaseObservation {
    pub fn new(alleles: Vec<PhaseAllele>) -> PhaseObservation {
        PhaseObservation {
            alleles
        }
    }

    /// Convenience constructor from raw values; 0 and 1 are known, anything else is unknown.
    /// # Arguments
    /// * `values` - the raw calls, typically 0, 1, or 2 for unknown
    pub fn from_values(values: &[u8]) -> PhaseObservation {
        let alleles = values.iter()
            .map(|&v| PhaseAllele::from_repr(v).unwrap_or(PhaseAllele::Unknown))
            .collect();
        PhaseObservation {
            alleles
        }
    }

    pub fn alleles(&self) -> &[PhaseAllele] {
        &self.alleles
    }

    /// Returns the call at the given marker, markers past the end are unknown
    pub fn allele(&self, index: usize) -> PhaseAllele {
        self.alleles.get(index).copied().unwrap_or(PhaseAllele::Unknown)
    }

    /// Returns the number of markers in this observation, known or not
    pub fn len(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }

    /// Returns the ascending marker positions that have a known call
    pub fn known_positions(&self) -> Vec<usize> {
        self.alleles.iter().enumerate()
            .filter(|(_i, a)| a.is_known())
            .map(|(i, _a)| i)
            .collect()
    }
}

/// All offspring observations for a single shared parent.
/// Offspring keep the order they were added in, and ids are unique.
#[derive(Clone, Debug, Default)]
pub struct FamilyObservations {
    /// the identifier of the shared parent / family
    family_id: String,
    /// offspring ids in insertion order
    offspring_order: Vec<String>,
    /// lookup from offspring id to observation
    observations: HashMap<String, PhaseObservation>
}

impl FamilyObservations {
    pub fn new(family_id: String) -> FamilyObservations {
        FamilyObservations {
            family_id,
            ..Default::default()
        }
    }

    pub fn family_id(&self) -> &str {
        &self.family_id
    }

    /// Adds an offspring observation.
    /// Returns false and leaves the family untouched if the offspring id is already present.
    /// # Arguments
    /// * `offspring_id` - the unique id of the offspring
    /// * `observation` - the phase calls for the offspring
    pub fn insert(&mut self, offspring_id: String, observation: PhaseObservation) -> bool {
        if self.observations.contains_key(&offspring_id) {
            return false;
        }
        self.offspring_order.push(offspring_id.clone());
        self.observations.insert(offspring_id, observation);
        true
    }

    pub fn get(&self, offspring_id: &str) -> Option<&PhaseObservation> {
        self.observations.get(offspring_id)
    }

    /// Iterates over (offspring id, observation) in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PhaseObservation)> {
        self.offspring_order.iter()
            .map(|oid| (oid, &self.observations[oid]))
    }

    /// The underlying id -> observation mapping
    pub fn observations(&self) -> &HashMap<String, PhaseObservation> {
        &self.observations
    }

    pub fn num_offspring(&self) -> usize {
        self.offspring_order.len()
    }

    /// The number of markers, taken as the longest observation in the family
    pub fn num_markers(&self) -> usize {
        self.observations.values()
            .map(|o| o.len())
            .max()
            .unwrap_or(0)
    }
}
