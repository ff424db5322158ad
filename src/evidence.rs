
use crate::data_types::marker_pair::{MarkerPair, PairCounts};
use crate::data_types::observations::PhaseObservation;

use log::trace;
use std::collections::{BTreeMap, BTreeSet};

/// The aggregated pairwise evidence for a family.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PairEvidence {
    /// markers that appear in at least one pair, ascending
    informative_markers: Vec<usize>,
    /// counts for every observed adjacent pair
    pairs: BTreeMap<MarkerPair, PairCounts>,
    /// the number of offspring that contributed at least one pair
    informative_offspring: usize
}

impl PairEvidence {
    /// Ascending list of informative marker positions, this is the phase variable ordering
    pub fn informative_markers(&self) -> &[usize] {
        &self.informative_markers
    }

    /// All pairs with their counts, ordered by pair key
    pub fn pairs(&self) -> &BTreeMap<MarkerPair, PairCounts> {
        &self.pairs
    }

    /// Returns the counts for a pair in either orientation
    pub fn get(&self, a: usize, b: usize) -> Option<&PairCounts> {
        if a == b {
            return None;
        }
        self.pairs.get(&MarkerPair::new(a, b))
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn informative_offspring(&self) -> usize {
        self.informative_offspring
    }

    /// The total number of pair observations across all offspring
    pub fn total_observations(&self) -> u64 {
        self.pairs.values()
            .map(|c| c.total())
            .sum()
    }
}

/// Returns the consecutive pairs among the known markers of one offspring, with their concordance.
/// Offspring with fewer than two known markers produce no pairs.
/// # Arguments
/// * `observation` - the phase calls for the offspring
pub fn adjacent_pairs(observation: &PhaseObservation) -> Vec<(MarkerPair, bool)> {
    let known: Vec<usize> = observation.known_positions();
    if known.len() < 2 {
        return vec![];
    }

    known.windows(2)
        .map(|w| {
            let is_concordant = observation.allele(w[0]) == observation.allele(w[1]);
            (MarkerPair::new(w[0], w[1]), is_concordant)
        })
        .collect()
}

/// Aggregates the pairwise phase evidence across all offspring of a family.
/// Only consecutive known markers within an offspring form a pair; longer range pairs are represented through the chain of adjacent ones.
/// The result does not depend on the iteration order of `observations`.
/// Offspring ids are assumed to be unique.
/// # Arguments
/// * `observations` - (offspring id, observation) pairs, e.g. a `&HashMap<String, PhaseObservation>`
pub fn aggregate<'a, I>(observations: I) -> PairEvidence
where
    I: IntoIterator<Item = (&'a String, &'a PhaseObservation)>
{
    let mut pairs: BTreeMap<MarkerPair, PairCounts> = BTreeMap::new();
    let mut informative_offspring: usize = 0;

    for (offspring_id, observation) in observations {
        let offspring_pairs = adjacent_pairs(observation);
        if offspring_pairs.is_empty() {
            trace!("{offspring_id}: no informative pairs");
            continue;
        }

        trace!("{offspring_id}: {offspring_pairs:?}");
        informative_offspring += 1;
        for (pair, is_concordant) in offspring_pairs.into_iter() {
            pairs.entry(pair).or_default()
                .add_observation(is_concordant);
        }
    }

    // informative markers are the ones that made it into a pair, not everything with a known call
    let informative_markers: Vec<usize> = pairs.keys()
        .flat_map(|p| [p.first(), p.second()])
        .collect::<BTreeSet<usize>>()
        .into_iter()
        .collect();

    PairEvidence {
        informative_markers,
        pairs,
        informative_offspring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap as HashMap;

    /// T1-T3 carry the example pairs, T4 is entirely unknown
    fn get_example_family() -> Vec<(String, PhaseObservation)> {
        vec![
            ("T1".to_string(), PhaseObservation::from_values(&[1, 2, 2, 0, 1, 2, 1])),
            ("T2".to_string(), PhaseObservation::from_values(&[2, 2, 2, 0, 1, 2, 0])),
            ("T3".to_string(), PhaseObservation::from_values(&[0, 2, 2, 2, 0, 2, 0])),
            ("T4".to_string(), PhaseObservation::from_values(&[2, 2, 2, 2, 2, 2, 2]))
        ]
    }

    #[test]
    fn test_adjacent_pairs() {
        let family = get_example_family();
        assert_eq!(adjacent_pairs(&family[0].1), vec![
            (MarkerPair::new(0, 3), false),
            (MarkerPair::new(3, 4), false),
            (MarkerPair::new(4, 6), true)
        ]);
        assert_eq!(adjacent_pairs(&family[1].1), vec![
            (MarkerPair::new(3, 4), false),
            (MarkerPair::new(4, 6), false)
        ]);
        assert_eq!(adjacent_pairs(&family[2].1), vec![
            (MarkerPair::new(0, 4), true),
            (MarkerPair::new(4, 6), true)
        ]);
        assert!(adjacent_pairs(&family[3].1).is_empty());

        // a single known marker cannot form a pair
        let single = PhaseObservation::from_values(&[2, 1, 2]);
        assert!(adjacent_pairs(&single).is_empty());
    }

    #[test]
    fn test_aggregate_example() {
        let family = get_example_family();
        let evidence = aggregate(family.iter().map(|(oid, obs)| (oid, obs)));

        assert_eq!(evidence.informative_markers(), &[0, 3, 4, 6]);
        assert_eq!(evidence.num_pairs(), 4);
        assert_eq!(evidence.informative_offspring(), 3);
        assert_eq!(evidence.get(0, 3).unwrap().as_array(), [1, 0]);
        assert_eq!(evidence.get(3, 4).unwrap().as_array(), [2, 0]);
        assert_eq!(evidence.get(4, 6).unwrap().as_array(), [1, 2]);
        assert_eq!(evidence.get(0, 4).unwrap().as_array(), [0, 1]);
        // reverse orientation maps to the same key
        assert_eq!(evidence.get(6, 4), evidence.get(4, 6));
        assert!(evidence.get(0, 6).is_none());
        assert!(evidence.get(3, 3).is_none());
        assert_eq!(evidence.total_observations(), 7);

        // every key is canonical
        for pair in evidence.pairs().keys() {
            assert!(pair.first() < pair.second());
        }
    }

    #[test]
    fn test_aggregate_order_independent() {
        let family = get_example_family();
        let forward = aggregate(family.iter().map(|(oid, obs)| (oid, obs)));
        let reverse = aggregate(family.iter().rev().map(|(oid, obs)| (oid, obs)));
        assert_eq!(forward, reverse);

        let map: HashMap<String, PhaseObservation> = family.into_iter().collect();
        let from_map = aggregate(&map);
        assert_eq!(forward, from_map);
    }

    #[test]
    fn test_count_conservation() {
        let family = get_example_family();
        let evidence = aggregate(family.iter().map(|(oid, obs)| (oid, obs)));
        for (pair, counts) in evidence.pairs().iter() {
            let expected = family.iter()
                .filter(|(_oid, obs)| adjacent_pairs(obs).iter().any(|(p, _c)| p == pair))
                .count() as u64;
            assert_eq!(counts.total(), expected);
        }
    }

    #[test]
    fn test_isolated_markers_excluded() {
        // marker 5 is known in one offspring, but never next to another known marker
        let family = vec![
            ("A".to_string(), PhaseObservation::from_values(&[2, 2, 2, 2, 2, 1])),
            ("B".to_string(), PhaseObservation::from_values(&[0, 1, 2, 2, 2, 2]))
        ];
        let evidence = aggregate(family.iter().map(|(oid, obs)| (oid, obs)));
        assert_eq!(evidence.informative_markers(), &[0, 1]);
        assert_eq!(evidence.get(0, 1).unwrap().as_array(), [1, 0]);
        assert_eq!(evidence.informative_offspring(), 1);
    }

    #[test]
    fn test_aggregate_empty() {
        let family = vec![
            ("A".to_string(), PhaseObservation::from_values(&[2, 2, 2]))
        ];
        let evidence = aggregate(family.iter().map(|(oid, obs)| (oid, obs)));
        assert!(evidence.informative_markers().is_empty());
        assert_eq!(evidence.num_pairs(), 0);
        assert_eq!(evidence, PairEvidence::default());
    }
}
