
use std::ops::AddAssign;

/// An unordered pair of marker positions, always stored with the smaller index first.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MarkerPair {
    /// the smaller marker position
    first: usize,
    /// the larger marker position
    second: usize
}

impl MarkerPair {
    /// Creates the canonical pair for two marker positions, in either order.
    /// # Arguments
    /// * `a` - one marker position
    /// * `b` - the other marker position
    /// # Panics
    /// * if `a == b`, a marker cannot pair with itself
    pub fn new(a: usize, b: usize) -> MarkerPair {
        assert_ne!(a, b);
        if a < b {
            MarkerPair { first: a, second: b }
        } else {
            MarkerPair { first: b, second: a }
        }
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn second(&self) -> usize {
        self.second
    }

    /// Returns the number of marker positions between the two, i.e. `second - first`
    pub fn span(&self) -> usize {
        self.second - self.first
    }
}

/// Observation counts for a marker pair across all offspring.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PairCounts {
    /// the number of offspring where the two calls differed
    discordant: u64,
    /// the number of offspring where the two calls matched
    concordant: u64
}

impl PairCounts {
    pub fn new(discordant: u64, concordant: u64) -> PairCounts {
        PairCounts {
            discordant,
            concordant
        }
    }

    /// Records one more observation of the pair
    /// # Arguments
    /// * `is_concordant` - true if the two calls were identical in the offspring
    pub fn add_observation(&mut self, is_concordant: bool) {
        if is_concordant {
            self.concordant += 1;
        } else {
            self.discordant += 1;
        }
    }

    pub fn discordant(&self) -> u64 {
        self.discordant
    }

    pub fn concordant(&self) -> u64 {
        self.concordant
    }

    /// Total number of observations for the pair
    pub fn total(&self) -> u64 {
        self.discordant + self.concordant
    }

    /// Returns `N_discordant - N_concordant`, positive values favor a flipped phase
    pub fn excess_discordant(&self) -> i64 {
        self.discordant as i64 - self.concordant as i64
    }

    /// Returns the count vector as `[N_discordant, N_concordant]`
    pub fn as_array(&self) -> [u64; 2] {
        [self.discordant, self.concordant]
    }
}

impl AddAssign for PairCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.discordant += rhs.discordant;
        self.concordant += rhs.concordant;
    }
}
