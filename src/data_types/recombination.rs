
/// The default distance between adjacent markers in centiMorgans
pub const DEFAULT_CM_PER_MARKER: f64 = 0.1;

/// Converts a genetic distance in cM into a recombination rate using the Haldane map function.
/// # Arguments
/// * `distance_cm` - the genetic distance in centiMorgans
pub fn haldane_rate(distance_cm: f64) -> f64 {
    0.5 * (1.0 - (-distance_cm / 50.0).exp())
}

/// Anything that can report a recombination rate between two marker positions.
/// Rates are expected in the range (0, 0.5); anything else is rejected when costs are built.
pub trait RecombinationModel {
    /// Returns the recombination rate between markers `i` and `j`
    fn rate(&self, i: usize, j: usize) -> f64;
}

impl<F> RecombinationModel for F
where
    F: Fn(usize, usize) -> f64
{
    fn rate(&self, i: usize, j: usize) -> f64 {
        self(i, j)
    }
}

/// Markers are evenly spaced, and the rate grows with the number of markers between the pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HaldaneModel {
    /// distance between adjacent marker positions
    cm_per_marker: f64
}

impl HaldaneModel {
    pub fn new(cm_per_marker: f64) -> HaldaneModel {
        HaldaneModel {
            cm_per_marker
        }
    }

    pub fn cm_per_marker(&self) -> f64 {
        self.cm_per_marker
    }
}

impl Default for HaldaneModel {
    fn default() -> Self {
        Self::new(DEFAULT_CM_PER_MARKER)
    }
}

impl RecombinationModel for HaldaneModel {
    fn rate(&self, i: usize, j: usize) -> f64 {
        let distance_cm = i.abs_diff(j) as f64 * self.cm_per_marker;
        haldane_rate(distance_cm)
    }
}

/// Every pair gets the rate of a single adjacent-marker step, regardless of how far apart the markers are.
/// This matches the legacy behavior where the pair distance was computed but never applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedDecayModel {
    /// distance used for every pair
    cm_per_marker: f64
}

impl FixedDecayModel {
    pub fn new(cm_per_marker: f64) -> FixedDecayModel {
        FixedDecayModel {
            cm_per_marker
        }
    }
}

impl Default for FixedDecayModel {
    fn default() -> Self {
        Self::new(DEFAULT_CM_PER_MARKER)
    }
}

impl RecombinationModel for FixedDecayModel {
    fn rate(&self, _i: usize, _j: usize) -> f64 {
        haldane_rate(self.cm_per_marker)
    }
}

/// Recombination models that can be selected from the command line
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RateModelKind {
    /// distance-dependent, see `HaldaneModel`
    Haldane,
    /// distance-independent, see `FixedDecayModel`
    Fixed
}

/// Creates a boxed model that can be shared across worker threads
/// # Arguments
/// * `kind` - the model type
/// * `cm_per_marker` - the distance between adjacent markers in cM
pub fn create_rate_model(kind: RateModelKind, cm_per_marker: f64) -> Box<dyn RecombinationModel + Send + Sync> {
    match kind {
        RateModelKind::Haldane => Box::new(HaldaneModel::new(cm_per_marker)),
        RateModelKind::Fixed => Box::new(FixedDecayModel::new(cm_per_marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haldane_rate() {
        assert_eq!(haldane_rate(0.0), 0.0);
        // 1 cM ~= 1% recombination for small distances
        assert!((haldane_rate(1.0) - 0.0099).abs() < 1e-4);
        // saturates at 0.5
        assert!(haldane_rate(100.0) < 0.5);
        assert!((haldane_rate(10000.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_haldane_model() {
        let model = HaldaneModel::default();
        assert_eq!(model.cm_per_marker(), DEFAULT_CM_PER_MARKER);
        let adjacent = model.rate(3, 4);
        let far = model.rate(0, 6);
        assert!(adjacent > 0.0);
        assert!(far > adjacent);
        // symmetric
        assert_eq!(model.rate(6, 0), far);
        assert!((adjacent - haldane_rate(0.1)).abs() < 1e-12);
        assert!((far - haldane_rate(0.6)).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_decay_model() {
        let model = FixedDecayModel::default();
        assert_eq!(model.rate(3, 4), model.rate(0, 6));
        assert!((model.rate(0, 100) - haldane_rate(0.1)).abs() < 1e-12);
        // two markers on the same position still get a usable rate
        assert!(model.rate(5, 5) > 0.0);
    }

    #[test]
    fn test_closure_model() {
        let model = |_i: usize, _j: usize| 0.1;
        assert_eq!(model.rate(0, 1), 0.1);
    }

    #[test]
    fn test_create_rate_model() {
        use std::str::FromStr;
        assert_eq!(RateModelKind::from_str("haldane").unwrap(), RateModelKind::Haldane);
        assert_eq!(RateModelKind::from_str("fixed").unwrap(), RateModelKind::Fixed);
        assert!(RateModelKind::from_str("kosambi").is_err());
        assert_eq!(RateModelKind::Haldane.to_string(), "haldane");

        let haldane = create_rate_model(RateModelKind::Haldane, 0.2);
        assert!((haldane.rate(0, 3) - haldane_rate(0.6)).abs() < 1e-12);
        let fixed = create_rate_model(RateModelKind::Fixed, 0.2);
        assert!((fixed.rate(0, 3) - haldane_rate(0.2)).abs() < 1e-12);
    }
}
