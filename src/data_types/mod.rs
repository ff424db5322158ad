
/// Contains the canonical marker pair key and the per-pair observation counts
pub mod marker_pair;
/// Contains the phase observation types for offspring and families
pub mod observations;
/// Recombination rate models used to weight pairwise evidence
pub mod recombination;
