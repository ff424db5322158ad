
/// Contains the wrapper that writes family results in input order
pub mod ordered_family_writer;
/// Contains the writer for the weighted marker pairs behind each family's model
pub mod pair_writer;
/// Contains the writer for per-family phasing statistics
pub mod phase_stats;
/// Contains the writer for per-marker phase calls
pub mod phase_writer;
/// Contains the toulbar2 `.wcsp` model export
pub mod wcsp_writer;
