
/// CLI functionality and checks
pub mod cli;
/// Converts pairwise evidence into a binary weighted constraint problem and maps solutions back to markers
pub mod cost_model;
/// Contains multiple wrappers for useful data types in hsphase
pub mod data_types;
/// Aggregates offspring observations into concordant/discordant counts per marker pair
pub mod evidence;
/// Components for loading half-sib observation files
pub mod observation_parsing;
/// Organizes the primary workflow for one family: aggregate, build costs, solve, and decode
pub mod phaser;
/// Interchangeable solvers for the pairwise cost model
pub mod solvers;
/// Contains all the various output writer functionality
pub mod writers;
