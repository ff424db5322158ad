
use clap::Parser;
use chrono::Datelike;
use lazy_static::lazy_static;
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::data_types::recombination::{RateModelKind, RecombinationModel, create_rate_model};
use crate::solvers::{SolverConfig, SolverKind};
use crate::solvers::brute_force::DEFAULT_MAX_VARIABLES;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) 2023-{}     hsphase developers
This program comes with ABSOLUTELY NO WARRANTY.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input half-sib observations, one offspring per row (TSV/CSV, optionally gzipped)
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_filename: PathBuf,

    /// Output phase calls for the shared parent (csv/tsv)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: PathBuf,

    /// Output per-family statistics file (optional, csv/tsv)
    #[clap(long = "stats-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub stats_filename: Option<PathBuf>,

    /// Output per-pair evidence and cost file (optional, csv/tsv)
    #[clap(long = "pairs-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub pairs_filename: Option<PathBuf>,

    /// Output folder for one .wcsp model per family (optional)
    #[clap(long = "wcsp-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub wcsp_dir: Option<PathBuf>,

    /// Number of threads to use for phasing
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Recombination model used to weight marker pairs (haldane, fixed)
    #[clap(long = "rate-model")]
    #[clap(value_name = "MODEL")]
    #[clap(default_value = "haldane")]
    #[clap(help_heading = Some("Recombination"))]
    pub rate_model: RateModelKind,

    /// Genetic distance between adjacent markers in centiMorgans
    #[clap(long = "cm-per-marker")]
    #[clap(value_name = "CM")]
    #[clap(default_value = "0.1")]
    #[clap(help_heading = Some("Recombination"))]
    pub cm_per_marker: f64,

    /// Solver for the pairwise cost model (astar, brute-force, toulbar2)
    #[clap(long = "solver")]
    #[clap(value_name = "SOLVER")]
    #[clap(default_value = "astar")]
    #[clap(help_heading = Some("Solver"))]
    pub solver: SolverKind,

    /// Sets the maximum queue size for the A* solver, set to 0 to disable pruning
    #[clap(long = "max-queue-size")]
    #[clap(value_name = "SIZE")]
    #[clap(default_value = "100000")]
    #[clap(help_heading = Some("Solver"))]
    pub max_queue_size: usize,

    /// Path to the toulbar2 executable, only used with --solver toulbar2
    #[clap(long = "toulbar2")]
    #[clap(value_name = "PATH")]
    #[clap(default_value = "toulbar2")]
    #[clap(help_heading = Some("Solver"))]
    pub toulbar2_path: PathBuf,
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

impl Settings {
    /// Wrapper function to build the solver configuration from our CLI settings
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            kind: self.solver,
            max_queue_size: self.max_queue_size,
            max_brute_force_variables: DEFAULT_MAX_VARIABLES,
            toulbar2_path: self.toulbar2_path.clone()
        }
    }

    /// Wrapper function to build the recombination model from our CLI settings
    pub fn rate_model(&self) -> Box<dyn RecombinationModel + Send + Sync> {
        create_rate_model(self.rate_model, self.cm_per_marker)
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(mut settings: Settings) -> Settings {
    check_required_filename(&settings.input_filename, "Observation file");
    info!("Phase call output: \"{}\"", settings.output_filename.display());

    if !settings.cm_per_marker.is_finite() || settings.cm_per_marker <= 0.0 {
        error!("--cm-per-marker must be a positive number, found {}", settings.cm_per_marker);
        std::process::exit(exitcode::USAGE);
    }

    // 0 doesn't make sense, so lets just error proof it up to 1
    if settings.threads == 0 {
        settings.threads = 1;
    }

    // dump stuff to the logger
    info!("Recombination:");
    info!("\tRate model: {}", settings.rate_model);
    info!("\tDistance per marker: {} cM", settings.cm_per_marker);

    info!("Solver:");
    info!("\tAlgorithm: {}", settings.solver);
    match settings.solver {
        SolverKind::Astar => {
            if settings.max_queue_size == 0 {
                info!("\tMaximum queue size: DISABLED");
            } else {
                info!("\tMaximum queue size: {}", settings.max_queue_size);
            }
        },
        SolverKind::BruteForce => {
            warn!("\tBrute-force search is limited to families with at most {} informative markers", DEFAULT_MAX_VARIABLES);
        },
        SolverKind::Toulbar2 => {
            info!("\ttoulbar2 executable: \"{}\"", settings.toulbar2_path.display());
        }
    };

    info!("Processing threads: {}", settings.threads);

    //send the settings back
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let settings = Settings::try_parse_from(["hsphase", "-i", "obs.tsv", "-o", "calls.tsv"]).unwrap();
        assert_eq!(settings.input_filename, PathBuf::from("obs.tsv"));
        assert_eq!(settings.rate_model, RateModelKind::Haldane);
        assert_eq!(settings.cm_per_marker, 0.1);
        assert_eq!(settings.solver, SolverKind::Astar);
        assert_eq!(settings.max_queue_size, 100000);
        assert_eq!(settings.threads, 1);
        assert!(settings.stats_filename.is_none());

        let config = settings.solver_config();
        assert_eq!(config.kind, SolverKind::Astar);
        assert_eq!(config.toulbar2_path, PathBuf::from("toulbar2"));
    }

    #[test]
    fn test_parse_options() {
        let settings = Settings::try_parse_from([
            "hsphase", "-i", "obs.csv", "-o", "calls.csv",
            "--rate-model", "fixed", "--cm-per-marker", "0.5",
            "--solver", "brute-force", "-t", "4", "-vv"
        ]).unwrap();
        assert_eq!(settings.rate_model, RateModelKind::Fixed);
        assert_eq!(settings.solver, SolverKind::BruteForce);
        assert_eq!(settings.threads, 4);
        assert_eq!(settings.verbosity, 2);
        assert_eq!(settings.rate_model().rate(0, 10), settings.rate_model().rate(0, 1));

        assert!(Settings::try_parse_from(["hsphase", "-i", "obs.tsv", "-o", "c.tsv", "--solver", "simplex"]).is_err());
        assert!(Settings::try_parse_from(["hsphase", "-o", "c.tsv"]).is_err());
    }
}
