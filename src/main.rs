
use hsphase::cli::{Settings, check_settings, get_raw_settings};
use hsphase::cost_model::PhasingError;
use hsphase::data_types::observations::FamilyObservations;
use hsphase::data_types::recombination::RecombinationModel;
use hsphase::observation_parsing::load_observations;
use hsphase::phaser::{PhaseResult, create_unphased_result, phase_family};
use hsphase::solvers::{WcspSolver, create_solver};
use hsphase::writers::ordered_family_writer::OrderedFamilyWriter;
use hsphase::writers::pair_writer::PairWriter;
use hsphase::writers::phase_stats::StatsWriter;
use hsphase::writers::phase_writer::PhaseWriter;
use hsphase::writers::wcsp_writer::WcspDirWriter;

use log::{LevelFilter, error, info, warn};
use std::sync::{Arc, mpsc};
use std::time::Instant;
use threadpool::ThreadPool;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);

    let families: Vec<FamilyObservations> = match load_observations(&cli_settings.input_filename) {
        Ok(f) => f,
        Err(e) => {
            error!("Error while loading observations: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    if families.is_empty() {
        warn!("No families were found in {:?}", cli_settings.input_filename);
    }

    let phase_writer: PhaseWriter = match PhaseWriter::new(&cli_settings.output_filename) {
        Ok(pw) => pw,
        Err(e) => {
            error!("Error during phase call writer creation: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    // create our stats file also
    let stats_writer: Option<StatsWriter> = match cli_settings.stats_filename {
        Some(ref filename) => {
            match StatsWriter::new(filename) {
                Ok(sw) => Some(sw),
                Err(e) => {
                    error!("Error during statistics writer creation: {}", e);
                    std::process::exit(exitcode::IOERR);
                }
            }
        },
        None => None
    };

    let pair_writer: Option<PairWriter> = match cli_settings.pairs_filename {
        Some(ref filename) => {
            match PairWriter::new(filename) {
                Ok(pw) => Some(pw),
                Err(e) => {
                    error!("Error during pair writer creation: {}", e);
                    std::process::exit(exitcode::IOERR);
                }
            }
        },
        None => None
    };

    let wcsp_writer: Option<WcspDirWriter> = match cli_settings.wcsp_dir {
        Some(ref dirname) => {
            match WcspDirWriter::new(dirname) {
                Ok(ww) => Some(ww),
                Err(e) => {
                    error!("Error during WCSP folder creation: {}", e);
                    std::process::exit(exitcode::IOERR);
                }
            }
        },
        None => None
    };

    // this writer will write "in-order" provided we correctly pass the ordering of data to it
    let mut family_writer = OrderedFamilyWriter::new(phase_writer, stats_writer, pair_writer, wcsp_writer);

    let rate_model: Arc<dyn RecombinationModel + Send + Sync> = Arc::from(cli_settings.rate_model());
    let solver: Arc<dyn WcspSolver + Send + Sync> = Arc::from(create_solver(&cli_settings.solver_config()));

    let start_time: Instant = Instant::now();
    let num_families: usize = families.len();
    let mut results_received: u64 = 0;
    let mut phased_families: u64 = 0;

    // values related to printing
    const UPDATE_SPEED: u64 = 100;
    info!("Phasing {} families...", num_families);

    if cli_settings.threads <= 1 {
        for (family_index, family) in families.iter().enumerate() {
            let phase_result: PhaseResult = solve_family(family, rate_model.as_ref(), solver.as_ref());

            results_received += 1;
            if phase_result.is_phased() {
                phased_families += 1;
            }
            process_results(family_index, phase_result, &mut family_writer);

            if results_received % UPDATE_SPEED == 0 {
                let time_so_far: f64 = start_time.elapsed().as_secs_f64();
                let families_per_sec: f64 = results_received as f64 / time_so_far;
                info!("Received results for {} / {} families: {:.4} families/sec", results_received, num_families, families_per_sec);
            }
        }
    } else {
        //set up job configuration
        info!("Starting job pool with {} threads...", cli_settings.threads);

        //we need to set up the multiprocessing components now
        let pool = ThreadPool::new(cli_settings.threads);
        let (tx, rx) = mpsc::channel();

        let jobs_queued: u64 = num_families as u64;
        for (family_index, family) in families.into_iter().enumerate() {
            let tx = tx.clone();
            let rate_model = rate_model.clone();
            let solver = solver.clone();

            pool.execute(move|| {
                let phase_result: PhaseResult = solve_family(&family, rate_model.as_ref(), solver.as_ref());
                // the receiver lives until every job is collected
                if tx.send((family_index, phase_result)).is_err() {
                    error!("Result channel closed before family {:?} was sent", family.family_id());
                }
            });
        }
        // drop our copy so the channel closes once the pool finishes
        drop(tx);

        while results_received < jobs_queued {
            // make sure no panics encountered so far
            if pool.panic_count() > 0 {
                error!("Panic detected in ThreadPool, check above for details.");
                std::process::exit(exitcode::SOFTWARE);
            }

            let (family_index, phase_result): (usize, PhaseResult) = match rx.recv() {
                Ok(r) => r,
                Err(e) => {
                    error!("Error while receiving family results: {}", e);
                    std::process::exit(exitcode::SOFTWARE);
                }
            };

            results_received += 1;
            if phase_result.is_phased() {
                phased_families += 1;
            }
            process_results(family_index, phase_result, &mut family_writer);

            // do an update if we're on the mod of our speed OR it's the last one for a thread
            if results_received % UPDATE_SPEED == 0 || (jobs_queued - results_received) < cli_settings.threads as u64 {
                let time_so_far: f64 = start_time.elapsed().as_secs_f64();
                let families_per_sec: f64 = results_received as f64 / time_so_far;
                info!("Received results for {} / {} families: {:.4} families/sec, writer waiting on family {}", results_received, jobs_queued, families_per_sec, family_writer.get_wait_family());
            }
        }
    }

    match family_writer.finalize() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while finalizing output files: {}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Phased {} of {} families.", phased_families, num_families);
    info!("All families finished successfully after {} seconds.", start_time.elapsed().as_secs_f64());
}

/// Phases a single family, falling back to an unphased result when it has too few informative markers.
/// Any other failure is fatal.
/// # Arguments
/// * `family` - the family to phase
/// * `rate_model` - the recombination model
/// * `solver` - the solver for the cost model
fn solve_family(family: &FamilyObservations, rate_model: &(dyn RecombinationModel + Send + Sync), solver: &(dyn WcspSolver + Send + Sync)) -> PhaseResult {
    match phase_family(family, rate_model, solver) {
        Ok(r) => r,
        Err(PhasingError::DegenerateProblem { num_markers }) => {
            warn!("Family {:?} has {} informative markers, skipping phasing", family.family_id(), num_markers);
            create_unphased_result(family)
        },
        Err(e) => {
            error!("Error while processing family {:?}:", family.family_id());
            error!("  {}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

/// Sub-routine to make sure we are always consistently processing results in an identical manner
/// # Arguments
/// * `family_index` - the input position of the family
/// * `phase_result` - the phasing result for the family
/// * `family_writer` - mutable reference to the ordered output writer
fn process_results(family_index: usize, phase_result: PhaseResult, family_writer: &mut OrderedFamilyWriter) {
    match family_writer.write_family(family_index, phase_result) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while writing family results: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
}
