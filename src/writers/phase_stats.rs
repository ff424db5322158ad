
use crate::phaser::PhaseResult;

use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// Contains all the data written to each row of our family stats file
#[derive(Serialize)]
struct FamilyStatsRow {
    /// the family (shared parent) identifier
    family_id: String,
    /// the number of offspring observed
    num_offspring: usize,
    /// the number of marker positions per offspring
    num_markers: usize,
    /// the number of offspring contributing at least one pair
    num_informative_offspring: usize,
    /// the number of markers that appear in at least one pair
    num_informative_markers: usize,
    /// the number of distinct marker pairs
    num_pairs: usize,
    /// the cost of the chosen assignment, blank if the family was not phased
    total_cost: Option<u64>,
    /// the number of search nodes explored, blank if the family was not phased
    explored_nodes: Option<u64>,
    /// the number of search nodes pruned, blank if the family was not phased
    pruned_nodes: Option<u64>,
    /// CPU time spent in the solver, in seconds
    solve_cputime: f64
}

/// This is a wrapper for writing out the per-family phasing summary
pub struct StatsWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

impl StatsWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write all family stats to
    pub fn new(filename: &Path) -> csv::Result<StatsWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(StatsWriter {
            csv_writer
        })
    }

    /// Writes the summary row for a family.
    /// # Arguments
    /// * `phase_result` - the result for the family, phased or not
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_family(&mut self, phase_result: &PhaseResult) -> csv::Result<()> {
        let statistics = phase_result.statistics.as_ref();
        let row: FamilyStatsRow = FamilyStatsRow {
            family_id: phase_result.family_id.clone(),
            num_offspring: phase_result.num_offspring,
            num_markers: phase_result.num_markers,
            num_informative_offspring: phase_result.evidence.informative_offspring(),
            num_informative_markers: phase_result.evidence.informative_markers().len(),
            num_pairs: phase_result.evidence.num_pairs(),
            total_cost: statistics.map(|s| s.cost),
            explored_nodes: statistics.map(|s| s.explored_nodes),
            pruned_nodes: statistics.map(|s| s.pruned_nodes),
            solve_cputime: phase_result.solve_cputime
        };
        self.csv_writer.serialize(&row)?;
        self.csv_writer.flush()?;
        Ok(())
    }
}
