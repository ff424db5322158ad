
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::phaser::PhaseResult;

/// This is a wrapper for writing out the phase calls for each family
pub struct PhaseWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of our phase call file
#[derive(Serialize)]
struct PhaseRow {
    /// the family the call belongs to
    family_id: String,
    /// the marker position, 0-based
    marker: usize,
    /// the phase indicator relative to the first informative marker
    phase: u8
}

impl PhaseWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write all phase calls to
    pub fn new(filename: &Path) -> csv::Result<PhaseWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(PhaseWriter {
            csv_writer
        })
    }

    /// Writes the phase calls from a given family, unphased families write nothing.
    /// # Arguments
    /// * `phase_result` - the result for the family
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_family(&mut self, phase_result: &PhaseResult) -> csv::Result<()> {
        for (marker, phase) in phase_result.phase_calls().into_iter() {
            let row: PhaseRow = PhaseRow {
                family_id: phase_result.family_id.clone(),
                marker,
                phase
            };
            self.csv_writer.serialize(&row)?;
        }
        self.csv_writer.flush()?;
        Ok(())
    }
}
