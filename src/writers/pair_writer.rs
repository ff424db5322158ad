
use crate::phaser::PhaseResult;

use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// This is a wrapper for writing out the weighted marker pairs used for each family
pub struct PairWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of our pair file
#[derive(Serialize)]
struct PairRow {
    family_id: String,
    /// first marker position, always the smaller one
    first: usize,
    second: usize,
    discordant: u64,
    concordant: u64,
    /// recombination rate between the two markers
    rate: f64,
    /// rounded log-likelihood weight
    weight: i64,
    agree_cost: u64,
    disagree_cost: u64
}

impl PairWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write all pair records to
    pub fn new(filename: &Path) -> csv::Result<PairWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(PairWriter {
            csv_writer
        })
    }

    /// Writes every pairwise cost for a family in marker order; families without a model write nothing.
    /// # Arguments
    /// * `phase_result` - the result for the family
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_family(&mut self, phase_result: &PhaseResult) -> csv::Result<()> {
        let model = match phase_result.model.as_ref() {
            Some(m) => m,
            None => return Ok(())
        };

        let mut pair_costs: Vec<_> = model.pairwise().values().collect();
        pair_costs.sort_by_key(|pc| pc.pair());
        for pc in pair_costs.into_iter() {
            let row: PairRow = PairRow {
                family_id: phase_result.family_id.clone(),
                first: pc.pair().first(),
                second: pc.pair().second(),
                discordant: pc.counts().discordant(),
                concordant: pc.counts().concordant(),
                rate: pc.rate(),
                weight: pc.weight(),
                agree_cost: pc.matrix().agree_cost(),
                disagree_cost: pc.matrix().disagree_cost()
            };
            self.csv_writer.serialize(&row)?;
        }
        self.csv_writer.flush()?;
        Ok(())
    }
}
