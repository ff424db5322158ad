
use crate::phaser::PhaseResult;
use crate::writers::pair_writer::PairWriter;
use crate::writers::phase_stats::StatsWriter;
use crate::writers::phase_writer::PhaseWriter;
use crate::writers::wcsp_writer::WcspDirWriter;

use log::trace;
use rustc_hash::FxHashMap as HashMap;
use simple_error::bail;

/// Structure that maintains the input order of families while writing results that may arrive out of order.
pub struct OrderedFamilyWriter {
    /// the required phase call output
    phase_writer: PhaseWriter,
    /// optional per-family stats output
    stats_writer: Option<StatsWriter>,
    /// optional per-pair output
    pair_writer: Option<PairWriter>,
    /// optional model export
    wcsp_writer: Option<WcspDirWriter>,
    /// the results that may be cached because we are waiting on earlier families
    map_store: HashMap<usize, PhaseResult>,
    /// the index of the family we are waiting for
    current_index: usize
}

impl OrderedFamilyWriter {
    /// Creates a new writer from the individual output handles
    /// # Arguments
    /// * `phase_writer` - receives the phase calls
    /// * `stats_writer` - optionally receives a summary row per family
    /// * `pair_writer` - optionally receives the weighted pairs per family
    /// * `wcsp_writer` - optionally receives a `.wcsp` model per phased family
    pub fn new(
        phase_writer: PhaseWriter, stats_writer: Option<StatsWriter>,
        pair_writer: Option<PairWriter>, wcsp_writer: Option<WcspDirWriter>
    ) -> OrderedFamilyWriter {
        OrderedFamilyWriter {
            phase_writer,
            stats_writer,
            pair_writer,
            wcsp_writer,
            map_store: Default::default(),
            current_index: 0
        }
    }

    /// Returns the family index that the writer is currently waiting to receive.
    pub fn get_wait_family(&self) -> usize {
        self.current_index
    }

    /// Adds a family result to our queue for writing.
    /// # Arguments
    /// * `family_index` - the position of the family in the input
    /// * `phase_result` - the result that will be written in order with the other families
    /// # Errors
    /// * if the index was already written or is already queued
    /// * if any of the underlying writers fail
    pub fn write_family(&mut self, family_index: usize, phase_result: PhaseResult) -> Result<(), Box<dyn std::error::Error>> {
        if family_index < self.current_index {
            bail!("Family index {} is smaller than next expected index {}", family_index, self.current_index);
        }
        if self.map_store.insert(family_index, phase_result).is_some() {
            bail!("Family index {} was already present in the map_store", family_index);
        }
        self.drain_map_store()
    }

    /// Drains results in order as far as it can and then stops to wait for more data.
    fn drain_map_store(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        while let Some(phase_result) = self.map_store.remove(&self.current_index) {
            trace!("Draining {} ({:?})", self.current_index, phase_result.family_id);
            self.phase_writer.write_family(&phase_result)?;
            if let Some(stats_writer) = self.stats_writer.as_mut() {
                stats_writer.write_family(&phase_result)?;
            }
            if let Some(pair_writer) = self.pair_writer.as_mut() {
                pair_writer.write_family(&phase_result)?;
            }
            if let (Some(wcsp_writer), Some(model)) = (self.wcsp_writer.as_mut(), phase_result.model.as_ref()) {
                wcsp_writer.write_model(&phase_result.family_id, model)?;
            }
            self.current_index += 1;
        }
        Ok(())
    }

    /// Verifies that every received result was written.
    /// # Errors
    /// * if results are still waiting on a family that never arrived
    pub fn finalize(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.map_store.is_empty() {
            bail!("{} family results are still waiting on family index {}", self.map_store.len(), self.current_index);
        }
        Ok(())
    }
}
