
use crate::cost_model::CostModel;

use log::{debug, warn};
use rustc_hash::FxHashSet as HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Serializes a cost model in the toulbar2 `.wcsp` text format.
/// The fixed constraints become unary functions forbidding the other value, and each pairwise function lists all 4 tuples.
/// Any cost >= the upper bound in the header is treated as forbidden by the solver.
/// # Arguments
/// * `model` - the model to write
/// * `problem_name` - the name stored in the header, whitespace is replaced
/// * `writer` - the output handle
pub fn write_wcsp<W: Write>(model: &CostModel, problem_name: &str, writer: &mut W) -> std::io::Result<()> {
    let num_variables: usize = model.num_variables();
    let num_functions: usize = model.fixed().len() + model.pairwise().len();
    let upper_bound: u64 = model.max_total_cost().saturating_add(1);
    let name: String = problem_name.split_whitespace().collect::<Vec<&str>>().join("_");
    let name: &str = if name.is_empty() { "hsphase" } else { &name };

    writeln!(writer, "{name} {num_variables} 2 {num_functions} {upper_bound}")?;
    let domains: Vec<&str> = vec!["2"; num_variables];
    writeln!(writer, "{}", domains.join(" "))?;

    for fc in model.fixed().iter() {
        let forbidden: u8 = 1 - fc.value;
        writeln!(writer, "1 {} 0 1", fc.variable)?;
        writeln!(writer, "{forbidden} {upper_bound}")?;
    }

    for (&(k, l), pc) in model.pairwise().iter() {
        writeln!(writer, "2 {k} {l} 0 4")?;
        for a in 0..2 {
            for b in 0..2 {
                writeln!(writer, "{a} {b} {}", pc.matrix().cost(a, b))?;
            }
        }
    }
    Ok(())
}

/// Writes one `.wcsp` file per family into an output folder.
pub struct WcspDirWriter {
    /// The folder receiving the files
    output_dir: PathBuf,
    /// Every file written so far, so that sanitized names never overwrite each other
    used_paths: HashSet<PathBuf>
}

impl WcspDirWriter {
    /// Creates the writer, making the output folder if needed
    /// # Arguments
    /// * `output_dir` - the folder to write into
    pub fn new(output_dir: &Path) -> std::io::Result<WcspDirWriter> {
        std::fs::create_dir_all(output_dir)?;
        Ok(WcspDirWriter {
            output_dir: output_dir.to_path_buf(),
            used_paths: Default::default()
        })
    }

    /// Returns the default path for a given family, ignoring any files already written
    pub fn family_path(&self, family_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.wcsp", sanitize_stem(family_id)))
    }

    /// Returns the first unused path for a family; collisions get a numeric suffix, e.g. `sire_1_2.wcsp`
    fn unique_path(&self, family_id: &str) -> PathBuf {
        let default_path: PathBuf = self.family_path(family_id);
        if !self.used_paths.contains(&default_path) {
            return default_path;
        }
        let stem: String = sanitize_stem(family_id);
        (2..)
            .map(|suffix| self.output_dir.join(format!("{stem}_{suffix}.wcsp")))
            .find(|p| !self.used_paths.contains(p))
            .unwrap_or(default_path)
    }

    /// Writes the model for a family and returns the path that was used
    /// # Arguments
    /// * `family_id` - the family name, also stored in the file header
    /// * `model` - the model to write
    pub fn write_model(&mut self, family_id: &str, model: &CostModel) -> std::io::Result<PathBuf> {
        let filename: PathBuf = self.unique_path(family_id);
        if filename != self.family_path(family_id) {
            warn!("WCSP file name for {:?} is already in use, writing to {:?}", family_id, filename);
        }
        debug!("Writing WCSP model for {:?} to {:?}", family_id, filename);
        let mut writer = BufWriter::new(File::create(&filename)?);
        write_wcsp(model, family_id, &mut writer)?;
        writer.flush()?;
        self.used_paths.insert(filename.clone());
        Ok(filename)
    }
}

/// Replaces anything that is not safe in a file name with `_`
fn sanitize_stem(family_id: &str) -> String {
    family_id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}
