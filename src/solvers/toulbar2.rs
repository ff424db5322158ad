
use crate::cost_model::{CostModel, PhasingError};
use crate::solvers::{SolveStats, Solution, WcspSolver};
use crate::writers::wcsp_writer::write_wcsp;

use log::{debug, trace};
use simple_error::bail;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::Command;

/// Runs an external toulbar2 executable on the exported model and reads back the solution file.
pub struct Toulbar2Solver {
    /// The toulbar2 binary, either a path or a name on $PATH
    binary: PathBuf
}

impl Toulbar2Solver {
    pub fn new(binary: PathBuf) -> Toulbar2Solver {
        Toulbar2Solver {
            binary
        }
    }

    /// Writes the model, runs the binary, and parses the solution.
    /// Any problem along the way comes back as a dynamic error that gets wrapped into a solver failure.
    fn run(&self, model: &CostModel) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let problem_path: PathBuf = temp_dir.path().join("problem.wcsp");
        let solution_path: PathBuf = temp_dir.path().join("solution.txt");

        let mut problem_writer = BufWriter::new(File::create(&problem_path)?);
        write_wcsp(model, "hsphase", &mut problem_writer)?;
        problem_writer.flush()?;
        drop(problem_writer);

        debug!("Running {:?} on {:?}", self.binary, problem_path);
        let output = Command::new(&self.binary)
            .arg(&problem_path)
            .arg(format!("-w={}", solution_path.display()))
            .output()?;
        trace!("toulbar2 stdout: {}", String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            bail!("{:?} exited with {}: {}", self.binary, output.status, String::from_utf8_lossy(&output.stderr).trim());
        }
        if !solution_path.exists() {
            bail!("{:?} did not write a solution, the problem may be infeasible", self.binary);
        }

        let solution_text: String = std::fs::read_to_string(&solution_path)?;
        parse_solution(&solution_text)
    }
}

/// Parses a toulbar2 solution file.
/// Values are whitespace separated and may be bare (`0 1 1`) or named (`x0=0 x1=1`).
/// # Arguments
/// * `text` - the contents of the solution file
/// # Errors
/// * if a value is not 0 or 1
/// * if no values are found
pub fn parse_solution(text: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut assignment: Vec<u8> = vec![];
    for token in text.split_whitespace() {
        let value_str: &str = match token.rsplit_once('=') {
            Some((_name, value)) => value,
            None => token
        };
        // named values can carry a value prefix like "v1"
        let value_str: &str = value_str.trim_start_matches('v');
        match value_str {
            "0" => assignment.push(0),
            "1" => assignment.push(1),
            _ => bail!("Unexpected value in solution: {:?}", token)
        };
    }
    if assignment.is_empty() {
        bail!("Solution file was empty");
    }
    Ok(assignment)
}

impl WcspSolver for Toulbar2Solver {
    fn name(&self) -> &str {
        "toulbar2"
    }

    fn solve(&self, model: &CostModel) -> Result<Solution, PhasingError> {
        let assignment: Vec<u8> = self.run(model)
            .map_err(|e| PhasingError::SolverFailure(format!("toulbar2: {e}")))?;
        model.check_assignment(&assignment)?;
        let cost: u64 = model.total_cost(&assignment);
        Ok(Solution {
            assignment,
            statistics: SolveStats {
                explored_nodes: 0,
                pruned_nodes: 0,
                estimated_cost: None,
                cost
            }
        })
    }
}
