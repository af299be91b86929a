//! Writes solved trajectories as plain-text tables.
//!
//! Each phase gets `t.dat`, `x.dat`, `u.dat`, `lambda.dat` and `H.dat`.
//! Rows are variables and columns are nodes, matching the layout of
//! [`PhaseSolution`]; `t.dat` and `H.dat` hold a single row. Values are
//! separated by spaces and written with full precision. A `summary.txt` file
//! records the problem name, status, objective, iteration count and the time
//! span of every phase.
//!
//! A single-phase problem writes its tables straight into the destination
//! directory. With several phases each gets a `phase_<i>` subdirectory,
//! counting from zero.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use nalgebra::DMatrix;
use thiserror::Error;
use vela_core::Problem;

use crate::orchestrator::{PhaseSolution, Solution};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("problem `{0}` has no output destination")]
    NoDestination(String),

    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes the solution into the problem's output destination.
///
/// Returns the files written.
///
/// # Errors
///
/// Returns [`ExportError::NoDestination`] if the problem has no destination,
/// or [`ExportError::Io`] if a directory or file cannot be written.
pub fn write(problem: &Problem, solution: &Solution) -> Result<Vec<PathBuf>, ExportError> {
    let destination = problem
        .output_destination()
        .ok_or_else(|| ExportError::NoDestination(problem.name().to_owned()))?;
    write_to(destination, problem.name(), solution)
}

/// Writes the solution into `directory`, creating it if needed.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if a directory or file cannot be written.
pub fn write_to(
    directory: &Path,
    name: &str,
    solution: &Solution,
) -> Result<Vec<PathBuf>, ExportError> {
    create_dir(directory)?;
    let mut written = Vec::new();

    let single = solution.phases.len() == 1;
    for (index, phase) in solution.phases.iter().enumerate() {
        let dir = if single {
            directory.to_path_buf()
        } else {
            let dir = directory.join(format!("phase_{index}"));
            create_dir(&dir)?;
            dir
        };
        written.extend(write_phase(&dir, phase)?);
    }

    let summary = directory.join("summary.txt");
    write_file(&summary, |out| write_summary(out, name, solution))?;
    written.push(summary);
    Ok(written)
}

fn write_phase(dir: &Path, phase: &PhaseSolution) -> Result<Vec<PathBuf>, ExportError> {
    let time = DMatrix::from_row_slice(1, phase.time.len(), &phase.time);
    let hamiltonian = DMatrix::from_row_slice(1, phase.hamiltonian.len(), &phase.hamiltonian);
    let tables = [
        ("t.dat", &time),
        ("x.dat", &phase.states),
        ("u.dat", &phase.controls),
        ("lambda.dat", &phase.costates),
        ("H.dat", &hamiltonian),
    ];

    let mut written = Vec::with_capacity(tables.len());
    for (file, table) in tables {
        let path = dir.join(file);
        write_file(&path, |out| write_table(out, table))?;
        written.push(path);
    }
    Ok(written)
}

fn write_table(out: &mut impl Write, table: &DMatrix<f64>) -> io::Result<()> {
    for row in table.row_iter() {
        let line: Vec<String> = row.iter().map(|v| format!("{v:e}")).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, name: &str, solution: &Solution) -> io::Result<()> {
    writeln!(out, "problem: {name}")?;
    writeln!(out, "status: {:?}", solution.status)?;
    writeln!(out, "objective: {:e}", solution.objective)?;
    writeln!(out, "iterations: {}", solution.iterations)?;
    for (index, phase) in solution.phases.iter().enumerate() {
        writeln!(out, "phase {index}: t0 = {:e}, tf = {:e}", phase.t0(), phase.tf())?;
    }
    Ok(())
}

fn write_file<F>(path: &Path, contents: F) -> Result<(), ExportError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    contents(&mut out).map_err(io_err)?;
    out.flush().map_err(io_err)
}

fn create_dir(dir: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
