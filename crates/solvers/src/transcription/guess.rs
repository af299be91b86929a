use ndarray::Array1;
use ninterp::{
    interpolator::Extrapolate,
    prelude::{Interp1DOwned, Interpolator},
    strategy::Linear,
};
use vela_core::{Guess, Phase};

use super::{
    error::InterpError,
    layout::{PhaseLayout, time_at},
};

/// Writes a phase's starting values into the decision vector.
///
/// Guess trajectories are interpolated linearly onto the node times and held
/// constant beyond either end of the guess grid.
pub(crate) fn fill(phase: &Phase, layout: &PhaseLayout, x: &mut [f64]) -> Result<(), InterpError> {
    let Some(guess) = phase.guess() else {
        return Ok(());
    };
    let dims = layout.dims();
    let (t0, tf) = end_times(phase, guess);
    let times: Vec<f64> = layout
        .mesh()
        .fractions()
        .into_iter()
        .map(|fraction| time_at(fraction, t0, tf))
        .collect();

    let grid = Grid::new(guess.time());
    for i in 0..dims.states {
        let values = grid.sample(guess.states().row(i).iter().copied(), &times)?;
        for (k, value) in values.into_iter().enumerate() {
            x[layout.state(k) + i] = value;
        }
    }
    for i in 0..dims.controls {
        let values = grid.sample(guess.controls().row(i).iter().copied(), &times)?;
        for (k, value) in values.into_iter().enumerate() {
            x[layout.control(k) + i] = value;
        }
    }

    let start = layout.parameters();
    x[start..start + dims.parameters].copy_from_slice(guess.parameters());
    x[layout.t0()] = t0;
    x[layout.tf()] = tf;
    Ok(())
}

/// Phase end times taken from the guess grid and clamped into their bounds.
///
/// A guess that spans no time gets a unit duration where the end-time bounds
/// allow it.
pub(crate) fn end_times(phase: &Phase, guess: &Guess) -> (f64, f64) {
    let time = guess.time();
    let t0 = phase.start_time().clamp(time[0]);
    let mut tf = phase.end_time().clamp(time[time.len() - 1]);
    if tf <= t0 {
        tf = phase.end_time().clamp(t0 + 1.0);
    }
    (t0, tf)
}

/// A guess time grid with repeated times removed.
struct Grid {
    time: Vec<f64>,
    keep: Vec<usize>,
}

impl Grid {
    fn new(time: &[f64]) -> Self {
        let mut keep: Vec<usize> = Vec::with_capacity(time.len());
        for (i, &t) in time.iter().enumerate() {
            if keep.last().is_none_or(|&j| t > time[j]) {
                keep.push(i);
            }
        }
        Self {
            time: keep.iter().map(|&i| time[i]).collect(),
            keep,
        }
    }

    fn sample(
        &self,
        row: impl Iterator<Item = f64>,
        at: &[f64],
    ) -> Result<Vec<f64>, InterpError> {
        let row: Vec<f64> = row.collect();
        let values: Vec<f64> = self.keep.iter().map(|&i| row[i]).collect();

        if values.len() == 1 {
            return Ok(vec![values[0]; at.len()]);
        }

        let interp = Interp1DOwned::new(
            Array1::from(self.time.clone()),
            Array1::from(values),
            Linear,
            Extrapolate::Clamp,
        )?;
        at.iter()
            .map(|&t| interp.interpolate(&[t]).map_err(Into::into))
            .collect()
    }
}
