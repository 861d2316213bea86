//! Nominal control sequence and the short history of issued commands

use nalgebra::DVector;

use crate::common::Control;

/// Planned command for each of the next T steps, one vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSequence {
    pub vx: DVector<f64>,
    pub vy: DVector<f64>,
    pub wz: DVector<f64>,
}

impl ControlSequence {
    pub fn zeros(time_steps: usize) -> Self {
        Self {
            vx: DVector::zeros(time_steps),
            vy: DVector::zeros(time_steps),
            wz: DVector::zeros(time_steps),
        }
    }

    /// Sequence holding the same command at every step
    pub fn constant(time_steps: usize, control: Control) -> Self {
        Self {
            vx: DVector::from_element(time_steps, control.vx),
            vy: DVector::from_element(time_steps, control.vy),
            wz: DVector::from_element(time_steps, control.wz),
        }
    }

    pub fn len(&self) -> usize {
        self.vx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vx.is_empty()
    }

    pub fn get(&self, idx: usize) -> Control {
        Control::new(self.vx[idx], self.vy[idx], self.wz[idx])
    }

    pub fn set(&mut self, idx: usize, control: Control) {
        self.vx[idx] = control.vx;
        self.vy[idx] = control.vy;
        self.wz[idx] = control.wz;
    }

    pub fn reset(&mut self) {
        self.vx.fill(0.0);
        self.vy.fill(0.0);
        self.wz.fill(0.0);
    }

    /// Drop the first step and repeat the last one
    pub fn shift(&mut self) {
        shift_by_one(&mut self.vx);
        shift_by_one(&mut self.vy);
        shift_by_one(&mut self.wz);
    }

    /// Largest absolute per-entry difference to `other`
    pub fn max_abs_diff(&self, other: &ControlSequence) -> f64 {
        (&self.vx - &other.vx)
            .amax()
            .max((&self.vy - &other.vy).amax())
            .max((&self.wz - &other.wz).amax())
    }
}

/// Move every entry one place towards the front, duplicating the last one
pub fn shift_by_one(values: &mut DVector<f64>) {
    let n = values.len();
    if n < 2 {
        return;
    }
    for i in 0..n - 1 {
        values[i] = values[i + 1];
    }
}

/// The four most recently issued commands, oldest first.
///
/// Only the sequence filter reads it, to supply the taps left of the
/// current sequence. A fresh (or reset) history is unprimed and takes
/// its values from the first sequence it sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlHistory {
    entries: [Control; 4],
    primed: bool,
}

impl ControlHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: [Control; 4]) -> Self {
        Self { entries, primed: true }
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn entries(&self) -> &[Control; 4] {
        &self.entries
    }

    /// Fill every slot with `control` unless already primed
    pub fn prime_with(&mut self, control: Control) {
        if !self.primed {
            self.entries = [control; 4];
            self.primed = true;
        }
    }

    /// Append the newest command, dropping the oldest
    pub fn push(&mut self, control: Control) {
        self.entries.rotate_left(1);
        self.entries[3] = control;
        self.primed = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
