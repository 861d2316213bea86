//! Savitzky-Golay smoothing of the optimal control sequence

use nalgebra::DVector;

use crate::common::Control;
use crate::mppi::control_sequence::{ControlHistory, ControlSequence};

/// Quadratic 9-point Savitzky-Golay coefficients, before dividing by 231
const COEFFICIENTS: [f64; 9] = [-21.0, 14.0, 39.0, 54.0, 59.0, 54.0, 39.0, 14.0, -21.0];
const NORMALIZATION: f64 = 231.0;

/// Shorter sequences are left untouched
pub const MIN_FILTER_LENGTH: usize = 20;

fn apply_filter(window: &[f64; 9]) -> f64 {
    window.iter().zip(COEFFICIENTS.iter()).map(|(v, c)| v * c).sum::<f64>() / NORMALIZATION
}

/// Filter one channel in place.
///
/// `history` supplies the 4 taps left of entry 0; taps right of the last
/// entry repeat it. The last entry itself is kept as is.
fn filter_axis(sequence: &mut DVector<f64>, history: [f64; 4]) {
    let initial = sequence.clone();
    let last = initial.len() - 1;
    let sample = |idx: isize| -> f64 {
        if idx < 0 {
            history[(4 + idx) as usize]
        } else {
            initial[(idx as usize).min(last)]
        }
    };

    for idx in 0..last {
        let mut window = [0.0; 9];
        for (k, tap) in window.iter_mut().enumerate() {
            *tap = sample(idx as isize + k as isize - 4);
        }
        sequence[idx] = apply_filter(&window);
    }
}

/// Smooth every channel of `sequence` and push the command at `offset`
/// into `history`.
///
/// An unprimed history is first filled with the sequence's first entry.
pub fn savitzky_golay_filter(sequence: &mut ControlSequence, history: &mut ControlHistory, offset: usize) {
    if sequence.len() < MIN_FILTER_LENGTH {
        return;
    }

    history.prime_with(sequence.get(0));
    let h = history.entries();
    let vx_hist = [h[0].vx, h[1].vx, h[2].vx, h[3].vx];
    let vy_hist = [h[0].vy, h[1].vy, h[2].vy, h[3].vy];
    let wz_hist = [h[0].wz, h[1].wz, h[2].wz, h[3].wz];

    filter_axis(&mut sequence.vx, vx_hist);
    filter_axis(&mut sequence.vy, vy_hist);
    filter_axis(&mut sequence.wz, wz_hist);

    let offset = offset.min(sequence.len() - 1);
    history.push(Control::new(sequence.vx[offset], sequence.vy[offset], sequence.wz[offset]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_coefficients_sum_to_one() {
        assert_abs_diff_eq!(COEFFICIENTS.iter().sum::<f64>() / NORMALIZATION, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_short_sequence_is_untouched() {
        let mut seq = ControlSequence::zeros(19);
        for i in 0..19 {
            seq.set(i, Control::new((i as f64).sin(), 0.1 * i as f64, -(i as f64)));
        }
        let before = seq.clone();
        let mut history = ControlHistory::new();
        savitzky_golay_filter(&mut seq, &mut history, 0);
        assert_eq!(seq, before);
        assert!(!history.is_primed());
    }

    #[test]
    fn test_constant_sequence_is_preserved() {
        let control = Control::new(0.4, -0.1, 0.25);
        let mut seq = ControlSequence::constant(30, control);
        let mut history = ControlHistory::from_entries([control; 4]);
        savitzky_golay_filter(&mut seq, &mut history, 0);
        for i in 0..30 {
            assert_abs_diff_eq!(seq.vx[i], 0.4, epsilon = 1e-12);
            assert_abs_diff_eq!(seq.vy[i], -0.1, epsilon = 1e-12);
            assert_abs_diff_eq!(seq.wz[i], 0.25, epsilon = 1e-12);
        }

        // fresh history is primed from the sequence itself
        let mut seq = ControlSequence::constant(20, control);
        let mut history = ControlHistory::new();
        savitzky_golay_filter(&mut seq, &mut history, 1);
        assert_abs_diff_eq!(seq.vx[0], 0.4, epsilon = 1e-12);
        assert!(history.is_primed());
        assert_abs_diff_eq!(history.entries()[3].wz, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_smooths_spike_and_keeps_last_entry() {
        let mut seq = ControlSequence::zeros(25);
        seq.vx[10] = 1.0;
        seq.wz[24] = 2.0;
        let mut history = ControlHistory::new();
        savitzky_golay_filter(&mut seq, &mut history, 0);
        assert_abs_diff_eq!(seq.vx[10], 59.0 / 231.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seq.vx[6], -21.0 / 231.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seq.vx[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seq.wz[24], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_history_feeds_left_edge() {
        let mut seq = ControlSequence::zeros(20);
        let mut history = ControlHistory::from_entries([Control::differential(1.0, 0.0); 4]);
        savitzky_golay_filter(&mut seq, &mut history, 0);
        let expected = (-21.0 + 14.0 + 39.0 + 54.0) / 231.0;
        assert_abs_diff_eq!(seq.vx[0], expected, epsilon = 1e-12);
        assert_abs_diff_eq!(history.entries()[3].vx, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(history.entries()[2].vx, 1.0, epsilon = 1e-12);
    }
}
