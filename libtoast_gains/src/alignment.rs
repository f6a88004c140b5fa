use serde::{Deserialize, Serialize};

use super::error::AlignmentError;

/// Period length used when a gain file stores a length of exactly 0.0
pub const DEFAULT_FALLBACK_PERIOD_LENGTH_S: f64 = 30.0;

/// Parameters of the gain/offset alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub fallback_period_length_s: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            fallback_period_length_s: DEFAULT_FALLBACK_PERIOD_LENGTH_S,
        }
    }
}

impl AlignmentConfig {
    /// Resolve the period length stored in a gain file, applying the fallback for 0.0
    pub fn effective_period_length(&self, stored_length_s: f64) -> f64 {
        if stored_length_s == 0.0 {
            self.fallback_period_length_s
        } else {
            stored_length_s
        }
    }
}

/// Running state of the alignment fold
#[derive(Debug, Default)]
struct AlignState {
    samples_in_current_gain: i64,
    gain_index: usize,
    start_times: Vec<f64>,
}

/// Reconstruct the start time of every gain from the offset periods that make it up.
///
/// Offset periods are consumed in file order. Gain `g` starts at the start time of the
/// first offset period that contributes to it, and offset period `j` starts at
/// `period_length_s * j`. The offset sample counts must partition the gain sample counts
/// exactly; any overshoot or leftover is reported as an error.
pub fn align_gain_start_times(
    gain_sample_counts: &[i64],
    offset_sample_counts: &[i64],
    period_length_s: f64,
) -> Result<Vec<f64>, AlignmentError> {
    check_non_negative("GAINS", gain_sample_counts)?;
    check_non_negative("OFFSETS", offset_sample_counts)?;

    let n_gains = gain_sample_counts.len();
    let initial = AlignState {
        start_times: Vec::with_capacity(n_gains),
        ..Default::default()
    };

    let state = offset_sample_counts.iter().enumerate().try_fold(
        initial,
        |mut state, (offset_index, &offset_samples)| {
            let Some(&expected) = gain_sample_counts.get(state.gain_index) else {
                return Err(AlignmentError::GainsExhausted {
                    offset_index,
                    n_gains,
                });
            };

            if state.samples_in_current_gain == 0 {
                // Empty offset periods contribute nothing, so a later period may restart the gain
                let start = period_length_s * offset_index as f64;
                match state.start_times.get_mut(state.gain_index) {
                    Some(time) => *time = start,
                    None => state.start_times.push(start),
                }
            }

            state.samples_in_current_gain += offset_samples;

            if state.samples_in_current_gain == expected {
                state.samples_in_current_gain = 0;
                state.gain_index += 1;
            } else if state.samples_in_current_gain > expected {
                return Err(AlignmentError::Overshoot {
                    offset_index,
                    gain_index: state.gain_index,
                    accumulated: state.samples_in_current_gain,
                    expected,
                });
            }
            Ok(state)
        },
    )?;

    if state.samples_in_current_gain != 0 {
        return Err(AlignmentError::IncompleteGain {
            gain_index: state.gain_index,
            accumulated: state.samples_in_current_gain,
            expected: gain_sample_counts[state.gain_index],
        });
    }
    if state.gain_index < n_gains {
        return Err(AlignmentError::UnfilledGains {
            filled: state.gain_index,
            n_gains,
        });
    }

    Ok(state.start_times)
}

fn check_non_negative(section: &'static str, counts: &[i64]) -> Result<(), AlignmentError> {
    match counts.iter().position(|&c| c < 0) {
        Some(index) => Err(AlignmentError::NegativeSampleCount {
            section,
            index,
            count: counts[index],
        }),
        None => Ok(()),
    }
}
