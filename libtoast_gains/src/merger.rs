use std::path::{Path, PathBuf};

use super::alignment::align_gain_start_times;
use super::config::MergeConfig;
use super::error::{MergeError, UsageError};
use super::fits_writer::write_merged_gains;
use super::gain_record::GainRecordSet;
use super::gain_series::{normalize_gains, DetectorGains, MergedGains};
use super::merge_status::MergeStatus;

/// One gain file and the label of the detector it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorInput {
    pub path: PathBuf,
    pub label: String,
}

impl DetectorInput {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

/// Split `GAIN_FILE1 DETNAME1 [GAIN_FILE2 DETNAME2 ...] OUTPUT_FILE` into its pairs
/// and the output path.
pub fn parse_merge_args<S: AsRef<str>>(
    args: &[S],
) -> Result<(Vec<DetectorInput>, PathBuf), UsageError> {
    let Some((output, pairs)) = args.split_last() else {
        return Err(UsageError::TooFewArguments(0));
    };
    if pairs.is_empty() {
        return Err(UsageError::TooFewArguments(args.len()));
    }
    if pairs.len() % 2 != 0 {
        return Err(UsageError::UnpairedArguments(pairs.len()));
    }

    let inputs = pairs
        .chunks_exact(2)
        .map(|pair| DetectorInput::new(pair[0].as_ref(), pair[1].as_ref()))
        .collect();
    Ok((inputs, PathBuf::from(output.as_ref())))
}

/// Turn the gain file of a single detector into its time/gain series
pub fn merge_detector(
    input: &DetectorInput,
    config: &MergeConfig,
) -> Result<DetectorGains, MergeError> {
    let mut records = GainRecordSet::read_fits(&input.path)?;

    let period_length_s = config
        .alignment
        .effective_period_length(records.offset_period_length_s);
    if records.offset_period_length_s == 0.0 {
        log::info!(
            "Gain file {} has no offset period length, using {period_length_s} s",
            input.path.to_string_lossy()
        );
    }

    let times = align_gain_start_times(
        &records.gain_sample_counts,
        &records.offset_sample_counts,
        period_length_s,
    )
    .map_err(|source| MergeError::Alignment {
        label: input.label.clone(),
        source,
    })?;

    normalize_gains(&mut records.gains);

    Ok(DetectorGains {
        label: input.label.clone(),
        times,
        gains: records.gains,
    })
}

/// Build the merged container for all inputs, preserving their order.
///
/// `on_status` is called after each detector has been processed.
pub fn merge_gains_with_status<F>(
    inputs: &[DetectorInput],
    config: &MergeConfig,
    mut on_status: F,
) -> Result<MergedGains, MergeError>
where
    F: FnMut(MergeStatus),
{
    if inputs.is_empty() {
        return Err(MergeError::NoInputs);
    }

    let mut merged = MergedGains::new();
    for (idx, input) in inputs.iter().enumerate() {
        log::info!(
            "Processing detector {} from {}...",
            input.label,
            input.path.to_string_lossy()
        );
        let detector = merge_detector(input, config)?;
        log::info!("Detector {} has {} gains.", detector.label, detector.len());
        merged.push(detector);
        on_status(MergeStatus::new(idx, inputs.len(), &input.label));
    }
    Ok(merged)
}

pub fn merge_gains(
    inputs: &[DetectorInput],
    config: &MergeConfig,
) -> Result<MergedGains, MergeError> {
    merge_gains_with_status(inputs, config, |_| ())
}

/// The main entry point of the merger.
///
/// Reads every input, and only once all of them were merged successfully writes the
/// output file.
pub fn process<F>(
    inputs: &[DetectorInput],
    output: &Path,
    config: &MergeConfig,
    on_status: F,
) -> Result<MergedGains, MergeError>
where
    F: FnMut(MergeStatus),
{
    let merged = merge_gains_with_status(inputs, config, on_status)?;
    let size = write_merged_gains(&merged, output)?;
    log::info!(
        "Wrote {} detectors to {} ({})",
        merged.len(),
        output.to_string_lossy(),
        human_bytes::human_bytes(size as f64)
    );
    Ok(merged)
}
