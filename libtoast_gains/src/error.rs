use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GainFileError {
    #[error("Could not open gain file because file {0:?} does not exist")]
    InputAccess(PathBuf),
    #[error("Gain file {path:?} is missing the {section} section")]
    MissingSection { path: PathBuf, section: &'static str },
    #[error("Gain file {path:?} failed due to FITS error in {section}: {source}")]
    Fits {
        path: PathBuf,
        section: &'static str,
        #[source]
        source: fitsio::errors::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error("Offset period {offset_index} overshoots gain {gain_index}: accumulated {accumulated} samples, expected {expected}")]
    Overshoot {
        offset_index: usize,
        gain_index: usize,
        accumulated: i64,
        expected: i64,
    },
    #[error("Offset period {offset_index} remains after all {n_gains} gains were filled")]
    GainsExhausted { offset_index: usize, n_gains: usize },
    #[error("Gain {gain_index} is incomplete: offsets ended with {accumulated} of {expected} samples")]
    IncompleteGain {
        gain_index: usize,
        accumulated: i64,
        expected: i64,
    },
    #[error("Only {filled} of {n_gains} gains were covered by offset periods")]
    UnfilledGains { filled: usize, n_gains: usize },
    #[error("Found negative sample count {count} in {section} row {index}")]
    NegativeSampleCount {
        section: &'static str,
        index: usize,
        count: i64,
    },
}

#[derive(Debug, Error)]
pub enum GainWriterError {
    #[error("GainWriter failed due to FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),
    #[error("GainWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("GainWriter could not build a temporary file name next to {0:?}")]
    BadOutputPath(PathBuf),
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Expected at least one GAIN_FILE DETNAME pair followed by OUTPUT_FILE, got {0} arguments")]
    TooFewArguments(usize),
    #[error("GAIN_FILE and DETNAME arguments must come in pairs, got {0} arguments before OUTPUT_FILE")]
    UnpairedArguments(usize),
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Merger was given no detector inputs")]
    NoInputs,
    #[error("Merger failed due to gain file error: {0}")]
    GainFile(#[from] GainFileError),
    #[error("Merger failed to align gains for detector {label}: {source}")]
    Alignment {
        label: String,
        #[source]
        source: AlignmentError,
    },
    #[error("Merger failed due to GainWriter error: {0}")]
    Writer(#[from] GainWriterError),
    #[error("Merger failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template references placeholder '{0}' which has no value")]
    MissingKey(String),
    #[error("Invalid placeholder in template at line {line}, column {column}")]
    InvalidPlaceholder { line: usize, column: usize },
}

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("Could not open sky mask because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Sky mask failed due to FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),
    #[error("Sky mask {0:?} has no binary table columns")]
    NoColumns(PathBuf),
    #[error("Sky mask contains no pixels")]
    Empty,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Generator failed due to template error in {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: TemplateError,
    },
    #[error("Generator failed due to sky mask error: {0}")]
    Mask(#[from] MaskError),
    #[error("Generator failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Generator failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Generator failed to serialize cases to JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Generator config has no {0}")]
    EmptyParameterSet(&'static str),
}
