//! # toast_gains_cli
//!
//! Part of the toast_gains crate family.
//!
//! Command line front ends of `libtoast_gains`:
//!
//! - `merge-gains GAIN_FILE1 DETNAME1 [GAIN_FILE2 DETNAME2 ...] OUTPUT_FILE`
//! - `generate-par [-c CONFIG] [new]`
//! - `generate-ini [-c CONFIG] [new]`
//!
//! The generators write a template configuration when invoked with the `new` subcommand,
//! and use the built-in defaults when no configuration is given.
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

fn term_logger(mode: TerminalMode) -> Box<TermLogger> {
    TermLogger::new(
        LevelFilter::Info,
        simplelog::Config::default(),
        mode,
        ColorChoice::Auto,
    )
}

/// Initialize terminal logging
pub fn init_logging(mode: TerminalMode) -> Result<(), log::SetLoggerError> {
    TermLogger::init(
        LevelFilter::Info,
        simplelog::Config::default(),
        mode,
        ColorChoice::Auto,
    )
}

/// Initialize terminal logging routed through a progress bar manager, so that log lines
/// do not tear the bars
pub fn init_logging_with_progress(
    mode: TerminalMode,
) -> Result<MultiProgress, log::SetLoggerError> {
    let pb_manager = MultiProgress::new();
    LogWrapper::new(pb_manager.clone(), term_logger(mode)).try_init()?;
    Ok(pb_manager)
}
