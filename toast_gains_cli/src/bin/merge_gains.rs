//! Combine several gain files into one, formatted according to what TOAST expects.
use clap::{value_parser, Arg, ArgAction, Command};
use indicatif::ProgressBar;
use simplelog::TerminalMode;
use std::path::PathBuf;
use std::process::ExitCode;

use libtoast_gains::config::MergeConfig;
use libtoast_gains::merger::{parse_merge_args, process};
use toast_gains_cli::init_logging_with_progress;

const USAGE: &str =
    "Usage: merge-gains [OPTIONS] GAIN_FILE1 DETNAME1 [GAIN_FILE2 DETNAME2...] OUTPUT_FILE";

fn main() -> ExitCode {
    let matches = Command::new("merge-gains")
        .about("Combine several gain files into one file readable by TOAST")
        .override_usage(USAGE.trim_start_matches("Usage: "))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Path to a YAML merge configuration"),
        )
        .arg(
            Arg::new("fallback-period")
                .long("fallback-period")
                .value_parser(value_parser!(f64))
                .help("Offset period length in seconds used when a file stores 0.0"),
        )
        .arg(
            Arg::new("files")
                .value_name("GAIN_FILE DETNAME ... OUTPUT_FILE")
                .num_args(0..)
                .allow_hyphen_values(true)
                .action(ArgAction::Append),
        )
        .get_matches();

    let args: Vec<String> = matches
        .get_many::<String>("files")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let (inputs, output) = match parse_merge_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{USAGE}");
            return ExitCode::from(1);
        }
    };

    // Logs go to stderr, stdout only gets the final report
    let pb_manager = match init_logging_with_progress(TerminalMode::Stderr) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Could not create logging/progress: {e}");
            return ExitCode::from(1);
        }
    };

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => match MergeConfig::read_config_file(path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::from(1);
            }
        },
        None => MergeConfig::default(),
    };
    if let Some(period) = matches.get_one::<f64>("fallback-period") {
        config.alignment.fallback_period_length_s = *period;
    }

    let pb = pb_manager.add(ProgressBar::new(100));
    let result = process(&inputs, &output, &config, |status| {
        pb.set_position((status.progress * 100.0) as u64);
        pb.set_message(format!(
            "{} ({}/{})",
            status.label,
            status.detector_index + 1,
            status.n_detectors
        ));
    });
    pb.finish();

    match result {
        Ok(_) => {
            println!("File {} written", output.to_string_lossy());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Merging failed with error: {e}");
            ExitCode::from(1)
        }
    }
}
