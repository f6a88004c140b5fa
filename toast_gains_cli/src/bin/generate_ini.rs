//! Generate the index and calibration INI files of the two-year runs.
use clap::{value_parser, Arg, Command};
use simplelog::TerminalMode;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use libtoast_gains::config::IniConfig;
use libtoast_gains::error::GeneratorError;
use libtoast_gains::ini_generator::{generate_ini_files, IniTemplates};
use libtoast_gains::output::write_rendered_files;
use toast_gains_cli::init_logging;

const DEFAULT_CONFIG_PATH: &str = "generate_ini.yml";

fn run(config: &IniConfig) -> Result<(), GeneratorError> {
    let templates = IniTemplates::load(config)?;
    let files = generate_ini_files(config, &templates)?;
    write_rendered_files(&files)?;
    for file in files.iter() {
        log::info!("File \"{}\" written to disk", file.path.to_string_lossy());
    }
    Ok(())
}

fn make_template_config(path: &Path) -> ExitCode {
    log::info!("Making a template config at {}...", path.to_string_lossy());
    match IniConfig::default().write_config_file(path) {
        Ok(()) => {
            log::info!("Done.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let matches = Command::new("generate-ini")
        .about("Generate the index and calibration INI files")
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Path to the configuration file"),
        )
        .get_matches();

    if let Err(e) = init_logging(TerminalMode::Mixed) {
        eprintln!("Could not create logging: {e}");
        return ExitCode::from(1);
    }

    let config_path = matches.get_one::<PathBuf>("config");

    if let Some(("new", _)) = matches.subcommand() {
        let path = config_path
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        return make_template_config(&path);
    }

    let config = match config_path {
        Some(path) => {
            log::info!("Loading config from {}...", path.to_string_lossy());
            match IniConfig::read_config_file(path) {
                Ok(c) => c,
                Err(e) => {
                    log::error!("{e}");
                    return ExitCode::from(1);
                }
            }
        }
        None => {
            log::info!("No config given, using the default setup");
            IniConfig::default()
        }
    };
    log::info!("Input directory: {}", config.input_dir);
    log::info!("Detectors: {}", config.detectors.join(", "));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Generation failed with error: {e}");
            ExitCode::from(1)
        }
    }
}
