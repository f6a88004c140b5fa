//! Generate the SLURM scripts of a simulation campaign.
use clap::{value_parser, Arg, Command};
use simplelog::TerminalMode;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use libtoast_gains::config::ParConfig;
use libtoast_gains::error::GeneratorError;
use libtoast_gains::output::write_rendered_files;
use libtoast_gains::par_generator::{generate_par_files, ParTemplates};
use libtoast_gains::sky_mask::resolve_masks;
use toast_gains_cli::init_logging;

const DEFAULT_CONFIG_PATH: &str = "generate_par.yml";

fn run(config: &ParConfig) -> Result<(), GeneratorError> {
    let templates = ParTemplates::load(config)?;
    let masks = resolve_masks(&config.masks)?;
    let working_dir = std::env::current_dir()?;

    let output = generate_par_files(config, &templates, &masks, &working_dir)?;
    write_rendered_files(&output.files)?;
    for name in output.case_names.iter() {
        log::info!("Parameter files for case \"{name}\" written to disk");
    }

    std::fs::write(&config.cases_file, output.cases_json()?)?;
    log::info!(
        "Description of {} cases written to {}",
        output.cases.len(),
        config.cases_file.to_string_lossy()
    );
    Ok(())
}

fn make_template_config(path: &Path) -> ExitCode {
    log::info!("Making a template config at {}...", path.to_string_lossy());
    match ParConfig::default().write_config_file(path) {
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
    let matches = Command::new("generate-par")
        .about("Generate the SLURM scripts of a simulation campaign")
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
            match ParConfig::read_config_file(path) {
                Ok(c) => c,
                Err(e) => {
                    log::error!("{e}");
                    return ExitCode::from(1);
                }
            }
        }
        None => {
            log::info!("No config given, using the default setup");
            ParConfig::default()
        }
    };
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!(
        "Cases: {} noise x {} scanning",
        config.noise.len(),
        config.scanning.len()
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Generation failed with error: {e}");
            ExitCode::from(1)
        }
    }
}
