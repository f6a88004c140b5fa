use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::config::{NoiseParameters, ParConfig, ScanningParameters};
use super::error::GeneratorError;
use super::output::{absolute_from, RenderedFile};
use super::sky_mask::MaskCoverage;
use super::template::{Template, TemplateParams, TemplateValue, AT_DELIMITER};

const INDEX_FILE_TEMPLATE: &str = include_str!("templates/index.slurm");
const CALIBRATE_FILE_TEMPLATE: &str = include_str!("templates/calibrate.slurm");
const OVERALL_FILE_TEMPLATE: &str = include_str!("templates/overall.slurm");
const SUBJOB_TEMPLATE: &str = include_str!("templates/subjob.sh");

/// Wall time requested by every simulation job
const ESTIMATED_SECONDS: i64 = 10 * 60;
const ESTIMATED_NODES: i64 = 40;
/// Baseline used when there is no 1/f noise to remove
const WHITE_NOISE_BASELINE_S: f64 = 60.0;
/// Precession periods longer than this (in minutes) calibrate over one hour instead
const LONG_PRECESSION_MIN: f64 = 60.0 * 24.0 * 10.0;
const LONG_PRECESSION_CAL_DURATION_MIN: i64 = 60;
const LONG_CAL_NODES: i64 = 13;
const SHORT_CAL_NODES: i64 = 50;

/// Format a number of seconds as a SLURM wall time, `H:MM:SS`
pub fn format_walltime(seconds: i64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds - (h * 3600 + m * 60);
    format!("{h}:{m:02}:{s:02}")
}

/// Length of the 1/f baselines for a given knee frequency
pub fn baseline_length_s(noise: &NoiseParameters) -> f64 {
    if noise.fknee_mhz > 0 {
        1.0 / (noise.fknee_mhz as f64 * 1e-3) / 2.0
    } else {
        WHITE_NOISE_BASELINE_S
    }
}

/// The job templates that are read from disk instead of being bundled
#[derive(Debug, Clone)]
pub struct ParTemplates {
    pub uncalibrated_job: Template,
    pub calibrated_job: Template,
}

impl ParTemplates {
    pub fn load(config: &ParConfig) -> Result<Self, GeneratorError> {
        Ok(Self {
            uncalibrated_job: Template::from_file(&config.uncalibrated_job_template, AT_DELIMITER)?,
            calibrated_job: Template::from_file(&config.calibrated_job_template, AT_DELIMITER)?,
        })
    }
}

/// Everything produced for a set of cases
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParOutput {
    #[serde(skip)]
    pub files: Vec<RenderedFile>,
    pub cases: BTreeMap<usize, TemplateParams>,
    #[serde(skip)]
    pub case_names: Vec<String>,
}

impl ParOutput {
    pub fn cases_json(&self) -> Result<String, GeneratorError> {
        Ok(serde_json::to_string_pretty(&self.cases)?)
    }

    /// Add a file, replacing an earlier one with the same path
    fn add_file(&mut self, file: RenderedFile) {
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }
}

fn render(template: &Template, name: &str, params: &TemplateParams) -> Result<String, GeneratorError> {
    template
        .substitute(params)
        .map_err(|source| GeneratorError::Template {
            name: name.to_string(),
            source,
        })
}

fn set(params: &mut TemplateParams, key: &str, value: impl Into<TemplateValue>) {
    params.insert(key.to_string(), value.into());
}

/// Parameters shared by every job of a case
fn case_parameters(
    config: &ParConfig,
    case: usize,
    noise: &NoiseParameters,
    scanning: &ScanningParameters,
) -> TemplateParams {
    let prec_period_min = 1.0 / scanning.prec_rate_rpm;
    let mut params = TemplateParams::new();
    set(&mut params, "code_path", config.code_path.as_path());
    set(&mut params, "account", config.slurm_account.as_str());
    set(&mut params, "prec_angle_deg", scanning.prec_angle_deg);
    set(&mut params, "spin_angle_deg", scanning.spin_angle_deg);
    set(&mut params, "psd_NET", noise.white_noise);
    set(&mut params, "psd_NET_mK", 1e6 * noise.white_noise);
    set(&mut params, "fknee_Hz", 1e-3 * noise.fknee_mhz as f64);
    set(&mut params, "fknee_mHz", noise.fknee_mhz);
    set(&mut params, "spin_period_min", 1.0 / scanning.spin_rate_rpm);
    set(&mut params, "prec_period_min", prec_period_min);
    set(&mut params, "prec_period_min_int", prec_period_min as i64);
    set(&mut params, "baseline_length_s", baseline_length_s(noise));
    set(&mut params, "sample_rate", config.sample_rate_hz);
    set(&mut params, "nodes", ESTIMATED_NODES);
    set(&mut params, "walltime", format_walltime(ESTIMATED_SECONDS));
    set(&mut params, "case", case as i64);
    params
}

/// Generate the SLURM scripts of every case.
///
/// Cases are the cartesian product of the noise and scanning parameters, noise first.
/// `masks` must list the masks of `config` in the same order. Paths of the sub-jobs run
/// by the overall job are made absolute against `working_dir`.
pub fn generate_par_files(
    config: &ParConfig,
    templates: &ParTemplates,
    masks: &[MaskCoverage],
    working_dir: &Path,
) -> Result<ParOutput, GeneratorError> {
    if config.noise.is_empty() {
        return Err(GeneratorError::EmptyParameterSet("noise parameters"));
    }
    if config.scanning.is_empty() {
        return Err(GeneratorError::EmptyParameterSet("scanning parameters"));
    }
    if config.detectors.is_empty() {
        return Err(GeneratorError::EmptyParameterSet("detectors"));
    }

    let index_template = Template::new(INDEX_FILE_TEMPLATE, AT_DELIMITER);
    let calibrate_template = Template::new(CALIBRATE_FILE_TEMPLATE, AT_DELIMITER);
    let overall_template = Template::new(OVERALL_FILE_TEMPLATE, AT_DELIMITER);
    let subjob_template = Template::new(SUBJOB_TEMPLATE, AT_DELIMITER);

    let mut output = ParOutput::default();
    let combinations = config
        .noise
        .iter()
        .flat_map(|noise| config.scanning.iter().map(move |scanning| (noise, scanning)));

    for (case, (noise, scanning)) in combinations.enumerate() {
        let mut subjobs: Vec<PathBuf> = Vec::new();
        let mut d = case_parameters(config, case, noise, scanning);
        let baseline = baseline_length_s(noise);
        let prec_period_min = 1.0 / scanning.prec_rate_rpm;

        let basename = format!(
            "{case:03}_spin{:02}deg_wn{:.1}_fk{:03}",
            scanning.spin_angle_deg,
            1e6 * noise.white_noise,
            noise.fknee_mhz
        );
        let outdir = config.simulation_output_root.join(&basename);
        set(&mut d, "outdir", outdir.as_path());

        let uncalibrated_job = config
            .output_path
            .join(format!("{basename}_1_uncalibrated.slurm"));
        let contents = render(&templates.uncalibrated_job, "uncalibrated job", &d)?;
        output.add_file(RenderedFile::new(&uncalibrated_job, contents));
        subjobs.push(uncalibrated_job);

        output.cases.insert(case, d.clone());

        let long_precession = prec_period_min > LONG_PRECESSION_MIN;
        let cal_duration_base = if long_precession {
            LONG_PRECESSION_CAL_DURATION_MIN as f64
        } else {
            prec_period_min
        };

        for mask in masks {
            set(&mut d, "galactic_mask", mask.file_name.as_str());
            set(&mut d, "mask_percentage", mask.percentage);
            set(
                &mut d,
                "fsky",
                format!("{:.2}", mask.percentage as f64 / 100.0),
            );

            for cal_duration_min in [cal_duration_base, 4.0 * cal_duration_base] {
                let cal_duration_int = cal_duration_min as i64;
                let cal_duration_str = format!("{cal_duration_int:02}");
                let mut gain2toast_input: Vec<String> = Vec::new();

                for det in config.detectors.iter() {
                    set(&mut d, "detector", det.as_str());
                    let index_file = outdir.join(format!("{case:03}_{det}_index.fits"));
                    set(&mut d, "index_file", index_file.as_path());

                    let ind_fname = config.output_path.join(format!(
                        "{case:03}_index_{det}_{:03}s.slurm",
                        baseline as i64
                    ));
                    let contents = render(&index_template, "index job", &d)?;
                    output.add_file(RenderedFile::new(&ind_fname, contents));
                    if !subjobs.contains(&ind_fname) {
                        subjobs.push(ind_fname);
                    }

                    let nodes = if cal_duration_min > cal_duration_base {
                        LONG_CAL_NODES
                    } else {
                        SHORT_CAL_NODES
                    };
                    set(&mut d, "nodes", nodes);
                    if long_precession {
                        set(&mut d, "cal_duration_min", cal_duration_int);
                    } else {
                        set(&mut d, "cal_duration_min", cal_duration_min);
                    }
                    set(&mut d, "cal_duration_min_int", cal_duration_int);
                    set(
                        &mut d,
                        "periods_per_cal_constant",
                        (cal_duration_min * 60.0 / baseline) as i64,
                    );
                    let gain_file = outdir.join(format!(
                        "{case:03}_gains_{det}_mask{:03}_{cal_duration_int:03}min.fits",
                        mask.percentage
                    ));
                    set(&mut d, "gain_file", gain_file.as_path());

                    let cal_fname = config.output_path.join(format!(
                        "{case:03}_calibrate_{det}_mask{:03}_{cal_duration_int:03}min.slurm",
                        mask.percentage
                    ));
                    let contents = render(&calibrate_template, "calibration job", &d)?;
                    output.add_file(RenderedFile::new(&cal_fname, contents));
                    subjobs.push(cal_fname);

                    gain2toast_input.push(gain_file.to_string_lossy().into_owned());
                    gain2toast_input.push(format!("fake_{det}"));
                }

                set(&mut d, "nodes", ESTIMATED_NODES);
                set(&mut d, "gain2toast_input", gain2toast_input.join(" "));
                let gain2toast_output = outdir.join(format!(
                    "{case:03}_gains_mask{:03}_{cal_duration_int:03}min.fits",
                    mask.percentage
                ));
                set(&mut d, "gain2toast_output", gain2toast_output.as_path());
                let outdir_cal = config
                    .calibrated_output_root
                    .join(format!("calibrated_{cal_duration_str}min"))
                    .join(format!("mask{:03}", mask.percentage))
                    .join(&basename);
                set(&mut d, "outdir_cal", outdir_cal.as_path());

                let calibrated_job = config.output_path.join(format!(
                    "{basename}_2_calibrated_mask{:03}_{cal_duration_str}min.slurm",
                    mask.percentage
                ));
                let contents = render(&templates.calibrated_job, "calibrated job", &d)?;
                output.add_file(RenderedFile::new(&calibrated_job, contents));
                subjobs.push(calibrated_job);
            }
        }

        let mut overall = render(&overall_template, "overall job", &d)?;
        for subjob in subjobs.iter() {
            let mut job_params = TemplateParams::new();
            set(
                &mut job_params,
                "job",
                absolute_from(working_dir, subjob).as_path(),
            );
            overall.push_str(&render(&subjob_template, "overall job", &job_params)?);
        }
        let overall_job = config
            .output_path
            .join(format!("{case:03}_overall_job.slurm"));
        output.add_file(RenderedFile::new(overall_job, overall));

        log::debug!("Case {basename} has {} sub-jobs", subjobs.len());
        output.case_names.push(basename);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_templates() -> ParTemplates {
        ParTemplates {
            uncalibrated_job: Template::new(
                "#SBATCH -N @{nodes}\n#SBATCH -t @{walltime}\nout=@{outdir} net=@{psd_NET}\n",
                AT_DELIMITER,
            ),
            calibrated_job: Template::new(
                "merge-gains @{gain2toast_input} @{gain2toast_output}\ncal=@{outdir_cal}\n",
                AT_DELIMITER,
            ),
        }
    }

    fn test_config() -> ParConfig {
        ParConfig {
            masks: vec![String::new()],
            output_path: PathBuf::from("./slurm"),
            simulation_output_root: PathBuf::from("/scratch/out"),
            calibrated_output_root: PathBuf::from("/scratch/cal"),
            ..ParConfig::default()
        }
    }

    fn full_sky() -> Vec<MaskCoverage> {
        vec![MaskCoverage {
            file_name: String::new(),
            percentage: 100,
        }]
    }

    #[test]
    fn test_format_walltime() {
        assert_eq!(format_walltime(600), "0:10:00");
        assert_eq!(format_walltime(5 * 3600 + 61), "5:01:01");
    }

    #[test]
    fn test_baseline_length() {
        let white = NoiseParameters {
            white_noise: 1e-15,
            fknee_mhz: 0,
        };
        let pink = NoiseParameters {
            white_noise: 33.8e-6,
            fknee_mhz: 10,
        };
        assert_eq!(baseline_length_s(&white), 60.0);
        assert_eq!(baseline_length_s(&pink), 50.0);
    }

    #[test]
    fn test_case_enumeration() {
        let output = generate_par_files(
            &test_config(),
            &test_templates(),
            &full_sky(),
            Path::new("/work"),
        )
        .unwrap();

        assert_eq!(
            output.case_names,
            vec!["000_spin69deg_wn0.0_fk000", "001_spin69deg_wn33.8_fk010"]
        );
        assert_eq!(output.cases.len(), 2);
        assert_eq!(
            output.cases[&1]["baseline_length_s"],
            TemplateValue::Float(50.0)
        );

        // Per case: uncalibrated, 2 index (one per detector), 2 durations x 2 detectors
        // calibrate, 2 calibrated, 1 overall
        assert_eq!(output.files.len(), 2 * (1 + 2 + 4 + 2 + 1));

        let names: Vec<String> = output.files.iter().map(|f| f.file_name()).collect();
        assert!(names.contains(&String::from("000_index_0A_060s.slurm")));
        assert!(names.contains(&String::from("001_index_0B_050s.slurm")));
        assert!(names.contains(&String::from("001_calibrate_0A_mask100_2400min.slurm")));
        assert!(names.contains(&String::from(
            "001_spin69deg_wn33.8_fk010_2_calibrated_mask100_600min.slurm"
        )));
    }

    #[test]
    fn test_rendered_contents() {
        let output = generate_par_files(
            &test_config(),
            &test_templates(),
            &full_sky(),
            Path::new("/work"),
        )
        .unwrap();
        let find = |name: &str| {
            output
                .files
                .iter()
                .find(|f| f.file_name() == name)
                .unwrap()
                .contents
                .clone()
        };

        let job1 = find("001_spin69deg_wn33.8_fk010_1_uncalibrated.slurm");
        assert_eq!(
            job1,
            "#SBATCH -N 40\n#SBATCH -t 0:10:00\nout=/scratch/out/001_spin69deg_wn33.8_fk010 net=3.38e-05\n"
        );

        let job2 = find("000_spin69deg_wn0.0_fk000_2_calibrated_mask100_2400min.slurm");
        assert_eq!(
            job2,
            "merge-gains /scratch/out/000_spin69deg_wn0.0_fk000/000_gains_0A_mask100_2400min.fits fake_0A \
             /scratch/out/000_spin69deg_wn0.0_fk000/000_gains_0B_mask100_2400min.fits fake_0B \
             /scratch/out/000_spin69deg_wn0.0_fk000/000_gains_mask100_2400min.fits\n\
             cal=/scratch/cal/calibrated_2400min/mask100/000_spin69deg_wn0.0_fk000\n"
        );

        let calibrate = find("000_calibrate_0B_mask100_2400min.slurm");
        assert!(calibrate.contains("#SBATCH -N 13\n"));
        assert!(calibrate.contains("periods_per_cal_constant = 2400\n"));
        let calibrate = find("000_calibrate_0B_mask100_600min.slurm");
        assert!(calibrate.contains("#SBATCH -N 50\n"));
        assert!(calibrate.contains("fsky=1.00\""));
    }

    #[test]
    fn test_overall_job_lists_subjobs() {
        let output = generate_par_files(
            &test_config(),
            &test_templates(),
            &full_sky(),
            Path::new("/work"),
        )
        .unwrap();
        let overall = output
            .files
            .iter()
            .find(|f| f.file_name() == "000_overall_job.slurm")
            .unwrap();

        assert!(overall.contents.starts_with("#!/bin/sh\n#SBATCH -q regular\n"));
        let runs: Vec<&str> = overall
            .contents
            .lines()
            .filter(|l| l.starts_with("/bin/bash"))
            .collect();
        assert_eq!(runs.len(), 1 + 2 + 4 + 2);
        assert_eq!(
            runs[0],
            "/bin/bash \"/work/slurm/000_spin69deg_wn0.0_fk000_1_uncalibrated.slurm\""
        );
        assert_eq!(runs[1], "/bin/bash \"/work/slurm/000_index_0A_060s.slurm\"");
    }

    #[test]
    fn test_cases_json() {
        let output = generate_par_files(
            &test_config(),
            &test_templates(),
            &full_sky(),
            Path::new("/work"),
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output.cases_json().unwrap()).unwrap();
        assert_eq!(json["0"]["fknee_mHz"], 0);
        assert_eq!(json["1"]["walltime"], "0:10:00");
        assert!(json["1"].get("galactic_mask").is_none());
    }

    #[test]
    fn test_empty_parameter_sets() {
        let config = ParConfig {
            detectors: vec![],
            ..test_config()
        };
        assert!(matches!(
            generate_par_files(&config, &test_templates(), &full_sky(), Path::new("/")),
            Err(GeneratorError::EmptyParameterSet("detectors"))
        ));
    }
}
