use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::alignment::AlignmentConfig;
use super::error::ConfigError;

/// Read any of the configurations from a YAML file
fn read_yaml<T: DeserializeOwned>(config_path: &Path) -> Result<T, ConfigError> {
    if !config_path.exists() {
        return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
    }

    let yaml_str = std::fs::read_to_string(config_path)?;

    Ok(serde_yaml::from_str::<T>(&yaml_str)?)
}

/// Write a configuration as YAML, used to produce template config files
fn write_yaml<T: Serialize>(config: &T, config_path: &Path) -> Result<(), ConfigError> {
    let yaml_str = serde_yaml::to_string(config)?;
    std::fs::write(config_path, yaml_str)?;
    Ok(())
}

/// Configuration of the gain merger. Only the alignment can currently be tuned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub alignment: AlignmentConfig,
}

impl MergeConfig {
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        read_yaml(config_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseParameters {
    pub white_noise: f64,
    pub fknee_mhz: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanningParameters {
    pub spin_angle_deg: i64,
    pub prec_angle_deg: i64,
    pub spin_rate_rpm: f64,
    pub prec_rate_rpm: f64,
}

/// Configuration of the SLURM parameter generator.
///
/// Every combination of `noise` and `scanning` becomes one simulation case. Within a
/// case, every mask, calibration duration and detector gets its own jobs. An empty
/// string in `masks` means "no mask" (full sky).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParConfig {
    pub noise: Vec<NoiseParameters>,
    pub scanning: Vec<ScanningParameters>,
    pub masks: Vec<String>,
    pub detectors: Vec<String>,
    pub sample_rate_hz: f64,
    pub slurm_account: String,
    pub output_path: PathBuf,
    pub simulation_output_root: PathBuf,
    pub calibrated_output_root: PathBuf,
    pub code_path: PathBuf,
    pub uncalibrated_job_template: PathBuf,
    pub calibrated_job_template: PathBuf,
    pub cases_file: PathBuf,
}

const WHITE_NOISE: f64 = 33.8e-6;

impl Default for ParConfig {
    /// The PICO two-detector setup with and without 1/f noise
    fn default() -> Self {
        Self {
            noise: vec![
                NoiseParameters {
                    white_noise: 1e-15,
                    fknee_mhz: 0,
                },
                NoiseParameters {
                    white_noise: WHITE_NOISE,
                    fknee_mhz: 10,
                },
            ],
            scanning: vec![ScanningParameters {
                spin_angle_deg: 69,
                prec_angle_deg: 26,
                spin_rate_rpm: 1.0,
                prec_rate_rpm: 1.0 / (10.0 * 60.0),
            }],
            masks: vec![
                String::new(),
                String::from("masks/dust_mask_090_ecliptic.fits.gz"),
                String::from("masks/dust_mask_095_ecliptic.fits.gz"),
            ],
            detectors: vec![String::from("0A"), String::from("0B")],
            sample_rate_hz: 100.0,
            slurm_account: String::from("mp107"),
            output_path: PathBuf::from("./slurm"),
            simulation_output_root: PathBuf::from("./out"),
            calibrated_output_root: PathBuf::from("./out"),
            code_path: PathBuf::from("."),
            uncalibrated_job_template: PathBuf::from("job1_uncalibrated.template"),
            calibrated_job_template: PathBuf::from("job2_calibrated.template"),
            cases_file: PathBuf::from("cases.json"),
        }
    }
}

impl ParConfig {
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        read_yaml(config_path)
    }

    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        write_yaml(self, config_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyCoverage {
    pub fsky: f64,
    pub tag: String,
}

/// Configuration of the INI generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IniConfig {
    pub input_dir: String,
    pub baseline_length_s: f64,
    pub detectors: Vec<String>,
    pub coverages: Vec<SkyCoverage>,
    pub cal_durations_h: Vec<i64>,
    pub mask_dir: String,
    pub output_path: PathBuf,
    pub index_template: PathBuf,
    pub calibration_template: PathBuf,
}

impl Default for IniConfig {
    fn default() -> Self {
        Self {
            input_dir: String::from("201806_boresight_2pix_2years_nofg"),
            baseline_length_s: 10.0,
            detectors: ["0A", "0B", "0C", "0D"]
                .into_iter()
                .map(String::from)
                .collect(),
            coverages: vec![
                SkyCoverage {
                    fsky: 1.00,
                    tag: String::from("m100"),
                },
                SkyCoverage {
                    fsky: 0.80,
                    tag: String::from("m080"),
                },
                SkyCoverage {
                    fsky: 0.90,
                    tag: String::from("m090"),
                },
            ],
            cal_durations_h: vec![1, 5, 10, 20],
            mask_dir: String::from("masks"),
            output_path: PathBuf::from("."),
            index_template: PathBuf::from("2years_ind_template.txt"),
            calibration_template: PathBuf::from("2years_cal_template.txt"),
        }
    }
}

impl IniConfig {
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        read_yaml(config_path)
    }

    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        write_yaml(self, config_path)
    }
}
