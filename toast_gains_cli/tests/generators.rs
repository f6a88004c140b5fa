use assert_cmd::Command;
use libtoast_gains::config::{IniConfig, ParConfig, SkyCoverage};
use std::path::Path;
use tempfile::TempDir;

fn ini_config(dir: &Path) -> IniConfig {
    let index_template = dir.join("index.txt");
    let calibration_template = dir.join("calibration.txt");
    std::fs::write(&index_template, "inputdir = $inputdir\ndetector = $detector\n").unwrap();
    std::fs::write(
        &calibration_template,
        "fsky = $fsky\n$mask_line\ngains = ${cal_duration_str}h_$mask_tag\nperiods = $periods_per_cal_constant\n",
    )
    .unwrap();

    IniConfig {
        detectors: vec![String::from("0A")],
        coverages: vec![
            SkyCoverage {
                fsky: 1.0,
                tag: String::from("m100"),
            },
            SkyCoverage {
                fsky: 0.5,
                tag: String::from("m050"),
            },
        ],
        cal_durations_h: vec![1],
        output_path: dir.join("ini"),
        index_template,
        calibration_template,
        ..IniConfig::default()
    }
}

fn par_config(dir: &Path) -> ParConfig {
    let uncalibrated_job_template = dir.join("job1.template");
    let calibrated_job_template = dir.join("job2.template");
    std::fs::write(&uncalibrated_job_template, "out=@{outdir}\n").unwrap();
    std::fs::write(
        &calibrated_job_template,
        "merge-gains @{gain2toast_input} @{gain2toast_output}\n",
    )
    .unwrap();

    ParConfig {
        masks: vec![String::new()],
        detectors: vec![String::from("0A")],
        output_path: dir.join("slurm"),
        simulation_output_root: dir.join("out"),
        calibrated_output_root: dir.join("cal"),
        uncalibrated_job_template,
        calibrated_job_template,
        cases_file: dir.join("cases.json"),
        ..ParConfig::default()
    }
}

#[test]
fn generate_ini_help_smoke() {
    let mut cmd = Command::cargo_bin("generate-ini").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn generate_ini_writes_index_and_calibration_files() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("ini.yml");
    ini_config(dir.path())
        .write_config_file(&config_path)
        .unwrap();

    let mut cmd = Command::cargo_bin("generate-ini").unwrap();
    cmd.arg("-c").arg(&config_path);
    cmd.assert().success();

    let out = dir.path().join("ini");
    let index = std::fs::read_to_string(out.join("index_0A.ini")).unwrap();
    assert!(index.contains("detector = 0A"));

    let full_sky = std::fs::read_to_string(out.join("pico_2years_01h_m100_0A.ini")).unwrap();
    assert!(full_sky.contains("fsky = 1.0\n"));
    assert!(full_sky.contains("gains = 01h_m100"));
    assert!(full_sky.contains("periods = 360"));
    assert!(!full_sky.contains("mask ="));

    let half_sky = std::fs::read_to_string(out.join("pico_2years_01h_m050_0A.ini")).unwrap();
    assert!(half_sky.contains("fsky = 0.5\n"));
    assert!(half_sky.contains("mask = masks/dust_mask_050_ecliptic.fits.gz"));
}

#[test]
fn generate_ini_fails_without_templates() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("ini.yml");
    let mut config = ini_config(dir.path());
    config.index_template = dir.path().join("missing.txt");
    config.write_config_file(&config_path).unwrap();

    let mut cmd = Command::cargo_bin("generate-ini").unwrap();
    cmd.arg("-c").arg(&config_path);
    cmd.assert().failure();

    assert!(!dir.path().join("ini").exists());
}

#[test]
fn generate_ini_new_writes_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("ini.yml");

    let mut cmd = Command::cargo_bin("generate-ini").unwrap();
    cmd.arg("-c").arg(&config_path).arg("new");
    cmd.assert().success();

    let config = IniConfig::read_config_file(&config_path).unwrap();
    assert_eq!(config.detectors, IniConfig::default().detectors);
}

#[test]
fn generate_par_writes_jobs_and_cases() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("par.yml");
    par_config(dir.path())
        .write_config_file(&config_path)
        .unwrap();

    let mut cmd = Command::cargo_bin("generate-par").unwrap();
    cmd.current_dir(dir.path()).arg("-c").arg(&config_path);
    cmd.assert().success();

    let slurm = dir.path().join("slurm");
    let job = std::fs::read_to_string(slurm.join("000_spin69deg_wn0.0_fk000_1_uncalibrated.slurm"))
        .unwrap();
    assert!(job.contains("000_spin69deg_wn0.0_fk000"));
    assert!(slurm
        .join("001_spin69deg_wn33.8_fk010_1_uncalibrated.slurm")
        .exists());
    assert!(slurm.join("000_overall_job.slurm").exists());
    assert!(slurm.join("001_overall_job.slurm").exists());
    assert!(slurm
        .join("000_spin69deg_wn0.0_fk000_2_calibrated_mask100_600min.slurm")
        .exists());

    let cases = std::fs::read_to_string(dir.path().join("cases.json")).unwrap();
    assert!(cases.contains("\"0\""));
    assert!(cases.contains("\"1\""));
}

#[test]
fn generate_par_new_writes_default_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("par.yml");

    let mut cmd = Command::cargo_bin("generate-par").unwrap();
    cmd.arg("-c").arg(&config_path).arg("new");
    cmd.assert().success();

    let config = ParConfig::read_config_file(&config_path).unwrap();
    assert_eq!(config.masks, ParConfig::default().masks);
}
