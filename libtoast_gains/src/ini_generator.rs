use super::config::{IniConfig, SkyCoverage};
use super::error::GeneratorError;
use super::output::RenderedFile;
use super::template::{Template, TemplateParams, TemplateValue, DOLLAR_DELIMITER};

/// The two INI templates: one for the index step, one for the calibration step
#[derive(Debug, Clone)]
pub struct IniTemplates {
    pub index: Template,
    pub calibration: Template,
}

impl IniTemplates {
    pub fn load(config: &IniConfig) -> Result<Self, GeneratorError> {
        Ok(Self {
            index: Template::from_file(&config.index_template, DOLLAR_DELIMITER)?,
            calibration: Template::from_file(&config.calibration_template, DOLLAR_DELIMITER)?,
        })
    }
}

/// The `mask = ...` line for a sky coverage; full-sky runs have no mask
fn mask_line(config: &IniConfig, coverage: &SkyCoverage) -> String {
    if coverage.fsky < 1.0 {
        format!(
            "mask = {}/dust_mask_{:03}_ecliptic.fits.gz",
            config.mask_dir,
            (coverage.fsky * 100.0) as i64
        )
    } else {
        String::new()
    }
}

fn render(
    template: &Template,
    name: &str,
    params: &TemplateParams,
) -> Result<String, GeneratorError> {
    template
        .substitute(params)
        .map_err(|source| GeneratorError::Template {
            name: name.to_string(),
            source,
        })
}

/// Produce the index and calibration INI files for every detector.
///
/// For each detector the index file comes first, followed by one calibration file per
/// sky coverage and calibration duration, in config order.
pub fn generate_ini_files(
    config: &IniConfig,
    templates: &IniTemplates,
) -> Result<Vec<RenderedFile>, GeneratorError> {
    if config.detectors.is_empty() {
        return Err(GeneratorError::EmptyParameterSet("detectors"));
    }

    let mut files = Vec::new();
    for det in config.detectors.iter() {
        let mut params = TemplateParams::new();
        params.insert("inputdir".into(), config.input_dir.as_str().into());
        params.insert("detector".into(), det.as_str().into());

        let fname = config.output_path.join(format!("index_{det}.ini"));
        files.push(RenderedFile::new(
            fname,
            render(&templates.index, "index template", &params)?,
        ));

        for coverage in config.coverages.iter() {
            for &cal_duration_h in config.cal_durations_h.iter() {
                let periods_per_cal_constant =
                    (cal_duration_h as f64 * 3600.0 / config.baseline_length_s) as i64;

                let mut cal_params = params.clone();
                cal_params.insert("fsky".into(), TemplateValue::Float(coverage.fsky));
                cal_params.insert("mask_tag".into(), coverage.tag.as_str().into());
                cal_params.insert("mask_line".into(), mask_line(config, coverage).into());
                cal_params.insert(
                    "cal_duration_str".into(),
                    format!("{cal_duration_h:02}").into(),
                );
                cal_params.insert(
                    "periods_per_cal_constant".into(),
                    periods_per_cal_constant.into(),
                );

                let fname = config.output_path.join(format!(
                    "pico_2years_{cal_duration_h:02}h_{}_{det}.ini",
                    coverage.tag
                ));
                files.push(RenderedFile::new(
                    fname,
                    render(&templates.calibration, "calibration template", &cal_params)?,
                ));
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use std::path::PathBuf;

    fn test_templates() -> IniTemplates {
        IniTemplates {
            index: Template::new("input = $inputdir/tod_$detector\n", DOLLAR_DELIMITER),
            calibration: Template::new(
                "[dacapo]\n${mask_line}\nperiods_per_cal_constant = $periods_per_cal_constant\n\
                 fsky = $fsky\noutput = ${inputdir}/gains_${cal_duration_str}h_${mask_tag}_$detector.fits\n",
                DOLLAR_DELIMITER,
            ),
        }
    }

    fn test_config() -> IniConfig {
        IniConfig {
            output_path: PathBuf::from("ini"),
            mask_dir: String::from("/data/masks"),
            ..IniConfig::default()
        }
    }

    #[test]
    fn test_file_names_and_order() {
        let files = generate_ini_files(&test_config(), &test_templates()).unwrap();
        // 4 detectors x (1 index + 3 coverages x 4 durations)
        assert_eq!(files.len(), 4 * (1 + 3 * 4));
        assert_eq!(files[0].path, PathBuf::from("ini/index_0A.ini"));
        assert_eq!(files[1].file_name(), "pico_2years_01h_m100_0A.ini");
        assert_eq!(files[4].file_name(), "pico_2years_20h_m100_0A.ini");
        assert_eq!(files[5].file_name(), "pico_2years_01h_m080_0A.ini");
        assert_eq!(files[13].file_name(), "index_0B.ini");
    }

    #[test]
    fn test_rendered_contents() {
        let files = generate_ini_files(&test_config(), &test_templates()).unwrap();
        assert_eq!(
            files[0].contents,
            "input = 201806_boresight_2pix_2years_nofg/tod_0A\n"
        );

        let full_sky = &files[2];
        assert_eq!(
            full_sky.contents,
            "[dacapo]\n\nperiods_per_cal_constant = 1800\nfsky = 1.0\n\
             output = 201806_boresight_2pix_2years_nofg/gains_05h_m100_0A.fits\n"
        );

        let masked = files
            .iter()
            .find(|f| f.file_name() == "pico_2years_10h_m090_0C.ini")
            .unwrap();
        assert!(masked
            .contents
            .starts_with("[dacapo]\nmask = /data/masks/dust_mask_090_ecliptic.fits.gz\n"));
        assert!(masked.contents.contains("periods_per_cal_constant = 3600\n"));
        assert!(masked.contents.contains("fsky = 0.9\n"));
    }

    #[test]
    fn test_missing_placeholder_is_reported() {
        let templates = IniTemplates {
            index: Template::new("$nside\n", DOLLAR_DELIMITER),
            ..test_templates()
        };
        match generate_ini_files(&test_config(), &templates) {
            Err(GeneratorError::Template { source, .. }) => {
                assert_eq!(source, TemplateError::MissingKey(String::from("nside")))
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
