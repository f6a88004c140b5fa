use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;
use std::path::{Path, PathBuf};

use super::error::GainFileError;

pub const GAINS_SECTION: &str = "GAINS";
pub const OFFSETS_SECTION: &str = "OFFSETS";
pub const PERIODS_SECTION: &str = "PERIODS";
const GAIN_COLUMN: &str = "GAIN";
const NSAMPLES_COLUMN: &str = "NSAMPLES";
const PERIOD_NUMBER_COLUMN: &str = "NUMBER";
const LENGTH_KEY: &str = "LENGTH";

/// The contents of a single detector gain file, as produced by the calibration code.
///
/// The file has three binary table extensions:
///
/// ```text
/// GAINS   - GAIN (float), NSAMPLES (integer), one row per calibration interval
/// OFFSETS - NSAMPLES (integer), one row per offset period
/// PERIODS - header keyword LENGTH (float seconds)
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GainRecordSet {
    pub gains: Vec<f64>,
    pub gain_sample_counts: Vec<i64>,
    pub offset_sample_counts: Vec<i64>,
    pub offset_period_length_s: f64,
}

/// Handle on an open gain file, used to tag errors with the path and section
struct GainFile {
    path: PathBuf,
    fptr: FitsFile,
}

impl GainFile {
    fn open(path: &Path) -> Result<Self, GainFileError> {
        if !path.exists() {
            return Err(GainFileError::InputAccess(path.to_path_buf()));
        }
        let fptr = FitsFile::open(path).map_err(|source| GainFileError::Fits {
            path: path.to_path_buf(),
            section: "primary HDU",
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            fptr,
        })
    }

    fn section(&mut self, section: &'static str) -> Result<fitsio::hdu::FitsHdu, GainFileError> {
        self.fptr
            .hdu(section)
            .map_err(|_| GainFileError::MissingSection {
                path: self.path.clone(),
                section,
            })
    }

    fn read_f64_col(
        &mut self,
        section: &'static str,
        column: &str,
    ) -> Result<Vec<f64>, GainFileError> {
        let hdu = self.section(section)?;
        hdu.read_col::<f64>(&mut self.fptr, column)
            .map_err(|source| self.fits_error(section, source))
    }

    fn read_i64_col(
        &mut self,
        section: &'static str,
        column: &str,
    ) -> Result<Vec<i64>, GainFileError> {
        let hdu = self.section(section)?;
        hdu.read_col::<i64>(&mut self.fptr, column)
            .map_err(|source| self.fits_error(section, source))
    }

    fn read_f64_key(&mut self, section: &'static str, key: &str) -> Result<f64, GainFileError> {
        let hdu = self.section(section)?;
        hdu.read_key::<f64>(&mut self.fptr, key)
            .map_err(|source| self.fits_error(section, source))
    }

    fn fits_error(&self, section: &'static str, source: fitsio::errors::Error) -> GainFileError {
        GainFileError::Fits {
            path: self.path.clone(),
            section,
            source,
        }
    }
}

impl GainRecordSet {
    /// Read a gain file from disk.
    ///
    /// Returns an error if the file does not exist or if any of the GAINS, OFFSETS,
    /// PERIODS sections (or their fields) is absent.
    pub fn read_fits(path: &Path) -> Result<Self, GainFileError> {
        let mut file = GainFile::open(path)?;

        let gains = file.read_f64_col(GAINS_SECTION, GAIN_COLUMN)?;
        // Both columns span every row of GAINS, so they always have the same length
        let gain_sample_counts = file.read_i64_col(GAINS_SECTION, NSAMPLES_COLUMN)?;
        let offset_sample_counts = file.read_i64_col(OFFSETS_SECTION, NSAMPLES_COLUMN)?;
        let offset_period_length_s = file.read_f64_key(PERIODS_SECTION, LENGTH_KEY)?;

        log::debug!(
            "Read {} gains and {} offset periods from {}",
            gains.len(),
            offset_sample_counts.len(),
            path.to_string_lossy()
        );

        Ok(Self {
            gains,
            gain_sample_counts,
            offset_sample_counts,
            offset_period_length_s,
        })
    }

    /// Write the record set in the same layout read by [`GainRecordSet::read_fits`].
    ///
    /// Any existing file at `path` is overwritten.
    pub fn write_fits(&self, path: &Path) -> Result<(), fitsio::errors::Error> {
        let mut fptr = FitsFile::create(path).overwrite().open()?;

        let gains_description = [
            ColumnDescription::new(GAIN_COLUMN)
                .with_type(ColumnDataType::Double)
                .create()?,
            ColumnDescription::new(NSAMPLES_COLUMN)
                .with_type(ColumnDataType::Long)
                .create()?,
        ];
        let gains_hdu = fptr.create_table(GAINS_SECTION, &gains_description)?;
        gains_hdu.write_col(&mut fptr, GAIN_COLUMN, &self.gains)?;
        gains_hdu.write_col(&mut fptr, NSAMPLES_COLUMN, &self.gain_sample_counts)?;

        let offsets_description = [ColumnDescription::new(NSAMPLES_COLUMN)
            .with_type(ColumnDataType::Long)
            .create()?];
        let offsets_hdu = fptr.create_table(OFFSETS_SECTION, &offsets_description)?;
        offsets_hdu.write_col(&mut fptr, NSAMPLES_COLUMN, &self.offset_sample_counts)?;

        let periods_description = [ColumnDescription::new(PERIOD_NUMBER_COLUMN)
            .with_type(ColumnDataType::Long)
            .create()?];
        let periods_hdu = fptr.create_table(PERIODS_SECTION, &periods_description)?;
        let period_numbers: Vec<i64> = (0..self.offset_sample_counts.len() as i64).collect();
        periods_hdu.write_col(&mut fptr, PERIOD_NUMBER_COLUMN, &period_numbers)?;
        periods_hdu.write_key(&mut fptr, LENGTH_KEY, self.offset_period_length_s)?;

        Ok(())
    }
}
