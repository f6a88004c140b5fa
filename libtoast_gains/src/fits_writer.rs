use fitsio::errors::check_status;
use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;
use std::path::{Path, PathBuf};

use super::error::GainWriterError;
use super::gain_series::{DetectorGains, MergedGains};

const TIME_NAME: &str = "TIME";
const GAIN_NAME: &str = "GAIN";
const TIME_UNIT: &str = "s";
const GAIN_UNIT: &str = "";

/// Writes a MergedGains container in the layout TOAST expects.
///
/// ```text
/// merged_gains.fits
/// PRIMARY (empty)
/// <detector label> - TIME [s], GAIN []
/// <detector label> - TIME [s], GAIN []
/// ...
/// ```
///
/// The file is first written next to the destination and then renamed over it, so a
/// failed write never leaves a truncated file at `path`.
#[derive(Debug)]
pub struct GainWriter {
    path: PathBuf,
    temp_path: PathBuf,
}

impl GainWriter {
    pub fn new(path: &Path) -> Result<Self, GainWriterError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| GainWriterError::BadOutputPath(path.to_path_buf()))?;
        let temp_name = format!(
            ".{}.{}.tmp",
            file_name.to_string_lossy(),
            std::process::id()
        );
        Ok(Self {
            path: path.to_path_buf(),
            temp_path: path.with_file_name(temp_name),
        })
    }

    /// Write all detectors and move the file into place. Returns the size of the file in bytes
    pub fn write(&self, merged: &MergedGains) -> Result<u64, GainWriterError> {
        match self.write_temp(merged) {
            Ok(()) => {
                std::fs::rename(&self.temp_path, &self.path)?;
                Ok(self.path.metadata()?.len())
            }
            Err(e) => {
                if self.temp_path.exists() {
                    if let Err(rm) = std::fs::remove_file(&self.temp_path) {
                        log::warn!(
                            "Could not remove temporary file {}: {rm}",
                            self.temp_path.to_string_lossy()
                        );
                    }
                }
                Err(e)
            }
        }
    }

    fn write_temp(&self, merged: &MergedGains) -> Result<(), GainWriterError> {
        // fptr is closed on drop, before the rename
        let mut fptr = FitsFile::create(&self.temp_path).overwrite().open()?;
        for detector in merged.detectors() {
            Self::write_detector(&mut fptr, detector)?;
        }
        flush(&mut fptr)
    }

    fn write_detector(fptr: &mut FitsFile, detector: &DetectorGains) -> Result<(), GainWriterError> {
        let description = [
            ColumnDescription::new(TIME_NAME)
                .with_type(ColumnDataType::Double)
                .create()?,
            ColumnDescription::new(GAIN_NAME)
                .with_type(ColumnDataType::Double)
                .create()?,
        ];
        let hdu = fptr.create_table(detector.label.as_str(), &description)?;
        hdu.write_key(fptr, "TUNIT1", TIME_UNIT)?;
        hdu.write_key(fptr, "TUNIT2", GAIN_UNIT)?;
        hdu.write_col(fptr, TIME_NAME, &detector.times)?;
        hdu.write_col(fptr, GAIN_NAME, &detector.gains)?;
        log::debug!(
            "Wrote {} rows for detector {}",
            detector.len(),
            detector.label
        );
        Ok(())
    }
}

/// Push everything cfitsio still buffers to disk.
///
/// Closing on drop discards the status, so a failed flush (full disk) must be caught here.
fn flush(fptr: &mut FitsFile) -> Result<(), GainWriterError> {
    let mut status = 0;
    unsafe {
        fitsio::sys::ffflus(fptr.as_raw(), &mut status);
    }
    check_status(status)?;
    Ok(())
}

/// Write the merged container to `path`, replacing any file already there
pub fn write_merged_gains(merged: &MergedGains, path: &Path) -> Result<u64, GainWriterError> {
    GainWriter::new(path)?.write(merged)
}
