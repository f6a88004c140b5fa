use fitsio::errors::check_status;
use fitsio::hdu::HduInfo;
use fitsio::FitsFile;
use std::path::{Path, PathBuf};

use super::error::MaskError;

/// Sky fraction reported when no mask is applied
pub const FULL_SKY_PERCENTAGE: i64 = 100;

/// Anything that can produce the pixel values of a sky mask
pub trait SkyMaskSource {
    fn read_pixels(&self) -> Result<Vec<f64>, MaskError>;
}

/// A HEALPix mask stored as a FITS binary table in the first column of HDU 1.
///
/// Both layouts are accepted: one pixel per row, or the healpy layout where every row
/// holds a vector of pixels (`TFORM = 1024E`).
#[derive(Debug, Clone)]
pub struct FitsSkyMask {
    path: PathBuf,
}

impl FitsSkyMask {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SkyMaskSource for FitsSkyMask {
    fn read_pixels(&self) -> Result<Vec<f64>, MaskError> {
        if !self.path.exists() {
            return Err(MaskError::BadFilePath(self.path.clone()));
        }
        let mut fptr = FitsFile::open(&self.path)?;
        let hdu = fptr.hdu(1)?;
        let (column, repeat, num_rows) = match &hdu.info {
            HduInfo::TableInfo {
                column_descriptions,
                num_rows,
            } => column_descriptions
                .first()
                .map(|col| (col.name.clone(), col.data_type.repeat, *num_rows)),
            _ => None,
        }
        .ok_or_else(|| MaskError::NoColumns(self.path.clone()))?;

        if repeat <= 1 {
            Ok(hdu.read_col::<f64>(&mut fptr, &column)?)
        } else {
            read_vector_column(&mut fptr, num_rows * repeat)
        }
    }
}

/// Read `n_values` doubles from the first column of the current HDU, running across rows.
/// `FitsHdu::read_col` stops after one element per row.
fn read_vector_column(fptr: &mut FitsFile, n_values: usize) -> Result<Vec<f64>, MaskError> {
    let mut values = vec![0.0_f64; n_values];
    let mut any_null = 0;
    let mut status = 0;
    unsafe {
        fitsio::sys::ffgcvd(
            fptr.as_raw(),
            1,
            1,
            1,
            n_values as _,
            0.0,
            values.as_mut_ptr(),
            &mut any_null,
            &mut status,
        );
    }
    check_status(status)?;
    Ok(values)
}

/// Percentage of unmasked pixels, rounded to a multiple of 5.
///
/// Halfway cases round to the even multiple, so 12.5% of the sky gives 10, not 15.
pub fn mask_percentage(pixels: &[f64]) -> Result<i64, MaskError> {
    if pixels.is_empty() {
        return Err(MaskError::Empty);
    }
    let unmasked = pixels.iter().filter(|&&p| p > 0.0).count();
    let twentieths = (unmasked * 20) as f64 / pixels.len() as f64;
    Ok(twentieths.round_ties_even() as i64 * 5)
}

/// A mask file together with the percentage of sky it leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskCoverage {
    pub file_name: String,
    pub percentage: i64,
}

/// Sky percentage for a mask file name; an empty name means the full sky
pub fn mask_percentage_for(mask_file_name: &str) -> Result<i64, MaskError> {
    if mask_file_name.is_empty() {
        return Ok(FULL_SKY_PERCENTAGE);
    }
    let pixels = FitsSkyMask::new(Path::new(mask_file_name)).read_pixels()?;
    let percentage = mask_percentage(&pixels)?;
    log::info!("Mask {mask_file_name} leaves {percentage}% of the sky");
    Ok(percentage)
}

/// Resolve the sky percentage of every mask, keeping their order
pub fn resolve_masks(mask_file_names: &[String]) -> Result<Vec<MaskCoverage>, MaskError> {
    mask_file_names
        .iter()
        .map(|name| {
            Ok(MaskCoverage {
                file_name: name.clone(),
                percentage: mask_percentage_for(name)?,
            })
        })
        .collect()
}
