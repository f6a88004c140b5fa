//! # toast_gains
//!
//! toast_gains is a small set of offline tools used around a CMB simulation pipeline,
//! written in Rust. Its main job is to take the per-detector gain files produced by the
//! calibration code and combine them into the single multi-extension FITS file that
//! TOAST reads back when applying calibration. It also ships two generators that produce
//! the SLURM batch scripts and INI parameter files of a simulation campaign.
//!
//! ## Building & Install
//!
//! FITS support comes from [fitsio](https://github.com/simonrw/rust-fitsio). The
//! `fitsio-src` feature is enabled, so cfitsio is compiled from source and no system
//! installation is needed.
//!
//! To build and install the tools use `cargo install --path ./toast_gains_cli` from the
//! top level repository. This installs `merge-gains`, `generate-par` and `generate-ini`.
//!
//! ## Merging gains
//!
//! ```bash
//! merge-gains GAIN_FILE1 DETNAME1 [GAIN_FILE2 DETNAME2 ...] OUTPUT_FILE
//! ```
//!
//! Each input gain file has the following layout:
//!
//! ```text
//! gains_0A.fits
//! GAINS   - GAIN, NSAMPLES (one row per calibration interval)
//! OFFSETS - NSAMPLES (one row per offset period)
//! PERIODS - LENGTH (header keyword, seconds)
//! ```
//!
//! Every gain is the average of a whole number of offset periods. The start time of a
//! gain is the start time of its first offset period, and offset periods are evenly
//! spaced by `LENGTH` seconds (30 s if `LENGTH` is 0). If the offset sample counts do not
//! add up exactly to the gain sample counts, the file is rejected.
//!
//! Gains are shifted so that their mean is 1.0. The output file contains an empty primary
//! HDU followed by one binary table per detector, named after the detector label:
//!
//! ```text
//! merged.fits
//! PRIMARY (empty)
//! 0A - TIME [s], GAIN
//! 0B - TIME [s], GAIN
//! ```
//!
//! Nothing is written unless every input was merged successfully.
//!
//! ## Configuration
//!
//! The generators are configured through YAML files. A template configuration with the
//! default PICO setup is written by `generate-par new -c par.yml` (or
//! `generate-ini new -c ini.yml`). The merger accepts an optional YAML configuration
//! through `--config`:
//!
//! ```yml
//! alignment:
//!   fallback_period_length_s: 30.0
//! ```
pub mod alignment;
pub mod config;
pub mod error;
pub mod fits_writer;
pub mod gain_record;
pub mod gain_series;
pub mod ini_generator;
pub mod merge_status;
pub mod merger;
pub mod output;
pub mod par_generator;
pub mod sky_mask;
pub mod template;
