use std::path::Path;

use crate::error::{MungeError, Result};
use crate::munge::MungeConfig;

pub fn check_range_f64(value: f64, min: f64, max: f64, name: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(MungeError::InvalidArgument(format!(
            "Value of {name} should be finite"
        )));
    }
    if value < min {
        return Err(MungeError::InvalidArgument(format!(
            "Value of {name} should be above {min}"
        )));
    }
    if value > max {
        return Err(MungeError::InvalidArgument(format!(
            "Value of {name} should be below {max}"
        )));
    }
    Ok(())
}

pub fn check_positive(value: Option<f64>, name: &str) -> Result<()> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(MungeError::InvalidArgument(format!(
            "Value of {name} should be a positive number"
        ))),
        _ => Ok(()),
    }
}

pub fn check_file_exists(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        return Err(MungeError::InvalidArgument(format!(
            "File {path:?} passed to {name} does not exist"
        )));
    }
    Ok(())
}

/// Reject flag combinations that cannot be satisfied, before any file is read.
pub fn check_munge_config(config: &MungeConfig) -> Result<()> {
    check_file_exists(&config.sumstats, "--sumstats")?;
    if let Some(path) = &config.merge_alleles {
        check_file_exists(path, "--merge-alleles")?;
    }
    check_settings(config)
}

/// The part of [`check_munge_config`] that does not touch the filesystem.
pub fn check_settings(config: &MungeConfig) -> Result<()> {
    check_range_f64(config.info_min, 0.0, 2.0, "--info-min")?;
    check_range_f64(config.maf_min, 0.0, 0.5, "--maf-min")?;
    if config.chunksize == 0 {
        return Err(MungeError::InvalidArgument(
            "--chunksize should be a positive integer".to_string(),
        ));
    }
    check_positive(config.n, "--N")?;
    check_positive(config.n_cas, "--N-cas")?;
    check_positive(config.n_con, "--N-con")?;
    check_positive(config.n_min, "--n-min")?;
    check_positive(config.nstudy_min, "--nstudy-min")?;
    if config.n_cas.is_some() != config.n_con.is_some() {
        return Err(MungeError::InvalidArgument(
            "--N-cas and --N-con must be supplied together".to_string(),
        ));
    }
    if config.daner && config.daner_n {
        return Err(MungeError::InvalidArgument(
            "--daner and --daner-n are not compatible. Use --daner for sample size from FRQ_A/FRQ_U headers, use --daner-n for values from Nca/Nco columns".to_string(),
        ));
    }
    if config.no_filter_n && config.n_min.is_some() {
        return Err(MungeError::InvalidArgument(
            "--no-filter-n and --n-min are not compatible".to_string(),
        ));
    }
    if config.no_alleles && config.merge_alleles.is_some() {
        return Err(MungeError::InvalidArgument(
            "--no-alleles and --merge-alleles are not compatible".to_string(),
        ));
    }
    Ok(())
}
