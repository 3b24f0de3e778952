use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::df_utils::{
    count_true, drop_columns, f64_values, filter_rows, has_column, quantile_linear,
    set_f64_column,
};
use crate::error::{MungeError, Result};
use crate::types::{DropCounters, DropReason, FieldName};

/// Default minimum N is this quantile of N divided by [`N_MIN_DIVISOR`].
pub const N_MIN_QUANTILE: f64 = 0.9;
pub const N_MIN_DIVISOR: f64 = 1.5;

#[derive(Debug, Clone, Default)]
pub struct SampleSizeSettings {
    pub n: Option<f64>,
    pub n_cas: Option<f64>,
    pub n_con: Option<f64>,
    pub n_min: Option<f64>,
    /// Keep every SNP regardless of N.
    pub no_filter_n: bool,
    pub nstudy_min: Option<f64>,
}

/// Derive the final per-SNP N and drop SNPs with low N. Runs on the whole
/// de-duplicated table because the default thresholds are global.
pub fn process_n(
    mut df: DataFrame,
    settings: &SampleSizeSettings,
    drops: &mut DropCounters,
) -> Result<DataFrame> {
    let n_col = FieldName::N.as_str();
    let cas_col = FieldName::NCas.as_str();
    let con_col = FieldName::NCon.as_str();

    if has_column(&df, cas_col) && has_column(&df, con_col) {
        let n = case_control_n(&df)?;
        set_f64_column(&mut df, n_col, n)?;
        drop_columns(&mut df, &[cas_col.to_string(), con_col.to_string()])?;
    }

    let nstudy_col = FieldName::NStudy.as_str();
    if has_column(&df, n_col) {
        if settings.no_filter_n {
            info!("Skipping the minimum N filter.");
        } else {
            df = filter_low_n(df, settings.n_min, drops)?;
        }
    } else if has_column(&df, nstudy_col) {
        let nstudy = f64_values(&df, nstudy_col)?;
        let nstudy_min = settings.nstudy_min.unwrap_or_else(|| {
            nstudy
                .iter()
                .flatten()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max)
        });
        let keep: Vec<bool> = nstudy
            .iter()
            .map(|v| v.is_some_and(|v| v >= nstudy_min))
            .collect();
        df = drop_below(df, &keep, drops)?;
        drop_columns(&mut df, &[nstudy_col.to_string()])?;
        info!(
            "Removed {} SNPs with NSTUDY < {nstudy_min} ({} SNPs remain).",
            keep.len() - count_true(&keep),
            df.height()
        );
    }

    if !has_column(&df, n_col) {
        let fixed = if let Some(n) = settings.n {
            info!("Using N = {n}");
            n
        } else if let (Some(cas), Some(con)) = (settings.n_cas, settings.n_con) {
            info!("Using N_cas = {cas}; N_con = {con}");
            cas + con
        } else {
            return Err(MungeError::UnresolvedSampleSize);
        };
        let height = df.height();
        set_f64_column(&mut df, n_col, vec![Some(fixed); height])?;
    }

    Ok(df)
}

/// `N = N_CAS + N_CON`, rescaled by each SNP's case proportion relative to the
/// mean proportion among the SNPs with the largest N.
pub fn case_control_n(df: &DataFrame) -> Result<Vec<Option<f64>>> {
    let cas = f64_values(df, FieldName::NCas.as_str())?;
    let con = f64_values(df, FieldName::NCon.as_str())?;
    let totals: Vec<Option<(f64, f64)>> = cas
        .iter()
        .zip(&con)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some((a + b, a / (a + b))),
            _ => None,
        })
        .collect();

    let max_n = totals
        .iter()
        .flatten()
        .map(|(n, _)| *n)
        .filter(|n| !n.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    // incremental mean stays exact when every anchor proportion is identical
    let mut anchor = 0.0;
    let mut count = 0usize;
    for (n, prop) in totals.iter().flatten() {
        if *n == max_n {
            count += 1;
            anchor += (prop - anchor) / count as f64;
        }
    }

    if count == 0 || !anchor.is_finite() || anchor <= 0.0 {
        warn!("Could not compute the case proportion at maximum N; using N_CAS + N_CON unscaled.");
        return Ok(totals.iter().map(|t| t.map(|(n, _)| n)).collect());
    }
    Ok(totals
        .iter()
        .map(|t| t.map(|(n, prop)| n * (prop / anchor)))
        .collect())
}

fn filter_low_n(
    df: DataFrame,
    n_min: Option<f64>,
    drops: &mut DropCounters,
) -> Result<DataFrame> {
    let n = f64_values(&df, FieldName::N.as_str())?;
    let n_min = match n_min {
        Some(v) => v,
        None => {
            let present: Vec<f64> = n.iter().flatten().copied().collect();
            quantile_linear(&present, N_MIN_QUANTILE).unwrap_or(0.0) / N_MIN_DIVISOR
        }
    };
    let keep: Vec<bool> = n.iter().map(|v| v.is_some_and(|v| v >= n_min)).collect();
    let df = drop_below(df, &keep, drops)?;
    info!(
        "Removed {} SNPs with N < {n_min} ({} SNPs remain).",
        keep.len() - count_true(&keep),
        df.height()
    );
    Ok(df)
}

fn drop_below(df: DataFrame, keep: &[bool], drops: &mut DropCounters) -> Result<DataFrame> {
    let removed = keep.len() - count_true(keep);
    drops.add(DropReason::LowN, removed);
    if removed == 0 {
        return Ok(df);
    }
    filter_rows(&df, keep)
}
