use polars::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::info;

use crate::df_utils::{drop_columns, f64_values, has_column, set_f64_column};
use crate::error::{MungeError, Result};
use crate::schema::SignedStat;
use crate::types::FieldName;

/// Largest accepted distance between the median signed statistic and its null value.
pub const MEDIAN_TOLERANCE: f64 = 0.1;

/// `sqrt(chi2.isf(p, df = 1))`, computed as the upper normal quantile of `p / 2`
/// so that very small p-values keep their precision.
pub fn p_to_z(p: f64) -> f64 {
    (-Normal::standard().inverse_cdf(p / 2.0)).abs()
}

/// Fails when the median of `series` is further than `tolerance` from `expected`.
pub fn check_median(series: &Series, expected: f64, tolerance: f64, name: &str) -> Result<String> {
    let median = series.f64()?.median().unwrap_or(f64::NAN);
    let distance = (median - expected).abs();
    if distance.is_nan() || distance > tolerance {
        return Err(MungeError::MedianSanity {
            column: name.to_string(),
            observed: median,
            expected,
        });
    }
    Ok(format!(
        "Median value of {name} was {median}, which seems sensible."
    ))
}

/// Replace P by a signed Z column and drop the consumed SIGNED_SUMSTAT.
///
/// With `a1_inc` the A1 allele is taken to be the increasing allele and the Z
/// magnitude is used unsigned.
pub fn apply_signed_z(
    mut df: DataFrame,
    signed: Option<&SignedStat>,
    a1_inc: bool,
) -> Result<DataFrame> {
    let p_col = FieldName::P.as_str();
    let signed_col = FieldName::SignedSumstat.as_str();
    let mut z: Vec<Option<f64>> = f64_values(&df, p_col)?
        .into_iter()
        .map(|p| p.map(p_to_z))
        .collect();

    if !a1_inc {
        let signed = signed.ok_or(MungeError::MissingColumn(FieldName::SignedSumstat))?;
        if !has_column(&df, signed_col) {
            return Err(MungeError::MissingColumn(FieldName::SignedSumstat));
        }
        let series = df.column(signed_col)?.as_materialized_series();
        let msg = check_median(series, signed.null_value, MEDIAN_TOLERANCE, &signed.label)?;
        info!("{msg}");

        let values = f64_values(&df, signed_col)?;
        for (zv, s) in z.iter_mut().zip(values) {
            if let (Some(zv), Some(s)) = (zv.as_mut(), s)
                && s < signed.null_value
            {
                *zv = -*zv;
            }
        }
    }

    set_f64_column(&mut df, FieldName::Z.as_str(), z)?;
    drop_columns(&mut df, &[p_col.to_string(), signed_col.to_string()])?;
    Ok(df)
}
