use polars::prelude::*;

use crate::error::{MungeError, Result};
use crate::types::FieldName;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let ca = df.column(name)?.as_materialized_series().f64()?;
    Ok(ca.into_iter().collect())
}

pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let ca = df.column(name)?.as_materialized_series().str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

pub fn set_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_str_column(df: &mut DataFrame, name: &str, values: Vec<Option<String>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn drop_columns(df: &mut DataFrame, names: &[String]) -> Result<()> {
    for name in names {
        if has_column(df, name) {
            df.drop_in_place(name)?;
        }
    }
    Ok(())
}

pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask: BooleanChunked = keep.iter().copied().collect();
    Ok(df.filter(&mask)?)
}

pub fn count_true(mask: &[bool]) -> usize {
    mask.iter().filter(|k| **k).count()
}

/// INFO columns are named `INFO`, `INFO_2`, `INFO_3`, ... when several were mapped.
pub fn info_column_name(position: usize) -> String {
    if position == 0 {
        FieldName::Info.as_str().to_string()
    } else {
        format!("{}_{}", FieldName::Info.as_str(), position + 1)
    }
}

pub fn info_column_names(df: &DataFrame) -> Vec<String> {
    (0..)
        .map(info_column_name)
        .take_while(|name| has_column(df, name))
        .collect()
}

pub fn uppercase_alleles(df: &mut DataFrame) -> Result<()> {
    for col in [FieldName::A1.as_str(), FieldName::A2.as_str()] {
        if !has_column(df, col) {
            continue;
        }
        let upper = str_values(df, col)?
            .into_iter()
            .map(|v| v.map(|s| s.to_ascii_uppercase()))
            .collect();
        set_str_column(df, col, upper)?;
    }
    Ok(())
}

/// Quantile with linear interpolation between order statistics, ignoring NaN.
pub fn quantile_linear(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Rebuild `series` so that output row `i` holds input row `rows[i]`, or null.
pub fn gather_optional(series: &Series, rows: &[Option<usize>]) -> Result<Series> {
    let name = series.name().clone();
    match series.dtype() {
        DataType::Float64 => {
            let values: Vec<Option<f64>> = series.f64()?.into_iter().collect();
            let out: Vec<Option<f64>> = rows
                .iter()
                .map(|r| r.and_then(|i| values.get(i).copied().flatten()))
                .collect();
            Ok(Series::new(name, out))
        }
        DataType::String => {
            let values: Vec<Option<&str>> = series.str()?.into_iter().collect();
            let out: Vec<Option<String>> = rows
                .iter()
                .map(|r| {
                    r.and_then(|i| values.get(i).copied().flatten())
                        .map(str::to_string)
                })
                .collect();
            Ok(Series::new(name, out))
        }
        other => Err(MungeError::Parse(format!(
            "unsupported column type {other} in column {name}"
        ))),
    }
}
