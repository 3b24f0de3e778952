//! Chunk-wise parsing and row filtering of a summary statistics file.
//!
//! Each chunk goes through the same narrowing sequence: missing values,
//! numeric typing, reference-panel membership, INFO, FRQ, P and alleles. Only
//! the surviving rows of every chunk are kept in memory and concatenated at
//! the end.

use std::collections::HashSet;

use polars::prelude::*;
use tracing::{info, warn};

use crate::df_utils::{
    count_true, drop_columns, f64_values, filter_rows, has_column, info_column_name,
    info_column_names, set_f64_column, str_values, uppercase_alleles,
};
use crate::error::{MungeError, Result};
use crate::io::RawChunk;
use crate::merge::ReferencePanel;
use crate::types::{DropCounters, DropReason, FieldName};
use crate::utils::is_valid_snp;

/// INFO scores outside this range are reported as implausible.
pub const INFO_PLAUSIBLE_MAX: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub info_min: f64,
    pub maf_min: f64,
    pub no_alleles: bool,
    pub keep_maf: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            info_min: 0.9,
            maf_min: 0.01,
            no_alleles: false,
            keep_maf: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedSumstats {
    pub df: DataFrame,
    pub total_rows: usize,
}

pub fn parse_chunks<I>(
    chunks: I,
    settings: &FilterSettings,
    panel: Option<&ReferencePanel>,
    drops: &mut DropCounters,
) -> Result<ParsedSumstats>
where
    I: IntoIterator<Item = Result<RawChunk>>,
{
    let mut total_rows = 0usize;
    let mut merged: Option<DataFrame> = None;

    for (chunk_number, chunk) in chunks.into_iter().enumerate() {
        let chunk = chunk?;
        info!("Reading chunk #{}", chunk_number + 1);
        total_rows += chunk.rows;

        let chunk = drop_missing(chunk, drops);
        let df = build_frame(&chunk)?;
        let Some(df) = filter_chunk(df, settings, panel, drops)? else {
            continue;
        };
        match merged.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&df)?;
            }
            None => merged = Some(df),
        }
    }

    info!("Read {total_rows} SNPs from --sumstats file.");
    if panel.is_some() {
        info!(
            "Removed {} SNPs not in --merge-alleles.",
            drops.get(DropReason::Merge)
        );
    }
    info!("Removed {} SNPs with missing values.", drops.get(DropReason::Na));
    info!(
        "Removed {} SNPs with INFO <= {}.",
        drops.get(DropReason::Info),
        settings.info_min
    );
    info!(
        "Removed {} SNPs with MAF <= {}.",
        drops.get(DropReason::Frq),
        settings.maf_min
    );
    info!(
        "Removed {} SNPs with out-of-bounds p-values.",
        drops.get(DropReason::P)
    );
    info!(
        "Removed {} variants that were not SNPs or were strand-ambiguous.",
        drops.get(DropReason::Allele)
    );

    let df = match merged {
        Some(df) if df.height() > 0 => df,
        _ => return Err(MungeError::EmptyResult),
    };
    info!("{} SNPs remain.", df.height());
    Ok(ParsedSumstats { df, total_rows })
}

/// Drop rows with a missing value in any mapped column other than INFO.
pub fn drop_missing(chunk: RawChunk, drops: &mut DropCounters) -> RawChunk {
    let keep: Vec<bool> = (0..chunk.rows)
        .map(|row| {
            chunk
                .fields
                .iter()
                .zip(&chunk.columns)
                .filter(|(field, _)| **field != FieldName::Info)
                .all(|(_, values)| values[row].is_some())
        })
        .collect();
    let kept = count_true(&keep);
    drops.add(DropReason::Na, chunk.rows - kept);
    if kept == chunk.rows {
        return chunk;
    }

    let columns = chunk
        .columns
        .into_iter()
        .map(|values| {
            values
                .into_iter()
                .zip(&keep)
                .filter_map(|(v, k)| k.then_some(v))
                .collect::<Vec<Option<String>>>()
        })
        .collect();
    RawChunk {
        labels: chunk.labels,
        fields: chunk.fields,
        columns,
        rows: kept,
    }
}

/// Type the chunk. A numeric field holding a non-numeric token is fatal.
pub fn build_frame(chunk: &RawChunk) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(chunk.fields.len());
    let mut info_seen = 0usize;
    for ((label, field), values) in chunk.labels.iter().zip(&chunk.fields).zip(&chunk.columns) {
        let name = if *field == FieldName::Info {
            info_seen += 1;
            info_column_name(info_seen - 1)
        } else {
            field.as_str().to_string()
        };

        if field.is_numeric() {
            let parsed = values
                .iter()
                .map(|v| match v {
                    Some(s) => s.parse::<f64>().map(Some).map_err(|_| MungeError::NonNumeric {
                        column: label.clone(),
                        value: s.clone(),
                    }),
                    None => Ok(None),
                })
                .collect::<Result<Vec<Option<f64>>>>()?;
            columns.push(Series::new(name.as_str().into(), parsed).into());
        } else {
            columns.push(Series::new(name.as_str().into(), values.clone()).into());
        }
    }
    Ok(DataFrame::new(columns)?)
}

fn filter_chunk(
    mut df: DataFrame,
    settings: &FilterSettings,
    panel: Option<&ReferencePanel>,
    drops: &mut DropCounters,
) -> Result<Option<DataFrame>> {
    if df.height() == 0 {
        return Ok(None);
    }

    if let Some(panel) = panel {
        let keep: Vec<bool> = str_values(&df, FieldName::Snp.as_str())?
            .iter()
            .map(|s| s.as_deref().is_some_and(|s| panel.contains(s)))
            .collect();
        let kept = count_true(&keep);
        drops.add(DropReason::Merge, df.height() - kept);
        if kept == 0 {
            return Ok(None);
        }
        if kept < df.height() {
            df = filter_rows(&df, &keep)?;
        }
    }

    let mut keep = vec![true; df.height()];

    let info_cols = info_column_names(&df);
    if !info_cols.is_empty() {
        let mask = info_mask(&df, &info_cols, settings.info_min)?;
        narrow(&mut keep, &mask, DropReason::Info, drops);
    }

    let frq_col = FieldName::Frq.as_str();
    if has_column(&df, frq_col) {
        let (mask, folded) = frq_mask(&df, settings.maf_min)?;
        set_f64_column(&mut df, frq_col, folded)?;
        narrow(&mut keep, &mask, DropReason::Frq, drops);
    }

    let mut consumed = info_cols;
    if !settings.keep_maf {
        consumed.push(frq_col.to_string());
    }
    drop_columns(&mut df, &consumed)?;

    let mask = p_mask(&df)?;
    narrow(&mut keep, &mask, DropReason::P, drops);

    if !settings.no_alleles {
        uppercase_alleles(&mut df)?;
        let mask = allele_mask(&df)?;
        narrow(&mut keep, &mask, DropReason::Allele, drops);
    }

    match count_true(&keep) {
        0 => Ok(None),
        n if n == df.height() => Ok(Some(df)),
        _ => Ok(Some(filter_rows(&df, &keep)?)),
    }
}

/// `keep &= mask`, charging the newly removed rows to `reason`.
fn narrow(keep: &mut [bool], mask: &[bool], reason: DropReason, drops: &mut DropCounters) {
    let before = count_true(keep);
    for (k, m) in keep.iter_mut().zip(mask) {
        *k &= *m;
    }
    drops.add(reason, before - count_true(keep));
}

/// Several INFO columns are combined as the sum of the present values divided
/// by the number of INFO columns.
pub fn info_mask(df: &DataFrame, info_cols: &[String], info_min: f64) -> Result<Vec<bool>> {
    let columns = info_cols
        .iter()
        .map(|c| f64_values(df, c))
        .collect::<Result<Vec<_>>>()?;
    let mut implausible = 0usize;
    let keep = (0..df.height())
        .map(|row| {
            let present: Vec<f64> = columns.iter().filter_map(|c| c[row]).collect();
            if present
                .iter()
                .any(|v| *v < 0.0 || *v > INFO_PLAUSIBLE_MAX)
            {
                implausible += 1;
            }
            if present.is_empty() {
                return false;
            }
            present.iter().sum::<f64>() / columns.len() as f64 >= info_min
        })
        .collect();
    if implausible > 0 {
        warn!(
            "WARNING: {implausible} SNPs had INFO outside of [0,{INFO_PLAUSIBLE_MAX}]. The INFO column may be mislabeled."
        );
    }
    Ok(keep)
}

/// Returns the keep mask and the frequencies folded to the minor allele.
pub fn frq_mask(df: &DataFrame, maf_min: f64) -> Result<(Vec<bool>, Vec<Option<f64>>)> {
    let frq = f64_values(df, FieldName::Frq.as_str())?;
    let mut out_of_bounds = 0usize;
    let mut keep = Vec::with_capacity(frq.len());
    let mut folded = Vec::with_capacity(frq.len());
    for value in frq {
        match value {
            Some(f) if (0.0..=1.0).contains(&f) => {
                let maf = f.min(1.0 - f);
                keep.push(maf > maf_min);
                folded.push(Some(maf));
            }
            Some(f) => {
                out_of_bounds += 1;
                keep.push(false);
                folded.push(Some(f));
            }
            None => {
                keep.push(false);
                folded.push(None);
            }
        }
    }
    if out_of_bounds > 0 {
        warn!(
            "WARNING: {out_of_bounds} SNPs had FRQ outside of [0,1]. The FRQ column may be mislabeled."
        );
    }
    Ok((keep, folded))
}

pub fn p_mask(df: &DataFrame) -> Result<Vec<bool>> {
    let keep: Vec<bool> = f64_values(df, FieldName::P.as_str())?
        .into_iter()
        .map(|p| p.is_some_and(|p| p > 0.0 && p <= 1.0))
        .collect();
    let bad = keep.len() - count_true(&keep);
    if bad > 0 {
        warn!("WARNING: {bad} SNPs had P outside of (0,1]. The P column may be mislabeled.");
    }
    Ok(keep)
}

pub fn allele_mask(df: &DataFrame) -> Result<Vec<bool>> {
    let a1 = str_values(df, FieldName::A1.as_str())?;
    let a2 = str_values(df, FieldName::A2.as_str())?;
    Ok(a1
        .iter()
        .zip(&a2)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => is_valid_snp(&format!("{x}{y}")),
            _ => false,
        })
        .collect())
}

/// Keep the first row for every SNP id.
pub fn drop_duplicate_snps(df: DataFrame, drops: &mut DropCounters) -> Result<DataFrame> {
    let snps = str_values(&df, FieldName::Snp.as_str())?;
    let mut seen: HashSet<&str> = HashSet::with_capacity(snps.len());
    let keep: Vec<bool> = snps
        .iter()
        .map(|s| match s.as_deref() {
            Some(s) => seen.insert(s),
            None => false,
        })
        .collect();
    let removed = keep.len() - count_true(&keep);
    drops.add(DropReason::DupSnp, removed);
    info!(
        "Removed {removed} SNPs with duplicated rs numbers ({} SNPs remain).",
        keep.len() - removed
    );
    if removed == 0 {
        return Ok(df);
    }
    filter_rows(&df, &keep)
}
