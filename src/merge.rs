use std::collections::{HashMap, HashSet};

use polars::prelude::*;
use tracing::{info, warn};

use crate::df_utils::{gather_optional, str_values};
use crate::error::{MungeError, Result};
use crate::types::{DropCounters, DropReason, FieldName};
use crate::utils::alleles_match;

/// Variants and allele pairs from `--merge-alleles`. Row order is authoritative.
#[derive(Debug, Clone)]
pub struct ReferencePanel {
    snps: Vec<Option<String>>,
    /// Upper-cased A1 followed by A2.
    alleles: Vec<Option<String>>,
    index: HashSet<String>,
}

impl ReferencePanel {
    pub fn new(snps: Vec<Option<String>>, alleles: Vec<Option<String>>) -> Self {
        let index = snps.iter().flatten().cloned().collect();
        Self {
            snps,
            alleles,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.snps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snps.is_empty()
    }

    pub fn contains(&self, snp: &str) -> bool {
        self.index.contains(snp)
    }
}

/// Aligned left join of `df` onto `panel`: the output has exactly one row per
/// panel row, in panel order. Rows absent from `df`, or whose alleles do not
/// match the panel pair, keep their SNP but every other field is null.
pub fn reconcile_alleles(
    df: &DataFrame,
    panel: &ReferencePanel,
    drops: &mut DropCounters,
) -> Result<DataFrame> {
    let snp_col = FieldName::Snp.as_str();
    let snps = str_values(df, snp_col)?;
    let row_of: HashMap<&str, usize> = snps
        .iter()
        .enumerate()
        .rev()
        .filter_map(|(i, s)| s.as_deref().map(|s| (s, i)))
        .collect();

    let a1 = str_values(df, FieldName::A1.as_str())?;
    let a2 = str_values(df, FieldName::A2.as_str())?;

    let mut joined = 0usize;
    let mut rows: Vec<Option<usize>> = Vec::with_capacity(panel.len());
    for (snp, ref_alleles) in panel.snps.iter().zip(&panel.alleles) {
        let Some(row) = snp.as_deref().and_then(|s| row_of.get(s).copied()) else {
            rows.push(None);
            continue;
        };
        joined += 1;
        let matched = match (&a1[row], &a2[row], ref_alleles) {
            (Some(x), Some(y), Some(r)) => alleles_match(&format!("{x}{y}{r}")),
            _ => false,
        };
        rows.push(matched.then_some(row));
    }

    let matched = rows.iter().filter(|r| r.is_some()).count();
    let mismatched = joined - matched;
    if matched == 0 {
        warn!("All SNPs have alleles that do not match --merge-alleles.");
        return Err(MungeError::AllAllelesDiscordant);
    }
    drops.add(DropReason::Merge, mismatched);
    info!(
        "Removed {mismatched} SNPs whose alleles did not match --merge-alleles ({matched} SNPs remain)."
    );

    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        if series.name().as_str() == snp_col {
            columns.push(Series::new(snp_col.into(), panel.snps.clone()).into());
        } else {
            columns.push(gather_optional(series, &rows)?.into());
        }
    }
    Ok(DataFrame::new(columns)?)
}
