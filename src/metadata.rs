use polars::prelude::*;
use tracing::warn;

use crate::error::Result;
use crate::types::FieldName;

/// Chi-square above which a SNP counts as genome-wide significant.
pub const GENOME_WIDE_CHISQ: f64 = 29.0;
/// Mean chi-square below this is reported as suspiciously small.
pub const LOW_MEAN_CHISQ: f64 = 1.02;
/// Median of a chi-square with one degree of freedom.
pub const CHISQ_1DF_MEDIAN: f64 = 0.4549;

#[derive(Debug, Clone, PartialEq)]
pub struct SumstatsMetadata {
    pub mean_chisq: f64,
    pub median_chisq: f64,
    pub lambda_gc: f64,
    pub max_chisq: f64,
    pub n_genome_wide: usize,
}

impl SumstatsMetadata {
    pub fn low_mean_chisq(&self) -> bool {
        self.mean_chisq < LOW_MEAN_CHISQ
    }

    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![format!("Mean chi^2 = {:.3}", self.mean_chisq)];
        if self.low_mean_chisq() {
            out.push("WARNING: mean chi^2 may be too small.".to_string());
        }
        out.push(format!("Lambda GC = {:.3}", self.lambda_gc));
        out.push(format!("Max chi^2 = {:.3}", self.max_chisq));
        out.push(format!(
            "{} Genome-wide significant SNPs (some may have been removed by filtering).",
            self.n_genome_wide
        ));
        out
    }
}

/// Summaries of Z^2 over the non-null rows of the final table.
pub fn summarize(df: &DataFrame) -> Result<SumstatsMetadata> {
    let z = df
        .column(FieldName::Z.as_str())?
        .as_materialized_series()
        .f64()?;
    let chisq: Float64Chunked = z.apply_values(|v| v * v);

    let median_chisq = chisq.median().unwrap_or(f64::NAN);
    let metadata = SumstatsMetadata {
        mean_chisq: chisq.mean().unwrap_or(f64::NAN),
        median_chisq,
        lambda_gc: median_chisq / CHISQ_1DF_MEDIAN,
        max_chisq: chisq.max().unwrap_or(f64::NAN),
        n_genome_wide: chisq
            .into_iter()
            .flatten()
            .filter(|c| *c > GENOME_WIDE_CHISQ)
            .count(),
    };
    if metadata.low_mean_chisq() {
        warn!(
            "WARNING: mean chi^2 = {:.3} may be too small.",
            metadata.mean_chisq
        );
    }
    Ok(metadata)
}
