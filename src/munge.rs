use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::df_utils::f64_values;
use crate::error::MungeError;
use crate::io::{ChunkReader, open_text, read_header, read_reference_panel, write_sumstats};
use crate::logging::RunLog;
use crate::merge::{ReferencePanel, reconcile_alleles};
use crate::metadata::{SumstatsMetadata, summarize};
use crate::pipeline::{FilterSettings, drop_duplicate_snps, parse_chunks};
use crate::qc::{check_munge_config, check_settings};
use crate::sample_size::{SampleSizeSettings, process_n};
use crate::schema::{
    ColumnFlags, ColumnMap, ColumnMapConfig, SchemaRequirements, describe_columns,
    resolve_column_map, validate_column_map,
};
use crate::signed::apply_signed_z;
use crate::types::{DropCounters, DropReason, FieldName, SumstatsTable};

pub const DEFAULT_CHUNKSIZE: usize = 5_000_000;

#[derive(Debug, Clone)]
pub struct MungeConfig {
    pub sumstats: PathBuf,
    /// Output prefix; `<out>.sumstats.gz` and `<out>.log` are written.
    pub out: PathBuf,
    pub n: Option<f64>,
    pub n_cas: Option<f64>,
    pub n_con: Option<f64>,
    pub info_min: f64,
    pub maf_min: f64,
    pub n_min: Option<f64>,
    pub no_filter_n: bool,
    pub nstudy_min: Option<f64>,
    pub chunksize: usize,
    pub columns: ColumnFlags,
    pub merge_alleles: Option<PathBuf>,
    pub no_alleles: bool,
    pub a1_inc: bool,
    pub keep_maf: bool,
    pub daner: bool,
    pub daner_n: bool,
}

impl Default for MungeConfig {
    fn default() -> Self {
        Self {
            sumstats: PathBuf::new(),
            out: PathBuf::from("munged"),
            n: None,
            n_cas: None,
            n_con: None,
            info_min: 0.9,
            maf_min: 0.01,
            n_min: None,
            no_filter_n: false,
            nstudy_min: None,
            chunksize: DEFAULT_CHUNKSIZE,
            columns: ColumnFlags::default(),
            merge_alleles: None,
            no_alleles: false,
            a1_inc: false,
            keep_maf: false,
            daner: false,
            daner_n: false,
        }
    }
}

impl MungeConfig {
    pub fn filter_settings(&self) -> FilterSettings {
        FilterSettings {
            info_min: self.info_min,
            maf_min: self.maf_min,
            no_alleles: self.no_alleles,
            keep_maf: self.keep_maf,
        }
    }

    pub fn column_map_config(&self) -> ColumnMapConfig {
        ColumnMapConfig {
            flags: self.columns.clone(),
            a1_inc: self.a1_inc,
            daner: self.daner,
            daner_n: self.daner_n,
        }
    }

    /// daner headers override any case/control counts given on the command line.
    pub fn sample_size_settings(&self, map: &ColumnMap) -> SampleSizeSettings {
        let (n_cas, n_con) = match map.daner_counts {
            Some((cas, con)) => (Some(cas), Some(con)),
            None => (self.n_cas, self.n_con),
        };
        SampleSizeSettings {
            n: self.n,
            n_cas,
            n_con,
            n_min: self.n_min,
            no_filter_n: self.no_filter_n,
            nstudy_min: self.nstudy_min,
        }
    }

    pub fn out_path(&self) -> PathBuf {
        with_suffix(&self.out, ".sumstats.gz")
    }

    pub fn log_path(&self) -> PathBuf {
        with_suffix(&self.out, ".log")
    }
}

fn with_suffix(prefix: &std::path::Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[derive(Debug, Clone)]
pub struct MungeResult {
    pub table: SumstatsTable,
    pub column_map: ColumnMap,
    pub drops: DropCounters,
    pub total_rows: usize,
    pub metadata: SumstatsMetadata,
}

impl MungeResult {
    pub fn rows_with_n(&self) -> crate::error::Result<usize> {
        Ok(f64_values(&self.table.df, FieldName::N.as_str())?
            .iter()
            .filter(|v| v.is_some())
            .count())
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut out = vec![format!("Read {} SNPs from --sumstats file.", self.total_rows)];
        out.extend(
            self.drops
                .iter()
                .map(|(reason, count)| format!("Removed {count} SNPs ({reason}).")),
        );
        out.push(format!("{} SNPs remain.", self.table.height()));
        out
    }
}

/// Run every stage on an open input stream whose first line is the header.
/// Nothing is written to disk.
pub fn munge_reader<R: BufRead>(
    mut reader: R,
    config: &MungeConfig,
    panel: Option<&ReferencePanel>,
) -> crate::error::Result<MungeResult> {
    check_settings(config)?;
    let header = read_header(&mut reader)?;
    let mut map = resolve_column_map(&header, &config.column_map_config())?;
    for msg in &map.info {
        info!("{msg}");
    }

    let n_settings = config.sample_size_settings(&map);
    validate_column_map(
        &mut map,
        &SchemaRequirements {
            alleles_required: !config.no_alleles,
            a1_inc: config.a1_inc,
            n_fixed: n_settings.n.is_some()
                || (n_settings.n_cas.is_some() && n_settings.n_con.is_some()),
        },
    )?;
    info!("Interpreting column names as follows:");
    for line in describe_columns(&map) {
        info!("{line}");
    }

    let mut drops = DropCounters::new();
    let chunks = ChunkReader::new(reader, &header, &map, config.chunksize)?;
    info!(
        "Reading sumstats into memory {} SNPs at a time.",
        config.chunksize
    );
    let parsed = parse_chunks(chunks, &config.filter_settings(), panel, &mut drops)?;

    let df = drop_duplicate_snps(parsed.df, &mut drops)?;
    let df = process_n(df, &n_settings, &mut drops)?;
    if df.height() == 0 {
        return Err(MungeError::EmptyResult);
    }
    let mut df = apply_signed_z(df, map.signed.as_ref(), config.a1_inc)?;
    if let Some(panel) = panel {
        df = reconcile_alleles(&df, panel, &mut drops)?;
    }

    let metadata = summarize(&df)?;
    Ok(MungeResult {
        table: SumstatsTable { df },
        column_map: map,
        drops,
        total_rows: parsed.total_rows,
        metadata,
    })
}

/// Munge `config.sumstats` into `<out>.sumstats.gz`, logging to `<out>.log`.
pub fn munge(config: &MungeConfig) -> Result<MungeResult> {
    check_munge_config(config)?;
    let mut log = RunLog::create(&config.log_path())?;
    log.info(&format!(
        "Munging summary statistics from {}",
        config.sumstats.display()
    ))?;

    let panel = match &config.merge_alleles {
        Some(path) => {
            log.info(&format!(
                "Reading list of SNPs for allele merge from {}",
                path.display()
            ))?;
            let panel = read_reference_panel(open_text(path)?)?;
            log.info(&format!("Read {} SNPs for allele merge.", panel.len()))?;
            Some(panel)
        }
        None => None,
    };

    let reader = open_text(&config.sumstats)?;
    let result = match munge_reader(reader, config, panel.as_ref()) {
        Ok(result) => result,
        Err(err) => {
            log.warn(&format!("ERROR converting summary statistics: {err}"))?;
            return Err(err.into());
        }
    };

    log.record("Interpreting column names as follows:")?;
    log.record_all(describe_columns(&result.column_map))?;
    log.record_all(result.summary_lines())?;
    if panel.is_some() {
        log.record(&format!(
            "Removed {} SNPs not in or not matching --merge-alleles.",
            result.drops.get(DropReason::Merge)
        ))?;
    }

    let out_path = config.out_path();
    log.info(&format!(
        "Writing summary statistics for {} SNPs ({} with nonmissing beta) to {}.",
        result.table.height(),
        result.rows_with_n()?,
        out_path.display()
    ))?;
    write_sumstats(&result.table.df, &out_path, config.keep_maf)?;

    log.info("Metadata:")?;
    for line in result.metadata.lines() {
        log.info(&line)?;
    }
    Ok(result)
}
