use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use sumstats_munge::logging::init_tracing;
use sumstats_munge::munge::{DEFAULT_CHUNKSIZE, MungeConfig, munge};
use sumstats_munge::schema::{ColumnFlags, SignedSumstatFlag};

#[derive(Parser)]
#[command(name = "munge-sumstats")]
#[command(about = "Convert GWAS summary statistics to the .sumstats format", long_about = None)]
struct Cli {
    /// Input filename (optionally .gz or .bz2 compressed)
    #[arg(long)]
    sumstats: PathBuf,
    /// Output filename prefix
    #[arg(long)]
    out: PathBuf,
    /// Sample size, if there is no N column
    #[arg(long = "N")]
    n: Option<f64>,
    /// Number of cases, if there is no N column
    #[arg(long = "N-cas")]
    n_cas: Option<f64>,
    /// Number of controls, if there is no N column
    #[arg(long = "N-con")]
    n_con: Option<f64>,
    #[arg(long, default_value_t = 0.9)]
    info_min: f64,
    #[arg(long, default_value_t = 0.01)]
    maf_min: f64,
    /// Infer N_cas and N_con from the FRQ_A_/FRQ_U_ headers of a daner file
    #[arg(long)]
    daner: bool,
    /// Read per-SNP case and control counts from the Nca/Nco columns of a daner file
    #[arg(long)]
    daner_n: bool,
    /// Don't require alleles; useful for LD score estimation without a signed statistic
    #[arg(long)]
    no_alleles: bool,
    /// SNP list with SNP, A1, A2 columns; output is aligned to it
    #[arg(long)]
    merge_alleles: Option<PathBuf>,
    /// Minimum N; default is the 90th percentile of N divided by 1.5
    #[arg(long)]
    n_min: Option<f64>,
    /// Don't filter SNPs with low N
    #[arg(long)]
    no_filter_n: bool,
    #[arg(long, default_value_t = DEFAULT_CHUNKSIZE)]
    chunksize: usize,
    #[arg(long)]
    snp: Option<String>,
    #[arg(long = "N-col")]
    n_col: Option<String>,
    #[arg(long = "N-cas-col")]
    n_cas_col: Option<String>,
    #[arg(long = "N-con-col")]
    n_con_col: Option<String>,
    #[arg(long)]
    a1: Option<String>,
    #[arg(long)]
    a2: Option<String>,
    #[arg(long)]
    p: Option<String>,
    #[arg(long)]
    frq: Option<String>,
    /// Signed statistic column and its null value, e.g. "BETA,0" or "OR,1"
    #[arg(long)]
    signed_sumstats: Option<String>,
    #[arg(long)]
    info: Option<String>,
    /// Comma-separated INFO columns; their average is filtered on
    #[arg(long)]
    info_list: Option<String>,
    #[arg(long)]
    nstudy: Option<String>,
    /// Minimum number of studies; default is the maximum over all SNPs
    #[arg(long)]
    nstudy_min: Option<f64>,
    /// Comma-separated column names to ignore
    #[arg(long)]
    ignore: Option<String>,
    /// A1 is the increasing allele
    #[arg(long)]
    a1_inc: bool,
    /// Keep the FRQ column in the output
    #[arg(long)]
    keep_maf: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let signed_sumstats = cli
        .signed_sumstats
        .as_deref()
        .map(SignedSumstatFlag::parse)
        .transpose()?;
    let columns = ColumnFlags {
        snp: cli.snp,
        n_col: cli.n_col,
        n_cas_col: cli.n_cas_col,
        n_con_col: cli.n_con_col,
        a1: cli.a1,
        a2: cli.a2,
        p: cli.p,
        frq: cli.frq,
        info: cli.info,
        info_list: cli.info_list.map(split_string_list).unwrap_or_default(),
        nstudy: cli.nstudy,
        signed_sumstats,
        ignore: cli.ignore.map(split_string_list).unwrap_or_default(),
    };
    let config = MungeConfig {
        sumstats: cli.sumstats,
        out: cli.out,
        n: cli.n,
        n_cas: cli.n_cas,
        n_con: cli.n_con,
        info_min: cli.info_min,
        maf_min: cli.maf_min,
        n_min: cli.n_min,
        no_filter_n: cli.no_filter_n,
        nstudy_min: cli.nstudy_min,
        chunksize: cli.chunksize,
        columns,
        merge_alleles: cli.merge_alleles,
        no_alleles: cli.no_alleles,
        a1_inc: cli.a1_inc,
        keep_maf: cli.keep_maf,
        daner: cli.daner,
        daner_n: cli.daner_n,
    };

    let result = munge(&config)?;
    for line in result.summary_lines() {
        info!("{line}");
    }
    Ok(())
}

fn split_string_list(input: String) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
