use std::io::Cursor;

use sumstats_munge::df_utils::{f64_values, has_column, str_values};
use sumstats_munge::error::{MungeError, Result};
use sumstats_munge::io::{ChunkReader, read_header};
use sumstats_munge::merge::ReferencePanel;
use sumstats_munge::pipeline::{
    FilterSettings, ParsedSumstats, drop_duplicate_snps, parse_chunks,
};
use sumstats_munge::schema::{ColumnFlags, ColumnMapConfig, resolve_column_map};
use sumstats_munge::types::{DropCounters, DropReason};

fn parse_text(
    text: &str,
    flags: ColumnFlags,
    settings: &FilterSettings,
    chunksize: usize,
    panel: Option<&ReferencePanel>,
) -> (Result<ParsedSumstats>, DropCounters) {
    let mut reader = Cursor::new(text.as_bytes().to_vec());
    let header = read_header(&mut reader).expect("header");
    let config = ColumnMapConfig {
        flags,
        a1_inc: false,
        daner: false,
        daner_n: false,
    };
    let map = resolve_column_map(&header, &config).expect("column map");
    let chunks = ChunkReader::new(reader, &header, &map, chunksize).expect("chunk reader");
    let mut drops = DropCounters::new();
    let parsed = parse_chunks(chunks, settings, panel, &mut drops);
    (parsed, drops)
}

fn parse_default(text: &str) -> (ParsedSumstats, DropCounters) {
    let (parsed, drops) = parse_text(
        text,
        ColumnFlags::default(),
        &FilterSettings::default(),
        100,
        None,
    );
    (parsed.expect("parse"), drops)
}

#[test]
fn clean_input_loses_nothing() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G 0.5 0.1 100\n\
                rs2 C T 0.01 -0.2 100\n\
                rs3 A C 0.9 0.0 100\n";
    let (parsed, drops) = parse_default(text);
    assert_eq!(drops.total(), 0);
    assert_eq!(parsed.total_rows, 3);
    assert_eq!(parsed.df.height(), 3);
}

#[test]
fn p_values_outside_unit_interval_are_dropped() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G 0.5 0.1 100\n\
                rs2 A G 0 0.1 100\n\
                rs3 A G 1.5 0.1 100\n\
                rs4 A G 1 0.1 100\n";
    let (parsed, drops) = parse_default(text);
    assert_eq!(drops.get(DropReason::P), 2);
    let snps = str_values(&parsed.df, "SNP").expect("snp");
    assert_eq!(snps, vec![Some("rs1".to_string()), Some("rs4".to_string())]);
}

#[test]
fn frequencies_are_folded_and_filtered() {
    let text = "SNP A1 A2 P BETA N FRQ\n\
                rs1 A G 0.5 0.1 100 0.8\n\
                rs2 A G 0.5 0.1 100 0.995\n\
                rs3 A G 0.5 0.1 100 0.3\n\
                rs4 A G 0.5 0.1 100 1.2\n";
    let settings = FilterSettings {
        keep_maf: true,
        ..Default::default()
    };
    let (parsed, drops) = parse_text(text, ColumnFlags::default(), &settings, 100, None);
    let parsed = parsed.expect("parse");
    assert_eq!(drops.get(DropReason::Frq), 2);
    let frq: Vec<f64> = f64_values(&parsed.df, "FRQ")
        .expect("frq")
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(frq.len(), 2);
    assert!((frq[0] - 0.2).abs() < 1e-12);
    assert!((frq[1] - 0.3).abs() < 1e-12);
    assert!(frq.iter().all(|f| *f <= 0.5));
}

#[test]
fn frequency_column_is_dropped_by_default() {
    let text = "SNP A1 A2 P BETA N MAF\n\
                rs1 A G 0.5 0.1 100 0.2\n";
    let (parsed, _) = parse_default(text);
    assert!(!has_column(&parsed.df, "FRQ"));
}

#[test]
fn info_columns_are_averaged() {
    let flags = ColumnFlags {
        info_list: vec!["INFO_A".to_string(), "INFO_B".to_string()],
        ..Default::default()
    };
    let text = "SNP A1 A2 P BETA N INFO_A INFO_B\n\
                rs1 A G 0.5 0.1 100 1.0 0.9\n\
                rs2 A G 0.5 0.1 100 0.5 0.9\n\
                rs3 A G 0.5 0.1 100 1.0 NA\n\
                rs4 A G 0.5 0.1 100 NA NA\n";
    let (parsed, drops) = parse_text(text, flags, &FilterSettings::default(), 100, None);
    let parsed = parsed.expect("parse");
    assert_eq!(drops.get(DropReason::Na), 0);
    assert_eq!(drops.get(DropReason::Info), 3);
    assert_eq!(parsed.df.height(), 1);
    assert!(!has_column(&parsed.df, "INFO"));
    assert!(!has_column(&parsed.df, "INFO_2"));
}

#[test]
fn implausible_info_is_kept_and_threshold_is_inclusive() {
    let text = "SNP A1 A2 P BETA N INFO\n\
                rs1 A G 0.5 0.1 100 2.5\n\
                rs2 A G 0.5 0.1 100 0.9\n";
    let (parsed, drops) = parse_default(text);
    assert_eq!(drops.get(DropReason::Info), 0);
    assert_eq!(parsed.df.height(), 2);
}

#[test]
fn info_just_below_minimum_is_dropped_once() {
    let text = "SNP A1 A2 P BETA N INFO\n\
                rs1 A G 0.5 0.1 100 0.89\n\
                rs2 A G 0.5 0.1 100 0.95\n";
    let (parsed, drops) = parse_default(text);
    assert_eq!(drops.get(DropReason::Info), 1);
    assert_eq!(
        str_values(&parsed.df, "SNP").expect("snp"),
        vec![Some("rs2".to_string())]
    );
}

#[test]
fn invalid_and_ambiguous_alleles_are_dropped() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G 0.5 0.1 100\n\
                rs2 A T 0.5 0.1 100\n\
                rs3 AC G 0.5 0.1 100\n\
                rs4 a g 0.5 0.1 100\n\
                rs5 C G 0.5 0.1 100\n";
    let (parsed, drops) = parse_default(text);
    assert_eq!(drops.get(DropReason::Allele), 3);
    let a1 = str_values(&parsed.df, "A1").expect("a1");
    assert_eq!(a1, vec![Some("A".to_string()), Some("A".to_string())]);
}

#[test]
fn no_alleles_skips_the_allele_filter() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A T 0.5 0.1 100\n";
    let settings = FilterSettings {
        no_alleles: true,
        ..Default::default()
    };
    let (parsed, drops) = parse_text(text, ColumnFlags::default(), &settings, 100, None);
    assert_eq!(parsed.expect("parse").df.height(), 1);
    assert_eq!(drops.get(DropReason::Allele), 0);
}

#[test]
fn missing_values_are_counted_across_chunks() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G 0.5 0.1 100\n\
                rs2 A G NA 0.1 100\n\
                rs3 A G 0.5 . 100\n\
                rs4 A G 0.5 0.1 100\n\
                rs5 C T 0.5 0.1 100\n";
    let (parsed, drops) = parse_text(
        text,
        ColumnFlags::default(),
        &FilterSettings::default(),
        2,
        None,
    );
    let parsed = parsed.expect("parse");
    assert_eq!(parsed.total_rows, 5);
    assert_eq!(drops.get(DropReason::Na), 2);
    assert_eq!(parsed.df.height(), 3);
    assert_eq!(parsed.total_rows, parsed.df.height() + drops.total());
}

#[test]
fn non_numeric_value_is_fatal() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G abc 0.1 100\n";
    let (parsed, _) = parse_text(
        text,
        ColumnFlags::default(),
        &FilterSettings::default(),
        100,
        None,
    );
    match parsed.unwrap_err() {
        MungeError::NonNumeric { column, value } => {
            assert_eq!(column, "P");
            assert_eq!(value, "abc");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn everything_filtered_is_an_empty_result() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G 0 0.1 100\n\
                rs2 A T 0.5 0.1 100\n";
    let (parsed, drops) = parse_text(
        text,
        ColumnFlags::default(),
        &FilterSettings::default(),
        1,
        None,
    );
    assert!(matches!(parsed.unwrap_err(), MungeError::EmptyResult));
    assert_eq!(drops.get(DropReason::P), 1);
    assert_eq!(drops.get(DropReason::Allele), 1);
}

#[test]
fn panel_prefilter_counts_merge_drops() {
    let panel = ReferencePanel::new(
        vec![Some("rs1".to_string()), Some("rs3".to_string())],
        vec![Some("AG".to_string()), Some("AG".to_string())],
    );
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G 0.5 0.1 100\n\
                rs2 A G 0.5 0.1 100\n\
                rs3 A G 0.5 0.1 100\n";
    let (parsed, drops) = parse_text(
        text,
        ColumnFlags::default(),
        &FilterSettings::default(),
        100,
        Some(&panel),
    );
    assert_eq!(parsed.expect("parse").df.height(), 2);
    assert_eq!(drops.get(DropReason::Merge), 1);
}

#[test]
fn duplicate_snps_keep_first_row() {
    let text = "SNP A1 A2 P BETA N\n\
                rs1 A G 0.5 0.1 100\n\
                rs2 A G 0.5 0.1 100\n\
                rs1 A G 0.4 0.2 100\n";
    let (parsed, mut drops) = parse_default(text);
    let df = drop_duplicate_snps(parsed.df, &mut drops).expect("dedupe");
    assert_eq!(drops.get(DropReason::DupSnp), 1);
    assert_eq!(df.height(), 2);
    let signed = f64_values(&df, "SIGNED_SUMSTAT").expect("signed");
    assert_eq!(signed, vec![Some(0.1), Some(0.1)]);
}
