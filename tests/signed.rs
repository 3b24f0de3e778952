use polars::prelude::*;

use sumstats_munge::df_utils::{f64_values, has_column};
use sumstats_munge::error::{ErrorCategory, MungeError};
use sumstats_munge::metadata::{CHISQ_1DF_MEDIAN, summarize};
use sumstats_munge::schema::SignedStat;
use sumstats_munge::signed::{apply_signed_z, check_median, p_to_z};
use sumstats_munge::types::FieldName;

fn frame(p: Vec<f64>, signed: Option<Vec<f64>>) -> DataFrame {
    let snps: Vec<String> = (1..=p.len()).map(|i| format!("rs{i}")).collect();
    let mut cols: Vec<Column> = vec![
        Series::new("SNP".into(), snps).into(),
        Series::new("P".into(), p).into(),
    ];
    if let Some(values) = signed {
        cols.push(Series::new("SIGNED_SUMSTAT".into(), values).into());
    }
    DataFrame::new(cols).expect("frame")
}

fn beta() -> SignedStat {
    SignedStat {
        label: "BETA".to_string(),
        null_value: 0.0,
        source: Some(FieldName::Beta),
    }
}

#[test]
fn p_to_z_matches_chi_square_quantile() {
    assert!((p_to_z(0.05) - 1.959964).abs() < 1e-5);
    let z = p_to_z(1.0);
    assert!(z.abs() < 1e-9);
    assert!(!z.is_sign_negative());
    assert!(p_to_z(1e-300) > 30.0);
}

#[test]
fn z_takes_the_sign_of_the_statistic() {
    let df = frame(vec![0.05, 0.05, 0.05], Some(vec![0.03, -0.02, 0.01]));
    let df = apply_signed_z(df, Some(&beta()), false).expect("signed z");
    let z: Vec<f64> = f64_values(&df, "Z").expect("z").into_iter().flatten().collect();
    assert!(z[0] > 1.95);
    assert!(z[1] < -1.95);
    assert!(z[2] > 1.95);
    assert!(!has_column(&df, "P"));
    assert!(!has_column(&df, "SIGNED_SUMSTAT"));
}

#[test]
fn odds_ratio_below_one_is_negative() {
    let stat = SignedStat {
        label: "OR".to_string(),
        null_value: 1.0,
        source: Some(FieldName::Or),
    };
    let df = frame(vec![0.01, 0.01, 0.01], Some(vec![0.95, 1.0, 1.05]));
    let df = apply_signed_z(df, Some(&stat), false).expect("signed z");
    let z: Vec<f64> = f64_values(&df, "Z").expect("z").into_iter().flatten().collect();
    assert!(z[0] < 0.0);
    assert!(z[1] > 0.0);
    assert!(z[2] > 0.0);
}

#[test]
fn mislabeled_statistic_fails_median_check() {
    let df = frame(vec![0.5, 0.5, 0.5], Some(vec![1.1, 0.9, 1.2]));
    let err = apply_signed_z(df, Some(&beta()), false).unwrap_err();
    match &err {
        MungeError::MedianSanity {
            column,
            observed,
            expected,
        } => {
            assert_eq!(column, "BETA");
            assert!((observed - 1.1).abs() < 1e-12);
            assert_eq!(*expected, 0.0);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::SanityCheck);
}

#[test]
fn median_check_reports_sensible_values() {
    let series = Series::new("BETA".into(), vec![-0.05, 0.0, 0.02]);
    let msg = check_median(&series, 0.0, 0.1, "BETA").expect("median");
    assert!(msg.contains("BETA"));
}

#[test]
fn a1_inc_gives_positive_z_without_a_signed_column() {
    let df = frame(vec![0.05, 0.2], None);
    let df = apply_signed_z(df, None, true).expect("signed z");
    let z: Vec<f64> = f64_values(&df, "Z").expect("z").into_iter().flatten().collect();
    assert!(z.iter().all(|v| *v > 0.0));
}

#[test]
fn metadata_summarizes_chi_square() {
    let df = DataFrame::new(vec![
        Series::new("SNP".into(), vec!["rs1", "rs2", "rs3"]).into(),
        Series::new("Z".into(), vec![Some(1.0), Some(-2.0), Some(6.0)]).into(),
    ])
    .expect("frame");
    let meta = summarize(&df).expect("summary");
    assert!((meta.mean_chisq - 41.0 / 3.0).abs() < 1e-12);
    assert_eq!(meta.median_chisq, 4.0);
    assert_eq!(meta.max_chisq, 36.0);
    assert_eq!(meta.n_genome_wide, 1);
    assert!((meta.lambda_gc - 4.0 / CHISQ_1DF_MEDIAN).abs() < 1e-12);
    assert!(!meta.low_mean_chisq());
    assert!(meta.lines().iter().any(|l| l.starts_with("Mean chi^2")));
}

#[test]
fn metadata_ignores_null_z() {
    let df = DataFrame::new(vec![
        Series::new("SNP".into(), vec!["rs1", "rs2"]).into(),
        Series::new("Z".into(), vec![Some(0.5), None]).into(),
    ])
    .expect("frame");
    let meta = summarize(&df).expect("summary");
    assert_eq!(meta.max_chisq, 0.25);
    assert!(meta.low_mean_chisq());
}
