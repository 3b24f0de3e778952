use std::fs;
use std::io::{Cursor, Read, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use sumstats_munge::df_utils::{f64_values, str_values};
use sumstats_munge::error::{ErrorCategory, MungeError};
use sumstats_munge::merge::ReferencePanel;
use sumstats_munge::munge::{MungeConfig, munge, munge_reader};
use sumstats_munge::types::DropReason;

const BASIC: &str = "SNP P A1 A2 N BETA\n\
                     rs1 0.05 A G 1000 0.3\n\
                     rs2 0.5 C T 1000 -0.01\n\
                     rs3 0.2 A C 1000 0.01\n";

fn reader(text: &str) -> Cursor<Vec<u8>> {
    Cursor::new(text.as_bytes().to_vec())
}

#[test]
fn beta_and_p_become_signed_z() {
    let result = munge_reader(reader(BASIC), &MungeConfig::default(), None).expect("munge");
    let df = &result.table.df;
    assert_eq!(df.height(), 3);
    let z = f64_values(df, "Z").expect("z");
    let z1 = z[0].expect("z for rs1");
    assert!((z1 - 1.959964).abs() < 1e-5);
    assert!(z[1].expect("z for rs2") < 0.0);
    assert_eq!(result.total_rows, 3);
    assert_eq!(result.drops.total(), 0);
    assert!(
        result
            .summary_lines()
            .iter()
            .any(|l| l == "Read 3 SNPs from --sumstats file.")
    );
}

#[test]
fn rows_are_conserved() {
    let text = "SNP P A1 A2 N BETA\n\
                rs1 0.05 A G 1000 0.3\n\
                rs2 0.5 C T 1000 -0.01\n\
                rs3 0.2 A C 1000 0.01\n\
                rs4 0 A G 1000 0.01\n\
                rs5 0.2 A T 1000 0.01\n\
                rs6 NA A G 1000 0.01\n\
                rs1 0.3 A G 1000 0.02\n\
                rs7 0.3 A G 10 0.0\n";
    let config = MungeConfig {
        chunksize: 3,
        ..Default::default()
    };
    let result = munge_reader(reader(text), &config, None).expect("munge");
    assert_eq!(result.total_rows, 9);
    assert_eq!(result.drops.get(DropReason::P), 1);
    assert_eq!(result.drops.get(DropReason::Allele), 1);
    assert_eq!(result.drops.get(DropReason::Na), 1);
    assert_eq!(result.drops.get(DropReason::DupSnp), 1);
    assert_eq!(result.drops.get(DropReason::LowN), 1);
    assert_eq!(
        result.total_rows,
        result.table.height() + result.drops.total()
    );
}

#[test]
fn fixed_n_fills_missing_sample_size() {
    let text = "SNP A1 A2 P Z\n\
                rs1 A G 0.05 1.96\n\
                rs2 A C 0.5 -0.6\n\
                rs3 C T 0.5 0.1\n";
    let config = MungeConfig {
        n: Some(5000.0),
        ..Default::default()
    };
    let result = munge_reader(reader(text), &config, None).expect("munge");
    assert_eq!(
        f64_values(&result.table.df, "N").expect("n"),
        vec![Some(5000.0); 3]
    );
}

#[test]
fn missing_sample_size_fails_before_reading_rows() {
    let text = "SNP A1 A2 P Z\nrs1 A G not-a-number 1.96\n";
    let err = munge_reader(reader(text), &MungeConfig::default(), None).unwrap_err();
    assert!(matches!(err, MungeError::MissingSampleSize));
}

#[test]
fn invalid_settings_are_rejected() {
    let config = MungeConfig {
        info_min: 3.0,
        ..Default::default()
    };
    let err = munge_reader(reader(BASIC), &config, None).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let config = MungeConfig {
        no_filter_n: true,
        n_min: Some(10.0),
        ..Default::default()
    };
    let err = munge_reader(reader(BASIC), &config, None).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let config = MungeConfig {
        n_cas: Some(10.0),
        ..Default::default()
    };
    assert!(munge_reader(reader(BASIC), &config, None).is_err());
}

#[test]
fn daner_counts_become_n() {
    let text = "CHR SNP BP A1 A2 FRQ_A_100 FRQ_U_200 INFO OR SE P\n\
                1 rs1 10 A G 0.3 0.3 0.95 1.05 0.01 0.01\n\
                1 rs2 20 C T 0.4 0.4 0.99 0.98 0.01 0.2\n\
                1 rs3 30 A C 0.2 0.2 0.97 1.0 0.01 0.6\n";
    let config = MungeConfig {
        daner: true,
        n_cas: Some(1.0),
        n_con: Some(1.0),
        ..Default::default()
    };
    let result = munge_reader(reader(text), &config, None).expect("munge");
    assert_eq!(result.column_map.daner_counts, Some((100.0, 200.0)));
    assert_eq!(
        f64_values(&result.table.df, "N").expect("n"),
        vec![Some(300.0); 3]
    );
    let z = f64_values(&result.table.df, "Z").expect("z");
    assert!(z[0].expect("z") > 0.0);
    assert!(z[1].expect("z") < 0.0);
}

#[test]
fn panel_aligns_output() {
    let panel = ReferencePanel::new(
        vec![
            Some("rs1".to_string()),
            Some("rs2".to_string()),
            Some("rs9".to_string()),
        ],
        vec![
            Some("AG".to_string()),
            Some("CT".to_string()),
            Some("AG".to_string()),
        ],
    );
    let text = "SNP P A1 A2 N BETA\n\
                rs1 0.05 A G 1000 0.03\n\
                rs2 0.5 C T 1000 -0.01\n\
                rs3 0.2 A C 1000 0.01\n";
    let result = munge_reader(reader(text), &MungeConfig::default(), Some(&panel)).expect("munge");
    let df = &result.table.df;
    assert_eq!(df.height(), panel.len());
    assert_eq!(
        str_values(df, "SNP").expect("snp"),
        vec![
            Some("rs1".to_string()),
            Some("rs2".to_string()),
            Some("rs9".to_string()),
        ]
    );
    let z = f64_values(df, "Z").expect("z");
    assert!(z[0].is_some());
    assert!(z[2].is_none());
    assert_eq!(result.drops.get(DropReason::Merge), 1);
}

#[test]
fn discordant_panel_is_fatal() {
    let panel = ReferencePanel::new(
        vec![Some("rs1".to_string())],
        vec![Some("CT".to_string())],
    );
    let text = "SNP P A1 A2 N BETA\n\
                rs1 0.05 A G 1000 0.01\n";
    let err = munge_reader(reader(text), &MungeConfig::default(), Some(&panel)).unwrap_err();
    assert!(matches!(err, MungeError::AllAllelesDiscordant));
}

#[test]
fn writes_gzipped_sumstats_and_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("trait.txt.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&input).expect("create"), Compression::default());
    encoder.write_all(BASIC.as_bytes()).expect("write");
    encoder.finish().expect("finish");

    let panel_path = dir.path().join("w_hm3.snplist");
    fs::write(&panel_path, "SNP A1 A2\nrs1 A G\nrs2 C T\nrs3 A C\n").expect("panel");

    let config = MungeConfig {
        sumstats: input,
        out: dir.path().join("trait"),
        merge_alleles: Some(panel_path),
        ..Default::default()
    };
    let result = munge(&config).expect("munge");
    assert_eq!(result.table.height(), 3);

    let mut text = String::new();
    MultiGzDecoder::new(fs::File::open(config.out_path()).expect("open output"))
        .read_to_string(&mut text)
        .expect("read output");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("SNP\tN\tZ\tA1\tA2"));
    let first: Vec<&str> = lines.next().expect("first row").split('\t').collect();
    assert_eq!(first[0], "rs1");
    assert_eq!(first[2], "1.960");
    assert_eq!(first[3], "A");

    let log = fs::read_to_string(config.log_path()).expect("log");
    assert!(log.contains("Writing summary statistics for 3 SNPs"));
    assert!(log.contains("Mean chi^2"));
}

#[test]
fn missing_input_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = MungeConfig {
        sumstats: dir.path().join("absent.txt"),
        out: dir.path().join("out"),
        ..Default::default()
    };
    assert!(munge(&config).is_err());
}
