use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use anyhow::Context;
use bzip2::read::BzDecoder;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use polars::prelude::*;

use crate::error::{MungeError, Result};
use crate::merge::ReferencePanel;
use crate::schema::{ColumnMap, normalize_header};
use crate::types::FieldName;

/// Columns written to `.sumstats.gz`, in order. FRQ is appended on request.
pub const OUTPUT_COLUMNS: [FieldName; 5] = [
    FieldName::Snp,
    FieldName::N,
    FieldName::Z,
    FieldName::A1,
    FieldName::A2,
];

/// Open a possibly compressed text file; compression is chosen by extension.
pub fn open_text(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader: Box<dyn BufRead> = match ext.as_str() {
        "gz" | "bgz" => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        "bz2" => Box::new(BufReader::new(BzDecoder::new(file))),
        _ => Box::new(BufReader::new(file)),
    };
    Ok(reader)
}

/// Consume the first line of `reader` and split it into column labels.
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<Vec<String>> {
    let mut header_line = String::new();
    reader.read_line(&mut header_line)?;
    let headers = split_quoted_whitespace(&header_line);
    if headers.is_empty() {
        return Err(MungeError::MalformedHeader("empty file".to_string()));
    }
    Ok(headers)
}

pub fn split_quoted_whitespace(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            in_quote = !in_quote;
            continue;
        }
        if c == '\\'
            && let Some('"') = chars.peek().copied()
        {
            chars.next();
            current.push('"');
            continue;
        }
        if c.is_whitespace() && !in_quote {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// `None` for the tokens that denote a missing value.
pub fn normalize_missing_token(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }
    let upper = trimmed.to_ascii_uppercase();
    if upper == "NA" || upper == "NAN" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// One batch of rows, restricted to the mapped columns, stored column-major
/// with missing tokens already turned into `None`.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub labels: Vec<String>,
    pub fields: Vec<FieldName>,
    pub columns: Vec<Vec<Option<String>>>,
    pub rows: usize,
}

/// Streams a whitespace-delimited table in batches of at most `chunksize` rows.
pub struct ChunkReader<R> {
    lines: Lines<R>,
    indices: Vec<usize>,
    labels: Vec<String>,
    fields: Vec<FieldName>,
    chunksize: usize,
    done: bool,
}

impl<R: BufRead> ChunkReader<R> {
    /// `reader` must be positioned just after the header line `header`.
    pub fn new(reader: R, header: &[String], map: &ColumnMap, chunksize: usize) -> Result<Self> {
        let mut indices = Vec::new();
        let mut labels = Vec::new();
        let mut fields = Vec::new();
        for (idx, raw) in header.iter().enumerate() {
            if let Some(field) = map.field_for(raw) {
                indices.push(idx);
                labels.push(raw.clone());
                fields.push(field);
            }
        }
        if chunksize == 0 {
            return Err(MungeError::InvalidArgument(
                "chunksize must be positive".to_string(),
            ));
        }
        Ok(Self {
            lines: reader.lines(),
            indices,
            labels,
            fields,
            chunksize,
            done: false,
        })
    }
}

impl<R: BufRead> Iterator for ChunkReader<R> {
    type Item = Result<RawChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let capacity = self.chunksize.min(1 << 16);
        let mut columns: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(capacity); self.indices.len()];
        let mut rows = 0usize;
        while rows < self.chunksize {
            match self.lines.next() {
                None => {
                    self.done = true;
                    break;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let parts = split_quoted_whitespace(&line);
                    for (col, idx) in columns.iter_mut().zip(&self.indices) {
                        col.push(parts.get(*idx).and_then(|v| normalize_missing_token(v)));
                    }
                    rows += 1;
                }
            }
        }
        if rows == 0 {
            return None;
        }
        Some(Ok(RawChunk {
            labels: self.labels.clone(),
            fields: self.fields.clone(),
            columns,
            rows,
        }))
    }
}

/// Read a `--merge-alleles` table. It must have SNP, A1 and A2 columns.
pub fn read_reference_panel<R: BufRead>(mut reader: R) -> Result<ReferencePanel> {
    let header = read_header(&mut reader)?;
    let position = |name: &str| header.iter().position(|h| normalize_header(h) == name);
    let (Some(snp_idx), Some(a1_idx), Some(a2_idx)) =
        (position("SNP"), position("A1"), position("A2"))
    else {
        return Err(MungeError::InvalidArgument(
            "--merge-alleles must have columns SNP, A1, A2.".to_string(),
        ));
    };

    let mut snps = Vec::new();
    let mut alleles = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parts = split_quoted_whitespace(&line);
        let get = |idx: usize| parts.get(idx).and_then(|v| normalize_missing_token(v));
        snps.push(get(snp_idx));
        alleles.push(match (get(a1_idx), get(a2_idx)) {
            (Some(a1), Some(a2)) => Some(format!("{a1}{a2}").to_ascii_uppercase()),
            _ => None,
        });
    }
    Ok(ReferencePanel::new(snps, alleles))
}

/// Write SNP, N, Z, A1, A2 (and FRQ when `keep_maf`) as gzipped TSV with three
/// decimal places.
pub fn write_sumstats(df: &DataFrame, path: &Path, keep_maf: bool) -> anyhow::Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut selected: Vec<&str> = OUTPUT_COLUMNS
        .iter()
        .map(|f| f.as_str())
        .filter(|c| names.iter().any(|n| n == c))
        .collect();
    if keep_maf && names.iter().any(|n| n == FieldName::Frq.as_str()) {
        selected.push(FieldName::Frq.as_str());
    }
    let mut out = df.select(selected)?;

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);
    CsvWriter::new(&mut writer)
        .include_header(true)
        .with_separator(b'\t')
        .with_float_precision(Some(3))
        .finish(&mut out)?;
    writer.flush()?;
    let encoder = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush {}: {}", path.display(), e.error()))?;
    encoder.finish()?;
    Ok(())
}
