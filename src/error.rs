use polars::prelude::PolarsError;
use thiserror::Error;

use crate::types::FieldName;

/// Coarse classification of a fatal error, used by callers that only need to
/// know which contract was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    SchemaType,
    SanityCheck,
    EmptyResult,
    Internal,
    Io,
}

#[derive(Debug, Error)]
pub enum MungeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "too many signed sumstat columns ({}); specify which to ignore with --ignore",
        .0.join(", ")
    )]
    AmbiguousSignedColumns(Vec<String>),

    #[error("could not find a signed summary statistic column")]
    NoSignedColumn,

    #[error("found {count} columns named {header}")]
    DuplicateRawHeader { header: String, count: usize },

    #[error("found {count} different {field} columns")]
    DuplicateTargetField { field: FieldName, count: usize },

    #[error("could not find {0} column")]
    MissingColumn(FieldName),

    #[error("could not find A1/A2 columns")]
    MissingAlleles,

    #[error("could not determine N")]
    MissingSampleSize,

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("column {column} is expected to be numeric (found {value:?})")]
    NonNumeric { column: String, value: String },

    #[error(
        "median value of {column} is {observed:.2} (should be close to {expected}); this column may be mislabeled"
    )]
    MedianSanity {
        column: String,
        observed: f64,
        expected: f64,
    },

    #[error("after applying filters, no SNPs remain")]
    EmptyResult,

    #[error("all SNPs have alleles that do not match --merge-alleles")]
    AllAllelesDiscordant,

    #[error("cannot determine N; N should have been checked before reading rows")]
    UnresolvedSampleSize,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

impl MungeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MungeError::InvalidArgument(_)
            | MungeError::AmbiguousSignedColumns(_)
            | MungeError::NoSignedColumn
            | MungeError::DuplicateRawHeader { .. }
            | MungeError::DuplicateTargetField { .. }
            | MungeError::MissingColumn(_)
            | MungeError::MissingAlleles
            | MungeError::MissingSampleSize
            | MungeError::MalformedHeader(_) => ErrorCategory::Configuration,
            MungeError::NonNumeric { .. } => ErrorCategory::SchemaType,
            MungeError::MedianSanity { .. } => ErrorCategory::SanityCheck,
            MungeError::EmptyResult | MungeError::AllAllelesDiscordant => {
                ErrorCategory::EmptyResult
            }
            MungeError::UnresolvedSampleSize | MungeError::Polars(_) => ErrorCategory::Internal,
            MungeError::Parse(_) | MungeError::Io(_) => ErrorCategory::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, MungeError>;
