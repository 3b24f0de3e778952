use std::fmt;
use std::ops::AddAssign;

use polars::prelude::DataFrame;

/// One semantic column of the internal summary-statistics schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldName {
    Snp,
    P,
    A1,
    A2,
    N,
    NCas,
    NCon,
    Z,
    Or,
    Beta,
    LogOdds,
    SignedSumstat,
    Info,
    Frq,
    NStudy,
}

impl FieldName {
    pub const ALL: [FieldName; 15] = [
        FieldName::Snp,
        FieldName::P,
        FieldName::A1,
        FieldName::A2,
        FieldName::N,
        FieldName::NCas,
        FieldName::NCon,
        FieldName::Z,
        FieldName::Or,
        FieldName::Beta,
        FieldName::LogOdds,
        FieldName::SignedSumstat,
        FieldName::Info,
        FieldName::Frq,
        FieldName::NStudy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Snp => "SNP",
            FieldName::P => "P",
            FieldName::A1 => "A1",
            FieldName::A2 => "A2",
            FieldName::N => "N",
            FieldName::NCas => "N_CAS",
            FieldName::NCon => "N_CON",
            FieldName::Z => "Z",
            FieldName::Or => "OR",
            FieldName::Beta => "BETA",
            FieldName::LogOdds => "LOG_ODDS",
            FieldName::SignedSumstat => "SIGNED_SUMSTAT",
            FieldName::Info => "INFO",
            FieldName::Frq => "FRQ",
            FieldName::NStudy => "NSTUDY",
        }
    }

    /// Everything except the variant id and the two alleles is read as f64.
    pub fn is_numeric(self) -> bool {
        !matches!(self, FieldName::Snp | FieldName::A1 | FieldName::A2)
    }

    /// Directional statistics that can be picked up from the default dictionary.
    pub fn is_signed(self) -> bool {
        self.null_value().is_some()
    }

    /// Value of a signed statistic that means "no effect".
    pub fn null_value(self) -> Option<f64> {
        match self {
            FieldName::Z | FieldName::Beta | FieldName::LogOdds => Some(0.0),
            FieldName::Or => Some(1.0),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FieldName::Snp => "Variant ID (e.g., rs number)",
            FieldName::P => "p-Value",
            FieldName::A1 => "Allele 1, interpreted as ref allele for signed sumstat.",
            FieldName::A2 => "Allele 2, interpreted as non-ref allele for signed sumstat.",
            FieldName::N => "Sample size",
            FieldName::NCas => "Number of cases",
            FieldName::NCon => "Number of controls",
            FieldName::Z => "Z-score (0 --> no effect; above 0 --> A1 is trait/risk increasing)",
            FieldName::Or => "Odds ratio (1 --> no effect; above 1 --> A1 is risk increasing)",
            FieldName::Beta => {
                "[linear/logistic] regression coefficient (0 --> no effect; above 0 --> A1 is trait/risk increasing)"
            }
            FieldName::LogOdds => {
                "Log odds ratio (0 --> no effect; above 0 --> A1 is risk increasing)"
            }
            FieldName::SignedSumstat => {
                "Directional summary statistic as specified by --signed-sumstats."
            }
            FieldName::Info => "INFO score (imputation quality; higher --> better imputation)",
            FieldName::Frq => "Allele frequency",
            FieldName::NStudy => "Number of studies in which the SNP was genotyped.",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    Na,
    P,
    Info,
    Frq,
    Allele,
    Merge,
    DupSnp,
    LowN,
}

impl DropReason {
    pub const ALL: [DropReason; 8] = [
        DropReason::Na,
        DropReason::P,
        DropReason::Info,
        DropReason::Frq,
        DropReason::Allele,
        DropReason::Merge,
        DropReason::DupSnp,
        DropReason::LowN,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            DropReason::Na => "NA",
            DropReason::P => "P",
            DropReason::Info => "INFO",
            DropReason::Frq => "FRQ",
            DropReason::Allele => "ALLELE",
            DropReason::Merge => "MERGE",
            DropReason::DupSnp => "DUP_SNP",
            DropReason::LowN => "LOW_N",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Running count of removed rows per reason. Counts only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropCounters {
    counts: [usize; 8],
}

impl DropCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reason: DropReason, removed: usize) {
        self.counts[reason.index()] += removed;
    }

    pub fn get(&self, reason: DropReason) -> usize {
        self.counts[reason.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DropReason, usize)> + '_ {
        DropReason::ALL.iter().map(|r| (*r, self.get(*r)))
    }
}

impl AddAssign<&DropCounters> for DropCounters {
    fn add_assign(&mut self, other: &DropCounters) {
        for (slot, value) in self.counts.iter_mut().zip(other.counts) {
            *slot += value;
        }
    }
}

/// Final cleaned table, columns named by [`FieldName`].
#[derive(Debug, Clone)]
pub struct SumstatsTable {
    pub df: DataFrame,
}

impl SumstatsTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }
}
