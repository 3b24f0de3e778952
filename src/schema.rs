use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::error::{MungeError, Result};
use crate::types::FieldName;

/// Built-in header dictionary. Keys are stored in canonical form.
pub const DEFAULT_CNAMES: &[(&str, FieldName)] = &[
    // rs number
    ("SNP", FieldName::Snp),
    ("MARKERNAME", FieldName::Snp),
    ("SNPID", FieldName::Snp),
    ("SNP_ID", FieldName::Snp),
    ("RS", FieldName::Snp),
    ("RSID", FieldName::Snp),
    ("RS_ID", FieldName::Snp),
    ("RS_NUMBER", FieldName::Snp),
    ("RS_NUMBERS", FieldName::Snp),
    // number of studies
    ("NSTUDY", FieldName::NStudy),
    ("N_STUDY", FieldName::NStudy),
    ("NSTUDIES", FieldName::NStudy),
    ("N_STUDIES", FieldName::NStudy),
    // p-value
    ("P", FieldName::P),
    ("PVALUE", FieldName::P),
    ("P_VALUE", FieldName::P),
    ("PVAL", FieldName::P),
    ("P_VAL", FieldName::P),
    ("GC_PVALUE", FieldName::P),
    // allele 1
    ("A1", FieldName::A1),
    ("ALLELE1", FieldName::A1),
    ("ALLELE_1", FieldName::A1),
    ("EFFECT_ALLELE", FieldName::A1),
    ("REFERENCE_ALLELE", FieldName::A1),
    ("INC_ALLELE", FieldName::A1),
    ("EA", FieldName::A1),
    // allele 2
    ("A2", FieldName::A2),
    ("ALLELE2", FieldName::A2),
    ("ALLELE_2", FieldName::A2),
    ("ALLELE0", FieldName::A2),
    ("OTHER_ALLELE", FieldName::A2),
    ("NON_EFFECT_ALLELE", FieldName::A2),
    ("DEC_ALLELE", FieldName::A2),
    ("NEA", FieldName::A2),
    ("OA", FieldName::A2),
    // sample size
    ("N", FieldName::N),
    ("NCASE", FieldName::NCas),
    ("CASES_N", FieldName::NCas),
    ("N_CASE", FieldName::NCas),
    ("N_CASES", FieldName::NCas),
    ("N_CAS", FieldName::NCas),
    ("N_CONTROLS", FieldName::NCon),
    ("N_CON", FieldName::NCon),
    ("NCONTROL", FieldName::NCon),
    ("CONTROLS_N", FieldName::NCon),
    ("N_CONTROL", FieldName::NCon),
    // METAL writes sample size as WEIGHT
    ("WEIGHT", FieldName::N),
    // signed statistics
    ("ZSCORE", FieldName::Z),
    ("Z_SCORE", FieldName::Z),
    ("GC_ZSCORE", FieldName::Z),
    ("Z", FieldName::Z),
    ("OR", FieldName::Or),
    ("B", FieldName::Beta),
    ("BETA", FieldName::Beta),
    ("LOG_ODDS", FieldName::LogOdds),
    ("EFFECTS", FieldName::Beta),
    ("EFFECT", FieldName::Beta),
    ("SIGNED_SUMSTAT", FieldName::SignedSumstat),
    // imputation quality
    ("INFO", FieldName::Info),
    // allele frequency
    ("EAF", FieldName::Frq),
    ("FRQ", FieldName::Frq),
    ("MAF", FieldName::Frq),
    ("FRQ_U", FieldName::Frq),
    ("F_U", FieldName::Frq),
];

/// Canonical form used for every header comparison: upper case, `-` and `.`
/// become `_`, newlines are removed.
pub fn normalize_header(header: &str) -> String {
    header
        .to_uppercase()
        .replace(['-', '.'], "_")
        .replace('\n', "")
}

pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    headers.iter().map(|h| normalize_header(h)).collect()
}

/// Signed statistic designated on the command line as `label,null`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedSumstatFlag {
    pub label: String,
    pub null_value: f64,
}

impl SignedSumstatFlag {
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || {
            MungeError::InvalidArgument(format!(
                "the argument to --signed-sumstats should be column header comma number, got {value:?}"
            ))
        };
        let (label, null) = value.split_once(',').ok_or_else(invalid)?;
        let label = label.trim();
        if label.is_empty() || null.contains(',') {
            return Err(invalid());
        }
        let null_value = null.trim().parse::<f64>().map_err(|_| invalid())?;
        Ok(Self {
            label: label.to_string(),
            null_value,
        })
    }
}

/// Column-name flags as supplied by the caller. Labels are matched modulo
/// [`normalize_header`].
#[derive(Debug, Clone, Default)]
pub struct ColumnFlags {
    pub snp: Option<String>,
    pub n_col: Option<String>,
    pub n_cas_col: Option<String>,
    pub n_con_col: Option<String>,
    pub a1: Option<String>,
    pub a2: Option<String>,
    pub p: Option<String>,
    pub frq: Option<String>,
    pub info: Option<String>,
    pub info_list: Vec<String>,
    pub nstudy: Option<String>,
    pub signed_sumstats: Option<SignedSumstatFlag>,
    pub ignore: Vec<String>,
}

impl ColumnFlags {
    /// The user-override layer, in flag order.
    pub fn overrides(&self) -> Vec<(String, FieldName)> {
        let options = [
            (&self.nstudy, FieldName::NStudy),
            (&self.snp, FieldName::Snp),
            (&self.n_col, FieldName::N),
            (&self.n_cas_col, FieldName::NCas),
            (&self.n_con_col, FieldName::NCon),
            (&self.a1, FieldName::A1),
            (&self.a2, FieldName::A2),
            (&self.p, FieldName::P),
            (&self.frq, FieldName::Frq),
            (&self.info, FieldName::Info),
        ];
        let mut out: Vec<(String, FieldName)> = options
            .into_iter()
            .filter_map(|(label, field)| label.as_ref().map(|l| (normalize_header(l), field)))
            .collect();
        out.extend(
            self.info_list
                .iter()
                .map(|l| (normalize_header(l), FieldName::Info)),
        );
        if let Some(signed) = &self.signed_sumstats {
            out.push((normalize_header(&signed.label), FieldName::SignedSumstat));
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ColumnMapConfig {
    pub flags: ColumnFlags,
    pub a1_inc: bool,
    pub daner: bool,
    pub daner_n: bool,
}

/// The directional statistic that ends up in SIGNED_SUMSTAT.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedStat {
    /// Raw header the statistic was read from.
    pub label: String,
    pub null_value: f64,
    /// Dictionary field the column was recognised as, if it came from the defaults.
    pub source: Option<FieldName>,
}

#[derive(Debug, Clone)]
pub struct ColumnMap {
    /// Raw header (as written in the file) to field, in file order.
    pub columns: Vec<(String, FieldName)>,
    pub signed: Option<SignedStat>,
    /// Case and control counts inferred from daner `FRQ_A_`/`FRQ_U_` headers.
    pub daner_counts: Option<(f64, f64)>,
    pub info: Vec<String>,
}

impl ColumnMap {
    pub fn contains(&self, field: FieldName) -> bool {
        self.columns.iter().any(|(_, f)| *f == field)
    }

    pub fn field_for(&self, raw: &str) -> Option<FieldName> {
        self.columns
            .iter()
            .find(|(h, _)| h == raw)
            .map(|(_, f)| *f)
    }

    pub fn raw_for(&self, field: FieldName) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|(_, f)| *f == field)
            .map(|(h, _)| h.as_str())
            .collect()
    }

    fn remove_field(&mut self, field: FieldName) {
        self.columns.retain(|(_, f)| *f != field);
    }
}

/// Fold the mapping layers left to right, first writer wins. Anything in
/// `ignore` is excluded from every layer.
pub fn get_cname_map(
    flag: &[(String, FieldName)],
    default: &[(&str, FieldName)],
    ignore: &[String],
) -> HashMap<String, FieldName> {
    let ignored: HashSet<String> = ignore.iter().map(|x| normalize_header(x)).collect();
    let flag_layer = flag.iter().map(|(k, v)| (normalize_header(k), *v));
    let default_layer = default.iter().map(|(k, v)| (normalize_header(k), *v));

    let mut map = HashMap::new();
    for (key, field) in flag_layer.chain(default_layer) {
        if ignored.contains(&key) {
            continue;
        }
        map.entry(key).or_insert(field);
    }
    map
}

pub fn resolve_column_map(file_headers: &[String], config: &ColumnMapConfig) -> Result<ColumnMap> {
    let mut messages = Vec::new();
    let flags = &config.flags;
    let explicit_sign = flags.signed_sumstats.is_some() || config.a1_inc;

    let defaults: Vec<(&str, FieldName)> = DEFAULT_CNAMES
        .iter()
        .copied()
        .filter(|(_, field)| !(explicit_sign && field.is_signed()))
        .collect();
    let mut cname_map = get_cname_map(&flags.overrides(), &defaults, &flags.ignore);

    let mut daner_counts = None;
    if config.daner {
        let frq_u = find_prefixed(file_headers, "FRQ_U_")?;
        let frq_a = find_prefixed(file_headers, "FRQ_A_")?;
        let n_cas = parse_daner_count(frq_a)?;
        let n_con = parse_daner_count(frq_u)?;
        messages.push(format!(
            "Inferred that N_cas = {n_cas}, N_con = {n_con} from the FRQ_[A/U] columns."
        ));
        daner_counts = Some((n_cas, n_con));
        cname_map.retain(|_, field| {
            !matches!(
                field,
                FieldName::N | FieldName::NCas | FieldName::NCon | FieldName::Frq
            )
        });
        cname_map.insert(normalize_header(frq_u), FieldName::Frq);
    }

    if config.daner_n {
        let frq_u = find_prefixed(file_headers, "FRQ_U_")?;
        cname_map.insert(normalize_header(frq_u), FieldName::Frq);
        for (label, field) in [("Nca", FieldName::NCas), ("Nco", FieldName::NCon)] {
            if !file_headers.iter().any(|h| h == label) {
                return Err(MungeError::MalformedHeader(format!(
                    "could not find {label} column expected for daner-n format"
                )));
            }
            cname_map.insert(normalize_header(label), field);
        }
    }

    let mut columns: Vec<(String, FieldName)> = Vec::new();
    for raw in file_headers {
        if let Some(field) = cname_map.get(&normalize_header(raw))
            && !columns.iter().any(|(h, _)| h == raw)
        {
            columns.push((raw.clone(), *field));
        }
    }

    let signed = if !explicit_sign {
        let sign_cols: Vec<(String, FieldName)> = columns
            .iter()
            .filter(|(_, f)| f.is_signed())
            .cloned()
            .collect();
        if sign_cols.len() > 1 {
            return Err(MungeError::AmbiguousSignedColumns(
                sign_cols.into_iter().map(|(h, _)| h).collect(),
            ));
        }
        let (label, source) = sign_cols
            .into_iter()
            .next()
            .ok_or(MungeError::NoSignedColumn)?;
        for entry in columns.iter_mut() {
            if entry.0 == label {
                entry.1 = FieldName::SignedSumstat;
            }
        }
        Some(SignedStat {
            label,
            null_value: source.null_value().unwrap_or(0.0),
            source: Some(source),
        })
    } else if let Some(flag) = &flags.signed_sumstats {
        let label = columns
            .iter()
            .find(|(_, f)| *f == FieldName::SignedSumstat)
            .map(|(h, _)| h.clone())
            .unwrap_or_else(|| flag.label.clone());
        Some(SignedStat {
            label,
            null_value: flag.null_value,
            source: None,
        })
    } else {
        None
    };

    for (raw, _) in &columns {
        let count = file_headers.iter().filter(|h| *h == raw).count();
        if count > 1 {
            return Err(MungeError::DuplicateRawHeader {
                header: raw.clone(),
                count,
            });
        }
    }

    for field in FieldName::ALL {
        // several INFO columns are averaged rather than rejected
        if field == FieldName::Info {
            continue;
        }
        let count = columns.iter().filter(|(_, f)| *f == field).count();
        if count > 1 {
            return Err(MungeError::DuplicateTargetField { field, count });
        }
    }

    Ok(ColumnMap {
        columns,
        signed,
        daner_counts,
        info: messages,
    })
}

fn find_prefixed<'a>(headers: &'a [String], prefix: &str) -> Result<&'a str> {
    headers
        .iter()
        .find(|h| h.starts_with(prefix))
        .map(String::as_str)
        .ok_or_else(|| {
            MungeError::MalformedHeader(format!(
                "could not find a {prefix}* column expected for daner format"
            ))
        })
}

fn parse_daner_count(header: &str) -> Result<f64> {
    header[6..].parse::<f64>().map_err(|_| {
        MungeError::MalformedHeader(format!("could not read a sample size from {header}"))
    })
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaRequirements {
    pub alleles_required: bool,
    pub a1_inc: bool,
    /// A constant N (or case and control counts) is known without a column.
    pub n_fixed: bool,
}

/// Check that the resolved map can serve the requested output mode. NSTUDY is
/// dropped when a per-row sample size is available.
pub fn validate_column_map(map: &mut ColumnMap, req: &SchemaRequirements) -> Result<()> {
    let mut required = vec![FieldName::Snp, FieldName::P];
    if !req.a1_inc {
        required.push(FieldName::SignedSumstat);
    }
    for field in required {
        if !map.contains(field) {
            return Err(MungeError::MissingColumn(field));
        }
    }

    let has_n = map.contains(FieldName::N);
    let has_cas_con = map.contains(FieldName::NCas) && map.contains(FieldName::NCon);
    if !req.n_fixed && !has_n && !has_cas_con {
        return Err(MungeError::MissingSampleSize);
    }
    if (has_n || has_cas_con) && map.contains(FieldName::NStudy) {
        info!("Ignoring NSTUDY column because a sample size column is present.");
        map.remove_field(FieldName::NStudy);
    }

    if req.alleles_required && !(map.contains(FieldName::A1) && map.contains(FieldName::A2)) {
        return Err(MungeError::MissingAlleles);
    }
    Ok(())
}

/// Human-readable interpretation of each mapped column.
pub fn describe_columns(map: &ColumnMap) -> Vec<String> {
    map.columns
        .iter()
        .map(|(raw, field)| format!("{raw}:\t{}", field.description()))
        .collect()
}
