//! Normalization of GWAS summary statistics into the `.sumstats` format read
//! by LD score regression.

pub mod error;
pub mod logging;
pub mod types;

pub mod df_utils;
pub mod io;
pub mod qc;
pub mod schema;
pub mod utils;

pub mod merge;
pub mod metadata;
pub mod munge;
pub mod pipeline;
pub mod sample_size;
pub mod signed;
