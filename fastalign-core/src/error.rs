//! Error taxonomy for training, decoding and table persistence.

use std::io;
use std::path::PathBuf;

pub type Result<T, E = AlignError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Variational Bayes needs a strictly positive Dirichlet pseudo-count.
    #[error("--alpha must be > 0 when variational Bayes is enabled (got {0})")]
    InvalidAlpha(f64),

    #[error("null alignment probability must lie in [0, 1) (got {0})")]
    InvalidNullProbability(f64),

    #[error("diagonal tension must be finite and non-negative (got {0})")]
    InvalidTension(f64),

    #[error("can't read {path}: {source}")]
    CorpusRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("can't read {0}: corpus is empty")]
    EmptyCorpus(String),

    /// A sentence pair with an empty source or target side. `line_no` is 1-based.
    #[error("error in line {line_no}\n{line}")]
    MalformedLine { line_no: usize, line: String },

    #[error("can't read table {path}: {source}")]
    TableRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed row {line_no} in table {path}: {line:?}")]
    MalformedTable {
        path: PathBuf,
        line_no: usize,
        line: String,
    },

    #[error("can't write table {path}: {source}")]
    TableWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot symmetrize: {0}")]
    Symmetrize(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),
}
