//! Word alignment with a diagonal-favoring reparameterization of IBM Model 2,
//! trained with EM.

pub mod types;
pub mod error;
pub mod diagonal;
pub mod dict;
pub mod text;
pub mod ttable;
pub mod alignment;
pub mod symmetrize;

pub use alignment::{align, AlignOptions, AlignResult, Aligner, Pass, PassReport};
pub use dict::{Dict, Interner};
pub use error::{AlignError, Result};
pub use symmetrize::grow_diag_final_and;
pub use text::{parse_line, write_moses, write_moses_pairs, Corpus, SentencePair};
pub use ttable::TTable;
