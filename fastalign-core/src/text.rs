use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use crate::dict::Interner;
use crate::error::{AlignError, Result};
use crate::types::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SentencePair {
    pub source: Vec<Token>,
    pub target: Vec<Token>,
}

impl SentencePair {
    /// Swaps roles so the source side becomes the predicted one.
    pub fn reversed(self) -> Self {
        SentencePair { source: self.target, target: self.source }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        !self.source.is_empty() && !self.target.is_empty()
    }

    #[inline]
    pub fn shape(&self) -> LengthPair {
        LengthPair::new(self.target.len(), self.source.len())
    }
}

/// Splits `src tokens ||| tgt tokens` and interns both sides. A line without
/// the separator is all source.
pub fn parse_line<D: Interner>(line: &str, dict: &mut D) -> SentencePair {
    let mut pair = SentencePair::default();
    let mut tokens = line.split_whitespace();
    for w in tokens.by_ref() {
        if w == SEPARATOR {
            break;
        }
        pair.source.push(dict.intern(w));
    }
    pair.target.extend(tokens.map(|w| dict.intern(w)));
    pair
}

/// Where the bitext comes from. Each training pass re-opens it from the start.
#[derive(Clone, Debug)]
pub enum Corpus<'a> {
    File(PathBuf),
    Text(&'a str),
}

impl<'a> Corpus<'a> {
    pub fn name(&self) -> String {
        match self {
            Corpus::File(p) => p.display().to_string(),
            Corpus::Text(_) => "<memory>".to_string(),
        }
    }

    pub fn open(&self) -> Result<Box<dyn BufRead + 'a>> {
        match self {
            Corpus::File(p) => {
                let f = File::open(p).map_err(|source| AlignError::CorpusRead {
                    path: self.name(),
                    source,
                })?;
                Ok(Box::new(BufReader::new(f)))
            }
            Corpus::Text(s) => Ok(Box::new(s.as_bytes())),
        }
    }
}

// Moses alignment writer (per sentence line)
pub fn write_moses(links: &[Vec<Link>], reverse: bool) -> String {
    let mut out = String::new();
    for sent in links {
        let mut first = true;
        for (j, &i) in sent.iter().enumerate() {
            if i == NULL_LINK {
                continue;
            }
            if !first {
                out.push(' ');
            }
            first = false;
            if reverse {
                out.push_str(&format!("{}-{}", j, i));
            } else {
                out.push_str(&format!("{}-{}", i, j));
            }
        }
        out.push('\n');
    }
    out
}

/// Writes already-oriented `(source, target)` pairs.
pub fn write_moses_pairs(pairs: &[Vec<(usize, usize)>]) -> String {
    let mut out = String::new();
    for sent in pairs {
        let line: Vec<String> = sent.iter().map(|(i, j)| format!("{}-{}", i, j)).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::Dict;

    #[test]
    fn parse_splits_on_separator() {
        let mut d = Dict::new();
        let pair = parse_line("a b ||| x y z", &mut d);
        assert_eq!(pair.source, vec![1, 2]);
        assert_eq!(pair.target, vec![3, 4, 5]);
        assert!(pair.is_complete());
        assert_eq!(pair.shape(), LengthPair::new(3, 2));
        assert_eq!(d.get(SEPARATOR), None);
    }

    #[test]
    fn missing_separator_is_all_source() {
        let mut d = Dict::new();
        let pair = parse_line("a b c", &mut d);
        assert_eq!(pair.source.len(), 3);
        assert!(pair.target.is_empty());
        assert!(!pair.is_complete());
    }

    #[test]
    fn only_first_separator_splits() {
        let mut d = Dict::new();
        let pair = parse_line("a ||| b ||| c", &mut d);
        assert_eq!(pair.source.len(), 1);
        assert_eq!(pair.target.len(), 3);
    }

    #[test]
    fn reversed_swaps_sides() {
        let pair = SentencePair { source: vec![1], target: vec![2, 3] }.reversed();
        assert_eq!(pair.source, vec![2, 3]);
        assert_eq!(pair.target, vec![1]);
    }

    #[test]
    fn moses_orientation_and_nulls() {
        let links = vec![vec![1, NULL_LINK, 0], vec![NULL_LINK]];
        assert_eq!(write_moses(&links, false), "1-0 0-2\n\n");
        assert_eq!(write_moses(&links, true), "0-1 2-0\n\n");
    }

    #[test]
    fn moses_pairs() {
        let pairs = vec![vec![(0, 0), (1, 2)], vec![]];
        assert_eq!(write_moses_pairs(&pairs), "0-0 1-2\n\n");
    }

    #[test]
    fn in_memory_corpus_reopens() {
        let corpus = Corpus::Text("a ||| b\nc ||| d\n");
        for _ in 0..2 {
            let lines: Vec<String> = corpus.open().unwrap().lines().map(|l| l.unwrap()).collect();
            assert_eq!(lines, vec!["a ||| b", "c ||| d"]);
        }
    }

    #[test]
    fn missing_file_is_corpus_error() {
        let corpus = Corpus::File(PathBuf::from("/nonexistent/bitext.fr-en"));
        assert!(matches!(corpus.open(), Err(AlignError::CorpusRead { .. })));
    }
}
