//! Lexical translation table `p(target | source)`.
//!
//! The table holds two layers: the probabilities produced by the last
//! normalization, which every `prob` query reads, and the fractional counts
//! the current pass is accumulating. Normalizing turns the counts into the new
//! probabilities and starts an empty count layer, so queries made during a pass
//! never see that pass's own counts.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::dict::Interner;
use crate::error::{AlignError, Result};
use crate::types::{Token, PROB_FLOOR};

type Row = HashMap<Token, f64>;

#[derive(Clone, Debug, Default)]
pub struct TTable {
    probs: HashMap<Token, Row>,
    // probability of targets a smoothed row never observed
    unseen: HashMap<Token, f64>,
    counts: HashMap<Token, Row>,
    targets: HashSet<Token>,
}

impl TTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn prob(&self, e: Token, f: Token) -> f64 {
        if let Some(row) = self.probs.get(&e) {
            if let Some(&p) = row.get(&f) {
                return p;
            }
            if let Some(&p) = self.unseen.get(&e) {
                return p;
            }
        }
        PROB_FLOOR
    }

    #[inline]
    pub fn increment(&mut self, e: Token, f: Token, x: f64) {
        debug_assert!(x >= 0.0);
        *self.counts.entry(e).or_default().entry(f).or_insert(0.0) += x;
        self.targets.insert(f);
    }

    /// Maximum-likelihood re-estimation: each source row becomes
    /// `count(e, f) / Σ_f' count(e, f')`.
    pub fn normalize(&mut self) {
        self.swap_counts();
        for row in self.probs.values_mut() {
            let tot: f64 = row.values().sum();
            if tot > 0.0 {
                for p in row.values_mut() {
                    *p /= tot;
                }
            }
            row.retain(|_, p| *p > 0.0);
        }
        self.probs.retain(|_, row| !row.is_empty());
    }

    /// Re-estimation under a symmetric Dirichlet prior: `alpha` is added to
    /// every cell of the known target vocabulary before normalizing, so
    /// unobserved targets of a row keep `alpha / (Σ count + alpha * V)`.
    pub fn normalize_vb(&mut self, alpha: f64) {
        debug_assert!(alpha > 0.0);
        self.swap_counts();
        let vocab = self.targets.len() as f64;
        for (&e, row) in self.probs.iter_mut() {
            let tot = row.values().sum::<f64>() + alpha * vocab;
            for p in row.values_mut() {
                *p = (*p + alpha) / tot;
            }
            self.unseen.insert(e, alpha / tot);
        }
    }

    fn swap_counts(&mut self) {
        std::mem::swap(&mut self.probs, &mut self.counts);
        self.counts.clear();
        self.unseen.clear();
    }

    /// Fractional count accumulated since the last normalization.
    pub fn pending_mass(&self) -> f64 {
        self.counts.values().flat_map(|row| row.values()).sum()
    }

    /// Number of stored (source, target) probabilities.
    pub fn len(&self) -> usize {
        self.probs.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Every target id the table has counted or imported.
    pub fn targets(&self) -> impl Iterator<Item = Token> + '_ {
        self.targets.iter().copied()
    }

    pub fn sources(&self) -> impl Iterator<Item = Token> + '_ {
        self.probs.keys().copied()
    }

    /// Observed cells of one source row.
    pub fn row(&self, e: Token) -> impl Iterator<Item = (Token, f64)> + '_ {
        self.probs.get(&e).into_iter().flat_map(|row| row.iter().map(|(&f, &p)| (f, p)))
    }

    /// Writes `source \t target \t probability` rows sorted by surface form.
    pub fn export_to_writer<W: Write, D: Interner>(&self, w: &mut W, dict: &D) -> io::Result<()> {
        let mut rows: Vec<(&str, &str, f64)> = Vec::with_capacity(self.len());
        for (&e, row) in &self.probs {
            let src = surface(dict, e)?;
            for (&f, &p) in row {
                rows.push((src, surface(dict, f)?, p));
            }
        }
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        for (src, tgt, p) in rows {
            writeln!(w, "{}\t{}\t{}", src, tgt, p)?;
        }
        Ok(())
    }

    pub fn export_to_file<P: AsRef<Path>, D: Interner>(&self, path: P, dict: &D) -> Result<()> {
        let path = path.as_ref();
        let write_err = |source| AlignError::TableWrite { path: path.to_path_buf(), source };
        let f = File::create(path).map_err(write_err)?;
        let mut w = BufWriter::new(f);
        self.export_to_writer(&mut w, dict).map_err(write_err)?;
        w.flush().map_err(write_err)?;
        debug!("exported {} table entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Loads rows written by [`TTable::export_to_writer`] as normalized
    /// probabilities. `origin` names the source in error messages.
    pub fn import_from_reader<R: BufRead, D: Interner>(
        &mut self,
        r: R,
        origin: &Path,
        dict: &mut D,
    ) -> Result<()> {
        for (n, line) in r.lines().enumerate() {
            let line = line.map_err(|source| AlignError::TableRead { path: origin.to_path_buf(), source })?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || AlignError::MalformedTable {
                path: origin.to_path_buf(),
                line_no: n + 1,
                line: line.clone(),
            };
            let mut fields = line.split('\t');
            let (Some(src), Some(tgt), Some(p), None) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(malformed());
            };
            let p: f64 = p.trim().parse().map_err(|_| malformed())?;
            if src.is_empty() || tgt.is_empty() || !p.is_finite() || p <= 0.0 || p > 1.0 {
                return Err(malformed());
            }
            let e = dict.intern(src);
            let f = dict.intern(tgt);
            self.probs.entry(e).or_default().insert(f, p);
            self.targets.insert(f);
        }
        Ok(())
    }

    pub fn import_from_file<P: AsRef<Path>, D: Interner>(&mut self, path: P, dict: &mut D) -> Result<()> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|source| AlignError::TableRead { path: path.to_path_buf(), source })?;
        self.import_from_reader(BufReader::new(f), path, dict)?;
        debug!("imported {} table entries from {}", self.len(), path.display());
        Ok(())
    }
}

fn surface<D: Interner>(dict: &D, id: Token) -> io::Result<&str> {
    dict.lookup(id).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, format!("token id {} has no surface form", id))
    })
}
