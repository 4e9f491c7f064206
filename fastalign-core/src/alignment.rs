use std::collections::BTreeMap;
use std::f64::consts::LN_2;
use std::io::BufRead;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::diagonal::{compute_d_log_z, compute_z, feature, unnormalized_prob};
use crate::dict::{Dict, Interner};
use crate::error::{AlignError, Result};
use crate::text::{parse_line, write_moses, Corpus, SentencePair};
use crate::ttable::TTable;
use crate::types::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignOptions {
    /// EM passes before the final decoding pass.
    pub iterations: usize,
    pub favor_diagonal: bool,
    pub optimize_tension: bool,
    pub variational_bayes: bool,
    /// Dirichlet pseudo-count, only read when `variational_bayes` is set.
    pub alpha: f64,
    pub prob_align_null: f64,
    pub no_null_word: bool,
    pub diagonal_tension: f64,
    /// Condition on the target side and predict the source.
    pub reverse: bool,
}

impl Default for AlignOptions {
    fn default() -> Self {
        AlignOptions {
            iterations: 5,
            favor_diagonal: false,
            optimize_tension: false,
            variational_bayes: false,
            alpha: 0.01,
            prob_align_null: 0.08,
            no_null_word: false,
            diagonal_tension: 4.0,
            reverse: false,
        }
    }
}

impl AlignOptions {
    pub fn validate(&self) -> Result<()> {
        if self.variational_bayes && !(self.alpha > 0.0) {
            return Err(AlignError::InvalidAlpha(self.alpha));
        }
        if !(0.0..1.0).contains(&self.prob_align_null) {
            return Err(AlignError::InvalidNullProbability(self.prob_align_null));
        }
        if !self.diagonal_tension.is_finite() || self.diagonal_tension < 0.0 {
            return Err(AlignError::InvalidTension(self.diagonal_tension));
        }
        Ok(())
    }

    #[inline]
    pub fn use_null(&self) -> bool {
        !self.no_null_word
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Occurrences of each sentence-pair shape, gathered on the first pass.
pub type LengthPairStats = BTreeMap<LengthPair, u64>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Iterating(usize),
    Decoding,
}

/// Running corpus statistics of one pass.
#[derive(Clone, Debug, Default)]
struct PassAccumulator {
    lines: usize,
    target_tokens: usize,
    likelihood: f64,
    null_mass: f64,
    emp_feat: f64,
    len_ratio: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PassReport {
    pub pass: Pass,
    /// Natural-log corpus likelihood.
    pub likelihood: f64,
    pub log2_likelihood: f64,
    pub cross_entropy: f64,
    pub perplexity: f64,
    pub posterior_null: f64,
    pub posterior_feature: f64,
    /// Tension in effect after the pass.
    pub tension: f64,
    pub size_counts: usize,
}

#[derive(Clone, Debug)]
pub struct AlignResult {
    /// Per sentence, per (conditioning-side) target position: the winning
    /// source position or [`NULL_LINK`].
    pub links: Vec<Vec<Link>>,
    pub reports: Vec<PassReport>,
    pub tension: f64,
    pub mean_srclen_multiplier: f64,
    pub reverse: bool,
}

impl AlignResult {
    pub fn to_moses(&self) -> String {
        write_moses(&self.links, self.reverse)
    }
}

pub struct Aligner<D: Interner = Dict> {
    opts: AlignOptions,
    dict: D,
    null: Token,
    ttable: TTable,
    tension: f64,
    size_counts: LengthPairStats,
    mean_srclen_multiplier: f64,
    passes_run: usize,
}

impl Aligner<Dict> {
    pub fn new(opts: AlignOptions) -> Result<Self> {
        Self::with_dict(opts, Dict::new())
    }
}

impl<D: Interner> Aligner<D> {
    pub fn with_dict(opts: AlignOptions, mut dict: D) -> Result<Self> {
        opts.validate()?;
        let null = dict.intern(NULL_WORD);
        Ok(Aligner {
            tension: opts.diagonal_tension,
            opts,
            dict,
            null,
            ttable: TTable::new(),
            size_counts: LengthPairStats::new(),
            mean_srclen_multiplier: 0.0,
            passes_run: 0,
        })
    }

    /// Seeds the first pass with a previously exported table.
    pub fn import_table<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.ttable.import_from_file(path, &mut self.dict)
    }

    pub fn import_table_from_reader<R: BufRead>(&mut self, r: R, origin: &Path) -> Result<()> {
        self.ttable.import_from_reader(r, origin, &mut self.dict)
    }

    pub fn export_table<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.ttable.export_to_file(path, &self.dict)
    }

    pub fn options(&self) -> &AlignOptions {
        &self.opts
    }

    pub fn ttable(&self) -> &TTable {
        &self.ttable
    }

    pub fn dict(&self) -> &D {
        &self.dict
    }

    pub fn tension(&self) -> f64 {
        self.tension
    }

    pub fn size_counts(&self) -> &LengthPairStats {
        &self.size_counts
    }

    /// Runs every EM pass and then the decoding pass over `corpus`.
    ///
    /// Each call starts from the configured tension and gathers fresh length
    /// statistics; the translation table carries over, so a second call
    /// continues from what the first one learned.
    pub fn train(&mut self, corpus: &Corpus<'_>) -> Result<AlignResult> {
        self.reset_run();
        let mut reports = Vec::with_capacity(self.opts.iterations + 1);
        for k in 0..self.opts.iterations {
            let (report, _) = self.run_pass(corpus, Pass::Iterating(k))?;
            reports.push(report);
        }
        let (report, links) = self.run_pass(corpus, Pass::Decoding)?;
        reports.push(report);
        Ok(AlignResult {
            links,
            reports,
            tension: self.tension,
            mean_srclen_multiplier: self.mean_srclen_multiplier,
            reverse: self.opts.reverse,
        })
    }

    fn reset_run(&mut self) {
        self.tension = self.opts.diagonal_tension;
        self.size_counts.clear();
        self.mean_srclen_multiplier = 0.0;
        self.passes_run = 0;
    }

    fn run_pass(&mut self, corpus: &Corpus<'_>, pass: Pass) -> Result<(PassReport, Vec<Vec<Link>>)> {
        let decoding = pass == Pass::Decoding;
        let first_pass = self.passes_run == 0;
        info!("ITERATION {}{}", self.passes_run + 1, if decoding { " (FINAL)" } else { "" });

        let reader = corpus.open()?;
        let mut acc = PassAccumulator::default();
        let mut links = Vec::new();
        let mut probs = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|source| AlignError::CorpusRead { path: corpus.name(), source })?;
            acc.lines += 1;
            if acc.lines % 1000 == 0 {
                debug!("[{}]", acc.lines);
            }
            let mut pair = parse_line(&line, &mut self.dict);
            if self.opts.reverse {
                pair = pair.reversed();
            }
            if !pair.is_complete() {
                return Err(AlignError::MalformedLine { line_no: acc.lines, line });
            }
            if first_pass {
                acc.len_ratio += pair.target.len() as f64 / pair.source.len() as f64;
                *self.size_counts.entry(pair.shape()).or_insert(0) += 1;
            }
            acc.target_tokens += pair.target.len();
            let sent = self.process_pair(&pair, decoding, &mut acc, &mut probs);
            if decoding {
                links.push(sent);
            }
        }
        if acc.lines == 0 {
            return Err(AlignError::EmptyCorpus(corpus.name()));
        }

        if first_pass {
            self.mean_srclen_multiplier = acc.len_ratio / acc.lines as f64;
            info!("expected target length = source length * {}", self.mean_srclen_multiplier);
        }
        let toks = acc.target_tokens as f64;
        let emp_feat = acc.emp_feat / toks;
        let log2_likelihood = acc.likelihood / LN_2;
        let cross_entropy = -log2_likelihood / toks;
        info!("  log_e likelihood: {}", acc.likelihood);
        info!("  log_2 likelihood: {}", log2_likelihood);
        info!("     cross entropy: {}", cross_entropy);
        info!("        perplexity: {}", cross_entropy.exp2());
        info!("      posterior p0: {}", acc.null_mass / toks);
        info!(" posterior al-feat: {}", emp_feat);
        info!("       size counts: {}", self.size_counts.len());

        if let Pass::Iterating(k) = pass {
            if self.opts.favor_diagonal && self.opts.optimize_tension && k > 0 {
                self.optimize_tension(emp_feat, toks);
            }
            if self.opts.variational_bayes {
                self.ttable.normalize_vb(self.opts.alpha);
            } else {
                self.ttable.normalize();
            }
        }
        self.passes_run += 1;

        let report = PassReport {
            pass,
            likelihood: acc.likelihood,
            log2_likelihood,
            cross_entropy,
            perplexity: cross_entropy.exp2(),
            posterior_null: acc.null_mass / toks,
            posterior_feature: emp_feat,
            tension: self.tension,
            size_counts: self.size_counts.len(),
        };
        Ok((report, links))
    }

    /// E-step for one sentence pair. Accumulates fractional counts, or when
    /// `decoding` returns the best link of every target position instead.
    fn process_pair(
        &mut self,
        pair: &SentencePair,
        decoding: bool,
        acc: &mut PassAccumulator,
        probs: &mut Vec<f64>,
    ) -> Vec<Link> {
        let use_null = self.opts.use_null();
        let favor = self.opts.favor_diagonal;
        let p_null = self.opts.prob_align_null;
        let tl = pair.target.len();
        let sl = pair.source.len();
        let mut sent = Vec::with_capacity(if decoding { tl } else { 0 });

        for (j, &f) in pair.target.iter().enumerate() {
            probs.clear();
            probs.resize(sl + 1, 0.0);
            let mut sum = 0.0;
            // uniform (model 1)
            let mut prob_a_i = 1.0 / (sl + use_null as usize) as f64;
            if use_null {
                if favor {
                    prob_a_i = p_null;
                }
                probs[0] = self.ttable.prob(self.null, f) * prob_a_i;
                sum += probs[0];
            }
            let az = if favor { compute_z(j + 1, tl, sl, self.tension) / (1.0 - p_null) } else { 0.0 };
            for (i, &e) in pair.source.iter().enumerate() {
                if favor {
                    prob_a_i = unnormalized_prob(j + 1, i + 1, tl, sl, self.tension) / az;
                }
                probs[i + 1] = self.ttable.prob(e, f) * prob_a_i;
                sum += probs[i + 1];
            }

            if decoding {
                sent.push(viterbi(probs, use_null));
            } else {
                if use_null {
                    let count = probs[0] / sum;
                    acc.null_mass += count;
                    self.ttable.increment(self.null, f, count);
                }
                for (i, &e) in pair.source.iter().enumerate() {
                    let p = probs[i + 1] / sum;
                    self.ttable.increment(e, f, p);
                    acc.emp_feat += feature(j, i + 1, tl, sl) * p;
                }
            }
            acc.likelihood += sum.ln();
        }
        sent
    }

    /// Gradient ascent on the tension so the expected diagonal feature under
    /// the prior matches the posterior one.
    fn optimize_tension(&mut self, emp_feat: f64, toks: f64) {
        for step in 0..TENSION_STEPS {
            let mut mod_feat = 0.0;
            for (shape, &count) in &self.size_counts {
                for j in 1..=shape.target {
                    mod_feat += count as f64 * compute_d_log_z(j, shape.target, shape.source, self.tension);
                }
            }
            mod_feat /= toks;
            info!("  {}  model al-feat: {} (tension={})", step + 1, mod_feat, self.tension);
            self.tension = clamp_tension(self.tension + (emp_feat - mod_feat) * TENSION_LEARNING_RATE);
        }
        info!("     final tension: {}", self.tension);
    }
}

/// Highest-weight candidate; ties go to the null word, then the lowest source position.
fn viterbi(probs: &[f64], use_null: bool) -> Link {
    let mut best = NULL_LINK;
    let mut max_p = if use_null { probs[0] } else { -1.0 };
    for (i, &p) in probs.iter().enumerate().skip(1) {
        if p > max_p {
            max_p = p;
            best = (i - 1) as Link;
        }
    }
    best
}

/// Trains on `corpus` with a fresh dictionary and returns the decoded alignment.
pub fn align(corpus: &Corpus<'_>, opts: &AlignOptions) -> Result<AlignResult> {
    Aligner::new(opts.clone())?.train(corpus)
}
