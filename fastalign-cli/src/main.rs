use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use fastalign_core::{grow_diag_final_and, write_moses_pairs, AlignOptions, AlignResult, Aligner, Corpus};
use log::{info, LevelFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fast word alignment with a diagonal-favoring IBM Model 2")]
struct Args {
    /// Input parallel corpus, one `source ||| target` pair per line
    #[arg(short = 'i', long = "input")]
    input: PathBuf,
    /// TOML file with alignment options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Use a Dirichlet prior on lexical translation distributions
    #[arg(short = 'v', long = "variational-bayes")]
    variational_bayes: bool,
    /// Favor alignment points close to the monotonic diagonal
    #[arg(short = 'd', long = "favor-diagonal")]
    favor_diagonal: bool,
    /// Optimize how close to the diagonal alignment points should be
    #[arg(short = 'o', long = "optimize-tension")]
    optimize_tension: bool,
    /// Run alignment in reverse (condition on target and predict source)
    #[arg(short = 'r', long = "reverse")]
    reverse: bool,
    /// Write the conditional probability table to this file (the forward one under --symmetrize)
    #[arg(short = 'c', long = "conditional-probabilities")]
    conditional_probabilities: Option<PathBuf>,
    /// Start with an existing conditional probability table
    #[arg(short = 'e', long = "existing-probabilities")]
    existing_probabilities: Option<PathBuf>,
    /// Number of EM iterations (default 5)
    #[arg(short = 'I', long = "iterations")]
    iterations: Option<usize>,
    /// p_null parameter (default 0.08)
    #[arg(short = 'p', long = "p0")]
    prob_align_null: Option<f64>,
    /// No null word
    #[arg(short = 'N', long = "no-null-word")]
    no_null_word: bool,
    /// Alpha parameter for the optional Dirichlet prior (default 0.01)
    #[arg(short = 'a', long = "alpha")]
    alpha: Option<f64>,
    /// Starting lambda for the diagonal distance parameter (default 4)
    #[arg(short = 'T', long = "diagonal-tension")]
    diagonal_tension: Option<f64>,
    /// Align in both directions and print the grow-diag-final-and merge
    #[arg(long, conflicts_with = "reverse")]
    symmetrize: bool,
    /// Write alignments here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    quiet: bool,
}

impl Args {
    fn options(&self) -> Result<AlignOptions> {
        let mut opts = match &self.config {
            Some(p) => AlignOptions::load_toml(p).with_context(|| format!("loading config {}", p.display()))?,
            None => AlignOptions::default(),
        };
        opts.variational_bayes |= self.variational_bayes;
        opts.favor_diagonal |= self.favor_diagonal;
        opts.optimize_tension |= self.optimize_tension;
        opts.reverse |= self.reverse;
        opts.no_null_word |= self.no_null_word;
        if let Some(v) = self.iterations { opts.iterations = v; }
        if let Some(v) = self.prob_align_null { opts.prob_align_null = v; }
        if let Some(v) = self.alpha { opts.alpha = v; }
        if let Some(v) = self.diagonal_tension { opts.diagonal_tension = v; }
        opts.validate()?;
        Ok(opts)
    }
}

fn init_logging(quiet: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(LevelFilter::Warn);
    }
    let _ = builder.try_init();
}

fn train(opts: AlignOptions, seed: Option<&PathBuf>, corpus: &Corpus<'_>) -> Result<(Aligner, AlignResult)> {
    let mut aligner = Aligner::new(opts)?;
    if let Some(p) = seed {
        aligner
            .import_table(p)
            .with_context(|| format!("can't read table {}", p.display()))?;
    }
    let res = aligner.train(corpus)?;
    Ok((aligner, res))
}

fn write_all(path: Option<&PathBuf>, data: &str) -> std::io::Result<()> {
    match path {
        Some(p) => fs::write(p, data),
        None => {
            print!("{data}");
            Ok(())
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let opts = args.options()?;
    let corpus = Corpus::File(args.input.clone());

    let (aligner, links) = if args.symmetrize {
        // an existing table is conditioned on the forward direction
        let seed = args.existing_probabilities.as_ref();
        let (fwd_aligner, fwd) = train(AlignOptions { reverse: false, ..opts.clone() }, seed, &corpus)?;
        let (_, rev) = train(AlignOptions { reverse: true, ..opts }, None, &corpus)?;
        let merged = grow_diag_final_and(&fwd.links, &rev.links)?;
        (fwd_aligner, write_moses_pairs(&merged))
    } else {
        let (aligner, res) = train(opts, args.existing_probabilities.as_ref(), &corpus)?;
        let links = res.to_moses();
        (aligner, links)
    };

    write_all(args.output.as_ref(), &links).context("writing alignments")?;
    if let Some(p) = &args.conditional_probabilities {
        info!("conditional probabilities: {}", p.display());
        aligner.export_table(p)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet);
    run(&args)
}
