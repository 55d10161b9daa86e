//! codec-sweep CLI - batch codec evaluation over a corpus directory

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use colored::Colorize;

use codec_sweep::{Sweep, SweepConfig, report};

/// Sweep a corpus of reference images across codec adapters and bit-rate
/// targets, producing per-image metric matrices and a run summary.
#[derive(Parser)]
#[command(name = "codec-sweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Corpus class directory to sweep (its name carries the class tag,
    /// e.g. classA, classB, classE, classE_exr)
    corpus: PathBuf,

    /// Working directory holding adapters, caches and outputs
    #[arg(short, long, default_value = ".")]
    workdir: PathBuf,

    /// Sweep only these codecs (repeatable)
    #[arg(long = "codec")]
    codecs: Vec<String>,

    /// Override the bit-rate target set (repeatable)
    #[arg(long = "bpp")]
    bpp_targets: Vec<f64>,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        println!("{} {e:#}", "[ERROR]".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = SweepConfig::new(&cli.workdir);

    let available = preflight(&config)?;
    config.retain_codecs(&available);
    if !cli.codecs.is_empty() {
        config.retain_codecs(&cli.codecs);
    }
    if config.codecs.is_empty() {
        anyhow::bail!("no codecs left to sweep after adapter/filter selection");
    }
    if !cli.bpp_targets.is_empty() {
        config = config.with_bpp_targets(cli.bpp_targets.clone());
    }

    let sweep = Sweep::new(config);
    let records = sweep
        .run_corpus(&cli.corpus)
        .with_context(|| format!("sweeping `{}`", cli.corpus.display()))?;

    let summary = sweep.config().layout.metrics_dir().join("summary.csv");
    report::write_csv_summary(&summary, chrono::Utc::now(), &records)
        .with_context(|| format!("writing `{}`", summary.display()))?;

    println!(
        "{} {} tuples, summary at {}",
        "[DONE]".green().bold(),
        records.len(),
        summary.display()
    );
    Ok(())
}

/// Check the adapter directories and return the codec names. Every adapter
/// must come as a matching encode/decode pair; one-sided scripts are listed
/// and abort the run.
fn preflight(config: &SweepConfig) -> anyhow::Result<Vec<String>> {
    let encoders = adapter_names(&config.layout.encode_adapter_dir())?;
    let decoders = adapter_names(&config.layout.decode_adapter_dir())?;

    let mut mismatched = false;
    for name in encoders.difference(&decoders) {
        println!(
            "{} encode adapter `{name}` has no decode counterpart",
            "[ERROR]".red().bold()
        );
        mismatched = true;
    }
    for name in decoders.difference(&encoders) {
        println!(
            "{} decode adapter `{name}` has no encode counterpart",
            "[ERROR]".red().bold()
        );
        mismatched = true;
    }
    if mismatched {
        anyhow::bail!("encode/ and decode/ adapter sets do not match");
    }
    if encoders.is_empty() {
        anyhow::bail!("no codec adapters (need matching encode/ and decode/ scripts)");
    }
    Ok(encoders.into_iter().collect())
}

fn adapter_names(dir: &Path) -> anyhow::Result<BTreeSet<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("adapter directory `{}`", dir.display()))?;
    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry?;
        if entry.path().is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
