//! Typinfer CLI - infer unknown grammatical properties from typological data
//!
//! Usage:
//!   typinfer infer --dataset d.json --property 81A --property GB020 \
//!       --pin 87A=1 --observe 81A=1:3,2:1 --cycles 3
//!   typinfer validate --dataset d.json --observed 81A --unknown 87A,GB020
//!
//! Logging honours `RUST_LOG`; `--verbose` raises the default to debug.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use typinfer_core::{
    BeliefVector, BuildReport, Consensus, CycleDiagnostics, InferenceConfig, InferenceGraph,
    LeaveOneOut, ReferencePopulation, TypologyCorpus, TypologyProvider, ValidationConfig,
    ValidationReport,
};

#[derive(Parser)]
#[command(name = "typinfer")]
#[command(version)]
#[command(about = "Typological inference by belief propagation")]
#[command(
    long_about = "Infer unknown grammatical properties of a language from a few observed ones, \
                  using priors and pairwise potentials mined from WALS and Grambank data"
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a graph for one language and run update cycles
    Infer(InferArgs),
    /// Leave-one-out validation over the dataset's languages
    Validate(ValidateArgs),
}

#[derive(Args)]
struct InferArgs {
    /// JSON dataset file
    #[arg(short, long, value_name = "FILE")]
    dataset: PathBuf,

    /// Properties to include (repeatable or comma separated)
    #[arg(short, long = "property", value_name = "NAME", value_delimiter = ',', required = true)]
    properties: Vec<String>,

    /// Observation counts: PROPERTY=VALUE:COUNT[,VALUE:COUNT...]
    #[arg(long, value_name = "EXPR")]
    observe: Vec<String>,

    /// Locked peak belief: PROPERTY=VALUE[@PROBABILITY]
    #[arg(long, value_name = "EXPR")]
    pin: Vec<String>,

    /// Number of update cycles
    #[arg(short, long, default_value_t = 3)]
    cycles: usize,

    /// Label for the target language
    #[arg(long, default_value = "target")]
    name: String,

    /// Seed for the propagation path
    #[arg(long)]
    seed: Option<u64>,

    /// InferenceConfig as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// JSON dataset file
    #[arg(short, long, value_name = "FILE")]
    dataset: PathBuf,

    /// Properties locked to each held-out language's true values
    #[arg(long, value_name = "NAME", value_delimiter = ',', required = true)]
    observed: Vec<String>,

    /// Properties predicted and scored
    #[arg(long, value_name = "NAME", value_delimiter = ',', required = true)]
    unknown: Vec<String>,

    /// Restrict evaluation to these language ids
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    languages: Vec<String>,

    #[arg(long)]
    cycles: Option<usize>,

    #[arg(long)]
    epochs: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// ValidationConfig as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct InferOutput<'a> {
    language: &'a str,
    build: &'a BuildReport,
    cycles: Vec<CycleDiagnostics>,
    consensus: BTreeMap<String, Consensus>,
    beliefs: BTreeMap<String, BeliefVector>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Infer(args) => infer(args),
        Command::Validate(args) => validate(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "typinfer=debug,typinfer_core=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_corpus(path: &Path) -> Result<TypologyCorpus> {
    let file = File::open(path).with_context(|| format!("opening dataset {}", path.display()))?;
    let corpus = TypologyCorpus::from_json_reader(BufReader::new(file))
        .with_context(|| format!("loading dataset {}", path.display()))?;
    info!(
        path = %path.display(),
        languages = corpus.languages().len(),
        "dataset loaded"
    );
    Ok(corpus)
}

fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        None => Ok(T::default()),
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing config {}", path.display()))
        }
    }
}

fn infer(args: InferArgs) -> Result<()> {
    let corpus = load_corpus(&args.dataset)?;
    let mut config: InferenceConfig = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut graph = InferenceGraph::build(
        args.name.as_str(),
        &args.properties,
        &corpus,
        &ReferencePopulation::All,
        config,
    )?;

    for raw in &args.pin {
        let (property, value, probability) = parse_pin(raw)?;
        graph
            .inject_peak_belief(property, value, probability, true)
            .with_context(|| format!("--pin {}", raw))?;
    }
    for raw in &args.observe {
        let (property, counts) = parse_observation(raw)?;
        graph
            .add_observation(property, counts)
            .with_context(|| format!("--observe {}", raw))?;
    }

    let cycles = graph.run_cycles(args.cycles);
    let output = InferOutput {
        language: graph.name(),
        build: graph.build_report(),
        cycles,
        consensus: graph.consensus(),
        beliefs: graph.beliefs(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_inference(&output);
    }
    Ok(())
}

fn print_inference(output: &InferOutput<'_>) {
    println!("Language '{}'", output.language);
    println!(
        "  {} properties, {} edges, {} cycles",
        output.build.resolved.len(),
        output.build.edge_count,
        output.cycles.len()
    );
    if !output.build.unresolved.is_empty() {
        println!("  unresolved: {}", output.build.unresolved.join(", "));
    }
    println!();
    for (property, consensus) in &output.consensus {
        println!(
            "  {:<12} {:<16} p={:.4} H={:.4}{}",
            property,
            consensus.value,
            consensus.probability,
            consensus.entropy,
            if consensus.locked { " [locked]" } else { "" }
        );
    }
}

fn validate(args: ValidateArgs) -> Result<()> {
    let corpus = load_corpus(&args.dataset)?;
    let mut config: ValidationConfig = load_config(args.config.as_deref())?;
    if let Some(cycles) = args.cycles {
        config.cycles = cycles;
    }
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let harness = LeaveOneOut::new(&corpus, &args.observed, &args.unknown, config)?;
    let languages = (!args.languages.is_empty()).then_some(args.languages.as_slice());
    let report = harness.run(languages)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_validation(&report);
    }
    Ok(())
}

fn print_validation(report: &ValidationReport) {
    let level = report.accuracy.level * 100.0;
    println!(
        "Leave-one-out over {} languages ({} skipped)",
        report.languages_evaluated,
        report.skipped_languages.len()
    );
    println!(
        "  accuracy  {:.4}  {:.0}% CI [{:.4}, {:.4}]",
        report.accuracy.mean, level, report.accuracy.lower, report.accuracy.upper
    );
    println!(
        "  baseline  {:.4}  {:.0}% CI [{:.4}, {:.4}]",
        report.baseline.mean, level, report.baseline.lower, report.baseline.upper
    );
    if report.epochs.len() > 1 {
        println!("  epoch std dev {:.4}", report.epoch_std_dev);
    }
    if !report.population_independent_potentials.is_empty() {
        let pairs: Vec<String> = report
            .population_independent_potentials
            .iter()
            .map(|(source, target)| format!("{}->{}", source, target))
            .collect();
        println!("  fixed tables (held-out language included): {}", pairs.join(", "));
    }
    println!();
    for (property, stats) in &report.per_property {
        println!(
            "  {:<12} {:>4}/{:<4} {:.4}",
            property,
            stats.correct,
            stats.evaluated,
            stats.accuracy()
        );
    }
}

/// `PROPERTY=VALUE[@PROBABILITY]`; probability defaults to 0.99.
fn parse_pin(raw: &str) -> Result<(&str, &str, f64)> {
    let (property, rest) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected PROPERTY=VALUE[@P], got '{}'", raw))?;
    let (value, probability) = match rest.split_once('@') {
        Some((value, p)) => (
            value,
            p.parse::<f64>()
                .with_context(|| format!("invalid probability in '{}'", raw))?,
        ),
        None => (rest, 0.99),
    };
    if property.is_empty() || value.is_empty() {
        bail!("expected PROPERTY=VALUE[@P], got '{}'", raw);
    }
    Ok((property, value, probability))
}

/// `PROPERTY=VALUE:COUNT[,VALUE:COUNT...]`
fn parse_observation(raw: &str) -> Result<(&str, Vec<(&str, u64)>)> {
    let (property, rest) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected PROPERTY=VALUE:COUNT,..., got '{}'", raw))?;
    let counts = rest
        .split(',')
        .map(|pair| {
            let (value, count) = pair
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("expected VALUE:COUNT, got '{}'", pair))?;
            let count = count
                .parse::<u64>()
                .with_context(|| format!("invalid count in '{}'", pair))?;
            Ok((value, count))
        })
        .collect::<Result<Vec<_>>>()?;
    if property.is_empty() || counts.is_empty() {
        bail!("expected PROPERTY=VALUE:COUNT,..., got '{}'", raw);
    }
    Ok((property, counts))
}
