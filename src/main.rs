//! lmi - Latent Mutual Information
//!
//! Usage:
//!   lmi estimate x.csv y.csv              # Estimate MI between two views
//!   lmi estimate pairs.json               # Both views in one JSON file
//!   lmi generate -o pairs.json --rho 0.8  # Synthetic data with known MI
//!   lmi config list                       # Show stored defaults

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use console::style;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use latentmi_core::loader::{load_pair, JsonLoader, PairedData, SampleData};
use latentmi_core::preprocess::matrix_to_rows;
use latentmi_core::synthetic::{correlated_gaussians, gaussian_mi};
use latentmi_core::{
    estimate_with_progress, EstimateWarning, EstimatorConfig, MiSummary, NoProgress, PointwiseMi,
    Regularizer, TrainingConfig, TrainingReport,
};

mod config;
mod csv_support;
mod progress;

use config::Config;
use csv_support::{matrix_to_csv_data, write_csv, write_embeddings, write_pmi_csv};
use progress::BarProgress;

// ============================================================================
// CLI STRUCTURE
// ============================================================================

#[derive(Parser)]
#[command(name = "lmi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Latent MI - mutual information between high-dimensional views via learned embeddings", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate pointwise and total MI between paired samples
    ///
    /// X and Y are CSV or JSON files with one row per sample. Omit Y to read
    /// both views from one JSON document with "x" and "y" keys.
    Estimate(EstimateArgs),

    /// Write correlated Gaussian pairs with a known MI
    Generate {
        /// Output file: .json for a paired document, .csv for <stem>_x.csv and <stem>_y.csv
        #[arg(short, long)]
        output: PathBuf,

        /// Number of samples
        #[arg(short, long, default_value = "2000")]
        n: usize,

        /// Dimension of each view
        #[arg(short, long, default_value = "4")]
        dim: usize,

        /// Per-coordinate correlation
        #[arg(long, default_value = "0.8")]
        rho: f64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Manage stored estimator defaults
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Args)]
struct EstimateArgs {
    /// X view (CSV or JSON), or a paired JSON file
    x: PathBuf,

    /// Y view (CSV or JSON)
    y: Option<PathBuf>,

    /// Regularizer: cross, mine, infonce
    #[arg(short, long)]
    regularizer: Option<Regularizer>,

    /// Weight of the self-reconstruction loss
    #[arg(long)]
    alpha: Option<f32>,

    /// Weight of the regularization loss
    #[arg(long)]
    lam: Option<f32>,

    /// Latent dimension per view
    #[arg(long)]
    latent_dim: Option<usize>,

    /// Hidden layer width
    #[arg(long)]
    hidden_dim: Option<usize>,

    /// Fraction of samples held out for validation
    #[arg(long)]
    validation_split: Option<f64>,

    /// Estimate pMI on every sample, not only validation samples
    #[arg(long)]
    all: bool,

    /// Minibatch size
    #[arg(long)]
    batch_size: Option<usize>,

    /// Adam learning rate
    #[arg(long)]
    lr: Option<f32>,

    /// Maximum training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Epochs without validation improvement before stopping
    #[arg(long)]
    patience: Option<usize>,

    /// Random seed
    #[arg(long, conflicts_with = "random_seed")]
    seed: Option<u64>,

    /// Draw the seed from OS entropy
    #[arg(long)]
    random_seed: bool,

    /// KSG neighbour count
    #[arg(short = 'k', long)]
    neighbours: Option<usize>,

    /// Quick training mode (fewer epochs, higher learning rate)
    #[arg(long, conflicts_with_all = ["instant", "thorough"])]
    quick: bool,

    /// Instant mode for smoke tests (a handful of epochs)
    #[arg(long, conflicts_with = "thorough")]
    instant: bool,

    /// Long training with extra patience
    #[arg(long)]
    thorough: bool,

    /// Write the full result as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write pointwise MI as CSV
    #[arg(long)]
    pmi_csv: Option<PathBuf>,

    /// Write zx.csv and zy.csv embeddings to this directory
    #[arg(long)]
    embeddings: Option<PathBuf>,

    /// No progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Print the full training report
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a config value
    Set {
        key: String,
        value: String,
    },
    /// Get a config value
    Get {
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::WARN);

    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Estimate(args) => estimate_cmd(args)?,
        Commands::Generate { output, n, dim, rho, seed } => {
            generate_cmd(&output, n, dim, rho, seed)?;
        }
        Commands::Config { action } => match action {
            ConfigCommands::Set { key, value } => config_set(&key, &value)?,
            ConfigCommands::Get { key } => config_get(&key)?,
            ConfigCommands::List => config_list()?,
            ConfigCommands::Path => config_path()?,
        },
    }

    Ok(())
}

// ============================================================================
// ESTIMATE COMMAND
// ============================================================================

/// Flags over config file over library defaults
fn resolve_config(args: &EstimateArgs, stored: &Config) -> EstimatorConfig {
    let training = if args.instant {
        TrainingConfig::instant()
    } else if args.quick {
        TrainingConfig::quick()
    } else if args.thorough {
        TrainingConfig::thorough()
    } else {
        TrainingConfig::default()
    };
    let mut config = stored.apply(EstimatorConfig::default().with_training(training));

    let rep = &mut config.representation;
    if let Some(v) = args.regularizer {
        rep.regularizer = v;
    }
    if let Some(v) = args.alpha {
        rep.alpha = v;
    }
    if let Some(v) = args.lam {
        rep.lam = v;
    }
    if let Some(v) = args.latent_dim {
        rep.latent_dim = v;
    }
    if let Some(v) = args.hidden_dim {
        rep.hidden_dim = v;
    }

    let training = &mut config.training;
    if let Some(v) = args.batch_size {
        training.batch_size = v;
    }
    if let Some(v) = args.lr {
        training.learning_rate = v;
    }
    if let Some(v) = args.epochs {
        training.max_epochs = v;
    }
    if let Some(v) = args.patience {
        training.patience = v;
    }
    training.quiet = args.quiet;

    if let Some(v) = args.validation_split {
        config.validation_split = v;
    }
    if let Some(v) = args.neighbours {
        config.neighbours = v;
    }
    if args.all {
        config.estimate_on_val = false;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if args.random_seed {
        config.seed = None;
    }
    config
}

/// JSON written by `--output`
#[derive(Serialize)]
struct EstimateOutput<'a> {
    mi: Option<f64>,
    summary: Option<MiSummary>,
    pmi: &'a PointwiseMi,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    validation_indices: &'a [usize],
    config: &'a EstimatorConfig,
    training: &'a TrainingReport,
    warnings: &'a [EstimateWarning],
}

fn estimate_cmd(args: EstimateArgs) -> Result<()> {
    let config = resolve_config(&args, &Config::load()?);
    config.validate()?;

    println!();
    println!("{}", style("🔬 Latent MI Estimation").bold().cyan());
    println!("{}", style("═".repeat(60)).dim());
    println!();

    let start = Instant::now();
    let data = load_pair(&args.x, args.y.as_ref())
        .with_context(|| format!("Failed to load input from {}", args.x.display()))?;

    println!("  {} Loaded {} samples: X {}D, Y {}D in {:.1}s",
        style("✓").green(),
        data.len(),
        data.x.dimension(),
        data.y.dimension(),
        start.elapsed().as_secs_f32()
    );
    println!("  {} Regularizer: {}  latent {}D  hidden {}",
        style("📦").dim(),
        config.representation.regularizer,
        config.representation.latent_dim,
        config.representation.hidden_dim
    );
    println!("  {} Validation split: {:.0}%  k = {}  seed: {}",
        style("🎯").dim(),
        config.validation_split * 100.0,
        config.neighbours,
        config.seed.map(|s| s.to_string()).unwrap_or_else(|| "random".into())
    );
    println!();

    let train_start = Instant::now();
    let result = if args.quiet {
        estimate_with_progress(data.x.as_slice(), data.y.as_slice(), &config, &mut NoProgress)
    } else {
        let mut bar = BarProgress::new(config.training.max_epochs)?;
        estimate_with_progress(data.x.as_slice(), data.y.as_slice(), &config, &mut bar)
    }
    .context("Estimation failed")?;

    println!("  {} Training complete in {:.1}s",
        style("✓").green().bold(),
        train_start.elapsed().as_secs_f32()
    );
    println!("  {} {}", style("📈").dim(), result.report.summary());
    for warning in &result.warnings {
        println!("  {} {}", style("⚠").yellow(), warning);
    }

    println!();
    println!("{}", style("═".repeat(60)).dim());
    println!("{}", style("                    RESULTS").bold());
    println!("{}", style("═".repeat(60)).dim());
    println!();
    match result.summary() {
        Some(s) => {
            println!("  MI estimate:   {} nats",
                style(format!("{:.4}", s.mean)).green().bold());
            println!("  Std. error:    {:.4}", s.std_error);
            println!("  pMI std. dev.: {:.4}", s.std_dev);
            println!("  Samples:       {} of {}", s.count, result.pmi.len());
        }
        None => println!("  {} No pointwise estimates were produced", style("✗").red()),
    }
    println!();

    if args.verbose {
        result.report.print();
        println!();
    }

    let ids = data.x.ids.as_deref();

    if let Some(path) = &args.output {
        let output = EstimateOutput {
            mi: result.mi(),
            summary: result.summary(),
            pmi: &result.pmi,
            ids,
            validation_indices: &result.split.test,
            config: &config,
            training: &result.report,
            warnings: &result.warnings,
        };
        std::fs::write(path, serde_json::to_string_pretty(&output)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  {} Result saved to: {}", style("💾").dim(), path.display());
    }

    if let Some(path) = &args.pmi_csv {
        std::fs::write(path, write_pmi_csv(&result.pmi, &result.split, ids))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("  {} Pointwise MI saved to: {}", style("💾").dim(), path.display());
    }

    if let Some(dir) = &args.embeddings {
        write_embeddings(dir, &result.zx, &result.zy, ids)?;
        println!("  {} Embeddings saved to: {}", style("💾").dim(), dir.display());
    }

    Ok(())
}

// ============================================================================
// GENERATE COMMAND
// ============================================================================

fn generate_cmd(output: &Path, n: usize, dim: usize, rho: f64, seed: u64) -> Result<()> {
    if !(rho > -1.0 && rho < 1.0) {
        anyhow::bail!("rho must lie in (-1, 1), got {}", rho);
    }
    if n == 0 || dim == 0 {
        anyhow::bail!("n and dim must be positive");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let (x, y) = correlated_gaussians(n, dim, rho, &mut rng);

    let is_csv = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid output path {}", output.display()))?;
        for (suffix, m) in [("x", &x), ("y", &y)] {
            let path = output.with_file_name(format!("{}_{}.csv", stem, suffix));
            std::fs::write(&path, write_csv(&matrix_to_csv_data(m, None), "dim", true))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Wrote {}", style("✓").green(), path.display());
        }
    } else {
        let pair = PairedData::new(
            SampleData::new(matrix_to_rows(&x)),
            SampleData::new(matrix_to_rows(&y)),
        )?;
        JsonLoader::write_paired(output, &pair)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("{} Wrote {}", style("✓").green(), output.display());
    }

    println!("  {} samples, {}D per view, rho = {}", n, dim, rho);
    println!("  True MI: {} nats", style(format!("{:.4}", gaussian_mi(dim, rho))).green().bold());

    Ok(())
}

// ============================================================================
// CONFIG COMMANDS
// ============================================================================

fn config_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("{} Set {} = {}", style("✓").green(), key, value);

    Ok(())
}

fn config_get(key: &str) -> Result<()> {
    let config = Config::load()?;
    let value = config.get(key)?;
    println!("{}", value.as_deref().unwrap_or("(not set)"));

    Ok(())
}

fn config_list() -> Result<()> {
    let config = Config::load()?;

    println!();
    println!("{}", style("⚙️  Configuration").bold().cyan());
    println!("{}", style("─".repeat(40)).dim());
    println!();
    for key in config::KEYS {
        let value = config.get(key)?;
        println!("  {:<18} {}", format!("{}:", key), value.as_deref().unwrap_or("(default)"));
    }
    println!();
    println!("  Config file: {}", Config::path()?.display());
    println!();

    Ok(())
}

fn config_path() -> Result<()> {
    println!("{}", Config::path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_estimate(argv: &[&str]) -> EstimateArgs {
        let mut full = vec!["lmi", "estimate"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Estimate(args) => args,
            _ => panic!("expected estimate"),
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = parse_estimate(&["x.csv", "y.csv"]);
        let config = resolve_config(&args, &Config::default());

        let mut expected = EstimatorConfig::default();
        expected.training.quiet = false;
        assert_eq!(config, expected);
    }

    #[test]
    fn test_flags_override_stored_defaults() {
        let mut stored = Config::default();
        stored.set("latent-dim", "16").unwrap();
        stored.set("patience", "5").unwrap();

        let args = parse_estimate(&["x.csv", "--latent-dim", "4", "-r", "mine", "--all", "-q"]);
        let config = resolve_config(&args, &stored);

        assert_eq!(config.representation.latent_dim, 4);
        assert_eq!(config.representation.regularizer, Regularizer::Mine);
        assert_eq!(config.training.patience, 5);
        assert!(!config.estimate_on_val);
        assert!(config.training.quiet);
    }

    #[test]
    fn test_random_seed_flag() {
        let args = parse_estimate(&["x.json", "--random-seed"]);
        assert_eq!(resolve_config(&args, &Config::default()).seed, None);

        let args = parse_estimate(&["x.json", "--seed", "9"]);
        assert_eq!(resolve_config(&args, &Config::default()).seed, Some(9));
    }

    #[test]
    fn test_instant_preset() {
        let args = parse_estimate(&["x.json", "--instant"]);
        let config = resolve_config(&args, &Config::default());
        assert_eq!(config.training, TrainingConfig::instant().verbose());
    }

    #[test]
    fn test_generate_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairs.json");
        generate_cmd(&path, 20, 3, 0.5, 1).unwrap();

        let pair = load_pair(&path, None::<&Path>).unwrap();
        assert_eq!(pair.len(), 20);
        assert_eq!(pair.x.dimension(), 3);
    }

    #[test]
    fn test_generate_csv_pair() {
        let dir = tempfile::tempdir().unwrap();
        generate_cmd(&dir.path().join("g.csv"), 10, 2, 0.3, 1).unwrap();

        let pair = load_pair(dir.path().join("g_x.csv"), Some(dir.path().join("g_y.csv"))).unwrap();
        assert_eq!(pair.len(), 10);
        assert_eq!(pair.y.dimension(), 2);
    }

    #[test]
    fn test_generate_rejects_bad_rho() {
        let dir = tempfile::tempdir().unwrap();
        assert!(generate_cmd(&dir.path().join("g.json"), 10, 2, 1.0, 1).is_err());
    }
}
