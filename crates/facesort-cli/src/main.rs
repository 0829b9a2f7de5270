use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use facesort_core::{photo, FaceAnalysis, Gallery, MatchPolicy, SortOptions};
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facesort", version, about = "Sort photos into per-person folders by face")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that take precedence over `FACESORT_*` environment variables.
#[derive(Args)]
struct Overrides {
    /// Directory containing det_10g.onnx and w600k_r50.onnx
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
    /// Match when the embedding distance is strictly below this value
    #[arg(long, global = true)]
    threshold: Option<f32>,
    /// Detector input resolution (multiple of 32)
    #[arg(long, global = true)]
    det_size: Option<usize>,
    /// `all`: every person under the threshold; `nearest`: closest person only
    #[arg(long, global = true)]
    policy: Option<MatchPolicy>,
    /// Compare raw ArcFace embeddings instead of L2-normalized ones
    #[arg(long, global = true)]
    raw_embeddings: bool,
    /// Fail on the first unreadable photo instead of skipping it
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every album photo into a folder per recognized person
    Sort {
        /// Known faces: one subdirectory of sample photos per person
        #[arg(short, long)]
        known: Option<PathBuf>,
        /// Album directory to sort
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output root for per-person folders
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Report what would be copied without copying
        #[arg(long)]
        dry_run: bool,
        /// Write a JSON report of the run to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List the reference identities built from the known faces
    Gallery {
        #[arg(short, long)]
        known: Option<PathBuf>,
        /// Print as JSON (includes centroids)
        #[arg(long)]
        json: bool,
    },
    /// Print who is recognized in a single photo
    Identify {
        #[arg(short, long)]
        known: Option<PathBuf>,
        photo: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    apply_overrides(&mut cfg, &cli.overrides);
    let strict = cli.overrides.strict;

    match cli.command {
        Commands::Sort {
            known,
            input,
            output,
            dry_run,
            report,
        } => {
            let known = known.unwrap_or_else(|| cfg.known_dir.clone());
            let input = input.unwrap_or_else(|| cfg.input_dir.clone());
            let output = output.unwrap_or_else(|| cfg.output_dir.clone());
            let options = SortOptions {
                threshold: cfg.threshold,
                policy: cfg.match_policy,
                dry_run,
                strict,
            };
            sort(&cfg, &known, &input, &output, &options, report.as_deref())
        }
        Commands::Gallery { known, json } => {
            let known = known.unwrap_or_else(|| cfg.known_dir.clone());
            gallery(&cfg, &known, strict, json)
        }
        Commands::Identify { known, photo } => {
            let known = known.unwrap_or_else(|| cfg.known_dir.clone());
            identify(&cfg, &known, &photo, strict)
        }
    }
}

fn apply_overrides(cfg: &mut Config, overrides: &Overrides) {
    if let Some(dir) = &overrides.model_dir {
        cfg.model_dir = dir.clone();
    }
    if let Some(threshold) = overrides.threshold {
        cfg.threshold = threshold;
    }
    if let Some(det_size) = overrides.det_size {
        cfg.det_size = det_size;
    }
    if let Some(policy) = overrides.policy {
        cfg.match_policy = policy;
    }
    if overrides.raw_embeddings {
        cfg.normalize = false;
    }
}

fn load_analysis(cfg: &Config) -> Result<FaceAnalysis> {
    FaceAnalysis::load(&cfg.analysis_options()).with_context(|| {
        format!(
            "failed to load face models from {}",
            cfg.model_dir.display()
        )
    })
}

fn load_references(known: &Path, analysis: &mut FaceAnalysis, strict: bool) -> Result<Gallery> {
    let gallery = facesort_core::load_gallery(known, analysis, strict)
        .with_context(|| format!("failed to load known faces from {}", known.display()))?;
    if gallery.is_empty() {
        tracing::warn!(dir = %known.display(), "no reference identities loaded; nothing can match");
    }
    Ok(gallery)
}

fn sort(
    cfg: &Config,
    known: &Path,
    input: &Path,
    output: &Path,
    options: &SortOptions,
    report_path: Option<&Path>,
) -> Result<()> {
    let mut analysis = load_analysis(cfg)?;
    let gallery = load_references(known, &mut analysis, options.strict)?;

    tracing::info!(
        identities = gallery.len(),
        threshold = options.threshold,
        policy = %options.policy,
        embeddings = cfg.embedding_mode(),
        det_size = cfg.det_size,
        "sorting album"
    );

    let report = facesort_core::sort_photos(input, output, &gallery, &mut analysis, options)
        .with_context(|| format!("failed to sort {}", input.display()))?;

    println!(
        "{} photos processed, {} matched, {} copies{}, {} skipped",
        report.photos.len(),
        report.matched(),
        report.copies,
        if options.dry_run { " (dry run)" } else { "" },
        report.skipped.len()
    );

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    Ok(())
}

fn gallery(cfg: &Config, known: &Path, strict: bool, json: bool) -> Result<()> {
    let mut analysis = load_analysis(cfg)?;
    let gallery = load_references(known, &mut analysis, strict)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&gallery)?);
        return Ok(());
    }

    if gallery.is_empty() {
        println!("No identities found in {}", known.display());
    }
    for identity in &gallery {
        println!(
            "{}\t{} sample(s)\t{}-d",
            identity.name,
            identity.samples,
            identity.centroid.dim()
        );
    }
    Ok(())
}

fn identify(cfg: &Config, known: &Path, photo_path: &Path, strict: bool) -> Result<()> {
    let mut analysis = load_analysis(cfg)?;
    let gallery = load_references(known, &mut analysis, strict)?;

    let image = photo::load_photo(photo_path)?;
    let recognition = facesort_core::recognize(
        &mut analysis,
        &image,
        &gallery,
        cfg.threshold,
        cfg.match_policy,
    )
    .context("face analysis failed")?;

    println!("{} face(s) detected", recognition.faces);
    for name in &recognition.names {
        println!("{name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "facesort", "sort", "--dry-run", "--threshold", "0.9", "--policy", "nearest",
        ]);
        assert_eq!(cli.overrides.threshold, Some(0.9));
        assert_eq!(cli.overrides.policy, Some(MatchPolicy::Nearest));
        assert!(matches!(cli.command, Commands::Sort { dry_run: true, .. }));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = Cli::parse_from([
            "facesort", "--model-dir", "/m", "--det-size", "320", "--raw-embeddings",
            "identify", "kid.jpg",
        ]);
        let mut cfg = Config::from_env();
        apply_overrides(&mut cfg, &cli.overrides);
        assert_eq!(cfg.model_dir, PathBuf::from("/m"));
        assert_eq!(cfg.det_size, 320);
        assert!(!cfg.normalize);
        assert_eq!(cfg.embedding_mode(), "raw");
    }
}
