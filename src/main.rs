use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use gomafia_parser::config::Settings;
use gomafia_parser::report::{summarize, verify_player, verify_tournament, VerificationOutcome};
use gomafia_parser::{extract_player_fields, extract_tournament_fields};

#[derive(Parser)]
#[command(name = "gomafia_verify", about = "Offline verifier for GoMafia player and tournament pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, build and validate saved pages
    Verify {
        /// Player profile pages (comma-separated)
        #[arg(long, value_delimiter = ',')]
        players: Vec<PathBuf>,
        /// Tournament pages (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tournaments: Vec<PathBuf>,
        /// Exit with status 2 if any page fails
        #[arg(long)]
        fail_on_error: bool,
        /// Print full JSON results
        #[arg(short, long)]
        verbose: bool,
        /// Copy failing pages into the fixtures dir
        #[arg(long)]
        save_fixtures: bool,
    },
    /// Print the raw attribute map of one page as JSON
    Extract {
        #[arg(short, long, value_enum)]
        kind: PageKind,
        file: PathBuf,
        /// Source URL of the page (default: the file path)
        #[arg(short, long)]
        locator: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PageKind {
    Player,
    Tournament,
}

struct Job {
    kind: PageKind,
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading GOMAFIA_* settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Verify {
            players,
            tournaments,
            fail_on_error,
            verbose,
            save_fixtures,
        } => {
            let jobs: Vec<Job> = players
                .into_iter()
                .map(|path| Job { kind: PageKind::Player, path })
                .chain(tournaments.into_iter().map(|path| Job { kind: PageKind::Tournament, path }))
                .collect();
            if jobs.is_empty() {
                println!("Nothing to verify. Pass --players and/or --tournaments.");
                return Ok(());
            }
            info!(pages = jobs.len(), chunk_size = settings.chunk_size, "verifying");

            let results = verify_pages(&jobs, settings.chunk_size)?;
            let outcomes: Vec<VerificationOutcome> =
                results.iter().map(|(outcome, _)| outcome.clone()).collect();

            print_table(&outcomes);
            println!("\n{}", summarize(&outcomes));

            if verbose {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            }
            if save_fixtures {
                let saved = save_failures(&settings.fixtures_dir, &results)?;
                if saved > 0 {
                    println!("Saved {} failing pages to {}", saved, settings.fixtures_dir.display());
                }
            }

            let failed = outcomes.iter().any(|o| !o.passed());
            if failed && (fail_on_error || settings.fail_on_error) {
                std::process::exit(2);
            }
            Ok(())
        }
        Commands::Extract { kind, file, locator } => {
            let markup = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let locator = locator.unwrap_or_else(|| file.display().to_string());
            let raw = match kind {
                PageKind::Player => extract_player_fields(&markup, &locator),
                PageKind::Tournament => extract_tournament_fields(&markup, &locator),
            };
            println!("{}", serde_json::to_string_pretty(&raw)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Each outcome is paired with its markup so failures can be saved.
fn verify_pages(jobs: &[Job], chunk_size: usize) -> anyhow::Result<Vec<(VerificationOutcome, String)>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut results = Vec::with_capacity(jobs.len());
    for chunk in jobs.chunks(chunk_size) {
        let verified: Vec<_> = chunk
            .par_iter()
            .map(verify_file)
            .collect::<anyhow::Result<Vec<_>>>()?;
        results.extend(verified);
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(results)
}

fn verify_file(job: &Job) -> anyhow::Result<(VerificationOutcome, String)> {
    let markup = fs::read_to_string(&job.path)
        .with_context(|| format!("reading {}", job.path.display()))?;
    let locator = job.path.display().to_string();
    let outcome = match job.kind {
        PageKind::Player => verify_player(&markup, &locator),
        PageKind::Tournament => verify_tournament(&markup, &locator),
    };
    Ok((outcome, markup))
}

fn print_table(outcomes: &[VerificationOutcome]) {
    println!(
        "{:>3} | {:<10} | {:<40} | {:<7} | {:>7} | {:>3} | {:>3}",
        "#", "Kind", "Page", "Result", "Quality", "Err", "Wrn"
    );
    println!("{}", "-".repeat(90));

    for (i, o) in outcomes.iter().enumerate() {
        let (result, quality, errors, warnings) = match &o.validation {
            Some(v) => (
                if v.is_valid() { "ok" } else { "invalid" },
                format!("{:.1}", v.quality_score()),
                v.errors().len(),
                v.warnings().len(),
            ),
            None => ("failed", "-".to_string(), 1, 0),
        };
        println!(
            "{:>3} | {:<10} | {:<40} | {:<7} | {:>7} | {:>3} | {:>3}",
            i + 1,
            o.kind.to_string(),
            truncate(&o.locator, 40),
            result,
            quality,
            errors,
            warnings
        );
    }

    // Reasons below the table to keep rows short
    let failing: Vec<_> = outcomes.iter().filter(|o| !o.passed()).collect();
    if !failing.is_empty() {
        println!("\n--- Problems ---");
        for o in failing {
            if let Some(e) = &o.construction_error {
                println!("  {}: {}", truncate(&o.locator, 40), e);
            }
            if let Some(v) = &o.validation {
                for e in v.errors() {
                    println!("  {}: {}", truncate(&o.locator, 40), e);
                }
            }
        }
    }
}

/// Writes `<stem>.html` and `<stem>.json` for every page that did not pass.
fn save_failures(dir: &Path, results: &[(VerificationOutcome, String)]) -> anyhow::Result<usize> {
    let failing: Vec<_> = results.iter().filter(|(o, _)| !o.passed()).collect();
    if failing.is_empty() {
        return Ok(0);
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    for (outcome, markup) in &failing {
        let stem = Path::new(&outcome.locator)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());
        let stem = format!("{}_{}", outcome.kind, stem).replace(' ', "_");
        fs::write(dir.join(format!("{stem}.html")), markup)?;
        fs::write(
            dir.join(format!("{stem}.json")),
            serde_json::to_string_pretty(outcome)?,
        )?;
        warn!(locator = %outcome.locator, fixture = %stem, "saved failing page");
    }
    Ok(failing.len())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
