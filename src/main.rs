// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (tracing) and parse command-line arguments
// 2. Validate the repository list and build the shared HTTP client
// 3. Run every repository through the pipeline, chunk by chunk
// 4. Print a report and exit with a proper code
//    (0 = all archived, 1 = some repos failed, 2 = setup error)
// =============================================================================

// Module declarations - tells Rust about our other source files
mod archive;       // src/archive/ - extracting and re-packing zips
mod batch;         // src/batch/ - per-repo pipeline and chunked driver
mod cli;           // src/cli.rs - command-line parsing
mod error;         // src/error.rs - stage-tagged pipeline errors
mod github;        // src/github/ - GitHub API calls
mod repo;          // src/repo.rs - repository identifiers and paths

use anyhow::{Context, Result};
use batch::{BatchReport, RepoOutcome, RunContext};
use clap::Parser;
use cli::Cli;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Setup went wrong before any repository was touched
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so stdout stays clean for the report (and --json)
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("repo_zipper=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Returns:
//   Ok(0) = every repository archived
//   Ok(1) = at least one repository failed
//   Err = setup error (bad arguments, client could not be built)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let (repos, duplicates) = repo::dedup_repos(cli.repo_list()?);
    for dup in &duplicates {
        warn!(repo = %dup, "skipping duplicate repository");
    }
    for (slug, ids) in repo::find_slug_collisions(&repos) {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        warn!(
            %slug,
            repos = ?ids,
            "repositories share an output path; they run one after another and later ones overwrite earlier ones"
        );
    }

    let api = github::ApiConfig::new(&cli.api_url, cli.token.clone())?;
    if !api.has_token() {
        warn!("no GitHub token provided; requests are unauthenticated and heavily rate limited");
    }

    tokio::fs::create_dir_all(&cli.output_dir)
        .await
        .with_context(|| format!("Could not create output directory {}", cli.output_dir.display()))?;

    let ctx = RunContext {
        client: github::build_client(cli.timeout_secs.map(Duration::from_secs))?,
        api,
        out_dir: cli.output_dir.clone(),
    };

    if !cli.json {
        println!(
            "📦 Archiving {} repositor{} ({} at a time) into {}",
            repos.len(),
            if repos.len() == 1 { "y" } else { "ies" },
            cli.chunk_size,
            cli.output_dir.display()
        );
    }

    let report = batch::run_batch(&ctx, &repos, usize::from(cli.chunk_size)).await;

    print_report(&report, cli.json)?;

    Ok(if report.failed() > 0 { 1 } else { 0 })
}

// Prints the report either as a table or JSON
fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_table(&report.outcomes);
        println!();
        println!("📊 Summary:");
        println!("   ✅ Archived: {}", report.succeeded());
        println!("   ❌ Failed: {}", report.failed());
        println!("   📋 Total: {}", report.outcomes.len());
    }
    Ok(())
}

fn print_table(outcomes: &[RepoOutcome]) {
    println!();
    println!("{:<40} {:<12} {:<50}", "REPOSITORY", "STATUS", "DETAIL");
    println!("{}", "=".repeat(102));

    for outcome in outcomes {
        let (status, detail) = match &outcome.result {
            Ok(path) => ("✅ OK".to_string(), path.display().to_string()),
            Err(e) => (format!("❌ {}", e.stage().to_uppercase()), e.to_string()),
        };
        println!("{:<40} {:<12} {:<50}", outcome.repo.to_string(), status, detail);
    }
}
