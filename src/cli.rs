// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every option has a default, so running `repo-zipper` with no arguments
// archives the built-in repository list into the current directory using
// the token from GITHUB_TOKEN (if set).
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct definition
// - value_parser: validation runs while parsing, before our code sees it
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

use crate::github::DEFAULT_API_URL;
use crate::repo::RepoId;

// Repositories archived when none are given on the command line
pub const DEFAULT_REPOS: &[&str] = &["neherlab/covid19_scenarios"];

#[derive(Parser, Debug)]
#[command(
    name = "repo-zipper",
    version,
    about = "Archive the default branch of GitHub repositories as clean zip files",
    long_about = "repo-zipper downloads each repository's default branch as a zipball, \
                  strips the wrapper folder GitHub adds, and writes <owner>_<name>.zip."
)]
pub struct Cli {
    /// Repositories to archive, as owner/name
    ///
    /// Defaults to the built-in list when omitted.
    #[arg(value_parser = RepoId::parse)]
    pub repos: Vec<RepoId>,

    /// How many repositories to process at the same time
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub chunk_size: u16,

    /// Directory the final archives (and temporary files) are written to
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// GitHub access token, sent as `Authorization: token <TOKEN>`
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API (e.g. for GitHub Enterprise)
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Give up on a request after this many seconds (default: wait forever)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Output the run report in JSON format instead of a table
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The repositories to process: the ones given, or the built-in list
    pub fn repo_list(&self) -> anyhow::Result<Vec<RepoId>> {
        if !self.repos.is_empty() {
            return Ok(self.repos.clone());
        }
        DEFAULT_REPOS.iter().map(|r| RepoId::parse(r)).collect()
    }
}
