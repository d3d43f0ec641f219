// src/repo.rs
// =============================================================================
// This module defines what a repository identifier is and where its files go.
//
// Every path this tool touches is derived from the identifier:
//   owner/name  ->  <out>/owner_name.zip          (final archive)
//               ->  <out>/owner_name-temp.zip     (raw download)
//               ->  <out>/owner_name-temp/        (extraction directory)
//
// Rust concepts:
// - Newtype-ish structs: RepoId can only be built through parse()
// - FromStr: lets clap and tests write "owner/name".parse()
// - Display: lets us print a RepoId with {}
// =============================================================================

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// A validated `owner/name` repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Parses and validates an `owner/name` string
    ///
    /// Both halves must be non-empty, there must be exactly one slash,
    /// and whitespace is not allowed anywhere.
    pub fn parse(input: &str) -> Result<Self> {
        if input.chars().any(char::is_whitespace) {
            return Err(anyhow!("Invalid repository '{}': contains whitespace", input));
        }

        let (owner, name) = input
            .split_once('/')
            .ok_or_else(|| anyhow!("Invalid repository '{}': expected owner/name", input))?;

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(anyhow!("Invalid repository '{}': expected owner/name", input));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filesystem-safe stem: `owner/name` becomes `owner_name`
    ///
    /// Note: this is not injective (`a/b_c` and `a_b/c` both give `a_b_c`).
    /// See find_slug_collisions().
    pub fn slug(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }

    pub fn final_archive_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.zip", self.slug()))
    }

    pub fn temp_zip_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}-temp.zip", self.slug()))
    }

    pub fn temp_dir_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}-temp", self.slug()))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<RepoId> for String {
    fn from(repo: RepoId) -> Self {
        repo.to_string()
    }
}

// Drops repeated identifiers, keeping the first occurrence
//
// Returns the deduplicated list and the identifiers that were dropped.
// Processing the same repo twice in one run would make two tasks share
// the same temporary paths.
pub fn dedup_repos(repos: Vec<RepoId>) -> (Vec<RepoId>, Vec<RepoId>) {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(repos.len());
    let mut dropped = Vec::new();

    for repo in repos {
        if seen.insert(repo.clone()) {
            unique.push(repo);
        } else {
            dropped.push(repo);
        }
    }

    (unique, dropped)
}

// Groups distinct identifiers that derive the same slug
//
// Returns one entry per colliding slug, with every identifier that maps to it.
pub fn find_slug_collisions(repos: &[RepoId]) -> Vec<(String, Vec<RepoId>)> {
    let mut by_slug: HashMap<String, Vec<RepoId>> = HashMap::new();
    for repo in repos {
        let ids = by_slug.entry(repo.slug()).or_default();
        if !ids.contains(repo) {
            ids.push(repo.clone());
        }
    }

    let mut collisions: Vec<_> = by_slug
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .collect();
    collisions.sort_by(|a, b| a.0.cmp(&b.0));
    collisions
}
