// src/github/branch.rs
// =============================================================================
// Resolves a repository's default branch through the GitHub REST API.
//
// GET {api}/repos/{owner}/{name}  ->  { "default_branch": "main", ... }
//
// We only care about one field, so the serde struct only declares that one.
// Unknown fields in the response are ignored by default.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::ApiConfig;
use crate::repo::RepoId;

// The slice of the repository metadata response we use
#[derive(Debug, Deserialize)]
struct RepoMetadata {
    default_branch: String,
}

// Looks up the default branch of `repo`
//
// Parameters:
//   client: shared reqwest client
//   api: API base URL and optional token (passed in, never read from env here)
//   repo: the repository to look up
//
// Returns: the branch name, e.g. "main" or "master"
pub async fn resolve_default_branch(client: &Client, api: &ApiConfig, repo: &RepoId) -> Result<String> {
    let url = api.endpoint(&["repos", repo.owner(), repo.name()])?;
    debug!(%repo, %url, "requesting repository metadata");

    let response = api
        .authorize(client.get(url.clone()))
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("GET {}: HTTP {}", url, response.status()));
    }

    let metadata: RepoMetadata = response
        .json()
        .await
        .with_context(|| format!("Could not decode metadata for {}", repo))?;

    if metadata.default_branch.is_empty() {
        return Err(anyhow!("{} reported an empty default branch", repo));
    }

    Ok(metadata.default_branch)
}
