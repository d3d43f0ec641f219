// src/github/fetch.rs
// =============================================================================
// This module downloads a branch snapshot ("zipball") from GitHub.
//
// Strategy:
// - GET {api}/repos/{owner}/{name}/zipball/{branch}
// - GitHub answers with a redirect to codeload.github.com, which reqwest
//   follows for us (default policy allows up to 10 hops)
// - The body is streamed chunk by chunk straight into a file, so large
//   repositories never have to fit in memory
//
// The function only returns after the last chunk is written, flushed and
// synced. Callers can extract the file as soon as it returns.
//
// Rust concepts:
// - Streams: bytes_stream() yields the body as it arrives
// - tokio::fs: async file writes that don't block other repo tasks
// =============================================================================

use anyhow::{anyhow, Context, Result};
use futures::StreamExt; // StreamExt gives us .next() on the byte stream
use reqwest::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::ApiConfig;
use crate::repo::RepoId;

// Streams the zipball of `branch` into the file at `dest`
//
// Parameters:
//   client: shared reqwest client
//   api: API base URL and optional token
//   repo: repository to snapshot
//   branch: branch name from resolve_default_branch()
//   dest: file to create (overwritten if it exists)
//
// Returns: number of bytes written
pub async fn download_zipball(
    client: &Client,
    api: &ApiConfig,
    repo: &RepoId,
    branch: &str,
    dest: &Path,
) -> Result<u64> {
    // Branch names like `release/1.0` stay as nested path segments, not %2F
    let mut segments = vec!["repos", repo.owner(), repo.name(), "zipball"];
    segments.extend(branch.split('/'));
    let url = api.endpoint(&segments)?;
    debug!(%repo, %url, dest = %dest.display(), "downloading zipball");

    let response = api
        .authorize(client.get(url.clone()))
        .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?;

    if !response.status().is_success() {
        return Err(anyhow!("GET {}: HTTP {}", url, response.status()));
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("Could not create {}", dest.display()))?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Download of {} interrupted", repo))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Could not write to {}", dest.display()))?;
        written += chunk.len() as u64;
    }

    // Everything must be on disk before anyone opens the file for extraction
    file.flush().await?;
    file.sync_all().await?;

    debug!(%repo, bytes = written, "zipball downloaded");
    Ok(written)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why flush() AND sync_all()?
//    - flush() pushes tokio's internal buffer into the OS
//    - sync_all() asks the OS to put the bytes on disk
//    - After both, a blocking reader on another thread sees the whole file
//
// 2. Why `as u64` on chunk.len()?
//    - len() is usize, our running total is u64 so it means the same thing
//      on 32-bit and 64-bit targets
// -----------------------------------------------------------------------------
