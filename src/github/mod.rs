// src/github/mod.rs
// =============================================================================
// This module talks to the GitHub REST API.
//
// Currently implements:
// - Resolving a repository's default branch (branch.rs)
// - Streaming a branch's zipball to disk (fetch.rs)
//
// Both calls share an ApiConfig: the API base URL plus an optional token.
// The token is handed in by the caller, so nothing in here reads the
// environment and every function can be tested against a fake server.
// =============================================================================

mod branch;
mod fetch;

pub use branch::resolve_default_branch;
pub use fetch::download_zipball;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

// Where the API lives and how we authenticate against it
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: Url,
    token: Option<String>,
}

impl ApiConfig {
    /// Validates `base_url` and pairs it with an optional access token
    ///
    /// An empty token is treated the same as no token.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow!("Invalid API URL '{}': {}", base_url, e))?;

        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("API URL must be an http(s) base URL: {}", base_url));
        }

        Ok(Self {
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    // Builds `{base}/{segment}/{segment}/...`, percent-encoding each segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // Attaches `Authorization: token <credential>` when we have one
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("token {}", token)),
            None => request,
        }
    }
}

// Creates the HTTP client shared by every repository task
//
// GitHub rejects requests without a User-Agent, so we always send one.
// No timeout unless asked for: a hung request stalls only its own repo.
pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(concat!("repo-zipper/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().context("Failed to create HTTP client")
}
