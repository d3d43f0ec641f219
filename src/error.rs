// src/error.rs
// =============================================================================
// Errors for the per-repository pipeline.
//
// Inside a stage we use anyhow (with .context()) just like the rest of the
// app. At the stage boundary the anyhow error gets wrapped in a
// PipelineError variant so callers can tell WHERE a repo failed:
//
//   Resolve   - looking up the default branch
//   Fetch     - downloading or extracting the zipball
//   Normalize - writing the final archive
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Branch-metadata request failed (bad token, missing repo, network)
    #[error("resolve failed: {0:#}")]
    Resolve(anyhow::Error),

    /// Zipball download or extraction failed
    #[error("fetch failed: {0:#}")]
    Fetch(anyhow::Error),

    /// Listing, writing or sealing the final archive failed
    #[error("normalize failed: {0:#}")]
    Normalize(anyhow::Error),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Resolve(_) => "resolve",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Normalize(_) => "normalize",
        }
    }
}
