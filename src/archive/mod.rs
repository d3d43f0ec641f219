// src/archive/mod.rs
// =============================================================================
// This module handles everything that happens to a zipball after download.
//
// Submodules:
// - extract: unpack the downloaded zip into a temporary directory
// - normalize: re-pack that directory without GitHub's wrapper folder
//
// This file also owns TempArtifacts, the pair of temporary paths one
// repository uses while it is being processed.
// =============================================================================

mod extract;
mod normalize;

pub use extract::extract_zip;
pub use normalize::normalize;

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::repo::RepoId;

// The temporary download file and extraction directory of one repository
#[derive(Debug, Clone)]
pub struct TempArtifacts {
    pub zip_path: PathBuf,
    pub dir_path: PathBuf,
}

impl TempArtifacts {
    pub fn for_repo(repo: &RepoId, out_dir: &Path) -> Self {
        Self {
            zip_path: repo.temp_zip_path(out_dir),
            dir_path: repo.temp_dir_path(out_dir),
        }
    }

    /// Deletes the temporary zip and the extraction directory
    ///
    /// Paths that are already gone are fine. Other failures are logged as
    /// warnings; they never fail the repository.
    pub async fn remove(&self) {
        let zip = tokio::fs::remove_file(&self.zip_path).await;
        let dir = tokio::fs::remove_dir_all(&self.dir_path).await;

        for (path, result) in [(&self.zip_path, zip), (&self.dir_path, dir)] {
            match result {
                Ok(()) => debug!(path = %path.display(), "removed temporary artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not remove temporary artifact")
                }
            }
        }
    }
}
