// src/archive/extract.rs
// =============================================================================
// Unpacks a downloaded zipball into a directory.
//
// Each entry's name goes through enclosed_name(), which refuses absolute
// paths and `..` components. Entries that would land outside the
// destination are skipped with a warning instead of written.
//
// This is blocking std::fs + zip work. Async callers run it on the
// blocking pool with tokio::task::spawn_blocking.
// =============================================================================

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

// Extracts every entry of the zip at `archive_path` into `dest_dir`
//
// Creates `dest_dir` (and any parents) if needed.
// Returns: number of files written (directories are not counted)
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Could not create {}", dest_dir.display()))?;

    let file = File::open(archive_path)
        .with_context(|| format!("Could not open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a readable zip archive", archive_path.display()))?;

    let mut files_written = 0;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("Could not read entry #{} of {}", index, archive_path.display()))?;

        let target = match entry.enclosed_name() {
            Some(relative) => dest_dir.join(relative),
            None => {
                warn!(entry = entry.name(), "skipping zip entry with unsafe path");
                continue;
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Could not create {}", target.display()))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }

        let mut out = File::create(&target)
            .with_context(|| format!("Could not create {}", target.display()))?;
        io::copy(&mut entry, &mut out)
            .with_context(|| format!("Could not extract {}", target.display()))?;
        files_written += 1;
    }

    debug!(
        archive = %archive_path.display(),
        files = files_written,
        "zip extracted"
    );
    Ok(files_written)
}
