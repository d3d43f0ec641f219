// src/archive/normalize.rs
// =============================================================================
// Re-packs an extracted zipball without GitHub's wrapper folder.
//
// A zipball always unpacks to a single folder such as
//   neherlab-covid19_scenarios-1a2b3c4/
//     README.md
//     src/...
// and we want the final archive to start at README.md and src/ directly.
//
// How it works:
// 1. List the direct children of the extraction directory (sorted)
// 2. For a directory child: add everything INSIDE it, with paths relative
//    to that directory. This is what strips the wrapper name.
// 3. For any other child: add it at the archive root under its own name
// 4. Seal the archive (Deflate, level 9)
//
// Nothing here assumes there is exactly one child. Zero or several top-level
// entries are each handled by the same rule, so an unexpected layout still
// produces an archive instead of an error.
// =============================================================================

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// Deflate's strongest setting
const MAX_COMPRESSION_LEVEL: i32 = 9;

// Entries at or above this size need zip64 headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

// Writes `final_path` from the contents of `extract_dir`
//
// Returns: number of file entries in the new archive
//
// If anything fails part-way, the half-written archive is removed so a
// broken file never sits at the final path.
pub fn normalize(extract_dir: &Path, final_path: &Path) -> Result<usize> {
    let result = write_archive(extract_dir, final_path);

    if result.is_err() && final_path.exists() {
        if let Err(e) = fs::remove_file(final_path) {
            warn!(path = %final_path.display(), error = %e, "could not remove partial archive");
        }
    }

    result
}

fn write_archive(extract_dir: &Path, final_path: &Path) -> Result<usize> {
    let roots = top_level_entries(extract_dir)?;
    debug!(dir = %extract_dir.display(), roots = roots.len(), "re-rooting extracted tree");

    let file = File::create(final_path)
        .with_context(|| format!("Could not create {}", final_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(MAX_COMPRESSION_LEVEL));

    let mut files = 0;
    for root in &roots {
        let metadata = fs::symlink_metadata(root)
            .with_context(|| format!("Could not stat {}", root.display()))?;

        if metadata.is_dir() {
            files += add_directory_contents(&mut zip, root, options)?;
        } else {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("{} has no file name", root.display()))?;
            add_file(&mut zip, root, name, options)?;
            files += 1;
        }
    }

    zip.finish()
        .with_context(|| format!("Could not finalize {}", final_path.display()))?;

    Ok(files)
}

// Direct children of `dir`, sorted so repeated runs produce the same layout
fn top_level_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Could not list {}", dir.display()))? {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

// Adds everything under `root` with `root` itself stripped from the names
fn add_directory_contents(
    zip: &mut ZipWriter<File>,
    root: &Path,
    options: FileOptions,
) -> Result<usize> {
    let mut files = 0;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Could not walk {}", root.display()))?;
        let name = entry_name(entry.path().strip_prefix(root)?);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            add_file(zip, entry.path(), name, options)?;
            files += 1;
        }
    }

    Ok(files)
}

fn add_file(zip: &mut ZipWriter<File>, path: &Path, name: String, options: FileOptions) -> Result<()> {
    let mut source = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
    let size = source
        .metadata()
        .with_context(|| format!("Could not stat {}", path.display()))?
        .len();
    zip.start_file(name, options.large_file(needs_zip64(size)))?;
    io::copy(&mut source, zip).with_context(|| format!("Could not compress {}", path.display()))?;
    Ok(())
}

fn needs_zip64(size: u64) -> bool {
    size >= ZIP64_THRESHOLD
}

// Zip entry names always use forward slashes, whatever the host OS
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::extract_zip;
    use crate::archive::test_support::{read_tree, zip_entries};

    // Lays out an extraction directory that looks like a real zipball
    fn fake_extraction(root: &Path) {
        let wrapper = root.join("neherlab-covid19_scenarios-1a2b3c4");
        fs::create_dir_all(wrapper.join("src/components")).unwrap();
        fs::create_dir_all(wrapper.join("empty")).unwrap();
        fs::write(wrapper.join("README.md"), "# covid19_scenarios\n").unwrap();
        fs::write(wrapper.join("package.json"), "{}").unwrap();
        fs::write(wrapper.join("src/index.ts"), "export {}\n").unwrap();
        fs::write(wrapper.join("src/components/App.tsx"), "<App />").unwrap();
    }

    #[test]
    fn test_strips_wrapper_folder() {
        let dir = tempfile::tempdir().unwrap();
        let extract = dir.path().join("extract");
        fake_extraction(&extract);
        let final_zip = dir.path().join("final.zip");

        let files = normalize(&extract, &final_zip).unwrap();

        assert_eq!(files, 4);
        let names = zip_entries(&final_zip);
        assert!(names.contains(&"README.md".to_string()));
        assert!(names.contains(&"src/components/App.tsx".to_string()));
        assert!(names.iter().all(|n| !n.starts_with("neherlab-covid19_scenarios")));
    }

    #[test]
    fn test_round_trip_matches_wrapper_contents() {
        let dir = tempfile::tempdir().unwrap();
        let extract = dir.path().join("extract");
        fake_extraction(&extract);
        let final_zip = dir.path().join("final.zip");
        normalize(&extract, &final_zip).unwrap();

        let unpacked = dir.path().join("unpacked");
        extract_zip(&final_zip, &unpacked).unwrap();

        // Includes the empty directory
        assert_eq!(
            read_tree(&unpacked),
            read_tree(&extract.join("neherlab-covid19_scenarios-1a2b3c4"))
        );
    }

    #[test]
    fn test_license_and_src_end_up_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let extract = dir.path().join("extract");
        let wrapper = extract.join("owner-name-abc123");
        fs::create_dir_all(wrapper.join("src")).unwrap();
        fs::write(wrapper.join("LICENSE"), "MIT").unwrap();
        fs::write(wrapper.join("src/lib.rs"), "pub fn f() {}").unwrap();
        let final_zip = dir.path().join("final.zip");

        let files = normalize(&extract, &final_zip).unwrap();

        assert_eq!(files, 2);
        assert_eq!(
            zip_entries(&final_zip),
            vec!["LICENSE".to_string(), "src/".to_string(), "src/lib.rs".to_string()]
        );
    }

    #[test]
    fn test_unexpected_top_level_layout_still_packs() {
        // No single wrapper: a loose file next to a directory
        let dir = tempfile::tempdir().unwrap();
        let extract = dir.path().join("extract");
        fs::create_dir_all(extract.join("src")).unwrap();
        fs::write(extract.join("LICENSE"), "MIT").unwrap();
        fs::write(extract.join("src/lib.rs"), "pub fn f() {}").unwrap();
        let final_zip = dir.path().join("final.zip");

        let files = normalize(&extract, &final_zip).unwrap();

        assert_eq!(files, 2);
        assert_eq!(zip_entries(&final_zip), vec!["LICENSE".to_string(), "lib.rs".to_string()]);
    }

    #[test]
    fn test_empty_extraction_gives_empty_archive() {
        let dir = tempfile::tempdir().unwrap();
        let extract = dir.path().join("extract");
        fs::create_dir_all(&extract).unwrap();
        let final_zip = dir.path().join("final.zip");

        assert_eq!(normalize(&extract, &final_zip).unwrap(), 0);
        assert!(zip_entries(&final_zip).is_empty());
    }

    #[test]
    fn test_running_twice_gives_same_entries() {
        let dir = tempfile::tempdir().unwrap();
        let extract = dir.path().join("extract");
        fake_extraction(&extract);

        let first = dir.path().join("first.zip");
        let second = dir.path().join("second.zip");
        normalize(&extract, &first).unwrap();
        normalize(&extract, &second).unwrap();

        assert_eq!(zip_entries(&first), zip_entries(&second));
    }

    #[test]
    fn test_missing_directory_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let final_zip = dir.path().join("final.zip");

        let result = normalize(&dir.path().join("does-not-exist"), &final_zip);

        assert!(result.is_err());
        assert!(!final_zip.exists());
    }

    #[test]
    fn test_zip64_only_for_huge_files() {
        assert!(!needs_zip64(0));
        assert!(!needs_zip64(u64::from(u32::MAX) - 1));
        assert!(needs_zip64(u64::from(u32::MAX)));
        assert!(needs_zip64(5 * 1024 * 1024 * 1024));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_write_leaves_no_archive() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let extract = dir.path().join("extract");
        let wrapper = extract.join("owner-name-abc123");
        fs::create_dir_all(&wrapper).unwrap();
        fs::write(wrapper.join("ok.txt"), "fine").unwrap();
        let secret = wrapper.join("secret.txt");
        fs::write(&secret, "hidden").unwrap();
        fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();
        let final_zip = dir.path().join("final.zip");

        // Root can read anything; only meaningful for unprivileged users
        if File::open(&secret).is_ok() {
            return;
        }

        assert!(normalize(&extract, &final_zip).is_err());
        assert!(!final_zip.exists());
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let relative: PathBuf = ["src", "components", "App.tsx"].iter().collect();
        assert_eq!(entry_name(&relative), "src/components/App.tsx");
    }
}
