//! Package tree copy.

use std::fs;
use std::io;
use std::path::Path;

use stow_schema::{DEPENDENCY_DIR, MANIFEST_FILE};

/// Recursively copy the package at `src` into `dest`.
///
/// The package's own top-level `node_modules` directory is excluded; nested
/// directories with that name deeper in the tree are copied like any other.
/// File modification times are carried over. Symlinks are recreated rather
/// than followed. The top-level manifest is written last, so its presence
/// at `dest` means every other file made it. Returns the number of regular
/// files copied.
///
/// # Errors
///
/// Returns the first I/O error hit while walking or writing.
pub fn copy_package(src: &Path, dest: &Path) -> io::Result<u64> {
    let excluded = src.join(DEPENDENCY_DIR);
    let manifest = src.join(MANIFEST_FILE);
    let mut files = 0u64;

    fs::create_dir_all(dest)?;

    for entry in walkdir::WalkDir::new(src)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.path() != excluded && e.path() != manifest)
    {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            preserve_mtime(entry.path(), &target);
            files += 1;
        }
    }

    if manifest.is_file() {
        let target = dest.join(MANIFEST_FILE);
        fs::copy(&manifest, &target)?;
        preserve_mtime(&manifest, &target);
        files += 1;
    }

    tracing::trace!(src = %src.display(), dest = %dest.display(), files, "copied package");
    Ok(files)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    if target.symlink_metadata().is_ok() {
        fs::remove_file(target)?;
    }
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(target)
    } else {
        fs::copy(src, target).map(|_| ())
    }
}

fn preserve_mtime(src: &Path, target: &Path) {
    let result = fs::metadata(src)
        .and_then(|m| m.modified())
        .and_then(|mtime| fs::File::open(target)?.set_modified(mtime));
    if let Err(e) = result {
        tracing::debug!(path = %target.display(), "could not preserve mtime: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copies_tree_without_top_level_node_modules() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fs::create_dir_all(src.join("lib/node_modules/inner")).unwrap();
        fs::create_dir_all(src.join("node_modules/dep")).unwrap();
        fs::write(src.join("package.json"), "{}").unwrap();
        fs::write(src.join("lib/index.js"), "module.exports = 1;").unwrap();
        fs::write(src.join("lib/node_modules/inner/x.js"), "").unwrap();
        fs::write(src.join("node_modules/dep/package.json"), "{}").unwrap();

        let dest = temp.path().join("out/pkg");
        let files = copy_package(&src, &dest).unwrap();

        assert_eq!(files, 3);
        assert!(dest.join("package.json").is_file());
        assert!(dest.join("lib/index.js").is_file());
        assert!(dest.join("lib/node_modules/inner/x.js").is_file());
        assert!(!dest.join("node_modules").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_copy_leaves_no_manifest() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("package.json"), "{}").unwrap();
        fs::write(src.join("main.js"), "").unwrap();

        // A directory where main.js should go makes that copy fail.
        let dest = temp.path().join("out");
        fs::create_dir_all(dest.join("main.js/blocker")).unwrap();

        assert!(copy_package(&src, &dest).is_err());
        assert!(!dest.join("package.json").exists());
    }

    #[test]
    fn test_preserves_modification_time() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fs::create_dir_all(&src).unwrap();
        let file = src.join("package.json");
        fs::write(&file, "{}").unwrap();

        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_500_000_000);
        fs::OpenOptions::new()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let dest = temp.path().join("out");
        copy_package(&src, &dest).unwrap();

        let copied = fs::metadata(dest.join("package.json")).unwrap().modified().unwrap();
        assert_eq!(copied, old);
    }

    #[cfg(unix)]
    #[test]
    fn test_recreates_symlinks() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("pkg");
        fs::create_dir_all(src.join("bin")).unwrap();
        fs::write(src.join("cli.js"), "").unwrap();
        std::os::unix::fs::symlink("../cli.js", src.join("bin/cli")).unwrap();

        let dest = temp.path().join("out");
        copy_package(&src, &dest).unwrap();

        let link = dest.join("bin/cli");
        assert!(link.symlink_metadata().unwrap().is_symlink());
        assert_eq!(fs::read_link(link).unwrap(), Path::new("../cli.js"));
    }
}
