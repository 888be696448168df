//! Plugin binary discovery.
//!
//! A candidate plugin is any regular file beneath the configured root
//! whose name ends with [`PLUGIN_SUFFIX`] and whose mode marks it
//! executable by its owner. Non-executable matches are authoring
//! mistakes, not errors, and are skipped silently.

use crate::error::{PluginError, Result};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File-name suffix that marks a binary as a plugin.
pub const PLUGIN_SUFFIX: &str = ".tool.plugin";

/// Scans `root` recursively for executable plugin binaries.
///
/// Subdirectories are descended unconditionally and to unbounded depth.
/// Entries are visited in file-name order, so the result is deterministic
/// for a given filesystem state.
///
/// # Errors
///
/// Returns [`PluginError::Discovery`] when the traversal itself fails
/// (missing root, permission denied) or when a matched file cannot be
/// stat'ed.
///
/// # Examples
///
/// ```no_run
/// use toolbelt_plugin::scan_plugins;
///
/// # fn main() -> toolbelt_plugin::Result<()> {
/// let candidates = scan_plugins("./plugins")?;
/// for path in &candidates {
///     println!("found plugin: {}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn scan_plugins(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut paths = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                return Err(PluginError::Discovery {
                    path,
                    source: err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::other("directory walk failed")),
                });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(PLUGIN_SUFFIX) {
            continue;
        }

        let metadata = entry.metadata().map_err(|err| PluginError::Discovery {
            path: entry.path().to_path_buf(),
            source: err
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("metadata read failed")),
        })?;

        if is_owner_executable(&metadata) {
            paths.push(entry.into_path());
        }
    }

    Ok(paths)
}

#[cfg(unix)]
fn is_owner_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o100 != 0
}

#[cfg(not(unix))]
fn is_owner_executable(_metadata: &std::fs::Metadata) -> bool {
    // No executable bit to consult; the suffix alone selects candidates.
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_file(path: &Path, mode: u32) {
        fs::write(path, b"#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_scan_finds_executable_plugins() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("a.tool.plugin"), 0o755);
        write_file(&temp.path().join("b.tool.plugin"), 0o700);

        let found = scan_plugins(temp.path()).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_scan_skips_non_executable_matches() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("runnable.tool.plugin"), 0o755);
        write_file(&temp.path().join("data.tool.plugin"), 0o644);

        let found = scan_plugins(temp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("runnable.tool.plugin"));
    }

    #[test]
    fn test_scan_skips_other_suffixes() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("tool.plugin.bak"), 0o755);
        write_file(&temp.path().join("plain.sh"), 0o755);

        let found = scan_plugins(temp.path()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_scan_descends_subdirectories() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();
        write_file(&nested.join("deep.tool.plugin"), 0o755);

        let found = scan_plugins(temp.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("deep.tool.plugin"));
    }

    #[test]
    fn test_scan_order_is_deterministic() {
        let temp = TempDir::new().unwrap();
        write_file(&temp.path().join("zeta.tool.plugin"), 0o755);
        write_file(&temp.path().join("alpha.tool.plugin"), 0o755);
        write_file(&temp.path().join("mid.tool.plugin"), 0o755);

        let first = scan_plugins(temp.path()).unwrap();
        let second = scan_plugins(temp.path()).unwrap();
        assert_eq!(first, second);
        assert!(first[0].ends_with("alpha.tool.plugin"));
        assert!(first[2].ends_with("zeta.tool.plugin"));
    }

    #[test]
    fn test_scan_missing_root_is_discovery_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("does-not-exist");

        let err = scan_plugins(&missing).unwrap_err();
        assert!(err.is_discovery());
    }

    #[test]
    fn test_scan_empty_root_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(scan_plugins(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_owner_only_execute_bit_counts() {
        let temp = TempDir::new().unwrap();
        // Executable for owner but nobody else.
        write_file(&temp.path().join("private.tool.plugin"), 0o700);

        let found = scan_plugins(temp.path()).unwrap();
        assert_eq!(found.len(), 1);
    }
}
