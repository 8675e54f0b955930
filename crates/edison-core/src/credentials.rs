//! Credential directory housekeeping.
//!
//! The protocol library writes its credential material as files under a
//! dedicated directory. Deleting every file there is equivalent to a full
//! logout; the next session starts unregistered and asks for a pairing code.

use std::path::Path;
use tracing::{debug, warn};

/// Create the credential directory if it does not exist.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Whether the directory holds any credential files.
pub fn has_credentials(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.any(|e| e.map(|e| e.path().is_file()).unwrap_or(false)))
        .unwrap_or(false)
}

/// Delete every file in `dir`. The directory itself is kept.
///
/// Returns the number of files removed. Individual failures are logged and
/// skipped; only a failure to list the directory is returned as an error.
pub fn purge(dir: &Path) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(e) => e.path(),
            Err(e) => {
                warn!("credential purge: unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) => {
                debug!("credential purge: removed {}", path.display());
                removed += 1;
            }
            Err(e) => warn!("credential purge: failed to remove {}: {e}", path.display()),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_removes_all_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("creds.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("session.db"), b"x").unwrap();
        std::fs::write(tmp.path().join("session.db-wal"), b"x").unwrap();
        assert!(has_credentials(tmp.path()));

        let removed = purge(tmp.path()).unwrap();
        assert_eq!(removed, 3);
        assert!(!has_credentials(tmp.path()));
        assert!(tmp.path().exists(), "directory itself should survive");
    }

    #[test]
    fn test_purge_missing_dir_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert_eq!(purge(&missing).unwrap(), 0);
    }

    #[test]
    fn test_has_credentials_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!has_credentials(tmp.path()));
        ensure_dir(&tmp.path().join("nested/auth")).unwrap();
        assert!(!has_credentials(&tmp.path().join("nested/auth")));
    }
}
