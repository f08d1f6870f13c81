/*
 * Provisions the folder one diagnostics session writes into. Sessions live
 * next to each other under the user data root as `Diagnostics-<H>h<M>m<S>s`,
 * possibly suffixed ` (n)` when another run started in the same second.
 * Provisioning first removes sessions older than the retention window; that
 * cleanup is best-effort and never aborts startup.
 */
use crate::core::error::{DiagnosticsError, Result};
use crate::core::path_utils;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use time::OffsetDateTime;

pub const SESSION_FOLDER_PREFIX: &str = "Diagnostics";
pub const SESSION_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/*
 * Builds the folder name for a session started at `started_at`. Fields are
 * not zero padded, so 09:05:03 gives `Diagnostics-9h5m3s`.
 */
pub fn session_folder_name(started_at: OffsetDateTime) -> String {
    format!(
        "{SESSION_FOLDER_PREFIX}-{}h{}m{}s",
        started_at.hour(),
        started_at.minute(),
        started_at.second()
    )
}

// Creation time where the platform records one, modification time otherwise.
fn folder_age_reference(path: &Path) -> io::Result<SystemTime> {
    let metadata = fs::metadata(path)?;
    metadata.created().or_else(|_| metadata.modified())
}

/*
 * Deletes every `Diagnostics-*` folder under `root` whose age reference is
 * older than `now - retention`. Returns the folders that were removed.
 * Folders that cannot be inspected or deleted (files still open by another
 * process, permissions) are logged and left in place.
 */
pub fn prune_stale_sessions(root: &Path, now: SystemTime, retention: Duration) -> Vec<PathBuf> {
    let expiration = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    // The root itself may contain glob metacharacters.
    let escaped_root = PathBuf::from(glob::Pattern::escape(&root.to_string_lossy()));
    let pattern = escaped_root
        .join(format!("{SESSION_FOLDER_PREFIX}-*"))
        .to_string_lossy()
        .into_owned();

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("SessionFolder: Invalid cleanup pattern '{pattern}': {e}");
            return Vec::new();
        }
    };

    let mut removed = Vec::new();
    for entry in entries {
        let dir = match entry {
            Ok(dir) => dir,
            Err(e) => {
                log::warn!("SessionFolder: Skipping unreadable entry during cleanup: {e}");
                continue;
            }
        };
        if !dir.is_dir() {
            continue;
        }
        let created = match folder_age_reference(&dir) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("SessionFolder: Cannot read age of {dir:?}: {e}");
                continue;
            }
        };
        if created >= expiration {
            log::trace!("SessionFolder: Keeping recent session {dir:?}");
            continue;
        }
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                log::debug!("SessionFolder: Removed stale session {dir:?}");
                removed.push(dir);
            }
            Err(e) => log::warn!("SessionFolder: Failed to remove stale session {dir:?}: {e}"),
        }
    }
    removed
}

/*
 * Creates a fresh session folder under `root` named after `started_at`,
 * trying `name`, `name (1)`, `name (2)`, ... until `create_dir` succeeds.
 * Creation itself is the existence check, so two runs started in the same
 * second can never end up sharing a folder.
 */
pub fn create_session_folder(root: &Path, started_at: OffsetDateTime) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(DiagnosticsError::InvalidRoot(root.to_path_buf()));
    }
    let base = root.join(session_folder_name(started_at));
    let mut index = 0;
    loop {
        let candidate = path_utils::numbered_variant(&base, index);
        match fs::create_dir(&candidate) {
            Ok(()) => {
                log::debug!("SessionFolder: Created session folder {candidate:?}");
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => index += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/*
 * Full provisioning: prune stale sessions, then create this run's folder.
 */
pub fn provision_session_folder(root: &Path, started_at: OffsetDateTime) -> Result<PathBuf> {
    provision_session_folder_at(root, started_at, SystemTime::now(), SESSION_RETENTION)
}

// Provisioning against an explicit clock and retention window.
fn provision_session_folder_at(
    root: &Path,
    started_at: OffsetDateTime,
    now: SystemTime,
    retention: Duration,
) -> Result<PathBuf> {
    let removed = prune_stale_sessions(root, now, retention);
    if !removed.is_empty() {
        log::info!(
            "SessionFolder: Removed {} stale diagnostics session(s) under {root:?}",
            removed.len()
        );
    }
    create_session_folder(root, started_at)
}
