/*
 * Path helpers shared by the diagnostics session: resolving the per-user
 * directories the application writes into, and naming the disambiguated
 * variants used when a session folder or sink file name is already taken.
 * Callers create with `create_dir`/`create_new` and move to the next variant
 * on `AlreadyExists`, which keeps concurrent processes from colliding.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/*
 * Makes sure `dir` exists, creating it and any missing parents. Returns `None`
 * (after logging) when the directory cannot be created.
 */
fn ensure_dir(dir: &Path, label: &str) -> Option<PathBuf> {
    if dir.exists() {
        log::trace!("PathUtils: {label} directory already exists: {dir:?}");
        return Some(dir.to_path_buf());
    }
    match fs::create_dir_all(dir) {
        Ok(()) => {
            log::debug!("PathUtils: Created {label} directory: {dir:?}");
            Some(dir.to_path_buf())
        }
        Err(e) => {
            log::error!("PathUtils: Failed to create {label} directory {dir:?}: {e}");
            None
        }
    }
}

/*
 * Retrieves the application's local (non-roaming) configuration directory,
 * e.g. AppData/Local/<app>/config on Windows, creating it when missing.
 * Returns `None` if no home directory can be resolved or creation fails.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Resolving config dir for '{app_name}'");
    let proj_dirs = ProjectDirs::from("", "", app_name)?;
    ensure_dir(proj_dirs.config_local_dir(), "config")
}

/*
 * Retrieves the per-user local data directory under which diagnostics sessions
 * are stored, creating it when missing.
 */
pub fn get_user_data_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Resolving user data dir for '{app_name}'");
    let proj_dirs = ProjectDirs::from("", "", app_name)?;
    ensure_dir(proj_dirs.data_local_dir(), "user data")
}

/*
 * Builds the `index`-th disambiguated variant of `path`: `name (index).ext`.
 * Index 0 is the path itself.
 */
pub fn numbered_variant(path: &Path, index: u32) -> PathBuf {
    if index == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem} ({index}).{}", ext.to_string_lossy()),
        None => format!("{stem} ({index})"),
    };
    path.with_file_name(file_name)
}

/*
 * Turns a display name into something usable as a file name on every platform.
 */
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        "Thread".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_variant_zero_is_the_path_itself() {
        let path = PathBuf::from("/data/Diagnostics-9h5m3s");
        assert_eq!(numbered_variant(&path, 0), path);
    }

    #[test]
    fn test_numbered_variant_appends_index_to_folder_name() {
        let path = PathBuf::from("/data/Diagnostics-9h5m3s");
        assert_eq!(
            numbered_variant(&path, 2),
            PathBuf::from("/data/Diagnostics-9h5m3s (2)")
        );
    }

    #[test]
    fn test_numbered_variant_keeps_file_extension() {
        let path = PathBuf::from("/data/session/Application.log");
        assert_eq!(
            numbered_variant(&path, 1),
            PathBuf::from("/data/session/Application (1).log")
        );
    }

    #[test]
    fn test_sanitize_file_name_replaces_separators() {
        assert_eq!(sanitize_file_name("worker/io (3)"), "worker_io (3)");
        assert_eq!(sanitize_file_name("Application"), "Application");
        assert_eq!(sanitize_file_name("   "), "Thread");
        assert_eq!(sanitize_file_name("a:b*c?"), "a_b_c_");
    }

    #[test]
    fn test_get_user_data_dir_creates_directory() {
        // Arrange
        let unique_app_name = format!("TestApp_DataDir_{}", rand::random::<u128>());

        // Act
        let path_opt = get_user_data_dir(&unique_app_name);

        // Assert
        let Some(path) = path_opt else {
            // No resolvable home directory in this environment.
            return;
        };
        assert!(path.is_dir(), "Directory should exist at {path:?}");
        assert!(
            path.to_string_lossy()
                .to_lowercase()
                .contains(&unique_app_name.to_lowercase())
        );

        // Cleanup
        if let Some(proj_dirs) = ProjectDirs::from("", "", &unique_app_name) {
            let app_root = proj_dirs.data_local_dir();
            let to_remove = if app_root.ends_with("data") {
                app_root.parent().unwrap_or(app_root)
            } else {
                app_root
            };
            if let Err(e) = fs::remove_dir_all(to_remove) {
                eprintln!("Test cleanup error for {to_remove:?}: {e}");
            }
        }
    }
}
