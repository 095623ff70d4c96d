use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub chunk_store_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Builds paths rooted at an explicit data directory.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let chunk_store_path = user_data_dir.join(defaults::DEFAULT_CHUNK_STORE_FILE);
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            chunk_store_path,
            secrets_path,
        }
    }

    /// Resolves a configured path against the user data dir.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let candidate = PathBuf::from(raw);
        if candidate.is_absolute() {
            candidate
        } else {
            self.user_data_dir.join(candidate)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("RAGSWITCH_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("RAGSWITCH_DATA_DIR") {
        return PathBuf::from(dir);
    }

    // Release builds keep state under the XDG data home.
    if !cfg!(debug_assertions) {
        if let Some(base) = env::var_os("XDG_DATA_HOME") {
            return PathBuf::from(base).join("ragswitch");
        }
        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(".local/share/ragswitch");
        }
    }

    project_root.join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_data_dir_creates_log_dir_and_resolves_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(tmp.path().to_path_buf(), tmp.path().join("data"));

        assert!(paths.log_dir.exists());
        assert_eq!(paths.resolve("chunks.db"), tmp.path().join("data").join("chunks.db"));
        assert_eq!(paths.resolve("/abs/chunks.db"), PathBuf::from("/abs/chunks.db"));
        assert_eq!(paths.secrets_path, tmp.path().join("data").join("secrets.yaml"));
    }

    #[test]
    fn data_dir_env_override_wins() {
        let tmp = tempfile::tempdir().unwrap();
        env::set_var("RAGSWITCH_DATA_DIR", tmp.path());
        let discovered = discover_user_data_dir(Path::new("/nonexistent-root"));
        env::remove_var("RAGSWITCH_DATA_DIR");

        assert_eq!(discovered, tmp.path());
    }
}
