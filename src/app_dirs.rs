use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "studybuddy";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/studybuddy`, or the platform data dir when `HOME` is unset
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    /// State dir, honouring an explicit override
    pub fn resolve_state_dir(override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .or_else(Self::state_dir)
            .unwrap_or_else(|| PathBuf::from(format!(".{APP_NAME}")))
    }

    pub fn db_path(state_dir: &Path) -> PathBuf {
        state_dir.join("store.db")
    }

    pub fn log_dir(state_dir: &Path) -> PathBuf {
        state_dir.join("logs")
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", APP_NAME) {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("studybuddy_config.json")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let dir = AppDirs::resolve_state_dir(Some(Path::new("/tmp/sb")));
        assert_eq!(dir, PathBuf::from("/tmp/sb"));
        assert_eq!(AppDirs::db_path(&dir), PathBuf::from("/tmp/sb/store.db"));
        assert_eq!(AppDirs::log_dir(&dir), PathBuf::from("/tmp/sb/logs"));
    }

    #[test]
    fn test_config_path_is_json() {
        assert_eq!(
            AppDirs::config_path().extension().and_then(|e| e.to_str()),
            Some("json")
        );
    }
}
