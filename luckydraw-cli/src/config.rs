use luckydraw_core::{DrawError, SessionConfig};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "luckydraw.json";

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    /// Directory holding the shared document every replica watches.
    pub remote_dir: PathBuf,
    pub config_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("luckydraw");
        Self {
            remote_dir: data_dir.join("shared"),
            data_dir,
            config_file: None,
        }
    }
}

impl CliConfig {
    pub fn new(
        data_dir: Option<PathBuf>,
        remote_dir: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> Self {
        let defaults = Self::default();
        let data_dir = data_dir.unwrap_or(defaults.data_dir);
        let remote_dir = remote_dir.unwrap_or_else(|| data_dir.join("shared"));
        Self {
            data_dir,
            remote_dir,
            config_file,
        }
    }

    /// Session settings from `--config`, else `<data_dir>/luckydraw.json`
    /// when present, else built-in defaults.
    pub fn session_config(&self) -> Result<SessionConfig, DrawError> {
        if let Some(path) = &self.config_file {
            return SessionConfig::from_file(path);
        }

        let implicit = self.data_dir.join(CONFIG_FILE);
        if implicit.exists() {
            return SessionConfig::from_file(&implicit);
        }

        Ok(SessionConfig::default())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn remote_dir(&self) -> &Path {
        &self.remote_dir
    }
}
