use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::gemini::{DEFAULT_API_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::travel_time::DEFAULT_BATCH_SIZE;

pub const DEFAULT_CONFIG_FILE: &str = "hsr_isochrone.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub temperature: f64,
    pub batch_size: usize,
    pub cache_capacity: usize,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            batch_size: DEFAULT_BATCH_SIZE,
            cache_capacity: 100,
            cache_dir: None,
        }
    }
}

// Every key is optional; absent keys keep the default
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_key: Option<String>,
    api_base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    batch_size: Option<usize>,
    cache_capacity: Option<usize>,
    cache_dir: Option<PathBuf>,
}

impl Settings {
    /// Defaults, then the config file, then environment variables.
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        let file = match path {
            Some(path) => Some(read_file(path)?),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Some(read_file(default_path)?)
                } else {
                    None
                }
            }
        };
        if let Some(file) = file {
            settings.apply_file(file);
        }

        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.batch_size {
            self.batch_size = v.max(1);
        }
        if let Some(v) = file.cache_capacity {
            self.cache_capacity = v;
        }
        if let Some(v) = file.cache_dir {
            self.cache_dir = Some(v);
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = var("GEMINI_API_KEY") {
            self.api_key = Some(v);
        }
        // An empty key means "not configured"
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }

        if let Some(v) = var("HSR_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = var("HSR_MODEL") {
            self.model = v;
        }
        if let Some(v) = var("HSR_BATCH_SIZE").and_then(|v| v.parse::<usize>().ok()) {
            self.batch_size = v.max(1);
        }
        if let Some(v) = var("HSR_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
    }
}

fn read_file(path: &Path) -> Result<FileSettings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_have_no_key() {
        let settings = Settings::default();
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.batch_size, 6);
        assert_eq!(settings.model, "gemini-2.5-flash");
    }

    #[test]
    fn gemini_key_wins_over_generic_key() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("API_KEY", "generic"), ("GEMINI_API_KEY", "gemini")]));
        assert_eq!(settings.api_key.as_deref(), Some("gemini"));
    }

    #[test]
    fn blank_key_is_treated_as_missing() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("API_KEY", "  ")]));
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn batch_size_is_at_least_one() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("HSR_BATCH_SIZE", "0")]));
        assert_eq!(settings.batch_size, 1);

        settings.apply_env(env(&[("HSR_BATCH_SIZE", "not a number")]));
        assert_eq!(settings.batch_size, 1);
    }

    #[test]
    fn file_values_override_defaults() {
        let file: FileSettings = toml::from_str(
            r#"
            model = "gemini-2.5-pro"
            batch_size = 4
            cache_dir = "/tmp/hsr"
            "#,
        )
        .unwrap();
        let mut settings = Settings::default();
        settings.apply_file(file);
        assert_eq!(settings.model, "gemini-2.5-pro");
        assert_eq!(settings.batch_size, 4);
        assert_eq!(settings.cache_dir, Some(PathBuf::from("/tmp/hsr")));
        assert_eq!(settings.cache_capacity, 100);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
