use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SatchelConfig {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the knowledge base server
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Fixed delay between consecutive status polls (ms)
    pub interval_ms: u64,

    /// Polls after the initial status check before giving up
    pub max_attempts: u32,

    /// How long transient success notices stay on screen (ms)
    pub notice_ttl_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Where session and theme state live; defaults to ~/.satchel
    pub state_dir: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_attempts: 40,
            notice_ttl_ms: 4000,
        }
    }
}

impl SatchelConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;

        let config: SatchelConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        Ok(config)
    }

    /// Load `path` if given, else `satchel.toml` next to the binary's cwd if it
    /// exists, else defaults. `SATCHEL_API_URL` overrides the configured base URL.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => {
                let default_path = Path::new("satchel.toml");
                if default_path.exists() {
                    Self::load_from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(url) = std::env::var("SATCHEL_API_URL") {
            if !url.trim().is_empty() {
                config.api.base_url = url;
            }
        }

        Ok(config)
    }

    /// Resolved directory for session/theme state.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.state_dir {
            return dir.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".satchel"),
            None => PathBuf::from(".satchel"),
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| anyhow!("Failed to write config file: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SatchelConfig::default();
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.polling.max_attempts, 40);
        assert_eq!(config.polling.notice_ttl_ms, 4000);
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satchel.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[api]\nbase_url = \"https://kb.example.com\"").unwrap();

        let config = SatchelConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api.base_url, "https://kb.example.com");
        assert_eq!(config.polling.max_attempts, 40);
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satchel.toml");
        let mut config = SatchelConfig::default();
        config.polling.max_attempts = 10;
        config.save_to_file(&path).unwrap();

        let loaded = SatchelConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.polling.max_attempts, 10);
    }
}
