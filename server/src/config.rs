// Server configuration persisted as TOML.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Settings for the lobby server.
///
/// Fields:
/// - port: TCP port the HTTP/WebSocket listener binds
/// - countdown_seconds: delay between all-ready and session start
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub countdown_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            countdown_seconds: 10,
        }
    }
}

impl Config {
    /// Load configuration from `path`. If the file does not exist, create it
    /// with defaults and return the default config.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            let cfg: Config = toml::from_str(&text)
                .with_context(|| format!("parsing TOML config '{}'", path.display()))?;
            Ok(cfg)
        } else {
            let cfg = Config::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Save the current config back to `path` (overwrites).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating config directory '{}'", parent.display()))?;
            }
        }
        let text =
            toml::to_string_pretty(&self).with_context(|| "serializing config to TOML")?;
        fs::write(path, text).with_context(|| format!("writing config to '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = std::env::temp_dir().join(format!(
            "parlor-config-test-{}-{:?}.toml",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = fs::remove_file(&path);

        let cfg = Config::load_or_create(&path).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.countdown_seconds, 10);
        assert!(path.exists());

        // a second load reads the file it just wrote
        let reloaded = Config::load_or_create(&path).unwrap();
        assert_eq!(reloaded.port, cfg.port);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let cfg: Config = toml::from_str("port = 4100").unwrap();
        assert_eq!(cfg.port, 4100);
        assert_eq!(cfg.countdown_seconds, 10);
    }
}
