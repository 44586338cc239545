use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration settings for Cachelytics
///
/// Stores user preferences that persist between runs, including:
/// - where captured gateway activity and cache-ping responses live
/// - default output format and date window
/// - watch interval and export directory
/// - log filter
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Captured activity export (file or directory of daily captures)
    pub data_path: Option<PathBuf>,
    /// Captured cache-ping response used by `health` when no flag is given
    pub health_response_path: Option<PathBuf>,
    /// Default output format for reports
    pub default_output_format: OutputFormat,
    /// Days covered by the default date window, today included
    pub default_range_days: i64,
    /// Interval in seconds for watch mode periodic refresh
    pub watch_interval_seconds: u64,
    /// Directory for CSV exports (default: current directory)
    pub export_directory: Option<PathBuf>,
    /// tracing filter used when CACHELYTICS_LOG is unset
    pub log_level: String,
}

/// Output format options for reports
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Summary card, bars and table (default)
    Enhanced,
    /// Table only
    Table,
    /// JSON for scripting
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            health_response_path: None,
            default_output_format: OutputFormat::Enhanced,
            default_range_days: 7,
            watch_interval_seconds: 5,
            export_directory: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid config file {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".config").join("cachelytics").join("config.yaml"))
    }

    /// Configured data path, or `./cache_activity` when none is set
    pub fn get_data_path(&self) -> PathBuf {
        self.data_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("cache_activity"))
    }

    pub fn set_data_path(&mut self, path: PathBuf) {
        self.data_path = Some(path);
    }

    pub fn get_export_directory(&self) -> PathBuf {
        self.export_directory
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_output_format, OutputFormat::Enhanced);
        assert_eq!(config.default_range_days, 7);
        assert_eq!(config.get_data_path(), PathBuf::from("cache_activity"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let config: Config =
            serde_yaml::from_str("data_path: /srv/captures\ndefault_output_format: Json\n")
                .unwrap();
        assert_eq!(config.data_path, Some(PathBuf::from("/srv/captures")));
        assert_eq!(config.default_output_format, OutputFormat::Json);
        assert_eq!(config.watch_interval_seconds, 5);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_paths() {
        let mut config = Config::default();
        config.set_data_path(PathBuf::from("/tmp/activity.json"));
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(loaded.get_data_path(), PathBuf::from("/tmp/activity.json"));
    }
}
