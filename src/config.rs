//! Optional project configuration, loaded from `.codekg.toml` at the scan
//! root. Every field has a default so the tool runs unconfigured; the file
//! only overrides policy thresholds consumed by the analytical layer.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EngineError, Result};

pub const CONFIG_FILE_NAME: &str = ".codekg.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_hidden: bool,
    pub max_file_size_bytes: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            include_hidden: false,
            max_file_size_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// A file's bus factor below this many contributors is flagged
    /// at-risk in `ownership::OwnershipReport::at_risk_files`.
    pub bus_factor_threshold: u32,
    /// Number of days of snapshot history the velocity analyzer looks
    /// back over when fitting its linear regression.
    pub velocity_window_days: u32,
    /// Minimum co-change count before two files are reported as coupled.
    pub coupling_min_cochanges: u32,
    /// Minimum Jaccard similarity before two files are reported as coupled.
    pub coupling_min_similarity: f64,
    /// Number of commits a hotspot needs within the churn window to be
    /// considered for the complexity x churn quadrant analysis.
    pub hotspot_min_commits: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bus_factor_threshold: 2,
            velocity_window_days: 90,
            coupling_min_cochanges: 3,
            coupling_min_similarity: 0.3,
            hotspot_min_commits: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Loads `.codekg.toml` from `root` if present, else returns defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| EngineError::io(&path, e))?;
        toml::from_str(&text).map_err(|e| EngineError::parse(&path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.analysis.bus_factor_threshold, 2);
    }

    #[test]
    fn partial_config_overrides_only_given_fields() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(file, "[analysis]\nbus_factor_threshold = 5\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.analysis.bus_factor_threshold, 5);
        assert_eq!(config.analysis.velocity_window_days, 90);
        assert!(config.discovery.exclude.is_empty());
    }
}
