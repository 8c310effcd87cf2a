//! Engine configuration.
//!
//! Handles loading and validation of engine parameters from config files.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Voting engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Requested-amount units per required vote. A milestone's vote
    /// threshold is its amount divided by this, floored at 1. Deployment
    /// parameter, not a voter-facing concept.
    pub vote_scale: u64,
    /// Proposal validity window in seconds
    pub proposal_window_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vote_scale: 100,
            proposal_window_secs: 604_800, // 7 days
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    /// Path is validated to prevent directory traversal.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let path_str = path.to_string_lossy();
        if path_str.contains("..") {
            anyhow::bail!("Invalid path: directory traversal detected");
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: EngineConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter sanity.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.vote_scale == 0 {
            anyhow::bail!("vote_scale must be non-zero");
        }
        if self.proposal_window_secs == 0 {
            anyhow::bail!("proposal_window_secs must be non-zero");
        }
        Ok(())
    }
}
