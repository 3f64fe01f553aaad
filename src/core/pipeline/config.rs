//! Pipeline configuration.

use crate::error::{Result, SignerError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunable knobs for a pipeline run.
///
/// Missing fields in a config file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items a relay holds before its sender blocks
    pub relay_capacity: usize,
    /// Concurrent slow-hash calls allowed across the whole run
    pub throttle_permits: usize,
    /// Number of indexed fast-hash calls per item in the sextet stage
    pub sextet_width: usize,
    /// Joins the fast and slow branches in the pair stage
    pub pair_separator: String,
    /// Joins the sorted values in the merge stage
    pub merge_separator: String,
    /// Give up waiting for a throttle permit once none has been released for
    /// this long (`None` waits forever)
    pub throttle_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            relay_capacity: 100,
            throttle_permits: 1,
            sextet_width: 6,
            pair_separator: "~".to_string(),
            merge_separator: "_".to_string(),
            throttle_timeout_ms: Some(30_000),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SignerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
            .map_err(|e| SignerError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate a JSON config document
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| SignerError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.relay_capacity == 0 {
            return Err(SignerError::Config(
                "relay_capacity must be at least 1".to_string(),
            ));
        }
        if self.throttle_permits == 0 {
            return Err(SignerError::Config(
                "throttle_permits must be at least 1".to_string(),
            ));
        }
        if self.sextet_width == 0 {
            return Err(SignerError::Config(
                "sextet_width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Throttle timeout as a duration
    pub fn throttle_timeout(&self) -> Option<Duration> {
        self.throttle_timeout_ms.map(Duration::from_millis)
    }
}
