//! Engine configuration.

use serde::{Deserialize, Serialize};

/// How the two writes of a transition are offered to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// One `commit_transition` call; atomic when the repository supports it.
    #[default]
    Transactional,
    /// Separate `create` then `update` calls.
    Sequential,
}

/// Configuration for phase transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How successor creation and predecessor completion are committed.
    /// Successor first in both modes.
    pub commit_mode: CommitMode,

    /// Re-read the successor after committing and fail if the store does not have it.
    pub verify_after_commit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commit_mode: CommitMode::Transactional,
            verify_after_commit: false,
        }
    }
}

impl EngineConfig {
    /// Config that issues separate create and update calls.
    pub fn sequential() -> Self {
        Self {
            commit_mode: CommitMode::Sequential,
            ..Default::default()
        }
    }

    /// Set verify-after-commit.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_after_commit = verify;
        self
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
