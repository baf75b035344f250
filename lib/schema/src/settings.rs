//! Editor settings.
//!
//! Settings are plain serde structs with per-field defaults so that any
//! configuration source (environment, file) can fill in only what it needs.

use crate::tree::DEFAULT_PROPERTY_NAME;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How reference candidates are compared with a field's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeEquality {
    /// Same top-level kind only.
    #[default]
    Weak,
    /// Same kind all the way down.
    Strong,
}

/// How reference paths name the producing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStrategy {
    /// Node titles. Renaming a node breaks references captured before.
    #[default]
    Title,
    /// Node ids. Titles are used for display only.
    StableId,
}

/// Settings for one editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Quiet period before pending edits are committed, in milliseconds.
    #[serde(default = "default_commit_debounce_ms")]
    pub commit_debounce_ms: u64,

    /// Base name for properties added without a name.
    #[serde(default = "default_property_name")]
    pub default_property_name: String,

    /// Type comparison used when filtering reference candidates.
    #[serde(default)]
    pub type_equality: TypeEquality,

    /// How reference paths are built.
    #[serde(default)]
    pub path_strategy: PathStrategy,

    /// Omit incompatible candidates instead of showing them disabled.
    #[serde(default = "default_prune_incompatible")]
    pub prune_incompatible: bool,
}

fn default_commit_debounce_ms() -> u64 {
    300
}

fn default_property_name() -> String {
    DEFAULT_PROPERTY_NAME.to_string()
}

fn default_prune_incompatible() -> bool {
    true
}

impl EditorSettings {
    /// Returns the commit quiet period.
    #[must_use]
    pub fn commit_debounce(&self) -> Duration {
        Duration::from_millis(self.commit_debounce_ms)
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            commit_debounce_ms: default_commit_debounce_ms(),
            default_property_name: default_property_name(),
            type_equality: TypeEquality::default(),
            path_strategy: PathStrategy::default(),
            prune_incompatible: default_prune_incompatible(),
        }
    }
}
