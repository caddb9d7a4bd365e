//! Link registry: which local projects link to which.
//!
//! Built incrementally as projects are processed and written out once at the
//! end of a fully successful pass as the run-level summary artifact.

use super::error::LinkError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Filename of the run-level link state artifact.
pub const LINK_STATE_FILENAME: &str = "crane-link.json";

/// Mapping from project name to the local projects it directly depends on.
///
/// Per-project link lists preserve dependency declaration order and hold
/// each name at most once. Cross-project ordering is alphabetical by
/// construction (`BTreeMap`), which keeps the artifact deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRegistry {
    #[serde(default)]
    local_links: BTreeMap<String, Vec<String>>,
}

impl LinkRegistry {
    /// Record that `project` links to local `dependency`.
    ///
    /// Re-recording an existing pair is a no-op, so a dependency appears in
    /// a project's list exactly once.
    pub fn add_local_link(&mut self, project: &str, dependency: &str) {
        let links = self.local_links.entry(project.to_string()).or_default();
        if !links.iter().any(|l| l == dependency) {
            links.push(dependency.to_string());
        }
    }

    /// Local links recorded for a project, in declaration order.
    #[must_use]
    pub fn links_for(&self, project: &str) -> Option<&[String]> {
        self.local_links.get(project).map(Vec::as_slice)
    }

    /// All projects with recorded links.
    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.local_links.keys().map(String::as_str)
    }

    /// Total number of recorded links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local_links.values().map(Vec::len).sum()
    }

    /// Whether any links were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local_links.is_empty()
    }

    /// Write the registry artifact atomically.
    pub fn save(&self, path: &Path) -> Result<(), LinkError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LinkError::registry_write_failed(format!("Failed to serialize: {e}")))?;
        crane_util::fs::atomic_write(path, content.as_bytes()).map_err(|e| {
            LinkError::registry_write_failed(format!("Failed to write {}: {e}", path.display()))
        })
    }

    /// Read a previously written registry artifact.
    pub fn read_from(path: &Path) -> Result<Self, LinkError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            LinkError::registry_write_failed(format!("Invalid link state {}: {e}", path.display()))
        })
    }
}
