//! Incremental dependency manifest.
//!
//! Records each project's resolved `(name, version, parent-scope)` triples
//! so the surrounding build system can detect when a project's dependencies
//! changed since the last build. Written atomically per project; deleted
//! when the legacy-compatibility flag disables incremental detection.

use super::error::LinkError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest location relative to a project folder.
pub const DEPS_MANIFEST_RELATIVE_PATH: &str = ".crane/deps-manifest.json";

/// Schema version for the manifest format.
pub const DEPS_MANIFEST_SCHEMA_VERSION: u32 = 1;

/// The dependency maps of the parent lockfile entry a dependency was
/// resolved against. Used by the diff layer to disambiguate identical
/// versions reached through different parents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentScope {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependencies: BTreeMap<String, String>,
}

impl ParentScope {
    /// Scope with the given dependency map and no peers.
    #[must_use]
    pub fn from_dependencies(dependencies: BTreeMap<String, String>) -> Self {
        Self {
            dependencies,
            peer_dependencies: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry {
    version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    parent_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    parent_peer_dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFile {
    schema_version: u32,
    #[serde(default)]
    dependencies: BTreeMap<String, ManifestEntry>,
}

/// Per-project incremental dependency manifest.
#[derive(Debug)]
pub struct DepsManifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl DepsManifest {
    /// Empty manifest that will be saved at the given path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    /// Empty manifest at a project's standard manifest location.
    #[must_use]
    pub fn for_project(project_folder: &Path) -> Self {
        Self::new(project_folder.join(DEPS_MANIFEST_RELATIVE_PATH))
    }

    /// Record one resolved dependency.
    pub fn add_dependency(
        &mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        parent_scope: &ParentScope,
    ) {
        self.entries.insert(
            name.into(),
            ManifestEntry {
                version: version.into(),
                parent_dependencies: parent_scope.dependencies.clone(),
                parent_peer_dependencies: parent_scope.peer_dependencies.clone(),
            },
        );
    }

    /// Number of recorded dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded version for a dependency, if any.
    #[must_use]
    pub fn get_version(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.version.as_str())
    }

    /// Write the manifest to its path atomically, creating parent folders.
    pub fn save(&self) -> Result<(), LinkError> {
        let file = ManifestFile {
            schema_version: DEPS_MANIFEST_SCHEMA_VERSION,
            dependencies: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| LinkError::manifest_write_failed(format!("Failed to serialize: {e}")))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LinkError::manifest_write_failed(format!(
                    "Failed to create {}: {e}",
                    parent.display()
                ))
            })?;
        }
        crane_util::fs::atomic_write(&self.path, content.as_bytes()).map_err(|e| {
            LinkError::manifest_write_failed(format!(
                "Failed to write {}: {e}",
                self.path.display()
            ))
        })
    }

    /// Remove the manifest file if present; absence is not an error.
    pub fn delete_if_exists(&self) -> Result<(), LinkError> {
        crane_util::fs::remove_file_if_exists(&self.path).map_err(|e| {
            LinkError::manifest_write_failed(format!(
                "Failed to delete {}: {e}",
                self.path.display()
            ))
        })
    }

    /// Read a previously saved manifest.
    pub fn read_from(path: &Path) -> Result<Self, LinkError> {
        let content = fs::read_to_string(path)?;
        let file: ManifestFile = serde_json::from_str(&content).map_err(|e| {
            LinkError::manifest_write_failed(format!("Invalid manifest {}: {e}", path.display()))
        })?;
        if file.schema_version != DEPS_MANIFEST_SCHEMA_VERSION {
            return Err(LinkError::manifest_write_failed(format!(
                "Manifest schema version {} not supported (expected {DEPS_MANIFEST_SCHEMA_VERSION})",
                file.schema_version
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            entries: file.dependencies,
        })
    }

    /// Deterministic content hash of the manifest, for change detection.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let file = ManifestFile {
            schema_version: DEPS_MANIFEST_SCHEMA_VERSION,
            dependencies: self.entries.clone(),
        };
        // BTreeMap keys give a stable serialization order.
        let json = serde_json::to_string(&file).unwrap_or_default();
        crane_util::hash::blake3_bytes(json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scope(deps: &[(&str, &str)]) -> ParentScope {
        ParentScope::from_dependencies(
            deps.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_save_and_read_roundtrip() {
        let dir = tempdir().unwrap();
        let mut manifest = DepsManifest::for_project(dir.path());
        manifest.add_dependency("left-pad", "1.3.0", &scope(&[("left-pad", "1.3.0")]));
        manifest.add_dependency("axios", "1.6.0", &scope(&[]));
        manifest.save().unwrap();

        let loaded =
            DepsManifest::read_from(&dir.path().join(DEPS_MANIFEST_RELATIVE_PATH)).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get_version("left-pad"), Some("1.3.0"));
        assert_eq!(loaded.content_hash(), manifest.content_hash());
    }

    #[test]
    fn test_delete_if_exists() {
        let dir = tempdir().unwrap();
        let mut manifest = DepsManifest::for_project(dir.path());

        // Deleting an absent manifest is fine
        manifest.delete_if_exists().unwrap();

        manifest.add_dependency("axios", "1.6.0", &scope(&[]));
        manifest.save().unwrap();
        assert!(dir.path().join(DEPS_MANIFEST_RELATIVE_PATH).exists());

        manifest.delete_if_exists().unwrap();
        assert!(!dir.path().join(DEPS_MANIFEST_RELATIVE_PATH).exists());
    }

    #[test]
    fn test_content_hash_changes_with_entries() {
        let dir = tempdir().unwrap();
        let mut a = DepsManifest::for_project(dir.path());
        let empty_hash = a.content_hash();
        a.add_dependency("axios", "1.6.0", &scope(&[]));
        assert_ne!(a.content_hash(), empty_hash);

        // Insertion order does not affect the hash
        let mut b = DepsManifest::for_project(dir.path());
        b.add_dependency("zod", "3.22.0", &scope(&[]));
        b.add_dependency("axios", "1.6.0", &scope(&[]));
        let mut c = DepsManifest::for_project(dir.path());
        c.add_dependency("axios", "1.6.0", &scope(&[]));
        c.add_dependency("zod", "3.22.0", &scope(&[]));
        assert_eq!(b.content_hash(), c.content_hash());
    }

    #[test]
    fn test_read_rejects_unknown_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deps-manifest.json");
        std::fs::write(&path, r#"{ "schemaVersion": 99, "dependencies": {} }"#).unwrap();
        assert!(DepsManifest::read_from(&path).is_err());
    }
}
