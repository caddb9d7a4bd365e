//! Lockfile accessor.
//!
//! The linkers never parse lockfile syntax themselves; they consume the
//! [`LockfileAccessor`] queries. [`ShrinkwrapFile`] is the concrete
//! implementation backed by the shrinkwrap copy the orchestrator drops into
//! the common temp folder.

use super::error::LinkError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Filename of the shrinkwrap copy in the common temp folder.
pub const SHRINKWRAP_FILENAME: &str = "crane-shrinkwrap.json";

/// A shrinkwrap entry: the resolved dependency maps of one installed package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShrinkwrapEntry {
    /// Resolved regular dependencies (name -> exact version).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Resolved optional dependencies.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: BTreeMap<String, String>,
}

/// A workspace importer record: per-project resolved dependency maps.
///
/// Dev entries that also appear as regular entries are folded into
/// `dependencies` by the lockfile format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceImporter {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: BTreeMap<String, String>,
}

/// Read-only queries the linkers make against a resolved lockfile.
pub trait LockfileAccessor: Send + Sync {
    /// Dependency key recorded for a temp project (classic mode).
    fn get_temp_project_dependency_key(&self, temp_project_name: &str) -> Option<String>;

    /// Tarball reference recorded for a dependency key.
    fn get_tarball_path(&self, dependency_key: &str) -> Option<String>;

    /// Shrinkwrap entry for a dependency key.
    fn get_shrinkwrap_entry(&self, dependency_key: &str) -> Option<ShrinkwrapEntry>;

    /// Importer key for a project folder (workspace mode). The key is the
    /// project's path relative to the repo root, forward-slashed, or `.`
    /// for the root itself.
    fn get_workspace_key_by_path(&self, root_folder: &Path, project_folder: &Path) -> String;

    /// Workspace importer record for an importer key.
    fn get_workspace_importer(&self, importer_key: &str) -> Option<WorkspaceImporter>;
}

/// How a shrinkwrap package was resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShrinkwrapResolution {
    /// Tarball reference (e.g. `file:projects/app.tgz`), when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball: Option<String>,
}

/// One package record in the shrinkwrap file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShrinkwrapPackage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ShrinkwrapResolution>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: BTreeMap<String, String>,
}

/// The resolved lockfile as copied into the common temp folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShrinkwrapFile {
    /// Top-level dependency keys (temp project name -> dependency key).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Package records keyed by dependency key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub packages: BTreeMap<String, ShrinkwrapPackage>,
    /// Workspace importer records keyed by relative project path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub importers: BTreeMap<String, WorkspaceImporter>,
}

impl ShrinkwrapFile {
    /// Read a shrinkwrap file from disk.
    pub fn read_from(path: &Path) -> Result<Self, LinkError> {
        let content =
            fs::read_to_string(path).map_err(|e| LinkError::shrinkwrap_invalid(path, e))?;
        serde_json::from_str(&content).map_err(|e| LinkError::shrinkwrap_invalid(path, e))
    }
}

impl LockfileAccessor for ShrinkwrapFile {
    fn get_temp_project_dependency_key(&self, temp_project_name: &str) -> Option<String> {
        self.dependencies.get(temp_project_name).cloned()
    }

    fn get_tarball_path(&self, dependency_key: &str) -> Option<String> {
        self.packages
            .get(dependency_key)?
            .resolution
            .as_ref()?
            .tarball
            .clone()
    }

    fn get_shrinkwrap_entry(&self, dependency_key: &str) -> Option<ShrinkwrapEntry> {
        self.packages.get(dependency_key).map(|p| ShrinkwrapEntry {
            dependencies: p.dependencies.clone(),
            optional_dependencies: p.optional_dependencies.clone(),
        })
    }

    fn get_workspace_key_by_path(&self, root_folder: &Path, project_folder: &Path) -> String {
        match project_folder.strip_prefix(root_folder) {
            Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
            // Outside the root: fall back to the absolute path, forward-slashed.
            Err(_) => project_folder.to_string_lossy().replace('\\', "/"),
        }
    }

    fn get_workspace_importer(&self, importer_key: &str) -> Option<WorkspaceImporter> {
        self.importers.get(importer_key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> ShrinkwrapFile {
        let mut file = ShrinkwrapFile::default();
        file.dependencies.insert(
            "@crane-temp/app".to_string(),
            "file:projects/app.tgz_jsdom@11.12.0".to_string(),
        );
        let mut pkg = ShrinkwrapPackage {
            resolution: Some(ShrinkwrapResolution {
                tarball: Some("file:projects/app.tgz".to_string()),
            }),
            ..Default::default()
        };
        pkg.dependencies
            .insert("left-pad".to_string(), "1.3.0".to_string());
        pkg.optional_dependencies
            .insert("fsevents".to_string(), "2.3.2".to_string());
        file.packages
            .insert("file:projects/app.tgz_jsdom@11.12.0".to_string(), pkg);

        let mut importer = WorkspaceImporter::default();
        importer
            .dependencies
            .insert("left-pad".to_string(), "1.3.0".to_string());
        file.importers.insert("apps/app".to_string(), importer);
        file
    }

    #[test]
    fn test_temp_project_dependency_key() {
        let file = sample();
        assert_eq!(
            file.get_temp_project_dependency_key("@crane-temp/app").as_deref(),
            Some("file:projects/app.tgz_jsdom@11.12.0")
        );
        assert!(file.get_temp_project_dependency_key("@crane-temp/other").is_none());
    }

    #[test]
    fn test_tarball_and_entry_lookup() {
        let file = sample();
        let key = "file:projects/app.tgz_jsdom@11.12.0";
        assert_eq!(file.get_tarball_path(key).as_deref(), Some("file:projects/app.tgz"));

        let entry = file.get_shrinkwrap_entry(key).unwrap();
        assert_eq!(entry.dependencies.get("left-pad").unwrap(), "1.3.0");
        assert_eq!(entry.optional_dependencies.get("fsevents").unwrap(), "2.3.2");

        assert!(file.get_tarball_path("file:projects/missing.tgz").is_none());
        assert!(file.get_shrinkwrap_entry("file:projects/missing.tgz").is_none());
    }

    #[test]
    fn test_workspace_key_by_path() {
        let file = ShrinkwrapFile::default();
        let root = Path::new("/repo");
        assert_eq!(file.get_workspace_key_by_path(root, Path::new("/repo/apps/app")), "apps/app");
        assert_eq!(file.get_workspace_key_by_path(root, Path::new("/repo")), ".");
    }

    #[test]
    fn test_workspace_importer_lookup() {
        let file = sample();
        let importer = file.get_workspace_importer("apps/app").unwrap();
        assert_eq!(importer.dependencies.get("left-pad").unwrap(), "1.3.0");
        assert!(file.get_workspace_importer("apps/other").is_none());
    }

    #[test]
    fn test_read_from_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SHRINKWRAP_FILENAME);
        let file = sample();
        fs::write(&path, serde_json::to_string_pretty(&file).unwrap()).unwrap();

        let loaded = ShrinkwrapFile::read_from(&path).unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn test_read_from_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SHRINKWRAP_FILENAME);
        fs::write(&path, "not json").unwrap();

        let err = ShrinkwrapFile::read_from(&path).unwrap_err();
        assert_eq!(err.code(), crate::link::error::codes::LINK_SHRINKWRAP_INVALID);
    }
}
