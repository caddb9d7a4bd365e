//! Monorepo configuration.
//!
//! Parses `crane.json` at the repo root: the list of local projects, the
//! install mode, and the version of the underlying package manager (which
//! gates the on-disk store layout).

use crate::error::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Config filename at the monorepo root.
pub const REPO_CONFIG_FILENAME: &str = "crane.json";

/// Scope prefix for generated temp project names.
pub const TEMP_PROJECT_SCOPE: &str = "@crane-temp";

/// Installation topology selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    /// Per-project temp packages plus a shared store; crane builds the
    /// symlink tree itself.
    #[default]
    Classic,
    /// The package manager materializes `node_modules` per project; crane
    /// only records local links and incremental-build metadata.
    Workspace,
}

/// A package developed inside the monorepo.
#[derive(Debug, Clone)]
pub struct LocalProject {
    /// Package name as declared in the project's package.json.
    pub name: String,
    /// Declared version.
    pub version: String,
    /// Absolute path to the project folder.
    pub folder: PathBuf,
}

impl LocalProject {
    /// Package name with any `@scope/` prefix removed.
    #[must_use]
    pub fn unscoped_name(&self) -> &str {
        match self.name.rsplit_once('/') {
            Some((_, rest)) if self.name.starts_with('@') => rest,
            _ => &self.name,
        }
    }

    /// Name of the generated temp project (e.g. `@crane-temp/my-app`).
    #[must_use]
    pub fn temp_project_name(&self) -> String {
        format!("{TEMP_PROJECT_SCOPE}/{}", self.unscoped_name())
    }

    /// Path where a direct dependency of this project is linked.
    #[must_use]
    pub fn node_modules_entry(&self, dependency_name: &str) -> PathBuf {
        self.folder.join("node_modules").join(dependency_name)
    }
}

/// On-disk shape of `crane.json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoConfigFile {
    #[serde(default)]
    install_mode: InstallMode,
    package_manager_version: String,
    #[serde(default)]
    legacy_incremental_build: bool,
    projects: Vec<ProjectEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectEntry {
    name: String,
    #[serde(default = "default_project_version")]
    version: String,
    project_folder: String,
}

fn default_project_version() -> String {
    "0.0.0".to_string()
}

/// Resolved monorepo configuration.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Absolute path to the monorepo root.
    pub root_folder: PathBuf,
    /// Installation topology for this repo.
    pub install_mode: InstallMode,
    /// Version of the underlying package manager (pnpm).
    pub package_manager_version: semver::Version,
    /// When set, per-project deps manifests are not written and any stale
    /// manifest file is removed instead.
    pub legacy_incremental_build: bool,
    projects: Vec<LocalProject>,
    by_name: HashMap<String, usize>,
}

impl RepoConfig {
    /// Load `crane.json` from the given monorepo root.
    pub fn load(root_folder: &Path) -> Result<Self, Error> {
        let path = root_folder.join(REPO_CONFIG_FILENAME);
        let content = std::fs::read_to_string(&path).map_err(|e| Error::ConfigRead {
            path: path.clone(),
            source: e,
        })?;
        let file: RepoConfigFile = serde_json::from_str(&content).map_err(|e| {
            Error::ConfigParse {
                path: path.clone(),
                source: e,
            }
        })?;

        let package_manager_version =
            semver::Version::parse(&file.package_manager_version).map_err(|e| {
                Error::ConfigInvalid {
                    path: path.clone(),
                    message: format!(
                        "packageManagerVersion '{}' is not a valid version: {e}",
                        file.package_manager_version
                    ),
                }
            })?;

        let projects = file
            .projects
            .into_iter()
            .map(|p| LocalProject {
                name: p.name,
                version: p.version,
                folder: root_folder.join(p.project_folder),
            })
            .collect();

        Self::from_parts(
            root_folder.to_path_buf(),
            file.install_mode,
            package_manager_version,
            file.legacy_incremental_build,
            projects,
        )
        .map_err(|message| Error::ConfigInvalid { path, message })
    }

    /// Build a config from already-resolved parts.
    ///
    /// Fails on duplicate project names; the name is the lookup key for
    /// local dependency resolution.
    pub fn from_parts(
        root_folder: PathBuf,
        install_mode: InstallMode,
        package_manager_version: semver::Version,
        legacy_incremental_build: bool,
        projects: Vec<LocalProject>,
    ) -> Result<Self, String> {
        let mut by_name = HashMap::with_capacity(projects.len());
        for (i, project) in projects.iter().enumerate() {
            if by_name.insert(project.name.clone(), i).is_some() {
                return Err(format!("duplicate project name '{}'", project.name));
            }
        }
        Ok(Self {
            root_folder,
            install_mode,
            package_manager_version,
            legacy_incremental_build,
            projects,
            by_name,
        })
    }

    /// All configured projects, in declaration order.
    #[must_use]
    pub fn projects(&self) -> &[LocalProject] {
        &self.projects
    }

    /// Look up a local project by package name.
    #[must_use]
    pub fn get_project(&self, name: &str) -> Option<&LocalProject> {
        self.by_name.get(name).map(|&i| &self.projects[i])
    }

    /// Shared temp folder (`<root>/common/temp`): temp projects, the copied
    /// shrinkwrap, and the package manager's store all live under here.
    #[must_use]
    pub fn common_temp_folder(&self) -> PathBuf {
        self.root_folder.join("common").join("temp")
    }

    /// Folder holding the generated temp projects.
    #[must_use]
    pub fn temp_projects_folder(&self) -> PathBuf {
        self.common_temp_folder().join("projects")
    }

    /// Path to a project's flattened temp manifest (classic mode).
    #[must_use]
    pub fn temp_project_manifest_path(&self, project: &LocalProject) -> PathBuf {
        self.temp_projects_folder()
            .join(project.unscoped_name())
            .join("package.json")
    }
}
