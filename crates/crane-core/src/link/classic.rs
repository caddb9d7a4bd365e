//! Classic-mode linker.
//!
//! For non-workspace installs, combines a project's flattened temp manifest
//! with the shrinkwrap's resolved entries to build a full [`PackageNode`]
//! tree: local projects become direct symlinks to their project folders,
//! external dependencies become symlinks to their already-materialized
//! store folders (located via [`super::store`]).

use super::error::LinkError;
use super::lockfile::{LockfileAccessor, ShrinkwrapEntry};
use super::manifest::{DepsManifest, ParentScope};
use super::node::PackageNode;
use super::store::{resolve_store_path, StoreLayout};
use super::ProjectLinkOutcome;
use crate::config::{LocalProject, RepoConfig};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Temp manifest section listing intra-repo dependencies.
pub const LOCAL_DEPENDENCIES_SECTION: &str = "craneDependencies";

/// Optional-dependency linking is wired up but inactive: the orchestrator
/// does not emit `optionalDependencies` into temp manifests yet.
const LINK_OPTIONAL_SECTION: bool = false;

/// A project's flattened temp manifest (its generated `package.json`).
///
/// Read-only source of declared dependency names; section iteration
/// preserves declaration order.
#[derive(Debug)]
pub struct TempProjectManifest {
    path: PathBuf,
    root: serde_json::Map<String, Value>,
}

impl TempProjectManifest {
    /// Read a temp manifest from disk.
    pub fn read_from(path: &Path) -> Result<Self, LinkError> {
        let content =
            fs::read_to_string(path).map_err(|e| LinkError::temp_manifest_invalid(path, e))?;
        let json: Value = serde_json::from_str(&content)
            .map_err(|e| LinkError::temp_manifest_invalid(path, e))?;
        match json {
            Value::Object(root) => Ok(Self {
                path: path.to_path_buf(),
                root,
            }),
            _ => Err(LinkError::temp_manifest_invalid(
                path,
                "manifest root must be an object",
            )),
        }
    }

    /// Entries of a dependency section, in declaration order.
    ///
    /// A missing section is empty. A malformed one (non-object section,
    /// non-string specifier) is an error: temp manifests are generated by
    /// the orchestrator, so malformation means an algorithm inconsistency.
    fn section(&self, name: &str) -> Result<Vec<(&str, &str)>, LinkError> {
        match self.root.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| {
                    value.as_str().map(|s| (key.as_str(), s)).ok_or_else(|| {
                        LinkError::temp_manifest_invalid(
                            &self.path,
                            format!("'{name}.{key}' must be a string"),
                        )
                    })
                })
                .collect(),
            Some(_) => Err(LinkError::temp_manifest_invalid(
                &self.path,
                format!("'{name}' must be an object"),
            )),
        }
    }

    /// External dependencies declared by the project.
    pub fn dependencies(&self) -> Result<Vec<(&str, &str)>, LinkError> {
        self.section("dependencies")
    }

    /// Intra-repo dependencies declared by the project.
    pub fn local_dependencies(&self) -> Result<Vec<(&str, &str)>, LinkError> {
        self.section(LOCAL_DEPENDENCIES_SECTION)
    }

    /// Optional external dependencies declared by the project.
    pub fn optional_dependencies(&self) -> Result<Vec<(&str, &str)>, LinkError> {
        self.section("optionalDependencies")
    }
}

/// Classic-mode linker for one repo.
pub struct ClassicLinker<'a> {
    config: &'a RepoConfig,
    lockfile: &'a dyn LockfileAccessor,
    store_layout: StoreLayout,
}

impl<'a> ClassicLinker<'a> {
    #[must_use]
    pub fn new(config: &'a RepoConfig, lockfile: &'a dyn LockfileAccessor) -> Self {
        Self {
            config,
            lockfile,
            store_layout: StoreLayout::for_package_manager(&config.package_manager_version),
        }
    }

    /// Build the package tree for one project and record its link state.
    pub fn link_project(&self, project: &LocalProject) -> Result<ProjectLinkOutcome, LinkError> {
        let manifest_path = self.config.temp_project_manifest_path(project);
        let temp_manifest = TempProjectManifest::read_from(&manifest_path)?;

        let mut root =
            PackageNode::directory(&project.name, &project.version, project.folder.clone());
        let mut local_links: Vec<String> = Vec::new();

        // Local projects link straight to each other's folders; their own
        // dependencies are resolved from those folders, never traversed here.
        for (name, _specifier) in temp_manifest.local_dependencies()? {
            let dep_project = self
                .config
                .get_project(name)
                .ok_or_else(|| LinkError::project_not_found(&project.name, name))?;
            local_links.push(name.to_string());
            root.add_child(PackageNode::symlink(
                name,
                &dep_project.version,
                project.node_modules_entry(name),
                dep_project.folder.clone(),
            ))?;
        }

        let externals = temp_manifest.dependencies()?;
        let optionals = temp_manifest.optional_dependencies()?;
        let mut resolved: Vec<(String, String)> = Vec::new();
        let mut parent_entry: Option<ShrinkwrapEntry> = None;

        if !externals.is_empty() || (LINK_OPTIONAL_SECTION && !optionals.is_empty()) {
            let (entry, store_folder) = self.resolve_project_store(project)?;

            for (name, _specifier) in &externals {
                if let Some(version) =
                    self.link_external(project, &entry, &store_folder, name, false, &mut root)?
                {
                    resolved.push(((*name).to_string(), version));
                }
            }

            if LINK_OPTIONAL_SECTION {
                for (name, _specifier) in &optionals {
                    if let Some(version) =
                        self.link_external(project, &entry, &store_folder, name, true, &mut root)?
                    {
                        resolved.push(((*name).to_string(), version));
                    }
                }
            }

            parent_entry = Some(entry);
        }

        let mut deps_manifest = DepsManifest::for_project(&project.folder);
        if self.config.legacy_incremental_build {
            deps_manifest.delete_if_exists()?;
        } else {
            let scope = parent_entry
                .map(|e| ParentScope::from_dependencies(e.dependencies))
                .unwrap_or_default();
            for name in &local_links {
                if let Some(dep_project) = self.config.get_project(name) {
                    deps_manifest.add_dependency(name, &dep_project.version, &scope);
                }
            }
            for (name, version) in &resolved {
                deps_manifest.add_dependency(name, version, &scope);
            }
            deps_manifest.save()?;
        }

        Ok(ProjectLinkOutcome {
            project_name: project.name.clone(),
            local_links,
            resolved_count: resolved.len(),
            tree: Some(root),
        })
    }

    /// Resolve the shrinkwrap entry and store folder for a project's temp
    /// package. Every step that comes back empty is fatal: the lockfile and
    /// the temp projects are generated together, so a miss means they have
    /// diverged.
    fn resolve_project_store(
        &self,
        project: &LocalProject,
    ) -> Result<(ShrinkwrapEntry, PathBuf), LinkError> {
        let temp_name = project.temp_project_name();
        let key = self
            .lockfile
            .get_temp_project_dependency_key(&temp_name)
            .ok_or_else(|| LinkError::lockfile_key_missing(&temp_name))?;
        let tarball_ref = self
            .lockfile
            .get_tarball_path(&key)
            .ok_or_else(|| LinkError::tarball_missing(&key))?;
        let store_folder = resolve_store_path(
            &self.config.common_temp_folder(),
            &tarball_ref,
            &key,
            self.store_layout,
        )?;
        let entry = self
            .lockfile
            .get_shrinkwrap_entry(&key)
            .ok_or_else(|| LinkError::shrinkwrap_entry_missing(&key))?;
        Ok((entry, store_folder))
    }

    /// Link one external dependency out of the store.
    ///
    /// Returns the resolved version, or `None` when an optional dependency
    /// has no resolved entry (tolerated absence).
    fn link_external(
        &self,
        project: &LocalProject,
        entry: &ShrinkwrapEntry,
        store_folder: &Path,
        name: &str,
        optional: bool,
        root: &mut PackageNode,
    ) -> Result<Option<String>, LinkError> {
        let version = entry
            .dependencies
            .get(name)
            .or_else(|| entry.optional_dependencies.get(name));
        let Some(version) = version else {
            if optional {
                return Ok(None);
            }
            return Err(LinkError::version_missing(&project.name, name));
        };

        // The package manager must already have linked this dependency into
        // the store folder; anything else means the layout changed under us.
        let store_entry = store_folder.join(name);
        let metadata = fs::symlink_metadata(&store_entry)
            .map_err(|_| LinkError::store_entry_missing(name, &store_entry))?;
        if !metadata.file_type().is_symlink() {
            return Err(LinkError::store_entry_not_symlink(name, &store_entry));
        }

        // Follow the store symlink once so the project's link points at the
        // real folder instead of chaining through the store.
        let target = dunce::canonicalize(&store_entry)
            .map_err(|e| LinkError::store_realpath_failed(name, &store_entry, e))?;

        root.add_child(PackageNode::symlink(
            name,
            version,
            project.node_modules_entry(name),
            target,
        ))?;
        Ok(Some(version.clone()))
    }
}
