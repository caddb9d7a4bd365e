//! Workspace-mode linker.
//!
//! Under workspace installs the package manager materializes each project's
//! `node_modules` itself, so no package tree is built here. This linker
//! only records local links (dependencies declared with the `workspace:`
//! notation) and feeds resolved external versions into the incremental
//! deps manifest, reading them from the project's workspace importer
//! record.

use super::error::LinkError;
use super::lockfile::LockfileAccessor;
use super::manifest::{DepsManifest, ParentScope};
use super::ProjectLinkOutcome;
use crate::config::{LocalProject, RepoConfig};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Specifier notation marking an intra-repo dependency.
pub const WORKSPACE_SPECIFIER_PREFIX: &str = "workspace:";

/// Declared dependency kind, in package.json section order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DependencyKind {
    Regular,
    Dev,
    Optional,
    Peer,
}

/// One declared dependency of a project.
#[derive(Debug)]
struct DeclaredDependency {
    name: String,
    specifier: String,
    kind: DependencyKind,
}

impl DeclaredDependency {
    fn is_local(&self) -> bool {
        self.specifier.starts_with(WORKSPACE_SPECIFIER_PREFIX)
    }
}

/// Workspace-mode linker for one repo.
pub struct WorkspaceLinker<'a> {
    config: &'a RepoConfig,
    lockfile: &'a dyn LockfileAccessor,
}

impl<'a> WorkspaceLinker<'a> {
    #[must_use]
    pub fn new(config: &'a RepoConfig, lockfile: &'a dyn LockfileAccessor) -> Self {
        Self { config, lockfile }
    }

    /// Record link state and incremental-build metadata for one project.
    pub fn link_project(&self, project: &LocalProject) -> Result<ProjectLinkOutcome, LinkError> {
        let declared = read_declared_dependencies(&project.folder.join("package.json"))?;

        let mut local_links: Vec<String> = Vec::new();
        let mut externals: Vec<&DeclaredDependency> = Vec::new();
        for dep in &declared {
            if dep.is_local() {
                // Only regular and dev declarations produce local links;
                // peers are satisfied by the consumer either way.
                match dep.kind {
                    DependencyKind::Regular | DependencyKind::Dev => {
                        if self.config.get_project(&dep.name).is_none() {
                            return Err(LinkError::project_not_found(&project.name, &dep.name));
                        }
                        local_links.push(dep.name.clone());
                    }
                    DependencyKind::Optional | DependencyKind::Peer => {}
                }
            } else {
                externals.push(dep);
            }
        }

        let importer_key = self
            .lockfile
            .get_workspace_key_by_path(&self.config.root_folder, &project.folder);
        let importer = self
            .lockfile
            .get_workspace_importer(&importer_key)
            .ok_or_else(|| LinkError::importer_missing(&project.name, &importer_key))?;

        let mut resolved: Vec<(String, String)> = Vec::new();
        for dep in externals {
            let version = match dep.kind {
                DependencyKind::Regular => Some(
                    importer
                        .dependencies
                        .get(&dep.name)
                        .ok_or_else(|| LinkError::version_missing(&project.name, &dep.name))?,
                ),
                // A dev entry that is also a regular entry is folded into
                // `dependencies` by the lockfile format.
                DependencyKind::Dev => Some(
                    importer
                        .dev_dependencies
                        .get(&dep.name)
                        .or_else(|| importer.dependencies.get(&dep.name))
                        .ok_or_else(|| LinkError::version_missing(&project.name, &dep.name))?,
                ),
                DependencyKind::Optional => importer.optional_dependencies.get(&dep.name),
                DependencyKind::Peer => None,
            };
            if let Some(version) = version {
                resolved.push((dep.name.clone(), version.clone()));
            }
        }

        let mut deps_manifest = DepsManifest::for_project(&project.folder);
        if self.config.legacy_incremental_build {
            deps_manifest.delete_if_exists()?;
        } else {
            // Importers do not track peers at this level.
            let mut scope_deps = importer.dependencies.clone();
            scope_deps.extend(
                importer
                    .dev_dependencies
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            let scope = ParentScope::from_dependencies(scope_deps);
            for (name, version) in &resolved {
                deps_manifest.add_dependency(name, version, &scope);
            }
            deps_manifest.save()?;
        }

        Ok(ProjectLinkOutcome {
            project_name: project.name.clone(),
            local_links,
            resolved_count: resolved.len(),
            tree: None,
        })
    }
}

/// Read a project's declared dependencies across all four sections, in
/// declaration order. Names already claimed by an earlier section are
/// skipped, so `dependencies` wins over `devDependencies` and so on.
fn read_declared_dependencies(path: &Path) -> Result<Vec<DeclaredDependency>, LinkError> {
    let content = fs::read_to_string(path).map_err(|e| LinkError::package_json_invalid(path, e))?;
    let json: Value =
        serde_json::from_str(&content).map_err(|e| LinkError::package_json_invalid(path, e))?;
    let root = json
        .as_object()
        .ok_or_else(|| LinkError::package_json_invalid(path, "root must be an object"))?;

    let sections = [
        ("dependencies", DependencyKind::Regular),
        ("devDependencies", DependencyKind::Dev),
        ("optionalDependencies", DependencyKind::Optional),
        ("peerDependencies", DependencyKind::Peer),
    ];

    let mut declared: Vec<DeclaredDependency> = Vec::new();
    for (section, kind) in sections {
        let Some(value) = root.get(section) else {
            continue;
        };
        let map = value.as_object().ok_or_else(|| {
            LinkError::package_json_invalid(path, format!("'{section}' must be an object"))
        })?;
        for (name, specifier) in map {
            let specifier = specifier.as_str().ok_or_else(|| {
                LinkError::package_json_invalid(path, format!("'{section}.{name}' must be a string"))
            })?;
            if declared.iter().any(|d| d.name == *name) {
                continue;
            }
            declared.push(DeclaredDependency {
                name: name.clone(),
                specifier: specifier.to_string(),
                kind,
            });
        }
    }
    Ok(declared)
}
