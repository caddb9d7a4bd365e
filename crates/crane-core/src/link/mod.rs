//! Local dependency linking.
//!
//! Given the monorepo configuration and a resolved lockfile, constructs the
//! on-disk package-resolution layout each project's module loader expects:
//! symlinks for external dependencies out of the package manager's store,
//! and direct cross-project links between local packages.
//!
//! Two installation topologies are supported behind one contract, selected
//! once per run by [`crate::config::InstallMode`]:
//! - classic: per-project temp packages plus a shared store; the full
//!   symlink tree is built and materialized here;
//! - workspace: the package manager lays out `node_modules` itself; only
//!   local links and incremental-build metadata are recorded.

pub mod classic;
pub mod error;
pub mod lockfile;
pub mod manifest;
pub mod materialize;
pub mod node;
pub mod registry;
pub mod store;
pub mod workspace;

pub use classic::{ClassicLinker, TempProjectManifest, LOCAL_DEPENDENCIES_SECTION};
pub use error::{codes as link_codes, LinkError};
pub use lockfile::{
    LockfileAccessor, ShrinkwrapEntry, ShrinkwrapFile, WorkspaceImporter, SHRINKWRAP_FILENAME,
};
pub use manifest::{DepsManifest, ParentScope, DEPS_MANIFEST_RELATIVE_PATH};
pub use materialize::materialize_tree;
pub use node::{NodeKind, PackageNode};
pub use registry::{LinkRegistry, LINK_STATE_FILENAME};
pub use store::{resolve_store_path, split_key_suffix, uri_encode, StoreLayout};
pub use workspace::{WorkspaceLinker, WORKSPACE_SPECIFIER_PREFIX};

use crate::config::{InstallMode, LocalProject, RepoConfig};
use rayon::prelude::*;
use std::sync::Mutex;

/// Result of linking one project.
#[derive(Debug)]
pub struct ProjectLinkOutcome {
    /// Name of the linked project.
    pub project_name: String,
    /// Local projects this project links to, in declaration order.
    pub local_links: Vec<String>,
    /// Number of external dependencies with a resolved version.
    pub resolved_count: usize,
    /// Package tree to materialize (classic mode only).
    pub tree: Option<PackageNode>,
}

/// The active linker for a run.
///
/// The two modes share the external contract (registry entries plus deps
/// manifest) but have materially different internals, so each is its own
/// implementation rather than a shared base with overridden steps.
pub enum Linker<'a> {
    Classic(ClassicLinker<'a>),
    Workspace(WorkspaceLinker<'a>),
}

impl<'a> Linker<'a> {
    /// Select the linker for the repo's install mode.
    #[must_use]
    pub fn for_repo(config: &'a RepoConfig, lockfile: &'a dyn LockfileAccessor) -> Self {
        match config.install_mode {
            InstallMode::Classic => Self::Classic(ClassicLinker::new(config, lockfile)),
            InstallMode::Workspace => Self::Workspace(WorkspaceLinker::new(config, lockfile)),
        }
    }

    /// Link one project.
    pub fn link_project(&self, project: &LocalProject) -> Result<ProjectLinkOutcome, LinkError> {
        match self {
            Self::Classic(linker) => linker.link_project(project),
            Self::Workspace(linker) => linker.link_project(project),
        }
    }
}

/// Link every configured project and return the populated registry.
///
/// Projects link independently and run in parallel; the registry is the
/// only shared structure. The first failure aborts the whole pass; there
/// is no partial-success mode, and nothing is written at the run level.
pub fn link_projects(
    config: &RepoConfig,
    lockfile: &dyn LockfileAccessor,
) -> Result<LinkRegistry, LinkError> {
    let linker = Linker::for_repo(config, lockfile);
    let registry = Mutex::new(LinkRegistry::default());

    config.projects().par_iter().try_for_each(|project| {
        let outcome = linker.link_project(project)?;
        if let Some(tree) = &outcome.tree {
            materialize_tree(tree)?;
        }
        let mut registry = registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for dependency in &outcome.local_links {
            registry.add_local_link(&project.name, dependency);
        }
        Ok::<(), LinkError>(())
    })?;

    Ok(registry
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner))
}

/// Link every project, then write the run-level link state artifact.
///
/// The artifact is only written after every project linked successfully.
pub fn link_projects_and_save(
    config: &RepoConfig,
    lockfile: &dyn LockfileAccessor,
) -> Result<LinkRegistry, LinkError> {
    let registry = link_projects(config, lockfile)?;
    registry.save(&config.common_temp_folder().join(LINK_STATE_FILENAME))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn workspace_repo(root: &std::path::Path) -> (RepoConfig, ShrinkwrapFile) {
        let app_folder = root.join("apps").join("app");
        let core_folder = root.join("libs").join("core");
        fs::create_dir_all(&app_folder).unwrap();
        fs::create_dir_all(&core_folder).unwrap();
        fs::create_dir_all(root.join("common").join("temp")).unwrap();

        fs::write(
            app_folder.join("package.json"),
            r#"{
                "name": "app",
                "dependencies": { "@acme/core": "workspace:*", "left-pad": "^1.3.0" }
            }"#,
        )
        .unwrap();
        fs::write(
            core_folder.join("package.json"),
            r#"{ "name": "@acme/core" }"#,
        )
        .unwrap();

        let config = RepoConfig::from_parts(
            root.to_path_buf(),
            InstallMode::Workspace,
            semver::Version::new(7, 14, 2),
            false,
            vec![
                LocalProject {
                    name: "app".to_string(),
                    version: "1.0.0".to_string(),
                    folder: app_folder,
                },
                LocalProject {
                    name: "@acme/core".to_string(),
                    version: "2.1.0".to_string(),
                    folder: core_folder,
                },
            ],
        )
        .unwrap();

        let mut shrinkwrap = ShrinkwrapFile::default();
        let mut app_importer = WorkspaceImporter::default();
        app_importer
            .dependencies
            .insert("left-pad".to_string(), "1.3.0".to_string());
        shrinkwrap
            .importers
            .insert("apps/app".to_string(), app_importer);
        shrinkwrap
            .importers
            .insert("libs/core".to_string(), WorkspaceImporter::default());
        (config, shrinkwrap)
    }

    #[test]
    fn test_link_projects_workspace_mode() {
        let root = tempdir().unwrap();
        let (config, shrinkwrap) = workspace_repo(root.path());

        let registry = link_projects(&config, &shrinkwrap).unwrap();
        assert_eq!(registry.links_for("app").unwrap(), &["@acme/core".to_string()]);
        assert!(registry.links_for("@acme/core").is_none());
    }

    #[test]
    fn test_failed_pass_writes_no_artifact() {
        let root = tempdir().unwrap();
        let (config, mut shrinkwrap) = workspace_repo(root.path());
        // Break the app importer so linking fails
        shrinkwrap.importers.remove("apps/app");

        let err = link_projects_and_save(&config, &shrinkwrap).unwrap_err();
        assert_eq!(err.code(), link_codes::LINK_IMPORTER_MISSING);
        assert!(!config
            .common_temp_folder()
            .join(LINK_STATE_FILENAME)
            .exists());
    }

    #[test]
    fn test_link_projects_and_save_writes_artifact() {
        let root = tempdir().unwrap();
        let (config, shrinkwrap) = workspace_repo(root.path());

        link_projects_and_save(&config, &shrinkwrap).unwrap();

        let saved =
            LinkRegistry::read_from(&config.common_temp_folder().join(LINK_STATE_FILENAME))
                .unwrap();
        assert_eq!(saved.links_for("app").unwrap(), &["@acme/core".to_string()]);
    }

    #[test]
    fn test_linker_selection_by_mode() {
        let root = tempdir().unwrap();
        let (mut config, shrinkwrap) = workspace_repo(root.path());
        assert!(matches!(
            Linker::for_repo(&config, &shrinkwrap),
            Linker::Workspace(_)
        ));
        config.install_mode = InstallMode::Classic;
        assert!(matches!(
            Linker::for_repo(&config, &shrinkwrap),
            Linker::Classic(_)
        ));
    }
}
