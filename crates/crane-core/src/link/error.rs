//! Linking error types.
//!
//! Every resolution step returns a structured failure naming the missing
//! entity (project, dependency, path). Failures are fatal for the whole
//! linking pass; tolerated absences (optional/peer dependencies) never
//! surface as errors.

use std::fmt;
use std::io;
use std::path::Path;

/// Linking error codes.
pub mod codes {
    pub const LINK_PROJECT_NOT_FOUND: &str = "LINK_PROJECT_NOT_FOUND";
    pub const LINK_TEMP_MANIFEST_INVALID: &str = "LINK_TEMP_MANIFEST_INVALID";
    pub const LINK_PACKAGE_JSON_INVALID: &str = "LINK_PACKAGE_JSON_INVALID";
    pub const LINK_LOCKFILE_KEY_MISSING: &str = "LINK_LOCKFILE_KEY_MISSING";
    pub const LINK_TARBALL_MISSING: &str = "LINK_TARBALL_MISSING";
    pub const LINK_TARBALL_REF_INVALID: &str = "LINK_TARBALL_REF_INVALID";
    pub const LINK_SHRINKWRAP_ENTRY_MISSING: &str = "LINK_SHRINKWRAP_ENTRY_MISSING";
    pub const LINK_SHRINKWRAP_INVALID: &str = "LINK_SHRINKWRAP_INVALID";
    pub const LINK_IMPORTER_MISSING: &str = "LINK_IMPORTER_MISSING";
    pub const LINK_STORE_ENTRY_MISSING: &str = "LINK_STORE_ENTRY_MISSING";
    pub const LINK_STORE_ENTRY_NOT_SYMLINK: &str = "LINK_STORE_ENTRY_NOT_SYMLINK";
    pub const LINK_STORE_REALPATH_FAILED: &str = "LINK_STORE_REALPATH_FAILED";
    pub const LINK_VERSION_MISSING: &str = "LINK_VERSION_MISSING";
    pub const LINK_DUPLICATE_CHILD: &str = "LINK_DUPLICATE_CHILD";
    pub const LINK_SYMLINK_CHILDREN: &str = "LINK_SYMLINK_CHILDREN";
    pub const LINK_CREATE_FAILED: &str = "LINK_CREATE_FAILED";
    pub const LINK_MANIFEST_WRITE_FAILED: &str = "LINK_MANIFEST_WRITE_FAILED";
    pub const LINK_REGISTRY_WRITE_FAILED: &str = "LINK_REGISTRY_WRITE_FAILED";
    pub const LINK_IO_ERROR: &str = "LINK_IO_ERROR";
}

/// Linking error.
#[derive(Debug)]
pub struct LinkError {
    code: &'static str,
    message: String,
}

impl LinkError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// A declared local dependency names a project missing from the repo config.
    #[must_use]
    pub fn project_not_found(dependent: &str, dependency: &str) -> Self {
        Self::new(
            codes::LINK_PROJECT_NOT_FOUND,
            format!(
                "Project '{dependent}' declares local dependency '{dependency}', \
                 which is not a configured project"
            ),
        )
    }

    /// A temp project manifest could not be read or parsed.
    pub fn temp_manifest_invalid(path: &Path, detail: impl fmt::Display) -> Self {
        Self::new(
            codes::LINK_TEMP_MANIFEST_INVALID,
            format!("Invalid temp manifest {}: {detail}", path.display()),
        )
    }

    /// A project's package.json could not be read or parsed.
    pub fn package_json_invalid(path: &Path, detail: impl fmt::Display) -> Self {
        Self::new(
            codes::LINK_PACKAGE_JSON_INVALID,
            format!("Invalid package.json {}: {detail}", path.display()),
        )
    }

    /// No dependency key recorded for a temp project.
    #[must_use]
    pub fn lockfile_key_missing(temp_project_name: &str) -> Self {
        Self::new(
            codes::LINK_LOCKFILE_KEY_MISSING,
            format!("Lockfile has no dependency key for temp project '{temp_project_name}'"),
        )
    }

    /// No tarball path recorded for a dependency key.
    #[must_use]
    pub fn tarball_missing(key: &str) -> Self {
        Self::new(
            codes::LINK_TARBALL_MISSING,
            format!("Lockfile has no tarball path for key '{key}'"),
        )
    }

    /// A tarball reference does not carry the expected URI scheme.
    #[must_use]
    pub fn tarball_ref_invalid(tarball_ref: &str) -> Self {
        Self::new(
            codes::LINK_TARBALL_REF_INVALID,
            format!("Tarball reference '{tarball_ref}' does not start with 'file:'"),
        )
    }

    /// No shrinkwrap entry for a dependency key.
    #[must_use]
    pub fn shrinkwrap_entry_missing(key: &str) -> Self {
        Self::new(
            codes::LINK_SHRINKWRAP_ENTRY_MISSING,
            format!("Lockfile has no shrinkwrap entry for key '{key}'"),
        )
    }

    /// The shrinkwrap file could not be read or parsed.
    pub fn shrinkwrap_invalid(path: &Path, detail: impl fmt::Display) -> Self {
        Self::new(
            codes::LINK_SHRINKWRAP_INVALID,
            format!("Invalid shrinkwrap {}: {detail}", path.display()),
        )
    }

    /// No workspace importer record for a project.
    #[must_use]
    pub fn importer_missing(project: &str, importer_key: &str) -> Self {
        Self::new(
            codes::LINK_IMPORTER_MISSING,
            format!("Lockfile has no workspace importer '{importer_key}' for project '{project}'"),
        )
    }

    /// The store folder does not contain the expected entry.
    #[must_use]
    pub fn store_entry_missing(dependency: &str, path: &Path) -> Self {
        Self::new(
            codes::LINK_STORE_ENTRY_MISSING,
            format!(
                "Expected store symlink for '{dependency}' at {} does not exist",
                path.display()
            ),
        )
    }

    /// The store entry exists but is not a symbolic link.
    #[must_use]
    pub fn store_entry_not_symlink(dependency: &str, path: &Path) -> Self {
        Self::new(
            codes::LINK_STORE_ENTRY_NOT_SYMLINK,
            format!(
                "Store entry for '{dependency}' at {} is not a symbolic link",
                path.display()
            ),
        )
    }

    /// Resolving the real target of a store symlink failed.
    pub fn store_realpath_failed(dependency: &str, path: &Path, detail: impl fmt::Display) -> Self {
        Self::new(
            codes::LINK_STORE_REALPATH_FAILED,
            format!(
                "Failed to resolve store symlink for '{dependency}' at {}: {detail}",
                path.display()
            ),
        )
    }

    /// A required dependency has no resolved version in the lockfile.
    #[must_use]
    pub fn version_missing(project: &str, dependency: &str) -> Self {
        Self::new(
            codes::LINK_VERSION_MISSING,
            format!(
                "Lockfile has no resolved version for dependency '{dependency}' \
                 of project '{project}'"
            ),
        )
    }

    /// Two children with the same name were added to one node.
    #[must_use]
    pub fn duplicate_child(parent: &str, child: &str) -> Self {
        Self::new(
            codes::LINK_DUPLICATE_CHILD,
            format!("Node '{parent}' already has a child named '{child}'"),
        )
    }

    /// A child was added to a symlinked node.
    #[must_use]
    pub fn symlink_children(parent: &str) -> Self {
        Self::new(
            codes::LINK_SYMLINK_CHILDREN,
            format!("Node '{parent}' is a symlink; its children are resolved from the target"),
        )
    }

    /// Creating or replacing a symlink failed.
    pub fn create_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::LINK_CREATE_FAILED, msg)
    }

    /// Writing a deps manifest failed.
    pub fn manifest_write_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::LINK_MANIFEST_WRITE_FAILED, msg)
    }

    /// Writing the link registry artifact failed.
    pub fn registry_write_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::LINK_REGISTRY_WRITE_FAILED, msg)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for LinkError {}

impl From<io::Error> for LinkError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::LINK_IO_ERROR, e.to_string())
    }
}
