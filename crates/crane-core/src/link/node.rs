//! In-memory package-resolution tree.
//!
//! A [`PackageNode`] represents one resolved package instance: either a real
//! directory (a project's own folder) or an entry that will be realized on
//! disk as a symlink. The symlink-or-directory duality is an enum so the
//! invariants hold by construction: a node is never both, and a project root
//! is always a directory.

use super::error::LinkError;
use std::path::{Path, PathBuf};

/// How a node is realized on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A real directory that already exists (project roots, temp packages).
    Directory,
    /// A symlink pointing at an already-materialized folder.
    Symlink {
        /// Absolute path the symlink resolves to.
        target: PathBuf,
    },
}

/// One node in a project's package-resolution tree.
///
/// Trees are built fresh for every linking pass and discarded after
/// materialization.
#[derive(Debug, Clone)]
pub struct PackageNode {
    /// Package name (e.g. `react` or `@types/node`). Non-empty.
    pub name: String,
    /// Resolved version, or a free-form specifier for workspace entries.
    pub version: String,
    /// Absolute path where this node's `node_modules` entry lives.
    pub folder_path: PathBuf,
    kind: NodeKind,
    children: Vec<PackageNode>,
}

impl PackageNode {
    /// Create a node backed by a real directory.
    #[must_use]
    pub fn directory(
        name: impl Into<String>,
        version: impl Into<String>,
        folder_path: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            folder_path,
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    /// Create a node that will be realized as a symlink to `target`.
    #[must_use]
    pub fn symlink(
        name: impl Into<String>,
        version: impl Into<String>,
        folder_path: PathBuf,
        target: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            folder_path,
            kind: NodeKind::Symlink { target },
            children: Vec::new(),
        }
    }

    /// The node's on-disk realization.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Symlink target, if this node is realized as a symlink.
    #[must_use]
    pub fn symlink_target(&self) -> Option<&Path> {
        match &self.kind {
            NodeKind::Symlink { target } => Some(target),
            NodeKind::Directory => None,
        }
    }

    /// Direct children in dependency declaration order.
    #[must_use]
    pub fn children(&self) -> &[PackageNode] {
        &self.children
    }

    /// Append a child node.
    ///
    /// Child names must be unique, and symlinked nodes take no children
    /// (their dependencies are resolved from the link target on disk).
    pub fn add_child(&mut self, child: PackageNode) -> Result<(), LinkError> {
        if matches!(self.kind, NodeKind::Symlink { .. }) {
            return Err(LinkError::symlink_children(&self.name));
        }
        if self.children.iter().any(|c| c.name == child.name) {
            return Err(LinkError::duplicate_child(&self.name, &child.name));
        }
        self.children.push(child);
        Ok(())
    }
}
