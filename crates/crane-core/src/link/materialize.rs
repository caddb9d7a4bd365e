//! Symlink materialization.
//!
//! Walks a completed [`PackageNode`] tree and realizes it on disk: symlink
//! nodes get a symbolic link (junction on Windows) at their folder path,
//! directory nodes are assumed to already exist. Re-running on an
//! already-linked project replaces existing links rather than erroring.

use super::error::LinkError;
use super::node::{NodeKind, PackageNode};
use std::fs;
use std::path::Path;

/// Realize a package tree on disk.
///
/// Sibling order carries no meaning here; each symlink is independent.
pub fn materialize_tree(root: &PackageNode) -> Result<(), LinkError> {
    match root.kind() {
        NodeKind::Symlink { target } => {
            create_link(target, &root.folder_path)?;
            // Children of a symlinked node are resolved from the target on
            // disk, never recreated.
            Ok(())
        }
        NodeKind::Directory => {
            for child in root.children() {
                materialize_tree(child)?;
            }
            Ok(())
        }
    }
}

fn create_link(target: &Path, link_path: &Path) -> Result<(), LinkError> {
    if let Some(parent) = link_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LinkError::create_failed(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }

    // Replace whatever is already there; linking must be idempotent.
    if link_path.symlink_metadata().is_ok() {
        remove_link_or_dir(link_path)?;
    }

    create_dir_link(target, link_path)
}

/// Remove a symlink, junction, or directory.
fn remove_link_or_dir(path: &Path) -> Result<(), LinkError> {
    #[cfg(unix)]
    {
        // On Unix, remove_file handles symlinks
        if let Ok(metadata) = fs::symlink_metadata(path) {
            if metadata.file_type().is_symlink() {
                fs::remove_file(path).map_err(|e| {
                    LinkError::create_failed(format!("Failed to remove existing symlink: {e}"))
                })?;
                return Ok(());
            }
        }
    }

    #[cfg(windows)]
    {
        // On Windows, junctions are directories but need special handling
        use std::os::windows::fs::MetadataExt;

        if let Ok(metadata) = fs::symlink_metadata(path) {
            let file_attributes = metadata.file_attributes();
            // FILE_ATTRIBUTE_REPARSE_POINT = 0x400
            if file_attributes & 0x400 != 0 {
                fs::remove_dir(path).map_err(|e| {
                    LinkError::create_failed(format!("Failed to remove existing junction: {e}"))
                })?;
                return Ok(());
            }
        }
    }

    if path.is_dir() {
        fs::remove_dir_all(path).map_err(|e| {
            LinkError::create_failed(format!("Failed to remove existing directory: {e}"))
        })?;
    } else if path.exists() {
        fs::remove_file(path)
            .map_err(|e| LinkError::create_failed(format!("Failed to remove existing file: {e}")))?;
    }

    Ok(())
}

/// Create a directory link (symlink on Unix, junction on Windows).
fn create_dir_link(src: &Path, dst: &Path) -> Result<(), LinkError> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(src, dst).map_err(|e| {
            LinkError::create_failed(format!(
                "Failed to create symlink from {} to {}: {e}",
                dst.display(),
                src.display()
            ))
        })
    }

    #[cfg(windows)]
    {
        junction::create(src, dst).map_err(|e| {
            LinkError::create_failed(format!(
                "Failed to create junction from {} to {}: {e}",
                dst.display(),
                src.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn make_target(dir: &Path, name: &str) -> PathBuf {
        let target = dir.join(name);
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("package.json"), "{}").unwrap();
        target
    }

    #[test]
    fn test_materialize_creates_symlinks() {
        let store = tempdir().unwrap();
        let project = tempdir().unwrap();
        let target = make_target(store.path(), "left-pad");

        let mut root = PackageNode::directory("app", "1.0.0", project.path().to_path_buf());
        root.add_child(PackageNode::symlink(
            "left-pad",
            "1.3.0",
            project.path().join("node_modules").join("left-pad"),
            target.clone(),
        ))
        .unwrap();

        materialize_tree(&root).unwrap();

        let link = project.path().join("node_modules").join("left-pad");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), target);
        assert!(link.join("package.json").exists());
    }

    #[test]
    fn test_materialize_scoped_package() {
        let store = tempdir().unwrap();
        let project = tempdir().unwrap();
        let target = make_target(store.path(), "node");

        let mut root = PackageNode::directory("app", "1.0.0", project.path().to_path_buf());
        root.add_child(PackageNode::symlink(
            "@types/node",
            "20.0.0",
            project.path().join("node_modules").join("@types").join("node"),
            target,
        ))
        .unwrap();

        materialize_tree(&root).unwrap();

        let link = project
            .path()
            .join("node_modules")
            .join("@types")
            .join("node");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let store = tempdir().unwrap();
        let project = tempdir().unwrap();
        let target = make_target(store.path(), "left-pad");

        let mut root = PackageNode::directory("app", "1.0.0", project.path().to_path_buf());
        root.add_child(PackageNode::symlink(
            "left-pad",
            "1.3.0",
            project.path().join("node_modules").join("left-pad"),
            target.clone(),
        ))
        .unwrap();

        materialize_tree(&root).unwrap();
        materialize_tree(&root).unwrap();

        let link = project.path().join("node_modules").join("left-pad");
        assert_eq!(fs::read_link(&link).unwrap(), target);
    }

    #[test]
    fn test_materialize_replaces_existing_directory() {
        let store = tempdir().unwrap();
        let project = tempdir().unwrap();
        let target = make_target(store.path(), "left-pad");

        let stale = project.path().join("node_modules").join("left-pad");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("old.txt"), "old").unwrap();

        let mut root = PackageNode::directory("app", "1.0.0", project.path().to_path_buf());
        root.add_child(PackageNode::symlink(
            "left-pad",
            "1.3.0",
            stale.clone(),
            target,
        ))
        .unwrap();

        materialize_tree(&root).unwrap();

        assert!(stale.symlink_metadata().unwrap().file_type().is_symlink());
        assert!(!stale.join("old.txt").exists());
    }
}
