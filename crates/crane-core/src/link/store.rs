//! Store path resolution.
//!
//! Maps a resolved lockfile key to the on-disk store folder where the
//! package manager physically installed that exact package + peer
//! combination. The encoding must match pnpm's own layout byte-for-byte:
//! the absolute tarball path is percent-encoded the way
//! `encodeURIComponent` would, and the peer-disambiguation suffix is
//! appended *unencoded*.

use super::error::LinkError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};

/// URI scheme carried by tarball references in the lockfile.
pub const TARBALL_URI_SCHEME: &str = "file:";

/// `encodeURIComponent` escape set: everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Store directory layout, gated by the installed pnpm major version.
///
/// There are exactly two supported layouts; this is a two-branch table,
/// not speculative version handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    /// pnpm < 4: `node_modules/.local`.
    Legacy,
    /// pnpm >= 4: `node_modules/.pnpm/local`.
    PnpmV4,
}

impl StoreLayout {
    /// Select the layout for an installed pnpm version.
    #[must_use]
    pub fn for_package_manager(version: &semver::Version) -> Self {
        if version.major >= 4 {
            Self::PnpmV4
        } else {
            Self::Legacy
        }
    }

    fn push_root(self, folder: &mut PathBuf) {
        match self {
            Self::Legacy => {
                folder.push("node_modules");
                folder.push(".local");
            }
            Self::PnpmV4 => {
                folder.push("node_modules");
                folder.push(".pnpm");
                folder.push("local");
            }
        }
    }
}

/// Percent-encode a string with `encodeURIComponent` semantics.
#[must_use]
pub fn uri_encode(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Extract the peer-disambiguation suffix from a full dependency key.
///
/// If the key extends the tarball reference (e.g. key
/// `file:projects/app.tgz_jsdom@11.12.0` for ref `file:projects/app.tgz`),
/// the suffix is the remainder; otherwise it is empty.
#[must_use]
pub fn split_key_suffix<'a>(tarball_ref: &str, dependency_key: &'a str) -> &'a str {
    if dependency_key.len() > tarball_ref.len() && dependency_key.starts_with(tarball_ref) {
        &dependency_key[tarball_ref.len()..]
    } else {
        ""
    }
}

/// Resolve the store folder for a tarball reference and dependency key.
///
/// The returned folder is where the package manager created the
/// `node_modules` tree for this exact install:
/// `<common-temp>/<layout-root>/<encoded-path><suffix>/node_modules`.
pub fn resolve_store_path(
    common_temp_folder: &Path,
    tarball_ref: &str,
    dependency_key: &str,
    layout: StoreLayout,
) -> Result<PathBuf, LinkError> {
    let relative = tarball_ref
        .strip_prefix(TARBALL_URI_SCHEME)
        .ok_or_else(|| LinkError::tarball_ref_invalid(tarball_ref))?;

    // Absolute path using OS separators, then normalized to forward slashes
    // so the percent-encoded form is identical on every platform.
    let absolute = common_temp_folder.join(relative);
    let slashed = absolute.to_string_lossy().replace('\\', "/");

    let encoded = uri_encode(&slashed);
    let suffix = split_key_suffix(tarball_ref, dependency_key);

    let mut folder = common_temp_folder.to_path_buf();
    layout.push_root(&mut folder);
    folder.push(format!("{encoded}{suffix}"));
    folder.push("node_modules");
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::error::codes;

    #[test]
    fn test_uri_encode_matches_encode_uri_component() {
        assert_eq!(uri_encode("/repo/common/temp"), "%2Frepo%2Fcommon%2Ftemp");
        // Unreserved characters pass through
        assert_eq!(uri_encode("a-b_c.d!e~f*g'h(i)j"), "a-b_c.d!e~f*g'h(i)j");
        // Reserved characters are escaped
        assert_eq!(uri_encode("a b@c#d"), "a%20b%40c%23d");
    }

    #[test]
    fn test_split_key_suffix() {
        assert_eq!(
            split_key_suffix("file:projects/app.tgz", "file:projects/app.tgz_jsdom@11.12.0"),
            "_jsdom@11.12.0"
        );
        assert_eq!(split_key_suffix("file:projects/app.tgz", "file:projects/app.tgz"), "");
        assert_eq!(split_key_suffix("file:projects/app.tgz", "file:projects/other.tgz_x@1"), "");
    }

    #[test]
    fn test_resolve_store_path_legacy_layout() {
        let temp = Path::new("/repo/common/temp");
        let path = resolve_store_path(
            temp,
            "file:projects/app.tgz",
            "file:projects/app.tgz_jsdom@11.12.0",
            StoreLayout::Legacy,
        )
        .unwrap();

        let expected = format!(
            "/repo/common/temp/node_modules/.local/{}_jsdom@11.12.0/node_modules",
            uri_encode("/repo/common/temp/projects/app.tgz")
        );
        assert_eq!(path, PathBuf::from(expected));
    }

    #[test]
    fn test_resolve_store_path_pnpm_v4_layout() {
        let temp = Path::new("/repo/common/temp");
        let path = resolve_store_path(
            temp,
            "file:projects/app.tgz",
            "file:projects/app.tgz",
            StoreLayout::PnpmV4,
        )
        .unwrap();

        assert!(path.starts_with("/repo/common/temp/node_modules/.pnpm/local"));
        assert!(path.ends_with("node_modules"));
        // No suffix: the encoded segment ends with the encoded tarball path
        let segment = path.parent().unwrap().file_name().unwrap().to_str().unwrap();
        assert!(segment.ends_with(&uri_encode("app.tgz")));
    }

    #[test]
    fn test_resolve_store_path_deterministic() {
        let temp = Path::new("/repo/common/temp");
        let a = resolve_store_path(temp, "file:projects/a.tgz", "file:projects/a.tgz", StoreLayout::PnpmV4)
            .unwrap();
        let b = resolve_store_path(temp, "file:projects/a.tgz", "file:projects/a.tgz", StoreLayout::PnpmV4)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_store_path_distinct_inputs_distinct_outputs() {
        let temp = Path::new("/repo/common/temp");
        let a = resolve_store_path(temp, "file:projects/a-b.tgz", "file:projects/a-b.tgz", StoreLayout::PnpmV4)
            .unwrap();
        let b = resolve_store_path(temp, "file:projects/a/b.tgz", "file:projects/a/b.tgz", StoreLayout::PnpmV4)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_layout_selection_by_major_version() {
        assert_eq!(
            StoreLayout::for_package_manager(&semver::Version::new(2, 15, 1)),
            StoreLayout::Legacy
        );
        assert_eq!(
            StoreLayout::for_package_manager(&semver::Version::new(3, 9, 9)),
            StoreLayout::Legacy
        );
        assert_eq!(
            StoreLayout::for_package_manager(&semver::Version::new(4, 0, 0)),
            StoreLayout::PnpmV4
        );
        assert_eq!(
            StoreLayout::for_package_manager(&semver::Version::new(7, 14, 2)),
            StoreLayout::PnpmV4
        );
    }

    #[test]
    fn test_missing_scheme_is_an_error() {
        let err = resolve_store_path(
            Path::new("/repo/common/temp"),
            "projects/app.tgz",
            "projects/app.tgz",
            StoreLayout::PnpmV4,
        )
        .unwrap_err();
        assert_eq!(err.code(), codes::LINK_TARBALL_REF_INVALID);
    }
}
