//! Containment checks for entry names and symlink targets read from an
//! archive.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Resolve an entry name against `base`.
///
/// Absolute names and names whose `..` segments climb above `base` are
/// rejected. `base` must already be absolute and clean.
pub fn sanitize_path(entry: &Path, base: &Path) -> Result<PathBuf> {
    let slip = || Error::ZipSlip {
        entry: entry.to_path_buf(),
        resolved: base.join(entry),
    };
    let relative = normalize_relative(entry).ok_or_else(slip)?;
    Ok(base.join(relative))
}

/// Check that a symlink created at `link` pointing to `target` stays inside
/// `base`. Returns the resolved target.
pub fn sanitize_symlink_target(target: &Path, link: &Path, base: &Path) -> Result<PathBuf> {
    let escape = || Error::SymlinkEscape {
        target: target.to_path_buf(),
        symlink: link.to_path_buf(),
    };
    let link_dir = link
        .parent()
        .and_then(|parent| parent.strip_prefix(base).ok())
        .ok_or_else(escape)?;
    let relative = normalize_relative(&link_dir.join(target)).ok_or_else(escape)?;
    Ok(base.join(relative))
}

/// Whether a link stored under `link_name` and pointing at `target` stays
/// inside the archive root. Mirrors [`sanitize_symlink_target`] for the
/// creating side.
pub(crate) fn link_stays_inside(link_name: &Path, target: &Path) -> bool {
    let dir = link_name.parent().unwrap_or_else(|| Path::new(""));
    normalize_relative(&dir.join(target)).is_some()
}

/// Lexically normalize a relative path. `None` when the path is absolute or
/// climbs above its starting point.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> &'static Path {
        if cfg!(windows) {
            Path::new("C:/opt/out")
        } else {
            Path::new("/opt/out")
        }
    }

    #[test]
    fn nested_name_resolves_under_base() {
        let resolved = sanitize_path(Path::new("pkg/bin/tool"), base()).unwrap();
        assert_eq!(resolved, base().join("pkg/bin/tool"));
    }

    #[test]
    fn inner_parent_segments_are_folded() {
        let resolved = sanitize_path(Path::new("a/./b/../c.txt"), base()).unwrap();
        assert_eq!(resolved, base().join("a/c.txt"));
    }

    #[test]
    fn leading_parent_is_rejected() {
        let err = sanitize_path(Path::new("../escape.txt"), base()).unwrap_err();
        assert!(matches!(err, Error::ZipSlip { .. }));
    }

    #[test]
    fn climbing_back_out_is_rejected() {
        let err = sanitize_path(Path::new("a/../../b"), base()).unwrap_err();
        assert!(matches!(err, Error::ZipSlip { .. }));
    }

    #[test]
    fn absolute_name_is_rejected() {
        let name = if cfg!(windows) { "C:\\etc\\passwd" } else { "/etc/passwd" };
        let err = sanitize_path(Path::new(name), base()).unwrap_err();
        assert!(matches!(err, Error::ZipSlip { .. }));
    }

    #[test]
    fn sibling_symlink_is_allowed() {
        let link = base().join("bin/tool");
        let resolved = sanitize_symlink_target(Path::new("../lib/tool"), &link, base()).unwrap();
        assert_eq!(resolved, base().join("lib/tool"));
    }

    #[test]
    fn escaping_symlink_is_rejected() {
        let link = base().join("bin/tool");
        let err = sanitize_symlink_target(Path::new("../../etc/passwd"), &link, base()).unwrap_err();
        assert!(matches!(err, Error::SymlinkEscape { .. }));
    }

    #[test]
    fn absolute_symlink_is_rejected() {
        let link = base().join("tool");
        let target = if cfg!(windows) { "C:\\etc" } else { "/etc" };
        let err = sanitize_symlink_target(Path::new(target), &link, base()).unwrap_err();
        assert!(matches!(err, Error::SymlinkEscape { .. }));
    }

    #[test]
    fn stored_link_containment() {
        assert!(link_stays_inside(Path::new("pkg/entry.rs"), Path::new("src/main.rs")));
        assert!(link_stays_inside(Path::new("pkg/bin/tool"), Path::new("../lib/tool")));
        assert!(!link_stays_inside(Path::new("tool"), Path::new("../outside")));
        assert!(!link_stays_inside(Path::new("pkg/tool"), Path::new("/etc/hostname")));
    }
}
