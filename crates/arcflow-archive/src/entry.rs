use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One filesystem object scheduled for archiving.
///
/// `logical_name` is the `/`-separated name stored in the archive. It is
/// relative, non-empty and free of `.` and `..` segments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub physical_path: PathBuf,
    pub logical_name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub mode: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink { target: PathBuf },
}

impl Entry {
    pub fn new(physical_path: PathBuf, logical_name: String, kind: EntryKind) -> Self {
        Self {
            physical_path,
            logical_name,
            kind,
            size: 0,
            modified: None,
            mode: None,
        }
    }

    /// Build an entry from `symlink_metadata` of `physical_path`.
    pub(crate) fn from_metadata(
        physical_path: PathBuf,
        logical_name: String,
        metadata: &Metadata,
        kind: EntryKind,
    ) -> Self {
        let size = if matches!(kind, EntryKind::File) {
            metadata.len()
        } else {
            0
        };
        Self {
            physical_path,
            logical_name,
            kind,
            size,
            modified: metadata.modified().ok(),
            mode: unix_mode(metadata),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, EntryKind::Symlink { .. })
    }

    pub fn symlink_target(&self) -> Option<&Path> {
        match &self.kind {
            EntryKind::Symlink { target } => Some(target),
            _ => None,
        }
    }

    /// Seconds since the unix epoch, clamped at zero.
    pub fn modified_secs(&self) -> u64 {
        self.modified
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs())
    }
}

#[cfg(unix)]
fn unix_mode(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn unix_mode(metadata: &Metadata) -> Option<u32> {
    if metadata.is_dir() {
        Some(0o755)
    } else if metadata.permissions().readonly() {
        Some(0o444)
    } else {
        Some(0o644)
    }
}
