use std::path::Path;

use crate::error::{Error, Result};
use crate::format::FormatSelection;

/// Settings for archive creation.
#[derive(Clone, Debug, Default)]
pub struct ArchiveOptions {
    /// Leave a truncated output on disk when creation fails.
    pub keep_partial: bool,
    pub zip_method: ZipMethod,
    /// Codec-specific level; `None` uses each codec's default.
    pub compression_level: Option<u32>,
}

/// Per-entry compression inside zip containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ZipMethod {
    Stored,
    #[default]
    Deflated,
}

impl ArchiveOptions {
    pub fn keep_partial(mut self, keep: bool) -> Self {
        self.keep_partial = keep;
        self
    }

    pub fn zip_method(mut self, method: ZipMethod) -> Self {
        self.zip_method = method;
        self
    }

    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }
}

/// Settings for extraction.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Skip detection and use this pair.
    pub format: Option<FormatSelection>,
    pub permission_strategy: PermissionStrategy,
    /// Replace files already present under the destination.
    pub overwrite: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            format: None,
            permission_strategy: PermissionStrategy::default(),
            overwrite: true,
        }
    }
}

impl ExtractOptions {
    pub fn format(mut self, format: FormatSelection) -> Self {
        self.format = Some(format);
        self
    }

    pub fn permission_strategy(mut self, strategy: PermissionStrategy) -> Self {
        self.permission_strategy = strategy;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// How stored mode bits map onto extracted files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PermissionStrategy {
    /// Apply the archive's mode bits as recorded.
    #[default]
    Preserve,
    /// Keep executable modes, otherwise widen to at least `0o644`.
    Standard,
    ReadOnly,
    /// Always `0o644`, ignoring the archive.
    Owned,
}

impl PermissionStrategy {
    /// Mode to apply for an entry recorded with `mode`; `None` leaves the
    /// file as created.
    pub fn resolve(self, mode: Option<u32>) -> Option<u32> {
        match self {
            Self::Preserve => mode.map(|m| m & 0o7777),
            Self::Standard => Some(match mode {
                Some(m) if m & 0o111 != 0 => m & 0o7777,
                Some(m) => (m & 0o7777) | 0o644,
                None => 0o644,
            }),
            Self::ReadOnly => Some(0o444),
            Self::Owned => Some(0o644),
        }
    }

    pub fn apply_to_path(self, path: &Path, mode: Option<u32>) -> Result<()> {
        match self.resolve(mode) {
            Some(mode) => set_mode(path, mode),
            None => Ok(()),
        }
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    let mut perms = std::fs::metadata(path)
        .map_err(|e| Error::io(path, e))?
        .permissions();
    perms.set_readonly(mode & 0o222 == 0);
    std::fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Archival, Compression};

    #[test]
    fn archive_options_builder() {
        let options = ArchiveOptions::default()
            .keep_partial(true)
            .zip_method(ZipMethod::Stored)
            .compression_level(9);
        assert!(options.keep_partial);
        assert_eq!(options.zip_method, ZipMethod::Stored);
        assert_eq!(options.compression_level, Some(9));
    }

    #[test]
    fn extract_options_default() {
        let options = ExtractOptions::default();
        assert!(options.format.is_none());
        assert!(options.overwrite);
        assert_eq!(options.permission_strategy, PermissionStrategy::Preserve);
    }

    #[test]
    fn extract_options_builder() {
        let selection = FormatSelection::new(Some(Compression::Xz), Archival::Tar);
        let options = ExtractOptions::default()
            .format(selection)
            .permission_strategy(PermissionStrategy::ReadOnly)
            .overwrite(false);
        assert_eq!(options.format, Some(selection));
        assert_eq!(options.permission_strategy, PermissionStrategy::ReadOnly);
        assert!(!options.overwrite);
    }

    #[test]
    fn preserve_keeps_mode() {
        assert_eq!(PermissionStrategy::Preserve.resolve(Some(0o100755)), Some(0o755));
        assert_eq!(PermissionStrategy::Preserve.resolve(None), None);
    }

    #[test]
    fn standard_strategy() {
        assert_eq!(PermissionStrategy::Standard.resolve(Some(0o755)), Some(0o755));
        assert_eq!(PermissionStrategy::Standard.resolve(Some(0o600)), Some(0o644));
        assert_eq!(PermissionStrategy::Standard.resolve(None), Some(0o644));
    }

    #[test]
    fn fixed_strategies() {
        assert_eq!(PermissionStrategy::ReadOnly.resolve(Some(0o755)), Some(0o444));
        assert_eq!(PermissionStrategy::Owned.resolve(Some(0o700)), Some(0o644));
    }

    #[cfg(unix)]
    #[test]
    fn apply_sets_mode_bits() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, "#!/bin/sh").unwrap();
        PermissionStrategy::Preserve
            .apply_to_path(&path, Some(0o750))
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}
