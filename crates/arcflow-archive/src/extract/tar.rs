use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::{EntrySource, PendingEntry, PendingKind};
use crate::error::{Error, Result};

/// Streams entries out of a (possibly decoded) tar archive.
pub(super) struct TarSource<'a, R: Read> {
    entries: tar::Entries<'a, R>,
    path: PathBuf,
}

impl<'a, R: Read> TarSource<'a, R> {
    pub(super) fn new(archive: &'a mut tar::Archive<R>, path: &Path) -> Result<Self> {
        let entries = archive.entries().map_err(|e| Error::io(path, e))?;
        Ok(Self {
            entries,
            path: path.to_path_buf(),
        })
    }

    /// `None` for entry types that have no on-disk counterpart here.
    fn pending(&self, entry: tar::Entry<'a, R>) -> Result<Option<PendingEntry<tar::Entry<'a, R>>>> {
        let name = entry
            .path()
            .map_err(|e| Error::io(&self.path, e))?
            .into_owned();
        let header = entry.header();
        let size = header.size().map_err(|e| Error::io(&self.path, e))?;
        let mode = header.mode().ok();
        let entry_type = header.entry_type();

        let kind = if entry_type.is_dir() {
            PendingKind::Directory
        } else if entry_type.is_symlink() {
            let target = entry
                .link_name()
                .map_err(|e| Error::io(&self.path, e))?
                .ok_or_else(|| {
                    Error::io(
                        &self.path,
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("symlink '{}' has no target", name.display()),
                        ),
                    )
                })?
                .into_owned();
            PendingKind::Symlink { target }
        } else if entry_type.is_file() || entry_type.is_contiguous() {
            PendingKind::File(entry)
        } else if entry_type.is_pax_global_extensions() {
            tracing::debug!("skipping pax global header");
            return Ok(None);
        } else {
            tracing::warn!(name = %name.display(), kind = ?entry_type, "skipping unsupported tar entry");
            return Ok(None);
        };

        Ok(Some(PendingEntry {
            name,
            size,
            mode,
            kind,
        }))
    }
}

impl<'a, R: Read + 'a> EntrySource for TarSource<'a, R> {
    type Reader<'b>
        = tar::Entry<'a, R>
    where
        Self: 'b;

    fn next_entry(&mut self) -> Option<Result<PendingEntry<Self::Reader<'_>>>> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(Error::io(&self.path, e))),
            };
            match self.pending(entry) {
                Ok(Some(pending)) => return Some(Ok(pending)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
