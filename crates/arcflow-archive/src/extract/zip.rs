use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::read::ZipFile;

use super::{EntrySource, PendingEntry, PendingKind};
use crate::error::{Error, Result};

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

pub(super) struct ZipSource<R: Read + Seek> {
    archive: ZipArchive<R>,
    index: usize,
    path: PathBuf,
}

impl<R: Read + Seek> ZipSource<R> {
    pub(super) fn new(reader: R, path: &Path) -> Result<Self> {
        let archive = ZipArchive::new(reader).map_err(|e| Error::zip(path, e))?;
        Ok(Self {
            archive,
            index: 0,
            path: path.to_path_buf(),
        })
    }
}

impl<R: Read + Seek> EntrySource for ZipSource<R> {
    type Reader<'a>
        = ZipFile<'a, R>
    where
        Self: 'a;

    fn next_entry(&mut self) -> Option<Result<PendingEntry<Self::Reader<'_>>>> {
        if self.index >= self.archive.len() {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(read_entry(&mut self.archive, index, &self.path))
    }
}

fn read_entry<'a, R: Read + Seek>(
    archive: &'a mut ZipArchive<R>,
    index: usize,
    path: &Path,
) -> Result<PendingEntry<ZipFile<'a, R>>> {
    let mut file = archive.by_index(index).map_err(|e| Error::zip(path, e))?;
    // Some Windows tools write `\` separators.
    let name = PathBuf::from(file.name().replace('\\', "/"));
    let size = file.size();
    let mode = file.unix_mode();

    let kind = if file.is_dir() {
        PendingKind::Directory
    } else if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
        let mut target = String::new();
        file.read_to_string(&mut target)
            .map_err(|e| Error::io(path, e))?;
        PendingKind::Symlink {
            target: target.into(),
        }
    } else {
        PendingKind::File(file)
    };

    Ok(PendingEntry {
        name,
        size,
        mode: mode.map(|m| m & 0o7777),
        kind,
    })
}
