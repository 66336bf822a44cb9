//! Entry collection from a directory walk or an explicit file mapping.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::entry::{Entry, EntryKind};
use crate::error::{Error, Result};
use crate::resolve::{self, FileMapping};
use crate::sanitize::link_stays_inside;

/// Collect every object under `dir`, nested under its archive name.
/// Physical paths are absolute even when `dir` is relative.
pub fn collect_dir(cancel: &CancelToken, dir: &Path) -> Result<Vec<Entry>> {
    ensure_exists(dir)?;
    let prefix = resolve::archive_dir_name(dir)?;
    let root = resolve::absolute(dir)?;
    tracing::debug!(dir = %root.display(), prefix = %prefix, "collecting directory");

    let mut collector = Collector::default();
    collector.walk(cancel, &root, &prefix)?;
    Ok(collector.entries)
}

/// Collect one entry per mapping, in order. Directories are expanded with
/// the mapping's logical name as prefix.
pub fn collect_files(cancel: &CancelToken, mappings: &[FileMapping]) -> Result<Vec<Entry>> {
    let mut collector = Collector::default();
    for mapping in mappings {
        cancel.check()?;
        let metadata = fs::symlink_metadata(&mapping.physical)
            .map_err(|e| not_found_or_io(&mapping.physical, e))?;
        if metadata.is_dir() {
            collector.walk(cancel, &mapping.physical, &mapping.logical)?;
        } else {
            let kind = entry_kind(&mapping.physical, &metadata)?;
            if let Some(kind) = kind {
                collector.push(Entry::from_metadata(
                    mapping.physical.clone(),
                    mapping.logical.clone(),
                    &metadata,
                    kind,
                ))?;
            }
        }
    }
    Ok(collector.entries)
}

/// Ordered entries with unique logical names. Seeing the same physical path
/// twice is a no-op; two paths claiming one name is an error.
#[derive(Default)]
struct Collector {
    seen: HashMap<String, PathBuf>,
    entries: Vec<Entry>,
}

impl Collector {
    fn push(&mut self, entry: Entry) -> Result<()> {
        if let Some(first) = self.seen.get(&entry.logical_name) {
            if *first == entry.physical_path {
                tracing::debug!(name = %entry.logical_name, "skipping repeated entry");
                return Ok(());
            }
            return Err(Error::DuplicateName {
                name: entry.logical_name,
                first: first.clone(),
                second: entry.physical_path,
            });
        }
        if let Some(target) = entry.symlink_target() {
            check_link(&entry, target)?;
        }

        tracing::trace!(name = %entry.logical_name, "collected entry");
        self.seen
            .insert(entry.logical_name.clone(), entry.physical_path.clone());
        self.entries.push(entry);
        Ok(())
    }

    fn walk(&mut self, cancel: &CancelToken, root: &Path, prefix: &str) -> Result<()> {
        let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
        for item in walker {
            cancel.check()?;
            let item = item.map_err(|e| walk_error(root, e))?;
            let relative = item.path().strip_prefix(root).unwrap_or(item.path());
            let logical =
                resolve::join_logical(prefix, &resolve::logical_name(relative, item.path())?);
            if logical.is_empty() {
                continue;
            }

            let metadata = item.metadata().map_err(|e| walk_error(root, e))?;
            let Some(kind) = entry_kind(item.path(), &metadata)? else {
                continue;
            };
            self.push(Entry::from_metadata(
                item.path().to_path_buf(),
                logical,
                &metadata,
                kind,
            ))?;
        }
        Ok(())
    }
}

fn entry_kind(path: &Path, metadata: &fs::Metadata) -> Result<Option<EntryKind>> {
    let file_type = metadata.file_type();
    if file_type.is_symlink() {
        let target = fs::read_link(path).map_err(|e| Error::io(path, e))?;
        Ok(Some(EntryKind::Symlink { target }))
    } else if file_type.is_dir() {
        Ok(Some(EntryKind::Directory))
    } else if file_type.is_file() {
        Ok(Some(EntryKind::File))
    } else {
        tracing::warn!(path = %path.display(), "skipping special file");
        Ok(None)
    }
}

/// Links must be storable by name and resolve inside the archive, or they
/// could not be extracted again.
fn check_link(entry: &Entry, target: &Path) -> Result<()> {
    if target.to_str().is_none() {
        return Err(Error::NonUtf8Name {
            path: entry.physical_path.clone(),
        });
    }
    if !link_stays_inside(Path::new(&entry.logical_name), target) {
        return Err(Error::ExternalSymlink {
            path: entry.physical_path.clone(),
            target: target.to_path_buf(),
        });
    }
    Ok(())
}

pub(crate) fn ensure_exists(path: &Path) -> Result<()> {
    fs::symlink_metadata(path)
        .map(|_| ())
        .map_err(|e| not_found_or_io(path, e))
}

fn not_found_or_io(path: &Path, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::NotFound {
        Error::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        Error::io(path, source)
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    match err.into_io_error() {
        Some(source) => not_found_or_io(&path, source),
        None => Error::io(path, io::Error::other("filesystem loop detected")),
    }
}
