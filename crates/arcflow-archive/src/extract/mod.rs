//! Archive extraction for tar and zip containers under any registered codec.
//!
//! # Platform Behavior
//!
//! **Unix**: stored mode bits are applied to files through
//! [`PermissionStrategy`](crate::PermissionStrategy) and symlinks are
//! recreated.
//!
//! **Windows (non-Unix)**: only the read-only bit is honoured and symlink
//! entries are skipped with a warning.

use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::format::{
    self, Archival, Compression, FormatSelection, detect_archival, detect_compression,
    detect_from_extension,
};
use crate::options::ExtractOptions;
use crate::report::ExtractReport;
use crate::sanitize::{sanitize_path, sanitize_symlink_target};

mod tar;
mod zip;

use self::tar::TarSource;
use self::zip::ZipSource;

/// Bytes inspected for container signatures; one tar header block.
const SNIFF_LEN: u64 = 512;

/// An entry read from the container but not yet written.
pub(crate) struct PendingEntry<R> {
    pub name: PathBuf,
    pub size: u64,
    pub mode: Option<u32>,
    pub kind: PendingKind<R>,
}

pub(crate) enum PendingKind<R> {
    File(R),
    Directory,
    Symlink { target: PathBuf },
}

/// Container-specific entry iterator. Readers may borrow the source, so
/// each entry must be consumed before asking for the next.
pub(crate) trait EntrySource {
    type Reader<'a>: Read
    where
        Self: 'a;

    fn next_entry(&mut self) -> Option<Result<PendingEntry<Self::Reader<'_>>>>;
}

#[derive(Default)]
struct Extracted {
    entry_count: usize,
    total_bytes: u64,
}

/// Extract `archive_path` into `destination`, detecting both formats.
pub fn unarchive(
    cancel: &CancelToken,
    archive_path: impl AsRef<Path>,
    destination: impl AsRef<Path>,
) -> Result<ExtractReport> {
    unarchive_with(
        cancel,
        archive_path,
        destination,
        &ExtractOptions::default(),
    )
}

pub fn unarchive_with(
    cancel: &CancelToken,
    archive_path: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    options: &ExtractOptions,
) -> Result<ExtractReport> {
    let archive_path = archive_path.as_ref();
    cancel.check()?;

    let file = File::open(archive_path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound {
            path: archive_path.to_path_buf(),
        },
        _ => Error::io(archive_path, e),
    })?;
    let mut reader = BufReader::new(file);
    let head = read_head(&mut reader, archive_path)?;
    reader.rewind().map_err(|e| Error::io(archive_path, e))?;

    let by_extension = detect_from_extension(archive_path);
    let compression = match options.format {
        Some(selection) => selection.compression,
        None => sniff_compression(&head, by_extension.0),
    };

    let Some(codec) = compression else {
        let archival = choose_archival(options, &head, by_extension.1, archive_path)?;
        let selection = FormatSelection::new(None, archival);
        let base = prepare_destination(destination.as_ref())?;
        tracing::debug!(archive = %archive_path.display(), format = %selection, "extracting");
        let extracted = match archival {
            Archival::Tar => extract_tar(reader, cancel, archive_path, &base, options)?,
            Archival::Zip => extract_zip(reader, cancel, archive_path, &base, options)?,
        };
        return Ok(report(base, selection, extracted));
    };

    let mut decoded = format::decoder(Some(codec), reader)?;
    let decoded_head = read_head(&mut decoded, archive_path)?;
    let archival = choose_archival(options, &decoded_head, by_extension.1, archive_path)?;
    let selection = FormatSelection::new(Some(codec), archival);
    let base = prepare_destination(destination.as_ref())?;
    tracing::debug!(archive = %archive_path.display(), format = %selection, "extracting");

    let stream = Cursor::new(decoded_head).chain(decoded);
    let extracted = match archival {
        Archival::Tar => extract_tar(stream, cancel, archive_path, &base, options)?,
        Archival::Zip => {
            let staged = spool(stream, archive_path)?;
            extract_zip(staged, cancel, archive_path, &base, options)?
        }
    };
    Ok(report(base, selection, extracted))
}

fn report(destination: PathBuf, selection: FormatSelection, extracted: Extracted) -> ExtractReport {
    tracing::debug!(
        destination = %destination.display(),
        entries = extracted.entry_count,
        bytes = extracted.total_bytes,
        "extraction complete"
    );
    ExtractReport {
        destination,
        selection,
        entry_count: extracted.entry_count,
        total_bytes: extracted.total_bytes,
    }
}

/// A stream that already looks like a container is taken as uncompressed,
/// whatever its extension says.
fn sniff_compression(head: &[u8], by_extension: Option<Compression>) -> Option<Compression> {
    if detect_archival(head).is_some() {
        return None;
    }
    detect_compression(head).or(by_extension)
}

fn choose_archival(
    options: &ExtractOptions,
    head: &[u8],
    by_extension: Option<Archival>,
    archive_path: &Path,
) -> Result<Archival> {
    options
        .format
        .map(|selection| selection.archival)
        .or_else(|| detect_archival(head))
        .or(by_extension)
        .ok_or_else(|| Error::UnsupportedFormat {
            path: archive_path.to_path_buf(),
        })
}

fn read_head<R: Read>(reader: &mut R, archive_path: &Path) -> Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    reader
        .by_ref()
        .take(SNIFF_LEN)
        .read_to_end(&mut head)
        .map_err(|e| Error::io(archive_path, e))?;
    Ok(head)
}

/// Copy a decoded stream into an anonymous file so zip can seek in it.
fn spool<R: Read>(mut stream: R, archive_path: &Path) -> Result<File> {
    let mut staged = tempfile::tempfile().map_err(|e| Error::io(archive_path, e))?;
    let size = io::copy(&mut stream, &mut staged).map_err(|e| Error::io(archive_path, e))?;
    staged.rewind().map_err(|e| Error::io(archive_path, e))?;
    tracing::debug!(bytes = size, "staged decoded zip");
    Ok(staged)
}

fn prepare_destination(destination: &Path) -> Result<PathBuf> {
    fs::create_dir_all(destination).map_err(|e| Error::io(destination, e))?;
    fs::canonicalize(destination).map_err(|e| Error::io(destination, e))
}

fn extract_tar<R: Read>(
    reader: R,
    cancel: &CancelToken,
    archive_path: &Path,
    base: &Path,
    options: &ExtractOptions,
) -> Result<Extracted> {
    let mut archive = ::tar::Archive::new(reader);
    let mut source = TarSource::new(&mut archive, archive_path)?;
    extract_entries(&mut source, cancel, base, options)
}

fn extract_zip<R: Read + Seek>(
    reader: R,
    cancel: &CancelToken,
    archive_path: &Path,
    base: &Path,
    options: &ExtractOptions,
) -> Result<Extracted> {
    let mut source = ZipSource::new(reader, archive_path)?;
    extract_entries(&mut source, cancel, base, options)
}

fn extract_entries<S: EntrySource>(
    source: &mut S,
    cancel: &CancelToken,
    base: &Path,
    options: &ExtractOptions,
) -> Result<Extracted> {
    let mut extracted = Extracted::default();
    while let Some(pending) = source.next_entry() {
        cancel.check()?;
        let pending = pending?;
        extracted.total_bytes += write_entry(pending, base, options)?;
        extracted.entry_count += 1;
    }
    Ok(extracted)
}

/// Write one entry below `base`, returning the file bytes written.
fn write_entry<R: Read>(pending: PendingEntry<R>, base: &Path, options: &ExtractOptions) -> Result<u64> {
    let target = sanitize_path(&pending.name, base)?;
    if target == base {
        return Ok(0);
    }
    tracing::trace!(name = %pending.name.display(), size = pending.size, "extracting entry");
    ensure_contained(&target, base, &pending.name)?;

    match pending.kind {
        PendingKind::Directory => {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
            Ok(0)
        }
        PendingKind::File(mut reader) => {
            create_parent(&target)?;
            clear_target(&target, options.overwrite)?;
            let mut out = File::create(&target).map_err(|e| Error::io(&target, e))?;
            let written = io::copy(&mut reader, &mut out).map_err(|e| Error::io(&target, e))?;
            drop(out);
            options
                .permission_strategy
                .apply_to_path(&target, pending.mode)?;
            Ok(written)
        }
        PendingKind::Symlink { target: link_target } => {
            sanitize_symlink_target(&link_target, &target, base)?;
            create_parent(&target)?;
            clear_target(&target, options.overwrite)?;
            write_symlink(&link_target, &target)?;
            Ok(0)
        }
    }
}

/// Check that the deepest existing ancestor of `target` resolves inside
/// `base`. Catches escapes through symlinks written by earlier entries.
fn ensure_contained(target: &Path, base: &Path, name: &Path) -> Result<()> {
    let mut ancestor = target.parent();
    while let Some(dir) = ancestor {
        if fs::symlink_metadata(dir).is_ok() {
            let resolved = fs::canonicalize(dir).map_err(|e| Error::io(dir, e))?;
            if resolved.starts_with(base) {
                return Ok(());
            }
            return Err(Error::ZipSlip {
                entry: name.to_path_buf(),
                resolved,
            });
        }
        ancestor = dir.parent();
    }
    Ok(())
}

fn create_parent(target: &Path) -> Result<()> {
    match target.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| Error::io(parent, e)),
        None => Ok(()),
    }
}

/// Make room for a file or symlink at `target`. Existing directories are
/// never replaced.
fn clear_target(target: &Path, overwrite: bool) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(target) else {
        return Ok(());
    };
    if !overwrite || meta.is_dir() {
        return Err(Error::AlreadyExists {
            path: target.to_path_buf(),
        });
    }
    fs::remove_file(target).map_err(|e| Error::io(target, e))
}

#[cfg(unix)]
fn write_symlink(link_target: &Path, path: &Path) -> Result<()> {
    std::os::unix::fs::symlink(link_target, path).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn write_symlink(link_target: &Path, path: &Path) -> Result<()> {
    tracing::warn!(
        path = %path.display(),
        target = %link_target.display(),
        "symlinks are not supported on this platform; skipping"
    );
    Ok(())
}
