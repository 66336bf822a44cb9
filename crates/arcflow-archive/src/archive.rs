//! Archive creation: collect, then stream entries through
//! `Encoder(compression) ∘ container(archival)` into one output file.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::collect;
use crate::container;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::format::{Archival, Compression, FormatSelection};
use crate::options::ArchiveOptions;
use crate::report::ArchiveReport;
use crate::resolve;

/// Archive every object under `source_dir` into `output`.
///
/// `"."` stores entries at the archive root; any other directory nests them
/// under its final name. An existing `output` is replaced.
pub fn archive(
    cancel: &CancelToken,
    source_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    compression: Option<Compression>,
    archival: Archival,
) -> Result<ArchiveReport> {
    archive_with(
        cancel,
        source_dir,
        output,
        compression,
        archival,
        &ArchiveOptions::default(),
    )
}

pub fn archive_with(
    cancel: &CancelToken,
    source_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    compression: Option<Compression>,
    archival: Archival,
    options: &ArchiveOptions,
) -> Result<ArchiveReport> {
    let source_dir = source_dir.as_ref();
    let output = resolve::absolute(output.as_ref())?;
    collect::ensure_exists(source_dir)?;
    let selection = FormatSelection::new(compression, archival);

    wrap_failure(&output, || {
        remove_existing(&output)?;
        let entries = collect::collect_dir(cancel, source_dir)?;
        write_entries(cancel, &entries, &output, selection, options)
    })
}

/// Archive a prepared entry list into `output`, in list order.
pub fn archive_files(
    cancel: &CancelToken,
    entries: &[Entry],
    output: impl AsRef<Path>,
    compression: Option<Compression>,
    archival: Archival,
) -> Result<ArchiveReport> {
    archive_files_with(
        cancel,
        entries,
        output,
        compression,
        archival,
        &ArchiveOptions::default(),
    )
}

pub fn archive_files_with(
    cancel: &CancelToken,
    entries: &[Entry],
    output: impl AsRef<Path>,
    compression: Option<Compression>,
    archival: Archival,
    options: &ArchiveOptions,
) -> Result<ArchiveReport> {
    let output = resolve::absolute(output.as_ref())?;
    let selection = FormatSelection::new(compression, archival);

    wrap_failure(&output, || {
        remove_existing(&output)?;
        write_entries(cancel, entries, &output, selection, options)
    })
}

/// Resolve `files` against `trim_dir` and collect them as entries, ready
/// for [`archive_files`].
pub fn make_files_map<P: AsRef<Path>>(
    cancel: &CancelToken,
    files: &[P],
    trim_dir: impl AsRef<Path>,
) -> Result<Vec<Entry>> {
    let mappings = resolve::resolve_files(files, trim_dir.as_ref())?;
    collect::collect_files(cancel, &mappings)
}

fn wrap_failure<T>(output: &Path, run: impl FnOnce() -> Result<T>) -> Result<T> {
    run().map_err(|source| Error::ArchiveFailed {
        output: output.to_path_buf(),
        source: Box::new(source),
    })
}

fn write_entries(
    cancel: &CancelToken,
    entries: &[Entry],
    output: &Path,
    selection: FormatSelection,
    options: &ArchiveOptions,
) -> Result<ArchiveReport> {
    let entries = without_output(entries, output)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    tracing::debug!(
        output = %output.display(),
        format = %selection,
        entries = entries.len(),
        "writing archive"
    );
    let file = File::create(output).map_err(|e| Error::io(output, e))?;
    let mut guard = OutputGuard::new(output, options.keep_partial);
    cancel.check()?;

    let written = container::write_archive(cancel, &entries, file, selection, options, output)?;
    guard.disarm();

    tracing::debug!(
        output = %output.display(),
        entries = written.entry_count,
        bytes = written.total_bytes,
        "archive complete"
    );
    Ok(ArchiveReport {
        output: output.to_path_buf(),
        selection,
        entry_count: written.entry_count,
        total_bytes: written.total_bytes,
    })
}

/// Drop entries that would read the archive being written. Names must be
/// non-empty.
fn without_output(entries: &[Entry], output: &Path) -> Result<Vec<Entry>> {
    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.logical_name.is_empty() {
            return Err(Error::EmptyName {
                path: entry.physical_path.clone(),
            });
        }
        if resolve::absolute(&entry.physical_path)? == output {
            tracing::debug!(name = %entry.logical_name, "skipping the output archive itself");
            continue;
        }
        kept.push(entry.clone());
    }
    Ok(kept)
}

/// Remove whatever sits at `path`. Absence is not an error.
fn remove_existing(path: &Path) -> Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed previous output");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Deletes a partially written output unless disarmed.
struct OutputGuard {
    path: PathBuf,
    armed: bool,
}

impl OutputGuard {
    fn new(path: &Path, keep_partial: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            armed: !keep_partial,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed partial archive"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove partial archive")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn remove_existing_handles_files_dirs_and_absence() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("old.tar");
        fs::write(&file, "stale").unwrap();
        remove_existing(&file).unwrap();
        assert!(!file.exists());

        let dir = temp.path().join("old.zip");
        fs::create_dir_all(dir.join("nested")).unwrap();
        remove_existing(&dir).unwrap();
        assert!(!dir.exists());

        remove_existing(&temp.path().join("never")).unwrap();
    }

    #[test]
    fn guard_removes_unless_disarmed() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("partial.tar");

        fs::write(&path, "x").unwrap();
        drop(OutputGuard::new(&path, false));
        assert!(!path.exists());

        fs::write(&path, "x").unwrap();
        drop(OutputGuard::new(&path, true));
        assert!(path.exists());

        let mut guard = OutputGuard::new(&path, false);
        guard.disarm();
        drop(guard);
        assert!(path.exists());
    }

    #[test]
    fn output_is_skipped_from_entries() {
        let temp = tempdir().unwrap();
        let output = temp.path().join("out.tar");
        let entries = vec![
            Entry::new(output.clone(), "out.tar".into(), crate::EntryKind::File),
            Entry::new(temp.path().join("a.txt"), "a.txt".into(), crate::EntryKind::File),
        ];
        let kept = without_output(&entries, &output).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].logical_name, "a.txt");
    }

    #[test]
    fn empty_logical_name_is_rejected() {
        let entries = vec![Entry::new("/a".into(), String::new(), crate::EntryKind::File)];
        let err = without_output(&entries, Path::new("/out.tar")).unwrap_err();
        assert!(matches!(err, Error::EmptyName { .. }));
    }

    #[test]
    fn failure_is_wrapped_with_output() {
        let err = wrap_failure::<()>(Path::new("/x/out.zip"), || Err(Error::Cancelled)).unwrap_err();
        assert!(matches!(
            &err,
            Error::ArchiveFailed { output, source } if output == Path::new("/x/out.zip")
                && matches!(**source, Error::Cancelled)
        ));
    }
}
