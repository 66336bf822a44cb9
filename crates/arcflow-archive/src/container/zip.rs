use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::Path;
use std::time::SystemTime;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::Written;
use crate::cancel::CancelToken;
use crate::entry::{Entry, EntryKind};
use crate::error::{Error, Result};
use crate::options::{ArchiveOptions, ZipMethod};

const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

pub(super) fn write<W: Write + Seek>(
    sink: W,
    entries: &[Entry],
    cancel: &CancelToken,
    options: &ArchiveOptions,
    output: &Path,
    written: &mut Written,
) -> Result<W> {
    let method = match options.zip_method {
        ZipMethod::Stored => CompressionMethod::Stored,
        ZipMethod::Deflated => CompressionMethod::Deflated,
    };
    let mut writer = ZipWriter::new(sink);

    for entry in entries {
        cancel.check()?;
        let file_options = SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(dos_time(entry.modified));
        let name = entry.logical_name.as_str();

        match &entry.kind {
            EntryKind::Directory => {
                writer
                    .add_directory(name, file_options.unix_permissions(entry.mode.unwrap_or(0o755)))
                    .map_err(|e| Error::zip(output, e))?;
            }
            EntryKind::Symlink { target } => {
                writer
                    .add_symlink(name, target.to_string_lossy(), file_options)
                    .map_err(|e| Error::zip(output, e))?;
            }
            EntryKind::File => {
                let mut file = File::open(&entry.physical_path)
                    .map_err(|e| Error::io(&entry.physical_path, e))?;
                let size = file
                    .metadata()
                    .map_err(|e| Error::io(&entry.physical_path, e))?
                    .len();
                let file_options = file_options
                    .unix_permissions(entry.mode.unwrap_or(0o644))
                    .large_file(size >= ZIP64_THRESHOLD);
                writer
                    .start_file(name, file_options)
                    .map_err(|e| Error::zip(output, e))?;
                written.total_bytes +=
                    io::copy(&mut file, &mut writer).map_err(|e| Error::io(&entry.physical_path, e))?;
            }
        }
        written.entry_count += 1;
    }

    cancel.check()?;
    writer.finish().map_err(|e| Error::zip(output, e))
}

/// MS-DOS timestamp (UTC) for a modification time. Unknown times and
/// times outside 1980..2107 fall back to the format's epoch.
fn dos_time(modified: Option<SystemTime>) -> DateTime {
    modified
        .map(|time| chrono::DateTime::<chrono::Utc>::from(time).naive_utc())
        .and_then(|naive| DateTime::try_from(naive).ok())
        .unwrap_or_default()
}
