//! Container writers. Tar streams straight into the codec; zip needs a
//! seekable sink and is staged in a temporary file when compressed.

use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::Path;

use crate::cancel::CancelToken;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::format::{Archival, Encoder, FormatSelection};
use crate::options::ArchiveOptions;

mod tar;
mod zip;

/// Running totals for one archive write.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Written {
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// Write `entries` into `file` as `selection`. `output` labels errors.
pub(crate) fn write_archive(
    cancel: &CancelToken,
    entries: &[Entry],
    file: File,
    selection: FormatSelection,
    options: &ArchiveOptions,
    output: &Path,
) -> Result<Written> {
    let mut written = Written::default();
    let sink = BufWriter::new(file);

    match (selection.archival, selection.compression) {
        (Archival::Tar, compression) => {
            let encoder = Encoder::with_level(compression, sink, options.compression_level)?;
            let encoder = tar::write(encoder, entries, cancel, output, &mut written)?;
            finish(encoder, output)?;
        }
        (Archival::Zip, None) => {
            let sink = zip::write(sink, entries, cancel, options, output, &mut written)?;
            flush(sink, output)?;
        }
        (Archival::Zip, Some(compression)) => {
            let staging = tempfile::tempfile().map_err(|e| Error::io(output, e))?;
            let mut staging = zip::write(staging, entries, cancel, options, output, &mut written)?;
            staging.rewind().map_err(|e| Error::io(output, e))?;

            tracing::debug!(codec = %compression, "compressing staged zip");
            let mut encoder =
                Encoder::with_level(Some(compression), sink, options.compression_level)?;
            io::copy(&mut staging, &mut encoder).map_err(|e| Error::io(output, e))?;
            finish(encoder, output)?;
        }
    }

    Ok(written)
}

fn finish(encoder: Encoder<BufWriter<File>>, output: &Path) -> Result<()> {
    let sink = encoder.finish().map_err(|e| Error::io(output, e))?;
    flush(sink, output)
}

fn flush(sink: BufWriter<File>, output: &Path) -> Result<()> {
    let file = sink
        .into_inner()
        .map_err(|e| Error::io(output, e.into_error()))?;
    file.sync_all().map_err(|e| Error::io(output, e))
}
