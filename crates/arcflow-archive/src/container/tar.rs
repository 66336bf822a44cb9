use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tar::{Builder, EntryType, Header};

use super::Written;
use crate::cancel::CancelToken;
use crate::entry::{Entry, EntryKind};
use crate::error::{Error, Result};

pub(super) fn write<W: Write>(
    sink: W,
    entries: &[Entry],
    cancel: &CancelToken,
    output: &Path,
    written: &mut Written,
) -> Result<W> {
    let mut builder = Builder::new(sink);
    for entry in entries {
        cancel.check()?;
        written.total_bytes += append(&mut builder, entry, output)?;
        written.entry_count += 1;
    }
    cancel.check()?;
    builder.into_inner().map_err(|e| Error::io(output, e))
}

/// Append one entry, returning the content bytes written.
fn append<W: Write>(builder: &mut Builder<W>, entry: &Entry, output: &Path) -> Result<u64> {
    let mut header = Header::new_gnu();
    header.set_mtime(entry.modified_secs());
    let name = entry.logical_name.as_str();

    match &entry.kind {
        EntryKind::Directory => {
            header.set_entry_type(EntryType::Directory);
            header.set_mode(entry.mode.unwrap_or(0o755));
            header.set_size(0);
            builder
                .append_data(&mut header, name, io::empty())
                .map_err(|e| Error::io(output, e))?;
            Ok(0)
        }
        EntryKind::Symlink { target } => {
            header.set_entry_type(EntryType::Symlink);
            header.set_mode(entry.mode.unwrap_or(0o777));
            header.set_size(0);
            builder
                .append_link(&mut header, name, target)
                .map_err(|e| Error::io(output, e))?;
            Ok(0)
        }
        EntryKind::File => {
            let file =
                File::open(&entry.physical_path).map_err(|e| Error::io(&entry.physical_path, e))?;
            let size = file
                .metadata()
                .map_err(|e| Error::io(&entry.physical_path, e))?
                .len();
            header.set_entry_type(EntryType::Regular);
            header.set_mode(entry.mode.unwrap_or(0o644));
            header.set_size(size);
            builder
                .append_data(&mut header, name, Exact::new(file, size))
                .map_err(|e| Error::io(&entry.physical_path, e))?;
            Ok(size)
        }
    }
}

/// Yields exactly `remaining` bytes. A source that ends early is an error
/// rather than a silently zero-padded entry.
struct Exact<R> {
    inner: io::Take<R>,
    remaining: u64,
}

impl<R: Read> Exact<R> {
    fn new(inner: R, size: u64) -> Self {
        Self {
            inner: inner.take(size),
            remaining: size,
        }
    }
}

impl<R: Read> Read for Exact<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file shrank by {} bytes while archiving", self.remaining),
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_readable_tar() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();
        let meta = fs::symlink_metadata(&path).unwrap();
        let entries = vec![
            Entry::new(temp.path().to_path_buf(), "pkg".into(), EntryKind::Directory),
            Entry::from_metadata(path, "pkg/hello.txt".into(), &meta, EntryKind::File),
        ];

        let mut written = Written::default();
        let bytes = write(
            Vec::new(),
            &entries,
            &CancelToken::new(),
            Path::new("out.tar"),
            &mut written,
        )
        .unwrap();
        assert_eq!(written.entry_count, 2);
        assert_eq!(written.total_bytes, 5);

        let mut archive = tar::Archive::new(bytes.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                let name = e.path().unwrap().to_string_lossy().into_owned();
                name.trim_end_matches('/').to_string()
            })
            .collect();
        assert_eq!(names, ["pkg", "pkg/hello.txt"]);
    }

    #[test]
    fn cancelled_before_first_entry() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let entries = vec![Entry::new("/x".into(), "x".into(), EntryKind::Directory)];
        let err = write(
            Vec::new(),
            &entries,
            &cancel,
            Path::new("out.tar"),
            &mut Written::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    /// Cancels its token on the first write, as if another thread fired it
    /// while the first entry was being stored.
    #[derive(Debug)]
    struct CancelOnWrite {
        token: CancelToken,
        bytes: Vec<u8>,
    }

    impl Write for CancelOnWrite {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.token.cancel();
            self.bytes.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn cancelled_between_entries() {
        let cancel = CancelToken::new();
        let sink = CancelOnWrite {
            token: cancel.clone(),
            bytes: Vec::new(),
        };
        let entries = vec![
            Entry::new("/a".into(), "a".into(), EntryKind::Directory),
            Entry::new("/b".into(), "b".into(), EntryKind::Directory),
        ];
        let mut written = Written::default();
        let err = write(sink, &entries, &cancel, Path::new("out.tar"), &mut written).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(written.entry_count, 1);
    }

    #[test]
    fn short_source_is_an_error() {
        let mut data = Vec::new();
        let err = Exact::new(&b"abc"[..], 5)
            .read_to_end(&mut data)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("2 bytes"));

        let mut data = Vec::new();
        Exact::new(&b"abcdef"[..], 4).read_to_end(&mut data).unwrap();
        assert_eq!(data, b"abcd");
    }
}
