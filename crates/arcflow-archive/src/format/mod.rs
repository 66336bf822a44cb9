//! Format registry: compression codecs and archival containers keyed by
//! short identifiers.

mod codec;
mod detect;

pub use codec::{Decoder, Encoder, decoder, encoder};
pub use detect::{detect_archival, detect_compression, detect_from_extension};

use std::fmt;

use crate::error::{Error, Result};

/// Compression codec wrapping the container byte stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    Lz4,
    Brotli,
    Lzip,
    Snappy,
    Zlib,
}

/// Container format holding the entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Archival {
    Tar,
    Zip,
}

/// Identifier table for compression codecs. Immutable for the life of the
/// process.
pub const COMPRESSIONS: &[(&str, Compression)] = &[
    ("gz", Compression::Gzip),
    ("bz2", Compression::Bzip2),
    ("xz", Compression::Xz),
    ("zst", Compression::Zstd),
    ("lz4", Compression::Lz4),
    ("br", Compression::Brotli),
    ("lz", Compression::Lzip),
    ("sz", Compression::Snappy),
    ("zz", Compression::Zlib),
];

/// Identifier table for archival containers.
pub const ARCHIVALS: &[(&str, Archival)] = &[("tar", Archival::Tar), ("zip", Archival::Zip)];

impl Compression {
    pub const fn id(self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
            Self::Zstd => "zst",
            Self::Lz4 => "lz4",
            Self::Brotli => "br",
            Self::Lzip => "lz",
            Self::Snappy => "sz",
            Self::Zlib => "zz",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
            Self::Lz4 => "lz4",
            Self::Brotli => "brotli",
            Self::Lzip => "lzip",
            Self::Snappy => "snappy",
            Self::Zlib => "zlib",
        }
    }

    /// Whether the codec was compiled into this build.
    pub const fn is_available(self) -> bool {
        match self {
            Self::Gzip | Self::Zlib => true,
            Self::Bzip2 => cfg!(feature = "bzip2"),
            Self::Xz => cfg!(feature = "xz"),
            Self::Zstd => cfg!(feature = "zstd"),
            Self::Lz4 => cfg!(feature = "lz4"),
            Self::Brotli => cfg!(feature = "brotli"),
            Self::Lzip => cfg!(feature = "lzip"),
            Self::Snappy => cfg!(feature = "snappy"),
        }
    }
}

impl Archival {
    pub const fn id(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl fmt::Display for Archival {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Look up a codec. Empty and unknown identifiers both mean "no compression".
pub fn compression(id: &str) -> Option<Compression> {
    COMPRESSIONS
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, codec)| *codec)
}

/// Look up a container. A container is mandatory, so unknown is an error.
pub fn archival(id: &str) -> Result<Archival> {
    ARCHIVALS
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, format)| *format)
        .ok_or_else(|| Error::UnknownArchival { id: id.to_string() })
}

/// A validated (compression, archival) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatSelection {
    pub compression: Option<Compression>,
    pub archival: Archival,
}

impl FormatSelection {
    pub fn new(compression: Option<Compression>, archival: Archival) -> Self {
        Self {
            compression,
            archival,
        }
    }

    /// Validate identifiers. An empty compression id means none; any other
    /// unknown id is rejected.
    pub fn parse(compression_id: &str, archival_id: &str) -> Result<Self> {
        let archival = archival(archival_id)?;
        let compression = match compression_id {
            "" => None,
            id => Some(compression(id).ok_or_else(|| Error::UnknownCompression {
                id: id.to_string(),
            })?),
        };
        Ok(Self::new(compression, archival))
    }

    /// Conventional file extension, e.g. `tar.gz` or `zip`.
    pub fn extension(&self) -> String {
        match self.compression {
            Some(codec) => format!("{}.{}", self.archival.id(), codec.id()),
            None => self.archival.id().to_string(),
        }
    }
}

impl fmt::Display for FormatSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_compression_id_round_trips() {
        for (id, codec) in COMPRESSIONS {
            assert_eq!(codec.id(), *id);
            assert_eq!(compression(id), Some(*codec));
        }
        assert_eq!(COMPRESSIONS.len(), 9);
    }

    #[test]
    fn unknown_or_empty_compression_is_unset() {
        assert_eq!(compression(""), None);
        assert_eq!(compression("rar"), None);
    }

    #[test]
    fn unknown_archival_is_error() {
        assert_eq!(archival("tar").unwrap(), Archival::Tar);
        assert_eq!(archival("zip").unwrap(), Archival::Zip);
        assert!(matches!(
            archival("7z"),
            Err(Error::UnknownArchival { id }) if id == "7z"
        ));
        assert!(archival("").is_err());
    }

    #[test]
    fn selection_parse() {
        let sel = FormatSelection::parse("gz", "tar").unwrap();
        assert_eq!(sel.compression, Some(Compression::Gzip));
        assert_eq!(sel.extension(), "tar.gz");

        let sel = FormatSelection::parse("", "zip").unwrap();
        assert_eq!(sel.compression, None);
        assert_eq!(sel.to_string(), "zip");

        assert!(matches!(
            FormatSelection::parse("nope", "tar"),
            Err(Error::UnknownCompression { .. })
        ));
    }

    #[test]
    fn gzip_always_available() {
        assert!(Compression::Gzip.is_available());
        assert!(Compression::Zlib.is_available());
    }
}
