use std::path::Path;

use super::{ARCHIVALS, Archival, COMPRESSIONS, Compression};

/// Identify a compression codec from the leading bytes of a stream.
///
/// Brotli has no magic number and is only found by extension.
pub fn detect_compression(data: &[u8]) -> Option<Compression> {
    match data {
        [0x1F, 0x8B, ..] => Some(Compression::Gzip),
        [b'B', b'Z', b'h', ..] => Some(Compression::Bzip2),
        [0xFD, b'7', b'z', b'X', b'Z', 0x00, ..] => Some(Compression::Xz),
        [0x28, 0xB5, 0x2F, 0xFD, ..] => Some(Compression::Zstd),
        [0x04, 0x22, 0x4D, 0x18, ..] => Some(Compression::Lz4),
        [b'L', b'Z', b'I', b'P', ..] => Some(Compression::Lzip),
        [0xFF, 0x06, 0x00, 0x00, b's', b'N', b'a', b'P', b'p', b'Y', ..] => {
            Some(Compression::Snappy)
        }
        [cmf, flg, ..] if is_zlib_header(*cmf, *flg) => Some(Compression::Zlib),
        _ => None,
    }
}

/// Identify a container from the leading (decompressed) bytes.
pub fn detect_archival(data: &[u8]) -> Option<Archival> {
    match data {
        [b'P', b'K', 0x03, 0x04, ..] | [b'P', b'K', 0x05, 0x06, ..] => Some(Archival::Zip),
        _ if is_tar_header(data) => Some(Archival::Tar),
        _ => None,
    }
}

/// Guess `(compression, archival)` from a file name such as `x.tar.gz`,
/// `x.tgz` or `x.zip`. Either half may be missing.
pub fn detect_from_extension(path: &Path) -> (Option<Compression>, Option<Archival>) {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_ascii_lowercase()) else {
        return (None, None);
    };

    let short = match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("tgz") => Some(Compression::Gzip),
        Some("tbz2" | "tbz") => Some(Compression::Bzip2),
        Some("txz") => Some(Compression::Xz),
        Some("tzst") => Some(Compression::Zstd),
        _ => None,
    };
    if let Some(codec) = short {
        return (Some(codec), Some(Archival::Tar));
    }

    let mut parts = name.rsplit('.');
    let last = parts.next().unwrap_or_default();
    let before = parts.next();

    if let Some(archival) = lookup_archival(last) {
        return (None, Some(archival));
    }
    let compression = lookup_compression(last);
    let archival = compression.and(before).and_then(lookup_archival);
    (compression, archival)
}

fn lookup_compression(ext: &str) -> Option<Compression> {
    let alias = match ext {
        "gzip" => "gz",
        "bzip2" => "bz2",
        "zstd" => "zst",
        "brotli" => "br",
        "lzip" => "lz",
        "zlib" => "zz",
        other => other,
    };
    COMPRESSIONS
        .iter()
        .find(|(id, _)| *id == alias)
        .map(|(_, codec)| *codec)
}

fn lookup_archival(ext: &str) -> Option<Archival> {
    ARCHIVALS
        .iter()
        .find(|(id, _)| *id == ext)
        .map(|(_, format)| *format)
}

fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == 8 && cmf >> 4 <= 7 && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}

fn is_tar_header(data: &[u8]) -> bool {
    data.len() >= 512 && (data[257..263] == *b"ustar\0" || data[257..265] == *b"ustar  \0")
}
