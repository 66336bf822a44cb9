use std::io::{self, BufReader, Read, Write};

use super::Compression;
use crate::error::{Error, Result};

/// Compressing sink. `None` compression is a passthrough.
///
/// Must be closed with [`Encoder::finish`]; dropping it may lose the
/// codec trailer.
pub enum Encoder<W: Write> {
    Passthrough(W),
    Gzip(flate2::write::GzEncoder<W>),
    Zlib(flate2::write::ZlibEncoder<W>),
    #[cfg(feature = "bzip2")]
    Bzip2(bzip2::write::BzEncoder<W>),
    #[cfg(feature = "xz")]
    Xz(xz2::write::XzEncoder<W>),
    #[cfg(feature = "zstd")]
    Zstd(zstd::stream::write::Encoder<'static, W>),
    #[cfg(feature = "lz4")]
    Lz4(Box<lz4_flex::frame::FrameEncoder<W>>),
    #[cfg(feature = "brotli")]
    Brotli(Box<brotli::CompressorWriter<W>>),
    #[cfg(feature = "lzip")]
    Lzip(Box<lzma_rust2::LzipWriter<W>>),
    #[cfg(feature = "snappy")]
    Snappy(Box<snap::write::FrameEncoder<W>>),
}

/// Decompressing source. `None` compression is a passthrough.
pub enum Decoder<R: Read> {
    Passthrough(R),
    Gzip(Box<flate2::read::MultiGzDecoder<R>>),
    Zlib(Box<flate2::read::ZlibDecoder<R>>),
    #[cfg(feature = "bzip2")]
    Bzip2(Box<bzip2::read::MultiBzDecoder<R>>),
    #[cfg(feature = "xz")]
    Xz(Box<xz2::read::XzDecoder<R>>),
    #[cfg(feature = "zstd")]
    Zstd(Box<zstd::stream::read::Decoder<'static, BufReader<R>>>),
    #[cfg(feature = "lz4")]
    Lz4(Box<lz4_flex::frame::FrameDecoder<R>>),
    #[cfg(feature = "brotli")]
    Brotli(Box<brotli::Decompressor<R>>),
    #[cfg(feature = "lzip")]
    Lzip(Box<lzma_rust2::LzipReader<R>>),
    #[cfg(feature = "snappy")]
    Snappy(Box<snap::read::FrameDecoder<R>>),
}

/// Wrap `sink` in a compressing writer using the codec's default level.
pub fn encoder<W: Write>(compression: Option<Compression>, sink: W) -> Result<Encoder<W>> {
    Encoder::with_level(compression, sink, None)
}

/// Wrap `source` in a decompressing reader.
pub fn decoder<R: Read>(compression: Option<Compression>, source: R) -> Result<Decoder<R>> {
    let Some(codec) = compression else {
        return Ok(Decoder::Passthrough(source));
    };
    let decoder = match codec {
        Compression::Gzip => Decoder::Gzip(Box::new(flate2::read::MultiGzDecoder::new(source))),
        Compression::Zlib => Decoder::Zlib(Box::new(flate2::read::ZlibDecoder::new(source))),
        #[cfg(feature = "bzip2")]
        Compression::Bzip2 => Decoder::Bzip2(Box::new(bzip2::read::MultiBzDecoder::new(source))),
        #[cfg(feature = "xz")]
        Compression::Xz => Decoder::Xz(Box::new(xz2::read::XzDecoder::new_multi_decoder(source))),
        #[cfg(feature = "zstd")]
        Compression::Zstd => Decoder::Zstd(Box::new(
            zstd::stream::read::Decoder::new(source).map_err(|e| Error::io("zstd stream", e))?,
        )),
        #[cfg(feature = "lz4")]
        Compression::Lz4 => Decoder::Lz4(Box::new(lz4_flex::frame::FrameDecoder::new(source))),
        #[cfg(feature = "brotli")]
        Compression::Brotli => Decoder::Brotli(Box::new(brotli::Decompressor::new(source, 4096))),
        #[cfg(feature = "lzip")]
        Compression::Lzip => Decoder::Lzip(Box::new(lzma_rust2::LzipReader::new(source))),
        #[cfg(feature = "snappy")]
        Compression::Snappy => Decoder::Snappy(Box::new(snap::read::FrameDecoder::new(source))),
        #[allow(unreachable_patterns)]
        other => return Err(Error::CodecUnavailable { id: other.id() }),
    };
    Ok(decoder)
}

impl<W: Write> Encoder<W> {
    /// Like [`encoder`], with an optional codec-specific level. Codecs
    /// without a tunable level ignore it.
    pub fn with_level(
        compression: Option<Compression>,
        sink: W,
        level: Option<u32>,
    ) -> Result<Self> {
        let Some(codec) = compression else {
            return Ok(Self::Passthrough(sink));
        };
        let encoder = match codec {
            Compression::Gzip => Self::Gzip(flate2::write::GzEncoder::new(
                sink,
                flate_level(level),
            )),
            Compression::Zlib => Self::Zlib(flate2::write::ZlibEncoder::new(
                sink,
                flate_level(level),
            )),
            #[cfg(feature = "bzip2")]
            Compression::Bzip2 => Self::Bzip2(bzip2::write::BzEncoder::new(
                sink,
                bzip2::Compression::new(level.unwrap_or(6).clamp(1, 9)),
            )),
            #[cfg(feature = "xz")]
            Compression::Xz => Self::Xz(xz2::write::XzEncoder::new(
                sink,
                level.unwrap_or(6).min(9),
            )),
            #[cfg(feature = "zstd")]
            Compression::Zstd => {
                let level = level.map_or(0, |l| l.min(22) as i32);
                Self::Zstd(
                    zstd::stream::write::Encoder::new(sink, level)
                        .map_err(|e| Error::io("zstd stream", e))?,
                )
            }
            #[cfg(feature = "lz4")]
            Compression::Lz4 => Self::Lz4(Box::new(lz4_flex::frame::FrameEncoder::new(sink))),
            #[cfg(feature = "brotli")]
            Compression::Brotli => Self::Brotli(Box::new(brotli::CompressorWriter::new(
                sink,
                4096,
                level.unwrap_or(6).min(11),
                22,
            ))),
            #[cfg(feature = "lzip")]
            Compression::Lzip => {
                let options = lzma_rust2::LzipOptions::with_preset(level.unwrap_or(6).min(9));
                Self::Lzip(Box::new(lzma_rust2::LzipWriter::new(sink, options)))
            }
            #[cfg(feature = "snappy")]
            Compression::Snappy => Self::Snappy(Box::new(snap::write::FrameEncoder::new(sink))),
            #[allow(unreachable_patterns)]
            other => return Err(Error::CodecUnavailable { id: other.id() }),
        };
        Ok(encoder)
    }

    /// Flush the codec trailer and hand back the inner sink.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Passthrough(w) => Ok(w),
            Self::Gzip(e) => e.finish(),
            Self::Zlib(e) => e.finish(),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(e) => e.finish(),
            #[cfg(feature = "xz")]
            Self::Xz(e) => e.finish(),
            #[cfg(feature = "zstd")]
            Self::Zstd(e) => e.finish(),
            #[cfg(feature = "lz4")]
            Self::Lz4(e) => (*e).finish().map_err(io::Error::other),
            #[cfg(feature = "brotli")]
            Self::Brotli(mut e) => {
                e.flush()?;
                Ok((*e).into_inner())
            }
            #[cfg(feature = "lzip")]
            Self::Lzip(e) => (*e).finish(),
            #[cfg(feature = "snappy")]
            Self::Snappy(e) => (*e)
                .into_inner()
                .map_err(|e| io::Error::new(e.error().kind(), e.to_string())),
        }
    }
}

fn flate_level(level: Option<u32>) -> flate2::Compression {
    level.map_or_else(flate2::Compression::default, |l| {
        flate2::Compression::new(l.min(9))
    })
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(w) => w.write(buf),
            Self::Gzip(e) => e.write(buf),
            Self::Zlib(e) => e.write(buf),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(e) => e.write(buf),
            #[cfg(feature = "xz")]
            Self::Xz(e) => e.write(buf),
            #[cfg(feature = "zstd")]
            Self::Zstd(e) => e.write(buf),
            #[cfg(feature = "lz4")]
            Self::Lz4(e) => e.write(buf),
            #[cfg(feature = "brotli")]
            Self::Brotli(e) => e.write(buf),
            #[cfg(feature = "lzip")]
            Self::Lzip(e) => e.write(buf),
            #[cfg(feature = "snappy")]
            Self::Snappy(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Passthrough(w) => w.flush(),
            Self::Gzip(e) => e.flush(),
            Self::Zlib(e) => e.flush(),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(e) => e.flush(),
            #[cfg(feature = "xz")]
            Self::Xz(e) => e.flush(),
            #[cfg(feature = "zstd")]
            Self::Zstd(e) => e.flush(),
            #[cfg(feature = "lz4")]
            Self::Lz4(e) => e.flush(),
            #[cfg(feature = "brotli")]
            Self::Brotli(e) => e.flush(),
            #[cfg(feature = "lzip")]
            Self::Lzip(e) => e.flush(),
            #[cfg(feature = "snappy")]
            Self::Snappy(e) => e.flush(),
        }
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(r) => r.read(buf),
            Self::Gzip(d) => d.read(buf),
            Self::Zlib(d) => d.read(buf),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(d) => d.read(buf),
            #[cfg(feature = "xz")]
            Self::Xz(d) => d.read(buf),
            #[cfg(feature = "zstd")]
            Self::Zstd(d) => d.read(buf),
            #[cfg(feature = "lz4")]
            Self::Lz4(d) => d.read(buf),
            #[cfg(feature = "brotli")]
            Self::Brotli(d) => d.read(buf),
            #[cfg(feature = "lzip")]
            Self::Lzip(d) => d.read(buf),
            #[cfg(feature = "snappy")]
            Self::Snappy(d) => d.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::COMPRESSIONS;

    fn round_trip(compression: Option<Compression>, data: &[u8]) -> Vec<u8> {
        let mut enc = encoder(compression, Vec::new()).unwrap();
        enc.write_all(data).unwrap();
        let compressed = enc.finish().unwrap();

        let mut out = Vec::new();
        decoder(compression, compressed.as_slice())
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn passthrough_is_identity() {
        let mut enc = encoder(None, Vec::new()).unwrap();
        enc.write_all(b"plain").unwrap();
        assert_eq!(enc.finish().unwrap(), b"plain");
    }

    #[test]
    fn every_available_codec_decodes_its_own_output() {
        let data = b"arcflow ".repeat(512);
        for (_, codec) in COMPRESSIONS.iter().filter(|(_, c)| c.is_available()) {
            assert_eq!(round_trip(Some(*codec), &data), data, "codec {codec}");
        }
    }

    #[test]
    fn gzip_output_is_smaller_for_repetitive_input() {
        let data = vec![b'a'; 64 * 1024];
        let mut enc = encoder(Some(Compression::Gzip), Vec::new()).unwrap();
        enc.write_all(&data).unwrap();
        assert!(enc.finish().unwrap().len() < data.len() / 10);
    }

    #[test]
    fn explicit_level_is_accepted() {
        let mut enc =
            Encoder::with_level(Some(Compression::Gzip), Vec::new(), Some(9)).unwrap();
        enc.write_all(b"level nine").unwrap();
        assert!(!enc.finish().unwrap().is_empty());
    }
}
