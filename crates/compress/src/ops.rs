//! Compression Operations

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzCompression, read::BzDecoder, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use std::io::{Read, Write};
use tracing::instrument;
#[cfg(feature = "zstd")]
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

// Snapshots are uploaded on every committed write, so favour speed over the
// last few percent of size.
const BZIP2_LEVEL: BzCompression = BzCompression::fast();
const GZIP_LEVEL: GzCompression = GzCompression::new(6);
#[cfg(feature = "zstd")]
const ZSTD_LEVEL: i32 = 3;

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlblob_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(&[0u8; 4096]).unwrap();
    /// assert!(compressed.len() < 4096);
    /// ```
    #[instrument(skip(input), fields(format = %self, input_size = input.len(), output_size))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(&mut output, BZIP2_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, GZIP_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            #[cfg(feature = "zstd")]
            Compression::Zstd => {
                let mut encoder = ZstdEncoder::new(&mut output, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?;
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }

    /// Decompress a byte slice in memory.
    #[instrument(skip(input), fields(format = %self, input_size = input.len(), output_size))]
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                BzDecoder::new(input).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
            },
            Compression::Gzip => {
                GzDecoder::new(input).read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
            },
            #[cfg(feature = "zstd")]
            Compression::Zstd => {
                let mut decoder = ZstdDecoder::new(input).or_raise(|| ErrorKind::Encoder)?;
                decoder.read_to_end(&mut output).or_raise(|| ErrorKind::InvalidData)?;
            },
        }
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }
}

/// Wrap a snapshot image for upload.
pub fn seal(format: Compression, image: &[u8]) -> Result<Vec<u8>> {
    format.compress(image)
}

/// Unwrap a downloaded snapshot, detecting the format from its magic bytes.
///
/// # Examples
///
/// ```
/// use sqlblob_compress::{Compression, seal, unseal};
///
/// let image = b"SQLite format 3\0 and then some pages";
/// let sealed = seal(Compression::Bzip2, image).unwrap();
/// assert_eq!(unseal(&sealed).unwrap(), image);
/// // Raw images pass straight through.
/// assert_eq!(unseal(image).unwrap(), image);
/// ```
pub fn unseal(bytes: &[u8]) -> Result<Vec<u8>> {
    Compression::from_magic_bytes(bytes).decompress(bytes)
}

#[cfg(test)]
mod tests {
    use crate::{Compression, SQLITE_HEADER, seal, unseal};
    use rstest::rstest;

    fn image() -> Vec<u8> {
        let mut image = SQLITE_HEADER.to_vec();
        image.extend(std::iter::repeat_n(0u8, 4096 - SQLITE_HEADER.len()));
        image
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn test_sealed_snapshot_is_detected(#[case] format: Compression) {
        let sealed = seal(format, &image()).unwrap();
        assert_eq!(Compression::from_magic_bytes(&sealed), format);
        assert_eq!(unseal(&sealed).unwrap(), image());
    }

    #[rstest]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn test_invalid_compressed_data(#[case] format: Compression) {
        assert!(format.decompress(b"This is not compressed data").is_err());
    }

    #[test]
    fn test_gzip_level() {
        assert_eq!(super::GZIP_LEVEL.level(), 6);
        assert!(Compression::Gzip.compress(&image()).unwrap().len() < image().len());
    }

    #[test]
    fn test_corrupt_envelope_is_rejected() {
        // Gzip magic followed by an invalid compression method.
        let err = unseal(&[0x1F, 0x8B, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert_eq!(*err, crate::error::ErrorKind::InvalidData);
    }
}
