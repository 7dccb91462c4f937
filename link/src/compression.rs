//! Gzip helpers for request bodies.
//!
//! SQL text is compressed in memory; attached data sources are compressed
//! on the fly while the HTTP layer reads them, so large files are never held
//! in memory as a whole.

use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use std::io::{Read, Write};

/// Check if data is gzip compressed (magic bytes check)
#[inline]
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Compress a complete buffer with gzip.
pub fn compress_gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Wrap a reader so that everything read from it comes out gzip-encoded.
pub fn gzip_reader<R>(reader: R) -> GzEncoder<R>
where
    R: Read,
{
    GzEncoder::new(reader, Compression::default())
}

/// Decompress a complete gzip buffer.
pub fn decompress_gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoded = Vec::new();
    GzDecoder::new(data).read_to_end(&mut decoded)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x00, 0x00]));
        assert!(!is_gzip(&[0x1f]));
        assert!(!is_gzip(&[]));
    }

    #[test]
    fn test_compress_then_decompress() {
        let sql = b"SELECT number FROM system.numbers LIMIT 10";
        let compressed = compress_gzip(sql).unwrap();
        assert!(is_gzip(&compressed));
        assert_eq!(decompress_gzip(&compressed).unwrap(), sql);
    }

    #[test]
    fn test_gzip_reader_streams() {
        let data = "1\t2\n".repeat(10_000);
        let mut encoded = Vec::new();
        gzip_reader(data.as_bytes()).read_to_end(&mut encoded).unwrap();
        assert!(is_gzip(&encoded));
        assert!(encoded.len() < data.len());
        assert_eq!(decompress_gzip(&encoded).unwrap(), data.as_bytes());
    }
}
