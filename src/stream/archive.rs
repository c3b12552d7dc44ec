/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/stream/archive.rs

    A read-only Stream over a single member of a zip archive, or over the
    decompressed body of a gzip file. Archive members are always read-only:
    we never write back into the container.
*/
use std::io::Read;

use crate::error::{DiskError, DiskResult};
use crate::stream::Stream;

#[derive(Debug)]
pub struct ArchiveStream {
    data: Vec<u8>,
    name: String,
}

const GZIP_SIGNATURE: [u8; 3] = [0x1F, 0x8B, 0x08];

impl ArchiveStream {
    /// True if `bytes` begins with a gzip magic header.
    pub fn is_gzip(bytes: &[u8]) -> bool {
        bytes.len() >= 3 && bytes[..3] == GZIP_SIGNATURE
    }

    /// True if `bytes` begins with a zip local-file-header magic.
    pub fn is_zip(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[..4] == *b"PK\x03\x04"
    }

    /// Decompress a gzip-compressed image in its entirety.
    pub fn open_gzip(raw: &[u8], name: impl Into<String>) -> DiskResult<Self> {
        let mut decoder = flate2::read::GzDecoder::new(raw);
        let mut data = Vec::new();
        decoder
            .read_to_end(&mut data)
            .map_err(|e| DiskError::MalformedImage(format!("gzip: {e}")))?;
        Ok(Self { data, name: name.into() })
    }

    /// Open the first file entry in a zip archive whose name matches one of
    /// `extensions` (case-insensitive), or the sole entry if there is only
    /// one. Used when a disk image is distributed zipped.
    pub fn open_zip(raw: Vec<u8>, extensions: &[&str]) -> DiskResult<Self> {
        let cursor = std::io::Cursor::new(raw);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| DiskError::MalformedImage(format!("zip: {e}")))?;

        let mut chosen = None;
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| DiskError::MalformedImage(format!("zip: {e}")))?;
            let entry_name = entry.name().to_string();
            let matches = extensions.is_empty()
                || extensions.iter().any(|ext| {
                    entry_name
                        .rsplit('.')
                        .next()
                        .map(|e| e.eq_ignore_ascii_case(ext))
                        .unwrap_or(false)
                });
            if matches {
                chosen = Some((i, entry_name));
                break;
            }
        }

        let (index, name) = chosen.ok_or(DiskError::UnknownFormat)?;
        let mut entry = archive
            .by_index(index)
            .map_err(|e| DiskError::MalformedImage(format!("zip: {e}")))?;
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| DiskError::MalformedImage(format!("zip: {e}")))?;
        Ok(Self { data, name })
    }
}

impl Stream for ArchiveStream {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, len: usize) -> DiskResult<Vec<u8>> {
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .filter(|&e| e <= self.data.len())
            .ok_or(DiskError::SeekError)?;
        Ok(self.data[start..end].to_vec())
    }

    fn write_at(&mut self, _offset: u64, _data: &[u8]) -> DiskResult<()> {
        Err(DiskError::WriteProtected)
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn path(&self) -> Option<&str> {
        None
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gzip_signature() {
        assert!(ArchiveStream::is_gzip(&[0x1F, 0x8B, 0x08, 0x00]));
        assert!(!ArchiveStream::is_gzip(&[0x00, 0x00, 0x00]));
    }

    #[test]
    fn detects_zip_signature() {
        assert!(ArchiveStream::is_zip(b"PK\x03\x04rest"));
        assert!(!ArchiveStream::is_zip(b"nope"));
    }

    #[test]
    fn archive_stream_is_always_read_only() {
        let s = ArchiveStream {
            data: vec![0u8; 4],
            name: "x".into(),
        };
        assert!(s.is_read_only());
    }
}
