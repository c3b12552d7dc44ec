/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/stream/memory.rs

    A Stream backed by an in-memory buffer, used for disk images built
    programmatically and for the built-in DOS boot image.
*/
use crate::error::{DiskError, DiskResult};
use crate::stream::Stream;

#[derive(Debug)]
pub struct MemoryStream {
    data: Vec<u8>,
    name: String,
    read_only: bool,
}

impl MemoryStream {
    pub fn new(data: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            data,
            name: name.into(),
            read_only: false,
        }
    }

    /// Wrap a static byte slice (e.g. an `include_bytes!`'d built-in image)
    /// as a read-only stream.
    pub fn read_only(data: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: name.into(),
            read_only: true,
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Stream for MemoryStream {
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

    fn write_at(&mut self, offset: u64, data: &[u8]) -> DiskResult<()> {
        if self.read_only {
            return Err(DiskError::WriteProtected);
        }
        let start = offset as usize;
        let end = start + data.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
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
    fn write_then_read_round_trips() {
        let mut s = MemoryStream::new(vec![0u8; 16], "test");
        s.write_at(4, &[1, 2, 3]).unwrap();
        assert_eq!(s.read_at(4, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn read_only_rejects_writes() {
        let mut s = MemoryStream::read_only(vec![0u8; 4], "ro");
        assert!(matches!(s.write_at(0, &[1]), Err(DiskError::WriteProtected)));
    }

    #[test]
    fn read_past_end_errors() {
        let mut s = MemoryStream::new(vec![0u8; 4], "short");
        assert!(s.read_at(0, 8).is_err());
    }
}
