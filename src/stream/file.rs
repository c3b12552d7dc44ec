/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/stream/file.rs

    A Stream backed by a real file on disk.
*/
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{DiskError, DiskResult};
use crate::stream::Stream;

#[derive(Debug)]
pub struct FileStream {
    file: File,
    path: PathBuf,
    read_only: bool,
    size: u64,
}

impl FileStream {
    /// Open a file as a Stream. `read_only` forces read-only status even if
    /// the file itself is writable - used by the boot hook to mount a
    /// user-supplied fallback image without risk of modifying it.
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = if read_only {
            OpenOptions::new().read(true).open(&path)?
        } else {
            match OpenOptions::new().read(true).write(true).open(&path) {
                Ok(f) => f,
                Err(_) => {
                    // Fall back to read-only if the file can't be opened for
                    // writing (permissions, read-only filesystem, etc).
                    return Ok(Self {
                        size: OpenOptions::new().read(true).open(&path)?.metadata()?.len(),
                        file: OpenOptions::new().read(true).open(&path)?,
                        path,
                        read_only: true,
                    });
                }
            }
        };
        let size = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file,
            path,
            read_only,
            size,
        })
    }
}

impl Stream for FileStream {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, offset: u64, len: usize) -> DiskResult<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> DiskResult<()> {
        if self.read_only {
            return Err(DiskError::WriteProtected);
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.size = self.size.max(offset + data.len() as u64);
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn path(&self) -> Option<&str> {
        self.path.to_str()
    }

    fn name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown")
    }

    fn flush(&mut self) -> DiskResult<()> {
        self.file.flush()?;
        Ok(())
    }
}
