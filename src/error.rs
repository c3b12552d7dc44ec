/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/error.rs

    Crate-wide error type for operations that cross a module boundary:
    stream I/O, format sniffing/parsing, and format_track layout rejection.
    Expected FDC outcomes (CRC error, record-not-found, write-protect,
    deleted-data) are not modeled here - they travel as `SectorStatus` flags
    per spec.
*/
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("an I/O error occurred reading or writing the disk image: {0}")]
    Io(String),
    #[error("the stream is write protected")]
    WriteProtected,
    #[error("the disk image format could not be recognised")]
    UnknownFormat,
    #[error("the disk image is valid but its geometry is incompatible with this backend")]
    IncompatibleGeometry,
    #[error("the disk image format parser encountered malformed data: {0}")]
    MalformedImage(String),
    #[error("the requested track or side is out of range")]
    SeekError,
}

impl From<std::io::Error> for DiskError {
    fn from(err: std::io::Error) -> Self {
        DiskError::Io(err.to_string())
    }
}

impl From<binrw::Error> for DiskError {
    fn from(err: binrw::Error) -> Self {
        DiskError::MalformedImage(err.to_string())
    }
}

pub type DiskResult<T> = Result<T, DiskError>;
