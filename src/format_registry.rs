/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/format_registry.rs

    Disk image format detection: try each backend's `is_recognised` probe
    against the stream in a fixed order, open the first match. Mirrors the
    original source's file-parser dispatch (try formats from most to least
    specific, fall through on mismatch) rather than keying off a file
    extension, since a SAM disk image rarely carries a reliable one.
*/
use log::info;

use crate::disk::{DiskImage, EdskDisk, FileDisk, MgtDisk, SadDisk};
use crate::error::{DiskError, DiskResult};
use crate::stream::Stream;

/// Open `stream` as whichever backend recognises it first. Order matters:
/// EDSK and SAD both carry an unambiguous magic, MGT is a bare size check,
/// and FileDisk is the catch-all that accepts anything small enough to be a
/// single SAM file - so it must be tried last.
pub fn open(mut stream: Box<dyn Stream>) -> DiskResult<DiskImage> {
    if EdskDisk::is_recognised(stream.as_mut()) {
        info!("format_registry: recognised {} as EDSK", stream.name());
        return EdskDisk::open(stream).map(DiskImage::Edsk);
    }
    if SadDisk::is_recognised(stream.as_mut()) {
        info!("format_registry: recognised {} as SAD", stream.name());
        return SadDisk::open(stream).map(DiskImage::Sad);
    }
    if MgtDisk::is_recognised(stream.as_mut()) {
        info!("format_registry: recognised {} as MGT", stream.name());
        return MgtDisk::open(stream).map(DiskImage::Mgt);
    }
    if FileDisk::is_recognised(stream.as_mut()) {
        info!("format_registry: falling back to FileDisk for {}", stream.name());
        return FileDisk::open(stream).map(DiskImage::File);
    }
    Err(DiskError::UnknownFormat)
}

/// Open `path` as a native floppy device rather than an image file. Callers
/// are expected to have already identified `path` as a device path (e.g. via
/// a platform-specific prefix); this function does not attempt to sniff it.
#[cfg(feature = "native_floppy")]
pub fn open_native_floppy(stream: Box<dyn Stream>) -> DiskResult<DiskImage> {
    crate::disk::FloppyDisk::open(stream).map(DiskImage::Floppy)
}
