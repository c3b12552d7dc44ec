/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/disk/mod.rs

    Disk: the polymorphic interface a mounted disk image exposes to a
    Drive. Concrete formats are a closed set of tagged backends dispatched
    through the `DiskImage` enum rather than a trait object, so the mount
    site knows statically which backend it holds (spec.md S:9 design note).
*/
pub mod common;
pub mod edsk;
pub mod file_disk;
#[cfg(feature = "native_floppy")]
pub mod floppy;
pub mod mgt;
pub mod sad;

pub use common::SectorRecord;
pub use edsk::EdskDisk;
pub use file_disk::FileDisk;
#[cfg(feature = "native_floppy")]
pub use floppy::FloppyDisk;
pub use mgt::MgtDisk;
pub use sad::SadDisk;

use crate::chs::IdField;
use crate::status::SectorStatus;

/// Operations a mounted disk image exposes to a [`crate::fdc::Drive`]. The
/// Drive serialises all calls; concurrent access to one `Disk` from two
/// commands at once is undefined (spec.md S:4.2).
pub trait Disk {
    /// Position the virtual head over `(side, track)` and reset the
    /// per-track search iterator. Returns the sector count on that track, or
    /// 0 if the geometry doesn't cover it (a subsequent search reports
    /// `RECORD_NOT_FOUND`).
    fn find_init(&mut self, side: u8, track: u8) -> usize;

    /// Return the next sector on the current track, wrapping at rotation
    /// end. `None` only if the current track has no sectors.
    fn find_next(&mut self) -> Option<(IdField, SectorStatus)>;

    /// Seek to `(side, track)` and rotate until a sector numbered `sector`
    /// is found, failing after one full rotation.
    fn find_sector(&mut self, side: u8, track: u8, sector: u8) -> Option<(IdField, SectorStatus)>;

    /// Copy the data payload of the sector most recently located by a
    /// find_* call into `dst`. Returns the number of bytes written and the
    /// sector's stored status (including any `CRC_ERROR`).
    fn read_data(&mut self, dst: &mut [u8]) -> (usize, SectorStatus);

    /// Overwrite the current sector's payload from `src`. `src.len()` must
    /// equal the sector's declared size. Sets the modified flag; fails
    /// `WRITE_PROTECT` if the backing stream is read-only.
    fn write_data(&mut self, src: &[u8]) -> SectorStatus;

    /// Replace the named track with the supplied sector list. Backends that
    /// can't represent a variable layout return `WRITE_PROTECT` unless the
    /// requested layout already matches their fixed geometry.
    fn format_track(&mut self, side: u8, track: u8, ids: &[IdField], data: &[Vec<u8>]) -> SectorStatus;

    /// Persist modifications to the backing stream. Idempotent when
    /// unmodified; a `false` return leaves the modified flag set so the
    /// caller may retry.
    fn save(&mut self) -> bool;

    /// Monotonically-advancing virtual rotation index, modulo the current
    /// track's sector count, used to seed ID search so consecutive
    /// READ_ADDRESS calls return different sectors.
    fn spin_pos(&mut self, advance: bool) -> u32;

    fn is_modified(&self) -> bool;
    fn is_read_only(&self) -> bool;
    fn set_read_only(&mut self, read_only: bool);

    /// Poll for an artificial load-delay busy period. Returns `true` while
    /// still busy, consuming one unit of delay each call; `false` once
    /// expired.
    fn is_busy(&mut self) -> bool;

    fn name(&self) -> &str;
}

/// A mounted disk image, dispatched statically over the closed set of
/// supported backends.
#[derive(Debug)]
pub enum DiskImage {
    Mgt(MgtDisk),
    Sad(SadDisk),
    Edsk(EdskDisk),
    File(FileDisk),
    #[cfg(feature = "native_floppy")]
    Floppy(FloppyDisk),
}

macro_rules! dispatch {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            DiskImage::Mgt(d) => d.$method($($arg),*),
            DiskImage::Sad(d) => d.$method($($arg),*),
            DiskImage::Edsk(d) => d.$method($($arg),*),
            DiskImage::File(d) => d.$method($($arg),*),
            #[cfg(feature = "native_floppy")]
            DiskImage::Floppy(d) => d.$method($($arg),*),
        }
    };
}

impl Disk for DiskImage {
    fn find_init(&mut self, side: u8, track: u8) -> usize {
        dispatch!(self, find_init(side, track))
    }

    fn find_next(&mut self) -> Option<(IdField, SectorStatus)> {
        dispatch!(self, find_next())
    }

    fn find_sector(&mut self, side: u8, track: u8, sector: u8) -> Option<(IdField, SectorStatus)> {
        dispatch!(self, find_sector(side, track, sector))
    }

    fn read_data(&mut self, dst: &mut [u8]) -> (usize, SectorStatus) {
        dispatch!(self, read_data(dst))
    }

    fn write_data(&mut self, src: &[u8]) -> SectorStatus {
        dispatch!(self, write_data(src))
    }

    fn format_track(&mut self, side: u8, track: u8, ids: &[IdField], data: &[Vec<u8>]) -> SectorStatus {
        dispatch!(self, format_track(side, track, ids, data))
    }

    fn save(&mut self) -> bool {
        dispatch!(self, save())
    }

    fn spin_pos(&mut self, advance: bool) -> u32 {
        dispatch!(self, spin_pos(advance))
    }

    fn is_modified(&self) -> bool {
        dispatch!(self, is_modified())
    }

    fn is_read_only(&self) -> bool {
        dispatch!(self, is_read_only())
    }

    fn set_read_only(&mut self, read_only: bool) {
        dispatch!(self, set_read_only(read_only))
    }

    fn is_busy(&mut self) -> bool {
        dispatch!(self, is_busy())
    }

    fn name(&self) -> &str {
        dispatch!(self, name())
    }
}
