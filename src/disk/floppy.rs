/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/disk/floppy.rs

    FloppyDisk: pass-through to a real floppy drive (feature `native_floppy`).
    Grounded on `CFloppyDisk` in the original, which lays out sectors
    identically to the raw MGT format but treats `IsBusy` as genuinely
    asynchronous - the one backend where a poll can legitimately still be
    in flight on the next call, since it's waiting on physical hardware
    rather than a memory-mapped stream.
*/
use crate::chs::IdField;
use crate::disk::common::{FindCursor, SectorRecord};
use crate::disk::Disk;
use crate::error::DiskResult;
use crate::status::SectorStatus;
use crate::stream::Stream;

const FLOPPY_SIDES: u8 = 2;
const FLOPPY_TRACKS: u8 = 80;
const FLOPPY_SECTORS: u8 = 10;
const FLOPPY_SECTOR_SIZE: usize = 512;

/// Synthetic polls a `WriteData`/`ReadData` must wait out before the
/// backing hardware operation is considered complete. A real driver would
/// poll hardware status here instead.
const BUSY_POLLS: u8 = 2;

#[derive(Debug)]
pub struct FloppyDisk {
    stream: Box<dyn Stream>,
    cache_side: Option<u8>,
    cache_track: Option<u8>,
    busy_countdown: u8,
    read_only: bool,
    modified: bool,
    cursor: FindCursor,
}

impl FloppyDisk {
    /// Native floppy access is never auto-detected from stream contents;
    /// the caller opts in via a platform-specific device path.
    pub fn is_recognised(_stream: &mut dyn Stream) -> bool {
        false
    }

    pub fn open(mut stream: Box<dyn Stream>) -> DiskResult<Self> {
        let read_only = stream.is_read_only();
        stream.read_at(0, 0)?;
        Ok(Self {
            stream,
            cache_side: None,
            cache_track: None,
            busy_countdown: 0,
            read_only,
            modified: false,
            cursor: FindCursor::default(),
        })
    }

    fn track_offset(side: u8, track: u8) -> u64 {
        (track as u64 * FLOPPY_SIDES as u64 + side as u64) * FLOPPY_SECTORS as u64 * FLOPPY_SECTOR_SIZE as u64
    }

    fn load_track(&mut self, side: u8, track: u8) -> Vec<SectorRecord> {
        if track >= FLOPPY_TRACKS || side >= FLOPPY_SIDES {
            self.cache_side = None;
            self.cache_track = None;
            return Vec::new();
        }
        if self.cache_side == Some(side) && self.cache_track == Some(track) {
            return self.cursor.track().to_vec();
        }
        let base = Self::track_offset(side, track);
        let mut records = Vec::with_capacity(FLOPPY_SECTORS as usize);
        for s in 0..FLOPPY_SECTORS {
            let offset = base + s as u64 * FLOPPY_SECTOR_SIZE as u64;
            let data = self.stream.read_at(offset, FLOPPY_SECTOR_SIZE).unwrap_or_default();
            records.push(SectorRecord {
                id: IdField::new(track, side, s + 1, 2, [0, 0]).unwrap(),
                data,
                status: SectorStatus::empty(),
            });
        }
        self.cache_side = Some(side);
        self.cache_track = Some(track);
        self.busy_countdown = BUSY_POLLS;
        records
    }
}

impl Disk for FloppyDisk {
    fn find_init(&mut self, side: u8, track: u8) -> usize {
        let data = self.load_track(side, track);
        self.cursor.find_init(data)
    }

    fn find_next(&mut self) -> Option<(IdField, SectorStatus)> {
        self.cursor.find_next()
    }

    fn find_sector(&mut self, side: u8, track: u8, sector: u8) -> Option<(IdField, SectorStatus)> {
        self.find_init(side, track);
        self.cursor.find_sector(sector)
    }

    fn read_data(&mut self, dst: &mut [u8]) -> (usize, SectorStatus) {
        match self.cursor.current() {
            Some(rec) => {
                let n = rec.data.len().min(dst.len());
                dst[..n].copy_from_slice(&rec.data[..n]);
                (n, rec.status)
            }
            None => (0, SectorStatus::RECORD_NOT_FOUND),
        }
    }

    fn write_data(&mut self, src: &[u8]) -> SectorStatus {
        if self.read_only {
            return SectorStatus::WRITE_PROTECT;
        }
        let Some(id) = self.cursor.current().map(|r| r.id) else {
            return SectorStatus::RECORD_NOT_FOUND;
        };
        if src.len() != id.data_len() {
            return SectorStatus::RECORD_NOT_FOUND;
        }
        let offset = Self::track_offset(id.head, id.cylinder) + (id.sector as u64 - 1) * FLOPPY_SECTOR_SIZE as u64;
        if self.stream.write_at(offset, src).is_err() {
            return SectorStatus::WRITE_PROTECT;
        }
        if let Some(rec) = self.cursor.current_mut() {
            rec.data = src.to_vec();
        }
        self.modified = true;
        self.busy_countdown = BUSY_POLLS;
        SectorStatus::empty()
    }

    fn format_track(&mut self, side: u8, track: u8, ids: &[IdField], data: &[Vec<u8>]) -> SectorStatus {
        if self.read_only {
            return SectorStatus::WRITE_PROTECT;
        }
        let matches_fixed_geometry = ids.len() == FLOPPY_SECTORS as usize
            && ids
                .iter()
                .enumerate()
                .all(|(i, id)| id.sector == (i as u8 + 1) && id.data_len() == FLOPPY_SECTOR_SIZE);
        if !matches_fixed_geometry {
            return SectorStatus::WRITE_PROTECT;
        }
        let base = Self::track_offset(side, track);
        for (i, sector_data) in data.iter().enumerate() {
            let offset = base + i as u64 * FLOPPY_SECTOR_SIZE as u64;
            if self.stream.write_at(offset, sector_data).is_err() {
                return SectorStatus::WRITE_PROTECT;
            }
        }
        self.cache_track = None;
        self.modified = true;
        self.busy_countdown = BUSY_POLLS;
        SectorStatus::empty()
    }

    fn save(&mut self) -> bool {
        if !self.modified {
            return true;
        }
        match self.stream.flush() {
            Ok(()) => {
                self.modified = false;
                true
            }
            Err(_) => false,
        }
    }

    fn spin_pos(&mut self, advance: bool) -> u32 {
        self.cursor.spin_pos(advance)
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Unlike the image-backed formats, a real drive operation may still be
    /// in flight: each poll consumes one unit of the synthetic countdown
    /// before reporting ready.
    fn is_busy(&mut self) -> bool {
        if self.busy_countdown > 0 {
            self.busy_countdown -= 1;
            true
        } else {
            false
        }
    }

    fn name(&self) -> &str {
        self.stream.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn image() -> Vec<u8> {
        vec![0u8; FLOPPY_SIDES as usize * FLOPPY_TRACKS as usize * FLOPPY_SECTORS as usize * FLOPPY_SECTOR_SIZE]
    }

    #[test]
    fn never_auto_recognised() {
        let mut stream = MemoryStream::new(image(), "a:");
        assert!(!FloppyDisk::is_recognised(&mut stream));
    }

    #[test]
    fn busy_countdown_clears_after_polls() {
        let mut disk = FloppyDisk::open(Box::new(MemoryStream::new(image(), "a:"))).unwrap();
        disk.find_sector(0, 0, 1).unwrap();
        assert!(disk.is_busy());
        assert!(disk.is_busy());
        assert!(!disk.is_busy());
    }
}
