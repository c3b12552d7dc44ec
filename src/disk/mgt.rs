/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/disk/mgt.rs

    MgtDisk: the raw MGT image format. A flat byte stream with no header,
    laid out track-major, then side, then sector: for each of 80 tracks,
    head 0's sectors then head 1's, 512 bytes apiece. The "DOS" variant uses
    9 sectors per track instead of SAM's native 10.
*/
use crate::chs::IdField;
use crate::disk::common::{FindCursor, SectorRecord};
use crate::disk::Disk;
use crate::error::DiskResult;
use crate::status::SectorStatus;
use crate::stream::Stream;

pub const MGT_SIDES: u8 = 2;
pub const MGT_TRACKS: u8 = 80;
pub const MGT_SECTORS_NATIVE: u8 = 10;
pub const MGT_SECTORS_DOS: u8 = 9;
pub const MGT_SECTOR_SIZE: usize = 512;

const fn mgt_size(sectors_per_track: u8) -> u64 {
    MGT_SIDES as u64 * MGT_TRACKS as u64 * sectors_per_track as u64 * MGT_SECTOR_SIZE as u64
}

#[derive(Debug)]
pub struct MgtDisk {
    stream: Box<dyn Stream>,
    sectors_per_track: u8,
    modified: bool,
    read_only: bool,
    cursor: FindCursor,
}

impl MgtDisk {
    /// True if `stream`'s size is an exact MGT image (native 10-sector or
    /// DOS-style 9-sector variant).
    pub fn is_recognised(stream: &mut dyn Stream) -> bool {
        let size = stream.size();
        size == mgt_size(MGT_SECTORS_NATIVE) || size == mgt_size(MGT_SECTORS_DOS)
    }

    pub fn open(mut stream: Box<dyn Stream>) -> DiskResult<Self> {
        let sectors_per_track = if stream.size() == mgt_size(MGT_SECTORS_DOS) {
            MGT_SECTORS_DOS
        } else {
            MGT_SECTORS_NATIVE
        };
        let read_only = stream.is_read_only();
        stream.read_at(0, 0)?; // cheap sanity probe that the stream is alive
        Ok(Self {
            stream,
            sectors_per_track,
            modified: false,
            read_only,
            cursor: FindCursor::default(),
        })
    }

    fn track_offset(&self, side: u8, track: u8) -> u64 {
        (track as u64 * MGT_SIDES as u64 + side as u64) * self.sectors_per_track as u64 * MGT_SECTOR_SIZE as u64
    }

    fn load_track(&mut self, side: u8, track: u8) -> Vec<SectorRecord> {
        if track >= MGT_TRACKS || side >= MGT_SIDES {
            return Vec::new();
        }
        let base = self.track_offset(side, track);
        let mut records = Vec::with_capacity(self.sectors_per_track as usize);
        for s in 0..self.sectors_per_track {
            let offset = base + s as u64 * MGT_SECTOR_SIZE as u64;
            let data = self.stream.read_at(offset, MGT_SECTOR_SIZE).unwrap_or_default();
            records.push(SectorRecord {
                id: IdField::new(track, side, s + 1, 2, [0, 0]).unwrap(),
                data,
                status: SectorStatus::empty(),
            });
        }
        records
    }
}

impl Disk for MgtDisk {
    fn find_init(&mut self, side: u8, track: u8) -> usize {
        let track_data = self.load_track(side, track);
        self.cursor.find_init(track_data)
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
        let track_base = self.track_offset(id.head, id.cylinder);
        let sector_offset = track_base + (id.sector as u64 - 1) * MGT_SECTOR_SIZE as u64;
        if self.stream.write_at(sector_offset, src).is_err() {
            return SectorStatus::WRITE_PROTECT;
        }
        if let Some(rec) = self.cursor.current_mut() {
            rec.data = src.to_vec();
        }
        self.modified = true;
        SectorStatus::empty()
    }

    fn format_track(&mut self, side: u8, track: u8, ids: &[IdField], data: &[Vec<u8>]) -> SectorStatus {
        if self.read_only {
            return SectorStatus::WRITE_PROTECT;
        }
        // MGT has no variable-geometry representation: the requested layout
        // must match our fixed sector count, contiguous numbering from 1,
        // and uniform 512-byte sectors.
        let matches_fixed_geometry = ids.len() == self.sectors_per_track as usize
            && ids
                .iter()
                .enumerate()
                .all(|(i, id)| id.sector == (i as u8 + 1) && id.data_len() == MGT_SECTOR_SIZE);
        if !matches_fixed_geometry {
            return SectorStatus::WRITE_PROTECT;
        }
        let base = self.track_offset(side, track);
        for (i, sector_data) in data.iter().enumerate() {
            let offset = base + i as u64 * MGT_SECTOR_SIZE as u64;
            if self.stream.write_at(offset, sector_data).is_err() {
                return SectorStatus::WRITE_PROTECT;
            }
        }
        self.modified = true;
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

    fn is_busy(&mut self) -> bool {
        false
    }

    fn name(&self) -> &str {
        self.stream.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn native_image() -> Vec<u8> {
        vec![0u8; mgt_size(MGT_SECTORS_NATIVE) as usize]
    }

    #[test]
    fn recognises_native_and_dos_sizes() {
        let mut native = MemoryStream::new(native_image(), "t");
        assert!(MgtDisk::is_recognised(&mut native));
        let mut dos = MemoryStream::new(vec![0u8; mgt_size(MGT_SECTORS_DOS) as usize], "t");
        assert!(MgtDisk::is_recognised(&mut dos));
        let mut bad = MemoryStream::new(vec![0u8; 123], "t");
        assert!(!MgtDisk::is_recognised(&mut bad));
    }

    #[test]
    fn round_trip_read_write() {
        let mut image = native_image();
        image[0] = 0xAB;
        let stream = MemoryStream::new(image, "t");
        let mut disk = MgtDisk::open(Box::new(stream)).unwrap();

        let (id, _) = disk.find_sector(0, 0, 1).unwrap();
        assert_eq!(id.sector, 1);
        let mut buf = vec![0u8; 512];
        let (n, status) = disk.read_data(&mut buf);
        assert_eq!(n, 512);
        assert_eq!(status, SectorStatus::empty());
        assert_eq!(buf[0], 0xAB);

        let payload = vec![0x42u8; 512];
        let status = disk.write_data(&payload);
        assert_eq!(status, SectorStatus::empty());
        assert!(disk.is_modified());

        let (_, _) = disk.find_sector(0, 0, 1).unwrap();
        let mut buf2 = vec![0u8; 512];
        disk.read_data(&mut buf2);
        assert_eq!(buf2, payload);
    }

    #[test]
    fn write_rejected_on_read_only_stream() {
        let stream = crate::stream::MemoryStream::read_only(native_image(), "t");
        let mut disk = MgtDisk::open(Box::new(stream)).unwrap();
        disk.find_sector(0, 0, 1).unwrap();
        let status = disk.write_data(&vec![0u8; 512]);
        assert_eq!(status, SectorStatus::WRITE_PROTECT);
    }

    #[test]
    fn format_track_rejects_mismatched_layout() {
        let stream = MemoryStream::new(native_image(), "t");
        let mut disk = MgtDisk::open(Box::new(stream)).unwrap();
        let ids: Vec<IdField> = (1..=10u8)
            .map(|s| IdField::new(0, 0, s, if s == 5 { 1 } else { 2 }, [0, 0]).unwrap())
            .collect();
        let data: Vec<Vec<u8>> = ids.iter().map(|id| vec![0u8; id.data_len()]).collect();
        let status = disk.format_track(0, 0, &ids, &data);
        assert_eq!(status, SectorStatus::WRITE_PROTECT);
    }
}
