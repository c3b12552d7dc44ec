/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/disk/sad.rs

    SadDisk: Aley Keprt's SAD format - a 22-byte header (magic, side/track/
    sector counts, sector size/64) followed by a raw side-track-sector image.
*/
use binrw::BinRead;

use crate::chs::IdField;
use crate::disk::common::{FindCursor, SectorRecord};
use crate::disk::Disk;
use crate::error::{DiskError, DiskResult};
use crate::status::SectorStatus;
use crate::stream::Stream;

pub const SAD_MAGIC: &[u8; 18] = b"Aley's disk backup";
pub const SAD_HEADER_SIZE: u64 = 22;

#[derive(BinRead, Debug, Clone, Copy)]
#[br(magic = b"Aley's disk backup")]
struct SadHeader {
    sides: u8,
    tracks: u8,
    sectors: u8,
    sector_size_div64: u8,
}

impl SadHeader {
    fn sector_size(&self) -> usize {
        self.sector_size_div64 as usize * 64
    }
}

#[derive(Debug)]
pub struct SadDisk {
    stream: Box<dyn Stream>,
    sides: u8,
    tracks: u8,
    sectors: u8,
    sector_size: usize,
    modified: bool,
    read_only: bool,
    cursor: FindCursor,
}

impl SadDisk {
    pub fn is_recognised(stream: &mut dyn Stream) -> bool {
        if stream.size() < SAD_HEADER_SIZE {
            return false;
        }
        matches!(stream.read_at(0, SAD_MAGIC.len()), Ok(bytes) if bytes == SAD_MAGIC.as_slice())
    }

    pub fn open(mut stream: Box<dyn Stream>) -> DiskResult<Self> {
        if stream.size() < SAD_HEADER_SIZE {
            return Err(DiskError::UnknownFormat);
        }
        let header_bytes = stream.read_at(0, SAD_HEADER_SIZE as usize)?;
        let mut cursor = std::io::Cursor::new(&header_bytes);
        let header = SadHeader::read(&mut cursor).map_err(|_| DiskError::UnknownFormat)?;

        let read_only = stream.is_read_only();
        Ok(Self {
            stream,
            sides: header.sides,
            tracks: header.tracks,
            sectors: header.sectors,
            sector_size: header.sector_size(),
            modified: false,
            read_only,
            cursor: FindCursor::default(),
        })
    }

    fn track_offset(&self, side: u8, track: u8) -> u64 {
        SAD_HEADER_SIZE
            + (track as u64 * self.sides as u64 + side as u64) * self.sectors as u64 * self.sector_size as u64
    }

    fn load_track(&mut self, side: u8, track: u8) -> Vec<SectorRecord> {
        if track >= self.tracks || side >= self.sides {
            return Vec::new();
        }
        let base = self.track_offset(side, track);
        let size_code = IdField::size_to_code(self.sector_size);
        let mut records = Vec::with_capacity(self.sectors as usize);
        for s in 0..self.sectors {
            let offset = base + s as u64 * self.sector_size as u64;
            let data = self.stream.read_at(offset, self.sector_size).unwrap_or_default();
            records.push(SectorRecord {
                id: IdField::new(track, side, s + 1, size_code, [0, 0]).unwrap(),
                data,
                status: SectorStatus::empty(),
            });
        }
        records
    }
}

impl Disk for SadDisk {
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
        if src.len() != self.sector_size {
            return SectorStatus::RECORD_NOT_FOUND;
        }
        let base = self.track_offset(id.head, id.cylinder);
        let offset = base + (id.sector as u64 - 1) * self.sector_size as u64;
        if self.stream.write_at(offset, src).is_err() {
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
        let matches_fixed_geometry = ids.len() == self.sectors as usize
            && ids
                .iter()
                .enumerate()
                .all(|(i, id)| id.sector == (i as u8 + 1) && id.data_len() == self.sector_size);
        if !matches_fixed_geometry {
            return SectorStatus::WRITE_PROTECT;
        }
        let base = self.track_offset(side, track);
        for (i, sector_data) in data.iter().enumerate() {
            let offset = base + i as u64 * self.sector_size as u64;
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

    fn sad_image(sides: u8, tracks: u8, sectors: u8, sector_size: usize) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(SAD_MAGIC);
        data.push(sides);
        data.push(tracks);
        data.push(sectors);
        data.push((sector_size / 64) as u8);
        data.resize(
            22 + sides as usize * tracks as usize * sectors as usize * sector_size,
            0,
        );
        data
    }

    #[test]
    fn opens_valid_header() {
        let image = sad_image(2, 80, 10, 512);
        let disk = SadDisk::open(Box::new(MemoryStream::new(image, "t"))).unwrap();
        assert_eq!(disk.sides, 2);
        assert_eq!(disk.sector_size, 512);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut image = sad_image(2, 80, 10, 512);
        image[0] = b'X';
        assert!(SadDisk::open(Box::new(MemoryStream::new(image, "t"))).is_err());
    }

    #[test]
    fn round_trip_read_write() {
        let mut image = sad_image(1, 1, 4, 256);
        image[22] = 0x55;
        let mut disk = SadDisk::open(Box::new(MemoryStream::new(image, "t"))).unwrap();
        disk.find_sector(0, 0, 1).unwrap();
        let mut buf = vec![0u8; 256];
        disk.read_data(&mut buf);
        assert_eq!(buf[0], 0x55);

        let payload = vec![0xAAu8; 256];
        assert_eq!(disk.write_data(&payload), SectorStatus::empty());
        disk.find_sector(0, 0, 1).unwrap();
        let mut buf2 = vec![0u8; 256];
        disk.read_data(&mut buf2);
        assert_eq!(buf2, payload);
    }
}
