/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/disk/file_disk.rs

    FileDisk: wraps a raw host file as a single auto-loading SAM file (the
    "SBT" backend). The wrapped bytes are presented as a synthetic MGT-
    shaped disk: a one-entry catalog on track 0, tracks 1-3 reserved and
    empty, and the file's 9-byte SAM header followed by its data starting
    at track 4 (`NORMAL_DIRECTORY_TRACKS` in the original). There's no
    on-disk representation to write back to, so a FileDisk is always
    read-only.
*/
use crate::chs::IdField;
use crate::disk::common::{FindCursor, SectorRecord};
use crate::disk::Disk;
use crate::error::DiskResult;
use crate::status::SectorStatus;
use crate::stream::Stream;

pub const FILE_DISK_SIDES: u8 = 2;
pub const FILE_DISK_TRACKS: u8 = 80;
pub const FILE_DISK_SECTORS: u8 = 10;
pub const FILE_DISK_SECTOR_SIZE: usize = 512;
pub const FILE_DISK_DIRECTORY_TRACKS: u8 = 4;
pub const FILE_HEADER_SIZE: usize = 9;

/// Usable payload per sector once the SAM Technical Manual's 2-byte
/// reserved trailer is subtracted.
const SECTOR_PAYLOAD: usize = FILE_DISK_SECTOR_SIZE - 2;

/// `((sides * tracks) - directory_tracks) * sectors * (sector_size - 2) - header_size`,
/// matching `MAX_SAM_FILE_SIZE` in the original.
pub const MAX_SAM_FILE_SIZE: usize = (FILE_DISK_SIDES as usize * FILE_DISK_TRACKS as usize
    - FILE_DISK_DIRECTORY_TRACKS as usize)
    * FILE_DISK_SECTORS as usize
    * SECTOR_PAYLOAD
    - FILE_HEADER_SIZE;

const SAM_CODE_FILE_TYPE: u8 = 19;

fn build_header(file_len: usize) -> [u8; FILE_HEADER_SIZE] {
    let pages = (file_len / 16384) as u8;
    let last_page_bytes = (file_len % 16384) as u16;
    let mut header = [0u8; FILE_HEADER_SIZE];
    header[0] = SAM_CODE_FILE_TYPE;
    header[1..3].copy_from_slice(&last_page_bytes.to_le_bytes());
    header[3..5].copy_from_slice(&0x8000u16.to_le_bytes()); // wOffset: default SAM load address
    header[5..7].copy_from_slice(&0u16.to_le_bytes()); // wUnused
    header[7] = pages;
    header[8] = 0; // bStartPage
    header
}

#[derive(Debug)]
pub struct FileDisk {
    stream: Box<dyn Stream>,
    payload: Vec<u8>,
    cursor: FindCursor,
}

impl FileDisk {
    /// Any stream whose size fits a single SAM file is acceptable; this is
    /// the catch-all backend tried last by the format registry.
    pub fn is_recognised(stream: &mut dyn Stream) -> bool {
        stream.size() <= MAX_SAM_FILE_SIZE as u64
    }

    pub fn open(mut stream: Box<dyn Stream>) -> DiskResult<Self> {
        let size = stream.size() as usize;
        let file_bytes = stream.read_at(0, size)?;

        let header = build_header(file_bytes.len());
        let mut payload = Vec::with_capacity(FILE_HEADER_SIZE + file_bytes.len());
        payload.extend_from_slice(&header);
        payload.extend_from_slice(&file_bytes);

        Ok(Self {
            stream,
            payload,
            cursor: FindCursor::default(),
        })
    }

    /// The linear sector index (0-based) a given (side, track) maps to
    /// within the data region starting at track 4, side 0.
    fn data_sector_index(&self, side: u8, track: u8) -> Option<usize> {
        if track < FILE_DISK_DIRECTORY_TRACKS {
            return None;
        }
        let linear_track = (track - FILE_DISK_DIRECTORY_TRACKS) as usize * FILE_DISK_SIDES as usize + side as usize;
        Some(linear_track * FILE_DISK_SECTORS as usize)
    }

    fn synth_directory_track(&self) -> Vec<SectorRecord> {
        let mut first = vec![0u8; FILE_DISK_SECTOR_SIZE];
        first[0] = SAM_CODE_FILE_TYPE;
        let name = b"LOADED  ";
        first[1..1 + name.len()].copy_from_slice(name);
        let len = self.payload.len().saturating_sub(FILE_HEADER_SIZE) as u32;
        first[10..14].copy_from_slice(&len.to_le_bytes());

        (0..FILE_DISK_SECTORS)
            .map(|s| SectorRecord {
                id: IdField::new(0, 0, s + 1, 2, [0, 0]).unwrap(),
                data: if s == 0 {
                    first.clone()
                } else {
                    vec![0u8; FILE_DISK_SECTOR_SIZE]
                },
                status: SectorStatus::empty(),
            })
            .collect()
    }

    fn synth_empty_track(&self, track: u8, side: u8) -> Vec<SectorRecord> {
        (0..FILE_DISK_SECTORS)
            .map(|s| SectorRecord {
                id: IdField::new(track, side, s + 1, 2, [0, 0]).unwrap(),
                data: vec![0u8; FILE_DISK_SECTOR_SIZE],
                status: SectorStatus::empty(),
            })
            .collect()
    }

    fn synth_data_track(&self, side: u8, track: u8) -> Vec<SectorRecord> {
        let Some(mut sector_index) = self.data_sector_index(side, track) else {
            return Vec::new();
        };
        let mut records = Vec::with_capacity(FILE_DISK_SECTORS as usize);
        for s in 0..FILE_DISK_SECTORS {
            let start = sector_index * SECTOR_PAYLOAD;
            let mut sector = vec![0u8; FILE_DISK_SECTOR_SIZE];
            if start < self.payload.len() {
                let end = (start + SECTOR_PAYLOAD).min(self.payload.len());
                sector[..end - start].copy_from_slice(&self.payload[start..end]);
            }
            records.push(SectorRecord {
                id: IdField::new(track, side, s + 1, 2, [0, 0]).unwrap(),
                data: sector,
                status: SectorStatus::empty(),
            });
            sector_index += 1;
        }
        records
    }

    fn load_track(&mut self, side: u8, track: u8) -> Vec<SectorRecord> {
        if track >= FILE_DISK_TRACKS || side >= FILE_DISK_SIDES {
            return Vec::new();
        }
        if track == 0 {
            self.synth_directory_track()
        } else if track < FILE_DISK_DIRECTORY_TRACKS {
            self.synth_empty_track(track, side)
        } else {
            self.synth_data_track(side, track)
        }
    }
}

impl Disk for FileDisk {
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

    fn write_data(&mut self, _src: &[u8]) -> SectorStatus {
        SectorStatus::WRITE_PROTECT
    }

    fn format_track(&mut self, _side: u8, _track: u8, _ids: &[IdField], _data: &[Vec<u8>]) -> SectorStatus {
        SectorStatus::WRITE_PROTECT
    }

    fn save(&mut self) -> bool {
        true
    }

    fn spin_pos(&mut self, advance: bool) -> u32 {
        self.cursor.spin_pos(advance)
    }

    fn is_modified(&self) -> bool {
        false
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn set_read_only(&mut self, _read_only: bool) {
        // A synthesized single-file view has nothing to write back to; the
        // write-protect state can't be relaxed.
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

    #[test]
    fn header_encodes_length_and_type() {
        let header = build_header(5000);
        assert_eq!(header[0], SAM_CODE_FILE_TYPE);
        assert_eq!(u16::from_le_bytes([header[1], header[2]]), 5000);
        assert_eq!(header[7], 0);
    }

    #[test]
    fn directory_track_reports_payload_length() {
        let payload = vec![0xAAu8; 1024];
        let stream = MemoryStream::new(payload.clone(), "prog.bin");
        let mut disk = FileDisk::open(Box::new(stream)).unwrap();
        disk.find_sector(0, 0, 1).unwrap();
        let mut buf = vec![0u8; FILE_DISK_SECTOR_SIZE];
        disk.read_data(&mut buf);
        let len = u32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]);
        assert_eq!(len as usize, payload.len());
    }

    #[test]
    fn data_region_starts_at_track_four() {
        let payload: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
        let stream = MemoryStream::new(payload.clone(), "prog.bin");
        let mut disk = FileDisk::open(Box::new(stream)).unwrap();

        disk.find_sector(0, 4, 1).unwrap();
        let mut buf = vec![0u8; FILE_DISK_SECTOR_SIZE];
        disk.read_data(&mut buf);

        let mut expected = build_header(payload.len()).to_vec();
        expected.extend_from_slice(&payload);
        expected.resize(SECTOR_PAYLOAD, 0);
        assert_eq!(&buf[..SECTOR_PAYLOAD], expected.as_slice());
    }

    #[test]
    fn always_read_only() {
        let stream = MemoryStream::new(vec![1, 2, 3], "p.bin");
        let mut disk = FileDisk::open(Box::new(stream)).unwrap();
        disk.find_sector(0, 4, 1).unwrap();
        assert_eq!(disk.write_data(&[0u8; 512]), SectorStatus::WRITE_PROTECT);
    }
}
