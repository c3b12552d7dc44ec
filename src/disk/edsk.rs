/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/disk/edsk.rs

    EdskDisk: the Extended CPC Disk image format. Unlike MGT/SAD, EDSK
    carries a variable number of sectors per track, variable per-sector
    data lengths, and a per-sector 765-series status pair (ST1/ST2) that we
    translate into `SectorStatus`. The whole image is parsed into memory at
    open time and re-serialised wholesale on `save`, since a format_track
    call can change a track's footprint in the underlying stream.
*/
use binrw::{BinRead, BinWrite};

use crate::chs::IdField;
use crate::disk::common::{FindCursor, SectorRecord};
use crate::disk::Disk;
use crate::error::{DiskError, DiskResult};
use crate::status::SectorStatus;
use crate::stream::Stream;

pub const EDSK_SIGNATURE: &[u8; 34] = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n";
pub const EDSK_TRACK_SIGNATURE: &[u8; 12] = b"Track-Info\r\n";
pub const EDSK_DISK_HEADER_SIZE: usize = 256;
pub const EDSK_TRACK_HEADER_SIZE: usize = 24;
pub const EDSK_MAX_SECTORS: usize = (256 - EDSK_TRACK_HEADER_SIZE) / 8;

const ST1_CRC_ERROR: u8 = 0x20;
const ST2_DATA_NOT_FOUND: u8 = 0x01;
const ST2_CRC_ERROR: u8 = 0x20;
const ST2_CONTROL_MARK: u8 = 0x40;

fn status_from_st(st1: u8, st2: u8) -> SectorStatus {
    let mut status = SectorStatus::empty();
    if st1 & ST1_CRC_ERROR != 0 || st2 & ST2_CRC_ERROR != 0 {
        status |= SectorStatus::CRC_ERROR;
    }
    if st2 & ST2_DATA_NOT_FOUND != 0 {
        status |= SectorStatus::RECORD_NOT_FOUND;
    }
    if st2 & ST2_CONTROL_MARK != 0 {
        status |= SectorStatus::DELETED_DATA;
    }
    status
}

#[derive(BinRead, BinWrite, Debug, Clone)]
#[brw(big, magic = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n")]
struct EdskDiskHeader {
    creator: [u8; 14],
    tracks: u8,
    sides: u8,
    legacy_track_size: [u8; 2],
    #[br(count = 204)]
    #[bw(pad_size_to = 204)]
    track_size_table: Vec<u8>,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy)]
#[brw(magic = b"Track-Info\r\n")]
struct EdskTrackHeader {
    _pad: u8,
    rate: u8,
    encoding: u8,
    _unused: u8,
    track: u8,
    side: u8,
    _unused2: [u8; 2],
    size_code: u8,
    sectors: u8,
    gap3: u8,
    fill: u8,
}

#[derive(BinRead, BinWrite, Debug, Clone, Copy)]
struct EdskSectorInfo {
    track: u8,
    side: u8,
    sector: u8,
    size_code: u8,
    st1: u8,
    st2: u8,
    data_len: u16,
}

#[derive(Clone, Debug, Default)]
struct TrackMeta {
    rate: u8,
    encoding: u8,
    gap3: u8,
    fill: u8,
}

#[derive(Debug)]
pub struct EdskDisk {
    stream: Box<dyn Stream>,
    sides: u8,
    tracks: u8,
    creator: [u8; 14],
    /// Indexed `[track as usize * sides + side]`.
    track_data: Vec<Vec<SectorRecord>>,
    track_meta: Vec<TrackMeta>,
    modified: bool,
    read_only: bool,
    cursor: FindCursor,
}

impl EdskDisk {
    pub fn is_recognised(stream: &mut dyn Stream) -> bool {
        if stream.size() < EDSK_DISK_HEADER_SIZE as u64 {
            return false;
        }
        matches!(stream.read_at(0, EDSK_SIGNATURE.len()), Ok(bytes) if bytes == EDSK_SIGNATURE.as_slice())
    }

    pub fn open(mut stream: Box<dyn Stream>) -> DiskResult<Self> {
        let header_bytes = stream.read_at(0, EDSK_DISK_HEADER_SIZE)?;
        let mut reader = std::io::Cursor::new(&header_bytes);
        let header = EdskDiskHeader::read(&mut reader).map_err(|_| DiskError::UnknownFormat)?;

        let mut track_data = Vec::with_capacity(header.tracks as usize * header.sides as usize);
        let mut track_meta = Vec::with_capacity(track_data.capacity());

        let mut offset = EDSK_DISK_HEADER_SIZE as u64;
        for t in 0..header.tracks {
            for h in 0..header.sides {
                let slot_index = t as usize * header.sides as usize + h as usize;
                let slot_size = header
                    .track_size_table
                    .get(slot_index)
                    .copied()
                    .unwrap_or(0) as u64
                    * 256;

                if slot_size == 0 {
                    track_data.push(Vec::new());
                    track_meta.push(TrackMeta::default());
                    continue;
                }

                let track_header_bytes = stream.read_at(offset, EDSK_TRACK_HEADER_SIZE)?;
                let mut th_reader = std::io::Cursor::new(&track_header_bytes);
                let th = EdskTrackHeader::read(&mut th_reader).map_err(|_| DiskError::MalformedImage(
                    format!("bad track header at track {t} side {h}"),
                ))?;

                let sector_count = (th.sectors as usize).min(EDSK_MAX_SECTORS);
                let info_bytes = stream.read_at(offset + EDSK_TRACK_HEADER_SIZE as u64, sector_count * 8)?;

                let mut sectors = Vec::with_capacity(sector_count);
                // Sector data begins immediately after the 256-byte track header region.
                let mut data_cursor = offset + 256;

                for i in 0..sector_count {
                    let mut info_reader = std::io::Cursor::new(&info_bytes[i * 8..i * 8 + 8]);
                    let info = EdskSectorInfo::read(&mut info_reader)
                        .map_err(|_| DiskError::MalformedImage("bad sector info".into()))?;

                    let declared_len = info.data_len as usize;
                    let data = stream.read_at(data_cursor, declared_len)?;
                    data_cursor += declared_len as u64;

                    let size_code = if info.size_code <= 3 {
                        info.size_code
                    } else {
                        IdField::size_to_code(declared_len)
                    };
                    let id = IdField::new(info.track, info.side, info.sector, size_code, [0, 0])
                        .unwrap_or_else(|| IdField::new(info.track, info.side, info.sector, 3, [0, 0]).unwrap());

                    sectors.push(SectorRecord {
                        id,
                        data,
                        status: status_from_st(info.st1, info.st2),
                    });
                }

                track_data.push(sectors);
                track_meta.push(TrackMeta {
                    rate: th.rate,
                    encoding: th.encoding,
                    gap3: th.gap3,
                    fill: th.fill,
                });

                offset += slot_size;
            }
        }

        let read_only = stream.is_read_only();
        Ok(Self {
            stream,
            sides: header.sides,
            tracks: header.tracks,
            creator: header.creator,
            track_data,
            track_meta,
            modified: false,
            read_only,
            cursor: FindCursor::default(),
        })
    }

    fn slot_index(&self, side: u8, track: u8) -> Option<usize> {
        if track >= self.tracks || side >= self.sides {
            return None;
        }
        Some(track as usize * self.sides as usize + side as usize)
    }

    fn serialise(&self) -> Vec<u8> {
        let mut track_size_table = vec![0u8; 204];
        let mut track_bytes: Vec<Vec<u8>> = Vec::with_capacity(self.track_data.len());

        for (idx, sectors) in self.track_data.iter().enumerate() {
            if sectors.is_empty() {
                track_bytes.push(Vec::new());
                continue;
            }
            let meta = &self.track_meta[idx];
            let track = (idx / self.sides as usize) as u8;
            let side = (idx % self.sides as usize) as u8;

            let mut buf = Vec::new();
            let header = EdskTrackHeader {
                _pad: 0,
                rate: meta.rate,
                encoding: meta.encoding,
                _unused: 0,
                track,
                side,
                _unused2: [0, 0],
                size_code: IdField::size_to_code(sectors[0].data.len()),
                sectors: sectors.len() as u8,
                gap3: meta.gap3,
                fill: meta.fill,
            };
            let mut w = std::io::Cursor::new(&mut buf);
            header.write(&mut w).expect("in-memory write cannot fail");

            for s in sectors {
                let info = EdskSectorInfo {
                    track: s.id.cylinder,
                    side: s.id.head,
                    sector: s.id.sector,
                    size_code: s.id.size_code(),
                    st1: if s.status.contains(SectorStatus::CRC_ERROR) { ST1_CRC_ERROR } else { 0 },
                    st2: {
                        let mut st2 = 0u8;
                        if s.status.contains(SectorStatus::CRC_ERROR) {
                            st2 |= ST2_CRC_ERROR;
                        }
                        if s.status.contains(SectorStatus::RECORD_NOT_FOUND) {
                            st2 |= ST2_DATA_NOT_FOUND;
                        }
                        if s.status.contains(SectorStatus::DELETED_DATA) {
                            st2 |= ST2_CONTROL_MARK;
                        }
                        st2
                    },
                    data_len: s.data.len() as u16,
                };
                let mut info_buf = Vec::new();
                let mut iw = std::io::Cursor::new(&mut info_buf);
                info.write(&mut iw).expect("in-memory write cannot fail");
                buf.extend_from_slice(&info_buf);
            }

            buf.resize(256, 0);
            for s in sectors {
                buf.extend_from_slice(&s.data);
            }

            // Round the track's total footprint up to a multiple of 256 bytes.
            let rounded = buf.len().div_ceil(256) * 256;
            buf.resize(rounded, 0);
            track_size_table[idx] = (rounded / 256) as u8;
            track_bytes.push(buf);
        }

        let header = EdskDiskHeader {
            creator: self.creator,
            tracks: self.tracks,
            sides: self.sides,
            legacy_track_size: [0, 0],
            track_size_table,
        };
        let mut out = Vec::new();
        let mut hw = std::io::Cursor::new(&mut out);
        header.write(&mut hw).expect("in-memory write cannot fail");
        out.resize(EDSK_DISK_HEADER_SIZE, 0);

        for tb in track_bytes {
            out.extend_from_slice(&tb);
        }
        out
    }
}

impl Disk for EdskDisk {
    fn find_init(&mut self, side: u8, track: u8) -> usize {
        let records = self
            .slot_index(side, track)
            .and_then(|i| self.track_data.get(i))
            .cloned()
            .unwrap_or_default();
        self.cursor.find_init(records)
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
        if src.len() != self.cursor.current().unwrap().data.len() {
            return SectorStatus::RECORD_NOT_FOUND;
        }
        let Some(slot) = self.slot_index(id.head, id.cylinder) else {
            return SectorStatus::RECORD_NOT_FOUND;
        };
        if let Some(rec) = self.cursor.current_mut() {
            rec.data = src.to_vec();
            rec.status = SectorStatus::empty();
        }
        if let Some((i, rec)) = self
            .cursor
            .current()
            .map(|r| r.id.sector)
            .and_then(|sector| self.track_data[slot].iter().position(|r| r.id.sector == sector))
            .map(|i| (i, self.cursor.current().unwrap().clone()))
        {
            self.track_data[slot][i] = rec;
        }
        self.modified = true;
        SectorStatus::empty()
    }

    fn format_track(&mut self, side: u8, track: u8, ids: &[IdField], data: &[Vec<u8>]) -> SectorStatus {
        if self.read_only {
            return SectorStatus::WRITE_PROTECT;
        }
        let Some(slot) = self.slot_index(side, track) else {
            return SectorStatus::WRITE_PROTECT;
        };
        if ids.len() > EDSK_MAX_SECTORS || ids.len() != data.len() {
            return SectorStatus::WRITE_PROTECT;
        }
        let sectors: Vec<SectorRecord> = ids
            .iter()
            .zip(data.iter())
            .map(|(id, d)| SectorRecord {
                id: *id,
                data: d.clone(),
                status: SectorStatus::empty(),
            })
            .collect();
        self.track_data[slot] = sectors;
        if self.track_meta[slot].rate == 0 && self.track_meta[slot].encoding == 0 {
            self.track_meta[slot] = TrackMeta {
                rate: 1,
                encoding: 2,
                gap3: 0x4E,
                fill: 0xE5,
            };
        }
        self.modified = true;
        SectorStatus::empty()
    }

    fn save(&mut self) -> bool {
        if !self.modified {
            return true;
        }
        let image = self.serialise();
        if self.stream.write_at(0, &image).is_err() {
            return false;
        }
        if self.stream.flush().is_err() {
            return false;
        }
        self.modified = false;
        true
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
