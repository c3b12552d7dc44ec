/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/chs.rs

    Sector addressing types. `IdField` is the 6-byte identity a real 1772
    reads off a sector's address mark; `DiskChs` is the cylinder/head/sector
    triple used to address a backend's geometry.
*/
use std::fmt::Display;

use crate::MAX_SECTOR_SIZE;

/// Cylinder/head/sector triple identifying a physical location on a disk.
/// Sector numbers are 1-based, matching SAM/MGT convention.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct DiskChs {
    c: u8,
    h: u8,
    s: u8,
}

impl Default for DiskChs {
    fn default() -> Self {
        Self { c: 0, h: 0, s: 1 }
    }
}

impl From<(u8, u8, u8)> for DiskChs {
    fn from((c, h, s): (u8, u8, u8)) -> Self {
        Self { c, h, s }
    }
}

impl From<DiskChs> for (u8, u8, u8) {
    fn from(chs: DiskChs) -> Self {
        (chs.c, chs.h, chs.s)
    }
}

impl Display for DiskChs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[c:{} h:{} s:{}]", self.c, self.h, self.s)
    }
}

impl DiskChs {
    pub fn new(c: u8, h: u8, s: u8) -> Self {
        Self { c, h, s }
    }
    pub fn c(&self) -> u8 {
        self.c
    }
    pub fn h(&self) -> u8 {
        self.h
    }
    pub fn s(&self) -> u8 {
        self.s
    }
}

/// The 6-byte sector identity field read from a sector's address mark:
/// cylinder, head, sector number, size code, and the two CRC bytes as
/// stored (or regenerated) in the image.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct IdField {
    pub cylinder: u8,
    pub head: u8,
    pub sector: u8,
    size_code: u8,
    pub crc: [u8; 2],
}

impl IdField {
    /// Construct an `IdField`. Returns `None` if `size_code` exceeds 3 -
    /// a real 1772 only encodes a 2-bit size field.
    pub fn new(cylinder: u8, head: u8, sector: u8, size_code: u8, crc: [u8; 2]) -> Option<Self> {
        if size_code > 3 {
            return None;
        }
        Some(Self {
            cylinder,
            head,
            sector,
            size_code,
            crc,
        })
    }

    pub fn size_code(&self) -> u8 {
        self.size_code
    }

    /// Data payload length implied by this ID's size code: `128 << size_code`.
    pub fn data_len(&self) -> usize {
        std::cmp::min(MAX_SECTOR_SIZE, 128usize << self.size_code)
    }

    /// Convert a payload length to the nearest size code (`128 << n`), used
    /// when synthesising an `IdField` from a backend that stores sector
    /// length directly rather than a size code (e.g. EDSK).
    pub fn size_to_code(len: usize) -> u8 {
        let mut n = 0u8;
        let mut len = len;
        while len > 128 && n < 3 {
            len >>= 1;
            n += 1;
        }
        n
    }

    pub fn chs(&self) -> DiskChs {
        DiskChs::new(self.cylinder, self.head, self.sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_field_rejects_oversized_code() {
        assert!(IdField::new(0, 0, 1, 4, [0, 0]).is_none());
    }

    #[test]
    fn id_field_data_len_matches_size_code() {
        let id = IdField::new(0, 0, 1, 2, [0, 0]).unwrap();
        assert_eq!(id.data_len(), 512);
    }

    #[test]
    fn size_to_code_round_trips() {
        for code in 0..=3u8 {
            let len = 128usize << code;
            assert_eq!(IdField::size_to_code(len), code);
        }
    }

    #[test]
    fn chs_display_matches_fields() {
        let chs = DiskChs::new(1, 0, 3);
        assert_eq!(format!("{}", chs), "[c:1 h:0 s:3]");
    }
}
