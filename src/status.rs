/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/status.rs

    SectorStatus: the packed flag byte a Disk backend returns alongside a
    sector's data, and from which the FDC's status register is built.
*/
use bitflags::bitflags;

bitflags! {
    /// Independent status flags a `Disk` backend attaches to a sector.
    /// Multiple flags may be set at once; `RECORD_NOT_FOUND` is the sentinel
    /// for "nothing matched this search".
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SectorStatus: u8 {
        /// Stored CRC mismatch, or a backend-synthesised bad-sector marker.
        const CRC_ERROR        = 0b0000_1000;
        /// Sector/address lookup exhausted one full rotation without a match.
        const RECORD_NOT_FOUND = 0b0001_0000;
        /// Data address mark was 0xF8 (deleted) rather than 0xFB.
        const DELETED_DATA     = 0b0010_0000;
        /// Write attempted against a read-only stream or incompatible geometry.
        const WRITE_PROTECT    = 0b0100_0000;
    }
}

impl SectorStatus {
    pub fn record_not_found() -> Self {
        SectorStatus::RECORD_NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_independently() {
        let status = SectorStatus::CRC_ERROR | SectorStatus::DELETED_DATA;
        assert!(status.contains(SectorStatus::CRC_ERROR));
        assert!(status.contains(SectorStatus::DELETED_DATA));
        assert!(!status.contains(SectorStatus::WRITE_PROTECT));
    }

    #[test]
    fn default_is_empty() {
        assert_eq!(SectorStatus::default(), SectorStatus::empty());
    }
}
