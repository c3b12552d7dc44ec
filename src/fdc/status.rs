/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/fdc/status.rs

    DriveStatus: the 1772 status register. Its bit layout is shared
    between type-I and type-II/III commands - the same bit means
    something different depending on which command mode is active, a
    real quirk of the chip we reproduce rather than paper over. The
    byte positions deliberately line up with `SectorStatus` (CRC_ERROR,
    RECORD_NOT_FOUND, DELETED_DATA, WRITE_PROTECT occupy the same bits
    in both), so a backend's status ORs straight into the register.
*/
use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DriveStatus: u8 {
        const BUSY             = 0b0000_0001;
        /// Type II/III: data request pending. Type I: index pulse.
        const DRQ              = 0b0000_0010;
        const INDEX_PULSE      = 0b0000_0010;
        /// Type II/III: data lost. Type I: at track zero.
        const LOST_DATA        = 0b0000_0100;
        const TRACK00          = 0b0000_0100;
        const CRC_ERROR        = 0b0000_1000;
        /// Type II/III: sector not found. Type I: seek error.
        const RECORD_NOT_FOUND = 0b0001_0000;
        const SEEK_ERROR       = 0b0001_0000;
        /// Type II/III: deleted data mark. Type I: spin-up complete.
        const DELETED_DATA     = 0b0010_0000;
        const SPIN_UP          = 0b0010_0000;
        const WRITE_PROTECT    = 0b0100_0000;
        const MOTOR_ON         = 0b1000_0000;
    }
}

impl DriveStatus {
    /// Lift a backend's `SectorStatus` into the register - their
    /// CRC_ERROR/RECORD_NOT_FOUND/DELETED_DATA/WRITE_PROTECT bits share
    /// byte positions by construction.
    pub fn from_sector_status(status: crate::status::SectorStatus) -> Self {
        Self::from_bits_truncate(status.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SectorStatus;

    #[test]
    fn sector_status_bits_carry_over_unchanged() {
        let sector = SectorStatus::CRC_ERROR | SectorStatus::WRITE_PROTECT;
        let drive = DriveStatus::from_sector_status(sector);
        assert!(drive.contains(DriveStatus::CRC_ERROR));
        assert!(drive.contains(DriveStatus::WRITE_PROTECT));
    }
}
