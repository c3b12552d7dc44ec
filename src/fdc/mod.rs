/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/fdc/mod.rs

    Drive: a VL-1772-compatible floppy disk controller attached to at most
    one mounted `DiskImage`. Exposes the `in(port)`/`out(port, value)`
    register handshake a host CPU core drives directly, plus `frame_end`
    for motor decay - grounded on the original's `CDrive::In`/`Out`/
    `FrameEnd` dispatch, preserved quirk-for-quirk (READ_ADDRESS not
    raising BUSY, CRC reported only on the last transferred byte).
*/
pub mod status;

pub use status::DriveStatus;

use log::{debug, trace, warn};

use crate::config::DriveConfig;
use crate::disk::{Disk, DiskImage};
use crate::status::SectorStatus;
use crate::track_codec::{self, EncodeSector};
use crate::MAX_SECTOR_SIZE;

/// Type-I command byte bit that requests skipping the spin-up delay.
const FLAG_SPINUP: u8 = 0x08;

/// Errors that abort a type-II/III transfer outright, as opposed to
/// `CRC_ERROR`/`WRITE_PROTECT`/`DELETED_DATA`, which still deliver the
/// sector and are only reported once the last byte is transferred.
const ABORT_MASK: u8 = SectorStatus::RECORD_NOT_FOUND.bits();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Restore,
    Seek,
    StepNoUpdate,
    StepUpdate,
    StepInNoUpdate,
    StepInUpdate,
    StepOutNoUpdate,
    StepOutUpdate,
    ReadSectorSingle,
    ReadSectorMulti,
    WriteSectorSingle,
    WriteSectorMulti,
    ReadAddress,
    ReadTrack,
    WriteTrack,
    ForceInterrupt,
}

impl Command {
    fn decode(byte: u8) -> Self {
        match byte & 0xF0 {
            0x00 => Command::Restore,
            0x10 => Command::Seek,
            0x20 => Command::StepNoUpdate,
            0x30 => Command::StepUpdate,
            0x40 => Command::StepInNoUpdate,
            0x50 => Command::StepInUpdate,
            0x60 => Command::StepOutNoUpdate,
            0x70 => Command::StepOutUpdate,
            0x80 => Command::ReadSectorSingle,
            0x90 => Command::ReadSectorMulti,
            0xA0 => Command::WriteSectorSingle,
            0xB0 => Command::WriteSectorMulti,
            0xC0 => Command::ReadAddress,
            0xD0 => Command::ForceInterrupt,
            0xE0 => Command::ReadTrack,
            0xF0 => Command::WriteTrack,
            _ => unreachable!("top nibble covers all 16 values"),
        }
    }

    /// Type-I commands (seek group) share one status-bit interpretation;
    /// type-II/III (read/write/format group) share another.
    fn is_type1(self) -> bool {
        matches!(
            self,
            Command::Restore
                | Command::Seek
                | Command::StepNoUpdate
                | Command::StepUpdate
                | Command::StepInNoUpdate
                | Command::StepInUpdate
                | Command::StepOutNoUpdate
                | Command::StepOutUpdate
        )
    }
}

/// `(buffer, cursor, residual)` for an in-flight DRQ transfer. Indices, not
/// a raw pointer pair, so an over-read is a checkable bug rather than
/// reading past the backing allocation (spec.md S:9 design note).
struct TransferBuffer {
    data: Vec<u8>,
    cursor: usize,
    residual: usize,
}

impl TransferBuffer {
    fn new() -> Self {
        Self {
            data: vec![0u8; MAX_SECTOR_SIZE.max(1)],
            cursor: 0,
            residual: 0,
        }
    }

    fn start_read(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.cursor = 0;
        self.residual = bytes.len();
    }

    fn start_write(&mut self, len: usize) {
        self.data.clear();
        self.data.resize(len, 0);
        self.cursor = 0;
        self.residual = len;
    }

    fn abort(&mut self) {
        self.residual = 0;
    }

    fn pop(&mut self) -> u8 {
        let byte = self.data.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        self.residual = self.residual.saturating_sub(1);
        byte
    }

    fn push(&mut self, byte: u8) {
        if self.cursor < self.data.len() {
            self.data[self.cursor] = byte;
        }
        self.cursor += 1;
        self.residual = self.residual.saturating_sub(1);
    }

    fn written(&self) -> &[u8] {
        &self.data[..self.cursor.min(self.data.len())]
    }
}

/// One floppy drive: its mounted image, motor/head state, and in-flight
/// DRQ transfer. Owns at most one [`DiskImage`] at a time.
pub struct Drive {
    config: DriveConfig,
    disk: Option<DiskImage>,
    status: DriveStatus,
    command: Command,
    track_reg: u8,
    sector_reg: u8,
    data_reg: u8,
    head_pos: u8,
    direction_out: bool,
    buffer: TransferBuffer,
    data_status: SectorStatus,
    pending_side: u8,
    pending_track: u8,
    motor_ticks: u32,
    index_pulse_reads: u32,
    load_delay_remaining: u8,
}

impl Drive {
    pub fn new(config: DriveConfig) -> Self {
        Self {
            config,
            disk: None,
            status: DriveStatus::empty(),
            command: Command::Restore,
            track_reg: 0,
            sector_reg: 1,
            data_reg: 0,
            head_pos: 0,
            direction_out: false,
            buffer: TransferBuffer::new(),
            data_status: SectorStatus::empty(),
            pending_side: 0,
            pending_track: 0,
            motor_ticks: 0,
            index_pulse_reads: 0,
            load_delay_remaining: 0,
        }
    }

    /// Mount `disk`, replacing any previously mounted image. Does not save
    /// the outgoing image; callers that care should `save()` it first.
    pub fn mount(&mut self, disk: DiskImage) {
        debug!("mounting disk image {:?}", disk.name());
        self.disk = Some(disk);
        self.head_pos = 0;
        self.track_reg = 0;
    }

    /// Remove and return the mounted image, if any.
    pub fn unmount(&mut self) -> Option<DiskImage> {
        self.disk.take()
    }

    pub fn disk(&self) -> Option<&DiskImage> {
        self.disk.as_ref()
    }

    fn motor_on(&self) -> bool {
        self.status.contains(DriveStatus::MOTOR_ON)
    }

    fn set_motor_on(&mut self) {
        self.status.insert(DriveStatus::MOTOR_ON);
        self.motor_ticks = self.config.motor_active_frames;
    }

    /// Advance motor state by one emulated frame. Called once per frame by
    /// the external frame driver; never from `in`/`out`. Index pulse timing
    /// is derived from status reads instead (see `read_status`), not from
    /// frame ticks - a busy-polling loop within one frame must still see it
    /// move.
    pub fn frame_end(&mut self) {
        if self.motor_ticks > 0 {
            self.motor_ticks -= 1;
            if self.motor_ticks == 0 {
                self.status.remove(DriveStatus::MOTOR_ON);
                trace!("motor spun down");
            }
        }
    }

    /// `in(port)`: bottom two bits select the register, bit 2 the side.
    pub fn in_port(&mut self, port: u16) -> u8 {
        match port & 0x03 {
            0 => self.read_status(),
            1 => self.track_reg,
            2 => self.sector_reg,
            3 => self.read_data(),
            _ => unreachable!(),
        }
    }

    /// `out(port, value)`.
    pub fn out_port(&mut self, port: u16, value: u8) {
        let side = ((port >> 2) & 1) as u8;
        match port & 0x03 {
            0 => self.write_command(value, side),
            1 => self.track_reg = value,
            2 => self.sector_reg = value,
            3 => self.write_data(value),
            _ => unreachable!(),
        }
    }

    fn read_status(&mut self) -> u8 {
        if self.command.is_type1() {
            if let Some(disk) = &self.disk {
                if disk.is_read_only() {
                    self.status.insert(DriveStatus::WRITE_PROTECT);
                }
            }
        }

        if self.command.is_type1() && self.motor_on() && self.disk.is_some() {
            // Toggled off a read counter, not a frame tick, so a busy-poll
            // loop within a single frame still observes a transition.
            self.index_pulse_reads = self.index_pulse_reads.wrapping_add(1);
            let half = self.config.index_half_period_reads.max(1);
            if self.index_pulse_reads % half == 0 {
                self.status.toggle(DriveStatus::INDEX_PULSE);
            }
        }

        let mut ret = self.status;

        if let Some(disk) = self.disk.as_mut() {
            if disk.is_busy() {
                ret.insert(DriveStatus::BUSY);
            }
        }
        if self.load_delay_remaining > 0 {
            ret.insert(DriveStatus::BUSY);
            self.load_delay_remaining -= 1;
        }

        ret.bits()
    }

    fn read_data(&mut self) -> u8 {
        if self.buffer.residual == 0 {
            return self.data_reg;
        }
        let byte = self.buffer.pop();
        self.data_reg = byte;
        if self.buffer.residual == 0 {
            self.finish_read_transfer();
        }
        byte
    }

    fn write_data(&mut self, value: u8) {
        self.data_reg = value;
        if self.buffer.residual == 0 {
            return;
        }
        self.buffer.push(value);
        if self.buffer.residual == 0 {
            self.finish_write_transfer();
        }
    }

    fn write_command(&mut self, value: u8, side: u8) {
        let command = Command::decode(value);
        self.buffer.abort();
        self.status.remove(
            DriveStatus::BUSY
                | DriveStatus::DRQ
                | DriveStatus::LOST_DATA
                | DriveStatus::CRC_ERROR
                | DriveStatus::RECORD_NOT_FOUND
                | DriveStatus::DELETED_DATA
                | DriveStatus::WRITE_PROTECT,
        );
        self.set_motor_on();
        self.command = command;
        self.pending_side = side;

        if command.is_type1() && value & FLAG_SPINUP == 0 {
            self.status.insert(DriveStatus::SPIN_UP);
        }

        match command {
            Command::Restore => {
                self.head_pos = 0;
                self.track_reg = 0;
                self.status.insert(DriveStatus::TRACK00);
            }
            Command::Seek => {
                self.direction_out = self.data_reg < self.track_reg;
                self.track_reg = self.data_reg;
                self.head_pos = self.data_reg;
                self.set_track00();
            }
            Command::StepNoUpdate | Command::StepUpdate => {
                self.step(self.direction_out, command == Command::StepUpdate);
            }
            Command::StepInNoUpdate | Command::StepInUpdate => {
                self.direction_out = false;
                self.step(false, command == Command::StepInUpdate);
            }
            Command::StepOutNoUpdate | Command::StepOutUpdate => {
                self.direction_out = true;
                self.step(true, command == Command::StepOutUpdate);
            }
            Command::ReadSectorSingle | Command::ReadSectorMulti => self.start_read_sector(side),
            Command::WriteSectorSingle | Command::WriteSectorMulti => self.start_write_sector(side),
            Command::ReadAddress => self.start_read_address(side),
            Command::ReadTrack => self.start_read_track(side),
            Command::WriteTrack => self.start_write_track(side),
            Command::ForceInterrupt => {
                self.status &= DriveStatus::MOTOR_ON;
                self.command = Command::Restore;
            }
        }
    }

    fn set_track00(&mut self) {
        if self.head_pos == 0 {
            self.status.insert(DriveStatus::TRACK00);
        } else {
            self.status.remove(DriveStatus::TRACK00);
        }
    }

    fn step(&mut self, out: bool, update_track_reg: bool) {
        if out {
            self.head_pos = self.head_pos.saturating_sub(1);
        } else {
            self.head_pos = self.head_pos.saturating_add(1);
        }
        if update_track_reg {
            self.track_reg = self.head_pos;
        } else if self.head_pos == 0 {
            self.track_reg = 0;
        }
        self.set_track00();
    }

    fn start_read_sector(&mut self, side: u8) {
        self.status.insert(DriveStatus::BUSY);
        let Some(disk) = self.disk.as_mut() else {
            self.status.insert(DriveStatus::RECORD_NOT_FOUND);
            self.status.remove(DriveStatus::BUSY);
            return;
        };
        match disk.find_sector(side, self.track_reg, self.sector_reg) {
            None => {
                self.status.insert(DriveStatus::RECORD_NOT_FOUND);
                self.status.remove(DriveStatus::BUSY);
            }
            Some(_) => self.read_current_sector(),
        }
    }

    /// Read the sector the most recent `find_sector`/`find_next` landed on,
    /// transitioning to TRANSFER on success or IDLE-with-error otherwise.
    fn read_current_sector(&mut self) {
        let disk = self.disk.as_mut().expect("checked by caller");
        let mut buf = vec![0u8; MAX_SECTOR_SIZE];
        let (n, status) = disk.read_data(&mut buf);
        buf.truncate(n);
        self.data_status = status;
        if status.bits() & ABORT_MASK != 0 {
            self.status.insert(DriveStatus::from_sector_status(status));
            self.status.remove(DriveStatus::BUSY);
        } else {
            self.buffer.start_read(&buf);
            self.status.insert(DriveStatus::DRQ);
            self.status.remove(DriveStatus::BUSY);
        }
    }

    fn start_write_sector(&mut self, side: u8) {
        self.status.insert(DriveStatus::BUSY);
        let Some(disk) = self.disk.as_mut() else {
            self.status.insert(DriveStatus::RECORD_NOT_FOUND);
            self.status.remove(DriveStatus::BUSY);
            return;
        };
        match disk.find_sector(side, self.track_reg, self.sector_reg) {
            None => {
                self.status.insert(DriveStatus::RECORD_NOT_FOUND);
                self.status.remove(DriveStatus::BUSY);
            }
            Some(_) if disk.is_read_only() => {
                self.status.insert(DriveStatus::WRITE_PROTECT);
                self.status.remove(DriveStatus::BUSY);
            }
            Some((id, _)) => {
                self.buffer.start_write(id.data_len());
                self.status.insert(DriveStatus::DRQ);
                self.status.remove(DriveStatus::BUSY);
            }
        }
    }

    fn start_read_address(&mut self, side: u8) {
        // READ_ADDRESS never raises BUSY - preserved intentionally, see
        // module docs and DESIGN.md.
        let Some(disk) = self.disk.as_mut() else {
            self.status.insert(DriveStatus::RECORD_NOT_FOUND);
            return;
        };
        let count = disk.find_init(side, self.track_reg);
        if count == 0 {
            self.status.insert(DriveStatus::RECORD_NOT_FOUND);
            return;
        }
        // Land on whatever sector is currently "under the head" rather
        // than always sector 0 of the track, so repeated calls progress.
        let steps = disk.spin_pos(true) as usize % count;
        let mut found = None;
        for _ in 0..=steps {
            found = disk.find_next();
        }
        match found {
            Some((id, status)) if status.bits() & ABORT_MASK == 0 => {
                let bytes = [id.cylinder, id.head, id.sector, id.size_code(), id.crc[0], id.crc[1]];
                self.buffer.start_read(&bytes);
                self.status.insert(DriveStatus::from_sector_status(status));
                self.status.insert(DriveStatus::DRQ);
            }
            Some((_, status)) => {
                self.status.insert(DriveStatus::from_sector_status(status));
            }
            None => {
                self.status.insert(DriveStatus::RECORD_NOT_FOUND);
            }
        }
    }

    fn start_read_track(&mut self, side: u8) {
        self.status.insert(DriveStatus::BUSY);
        self.pending_side = side;
        self.pending_track = self.track_reg;
        let Some(disk) = self.disk.as_mut() else {
            self.status.insert(DriveStatus::RECORD_NOT_FOUND);
            self.status.remove(DriveStatus::BUSY);
            return;
        };
        let count = disk.find_init(side, self.track_reg);
        if count == 0 {
            self.status.insert(DriveStatus::RECORD_NOT_FOUND);
            self.status.remove(DriveStatus::BUSY);
            return;
        }
        let mut collected = Vec::with_capacity(count);
        while collected.len() < count {
            match disk.find_next() {
                Some((id, _)) => {
                    let mut data = vec![0u8; id.data_len()];
                    disk.read_data(&mut data);
                    collected.push((id, data));
                }
                None => break,
            }
        }
        let encoded = track_codec::encode_track(
            &collected
                .iter()
                .map(|(id, data)| EncodeSector { id: *id, data })
                .collect::<Vec<_>>(),
        );
        self.buffer.start_read(&encoded);
        self.status.insert(DriveStatus::DRQ);
        self.status.remove(DriveStatus::BUSY);
    }

    fn start_write_track(&mut self, side: u8) {
        self.status.insert(DriveStatus::BUSY);
        self.pending_side = side;
        self.pending_track = self.track_reg;
        match &self.disk {
            Some(disk) if disk.is_read_only() => {
                self.status.insert(DriveStatus::WRITE_PROTECT);
                self.status.remove(DriveStatus::BUSY);
            }
            Some(_) => {
                self.buffer.start_write(MAX_SECTOR_SIZE.max(1) * 32);
                self.status.insert(DriveStatus::DRQ);
                self.status.remove(DriveStatus::BUSY);
            }
            None => {
                self.status.insert(DriveStatus::RECORD_NOT_FOUND);
                self.status.remove(DriveStatus::BUSY);
            }
        }
    }

    fn finish_read_transfer(&mut self) {
        self.status.remove(DriveStatus::BUSY | DriveStatus::DRQ);
        self.load_delay_remaining = self.config.load_delay;
        match self.command {
            Command::ReadAddress | Command::ReadTrack => {}
            Command::ReadSectorSingle => {
                self.status.insert(DriveStatus::from_sector_status(self.data_status));
            }
            Command::ReadSectorMulti => {
                self.status.insert(DriveStatus::from_sector_status(self.data_status));
                if self.data_status.is_empty() {
                    self.sector_reg = self.sector_reg.wrapping_add(1);
                    if let Some((_, find_status)) = self.disk.as_mut().and_then(|d| d.find_next()) {
                        if find_status.bits() & ABORT_MASK == 0 {
                            self.read_current_sector();
                            self.status.remove(DriveStatus::BUSY);
                        } else {
                            self.status.insert(DriveStatus::from_sector_status(find_status));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn finish_write_transfer(&mut self) {
        self.status.remove(DriveStatus::BUSY | DriveStatus::DRQ);
        self.load_delay_remaining = self.config.load_delay;
        match self.command {
            Command::WriteSectorSingle | Command::WriteSectorMulti => {
                if let Some(disk) = self.disk.as_mut() {
                    let written = self.buffer.written().to_vec();
                    let status = disk.write_data(&written);
                    self.status.insert(DriveStatus::from_sector_status(status));
                    if status.is_empty() && self.command == Command::WriteSectorMulti {
                        self.sector_reg = self.sector_reg.wrapping_add(1);
                        if let Some((id, _)) = disk.find_sector(self.pending_side, self.track_reg, self.sector_reg) {
                            self.buffer.start_write(id.data_len());
                            self.status.insert(DriveStatus::DRQ);
                        }
                    }
                }
            }
            Command::WriteTrack => {
                if let Some(disk) = self.disk.as_mut() {
                    let raw = self.buffer.written().to_vec();
                    let ids = track_codec::decode_track(&raw);
                    if ids.is_empty() {
                        warn!("write-track buffer decoded to zero sectors");
                    }
                    let data: Vec<Vec<u8>> = ids.iter().map(|id| vec![0u8; id.data_len()]).collect();
                    let status = disk.format_track(self.pending_side, self.pending_track, &ids, &data);
                    self.status.insert(DriveStatus::from_sector_status(status));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::mgt::MgtDisk;
    use crate::stream::MemoryStream;

    fn mgt_image() -> Vec<u8> {
        vec![0u8; 2 * 80 * 10 * 512]
    }

    fn mounted_drive() -> Drive {
        let disk = MgtDisk::open(Box::new(MemoryStream::new(mgt_image(), "a.mgt"))).unwrap();
        let mut drive = Drive::new(DriveConfig::default());
        drive.mount(DiskImage::Mgt(disk));
        drive
    }

    #[test]
    fn restore_sets_track_zero() {
        let mut drive = mounted_drive();
        drive.out_port(0, 0x00); // RESTORE
        assert_eq!(drive.track_reg, 0);
        assert!(DriveStatus::from_bits_truncate(drive.in_port(0)).contains(DriveStatus::TRACK00));
    }

    #[test]
    fn read_sector_transfers_full_payload_then_clears_drq() {
        let mut drive = mounted_drive();
        drive.out_port(1, 0); // track
        drive.out_port(2, 1); // sector
        drive.out_port(0, 0x80); // READ_SECTOR single
        let status = DriveStatus::from_bits_truncate(drive.in_port(0));
        assert!(status.contains(DriveStatus::DRQ));

        for _ in 0..512 {
            drive.in_port(3);
        }
        let status = DriveStatus::from_bits_truncate(drive.in_port(0));
        assert!(!status.contains(DriveStatus::DRQ));
        assert!(!status.contains(DriveStatus::BUSY));
        assert!(!status.contains(DriveStatus::CRC_ERROR));
    }

    #[test]
    fn read_address_never_raises_busy() {
        let mut drive = mounted_drive();
        drive.out_port(1, 0);
        drive.out_port(0, 0xC0); // READ_ADDRESS
        let status = DriveStatus::from_bits_truncate(drive.in_port(0));
        assert!(!status.contains(DriveStatus::BUSY));
        assert!(status.contains(DriveStatus::DRQ));
    }

    #[test]
    fn read_address_progresses_across_calls() {
        let mut drive = mounted_drive();
        drive.out_port(1, 0);

        let mut sectors = Vec::new();
        for _ in 0..6 {
            drive.out_port(0, 0xC0);
            let cylinder_sector = (0..6).map(|_| drive.in_port(3)).collect::<Vec<_>>();
            sectors.push(cylinder_sector[2]); // third byte of IdField is sector number
        }
        assert!(sectors.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn write_sector_rejected_on_read_only_stream() {
        let mut disk = MgtDisk::open(Box::new(MemoryStream::new(mgt_image(), "a.mgt"))).unwrap();
        disk.set_read_only(true);
        let mut drive = Drive::new(DriveConfig::default());
        drive.mount(DiskImage::Mgt(disk));

        drive.out_port(1, 0);
        drive.out_port(2, 1);
        drive.out_port(0, 0xA0); // WRITE_SECTOR single
        let status = DriveStatus::from_bits_truncate(drive.in_port(0));
        assert!(status.contains(DriveStatus::WRITE_PROTECT));
        assert!(!status.contains(DriveStatus::DRQ));
    }

    #[test]
    fn force_interrupt_clears_busy_and_keeps_motor() {
        let mut drive = mounted_drive();
        drive.out_port(1, 0);
        drive.out_port(2, 1);
        drive.out_port(0, 0xA0); // WRITE_SECTOR, leaves DRQ set awaiting bytes
        drive.out_port(0, 0xD0); // FORCE_INTERRUPT
        let status = DriveStatus::from_bits_truncate(drive.in_port(0));
        assert!(!status.contains(DriveStatus::BUSY));
        assert!(!status.contains(DriveStatus::DRQ));
        assert!(status.contains(DriveStatus::MOTOR_ON));
    }

    #[test]
    fn motor_turns_off_after_configured_frames() {
        let mut drive = mounted_drive();
        drive.out_port(0, 0x00); // RESTORE: any command starts the motor
        assert!(drive.motor_on());
        for _ in 0..drive.config.motor_active_frames {
            drive.frame_end();
        }
        assert!(!drive.motor_on());
    }
}
