/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    tests/fdc_integration.rs

    End-to-end coverage across format detection, mounting, and the command
    state machine together - the seam the per-module unit tests don't cross.
*/
mod common;

use common::*;
use sam_fdc::fdc::DriveStatus;
use sam_fdc::stream::MemoryStream;
use sam_fdc::{format_registry, Drive, DriveConfig};

#[test]
fn detected_mgt_image_is_immediately_drivable() {
    init_logging();
    let disk = format_registry::open(Box::new(MemoryStream::new(blank_mgt_image(), "boot.mgt"))).unwrap();

    let mut drive = Drive::new(DriveConfig::default());
    drive.mount(disk);

    drive.out_port(1, 3); // track 3
    drive.out_port(2, 1); // sector 1
    drive.out_port(0, 0x80); // READ_SECTOR single

    let status = DriveStatus::from_bits_truncate(drive.in_port(0));
    assert!(status.contains(DriveStatus::DRQ));
    assert!(!status.contains(DriveStatus::RECORD_NOT_FOUND));

    let bytes: Vec<u8> = (0..MGT_SECTOR_SIZE).map(|_| drive.in_port(3)).collect();
    assert_eq!(bytes.len(), MGT_SECTOR_SIZE);

    let status = DriveStatus::from_bits_truncate(drive.in_port(0));
    assert!(!status.contains(DriveStatus::DRQ));
    assert!(!status.contains(DriveStatus::BUSY));
}

#[test]
fn seeking_past_last_track_reports_record_not_found() {
    init_logging();
    let disk = format_registry::open(Box::new(MemoryStream::new(blank_mgt_image(), "boot.mgt"))).unwrap();
    let mut drive = Drive::new(DriveConfig::default());
    drive.mount(disk);

    drive.out_port(1, MGT_TRACKS); // one past the last valid track
    drive.out_port(2, 1);
    drive.out_port(0, 0x80);

    let status = DriveStatus::from_bits_truncate(drive.in_port(0));
    assert!(status.contains(DriveStatus::RECORD_NOT_FOUND));
}

#[test]
fn write_then_read_back_round_trips_through_the_mounted_image() {
    init_logging();
    let disk = format_registry::open(Box::new(MemoryStream::new(blank_mgt_image(), "boot.mgt"))).unwrap();
    let mut drive = Drive::new(DriveConfig::default());
    drive.mount(disk);

    drive.out_port(1, 0);
    drive.out_port(2, 2);
    drive.out_port(0, 0xA0); // WRITE_SECTOR single
    for i in 0..MGT_SECTOR_SIZE {
        drive.out_port(3, (i % 256) as u8);
    }
    let status = DriveStatus::from_bits_truncate(drive.in_port(0));
    assert!(!status.contains(DriveStatus::WRITE_PROTECT));

    drive.out_port(1, 0);
    drive.out_port(2, 2);
    drive.out_port(0, 0x80); // READ_SECTOR single
    let readback: Vec<u8> = (0..MGT_SECTOR_SIZE).map(|_| drive.in_port(3)).collect();
    let expected: Vec<u8> = (0..MGT_SECTOR_SIZE).map(|i| (i % 256) as u8).collect();
    assert_eq!(readback, expected);
}
