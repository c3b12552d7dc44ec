/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    tests/common/mod.rs

    Shared fixture builders for the integration tests. Unlike the original
    workspace's image-fixture tests (which compare against checked-in sample
    disk images), these synthesize a minimal valid MGT image in memory - this
    crate has no redistributable SAM disk images to check in.
*/
pub const MGT_SIDES: u8 = 2;
pub const MGT_TRACKS: u8 = 80;
pub const MGT_SECTORS: u8 = 10;
pub const MGT_SECTOR_SIZE: usize = 512;

/// A blank (all-zero) MGT image of standard 800K geometry.
pub fn blank_mgt_image() -> Vec<u8> {
    vec![0u8; MGT_SIDES as usize * MGT_TRACKS as usize * MGT_SECTORS as usize * MGT_SECTOR_SIZE]
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
