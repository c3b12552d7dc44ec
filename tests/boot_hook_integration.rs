/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    tests/boot_hook_integration.rs

    BootHook driving the same format_registry path a real emulator core
    would use after a "no DOS" trap, then exercising the mounted fallback
    through the `Disk` trait exactly as a `Drive` would.
*/
mod common;

use common::*;
use sam_fdc::{BootHook, Disk};

const NO_DOS_ERROR_CODE: u8 = 0x35;

#[test]
fn fallback_boot_disk_is_readable_after_a_trap() {
    init_logging();
    let mut hook = BootHook::new(true, blank_mgt_image());

    let retry_pc = hook.on_rst_trap(NO_DOS_ERROR_CODE);
    assert!(retry_pc.is_some());

    let disk = hook.boot_disk_mut().expect("fallback should have mounted");
    assert!(disk.find_sector(0, 0, 1).is_some());
}

#[test]
fn trap_with_dos_boot_disabled_leaves_nothing_mounted() {
    init_logging();
    let mut hook = BootHook::new(false, blank_mgt_image());
    assert_eq!(hook.on_rst_trap(NO_DOS_ERROR_CODE), None);
    assert!(hook.boot_disk().is_none());
}

#[test]
fn second_trap_tears_down_the_first_boot_disk() {
    init_logging();
    let mut hook = BootHook::new(true, blank_mgt_image());
    hook.on_rst_trap(NO_DOS_ERROR_CODE);
    assert!(hook.boot_disk().is_some());

    // Any other trapped error code tears the boot disk down without
    // mounting a replacement.
    hook.on_rst_trap(0x00);
    assert!(hook.boot_disk().is_none());
}
