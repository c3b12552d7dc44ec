/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/boot_hook.rs

    BootHook: the "no DOS" ROM trap handler. Grounded on `IO::Rst8Hook` in
    the original - a CPU core that traps a known RST address hands us the
    error code it read off the following byte; on the specific "no DOS in
    drive 1" code, with DOS-boot enabled, we mount a fallback boot disk and
    ask the core to retry from BOOTEX. Any other trap (including a repeat of
    this one) tears down whatever boot disk is currently mounted - a real
    drive stays mounted only for the duration of one retry attempt.
*/
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::disk::DiskImage;
use crate::format_registry;
use crate::stream::{FileStream, MemoryStream};

/// The ROM error code that signals "no DOS found" on the trapped RST.
pub const NO_DOS_ERROR_CODE: u8 = 0x35;
/// Retry address the CPU core should jump to after a successful mount.
pub const BOOTEX_RETRY_PC: u16 = 0xD8E5;

/// Handles the ROM's "no DOS" trap by mounting a fallback boot disk.
pub struct BootHook {
    dos_boot_enabled: bool,
    user_disk_path: Option<PathBuf>,
    builtin_dos_image: Vec<u8>,
    boot_disk: Option<DiskImage>,
}

impl BootHook {
    /// `builtin_dos_image` stands in for the original's embedded SAMDOS2
    /// image; this crate doesn't redistribute ROM content, so an embedder
    /// supplies the bytes (e.g. via `include_bytes!` in their own build).
    /// An empty image disables the built-in fallback.
    pub fn new(dos_boot_enabled: bool, builtin_dos_image: Vec<u8>) -> Self {
        Self {
            dos_boot_enabled,
            user_disk_path: None,
            builtin_dos_image,
            boot_disk: None,
        }
    }

    pub fn set_dos_boot_enabled(&mut self, enabled: bool) {
        self.dos_boot_enabled = enabled;
    }

    pub fn set_user_disk_path(&mut self, path: Option<impl AsRef<Path>>) {
        self.user_disk_path = path.map(|p| p.as_ref().to_path_buf());
    }

    pub fn boot_disk(&self) -> Option<&DiskImage> {
        self.boot_disk.as_ref()
    }

    pub fn boot_disk_mut(&mut self) -> Option<&mut DiskImage> {
        self.boot_disk.as_mut()
    }

    /// Handle a RST trap. `error_code` is the byte the CPU core read
    /// immediately following the RST instruction. Returns `Some(new_pc)`
    /// if handled - the caller should redirect execution there and resume;
    /// `None` to let the RST proceed normally.
    pub fn on_rst_trap(&mut self, error_code: u8) -> Option<u16> {
        // Every trap tears down whatever boot attempt is pending, whether
        // or not this trap turns out to start a new one.
        if self.boot_disk.take().is_some() {
            info!("boot hook: releasing previous boot disk");
        }

        if error_code != NO_DOS_ERROR_CODE || !self.dos_boot_enabled {
            return None;
        }

        if let Some(disk) = self.try_mount_user_disk() {
            self.boot_disk = Some(disk);
            return Some(BOOTEX_RETRY_PC);
        }
        if let Some(disk) = self.try_mount_builtin_dos() {
            self.boot_disk = Some(disk);
            return Some(BOOTEX_RETRY_PC);
        }

        warn!("boot hook: no DOS trap fired but no fallback image was available");
        None
    }

    fn try_mount_user_disk(&self) -> Option<DiskImage> {
        let path = self.user_disk_path.as_ref()?;
        let stream = FileStream::open(path, true).ok()?;
        format_registry::open(Box::new(stream)).ok()
    }

    fn try_mount_builtin_dos(&self) -> Option<DiskImage> {
        if self.builtin_dos_image.is_empty() {
            return None;
        }
        let stream = MemoryStream::read_only(self.builtin_dos_image.clone(), "mem:SAMDOS.sbt");
        format_registry::open(Box::new(stream)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dos_image() -> Vec<u8> {
        vec![0xAAu8; 4096]
    }

    #[test]
    fn no_dos_trap_mounts_builtin_when_enabled() {
        let mut hook = BootHook::new(true, dos_image());
        let pc = hook.on_rst_trap(NO_DOS_ERROR_CODE);
        assert_eq!(pc, Some(BOOTEX_RETRY_PC));
        assert!(hook.boot_disk().is_some());
    }

    #[test]
    fn disabled_dos_boot_ignores_trap() {
        let mut hook = BootHook::new(false, dos_image());
        assert_eq!(hook.on_rst_trap(NO_DOS_ERROR_CODE), None);
        assert!(hook.boot_disk().is_none());
    }

    #[test]
    fn unrelated_error_code_is_not_handled() {
        let mut hook = BootHook::new(true, dos_image());
        assert_eq!(hook.on_rst_trap(0x01), None);
    }

    #[test]
    fn subsequent_trap_releases_boot_disk() {
        let mut hook = BootHook::new(true, dos_image());
        hook.on_rst_trap(NO_DOS_ERROR_CODE);
        assert!(hook.boot_disk().is_some());
        hook.on_rst_trap(0x00);
        assert!(hook.boot_disk().is_none());
    }

    #[test]
    fn no_fallback_available_leaves_trap_unhandled() {
        let mut hook = BootHook::new(true, Vec::new());
        assert_eq!(hook.on_rst_trap(NO_DOS_ERROR_CODE), None);
    }

    #[test]
    fn mounted_builtin_dos_uses_file_disk_backend() {
        let mut hook = BootHook::new(true, dos_image());
        hook.on_rst_trap(NO_DOS_ERROR_CODE);
        // The built-in image is small, so it's recognised by the FileDisk
        // catch-all backend rather than a native MGT/SAD/EDSK image.
        assert!(matches!(hook.boot_disk(), Some(DiskImage::File(_))));
    }
}
