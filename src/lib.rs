/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! # sam-fdc
//!
//! sam-fdc emulates the floppy disk subsystem of a SAM Coupe: a VL-1772
//! compatible floppy disk controller driving a pluggable set of disk-image
//! backends (MGT, SAD, Extended DSK, single-file SBT, and an optional native
//! floppy pass-through).
//!
//! The main entry point is [`fdc::Drive`], which owns at most one mounted
//! [`disk::DiskImage`] at a time and exposes the `in`/`out` port handshake a
//! host CPU core drives. Disk images are constructed through
//! [`format_registry::open`] or built directly from their concrete backend
//! types in [`disk`].

pub mod boot_hook;
pub mod chs;
pub mod config;
pub mod disk;
pub mod error;
pub mod fdc;
pub mod format_registry;
pub mod status;
pub mod stream;
pub mod track_codec;

pub use boot_hook::BootHook;
pub use chs::IdField;
pub use config::{DriveConfig, FdcConfig};
pub use disk::{Disk, DiskImage};
pub use error::DiskError;
pub use fdc::Drive;
pub use status::SectorStatus;

/// Maximum sector size representable by a 2-bit size code (`128 << 3`).
pub const MAX_SECTOR_SIZE: usize = 1024;
/// Number of emulated frames per second, used to convert real-time constants
/// (motor spin-down) into frame-tick counts.
pub const FRAMES_PER_SECOND: u32 = 50;
