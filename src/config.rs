/*
    sam-fdc
    https://github.com/dbalsom/fluxfox

    src/config.rs

    Typed tunables for the drive/FDC timing model, standing in for a set of
    scattered constants (FLOPPY_MOTOR_ACTIVE_TIME, LOAD_DELAY). Not a
    general options/CLI surface - just named knobs with sensible defaults.
*/
use crate::FRAMES_PER_SECOND;

/// Timing and quirk configuration for a single [`crate::fdc::Drive`].
#[derive(Copy, Clone, Debug)]
pub struct DriveConfig {
    /// Frame ticks the motor stays on after the most recent command.
    /// Default: 10 revolutions at 300rpm = 2 seconds of frame ticks.
    pub motor_active_frames: u32,
    /// Number of `is_busy` polls a freshly-loaded track artificially stays
    /// busy for, so fast-poll software doesn't see an already-completed
    /// transfer in the same CPU burst.
    pub load_delay: u8,
    /// Index pulse half-period, in status-register reads. The pulse toggles
    /// every this many `in(status)` calls while the motor is on and a disk
    /// is present - derived from reads rather than frames, since that's what
    /// lets busy-polling software observe a transition within one CPU burst.
    pub index_half_period_reads: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            motor_active_frames: (10 * FRAMES_PER_SECOND) / (300 / 60),
            load_delay: 3,
            index_half_period_reads: 8,
        }
    }
}

/// Configuration shared across all drives attached to one FDC instance.
#[derive(Copy, Clone, Debug, Default)]
pub struct FdcConfig {
    pub drive: DriveConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_motor_active_is_two_seconds_of_frames() {
        let cfg = DriveConfig::default();
        assert_eq!(cfg.motor_active_frames, 2 * FRAMES_PER_SECOND);
    }
}
