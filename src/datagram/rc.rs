//! RC channel values pushed by the host, read by the control loop.
//!
//! The datagram host task writes, any other task reads; the values live in
//! atomics so both can hold a shared reference to one `static`.

use portable_atomic::{AtomicBool, AtomicU16, Ordering};

pub const RC_CHANNELS: usize = 4;

/// Host update period the control loop can expect, in microseconds.
pub const RC_REFRESH_US: u32 = 20_000;

/// Refresh periods without a frame before the outputs are cut.
pub const RC_MISSED_FRAMES_MAX: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameStatus {
    Pending,
    Complete,
}

#[derive(Debug, Default)]
pub struct RcInput {
    fresh: AtomicBool,
    channels: [AtomicU16; RC_CHANNELS],
}

impl RcInput {
    pub const fn new() -> Self {
        Self {
            fresh: AtomicBool::new(false),
            channels: [AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0)],
        }
    }

    /// Store a new frame of channel values.
    pub fn update(&self, values: &[u16]) {
        for (ch, &v) in self.channels.iter().zip(values) {
            ch.store(v, Ordering::Relaxed);
        }
        self.fresh.store(true, Ordering::Release);
    }

    /// `Complete` once per new frame, `Pending` otherwise.
    pub fn check_received(&self) -> FrameStatus {
        if self.fresh.swap(false, Ordering::Acquire) {
            FrameStatus::Complete
        } else {
            FrameStatus::Pending
        }
    }

    pub fn raw(&self, channel: usize) -> u16 {
        self.channels.get(channel).map_or(0, |c| c.load(Ordering::Relaxed))
    }
}

/// Cuts the outputs when the host stops sending RC frames.
///
/// Fed one [`FrameStatus`] per [`RC_REFRESH_US`]. Starts disarmed; the first
/// frame arms it.
#[derive(Debug)]
pub struct RcFailsafe {
    missed: u32,
    armed: bool,
}

impl Default for RcFailsafe {
    fn default() -> Self {
        Self::new()
    }
}

impl RcFailsafe {
    pub const fn new() -> Self {
        Self {
            missed: 0,
            armed: false,
        }
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Returns the new output state when it changes.
    pub fn tick(&mut self, status: FrameStatus) -> Option<bool> {
        match status {
            FrameStatus::Complete => {
                self.missed = 0;
                if self.armed {
                    return None;
                }
                self.armed = true;
                Some(true)
            }
            FrameStatus::Pending => {
                self.missed = self.missed.saturating_add(1);
                if self.armed && self.missed >= RC_MISSED_FRAMES_MAX {
                    warn!("rc: {} frames missed, failsafe", self.missed);
                    self.armed = false;
                    return Some(false);
                }
                None
            }
        }
    }
}
