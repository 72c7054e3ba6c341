//! Single-slot handoff from interrupt context to task context.
//!
//! The link driver posts a fully framed packet, the task takes it. While the
//! slot is occupied a second post is refused and handed back to the caller,
//! which makes "one command in flight" a checked condition instead of an
//! accident of shared storage.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;

use portable_atomic::{AtomicU8, Ordering};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const FULL: u8 = 2;
const READING: u8 = 3;

pub struct Mailbox<T> {
    state: AtomicU8,
    slot: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: the slot is only accessed by whoever moved `state` into WRITING or
// READING, and the state transitions publish the slot with Release/Acquire.
unsafe impl<T: Send> Sync for Mailbox<T> {}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            slot: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Post `value`; gives it back if the slot is still occupied.
    pub fn try_post(&self, value: T) -> Result<(), T> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }
        // SAFETY: we own the slot while in WRITING.
        unsafe { (*self.slot.get()).write(value) };
        self.state.store(FULL, Ordering::Release);
        Ok(())
    }

    pub fn take(&self) -> Option<T> {
        if self
            .state
            .compare_exchange(FULL, READING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        // SAFETY: FULL means the producer initialised the slot.
        let value = unsafe { (*self.slot.get()).assume_init_read() };
        self.state.store(EMPTY, Ordering::Release);
        Some(value)
    }

    /// True while a posted value is waiting or being moved in or out.
    pub fn is_occupied(&self) -> bool {
        self.state.load(Ordering::Acquire) != EMPTY
    }
}

impl<T> Drop for Mailbox<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == FULL {
            // SAFETY: FULL means initialised, and we have exclusive access.
            unsafe { self.slot.get_mut().assume_init_drop() };
        }
    }
}
