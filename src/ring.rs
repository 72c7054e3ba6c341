//! Fixed-capacity message ring.
//!
//! One producer pushes, one consumer pops. Both sides take `&self`, so a ring
//! can live in a `static` and be shared between an interrupt-level task and
//! a thread-mode task without a lock. Two producers (or two consumers) on the
//! same ring are not supported.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;

use portable_atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// Ring is full; nothing was written.
    NoSpace,
    /// Ring is empty; nothing was read.
    NoData,
}

pub struct MsgRing<T: Copy, const N: usize> {
    slots: UnsafeCell<[MaybeUninit<T>; N]>,
    // Only the producer stores `head`, only the consumer stores `tail`.
    head: AtomicUsize,
    tail: AtomicUsize,
    count: AtomicUsize,
}

// SAFETY: a slot is written by the producer before `count` is published with
// Release and read by the consumer only after observing it with Acquire, so
// the two sides never touch the same slot at the same time.
unsafe impl<T: Copy + Send, const N: usize> Sync for MsgRing<T, N> {}

impl<T: Copy, const N: usize> Default for MsgRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> MsgRing<T, N> {
    pub const fn new() -> Self {
        assert!(N > 0, "ring capacity must be non-zero");
        Self {
            slots: UnsafeCell::new([MaybeUninit::uninit(); N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Copy `msg` in at the head. Producer side only.
    pub fn push(&self, msg: T) -> Result<(), RingError> {
        if self.is_full() {
            return Err(RingError::NoSpace);
        }

        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: `head < N`, and the slot at `head` is free because the
        // ring is not full; the consumer will not read it until `count`
        // is bumped below.
        unsafe {
            let slot = (self.slots.get() as *mut MaybeUninit<T>).add(head);
            (*slot).write(msg);
        }
        self.head.store(Self::wrap(head + 1), Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Copy the oldest message out and advance the tail. Consumer side only.
    pub fn pop(&self) -> Result<T, RingError> {
        if self.is_empty() {
            return Err(RingError::NoData);
        }

        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: `tail < N` and the slot was initialised by a push whose
        // count increment we observed with Acquire in `is_empty`.
        let msg = unsafe {
            let slot = (self.slots.get() as *const MaybeUninit<T>).add(tail);
            (*slot).assume_init()
        };
        self.tail.store(Self::wrap(tail + 1), Ordering::Relaxed);
        self.count.fetch_sub(1, Ordering::Release);
        Ok(msg)
    }

    #[inline]
    fn wrap(index: usize) -> usize {
        index % N
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_to_capacity_then_refuses() {
        let ring = MsgRing::<u32, 4>::new();
        for i in 0..4 {
            ring.push(i).unwrap();
        }
        assert!(ring.is_full());
        assert_eq!(ring.push(99), Err(RingError::NoSpace));
        assert_eq!(ring.len(), 4);

        // contents unchanged by the failed push
        for i in 0..4 {
            assert_eq!(ring.pop(), Ok(i));
        }
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), Err(RingError::NoData));
    }

    #[test]
    fn wraps_around_in_fifo_order() {
        let ring = MsgRing::<u8, 3>::new();
        let mut expected = 0u8;
        let mut next = 0u8;

        for _ in 0..10 {
            ring.push(next).unwrap();
            next += 1;
            ring.push(next).unwrap();
            next += 1;
            assert_eq!(ring.pop(), Ok(expected));
            expected += 1;
            assert_eq!(ring.pop(), Ok(expected));
            expected += 1;
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn usable_from_static() {
        static RING: MsgRing<u32, 2> = MsgRing::new();
        RING.push(1).unwrap();
        assert_eq!(RING.capacity(), 2);
        assert_eq!(RING.pop(), Ok(1));
    }
}
