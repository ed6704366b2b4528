//! Lifecycle and connection state bits with wait-for-any semantics.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A set of bridge state bits.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct StateBits(u8);

impl StateBits {
    pub const EMPTY: Self = Self(0);
    /// Worker loops keep running.
    pub const OPENED: Self = Self(1 << 0);
    /// Close requested; releases every waiter.
    pub const CLOSED: Self = Self(1 << 1);
    /// The peer is reachable.
    pub const CONNECTED: Self = Self(1 << 2);
    /// Set when the peer drops, cleared by the next connection.
    pub const DISCONNECTED: Self = Self(1 << 3);
    /// At least one frame is queued. Not a count.
    pub const FRAME_PENDING: Self = Self(1 << 4);
    pub const RX_LOOP_DONE: Self = Self(1 << 5);
    pub const TX_LOOP_DONE: Self = Self(1 << 6);

    const NAMES: [(Self, &'static str); 7] = [
        (Self::OPENED, "OPENED"),
        (Self::CLOSED, "CLOSED"),
        (Self::CONNECTED, "CONNECTED"),
        (Self::DISCONNECTED, "DISCONNECTED"),
        (Self::FRAME_PENDING, "FRAME_PENDING"),
        (Self::RX_LOOP_DONE, "RX_LOOP_DONE"),
        (Self::TX_LOOP_DONE, "TX_LOOP_DONE"),
    ];

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for StateBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StateBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for StateBits {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for StateBits {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for StateBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (bit, name) in Self::NAMES {
            if self.contains(bit) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Shared state bits guarded by one mutex and one condition variable.
///
/// Waiting never clears bits: whoever consumes an edge clears it
/// explicitly. The lock is only held inside these methods.
pub struct LinkStateFlags {
    bits: Mutex<StateBits>,
    changed: Condvar,
}

impl LinkStateFlags {
    pub fn new(initial: StateBits) -> Self {
        Self {
            bits: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StateBits> {
        self.bits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, bits: StateBits) {
        self.update(bits, StateBits::EMPTY);
    }

    pub fn clear(&self, bits: StateBits) {
        self.update(StateBits::EMPTY, bits);
    }

    /// Clear `clear` and set `set` as one atomic step.
    pub fn update(&self, set: StateBits, clear: StateBits) {
        let mut current = self.lock();
        *current = (*current & !clear) | set;
        self.changed.notify_all();
    }

    pub fn get(&self) -> StateBits {
        *self.lock()
    }

    /// True if every bit of `bits` is set.
    pub fn contains(&self, bits: StateBits) -> bool {
        self.get().contains(bits)
    }

    /// Block until any bit of `mask` is set or `timeout` elapses.
    ///
    /// Returns the bits of `mask` that were set, empty on timeout.
    pub fn wait_any(&self, mask: StateBits, timeout: Option<Duration>) -> StateBits {
        self.wait_until(timeout, |bits| bits.intersects(mask)) & mask
    }

    /// Block until every bit of `mask` is set or `timeout` elapses.
    ///
    /// Returns the bits of `mask` that were set when the wait ended.
    pub fn wait_all(&self, mask: StateBits, timeout: Option<Duration>) -> StateBits {
        self.wait_until(timeout, |bits| bits.contains(mask)) & mask
    }

    fn wait_until(
        &self,
        timeout: Option<Duration>,
        ready: impl Fn(StateBits) -> bool,
    ) -> StateBits {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut current = self.lock();
        while !ready(*current) {
            current = match deadline {
                None => self
                    .changed
                    .wait(current)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    self.changed
                        .wait_timeout(current, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
        *current
    }
}

impl fmt::Debug for LinkStateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LinkStateFlags").field(&self.get()).finish()
    }
}
