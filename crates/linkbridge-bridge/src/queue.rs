use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// A frame did not fit the remaining capacity.
#[derive(Debug, thiserror::Error)]
#[error("frame of {size} bytes does not fit ({free} of {capacity} bytes free)")]
pub struct QueueError {
    pub size: usize,
    pub free: usize,
    pub capacity: usize,
}

#[derive(Default)]
struct Slots {
    frames: VecDeque<Bytes>,
    used: usize,
}

/// FIFO of received frame payloads, bounded by total payload bytes.
///
/// Each push is returned whole by exactly one pop. Every operation takes the
/// queue lock; [`FrameQueue::lock`] hands it out so a caller can combine
/// several operations with a state change.
pub struct FrameQueue {
    capacity: usize,
    slots: Mutex<Slots>,
}

/// Exclusive access to a [`FrameQueue`].
pub struct QueueGuard<'a> {
    capacity: usize,
    slots: MutexGuard<'a, Slots>,
}

impl QueueGuard<'_> {
    /// Append a copy of `frame`.
    pub fn push(&mut self, frame: &[u8]) -> Result<(), QueueError> {
        let free = self.capacity - self.slots.used;
        if frame.len() > free {
            return Err(QueueError {
                size: frame.len(),
                free,
                capacity: self.capacity,
            });
        }
        self.slots.used += frame.len();
        self.slots.frames.push_back(Bytes::copy_from_slice(frame));
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Bytes> {
        let frame = self.slots.frames.pop_front()?;
        self.slots.used -= frame.len();
        Some(frame)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.frames.is_empty()
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.slots.frames.len()
    }

    pub fn used_bytes(&self) -> usize {
        self.slots.used
    }

    /// Discard every queued frame.
    pub fn reset(&mut self) {
        self.slots.frames.clear();
        self.slots.used = 0;
    }
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(Slots::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lock(&self) -> QueueGuard<'_> {
        QueueGuard {
            capacity: self.capacity,
            slots: self.slots.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn push(&self, frame: &[u8]) -> Result<(), QueueError> {
        self.lock().push(frame)
    }

    pub fn pop(&self) -> Option<Bytes> {
        self.lock().pop()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn used_bytes(&self) -> usize {
        self.lock().used_bytes()
    }

    pub fn reset(&self) {
        self.lock().reset();
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.lock();
        f.debug_struct("FrameQueue")
            .field("capacity", &self.capacity)
            .field("frames", &guard.len())
            .field("used", &guard.used_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn preserves_frame_boundaries_in_order() {
        let queue = FrameQueue::new(64);
        queue.push(b"alpha").unwrap();
        queue.push(b"").unwrap();
        queue.push(b"gamma").unwrap();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.used_bytes(), 10);
        assert_eq!(queue.pop().unwrap().as_ref(), b"alpha");
        assert_eq!(queue.pop().unwrap().as_ref(), b"");
        assert_eq!(queue.pop().unwrap().as_ref(), b"gamma");
        assert!(queue.pop().is_none());
        assert_eq!(queue.used_bytes(), 0);
    }

    #[test]
    fn exact_capacity_fits_one_more_byte_does_not() {
        let queue = FrameQueue::new(16);
        queue.push(&[7u8; 16]).unwrap();

        let err = queue.push(b"x").unwrap_err();
        assert_eq!((err.size, err.free, err.capacity), (1, 0, 16));

        queue.pop().unwrap();
        let err = queue.push(&[0u8; 17]).unwrap_err();
        assert_eq!(err.free, 16);
    }

    #[test]
    fn reset_discards_everything() {
        let queue = FrameQueue::new(32);
        queue.push(b"stale").unwrap();
        queue.push(b"data").unwrap();
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.used_bytes(), 0);
        queue.push(&[1u8; 32]).unwrap();
    }

    #[test]
    fn concurrent_consumers_never_duplicate() {
        let queue = Arc::new(FrameQueue::new(4096));
        for i in 0..200u32 {
            queue.push(&i.to_le_bytes()).unwrap();
        }

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(frame) = queue.pop() {
                        seen.push(u32::from_le_bytes(frame.as_ref().try_into().unwrap()));
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for consumer in consumers {
            let seen = consumer.join().unwrap();
            assert!(seen.windows(2).all(|w| w[0] < w[1]));
            all.extend(seen);
        }
        all.sort_unstable();
        assert_eq!(all, (0..200).collect::<Vec<_>>());
    }
}
