//! Lock-free single-producer single-consumer bounded channel
//!
//! Fixed-size ring buffer used for frame hand-off between pipeline stages.
//! One slot is sacrificed to distinguish full from empty without a separate
//! counter, so a ring of N slots holds at most N-1 live items.
//!
//! The read/write indices are atomics published with acquire/release
//! ordering: the producer releases the write index after filling a slot and
//! the consumer acquires it before reading, so slot contents are visible on
//! weakly-ordered hardware. Safe only under the SPSC discipline, which the
//! split producer/consumer halves enforce by ownership.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Ring<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    read: AtomicUsize,
    write: AtomicUsize,
}

// Slot access is coordinated entirely through the index protocol: the
// producer only writes slots in [write, read), the consumer only reads
// slots in [read, write).
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    fn is_empty(&self) -> bool {
        self.read.load(Ordering::Acquire) == self.write.load(Ordering::Acquire)
    }

    fn is_full(&self) -> bool {
        self.next(self.write.load(Ordering::Acquire)) == self.read.load(Ordering::Acquire)
    }

    fn len(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        (write + self.slots.len() - read) % self.slots.len()
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Exclusive access here; release any items still in flight.
        let mut read = *self.read.get_mut();
        let write = *self.write.get_mut();
        while read != write {
            unsafe {
                (*self.slots[read].get()).assume_init_drop();
            }
            read = (read + 1) % self.slots.len();
        }
    }
}

/// Producer half of a [`BoundedChannel`]. Not cloneable: exactly one
/// producer exists per channel.
pub struct ChannelProducer<T> {
    ring: Arc<Ring<T>>,
}

/// Consumer half of a [`BoundedChannel`]. Not cloneable: exactly one
/// consumer exists per channel.
pub struct ChannelConsumer<T> {
    ring: Arc<Ring<T>>,
}

/// Fixed-capacity lock-free SPSC queue.
pub struct BoundedChannel;

impl BoundedChannel {
    /// Create a channel with `capacity` slots and split it into its
    /// producer and consumer halves.
    ///
    /// The channel holds at most `capacity - 1` items at any instant.
    ///
    /// # Panics
    /// Panics if `capacity < 2` (a ring that small cannot hold anything).
    pub fn with_capacity<T: Send>(capacity: usize) -> (ChannelProducer<T>, ChannelConsumer<T>) {
        assert!(capacity >= 2, "SPSC channel needs at least 2 slots");

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let ring = Arc::new(Ring {
            slots,
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        });

        (
            ChannelProducer { ring: ring.clone() },
            ChannelConsumer { ring },
        )
    }
}

impl<T: Send> ChannelProducer<T> {
    /// Attempt to enqueue a value.
    ///
    /// Returns the value back unchanged when the channel is full; the
    /// caller decides whether to retry (backpressure) or drop.
    pub fn try_put(&mut self, value: T) -> Result<(), T> {
        // Only this half mutates `write`, so a relaxed self-read is fine.
        let write = self.ring.write.load(Ordering::Relaxed);
        let next = self.ring.next(write);

        if next == self.ring.read.load(Ordering::Acquire) {
            return Err(value);
        }

        unsafe {
            (*self.ring.slots[write].get()).write(value);
        }
        // Publish the slot to the consumer.
        self.ring.write.store(next, Ordering::Release);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<T: Send> ChannelConsumer<T> {
    /// Remove and return the oldest unread value, or `None` when empty.
    pub fn try_get(&mut self) -> Option<T> {
        let read = self.ring.read.load(Ordering::Relaxed);

        if read == self.ring.write.load(Ordering::Acquire) {
            return None;
        }

        let value = unsafe { (*self.ring.slots[read].get()).assume_init_read() };
        // Release the slot back to the producer.
        self.ring.read.store(self.ring.next(read), Ordering::Release);
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of items currently queued. Approximate while the producer
    /// is concurrently active.
    pub fn len(&self) -> usize {
        self.ring.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_capacity_holds_one_less_than_slots() {
        let (mut tx, _rx) = BoundedChannel::with_capacity::<u32>(4);

        assert!(tx.try_put(1).is_ok());
        assert!(tx.try_put(2).is_ok());
        assert!(tx.try_put(3).is_ok());
        assert!(tx.is_full());

        // The Kth consecutive put without a get fails and returns the value.
        assert_eq!(tx.try_put(4), Err(4));
    }

    #[test]
    fn test_fifo_order_single_thread() {
        let (mut tx, mut rx) = BoundedChannel::with_capacity::<u32>(8);

        assert!(rx.try_get().is_none());

        for i in 0..5 {
            tx.try_put(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(rx.try_get(), Some(i));
        }
        assert!(rx.is_empty());
        assert!(rx.try_get().is_none());
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let (mut tx, mut rx) = BoundedChannel::with_capacity::<u32>(3);

        for round in 0..50u32 {
            tx.try_put(round * 2).unwrap();
            tx.try_put(round * 2 + 1).unwrap();
            assert!(tx.is_full());
            assert_eq!(rx.try_get(), Some(round * 2));
            assert_eq!(rx.try_get(), Some(round * 2 + 1));
        }
    }

    #[test]
    fn test_no_loss_no_duplication_across_threads() {
        const COUNT: u64 = 100_000;

        let (mut tx, mut rx) = BoundedChannel::with_capacity::<u64>(16);

        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                let mut value = i;
                loop {
                    match tx.try_put(value) {
                        Ok(()) => break,
                        Err(v) => {
                            value = v;
                            thread::yield_now();
                        }
                    }
                }
            }
        });

        let mut received = Vec::with_capacity(COUNT as usize);
        while received.len() < COUNT as usize {
            match rx.try_get() {
                Some(v) => received.push(v),
                None => thread::yield_now(),
            }
        }

        producer.join().unwrap();

        // Strict FIFO: the consumer observes exactly the produced sequence.
        for (expected, got) in (0..COUNT).zip(received) {
            assert_eq!(expected, got);
        }
        assert!(rx.try_get().is_none());
    }

    #[test]
    fn test_drop_releases_in_flight_items() {
        let item = Arc::new(());
        let (mut tx, rx) = BoundedChannel::with_capacity::<Arc<()>>(8);

        tx.try_put(item.clone()).unwrap();
        tx.try_put(item.clone()).unwrap();
        assert_eq!(Arc::strong_count(&item), 3);

        drop(tx);
        drop(rx);
        assert_eq!(Arc::strong_count(&item), 1);
    }

    #[test]
    #[should_panic]
    fn test_rejects_tiny_capacity() {
        let _ = BoundedChannel::with_capacity::<u32>(1);
    }
}
