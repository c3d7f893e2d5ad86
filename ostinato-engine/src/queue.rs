//! Bounded single-producer/single-consumer event queue
//!
//! Thin wrapper over a `ringbuf` heap ring buffer that exposes its free and
//! occupied storage as at most two contiguous spans, so a reader or writer can
//! work across the wraparound point without copying.
//!
//! Wait-free for one producer and one consumer. Nothing allocates after
//! [`event_queue`] returns; a full queue rejects writes instead of blocking.

use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split as _};
use std::mem::MaybeUninit;

use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Default queue capacity, comfortably above the events expected per period
pub const MAX_EVENTS: usize = 1024;

/// Writing half of an event queue
pub struct EventProducer<T> {
    inner: HeapProd<T>,
}

/// Reading half of an event queue
pub struct EventConsumer<T> {
    inner: HeapCons<T>,
}

/// Create a queue holding up to `capacity` events
pub fn event_queue<T>(capacity: usize) -> (EventProducer<T>, EventConsumer<T>) {
    let rb = HeapRb::<T>::new(capacity);
    let (producer, consumer) = rb.split();
    (
        EventProducer { inner: producer },
        EventConsumer { inner: consumer },
    )
}

impl<T> EventProducer<T> {
    /// Borrow the free storage for in-place writes
    pub fn write_region(&mut self) -> WriteRegion<'_, T> {
        WriteRegion {
            producer: &mut self.inner,
            written: 0,
        }
    }

    /// Write a single event; hands it back if the queue is full
    pub fn push(&mut self, item: T) -> Result<(), T> {
        self.inner.try_push(item)
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

impl<T> EventConsumer<T> {
    /// Borrow the unread events as (up to) two spans in queue order.
    ///
    /// The region is a snapshot: events written after this call are not part
    /// of it and stay queued after [`ReadRegion::commit`].
    pub fn read_region(&mut self) -> ReadRegion<'_, T> {
        let (first, second) = self.inner.as_slices();
        let (first_len, second_len) = (first.len(), second.len());
        ReadRegion {
            consumer: &mut self.inner,
            first_len,
            second_len,
        }
    }

    /// Read a single event
    pub fn pop(&mut self) -> Option<T> {
        self.inner.try_pop()
    }

    pub fn len(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

/// Free storage of a queue, filled front to back.
///
/// Nothing written becomes visible to the consumer until
/// [`WriteRegion::commit`]; dropping the region discards whatever was not
/// committed.
pub struct WriteRegion<'a, T> {
    producer: &'a mut HeapProd<T>,
    written: usize,
}

impl<'a, T> WriteRegion<'a, T> {
    /// Lengths of the two free spans, minus what this region already filled
    pub fn spans(&mut self) -> (usize, usize) {
        let written = self.written;
        let (first, second) = self.producer.vacant_slices_mut();
        let first_left = first.len().saturating_sub(written);
        let second_left = second.len() - written.saturating_sub(first.len());
        (first_left, second_left)
    }

    /// Free slots remaining
    pub fn len(&self) -> usize {
        self.producer.vacant_len() - self.written
    }

    /// No free slot: the queue is full
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots filled so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Write into the next free slot, first span before second
    pub fn push(&mut self, item: T) -> Result<(), T> {
        match self.slot(self.written) {
            Some(slot) => {
                slot.write(item);
                self.written += 1;
                Ok(())
            }
            None => Err(item),
        }
    }

    /// Publish the first `count` written events (clamped to what was written).
    /// The rest are discarded. Returns how many were published.
    pub fn commit(mut self, count: usize) -> usize {
        let count = count.min(self.written);
        self.discard_from(count);
        // SAFETY: the `count` slots following the write index were
        // initialised by `push` and not discarded.
        unsafe { self.producer.advance_write_index(count) };
        self.written = 0;
        count
    }

    fn slot(&mut self, index: usize) -> Option<&mut MaybeUninit<T>> {
        let (first, second) = self.producer.vacant_slices_mut();
        let first_len = first.len();
        if index < first_len {
            Some(&mut first[index])
        } else {
            second.get_mut(index - first_len)
        }
    }

    /// Drop written slots from `index` on and forget them
    fn discard_from(&mut self, index: usize) {
        for i in index..self.written {
            if let Some(slot) = self.slot(i) {
                // SAFETY: every slot below `written` was initialised by `push`
                unsafe { slot.assume_init_drop() };
            }
        }
        self.written = index.min(self.written);
    }
}

impl<T> Drop for WriteRegion<'_, T> {
    fn drop(&mut self) {
        // Commit leaves nothing behind; anything still here was never published
        self.discard_from(0);
    }
}

/// Unread events of a queue, borrowed in place
pub struct ReadRegion<'a, T> {
    consumer: &'a mut HeapCons<T>,
    first_len: usize,
    second_len: usize,
}

impl<'a, T> ReadRegion<'a, T> {
    /// Oldest events, up to the end of the underlying storage
    pub fn first(&self) -> &[T] {
        &self.consumer.as_slices().0[..self.first_len]
    }

    /// Events that wrapped around to the start of the storage
    pub fn second(&self) -> &[T] {
        &self.consumer.as_slices().1[..self.second_len]
    }

    pub fn len(&self) -> usize {
        self.first_len + self.second_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release the oldest `count` events (clamped to the region)
    pub fn commit(self, count: usize) -> usize {
        let count = count.min(self.len());
        self.consumer.skip(count)
    }

    /// Release every event in the region
    pub fn commit_all(self) -> usize {
        let count = self.len();
        self.commit(count)
    }
}
