//! Ring Buffer Implementation
//!
//! This module provides the slot storage for the Disruptor pattern. The ring
//! buffer is a pre-allocated circular array; it knows nothing about claiming or
//! publishing, which is the sequencer's job. Access to a slot is only sound while
//! the sequencer protocol grants the caller ownership of the matching sequence.

use crate::disruptor::core_interfaces::DataProvider;
use crate::disruptor::{is_power_of_two, DisruptorError, EventFactory, Result};
use std::cell::UnsafeCell;

/// Pre-allocated storage for events
///
/// Every slot is filled once by the event factory at construction and reused on
/// every lap. The slot for a sequence is `sequence & (buffer_size - 1)`, so any
/// sequence value maps to a valid index.
///
/// # Type Parameters
/// * `T` - The event type stored in the buffer
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    /// buffer_size - 1, kept as i64 to match the sequence type
    index_mask: i64,
}

impl<T> RingBuffer<T>
where
    T: Send + Sync,
{
    /// Create a new ring buffer with the specified size and event factory
    ///
    /// # Arguments
    /// * `buffer_size` - The size of the ring buffer (must be a power of 2)
    /// * `event_factory` - Factory for creating events to pre-populate the buffer
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if buffer_size is zero or not a power of 2
    pub fn new<F>(buffer_size: usize, event_factory: F) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        let slots: Box<[UnsafeCell<T>]> = (0..buffer_size)
            .map(|_| UnsafeCell::new(event_factory.new_instance()))
            .collect();

        Ok(Self {
            slots,
            index_mask: (buffer_size - 1) as i64,
        })
    }

    #[inline]
    fn index(&self, sequence: i64) -> usize {
        (sequence & self.index_mask) as usize
    }

    /// Get a reference to the event at the specified sequence
    ///
    /// Callers must only read a slot whose sequence has been published and not yet
    /// released back to producers by every gating sequence.
    #[inline]
    pub fn get(&self, sequence: i64) -> &T {
        // SAFETY: index is masked into bounds; exclusive writers are excluded by the
        // sequencer protocol for any published, still-gated sequence.
        unsafe { &*self.slots.get_unchecked(self.index(sequence)).get() }
    }

    /// Get a mutable reference to the event at the specified sequence
    pub fn get_mut(&mut self, sequence: i64) -> &mut T {
        let index = self.index(sequence);
        self.slots[index].get_mut()
    }

    /// Raw mutable pointer to the event at the specified sequence
    ///
    /// # Safety
    /// The caller must own `sequence` according to the sequencer protocol: either a
    /// producer between claim and publish, or the single consumer currently
    /// processing it. No other reference to the slot may be live.
    #[inline]
    pub unsafe fn get_mut_unchecked(&self, sequence: i64) -> *mut T {
        self.slots.get_unchecked(self.index(sequence)).get()
    }

    /// Get the size of the buffer
    pub fn buffer_size(&self) -> usize {
        self.slots.len()
    }

    /// Get the size of the buffer as i64
    pub fn size(&self) -> i64 {
        self.slots.len() as i64
    }

    /// Number of free slots given a producer position and the slowest consumer position
    pub fn free_slots(&self, producer_sequence: i64, consumer_sequence: i64) -> i64 {
        self.size() - (producer_sequence - consumer_sequence)
    }

    /// Create a batch iterator for mutable access to a range of events
    ///
    /// # Arguments
    /// * `start` - The starting sequence (inclusive)
    /// * `end` - The ending sequence (inclusive)
    ///
    /// # Safety
    /// The caller must own every sequence in `[start, end]` (see [`Self::get_mut_unchecked`])
    pub unsafe fn batch_iter_mut(&self, start: i64, end: i64) -> BatchIterMut<'_, T> {
        BatchIterMut {
            ring_buffer: self,
            current: start,
            last: end,
        }
    }
}

/// Iterator over mutable events of a claimed range
pub struct BatchIterMut<'a, T> {
    ring_buffer: &'a RingBuffer<T>,
    current: i64,
    last: i64,
}

impl<T> BatchIterMut<'_, T> {
    fn remaining(&self) -> usize {
        if self.current > self.last {
            0
        } else {
            (self.last - self.current + 1) as usize
        }
    }
}

impl<'a, T> Iterator for BatchIterMut<'a, T>
where
    T: Send + Sync,
{
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current > self.last {
            None
        } else {
            // SAFETY: the creator of the iterator owns the whole range and each
            // sequence is yielded once.
            let event = unsafe { &mut *self.ring_buffer.get_mut_unchecked(self.current) };
            self.current += 1;
            Some(event)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for BatchIterMut<'_, T> where T: Send + Sync {}

// SAFETY: slots are only touched under the happens-before edges created by the
// sequencer (release publish, acquire wait), so sharing the buffer is sound when
// the events themselves are Send + Sync.
unsafe impl<T: Send + Sync> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

impl<T> DataProvider<T> for RingBuffer<T>
where
    T: Send + Sync,
{
    fn get(&self, sequence: i64) -> &T {
        RingBuffer::get(self, sequence)
    }

    fn buffer_size(&self) -> usize {
        self.slots.len()
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.slots.len())
            .finish()
    }
}
