//! Core Interfaces for the Disruptor Pattern
//!
//! Cursor access, the producer-facing sequencing operations and read-only data
//! access. [`Sequencer`](crate::disruptor::Sequencer) builds on the first two.

use crate::disruptor::Result;

/// Provides access to a cursor value
pub trait Cursored {
    /// Get the current cursor value
    fn get_cursor(&self) -> i64;
}

/// Operations related to sequencing items in a ring buffer
pub trait Sequenced {
    /// Get the capacity of the data structure
    fn get_buffer_size(&self) -> usize;

    /// Check if the buffer has capacity for additional sequences
    ///
    /// This is a concurrent method, so the response should only be taken
    /// as an indication of available capacity.
    fn has_available_capacity(&self, required_capacity: usize) -> bool;

    /// Get the remaining capacity for this sequencer
    fn remaining_capacity(&self) -> i64;

    /// Claim the next event in sequence for publishing
    ///
    /// Blocks while the ring buffer is full.
    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    /// Claim the next n events in sequence for publishing
    ///
    /// Blocks while fewer than `n` slots are free. Usage:
    ///
    /// ```ignore
    /// let n = 10;
    /// let hi = sequencer.next_n(n)?;
    /// let lo = hi - (n - 1);
    /// for sequence in lo..=hi {
    ///     // Do work
    /// }
    /// sequencer.publish_range(lo, hi);
    /// ```
    ///
    /// # Returns
    /// The highest claimed sequence value
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidClaimSize` if `n < 1` or `n > buffer_size`
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Attempt to claim the next event in sequence for publishing
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if no slot is free
    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    /// Attempt to claim the next n events in sequence for publishing
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if fewer than `n` slots are free,
    /// or `DisruptorError::InvalidClaimSize` for an out-of-range `n`
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Publish a sequence
    ///
    /// Call when the event has been filled.
    fn publish(&self, sequence: i64);

    /// Batch publish sequences
    ///
    /// Called when all of the events in `[lo, hi]` have been filled.
    fn publish_range(&self, lo: i64, hi: i64);
}

/// Read access to the data stored at a sequence
///
/// Decouples readers such as [`EventPoller`](crate::disruptor::EventPoller) from
/// the concrete [`RingBuffer`](crate::disruptor::RingBuffer).
pub trait DataProvider<T>: Send + Sync {
    /// Get the data item at the specified sequence
    fn get(&self, sequence: i64) -> &T;

    /// Number of slots behind the provider
    fn buffer_size(&self) -> usize;
}
