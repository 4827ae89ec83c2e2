//! Sequencer Implementation
//!
//! Sequencers hand out sequence numbers to producers and make them visible to
//! consumers. They never let a producer claim a slot that the slowest gating
//! sequence has not released yet.

use crate::disruptor::core_interfaces::{Cursored, Sequenced};
use crate::disruptor::{
    is_power_of_two, log2, DisruptorError, ProcessingSequenceBarrier, Result, Sequence,
    SequenceBarrier, SequenceGroup, WaitStrategy,
};
use crossbeam_utils::{Backoff, CachePadded};
use std::sync::atomic::{fence, AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;

/// Coordinates the claiming of sequences for access to a ring buffer while
/// tracking dependent gating sequences
///
/// The trait is object safe; [`Disruptor`](crate::disruptor::Disruptor) holds its
/// sequencer as `Arc<dyn Sequencer>`.
pub trait Sequencer: Cursored + Sequenced + Send + Sync + std::fmt::Debug {
    /// The cursor sequence itself, shared with barriers
    fn cursor_sequence(&self) -> Arc<Sequence>;

    /// Claim a specific sequence
    ///
    /// Only useful when initialising the ring buffer to a specific value.
    fn claim(&self, sequence: i64);

    /// Confirm if a sequence is published and the event is available for use
    fn is_available(&self, sequence: i64) -> bool;

    /// Add the specified gating sequences to this instance
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove the specified sequence from this sequencer
    ///
    /// # Returns
    /// True if the sequence was found and removed
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Create a new barrier that tracks the cursor and the given sequences
    ///
    /// # Arguments
    /// * `sequences_to_track` - Upstream sequences the barrier must not overtake.
    ///   An empty list means the barrier only follows the cursor.
    fn new_barrier(self: Arc<Self>, sequences_to_track: Vec<Arc<Sequence>>)
        -> Arc<dyn SequenceBarrier>;

    /// Minimum of all gating sequences, or the cursor when there are none
    fn get_minimum_sequence(&self) -> i64;

    /// Highest sequence that can be safely read from the ring buffer
    ///
    /// Scans from `next_sequence` up to `available_sequence`. When nothing in
    /// the range is published the result is `next_sequence - 1`.
    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64;

    /// Number of gating sequences currently registered
    fn gating_sequence_count(&self) -> usize;
}

fn validate_claim_size(n: i64, buffer_size: usize) -> Result<()> {
    if n < 1 || n > buffer_size as i64 {
        return Err(DisruptorError::InvalidClaimSize {
            requested: n,
            buffer_size,
        });
    }
    Ok(())
}

/// Sequencer for use when only one thread publishes
///
/// Not safe for use from multiple threads: it keeps the claim position in
/// plain (relaxed) atomics that only the producer thread writes.
pub struct SingleProducerSequencer<W> {
    buffer_size: usize,
    wait_strategy: Arc<W>,
    cursor: Arc<Sequence>,
    gating_sequences: SequenceGroup,
    next_value: CachePadded<AtomicI64>,
    cached_value: CachePadded<AtomicI64>,
}

impl<W> SingleProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    /// Create a new single producer sequencer
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if buffer_size is zero or not a power of 2
    pub fn new(buffer_size: usize, wait_strategy: Arc<W>) -> Result<Self> {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::new_with_initial_value()),
            gating_sequences: SequenceGroup::new(),
            next_value: CachePadded::new(AtomicI64::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
            cached_value: CachePadded::new(AtomicI64::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
        })
    }

    /// The wait strategy shared with barriers created by this sequencer
    pub fn wait_strategy(&self) -> &Arc<W> {
        &self.wait_strategy
    }

    fn has_available_capacity_from(&self, required_capacity: i64, next_value: i64) -> bool {
        let wrap_point = next_value + required_capacity - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            fence(Ordering::SeqCst);
            let min_sequence = self.gating_sequences.minimum(next_value);
            self.cached_value.store(min_sequence, Ordering::Relaxed);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl<W> Cursored for SingleProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }
}

impl<W> Sequenced for SingleProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        self.has_available_capacity_from(
            required_capacity as i64,
            self.next_value.load(Ordering::Relaxed),
        )
    }

    fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let consumed = self.gating_sequences.minimum(next_value);
        self.buffer_size as i64 - (next_value - consumed)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        validate_claim_size(n, self.buffer_size)?;

        let next_value = self.next_value.load(Ordering::Relaxed);
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.buffer_size as i64;
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            fence(Ordering::SeqCst);

            let backoff = Backoff::new();
            let mut min_sequence = self.gating_sequences.minimum(next_value);
            while wrap_point > min_sequence {
                backoff.snooze();
                min_sequence = self.gating_sequences.minimum(next_value);
            }

            self.cached_value.store(min_sequence, Ordering::Relaxed);
        }

        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        validate_claim_size(n, self.buffer_size)?;

        let next_value = self.next_value.load(Ordering::Relaxed);
        if !self.has_available_capacity_from(n, next_value) {
            return Err(DisruptorError::InsufficientCapacity);
        }

        let next_sequence = next_value + n;
        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn publish(&self, sequence: i64) {
        self.cursor.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _lo: i64, hi: i64) {
        self.publish(hi);
    }
}

impl<W> Sequencer for SingleProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    fn claim(&self, sequence: i64) {
        self.next_value.store(sequence, Ordering::Relaxed);
    }

    fn is_available(&self, sequence: i64) -> bool {
        sequence <= self.cursor.get()
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.gating_sequences
            .add_while_running(&self.cursor, gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating_sequences.remove(sequence)
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: Vec<Arc<Sequence>>,
    ) -> Arc<dyn SequenceBarrier> {
        let wait_strategy = Arc::clone(&self.wait_strategy);
        let cursor = Arc::clone(&self.cursor);
        Arc::new(ProcessingSequenceBarrier::new(
            self,
            wait_strategy,
            cursor,
            sequences_to_track,
        ))
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.gating_sequences.minimum(self.cursor.get())
    }

    fn get_highest_published_sequence(&self, _next_sequence: i64, available_sequence: i64) -> i64 {
        available_sequence
    }

    fn gating_sequence_count(&self) -> usize {
        self.gating_sequences.len()
    }
}

impl<W: std::fmt::Debug> std::fmt::Debug for SingleProducerSequencer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleProducerSequencer")
            .field("buffer_size", &self.buffer_size)
            .field("cursor", &self.cursor)
            .field("next_value", &self.next_value.load(Ordering::Relaxed))
            .field("gating_sequences", &self.gating_sequences)
            .field("wait_strategy", &self.wait_strategy)
            .finish()
    }
}

/// Sequencer for use when several threads publish concurrently
///
/// Claims are made with a CAS on the cursor, so the cursor tracks the highest
/// claimed sequence, not the highest published one. Publication is recorded
/// per slot in an availability buffer holding the lap number of the last
/// publish, and consumers only ever see the contiguous published prefix.
pub struct MultiProducerSequencer<W> {
    buffer_size: usize,
    wait_strategy: Arc<W>,
    cursor: Arc<Sequence>,
    gating_sequences: SequenceGroup,
    gating_sequence_cache: Sequence,
    available_buffer: Box<[AtomicI32]>,
    index_mask: i64,
    index_shift: u32,
}

impl<W> MultiProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    /// Create a new multi producer sequencer
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if buffer_size is zero or not a power of 2
    pub fn new(buffer_size: usize, wait_strategy: Arc<W>) -> Result<Self> {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        let available_buffer = (0..buffer_size).map(|_| AtomicI32::new(-1)).collect();

        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::new_with_initial_value()),
            gating_sequences: SequenceGroup::new(),
            gating_sequence_cache: Sequence::new_with_initial_value(),
            available_buffer,
            index_mask: (buffer_size - 1) as i64,
            index_shift: log2(buffer_size),
        })
    }

    /// The wait strategy shared with barriers created by this sequencer
    pub fn wait_strategy(&self) -> &Arc<W> {
        &self.wait_strategy
    }

    #[inline]
    fn calculate_index(&self, sequence: i64) -> usize {
        (sequence & self.index_mask) as usize
    }

    /// Lap number of a sequence, stored in its slot when published
    #[inline]
    fn calculate_availability_flag(&self, sequence: i64) -> i32 {
        (sequence >> self.index_shift) as i32
    }

    #[inline]
    fn set_available(&self, sequence: i64) {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].store(flag, Ordering::Release);
    }

    fn has_available_capacity_from(&self, required_capacity: i64, cursor_value: i64) -> bool {
        let wrap_point = cursor_value + required_capacity - self.buffer_size as i64;
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence = self.gating_sequences.minimum(cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl<W> Cursored for MultiProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    fn get_cursor(&self) -> i64 {
        self.cursor.get()
    }
}

impl<W> Sequenced for MultiProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    fn get_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        self.has_available_capacity_from(required_capacity as i64, self.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.cursor.get();
        let consumed = self.gating_sequences.minimum(produced);
        self.buffer_size as i64 - (produced - consumed)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        validate_claim_size(n, self.buffer_size)?;

        let backoff = Backoff::new();
        loop {
            let current = self.cursor.get();
            let next = current + n;

            let wrap_point = next - self.buffer_size as i64;
            let cached_gating_sequence = self.gating_sequence_cache.get();

            if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
                let gating_sequence = self.gating_sequences.minimum(current);

                if wrap_point > gating_sequence {
                    backoff.snooze();
                    continue;
                }

                self.gating_sequence_cache.set(gating_sequence);
            } else if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        validate_claim_size(n, self.buffer_size)?;

        loop {
            let current = self.cursor.get();
            let next = current + n;

            if !self.has_available_capacity_from(n, current) {
                return Err(DisruptorError::InsufficientCapacity);
            }

            if self.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        for sequence in lo..=hi {
            self.set_available(sequence);
        }
        self.wait_strategy.signal_all_when_blocking();
    }
}

impl<W> Sequencer for MultiProducerSequencer<W>
where
    W: WaitStrategy + 'static,
{
    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.cursor)
    }

    fn claim(&self, sequence: i64) {
        self.cursor.set(sequence);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].load(Ordering::Acquire) == flag
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.gating_sequences
            .add_while_running(&self.cursor, gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.gating_sequences.remove(sequence)
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: Vec<Arc<Sequence>>,
    ) -> Arc<dyn SequenceBarrier> {
        let wait_strategy = Arc::clone(&self.wait_strategy);
        let cursor = Arc::clone(&self.cursor);
        Arc::new(ProcessingSequenceBarrier::new(
            self,
            wait_strategy,
            cursor,
            sequences_to_track,
        ))
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.gating_sequences.minimum(self.cursor.get())
    }

    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64 {
        for sequence in next_sequence..=available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
        }
        available_sequence
    }

    fn gating_sequence_count(&self) -> usize {
        self.gating_sequences.len()
    }
}

impl<W: std::fmt::Debug> std::fmt::Debug for MultiProducerSequencer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiProducerSequencer")
            .field("buffer_size", &self.buffer_size)
            .field("cursor", &self.cursor)
            .field("gating_sequences", &self.gating_sequences)
            .field("wait_strategy", &self.wait_strategy)
            .finish()
    }
}
