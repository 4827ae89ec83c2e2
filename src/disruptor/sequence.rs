//! Sequence implementation for the Disruptor
//!
//! The Sequence is used to track progress through the ring buffer and coordinate
//! between producers and consumers. Every write is a release store and every read
//! an acquire load, which is the only visibility mechanism the engine relies on.

use arc_swap::ArcSwap;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A sequence number that occupies its own cache line
///
/// The atomic value is wrapped in [`CachePadded`] so that two sequences owned by
/// different threads never share a cache line.
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    /// Create a new sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(initial_value)),
        }
    }

    /// Create a new sequence at [`INITIAL_CURSOR_VALUE`](crate::disruptor::INITIAL_CURSOR_VALUE)
    pub fn new_with_initial_value() -> Self {
        Self::new(crate::disruptor::INITIAL_CURSOR_VALUE)
    }

    /// Get the current sequence value
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Set the sequence value
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Set the sequence value with a full fence, ordering it before any later load
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Atomically replace `expected` with `new`
    ///
    /// # Returns
    /// True if the value was `expected` and has been replaced
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Increment and get the new value
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Add a value and get the new result
    #[inline]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel) + increment
    }

    /// Get the current value and then add
    #[inline]
    pub fn get_and_add(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel)
    }

    /// Minimum value over a set of sequences
    ///
    /// # Arguments
    /// * `sequences` - The sequences to compare
    /// * `default` - Returned when `sequences` is empty, and an upper bound otherwise
    pub fn get_minimum_sequence(sequences: &[Arc<Sequence>], default: i64) -> i64 {
        sequences
            .iter()
            .fold(default, |minimum, sequence| minimum.min(sequence.get()))
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new_with_initial_value()
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("value", &self.get())
            .finish()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A group of sequences that can be tracked together
///
/// Membership is stored as an immutable snapshot swapped atomically on change,
/// so readers on the hot path never take a lock. Mutation is expected to be rare
/// (wiring at startup, removal at shutdown) and may race with readers safely.
pub struct SequenceGroup {
    sequences: ArcSwap<Vec<Arc<Sequence>>>,
}

impl SequenceGroup {
    /// Create a new empty sequence group
    pub fn new() -> Self {
        Self {
            sequences: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add sequences to the group
    pub fn add(&self, sequences: &[Arc<Sequence>]) {
        self.sequences.rcu(|current| {
            let mut updated = Vec::with_capacity(current.len() + sequences.len());
            updated.extend(current.iter().cloned());
            updated.extend(sequences.iter().cloned());
            updated
        });
    }

    /// Add sequences that start tracking from the cursor's current position
    ///
    /// Each added sequence is moved to the cursor value so that a consumer joining
    /// a live ring buffer does not gate producers from the very beginning.
    pub fn add_while_running(&self, cursor: &Sequence, sequences: &[Arc<Sequence>]) {
        let position = cursor.get();
        for sequence in sequences {
            sequence.set(position);
        }
        self.add(sequences);
        let position = cursor.get();
        for sequence in sequences {
            sequence.set(position);
        }
    }

    /// Remove every occurrence of a sequence from the group
    ///
    /// # Returns
    /// True if at least one occurrence was removed
    pub fn remove(&self, sequence: &Arc<Sequence>) -> bool {
        let previous = self.sequences.rcu(|current| {
            current
                .iter()
                .filter(|s| !Arc::ptr_eq(s, sequence))
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.iter().any(|s| Arc::ptr_eq(s, sequence))
    }

    /// Get the minimum sequence value from all sequences in the group
    ///
    /// # Arguments
    /// * `default` - Returned when the group is empty
    #[inline]
    pub fn minimum(&self, default: i64) -> i64 {
        Sequence::get_minimum_sequence(&self.sequences.load(), default)
    }

    /// Get the number of sequences in the group
    pub fn len(&self) -> usize {
        self.sequences.load().len()
    }

    /// Check if the group is empty
    pub fn is_empty(&self) -> bool {
        self.sequences.load().is_empty()
    }

    /// Current membership as an immutable snapshot
    pub fn snapshot(&self) -> Arc<Vec<Arc<Sequence>>> {
        self.sequences.load_full()
    }
}

impl Default for SequenceGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequenceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sequences.load().iter()).finish()
    }
}
