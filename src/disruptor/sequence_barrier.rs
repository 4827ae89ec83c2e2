//! Sequence Barrier Implementation
//!
//! A barrier is what an event processor waits on. It combines the wait
//! strategy, the upstream sequences a consumer must not overtake and the
//! sequencer's view of what has actually been published. It also carries the
//! alert flag used to cancel a waiting consumer.

use crate::disruptor::{DisruptorError, Result, Sequence, Sequencer, WaitStrategy};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coordination barrier for tracking the cursor of producers and the sequences
/// of dependent event processors
pub trait SequenceBarrier: Send + Sync + std::fmt::Debug {
    /// Wait for the given sequence to be available for consumption
    ///
    /// # Returns
    /// The highest sequence that can be read. It may be lower than `sequence`
    /// when a multi-producer sequencer has claimed but not yet published the
    /// requested slot; callers retry in that case.
    ///
    /// # Errors
    /// `DisruptorError::Alert` once the barrier has been alerted, or
    /// `DisruptorError::Timeout` from a wait strategy with a deadline
    fn wait_for(&self, sequence: i64) -> Result<i64>;

    /// Minimum of the sequences this barrier depends on
    fn get_cursor(&self) -> i64;

    /// The current alert status for the barrier
    fn is_alerted(&self) -> bool;

    /// Alert the event processors of a status change and stay in this status
    /// until cleared
    fn alert(&self);

    /// Clear the current alert status
    fn clear_alert(&self);

    /// Check if an alert has been raised
    ///
    /// # Errors
    /// `DisruptorError::Alert` if the barrier is alerted
    fn check_alert(&self) -> Result<()>;
}

/// [`SequenceBarrier`] handed out to event processors by a sequencer
///
/// Generic over the sequencer and the wait strategy so the wait loop is
/// statically dispatched.
pub struct ProcessingSequenceBarrier<S, W> {
    sequencer: Arc<S>,
    wait_strategy: Arc<W>,
    cursor: Arc<Sequence>,
    dependent_sequences: Vec<Arc<Sequence>>,
    alerted: CachePadded<AtomicBool>,
}

impl<S, W> ProcessingSequenceBarrier<S, W>
where
    S: Sequencer,
    W: WaitStrategy,
{
    /// Create a barrier
    ///
    /// # Arguments
    /// * `sequencer` - Answers which claimed sequences are published
    /// * `wait_strategy` - How to wait for the cursor
    /// * `cursor` - The sequencer's cursor
    /// * `dependent_sequences` - Upstream sequences; when empty the barrier
    ///   depends on the cursor alone
    pub fn new(
        sequencer: Arc<S>,
        wait_strategy: Arc<W>,
        cursor: Arc<Sequence>,
        dependent_sequences: Vec<Arc<Sequence>>,
    ) -> Self {
        let dependent_sequences = if dependent_sequences.is_empty() {
            vec![Arc::clone(&cursor)]
        } else {
            dependent_sequences
        };

        Self {
            sequencer,
            wait_strategy,
            cursor,
            dependent_sequences,
            alerted: CachePadded::new(AtomicBool::new(false)),
        }
    }

    /// The sequences this barrier waits on
    pub fn dependent_sequences(&self) -> &[Arc<Sequence>] {
        &self.dependent_sequences
    }
}

impl<S, W> SequenceBarrier for ProcessingSequenceBarrier<S, W>
where
    S: Sequencer,
    W: WaitStrategy,
{
    fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence = self.wait_strategy.wait_for(
            sequence,
            &self.cursor,
            &self.dependent_sequences,
            &self.alerted,
        )?;

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    fn get_cursor(&self) -> i64 {
        Sequence::get_minimum_sequence(&self.dependent_sequences, i64::MAX)
    }

    fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    fn alert(&self) {
        self.alerted.store(true, Ordering::SeqCst);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn clear_alert(&self) {
        self.alerted.store(false, Ordering::SeqCst);
    }

    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(DisruptorError::Alert)
        } else {
            Ok(())
        }
    }
}

impl<S, W> std::fmt::Debug for ProcessingSequenceBarrier<S, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingSequenceBarrier")
            .field("cursor", &self.cursor)
            .field("dependent_sequences", &self.dependent_sequences)
            .field("alerted", &self.alerted.load(Ordering::Relaxed))
            .finish()
    }
}
