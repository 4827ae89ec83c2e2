//! Producer API
//!
//! A [`Producer`] is the publishing handle of a disruptor. Every method follows
//! the same two-phase protocol: claim from the sequencer, write the claimed
//! slots in place, publish.

use crate::disruptor::{
    BatchIterMut, Cursored, EventTranslator, EventTranslatorOneArg, Result, RingBuffer, Sequenced,
    Sequencer,
};
use std::sync::Arc;

/// Handle for publishing events into a ring buffer
///
/// Producers are obtained from [`Disruptor::producer`](crate::disruptor::Disruptor::producer).
/// A single-producer disruptor hands out exactly one; a multi-producer
/// disruptor hands out one per publishing thread.
pub struct Producer<T> {
    ring_buffer: Arc<RingBuffer<T>>,
    sequencer: Arc<dyn Sequencer>,
}

impl<T> Producer<T>
where
    T: Send + Sync,
{
    pub(crate) fn new(ring_buffer: Arc<RingBuffer<T>>, sequencer: Arc<dyn Sequencer>) -> Self {
        Self {
            ring_buffer,
            sequencer,
        }
    }

    fn write_and_publish<F>(&mut self, sequence: i64, update: F) -> i64
    where
        F: FnOnce(&mut T, i64),
    {
        let _publish = PublishOnDrop {
            sequencer: self.sequencer.as_ref(),
            lo: sequence,
            hi: sequence,
        };
        // SAFETY: the sequencer granted this producer exclusive ownership of
        // `sequence` until the guard publishes it.
        let event = unsafe { &mut *self.ring_buffer.get_mut_unchecked(sequence) };
        update(event, sequence);
        sequence
    }

    fn write_and_publish_range<F>(&mut self, n: usize, hi: i64, update: F) -> i64
    where
        F: FnOnce(BatchIterMut<'_, T>),
    {
        let lo = hi - (n as i64 - 1);
        let _publish = PublishOnDrop {
            sequencer: self.sequencer.as_ref(),
            lo,
            hi,
        };
        // SAFETY: the whole range [lo, hi] was claimed by this producer.
        let iter = unsafe { self.ring_buffer.batch_iter_mut(lo, hi) };
        update(iter);
        hi
    }

    /// Publish an event, waiting for a free slot if the ring buffer is full
    ///
    /// # Returns
    /// The sequence the event was published at
    ///
    /// # Examples
    /// ```
    /// use seqflow::disruptor::{BusySpinWaitStrategy, DefaultEventFactory, Disruptor, ProducerType};
    ///
    /// #[derive(Default)]
    /// struct Tick {
    ///     price: f64,
    /// }
    ///
    /// let disruptor = Disruptor::new(
    ///     DefaultEventFactory::<Tick>::new(),
    ///     8,
    ///     ProducerType::Single,
    ///     BusySpinWaitStrategy::new(),
    /// )
    /// .unwrap();
    /// let mut producer = disruptor.producer().unwrap();
    /// let sequence = producer.publish_with(|tick| tick.price = 42.0).unwrap();
    /// assert_eq!(sequence, 0);
    /// ```
    pub fn publish_with<F>(&mut self, update: F) -> Result<i64>
    where
        F: FnOnce(&mut T),
    {
        let sequence = self.sequencer.next()?;
        Ok(self.write_and_publish(sequence, |event, _| update(event)))
    }

    /// Publish an event if a slot is free right now
    ///
    /// # Errors
    /// `DisruptorError::InsufficientCapacity` when the ring buffer is full
    pub fn try_publish_with<F>(&mut self, update: F) -> Result<i64>
    where
        F: FnOnce(&mut T),
    {
        let sequence = self.sequencer.try_next()?;
        Ok(self.write_and_publish(sequence, |event, _| update(event)))
    }

    /// Publish an event populated by a translator
    pub fn publish_event<E>(&mut self, translator: &E) -> Result<i64>
    where
        E: EventTranslator<T>,
    {
        let sequence = self.sequencer.next()?;
        Ok(self.write_and_publish(sequence, |event, sequence| {
            translator.translate_to(event, sequence)
        }))
    }

    /// Publish an event populated by a translator if a slot is free right now
    ///
    /// # Errors
    /// `DisruptorError::InsufficientCapacity` when the ring buffer is full
    pub fn try_publish_event<E>(&mut self, translator: &E) -> Result<i64>
    where
        E: EventTranslator<T>,
    {
        let sequence = self.sequencer.try_next()?;
        Ok(self.write_and_publish(sequence, |event, sequence| {
            translator.translate_to(event, sequence)
        }))
    }

    /// Publish an event populated by a one-argument translator
    pub fn publish_event_with_arg<E, A>(&mut self, translator: &E, arg0: A) -> Result<i64>
    where
        E: EventTranslatorOneArg<T, A>,
    {
        let sequence = self.sequencer.next()?;
        Ok(self.write_and_publish(sequence, |event, sequence| {
            translator.translate_to(event, sequence, arg0)
        }))
    }

    /// Publish `n` events at once, waiting until `n` slots are free
    ///
    /// The whole batch becomes visible to consumers together.
    ///
    /// # Returns
    /// The highest published sequence
    ///
    /// # Errors
    /// `DisruptorError::InvalidClaimSize` if `n` is zero or larger than the buffer
    pub fn batch_publish<F>(&mut self, n: usize, update: F) -> Result<i64>
    where
        F: FnOnce(BatchIterMut<'_, T>),
    {
        let hi = self.sequencer.next_n(n as i64)?;
        Ok(self.write_and_publish_range(n, hi, update))
    }

    /// Publish `n` events at once if `n` slots are free right now
    ///
    /// # Errors
    /// `DisruptorError::InsufficientCapacity` when fewer than `n` slots are free,
    /// `DisruptorError::InvalidClaimSize` if `n` is zero or larger than the buffer
    pub fn try_batch_publish<F>(&mut self, n: usize, update: F) -> Result<i64>
    where
        F: FnOnce(BatchIterMut<'_, T>),
    {
        let hi = self.sequencer.try_next_n(n as i64)?;
        Ok(self.write_and_publish_range(n, hi, update))
    }

    /// Highest sequence claimed so far
    pub fn cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }

    /// Slots currently free for publishing
    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }
}

/// Publishes a claimed range when dropped, including while unwinding
///
/// A claimed sequence that is never published stalls every consumer of a
/// multi-producer ring at that gap.
struct PublishOnDrop<'a> {
    sequencer: &'a dyn Sequencer,
    lo: i64,
    hi: i64,
}

impl Drop for PublishOnDrop<'_> {
    fn drop(&mut self) {
        self.sequencer.publish_range(self.lo, self.hi);
    }
}

impl<T> std::fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("sequencer", &self.sequencer)
            .finish()
    }
}
