//! Event Poller Implementation
//!
//! A pull-style consumer. Instead of a dedicated thread blocking on a barrier,
//! the owner calls [`EventPoller::poll`] whenever it wants to drain what is
//! available.

use crate::disruptor::{Cursored, DataProvider, Result, Sequence, Sequencer};
use std::marker::PhantomData;
use std::sync::Arc;

/// Outcome of a single [`EventPoller::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// At least one event was handed to the handler
    Processing,
    /// The producer published more, but an upstream gating sequence has not
    /// released it yet
    Gating,
    /// Nothing new was published
    Idle,
}

/// Experimental poll-based interface for the Disruptor
///
/// The poller's sequence is not registered anywhere on creation. Add it to the
/// sequencer's gating sequences, or producers will overwrite unread events.
pub struct EventPoller<T, D> {
    data_provider: Arc<D>,
    sequencer: Arc<dyn Sequencer>,
    sequence: Arc<Sequence>,
    gating_sequences: Vec<Arc<Sequence>>,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, D> EventPoller<T, D>
where
    D: DataProvider<T>,
{
    /// Create a poller
    ///
    /// # Arguments
    /// * `data_provider` - Where events are read from
    /// * `sequencer` - Sequencer of the ring buffer
    /// * `gating_sequences` - Upstream sequences the poller must not overtake in
    ///   addition to the cursor
    pub fn new(
        data_provider: Arc<D>,
        sequencer: Arc<dyn Sequencer>,
        gating_sequences: Vec<Arc<Sequence>>,
    ) -> Self {
        let mut gating = Vec::with_capacity(gating_sequences.len() + 1);
        gating.push(sequencer.cursor_sequence());
        gating.extend(gating_sequences);

        Self {
            data_provider,
            sequencer,
            sequence: Arc::new(Sequence::new_with_initial_value()),
            gating_sequences: gating,
            _phantom: PhantomData,
        }
    }

    /// The sequence tracking what this poller has consumed
    pub fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    /// Hand every currently available event to `handler`
    ///
    /// The handler receives `(event, sequence, end_of_batch)` and returns
    /// whether polling should continue with the next event. The poller's
    /// sequence is advanced past every event the handler accepted, including
    /// when the handler stops early.
    ///
    /// # Errors
    /// Propagates the handler's error. The failing event is not marked consumed.
    pub fn poll<F>(&mut self, mut handler: F) -> Result<PollState>
    where
        F: FnMut(&T, i64, bool) -> Result<bool>,
    {
        let current_sequence = self.sequence.get();
        let mut next_sequence = current_sequence + 1;
        let available_sequence = self.sequencer.get_highest_published_sequence(
            next_sequence,
            Sequence::get_minimum_sequence(&self.gating_sequences, i64::MAX),
        );

        if next_sequence <= available_sequence {
            let mut processed_sequence = current_sequence;
            let mut result = Ok(PollState::Processing);

            while next_sequence <= available_sequence {
                let event = self.data_provider.get(next_sequence);
                match handler(event, next_sequence, next_sequence == available_sequence) {
                    Ok(process_next) => {
                        processed_sequence = next_sequence;
                        next_sequence += 1;
                        if !process_next {
                            break;
                        }
                    }
                    Err(error) => {
                        result = Err(error);
                        break;
                    }
                }
            }

            self.sequence.set(processed_sequence);
            result
        } else if self.sequencer.get_cursor() >= next_sequence {
            Ok(PollState::Gating)
        } else {
            Ok(PollState::Idle)
        }
    }
}

impl<T, D> std::fmt::Debug for EventPoller<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPoller")
            .field("sequence", &self.sequence)
            .field("gating_sequences", &self.gating_sequences)
            .finish()
    }
}
