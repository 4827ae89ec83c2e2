//! Event Handler Implementation
//!
//! Callbacks invoked by a [`BatchEventProcessor`](crate::disruptor::BatchEventProcessor)
//! for every available event, plus the lifecycle hooks around the processing loop.

use crate::disruptor::Result;
use std::marker::PhantomData;

/// Callback interface for processing events as they become available
///
/// Handlers receive a shared reference to the event. Several processors in the
/// same stage may read the same slot concurrently, so state that a later stage
/// must observe belongs in interior-mutable fields of the event.
///
/// # Examples
/// ```
/// use seqflow::disruptor::{EventHandler, Result};
///
/// #[derive(Default)]
/// struct PriceEvent {
///     price: u64,
/// }
///
/// #[derive(Default)]
/// struct Journal {
///     pending: Vec<u64>,
///     flushed: usize,
/// }
///
/// impl EventHandler<PriceEvent> for Journal {
///     fn on_event(&mut self, event: &PriceEvent, _sequence: i64, end_of_batch: bool) -> Result<()> {
///         self.pending.push(event.price);
///         if end_of_batch {
///             self.flushed += self.pending.len();
///             self.pending.clear();
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait EventHandler<T>: Send {
    /// Called when a publisher has published an event
    ///
    /// # Arguments
    /// * `event` - Published to the ring buffer
    /// * `sequence` - Of the event being processed
    /// * `end_of_batch` - True if this is the last event in a batch from the ring buffer.
    ///   Lets the handler defer expensive work such as flushing to batch boundaries.
    ///
    /// # Errors
    /// Any error is routed to the processor's exception handler, which decides
    /// whether processing continues.
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()>;

    /// Invoked before each batch with the number of events it will contain
    fn on_batch_start(&mut self, _batch_size: i64) {}

    /// Called once on the processor thread before the first event
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once on the processor thread just before it exits
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when the wait strategy timed out waiting for `sequence`
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }
}

/// Event handler backed by a closure
///
/// Closure parameters usually need explicit types:
///
/// ```
/// use seqflow::disruptor::ClosureEventHandler;
///
/// let handler = ClosureEventHandler::new(|event: &i64, _sequence: i64, _end_of_batch: bool| {
///     assert!(*event >= 0);
///     Ok(())
/// });
/// # let _ = handler;
/// ```
pub struct ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    handler: F,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, F> ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    /// Create a new closure-based event handler
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> EventHandler<T> for ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()> {
        (self.handler)(event, sequence, end_of_batch)
    }
}

/// A handler that does nothing, for measuring framework overhead
pub struct NoOpEventHandler<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T> NoOpEventHandler<T> {
    /// Create a new no-op event handler
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for NoOpEventHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventHandler<T> for NoOpEventHandler<T> {
    fn on_event(&mut self, _event: &T, _sequence: i64, _end_of_batch: bool) -> Result<()> {
        Ok(())
    }
}
