//! Exception Handler Implementation
//!
//! Exception handlers decide what a processor does after a handler failure.
//! Returning `Ok` from [`ExceptionHandler::handle_event_exception`] continues
//! with the next sequence; returning `Err` halts the processor.

use crate::disruptor::{DisruptorError, Result};
use std::marker::PhantomData;
use tracing::{error, warn};

/// Callback handler for uncaught failures in the event processing cycle
pub trait ExceptionHandler<T>: Send + Sync {
    /// Strategy for handling a failure raised while processing an event
    ///
    /// # Arguments
    /// * `error` - The failure, `DisruptorError::HandlerPanic` for a caught panic
    /// * `sequence` - Of the event which caused the failure
    /// * `event` - Being processed when the failure occurred
    ///
    /// # Errors
    /// Returning an error halts the processor. Its sequence stays just before
    /// the failing event, so a later run starts again at that event.
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: &T)
        -> Result<()>;

    /// Callback to notify of a failure during `on_start`
    fn handle_on_start_exception(&self, error: DisruptorError);

    /// Callback to notify of a failure during `on_shutdown`
    fn handle_on_shutdown_exception(&self, error: DisruptorError);
}

/// Logs the failure and halts the processor
///
/// The default for every processor that has no handler set.
pub struct FatalExceptionHandler<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T> FatalExceptionHandler<T> {
    /// Create a new fatal exception handler
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for FatalExceptionHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ExceptionHandler<T> for FatalExceptionHandler<T> {
    fn handle_event_exception(
        &self,
        error: DisruptorError,
        sequence: i64,
        _event: &T,
    ) -> Result<()> {
        error!(sequence, %error, "Exception processing event, halting processor");
        Err(error)
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        error!(%error, "Exception during on_start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        error!(%error, "Exception during on_shutdown");
    }
}

impl<T> std::fmt::Debug for FatalExceptionHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FatalExceptionHandler")
    }
}

/// Logs the failure at warn level and keeps processing
pub struct IgnoreExceptionHandler<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T> IgnoreExceptionHandler<T> {
    /// Create a new ignore exception handler
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for IgnoreExceptionHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ExceptionHandler<T> for IgnoreExceptionHandler<T> {
    fn handle_event_exception(
        &self,
        error: DisruptorError,
        sequence: i64,
        _event: &T,
    ) -> Result<()> {
        warn!(sequence, %error, "Exception processing event, skipping it");
        Ok(())
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        warn!(%error, "Exception during on_start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        warn!(%error, "Exception during on_shutdown");
    }
}

impl<T> std::fmt::Debug for IgnoreExceptionHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IgnoreExceptionHandler")
    }
}

/// Exception handler built from closures
///
/// Lifecycle failures are logged unless closures are supplied for them with
/// [`ClosureExceptionHandler::on_start`] and [`ClosureExceptionHandler::on_shutdown`].
pub struct ClosureExceptionHandler<T, F>
where
    F: Fn(DisruptorError, i64, &T) -> Result<()> + Send + Sync,
{
    event_handler: F,
    start_handler: Option<Box<dyn Fn(DisruptorError) + Send + Sync>>,
    shutdown_handler: Option<Box<dyn Fn(DisruptorError) + Send + Sync>>,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, F> ClosureExceptionHandler<T, F>
where
    F: Fn(DisruptorError, i64, &T) -> Result<()> + Send + Sync,
{
    /// Create a handler that delegates event failures to `event_handler`
    pub fn new(event_handler: F) -> Self {
        Self {
            event_handler,
            start_handler: None,
            shutdown_handler: None,
            _phantom: PhantomData,
        }
    }

    /// Handle `on_start` failures with a closure
    pub fn on_start<S>(mut self, start_handler: S) -> Self
    where
        S: Fn(DisruptorError) + Send + Sync + 'static,
    {
        self.start_handler = Some(Box::new(start_handler));
        self
    }

    /// Handle `on_shutdown` failures with a closure
    pub fn on_shutdown<S>(mut self, shutdown_handler: S) -> Self
    where
        S: Fn(DisruptorError) + Send + Sync + 'static,
    {
        self.shutdown_handler = Some(Box::new(shutdown_handler));
        self
    }
}

impl<T, F> ExceptionHandler<T> for ClosureExceptionHandler<T, F>
where
    F: Fn(DisruptorError, i64, &T) -> Result<()> + Send + Sync,
{
    fn handle_event_exception(
        &self,
        error: DisruptorError,
        sequence: i64,
        event: &T,
    ) -> Result<()> {
        (self.event_handler)(error, sequence, event)
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        match &self.start_handler {
            Some(handler) => handler(error),
            None => error!(%error, "Exception during on_start"),
        }
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        match &self.shutdown_handler {
            Some(handler) => handler(error),
            None => error!(%error, "Exception during on_shutdown"),
        }
    }
}
