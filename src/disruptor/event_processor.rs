//! Event Processor implementation for the Disruptor
//!
//! An event processor owns one consumer thread's loop: wait on the barrier,
//! dispatch the available batch to the handler, then publish its own sequence
//! once for the whole batch.

use crate::disruptor::{
    DisruptorError, EventHandler, ExceptionHandler, FatalExceptionHandler, Result, RingBuffer,
    Sequence, SequenceBarrier,
};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Lifecycle of an event processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessorState {
    /// Not running; `run` may be called
    Idle = 0,
    /// Halt requested; the loop exits at its next alert check
    Halted = 1,
    /// Inside the processing loop
    Running = 2,
}

impl ProcessorState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Halted,
            2 => Self::Running,
            _ => Self::Idle,
        }
    }
}

/// An event processor needs to be an implementation of a runnable that will
/// poll for events from the ring buffer using the appropriate wait strategy
pub trait EventProcessor: Send + Sync {
    /// The sequence tracking this processor's progress
    fn get_sequence(&self) -> Arc<Sequence>;

    /// Signal that this processor should stop when it has finished consuming
    /// at the next clean break
    fn halt(&self);

    /// Withdraw a halt request that no `run` has consumed
    ///
    /// A halt sent after the loop already exited, e.g. on a fatal handler
    /// failure, would otherwise make the next `run` return immediately.
    fn clear_halt(&self);

    /// Whether the processing loop is currently active
    fn is_running(&self) -> bool;

    /// Run the processing loop on the calling thread until halted
    ///
    /// # Errors
    /// `DisruptorError::AlreadyRunning` if another thread is inside `run`, or the
    /// error returned by the exception handler when it halted the processor
    fn run(&self) -> Result<()>;
}

/// Convenience class for handling the batching semantics of consuming entries
/// from a ring buffer and delegating the available events to an [`EventHandler`]
pub struct BatchEventProcessor<T, H> {
    ring_buffer: Arc<RingBuffer<T>>,
    sequence_barrier: Arc<dyn SequenceBarrier>,
    event_handler: Mutex<H>,
    exception_handler: Arc<dyn ExceptionHandler<T>>,
    sequence: Arc<Sequence>,
    state: AtomicU8,
}

impl<T, H> BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    /// Create a processor that halts on the first handler failure
    ///
    /// # Arguments
    /// * `ring_buffer` - Source of the events
    /// * `sequence_barrier` - Barrier the loop waits on
    /// * `event_handler` - Delegate to which events are dispatched
    pub fn new(
        ring_buffer: Arc<RingBuffer<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        event_handler: H,
    ) -> Self {
        Self {
            ring_buffer,
            sequence_barrier,
            event_handler: Mutex::new(event_handler),
            exception_handler: Arc::new(FatalExceptionHandler::new()),
            sequence: Arc::new(Sequence::new_with_initial_value()),
            state: AtomicU8::new(ProcessorState::Idle as u8),
        }
    }

    /// Replace the exception handler
    pub fn with_exception_handler(
        mut self,
        exception_handler: Arc<dyn ExceptionHandler<T>>,
    ) -> Self {
        self.exception_handler = exception_handler;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProcessorState {
        ProcessorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// The barrier this processor waits on
    pub fn sequence_barrier(&self) -> &Arc<dyn SequenceBarrier> {
        &self.sequence_barrier
    }

    fn process_events(&self, handler: &mut H) -> Result<()> {
        let mut next_sequence = self.sequence.get() + 1;

        loop {
            match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available_sequence) => {
                    if available_sequence < next_sequence {
                        continue;
                    }

                    handler.on_batch_start(available_sequence - next_sequence + 1);

                    for sequence in next_sequence..=available_sequence {
                        let event = self.ring_buffer.get(sequence);
                        let end_of_batch = sequence == available_sequence;

                        if let Err(error) = dispatch(handler, event, sequence, end_of_batch) {
                            let outcome = self
                                .exception_handler
                                .handle_event_exception(error, sequence, event);
                            if let Err(fatal) = outcome {
                                self.sequence.set(sequence - 1);
                                return Err(fatal);
                            }
                        }
                    }

                    self.sequence.set(available_sequence);
                    next_sequence = available_sequence + 1;
                }
                Err(DisruptorError::Timeout) => self.notify_timeout(handler)?,
                Err(DisruptorError::Alert) => {
                    if self.state() != ProcessorState::Running {
                        return Ok(());
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn notify_timeout(&self, handler: &mut H) -> Result<()> {
        let sequence = self.sequence.get();
        if let Err(error) = handler.on_timeout(sequence) {
            self.exception_handler
                .handle_event_exception(error, sequence, self.ring_buffer.get(sequence))?;
        }
        Ok(())
    }

    fn notify_start(&self, handler: &mut H) {
        if let Err(error) = handler.on_start() {
            self.exception_handler.handle_on_start_exception(error);
        }
    }

    fn notify_shutdown(&self, handler: &mut H) {
        if let Err(error) = handler.on_shutdown() {
            self.exception_handler.handle_on_shutdown_exception(error);
        }
    }
}

/// Invoke the handler, turning a panic into an error
fn dispatch<T, H>(handler: &mut H, event: &T, sequence: i64, end_of_batch: bool) -> Result<()>
where
    H: EventHandler<T>,
{
    match catch_unwind(AssertUnwindSafe(|| {
        handler.on_event(event, sequence, end_of_batch)
    })) {
        Ok(result) => result,
        Err(payload) => Err(DisruptorError::HandlerPanic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<T, H> EventProcessor for BatchEventProcessor<T, H>
where
    T: Send + Sync + 'static,
    H: EventHandler<T>,
{
    fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        self.state
            .store(ProcessorState::Halted as u8, Ordering::SeqCst);
        self.sequence_barrier.alert();
    }

    fn clear_halt(&self) {
        let _ = self.state.compare_exchange(
            ProcessorState::Halted as u8,
            ProcessorState::Idle as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    fn is_running(&self) -> bool {
        self.state() == ProcessorState::Running
    }

    fn run(&self) -> Result<()> {
        if let Err(previous) = self.state.compare_exchange(
            ProcessorState::Idle as u8,
            ProcessorState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            if previous == ProcessorState::Running as u8 {
                return Err(DisruptorError::AlreadyRunning);
            }

            // Halted before it ever ran
            let mut handler = self.event_handler.lock();
            self.notify_start(&mut handler);
            self.notify_shutdown(&mut handler);
            self.state
                .store(ProcessorState::Idle as u8, Ordering::SeqCst);
            return Ok(());
        }

        self.sequence_barrier.clear_alert();

        let mut handler = self.event_handler.lock();
        self.notify_start(&mut handler);
        debug!(sequence = self.sequence.get(), "Event processor started");

        let result = if self.state() == ProcessorState::Running {
            self.process_events(&mut handler)
        } else {
            Ok(())
        };

        self.notify_shutdown(&mut handler);
        self.state
            .store(ProcessorState::Idle as u8, Ordering::SeqCst);
        debug!(sequence = self.sequence.get(), "Event processor stopped");

        result
    }
}

impl<T, H> std::fmt::Debug for BatchEventProcessor<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEventProcessor")
            .field("sequence", &self.sequence)
            .field("state", &ProcessorState::from_u8(self.state.load(Ordering::Relaxed)))
            .field("sequence_barrier", &self.sequence_barrier)
            .finish()
    }
}
