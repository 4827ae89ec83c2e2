//! Disruptor Main Class Implementation
//!
//! The [`Disruptor`] is the entry point for wiring a ring buffer, its sequencer
//! and a graph of event processors. Handlers are added through a small DSL:
//!
//! ```
//! use seqflow::disruptor::{
//!     BlockingWaitStrategy, ClosureEventHandler, DefaultEventFactory, Disruptor, ProducerType,
//! };
//!
//! #[derive(Default)]
//! struct Order {
//!     id: u64,
//! }
//!
//! let mut disruptor = Disruptor::new(
//!     DefaultEventFactory::<Order>::new(),
//!     1024,
//!     ProducerType::Single,
//!     BlockingWaitStrategy::new(),
//! )
//! .unwrap()
//! .handle_events_with(ClosureEventHandler::new(|_order: &Order, _seq: i64, _eob: bool| Ok(())))
//! .and(ClosureEventHandler::new(|_order: &Order, _seq: i64, _eob: bool| Ok(())))
//! .then(ClosureEventHandler::new(|_order: &Order, _seq: i64, _eob: bool| Ok(())))
//! .build();
//!
//! disruptor.start().unwrap();
//! let mut producer = disruptor.producer().unwrap();
//! producer.publish_with(|order| order.id = 7).unwrap();
//! disruptor.shutdown().unwrap();
//! ```

use crate::disruptor::config::DEFAULT_THREAD_NAME_PREFIX;
use crate::disruptor::{
    BatchEventProcessor, Cursored, DisruptorConfig, DisruptorError, EventFactory, EventHandler,
    EventPoller, EventProcessor, ExceptionHandler, FatalExceptionHandler, ManagedThread,
    MultiProducerSequencer, Producer, ProducerType, Result, RingBuffer, Sequence, Sequenced,
    Sequencer, SingleProducerSequencer, ThreadBuilder, WaitStrategy,
};
use crossbeam_utils::Backoff;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The main Disruptor class
///
/// Owns the ring buffer, the sequencer and every event processor wired through
/// [`Disruptor::handle_events_with`]. Processors run on their own threads
/// between [`Disruptor::start`] and [`Disruptor::halt`] / [`Disruptor::shutdown`].
///
/// # Type Parameters
/// * `T` - The event type stored in the ring buffer
pub struct Disruptor<T> {
    ring_buffer: Arc<RingBuffer<T>>,
    sequencer: Arc<dyn Sequencer>,
    producer_type: ProducerType,
    producer_taken: AtomicBool,
    exception_handler: Arc<DefaultExceptionHandler<T>>,
    processors: Vec<Arc<dyn EventProcessor>>,
    threads: Vec<ManagedThread>,
    started: bool,
    thread_name_prefix: String,
    cpu_affinity: Option<Vec<usize>>,
}

impl<T> Disruptor<T>
where
    T: Send + Sync + 'static,
{
    /// Create a new Disruptor
    ///
    /// # Arguments
    /// * `event_factory` - Factory pre-populating every slot
    /// * `buffer_size` - Size of the ring buffer (must be a power of 2)
    /// * `producer_type` - Whether to use single or multi producer sequencing
    /// * `wait_strategy` - Strategy consumers use to wait for events
    ///
    /// # Errors
    /// `DisruptorError::InvalidBufferSize` if the buffer size is zero or not a power of 2
    pub fn new<F, W>(
        event_factory: F,
        buffer_size: usize,
        producer_type: ProducerType,
        wait_strategy: W,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
        W: WaitStrategy + 'static,
    {
        let ring_buffer = Arc::new(RingBuffer::new(buffer_size, event_factory)?);

        let wait_strategy = Arc::new(wait_strategy);
        let sequencer: Arc<dyn Sequencer> = match producer_type {
            ProducerType::Single => Arc::new(SingleProducerSequencer::new(buffer_size, wait_strategy)?),
            ProducerType::Multi => Arc::new(MultiProducerSequencer::new(buffer_size, wait_strategy)?),
        };

        debug!(buffer_size, %producer_type, "Created disruptor");

        Ok(Self {
            ring_buffer,
            sequencer,
            producer_type,
            producer_taken: AtomicBool::new(false),
            exception_handler: Arc::new(DefaultExceptionHandler::new()),
            processors: Vec::new(),
            threads: Vec::new(),
            started: false,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            cpu_affinity: None,
        })
    }

    /// Create a Disruptor from runtime configuration
    ///
    /// The wait strategy is boxed, so waiting goes through dynamic dispatch.
    ///
    /// # Errors
    /// Anything [`DisruptorConfig::validate`] rejects
    pub fn from_config<F>(event_factory: F, config: &DisruptorConfig) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        config.validate()?;

        let mut disruptor = Self::new(
            event_factory,
            config.buffer_size,
            config.producer_type,
            config.wait_strategy.build(),
        )?;
        disruptor.thread_name_prefix = config.thread_name_prefix.clone();
        disruptor.cpu_affinity = config.cpu_affinity.clone();
        Ok(disruptor)
    }

    /// Name processor threads `{prefix}-processor-{index}`
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Pin the processor threads to CPU cores, in the order they were wired
    pub fn with_cpu_affinity(mut self, cores: Vec<usize>) -> Self {
        self.cpu_affinity = Some(cores);
        self
    }

    /// Set up event handlers to handle events from the ring buffer
    ///
    /// The handler becomes the first processor of a new stage that follows the
    /// producer cursor directly. Must be called before [`Disruptor::start`].
    pub fn handle_events_with<H>(self, event_handler: H) -> DisruptorBuilder<T>
    where
        H: EventHandler<T> + 'static,
    {
        let mut builder = DisruptorBuilder {
            disruptor: self,
            upstream: Vec::new(),
            current_stage: Vec::new(),
        };
        builder.add_processor(event_handler);
        builder
    }

    /// Replace the exception handler used by every processor
    ///
    /// Applies to processors already wired as well as those added later.
    /// Defaults to [`FatalExceptionHandler`].
    pub fn set_default_exception_handler(&self, exception_handler: Arc<dyn ExceptionHandler<T>>) {
        self.exception_handler.replace(exception_handler);
    }

    /// Hand out a publishing handle
    ///
    /// # Errors
    /// `DisruptorError::InvalidConfig` when a single producer disruptor is asked
    /// for a second producer
    pub fn producer(&self) -> Result<Producer<T>> {
        if self.producer_type.is_single() && self.producer_taken.swap(true, Ordering::AcqRel) {
            return Err(DisruptorError::InvalidConfig(
                "single producer disruptor has already handed out its producer".to_string(),
            ));
        }
        Ok(Producer::new(
            Arc::clone(&self.ring_buffer),
            Arc::clone(&self.sequencer),
        ))
    }

    /// Create a pull-style consumer
    ///
    /// The poller is registered as a gating sequence, starting at the current
    /// cursor, so it sees events published after this call. `gating_sequences`
    /// are upstream consumers the poller must not overtake.
    pub fn new_poller(&self, gating_sequences: Vec<Arc<Sequence>>) -> EventPoller<T, RingBuffer<T>> {
        let poller = EventPoller::new(
            Arc::clone(&self.ring_buffer),
            Arc::clone(&self.sequencer),
            gating_sequences,
        );
        self.sequencer.add_gating_sequences(&[poller.get_sequence()]);
        poller
    }

    /// Start every wired event processor on its own thread
    ///
    /// # Errors
    /// * `DisruptorError::AlreadyStarted` if the processors are running
    /// * `DisruptorError::MissingGatingSequences` if processors are wired but
    ///   nothing keeps producers from overwriting unread events
    /// * `DisruptorError::InvalidConfig` for an unavailable affinity core
    /// * `DisruptorError::ThreadSpawn` if a thread cannot be created
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(DisruptorError::AlreadyStarted);
        }
        if !self.processors.is_empty() && self.sequencer.gating_sequence_count() == 0 {
            return Err(DisruptorError::MissingGatingSequences);
        }

        for processor in &self.processors {
            processor.clear_halt();
        }
        for index in 0..self.processors.len() {
            if let Err(error) = self.spawn_processor(index) {
                self.halt_and_join();
                return Err(error);
            }
        }

        self.started = true;
        debug!(processors = self.processors.len(), "Disruptor started");
        Ok(())
    }

    fn spawn_processor(&mut self, index: usize) -> Result<()> {
        let mut builder = ThreadBuilder::new()
            .thread_name(format!("{}-processor-{}", self.thread_name_prefix, index));
        if let Some(&core_id) = self.cpu_affinity.as_ref().and_then(|cores| cores.get(index)) {
            builder = builder.pin_at_core(core_id)?;
        }

        let processor = Arc::clone(&self.processors[index]);
        let thread = builder.spawn(move || {
            if let Err(error) = processor.run() {
                warn!(%error, "Event processor stopped with error");
            }
        })?;
        self.threads.push(thread);
        Ok(())
    }

    /// Stop every processor at its next alert check and join the threads
    ///
    /// Events that were published but not yet consumed stay in the ring buffer;
    /// a later [`Disruptor::start`] resumes from each processor's sequence.
    pub fn halt(&mut self) {
        self.halt_and_join();
        if self.started {
            self.started = false;
            debug!(cursor = self.cursor(), "Disruptor halted");
        }
    }

    fn halt_and_join(&mut self) {
        // Threads are pushed in processor order; an exited thread needs no halt
        for (index, processor) in self.processors.iter().enumerate() {
            if self.threads.get(index).is_some_and(ManagedThread::is_running) {
                processor.halt();
            }
        }
        for thread in self.threads.drain(..) {
            let name = thread.thread_name().to_string();
            if let Err(error) = thread.join() {
                warn!(thread = %name, %error, "Processor thread did not exit cleanly");
            }
        }
    }

    /// Wait until every processor has consumed all published events, then halt
    ///
    /// Processors whose thread already exited, e.g. after a fatal handler
    /// failure, are not waited for.
    pub fn shutdown(&mut self) -> Result<()> {
        self.drain(None)?;
        self.halt();
        Ok(())
    }

    /// Like [`Disruptor::shutdown`], but give up after `timeout`
    ///
    /// # Errors
    /// `DisruptorError::Timeout` if the processors did not catch up in time.
    /// They keep running in that case.
    pub fn shutdown_with_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.drain(Some(Instant::now() + timeout))?;
        self.halt();
        Ok(())
    }

    fn drain(&self, deadline: Option<Instant>) -> Result<()> {
        let backoff = Backoff::new();
        while self.has_backlog() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(DisruptorError::Timeout);
            }
            if backoff.is_completed() {
                thread::sleep(Duration::from_micros(100));
            } else {
                backoff.snooze();
            }
        }
        Ok(())
    }

    fn has_backlog(&self) -> bool {
        let cursor = self.sequencer.get_cursor();
        self.processors
            .iter()
            .zip(&self.threads)
            .any(|(processor, thread)| thread.is_running() && processor.get_sequence().get() < cursor)
    }

    /// The ring buffer
    pub fn ring_buffer(&self) -> &Arc<RingBuffer<T>> {
        &self.ring_buffer
    }

    /// The sequencer
    pub fn sequencer(&self) -> &Arc<dyn Sequencer> {
        &self.sequencer
    }

    /// Current value of the producer cursor
    pub fn cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }

    /// Size of the ring buffer
    pub fn buffer_size(&self) -> usize {
        self.sequencer.get_buffer_size()
    }

    /// Slots currently free for publishing
    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    pub fn producer_type(&self) -> ProducerType {
        self.producer_type
    }

    /// Whether the processor threads are running
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Sequences of every wired processor, in wiring order
    pub fn processor_sequences(&self) -> Vec<Arc<Sequence>> {
        self.processors.iter().map(|p| p.get_sequence()).collect()
    }
}

impl<T> Drop for Disruptor<T> {
    fn drop(&mut self) {
        for processor in &self.processors {
            processor.halt();
        }
    }
}

impl<T> std::fmt::Debug for Disruptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disruptor")
            .field("sequencer", &self.sequencer)
            .field("processors", &self.processors.len())
            .field("started", &self.started)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .finish()
    }
}

/// Builder for configuring Disruptor event processing chains
///
/// Produced by [`Disruptor::handle_events_with`]. [`DisruptorBuilder::and`]
/// adds a processor running in parallel with the current stage,
/// [`DisruptorBuilder::then`] starts a stage that only sees events once every
/// processor of the current stage has handled them.
pub struct DisruptorBuilder<T> {
    disruptor: Disruptor<T>,
    /// Sequences the current stage's barriers track, empty for the cursor
    upstream: Vec<Arc<Sequence>>,
    current_stage: Vec<Arc<Sequence>>,
}

impl<T> DisruptorBuilder<T>
where
    T: Send + Sync + 'static,
{
    fn add_processor<H>(&mut self, event_handler: H)
    where
        H: EventHandler<T> + 'static,
    {
        let disruptor = &mut self.disruptor;
        let barrier = Arc::clone(&disruptor.sequencer).new_barrier(self.upstream.clone());
        let processor = BatchEventProcessor::new(
            Arc::clone(&disruptor.ring_buffer),
            barrier,
            event_handler,
        )
        .with_exception_handler(Arc::clone(&disruptor.exception_handler) as Arc<dyn ExceptionHandler<T>>);

        self.current_stage.push(processor.get_sequence());
        disruptor.processors.push(Arc::new(processor));
    }

    /// Add a handler that consumes in parallel with the current stage
    pub fn and<H>(mut self, event_handler: H) -> Self
    where
        H: EventHandler<T> + 'static,
    {
        self.add_processor(event_handler);
        self
    }

    /// Add a handler that runs after every handler of the current stage
    pub fn then<H>(mut self, event_handler: H) -> Self
    where
        H: EventHandler<T> + 'static,
    {
        self.upstream = std::mem::take(&mut self.current_stage);
        self.add_processor(event_handler);
        self
    }

    /// Finish wiring
    ///
    /// The processors of the last stage become the gating sequences of the
    /// sequencer.
    pub fn build(self) -> Disruptor<T> {
        self.disruptor
            .sequencer
            .add_gating_sequences(&self.current_stage);
        self.disruptor
    }
}

/// Exception handler shared by all processors of a disruptor, replaceable at
/// any time through [`Disruptor::set_default_exception_handler`]
struct DefaultExceptionHandler<T> {
    delegate: RwLock<Arc<dyn ExceptionHandler<T>>>,
}

impl<T: 'static> DefaultExceptionHandler<T> {
    fn new() -> Self {
        Self {
            delegate: RwLock::new(Arc::new(FatalExceptionHandler::new())),
        }
    }
}

impl<T> DefaultExceptionHandler<T> {
    fn replace(&self, exception_handler: Arc<dyn ExceptionHandler<T>>) {
        *self.delegate.write() = exception_handler;
    }

    fn current(&self) -> Arc<dyn ExceptionHandler<T>> {
        Arc::clone(&self.delegate.read())
    }
}

impl<T> ExceptionHandler<T> for DefaultExceptionHandler<T> {
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: &T) -> Result<()> {
        self.current().handle_event_exception(error, sequence, event)
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        self.current().handle_on_start_exception(error);
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        self.current().handle_on_shutdown_exception(error);
    }
}
