//! `SeqFlow` - Lock-free Sequencing Engine
//!
//! Passes events between threads through a pre-allocated ring buffer, in the
//! style of the LMAX Disruptor. Producers claim slots by sequence number, write
//! them in place and publish; consumers wait on barriers and process whatever
//! is available in batches.
//!
//! ## Features
//!
//! - **Lock-free publishing**: claims and publishes are atomic operations only
//! - **Zero-allocation**: every event is pre-allocated at construction
//! - **Single and multi producer** sequencing
//! - **Dependency graphs**: consumers can run in parallel or after each other
//! - **Pluggable waiting**: busy spin, yielding, sleeping, blocking and timeout blocking
//!
//! ## Quick Start
//!
//! ```rust
//! use seqflow::disruptor::{
//!     BlockingWaitStrategy, DefaultEventFactory, Disruptor, EventHandler, ProducerType, Result,
//! };
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct MyEvent {
//!     value: i64,
//! }
//!
//! struct Summer {
//!     total: Arc<AtomicI64>,
//! }
//!
//! impl EventHandler<MyEvent> for Summer {
//!     fn on_event(&mut self, event: &MyEvent, _sequence: i64, _end_of_batch: bool) -> Result<()> {
//!         self.total.fetch_add(event.value, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//!
//! let total = Arc::new(AtomicI64::new(0));
//! let mut disruptor = Disruptor::new(
//!     DefaultEventFactory::<MyEvent>::new(),
//!     1024, // Buffer size (must be power of 2)
//!     ProducerType::Single,
//!     BlockingWaitStrategy::new(),
//! )
//! .unwrap()
//! .handle_events_with(Summer { total: Arc::clone(&total) })
//! .build();
//!
//! disruptor.start().unwrap();
//!
//! let mut producer = disruptor.producer().unwrap();
//! for i in 1..=10 {
//!     producer.publish_with(|event| event.value = i).unwrap();
//! }
//!
//! disruptor.shutdown().unwrap();
//! assert_eq!(total.load(Ordering::Relaxed), 55);
//! ```
//!
//! ## Architecture
//!
//! - **`RingBuffer`**: Pre-allocated circular buffer for events
//! - **`Sequence`**: Padded atomic counter shared between threads
//! - **`Sequencer`**: Hands out slots to producers (single/multi producer)
//! - **`SequenceBarrier`**: What a consumer waits on
//! - **`WaitStrategy`**: How a consumer waits
//! - **`BatchEventProcessor`**: The consumer loop driving an `EventHandler`
//! - **`EventPoller`**: Pull-style consumer without a dedicated thread
//! - **`Disruptor`**: Wiring of all of the above

pub mod disruptor;

pub use disruptor::{
    BatchEventProcessor, BlockingWaitStrategy, BusySpinWaitStrategy, DefaultEventFactory,
    Disruptor, DisruptorConfig, DisruptorError, EventFactory, EventHandler, EventPoller,
    EventProcessor, EventTranslator, EventTranslatorOneArg, ExceptionHandler,
    MultiProducerSequencer, PollState, Producer, ProducerType, Result, RingBuffer, Sequence,
    SequenceBarrier, Sequencer, SingleProducerSequencer, SleepingWaitStrategy,
    TimeoutBlockingWaitStrategy, WaitStrategy, WaitStrategyConfig, YieldingWaitStrategy,
    INITIAL_CURSOR_VALUE,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version of the `SeqFlow` library
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
