//! SeqFlow Disruptor Implementation
//!
//! The sequencing and coordination engine: a pre-allocated ring buffer, the
//! sequencers that hand out slots to producers, the barriers consumers wait on,
//! the wait strategies that decide how they wait, and the batch processing loop.

pub mod config;
pub mod core_interfaces;
#[allow(clippy::module_inception)]
pub mod disruptor;
pub mod event_factory;
pub mod event_handler;
pub mod event_poller;
pub mod event_processor;
pub mod event_translator;
pub mod exception_handler;
pub mod producer;
pub mod producer_type;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequencer;
pub mod thread_management;
pub mod wait_strategy;

#[cfg(test)]
mod property_tests;

pub use config::{DisruptorConfig, WaitStrategyConfig};
pub use core_interfaces::{Cursored, DataProvider, Sequenced};
pub use disruptor::{Disruptor, DisruptorBuilder};
pub use event_factory::{ClosureEventFactory, DefaultEventFactory, EventFactory};
pub use event_handler::{ClosureEventHandler, EventHandler, NoOpEventHandler};
pub use event_poller::{EventPoller, PollState};
pub use event_processor::{BatchEventProcessor, EventProcessor, ProcessorState};
pub use event_translator::{ClosureEventTranslator, EventTranslator, EventTranslatorOneArg};
pub use exception_handler::{
    ClosureExceptionHandler, ExceptionHandler, FatalExceptionHandler, IgnoreExceptionHandler,
};
pub use producer::Producer;
pub use producer_type::ProducerType;
pub use ring_buffer::{BatchIterMut, RingBuffer};
pub use sequence::{Sequence, SequenceGroup};
pub use sequence_barrier::{ProcessingSequenceBarrier, SequenceBarrier};
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use thread_management::{ManagedThread, ThreadBuilder};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy,
    WaitStrategy, YieldingWaitStrategy,
};

/// The initial cursor value for sequences
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Errors that can occur in the Disruptor
#[derive(Debug, thiserror::Error)]
pub enum DisruptorError {
    /// A non-blocking claim found no free slot
    #[error("Insufficient capacity in ring buffer")]
    InsufficientCapacity,

    /// Ring buffer size is zero or not a power of two
    #[error("Buffer size must be a power of 2 greater than zero, got: {0}")]
    InvalidBufferSize(usize),

    /// A batch claim asked for zero slots or more than the ring holds
    #[error("Cannot claim {requested} slots from a ring buffer of size {buffer_size}")]
    InvalidClaimSize {
        /// Slots asked for
        requested: i64,
        /// Capacity of the ring
        buffer_size: usize,
    },

    /// Raised by a barrier that has been alerted, used to unblock waiting consumers
    #[error("Sequence barrier alerted")]
    Alert,

    /// A deadline passed before the awaited sequence was reached
    #[error("Timeout waiting for sequence")]
    Timeout,

    /// `run` was called on a processor whose loop is active
    #[error("Event processor is already running")]
    AlreadyRunning,

    /// Wiring or starting after the threads were launched
    #[error("Disruptor has already been started")]
    AlreadyStarted,

    /// Consumers exist but none of them gates the producer
    #[error("Event processors are wired but no gating sequence protects the ring buffer")]
    MissingGatingSequences,

    /// A user callback returned an error
    #[error("Event handler failed: {0}")]
    EventHandler(String),

    /// A user callback panicked; carries the panic message
    #[error("Event handler panicked: {0}")]
    HandlerPanic(String),

    /// Configuration could not be parsed or is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The OS refused to start a processor thread
    #[error("Failed to spawn processor thread: {0}")]
    ThreadSpawn(String),
}

impl DisruptorError {
    /// Convenience constructor for failures raised from user callbacks
    pub fn handler<S: Into<String>>(message: S) -> Self {
        Self::EventHandler(message.into())
    }
}

/// Result alias used throughout the disruptor
pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Utility function to check if a number is a power of 2
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// Smallest power of two greater than or equal to `n` (1 for `n == 0`)
pub fn ceiling_next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Position of the highest set bit, 0 for inputs of 0 or 1
pub fn log2(n: usize) -> u32 {
    if n == 0 {
        0
    } else {
        usize::BITS - 1 - n.leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(2));
        assert!(is_power_of_two(4));
        assert!(is_power_of_two(8));
        assert!(is_power_of_two(1024));

        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(3));
        assert!(!is_power_of_two(5));
        assert!(!is_power_of_two(1023));
    }

    #[test]
    fn test_ceiling_next_power_of_two() {
        assert_eq!(ceiling_next_power_of_two(0), 1);
        assert_eq!(ceiling_next_power_of_two(1), 1);
        assert_eq!(ceiling_next_power_of_two(3), 4);
        assert_eq!(ceiling_next_power_of_two(1000), 1024);
        assert_eq!(ceiling_next_power_of_two(1024), 1024);
    }

    #[test]
    fn test_log2() {
        assert_eq!(log2(0), 0);
        assert_eq!(log2(1), 0);
        assert_eq!(log2(2), 1);
        assert_eq!(log2(3), 1);
        assert_eq!(log2(1024), 10);
        assert_eq!(log2(1025), 10);
    }

    #[test]
    fn test_error_messages() {
        let err = DisruptorError::InvalidBufferSize(7);
        assert_eq!(
            err.to_string(),
            "Buffer size must be a power of 2 greater than zero, got: 7"
        );

        let err = DisruptorError::handler("boom");
        assert!(matches!(err, DisruptorError::EventHandler(ref m) if m == "boom"));
    }
}
