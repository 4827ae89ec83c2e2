//! Disruptor Configuration
//!
//! Serializable settings for building a [`Disruptor`](crate::disruptor::Disruptor)
//! at runtime, e.g. from a JSON file. The wait strategy is selected by name and
//! boxed, so the statically dispatched [`Disruptor::new`](crate::disruptor::Disruptor::new)
//! remains the faster path when the strategy is known at compile time.

use crate::disruptor::wait_strategy::{DEFAULT_RETRIES, DEFAULT_SLEEP_NANOS, DEFAULT_SPIN_TRIES};
use crate::disruptor::{
    is_power_of_two, BlockingWaitStrategy, BusySpinWaitStrategy, DisruptorError, ProducerType,
    Result, SleepingWaitStrategy, TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default ring buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default prefix for processor thread names
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "seqflow";

/// Wait strategy selection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitStrategyConfig {
    /// [`BusySpinWaitStrategy`]
    BusySpin,
    /// [`YieldingWaitStrategy`], spinning `spin_tries` times before yielding
    Yielding {
        #[serde(default = "default_spin_tries")]
        spin_tries: u32,
    },
    /// [`SleepingWaitStrategy`], sleeping `sleep_nanos` once `retries` are spent
    Sleeping {
        #[serde(default = "default_retries")]
        retries: u32,
        #[serde(default = "default_sleep_nanos")]
        sleep_nanos: u64,
    },
    /// [`BlockingWaitStrategy`]
    #[default]
    Blocking,
    /// [`TimeoutBlockingWaitStrategy`], failing a wait after `timeout_micros`
    TimeoutBlocking { timeout_micros: u64 },
}

fn default_spin_tries() -> u32 {
    DEFAULT_SPIN_TRIES
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_sleep_nanos() -> u64 {
    DEFAULT_SLEEP_NANOS
}

impl WaitStrategyConfig {
    /// Instantiate the selected wait strategy
    pub fn build(&self) -> Box<dyn WaitStrategy> {
        match *self {
            Self::BusySpin => Box::new(BusySpinWaitStrategy::new()),
            Self::Yielding { spin_tries } => Box::new(YieldingWaitStrategy::with_spin_tries(spin_tries)),
            Self::Sleeping {
                retries,
                sleep_nanos,
            } => Box::new(SleepingWaitStrategy::with_retries(retries, sleep_nanos)),
            Self::Blocking => Box::new(BlockingWaitStrategy::new()),
            Self::TimeoutBlocking { timeout_micros } => Box::new(TimeoutBlockingWaitStrategy::new(
                Duration::from_micros(timeout_micros),
            )),
        }
    }
}

/// Settings for a disruptor instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisruptorConfig {
    /// Number of slots in the ring buffer, a power of 2
    pub buffer_size: usize,

    /// Single or multi producer sequencing
    pub producer_type: ProducerType,

    /// How consumers wait for new events
    pub wait_strategy: WaitStrategyConfig,

    /// Processor threads are named `{prefix}-processor-{index}`
    pub thread_name_prefix: String,

    /// CPU cores to pin processor threads to, in processor order
    ///
    /// Processors beyond the end of the list run unpinned.
    pub cpu_affinity: Option<Vec<usize>>,
}

impl Default for DisruptorConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            producer_type: ProducerType::Single,
            wait_strategy: WaitStrategyConfig::default(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            cpu_affinity: None,
        }
    }
}

impl DisruptorConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ring buffer size
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the producer type
    pub fn with_producer_type(mut self, producer_type: ProducerType) -> Self {
        self.producer_type = producer_type;
        self
    }

    /// Set the wait strategy
    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyConfig) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// Set the processor thread name prefix
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Pin processor threads to the given cores
    pub fn with_cpu_affinity(mut self, cores: Vec<usize>) -> Self {
        self.cpu_affinity = Some(cores);
        self
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DisruptorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DisruptorError::InvalidConfig(e.to_string()))
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// `DisruptorError::InvalidBufferSize` for a zero or non power of 2 size,
    /// `DisruptorError::InvalidConfig` for any other rejected value
    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(self.buffer_size));
        }

        if let WaitStrategyConfig::TimeoutBlocking { timeout_micros: 0 } = self.wait_strategy {
            return Err(DisruptorError::InvalidConfig(
                "timeout_blocking wait strategy needs a timeout greater than zero".to_string(),
            ));
        }

        if self.thread_name_prefix.trim().is_empty() {
            return Err(DisruptorError::InvalidConfig(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
