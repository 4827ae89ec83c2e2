//! Wait Strategy Implementation
//!
//! Wait strategies decide how a consumer waits for a sequence to become
//! available. They trade latency against CPU usage; none of them may miss an
//! alert, so every strategy rechecks the alert flag on every iteration.

use crate::disruptor::{DisruptorError, Result, Sequence};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default number of spins before a yielding strategy starts yielding
pub const DEFAULT_SPIN_TRIES: u32 = 100;
/// Default retry budget of the sleeping strategy
pub const DEFAULT_RETRIES: u32 = 200;
/// Default park time of the sleeping strategy once its retries are exhausted
pub const DEFAULT_SLEEP_NANOS: u64 = 100;

/// Strategy for waiting for events to become available
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Wait for the given sequence to become available
    ///
    /// # Arguments
    /// * `sequence` - The sequence to wait for
    /// * `cursor` - The producer cursor, which blocking strategies wait on
    /// * `dependent_sequences` - Sequences that bound what the consumer may read.
    ///   Contains the cursor itself when there are no upstream consumers.
    /// * `alerted` - The barrier alert flag
    ///
    /// # Returns
    /// The minimum of the dependent sequences, which is at least `sequence`
    ///
    /// # Errors
    /// `DisruptorError::Alert` if the flag is raised while waiting and
    /// `DisruptorError::Timeout` for strategies with a deadline
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64>;

    /// Wake every thread blocked inside [`Self::wait_for`]
    ///
    /// Called after each publish and on alert. Non-blocking strategies do nothing.
    fn signal_all_when_blocking(&self);
}

impl WaitStrategy for Box<dyn WaitStrategy> {
    #[inline]
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        (**self).wait_for(sequence, cursor, dependent_sequences, alerted)
    }

    #[inline]
    fn signal_all_when_blocking(&self) {
        (**self).signal_all_when_blocking()
    }
}

#[inline]
fn check_alert(alerted: &AtomicBool) -> Result<()> {
    if alerted.load(Ordering::Acquire) {
        Err(DisruptorError::Alert)
    } else {
        Ok(())
    }
}

#[inline]
fn minimum_of(dependent_sequences: &[Arc<Sequence>]) -> i64 {
    Sequence::get_minimum_sequence(dependent_sequences, i64::MAX)
}

/// Busy-spin wait strategy
///
/// Polls continuously without yielding the CPU. Lowest latency, but burns a
/// core for every waiting consumer.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    /// Create a new busy-spin wait strategy
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        loop {
            let available_sequence = minimum_of(dependent_sequences);
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            check_alert(alerted)?;
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Yielding wait strategy
///
/// Spins for a fixed number of tries, then yields the thread on each further
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    /// Create a new yielding wait strategy with the default spin budget
    pub fn new() -> Self {
        Self::with_spin_tries(DEFAULT_SPIN_TRIES)
    }

    /// Create a yielding wait strategy that spins `spin_tries` times before yielding
    pub fn with_spin_tries(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        let mut counter = self.spin_tries;
        loop {
            let available_sequence = minimum_of(dependent_sequences);
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            check_alert(alerted)?;
            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Sleeping wait strategy
///
/// Spins, then yields, then parks for a short interval. The retry budget is
/// split evenly: the upper half spins and the lower half yields.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    retries: u32,
    sleep: Duration,
}

impl SleepingWaitStrategy {
    /// Create a new sleeping wait strategy with default tuning
    pub fn new() -> Self {
        Self::with_retries(DEFAULT_RETRIES, DEFAULT_SLEEP_NANOS)
    }

    /// Create a sleeping wait strategy with a custom retry budget and park time
    pub fn with_retries(retries: u32, sleep_nanos: u64) -> Self {
        Self {
            retries,
            sleep: Duration::from_nanos(sleep_nanos),
        }
    }

    #[inline]
    fn apply_wait_method(&self, counter: u32) -> u32 {
        if counter > self.retries / 2 {
            std::hint::spin_loop();
            counter - 1
        } else if counter > 0 {
            thread::yield_now();
            counter - 1
        } else {
            thread::sleep(self.sleep);
            counter
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        let mut counter = self.retries;
        loop {
            let available_sequence = minimum_of(dependent_sequences);
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            check_alert(alerted)?;
            counter = self.apply_wait_method(counter);
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Blocking wait strategy
///
/// Parks on a condition variable until the producer cursor reaches the
/// requested sequence, then spins on the dependent sequences. Producers pay
/// for a lock and a notify on every publish.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    /// Create a new blocking wait strategy
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                check_alert(alerted)?;
                self.condvar.wait(&mut guard);
            }
        }

        spin_on_dependents(sequence, dependent_sequences, alerted)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// Blocking wait strategy with a deadline
///
/// Behaves like [`BlockingWaitStrategy`] but gives up with
/// `DisruptorError::Timeout` when the cursor does not reach the requested
/// sequence in time. Event processors turn the timeout into an
/// `on_timeout` callback.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    /// Create a new timeout blocking wait strategy
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            timeout,
        }
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequences: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                check_alert(alerted)?;
                if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                    if cursor.get() >= sequence {
                        break;
                    }
                    check_alert(alerted)?;
                    return Err(DisruptorError::Timeout);
                }
            }
        }

        spin_on_dependents(sequence, dependent_sequences, alerted)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

fn spin_on_dependents(
    sequence: i64,
    dependent_sequences: &[Arc<Sequence>],
    alerted: &AtomicBool,
) -> Result<i64> {
    loop {
        let available_sequence = minimum_of(dependent_sequences);
        if available_sequence >= sequence {
            return Ok(available_sequence);
        }
        check_alert(alerted)?;
        std::hint::spin_loop();
    }
}
