//! Event Factory Implementation
//!
//! Factories pre-fill every ring buffer slot once at construction. Nothing is
//! allocated per event after that.

use std::marker::PhantomData;

/// Factory for the events stored in a ring buffer
///
/// Called exactly once per slot when the buffer is created.
///
/// # Examples
/// ```
/// use seqflow::disruptor::{EventFactory, RingBuffer};
///
/// struct Trade {
///     price: u64,
///     quantity: u32,
/// }
///
/// struct TradeFactory;
///
/// impl EventFactory<Trade> for TradeFactory {
///     fn new_instance(&self) -> Trade {
///         Trade { price: 0, quantity: 0 }
///     }
/// }
///
/// let buffer = RingBuffer::new(16, TradeFactory).unwrap();
/// assert_eq!(buffer.get(0).price, 0);
/// ```
pub trait EventFactory<T>: Send + Sync {
    /// Create a new event instance in its initial state
    fn new_instance(&self) -> T;
}

/// Event factory for types implementing [`Default`]
pub struct DefaultEventFactory<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Default> DefaultEventFactory<T> {
    /// Create a new default event factory
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: Default> Default for DefaultEventFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> EventFactory<T> for DefaultEventFactory<T> {
    fn new_instance(&self) -> T {
        T::default()
    }
}

impl<T> std::fmt::Debug for DefaultEventFactory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DefaultEventFactory")
    }
}

/// Event factory backed by a closure
pub struct ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    factory_fn: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    /// Create a new closure-based event factory
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> EventFactory<T> for ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    fn new_instance(&self) -> T {
        (self.factory_fn)()
    }
}
