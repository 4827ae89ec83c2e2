//! Event Translator Implementation
//!
//! Translators fill a claimed slot in place between claim and publish.

use std::marker::PhantomData;

/// Populates an event claimed from the ring buffer
///
/// # Examples
/// ```
/// use seqflow::disruptor::EventTranslator;
///
/// #[derive(Default)]
/// struct OrderEvent {
///     id: u64,
///     sequence: i64,
/// }
///
/// struct OrderTranslator {
///     id: u64,
/// }
///
/// impl EventTranslator<OrderEvent> for OrderTranslator {
///     fn translate_to(&self, event: &mut OrderEvent, sequence: i64) {
///         event.id = self.id;
///         event.sequence = sequence;
///     }
/// }
/// ```
pub trait EventTranslator<T>: Send + Sync {
    /// Translate data into the claimed event
    ///
    /// # Arguments
    /// * `event` - The pre-allocated event in the claimed slot
    /// * `sequence` - The sequence assigned to it
    fn translate_to(&self, event: &mut T, sequence: i64);
}

/// Translator that takes one argument per publish
pub trait EventTranslatorOneArg<T, A>: Send + Sync {
    /// Translate `arg0` into the claimed event
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A);
}

/// Translator backed by a closure
pub struct ClosureEventTranslator<T, F>
where
    F: Fn(&mut T, i64) + Send + Sync,
{
    translator_fn: F,
    _phantom: PhantomData<fn(&mut T)>,
}

impl<T, F> ClosureEventTranslator<T, F>
where
    F: Fn(&mut T, i64) + Send + Sync,
{
    /// Create a new closure-based event translator
    pub fn new(translator_fn: F) -> Self {
        Self {
            translator_fn,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> EventTranslator<T> for ClosureEventTranslator<T, F>
where
    F: Fn(&mut T, i64) + Send + Sync,
{
    fn translate_to(&self, event: &mut T, sequence: i64) {
        (self.translator_fn)(event, sequence)
    }
}

impl<T, A, F> EventTranslatorOneArg<T, A> for F
where
    F: Fn(&mut T, i64, A) + Send + Sync,
{
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A) {
        self(event, sequence, arg0)
    }
}
