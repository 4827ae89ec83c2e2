//! Producer Type Implementation
//!
//! Selects the sequencer a [`Disruptor`](crate::disruptor::Disruptor) is built with.

use serde::{Deserialize, Serialize};

/// Specifies the type of producer for the Disruptor
///
/// # Examples
/// ```
/// use seqflow::disruptor::ProducerType;
///
/// let single_producer = ProducerType::Single;
/// let multi_producer = ProducerType::Multi;
///
/// assert!(single_producer.is_single());
/// assert!(multi_producer.is_multi());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerType {
    /// Exactly one thread publishes
    ///
    /// The claim position is kept without any atomic read-modify-write, which
    /// makes this the fastest option. Publishing from two threads corrupts the
    /// sequence, so the disruptor hands out a single producer handle only.
    #[default]
    Single,

    /// Any number of threads publish concurrently
    ///
    /// Claims go through a CAS on the shared cursor and every publish marks
    /// its slot in the availability buffer.
    Multi,
}

impl ProducerType {
    /// Returns true if this is a single producer type
    pub fn is_single(&self) -> bool {
        matches!(self, ProducerType::Single)
    }

    /// Returns true if this is a multi producer type
    pub fn is_multi(&self) -> bool {
        matches!(self, ProducerType::Multi)
    }
}

impl std::fmt::Display for ProducerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProducerType::Single => write!(f, "single"),
            ProducerType::Multi => write!(f, "multi"),
        }
    }
}
