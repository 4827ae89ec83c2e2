//! Property-based tests for disruptor components
//!
//! These tests use proptest to verify properties that should hold for all inputs

use crate::disruptor::{
    ceiling_next_power_of_two, is_power_of_two, log2, BusySpinWaitStrategy, Cursored,
    DefaultEventFactory, DisruptorError, MultiProducerSequencer, RingBuffer, Sequence,
    SequenceGroup, Sequenced, Sequencer, SingleProducerSequencer,
};
use proptest::prelude::*;
use std::sync::Arc;

mod sequence_properties {
    use super::*;

    proptest! {
        #[test]
        fn sequence_get_set_consistency(value in any::<i64>()) {
            let seq = Sequence::new(0);
            seq.set(value);
            prop_assert_eq!(seq.get(), value);
        }

        #[test]
        fn sequence_monotonic_increment(
            initial in -1_000_000i64..1_000_000,
            increments in prop::collection::vec(1i64..100, 1..50)
        ) {
            let seq = Sequence::new(initial);
            let mut expected = initial;

            for inc in increments {
                expected += inc;
                prop_assert_eq!(seq.add_and_get(inc), expected);
                prop_assert_eq!(seq.get(), expected);
            }
        }

        #[test]
        fn minimum_sequence_is_bounded_by_default(
            values in prop::collection::vec(any::<i64>(), 0..20),
            default in any::<i64>()
        ) {
            let sequences: Vec<Arc<Sequence>> =
                values.iter().map(|&v| Arc::new(Sequence::new(v))).collect();
            // `default` caps the result, as the sequencers rely on with `minimum(cursor)`
            let expected = values
                .iter()
                .copied()
                .min()
                .map_or(default, |minimum| minimum.min(default));
            prop_assert_eq!(Sequence::get_minimum_sequence(&sequences, default), expected);
        }

        #[test]
        fn sequence_group_tracks_members(
            values in prop::collection::vec(-1000i64..1000, 1..20),
            remove_index in any::<prop::sample::Index>()
        ) {
            let group = SequenceGroup::new();
            let sequences: Vec<Arc<Sequence>> =
                values.iter().map(|&v| Arc::new(Sequence::new(v))).collect();
            group.add(&sequences);
            prop_assert_eq!(group.len(), values.len());

            let removed = remove_index.index(values.len());
            prop_assert!(group.remove(&sequences[removed]));
            prop_assert!(!group.remove(&sequences[removed]));

            let expected = values
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != removed)
                .map(|(_, &v)| v)
                .min()
                .unwrap_or(i64::MAX);
            prop_assert_eq!(group.minimum(i64::MAX), expected);
        }
    }
}

mod sizing_properties {
    use super::*;

    proptest! {
        #[test]
        fn ceiling_power_of_two_is_tight(n in 1usize..(1 << 40)) {
            let ceiling = ceiling_next_power_of_two(n);
            prop_assert!(is_power_of_two(ceiling));
            prop_assert!(ceiling >= n);
            prop_assert!(ceiling / 2 < n);
            prop_assert_eq!(1usize << log2(ceiling), ceiling);
        }

        #[test]
        fn ring_buffer_rejects_non_powers_of_two(size in 0usize..4096) {
            let result = RingBuffer::new(size, DefaultEventFactory::<i64>::new());
            if is_power_of_two(size) {
                prop_assert_eq!(result.unwrap().buffer_size(), size);
            } else {
                prop_assert!(matches!(result, Err(DisruptorError::InvalidBufferSize(s)) if s == size));
            }
        }

        #[test]
        fn ring_buffer_slots_wrap(size_power in 0u32..10, sequence in 0i64..1_000_000) {
            let size = 1usize << size_power;
            let buffer = RingBuffer::new(size, DefaultEventFactory::<i64>::new()).unwrap();

            let slot = buffer.get(sequence) as *const i64;
            let lapped = buffer.get(sequence + size as i64) as *const i64;
            prop_assert_eq!(slot, lapped);
            prop_assert_eq!(buffer.get(sequence % size as i64) as *const i64, slot);
        }
    }
}

mod sequencer_properties {
    use super::*;

    proptest! {
        #[test]
        fn single_producer_claims_are_contiguous(
            size_power in 1u32..10,
            requests in prop::collection::vec(1usize..10, 1..20)
        ) {
            let buffer_size = 1usize << size_power;
            let sequencer =
                SingleProducerSequencer::new(buffer_size, Arc::new(BusySpinWaitStrategy)).unwrap();

            let mut last_sequence = -1i64;
            for request in requests {
                let n = request as i64;
                match sequencer.next_n(n) {
                    Ok(hi) => {
                        prop_assert_eq!(hi, last_sequence + n);
                        sequencer.publish_range(hi - n + 1, hi);
                        prop_assert_eq!(sequencer.get_cursor(), hi);
                        last_sequence = hi;
                    }
                    Err(error) => {
                        prop_assert!(request > buffer_size);
                        let is_invalid_claim =
                            matches!(error, DisruptorError::InvalidClaimSize { .. });
                        prop_assert!(is_invalid_claim);
                    }
                }
            }
        }

        #[test]
        fn multi_producer_highest_published_stops_at_first_gap(
            size_power in 1u32..7,
            published in prop::collection::vec(any::<bool>(), 1..64)
        ) {
            let buffer_size = 1usize << size_power;
            prop_assume!(published.len() <= buffer_size);

            let sequencer =
                MultiProducerSequencer::new(buffer_size, Arc::new(BusySpinWaitStrategy)).unwrap();
            let claimed: Vec<i64> =
                published.iter().map(|_| sequencer.next().unwrap()).collect();
            prop_assert_eq!(claimed, (0..published.len() as i64).collect::<Vec<_>>());

            for (sequence, &publish) in published.iter().enumerate() {
                if publish {
                    sequencer.publish(sequence as i64);
                }
            }

            let first_gap = published
                .iter()
                .position(|&p| !p)
                .unwrap_or(published.len()) as i64;
            let highest = published.len() as i64 - 1;
            prop_assert_eq!(
                sequencer.get_highest_published_sequence(0, highest),
                first_gap - 1
            );
            for (sequence, &publish) in published.iter().enumerate() {
                prop_assert_eq!(sequencer.is_available(sequence as i64), publish);
            }
        }

        #[test]
        fn try_next_never_overwrites_unconsumed_slots(
            size_power in 1u32..6,
            consumer_lag in 0i64..64
        ) {
            let buffer_size = 1usize << size_power;
            let sequencer =
                SingleProducerSequencer::new(buffer_size, Arc::new(BusySpinWaitStrategy)).unwrap();
            let consumer = Arc::new(Sequence::default());
            sequencer.add_gating_sequences(&[consumer.clone()]);

            let lag = consumer_lag.min(buffer_size as i64);
            let mut claimed = 0i64;
            while let Ok(sequence) = sequencer.try_next() {
                sequencer.publish(sequence);
                claimed += 1;
            }
            prop_assert_eq!(claimed, buffer_size as i64);

            consumer.set(lag - 1);
            let mut more = 0i64;
            while let Ok(sequence) = sequencer.try_next() {
                sequencer.publish(sequence);
                more += 1;
            }
            prop_assert_eq!(more, lag);
            prop_assert!(sequencer.get_cursor() - consumer.get() <= buffer_size as i64);
        }
    }
}
