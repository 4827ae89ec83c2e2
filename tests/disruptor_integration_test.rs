#![allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]

//! End-to-end tests driving a wired disruptor from producer threads

use anyhow::Context;
use seqflow::disruptor::{
    ClosureEventHandler, ClosureEventTranslator, ClosureExceptionHandler, DefaultEventFactory,
    Disruptor, DisruptorConfig, DisruptorError, EventHandler, IgnoreExceptionHandler,
    ProducerType, Result as DisruptorResult, WaitStrategyConfig, YieldingWaitStrategy,
};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Default)]
struct TestEvent {
    value: i64,
    producer_id: usize,
    stage_a: AtomicI64,
    stage_b: AtomicI64,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Checks that sequences arrive exactly once, in order, without gaps
struct OrderCheckingHandler {
    expected: i64,
    violations: Arc<AtomicUsize>,
    processed: Arc<AtomicUsize>,
}

impl EventHandler<TestEvent> for OrderCheckingHandler {
    fn on_event(&mut self, event: &TestEvent, sequence: i64, _end_of_batch: bool) -> DisruptorResult<()> {
        if sequence != self.expected || event.value != sequence {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.expected = sequence + 1;
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_spsc_exactly_once_in_order_for_every_wait_strategy() {
    init_tracing();

    let strategies = [
        WaitStrategyConfig::BusySpin,
        WaitStrategyConfig::Yielding { spin_tries: 100 },
        WaitStrategyConfig::Sleeping {
            retries: 200,
            sleep_nanos: 100,
        },
        WaitStrategyConfig::Blocking,
        WaitStrategyConfig::TimeoutBlocking {
            timeout_micros: 1_000,
        },
    ];

    for strategy in strategies {
        let config = DisruptorConfig::new()
            .with_buffer_size(256)
            .with_wait_strategy(strategy.clone())
            .with_thread_name_prefix("spsc");

        let violations = Arc::new(AtomicUsize::new(0));
        let processed = Arc::new(AtomicUsize::new(0));
        let mut disruptor =
            Disruptor::from_config(DefaultEventFactory::<TestEvent>::new(), &config)
                .unwrap()
                .handle_events_with(OrderCheckingHandler {
                    expected: 0,
                    violations: Arc::clone(&violations),
                    processed: Arc::clone(&processed),
                })
                .build();

        disruptor.start().unwrap();
        let mut producer = disruptor.producer().unwrap();
        for _ in 0..10_000 {
            producer
                .publish_event(&ClosureEventTranslator::new(
                    |event: &mut TestEvent, sequence: i64| event.value = sequence,
                ))
                .unwrap();
        }
        disruptor.shutdown().unwrap();

        assert_eq!(processed.load(Ordering::SeqCst), 10_000, "{strategy:?}");
        assert_eq!(violations.load(Ordering::SeqCst), 0, "{strategy:?}");
    }
}

#[test]
fn test_multi_producer_preserves_per_producer_order() {
    const PRODUCERS: usize = 4;
    const EVENTS_PER_PRODUCER: i64 = 2_500;

    let violations = Arc::new(AtomicUsize::new(0));
    let processed = Arc::new(AtomicUsize::new(0));
    let mut last_seen = vec![-1i64; PRODUCERS];

    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<TestEvent>::new(),
        128,
        ProducerType::Multi,
        YieldingWaitStrategy::new(),
    )
    .unwrap()
    .handle_events_with({
        let violations = Arc::clone(&violations);
        let processed = Arc::clone(&processed);
        ClosureEventHandler::new(move |event: &TestEvent, _sequence: i64, _eob: bool| {
            if event.value != last_seen[event.producer_id] + 1 {
                violations.fetch_add(1, Ordering::SeqCst);
            }
            last_seen[event.producer_id] = event.value;
            processed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .build();

    disruptor.start().unwrap();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer_id| {
            let mut producer = disruptor.producer().unwrap();
            thread::spawn(move || {
                for value in 0..EVENTS_PER_PRODUCER {
                    producer
                        .publish_with(|event| {
                            event.value = value;
                            event.producer_id = producer_id;
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    disruptor.shutdown().unwrap();

    assert_eq!(
        processed.load(Ordering::SeqCst),
        PRODUCERS * EVENTS_PER_PRODUCER as usize
    );
    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert_eq!(disruptor.cursor(), PRODUCERS as i64 * EVENTS_PER_PRODUCER - 1);
}

#[test]
fn test_diamond_pipeline() -> anyhow::Result<()> {
    let violations = Arc::new(AtomicUsize::new(0));
    let processed = Arc::new(AtomicUsize::new(0));

    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<TestEvent>::new(),
        64,
        ProducerType::Single,
        YieldingWaitStrategy::new(),
    )
    .context("diamond disruptor")?
    .handle_events_with(ClosureEventHandler::new(
        |event: &TestEvent, _sequence: i64, _eob: bool| {
            event.stage_a.store(event.value, Ordering::Release);
            Ok(())
        },
    ))
    .and(ClosureEventHandler::new(
        |event: &TestEvent, _sequence: i64, _eob: bool| {
            event.stage_b.store(event.value * 2, Ordering::Release);
            Ok(())
        },
    ))
    .then({
        let violations = Arc::clone(&violations);
        let processed = Arc::clone(&processed);
        ClosureEventHandler::new(move |event: &TestEvent, _sequence: i64, _eob: bool| {
            let a = event.stage_a.load(Ordering::Acquire);
            let b = event.stage_b.load(Ordering::Acquire);
            if a != event.value || b != event.value * 2 {
                violations.fetch_add(1, Ordering::SeqCst);
            }
            processed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .build();

    disruptor.start()?;
    let mut producer = disruptor.producer()?;
    for value in 1..=5_000 {
        producer.publish_with(|event| event.value = value)?;
    }
    disruptor.shutdown()?;

    assert_eq!(processed.load(Ordering::SeqCst), 5_000);
    assert_eq!(violations.load(Ordering::SeqCst), 0);

    let sequences = disruptor.processor_sequences();
    assert!(sequences.iter().all(|s| s.get() == 4_999));
    Ok(())
}

#[test]
fn test_fatal_failure_halts_and_restart_replays() -> anyhow::Result<()> {
    let fail_once = Arc::new(AtomicBool::new(true));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<TestEvent>::new(),
        16,
        ProducerType::Single,
        YieldingWaitStrategy::new(),
    )
    .context("replay disruptor")?
    .handle_events_with({
        let fail_once = Arc::clone(&fail_once);
        let seen = Arc::clone(&seen);
        ClosureEventHandler::new(move |event: &TestEvent, _sequence: i64, _eob: bool| {
            if event.value == 3 && fail_once.swap(false, Ordering::SeqCst) {
                return Err(DisruptorError::handler("transient failure"));
            }
            seen.lock().unwrap().push(event.value);
            Ok(())
        })
    })
    .build();

    let mut producer = disruptor.producer()?;
    disruptor.start()?;
    for value in 0..6 {
        producer.publish_with(|event| event.value = value)?;
    }
    disruptor.shutdown()?;

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(disruptor.processor_sequences()[0].get(), 2);

    disruptor.start()?;
    disruptor.shutdown()?;

    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(disruptor.processor_sequences()[0].get(), 5);
    Ok(())
}

#[test]
fn test_panicking_handler_is_reported_and_skipped() {
    let panics = Arc::new(Mutex::new(Vec::new()));
    let processed = Arc::new(AtomicUsize::new(0));

    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<TestEvent>::new(),
        16,
        ProducerType::Single,
        YieldingWaitStrategy::new(),
    )
    .unwrap()
    .handle_events_with({
        let processed = Arc::clone(&processed);
        ClosureEventHandler::new(move |event: &TestEvent, _sequence: i64, _eob: bool| {
            if event.value == 1 {
                panic!("bad event");
            }
            processed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .build();

    disruptor.set_default_exception_handler(Arc::new(ClosureExceptionHandler::new({
        let panics = Arc::clone(&panics);
        move |error: DisruptorError, sequence: i64, _event: &TestEvent| {
            let is_panic = matches!(error, DisruptorError::HandlerPanic(ref m) if m == "bad event");
            panics.lock().unwrap().push((sequence, is_panic));
            Ok(())
        }
    })));

    disruptor.start().unwrap();
    let mut producer = disruptor.producer().unwrap();
    for value in 0..4 {
        producer.publish_with(|event| event.value = value).unwrap();
    }
    disruptor.shutdown().unwrap();

    assert_eq!(processed.load(Ordering::SeqCst), 3);
    assert_eq!(*panics.lock().unwrap(), vec![(1, true)]);
}

#[test]
fn test_ignore_exception_handler_keeps_processing() {
    let processed = Arc::new(AtomicUsize::new(0));

    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<TestEvent>::new(),
        16,
        ProducerType::Single,
        YieldingWaitStrategy::new(),
    )
    .unwrap()
    .handle_events_with({
        let processed = Arc::clone(&processed);
        ClosureEventHandler::new(move |event: &TestEvent, _sequence: i64, _eob: bool| {
            processed.fetch_add(1, Ordering::SeqCst);
            if event.value % 2 == 0 {
                Err(DisruptorError::handler("even values are rejected"))
            } else {
                Ok(())
            }
        })
    })
    .build();
    disruptor.set_default_exception_handler(Arc::new(IgnoreExceptionHandler::new()));

    disruptor.start().unwrap();
    let mut producer = disruptor.producer().unwrap();
    for value in 0..100 {
        producer.publish_with(|event| event.value = value).unwrap();
    }
    disruptor.shutdown().unwrap();

    assert_eq!(processed.load(Ordering::SeqCst), 100);
}

#[test]
fn test_poller_alongside_processor() {
    let processed = Arc::new(AtomicUsize::new(0));
    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<TestEvent>::new(),
        32,
        ProducerType::Single,
        YieldingWaitStrategy::new(),
    )
    .unwrap()
    .handle_events_with({
        let processed = Arc::clone(&processed);
        ClosureEventHandler::new(move |_event: &TestEvent, _sequence: i64, _eob: bool| {
            processed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .build();

    // Only sees events the processor has already handled
    let upstream = disruptor.processor_sequences();
    let mut poller = disruptor.new_poller(upstream);

    disruptor.start().unwrap();
    let mut producer = disruptor.producer().unwrap();
    let publisher = thread::spawn(move || {
        for value in 0..1_000 {
            producer.publish_with(|event| event.value = value).unwrap();
        }
    });

    let mut polled = Vec::new();
    while polled.len() < 1_000 {
        poller
            .poll(|event: &TestEvent, _sequence: i64, _eob: bool| -> DisruptorResult<bool> {
                polled.push(event.value);
                Ok(true)
            })
            .unwrap();
        thread::yield_now();
    }

    publisher.join().unwrap();
    disruptor.shutdown().unwrap();

    assert_eq!(polled, (0..1_000).collect::<Vec<_>>());
    assert_eq!(processed.load(Ordering::SeqCst), 1_000);
}

#[test]
fn test_disruptor_from_json_config() -> anyhow::Result<()> {
    let config = DisruptorConfig::from_json(
        r#"{
            "buffer_size": 32,
            "producer_type": "multi",
            "wait_strategy": { "type": "yielding" },
            "thread_name_prefix": "json"
        }"#,
    )
    .context("parse json config")?;

    let thread_names = Arc::new(Mutex::new(Vec::new()));
    let mut disruptor = Disruptor::from_config(DefaultEventFactory::<TestEvent>::new(), &config)?
        .handle_events_with({
            let thread_names = Arc::clone(&thread_names);
            ClosureEventHandler::new(move |_event: &TestEvent, _sequence: i64, _eob: bool| {
                let name = thread::current().name().map(str::to_string);
                thread_names.lock().unwrap().push(name);
                Ok(())
            })
        })
        .build();

    assert_eq!(disruptor.buffer_size(), 32);
    assert_eq!(disruptor.producer_type(), ProducerType::Multi);

    disruptor.start()?;
    let mut first = disruptor.producer()?;
    let mut second = disruptor.producer().context("multi producer hands out a second handle")?;
    first.publish_with(|event| event.value = 1)?;
    second.publish_with(|event| event.value = 2)?;
    disruptor.shutdown()?;

    let thread_names = thread_names.lock().unwrap();
    assert_eq!(thread_names.len(), 2);
    assert!(thread_names
        .iter()
        .all(|name| name.as_deref() == Some("json-processor-0")));
    Ok(())
}
