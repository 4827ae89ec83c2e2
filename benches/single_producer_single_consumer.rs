//! Single Producer Single Consumer (SPSC) Benchmarks
//!
//! Burst publishing through a one-stage disruptor for several wait strategies,
//! compared with a bounded crossbeam channel.

use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use crossbeam::channel;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use seqflow::disruptor::{
    BusySpinWaitStrategy, DefaultEventFactory, Disruptor, EventHandler, ProducerType,
    Result as DisruptorResult, SleepingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};

const BUFFER_SIZE: usize = 1024;
const BURST_SIZES: [u64; 3] = [1, 100, 1000];

#[derive(Debug, Default, Clone, Copy)]
struct BenchmarkEvent {
    value: i64,
}

/// Stores the last processed value so the producer can wait for it
struct LastValueSink {
    sink: Arc<AtomicI64>,
}

impl EventHandler<BenchmarkEvent> for LastValueSink {
    fn on_event(
        &mut self,
        event: &BenchmarkEvent,
        _sequence: i64,
        end_of_batch: bool,
    ) -> DisruptorResult<()> {
        if end_of_batch {
            self.sink.store(event.value, Ordering::Release);
        }
        Ok(())
    }
}

fn baseline(group: &mut BenchmarkGroup<WallTime>, burst_size: u64) {
    let sink = Arc::new(AtomicI64::new(0));

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(BenchmarkId::new("baseline", burst_size), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                for i in 1..=burst_size as i64 {
                    sink.store(black_box(i), Ordering::Release);
                }
                while sink.load(Ordering::Acquire) != burst_size as i64 {}
            }
            start.elapsed()
        })
    });
}

fn crossbeam_channel(group: &mut BenchmarkGroup<WallTime>, burst_size: u64) {
    let sink = Arc::new(AtomicI64::new(0));
    let (sender, receiver) = channel::bounded::<BenchmarkEvent>(BUFFER_SIZE);
    let consumer = {
        let sink = Arc::clone(&sink);
        thread::spawn(move || {
            while let Ok(event) = receiver.recv() {
                sink.store(event.value, Ordering::Release);
            }
        })
    };

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(BenchmarkId::new("crossbeam", burst_size), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                sink.store(0, Ordering::Release);
                for i in 1..=burst_size as i64 {
                    sender.send(BenchmarkEvent { value: black_box(i) }).unwrap();
                }
                while sink.load(Ordering::Acquire) != burst_size as i64 {
                    std::hint::spin_loop();
                }
            }
            start.elapsed()
        })
    });

    drop(sender);
    consumer.join().unwrap();
}

fn disruptor<W>(group: &mut BenchmarkGroup<WallTime>, name: &str, wait_strategy: W, burst_size: u64)
where
    W: WaitStrategy + 'static,
{
    let sink = Arc::new(AtomicI64::new(0));
    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<BenchmarkEvent>::new(),
        BUFFER_SIZE,
        ProducerType::Single,
        wait_strategy,
    )
    .unwrap()
    .handle_events_with(LastValueSink {
        sink: Arc::clone(&sink),
    })
    .build();
    disruptor.start().unwrap();
    let mut producer = disruptor.producer().unwrap();

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(BenchmarkId::new(name, burst_size), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                sink.store(0, Ordering::Release);
                for i in 1..=burst_size as i64 {
                    producer
                        .publish_with(|event| event.value = black_box(i))
                        .unwrap();
                }
                while sink.load(Ordering::Acquire) != burst_size as i64 {
                    std::hint::spin_loop();
                }
            }
            start.elapsed()
        })
    });

    disruptor.shutdown().unwrap();
}

fn disruptor_batch(group: &mut BenchmarkGroup<WallTime>, burst_size: u64) {
    let sink = Arc::new(AtomicI64::new(0));
    let mut disruptor = Disruptor::new(
        DefaultEventFactory::<BenchmarkEvent>::new(),
        BUFFER_SIZE,
        ProducerType::Single,
        BusySpinWaitStrategy::new(),
    )
    .unwrap()
    .handle_events_with(LastValueSink {
        sink: Arc::clone(&sink),
    })
    .build();
    disruptor.start().unwrap();
    let mut producer = disruptor.producer().unwrap();

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(BenchmarkId::new("BusySpin_batch", burst_size), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                sink.store(0, Ordering::Release);
                producer
                    .batch_publish(burst_size as usize, |batch| {
                        for (i, event) in batch.enumerate() {
                            event.value = black_box(i as i64 + 1);
                        }
                    })
                    .unwrap();
                while sink.load(Ordering::Acquire) != burst_size as i64 {
                    std::hint::spin_loop();
                }
            }
            start.elapsed()
        })
    });

    disruptor.shutdown().unwrap();
}

fn spsc_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.measurement_time(Duration::from_secs(5));

    for &burst_size in &BURST_SIZES {
        baseline(&mut group, burst_size);
        crossbeam_channel(&mut group, burst_size);
        disruptor(&mut group, "BusySpin", BusySpinWaitStrategy::new(), burst_size);
        disruptor(&mut group, "Yielding", YieldingWaitStrategy::new(), burst_size);
        disruptor(&mut group, "Sleeping", SleepingWaitStrategy::new(), burst_size);
        disruptor_batch(&mut group, burst_size);
    }

    group.finish();
}

criterion_group!(benches, spsc_benchmark);
criterion_main!(benches);
