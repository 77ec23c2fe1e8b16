use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{criterion_group, criterion_main, Criterion};

use gedcb::{BasicItem, Breaker, BreakerConfig, Exponential, ForwardDecay};

fn decay_counter(c: &mut Criterion) {
    let landmark = Instant::now();
    let decay = ForwardDecay::new(landmark, Exponential::new(0.1, Duration::from_secs(60)));
    let item = BasicItem::new(landmark + Duration::from_secs(30), 1.0);

    c.bench_function("static_weight", |b| {
        b.iter(|| black_box(decay.static_weight(black_box(&item))))
    });

    c.bench_function("normalizing_factor", |b| {
        let t = landmark + Duration::from_secs(45);
        b.iter(|| black_box(decay.normalizing_factor(black_box(t))))
    });
}

fn record_and_transition(c: &mut Criterion) {
    c.bench_function("success_failure_state", |b| {
        let landmark = Instant::now();
        let mut breaker = Breaker::new(BreakerConfig::default(), landmark);
        let mut t = landmark;

        b.iter(|| {
            t += Duration::from_micros(10);
            let _ = black_box(breaker.success(t));
            let _ = black_box(breaker.failure(t));
            black_box(breaker.state(t));
        })
    });

    c.bench_function("peer_update", |b| {
        let mut breaker = Breaker::new(BreakerConfig::default(), Instant::now());
        for i in 0..32 {
            breaker.update_peer(format!("node-{}", i), gedcb::State::Closed);
        }

        b.iter(|| {
            breaker.update_peer("node-0", gedcb::State::Suspicion);
            black_box(breaker.majority_suspect());
            breaker.update_peer("node-0", gedcb::State::Closed);
        })
    });
}

criterion_group!(benches, decay_counter, record_and_transition);
criterion_main!(benches);
