//! Inbound dispatch benchmarks.
//!
//! Measures decode + dispatch + republication for common server messages
//! on a client with no transport attached.
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use ddp_client::{CallbackListener, DdpClient, ParsedMessage};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const SUBSCRIBER_COUNTS: &[usize] = &[0, 1, 8];

const ADDED: &str =
    r#"{"msg":"added","collection":"todos","id":"x1","fields":{"text":"buy milk","done":false}}"#;

const UPDATED: &str = r#"{"msg":"updated","methods":["1","2","3","4"]}"#;

// ============================================================================
// Helpers
// ============================================================================

fn client_with_subscribers(count: usize) -> DdpClient {
    let client = DdpClient::builder()
        .host("localhost")
        .build()
        .expect("valid config");

    for _ in 0..count {
        client.events().subscribe(|envelope| {
            black_box(ParsedMessage::parse(envelope));
        });
    }

    client
}

// ============================================================================
// Benchmark: Republication
// ============================================================================

fn bench_added(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_added");

    for &count in SUBSCRIBER_COUNTS {
        let client = client_with_subscribers(count);
        group.bench_with_input(BenchmarkId::new("subscribers", count), &count, |b, _| {
            b.iter(|| client.receive(black_box(ADDED)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Listener Lookup
// ============================================================================

fn bench_updated(c: &mut Criterion) {
    let client = client_with_subscribers(1);

    // Registration succeeds even though the send fails without a transport
    for _ in 0..4 {
        let listener = CallbackListener::new()
            .with_updated(|id| {
                black_box(id);
            })
            .into_shared();
        client.call("noop", vec![], Some(listener));
    }

    c.bench_function("dispatch_updated", |b| {
        b.iter(|| client.receive(black_box(UPDATED)));
    });
}

criterion_group!(benches, bench_added, bench_updated);
criterion_main!(benches);
