//! Performance benchmarks for the messaging client.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use courier::{codec, Client, MemoryBroker, Timestamp};
use serde_json::{json, Value};

/// Benchmark encoding and decoding of typical payloads
fn bench_codec(c: &mut Criterion) {
    let payload = json!({
        "symbol": "ABC",
        "bids": [[10.5, 100], [10.4, 250], [10.3, 75]],
        "meta": {"venue": "x", "seq": 123456}
    });
    let text = codec::encode(&payload).unwrap();

    c.bench_function("codec_encode", |b| {
        b.iter(|| black_box(codec::encode(black_box(&payload))));
    });
    c.bench_function("codec_decode", |b| {
        b.iter(|| black_box(codec::decode(black_box(&text))));
    });
}

/// Benchmark publish + dispatch through the in-memory broker
fn bench_publish_dispatch(c: &mut Criterion) {
    let broker = MemoryBroker::new();
    let client = Client::new(broker.connect());
    client
        .subscribe("bench", |ts: Timestamp, content: Value| {
            black_box((ts, content));
        })
        .unwrap();
    let publisher = Client::new(broker.connect());

    c.bench_function("publish_dispatch", |b| {
        b.iter(|| {
            publisher.publish("bench", &json!({"n": 1})).unwrap();
            let event = loop {
                let event = courier::Broker::next_event(client.broker()).unwrap();
                if event.kind == courier::EventKind::Message {
                    break event;
                }
            };
            black_box(client.dispatch(&event));
        });
    });
}

/// Benchmark incremental stream reads with varying batch sizes
fn bench_read_unread(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_unread");

    for batch in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::new("batch", batch), &batch, |b, &batch| {
            let broker = MemoryBroker::new();
            let writer = Client::new(broker.connect());
            let reader = Client::new(broker.connect());

            b.iter(|| {
                for i in 0..batch {
                    writer.append("bench", &i).unwrap();
                }
                black_box(reader.read_unread("bench", None).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_publish_dispatch, bench_read_unread);
criterion_main!(benches);
