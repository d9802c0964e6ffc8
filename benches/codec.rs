//! Frame codec benchmark suite.
//!
//! Benchmarks the per-frame JSON work done by the pumps:
//! - Decoding relay frames at several payload sizes
//! - Encoding queued outbound messages
//!
//! Run with: cargo bench --bench codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use relay_client::{IncomingMessage, OutgoingMessage};
use serde_json::{Value, json};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_FIELDS: &[usize] = &[1, 16, 256];

// ============================================================================
// Benchmark: Incoming Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_incoming");

    for &fields in PAYLOAD_FIELDS {
        let frame = json!({
            "type": "event",
            "event": { "id": "evt_1", "type": "invoice.paid", "payload": payload(fields) }
        })
        .to_string();

        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("event", fields), &frame, |b, frame| {
            b.iter(|| IncomingMessage::from_text(black_box(frame)));
        });
    }

    let status = json!({ "type": "status" }).to_string();
    group.bench_function("no_event", |b| {
        b.iter(|| IncomingMessage::from_text(black_box(&status)));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Outgoing Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_outgoing");

    for &fields in PAYLOAD_FIELDS {
        let message = OutgoingMessage::new("response", payload(fields));
        group.bench_with_input(BenchmarkId::new("message", fields), &message, |b, message| {
            b.iter(|| black_box(message).to_text());
        });
    }

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

fn payload(fields: usize) -> Value {
    let map = (0..fields)
        .map(|i| (format!("field_{i}"), json!({ "value": i, "label": "x".repeat(16) })))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(benches, bench_decode, bench_encode);
criterion_main!(benches);
