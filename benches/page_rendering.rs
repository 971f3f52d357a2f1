//! Benchmarks for page capture and rendering
//!
//! Measures the per-refresh cost of the viewer outside the driver itself:
//! - Capturing a 256-byte page through the engine (mock driver)
//! - Rendering a captured page into hex/ASCII rows
//! - Encoding and decoding request wire images

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use physbridge::mock::MockDriver;
use physbridge::{AccessWidth, MemoryAccessRequest, MemoryPage, PhysMemBridge};
use std::hint::black_box;

const BASE: u64 = 0xFF00_D400;
const PAGE: usize = 256;

fn seeded_bridge() -> PhysMemBridge<MockDriver> {
    let driver = MockDriver::new();
    let bytes: Vec<u8> = (0..PAGE).map(|i| i as u8).collect();
    driver.seed(BASE, &bytes);
    let mut bridge = PhysMemBridge::with_transport(driver);
    assert!(bridge.connect());
    bridge
}

fn bench_capture(c: &mut Criterion) {
    let mut bridge = seeded_bridge();

    let mut group = c.benchmark_group("page_capture");
    group.throughput(Throughput::Bytes(PAGE as u64));
    group.bench_function("capture_256_mock", |b| {
        b.iter(|| {
            let page = MemoryPage::capture(&mut bridge, black_box(BASE), black_box(PAGE))
                .expect("capture");
            black_box(page)
        })
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut bridge = seeded_bridge();
    let page = MemoryPage::capture(&mut bridge, BASE, PAGE).expect("capture");

    c.bench_function("render_256_rows", |b| b.iter(|| black_box(black_box(&page).render_rows())));
}

fn bench_wire(c: &mut Criterion) {
    let request = MemoryAccessRequest::write(BASE, AccessWidth::Byte, 0x5A);
    let image = request.to_bytes();

    c.bench_function("request_to_bytes", |b| b.iter(|| black_box(black_box(&request).to_bytes())));
    c.bench_function("request_from_bytes", |b| {
        b.iter(|| black_box(MemoryAccessRequest::from_bytes(black_box(&image)).expect("decode")))
    });
}

criterion_group!(benches, bench_capture, bench_render, bench_wire);
criterion_main!(benches);
