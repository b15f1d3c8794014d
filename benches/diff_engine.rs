use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use poketch_video::diff::{diff_frames, DiffAccumulator, QuantizedFrame};
use poketch_video::{FrameReducer, RawFrame, TargetProfile};

/// A frame with a `size` x `size` block of color 3 at the top-left.
fn with_block(width: u32, height: u32, size: u32) -> QuantizedFrame {
    let mut frame = QuantizedFrame::filled(width, height, 0);
    for y in 0..size.min(height) {
        for x in 0..size.min(width) {
            frame.set(x, y, 3);
        }
    }
    frame
}

fn bench_diff_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_frames");
    for &(width, height) in &[(24u32, 20u32), (256, 192)] {
        let base = QuantizedFrame::filled(width, height, 0);
        for &size in &[0u32, 4, 16] {
            let next = with_block(width, height, size);
            group.bench_with_input(
                BenchmarkId::new(format!("{width}x{height}"), size),
                &next,
                |b, next| b.iter(|| diff_frames(black_box(&base), black_box(next))),
            );
        }
    }
    group.finish();
}

fn bench_accumulate(c: &mut Criterion) {
    let frames: Vec<QuantizedFrame> = (0..120).map(|i| with_block(24, 20, i % 20)).collect();
    c.bench_function("accumulate_120_frames", |b| {
        b.iter(|| {
            let mut acc = DiffAccumulator::new(24, 20);
            for frame in &frames {
                let _ = acc.push(frame.clone());
            }
            acc.finish()
        })
    });
}

fn bench_reduce(c: &mut Criterion) {
    let reducer = FrameReducer::new(&TargetProfile::default());
    let pixels: Vec<u8> = (0..256 * 192 * 3).map(|i| (i % 251) as u8).collect();
    let frame = RawFrame::new(pixels, 256, 192, 0);
    c.bench_function("reduce_256x192", |b| b.iter(|| reducer.reduce(black_box(&frame))));
}

criterion_group!(benches, bench_diff_frames, bench_accumulate, bench_reduce);
criterion_main!(benches);
