// Sampling + aggregation + fusion hot path
//
// Run with: cargo bench -p emotion-fusion --bench fusion_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use emotion_common::{EmotionDistribution, EmotionLabel, SentimentClass, SentimentVerdict};
use emotion_frame_sampler::{aggregate, select_indices, DEFAULT_SAMPLE_BUDGET};
use emotion_fusion::{fuse, FusionConfig};

/// Deterministic per-frame distributions cycling through the labels
fn synthetic_frames(count: usize) -> Vec<EmotionDistribution> {
    (0..count)
        .map(|i| {
            let peak = EmotionLabel::ALL[i % EmotionLabel::ALL.len()];
            EmotionDistribution::from_scores(
                EmotionLabel::ALL
                    .iter()
                    .map(|&label| (label, if label == peak { 0.7 } else { 0.05 })),
            )
        })
        .collect()
}

fn bench_select_indices(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_indices");

    for total in [15u64, 900, 216_000] {
        group.bench_with_input(BenchmarkId::from_parameter(total), &total, |b, &total| {
            b.iter(|| select_indices(black_box(total), DEFAULT_SAMPLE_BUDGET));
        });
    }

    group.finish();
}

fn bench_aggregate_and_fuse(c: &mut Criterion) {
    let config = FusionConfig::default();
    let text = SentimentVerdict::new(SentimentClass::Positive, [0.05, 0.05, 0.1, 0.7, 0.1]);
    let frames = synthetic_frames(DEFAULT_SAMPLE_BUDGET);

    c.bench_function("aggregate_and_fuse", |b| {
        b.iter(|| {
            let face = aggregate(black_box(&frames));
            let result = fuse(&config, face.distribution(), Some(black_box(&text)));
            black_box(result);
        });
    });
}

criterion_group!(benches, bench_select_indices, bench_aggregate_and_fuse);
criterion_main!(benches);
