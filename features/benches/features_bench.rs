use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxgate_audio::Waveform;
use voxgate_features::{summary, Extractor, FeatureConfig};

fn make_voiced(n_samples: usize, sample_rate: u32) -> Waveform {
    let samples = (0..n_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let s = (2.0 * std::f64::consts::PI * 150.0 * t).sin()
                + 0.4 * (2.0 * std::f64::consts::PI * 1200.0 * t).sin();
            (s * 0.3) as f32
        })
        .collect();
    Waveform::new(samples, sample_rate)
}

fn bench_extract_1s(c: &mut Criterion) {
    let ex = Extractor::new(FeatureConfig::default()).unwrap();
    let wave = make_voiced(16000, 16000);

    c.bench_function("features_extract_1s", |b| {
        b.iter(|| {
            let _ = black_box(ex.extract(black_box(wave.clone())));
        });
    });
}

fn bench_extract_3s_44k(c: &mut Criterion) {
    let ex = Extractor::new(FeatureConfig::default()).unwrap();
    let wave = make_voiced(3 * 44100, 44100);

    c.bench_function("features_extract_3s_44k_resampled", |b| {
        b.iter(|| {
            let _ = black_box(ex.extract(black_box(wave.clone())));
        });
    });
}

fn bench_summarize_1s(c: &mut Criterion) {
    let ex = Extractor::new(FeatureConfig::default()).unwrap();
    let wave = make_voiced(16000, 16000);

    c.bench_function("features_summarize_1s", |b| {
        b.iter(|| {
            let _ = black_box(summary::summarize(&ex, black_box(wave.clone())));
        });
    });
}

criterion_group!(
    benches,
    bench_extract_1s,
    bench_extract_3s_44k,
    bench_summarize_1s,
);
criterion_main!(benches);
