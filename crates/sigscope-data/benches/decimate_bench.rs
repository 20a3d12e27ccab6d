use criterion::{Criterion, black_box, criterion_group, criterion_main};
use sigscope_core::DownsampleMethod;
use sigscope_data::downsample;

fn bench_downsample(c: &mut Criterion) {
    let n = 100_000;
    let times: Vec<f64> = (0..n).map(|i| i as f64 * 1e-3).collect();
    let data: Vec<Vec<f64>> = (0..32)
        .map(|ch| (0..n).map(|i| ((ch * n + i) as f64).sin()).collect())
        .collect();

    let mut group = c.benchmark_group("downsample");
    for method in [
        DownsampleMethod::Subsample,
        DownsampleMethod::Mean,
        DownsampleMethod::Peak,
    ] {
        group.bench_function(format!("{method:?}"), |b| {
            b.iter(|| downsample(black_box(&times), black_box(&data), 25, method));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_downsample);
criterion_main!(benches);
