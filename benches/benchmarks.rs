use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tilerio::{GcpTransform, GroundControlPoint};

const GRID: usize = 10;

fn grid_gcps() -> Vec<GroundControlPoint> {
    (0..GRID)
        .flat_map(|row| {
            (0..GRID).map(move |col| {
                GroundControlPoint::new(
                    (row * 100) as f64,
                    (col * 100) as f64,
                    10. + 0.001 * (col * 100) as f64,
                    50. - 0.001 * (row * 100) as f64,
                )
            })
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let points = grid_gcps();
    c.bench_function("fit_affine_100_gcps", |b| {
        b.iter(|| GcpTransform::fit(black_box(&points)).unwrap())
    });
}

fn bench_roundtrip(c: &mut Criterion) {
    let transform = GcpTransform::fit(&grid_gcps()).unwrap();
    c.bench_function("pixel_geo_roundtrip", |b| {
        b.iter(|| {
            let (x, y) = transform.pixel_to_geo(black_box(123.4), black_box(456.7));
            transform.geo_to_pixel(x, y)
        })
    });
}

criterion_group!(benches, bench_fit, bench_roundtrip);
criterion_main!(benches);
