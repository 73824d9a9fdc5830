//! Benchmarks for segment calibration and sensitivities.
//!
//! Run with: cargo bench -p knotwork-spline

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use knotwork_spline::prelude::*;

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn families() -> Vec<BasisFamily> {
    vec![
        BasisFamily::Polynomial { num_basis: 4 },
        BasisFamily::Bernstein { num_basis: 6 },
        BasisFamily::ExponentialTension { tension: 1.0 },
        BasisFamily::HyperbolicTension { tension: 1.0 },
        BasisFamily::KaklisPandelis { degree: 3 },
    ]
}

/// Knots and zero rates of a typical short-to-long curve.
fn pillars() -> Vec<(f64, f64)> {
    vec![
        (0.25, 0.030),
        (0.5, 0.032),
        (1.0, 0.035),
        (2.0, 0.038),
        (3.0, 0.040),
        (5.0, 0.045),
        (7.0, 0.048),
        (10.0, 0.050),
        (30.0, 0.055),
    ]
}

fn chained_curve(config: &SegmentConfig) -> Vec<Segment> {
    let points = pillars();
    let mut segments: Vec<Segment> = Vec::with_capacity(points.len() - 1);
    for (i, w) in points.windows(2).enumerate() {
        let mut segment = config.build(w[0].0, w[1].0).unwrap();
        if i == 0 {
            segment.calibrate(w[0].1, &[0.0], w[1].1, &[]).unwrap();
        } else {
            segment
                .calibrate_chained(Some(&segments[i - 1]), w[1].1)
                .unwrap();
        }
        segments.push(segment);
    }
    segments
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_single_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibrate");

    for family in families() {
        let config = SegmentConfig::new(family);
        let template = config.build(1.0, 2.0).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(family.name()),
            &template,
            |b, template| {
                b.iter(|| {
                    let mut segment = template.clone();
                    segment
                        .calibrate(black_box(0.035), &[0.003], black_box(0.038), &[])
                        .unwrap();
                    segment
                })
            },
        );
    }

    group.finish();
}

fn bench_chained_curve(c: &mut Criterion) {
    let config = SegmentConfig::default();
    let segments = pillars().len() as u64 - 1;

    let mut group = c.benchmark_group("chained_curve");
    group.throughput(Throughput::Elements(segments));

    group.bench_function("cubic_c1", |b| b.iter(|| chained_curve(black_box(&config))));

    group.finish();
}

fn bench_sensitivities(c: &mut Criterion) {
    let segments = chained_curve(&SegmentConfig::default());
    let segment = &segments[4];

    let mut group = c.benchmark_group("sensitivities");

    group.bench_function("value_jacobian", |b| {
        b.iter(|| segment.value_jacobian(black_box(4.2)).unwrap())
    });

    group.bench_function("derivative_jacobian", |b| {
        b.iter(|| segment.derivative_jacobian(black_box(4.2), 1).unwrap())
    });

    let tenors: Vec<f64> = (0..100).map(|i| 3.0 + i as f64 * 0.02).collect();
    group.bench_function("value_100_points", |b| {
        b.iter(|| {
            tenors
                .iter()
                .map(|x| segment.value_at(*x).unwrap())
                .collect::<Vec<_>>()
        })
    });

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut segment = SegmentConfig::default().build(2.0, 5.0).unwrap();
    segment.calibrate(0.038, &[0.006], 0.045, &[]).unwrap();
    let params = CalibrationParams::new(vec![2.0, 5.0], vec![0.038, 0.045])
        .unwrap()
        .with_left_derivatives(vec![0.002])
        .unwrap();

    c.bench_function("split_at_3y", |b| {
        b.iter(|| segment.split(black_box(3.0), &params).unwrap())
    });
}

// =============================================================================
// CRITERION GROUPS
// =============================================================================

criterion_group!(calibration, bench_single_calibration, bench_chained_curve);

criterion_group!(sensitivities, bench_sensitivities, bench_split);

criterion_main!(calibration, sensitivities);
