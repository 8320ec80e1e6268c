//! Benchmarks for the vitalguard scoring paths.
//!
//! Run with: cargo bench --bench pipeline_benchmarks

use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vitalguard::alerts::AlertEngine;
use vitalguard::core::ambient::Ambient;
use vitalguard::core::features::engineer_features;
use vitalguard::core::predictor::heuristic_prediction;
use vitalguard::db::MemoryAlertLog;
use vitalguard::engines::global::ChannelEngines;
use vitalguard::models::patient::{ClinicalContext, PatientBaseline, PatientRef};
use vitalguard::models::vitals::{Channel, VitalsReading};
use vitalguard::ward::IcuWard;

fn window(len: usize) -> Vec<VitalsReading> {
    (0..len)
        .map(|i| {
            let drift = i as f64 * 0.4;
            VitalsReading::new(Utc::now(), 80.0 + drift, 96.0 - drift * 0.1, 125.0, 82.0, 18.0 + drift * 0.2, 37.2)
        })
        .collect()
}

fn bench_features(c: &mut Criterion) {
    let baseline = PatientBaseline::default();
    let mut group = c.benchmark_group("features");
    for len in [5usize, 20, 60] {
        let history = window(len);
        group.bench_with_input(BenchmarkId::new("engineer_and_score", len), &history, |b, h| {
            b.iter(|| heuristic_prediction(&engineer_features(black_box(h), &baseline)))
        });
    }
    group.finish();
}

fn bench_channels(c: &mut Criterion) {
    let alerts = Arc::new(AlertEngine::new(Arc::new(MemoryAlertLog::new()), Ambient::seeded(7)));
    let engines = ChannelEngines::new(alerts, Ambient::seeded(7));
    let patient = PatientRef::new("P001", "Bench Patient", "B01");
    let context = ClinicalContext::default();
    let reading = VitalsReading::new(Utc::now(), 128.0, 89.0, 168.0, 96.0, 28.0, 39.1);

    let mut group = c.benchmark_group("channels");
    for channel in Channel::ALL {
        group.bench_function(BenchmarkId::new("analyze", channel.code()), |b| {
            b.iter(|| engines.analyze_channel(channel, &patient, black_box(&reading), &context))
        });
    }
    group.bench_function("global", |b| {
        b.iter(|| engines.analyze(&patient, black_box(&reading), &context))
    });
    group.finish();
}

fn bench_ward(c: &mut Criterion) {
    let ward = IcuWard::demo(None, Ambient::seeded(7));
    c.bench_function("ward_predict", |b| b.iter(|| ward.predict(black_box("P003"))));
}

criterion_group!(benches, bench_features, bench_channels, bench_ward);
criterion_main!(benches);
