//! Benchmarks for the portcullis request compiler
//!
//! Run with: cargo bench

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use portcullis::config::RequestConfig;
use portcullis::request::{generate_filters, RawDataRequest, RequestCompiler};
use portcullis::schema::{
    Dimension, DimensionDictionary, LogicalMetric, LogicalTable, MetricDictionary,
};
use portcullis::time::{resolve_intervals, DateTimeParser, Granularity, StandardGrain, TimeGrain};

fn catalogs() -> (DimensionDictionary, MetricDictionary, LogicalTable) {
    let mut dimensions = DimensionDictionary::new();
    let mut table = LogicalTable::new("network");
    for name in ["age", "gender", "country", "device", "browser"] {
        let dimension =
            dimensions.add(Dimension::new(name, "id").with_field("desc", "Description"));
        table = table.with_dimension(dimension);
    }

    let mut metrics = MetricDictionary::new();
    for name in ["height", "width", "depth"] {
        let metric = metrics.add(LogicalMetric::new(name));
        table = table.with_metric(metric);
    }

    (dimensions, metrics, table)
}

fn filter_query(tokens: usize) -> String {
    let names = ["age", "gender", "country", "device", "browser"];
    (0..tokens)
        .map(|i| format!("{}.id-in[{},{}]", names[i % names.len()], i, i + 1))
        .collect::<Vec<_>>()
        .join(",")
}

fn bench_filters(c: &mut Criterion) {
    let (dimensions, _, table) = catalogs();

    let mut group = c.benchmark_group("filters");

    for size in [1, 10, 50] {
        let query = filter_query(size);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("parse_{}", size), |b| {
            b.iter(|| generate_filters(black_box(&query), &table, &dimensions, false).unwrap())
        });
    }

    group.finish();
}

fn bench_intervals(c: &mut Criterion) {
    let mut group = c.benchmark_group("intervals");

    let parser = DateTimeParser::new(Tz::UTC);
    let granularity = Granularity::Grain(TimeGrain::new(StandardGrain::Day, Tz::UTC));
    let now = Utc.with_ymd_and_hms(2020, 6, 15, 0, 0, 0).unwrap();

    for (name, query) in [
        ("datetimes", "2020-01-01/2020-02-01"),
        ("period_anchor", "P30D/2020-02-01"),
        ("macros", "current/next"),
    ] {
        group.bench_function(format!("resolve_{}", name), |b| {
            b.iter(|| resolve_intervals(black_box(query), now, &granularity, &parser).unwrap())
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let (dimensions, metrics, table) = catalogs();
    let compiler = RequestCompiler::new(
        Arc::new(dimensions),
        Arc::new(metrics),
        RequestConfig::default(),
    );
    let now = Utc.with_ymd_and_hms(2020, 6, 15, 0, 0, 0).unwrap();

    let mut group = c.benchmark_group("compile");

    let minimal = RawDataRequest::new("day")
        .with_metrics("height")
        .with_date_time("2020-01-01/2020-02-01");

    group.bench_function("minimal", |b| {
        b.iter(|| compiler.compile(black_box(&minimal), &table, now).unwrap())
    });

    let full = RawDataRequest::new("day")
        .with_dimensions(&["age", "gender", "country"])
        .with_metrics("height,width")
        .with_date_time("2020-01-01/2020-02-01,P7D/2020-03-01")
        .with_filters("age.id-in[2,3],gender.id-notin[u],country.desc-eq[US]")
        .with_havings("height-gt[10],width-lte[5]")
        .with_sorts("dateTime|asc,height|desc")
        .with_pagination("100", "1");

    group.bench_function("full", |b| {
        b.iter(|| compiler.compile(black_box(&full), &table, now).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_filters, bench_intervals, bench_compile);
criterion_main!(benches);
