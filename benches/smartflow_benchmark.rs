use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use smartflow::prelude::*;
use std::hint::black_box;
use tempfile::TempDir;

const SERVICES: &[&str] = &[
    "Lipid Profile Test (Add On with Wellness)",
    "Food Allergy Test (Add On)",
    "Wellness Package - Standard",
    "Smart DNA - Age Well Package",
    "Doctor Consultation",
    "Gut Health Test",
    "Body Composition Analysis Test (Add On)",
    "Mystery Drip",
];

const LOCATIONS: &[&str] = &["City Walk Clinic", "Index Tower", "Dubai Knowledge Park", "Marina"];

// Synthetic billing table with a realistic mix of hits and misses
fn synthetic_table(rows: usize) -> RawTable {
    let headers = InputSchema::column_names().iter().map(|s| s.to_string()).collect();
    let rows = (0..rows)
        .map(|i| {
            let price = if i % 10 == 0 { 0.0 } else { 250.0 };
            vec![
                CellValue::Number(price),
                CellValue::from(format!("Patient {}", i % 400)),
                CellValue::from(LOCATIONS[i % LOCATIONS.len()]),
                CellValue::from(SERVICES[i % SERVICES.len()]),
                CellValue::from("10:00"),
                CellValue::from(format!("TX{}", i)),
                CellValue::Empty,
                CellValue::Number(price),
                if i % 3 == 0 { CellValue::from("2024-05-01 11:00") } else { CellValue::Empty },
            ]
        })
        .collect();
    RawTable::new(headers, rows)
}

fn pipeline() -> BillingPipeline {
    BillingPipelineBuilder::new()
        .report_date(chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .build()
        .expect("pipeline")
}

fn benchmark_classification(c: &mut Criterion) {
    let profile = RuleProfile::extended();
    let classifier = TurnaroundClassifier::new(&profile);
    let canonicalizer = PackageCanonicalizer::new(&profile);

    c.bench_function("turnaround_classify", |b| {
        b.iter(|| {
            for service in SERVICES {
                black_box(classifier.classify(black_box(Some(*service))));
            }
        })
    });

    c.bench_function("package_canonicalize", |b| {
        b.iter(|| {
            for service in SERVICES {
                black_box(canonicalizer.canonicalize(black_box(Some(*service))));
            }
        })
    });
}

fn benchmark_pipeline(c: &mut Criterion) {
    let pipeline = pipeline();
    let mut group = c.benchmark_group("run_table");

    for rows in [100, 1_000, 10_000] {
        let table = synthetic_table(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, table| {
            b.iter(|| pipeline.run_table(black_box(table)).expect("report"))
        });
    }

    group.finish();
}

fn benchmark_export(c: &mut Criterion) {
    let pipeline = pipeline();
    let report = pipeline.run_table(&synthetic_table(1_000)).expect("report");
    let temp_dir = TempDir::new().expect("temp dir");

    let mut group = c.benchmark_group("export");
    group.sample_size(20);

    group.bench_function("xlsx_buffer", |b| {
        let exporter = XlsxExporter::default();
        b.iter(|| exporter.to_buffer(black_box(&report)).expect("xlsx"))
    });

    group.bench_function("csv_files", |b| {
        let exporter = CsvExporter::default();
        let path = temp_dir.path().join("bench.csv");
        b.iter(|| exporter.export(black_box(&report), &path).expect("csv"))
    });

    group.finish();
}

criterion_group!(benches, benchmark_classification, benchmark_pipeline, benchmark_export);
criterion_main!(benches);
