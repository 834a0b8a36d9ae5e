//! Benchmarks for record validation, reference resolution and projection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

use docweave::search::projector::project_record;
use docweave::{Doclet, ElasticlunrIndex, Findings, IndexBuilder, RecordValidator, Resolver, SymbolRegistry};

/// A module record with `statics` static members, each extending a sibling.
fn generate_record(library: usize, module: usize, statics: usize) -> Value {
    let name = format!("lib{}/Module{}", library, module);
    let members: Vec<Value> = (0..statics)
        .map(|i| {
            json!({
                "name": format!("member{}", i),
                "kind": "function",
                "memberof": name,
                "description": {"type": "root", "children": [
                    {"type": "text", "value": format!("Member {} of {}", i, name)}
                ]},
                "tags": [{"title": "extends", "name": format!("{}.member{}", name, (i + 1) % statics)}],
                "context": {"file": format!("{}/index.js", name), "loc": {"start": {"line": i + 1, "column": 0}}}
            })
        })
        .collect();

    json!([{
        "name": name,
        "kind": "module",
        "path": [{"name": name, "kind": "module"}],
        "description": {"type": "root", "children": [
            {"type": "link", "url": format!("lib{}/Module0", library), "children": []}
        ]},
        "members": {"static": members, "instance": []}
    }])
}

fn generate_corpus(modules: usize) -> Vec<(String, Vec<Doclet>)> {
    (0..modules)
        .map(|i| {
            let library = i % 8;
            let docs = serde_json::from_value(generate_record(library, i, 20))
                .expect("Failed to build doclets");
            (format!("lib{}/Module{}", library, i), docs)
        })
        .collect()
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    for size in [100, 1_000].iter() {
        let corpus = generate_corpus(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &corpus, |b, corpus| {
            b.iter(|| {
                let mut registry = SymbolRegistry::new();
                let mut findings = Findings::new();
                for (expected, docs) in corpus {
                    RecordValidator::new(expected.as_str()).validate(docs, &mut registry, &mut findings);
                }
                black_box(registry.module_count())
            });
        });
    }

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for size in [100, 1_000].iter() {
        let mut registry = SymbolRegistry::new();
        let mut findings = Findings::new();
        for (expected, docs) in generate_corpus(*size) {
            RecordValidator::new(expected).validate(&docs, &mut registry, &mut findings);
        }
        let resolver = Resolver::new(false, vec!["spotlight/Spotlight".to_string()]);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &registry, |b, registry| {
            b.iter(|| black_box(resolver.resolve(registry).len()));
        });
    }

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");

    for size in [100, 1_000].iter() {
        let records: Vec<Value> = (0..*size).map(|i| generate_record(i % 8, i, 20)).collect();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| {
                let mut index = ElasticlunrIndex::for_docs();
                for record in records {
                    let doc = project_record(record, "docs/modules").expect("Failed to project");
                    index.add_doc(&doc).expect("Failed to index");
                }
                black_box(index.to_json())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validation, bench_resolution, bench_projection);
criterion_main!(benches);
