//! Healing Operations Benchmarks
//!
//! Benchmarks for encoding, neighbor search and full healing passes.
//!
//! Run with: `cargo bench --bench healing_ops`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use selfheal::{
    AttributeTable, CosineKnn, ElementRecord, HealConfig, Healer, MemoryRepository,
    NeighborAlgorithm, OneHotEncoder, Repository, SimilarityIndex,
};

const STALE: &str = "//*[@id='login-button']";

fn page(size: usize) -> Vec<ElementRecord> {
    (0..size)
        .map(|i| {
            let tag = ["div", "span", "a", "button", "input"][i % 5];
            ElementRecord::new(format!("//*[@id='el-{i}']"), tag)
                .with_text(format!("Item {}", i % 37))
                .with_attribute("class", format!("col-{} row-{}", i % 12, i % 7))
                .with_attribute("id", format!("el-{i}"))
        })
        .collect()
}

fn stale_element() -> ElementRecord {
    ElementRecord::new(STALE, "button")
        .with_text("Item 3")
        .with_attribute("class", "col-3 row-3")
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [50, 500, 2000] {
        let table = AttributeTable::from_records(&page(size));
        let element = table.project(&stale_element());
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |bench, table| {
            let encoder = OneHotEncoder::new();
            bench.iter(|| {
                let encoded = encoder
                    .encode(black_box(table), std::slice::from_ref(&element))
                    .unwrap();
                black_box(encoded);
            });
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_query");

    for size in [50, 500, 2000] {
        let table = AttributeTable::from_records(&page(size));
        let element = table.project(&stale_element());
        let encoded = OneHotEncoder::new()
            .encode(&table, std::slice::from_ref(&element))
            .unwrap();
        let backend = CosineKnn::new(NeighborAlgorithm::Brute).unwrap();
        let index = backend.fit(&encoded.page).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| {
                let neighbors = backend
                    .query(&index, black_box(&encoded.elements[0]), 5)
                    .unwrap();
                black_box(neighbors);
            });
        });
    }

    group.finish();
}

fn bench_heal(c: &mut Criterion) {
    let mut group = c.benchmark_group("heal");

    for size in [50, 500] {
        let mut repo = MemoryRepository::new();
        repo.write_element(&stale_element()).unwrap();
        repo.write_page(&page(size)).unwrap();
        let healer = Healer::new(repo, HealConfig::default().with_similarity_threshold(None))
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |bench, _| {
            bench.iter(|| black_box(healer.heal(black_box(STALE))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_query, bench_heal);
criterion_main!(benches);
