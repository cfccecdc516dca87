//! Benchmarks for insertion, point lookup and multi-keyword scanning.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use triekv::Trie;

fn generate_keywords(n: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n)
        .map(|_| {
            let len = rng.gen_range(3..12);
            (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect()
        })
        .collect()
}

fn generate_input(keywords: &[String], words: usize) -> String {
    let mut rng = StdRng::seed_from_u64(7);
    let mut out = String::new();
    for _ in 0..words {
        out.push_str(&keywords[rng.gen_range(0..keywords.len())]);
        out.push(' ');
    }
    out
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in [1_000, 10_000] {
        let keywords = generate_keywords(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut trie: Trie<u64> = Trie::new();
                for (i, key) in keywords.iter().enumerate() {
                    trie.put(key.as_bytes(), i as u64).unwrap();
                }
                black_box(trie)
            });
        });
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for size in [1_000, 10_000] {
        let keywords = generate_keywords(size);
        let mut trie: Trie<u64> = Trie::new();
        for (i, key) in keywords.iter().enumerate() {
            trie.put(key.as_bytes(), i as u64).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut found = 0usize;
                for key in &keywords {
                    if trie.get(key.as_bytes()).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            });
        });
    }
    group.finish();
}

fn bench_match_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_all");
    for size in [100, 1_000] {
        let keywords = generate_keywords(size);
        let input = generate_input(&keywords, 200);
        let mut trie: Trie<u64> = Trie::new();
        for (i, key) in keywords.iter().enumerate() {
            trie.put(key.as_bytes(), i as u64).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut hits = 0usize;
                trie.match_all(input.as_bytes(), |_, _| {
                    hits += 1;
                    true
                });
                black_box(hits)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_match_all);
criterion_main!(benches);
