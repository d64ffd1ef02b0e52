//! Benchmarks for the iterative tree traversals.
//!
//! Run with: cargo bench -p conifer-core

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::Value;

use conifer_core::{deep_copy, from_json, hash_code, render, structural_eq, Element, List, Node};

/// Build `depth` levels of single-element list nesting around a scalar.
fn deep_tree(depth: usize) -> Element {
    let mut current: Element = 0i64.into();
    for _ in 0..depth {
        current = Element::List(List::with_items(vec![current]));
    }
    current
}

/// Build a node of `width` keys, each holding a small list.
fn wide_tree(width: usize) -> Element {
    let node = Node::new();
    for i in 0..width {
        let items = vec![(i as i64).into(), format!("value-{i}").into(), (i % 2 == 0).into()];
        node.insert(&format!("key-{i}"), Element::List(List::with_items(items)))
            .unwrap();
    }
    Element::Node(node)
}

fn bench_traversals(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");

    for depth in [1_000, 10_000] {
        let tree = deep_tree(depth);
        group.bench_with_input(BenchmarkId::new("hash_deep", depth), &tree, |b, tree| {
            b.iter(|| black_box(hash_code(black_box(tree))));
        });
        group.bench_with_input(BenchmarkId::new("copy_deep", depth), &tree, |b, tree| {
            b.iter(|| black_box(deep_copy(black_box(tree)).unwrap()));
        });
    }

    for width in [100, 10_000] {
        let tree = wide_tree(width);
        group.bench_with_input(BenchmarkId::new("hash_wide", width), &tree, |b, tree| {
            b.iter(|| black_box(hash_code(black_box(tree))));
        });
        group.bench_with_input(BenchmarkId::new("render_wide", width), &tree, |b, tree| {
            b.iter(|| black_box(render(black_box(tree))));
        });
        let other = wide_tree(width);
        group.bench_with_input(BenchmarkId::new("eq_wide", width), &tree, |b, tree| {
            b.iter(|| black_box(structural_eq(black_box(tree), black_box(&other))));
        });
    }

    group.finish();
}

fn bench_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("json");

    let value: Value = serde_json::json!({
        "servers": (0..500).map(|i| serde_json::json!({
            "host": format!("node-{i}.internal"),
            "port": 8000 + i,
            "tls": i % 3 == 0,
            "weights": [1.5, 2.5, 3.5],
        })).collect::<Vec<_>>(),
    });

    group.bench_function("from_json_500_rows", |b| {
        b.iter(|| black_box(from_json(black_box(&value)).unwrap()));
    });

    let tree = from_json(&value).unwrap();
    group.bench_function("to_json_500_rows", |b| {
        b.iter(|| black_box(conifer_core::to_json(black_box(&tree)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_traversals, bench_json);
criterion_main!(benches);
