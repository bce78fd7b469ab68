//! Benchmarks for ccmcp's hot paths: store startup/seeding, query
//! execution, and free-form query parsing/compilation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ccmcp::search::compiler::compile;
use ccmcp::search::parser::parse;
use ccmcp::sources::relational::RelationalStore;

fn startup_and_seed(c: &mut Criterion) {
    c.bench_function("startup_and_seed", |b| {
        b.iter(|| {
            RelationalStore::open_in_memory().unwrap();
        });
    });
}

fn query_count(c: &mut Criterion) {
    let store = RelationalStore::open_in_memory().unwrap();
    c.bench_function("query_count", |b| {
        b.iter(|| {
            store.execute(black_box("SELECT COUNT(*) FROM users"), &[]).unwrap();
        });
    });
}

fn query_group_by(c: &mut Criterion) {
    let store = RelationalStore::open_in_memory().unwrap();
    c.bench_function("query_group_by", |b| {
        b.iter(|| {
            store
                .execute(black_box("SELECT region, count(*) FROM users GROUP BY region"), &[])
                .unwrap();
        });
    });
}

fn parse_query(c: &mut Criterion) {
    c.bench_function("parse_query", |b| {
        b.iter(|| {
            parse(black_box("region EU or region NA and signed up last month"));
        });
    });
}

fn parse_and_compile(c: &mut Criterion) {
    c.bench_function("parse_and_compile", |b| {
        b.iter(|| {
            let dnf = parse(black_box("email apiuser21@example.com"));
            compile(&dnf);
        });
    });
}

criterion_group!(benches, startup_and_seed, query_count, query_group_by, parse_query, parse_and_compile);
criterion_main!(benches);
