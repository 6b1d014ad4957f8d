//! # Session Paging Benchmarks
//!
//! | Operation | Expectation |
//! |-----------|-------------|
//! | first page (store + cut) | linear in result count |
//! | cursor page | independent of result count |
//! | full cursor walk | linear in page count |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::SearchMode;
use std::time::Duration;
use sw_03_search_sessions::{PageRequest, SearchParams, SessionStore};
use sw_tests::integration::harness::numbered_results;

fn params() -> SearchParams {
    SearchParams {
        top_k: Some(1000),
        threshold: Some(0.6),
        ..SearchParams::new(SearchMode::Semantic, "request handler", "/repo")
    }
}

fn bench_first_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("sw-03-first-page");
    group.measurement_time(Duration::from_secs(5));
    let store = SessionStore::default();
    let request = PageRequest::with_page_size(50);

    for size in [100, 1_000, 10_000] {
        let results = numbered_results(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("store_and_cut", size), &results, |b, results| {
            b.iter(|| {
                black_box(
                    store
                        .first_page(params(), results.clone(), &request)
                        .expect("first page"),
                )
            })
        });
    }
    group.finish();
}

fn bench_cursor_pages(c: &mut Criterion) {
    let mut group = c.benchmark_group("sw-03-cursor-page");
    let store = SessionStore::default();

    for size in [1_000, 10_000] {
        let first = store
            .first_page(params(), numbered_results(size), &PageRequest::with_page_size(50))
            .expect("first page");
        let cursor = first.next_cursor.expect("more than one page");

        group.bench_with_input(BenchmarkId::new("second_page", size), &cursor, |b, cursor| {
            b.iter(|| {
                black_box(
                    store
                        .page_by_cursor(cursor, &params(), &PageRequest::default())
                        .expect("cursor page"),
                )
            })
        });
    }

    group.bench_function("walk_2000_by_200", |b| {
        b.iter(|| {
            let mut page = store
                .first_page(params(), numbered_results(2_000), &PageRequest::with_page_size(200))
                .expect("first page");
            let mut pages = 1;
            while let Some(cursor) = page.next_cursor.take() {
                page = store
                    .page_by_cursor(&cursor, &params(), &PageRequest::default())
                    .expect("cursor page");
                pages += 1;
            }
            black_box(pages)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_first_page, bench_cursor_pages);
criterion_main!(benches);
