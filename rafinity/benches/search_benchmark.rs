use criterion::{criterion_group, criterion_main, Criterion};
use rafinity::{Catalog, LookupConfig, RafinityLookup, SearchIndex};

fn setup_index() -> SearchIndex {
    let catalog = Catalog::from_rows(demo_data::catalog_rows().to_vec());
    SearchIndex::build(catalog, &LookupConfig::default().fuzzy)
}

fn bench_fuzzy(c: &mut Criterion) {
    let index = setup_index();

    let queries = vec![
        ("code_prefix", "e11"),
        ("exact_code", "E11.9"),
        ("short_word", "copd"),
        ("medium_word", "diabetes"),
        ("fuzzy_typo", "diabtes"),
        ("multi_word", "chronic kidney disease"),
        ("long_query", "type 2 diabetes mellitus with diabetic chronic kidney disease stage 4"),
    ];

    let mut group = c.benchmark_group("fuzzy_search");
    group.sample_size(50);

    for (name, query) in queries {
        group.bench_function(name, |b| b.iter(|| index.fuzzy_search(query, 50)));
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let lookup = RafinityLookup::new(demo_data::catalog_json().to_string(), None).unwrap();
    lookup.set_premium(true);

    // Second and later iterations are cache hits
    c.bench_function("lookup_search_cached", |b| {
        b.iter(|| rt.block_on(async { lookup.search("heart failure".to_string()).await.unwrap() }))
    });

    c.bench_function("index_build", |b| b.iter(setup_index));
}

criterion_group!(benches, bench_fuzzy, bench_lookup);
criterion_main!(benches);
