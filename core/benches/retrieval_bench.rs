use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use ta_core::tokenizer::tokenize;
use ta_core::{search, Document, DocumentKind, Index};

const SAMPLE: &str = "Should I use gpt-4o-mini or gpt-3.5-turbo for the assignment? \
    The proxy only supports gpt-4o-mini, so use the OpenAI API directly for the older model. \
    Remember that token costs differ between the two models and grading checks the exact model name.";

fn documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| Document {
            id: format!("post:{i}"),
            kind: DocumentKind::DiscoursePost,
            title: format!("Thread {i}"),
            text: format!("Thread {i} week {} {}", i % 12, SAMPLE),
            source_url: Some(format!("https://forum.example/t/{i}")),
            metadata: BTreeMap::new(),
        })
        .collect()
}

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_sample", |b| b.iter(|| tokenize(black_box(SAMPLE))));
}

fn bench_build(c: &mut Criterion) {
    let docs = documents(1_000);
    c.bench_function("build_1k_docs", |b| b.iter(|| Index::build(black_box(docs.clone()))));
}

fn bench_search(c: &mut Criterion) {
    let index = Index::build(documents(1_000));
    c.bench_function("search_1k_docs", |b| {
        b.iter(|| search(&index, black_box("gpt-3.5-turbo token cost week 3"), 5))
    });
}

criterion_group!(benches, bench_tokenize, bench_build, bench_search);
criterion_main!(benches);
