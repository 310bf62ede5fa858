use std::fs;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modx_engine::{Context, Engine, EngineBuilder};
use serde_json::json;
use tempfile::TempDir;

fn create_site() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("layouts")).unwrap();
    fs::create_dir_all(root.join("components")).unwrap();

    fs::write(
        root.join("layouts/main.modx"),
        r#"<html>
<head><title><: title :></title></head>
<body>
    <: component header >
    <: content :>
</body>
</html>"#,
    )
    .unwrap();
    fs::write(
        root.join("components/header.modx"),
        "<header><h2><: title :></h2><p>User: <: user :></p></header>",
    )
    .unwrap();
    fs::write(
        root.join("components/row.modx"),
        r#"<li class="<: kind :>"><: label :></li>"#,
    )
    .unwrap();

    fs::write(root.join("simple.modx"), "<h1><: title :></h1><p><: description :></p>").unwrap();
    fs::write(
        root.join("list.modx"),
        r#"<: layout "main" :>
# item listing #
<ul>
<: for item in items :><: component row kind="entry" :label="item" ><: endfor :>
</ul>"#,
    )
    .unwrap();
    dir
}

fn engine(dir: &TempDir, cached: bool) -> Engine {
    let builder = EngineBuilder::new().with_template_dirs([dir.path()]);
    let builder = if cached { builder } else { builder.no_caching() };
    builder.build().unwrap()
}

fn list_context(count: usize) -> Context {
    let items: Vec<String> = (0..count).map(|i| format!("Item {}", i)).collect();
    let mut context = Context::new();
    context.insert("title", "Benchmark");
    context.insert("user", "bench");
    context.insert("items", json!(items));
    context
}

fn bench_simple_rendering(c: &mut Criterion) {
    let dir = create_site();
    let engine = engine(&dir, false);
    let mut context = Context::new();
    context.insert("title", "Simple Test Article");
    context.insert("description", "A short description & nothing more.");

    c.bench_function("render_simple", |b| {
        b.iter(|| engine.render(black_box("simple"), black_box(&context), None).unwrap())
    });
}

fn bench_rendering_scale(c: &mut Criterion) {
    let dir = create_site();
    let engine = engine(&dir, false);
    let mut group = c.benchmark_group("rendering_scale");

    for item_count in [10, 100, 1000] {
        let context = list_context(item_count);
        group.bench_with_input(
            BenchmarkId::new("items", item_count),
            &context,
            |b, context| b.iter(|| engine.render("list", black_box(context), None).unwrap()),
        );
    }
    group.finish();
}

fn bench_cached_vs_uncached(c: &mut Criterion) {
    let dir = create_site();
    let cached = engine(&dir, true);
    let uncached = engine(&dir, false);
    let context = list_context(100);

    let mut group = c.benchmark_group("cached_vs_uncached");
    group.bench_function("uncached", |b| {
        b.iter(|| uncached.render("list", black_box(&context), None).unwrap())
    });
    group.bench_function("cached", |b| {
        b.iter(|| cached.render("list", black_box(&context), None).unwrap())
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_simple_rendering,
    bench_rendering_scale,
    bench_cached_vs_uncached
);
criterion_main!(benches);
