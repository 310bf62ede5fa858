//! Renders `demos/templates/text.modx` into the `main` layout.
//!
//! Run with `RUST_LOG=modx_engine=debug` to see expansion and cache activity.

use std::path::Path;
use std::time::Duration;

use modx_engine::EngineBuilder;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let templates = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/templates");
    let cache_dir = std::env::temp_dir().join("modx-engine-demo-cache");

    let engine = EngineBuilder::new()
        .with_template_dirs([templates])
        .with_cache_dir(&cache_dir)
        .namespace("template")
        .default_ttl(Duration::from_secs(3600))
        .build()?;

    let view = engine
        .view()
        .set("food", "yam")
        .set("title", "testing")
        .set("user", "ile,")
        .with([("array_test", json!(["1", 2, "testing"]))])
        .layout("main");

    let html = view.render("text", Some(Duration::from_secs(10)))?;
    println!("{}", html);

    // A second render with the same data is served from the cache directory
    let again = view.render("text", Some(Duration::from_secs(10)))?;
    assert_eq!(html, again);

    engine.clear_cache(Some("text"))?;
    println!("cache entries cleared from {}", cache_dir.display());
    Ok(())
}
