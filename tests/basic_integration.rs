//! Basic integration tests for template rendering
//!
//! These tests write real template directories to disk and render them
//! through the full engine: layouts, loops, components, variables and
//! comments.

use std::fs;
use std::path::Path;

use modx_engine::test_utils::{extract_text, extract_text_by_selector, missing_variables};
use modx_engine::{assert_html_eq, Context, Engine, EngineBuilder, Error, TemplateKind};
use serde::Serialize;
use serde_json::json;
use tempfile::TempDir;

struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn file(&self, relative: &str, contents: &str) -> &Self {
        write_file(self.dir.path(), relative, contents);
        self
    }

    fn engine(&self) -> Engine {
        EngineBuilder::new()
            .with_template_dirs([self.dir.path()])
            .no_caching()
            .build()
            .unwrap()
    }
}

fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn context(value: serde_json::Value) -> Context {
    let mut context = Context::new();
    context.extend_from_serialize(&value).unwrap();
    context
}

#[test]
fn test_variable_rendering() {
    let site = Site::new();
    site.file("page.modx", "<h1><: title :></h1>");

    let result = site
        .engine()
        .render("page", &context(json!({"title": "Hi"})), None)
        .unwrap();
    assert_eq!(result, "<h1>Hi</h1>");
}

#[test]
fn test_values_are_escaped() {
    let site = Site::new();
    site.file("page.modx", "<p><: title :></p>");

    let result = site
        .engine()
        .render("page", &context(json!({"title": "<b>Fish & Chips</b>"})), None)
        .unwrap();
    assert_eq!(result, "<p>&lt;b&gt;Fish &amp; Chips&lt;/b&gt;</p>");
}

#[test]
fn test_missing_variable_renders_marker() {
    let site = Site::new();
    site.file("page.modx", "<h1><: title :></h1>");

    let result = site.engine().render("page", &Context::new(), None).unwrap();
    assert_eq!(result, "<h1><!-- Variable title not found --></h1>");
    assert_eq!(missing_variables(&result), vec!["title"]);
}

#[test]
fn test_loop_rendering() {
    let site = Site::new();
    site.file("list.modx", "<: for x in items :><: x :><: endfor :>");

    let result = site
        .engine()
        .render("list", &context(json!({"items": ["a", "b"]})), None)
        .unwrap();
    assert_eq!(result, "ab");
}

#[test]
fn test_loop_with_index_and_object() {
    let site = Site::new();
    site.file(
        "list.modx",
        "<: for x, i in items :><: i :>=<: x :> <: endfor :>|<: for v, k in meta :><: k :>=<: v :> <: endfor :>",
    );

    let data = context(json!({
        "items": ["a", "b"],
        "meta": {"lang": "en", "year": 2024}
    }));
    let result = site.engine().render("list", &data, None).unwrap();
    assert_eq!(result, "0=a 1=b |lang=en year=2024 ");
}

#[test]
fn test_nested_loops() {
    let site = Site::new();
    site.file(
        "grid.modx",
        "<: for row in rows :>[<: for cell in row :><: cell :><: endfor :>]<: endfor :>",
    );

    let result = site
        .engine()
        .render("grid", &context(json!({"rows": [[1, 2], [3]]})), None)
        .unwrap();
    assert_eq!(result, "[12][3]");
}

#[test]
fn test_loop_over_missing_collection_fails() {
    let site = Site::new();
    site.file("list.modx", "<: for x in nothing :>.<: endfor :>");

    let err = site.engine().render("list", &Context::new(), None).unwrap_err();
    assert!(matches!(err, Error::RenderError(_)));
    assert!(err.to_string().contains("Undefined collection 'nothing'"));
}

#[test]
fn test_layout_merge() {
    let site = Site::new();
    site.file("layouts/base.modx", "<html><: content :></html>")
        .file("page.modx", r#"<: layout "base" :>BODY"#);

    let result = site.engine().render("page", &Context::new(), None).unwrap();
    assert_eq!(result, "<html>BODY</html>");
}

#[test]
fn test_layout_with_variables_in_both_parts() {
    let site = Site::new();
    site.file(
        "layouts/main.modx",
        "<html><head><title><: title :></title></head><body><: content :></body></html>",
    )
    .file("page.modx", r#"<: layout "main" :><h1><: title :></h1># generated #"#);

    let result = site
        .engine()
        .render("page", &context(json!({"title": "Docs"})), None)
        .unwrap();
    assert_html_eq!(
        &result,
        "<html><head><title>Docs</title></head><body><h1>Docs</h1><!-- generated --></body></html>"
    );
    assert_eq!(extract_text_by_selector(&result, "h1"), vec!["Docs"]);
}

#[test]
fn test_missing_layout_is_an_error() {
    let site = Site::new();
    site.file("page.modx", r#"<: layout "nowhere" :>BODY"#);

    let err = site.engine().render("page", &Context::new(), None).unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: TemplateKind::Layout,
            ..
        }
    ));
}

#[test]
fn test_missing_template_lists_searched_dirs() {
    let site = Site::new();
    let err = site.engine().render("ghost", &Context::new(), None).unwrap_err();

    assert!(err.is_not_found());
    let message = err.to_string();
    assert!(message.contains("ghost"));
    assert!(message.contains(&site.dir.path().display().to_string()));
}

#[test]
fn test_component_props_inside_loop() {
    let site = Site::new();
    site.file("components/card.modx", "<li><: label :>=<: post :></li>")
        .file(
            "posts.modx",
            r#"<ul><: for p in posts :><: component card label="Post" :post="p" ><: endfor :></ul>"#,
        );

    let result = site
        .engine()
        .render("posts", &context(json!({"posts": ["one", "two"]})), None)
        .unwrap();
    assert_eq!(result, "<ul><li>Post=one</li><li>Post=two</li></ul>");
    assert_eq!(extract_text(&result), "Post=one Post=two");
}

#[test]
fn test_component_props_do_not_leak() {
    let site = Site::new();
    site.file("components/badge.modx", "<b><: label :></b>")
        .file("page.modx", r#"<: component badge label="new" >|<: label :>"#);

    let result = site.engine().render("page", &Context::new(), None).unwrap();
    assert_eq!(result, "<b>new</b>|<!-- Variable label not found -->");
}

#[test]
fn test_component_sees_caller_data() {
    let site = Site::new();
    site.file("components/header.modx", "<header><: title :> by <: user :></header>")
        .file("page.modx", "<: component header >");

    let result = site
        .engine()
        .render("page", &context(json!({"title": "News", "user": "ann"})), None)
        .unwrap();
    assert_eq!(result, "<header>News by ann</header>");
}

#[test]
fn test_recursive_component_is_cut() {
    let site = Site::new();
    site.file("components/tree.modx", "node(<: component tree >)")
        .file("page.modx", "<: component tree >");

    let result = site.engine().render("page", &Context::new(), None).unwrap();
    assert_eq!(
        result,
        "node(<!-- Component tree already processed (avoiding recursion) -->)"
    );
}

#[test]
fn test_repeated_sibling_components() {
    let site = Site::new();
    site.file("components/sep.modx", "<hr>")
        .file("page.modx", "a<: component sep >b<: component sep >c");

    let result = site.engine().render("page", &Context::new(), None).unwrap();
    assert_eq!(result, "a<hr>b<hr>c");
}

#[test]
fn test_missing_component_is_an_error() {
    let site = Site::new();
    site.file("page.modx", "<: component ghost >");

    let err = site.engine().render("page", &Context::new(), None).unwrap_err();
    assert!(matches!(
        err,
        Error::NotFound {
            kind: TemplateKind::Component,
            ..
        }
    ));
}

#[test]
fn test_malformed_directives_stay_literal() {
    let site = Site::new();
    site.file("page.modx", "<p>x</p><: for a in b :>unclosed");

    let result = site.engine().render("page", &Context::new(), None).unwrap();
    assert_eq!(result, "<p>x</p><: for a in b :>unclosed");
}

#[test]
fn test_iteration_cap() {
    let site = Site::new();
    site.file("page.modx", "<: title :>");
    let engine = EngineBuilder::new()
        .with_template_dirs([site.dir.path()])
        .max_iterations(1)
        .build()
        .unwrap();

    let err = engine
        .render("page", &context(json!({"title": "x"})), None)
        .unwrap_err();
    assert!(matches!(err, Error::IterationLimit { limit: 1 }));
}

#[test]
fn test_empty_output_is_an_error() {
    let site = Site::new();
    site.file("blank.modx", "");

    let err = site.engine().render("blank", &Context::new(), None).unwrap_err();
    assert!(matches!(err, Error::EmptyOutput { ref template } if template == "blank"));
}

#[test]
fn test_rendering_is_deterministic() {
    let site = Site::new();
    site.file("components/item.modx", "<li><: name :></li>")
        .file(
            "page.modx",
            r#"<ul><: for n in names :><: component item :name="n" ><: endfor :></ul>"#,
        );
    let engine = site.engine();
    let data = context(json!({"names": ["x", "y", "z"]}));

    let first = engine.render("page", &data, None).unwrap();
    let second = engine.render("page", &data, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, "<ul><li>x</li><li>y</li><li>z</li></ul>");
}

#[test]
fn test_template_dirs_are_searched_in_order() {
    let first = Site::new();
    let second = Site::new();
    first.file("page.modx", "first <: component shared >");
    second
        .file("page.modx", "second")
        .file("components/shared.modx", "from second");

    let engine = EngineBuilder::new()
        .with_template_dirs([first.dir.path(), second.dir.path()])
        .build()
        .unwrap();
    let result = engine.render("page", &Context::new(), None).unwrap();
    assert_eq!(result, "first from second");
}

#[derive(Serialize)]
struct Profile {
    name: String,
    tags: Vec<&'static str>,
}

#[test]
fn test_view_facade() {
    let site = Site::new();
    site.file("layouts/main.modx", "<main><: content :></main>")
        .file("layouts/alt.modx", "<aside><: content :></aside>")
        .file("plain.modx", "<p><: name :>: <: for t in tags :>[<: t :>]<: endfor :></p>")
        .file("own.modx", r#"<: layout "alt" :><: name :>"#);
    let engine = site.engine();

    let view = engine
        .view()
        .with_serialize(&Profile {
            name: "Ann".to_string(),
            tags: vec!["a", "b"],
        })
        .unwrap()
        .layout("main");

    assert_eq!(
        view.render("plain", None).unwrap(),
        "<main><p>Ann: [a][b]</p></main>"
    );
    // A layout directive in the template takes precedence over the default
    assert_eq!(view.render("own", None).unwrap(), "<aside>Ann</aside>");

    let bare = engine.view().set("name", "Bo").set("tags", json!([]));
    assert_eq!(bare.render("plain", None).unwrap(), "<p>Bo: </p>");

    // Every view method chains in any order
    let mixed = engine
        .view()
        .set("name", "Ed")
        .layout("main")
        .with([("tags", json!(["q"]))])
        .set("extra", 1);
    assert_eq!(mixed.render("plain", None).unwrap(), "<main><p>Ed: [q]</p></main>");

    let batch = engine
        .view()
        .with([("name", json!("Cy")), ("tags", json!(["z"]))])
        .with([("name", "Di")]);
    assert_eq!(batch.context().len(), 2);
    assert_eq!(batch.render("plain", None).unwrap(), "<p>Di: [z]</p>");
}

#[test]
fn test_expand_exposes_instructions() {
    let site = Site::new();
    site.file("page.modx", "<: for x in items :><: x :><: endfor :>");

    let expanded = site.engine().expand("page", &Context::new()).unwrap();
    assert_eq!(
        expanded.text(),
        "<?modx foreach items as __index => x ?><?modx echo x ?><?modx endforeach ?>"
    );
    assert!(expanded.frames().is_empty());
}
