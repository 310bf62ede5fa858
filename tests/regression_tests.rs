//! Regression tests for edge cases in directive expansion and execution

use std::fs;

use modx_engine::{Context, Engine, EngineBuilder};
use serde_json::{json, Value};
use tempfile::TempDir;

fn render(files: &[(&str, &str)], template: &str, data: Value) -> String {
    let dir = TempDir::new().unwrap();
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    let engine: Engine = EngineBuilder::new()
        .with_template_dirs([dir.path()])
        .no_caching()
        .build()
        .unwrap();
    let mut context = Context::new();
    context.extend_from_serialize(&data).unwrap();
    engine.render(template, &context, None).unwrap()
}

#[test]
fn test_regression_empty_array_handling() {
    let result = render(
        &[(
            "page.modx",
            "<ul><: for x in items :><li><: x :></li><: endfor :></ul><p>Count: <: count :></p>",
        )],
        "page",
        json!({"items": [], "count": 0}),
    );
    assert_eq!(result, "<ul></ul><p>Count: 0</p>");
}

#[test]
fn test_regression_dollar_signs_in_layout_body() {
    let result = render(
        &[
            ("layouts/l.modx", "<div><: content :></div>"),
            ("page.modx", r#"<: layout "l" :>Price: $1 and ${name}"#),
        ],
        "page",
        json!({}),
    );
    assert_eq!(result, "<div>Price: $1 and ${name}</div>");
}

#[test]
fn test_regression_quoted_angle_bracket_in_prop() {
    let result = render(
        &[
            ("components/alert.modx", "<em><: message :></em>"),
            ("page.modx", r#"<: component alert message="a > b" >!"#),
        ],
        "page",
        json!({}),
    );
    assert_eq!(result, "<em>a &gt; b</em>!");
}

#[test]
fn test_regression_unicode_content() {
    let result = render(
        &[("page.modx", "<h1><: title :></h1>")],
        "page",
        json!({"title": "Grüße 🌍"}),
    );
    assert_eq!(result, "<h1>Grüße 🌍</h1>");
}

#[test]
fn test_regression_multiline_comment() {
    let result = render(&[("page.modx", "<p>a</p>#\nmulti\nline\n#")], "page", json!({}));
    assert_eq!(result, "<p>a</p><!-- multi\nline -->");
}

#[test]
fn test_regression_null_renders_as_nothing() {
    let result = render(
        &[("page.modx", "<h1><: title :></h1>")],
        "page",
        json!({"title": null}),
    );
    assert_eq!(result, "<h1></h1>");
}

#[test]
fn test_regression_dynamic_prop_naming_missing_variable() {
    let result = render(
        &[
            ("components/badge.modx", "<b><: label :></b>"),
            ("page.modx", r#"<: component badge :label="nothing" >"#),
        ],
        "page",
        json!({}),
    );
    assert_eq!(result, "<b></b>");
}

#[test]
fn test_regression_props_forwarded_through_nested_components() {
    let result = render(
        &[
            ("components/card.modx", r#"<div><: component heading :text="title" ></div>"#),
            ("components/heading.modx", "<h3><: text :></h3>"),
            (
                "page.modx",
                r#"<: for t in titles :><: component card :title="t" ><: endfor :>"#,
            ),
        ],
        "page",
        json!({"titles": ["x", "y"]}),
    );
    assert_eq!(result, "<div><h3>x</h3></div><div><h3>y</h3></div>");
}

#[test]
fn test_regression_directive_whitespace_variants() {
    let result = render(
        &[("page.modx", "<:title:>|<:   title   :>|<: for x in xs:><:x:><:endfor:>")],
        "page",
        json!({"title": "t", "xs": [1]}),
    );
    assert_eq!(result, "t|t|1");
}

#[test]
fn test_regression_orphan_endfor_is_literal() {
    let result = render(&[("page.modx", "a<: endfor :>b")], "page", json!({}));
    assert_eq!(result, "a<: endfor :>b");
}

#[test]
fn test_regression_quoted_component_name() {
    let result = render(
        &[
            ("components/badge.modx", "<b><: label :></b>"),
            ("page.modx", r#"<: component "badge" label="x" >"#),
        ],
        "page",
        json!({}),
    );
    assert_eq!(result, "<b>x</b>");
}
