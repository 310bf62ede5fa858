//! Helpers for asserting on rendered output
//!
//! Rendered templates are HTML, so comparisons go through `dom_query` to
//! ignore insignificant whitespace between tags. The engine's diagnostics
//! (missing variables, skipped recursive components, converted `# ... #`
//! comments) all end up as HTML comments; [`html_comments`] collects them.
//!
//! Only compiled for tests or with the `test-utils` feature.

use dom_query::Document;
use once_cell::sync::Lazy;
use regex::Regex;

static HTML_COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--\s*(.*?)\s*-->").expect("Invalid comment regex"));

/// Normalize HTML for comparison by parsing and re-serializing
///
/// ```rust,ignore
/// use modx_engine::test_utils::normalize_html;
///
/// let html1 = "<ul><li>a</li></ul>";
/// let html2 = "<html><head></head><body><ul><li>a</li></ul></body></html>";
///
/// assert_eq!(normalize_html(html1), normalize_html(html2));
/// ```
pub fn normalize_html(html: &str) -> String {
    let doc = Document::from(html);
    doc.html().trim().to_string()
}

/// Assert that two HTML strings are equivalent after normalization
#[macro_export]
macro_rules! assert_html_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_html_eq!($left, $right, "rendered output differs")
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        {
            let left_normalized = $crate::test_utils::normalize_html($left);
            let right_normalized = $crate::test_utils::normalize_html($right);

            if left_normalized != right_normalized {
                panic!(
                    "HTML assertion failed: {}\n\nLeft (normalized):\n{}\n\nRight (normalized):\n{}\n\nOriginal left:\n{}\n\nOriginal right:\n{}",
                    format!($($arg)*),
                    left_normalized,
                    right_normalized,
                    $left,
                    $right
                );
            }
        }
    };
}

pub fn html_eq(html1: &str, html2: &str) -> bool {
    normalize_html(html1) == normalize_html(html2)
}

/// Visible text of a rendered page with whitespace collapsed
pub fn extract_text(html: &str) -> String {
    let doc = Document::from(html);
    let body = doc.select("body");
    let text = if body.nodes().is_empty() {
        doc.text()
    } else {
        body.text()
    };

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed text of every element matching `selector`, in document order
pub fn extract_text_by_selector(html: &str, selector: &str) -> Vec<String> {
    let doc = Document::from(html);
    doc.select(selector)
        .nodes()
        .iter()
        .map(|node| node.text().trim().to_string())
        .collect()
}

pub fn count_elements(html: &str, selector: &str) -> usize {
    Document::from(html).select(selector).nodes().len()
}

/// Contents of every HTML comment in the output, trimmed
pub fn html_comments(html: &str) -> Vec<String> {
    HTML_COMMENT_REGEX
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Names reported by missing-variable markers
pub fn missing_variables(html: &str) -> Vec<String> {
    html_comments(html)
        .into_iter()
        .filter_map(|comment| {
            comment
                .strip_prefix("Variable ")
                .and_then(|rest| rest.strip_suffix(" not found"))
                .map(str::to_string)
        })
        .collect()
}
