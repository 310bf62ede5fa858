//! Small string helpers shared by the expansion and execution stages

use std::borrow::Cow;

/// Check if a string contains only ASCII alphanumeric characters and underscores
pub fn is_simple_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Escape HTML entities efficiently
pub fn escape_html_cow(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + input.len() / 4);
    for ch in input.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(ch),
        }
    }

    Cow::Owned(result)
}

/// Inline diagnostic emitted for a variable nothing binds
pub fn missing_variable_marker(name: &str) -> String {
    format!("<!-- Variable {} not found -->", name)
}

/// Inline diagnostic emitted in place of a recursive component inclusion
pub fn recursive_component_marker(name: &str) -> String {
    format!(
        "<!-- Component {} already processed (avoiding recursion) -->",
        name
    )
}
