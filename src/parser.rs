//! Component directive scanning
//!
//! Component directives look like
//! `<: component card title="Hello" :item="post" >` and have no closing tag:
//! the directive ends at the first `>` that is not inside a quoted prop value.
//! That rule is why this is a small hand-written scanner and not a regex.
//!
//! Scanning happens in two steps. [`ComponentScanner`] finds directives and
//! their extent in the document; [`lex_props`] splits the prop section into
//! [`PropToken`]s with an explicit state machine. Resolving `:`-prefixed
//! (dynamic) props against a data context is left to the compiler.

use once_cell::sync::Lazy;
use regex::Regex;

static COMPONENT_OPEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<:\s*component\s+").expect("Invalid component regex"));

/// A `key="value"` pair from a component directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropToken {
    pub key: String,
    pub value: String,
    /// Written as `:key="name"`; the value names a variable in the calling scope
    pub dynamic: bool,
}

impl PropToken {
    pub fn literal<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            dynamic: false,
        }
    }

    pub fn dynamic<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            dynamic: true,
        }
    }
}

/// A component directive located in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDirective {
    /// Byte offset of the opening `<:`
    pub start: usize,
    /// Byte offset just past the terminating `>`
    pub end: usize,
    pub name: String,
    pub props: Vec<PropToken>,
}

/// Iterates over the well-formed component directives of a document in order
///
/// Openers without a terminating `>` or without a usable component name are
/// skipped and stay in the document as literal text.
pub struct ComponentScanner<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> ComponentScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, offset: 0 }
    }
}

impl<'a> Iterator for ComponentScanner<'a> {
    type Item = ComponentDirective;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.text.len() {
            let open = COMPONENT_OPEN_REGEX.find_at(self.text, self.offset)?;

            let Some(terminator) = find_terminator(self.text, open.end()) else {
                self.offset = open.end();
                continue;
            };

            let inner = &self.text[open.end()..terminator];
            let (name_raw, props_raw) = split_name(inner);
            let name = name_raw.trim_matches(|c| c == '"' || c == '\'');
            if !is_component_name(name) {
                self.offset = open.end();
                continue;
            }

            self.offset = terminator + 1;
            return Some(ComponentDirective {
                start: open.start(),
                end: terminator + 1,
                name: name.to_string(),
                props: lex_props(props_raw),
            });
        }
        None
    }
}

/// Find the first `>` at or after `from` that is outside single or double quotes
pub fn find_terminator(text: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in text[from..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(from + i),
            None => {}
        }
    }
    None
}

fn split_name(inner: &str) -> (&str, &str) {
    let inner = inner.trim_start();
    match inner.find(char::is_whitespace) {
        Some(pos) => (&inner[..pos], inner[pos..].trim()),
        None => (inner, ""),
    }
}

fn is_component_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LexState {
    Idle,
    Key,
    AfterKey,
    BeforeValue,
    Quoted(char),
    /// Discarding a malformed token; tracks an open quote so its contents are skipped too
    Skip(Option<char>),
}

/// Split the prop section of a component directive into tokens
///
/// Recognises `key="value"`, `key='value'` and the dynamic form `:key="name"`,
/// with optional whitespace around `=`. Anything else (bare words, unquoted
/// values, stray punctuation such as the `:` of a `:>` terminator) is skipped.
/// Quoted values may contain whitespace, `>` and the other quote character.
pub fn lex_props(input: &str) -> Vec<PropToken> {
    let mut tokens = Vec::new();
    let mut state = LexState::Idle;
    let mut key = String::new();
    let mut value = String::new();
    let mut dynamic = false;

    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut consumed = true;

        state = match state {
            LexState::Idle => {
                key.clear();
                value.clear();
                dynamic = false;
                if c.is_whitespace() {
                    LexState::Idle
                } else if c == ':' {
                    dynamic = true;
                    LexState::Key
                } else if is_key_char(c) {
                    key.push(c);
                    LexState::Key
                } else if c == '"' || c == '\'' {
                    LexState::Skip(Some(c))
                } else {
                    LexState::Skip(None)
                }
            }
            LexState::Key => {
                if is_key_char(c) {
                    key.push(c);
                    LexState::Key
                } else if key.is_empty() {
                    consumed = false;
                    LexState::Skip(None)
                } else if c == '=' {
                    LexState::BeforeValue
                } else if c.is_whitespace() {
                    LexState::AfterKey
                } else {
                    consumed = false;
                    LexState::Skip(None)
                }
            }
            LexState::AfterKey => {
                if c.is_whitespace() {
                    LexState::AfterKey
                } else if c == '=' {
                    LexState::BeforeValue
                } else {
                    // Bare attribute: drop it and start over on this character
                    consumed = false;
                    LexState::Idle
                }
            }
            LexState::BeforeValue => {
                if c.is_whitespace() {
                    LexState::BeforeValue
                } else if c == '"' || c == '\'' {
                    LexState::Quoted(c)
                } else {
                    LexState::Skip(None)
                }
            }
            LexState::Quoted(q) => {
                if c == q {
                    tokens.push(PropToken {
                        key: std::mem::take(&mut key),
                        value: std::mem::take(&mut value),
                        dynamic,
                    });
                    LexState::Idle
                } else {
                    value.push(c);
                    LexState::Quoted(q)
                }
            }
            LexState::Skip(None) => {
                if c.is_whitespace() {
                    LexState::Idle
                } else if c == '"' || c == '\'' {
                    LexState::Skip(Some(c))
                } else {
                    LexState::Skip(None)
                }
            }
            LexState::Skip(Some(q)) => {
                if c == q {
                    LexState::Skip(None)
                } else {
                    LexState::Skip(Some(q))
                }
            }
        };

        if consumed {
            i += 1;
        }
    }

    tokens
}
