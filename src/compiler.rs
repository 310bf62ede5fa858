//! Directive expansion
//!
//! The [`Compiler`] turns template source into an [`Expanded`] document:
//!
//! 1. the layout directive (`<: layout "name" :>`) is applied once, merging
//!    the rest of the document into the layout's `<: content :>` placeholder;
//! 2. the fixed-point driver then repeats loop expansion, comment conversion,
//!    component inlining and variable substitution until a full pass leaves
//!    the text unchanged.
//!
//! Each pass is a plain text-to-text function. Components are expanded
//! depth-first with their own scoped context, so props never leak back into
//! the caller. Per-render bookkeeping (loop-bound names, the chain of
//! components being expanded, component prop frames) lives in a
//! [`RenderState`] that is created fresh for every render.
//!
//! Malformed directives (an unterminated loop, an orphan `<: endfor :>`, a
//! component directive without a closing `>`) are not errors: they simply do
//! not match and stay in the output as literal text.

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::ir::{Instruction, DEFAULT_INDEX_NAME};
use crate::locator::TemplateLocator;
use crate::parser::{ComponentDirective, ComponentScanner};
use crate::types::{Binding, Expanded, Frame, TemplateKind};
use crate::utils::{missing_variable_marker, recursive_component_marker};
use crate::value::Context;

static LAYOUT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<:\s*layout\s*['"](\w+)['"]\s*:>(.*)"#).expect("Invalid layout regex")
});

static CONTENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<:\s*content\s*:>").expect("Invalid content regex"));

static LOOP_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<:\s*(?:for\s+(\w+)(?:\s*,\s*(\w+))?\s+in\s+(\w+)|(endfor))\s*:>")
        .expect("Invalid loop regex")
});

static COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)#\s*(.*?)\s*#").expect("Invalid comment regex"));

static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<:\s*(\w+)\s*:>").expect("Invalid variable regex"));

/// Keyword that closes a loop; never treated as a variable
const ENDFOR: &str = "endfor";

/// Bookkeeping for a single top-level render
#[derive(Debug, Default)]
pub struct RenderState {
    loop_bound: HashSet<String>,
    /// Components currently being expanded, outermost first
    chain: Vec<String>,
    frames: Vec<Frame>,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names introduced by loop directives so far
    pub fn loop_bound(&self) -> &HashSet<String> {
        &self.loop_bound
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

pub struct Compiler<'a> {
    locator: &'a dyn TemplateLocator,
    max_iterations: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(locator: &'a dyn TemplateLocator, max_iterations: usize) -> Self {
        Self {
            locator,
            max_iterations,
        }
    }

    /// Expand a whole template document
    ///
    /// `default_layout` is used when the document has no layout directive of
    /// its own.
    pub fn compile(
        &self,
        source: &str,
        context: &Context,
        default_layout: Option<&str>,
    ) -> Result<Expanded> {
        let mut state = RenderState::new();
        let composed = self.compose_layout(source, default_layout)?;
        let text = self.expand(&composed, context, &mut state)?;
        Ok(Expanded::new(text, state.into_frames()))
    }

    /// Merge a document into its layout
    ///
    /// Text before the layout directive is kept in front of the merged layout.
    /// A missing layout file is fatal.
    pub fn compose_layout(&self, source: &str, default_layout: Option<&str>) -> Result<String> {
        if let Some(caps) = LAYOUT_REGEX.captures(source) {
            let (Some(whole), Some(name), Some(body)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                return Ok(source.to_string());
            };
            let merged = self.merge_into_layout(name.as_str(), body.as_str())?;
            let mut result = String::with_capacity(whole.start() + merged.len());
            result.push_str(&source[..whole.start()]);
            result.push_str(&merged);
            return Ok(result);
        }

        match default_layout {
            Some(name) => self.merge_into_layout(name, source),
            None => Ok(source.to_string()),
        }
    }

    fn merge_into_layout(&self, name: &str, body: &str) -> Result<String> {
        let layout = self.locator.load(name, TemplateKind::Layout)?;
        tracing::debug!(layout = name, "merging template body into layout");
        Ok(CONTENT_REGEX.replace_all(&layout, NoExpand(body)).into_owned())
    }

    /// Run expansion passes until the text stops changing
    ///
    /// Fails with [`Error::IterationLimit`] if no fixed point is reached within
    /// the configured number of passes.
    pub fn expand(&self, text: &str, context: &Context, state: &mut RenderState) -> Result<String> {
        let mut current = text.to_string();
        for iteration in 1..=self.max_iterations {
            let next = self.expansion_pass(&current, context, state)?;
            if next == current {
                tracing::trace!(iteration, "expansion reached a fixed point");
                return Ok(next);
            }
            current = next;
        }

        tracing::error!(limit = self.max_iterations, "expansion did not reach a fixed point");
        Err(Error::IterationLimit {
            limit: self.max_iterations,
        })
    }

    fn expansion_pass(&self, text: &str, context: &Context, state: &mut RenderState) -> Result<String> {
        let text = expand_loops(text, &mut state.loop_bound);
        let text = strip_comments(&text);
        let text = self.resolve_components(&text, context, state)?;
        Ok(substitute_variables(&text, context, &state.loop_bound))
    }

    /// Inline every component directive, in document order
    ///
    /// A component that is already being expanded further up the chain is
    /// replaced by a diagnostic comment instead of being loaded again.
    pub fn resolve_components(
        &self,
        text: &str,
        context: &Context,
        state: &mut RenderState,
    ) -> Result<String> {
        let mut output = String::with_capacity(text.len());
        let mut last = 0;

        for directive in ComponentScanner::new(text) {
            output.push_str(&text[last..directive.start]);
            last = directive.end;

            if state.chain.iter().any(|name| name == &directive.name) {
                tracing::warn!(
                    component = %directive.name,
                    "skipping recursive component inclusion"
                );
                output.push_str(&recursive_component_marker(&directive.name));
                continue;
            }

            let source = self.locator.load(&directive.name, TemplateKind::Component)?;
            let (frame, scoped) = resolve_props(&directive, context);
            tracing::debug!(
                component = %directive.name,
                props = frame.bindings().len(),
                "inlining component"
            );

            state.chain.push(directive.name.clone());
            let expanded = self.expand(&source, &scoped, state);
            state.chain.pop();
            let expanded = expanded?;

            if frame.bindings().is_empty() {
                output.push_str(&expanded);
            } else {
                let index = state.frames.len();
                state.frames.push(frame);
                output.push_str(&Instruction::Scope(index).to_string());
                output.push_str(&expanded);
                output.push_str(&Instruction::EndScope.to_string());
            }
        }

        output.push_str(&text[last..]);
        Ok(output)
    }
}

/// Build the prop frame and the expansion-time context for a component
///
/// Literal props are bound as strings. Dynamic (`:`-prefixed) props are
/// aliases of a name in the calling scope, resolved when the output is
/// executed, so they also work for loop-bound names. In the scoped context a
/// dynamic prop carries the caller's current value (or null), which is what
/// makes it count as bound during variable substitution.
fn resolve_props(directive: &ComponentDirective, context: &Context) -> (Frame, Context) {
    let mut frame = Frame::new(directive.name.clone());
    let mut scoped = context.clone();

    for prop in &directive.props {
        if prop.dynamic {
            let current = context.get(&prop.value).cloned().unwrap_or(JsonValue::Null);
            scoped.insert(prop.key.clone(), current);
            frame.bind(prop.key.clone(), Binding::Alias(prop.value.clone()));
        } else {
            let value = JsonValue::String(prop.value.clone());
            scoped.insert(prop.key.clone(), value.clone());
            frame.bind(prop.key.clone(), Binding::Value(value));
        }
    }

    (frame, scoped)
}

/// Rewrite `for`/`endfor` pairs into host loop instructions
///
/// Openers and closers are paired like brackets, so nested loops expand in a
/// single pass. Unpaired tokens are left as they are. Item and index names are
/// recorded in `loop_bound`.
pub fn expand_loops(text: &str, loop_bound: &mut HashSet<String>) -> String {
    let tokens: Vec<Captures> = LOOP_TOKEN_REGEX.captures_iter(text).collect();
    let mut open: Vec<usize> = Vec::new();
    let mut replacements: Vec<(Range<usize>, String)> = Vec::new();

    for (i, caps) in tokens.iter().enumerate() {
        if caps.get(4).is_none() {
            open.push(i);
            continue;
        }
        let Some(opener_index) = open.pop() else {
            continue;
        };
        let opener = &tokens[opener_index];
        let (Some(opener_match), Some(closer_match)) = (opener.get(0), caps.get(0)) else {
            continue;
        };

        let item = opener[1].to_string();
        let index = opener
            .get(2)
            .map_or(DEFAULT_INDEX_NAME, |m| m.as_str())
            .to_string();
        let collection = opener[3].to_string();

        loop_bound.insert(item.clone());
        loop_bound.insert(index.clone());

        replacements.push((
            opener_match.range(),
            Instruction::Foreach {
                collection,
                index,
                item,
            }
            .to_string(),
        ));
        replacements.push((closer_match.range(), Instruction::EndForeach.to_string()));
    }

    if replacements.is_empty() {
        return text.to_string();
    }
    replacements.sort_by_key(|(range, _)| range.start);
    splice(text, &replacements)
}

fn splice(text: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for (range, replacement) in replacements {
        output.push_str(&text[last..range.start]);
        output.push_str(replacement);
        last = range.end;
    }
    output.push_str(&text[last..]);
    output
}

/// Turn `# text #` blocks into visible HTML comments
pub fn strip_comments(text: &str) -> String {
    COMMENT_REGEX
        .replace_all(text, |caps: &Captures| format!("<!-- {} -->", &caps[1]))
        .into_owned()
}

/// Replace `<: name :>` placeholders
///
/// Bound names (loop-bound, or present in the context) become escaped echo
/// instructions; anything else becomes a visible "not found" comment.
pub fn substitute_variables(text: &str, context: &Context, loop_bound: &HashSet<String>) -> String {
    VARIABLE_REGEX
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            if name == ENDFOR {
                caps[0].to_string()
            } else if loop_bound.contains(name) || context.contains_key(name) {
                Instruction::Echo(name.to_string()).to_string()
            } else {
                tracing::warn!(variable = name, "variable not found in scope");
                missing_variable_marker(name)
            }
        })
        .into_owned()
}
