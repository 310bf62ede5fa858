//! Execution of expanded templates
//!
//! Expansion leaves host-level instructions (loops, echoes, component scopes)
//! in the text. An [`ExecutionSink`] turns that intermediate form into final
//! output by evaluating those instructions against the data context. The
//! built-in [`Renderer`] does this entirely in memory.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::ir::{self, Node};
use crate::types::{Binding, Expanded, Frame};
use crate::utils::{escape_html_cow, missing_variable_marker};
use crate::value::{display_value, json_type_name, Context};

/// Produces final output from an expanded template
pub trait ExecutionSink: Send + Sync {
    fn execute(&self, expanded: &Expanded, context: &Context) -> Result<String>;
}

/// Default execution sink
///
/// Echoes are HTML-escaped unconditionally. Loops over arrays bind the index to
/// the element position; loops over objects bind it to the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    fn render_nodes(
        &self,
        nodes: &[Node],
        frames: &[Frame],
        scopes: &mut ScopeStack<'_>,
        output: &mut String,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => output.push_str(text),
                Node::Echo(name) => match scopes.lookup(name) {
                    Some(value) => output.push_str(&escape_html_cow(&display_value(value))),
                    None => output.push_str(&missing_variable_marker(name)),
                },
                Node::Foreach {
                    collection,
                    index,
                    item,
                    body,
                } => {
                    let entries = scopes.iteration_entries(collection)?;
                    for (key, value) in entries {
                        let mut frame = IndexMap::with_capacity(2);
                        frame.insert(index.clone(), key);
                        frame.insert(item.clone(), value);
                        scopes.push(frame);
                        let result = self.render_nodes(body, frames, scopes, output);
                        scopes.pop();
                        result?;
                    }
                }
                Node::Scope { frame, body } => {
                    let frame = frames.get(*frame).ok_or_else(|| {
                        Error::parse_owned(format!("Unknown component scope {}", frame))
                    })?;
                    let values = scopes.bind(frame);
                    scopes.push(values);
                    let result = self.render_nodes(body, frames, scopes, output);
                    scopes.pop();
                    result?;
                }
            }
        }
        Ok(())
    }
}

impl ExecutionSink for Renderer {
    fn execute(&self, expanded: &Expanded, context: &Context) -> Result<String> {
        let nodes = ir::parse(expanded.text())?;
        let mut scopes = ScopeStack::new(context);
        let mut output = String::with_capacity(expanded.text().len());
        self.render_nodes(&nodes, expanded.frames(), &mut scopes, &mut output)?;
        Ok(output)
    }
}

/// Name lookup during execution: innermost loop or component frame first,
/// then the root context
struct ScopeStack<'a> {
    root: &'a Context,
    frames: Vec<IndexMap<String, JsonValue>>,
}

impl<'a> ScopeStack<'a> {
    fn new(root: &'a Context) -> Self {
        Self {
            root,
            frames: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&JsonValue> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.root.get(name))
    }

    fn push(&mut self, frame: IndexMap<String, JsonValue>) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolve a component frame against the scope it is entered from
    fn bind(&self, frame: &Frame) -> IndexMap<String, JsonValue> {
        frame
            .bindings()
            .iter()
            .map(|(name, binding)| {
                let value = match binding {
                    Binding::Value(value) => value.clone(),
                    Binding::Alias(target) => self.lookup(target).cloned().unwrap_or(JsonValue::Null),
                };
                (name.clone(), value)
            })
            .collect()
    }

    fn iteration_entries(&self, collection: &str) -> Result<Vec<(JsonValue, JsonValue)>> {
        match self.lookup(collection) {
            Some(JsonValue::Array(items)) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, v)| (JsonValue::from(i), v.clone()))
                .collect()),
            Some(JsonValue::Object(map)) => Ok(map
                .iter()
                .map(|(k, v)| (JsonValue::String(k.clone()), v.clone()))
                .collect()),
            Some(other) => Err(Error::render_owned(format!(
                "Cannot loop over '{}': expected an array or object, got {}",
                collection,
                json_type_name(other)
            ))),
            None => Err(Error::render_owned(format!(
                "Undefined collection '{}'",
                collection
            ))),
        }
    }
}
