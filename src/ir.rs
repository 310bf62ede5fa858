//! Host-level instructions left in the text by directive expansion
//!
//! Expansion rewrites loops, variables and component scopes into processing
//! instructions of the form `<?modx ... ?>`. They contain no directive syntax
//! and no `#`, so later expansion passes leave them untouched. The execution
//! stage parses them back into a [`Node`] tree with [`parse`].

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::utils::is_simple_identifier;

static INSTRUCTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\?modx\s+(.*?)\s*\?>").expect("Invalid instruction regex"));

static FOREACH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^foreach\s+(\w+)\s+as\s+(\w+)\s*=>\s*(\w+)$").expect("Invalid foreach regex")
});

/// Index name bound by loops written without an explicit index
pub const DEFAULT_INDEX_NAME: &str = "__index";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Foreach {
        collection: String,
        index: String,
        item: String,
    },
    EndForeach,
    Echo(String),
    Scope(usize),
    EndScope,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Foreach {
                collection,
                index,
                item,
            } => write!(f, "<?modx foreach {} as {} => {} ?>", collection, index, item),
            Instruction::EndForeach => f.write_str("<?modx endforeach ?>"),
            Instruction::Echo(name) => write!(f, "<?modx echo {} ?>", name),
            Instruction::Scope(frame) => write!(f, "<?modx scope {} ?>", frame),
            Instruction::EndScope => f.write_str("<?modx endscope ?>"),
        }
    }
}

impl Instruction {
    fn parse(body: &str) -> Result<Self> {
        if let Some(caps) = FOREACH_REGEX.captures(body) {
            return Ok(Instruction::Foreach {
                collection: caps[1].to_string(),
                index: caps[2].to_string(),
                item: caps[3].to_string(),
            });
        }

        let mut words = body.split_whitespace();
        let instruction = match (words.next(), words.next(), words.next()) {
            (Some("endforeach"), None, None) => Instruction::EndForeach,
            (Some("endscope"), None, None) => Instruction::EndScope,
            (Some("echo"), Some(name), None) if is_simple_identifier(name) => {
                Instruction::Echo(name.to_string())
            }
            (Some("scope"), Some(frame), None) => {
                let frame = frame
                    .parse()
                    .map_err(|_| Error::parse_owned(format!("Invalid scope frame '{}'", frame)))?;
                Instruction::Scope(frame)
            }
            _ => return Err(Error::parse_owned(format!("Unknown instruction '{}'", body))),
        };
        Ok(instruction)
    }
}

/// Parsed form of expanded text
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Echo(String),
    Foreach {
        collection: String,
        index: String,
        item: String,
        body: Vec<Node>,
    },
    Scope {
        frame: usize,
        body: Vec<Node>,
    },
}

/// Parse expanded text into a tree, checking that blocks are balanced
pub fn parse(text: &str) -> Result<Vec<Node>> {
    // Each open block keeps its opening instruction and the nodes collected so far
    let mut stack: Vec<(Instruction, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut last = 0;

    for caps in INSTRUCTION_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            current.push(Node::Text(text[last..whole.start()].to_string()));
        }
        last = whole.end();

        match Instruction::parse(&caps[1])? {
            Instruction::Echo(name) => current.push(Node::Echo(name)),
            open @ (Instruction::Foreach { .. } | Instruction::Scope(_)) => {
                stack.push((open, std::mem::take(&mut current)));
            }
            Instruction::EndForeach => match stack.pop() {
                Some((
                    Instruction::Foreach {
                        collection,
                        index,
                        item,
                    },
                    parent,
                )) => {
                    let body = std::mem::replace(&mut current, parent);
                    current.push(Node::Foreach {
                        collection,
                        index,
                        item,
                        body,
                    });
                }
                _ => return Err(Error::parse_static("endforeach without matching foreach")),
            },
            Instruction::EndScope => match stack.pop() {
                Some((Instruction::Scope(frame), parent)) => {
                    let body = std::mem::replace(&mut current, parent);
                    current.push(Node::Scope { frame, body });
                }
                _ => return Err(Error::parse_static("endscope without matching scope")),
            },
        }
    }

    if let Some((open, _)) = stack.last() {
        return Err(Error::parse_owned(format!("Unclosed instruction '{}'", open)));
    }
    if last < text.len() {
        current.push(Node::Text(text[last..].to_string()));
    }
    Ok(current)
}
