//! Parsed admin service response bodies
//!
//! The admin service answers with XML that is not always well formed
//! (HTML error pages, stray end tags). Parsing is therefore lenient:
//! element names are lower-cased with namespace prefixes dropped,
//! mismatched end tags close back to the nearest matching element, and
//! unclosed elements are closed at end of input.

use crate::error::{Error, ErrorKind, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// One element of a [`ParsedDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn element(start: &BytesStart<'_>) -> Self {
        let local = start.local_name();
        Self {
            name: String::from_utf8_lossy(local.as_ref()).to_lowercase(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Lower-cased local element name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Text of this element and all of its descendants, in order.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.text());
        }
        out
    }

    /// First descendant (depth first, document order) named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        self.children.iter().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.find(name)
            }
        })
    }

    /// Every descendant named `name`, in document order.
    #[must_use]
    pub fn find_all(&self, name: &str) -> Vec<&Self> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a Self>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect(name, found);
        }
    }
}

/// Read-only element tree over an admin service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    root: Node,
    raw: String,
}

impl ParsedDocument {
    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// Returns a `ResponseShape` error if the body cannot be tokenised.
    pub fn parse(body: &str) -> Result<Self> {
        let mut reader = Reader::from_str(body);
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = false;

        // stack[0] is a synthetic root holding the top-level elements
        let mut stack = vec![Node {
            name: String::new(),
            text: String::new(),
            children: Vec::new(),
        }];

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::new(
                    ErrorKind::ResponseShape,
                    format!(
                        "Unparseable response at position {}: {e}",
                        reader.buffer_position()
                    ),
                )
                .with_source(e)
                .with_text("document", body)
            })?;

            match event {
                Event::Start(start) => stack.push(Node::element(&start)),
                Event::Empty(start) => {
                    let node = Node::element(&start);
                    push_child(&mut stack, node);
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.local_name().as_ref()).to_lowercase();
                    // Stray end tags with no open element are ignored.
                    if let Some(depth) = stack.iter().skip(1).rposition(|n| n.name == name) {
                        while stack.len() > depth + 1 {
                            close_top(&mut stack);
                        }
                    }
                }
                Event::Text(text) => {
                    let decoded = text.unescape().map_or_else(
                        |_| String::from_utf8_lossy(&text).into_owned(),
                        |t| t.into_owned(),
                    );
                    append_text(&mut stack, &decoded);
                }
                Event::CData(data) => {
                    let decoded = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    append_text(&mut stack, &decoded);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }

        let root = stack.pop().unwrap_or_else(|| Node {
            name: String::new(),
            text: String::new(),
            children: Vec::new(),
        });

        Ok(Self {
            root,
            raw: body.to_string(),
        })
    }

    /// The body this document was parsed from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Top-level elements of the document.
    #[must_use]
    pub fn elements(&self) -> &[Node] {
        self.root.children()
    }

    /// First element anywhere in the document named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.root.find(name)
    }

    /// Every element in the document named `name`.
    #[must_use]
    pub fn find_all(&self, name: &str) -> Vec<&Node> {
        self.root.find_all(name)
    }
}

fn push_child(stack: &mut [Node], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn close_top(stack: &mut Vec<Node>) {
    if let Some(node) = stack.pop() {
        push_child(stack, node);
    }
}

fn append_text(stack: &mut [Node], text: &str) {
    if let Some(node) = stack.last_mut() {
        // Text after a child element still belongs to this node.
        if !node.text.is_empty() {
            node.text.push(' ');
        }
        node.text.push_str(text);
    }
}
