//! Read-only views over resolved values
//!
//! [`ValueRef`] pairs a node with the document it lives in and answers the
//! three questions every reader asks: is it a string, an object or an array,
//! and what is its content in that form. Following a substitution always
//! runs the cycle check first, so a cyclic chain fails on every read.

use crate::accessor::FromValue;
use crate::config::Config;
use crate::error::{AccessError, ResolveError};
use crate::lexer::{is_key_delimiter, is_value_delimiter};
use crate::parser::Root;
use crate::resolver;
use crate::value::{Element, NodeId, SubstitutionId, Value};
use std::fmt;
use std::sync::Arc;

/// Shape of a value after following substitutions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Never written, or only unbound optional substitutions
    Empty,
    /// Literals and substitutions to strings
    String,
    /// At least one array element
    Array,
    /// First element is (or resolves to) an object
    Object,
    /// Text concatenated with an object, readable as neither
    Mixed,
}

impl ValueKind {
    /// Returns a string representation of the kind for error messages
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Empty => "nothing",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Mixed => "concatenation",
        }
    }
}

/// Borrowed handle to one value of a resolved document
#[derive(Clone, Copy)]
pub struct ValueRef<'a> {
    root: &'a Arc<Root>,
    node: NodeId,
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRef")
            .field("node", &self.node)
            .field("value", self.value())
            .finish()
    }
}

impl<'a> ValueRef<'a> {
    pub(crate) fn new(root: &'a Arc<Root>, node: NodeId) -> Self {
        Self { root, node }
    }

    /// Node id inside the owning document
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The raw element sequence
    pub fn value(&self) -> &'a Value {
        self.root.tree.value(self.node)
    }

    /// Returns true if nothing readable was written here
    pub fn is_absent(&self) -> bool {
        resolver::is_absent(&self.root.tree, &self.root.bindings, self.node)
    }

    fn follow(&self, id: SubstitutionId) -> Result<Option<ValueRef<'a>>, ResolveError> {
        match self.root.bindings.target(id) {
            Some(target) => {
                resolver::check_cycle(&self.root.tree, &self.root.bindings, id)?;
                Ok(Some(ValueRef::new(self.root, target)))
            }
            None => Ok(None),
        }
    }

    /// Classifies the value
    pub fn kind(&self) -> Result<ValueKind, ResolveError> {
        if self.is_absent() {
            Ok(ValueKind::Empty)
        } else if self.is_object()? {
            Ok(ValueKind::Object)
        } else if self.is_array()? {
            Ok(ValueKind::Array)
        } else if self.is_string()? {
            Ok(ValueKind::String)
        } else {
            Ok(ValueKind::Mixed)
        }
    }

    /// Returns true if the first element is, or resolves to, an object
    pub fn is_object(&self) -> Result<bool, ResolveError> {
        Ok(self.object_node()?.is_some())
    }

    pub(crate) fn object_node(&self) -> Result<Option<NodeId>, ResolveError> {
        resolver::object_node(&self.root.tree, &self.root.bindings, self.node)
    }

    /// Returns true if any element is, or resolves to, an array
    pub fn is_array(&self) -> Result<bool, ResolveError> {
        for element in self.value().elements() {
            match element {
                Element::Array(_) => return Ok(true),
                Element::Substitution(id) => {
                    if let Some(target) = self.follow(*id)? {
                        if target.is_array()? {
                            return Ok(true);
                        }
                    }
                }
                Element::Literal(_) | Element::Object(_) => {}
            }
        }
        Ok(false)
    }

    /// Returns true if every element is string-like
    ///
    /// Unbound optional substitutions contribute nothing and do not change
    /// the answer, but a value made only of them is absent, not a string.
    pub fn is_string(&self) -> Result<bool, ResolveError> {
        if self.is_absent() {
            return Ok(false);
        }
        for element in self.value().elements() {
            match element {
                Element::Literal(_) => {}
                Element::Object(_) | Element::Array(_) => return Ok(false),
                Element::Substitution(id) => {
                    if let Some(target) = self.follow(*id)? {
                        if !target.is_string()? {
                            return Ok(false);
                        }
                    }
                }
            }
        }
        Ok(true)
    }

    /// The trimmed concatenation of every element's text
    pub fn get_string(&self) -> Result<String, AccessError> {
        if !self.is_string()? {
            return Err(AccessError::NotAString {
                found: self.kind()?.name(),
            });
        }
        Ok(self.concat()?)
    }

    fn concat(&self) -> Result<String, ResolveError> {
        let mut text = String::new();
        for element in self.value().elements() {
            match element {
                Element::Literal(literal) => text.push_str(literal),
                Element::Substitution(id) => {
                    if let Some(target) = self.follow(*id)? {
                        text.push_str(&target.concat()?);
                    }
                }
                Element::Object(_) | Element::Array(_) => {}
            }
        }
        Ok(text.trim().to_string())
    }

    /// Items of every array element, flattened in order
    ///
    /// Items that hold only unbound optional substitutions are dropped.
    pub fn get_array(&self) -> Result<Vec<ValueRef<'a>>, AccessError> {
        if !self.is_array()? {
            return Err(AccessError::NotAnArray {
                found: self.kind()?.name(),
            });
        }
        let mut items = Vec::new();
        self.collect_items(&mut items)?;
        Ok(items)
    }

    fn collect_items(&self, items: &mut Vec<ValueRef<'a>>) -> Result<(), ResolveError> {
        for element in self.value().elements() {
            match element {
                Element::Array(ids) => items.extend(
                    ids.iter()
                        .map(|&id| ValueRef::new(self.root, id))
                        .filter(|item| !item.is_absent()),
                ),
                Element::Substitution(id) => {
                    if let Some(target) = self.follow(*id)? {
                        if target.is_array()? {
                            target.collect_items(items)?;
                        }
                    }
                }
                Element::Literal(_) | Element::Object(_) => {}
            }
        }
        Ok(())
    }

    /// Present fields of the object, in insertion order
    pub fn fields(&self) -> Result<Vec<(&'a str, ValueRef<'a>)>, AccessError> {
        let Some(object) = self
            .object_node()?
            .and_then(|id| self.root.tree.value(id).as_object())
        else {
            return Err(AccessError::NotAnObject {
                found: self.kind()?.name(),
            });
        };
        Ok(object
            .iter()
            .map(|(key, &id)| (key.as_str(), ValueRef::new(self.root, id)))
            .filter(|(_, value)| !value.is_absent())
            .collect())
    }

    /// Present child at `key`, if this is an object
    pub fn get(&self, key: &str) -> Result<Option<ValueRef<'a>>, ResolveError> {
        let object = resolver::object_of(&self.root.tree, &self.root.bindings, self.node)?;
        Ok(object
            .and_then(|object| object.get(key))
            .map(|&id| ValueRef::new(self.root, id))
            .filter(|value| !value.is_absent()))
    }

    /// Converts the value with its [`FromValue`] implementation
    pub fn to<T: FromValue>(&self) -> Result<T, AccessError> {
        T::from_value(self)
    }

    /// Wraps the object as a standalone config without fallback
    pub fn to_config(&self) -> Result<Config, AccessError> {
        match self.object_node()? {
            Some(node) => Ok(Config::from_parts(Arc::clone(self.root), node)),
            None => Err(AccessError::NotAnObject {
                found: self.kind()?.name(),
            }),
        }
    }

    /// Pretty-prints the value
    ///
    /// Objects put one `key : value` per line with two spaces of indent per
    /// level; arrays print as `[a,b,c]`. The output parses back to an
    /// equivalent value.
    pub fn render(&self) -> Result<String, AccessError> {
        let mut out = String::new();
        self.render_into(&mut out, 0)?;
        Ok(out)
    }

    fn render_into(&self, out: &mut String, indent: usize) -> Result<(), AccessError> {
        match self.kind()? {
            ValueKind::Object => {
                out.push_str("{\n");
                for (key, value) in self.fields()? {
                    push_indent(out, indent + 1);
                    out.push_str(&quote(key, is_key_delimiter));
                    out.push_str(" : ");
                    value.render_into(out, indent + 1)?;
                    out.push('\n');
                }
                push_indent(out, indent);
                out.push('}');
            }
            ValueKind::Array => {
                out.push('[');
                for (index, item) in self.get_array()?.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    item.render_into(out, indent + 1)?;
                }
                out.push(']');
            }
            ValueKind::String => out.push_str(&quote(&self.get_string()?, is_value_delimiter)),
            ValueKind::Empty => {}
            ValueKind::Mixed => {
                return Err(AccessError::NotAString {
                    found: ValueKind::Mixed.name(),
                });
            }
        }
        Ok(())
    }
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str("  ");
    }
}

/// Quotes text that would not lex back unchanged as a bare word
fn quote(text: &str, is_delimiter: fn(char) -> bool) -> String {
    let bare = !text.is_empty()
        && !text.contains("//")
        && !text.starts_with("include")
        && !text.chars().any(|ch| is_delimiter(ch) || ch.is_control());
    if bare {
        return text.to_string();
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            ch if ch.is_control() => quoted.push_str(&format!("\\u{:04x}", ch as u32)),
            ch => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}
