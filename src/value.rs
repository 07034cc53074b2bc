//! Value model for parsed documents
//!
//! A document is stored as an arena ([`Tree`]) of [`Value`] nodes addressed by
//! [`NodeId`]. Each value is an ordered run of [`Element`]s:
//!
//! - a run of literals (and substitutions that resolve to strings) reads as
//!   the trimmed concatenation of their text,
//! - a value whose first element is an object *is* that object,
//! - the array elements of a value concatenate into one flat array.
//!
//! Substitutions are stored once per document and referenced by
//! [`SubstitutionId`]; their targets live in a separate binding table built by
//! the resolver, so the tree never changes after parsing.

use indexmap::IndexMap;
use smallvec::SmallVec;

/// Index of a value node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a substitution inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubstitutionId(usize);

impl SubstitutionId {
    /// Position of the substitution in its document
    pub fn index(self) -> usize {
        self.0
    }
}

/// HOCON object type (preserves insertion order)
pub type HoconObject = IndexMap<String, NodeId>;

/// HOCON array type - uses SmallVec to avoid heap allocation for small arrays
pub type HoconArray = SmallVec<[NodeId; 4]>;

/// One fragment of a value
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Raw text, including captured inter-token whitespace
    Literal(String),
    /// Nested object
    Object(HoconObject),
    /// Nested array
    Array(HoconArray),
    /// `${path}` reference, bound after parsing
    Substitution(SubstitutionId),
}

impl Element {
    /// Returns a string representation of the element type for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Literal(_) => "string",
            Element::Object(_) => "object",
            Element::Array(_) => "array",
            Element::Substitution(_) => "substitution",
        }
    }

    fn shifted(&self, offsets: ImportOffsets) -> Element {
        match self {
            Element::Literal(text) => Element::Literal(text.clone()),
            Element::Object(object) => Element::Object(
                object
                    .iter()
                    .map(|(key, &child)| (key.clone(), offsets.node(child)))
                    .collect(),
            ),
            Element::Array(items) => {
                Element::Array(items.iter().map(|&item| offsets.node(item)).collect())
            }
            Element::Substitution(id) => Element::Substitution(offsets.substitution(*id)),
        }
    }
}

/// Ordered sequence of elements stored at one key or array slot
///
/// An empty sequence means "not present".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Value {
    elements: SmallVec<[Element; 1]>,
}

impl Value {
    /// Creates an empty value
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a value holding one empty object
    pub fn object() -> Self {
        let mut value = Self::new();
        value.push(Element::Object(HoconObject::new()));
        value
    }

    /// Elements in source order
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Returns true if no element was ever written
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Appends an element
    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Drops all elements
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Returns true if the first element is an object
    pub fn is_object(&self) -> bool {
        self.as_object().is_some()
    }

    /// The object held directly by this value
    ///
    /// Substitutions are not followed here; see
    /// [`ValueRef`](crate::view::ValueRef) for the resolved view.
    pub fn as_object(&self) -> Option<&HoconObject> {
        match self.elements.first() {
            Some(Element::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub(crate) fn as_object_mut(&mut self) -> Option<&mut HoconObject> {
        match self.elements.first_mut() {
            Some(Element::Object(object)) => Some(object),
            _ => None,
        }
    }

    fn shifted(&self, offsets: ImportOffsets) -> Value {
        Value {
            elements: self
                .elements
                .iter()
                .map(|element| element.shifted(offsets))
                .collect(),
        }
    }
}

/// A `${path}` occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    /// Dotted path, re-prefixed when spliced in from an include
    pub path: String,
    /// `${?path}` form: an unresolved target is not an error
    pub optional: bool,
}

/// How ids of an imported tree map into the importing tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImportOffsets {
    nodes: usize,
    substitutions: usize,
}

impl ImportOffsets {
    pub(crate) fn node(self, id: NodeId) -> NodeId {
        NodeId(id.0 + self.nodes)
    }

    pub(crate) fn substitution(self, id: SubstitutionId) -> SubstitutionId {
        SubstitutionId(id.0 + self.substitutions)
    }
}

/// Arena holding every value node and substitution of one document
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Value>,
    substitutions: Vec<Substitution>,
}

impl Tree {
    /// Creates an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of value nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of substitutions
    pub fn substitution_count(&self) -> usize {
        self.substitutions.len()
    }

    /// Returns the value stored at `id`
    pub fn value(&self, id: NodeId) -> &Value {
        &self.nodes[id.0]
    }

    pub(crate) fn value_mut(&mut self, id: NodeId) -> &mut Value {
        &mut self.nodes[id.0]
    }

    /// Returns the substitution with the given id
    pub fn substitution(&self, id: SubstitutionId) -> &Substitution {
        &self.substitutions[id.0]
    }

    pub(crate) fn substitution_mut(&mut self, id: SubstitutionId) -> &mut Substitution {
        &mut self.substitutions[id.0]
    }

    /// Iterates over all substitutions with their ids
    pub fn substitutions(&self) -> impl Iterator<Item = (SubstitutionId, &Substitution)> {
        self.substitutions
            .iter()
            .enumerate()
            .map(|(index, substitution)| (SubstitutionId(index), substitution))
    }

    pub(crate) fn alloc(&mut self, value: Value) -> NodeId {
        self.nodes.push(value);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn add_substitution(&mut self, path: String, optional: bool) -> SubstitutionId {
        self.substitutions.push(Substitution { path, optional });
        SubstitutionId(self.substitutions.len() - 1)
    }

    /// Replaces non-object content of `id` with an empty object
    pub(crate) fn ensure_object(&mut self, id: NodeId) {
        let value = self.value_mut(id);
        if !value.is_object() {
            *value = Value::object();
        }
    }

    /// Returns the child at `key`, creating an empty one if missing
    ///
    /// `owner` must already hold an object.
    pub(crate) fn get_or_create_key(&mut self, owner: NodeId, key: &str) -> NodeId {
        if let Some(&child) = self.value(owner).as_object().and_then(|o| o.get(key)) {
            return child;
        }
        let child = self.alloc(Value::new());
        if let Some(object) = self.value_mut(owner).as_object_mut() {
            object.insert(key.to_string(), child);
        }
        child
    }

    /// Overwrites the content of `target` with a copy of `source`
    pub(crate) fn replace_with(&mut self, target: NodeId, source: NodeId) {
        if target != source {
            let value = self.value(source).clone();
            *self.value_mut(target) = value;
        }
    }

    /// Appends every node and substitution of `other`, renumbering its ids
    pub(crate) fn import(&mut self, other: &Tree) -> ImportOffsets {
        let offsets = ImportOffsets {
            nodes: self.nodes.len(),
            substitutions: self.substitutions.len(),
        };
        self.nodes
            .extend(other.nodes.iter().map(|value| value.shifted(offsets)));
        self.substitutions
            .extend(other.substitutions.iter().cloned());
        offsets
    }
}
