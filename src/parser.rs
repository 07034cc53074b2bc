//! HOCON parser for building value trees from tokens
//!
//! This module provides the recursive-descent parser that drives the lexer
//! and builds a [`Tree`]. Parsing is two-phase: the whole document,
//! including spliced includes, is built first and substitutions are resolved
//! afterwards, so references may point forward or into included content.

use crate::error::{HoconError, ParseError, Position};
use crate::lexer::{Cursor, HoconLexer, LexerConfig, Token};
use crate::merge;
use crate::resolver::{self, Bindings};
use crate::value::{Element, HoconArray, NodeId, Substitution, Tree, Value};
use std::collections::HashMap;
use tracing::debug;

/// Configuration options for the parser
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum nesting depth to prevent stack overflow
    pub max_depth: usize,
    /// Lexer options
    pub lexer: LexerConfig,
}

impl ParserConfig {
    /// Creates a new parser configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the lexer options
    pub fn with_lexer_config(mut self, lexer: LexerConfig) -> Self {
        self.lexer = lexer;
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            lexer: LexerConfig::default(),
        }
    }
}

/// A parsed and resolved document
///
/// Holds the value arena, the root object node and the substitution bindings
/// computed after parsing. Nothing in a `Root` changes once it is returned.
#[derive(Debug, Clone)]
pub struct Root {
    pub(crate) tree: Tree,
    pub(crate) root: NodeId,
    pub(crate) bindings: Bindings,
}

impl Root {
    /// The value arena
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Node of the root object
    pub fn root_node(&self) -> NodeId {
        self.root
    }

    /// Substitution targets
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Every substitution of the document, include paths already prefixed
    pub fn substitutions(&self) -> impl Iterator<Item = &Substitution> {
        self.tree.substitutions().map(|(_, substitution)| substitution)
    }
}

/// Trait for resolving `include "target"` directives
///
/// Implementations return a fully parsed, already resolved document. Any
/// error aborts the including load.
pub trait IncludeHandler {
    /// Produces the document named by `target`
    fn include(&self, target: &str) -> Result<Root, HoconError>;
}

impl<F> IncludeHandler for F
where
    F: Fn(&str) -> Result<Root, HoconError>,
{
    fn include(&self, target: &str) -> Result<Root, HoconError> {
        self(target)
    }
}

/// Map-based include handler for embedded documents
///
/// Documents included from a registered document may include other
/// registered documents.
#[derive(Debug, Clone)]
pub struct MapIncludeHandler {
    documents: HashMap<String, String>,
    parser_config: ParserConfig,
    max_include_depth: usize,
}

impl MapIncludeHandler {
    /// Creates an empty handler
    pub fn new() -> Self {
        Self::from_map(HashMap::new())
    }

    /// Creates a handler from an existing map of target → text
    pub fn from_map(documents: HashMap<String, String>) -> Self {
        Self {
            documents,
            parser_config: ParserConfig::default(),
            max_include_depth: 32,
        }
    }

    /// Registers a document
    pub fn insert(&mut self, target: String, text: String) {
        self.documents.insert(target, text);
    }

    /// Gets a reference to the registered documents
    pub fn documents(&self) -> &HashMap<String, String> {
        &self.documents
    }

    /// Sets the parser options used for included documents
    pub fn with_parser_config(mut self, parser_config: ParserConfig) -> Self {
        self.parser_config = parser_config;
        self
    }

    /// Sets how deep includes may nest
    pub fn with_max_include_depth(mut self, max_include_depth: usize) -> Self {
        self.max_include_depth = max_include_depth;
        self
    }

    fn include_at(&self, target: &str, depth: usize) -> Result<Root, HoconError> {
        if depth >= self.max_include_depth {
            return Err(ParseError::IncludeDepthExceeded {
                target: target.to_string(),
                max_depth: self.max_include_depth,
            }
            .into());
        }
        let text = self
            .documents
            .get(target)
            .ok_or_else(|| ParseError::IncludeNotFound {
                target: target.to_string(),
            })?;

        let nested = |next: &str| self.include_at(next, depth + 1);
        HoconParser::with_config(text, self.parser_config.clone())
            .with_include_handler(&nested)
            .parse()
    }
}

impl Default for MapIncludeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl IncludeHandler for MapIncludeHandler {
    fn include(&self, target: &str) -> Result<Root, HoconError> {
        self.include_at(target, 0)
    }
}

/// How `parse_object` consumes keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectMode {
    /// Top level without braces, ends at end of file
    Document,
    /// `{ ... }`, ends at the closing brace
    Braced,
    /// Remainder of a dotted key: exactly one key, then return
    DottedKey,
}

/// HOCON parser
pub struct HoconParser<'a> {
    lexer: HoconLexer<'a>,
    config: ParserConfig,
    include_handler: Option<&'a dyn IncludeHandler>,
    tree: Tree,
    current_depth: usize,
}

impl<'a> HoconParser<'a> {
    /// Creates a new parser with default configuration
    pub fn new(input: &'a str) -> Self {
        Self::with_config(input, ParserConfig::default())
    }

    /// Creates a new parser with custom configuration
    pub fn with_config(input: &'a str, config: ParserConfig) -> Self {
        Self {
            lexer: HoconLexer::with_config(input, config.lexer.clone()),
            config,
            include_handler: None,
            tree: Tree::new(),
            current_depth: 0,
        }
    }

    /// Sets the handler that resolves `include` directives
    pub fn with_include_handler(mut self, handler: &'a dyn IncludeHandler) -> Self {
        self.include_handler = Some(handler);
        self
    }

    /// Parses the whole input and resolves its substitutions
    pub fn parse(mut self) -> Result<Root, HoconError> {
        let mut cursor = Cursor::new();
        let root = self.tree.alloc(Value::object());

        self.lexer.pull_whitespace_and_comments(&mut cursor);
        if self.lexer.peek_char(&cursor) == Some('{') {
            let opening = self.lexer.pull_next(&mut cursor)?;
            debug_assert_eq!(opening, Token::ObjectStart);
            self.parse_object(&mut cursor, root, ObjectMode::Braced, "")?;
            match self.lexer.pull_next(&mut cursor)? {
                Token::Eof => {}
                other => return Err(unexpected(&other, &cursor, "end of file").into()),
            }
        } else {
            self.parse_object(&mut cursor, root, ObjectMode::Document, "")?;
        }

        debug!(
            nodes = self.tree.node_count(),
            substitutions = self.tree.substitution_count(),
            "Parsed document"
        );

        let bindings = resolver::resolve(&self.tree, root)?;
        Ok(Root {
            tree: self.tree,
            root,
            bindings,
        })
    }

    fn enter(&mut self, position: Position) -> Result<(), ParseError> {
        self.current_depth += 1;
        if self.current_depth > self.config.max_depth {
            return Err(ParseError::MaxDepthExceeded {
                max_depth: self.config.max_depth,
                position,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.current_depth -= 1;
    }

    fn parse_object(
        &mut self,
        cursor: &mut Cursor,
        owner: NodeId,
        mode: ObjectMode,
        path: &str,
    ) -> Result<(), ParseError> {
        let opened_at = cursor.token_start();
        if mode != ObjectMode::Document {
            self.enter(opened_at)?;
        }
        self.tree.ensure_object(owner);

        loop {
            let token = self.lexer.pull_next(cursor)?;
            match (token, mode) {
                (Token::Key(key), _) => {
                    let child = self.tree.get_or_create_key(owner, &key);
                    let child_path = join_path(path, &key);
                    self.parse_key_content(cursor, child, &key, &child_path)?;
                    if mode == ObjectMode::DottedKey {
                        self.leave();
                        return Ok(());
                    }
                }
                (Token::Include(target), ObjectMode::Document | ObjectMode::Braced) => {
                    self.splice_include(cursor, owner, &target, path)?;
                }
                (Token::Comma, ObjectMode::Document | ObjectMode::Braced) => {}
                (Token::ObjectEnd, ObjectMode::Braced) => {
                    self.leave();
                    return Ok(());
                }
                (Token::Eof, ObjectMode::Document) => return Ok(()),
                (Token::Eof, ObjectMode::Braced) => {
                    return Err(ParseError::UnterminatedObject {
                        position: opened_at,
                    });
                }
                (other, ObjectMode::DottedKey) => return Err(unexpected(&other, cursor, "key")),
                (other, _) => return Err(unexpected(&other, cursor, "key or '}'")),
            }
        }
    }

    fn parse_key_content(
        &mut self,
        cursor: &mut Cursor,
        value: NodeId,
        key: &str,
        path: &str,
    ) -> Result<(), ParseError> {
        match self.lexer.pull_next(cursor)? {
            Token::Dot => self.parse_object(cursor, value, ObjectMode::DottedKey, path),
            Token::Assign => {
                if !self.tree.value(value).is_object() {
                    self.tree.value_mut(value).clear();
                }
                self.parse_value(cursor, value, key, path)
            }
            Token::ObjectStart => self.parse_object(cursor, value, ObjectMode::Braced, path),
            Token::Eof => Err(ParseError::MissingValue {
                key: key.to_string(),
                position: cursor.position(),
            }),
            other => Err(unexpected(&other, cursor, "'.', '=', ':' or '{'")),
        }
    }

    fn parse_value(
        &mut self,
        cursor: &mut Cursor,
        owner: NodeId,
        key: &str,
        path: &str,
    ) -> Result<(), ParseError> {
        self.lexer.pull_whitespace_and_comments(cursor);
        if !self.lexer.is_value(*cursor) {
            return Err(ParseError::MissingValue {
                key: key.to_string(),
                position: cursor.position(),
            });
        }

        while self.lexer.is_value(*cursor) {
            match self.lexer.pull_value(cursor)? {
                Token::LiteralValue(text) => {
                    self.clear_object(owner);
                    self.push(owner, Element::Literal(text.into_owned()));
                }
                Token::ObjectStart => {
                    self.parse_object(cursor, owner, ObjectMode::Braced, path)?;
                }
                Token::ArrayStart => {
                    self.clear_object(owner);
                    let items = self.parse_array(cursor, key, path)?;
                    self.push(owner, Element::Array(items));
                }
                Token::Substitution {
                    path: target,
                    optional,
                } => {
                    self.clear_object(owner);
                    let id = self.tree.add_substitution(target.into_owned(), optional);
                    self.push(owner, Element::Substitution(id));
                }
                other => return Err(unexpected(&other, cursor, "value")),
            }

            if self.lexer.is_space_or_tab(*cursor) {
                let mut ahead = *cursor;
                let gap = self.lexer.pull_space_or_tab(&mut ahead);
                if self.lexer.is_value(ahead) {
                    self.push(owner, Element::Literal(gap.to_string()));
                }
                *cursor = ahead;
            }
        }

        self.lexer.pull_comma(cursor);
        Ok(())
    }

    fn parse_array(
        &mut self,
        cursor: &mut Cursor,
        key: &str,
        path: &str,
    ) -> Result<HoconArray, ParseError> {
        let opened_at = cursor.token_start();
        self.enter(opened_at)?;

        let mut items = HoconArray::new();
        self.lexer.pull_whitespace_and_comments(cursor);
        while !self.lexer.is_array_end(*cursor) {
            if self.lexer.is_eof(cursor) {
                return Err(ParseError::UnterminatedArray {
                    position: opened_at,
                });
            }
            if !self.lexer.is_value(*cursor) {
                self.lexer.pull_array_end(cursor)?;
            }
            let item = self.tree.alloc(Value::new());
            self.parse_value(cursor, item, key, path)?;
            items.push(item);
            self.lexer.pull_whitespace_and_comments(cursor);
            if self.lexer.pull_comma(cursor) {
                self.lexer.pull_whitespace_and_comments(cursor);
            }
        }
        self.lexer.pull_array_end(cursor)?;

        self.leave();
        Ok(items)
    }

    fn splice_include(
        &mut self,
        cursor: &Cursor,
        owner: NodeId,
        target: &str,
        path: &str,
    ) -> Result<(), ParseError> {
        let position = cursor.token_start();
        let Some(handler) = self.include_handler else {
            return Err(ParseError::IncludeUnsupported {
                target: target.to_string(),
                position,
            });
        };
        let included = handler
            .include(target)
            .map_err(|source| ParseError::Include {
                target: target.to_string(),
                position,
                source: Box::new(source),
            })?;

        let offsets = self.tree.import(&included.tree);
        if !path.is_empty() {
            for (id, _) in included.tree.substitutions() {
                let substitution = self.tree.substitution_mut(offsets.substitution(id));
                substitution.path = format!("{path}.{}", substitution.path);
            }
        }

        let included_root = offsets.node(included.root);
        let merged = merge::merge_objects(&mut self.tree, None, owner, included_root);
        self.tree.replace_with(owner, merged);

        debug!(
            include = target,
            prefix = path,
            substitutions = included.tree.substitution_count(),
            "Spliced include"
        );
        Ok(())
    }

    fn clear_object(&mut self, owner: NodeId) {
        let value = self.tree.value_mut(owner);
        if value.is_object() {
            value.clear();
        }
    }

    fn push(&mut self, owner: NodeId, element: Element) {
        self.tree.value_mut(owner).push(element);
    }
}

/// Appends a key to a dotted path, quoting keys that contain dots
fn join_path(path: &str, key: &str) -> String {
    let segment = if key.contains('.') {
        format!("\"{key}\"")
    } else {
        key.to_string()
    };
    if path.is_empty() {
        segment
    } else {
        format!("{path}.{segment}")
    }
}

fn unexpected(token: &Token<'_>, cursor: &Cursor, expected: &str) -> ParseError {
    ParseError::UnexpectedToken {
        token: token.type_name().to_string(),
        position: cursor.token_start(),
        expected: expected.to_string(),
    }
}

/// Parses and resolves a document that uses no includes
pub fn parse_str(input: &str) -> Result<Root, HoconError> {
    HoconParser::new(input).parse()
}

/// Parses and resolves a document, resolving includes through `handler`
pub fn parse_with_includes(input: &str, handler: &dyn IncludeHandler) -> Result<Root, HoconError> {
    HoconParser::new(input).with_include_handler(handler).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_keys(root: &Root, node: NodeId) -> Vec<String> {
        root.tree
            .value(node)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect()
    }

    fn child(root: &Root, node: NodeId, key: &str) -> NodeId {
        root.tree.value(node).as_object().unwrap()[key]
    }

    fn literals(root: &Root, node: NodeId) -> Vec<String> {
        root.tree
            .value(node)
            .elements()
            .iter()
            .map(|element| match element {
                Element::Literal(text) => text.clone(),
                other => other.type_name().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_parse_simple_assignments() {
        let root = parse_str("a = 1\nb : two\n\"c d\" = \"three\"").unwrap();
        assert_eq!(object_keys(&root, root.root), vec!["a", "b", "c d"]);
        let a = child(&root, root.root, "a");
        assert_eq!(literals(&root, a), vec!["1"]);
    }

    #[test]
    fn test_braced_root() {
        let root = parse_str("{ a = 1, b = 2 }").unwrap();
        assert_eq!(object_keys(&root, root.root), vec!["a", "b"]);
    }

    #[test]
    fn test_trailing_content_after_braced_root_fails() {
        let err = parse_str("{ a = 1 } b = 2").unwrap_err();
        assert!(matches!(
            err,
            HoconError::Parse(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_dotted_key_builds_nested_objects() {
        let root = parse_str("a.b.c = 1\na.b.d = 2\na.e = 3").unwrap();
        let a = child(&root, root.root, "a");
        assert_eq!(object_keys(&root, a), vec!["b", "e"]);
        let b = child(&root, a, "b");
        assert_eq!(object_keys(&root, b), vec!["c", "d"]);
    }

    #[test]
    fn test_quoted_key_with_dot_is_one_segment() {
        let root = parse_str("\"a.b\" = 1").unwrap();
        assert_eq!(object_keys(&root, root.root), vec!["a.b"]);
    }

    #[test]
    fn test_nested_braced_object() {
        let root = parse_str("server { host = localhost\n port = 80 }").unwrap();
        let server = child(&root, root.root, "server");
        assert_eq!(object_keys(&root, server), vec!["host", "port"]);
    }

    #[test]
    fn test_repeated_object_keys_merge() {
        let root = parse_str("a { x = 1 }\na { y = 2 }").unwrap();
        let a = child(&root, root.root, "a");
        assert_eq!(object_keys(&root, a), vec!["x", "y"]);
    }

    #[test]
    fn test_literal_reassignment_replaces_object() {
        let root = parse_str("a { x = 1 }\na = 5").unwrap();
        let a = child(&root, root.root, "a");
        assert_eq!(literals(&root, a), vec!["5"]);
    }

    #[test]
    fn test_last_literal_assignment_wins() {
        let root = parse_str("a = 1\na = 2").unwrap();
        let a = child(&root, root.root, "a");
        assert_eq!(literals(&root, a), vec!["2"]);
    }

    #[test]
    fn test_concatenation_keeps_inner_whitespace() {
        let root = parse_str("a = foo  bar baz  \n").unwrap();
        let a = child(&root, root.root, "a");
        assert_eq!(literals(&root, a), vec!["foo", "  ", "bar", " ", "baz"]);
    }

    #[test]
    fn test_array_elements() {
        let root = parse_str("a = [1, 2,\n 3\n 4 5, ]").unwrap();
        let a = child(&root, root.root, "a");
        let Some(Element::Array(items)) = root.tree.value(a).elements().first() else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 4);
        assert_eq!(literals(&root, items[3]), vec!["4", " ", "5"]);
    }

    #[test]
    fn test_array_comma_on_next_line() {
        let root = parse_str("a = [1\n, 2\n  # note\n  , three\n]").unwrap();
        let a = child(&root, root.root, "a");
        let Some(Element::Array(items)) = root.tree.value(a).elements().first() else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(literals(&root, items[0]), vec!["1"]);
        assert_eq!(literals(&root, items[2]), vec!["three"]);
    }

    #[test]
    fn test_empty_array() {
        let root = parse_str("a = [ ]").unwrap();
        let a = child(&root, root.root, "a");
        assert!(matches!(
            root.tree.value(a).elements(),
            [Element::Array(items)] if items.is_empty()
        ));
    }

    #[test]
    fn test_unterminated_array() {
        let err = parse_str("a = [1, 2").unwrap_err();
        assert!(matches!(
            err,
            HoconError::Parse(ParseError::UnterminatedArray { .. })
        ));
    }

    #[test]
    fn test_unterminated_object() {
        let err = parse_str("a { b = 1").unwrap_err();
        assert!(matches!(
            err,
            HoconError::Parse(ParseError::UnterminatedObject { .. })
        ));
    }

    #[test]
    fn test_missing_value() {
        let err = parse_str("a = \n}").unwrap_err();
        assert!(matches!(
            err,
            HoconError::Parse(ParseError::MissingValue { ref key, .. }) if key == "a"
        ));
    }

    #[test]
    fn test_stray_closing_brace_fails() {
        let err = parse_str("a = 1\n}").unwrap_err();
        assert!(matches!(
            err,
            HoconError::Parse(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_max_depth() {
        let config = ParserConfig::new().with_max_depth(2);
        let err = HoconParser::with_config("a { b { c { d = 1 } } }", config)
            .parse()
            .unwrap_err();
        assert!(matches!(
            err,
            HoconError::Parse(ParseError::MaxDepthExceeded { max_depth: 2, .. })
        ));
    }

    #[test]
    fn test_include_without_handler_fails() {
        let err = parse_str("include \"other\"").unwrap_err();
        assert!(matches!(
            err,
            HoconError::Parse(ParseError::IncludeUnsupported { .. })
        ));
    }

    #[test]
    fn test_include_prefixes_substitutions() {
        let mut handler = MapIncludeHandler::new();
        handler.insert("inner".to_string(), "x = 1\ny = ${x}".to_string());

        let root = parse_with_includes("outer { include \"inner\" }", &handler).unwrap();
        let paths: Vec<&str> = root.substitutions().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["outer.x"]);
    }

    #[test]
    fn test_include_at_root_is_not_prefixed() {
        let mut handler = MapIncludeHandler::new();
        handler.insert("inner".to_string(), "x = 1\ny = ${x}".to_string());

        let root = parse_with_includes("include \"inner\"", &handler).unwrap();
        let paths: Vec<&str> = root.substitutions().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["x"]);
    }

    #[test]
    fn test_include_existing_keys_win() {
        let mut handler = MapIncludeHandler::new();
        handler.insert("inner".to_string(), "a = included\nb = included".to_string());

        let root = parse_with_includes("a = local\ninclude \"inner\"", &handler).unwrap();
        let a = child(&root, root.root, "a");
        let b = child(&root, root.root, "b");
        assert_eq!(literals(&root, a), vec!["local"]);
        assert_eq!(literals(&root, b), vec!["included"]);
    }

    #[test]
    fn test_include_cycle_hits_depth_limit() {
        let mut handler = MapIncludeHandler::new().with_max_include_depth(4);
        handler.insert("loop".to_string(), "include \"loop\"".to_string());

        let err = parse_with_includes("include \"loop\"", &handler).unwrap_err();
        assert!(err.to_string().contains("maximum include depth"));
    }

    #[test]
    fn test_closure_include_handler() {
        let handler = |target: &str| parse_str(&format!("name = {target}"));
        let root = parse_with_includes("include \"first\"", &handler).unwrap();
        let name = child(&root, root.root, "name");
        assert_eq!(literals(&root, name), vec!["first"]);
    }

    #[test]
    fn test_join_path_quotes_dotted_keys() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a", "b.c"), "a.\"b.c\"");
    }
}
