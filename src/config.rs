//! Config facade: path lookup over a resolved document and its fallbacks
//!
//! A [`Config`] is an immutable handle to an object inside a resolved
//! document plus an optional fallback config. Lookups walk the local tree
//! first; if any segment is missing, the *whole* path is asked of the
//! fallback, starting from its own root.
//!
//! [`Config::with_fallback`] keeps two answers in step: it eagerly merges both
//! roots into a new document and also records the fallback chain, so the
//! merged view and the chained lookup agree for every path.

use crate::accessor::{ByteSize, FromValue, parse_duration};
use crate::error::{AccessError, HoconError, ResolveError};
use crate::merge;
use crate::parser::{IncludeHandler, Root, parse_str, parse_with_includes};
use crate::resolver;
use crate::value::NodeId;
use crate::view::ValueRef;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Splits a dotted path into keys
///
/// A double-quoted run is one key even if it contains dots; `\"` inside
/// quotes is a literal quote. Empty unquoted segments are skipped.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '.' if !in_quotes => {
                if quoted || !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            ch => current.push(ch),
        }
    }
    if quoted || !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Resolved configuration with an optional fallback chain
#[derive(Debug, Clone)]
pub struct Config {
    root: Arc<Root>,
    node: NodeId,
    fallback: Option<Arc<Config>>,
}

macro_rules! typed_getters {
    ($($ty:ty => $get:ident, $get_or:ident, $try_get:ident;)*) => {
        $(
            #[doc = concat!("Reads `", stringify!($ty), "` at `path`; `Ok(None)` when absent")]
            pub fn $try_get(&self, path: &str) -> Result<Option<$ty>, AccessError> {
                self.try_get::<$ty>(path)
            }

            #[doc = concat!("Reads `", stringify!($ty), "` at `path`, the zero value when absent")]
            ///
            /// # Panics
            ///
            /// Panics if the value does not coerce.
            pub fn $get(&self, path: &str) -> $ty {
                self.get::<$ty>(path)
            }

            #[doc = concat!("Reads `", stringify!($ty), "` at `path`, `default` when absent")]
            ///
            /// # Panics
            ///
            /// Panics if the value does not coerce.
            pub fn $get_or(&self, path: &str, default: $ty) -> $ty {
                self.get_or(path, default)
            }
        )*
    };
}

impl Config {
    /// Wraps a parsed document
    pub fn from_root(root: Root) -> Self {
        let node = root.root;
        Self::from_parts(Arc::new(root), node)
    }

    pub(crate) fn from_parts(root: Arc<Root>, node: NodeId) -> Self {
        assert!(
            root.tree.value(node).is_object(),
            "a config root must be an object"
        );
        Self {
            root,
            node,
            fallback: None,
        }
    }

    /// Parses and resolves a document that uses no includes
    pub fn parse_str(input: &str) -> Result<Self, HoconError> {
        parse_str(input).map(Self::from_root)
    }

    /// Parses and resolves a document, resolving includes through `handler`
    pub fn parse_with_includes(
        input: &str,
        handler: &dyn IncludeHandler,
    ) -> Result<Self, HoconError> {
        parse_with_includes(input, handler).map(Self::from_root)
    }

    /// The root object of this layer
    pub fn root(&self) -> ValueRef<'_> {
        ValueRef::new(&self.root, self.node)
    }

    /// The next layer of the fallback chain
    pub fn fallback(&self) -> Option<&Config> {
        self.fallback.as_deref()
    }

    fn same_as(&self, other: &Config) -> bool {
        Arc::ptr_eq(&self.root, &other.root) && self.node == other.node
    }

    /// Finds the value at `path`, asking the fallback chain on a miss
    pub fn get_node(&self, path: &str) -> Result<Option<ValueRef<'_>>, ResolveError> {
        let segments = split_path(path);
        let local = resolver::lookup(&self.root.tree, &self.root.bindings, self.node, &segments)?;
        match (local, &self.fallback) {
            (Some(node), _) => Ok(Some(ValueRef::new(&self.root, node))),
            (None, Some(fallback)) => fallback.get_node(path),
            (None, None) => Ok(None),
        }
    }

    /// Returns true if some layer has a value at `path`
    pub fn has_path(&self, path: &str) -> bool {
        matches!(self.get_node(path), Ok(Some(_)))
    }

    /// Returns true if the value at `path` is an object
    pub fn is_object(&self, path: &str) -> bool {
        matches!(self.get_node(path), Ok(Some(value)) if value.is_object().unwrap_or(false))
    }

    /// Returns true if the value at `path` is an array
    pub fn is_array(&self, path: &str) -> bool {
        matches!(self.get_node(path), Ok(Some(value)) if value.is_array().unwrap_or(false))
    }

    /// Returns true if no layer has any field
    pub fn is_empty(&self) -> bool {
        let local_empty = self
            .root()
            .fields()
            .map(|fields| fields.is_empty())
            .unwrap_or(false);
        local_empty && self.fallback.as_ref().is_none_or(|fallback| fallback.is_empty())
    }

    /// Top-level keys across all layers, local keys first
    pub fn keys(&self) -> Result<Vec<String>, AccessError> {
        let mut keys: Vec<String> = self
            .root()
            .fields()?
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        if let Some(fallback) = &self.fallback {
            for key in fallback.keys()? {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// The object at `path` as a config of its own
    ///
    /// The sub-config's fallback is the fallback's sub-config at the same
    /// path, so chained lookups keep working below `path`.
    pub fn get_config(&self, path: &str) -> Result<Option<Config>, AccessError> {
        let local = self
            .get_node(path)?
            .map(|value| value.to_config())
            .transpose()?;
        let fallback = match &self.fallback {
            Some(fallback) => fallback.get_config(path)?,
            None => None,
        };

        Ok(match (local, fallback) {
            (None, fallback) => fallback,
            (Some(local), Some(fallback)) if !local.same_as(&fallback) => {
                Some(local.with_fallback(&fallback))
            }
            (Some(local), _) => Some(local),
        })
    }

    /// Layers `other` underneath this config
    ///
    /// Returns a new config; neither input changes.
    ///
    /// # Panics
    ///
    /// Panics if `other` is this config.
    pub fn with_fallback(&self, other: &Config) -> Config {
        assert!(!self.same_as(other), "a config cannot be its own fallback");

        let merged = merge::merge_roots(&self.root, self.node, &other.root, other.node);
        let fallback = match &self.fallback {
            Some(existing) if existing.same_as(other) => Config::clone(existing),
            Some(existing) => existing.with_fallback(other),
            None => other.clone(),
        };
        debug!(
            nodes = merged.tree.node_count(),
            chained = fallback.depth(),
            "Built fallback config"
        );

        let node = merged.root;
        Config {
            root: Arc::new(merged),
            node,
            fallback: Some(Arc::new(fallback)),
        }
    }

    /// Parses `text` and layers it underneath this config
    pub fn with_text_fallback(&self, text: &str) -> Result<Config, HoconError> {
        Ok(self.with_fallback(&Config::parse_str(text)?))
    }

    fn depth(&self) -> usize {
        1 + self.fallback.as_ref().map_or(0, |fallback| fallback.depth())
    }

    /// Reads `T` at `path`; `Ok(None)` when no layer has it
    pub fn try_get<T: FromValue>(&self, path: &str) -> Result<Option<T>, AccessError> {
        match self.get_node(path)? {
            Some(value) => T::from_value(&value).map(Some),
            None => Ok(None),
        }
    }

    /// Reads `T` at `path`, `default` when absent
    ///
    /// # Panics
    ///
    /// Panics if the value does not coerce.
    pub fn get_or<T: FromValue>(&self, path: &str, default: T) -> T {
        match self.try_get(path) {
            Ok(value) => value.unwrap_or(default),
            Err(err) => panic!("Invalid value at '{path}': {err}"),
        }
    }

    /// Reads `T` at `path`, `T::default()` when absent
    ///
    /// # Panics
    ///
    /// Panics if the value does not coerce.
    pub fn get<T: FromValue + Default>(&self, path: &str) -> T {
        self.get_or(path, T::default())
    }

    typed_getters! {
        bool => get_bool, get_bool_or, try_get_bool;
        i32 => get_i32, get_i32_or, try_get_i32;
        i64 => get_i64, get_i64_or, try_get_i64;
        u8 => get_u8, get_u8_or, try_get_u8;
        f32 => get_f32, get_f32_or, try_get_f32;
        f64 => get_f64, get_f64_or, try_get_f64;
        String => get_string, get_string_or, try_get_string;
        Duration => get_duration, get_duration_or, try_get_duration;
        Vec<bool> => get_bool_list, get_bool_list_or, try_get_bool_list;
        Vec<i32> => get_i32_list, get_i32_list_or, try_get_i32_list;
        Vec<i64> => get_i64_list, get_i64_list_or, try_get_i64_list;
        Vec<u8> => get_byte_list, get_byte_list_or, try_get_byte_list;
        Vec<f32> => get_f32_list, get_f32_list_or, try_get_f32_list;
        Vec<f64> => get_f64_list, get_f64_list_or, try_get_f64_list;
        Vec<String> => get_string_list, get_string_list_or, try_get_string_list;
    }

    /// Reads a byte size at `path`; `Ok(None)` when absent
    pub fn try_get_byte_size(&self, path: &str) -> Result<Option<u64>, AccessError> {
        Ok(self.try_get::<ByteSize>(path)?.map(|size| size.0))
    }

    /// Reads a byte size at `path`, 0 when absent
    ///
    /// # Panics
    ///
    /// Panics if the value is not a byte size.
    pub fn get_byte_size(&self, path: &str) -> u64 {
        self.get::<ByteSize>(path).0
    }

    /// Reads a list of byte sizes at `path`; `Ok(None)` when absent
    pub fn try_get_byte_size_list(&self, path: &str) -> Result<Option<Vec<u64>>, AccessError> {
        Ok(self
            .try_get::<Vec<ByteSize>>(path)?
            .map(|sizes| sizes.into_iter().map(|size| size.0).collect()))
    }

    /// Reads a duration at `path`, rejecting `infinite`; `Ok(None)` when absent
    pub fn try_get_duration_finite(&self, path: &str) -> Result<Option<Duration>, AccessError> {
        match self.get_node(path)? {
            Some(value) => parse_duration(&value.get_string()?, false).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a duration at `path`, rejecting `infinite`; zero when absent
    ///
    /// # Panics
    ///
    /// Panics if the value is not a finite duration.
    pub fn get_duration_finite(&self, path: &str) -> Duration {
        match self.try_get_duration_finite(path) {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => panic!("Invalid value at '{path}': {err}"),
        }
    }

    /// Pretty-prints the root object of this layer
    pub fn render(&self) -> Result<String, AccessError> {
        self.root().render()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.render().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Config {
    type Err = HoconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Config::parse_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(split_path("a.\"b.c\".d"), vec!["a", "b.c", "d"]);
        assert_eq!(split_path("\"\""), vec![""]);
        assert_eq!(split_path("a..b"), vec!["a", "b"]);
        assert!(split_path("").is_empty());
    }

    #[test]
    fn test_get_node_quoted_segment() {
        let config = Config::parse_str("a { \"b.c\" = 1 }").unwrap();
        assert_eq!(config.get_string("a.\"b.c\""), "1");
        assert!(!config.has_path("a.b.c"));
    }

    #[test]
    fn test_whole_path_falls_back() {
        let primary = Config::parse_str("a { x = 1 }").unwrap();
        let fallback = Config::parse_str("a { y = 2 }").unwrap();
        let chained = Config {
            fallback: Some(Arc::new(fallback)),
            ..primary
        };
        assert_eq!(chained.get_i32("a.x"), 1);
        assert_eq!(chained.get_i32("a.y"), 2);
    }

    #[test]
    fn test_with_fallback_keeps_inputs() {
        let primary = Config::parse_str("a = 1").unwrap();
        let fallback = Config::parse_str("a = 2\nb = 3").unwrap();
        let merged = primary.with_fallback(&fallback);

        assert_eq!(merged.get_i32("a"), 1);
        assert_eq!(merged.get_i32("b"), 3);
        assert!(!primary.has_path("b"));
        assert_eq!(fallback.get_i32("a"), 2);
    }

    #[test]
    #[should_panic(expected = "own fallback")]
    fn test_self_fallback_panics() {
        let config = Config::parse_str("a = 1").unwrap();
        let _ = config.with_fallback(&config);
    }

    #[test]
    fn test_fallback_chain_is_appended() {
        let first = Config::parse_str("a = 1").unwrap();
        let second = Config::parse_str("b = 2").unwrap();
        let third = Config::parse_str("c = 3").unwrap();

        let merged = first.with_fallback(&second).with_fallback(&third);
        assert_eq!(merged.depth(), 3);
        let chain = merged.fallback().unwrap();
        assert_eq!(chain.get_i32("b"), 2);
        assert_eq!(chain.get_i32("c"), 3);
    }

    #[test]
    fn test_get_config_combines_layers() {
        let primary = Config::parse_str("db { host = local }").unwrap();
        let fallback = Config::parse_str("db { host = remote, port = 5432 }").unwrap();
        let merged = primary.with_fallback(&fallback);

        let db = merged.get_config("db").unwrap().unwrap();
        assert_eq!(db.get_string("host"), "local");
        assert_eq!(db.get_i32("port"), 5432);
        assert!(merged.get_config("missing").unwrap().is_none());
    }

    #[test]
    fn test_get_config_on_scalar_fails() {
        let config = Config::parse_str("a = 1").unwrap();
        assert_eq!(
            config.get_config("a").unwrap_err(),
            AccessError::NotAnObject { found: "string" }
        );
    }

    #[test]
    fn test_absent_defaults() {
        let config = Config::parse_str("a = 1").unwrap();
        assert_eq!(config.get_i32("missing"), 0);
        assert_eq!(config.get_i32_or("missing", 7), 7);
        assert_eq!(config.get_string("missing"), "");
        assert!(config.get_string_list("missing").is_empty());
        assert_eq!(config.try_get_bool("missing"), Ok(None));
    }

    #[test]
    #[should_panic(expected = "Invalid value at 'a'")]
    fn test_convenience_getter_panics_on_bad_value() {
        let config = Config::parse_str("a = nope").unwrap();
        let _ = config.get_i32("a");
    }

    #[test]
    fn test_keys_across_layers() {
        let merged = Config::parse_str("b = 1\na = 2")
            .unwrap()
            .with_text_fallback("c = 3\na = 4")
            .unwrap();
        assert_eq!(merged.keys().unwrap(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_is_empty() {
        assert!(Config::parse_str("").unwrap().is_empty());
        assert!(Config::parse_str("# only a comment").unwrap().is_empty());
        assert!(!Config::parse_str("a = 1").unwrap().is_empty());
    }

    #[test]
    fn test_display_round_trips() {
        let config = Config::parse_str("a { b = \"x y\", c = [1, 2] }").unwrap();
        let reparsed: Config = config.to_string().parse().unwrap();
        assert_eq!(reparsed.get_string("a.b"), "x y");
        assert_eq!(reparsed.get_i32_list("a.c"), vec![1, 2]);
    }
}
