//! File-system loading and host-object bridging

use crate::config::Config;
use crate::error::{HoconError, ParseError};
use crate::parser::{HoconParser, IncludeHandler, ParserConfig, Root};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Include handler that reads targets from disk
///
/// Relative targets resolve against the directory of the including file.
#[derive(Debug, Clone)]
pub struct FileIncludeHandler {
    base_dir: PathBuf,
    max_include_depth: usize,
    parser_config: ParserConfig,
}

impl FileIncludeHandler {
    /// Creates a handler resolving targets against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_include_depth: 32,
            parser_config: ParserConfig::default(),
        }
    }

    /// Sets how deep includes may nest
    pub fn with_max_include_depth(mut self, max_include_depth: usize) -> Self {
        self.max_include_depth = max_include_depth;
        self
    }

    /// Sets the parser options used for every loaded file
    pub fn with_parser_config(mut self, parser_config: ParserConfig) -> Self {
        self.parser_config = parser_config;
        self
    }

    /// Directory relative targets resolve against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Reads and parses `path`, resolving its includes relative to its directory
    pub fn load(&self, path: &Path) -> Result<Root, HoconError> {
        self.load_at(path, 0)
    }

    fn load_at(&self, path: &Path, depth: usize) -> Result<Root, HoconError> {
        let text = fs::read_to_string(path).map_err(|source| HoconError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), depth, "Loading document");

        let dir = path.parent().unwrap_or(&self.base_dir).to_path_buf();
        let nested = |target: &str| self.include_at(&dir, target, depth);
        HoconParser::with_config(&text, self.parser_config.clone())
            .with_include_handler(&nested)
            .parse()
    }

    /// Loads `target` as the include below `depth` enclosing includes
    fn include_at(&self, dir: &Path, target: &str, depth: usize) -> Result<Root, HoconError> {
        if depth >= self.max_include_depth {
            return Err(ParseError::IncludeDepthExceeded {
                target: target.to_string(),
                max_depth: self.max_include_depth,
            }
            .into());
        }
        self.load_at(&dir.join(target), depth + 1)
    }
}

impl IncludeHandler for FileIncludeHandler {
    fn include(&self, target: &str) -> Result<Root, HoconError> {
        self.include_at(&self.base_dir, target, 0)
    }
}

/// Loads a config file, resolving includes relative to each including file
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, HoconError> {
    load_config_with(path, ParserConfig::default())
}

/// Loads a config file with custom parser options
pub fn load_config_with(
    path: impl AsRef<Path>,
    parser_config: ParserConfig,
) -> Result<Config, HoconError> {
    let path = path.as_ref();
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let handler = FileIncludeHandler::new(base_dir).with_parser_config(parser_config);
    handler.load(path).map(Config::from_root)
}

/// Builds a config from any serializable host value
///
/// The value goes through JSON text, which the parser accepts as-is. The
/// value must serialize to a JSON object.
pub fn from_serializable<T>(value: &T) -> Result<Config, HoconError>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string(value)?;
    Config::parse_str(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_from_serializable_struct() {
        #[derive(Serialize)]
        struct Server {
            host: &'static str,
            port: u16,
            tags: Vec<&'static str>,
        }

        let config = from_serializable(&Server {
            host: "example.org",
            port: 8080,
            tags: vec!["a", "b c"],
        })
        .unwrap();
        assert_eq!(config.get_string("host"), "example.org");
        assert_eq!(config.get_i32("port"), 8080);
        assert_eq!(config.get_string_list("tags"), vec!["a", "b c"]);
    }

    #[test]
    fn test_from_serializable_map_with_dotted_key() {
        let mut map = BTreeMap::new();
        map.insert("a.b", 1);
        let config = from_serializable(&map).unwrap();
        assert_eq!(config.get_i32("\"a.b\""), 1);
        assert!(!config.has_path("a.b"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config("/definitely/not/here.conf").unwrap_err();
        assert!(matches!(err, HoconError::Io { .. }));
    }
}
