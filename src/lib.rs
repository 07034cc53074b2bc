//! # HOCON Rust Config
//!
//! A HOCON-style configuration parser with substitutions, includes, layered
//! fallbacks and serde integration.
//!
//! ## Overview
//!
//! Text goes through three stages:
//!
//! 1. the [`lexer`] turns it into tokens over an explicit, copyable cursor,
//! 2. the [`parser`] builds a value tree, splicing in `include`d documents,
//! 3. the [`resolver`] binds every `${path}` once the whole tree exists.
//!
//! The result is wrapped in a [`Config`], an immutable handle that answers
//! dotted-path lookups and can be layered over other configs with
//! [`Config::with_fallback`].
//!
//! ## Key Features
//!
//! - **Relaxed JSON**: unquoted keys and values, `=` or `:`, optional commas,
//!   `#` and `//` comments, dotted keys (`a.b.c = 1`)
//! - **Substitutions**: `${path}` and optional `${?path}`, forward references
//!   and references into included content
//! - **Includes**: `include "target"` through a caller-supplied handler
//! - **Fallbacks**: layered configs where the primary wins and nested objects
//!   combine
//! - **Typed Access**: booleans, width-checked integers, floats, byte sizes,
//!   durations and lists, each in a recoverable and a convenience form
//! - **Serde Integration**: deserialize a resolved config into your own types
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! hocon-rust-config = "0.1"
//! serde = { version = "1.0", features = ["derive"] }
//! ```
//!
//! ## Basic Usage
//!
//! ```rust
//! use hocon_config::Config;
//!
//! let config = Config::parse_str(r#"
//!     server {
//!         host = localhost
//!         port = 8080
//!     }
//!     url = "http://"${server.host}":"${server.port}
//! "#)?;
//!
//! assert_eq!(config.get_i32("server.port"), 8080);
//! assert_eq!(config.get_string("url"), "http://localhost:8080");
//! # Ok::<(), hocon_config::HoconError>(())
//! ```
//!
//! ## Fallbacks
//!
//! ```rust
//! use hocon_config::Config;
//!
//! let defaults = Config::parse_str("db { host = localhost, port = 5432 }")?;
//! let config = Config::parse_str("db.host = prod.example.org")?.with_fallback(&defaults);
//!
//! assert_eq!(config.get_string("db.host"), "prod.example.org");
//! assert_eq!(config.get_i32("db.port"), 5432);
//! # Ok::<(), hocon_config::HoconError>(())
//! ```
//!
//! ## Serde
//!
//! ```rust
//! use serde::Deserialize;
//! use hocon_config::from_str;
//!
//! #[derive(Debug, Deserialize)]
//! struct ServerConfig {
//!     name: String,
//!     port: u16,
//!     debug: bool,
//! }
//!
//! let config: ServerConfig = from_str(r#"
//!     name = my-server
//!     port = 8080
//!     debug = on
//! "#)?;
//! assert!(config.debug);
//! # Ok::<(), hocon_config::HoconError>(())
//! ```
//!
//! ## Error Handling
//!
//! Loading is all-or-nothing: any lexical, structural or resolution error
//! aborts the load. Substitution cycles are the exception; they are reported
//! when the affected value is read.
//!
//! ```rust
//! use hocon_config::{Config, HoconError, ResolveError};
//!
//! let err = Config::parse_str("a = ${missing}").unwrap_err();
//! assert!(matches!(err, HoconError::Resolve(ResolveError::Unresolved { .. })));
//!
//! let config = Config::parse_str("a = ${b}\nb = ${a}")?;
//! assert!(config.try_get_string("a").is_err());
//! # Ok::<(), hocon_config::HoconError>(())
//! ```

pub mod accessor;
pub mod config;
pub mod deserializer;
pub mod error;
pub mod lexer;
pub mod loader;
mod merge;
pub mod parser;
pub mod resolver;
pub mod value;
pub mod view;


// Re-export main types and functions
pub use accessor::{ByteSize, FromValue, parse_bool, parse_byte_size, parse_duration};
pub use config::{Config, split_path};
pub use deserializer::{ValueDeserializer, from_config, from_str};
pub use error::{AccessError, HoconError, LexError, ParseError, Position, ResolveError};
pub use lexer::{Cursor, HoconLexer, LexerConfig, Token};
pub use loader::{FileIncludeHandler, from_serializable, load_config, load_config_with};
pub use parser::{
    HoconParser, IncludeHandler, MapIncludeHandler, ParserConfig, Root, parse_str,
    parse_with_includes,
};
pub use resolver::Bindings;
pub use value::{Element, NodeId, Substitution, SubstitutionId, Tree, Value};
pub use view::{ValueKind, ValueRef};
