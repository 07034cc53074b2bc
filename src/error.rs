//! Error types and position tracking for HOCON parsing
//!
//! Every stage of a load has its own error enum: lexing, parsing, substitution
//! resolution and typed access. [`HoconError`] wraps them all so a load can be
//! driven with a single `?`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Represents a position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Byte offset from start of input (0-based)
    pub offset: usize,
}

impl Position {
    /// Creates a new position at the start of input
    pub fn new() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Advances the position by one character
    pub fn advance(&mut self, c: char) {
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\r' => {
                self.column = 1;
            }
            _ => {
                self.column += 1;
            }
        }
        self.offset += c.len_utf8();
    }

    /// Advances the position by multiple characters
    pub fn advance_by(&mut self, text: &str) {
        for c in text.chars() {
            self.advance(c);
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Main error type for loading a configuration
#[derive(Debug, Error)]
pub enum HoconError {
    /// Lexical analysis error
    #[error("Lexical error: {0}")]
    Lex(#[from] LexError),

    /// Structural parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Substitution resolution error
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Typed access on a value that does not coerce
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// I/O error while reading a document
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Host object could not be bridged through JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Custom serde error message
    #[error("Serde error: {0}")]
    Serde(String),
}

/// Lexical analysis errors
#[derive(Debug, Error)]
pub enum LexError {
    /// Unexpected character encountered
    #[error("Unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: Position },

    /// Input ended while a token still needed characters
    #[error("Unexpected end of input at {position}, expected {expected}")]
    UnexpectedEof {
        expected: &'static str,
        position: Position,
    },

    /// String literal not properly terminated
    #[error("Unterminated string at {position}")]
    UnterminatedString { position: Position },

    /// Quoted string exceeds the configured limit
    #[error("String longer than {limit} bytes at {position}")]
    StringTooLong { limit: usize, position: Position },

    /// Invalid escape sequence in string
    #[error("Invalid escape sequence '\\{sequence}' at {position}")]
    InvalidEscape {
        sequence: String,
        position: Position,
    },

    /// Invalid Unicode escape sequence
    #[error("Invalid unicode escape '\\u{sequence}' at {position}")]
    InvalidUnicodeEscape {
        sequence: String,
        position: Position,
    },

    /// `${` without a closing brace
    #[error("Unterminated substitution at {position}")]
    UnterminatedSubstitution { position: Position },

    /// `${}` or `${?}`
    #[error("Empty substitution path at {position}")]
    EmptySubstitution { position: Position },
}

/// Parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// Lexical error surfaced while parsing
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Unexpected token encountered
    #[error("Unexpected token {token} at {position}, expected {expected}")]
    UnexpectedToken {
        token: String,
        position: Position,
        expected: String,
    },

    /// Object opened with `{` but never closed
    #[error("Unterminated object starting at {position}")]
    UnterminatedObject { position: Position },

    /// Array opened with `[` but never closed
    #[error("Unterminated array starting at {position}")]
    UnterminatedArray { position: Position },

    /// Assignment not followed by a value
    #[error("Missing value for '{key}' at {position}")]
    MissingValue { key: String, position: Position },

    /// Maximum nesting depth exceeded
    #[error("Maximum nesting depth {max_depth} exceeded at {position}")]
    MaxDepthExceeded { max_depth: usize, position: Position },

    /// `include` used while no include handler was supplied
    #[error("No include handler available for '{target}' at {position}")]
    IncludeUnsupported { target: String, position: Position },

    /// An in-memory include target that was never registered
    #[error("Include target '{target}' not found")]
    IncludeNotFound { target: String },

    /// Include chain nested deeper than the handler allows
    #[error("Include of '{target}' exceeds the maximum include depth {max_depth}")]
    IncludeDepthExceeded { target: String, max_depth: usize },

    /// The include handler failed to produce a document
    #[error("Include of '{target}' failed at {position}: {source}")]
    Include {
        target: String,
        position: Position,
        #[source]
        source: Box<HoconError>,
    },
}

/// Substitution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A required substitution matched nothing in the assembled document
    #[error("Unresolved substitution: ${{{path}}}")]
    Unresolved { path: String },

    /// A substitution chain leads back to itself
    #[error("Cyclic substitution in path of ${{{path}}}")]
    Cyclic { path: String },
}

/// Type coercion errors raised by typed reads
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AccessError {
    /// Scalar read on an object or array
    #[error("Expected a string value, found {found}")]
    NotAString { found: &'static str },

    /// Array read on a scalar or object
    #[error("Expected an array value, found {found}")]
    NotAnArray { found: &'static str },

    /// Object read on a scalar or array
    #[error("Expected an object value, found {found}")]
    NotAnObject { found: &'static str },

    /// Text outside the boolean vocabulary
    #[error("Unknown boolean format: '{value}'")]
    InvalidBoolean { value: String },

    /// Text that is not a number of the requested type or is out of range
    #[error("Invalid {target} '{value}': {reason}")]
    InvalidNumber {
        value: String,
        target: &'static str,
        reason: String,
    },

    /// Byte size with an unknown unit or an overflowing magnitude
    #[error("Invalid byte size '{value}'")]
    InvalidByteSize { value: String },

    /// Duration with an unknown unit, or `infinite` where it is not allowed
    #[error("Invalid duration '{value}'")]
    InvalidDuration { value: String },

    /// A substitution could not be read
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl serde::de::Error for HoconError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        HoconError::Serde(msg.to_string())
    }
}
