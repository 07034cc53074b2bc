//! HOCON lexical analyzer
//!
//! This module converts configuration text into tokens. The lexer itself holds
//! no mutable state: every read goes through an explicit [`Cursor`], which is
//! `Copy`. Lookahead is done on a copy of the cursor, and a partial parse can
//! be started from any cursor value.
//!
//! Tokens are pulled in one of two contexts:
//!
//! - object context ([`HoconLexer::pull_next`]): keys, dots, assignments,
//!   braces and `include` directives,
//! - value context ([`HoconLexer::pull_value`]): literals, substitutions,
//!   nested objects and arrays.
//!
//! Whitespace between two value tokens is not skipped in value context so the
//! parser can keep it for literal concatenation (`a = foo bar` reads as
//! `"foo bar"`).

use crate::error::{LexError, Position};
use std::borrow::Cow;

/// Configuration options for the lexer
#[derive(Debug, Clone)]
pub struct LexerConfig {
    /// Maximum quoted string length to prevent memory exhaustion
    pub max_string_length: usize,
}

impl LexerConfig {
    /// Creates a new lexer configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum quoted string length
    pub fn with_max_string_length(mut self, max_string_length: usize) -> Self {
        self.max_string_length = max_string_length;
        self
    }
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            max_string_length: 1024 * 1024, // 1MB default
        }
    }
}

/// HOCON token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Bare or double-quoted key (one path segment)
    Key(Cow<'a, str>),
    /// Bare or double-quoted literal fragment of a value
    LiteralValue(Cow<'a, str>),
    /// `=` or `:`
    Assign,
    ObjectStart, // {
    ObjectEnd,   // }
    ArrayStart,  // [
    ArrayEnd,    // ]
    Dot,         // .
    Comma,       // ,
    /// `${path}` or `${?path}`
    Substitution { path: Cow<'a, str>, optional: bool },
    /// `include "target"`
    Include(Cow<'a, str>),
    Eof,
}

impl<'a> Token<'a> {
    /// Returns a string representation of the token type for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Token::Key(_) => "key",
            Token::LiteralValue(_) => "literal",
            Token::Assign => "'=' or ':'",
            Token::ObjectStart => "'{'",
            Token::ObjectEnd => "'}'",
            Token::ArrayStart => "'['",
            Token::ArrayEnd => "']'",
            Token::Dot => "'.'",
            Token::Comma => "','",
            Token::Substitution { .. } => "substitution",
            Token::Include(_) => "include",
            Token::Eof => "end of file",
        }
    }
}

/// Read position into the input
///
/// Cursors are plain values: copying one gives an independent lookahead
/// point, assigning one back resets the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: Position,
    token_start: Position,
}

impl Cursor {
    /// Creates a cursor at the start of input
    pub fn new() -> Self {
        Self {
            position: Position::new(),
            token_start: Position::new(),
        }
    }

    /// Current read position
    #[inline(always)]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Start position of the most recently pulled token
    #[inline(always)]
    pub fn token_start(&self) -> Position {
        self.token_start
    }

    /// Current byte offset
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.position.offset
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Characters that terminate an unquoted key
#[inline(always)]
pub(crate) fn is_key_delimiter(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '.' | '=' | ':' | '{' | '}' | '[' | ']' | ',' | '#' | '"' | '$' | '+'
        )
}

/// Characters that may not appear in an unquoted value
#[inline(always)]
pub(crate) fn is_value_delimiter(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '$' | '"'
                | '{'
                | '}'
                | '['
                | ']'
                | ':'
                | '='
                | ','
                | '+'
                | '#'
                | '`'
                | '^'
                | '?'
                | '!'
                | '@'
                | '*'
                | '&'
                | '\\'
        )
}

/// HOCON lexer over a borrowed input
#[derive(Debug, Clone)]
pub struct HoconLexer<'a> {
    /// Input text being lexed
    input: &'a str,
    /// Lexer configuration
    config: LexerConfig,
}

impl<'a> HoconLexer<'a> {
    /// Creates a new lexer with default configuration
    pub fn new(input: &'a str) -> Self {
        Self::with_config(input, LexerConfig::default())
    }

    /// Creates a new lexer with custom configuration
    pub fn with_config(input: &'a str, config: LexerConfig) -> Self {
        Self { input, config }
    }

    /// Returns the underlying source text
    #[inline(always)]
    pub fn source(&self) -> &'a str {
        self.input
    }

    /// Returns a lazy token stream in object context starting at `cursor`
    pub fn tokens(&self, cursor: Cursor) -> Tokens<'_, 'a> {
        Tokens {
            lexer: self,
            cursor,
            finished: false,
        }
    }

    /// Peeks at the character under the cursor
    #[inline(always)]
    pub fn peek_char(&self, cursor: &Cursor) -> Option<char> {
        self.input[cursor.offset()..].chars().next()
    }

    /// Peeks at the character `offset` characters past the cursor
    #[inline(always)]
    pub fn peek_char_at(&self, cursor: &Cursor, offset: usize) -> Option<char> {
        self.input[cursor.offset()..].chars().nth(offset)
    }

    #[inline(always)]
    fn starts_with(&self, cursor: &Cursor, prefix: &str) -> bool {
        self.input[cursor.offset()..].starts_with(prefix)
    }

    /// Advances the cursor by one character and returns it
    #[inline(always)]
    pub fn advance(&self, cursor: &mut Cursor) -> Option<char> {
        let ch = self.peek_char(cursor)?;
        cursor.position.advance(ch);
        Some(ch)
    }

    /// Returns true when the cursor is at end of input
    #[inline(always)]
    pub fn is_eof(&self, cursor: &Cursor) -> bool {
        cursor.offset() >= self.input.len()
    }

    #[inline(always)]
    fn at_comment(&self, cursor: &Cursor) -> bool {
        self.starts_with(cursor, "#") || self.starts_with(cursor, "//")
    }

    fn skip_line(&self, cursor: &mut Cursor) {
        while let Some(ch) = self.peek_char(cursor) {
            if ch == '\n' {
                break;
            }
            self.advance(cursor);
        }
    }

    /// Skips whitespace, newlines and comments
    pub fn pull_whitespace_and_comments(&self, cursor: &mut Cursor) {
        loop {
            match self.peek_char(cursor) {
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance(cursor);
                }
                Some(_) if self.at_comment(cursor) => self.skip_line(cursor),
                _ => break,
            }
        }
    }

    /// Returns true if the cursor sits on a space or tab
    #[inline(always)]
    pub fn is_space_or_tab(&self, cursor: Cursor) -> bool {
        matches!(self.peek_char(&cursor), Some(' ' | '\t'))
    }

    /// Consumes a run of spaces and tabs and returns it
    pub fn pull_space_or_tab(&self, cursor: &mut Cursor) -> &'a str {
        let start = cursor.offset();
        while self.is_space_or_tab(*cursor) {
            self.advance(cursor);
        }
        &self.input[start..cursor.offset()]
    }

    /// Returns true if the next token in value context continues the current value
    pub fn is_value(&self, cursor: Cursor) -> bool {
        match self.peek_char(&cursor) {
            None => false,
            Some('{' | '[' | '"') => true,
            Some('$') => self.peek_char_at(&cursor, 1) == Some('{'),
            Some(_) if self.at_comment(&cursor) => false,
            Some(ch) => !is_value_delimiter(ch),
        }
    }

    /// Returns true if the cursor sits on a comma
    #[inline(always)]
    pub fn is_comma(&self, cursor: Cursor) -> bool {
        self.peek_char(&cursor) == Some(',')
    }

    /// Returns true if the cursor sits on a closing bracket
    #[inline(always)]
    pub fn is_array_end(&self, cursor: Cursor) -> bool {
        self.peek_char(&cursor) == Some(']')
    }

    /// Consumes a comma if one is under the cursor
    pub fn pull_comma(&self, cursor: &mut Cursor) -> bool {
        if self.is_comma(*cursor) {
            cursor.token_start = cursor.position;
            self.advance(cursor);
            true
        } else {
            false
        }
    }

    /// Consumes the closing bracket of an array
    pub fn pull_array_end(&self, cursor: &mut Cursor) -> Result<Token<'a>, LexError> {
        cursor.token_start = cursor.position;
        match self.peek_char(cursor) {
            Some(']') => {
                self.advance(cursor);
                Ok(Token::ArrayEnd)
            }
            Some(ch) => Err(LexError::UnexpectedCharacter {
                character: ch,
                position: cursor.position(),
            }),
            None => Err(LexError::UnexpectedEof {
                expected: "']'",
                position: cursor.position(),
            }),
        }
    }

    /// Returns the next token in object context
    pub fn pull_next(&self, cursor: &mut Cursor) -> Result<Token<'a>, LexError> {
        self.pull_whitespace_and_comments(cursor);
        cursor.token_start = cursor.position;

        let Some(ch) = self.peek_char(cursor) else {
            return Ok(Token::Eof);
        };

        let single = |cursor: &mut Cursor, token: Token<'a>| -> Result<Token<'a>, LexError> {
            self.advance(cursor);
            Ok(token)
        };

        match ch {
            '{' => single(cursor, Token::ObjectStart),
            '}' => single(cursor, Token::ObjectEnd),
            '[' => single(cursor, Token::ArrayStart),
            ']' => single(cursor, Token::ArrayEnd),
            '.' => single(cursor, Token::Dot),
            ',' => single(cursor, Token::Comma),
            '=' | ':' => single(cursor, Token::Assign),
            '"' => Ok(Token::Key(self.lex_quoted(cursor)?)),
            _ if self.is_include(*cursor) => self.lex_include(cursor),
            ch if !is_key_delimiter(ch) => Ok(Token::Key(self.lex_unquoted_key(cursor))),
            ch => Err(LexError::UnexpectedCharacter {
                character: ch,
                position: cursor.position(),
            }),
        }
    }

    /// Returns the next token in value context
    ///
    /// Callers check [`HoconLexer::is_value`] first; anything else under the
    /// cursor is reported as an error.
    pub fn pull_value(&self, cursor: &mut Cursor) -> Result<Token<'a>, LexError> {
        cursor.token_start = cursor.position;

        match self.peek_char(cursor) {
            None => Err(LexError::UnexpectedEof {
                expected: "value",
                position: cursor.position(),
            }),
            Some('{') => {
                self.advance(cursor);
                Ok(Token::ObjectStart)
            }
            Some('[') => {
                self.advance(cursor);
                Ok(Token::ArrayStart)
            }
            Some('"') => Ok(Token::LiteralValue(self.lex_quoted(cursor)?)),
            Some('$') if self.peek_char_at(cursor, 1) == Some('{') => {
                self.lex_substitution(cursor)
            }
            Some(_) if self.is_value(*cursor) => {
                Ok(Token::LiteralValue(self.lex_unquoted_value(cursor)))
            }
            Some(ch) => Err(LexError::UnexpectedCharacter {
                character: ch,
                position: cursor.position(),
            }),
        }
    }

    /// `include` followed by inline whitespace and a quoted target
    fn is_include(&self, cursor: Cursor) -> bool {
        if !self.starts_with(&cursor, "include") {
            return false;
        }
        let mut ahead = cursor;
        for _ in 0.."include".len() {
            self.advance(&mut ahead);
        }
        if !self.is_space_or_tab(ahead) {
            return false;
        }
        self.pull_space_or_tab(&mut ahead);
        self.peek_char(&ahead) == Some('"')
    }

    fn lex_include(&self, cursor: &mut Cursor) -> Result<Token<'a>, LexError> {
        for _ in 0.."include".len() {
            self.advance(cursor);
        }
        self.pull_space_or_tab(cursor);
        Ok(Token::Include(self.lex_quoted(cursor)?))
    }

    fn lex_unquoted_key(&self, cursor: &mut Cursor) -> Cow<'a, str> {
        let start = cursor.offset();
        while let Some(ch) = self.peek_char(cursor) {
            if is_key_delimiter(ch) || self.starts_with(cursor, "//") {
                break;
            }
            self.advance(cursor);
        }
        Cow::Borrowed(&self.input[start..cursor.offset()])
    }

    fn lex_unquoted_value(&self, cursor: &mut Cursor) -> Cow<'a, str> {
        let start = cursor.offset();
        while let Some(ch) = self.peek_char(cursor) {
            if is_value_delimiter(ch) || self.starts_with(cursor, "//") {
                break;
            }
            self.advance(cursor);
        }
        Cow::Borrowed(&self.input[start..cursor.offset()])
    }

    /// Lexes `${path}` or `${?path}`; quoted segments may contain `}`
    fn lex_substitution(&self, cursor: &mut Cursor) -> Result<Token<'a>, LexError> {
        let start_pos = cursor.position();
        self.advance(cursor); // $
        self.advance(cursor); // {

        let optional = self.peek_char(cursor) == Some('?');
        if optional {
            self.advance(cursor);
        }

        let path_start = cursor.offset();
        let mut in_quotes = false;
        loop {
            match self.peek_char(cursor) {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedSubstitution {
                        position: start_pos,
                    });
                }
                Some('"') => in_quotes = !in_quotes,
                Some('\\') if in_quotes => {
                    self.advance(cursor);
                }
                Some('}') if !in_quotes => break,
                Some(_) => {}
            }
            self.advance(cursor);
        }

        let path = self.input[path_start..cursor.offset()].trim();
        self.advance(cursor); // }

        if path.is_empty() {
            return Err(LexError::EmptySubstitution {
                position: start_pos,
            });
        }

        Ok(Token::Substitution {
            path: Cow::Borrowed(path),
            optional,
        })
    }

    /// Lexes a `"..."` or `"""..."""` string, borrowing when no escapes are present
    fn lex_quoted(&self, cursor: &mut Cursor) -> Result<Cow<'a, str>, LexError> {
        if self.starts_with(cursor, "\"\"\"") {
            return self.lex_triple_quoted(cursor);
        }

        let start_pos = cursor.position();
        self.advance(cursor); // opening quote
        let content_start = cursor.offset();
        let mut has_escapes = false;

        loop {
            match self.peek_char(cursor) {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString {
                        position: start_pos,
                    });
                }
                Some('"') => break,
                Some('\\') => {
                    has_escapes = true;
                    self.advance(cursor);
                    if self.advance(cursor).is_none() {
                        return Err(LexError::UnterminatedString {
                            position: start_pos,
                        });
                    }
                }
                Some(_) => {
                    self.advance(cursor);
                }
            }
        }

        let raw = &self.input[content_start..cursor.offset()];
        self.advance(cursor); // closing quote
        self.check_string_length(raw, start_pos)?;

        if has_escapes {
            let mut escape_base = start_pos;
            escape_base.advance('"');
            Ok(Cow::Owned(Self::unescape_json_string(raw, escape_base)?))
        } else {
            Ok(Cow::Borrowed(raw))
        }
    }

    /// Raw multi-line string; extra quotes before the closing `"""` belong to the content
    fn lex_triple_quoted(&self, cursor: &mut Cursor) -> Result<Cow<'a, str>, LexError> {
        let start_pos = cursor.position();
        for _ in 0..3 {
            self.advance(cursor);
        }
        let content_start = cursor.offset();

        let Some(relative_end) = self.input[content_start..].find("\"\"\"") else {
            return Err(LexError::UnterminatedString {
                position: start_pos,
            });
        };
        let mut content_end = content_start + relative_end;
        while self.input[content_end + 3..].starts_with('"') {
            content_end += 1;
        }

        while cursor.offset() < content_end + 3 {
            self.advance(cursor);
        }

        let raw = &self.input[content_start..content_end];
        self.check_string_length(raw, start_pos)?;
        Ok(Cow::Borrowed(raw))
    }

    #[inline(always)]
    fn check_string_length(&self, raw: &str, position: Position) -> Result<(), LexError> {
        if raw.len() > self.config.max_string_length {
            return Err(LexError::StringTooLong {
                limit: self.config.max_string_length,
                position,
            });
        }
        Ok(())
    }

    /// Unescapes the body of a JSON-style double-quoted string
    pub fn unescape_json_string(input: &str, base: Position) -> Result<String, LexError> {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();
        let mut position = base;

        while let Some(ch) = chars.next() {
            if ch != '\\' {
                position.advance(ch);
                result.push(ch);
                continue;
            }

            let escape_position = position;
            position.advance(ch);
            let Some(escaped) = chars.next() else {
                return Err(LexError::InvalidEscape {
                    sequence: String::new(),
                    position: escape_position,
                });
            };
            position.advance(escaped);

            match escaped {
                'n' => result.push('\n'),
                'r' => result.push('\r'),
                't' => result.push('\t'),
                '\\' => result.push('\\'),
                '"' => result.push('"'),
                '/' => result.push('/'),
                'b' => result.push('\u{0008}'), // Backspace
                'f' => result.push('\u{000C}'), // Form feed
                'u' => {
                    let high = Self::read_hex4(&mut chars, &mut position, escape_position)?;
                    let code_point = if (0xD800..=0xDBFF).contains(&high) {
                        // Surrogate pair: the low half must follow immediately
                        let mut lookahead = chars.clone();
                        if lookahead.next() != Some('\\') || lookahead.next() != Some('u') {
                            return Err(LexError::InvalidUnicodeEscape {
                                sequence: format!("{high:04X}"),
                                position: escape_position,
                            });
                        }
                        chars.next();
                        chars.next();
                        position.advance_by("\\u");
                        let low = Self::read_hex4(&mut chars, &mut position, escape_position)?;
                        if !(0xDC00..=0xDFFF).contains(&low) {
                            return Err(LexError::InvalidUnicodeEscape {
                                sequence: format!("{high:04X}\\u{low:04X}"),
                                position: escape_position,
                            });
                        }
                        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                    } else {
                        high
                    };

                    let decoded =
                        char::from_u32(code_point).ok_or(LexError::InvalidUnicodeEscape {
                            sequence: format!("{code_point:04X}"),
                            position: escape_position,
                        })?;
                    result.push(decoded);
                }
                other => {
                    return Err(LexError::InvalidEscape {
                        sequence: other.to_string(),
                        position: escape_position,
                    });
                }
            }
        }

        Ok(result)
    }

    fn read_hex4(
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
        position: &mut Position,
        escape_position: Position,
    ) -> Result<u32, LexError> {
        let mut digits = String::with_capacity(4);
        for _ in 0..4 {
            match chars.next() {
                Some(c) if c.is_ascii_hexdigit() => {
                    position.advance(c);
                    digits.push(c);
                }
                Some(c) => {
                    digits.push(c);
                    return Err(LexError::InvalidUnicodeEscape {
                        sequence: digits,
                        position: escape_position,
                    });
                }
                None => {
                    return Err(LexError::InvalidUnicodeEscape {
                        sequence: digits,
                        position: escape_position,
                    });
                }
            }
        }
        u32::from_str_radix(&digits, 16).map_err(|_| LexError::InvalidUnicodeEscape {
            sequence: digits.clone(),
            position: escape_position,
        })
    }
}

/// Lazy, restartable token stream in object context
///
/// Yields `Eof` once, then ends. After an error the stream ends as well.
pub struct Tokens<'l, 'a> {
    lexer: &'l HoconLexer<'a>,
    cursor: Cursor,
    finished: bool,
}

impl<'l, 'a> Tokens<'l, 'a> {
    /// Cursor positioned after the last yielded token
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }
}

impl<'l, 'a> Iterator for Tokens<'l, 'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.lexer.pull_next(&mut self.cursor);
        if matches!(result, Ok(Token::Eof) | Err(_)) {
            self.finished = true;
        }
        Some(result)
    }
}
