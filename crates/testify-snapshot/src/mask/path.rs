//! Mask path grammar.
//!
//! Paths are a subset of JSONPath: `$` (optional), `.name`, `.*`,
//! `['name', "other"]`, `[0, -1]`, `[start:end]`, `[*]` and the deep-scan
//! forms `..name`, `..*`, `..[...]`. Filter expressions are rejected.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while parsing a mask path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskPathError {
    /// The path was empty or whitespace only.
    #[error("mask path is empty")]
    Empty,
    /// A character that cannot start or continue a step.
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar {
        /// Byte offset of the character.
        position: usize,
        /// Character encountered.
        found: char,
    },
    /// The path ended in the middle of a step.
    #[error("unexpected end of path, expected {expected}")]
    UnexpectedEnd {
        /// Description of the missing token.
        expected: &'static str,
    },
    /// An array index was not a valid signed integer.
    #[error("invalid array index '{value}' at position {position}")]
    InvalidIndex {
        /// Byte offset where the index starts.
        position: usize,
        /// Raw index text.
        value: String,
    },
    /// Filter expressions (`[?(...)]`) are not supported.
    #[error("filter expressions are not supported (position {position})")]
    UnsupportedFilter {
        /// Byte offset of the `?`.
        position: usize,
    },
}

/// What a single step selects from the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Object members by name (one or a union).
    Names(Vec<String>),
    /// Array elements by index; negative indices count from the end.
    Indices(Vec<i64>),
    /// Array elements in `start..end`; bounds may be negative or open.
    Slice {
        /// Inclusive start, `None` for the first element.
        start: Option<i64>,
        /// Exclusive end, `None` for past the last element.
        end: Option<i64>,
    },
    /// Every member or element.
    Wildcard,
}

impl Selector {
    const fn is_definite(&self) -> bool {
        match self {
            Self::Names(names) => names.len() == 1,
            Self::Indices(indices) => indices.len() == 1,
            Self::Slice { .. } | Self::Wildcard => false,
        }
    }
}

impl Display for Selector {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("[")?;
        match self {
            Self::Names(names) => {
                for (index, name) in names.iter().enumerate() {
                    if index > 0 {
                        formatter.write_str(",")?;
                    }
                    write!(formatter, "'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))?;
                }
            }
            Self::Indices(indices) => {
                let rendered: Vec<String> = indices.iter().map(ToString::to_string).collect();
                formatter.write_str(&rendered.join(","))?;
            }
            Self::Slice { start, end } => {
                if let Some(start) = start {
                    write!(formatter, "{start}")?;
                }
                formatter.write_str(":")?;
                if let Some(end) = end {
                    write!(formatter, "{end}")?;
                }
            }
            Self::Wildcard => formatter.write_str("*")?,
        }
        formatter.write_str("]")
    }
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Applies the selector to the current node.
    Child(Selector),
    /// Applies the selector to the current node and all of its descendants.
    Descendant(Selector),
}

impl Segment {
    /// Whether the step selects at most one node.
    #[must_use]
    pub const fn is_definite(&self) -> bool {
        match self {
            Self::Child(selector) => selector.is_definite(),
            Self::Descendant(_) => false,
        }
    }
}

impl Display for Segment {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Child(selector) => write!(formatter, "{selector}"),
            Self::Descendant(selector) => write!(formatter, "..{selector}"),
        }
    }
}

/// A parsed mask path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPath {
    raw: String,
    segments: Vec<Segment>,
}

impl MaskPath {
    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns a [`MaskPathError`] describing the first syntax problem.
    pub fn parse(raw: &str) -> Result<Self, MaskPathError> {
        let segments = Parser::new(raw).parse()?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The path as supplied by the caller.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether every step selects at most one node.
    #[must_use]
    pub fn is_definite(&self) -> bool {
        self.segments.iter().all(Segment::is_definite)
    }

    pub(super) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Normalized rendering of the first `consumed` steps, used in diagnostics.
    pub(super) fn location(&self, consumed: usize) -> String {
        self.segments
            .iter()
            .take(consumed)
            .fold(String::from("$"), |mut rendered, segment| {
                rendered.push_str(&segment.to_string());
                rendered
            })
    }
}

impl FromStr for MaskPath {
    type Err = MaskPathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

impl Display for MaskPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.raw)
    }
}

struct Parser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn parse(mut self) -> Result<Vec<Segment>, MaskPathError> {
        if self.input.trim().is_empty() {
            return Err(MaskPathError::Empty);
        }

        let mut segments = Vec::new();
        if !self.eat('$') && !matches!(self.peek(), Some('.' | '[')) {
            segments.push(Segment::Child(self.member_selector("member name")?));
        }

        while let Some(current) = self.peek() {
            match current {
                '.' => {
                    self.bump();
                    if self.eat('.') {
                        segments.push(Segment::Descendant(
                            self.member_selector("name after '..'")?,
                        ));
                    } else {
                        segments.push(Segment::Child(self.member_selector("name after '.'")?));
                    }
                }
                '[' => segments.push(Segment::Child(self.bracket()?)),
                other => return Err(self.unexpected(other)),
            }
        }
        Ok(segments)
    }

    /// `*`, a bare name, or a bracket selector.
    fn member_selector(&mut self, expected: &'static str) -> Result<Selector, MaskPathError> {
        match self.peek() {
            None => Err(MaskPathError::UnexpectedEnd { expected }),
            Some('*') => {
                self.bump();
                Ok(Selector::Wildcard)
            }
            Some('[') => self.bracket(),
            Some(other) if !is_name_char(other) => Err(self.unexpected(other)),
            Some(_) => {
                let start = self.position;
                while self.peek().is_some_and(is_name_char) {
                    self.bump();
                }
                Ok(Selector::Names(vec![self.input[start..self.position].to_string()]))
            }
        }
    }

    fn bracket(&mut self) -> Result<Selector, MaskPathError> {
        self.expect('[', "'['")?;
        self.skip_whitespace();
        let selector = match self.peek() {
            None => return Err(MaskPathError::UnexpectedEnd {
                expected: "bracket selector",
            }),
            Some('*') => {
                self.bump();
                Selector::Wildcard
            }
            Some('?') => {
                return Err(MaskPathError::UnsupportedFilter {
                    position: self.position,
                });
            }
            Some(quote @ ('\'' | '"')) => self.quoted_names(quote)?,
            Some(current) if current == '-' || current == ':' || current.is_ascii_digit() => {
                self.indices()?
            }
            Some(other) => return Err(self.unexpected(other)),
        };
        self.skip_whitespace();
        self.expect(']', "']'")?;
        Ok(selector)
    }

    fn quoted_names(&mut self, first_quote: char) -> Result<Selector, MaskPathError> {
        let mut names = vec![self.quoted(first_quote)?];
        loop {
            self.skip_whitespace();
            if !self.eat(',') {
                return Ok(Selector::Names(names));
            }
            self.skip_whitespace();
            match self.peek() {
                Some(quote @ ('\'' | '"')) => names.push(self.quoted(quote)?),
                Some(other) => return Err(self.unexpected(other)),
                None => {
                    return Err(MaskPathError::UnexpectedEnd {
                        expected: "quoted name",
                    });
                }
            }
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, MaskPathError> {
        self.bump();
        let mut name = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(MaskPathError::UnexpectedEnd {
                        expected: "closing quote",
                    });
                }
                Some('\\') => match self.bump() {
                    Some(escaped) => name.push(escaped),
                    None => {
                        return Err(MaskPathError::UnexpectedEnd {
                            expected: "escaped character",
                        });
                    }
                },
                Some(current) if current == quote => return Ok(name),
                Some(current) => name.push(current),
            }
        }
    }

    fn indices(&mut self) -> Result<Selector, MaskPathError> {
        if self.eat(':') {
            let end = self.optional_integer()?;
            return Ok(Selector::Slice { start: None, end });
        }

        let first = self.integer()?;
        self.skip_whitespace();
        if self.eat(':') {
            let end = self.optional_integer()?;
            return Ok(Selector::Slice {
                start: Some(first),
                end,
            });
        }

        let mut indices = vec![first];
        while self.eat(',') {
            self.skip_whitespace();
            indices.push(self.integer()?);
            self.skip_whitespace();
        }
        Ok(Selector::Indices(indices))
    }

    fn optional_integer(&mut self) -> Result<Option<i64>, MaskPathError> {
        self.skip_whitespace();
        match self.peek() {
            Some(current) if current == '-' || current.is_ascii_digit() => {
                self.integer().map(Some)
            }
            _ => Ok(None),
        }
    }

    fn integer(&mut self) -> Result<i64, MaskPathError> {
        let start = self.position;
        self.eat('-');
        while self.peek().is_some_and(|current| current.is_ascii_digit()) {
            self.bump();
        }
        let text = &self.input[start..self.position];
        text.parse().map_err(|_| MaskPathError::InvalidIndex {
            position: start,
            value: text.to_string(),
        })
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let current = self.peek()?;
        self.position += current.len_utf8();
        Some(current)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char, description: &'static str) -> Result<(), MaskPathError> {
        match self.peek() {
            Some(current) if current == expected => {
                self.bump();
                Ok(())
            }
            Some(other) => Err(self.unexpected(other)),
            None => Err(MaskPathError::UnexpectedEnd {
                expected: description,
            }),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    const fn unexpected(&self, found: char) -> MaskPathError {
        MaskPathError::UnexpectedChar {
            position: self.position,
            found,
        }
    }
}

const fn is_name_char(current: char) -> bool {
    !matches!(
        current,
        ' ' | '\t' | '\n' | '\r' | '.' | '[' | ']' | '*' | '\'' | '"' | '$'
    )
}
