//! Symbol predicates.
//!
//! Every transition is guarded by a [`Pattern`] tested against exactly one
//! symbol. Table files write patterns as text:
//!
//! - `.` - catch-all, matches any symbol
//! - `[abc]`, `[a-z0-9]` - character class (single-character symbols only)
//! - `[^ \-.]` - negated character class
//! - `TO|DASH` - literal set, matches any of the alternatives exactly
//! - `a`, `INFORMAL_TIME` - exact literal
//!
//! A backslash escapes the next character (`\.`, `\|`, `\[`, `\-`, `\]`,
//! `\\`). There is no repetition, grouping or lookahead.
//!
//! Examples:
//! - `[^\-.?!,; ]` - anything that is not a delimiter
//! - `NOT_TOKEN|TO|DASH|AM_PM` - any of four token labels
//! - `\.` - a literal full stop

use crate::error::FsmError;
use std::fmt;

/// One element of an input sequence.
///
/// Characters are consumed by the matcher and the tokenizer, token labels by
/// the extractor. A label that is exactly one character long also answers
/// character-class tests.
pub trait Symbol {
    /// Returns the symbol as a single character, if it is one.
    fn as_char(&self) -> Option<char>;

    /// Returns true if the symbol is exactly `literal`.
    fn is_literal(&self, literal: &str) -> bool;

    /// Renders the symbol for diagnostics.
    fn describe(&self) -> String;
}

impl Symbol for char {
    fn as_char(&self) -> Option<char> {
        Some(*self)
    }

    fn is_literal(&self, literal: &str) -> bool {
        let mut chars = literal.chars();
        chars.next() == Some(*self) && chars.next().is_none()
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl Symbol for str {
    fn as_char(&self) -> Option<char> {
        let mut chars = self.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    fn is_literal(&self, literal: &str) -> bool {
        self == literal
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl Symbol for String {
    fn as_char(&self) -> Option<char> {
        self.as_str().as_char()
    }

    fn is_literal(&self, literal: &str) -> bool {
        self == literal
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl<T: Symbol + ?Sized> Symbol for &T {
    fn as_char(&self) -> Option<char> {
        (**self).as_char()
    }

    fn is_literal(&self, literal: &str) -> bool {
        (**self).is_literal(literal)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A parsed symbol predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Exact literal.
    Literal(String),
    /// Any of several literals.
    OneOf(Vec<String>),
    /// Character class.
    Class(CharClass),
    /// Matches every symbol.
    Any,
}

/// A set of characters given as single characters and inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    negated: bool,
    items: Vec<ClassItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

impl CharClass {
    /// Returns true if `c` belongs to the class (after negation).
    pub fn contains(&self, c: char) -> bool {
        let listed = self.items.iter().any(|item| match *item {
            ClassItem::Char(x) => x == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        });
        listed != self.negated
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

impl Pattern {
    /// Parses a pattern from its text form.
    pub fn parse(s: &str) -> Result<Self, FsmError> {
        if s.is_empty() {
            return Err(invalid(s, "empty pattern"));
        }
        if s == "." {
            return Ok(Pattern::Any);
        }

        let mut parser = Parser::new(s);
        let pattern = if parser.peek_char() == Some('[') {
            Pattern::Class(parser.parse_class()?)
        } else {
            parser.parse_literals()?
        };

        if !parser.at_end() {
            return Err(invalid(s, "trailing input after character class"));
        }
        Ok(pattern)
    }

    /// Creates an exact-literal pattern.
    pub fn literal(s: impl Into<String>) -> Self {
        Pattern::Literal(s.into())
    }

    /// Creates a literal-set pattern.
    pub fn one_of<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Pattern::OneOf(items.into_iter().map(Into::into).collect())
    }

    /// Creates a character class from its text form, e.g. `[0-5]`.
    pub fn class(s: &str) -> Result<Self, FsmError> {
        match Self::parse(s)? {
            p @ Pattern::Class(_) => Ok(p),
            _ => Err(invalid(s, "expected a character class")),
        }
    }

    /// Tests the pattern against a single symbol.
    pub fn matches<S: Symbol + ?Sized>(&self, symbol: &S) -> bool {
        match self {
            Pattern::Literal(lit) => symbol.is_literal(lit),
            Pattern::OneOf(lits) => lits.iter().any(|lit| symbol.is_literal(lit)),
            Pattern::Class(class) => symbol.as_char().is_some_and(|c| class.contains(c)),
            Pattern::Any => true,
        }
    }
}

impl From<char> for Pattern {
    fn from(c: char) -> Self {
        Pattern::Literal(c.to_string())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => f.write_str("."),
            Pattern::Literal(lit) => write_escaped(f, lit, LITERAL_SPECIAL),
            Pattern::OneOf(lits) => {
                for (i, lit) in lits.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write_escaped(f, lit, LITERAL_SPECIAL)?;
                }
                Ok(())
            }
            Pattern::Class(class) => {
                f.write_str("[")?;
                if class.negated {
                    f.write_str("^")?;
                }
                for item in &class.items {
                    match *item {
                        ClassItem::Char(c) => write_escaped_char(f, c, CLASS_SPECIAL)?,
                        ClassItem::Range(lo, hi) => {
                            write_escaped_char(f, lo, CLASS_SPECIAL)?;
                            f.write_str("-")?;
                            write_escaped_char(f, hi, CLASS_SPECIAL)?;
                        }
                    }
                }
                f.write_str("]")
            }
        }
    }
}

const LITERAL_SPECIAL: &[char] = &['\\', '|', '[', '.'];
const CLASS_SPECIAL: &[char] = &['\\', ']', '-', '^'];

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str, special: &[char]) -> fmt::Result {
    s.chars().try_for_each(|c| write_escaped_char(f, c, special))
}

fn write_escaped_char(f: &mut fmt::Formatter<'_>, c: char, special: &[char]) -> fmt::Result {
    if special.contains(&c) {
        write!(f, "\\{}", c)
    } else {
        write!(f, "{}", c)
    }
}

fn invalid(pattern: &str, reason: &str) -> FsmError {
    FsmError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

/// Single-pass parser for the pattern text form.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_literals(&mut self) -> Result<Pattern, FsmError> {
        let mut alternatives = Vec::new();
        let mut current = String::new();

        while let Some(c) = self.next_char() {
            match c {
                '\\' => current.push(self.escaped()?),
                '|' => {
                    if current.is_empty() {
                        return Err(invalid(self.input, "empty alternative"));
                    }
                    alternatives.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }

        if current.is_empty() {
            return Err(invalid(self.input, "empty alternative"));
        }

        if alternatives.is_empty() {
            Ok(Pattern::Literal(current))
        } else {
            alternatives.push(current);
            Ok(Pattern::OneOf(alternatives))
        }
    }

    fn parse_class(&mut self) -> Result<CharClass, FsmError> {
        // Opening '['
        self.pos += 1;

        let negated = if self.peek_char() == Some('^') {
            self.pos += 1;
            true
        } else {
            false
        };

        let mut items = Vec::new();
        loop {
            let c = match self.next_char() {
                None => return Err(invalid(self.input, "unterminated character class")),
                Some(']') => break,
                Some('\\') => self.escaped()?,
                Some(c) => c,
            };

            // A '-' right before ']' is a literal dash, not a range.
            if self.peek_str("-") && !self.peek_str("-]") && self.input.len() > self.pos + 1 {
                self.pos += 1;
                let hi = match self.next_char() {
                    Some('\\') => self.escaped()?,
                    Some(hi) => hi,
                    None => return Err(invalid(self.input, "unterminated character class")),
                };
                if hi < c {
                    return Err(invalid(
                        self.input,
                        &format!("invalid range '{}-{}'", c, hi),
                    ));
                }
                items.push(ClassItem::Range(c, hi));
            } else {
                items.push(ClassItem::Char(c));
            }
        }

        if items.is_empty() {
            return Err(invalid(self.input, "empty character class"));
        }

        Ok(CharClass { negated, items })
    }

    fn escaped(&mut self) -> Result<char, FsmError> {
        self.next_char()
            .ok_or_else(|| invalid(self.input, "dangling escape"))
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}
