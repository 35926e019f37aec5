//! Minimal s-expression reader for KiCad's `.kicad_sch` / `.kicad_pcb` files.
//!
//! Only reading is supported. Quoted strings and bare symbols both become
//! [`SExp::Atom`]; numbers stay textual until a caller asks for them.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token at position {0}: {1}")]
    UnexpectedToken(usize, String),
    #[error("Trailing content after root expression at position {0}")]
    TrailingContent(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Tag of a list such as `(wire ...)`, i.e. its leading atom.
    pub fn head(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExp::as_atom)
    }

    pub fn is(&self, tag: &str) -> bool {
        self.head() == Some(tag)
    }

    /// Every element after the tag.
    pub fn args(&self) -> &[SExp] {
        match self {
            SExp::List(items) if !items.is_empty() => &items[1..],
            _ => &[],
        }
    }

    /// First direct child list tagged `key`, returned whole.
    pub fn find(&self, key: &str) -> Option<&SExp> {
        self.args().iter().find(|child| child.is(key))
    }

    /// All direct child lists tagged `key`.
    pub fn find_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SExp> + 'a {
        self.args().iter().filter(move |child| child.is(key))
    }

    /// Atom at `index` counted from the tag (index 0 is the tag itself).
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.get(index))
            .and_then(SExp::as_atom)
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.atom_at(index).and_then(|s| s.parse().ok())
    }

    /// `(key value)` lookup returning `value`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.find(key).and_then(|child| child.atom_at(1))
    }

    pub fn f64_value(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(|s| s.parse().ok())
    }

    /// True when a bare flag atom such as `portrait` or `hide` is present.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args().iter().any(|child| child.as_atom() == Some(flag))
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                let needs_quotes = s.is_empty()
                    || s.chars().any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"');
                if needs_quotes {
                    write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Parse exactly one root expression; trailing whitespace is allowed.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        let root = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::TrailingContent(self.pos));
        }
        Ok(root)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof),
            Some('(') => self.parse_list(),
            Some(')') => Err(ParseError::UnexpectedToken(self.pos, "')'".to_string())),
            Some('"') => self.parse_string(),
            Some(_) => self.parse_symbol(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        // opening paren already peeked
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::UnexpectedEof),
                Some(')') => {
                    self.pos += 1;
                    return Ok(SExp::List(items));
                }
                Some(_) => items.push(self.parse_sexp()?),
            }
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        self.pos += 1;
        let mut s = String::new();
        loop {
            let ch = self.peek().ok_or(ParseError::UnexpectedEof)?;
            self.pos += 1;
            match ch {
                '"' => return Ok(SExp::Atom(s)),
                '\\' => {
                    let escaped = self.peek().ok_or(ParseError::UnexpectedEof)?;
                    self.pos += 1;
                    s.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                other => s.push(other),
            }
        }
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(ParseError::UnexpectedToken(start, "empty symbol".to_string()));
        }
        Ok(SExp::Atom(self.input[start..self.pos].iter().collect()))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}

/// Parse a whole document.
pub fn parse_str(input: &str) -> Result<SExp, ParseError> {
    SExpParser::new(input).parse()
}
