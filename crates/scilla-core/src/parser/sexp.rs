//! S-expression reader: converts `scilla-fmt --sexp` output into a tree
//!
//! Handles: parenthesised lists, bare atoms, double-quoted string atoms
//! with OCaml escapes (`\"`, `\\`, `\n`, `\t`, `\r`, `\b`, `\ddd`, `\xHH`
//! and line continuations). Whitespace separates atoms.
//!
//! Guarantees:
//! - Deterministic: same input always produces the same tree
//! - Errors carry line:column of the offending character

use std::fmt;

use crate::{Error, Result};

/// One node of a parsed S-expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            SExp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::Atom(_) => None,
            SExp::List(items) => Some(items),
        }
    }

    /// First element of a list when it is an atom, e.g. `PrimType` in `(PrimType Uint32)`
    pub fn tag(&self) -> Option<&str> {
        self.as_list()?.first()?.as_atom()
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) if needs_quotes(s) => write!(f, "{:?}", s),
            SExp::Atom(s) => write!(f, "{}", s),
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

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s
            .chars()
            .any(|c| c.is_whitespace() || c == '(' || c == ')' || c == '"')
}

/// Position in source text for error reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Parse S-expression text holding exactly one top-level expression
pub fn parse(text: &str) -> Result<SExp> {
    let mut reader = Reader::new(text);
    reader.skip_whitespace();
    if reader.is_at_end() {
        return Err(Error::Syntax("Empty S-expression input".to_string()));
    }
    let expr = reader.read_expr()?;
    reader.skip_whitespace();
    if !reader.is_at_end() {
        return Err(Error::Syntax(format!(
            "Trailing input after top-level expression at {}",
            reader.current_span()
        )));
    }
    Ok(expr)
}

struct Reader {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Reader {
    fn new(text: &str) -> Self {
        Reader {
            input: text.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    // ── Character helpers ──────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    // ── Expressions ────────────────────────────────────────

    fn read_expr(&mut self) -> Result<SExp> {
        let span = self.current_span();
        match self.peek() {
            None => Err(Error::Syntax(format!("Unexpected end of input at {}", span))),
            Some('(') => self.read_list(span),
            Some(')') => Err(Error::Syntax(format!("Unexpected ')' at {}", span))),
            Some('"') => self.read_string(span),
            Some(_) => Ok(self.read_atom()),
        }
    }

    fn read_list(&mut self, span: Span) -> Result<SExp> {
        self.advance(); // consume (
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(Error::Syntax(format!(
                        "Unterminated list starting at {}",
                        span
                    )));
                }
                Some(')') => {
                    self.advance();
                    return Ok(SExp::List(items));
                }
                Some(_) => items.push(self.read_expr()?),
            }
        }
    }

    fn read_string(&mut self, span: Span) -> Result<SExp> {
        self.advance(); // consume opening "
        // escapes like \195\169 name single bytes of a UTF-8 sequence
        let mut bytes: Vec<u8> = Vec::new();
        let mut buf = [0u8; 4];

        loop {
            match self.advance() {
                None => {
                    return Err(Error::Syntax(format!(
                        "Unterminated string starting at {}",
                        span
                    )));
                }
                Some('"') => break,
                Some('\\') => self.read_escape(&mut bytes)?,
                Some(c) => bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes()),
            }
        }

        Ok(SExp::Atom(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// One escape sequence after the backslash, in OCaml string syntax
    fn read_escape(&mut self, bytes: &mut Vec<u8>) -> Result<()> {
        let span = self.current_span();
        let byte = match self.advance() {
            Some('n') => b'\n',
            Some('t') => b'\t',
            Some('r') => b'\r',
            Some('b') => 0x08,
            Some(' ') => b' ',
            Some('\\') => b'\\',
            Some('"') => b'"',
            Some('\'') => b'\'',
            // line continuation: newline plus leading blanks of the next line
            Some('\n') => {
                while matches!(self.peek(), Some(' ') | Some('\t')) {
                    self.advance();
                }
                return Ok(());
            }
            Some(d) if d.is_ascii_digit() => {
                let digits = format!("{}{}", d, self.take_digits(2, 10, span)?);
                digits
                    .parse::<u8>()
                    .map_err(|_| Error::Syntax(format!("Escape '\\{}' out of range at {}", digits, span)))?
            }
            Some('x') => {
                let digits = self.take_digits(2, 16, span)?;
                u8::from_str_radix(&digits, 16)
                    .map_err(|_| Error::Syntax(format!("Invalid escape '\\x{}' at {}", digits, span)))?
            }
            Some(c) => {
                return Err(Error::Syntax(format!(
                    "Invalid escape sequence '\\{}' at {}",
                    c, span
                )));
            }
            None => {
                return Err(Error::Syntax(format!(
                    "Unterminated escape sequence at {}",
                    span
                )));
            }
        };
        bytes.push(byte);
        Ok(())
    }

    fn take_digits(&mut self, count: usize, radix: u32, span: Span) -> Result<String> {
        let mut digits = String::with_capacity(count);
        for _ in 0..count {
            match self.peek() {
                Some(c) if c.is_digit(radix) => {
                    digits.push(c);
                    self.advance();
                }
                _ => {
                    return Err(Error::Syntax(format!(
                        "Incomplete numeric escape at {}",
                        span
                    )));
                }
            }
        }
        Ok(digits)
    }

    fn read_atom(&mut self) -> SExp {
        let start = self.position;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.advance();
        }
        SExp::Atom(self.input[start..self.position].iter().collect())
    }
}
