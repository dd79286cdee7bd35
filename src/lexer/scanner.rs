use super::token::{Token, TokenKind};
use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Reserved words and symbols the scanner recognizes
///
/// Built from the grammar's quoted literals; see
/// [`Grammar::lexicon`](crate::parser::Grammar::lexicon).
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    keywords: BTreeSet<String>,
    /// Symbols sorted longest first, for maximal munch
    symbols: Vec<String>,
}

impl Lexicon {
    /// Build a lexicon from grammar literals
    pub fn from_literals<'a>(literals: impl IntoIterator<Item = &'a str>) -> Self {
        let mut keywords = BTreeSet::new();
        let mut symbols = BTreeSet::new();
        for lit in literals {
            if lit.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                keywords.insert(lit.to_string());
            } else {
                symbols.insert(lit.to_string());
            }
        }
        let mut symbols: Vec<String> = symbols.into_iter().collect();
        symbols.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Lexicon { keywords, symbols }
    }

    /// Whether `word` is reserved
    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    /// Reserved words, sorted
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }
}

/// Symbols after which a line break does not end the statement
const CONTINUATION_SYMBOLS: &[&str] = &[
    "+", "-", "*", "/", "%", "==", "!=", "<", ">", "<=", ">=", "&&", "||", "=", ",", "(", "[",
    "{", "=>", ".",
];

/// Scanner for preprocessed Rugo text
pub struct Scanner<'a> {
    /// Source code as character vector
    source: Vec<char>,
    /// Reserved words and symbols
    lexicon: &'a Lexicon,
    /// Preprocessed line (0-indexed) to original line
    line_map: &'a [usize],
    /// Name of the compile unit, for diagnostics
    source_name: &'a str,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Column of the current token start
    start_column: usize,
    /// Current position in source
    current: usize,
    /// Current line number in preprocessed text (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner
    pub fn new(
        source: &str,
        source_name: &'a str,
        lexicon: &'a Lexicon,
        line_map: &'a [usize],
    ) -> Self {
        Scanner {
            source: source.chars().collect(),
            lexicon,
            line_map,
            source_name,
            tokens: Vec::new(),
            start: 0,
            start_column: 1,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans all tokens and returns them, terminated by `Eof`
    pub fn scan_tokens(mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_column = self.column;
            self.scan_token()?;
        }

        self.start = self.current;
        self.start_column = self.column;
        self.push_newline();
        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.original_line(),
            self.column,
        ));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();

        match c {
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.push_newline();
                self.line += 1;
                self.column = 1;
            }
            ';' => self.push_newline(),
            '"' => self.scan_string()?,
            '\'' => self.scan_raw_string()?,
            c if c.is_ascii_digit() => self.scan_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),
            _ => self.scan_symbol(c)?,
        }

        Ok(())
    }

    /// Line breaks collapse, and vanish after a continuation symbol
    fn push_newline(&mut self) {
        match self.tokens.last().map(|t| &t.kind) {
            None | Some(TokenKind::Newline) => {}
            Some(TokenKind::Symbol(sym)) if CONTINUATION_SYMBOLS.contains(&sym.as_str()) => {}
            Some(TokenKind::Label(_)) => {}
            _ => self.add_token(TokenKind::Newline),
        }
    }

    fn scan_symbol(&mut self, first: char) -> Result<()> {
        let rest_start = self.current - 1;
        let matched = self
            .lexicon
            .symbols
            .iter()
            .find(|sym| {
                let len = sym.chars().count();
                rest_start + len <= self.source.len()
                    && self.source[rest_start..rest_start + len]
                        .iter()
                        .copied()
                        .eq(sym.chars())
            })
            .cloned();

        match matched {
            Some(sym) => {
                for _ in 1..sym.chars().count() {
                    self.advance();
                }
                self.add_token(TokenKind::Symbol(sym));
                Ok(())
            }
            None => {
                let shown = if first.is_control() || !first.is_ascii() {
                    format!("U+{:04X}", first as u32)
                } else {
                    format!("'{}'", first)
                };
                Err(self.error(format!("unexpected character {}", shown)))
            }
        }
    }

    fn scan_string(&mut self) -> Result<()> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '"' {
            match self.peek() {
                '\n' => break,
                '\\' => {
                    self.advance();
                    if self.is_at_end() || self.peek() == '\n' {
                        break;
                    }
                    let escaped = self.advance();
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        'e' => value.push('\u{1b}'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        '#' => value.push('#'),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                _ => value.push(self.advance()),
            }
        }

        if self.is_at_end() || self.peek() == '\n' {
            return Err(self.error("unterminated string literal"));
        }

        self.advance(); // Closing "
        self.add_token(TokenKind::String(value));
        Ok(())
    }

    fn scan_raw_string(&mut self) -> Result<()> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != '\'' && self.peek() != '\n' {
            let c = self.advance();
            if c == '\\' && matches!(self.peek(), '\'' | '\\') {
                value.push(self.advance());
            } else {
                value.push(c);
            }
        }

        if self.is_at_end() || self.peek() == '\n' {
            return Err(self.error("unterminated string literal"));
        }

        self.advance(); // Closing '
        self.add_token(TokenKind::String(value));
        Ok(())
    }

    fn scan_number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() || self.peek() == '_' {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume .
            while self.peek().is_ascii_digit() || self.peek() == '_' {
                self.advance();
            }
        }
        if matches!(self.peek(), 'e' | 'E')
            && (self.peek_next().is_ascii_digit()
                || (matches!(self.peek_next(), '+' | '-') && self.peek_at(2).is_ascii_digit()))
        {
            is_float = true;
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current]
            .iter()
            .filter(|c| **c != '_')
            .collect();

        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float literal {}", text)))?;
            if !value.is_finite() {
                return Err(self.error(format!("float literal {} out of range", text)));
            }
            self.add_token(TokenKind::Float(value));
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error(format!("integer literal {} out of range", text)))?;
            self.add_token(TokenKind::Integer(value));
        }

        Ok(())
    }

    fn scan_word(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        if self.peek() == ':' && self.peek_next() != ':' {
            self.advance();
            self.add_token(TokenKind::Label(text));
            return;
        }

        let kind = if self.lexicon.is_keyword(&text) {
            TokenKind::Keyword(text)
        } else {
            TokenKind::Identifier(text)
        };
        self.add_token(kind);
    }

    fn original_line(&self) -> usize {
        self.line_map
            .get(self.line - 1)
            .copied()
            .unwrap_or(self.line)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(
            self.source_name,
            self.original_line(),
            self.start_column,
            message,
        )
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.source
            .get(self.current + offset)
            .copied()
            .unwrap_or('\0')
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        let line = self.original_line();
        self.tokens
            .push(Token::new(kind, lexeme, line, self.start_column));
    }
}
