use serde::{Deserialize, Serialize};
use std::fmt;

/// A single token from the preprocessed source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Line number in the *original* source (1-indexed)
    pub line: usize,
    /// Column number where token starts (1-indexed, preprocessed text)
    pub column: usize,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

/// Token classes produced by the scanner
///
/// Keywords and symbols are not enumerated here: the scanner learns them from
/// the grammar's literals, so the grammar stays the only syntax authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Integer(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal (escapes already processed)
    String(String),

    // Names
    /// Identifier
    Identifier(String),
    /// Hash label: identifier written directly before `:`
    Label(String),
    /// Reserved word named by the grammar
    Keyword(String),
    /// Operator or delimiter named by the grammar
    Symbol(String),

    // Layout
    /// Statement separator produced by a line break
    Newline,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Human-readable description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Integer(n) => format!("integer {}", n),
            TokenKind::Float(f) => format!("float {}", f),
            TokenKind::String(_) => "string".to_string(),
            TokenKind::Identifier(name) => format!("identifier `{}`", name),
            TokenKind::Label(name) => format!("label `{}:`", name),
            TokenKind::Keyword(word) => format!("`{}`", word),
            TokenKind::Symbol(sym) => format!("`{}`", sym),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
