//! Lexical analysis for Rugo
//!
//! Converts preprocessed source text into a stream of tokens. The set of
//! reserved words and symbols is supplied by the grammar.

mod scanner;
mod token;

pub use scanner::{Lexicon, Scanner};
pub use token::{Token, TokenKind};
