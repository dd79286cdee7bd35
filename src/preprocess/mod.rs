//! Source preprocessing
//!
//! Text-to-text passes that run before scanning. Every line remembers the
//! original line it came from, so diagnostics from later stages point at
//! what the user wrote. Preprocessing never fails: malformed input passes
//! through for the parser to reject precisely.
//!
//! Passes run in a fixed order:
//!
//! 1. heredocs collapse into single-line string literals
//! 2. `#` comments are stripped
//! 3. `struct` blocks become a declaration plus a constructor `def`
//! 4. sugar: compound assignment, `try ... or name`, one-line `spawn`,
//!    paren-free calls, shell fallback, backticks and interpolation

mod comments;
mod heredoc;
mod interpolate;
mod scope;
mod segments;
mod structs;
mod sugar;

use std::collections::BTreeSet;

/// Reserved words; kept in step with `parser/rugo.ebnf`
pub const KEYWORDS: &[&str] = &[
    "as", "bench", "break", "def", "else", "elsif", "end", "false", "fn", "for", "if",
    "import", "in", "next", "nil", "or", "parallel", "require", "rescue", "return", "spawn",
    "struct", "test", "true", "try", "use", "while",
];

/// A line of text and the original line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Current text
    pub text: String,
    /// Original line number (1-indexed)
    pub origin: usize,
}

impl SourceLine {
    /// Creates a source line
    pub fn new(text: String, origin: usize) -> Self {
        SourceLine { text, origin }
    }
}

/// Preprocessor output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    /// Rewritten source text
    pub text: String,
    /// `line_map[i]` is the original line of rewritten line `i + 1`
    pub line_map: Vec<usize>,
}

/// Rewrites Rugo source into the form the grammar describes
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    /// Names callable everywhere (builtins)
    callables: BTreeSet<String>,
}

impl Preprocessor {
    /// Creates a preprocessor that knows no builtins
    pub fn new() -> Self {
        Self::default()
    }

    /// Add names that are callable from any line
    pub fn with_callables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.callables.extend(names.into_iter().map(Into::into));
        self
    }

    /// Run all passes over one compile unit
    pub fn process(&self, source: &str) -> Preprocessed {
        let lines: Vec<SourceLine> = source
            .lines()
            .enumerate()
            .map(|(i, text)| SourceLine::new(text.to_string(), i + 1))
            .collect();
        let original = lines.len();

        let lines = heredoc::expand_heredocs(lines);
        let lines = comments::strip_comments(lines);
        let lines = structs::expand_structs(lines);
        let lines = sugar::expand_sugar(lines, &self.callables);

        tracing::debug!(lines_in = original, lines_out = lines.len(), "preprocessed");

        let mut text = String::with_capacity(source.len() + lines.len());
        let mut line_map = Vec::with_capacity(lines.len());
        for line in lines {
            text.push_str(&line.text);
            text.push('\n');
            line_map.push(line.origin);
        }
        Preprocessed { text, line_map }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_map_survives_heredocs() {
        let pre = Preprocessor::new().with_callables(["puts"]);
        let out = pre.process("x = <<~EOS\n  a\nEOS\nputs x # show");
        assert_eq!(out.text, "x = \"a\\n\"\nputs(x)\n");
        assert_eq!(out.line_map, vec![1, 4]);
    }

    #[test]
    fn test_empty_source() {
        let out = Preprocessor::new().process("");
        assert!(out.text.is_empty());
        assert!(out.line_map.is_empty());
    }
}
