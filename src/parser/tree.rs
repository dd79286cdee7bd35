use crate::lexer::{Token, TokenKind};
use serde::Serialize;

/// Concrete parse tree node
///
/// Rule nodes mirror grammar productions one to one; sequences, options
/// and repetitions are flattened into the enclosing rule's children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParseNode {
    /// A matched rule
    Rule(RuleNode),
    /// A matched terminal
    Token(Token),
}

/// A matched grammar rule and its children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleNode {
    /// Rule name from the grammar
    pub name: String,
    /// Matched children in source order
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    /// Rule payload, if this is a rule node
    pub fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            ParseNode::Rule(rule) => Some(rule),
            ParseNode::Token(_) => None,
        }
    }

    /// Token payload, if this is a token node
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            ParseNode::Token(tok) => Some(tok),
            ParseNode::Rule(_) => None,
        }
    }

    /// First token under this node
    pub fn first_token(&self) -> Option<&Token> {
        match self {
            ParseNode::Token(tok) => Some(tok),
            ParseNode::Rule(rule) => rule.first_token(),
        }
    }

    /// Last token under this node
    pub fn last_token(&self) -> Option<&Token> {
        match self {
            ParseNode::Token(tok) => Some(tok),
            ParseNode::Rule(rule) => rule.last_token(),
        }
    }

    /// Render as an S-expression, for debugging and tests
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            ParseNode::Token(tok) => match &tok.kind {
                TokenKind::Newline => out.push_str("NL"),
                TokenKind::Eof => out.push_str("EOF"),
                TokenKind::String(s) => out.push_str(&format!("{:?}", s)),
                _ => out.push_str(&tok.lexeme),
            },
            ParseNode::Rule(rule) => {
                out.push('(');
                out.push_str(&rule.name);
                for child in &rule.children {
                    out.push(' ');
                    child.render_into(out);
                }
                out.push(')');
            }
        }
    }
}

impl RuleNode {
    /// Create an empty rule node
    pub fn new(name: &str) -> Self {
        RuleNode {
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    /// First token under this rule
    pub fn first_token(&self) -> Option<&Token> {
        self.children.iter().find_map(ParseNode::first_token)
    }

    /// Last token under this rule
    pub fn last_token(&self) -> Option<&Token> {
        self.children.iter().rev().find_map(ParseNode::last_token)
    }

    /// Line of the first token (1 for empty rules)
    pub fn first_line(&self) -> usize {
        self.first_token().map(|t| t.line).unwrap_or(1)
    }

    /// Line of the last token that is not layout
    pub fn last_line(&self) -> usize {
        let mut last = None;
        self.visit_tokens(&mut |tok| {
            if !matches!(tok.kind, TokenKind::Newline | TokenKind::Eof) {
                last = Some(tok.line);
            }
        });
        last.unwrap_or_else(|| self.first_line())
    }

    fn visit_tokens<'a>(&'a self, f: &mut dyn FnMut(&'a Token)) {
        // Explicit stack: trees may be deep
        let mut stack: Vec<&ParseNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            match node {
                ParseNode::Token(tok) => f(tok),
                ParseNode::Rule(rule) => stack.extend(rule.children.iter().rev()),
            }
        }
    }

    /// Child rules with the given name
    pub fn rules<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a RuleNode> + use<'a, 'n> {
        self.children
            .iter()
            .filter_map(ParseNode::as_rule)
            .filter(move |r| r.name == name)
    }

    /// First child rule with the given name
    pub fn rule(&self, name: &str) -> Option<&RuleNode> {
        self.rules(name).next()
    }

    /// Child tokens, in order
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.children.iter().filter_map(ParseNode::as_token)
    }

    /// Whether a keyword or symbol child with this text exists
    pub fn has_literal(&self, text: &str) -> bool {
        self.tokens().any(|t| match &t.kind {
            TokenKind::Keyword(k) | TokenKind::Symbol(k) => k == text,
            _ => false,
        })
    }

    /// Identifier names among the direct children
    pub fn identifiers(&self) -> Vec<String> {
        self.tokens()
            .filter_map(|t| match &t.kind {
                TokenKind::Identifier(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}
