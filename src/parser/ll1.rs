//! Table-free LL(1) driver
//!
//! Walks the annotated grammar with an explicit work stack, so neither deep
//! input nor a large grammar can exhaust the native stack. Decisions are
//! made on one token of lookahead using the FIRST sets computed at load.

use super::grammar::{GExpr, GNode, Grammar, Terminal};
use super::tree::{ParseNode, RuleNode};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};
use std::collections::BTreeSet;

/// Expected-token lists longer than this are abbreviated in messages
const MAX_LISTED: usize = 8;

enum Work<'g> {
    Match(&'g GNode),
    Close,
}

/// LL(1) parser over any validated [`Grammar`]
pub struct Ll1Parser<'g, 't> {
    grammar: &'g Grammar,
    tokens: &'t [Token],
    source_name: &'t str,
    max_depth: usize,
    current: usize,
    /// FIRST sets of options and repetitions skipped at the current token
    declined: BTreeSet<Terminal>,
}

impl<'g, 't> Ll1Parser<'g, 't> {
    /// Creates a parser; `tokens` must end with `Eof`
    pub fn new(
        grammar: &'g Grammar,
        tokens: &'t [Token],
        source_name: &'t str,
        max_depth: usize,
    ) -> Self {
        Ll1Parser {
            grammar,
            tokens,
            source_name,
            max_depth,
            current: 0,
            declined: BTreeSet::new(),
        }
    }

    /// Parse the whole token stream from the start rule
    pub fn parse(mut self) -> Result<ParseNode> {
        if !matches!(self.tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            return Err(Error::internal(
                self.source_name,
                1,
                "token stream is not terminated",
            ));
        }

        let start = self.grammar.start();
        let mut open: Vec<RuleNode> = vec![RuleNode::new(&start.name)];
        let mut work: Vec<Work<'g>> = vec![Work::Close, Work::Match(&start.body)];
        let mut root = None;

        while let Some(item) = work.pop() {
            match item {
                Work::Close => {
                    let node = open.pop().ok_or_else(|| {
                        Error::internal(self.source_name, self.peek().line, "unbalanced parse stack")
                    })?;
                    match open.last_mut() {
                        Some(parent) => parent.children.push(ParseNode::Rule(node)),
                        None => root = Some(node),
                    }
                }
                Work::Match(node) => self.step(node, &mut work, &mut open)?,
            }
        }

        root.map(ParseNode::Rule).ok_or_else(|| {
            Error::internal(self.source_name, self.peek().line, "parse produced no tree")
        })
    }

    fn step(
        &mut self,
        node: &'g GNode,
        work: &mut Vec<Work<'g>>,
        open: &mut Vec<RuleNode>,
    ) -> Result<()> {
        match &node.expr {
            GExpr::Term(terminal) => {
                let tok = self.peek();
                if !terminal.matches(&tok.kind) {
                    return Err(self.unexpected(std::iter::once(terminal)));
                }
                let tok = tok.clone();
                if let Some(parent) = open.last_mut() {
                    parent.children.push(ParseNode::Token(tok));
                }
                self.advance();
            }
            GExpr::Rule(id) => {
                if open.len() >= self.max_depth {
                    let tok = self.peek();
                    return Err(Error::syntax(
                        self.source_name,
                        tok.line,
                        tok.column,
                        format!("nesting too deep (limit {})", self.max_depth),
                    ));
                }
                let rule = self.grammar.rule(*id);
                tracing::trace!(rule = %rule.name, line = self.peek().line, "enter");
                open.push(RuleNode::new(&rule.name));
                work.push(Work::Close);
                work.push(Work::Match(&rule.body));
            }
            GExpr::Seq(items) => {
                for item in items.iter().rev() {
                    work.push(Work::Match(item));
                }
            }
            GExpr::Alt(alts) => {
                let key = Terminal::of(&self.peek().kind);
                match alts.iter().find(|alt| alt.first.contains(&key)) {
                    Some(alt) => work.push(Work::Match(alt)),
                    None => match alts.iter().find(|alt| alt.nullable) {
                        Some(alt) => {
                            self.declined.extend(node.first.iter().cloned());
                            work.push(Work::Match(alt));
                        }
                        None => return Err(self.unexpected(node.first.iter())),
                    },
                }
            }
            GExpr::Opt(inner) => {
                if inner.first.contains(&Terminal::of(&self.peek().kind)) {
                    work.push(Work::Match(inner));
                } else {
                    self.declined.extend(inner.first.iter().cloned());
                }
            }
            GExpr::Rep(inner) => {
                if inner.first.contains(&Terminal::of(&self.peek().kind)) {
                    work.push(Work::Match(node));
                    work.push(Work::Match(inner));
                } else {
                    self.declined.extend(inner.first.iter().cloned());
                }
            }
        }
        Ok(())
    }

    fn unexpected<'a>(&'a self, wanted: impl Iterator<Item = &'a Terminal>) -> Error {
        let tok = self.peek();
        let mut expected: BTreeSet<&Terminal> = self.declined.iter().collect();
        expected.extend(wanted);
        let expected: Vec<String> = expected.into_iter().map(|t| t.to_string()).collect();

        let listed = if expected.len() == 1 {
            expected[0].clone()
        } else if expected.len() <= MAX_LISTED {
            format!("one of {}", expected.join(", "))
        } else {
            format!("one of {}, ...", expected[..MAX_LISTED].join(", "))
        };

        Error::SyntaxError {
            source_name: self.source_name.to_string(),
            line: tok.line,
            col: tok.column,
            message: format!("unexpected {}, expected {}", tok.kind.describe(), listed),
            expected,
        }
    }

    fn peek(&self) -> &Token {
        // Eof is never consumed past
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        self.declined.clear();
    }
}
