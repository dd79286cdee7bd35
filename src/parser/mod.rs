//! Rugo Parser Module
//!
//! Grammar-driven parsing: `rugo.ebnf` is loaded into an annotated LL(1)
//! grammar, a generic driver turns tokens into a concrete tree, and the
//! walker lowers that tree into the AST.

mod ast;
mod grammar;
mod ll1;
mod tree;
mod walker;

pub use ast::{
    BinaryOp, Expr, Program, Statement, StatementKind, StructDef, TryHandler, UnaryOp,
};
pub use grammar::{rugo_grammar, GExpr, GNode, Grammar, Rule, Terminal, TokenClass};
pub use ll1::Ll1Parser;
pub use tree::{ParseNode, RuleNode};
pub use walker::Walker;

use crate::error::Result;
use crate::lexer::Scanner;

/// Default limit on parse-tree depth
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Parser for preprocessed Rugo text
pub struct Parser<'g> {
    grammar: &'g Grammar,
    max_depth: usize,
}

impl Parser<'static> {
    /// Parser over the embedded Rugo grammar
    pub fn rugo(max_depth: usize) -> Result<Self> {
        Ok(Parser::with_grammar(rugo_grammar()?, max_depth))
    }
}

impl<'g> Parser<'g> {
    /// Parser over any validated grammar
    pub fn with_grammar(grammar: &'g Grammar, max_depth: usize) -> Self {
        Parser { grammar, max_depth }
    }

    /// Scan and parse into a concrete tree
    ///
    /// `line_map[i]` is the original line of preprocessed line `i + 1`.
    pub fn parse_tree(&self, source_name: &str, text: &str, line_map: &[usize]) -> Result<ParseNode> {
        let tokens = Scanner::new(text, source_name, self.grammar.lexicon(), line_map).scan_tokens()?;
        tracing::debug!(unit = source_name, tokens = tokens.len(), "scanned");
        Ll1Parser::new(self.grammar, &tokens, source_name, self.max_depth).parse()
    }

    /// Scan, parse and lower into a [`Program`]
    ///
    /// `raw_source` is kept on the program as submitted, before preprocessing.
    pub fn parse(
        &self,
        source_name: &str,
        text: &str,
        line_map: &[usize],
        raw_source: &str,
    ) -> Result<Program> {
        let tree = self.parse_tree(source_name, text, line_map)?;
        let program = Walker::new(source_name).walk(&tree, raw_source)?;
        tracing::debug!(
            unit = source_name,
            statements = program.statements.len(),
            structs = program.structs.len(),
            "walked"
        );
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(text: &str) -> Result<Program> {
        Parser::rugo(DEFAULT_MAX_DEPTH)?.parse("t.rg", text, &[], text)
    }

    #[test]
    fn test_precedence_and_left_association() {
        let program = parse("x = 1 - 2 - 3 * 4\n").unwrap();
        let StatementKind::Assign { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        // (1 - 2) - (3 * 4)
        match value {
            Expr::Binary {
                op: BinaryOp::Sub,
                left,
                right,
            } => {
                assert!(matches!(**left, Expr::Binary { op: BinaryOp::Sub, .. }));
                assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negative_literal_folds() {
        let program = parse("x = -5\ny = -2.5\n").unwrap();
        assert!(matches!(
            &program.statements[0].kind,
            StatementKind::Assign { value: Expr::IntLit(-5), .. }
        ));
        assert!(matches!(
            &program.statements[1].kind,
            StatementKind::Assign { value: Expr::FloatLit(f), .. } if *f == -2.5
        ));
    }

    #[test]
    fn test_statement_spans() {
        let program = parse("def f(a)\n  a\nend\nf(1)\n").unwrap();
        assert_eq!(program.statements[0].start_line, 1);
        assert_eq!(program.statements[0].end_line, 3);
        assert_eq!(program.statements[1].start_line, 4);
    }

    #[test]
    fn test_struct_declarations_are_extracted() {
        let program = parse("struct Point(x, y)\np = 1\n").unwrap();
        assert_eq!(program.structs.len(), 1);
        assert_eq!(program.structs[0].fields, vec!["x", "y"]);
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("1 = x\n").unwrap_err();
        assert!(matches!(err, Error::SyntaxError { line: 1, col: 1, .. }));
        assert!(err.to_string().contains("invalid assignment target"));
    }

    #[test]
    fn test_unbalanced_block() {
        let err = parse("if x\n  puts(1)\n").unwrap_err();
        match err {
            Error::SyntaxError { message, expected, .. } => {
                assert!(message.contains("unexpected end of file"));
                assert!(expected.contains(&"`end`".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
