//! Integration tests for the grammar-driven parser and the AST walker
//!
//! Source goes through the preprocessor first, as in a real compile, so
//! line numbers are checked against what the user wrote.

use rugoc::codegen::builtin_names;
use rugoc::parser::{
    BinaryOp, Expr, Parser, Program, StatementKind, TryHandler, UnaryOp, DEFAULT_MAX_DEPTH,
};
use rugoc::preprocess::Preprocessor;
use rugoc::{Error, Result};

fn parse_with_depth(source: &str, max_depth: usize) -> Result<Program> {
    let pre = Preprocessor::new()
        .with_callables(builtin_names())
        .process(source);
    Parser::rugo(max_depth)?.parse("test.rg", &pre.text, &pre.line_map, source)
}

fn parse(source: &str) -> Result<Program> {
    parse_with_depth(source, DEFAULT_MAX_DEPTH)
}

fn assigned(program: &Program, index: usize) -> &Expr {
    match &program.statements[index].kind {
        StatementKind::Assign { value, .. } => value,
        other => panic!("expected assignment, got {:?}", other),
    }
}

// =============================================================================
// STATEMENTS
// =============================================================================

#[test]
fn test_if_elsif_else_chain() {
    let program = parse("x = 2\nif x == 1\n  y = 1\nelsif x == 2\n  y = 2\nelse\n  y = 3\nend\n").unwrap();
    match &program.statements[1].kind {
        StatementKind::If {
            elsifs, else_body, ..
        } => {
            assert_eq!(elsifs.len(), 1);
            assert!(matches!(
                elsifs[0].0,
                Expr::Binary {
                    op: BinaryOp::Eq,
                    ..
                }
            ));
            assert_eq!(else_body.as_ref().map(Vec::len), Some(1));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(program.statements[1].start_line, 2);
    assert_eq!(program.statements[1].end_line, 8);
}

#[test]
fn test_for_with_key_and_value() {
    let program = parse("h = {a: 1}\nfor k, v in h\n  puts k\nend\n").unwrap();
    match &program.statements[1].kind {
        StatementKind::For {
            var,
            value_var,
            iterable,
            body,
        } => {
            assert_eq!(var, "k");
            assert_eq!(value_var.as_deref(), Some("v"));
            assert_eq!(iterable, &Expr::Ident("h".to_string()));
            assert_eq!(body.len(), 1);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_module_statements() {
    let program = parse("use \"str\"\nimport \"example.com/greet\" as g\nrequire \"lib/util\"\n").unwrap();
    assert_eq!(
        program.statements[0].kind,
        StatementKind::Use {
            module: "str".to_string()
        }
    );
    assert_eq!(
        program.statements[1].kind,
        StatementKind::Import {
            path: "example.com/greet".to_string(),
            alias: Some("g".to_string())
        }
    );
    assert_eq!(
        program.statements[2].kind,
        StatementKind::Require {
            path: "lib/util".to_string(),
            alias: None
        }
    );
}

#[test]
fn test_index_and_dot_assignment() {
    let program = parse("a = [1]\na[0] = 2\np = {x: 1}\np.x = 3\n").unwrap();
    assert!(matches!(
        program.statements[1].kind,
        StatementKind::IndexAssign { .. }
    ));
    match &program.statements[3].kind {
        StatementKind::DotAssign { field, value, .. } => {
            assert_eq!(field, "x");
            assert_eq!(value, &Expr::IntLit(3));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_test_and_bench_blocks() {
    let program = parse("test \"adds\"\n  assert_eq(1 + 1, 2)\nend\nbench \"loop\"\n  x = 1\nend\n").unwrap();
    assert!(matches!(
        &program.statements[0].kind,
        StatementKind::TestDef { name, .. } if name == "adds"
    ));
    assert!(matches!(
        &program.statements[1].kind,
        StatementKind::BenchDef { name, .. } if name == "loop"
    ));
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

#[test]
fn test_compound_assignment_parses_as_binary() {
    let program = parse("x = 1\nx += 2 * 3\n").unwrap();
    match assigned(&program, 1) {
        Expr::Binary {
            op: BinaryOp::Add,
            left,
            right,
        } => {
            assert_eq!(**left, Expr::Ident("x".to_string()));
            assert!(matches!(**right, Expr::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_hash_literal_keeps_source_order() {
    let program = parse("h = {b: 1, \"a\" => 2}\n").unwrap();
    assert_eq!(
        assigned(&program, 0),
        &Expr::HashLit(vec![
            (Expr::StringLit("b".to_string()), Expr::IntLit(1)),
            (Expr::StringLit("a".to_string()), Expr::IntLit(2)),
        ])
    );
}

#[test]
fn test_logical_and_unary() {
    let program = parse("a = true\nb = !a || a && false\n").unwrap();
    match assigned(&program, 1) {
        Expr::Binary {
            op: BinaryOp::Or,
            left,
            right,
        } => {
            assert!(matches!(**left, Expr::Unary { op: UnaryOp::Not, .. }));
            assert!(matches!(**right, Expr::Binary { op: BinaryOp::And, .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_lambda_and_call() {
    let program = parse("double = fn(n)\n  n * 2\nend\nputs double(4)\n").unwrap();
    match assigned(&program, 0) {
        Expr::Lambda { params, body } => {
            assert_eq!(params, &vec!["n".to_string()]);
            assert_eq!(body.len(), 1);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_try_handlers() {
    let program = parse("a = try to_i(\"x\")\nb = try to_i(\"x\") or 0\nc = try to_i(\"x\") or err\n  puts err\n  -1\nend\n").unwrap();
    assert!(matches!(
        assigned(&program, 0),
        Expr::Try {
            handler: TryHandler::None,
            ..
        }
    ));
    assert!(matches!(
        assigned(&program, 1),
        Expr::Try {
            handler: TryHandler::Or(_),
            ..
        }
    ));
    match assigned(&program, 2) {
        Expr::Try {
            handler: TryHandler::Rescue { name, body },
            ..
        } => {
            assert_eq!(name, "err");
            assert_eq!(body.len(), 2);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_spawn_and_parallel() {
    let program = parse("t = spawn 21 * 2\nr = parallel\n  1\n  2\nend\n").unwrap();
    assert!(matches!(assigned(&program, 0), Expr::Spawn { body } if body.len() == 1));
    assert!(matches!(assigned(&program, 1), Expr::Parallel { body } if body.len() == 2));
}

#[test]
fn test_struct_declaration_is_recorded() {
    let program = parse("struct Point\n  x\n  y\nend\np = Point(1, 2)\n").unwrap();
    assert_eq!(program.structs.len(), 1);
    assert_eq!(program.structs[0].name, "Point");
    assert_eq!(program.structs[0].fields, vec!["x", "y"]);
    assert!(matches!(
        &program.statements[0].kind,
        StatementKind::FunctionDef { name, .. } if name == "Point"
    ));
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn test_unterminated_block_is_a_syntax_error() {
    let err = parse("while true\n  x = 1\n").unwrap_err();
    assert!(matches!(err, Error::SyntaxError { .. }));
    assert!(err.is_user_error());
}

#[test]
fn test_error_line_refers_to_original_source() {
    // the heredoc collapses three lines into one
    let err = parse("x = <<~T\n  a\nT\ny = )\n").unwrap_err();
    assert!(matches!(err, Error::SyntaxError { line: 4, .. }), "{:?}", err);
}

#[test]
fn test_deep_nesting_is_rejected_without_overflow() {
    let source = format!("x = {}1{}\n", "(".repeat(50), ")".repeat(50));
    let err = parse_with_depth(&source, 64).unwrap_err();
    assert!(err.to_string().contains("nesting too deep"));
    assert!(parse(&source).is_ok());
}

#[test]
fn test_invalid_assignment_target() {
    let err = parse("x = 1\nx + 1 = 2\n").unwrap_err();
    match err {
        Error::SyntaxError { line, message, .. } => {
            assert_eq!(line, 2);
            assert!(message.contains("invalid assignment target"));
        }
        other => panic!("unexpected {:?}", other),
    }
}
