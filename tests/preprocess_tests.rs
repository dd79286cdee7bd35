//! Integration tests for the preprocessor
//!
//! These run the public `Preprocessor` with the real builtin table, the
//! way the compiler does, and check the rewritten text and line map.

use rugoc::codegen::builtin_names;
use rugoc::parser::rugo_grammar;
use rugoc::preprocess::{Preprocessed, Preprocessor, KEYWORDS};

fn preprocess(source: &str) -> Preprocessed {
    Preprocessor::new()
        .with_callables(builtin_names())
        .process(source)
}

fn lines(source: &str) -> Vec<String> {
    preprocess(source).text.lines().map(str::to_string).collect()
}

// =============================================================================
// SUGAR
// =============================================================================

#[test]
fn test_paren_free_builtin_call_with_interpolation() {
    let out = lines("name = \"rugo\"\nputs \"hi #{name}\"\n");
    assert_eq!(out[0], "name = \"rugo\"");
    assert_eq!(out[1], r#"puts(("hi " + __to_s(name)))"#);
}

#[test]
fn test_compound_assignment_expands() {
    let out = lines("count = 1\ncount += 2\ncount *= 3 + 1\n");
    assert_eq!(out[1], "count = count + (2)");
    assert_eq!(out[2], "count = count * (3 + 1)");
}

#[test]
fn test_unknown_command_falls_back_to_shell() {
    let out = lines("ls -la /tmp\nout = `whoami`\n");
    assert_eq!(out[0], r#"__shell("ls -la /tmp")"#);
    assert_eq!(out[1], r#"out = __capture("whoami")"#);
}

#[test]
fn test_forward_reference_at_top_level_is_a_shell_command() {
    let source = "greet\ndef greet()\n  puts \"hi\"\nend\ngreet\n";
    let out = lines(source);
    assert_eq!(out[0], r#"__shell("greet")"#);
    assert_eq!(out[2], r#"  puts("hi")"#);
    assert_eq!(out[4], "greet()");
}

#[test]
fn test_forward_reference_inside_function_is_a_call() {
    let source = "def first()\n  second\nend\ndef second()\n  1\nend\n";
    let out = lines(source);
    assert_eq!(out[1], "  second()");
}

#[test]
fn test_try_or_unknown_name_becomes_rescue() {
    let out = lines("x = try to_i(\"a\") or err\n");
    assert_eq!(out[0], "x = try to_i(\"a\") rescue err");
}

#[test]
fn test_one_line_spawn_expands_to_block() {
    let out = lines("t = spawn 21 * 2\n");
    assert_eq!(out, vec!["t = spawn", "  21 * 2", "end"]);
}

// =============================================================================
// LINE MAP
// =============================================================================

#[test]
fn test_comments_are_stripped_and_lines_kept() {
    let pre = preprocess("# header\nx = 1 # trailing\n\nputs x\n");
    assert!(!pre.text.contains("header"));
    assert!(!pre.text.contains("trailing"));
    assert_eq!(pre.line_map, vec![1, 2, 3, 4]);
}

#[test]
fn test_heredoc_collapses_onto_its_first_line() {
    let pre = preprocess("msg = <<~TEXT\n  one\n  two\nTEXT\nputs msg\n");
    assert_eq!(
        pre.text,
        "msg = \"one\\ntwo\\n\"\nputs(msg)\n"
    );
    assert_eq!(pre.line_map, vec![1, 5]);
}

#[test]
fn test_struct_block_becomes_constructor() {
    let pre = preprocess("struct Point\n  x\n  y\nend\np = Point(1, 2)\n");
    let out: Vec<&str> = pre.text.lines().collect();
    assert_eq!(out[0], "struct Point(x, y)");
    assert_eq!(out[1], "def Point(x, y)");
    assert!(out[2].contains(r#""__type__" => "Point""#));
    assert_eq!(out[4], "p = Point(1, 2)");
    assert_eq!(pre.line_map[4], 5);
}

#[test]
fn test_preprocessing_is_deterministic() {
    let source = "x = 1\nputs \"#{x}\"\nls\ndef f(a)\n  a\nend\n";
    assert_eq!(preprocess(source), preprocess(source));
}

// =============================================================================
// KEYWORDS
// =============================================================================

#[test]
fn test_keywords_match_the_grammar() {
    let grammar = rugo_grammar().unwrap();
    let from_grammar: Vec<&str> = grammar.lexicon().keywords().collect();
    let mut listed: Vec<&str> = KEYWORDS.to_vec();
    listed.sort_unstable();
    assert_eq!(from_grammar, listed);
}

#[test]
fn test_keyword_lines_are_not_rewritten() {
    let out = lines("while x < 3\n  x += 1\nend\n");
    assert_eq!(out[0], "while x < 3");
    assert_eq!(out[2], "end");
}
