//! End-to-end tests of the compile pipeline: `require`, resolvers,
//! options and error reporting

use rugoc::{
    BuildMode, CompileOptions, CompileOutput, Compiler, DirResolver, Error, ErrorCategory,
    SourceResolver,
};

fn files(table: &'static [(&'static str, &'static str)]) -> impl SourceResolver {
    move |path: &str| -> anyhow::Result<String> {
        table
            .iter()
            .find(|(name, _)| *name == path)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| anyhow::anyhow!("no such file"))
    }
}

fn compile_with(table: &'static [(&'static str, &'static str)], source: &str) -> rugoc::Result<CompileOutput> {
    Compiler::new(CompileOptions::default())
        .with_resolver(files(table))
        .compile("main.rg", source)
}

static MATH: &[(&str, &str)] = &[(
    "lib/math_utils",
    "def double(x)\n  x * 2\nend\n\ncalls = 0\n",
)];

// =============================================================================
// REQUIRE
// =============================================================================

#[test]
fn test_required_unit_is_prefixed_and_initialized() {
    let output = compile_with(MATH, "require \"lib/math_utils\"\nputs math_utils.double(21)\n").unwrap();
    assert!(output
        .source
        .contains("func rugofn_math_utils__double(v_x any) (any, error) {"));
    assert!(output
        .source
        .contains("func rugoinit_math_utils() (any, error) {"));
    assert!(output
        .source
        .contains("if _, err := rugoinit_math_utils(); err != nil {"));
    assert!(output
        .source
        .contains("rugofn_math_utils__double(int64(21))"));

    // initializer runs before the main body
    let init_call = output.source.find("rugoinit_math_utils(); err").unwrap();
    let double_call = output.source.find("rugofn_math_utils__double(int64(21))").unwrap();
    assert!(init_call < double_call);
}

#[test]
fn test_require_alias() {
    let output = compile_with(MATH, "require \"lib/math_utils\" as m\nputs m.double(1)\n").unwrap();
    assert!(output.source.contains("rugofn_math_utils__double(int64(1))"));
}

#[test]
fn test_required_function_checks() {
    let err = compile_with(MATH, "require \"lib/math_utils\" as m\nm.nope()\n").unwrap_err();
    assert_eq!(err.to_string(), "main.rg:2: undefined function 'm.nope'");

    let err = compile_with(MATH, "require \"lib/math_utils\" as m\nm.double()\n").unwrap_err();
    assert!(err
        .to_string()
        .contains("wrong number of arguments for 'm.double' (expected 1, got 0)"));
}

#[test]
fn test_same_stem_gets_distinct_prefixes() {
    static TWO: &[(&str, &str)] = &[
        ("a/util", "def f()\n  1\nend\n"),
        ("b/util", "def f()\n  2\nend\n"),
    ];
    let output = compile_with(
        TWO,
        "require \"a/util\" as ua\nrequire \"b/util\" as ub\nputs ua.f()\nputs ub.f()\n",
    )
    .unwrap();
    assert!(output.source.contains("func rugofn_util__f("));
    assert!(output.source.contains("func rugofn_util_2__f("));
}

#[test]
fn test_errors_in_required_units_name_that_unit() {
    static BAD: &[(&str, &str)] = &[("lib/bad", "x = 1\ny = )\n")];
    let err = compile_with(BAD, "require \"lib/bad\"\n").unwrap_err();
    match err {
        Error::SyntaxError {
            source_name, line, ..
        } => {
            assert_eq!(source_name, "lib/bad");
            assert_eq!(line, 2);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_namespace_already_in_use() {
    static STR: &[(&str, &str)] = &[("lib/str", "def f()\n  1\nend\n")];
    let err = compile_with(STR, "use \"str\"\nrequire \"lib/str\"\n").unwrap_err();
    assert!(matches!(err, Error::CompileError { line: 2, .. }));
    assert!(err.to_string().contains("namespace 'str' is already in use"));
}

#[test]
fn test_use_in_required_unit_is_program_wide() {
    static LIB: &[(&str, &str)] = &[("lib/text", "use \"str\"\ndef shout(s)\n  str.upper(s)\nend\n")];
    let output = compile_with(LIB, "require \"lib/text\"\nputs text.shout(\"a\")\nputs str.lower(\"B\")\n").unwrap();
    assert!(output.source.contains("func rugo_mod_str_upper("));
    assert!(output.source.contains("func rugo_mod_str_lower("));
}

#[test]
fn test_missing_unit_is_a_resolve_error() {
    let err = compile_with(MATH, "require \"lib/absent\"\n").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resolve);
    assert_eq!(
        err,
        Error::ResolveError {
            path: "lib/absent".to_string(),
            message: "no such file".to_string(),
        }
    );
}

#[test]
fn test_dir_resolver_appends_extension() {
    let root = std::env::temp_dir().join(format!("rugoc-require-{}", std::process::id()));
    std::fs::create_dir_all(root.join("lib")).unwrap();
    std::fs::write(root.join("lib").join("helpers.rg"), "def help()\n  \"ok\"\nend\n").unwrap();

    let result = Compiler::new(CompileOptions::default())
        .with_resolver(DirResolver::new(&root))
        .compile("main.rg", "require \"lib/helpers\"\nputs helpers.help()\n");
    let missing = DirResolver::new(&root).resolve("lib/none");
    std::fs::remove_dir_all(&root).ok();

    assert!(result.unwrap().source.contains("func rugofn_helpers__help("));
    assert!(missing.is_err());
}

// =============================================================================
// OPTIONS AND ERRORS
// =============================================================================

#[test]
fn test_options_from_json() {
    let options = CompileOptions::from_json(
        r#"{"mode": "bench", "bridge_roots": ["/opt/go/src"], "max_nesting": 256}"#,
    )
    .unwrap();
    assert_eq!(options.mode, BuildMode::Bench);
    assert_eq!(options.bridge_roots.len(), 1);
    assert_eq!(options.max_nesting, 256);
    assert!(!options.line_comments);
}

#[test]
fn test_invalid_options_fail_the_compile() {
    let options = CompileOptions {
        max_nesting: 0,
        ..CompileOptions::default()
    };
    let err = Compiler::new(options).compile("m.rg", "puts 1\n").unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn test_error_categories() {
    let compiler = Compiler::new(CompileOptions::default());
    let cases = [
        ("while true\n", ErrorCategory::Syntax),
        ("nope(1)\n", ErrorCategory::Compile),
        ("use \"nope\"\n", ErrorCategory::Compile),
        ("require \"x\"\n", ErrorCategory::Resolve),
        ("import \"example.com/none\"\n", ErrorCategory::Bridge),
    ];
    for (source, category) in cases {
        let err = compiler.compile("m.rg", source).unwrap_err();
        assert_eq!(err.category(), category, "{:?}", source);
        assert!(err.is_user_error());
    }
}

#[test]
fn test_errors_render_on_one_line() {
    let err = Compiler::new(CompileOptions::default())
        .compile("m.rg", "x = 1\nputs y\n")
        .unwrap_err();
    let rendered = err.to_string();
    assert!(!rendered.contains('\n'));
    assert!(rendered.starts_with("m.rg:2: "));
}

#[test]
fn test_overflowing_float_literal_is_a_syntax_error() {
    let err = Compiler::new(CompileOptions::default())
        .compile("m.rg", "x = 2.5\ny = 1e999\nputs x, y\n")
        .unwrap_err();
    match err {
        Error::SyntaxError { line, message, .. } => {
            assert_eq!(line, 2);
            assert!(message.contains("out of range"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_binary_garbage_is_a_syntax_error() {
    let err = Compiler::new(CompileOptions::default())
        .compile("m.rg", "x = \u{1}\u{2}\u{7f} ]]] ((\n")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Syntax);
}
