//! Top-level declaration scanning for Go source
//!
//! Only the shape of a package's API is read: the package clause, function
//! and method signatures, and struct type field counts. Bodies, variables,
//! constants and imports are skipped by brace matching.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Go type expression, as far as bridging cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoType {
    /// Predeclared, local or qualified name, with any type arguments
    Named {
        package: Option<String>,
        name: String,
        args: Vec<GoType>,
    },
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    Array(String, Box<GoType>),
    Map(Box<GoType>, Box<GoType>),
    Chan(Box<GoType>),
    /// Any `func(...)` type; parameters are not kept
    Func,
    Interface { empty: bool },
    /// Anonymous `struct{...}`
    Struct,
    /// Trailing `...T` parameter
    Variadic(Box<GoType>),
}

impl GoType {
    /// Unqualified type name without arguments
    pub fn named(name: &str) -> Self {
        GoType::Named {
            package: None,
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    /// Name of a local, unqualified, non-generic named type
    pub fn local_name(&self) -> Option<&str> {
        match self {
            GoType::Named {
                package: None,
                name,
                args,
            } if args.is_empty() => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoType::Named {
                package,
                name,
                args,
            } => {
                if let Some(pkg) = package {
                    write!(f, "{}.", pkg)?;
                }
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "[{}]", args.join(", "))?;
                }
                Ok(())
            }
            GoType::Pointer(inner) => write!(f, "*{}", inner),
            GoType::Slice(inner) => write!(f, "[]{}", inner),
            GoType::Array(len, inner) => write!(f, "[{}]{}", len, inner),
            GoType::Map(k, v) => write!(f, "map[{}]{}", k, v),
            GoType::Chan(inner) => write!(f, "chan {}", inner),
            GoType::Func => write!(f, "func(...)"),
            GoType::Interface { empty: true } => write!(f, "interface{{}}"),
            GoType::Interface { empty: false } => write!(f, "interface{{...}}"),
            GoType::Struct => write!(f, "struct{{...}}"),
            GoType::Variadic(inner) => write!(f, "...{}", inner),
        }
    }
}

/// One function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoParam {
    pub name: Option<String>,
    pub ty: GoType,
}

/// A top-level `func` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoFunc {
    pub name: String,
    /// Declared with type parameters
    pub generic: bool,
    pub params: Vec<GoParam>,
    pub results: Vec<GoType>,
    /// Set when the signature could not be read
    pub malformed: Option<String>,
    /// File the declaration came from
    pub file: String,
}

impl GoFunc {
    pub fn is_exported(&self) -> bool {
        self.name.chars().next().is_some_and(char::is_uppercase)
    }
}

/// A method declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoMethod {
    pub receiver: String,
    pub pointer_receiver: bool,
    pub name: String,
    pub params: Vec<GoParam>,
    pub results: Vec<GoType>,
}

/// A named struct type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoStruct {
    pub name: String,
    pub fields: usize,
}

/// Declarations of one Go package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoPackage {
    pub name: String,
    pub funcs: Vec<GoFunc>,
    pub methods: Vec<GoMethod>,
    pub structs: Vec<GoStruct>,
}

impl GoPackage {
    /// Named struct type by name
    pub fn struct_named(&self, name: &str) -> Option<&GoStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Method declared on `receiver` (value or pointer receiver)
    pub fn method(&self, receiver: &str, name: &str) -> Option<&GoMethod> {
        self.methods
            .iter()
            .find(|m| m.receiver == receiver && m.name == name)
    }
}

/// Scan the files of one package, in the order given
///
/// `_test.go` files are ignored. Fails only if the files disagree on the
/// package name or none declares one.
pub fn scan_package(files: &[(String, String)]) -> std::result::Result<GoPackage, String> {
    let mut package = GoPackage::default();
    for (file, text) in files {
        if file.ends_with("_test.go") {
            continue;
        }
        let mut scanner = DeclScanner::new(file, tokenize(text));
        scanner.scan(&mut package)?;
    }
    if package.name.is_empty() {
        return Err("no package clause found".to_string());
    }
    Ok(package)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Punct(String),
    /// Number, string or rune literal
    Lit,
    Newline,
}

impl Tok {
    fn is(&self, punct: &str) -> bool {
        matches!(self, Tok::Punct(p) if p == punct)
    }

    fn is_ident(&self, word: &str) -> bool {
        matches!(self, Tok::Ident(w) if w == word)
    }
}

fn tokenize(src: &str) -> Vec<Tok> {
    let chars: Vec<char> = src.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\n' => {
                toks.push(Tok::Newline);
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let start = i;
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                if chars[start..i].contains(&'\n') {
                    toks.push(Tok::Newline);
                }
                i = (i + 2).min(chars.len());
            }
            '"' | '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != c && chars[i] != '\n' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                toks.push(Tok::Lit);
            }
            '`' => {
                i += 1;
                while i < chars.len() && chars[i] != '`' {
                    i += 1;
                }
                i += 1;
                toks.push(Tok::Lit);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                toks.push(Tok::Ident(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                    i += 1;
                }
                toks.push(Tok::Lit);
            }
            '.' if next == Some('.') && chars.get(i + 2) == Some(&'.') => {
                toks.push(Tok::Punct("...".to_string()));
                i += 3;
            }
            '<' if next == Some('-') => {
                toks.push(Tok::Punct("<-".to_string()));
                i += 2;
            }
            _ => {
                toks.push(Tok::Punct(c.to_string()));
                i += 1;
            }
        }
    }
    toks
}

struct DeclScanner<'f> {
    file: &'f str,
    toks: Vec<Tok>,
    pos: usize,
}

impl<'f> DeclScanner<'f> {
    fn new(file: &'f str, toks: Vec<Tok>) -> Self {
        DeclScanner { file, toks, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn at(&self, punct: &str) -> bool {
        self.peek().is_some_and(|t| t.is(punct))
    }

    fn scan(&mut self, package: &mut GoPackage) -> std::result::Result<(), String> {
        while let Some(tok) = self.advance() {
            match tok {
                Tok::Ident(word) if word == "package" => {
                    let Some(Tok::Ident(name)) = self.advance() else {
                        return Err(format!("{}: malformed package clause", self.file));
                    };
                    if !package.name.is_empty() && package.name != name {
                        return Err(format!(
                            "{}: package {} conflicts with package {}",
                            self.file, name, package.name
                        ));
                    }
                    package.name = name;
                }
                Tok::Ident(word) if word == "func" => self.scan_func(package),
                Tok::Ident(word) if word == "type" => self.scan_type_decl(package),
                Tok::Ident(word) if matches!(word.as_str(), "import" | "var" | "const") => {
                    self.skip_spec()
                }
                Tok::Punct(p) if p == "{" || p == "(" || p == "[" => self.skip_balanced(&p),
                _ => {}
            }
        }
        Ok(())
    }

    /// Skip tokens up to and including the closer of an already-consumed opener
    fn skip_balanced(&mut self, open: &str) {
        self.collect_balanced(open);
    }

    /// Tokens between an already-consumed opener and its closer
    fn collect_balanced(&mut self, open: &str) -> Vec<Tok> {
        let close = match open {
            "(" => ")",
            "[" => "]",
            _ => "}",
        };
        let mut depth = 1usize;
        let mut out = Vec::new();
        while let Some(tok) = self.advance() {
            if tok.is(open) {
                depth += 1;
            } else if tok.is(close) {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            out.push(tok);
        }
        out
    }

    /// Skip a `var`/`const`/`import` declaration, grouped or not
    fn skip_spec(&mut self) {
        if self.at("(") {
            self.advance();
            self.skip_balanced("(");
            return;
        }
        self.skip_line();
    }

    /// Skip to the end of the line, stepping over bracketed runs
    fn skip_line(&mut self) {
        while let Some(tok) = self.peek().cloned() {
            match tok {
                Tok::Newline => break,
                Tok::Punct(p) if p == "(" || p == "[" || p == "{" => {
                    self.advance();
                    self.skip_balanced(&p);
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn scan_func(&mut self, package: &mut GoPackage) {
        if self.at("(") {
            self.advance();
            let receiver = self.collect_balanced("(");
            let Some(Tok::Ident(name)) = self.advance() else {
                return;
            };
            let (params, results) = match self.signature() {
                Ok(sig) => sig,
                Err(_) => {
                    self.skip_body();
                    return;
                }
            };
            self.skip_body();
            if let Some((receiver, pointer_receiver)) = receiver_type(&receiver) {
                package.methods.push(GoMethod {
                    receiver,
                    pointer_receiver,
                    name,
                    params,
                    results,
                });
            }
            return;
        }

        let Some(Tok::Ident(name)) = self.advance() else {
            return;
        };
        let generic = if self.at("[") {
            self.advance();
            self.skip_balanced("[");
            true
        } else {
            false
        };
        let mut func = GoFunc {
            name,
            generic,
            params: Vec::new(),
            results: Vec::new(),
            malformed: None,
            file: self.file.to_string(),
        };
        match self.signature() {
            Ok((params, results)) => {
                func.params = params;
                func.results = results;
            }
            Err(reason) => func.malformed = Some(reason),
        }
        self.skip_body();
        package.funcs.push(func);
    }

    fn signature(&mut self) -> std::result::Result<(Vec<GoParam>, Vec<GoType>), String> {
        if !self.at("(") {
            return Err("missing parameter list".to_string());
        }
        self.advance();
        let params = parse_params(&self.collect_balanced("("))?;

        let results = if self.at("(") {
            self.advance();
            parse_params(&self.collect_balanced("("))?
                .into_iter()
                .map(|p| p.ty)
                .collect()
        } else {
            let tokens = self.result_tokens();
            if tokens.is_empty() {
                Vec::new()
            } else {
                vec![parse_type(&tokens)?]
            }
        };
        Ok((params, results))
    }

    /// Tokens of a single unparenthesized result type
    fn result_tokens(&mut self) -> Vec<Tok> {
        let mut out: Vec<Tok> = Vec::new();
        while let Some(tok) = self.peek().cloned() {
            match &tok {
                Tok::Newline => break,
                Tok::Punct(p) if p == "{" => {
                    let literal_body = out
                        .last()
                        .is_some_and(|t| t.is_ident("interface") || t.is_ident("struct"));
                    if !literal_body {
                        break;
                    }
                    self.advance();
                    out.push(tok.clone());
                    out.extend(self.collect_balanced("{"));
                    out.push(Tok::Punct("}".to_string()));
                }
                Tok::Punct(p) if p == "(" || p == "[" => {
                    self.advance();
                    out.push(tok.clone());
                    out.extend(self.collect_balanced(p));
                    out.push(Tok::Punct(if p == "(" { ")" } else { "]" }.to_string()));
                }
                _ => {
                    self.advance();
                    out.push(tok);
                }
            }
        }
        out
    }

    fn skip_body(&mut self) {
        if self.at("{") {
            self.advance();
            self.skip_balanced("{");
        }
    }

    fn scan_type_decl(&mut self, package: &mut GoPackage) {
        if self.at("(") {
            self.advance();
            let group = self.collect_balanced("(");
            let mut inner = DeclScanner::new(self.file, group);
            while inner.peek().is_some() {
                inner.scan_type_spec(package);
            }
            return;
        }
        self.scan_type_spec(package);
    }

    fn scan_type_spec(&mut self, package: &mut GoPackage) {
        while self.peek() == Some(&Tok::Newline) || self.at(";") {
            self.advance();
        }
        let Some(Tok::Ident(name)) = self.advance() else {
            self.skip_line();
            return;
        };
        if self.at("=") {
            self.skip_line();
            return;
        }
        if self.at("[") {
            let is_params = matches!(self.toks.get(self.pos + 1), Some(Tok::Ident(_)));
            if is_params {
                self.advance();
                self.skip_balanced("[");
            }
        }
        if self.peek().is_some_and(|t| t.is_ident("struct")) {
            self.advance();
            if self.at("{") {
                self.advance();
                let body = self.collect_balanced("{");
                package.structs.push(GoStruct {
                    name,
                    fields: count_fields(&body),
                });
            }
            return;
        }
        self.skip_line();
    }
}

/// Receiver type name and whether it is a pointer
fn receiver_type(tokens: &[Tok]) -> Option<(String, bool)> {
    let tokens: Vec<&Tok> = tokens.iter().filter(|t| **t != Tok::Newline).collect();
    let mut i = 0;
    if tokens.len() >= 2 && matches!(tokens[0], Tok::Ident(_)) && !tokens[1].is(".") && !tokens[1].is("[") {
        i = 1;
    }
    let pointer = tokens.get(i).is_some_and(|t| t.is("*"));
    if pointer {
        i += 1;
    }
    match tokens.get(i) {
        Some(Tok::Ident(name)) => Some((name.clone(), pointer)),
        _ => None,
    }
}

fn count_fields(body: &[Tok]) -> usize {
    let mut count = 0;
    for line in split_top_level(body, |t| *t == Tok::Newline || t.is(";")) {
        if line.is_empty() {
            continue;
        }
        // `a, b int` declares two fields; an embedded type declares one
        count += 1 + line.iter().filter(|t| t.is(",")).count();
    }
    count
}

/// Split at separator tokens outside brackets
fn split_top_level(tokens: &[Tok], is_sep: impl Fn(&Tok) -> bool) -> Vec<Vec<Tok>> {
    let mut parts = vec![Vec::new()];
    let mut depth = 0i32;
    for tok in tokens {
        if tok.is("(") || tok.is("[") || tok.is("{") {
            depth += 1;
        } else if tok.is(")") || tok.is("]") || tok.is("}") {
            depth -= 1;
        } else if depth == 0 && is_sep(tok) {
            parts.push(Vec::new());
            continue;
        }
        if let Some(part) = parts.last_mut() {
            part.push(tok.clone());
        }
    }
    parts
}

/// Words that start a type and so are never parameter names
const TYPE_KEYWORDS: &[&str] = &["chan", "func", "interface", "map", "struct"];

fn parse_params(tokens: &[Tok]) -> std::result::Result<Vec<GoParam>, String> {
    let tokens: Vec<Tok> = tokens.iter().filter(|t| **t != Tok::Newline).cloned().collect();
    let entries: Vec<Vec<Tok>> = split_top_level(&tokens, |t| t.is(","))
        .into_iter()
        .filter(|e| !e.is_empty())
        .collect();

    let is_named = |entry: &[Tok]| match entry {
        [Tok::Ident(first), second, ..] => {
            !TYPE_KEYWORDS.contains(&first.as_str()) && !second.is(".")
        }
        _ => false,
    };
    if !entries.iter().any(|e| is_named(e.as_slice())) {
        return entries
            .iter()
            .map(|e| {
                Ok(GoParam {
                    name: None,
                    ty: parse_type(e)?,
                })
            })
            .collect();
    }

    let mut params = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for entry in &entries {
        match entry.as_slice() {
            [Tok::Ident(name)] => pending.push(name.clone()),
            [Tok::Ident(name), rest @ ..] if is_named(entry.as_slice()) => {
                let ty = parse_type(rest)?;
                pending.push(name.clone());
                for name in pending.drain(..) {
                    params.push(GoParam {
                        name: Some(name),
                        ty: ty.clone(),
                    });
                }
            }
            _ => return Err("mixed named and unnamed parameters".to_string()),
        }
    }
    if !pending.is_empty() {
        return Err("parameter without a type".to_string());
    }
    Ok(params)
}

fn parse_type(tokens: &[Tok]) -> std::result::Result<GoType, String> {
    let mut parser = TypeParser { toks: tokens, pos: 0 };
    parser.parse()
}

struct TypeParser<'a> {
    toks: &'a [Tok],
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn next(&mut self) -> Option<&'a Tok> {
        let tok = self.toks.get(self.pos);
        self.pos += 1;
        tok
    }

    fn at(&self, punct: &str) -> bool {
        self.toks.get(self.pos).is_some_and(|t| t.is(punct))
    }

    fn expect(&mut self, punct: &str) -> std::result::Result<(), String> {
        if self.at(punct) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!("expected `{}` in type", punct))
        }
    }

    /// Step over a `{...}` group, returning whether it had content
    fn skip_braces(&mut self) -> std::result::Result<bool, String> {
        self.expect("{")?;
        let mut depth = 1;
        let mut content = false;
        while let Some(tok) = self.next() {
            if tok.is("{") {
                depth += 1;
            } else if tok.is("}") {
                depth -= 1;
                if depth == 0 {
                    return Ok(content);
                }
            }
            if *tok != Tok::Newline && !tok.is(";") {
                content = true;
            }
        }
        Err("unbalanced braces in type".to_string())
    }

    fn parse(&mut self) -> std::result::Result<GoType, String> {
        let Some(tok) = self.next().cloned() else {
            return Err("missing type".to_string());
        };
        match tok {
            Tok::Punct(p) => match p.as_str() {
                "*" => Ok(GoType::Pointer(Box::new(self.parse()?))),
                "..." => Ok(GoType::Variadic(Box::new(self.parse()?))),
                "<-" => {
                    if !self.next().is_some_and(|t| t.is_ident("chan")) {
                        return Err("expected `chan` after `<-`".to_string());
                    }
                    Ok(GoType::Chan(Box::new(self.parse()?)))
                }
                "[" => {
                    if self.at("]") {
                        self.pos += 1;
                        return Ok(GoType::Slice(Box::new(self.parse()?)));
                    }
                    let mut len = String::new();
                    while let Some(tok) = self.next() {
                        match tok {
                            Tok::Punct(p) if p == "]" => {
                                return Ok(GoType::Array(len, Box::new(self.parse()?)));
                            }
                            Tok::Ident(w) => len.push_str(w),
                            Tok::Punct(p) => len.push_str(p),
                            _ => len.push('N'),
                        }
                    }
                    Err("unterminated array length".to_string())
                }
                "(" => {
                    let inner = self.parse()?;
                    self.expect(")")?;
                    Ok(inner)
                }
                other => Err(format!("unexpected `{}` in type", other)),
            },
            Tok::Ident(word) => match word.as_str() {
                "map" => {
                    self.expect("[")?;
                    let key = self.parse()?;
                    self.expect("]")?;
                    let value = self.parse()?;
                    Ok(GoType::Map(Box::new(key), Box::new(value)))
                }
                "chan" => {
                    if self.at("<-") {
                        self.pos += 1;
                    }
                    Ok(GoType::Chan(Box::new(self.parse()?)))
                }
                "func" => {
                    self.pos = self.toks.len();
                    Ok(GoType::Func)
                }
                "interface" => Ok(GoType::Interface {
                    empty: !self.skip_braces()?,
                }),
                "struct" => {
                    self.skip_braces()?;
                    Ok(GoType::Struct)
                }
                _ => {
                    let (package, name) = if self.at(".") {
                        self.pos += 1;
                        match self.next() {
                            Some(Tok::Ident(name)) => (Some(word), name.clone()),
                            _ => return Err("expected name after `.`".to_string()),
                        }
                    } else {
                        (None, word)
                    };
                    let mut args = Vec::new();
                    if self.at("[") {
                        self.pos += 1;
                        loop {
                            args.push(self.parse()?);
                            if self.at(",") {
                                self.pos += 1;
                                continue;
                            }
                            self.expect("]")?;
                            break;
                        }
                    }
                    Ok(GoType::Named {
                        package,
                        name,
                        args,
                    })
                }
            },
            Tok::Lit | Tok::Newline => Err("unexpected literal in type".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> GoPackage {
        scan_package(&[("a.go".to_string(), src.to_string())]).unwrap()
    }

    #[test]
    fn test_functions_and_grouped_params() {
        let pkg = scan(
            r#"package greet

import (
    "fmt"
    "strings"
)

// Greet says hello {
func Greet(first, last string, times int) string {
    return fmt.Sprintf("hi %s", strings.Repeat(first+last, times))
}

func parse(s string) (int, error) { return 0, nil }
"#,
        );
        assert_eq!(pkg.name, "greet");
        assert_eq!(pkg.funcs.len(), 2);
        let greet = &pkg.funcs[0];
        assert_eq!(greet.params.len(), 3);
        assert_eq!(greet.params[1].name.as_deref(), Some("last"));
        assert_eq!(greet.params[1].ty, GoType::named("string"));
        assert_eq!(greet.params[2].ty, GoType::named("int"));
        assert_eq!(greet.results, vec![GoType::named("string")]);
        assert!(greet.is_exported());
        assert!(!pkg.funcs[1].is_exported());
        assert_eq!(pkg.funcs[1].results.len(), 2);
    }

    #[test]
    fn test_composite_types() {
        let pkg = scan(
            "package p\nfunc F(a *Buf, b chan int, c map[string][]byte, d ...string, e interface{}, f io.Reader) {}\n",
        );
        let types: Vec<String> = pkg.funcs[0].params.iter().map(|p| p.ty.to_string()).collect();
        assert_eq!(
            types,
            vec![
                "*Buf",
                "chan int",
                "map[string][]byte",
                "...string",
                "interface{}",
                "io.Reader"
            ]
        );
    }

    #[test]
    fn test_generics_methods_and_structs() {
        let pkg = scan(
            r#"package p
type ID struct {
    value string
}
type Pair struct { a, b int }
type Alias = string
func (i ID) String() string { return i.value }
func (p *Pair) Sum() int { return p.a + p.b }
func Map[T any](xs []T) []T { return xs }
"#,
        );
        assert_eq!(pkg.struct_named("ID").map(|s| s.fields), Some(1));
        assert_eq!(pkg.struct_named("Pair").map(|s| s.fields), Some(2));
        let string = pkg.method("ID", "String").unwrap();
        assert!(!string.pointer_receiver);
        assert!(pkg.method("Pair", "Sum").unwrap().pointer_receiver);
        assert_eq!(pkg.funcs.len(), 1);
        assert!(pkg.funcs[0].generic);
    }

    #[test]
    fn test_strings_and_comments_do_not_confuse_braces() {
        let pkg = scan(
            "package p\nfunc A() string { return \"}\" + `{` } /* func Hidden() {} */\nfunc B() {}\n",
        );
        let names: Vec<&str> = pkg.funcs.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_test_files_are_skipped() {
        let pkg = scan_package(&[
            ("a.go".to_string(), "package p\nfunc A() {}\n".to_string()),
            ("a_test.go".to_string(), "package p\nfunc TestA() {}\n".to_string()),
        ])
        .unwrap();
        assert_eq!(pkg.funcs.len(), 1);
    }

    #[test]
    fn test_missing_package_clause() {
        assert!(scan_package(&[("a.go".to_string(), "func A() {}".to_string())]).is_err());
    }
}
