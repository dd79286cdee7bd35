//! EBNF grammar loading and LL(1) analysis
//!
//! The grammar text is parsed into a tree of [`GNode`]s, one per rule body.
//! Every node is annotated with its FIRST set and whether it can match the
//! empty string; the driver in [`super::ll1`] only ever looks at those
//! annotations, so it has no knowledge of Rugo itself.

use crate::error::{Error, Result};
use crate::lexer::{Lexicon, TokenKind};
use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Token classes a grammar may name with a lowercase word
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenClass {
    /// `ident`
    Ident,
    /// `label`
    Label,
    /// `integer`
    Integer,
    /// `float`
    Float,
    /// `string`
    String,
    /// `newline`
    Newline,
    /// `eof`
    Eof,
}

impl TokenClass {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ident" => TokenClass::Ident,
            "label" => TokenClass::Label,
            "integer" => TokenClass::Integer,
            "float" => TokenClass::Float,
            "string" => TokenClass::String,
            "newline" => TokenClass::Newline,
            "eof" => TokenClass::Eof,
            _ => return None,
        })
    }

    fn describe(&self) -> &'static str {
        match self {
            TokenClass::Ident => "identifier",
            TokenClass::Label => "label",
            TokenClass::Integer => "integer",
            TokenClass::Float => "float",
            TokenClass::String => "string",
            TokenClass::Newline => "end of line",
            TokenClass::Eof => "end of file",
        }
    }
}

/// A grammar terminal: a quoted literal or a token class
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Terminal {
    /// Keyword or symbol spelled in quotes
    Literal(String),
    /// Token class
    Class(TokenClass),
}

impl Terminal {
    /// The terminal a scanned token belongs to
    pub fn of(kind: &TokenKind) -> Terminal {
        match kind {
            TokenKind::Keyword(text) | TokenKind::Symbol(text) => Terminal::Literal(text.clone()),
            TokenKind::Identifier(_) => Terminal::Class(TokenClass::Ident),
            TokenKind::Label(_) => Terminal::Class(TokenClass::Label),
            TokenKind::Integer(_) => Terminal::Class(TokenClass::Integer),
            TokenKind::Float(_) => Terminal::Class(TokenClass::Float),
            TokenKind::String(_) => Terminal::Class(TokenClass::String),
            TokenKind::Newline => Terminal::Class(TokenClass::Newline),
            TokenKind::Eof => Terminal::Class(TokenClass::Eof),
        }
    }

    /// Whether `kind` is accepted by this terminal
    pub fn matches(&self, kind: &TokenKind) -> bool {
        match (self, kind) {
            (Terminal::Literal(lit), TokenKind::Keyword(text))
            | (Terminal::Literal(lit), TokenKind::Symbol(text)) => lit == text,
            (Terminal::Literal(_), _) => false,
            (Terminal::Class(class), kind) => Terminal::of(kind) == Terminal::Class(*class),
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Literal(text) => write!(f, "`{}`", text),
            Terminal::Class(class) => f.write_str(class.describe()),
        }
    }
}

/// Grammar expression
#[derive(Debug, Clone)]
pub enum GExpr {
    /// `a b c`
    Seq(Vec<GNode>),
    /// `a | b | c`
    Alt(Vec<GNode>),
    /// `[ a ]`
    Opt(Box<GNode>),
    /// `{ a }`
    Rep(Box<GNode>),
    /// Literal or token class
    Term(Terminal),
    /// Reference to a rule by index
    Rule(usize),
}

/// Grammar expression annotated with its LL(1) facts
#[derive(Debug, Clone)]
pub struct GNode {
    /// The expression
    pub expr: GExpr,
    /// Terminals that can begin a match
    pub first: BTreeSet<Terminal>,
    /// Whether the expression can match nothing
    pub nullable: bool,
}

impl GNode {
    fn new(expr: GExpr) -> Self {
        GNode {
            expr,
            first: BTreeSet::new(),
            nullable: false,
        }
    }
}

/// A named production
#[derive(Debug, Clone)]
pub struct Rule {
    /// Rule name as written in the grammar
    pub name: String,
    /// Right-hand side
    pub body: GNode,
}

/// A validated LL(1) grammar
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    lexicon: Lexicon,
}

lazy_static! {
    static ref RUGO_GRAMMAR: std::result::Result<Grammar, String> =
        GrammarLoader::load(include_str!("rugo.ebnf"));
}

/// The embedded Rugo grammar, loaded and validated on first use
pub fn rugo_grammar() -> Result<&'static Grammar> {
    RUGO_GRAMMAR
        .as_ref()
        .map_err(|msg| Error::GrammarError(msg.clone()))
}

impl Grammar {
    /// Parse and validate grammar text
    ///
    /// The first rule is the start rule.
    pub fn load(text: &str) -> Result<Grammar> {
        GrammarLoader::load(text).map_err(Error::GrammarError)
    }

    /// The start rule
    pub fn start(&self) -> &Rule {
        &self.rules[0]
    }

    /// Rule by index
    pub fn rule(&self, id: usize) -> &Rule {
        &self.rules[id]
    }

    /// Look up a rule by name
    pub fn rule_named(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|id| &self.rules[*id])
    }

    /// All rules in definition order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Keywords and symbols used by the grammar
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MetaToken {
    Name(String),
    Literal(String),
    Punct(char),
}

/// Unresolved grammar expression, straight from the text
#[derive(Debug)]
enum Raw {
    Seq(Vec<Raw>),
    Alt(Vec<Raw>),
    Opt(Box<Raw>),
    Rep(Box<Raw>),
    Literal(String),
    Name(String, usize),
}

struct GrammarLoader {
    tokens: Vec<(MetaToken, usize)>,
    current: usize,
}

impl GrammarLoader {
    fn load(text: &str) -> std::result::Result<Grammar, String> {
        let tokens = meta_tokens(text)?;
        let mut loader = GrammarLoader { tokens, current: 0 };
        let raw_rules = loader.productions()?;
        if raw_rules.is_empty() {
            return Err("grammar has no rules".to_string());
        }

        let mut index = HashMap::new();
        for (id, (name, _, line)) in raw_rules.iter().enumerate() {
            if index.insert(name.clone(), id).is_some() {
                return Err(format!("line {}: rule `{}` defined twice", line, name));
            }
        }

        let mut rules = Vec::with_capacity(raw_rules.len());
        for (name, raw, _) in raw_rules {
            let body = resolve(raw, &index)?;
            rules.push(Rule { name, body });
        }

        analyze(&mut rules);
        check_left_recursion(&rules)?;
        for rule in &rules {
            check_node(&rule.name, &rule.body)?;
        }

        let mut literals = BTreeSet::new();
        for rule in &rules {
            collect_literals(&rule.body, &mut literals);
        }
        let lexicon = Lexicon::from_literals(literals.iter().map(String::as_str));

        tracing::debug!(rules = rules.len(), literals = literals.len(), "grammar loaded");
        Ok(Grammar {
            rules,
            index,
            lexicon,
        })
    }

    fn productions(&mut self) -> std::result::Result<Vec<(String, Raw, usize)>, String> {
        let mut out = Vec::new();
        while let Some((tok, line)) = self.tokens.get(self.current).cloned() {
            let name = match tok {
                MetaToken::Name(name) => name,
                other => return Err(format!("line {}: expected rule name, found {:?}", line, other)),
            };
            self.current += 1;
            self.expect('=')?;
            let body = self.alternatives()?;
            self.expect('.')?;
            out.push((name, body, line));
        }
        Ok(out)
    }

    fn alternatives(&mut self) -> std::result::Result<Raw, String> {
        let mut alts = vec![self.sequence()?];
        while self.check('|') {
            self.current += 1;
            alts.push(self.sequence()?);
        }
        Ok(if alts.len() == 1 {
            alts.remove(0)
        } else {
            Raw::Alt(alts)
        })
    }

    fn sequence(&mut self) -> std::result::Result<Raw, String> {
        let mut items = Vec::new();
        loop {
            let Some((tok, line)) = self.tokens.get(self.current).cloned() else {
                return Err("unexpected end of grammar".to_string());
            };
            let item = match tok {
                MetaToken::Name(name) => Raw::Name(name, line),
                MetaToken::Literal(text) => Raw::Literal(text),
                MetaToken::Punct('[') => {
                    self.current += 1;
                    let inner = self.alternatives()?;
                    self.expect(']')?;
                    items.push(Raw::Opt(Box::new(inner)));
                    continue;
                }
                MetaToken::Punct('{') => {
                    self.current += 1;
                    let inner = self.alternatives()?;
                    self.expect('}')?;
                    items.push(Raw::Rep(Box::new(inner)));
                    continue;
                }
                MetaToken::Punct('(') => {
                    self.current += 1;
                    let inner = self.alternatives()?;
                    self.expect(')')?;
                    items.push(inner);
                    continue;
                }
                MetaToken::Punct(_) => break,
            };
            self.current += 1;
            items.push(item);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Raw::Seq(items)
        })
    }

    fn check(&self, punct: char) -> bool {
        matches!(self.tokens.get(self.current), Some((MetaToken::Punct(p), _)) if *p == punct)
    }

    fn expect(&mut self, punct: char) -> std::result::Result<(), String> {
        if self.check(punct) {
            self.current += 1;
            return Ok(());
        }
        match self.tokens.get(self.current) {
            Some((tok, line)) => Err(format!("line {}: expected '{}', found {:?}", line, punct, tok)),
            None => Err(format!("expected '{}' at end of grammar", punct)),
        }
    }
}

fn meta_tokens(text: &str) -> std::result::Result<Vec<(MetaToken, usize)>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' => {
                let start = i + 1;
                i = start;
                while i < chars.len() && chars[i] != '"' && chars[i] != '\n' {
                    i += 1;
                }
                if i >= chars.len() || chars[i] != '"' {
                    return Err(format!("line {}: unterminated literal", line));
                }
                let lit: String = chars[start..i].iter().collect();
                if lit.is_empty() {
                    return Err(format!("line {}: empty literal", line));
                }
                tokens.push((MetaToken::Literal(lit), line));
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push((MetaToken::Name(chars[start..i].iter().collect()), line));
            }
            '=' | '|' | '.' | '[' | ']' | '{' | '}' | '(' | ')' => {
                tokens.push((MetaToken::Punct(c), line));
                i += 1;
            }
            other => return Err(format!("line {}: unexpected '{}' in grammar", line, other)),
        }
    }

    Ok(tokens)
}

fn resolve(raw: Raw, index: &HashMap<String, usize>) -> std::result::Result<GNode, String> {
    let expr = match raw {
        Raw::Seq(items) => GExpr::Seq(
            items
                .into_iter()
                .map(|item| resolve(item, index))
                .collect::<std::result::Result<_, _>>()?,
        ),
        Raw::Alt(alts) => GExpr::Alt(
            alts.into_iter()
                .map(|alt| resolve(alt, index))
                .collect::<std::result::Result<_, _>>()?,
        ),
        Raw::Opt(inner) => GExpr::Opt(Box::new(resolve(*inner, index)?)),
        Raw::Rep(inner) => GExpr::Rep(Box::new(resolve(*inner, index)?)),
        Raw::Literal(text) => GExpr::Term(Terminal::Literal(text)),
        Raw::Name(name, line) => {
            let is_class_name = name.starts_with(|c: char| c.is_ascii_lowercase());
            if is_class_name {
                match TokenClass::from_name(&name) {
                    Some(class) => GExpr::Term(Terminal::Class(class)),
                    None => return Err(format!("line {}: unknown token class `{}`", line, name)),
                }
            } else {
                match index.get(&name) {
                    Some(id) => GExpr::Rule(*id),
                    None => return Err(format!("line {}: undefined rule `{}`", line, name)),
                }
            }
        }
    };
    Ok(GNode::new(expr))
}

/// Compute FIRST and nullable by fixpoint, then annotate every node
fn analyze(rules: &mut [Rule]) {
    let mut first = vec![BTreeSet::new(); rules.len()];
    let mut nullable = vec![false; rules.len()];

    loop {
        let mut changed = false;
        for (id, rule) in rules.iter().enumerate() {
            let (set, empty) = summarize(&rule.body, &first, &nullable);
            if empty && !nullable[id] {
                nullable[id] = true;
                changed = true;
            }
            // FIRST sets only grow, so a size change is a real change
            if set.len() != first[id].len() {
                first[id] = set;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for rule in rules.iter_mut() {
        annotate(&mut rule.body, &first, &nullable);
    }
}

fn summarize(
    node: &GNode,
    first: &[BTreeSet<Terminal>],
    nullable: &[bool],
) -> (BTreeSet<Terminal>, bool) {
    match &node.expr {
        GExpr::Term(t) => (BTreeSet::from([t.clone()]), false),
        GExpr::Rule(id) => (first[*id].clone(), nullable[*id]),
        GExpr::Seq(items) => {
            let mut set = BTreeSet::new();
            for item in items {
                let (item_first, item_nullable) = summarize(item, first, nullable);
                set.extend(item_first);
                if !item_nullable {
                    return (set, false);
                }
            }
            (set, true)
        }
        GExpr::Alt(alts) => {
            let mut set = BTreeSet::new();
            let mut any_nullable = false;
            for alt in alts {
                let (alt_first, alt_nullable) = summarize(alt, first, nullable);
                set.extend(alt_first);
                any_nullable |= alt_nullable;
            }
            (set, any_nullable)
        }
        GExpr::Opt(inner) | GExpr::Rep(inner) => (summarize(inner, first, nullable).0, true),
    }
}

fn annotate(node: &mut GNode, first: &[BTreeSet<Terminal>], nullable: &[bool]) {
    match &mut node.expr {
        GExpr::Seq(items) => items.iter_mut().for_each(|n| annotate(n, first, nullable)),
        GExpr::Alt(alts) => alts.iter_mut().for_each(|n| annotate(n, first, nullable)),
        GExpr::Opt(inner) | GExpr::Rep(inner) => annotate(inner, first, nullable),
        GExpr::Term(_) | GExpr::Rule(_) => {}
    }
    let (set, empty) = summarize(node, first, nullable);
    node.first = set;
    node.nullable = empty;
}

/// Rules reachable at the leftmost position of `node`
fn leftmost(node: &GNode, out: &mut Vec<usize>) {
    match &node.expr {
        GExpr::Term(_) => {}
        GExpr::Rule(id) => out.push(*id),
        GExpr::Seq(items) => {
            for item in items {
                leftmost(item, out);
                if !item.nullable {
                    break;
                }
            }
        }
        GExpr::Alt(alts) => alts.iter().for_each(|alt| leftmost(alt, out)),
        GExpr::Opt(inner) | GExpr::Rep(inner) => leftmost(inner, out),
    }
}

fn check_left_recursion(rules: &[Rule]) -> std::result::Result<(), String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Active,
        Done,
    }

    let edges: Vec<Vec<usize>> = rules
        .iter()
        .map(|rule| {
            let mut out = Vec::new();
            leftmost(&rule.body, &mut out);
            out
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; rules.len()];
    for root in 0..rules.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // (rule, next edge to visit)
        let mut stack = vec![(root, 0usize)];
        marks[root] = Mark::Active;
        while let Some((id, edge)) = stack.last().copied() {
            if edge == edges[id].len() {
                marks[id] = Mark::Done;
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let next = edges[id][edge];
            match marks[next] {
                Mark::Active => {
                    let start = stack.iter().position(|(r, _)| *r == next).unwrap_or(0);
                    let mut path: Vec<&str> = stack[start..]
                        .iter()
                        .map(|(r, _)| rules[*r].name.as_str())
                        .collect();
                    path.push(rules[next].name.as_str());
                    return Err(format!("left recursion: {}", path.join(" -> ")));
                }
                Mark::Unvisited => {
                    marks[next] = Mark::Active;
                    stack.push((next, 0));
                }
                Mark::Done => {}
            }
        }
    }
    Ok(())
}

fn check_node(rule: &str, node: &GNode) -> std::result::Result<(), String> {
    match &node.expr {
        GExpr::Alt(alts) => {
            for (i, a) in alts.iter().enumerate() {
                for (j, b) in alts.iter().enumerate().skip(i + 1) {
                    let shared: Vec<String> =
                        a.first.intersection(&b.first).map(|t| t.to_string()).collect();
                    if !shared.is_empty() {
                        return Err(format!(
                            "rule `{}`: alternatives {} and {} both start with {}",
                            rule,
                            i + 1,
                            j + 1,
                            shared.join(", ")
                        ));
                    }
                }
            }
            if alts.iter().filter(|alt| alt.nullable).count() > 1 {
                return Err(format!(
                    "rule `{}`: more than one alternative can match nothing",
                    rule
                ));
            }
            alts.iter().try_for_each(|alt| check_node(rule, alt))
        }
        GExpr::Opt(inner) | GExpr::Rep(inner) => {
            if inner.nullable {
                let what = if matches!(node.expr, GExpr::Opt(_)) {
                    "option"
                } else {
                    "repetition"
                };
                return Err(format!("rule `{}`: {} body can match nothing", rule, what));
            }
            check_node(rule, inner)
        }
        GExpr::Seq(items) => items.iter().try_for_each(|item| check_node(rule, item)),
        GExpr::Term(_) | GExpr::Rule(_) => Ok(()),
    }
}

fn collect_literals(node: &GNode, out: &mut BTreeSet<String>) {
    match &node.expr {
        GExpr::Term(Terminal::Literal(text)) => {
            out.insert(text.clone());
        }
        GExpr::Seq(items) | GExpr::Alt(items) => {
            items.iter().for_each(|item| collect_literals(item, out))
        }
        GExpr::Opt(inner) | GExpr::Rep(inner) => collect_literals(inner, out),
        GExpr::Term(Terminal::Class(_)) | GExpr::Rule(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_grammar_is_ll1() {
        let grammar = rugo_grammar().expect("embedded grammar must validate");
        assert_eq!(grammar.start().name, "Program");
        assert!(grammar.lexicon().is_keyword("def"));
        assert!(grammar.lexicon().is_keyword("parallel"));
        assert!(!grammar.lexicon().is_keyword("puts"));
    }

    #[test]
    fn test_first_sets() {
        let grammar = Grammar::load(r#"S = [ "a" ] B . B = "b" | "c" ."#).unwrap();
        let s = grammar.rule_named("S").unwrap();
        let expected: BTreeSet<Terminal> = ["a", "b", "c"]
            .iter()
            .map(|t| Terminal::Literal(t.to_string()))
            .collect();
        assert_eq!(s.body.first, expected);
        assert!(!s.body.nullable);
    }

    #[test]
    fn test_rejects_undefined_rule() {
        let err = Grammar::load("S = Missing .").unwrap_err();
        assert!(err.to_string().contains("undefined rule `Missing`"));
    }

    #[test]
    fn test_rejects_left_recursion() {
        let err = Grammar::load(r#"S = E . E = E "+" "x" | "x" ."#).unwrap_err();
        assert!(err.to_string().contains("left recursion"));
    }

    #[test]
    fn test_rejects_first_conflict() {
        let err = Grammar::load(r#"S = "a" "b" | "a" "c" ."#).unwrap_err();
        assert!(err.to_string().contains("both start with `a`"));
    }

    #[test]
    fn test_rejects_nullable_repetition() {
        let err = Grammar::load(r#"S = { [ "a" ] } ."#).unwrap_err();
        assert!(err.to_string().contains("repetition body can match nothing"));
    }

    #[test]
    fn test_rejects_unknown_class() {
        let err = Grammar::load("S = number .").unwrap_err();
        assert!(err.to_string().contains("unknown token class `number`"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let grammar = Grammar::load("// start\nS = ident . // trailing\n").unwrap();
        assert_eq!(grammar.rules().len(), 1);
    }
}
