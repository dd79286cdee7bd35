//! Line-level syntactic sugar
//!
//! Runs last. Each line is first split if it holds a one-line `spawn`, then
//! statement-level rewrites apply when the line starts a statement, then
//! backticks and interpolation are expanded anywhere on the line. The block
//! tracker sees the final text.

use super::interpolate::{interpolate, rewrite_backticks, shell_literal};
use super::scope::{BlockEvent, BlockTracker, Scopes};
use super::segments::{
    bracket_delta, ends_with_continuation, identifier_at, indent_len, is_identifier,
    segments, skip_quoted, words, SegmentKind,
};
use super::{SourceLine, KEYWORDS};
use std::collections::{BTreeMap, BTreeSet};

const COMPOUND_OPERATORS: &[u8] = b"+-*/%";

/// Apply sugar rewrites to every line
pub(crate) fn expand_sugar(lines: Vec<SourceLine>, builtins: &BTreeSet<String>) -> Vec<SourceLine> {
    let mut pass = SugarPass {
        tracker: BlockTracker::default(),
        scopes: Scopes::new(collect_defs(&lines), builtins.clone()),
        open_brackets: 0,
        continued: false,
    };

    let mut out = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        for piece in expand_spawn(&line.text) {
            let text = pass.rewrite(&piece, index);
            out.push(SourceLine::new(text, line.origin));
        }
    }
    out
}

/// First `def` line of every function name
fn collect_defs(lines: &[SourceLine]) -> BTreeMap<String, usize> {
    let mut defs = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.text.trim_start();
        let Some(rest) = trimmed.strip_prefix("def ") else {
            continue;
        };
        if let Some(name) = identifier_at(rest.trim_start(), 0) {
            defs.entry(name.to_string()).or_insert(index);
        }
    }
    defs
}

struct SugarPass {
    tracker: BlockTracker,
    scopes: Scopes,
    /// Brackets left open by earlier lines
    open_brackets: i64,
    /// Previous line ended with an operator or comma
    continued: bool,
}

impl SugarPass {
    fn rewrite(&mut self, text: &str, index: usize) -> String {
        let starts_statement = self.open_brackets == 0 && !self.continued;
        let mut text = if starts_statement && !text.trim().is_empty() {
            self.rewrite_statement(text, index)
        } else {
            text.to_string()
        };
        text = interpolate(&rewrite_backticks(&text));

        self.open_brackets = (self.open_brackets + bracket_delta(&text)).max(0);
        self.continued = ends_with_continuation(&text);

        for event in self.tracker.observe(&words(&text)) {
            self.scopes.apply(event);
            if let BlockEvent::Open(_, at) = event {
                declare_block_names(&text, at, &mut self.scopes);
            }
        }
        text
    }

    fn rewrite_statement(&mut self, text: &str, index: usize) -> String {
        let indent = indent_len(text);
        let prefix = &text[..indent];
        let mut body = text[indent..].to_string();

        if let Some(expanded) = compound_assignment(&body) {
            body = expanded;
        }
        if let Some(rescued) = self.try_or_to_rescue(&body, index) {
            body = rescued;
        }

        let word = identifier_at(&body, 0);
        if let Some(word) = word.filter(|w| KEYWORDS.contains(w)) {
            if word == "return" && body[word.len()..].starts_with(' ') {
                let args = body[word.len()..].trim_start();
                return format!("{}return {}", prefix, self.paren_free_call(args, index));
            }
            return format!("{}{}", prefix, body);
        }

        if let Some(eq) = assignment_operator(&body) {
            let target = body[..eq].trim_end();
            if is_identifier(target) {
                self.scopes.declare(target);
            }
            let rhs = &body[eq + 1..];
            let spacing = &rhs[..indent_len(rhs)];
            return format!(
                "{}{}{}{}",
                prefix,
                &body[..eq + 1],
                spacing,
                self.paren_free_call(rhs.trim_start(), index)
            );
        }

        let Some(word) = word else {
            return format!("{}{}", prefix, body);
        };
        if self.scopes.is_variable(word) {
            return format!("{}{}", prefix, body);
        }
        if self.scopes.is_callable(word, index, &self.tracker) {
            return format!("{}{}", prefix, self.paren_free_call(&body, index));
        }
        match body[word.len()..].chars().next() {
            Some('(') | Some('.') | Some('[') => format!("{}{}", prefix, body),
            _ => format!("{}__shell({})", prefix, shell_literal(&body)),
        }
    }

    /// `name args` -> `name(args)` and bare `name` -> `name()` for callables
    fn paren_free_call(&self, expr: &str, index: usize) -> String {
        let Some(word) = identifier_at(expr, 0) else {
            return expr.to_string();
        };
        if KEYWORDS.contains(&word)
            || self.scopes.is_variable(word)
            || !self.scopes.is_callable(word, index, &self.tracker)
        {
            return expr.to_string();
        }

        let rest = &expr[word.len()..];
        if rest.trim().is_empty() {
            return format!("{}()", word);
        }
        if !rest.starts_with([' ', '\t']) {
            return expr.to_string();
        }
        let args = rest.trim();
        if starts_argument(args) && !ends_with_continuation(args) {
            format!("{}({})", word, args)
        } else {
            expr.to_string()
        }
    }

    /// `try EXPR or NAME` with an unknown `NAME` opens a rescue block
    fn try_or_to_rescue(&self, body: &str, index: usize) -> Option<String> {
        let found = words(body);
        let try_at = found.iter().position(|w| w.text == "try")?;
        let or_word = found.iter().skip(try_at + 1).rev().find(|w| w.text == "or")?;
        let after = &body[or_word.start + 2..];
        let name = after.trim();
        if !is_identifier(name) || KEYWORDS.contains(&name) {
            return None;
        }
        if self.scopes.is_variable(name) || self.scopes.is_callable(name, index, &self.tracker) {
            return None;
        }
        Some(format!("{}rescue {}", &body[..or_word.start], name))
    }
}

/// Names bound by a block opener: parameters, loop variables, rescue names
fn declare_block_names(text: &str, at: usize, scopes: &mut Scopes) {
    let Some(keyword) = identifier_at(text, at) else {
        return;
    };
    let after = &text[at + keyword.len()..];
    match keyword {
        "def" | "fn" => {
            let Some(open) = after.find('(') else {
                return;
            };
            let close = after[open..].find(')').map(|c| c + open).unwrap_or(after.len());
            for param in after[open + 1..close].split(',').map(str::trim) {
                if is_identifier(param) {
                    scopes.declare(param);
                }
            }
        }
        "for" => {
            let vars = after.split(" in ").next().unwrap_or("");
            for var in vars.split(',').map(str::trim) {
                if is_identifier(var) {
                    scopes.declare(var);
                }
            }
        }
        "rescue" => {
            if let Some(name) = identifier_at(after.trim_start(), 0) {
                scopes.declare(name);
            }
        }
        _ => {}
    }
}

/// Expand a one-line `spawn EXPR` into block form
fn expand_spawn(text: &str) -> Vec<String> {
    let found = words(text);
    let Some(spawn) = found.iter().find(|w| w.text == "spawn") else {
        return vec![text.to_string()];
    };
    let split = spawn.start + "spawn".len();
    let rest = text[split..].trim();
    if rest.is_empty() || found.iter().any(|w| w.text == "end" && w.start > spawn.start) {
        return vec![text.to_string()];
    }
    let indent = &text[..indent_len(text)];
    vec![
        text[..split].to_string(),
        format!("{}  {}", indent, rest),
        format!("{}end", indent),
    ]
}

/// `target op= value` -> `target = target op (value)`
fn compound_assignment(body: &str) -> Option<String> {
    let target_end = assignment_target_end(body)?;
    let target = &body[..target_end];
    let rest = body[target_end..].trim_start();
    let bytes = rest.as_bytes();
    let op = *bytes.first()?;
    if !COMPOUND_OPERATORS.contains(&op) || bytes.get(1) != Some(&b'=') || bytes.get(2) == Some(&b'=') {
        return None;
    }
    let value = rest[2..].trim();
    if value.is_empty() {
        return None;
    }
    Some(format!("{} = {} {} ({})", target, target, op as char, value))
}

/// End of `name`, `name.field`, `name[index]` chains at the start of `body`
fn assignment_target_end(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut i = identifier_at(body, 0)?.len();
    loop {
        match bytes.get(i) {
            Some(b'.') => {
                let field = identifier_at(body, i + 1)?;
                i += 1 + field.len();
            }
            Some(b'[') => {
                let mut depth = 0usize;
                loop {
                    match bytes.get(i) {
                        None => return None,
                        Some(b'"') | Some(b'\'') => {
                            i = skip_quoted(bytes, i, 0);
                            continue;
                        }
                        Some(b'[') => depth += 1,
                        Some(b']') => {
                            depth -= 1;
                            if depth == 0 {
                                i += 1;
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => return Some(i),
        }
    }
}

/// Offset of a top-level assignment `=` in code
fn assignment_operator(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0i64;
    for seg in segments(body) {
        if seg.kind != SegmentKind::Code {
            continue;
        }
        for i in seg.start..seg.end {
            match bytes[i] {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth -= 1,
                b'=' if depth == 0 => {
                    let prev = if i > 0 { bytes[i - 1] } else { b' ' };
                    let next = bytes.get(i + 1).copied().unwrap_or(b' ');
                    if !matches!(prev, b'=' | b'!' | b'<' | b'>') && !matches!(next, b'=' | b'>') {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn starts_argument(args: &str) -> bool {
    let mut chars = args.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => true,
        Some('"' | '\'' | '`' | '[' | '{' | '(' | '!') => true,
        Some('-') => matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric() || c == '('),
        _ => false,
    }
}
