//! Emission state: output buffer, lexical scopes and name mangling

use std::collections::BTreeSet;

/// Go source buffer with tab indentation
#[derive(Debug, Default)]
pub(crate) struct Emitter {
    indent: usize,
    output: String,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            indent: 0,
            output: String::with_capacity(8192),
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent called with zero indent");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write one indented line
    pub fn writeln(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push('\t');
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    pub fn blank(&mut self) {
        self.output.push('\n');
    }

    /// Append text verbatim, ignoring indentation
    pub fn write_raw(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// `if err != nil { return nil, err }` after a fallible assignment
    pub fn propagate(&mut self, err: &str) {
        self.writeln(&format!("if {} != nil {{", err));
        self.indent();
        self.writeln(&format!("return nil, {}", err));
        self.dedent();
        self.writeln("}");
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

#[derive(Debug)]
struct Frame {
    names: BTreeSet<String>,
    /// Function frames hide everything declared outside them
    boundary: bool,
}

/// Variables visible to the code being generated
#[derive(Debug, Default)]
pub(crate) struct Scopes {
    frames: Vec<Frame>,
}

impl Scopes {
    /// Enter a top-level Go function
    pub fn enter_function(&mut self) {
        self.frames.push(Frame {
            names: BTreeSet::new(),
            boundary: true,
        });
    }

    /// Enter a closure that captures the enclosing variables
    pub fn enter_closure(&mut self) {
        self.frames.push(Frame {
            names: BTreeSet::new(),
            boundary: false,
        });
    }

    pub fn exit(&mut self) {
        self.frames.pop();
    }

    /// Record `name` in the innermost frame; false if it was already there
    pub fn declare(&mut self, name: &str) -> bool {
        match self.frames.last_mut() {
            Some(frame) => frame.names.insert(name.to_string()),
            None => false,
        }
    }

    pub fn is_visible(&self, name: &str) -> bool {
        for frame in self.frames.iter().rev() {
            if frame.names.contains(name) {
                return true;
            }
            if frame.boundary {
                break;
            }
        }
        false
    }
}

/// Go identifier of a Rugo variable
pub(crate) fn var_name(name: &str) -> String {
    format!("v_{}", name)
}

/// Go identifier of a user function, qualified by its unit's prefix
pub(crate) fn function_name(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("rugofn_{}__{}", prefix, name),
        None => format!("rugofn_{}", name),
    }
}

/// Go interpreted string literal for already-decoded text
pub(crate) fn go_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_dedent() {
        let mut out = Emitter::new();
        out.writeln("func f() {");
        out.indent();
        out.writeln("return");
        out.dedent();
        out.writeln("}");
        assert_eq!(out.take_output(), "func f() {\n\treturn\n}\n");
    }

    #[test]
    fn test_function_frames_hide_outer_names() {
        let mut scopes = Scopes::default();
        scopes.enter_function();
        assert!(scopes.declare("x"));
        assert!(!scopes.declare("x"));
        scopes.enter_closure();
        assert!(scopes.is_visible("x"));
        scopes.enter_function();
        assert!(!scopes.is_visible("x"));
        scopes.exit();
        scopes.exit();
        scopes.exit();
        assert!(!scopes.is_visible("x"));
    }

    #[test]
    fn test_go_string_escapes() {
        assert_eq!(go_string("a\"b\\c\n"), r#""a\"b\\c\n""#);
        assert_eq!(go_string("\u{1}é"), "\"\\x01é\"");
    }

    #[test]
    fn test_mangling() {
        assert_eq!(var_name("count"), "v_count");
        assert_eq!(function_name(None, "add"), "rugofn_add");
        assert_eq!(function_name(Some("lib"), "add"), "rugofn_lib__add");
    }
}
