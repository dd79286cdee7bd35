//! Functions callable everywhere without a module prefix

/// A builtin and the runtime function implementing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    /// Function in the core (or shell) runtime section
    pub runtime: &'static str,
    pub min_args: usize,
    /// `None` for any number of further arguments
    pub max_args: Option<usize>,
    /// Returns `(any, error)` rather than a bare value
    pub fallible: bool,
    /// Free of side effects, so it may be evaluated where it is used
    pub pure: bool,
}

impl Builtin {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Human-readable arity for diagnostics
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

const fn fallible(name: &'static str, runtime: &'static str, min: usize, max: usize) -> Builtin {
    Builtin {
        name,
        runtime,
        min_args: min,
        max_args: Some(max),
        fallible: true,
        pure: false,
    }
}

/// Every builtin, sorted by name
pub static BUILTINS: &[Builtin] = &[
    fallible("__capture", "rgCapture", 1, 1),
    fallible("__shell", "rgShell", 1, 1),
    Builtin {
        name: "__to_s",
        runtime: "rgToS",
        min_args: 1,
        max_args: Some(1),
        fallible: false,
        pure: true,
    },
    fallible("append", "rgAppend", 2, 2),
    fallible("assert", "rgAssert", 1, 2),
    fallible("assert_eq", "rgAssertEq", 2, 3),
    fallible("delete", "rgDelete", 2, 2),
    Builtin {
        name: "exit",
        runtime: "rgExit",
        min_args: 0,
        max_args: Some(1),
        fallible: false,
        pure: false,
    },
    fallible("keys", "rgKeys", 1, 1),
    fallible("len", "rgLen", 1, 1),
    Builtin {
        name: "print",
        runtime: "rgPrint",
        min_args: 0,
        max_args: None,
        fallible: false,
        pure: false,
    },
    Builtin {
        name: "puts",
        runtime: "rgPuts",
        min_args: 0,
        max_args: None,
        fallible: false,
        pure: false,
    },
    fallible("raise", "rgRaise", 1, 1),
    fallible("range", "rgRange", 1, 2),
    fallible("to_f", "rgToF", 1, 1),
    fallible("to_i", "rgToI", 1, 1),
    Builtin {
        name: "to_s",
        runtime: "rgToS",
        min_args: 1,
        max_args: Some(1),
        fallible: false,
        pure: true,
    },
    Builtin {
        name: "type_of",
        runtime: "rgTypeOf",
        min_args: 1,
        max_args: Some(1),
        fallible: false,
        pure: true,
    },
    fallible("values", "rgValues", 1, 1),
];

pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Names the preprocessor treats as callable on every line
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

/// Builtins that need the shell runtime section
pub(crate) fn needs_shell(name: &str) -> bool {
    matches!(name, "__shell" | "__capture")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_unique() {
        for pair in BUILTINS.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} before {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn test_arity() {
        let range = builtin("range").unwrap();
        assert!(range.accepts(1) && range.accepts(2));
        assert!(!range.accepts(3));
        assert_eq!(range.arity(), "1 to 2");
        assert_eq!(builtin("puts").unwrap().arity(), "at least 0");
        assert_eq!(builtin("len").unwrap().arity(), "1");
        assert!(builtin("nosuch").is_none());
    }

    #[test]
    fn test_every_builtin_is_defined_in_the_runtime() {
        let core = include_str!("templates/core.go.tmpl");
        let shell = include_str!("templates/shell.go.tmpl");
        for b in BUILTINS {
            let decl = format!("func {}(", b.runtime);
            assert!(
                core.contains(&decl) || shell.contains(&decl),
                "{} is not defined",
                b.runtime
            );
        }
    }
}
