//! Hand-declared library modules available through `use`

use super::signature::{ModuleSignature, TypeTag};

/// A function of a curated module
#[derive(Debug, Clone, Copy)]
pub struct CuratedFunction {
    pub name: &'static str,
    pub params: &'static [TypeTag],
    pub variadic: bool,
    pub doc: &'static str,
}

/// A curated module: signatures plus the Go support code behind them
#[derive(Debug)]
pub struct CuratedModule {
    pub name: &'static str,
    pub doc: &'static str,
    /// Runtime section implementing every function as `rg<module>_<fn>`
    pub support: &'static str,
    pub functions: &'static [CuratedFunction],
}

impl CuratedModule {
    /// Function by Rugo name
    pub fn function(&self, name: &str) -> Option<&'static CuratedFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Signature of one of this module's functions
    pub fn signature(&self, function: &CuratedFunction) -> ModuleSignature {
        ModuleSignature {
            name: function.name.to_string(),
            module: self.name.to_string(),
            params: function.params.to_vec(),
            variadic: function.variadic,
            doc: Some(function.doc.to_string()),
        }
    }

    /// Go function in [`CuratedModule::support`] that implements `function`
    pub fn dispatch_name(&self, function: &CuratedFunction) -> String {
        format!("rg{}_{}", self.name, function.name)
    }
}

const fn func(name: &'static str, params: &'static [TypeTag], doc: &'static str) -> CuratedFunction {
    CuratedFunction {
        name,
        params,
        variadic: false,
        doc,
    }
}

const fn variadic(
    name: &'static str,
    params: &'static [TypeTag],
    doc: &'static str,
) -> CuratedFunction {
    CuratedFunction {
        name,
        params,
        variadic: true,
        doc,
    }
}

use TypeTag::{Any, Float, Int, String as Str};

/// Every curated module, sorted by name
pub static CURATED_MODULES: &[CuratedModule] = &[
    CuratedModule {
        name: "conv",
        doc: "Parsing and formatting of scalars",
        support: include_str!("modules/conv.go.tmpl"),
        functions: &[
            func("parse_int", &[Str], "Parse a base-10 integer"),
            func("parse_float", &[Str], "Parse a float"),
            func("parse_bool", &[Str], "Parse true/false/1/0"),
            func("itoa", &[Int], "Format an integer"),
            func("format_float", &[Float, Int], "Format a float with fixed digits"),
            func("quote", &[Str], "Quote a string with Go escapes"),
        ],
    },
    CuratedModule {
        name: "http",
        doc: "Blocking HTTP client",
        support: include_str!("modules/http.go.tmpl"),
        functions: &[
            func("get", &[Str], "GET a URL and return the body"),
            func("post", &[Str, Str, Str], "POST a body with a content type"),
        ],
    },
    CuratedModule {
        name: "json",
        doc: "JSON encoding",
        support: include_str!("modules/json.go.tmpl"),
        functions: &[
            func("parse", &[Str], "Decode JSON into arrays and hashes"),
            func("generate", &[Any], "Encode a value as JSON"),
        ],
    },
    CuratedModule {
        name: "os",
        doc: "Process environment and files",
        support: include_str!("modules/os.go.tmpl"),
        functions: &[
            func("getenv", &[Str], "Read an environment variable"),
            func("setenv", &[Str, Str], "Set an environment variable"),
            func("args", &[], "Command-line arguments after the program name"),
            func("read_file", &[Str], "Read a whole file"),
            func("write_file", &[Str, Str], "Write a whole file"),
            func("exists", &[Str], "Whether a path exists"),
            func("remove", &[Str], "Remove a file"),
            func("cwd", &[], "Working directory"),
            func("hostname", &[], "Host name"),
        ],
    },
    CuratedModule {
        name: "str",
        doc: "String helpers",
        support: include_str!("modules/str.go.tmpl"),
        functions: &[
            func("upper", &[Str], "Upper-case a string"),
            func("lower", &[Str], "Lower-case a string"),
            func("trim", &[Str], "Strip surrounding whitespace"),
            func("split", &[Str, Str], "Split on a separator"),
            func("join", &[Any, Str], "Join an array's elements"),
            func("contains", &[Str, Str], "Substring test"),
            func("starts_with", &[Str, Str], "Prefix test"),
            func("ends_with", &[Str, Str], "Suffix test"),
            func("replace", &[Str, Str, Str], "Replace every occurrence"),
            func("repeat", &[Str, Int], "Repeat a string"),
            func("index", &[Str, Str], "Byte offset of a substring, or -1"),
            variadic("format", &[Str], "printf-style formatting"),
        ],
    },
    CuratedModule {
        name: "time",
        doc: "Clock and sleeping",
        support: include_str!("modules/time.go.tmpl"),
        functions: &[
            func("now", &[], "Seconds since the epoch, as a float"),
            func("unix", &[], "Whole seconds since the epoch"),
            func("sleep", &[Float], "Sleep for a number of seconds"),
            func("since", &[Float], "Seconds elapsed since a `now` reading"),
            func("format", &[Float, Str], "Format a timestamp with a Go layout"),
        ],
    },
];

/// Curated module by name
pub fn curated_module(name: &str) -> Option<&'static CuratedModule> {
    CURATED_MODULES.iter().find(|m| m.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_function_has_support_code() {
        for module in CURATED_MODULES {
            for function in module.functions {
                let needle = format!("func {}(", module.dispatch_name(function));
                assert!(
                    module.support.contains(&needle),
                    "{} is missing {}",
                    module.name,
                    needle
                );
            }
        }
    }

    #[test]
    fn test_modules_are_sorted_and_unique() {
        let names: Vec<&str> = CURATED_MODULES.iter().map(|m| m.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_lookup() {
        let str_mod = curated_module("str").unwrap();
        let upper = str_mod.function("upper").unwrap();
        assert_eq!(str_mod.dispatch_name(upper), "rgstr_upper");
        assert_eq!(str_mod.signature(upper).params, vec![TypeTag::String]);
        assert!(curated_module("nope").is_none());
        assert!(str_mod.function("nope").is_none());
    }
}
