//! Go wrappers for module functions
//!
//! Every wrapper has the shape `func W(args ...any) (any, error)`: it checks
//! the argument count, coerces each argument to the declared Go type and
//! performs a single dispatch.

use super::context::{go_string, Emitter};
use crate::registry::bridge::{BridgeSignature, ParamConv, ValueConv};
use crate::registry::{Dispatch, ModuleSignature, RegistryEntry};

pub(crate) fn emit_wrapper(out: &mut Emitter, entry: &RegistryEntry) {
    let sig = &entry.signature;
    let label = go_string(&format!("{}.{}", sig.module, sig.name));

    out.writeln(&format!("func {}(args ...any) (any, error) {{", entry.wrapper));
    out.indent();
    arity_check(out, sig, &label);
    match &entry.dispatch {
        Dispatch::Curated { function } => curated_body(out, sig, &label, function),
        Dispatch::Bridged {
            package_alias,
            go_name,
            signature,
        } => bridged_body(out, signature, &label, &format!("{}.{}", package_alias, go_name)),
    }
    out.dedent();
    out.writeln("}");
}

fn arity_check(out: &mut Emitter, sig: &ModuleSignature, label: &str) {
    let min = sig.min_args();
    let (test, expected) = match (sig.variadic, min) {
        (true, 0) => return,
        (true, n) => (format!("len(args) < {}", n), format!("at least {}", n)),
        (false, n) => (format!("len(args) != {}", n), n.to_string()),
    };
    out.writeln(&format!("if {} {{", test));
    out.indent();
    out.writeln(&format!(
        "return nil, rgFail(\"%s: expected {} argument(s), got %d\", {}, len(args))",
        expected, label
    ));
    out.dedent();
    out.writeln("}");
}

/// `name, err := coerce(label, position, value)` with the early return
fn coerce(out: &mut Emitter, name: &str, coercer: &str, label: &str, position: &str, value: &str) {
    out.writeln(&format!(
        "{}, err := {}({}, {}, {})",
        name, coercer, label, position, value
    ));
    out.propagate("err");
}

fn curated_body(out: &mut Emitter, sig: &ModuleSignature, label: &str, function: &str) {
    let mut call_args = Vec::with_capacity(sig.params.len() + 1);
    for (i, tag) in sig.params.iter().enumerate() {
        let name = format!("a{}", i);
        match tag.coercion() {
            Some(coercer) => coerce(out, &name, coercer, label, &(i + 1).to_string(), &format!("args[{}]", i)),
            None => out.writeln(&format!("{} := args[{}]", name, i)),
        }
        call_args.push(name);
    }
    if sig.variadic {
        call_args.push(format!("args[{}:]...", sig.params.len()));
    }
    out.writeln(&format!("return {}({})", function, call_args.join(", ")));
}

fn coercer(conv: &ParamConv) -> &'static str {
    match conv {
        ParamConv::String | ParamConv::Bytes => "rgArgString",
        ParamConv::Int(_) => "rgArgInt",
        ParamConv::Float(_) => "rgArgFloat",
        ParamConv::Bool => "rgArgBool",
        ParamConv::Strings => "rgArgStrings",
    }
}

/// Fail when an int argument does not fit a narrower Go parameter type
fn range_check(out: &mut Emitter, conv: &ParamConv, label: &str, position: &str, value: &str) {
    let ParamConv::Int(ty) = conv else {
        return;
    };
    if ty == "int64" || ty == "int" {
        return;
    }
    out.writeln(&format!(
        "if err := rgArgFits({}, {}, {}, {}); err != nil {{",
        label,
        position,
        value,
        go_string(ty)
    ));
    out.indent();
    out.writeln("return nil, err");
    out.dedent();
    out.writeln("}");
}

/// Go parameter type of a conversion
fn param_type(conv: &ParamConv) -> &str {
    match conv {
        ParamConv::String => "string",
        ParamConv::Bytes => "[]byte",
        ParamConv::Int(ty) | ParamConv::Float(ty) => ty,
        ParamConv::Bool => "bool",
        ParamConv::Strings => "[]string",
    }
}

/// Convert a coerced value to the exact Go parameter type
fn convert_param(conv: &ParamConv, value: &str) -> String {
    match conv {
        ParamConv::Bytes => format!("[]byte({})", value),
        ParamConv::Int(ty) if ty != "int64" => format!("{}({})", ty, value),
        ParamConv::Float(ty) if ty != "float64" => format!("{}({})", ty, value),
        _ => value.to_string(),
    }
}

fn convert_result(conv: &ValueConv, value: &str) -> String {
    match conv {
        ValueConv::String | ValueConv::Bool => value.to_string(),
        ValueConv::Bytes => format!("string({})", value),
        ValueConv::Int => format!("int64({})", value),
        ValueConv::Float => format!("float64({})", value),
        ValueConv::Strings => format!("rgArrayFromStrings({})", value),
        ValueConv::Stringer(_) => format!("{}.String()", value),
    }
}

fn bridged_body(out: &mut Emitter, sig: &BridgeSignature, label: &str, target: &str) {
    let mut call_args = Vec::with_capacity(sig.params.len() + 1);
    for (i, conv) in sig.params.iter().enumerate() {
        let name = format!("a{}", i);
        let position = (i + 1).to_string();
        coerce(out, &name, coercer(conv), label, &position, &format!("args[{}]", i));
        range_check(out, conv, label, &position, &name);
        call_args.push(convert_param(conv, &name));
    }

    if let Some(conv) = &sig.variadic {
        let fixed = sig.params.len();
        out.writeln(&format!(
            "rest := make([]{}, 0, len(args))",
            param_type(conv)
        ));
        out.writeln(&format!("for i, v := range args[{}:] {{", fixed));
        out.indent();
        let position = format!("{}+i+1", fixed);
        coerce(out, "x", coercer(conv), label, &position, "v");
        range_check(out, conv, label, &position, "x");
        out.writeln(&format!("rest = append(rest, {})", convert_param(conv, "x")));
        out.dedent();
        out.writeln("}");
        call_args.push("rest...".to_string());
    }

    let call = format!("{}({})", target, call_args.join(", "));
    let fail = format!("return nil, rgWrapError({}, err)", label);
    match (&sig.result.value, sig.result.error) {
        (None, false) => {
            out.writeln(&call);
            out.writeln("return nil, nil");
        }
        (None, true) => {
            out.writeln(&format!("if err := {}; err != nil {{", call));
            out.indent();
            out.writeln(&fail);
            out.dedent();
            out.writeln("}");
            out.writeln("return nil, nil");
        }
        (Some(conv), false) => {
            out.writeln(&format!("r := {}", call));
            out.writeln(&format!("return {}, nil", convert_result(conv, "r")));
        }
        (Some(conv), true) => {
            out.writeln(&format!("r, err := {}", call));
            out.writeln("if err != nil {");
            out.indent();
            out.writeln(&fail);
            out.dedent();
            out.writeln("}");
            out.writeln(&format!("return {}, nil", convert_result(conv, "r")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::bridge::ResultShape;
    use crate::registry::TypeTag;

    fn signature(params: Vec<TypeTag>, variadic: bool) -> ModuleSignature {
        ModuleSignature {
            name: "fn".to_string(),
            module: "m".to_string(),
            params,
            variadic,
            doc: None,
        }
    }

    fn render(entry: &RegistryEntry) -> String {
        let mut out = Emitter::new();
        emit_wrapper(&mut out, entry);
        out.take_output()
    }

    #[test]
    fn test_curated_wrapper() {
        let entry = RegistryEntry {
            signature: signature(vec![TypeTag::String, TypeTag::Any], false),
            wrapper: "rugo_mod_m_fn".to_string(),
            dispatch: Dispatch::Curated {
                function: "rgm_fn".to_string(),
            },
        };
        let text = render(&entry);
        assert!(text.starts_with("func rugo_mod_m_fn(args ...any) (any, error) {\n"));
        assert!(text.contains("if len(args) != 2 {"));
        assert!(text.contains("a0, err := rgArgString(\"m.fn\", 1, args[0])"));
        assert!(text.contains("a1 := args[1]"));
        assert!(text.contains("return rgm_fn(a0, a1)"));
    }

    #[test]
    fn test_variadic_without_minimum_skips_count_check() {
        let entry = RegistryEntry {
            signature: signature(vec![], true),
            wrapper: "rugo_mod_m_fn".to_string(),
            dispatch: Dispatch::Curated {
                function: "rgm_fn".to_string(),
            },
        };
        let text = render(&entry);
        assert!(!text.contains("len(args)"));
        assert!(text.contains("return rgm_fn(args[0:]...)"));
    }

    #[test]
    fn test_bridged_wrapper_converts_and_wraps_errors() {
        let entry = RegistryEntry {
            signature: signature(vec![TypeTag::Int], true),
            wrapper: "rugo_bridge_m_fn".to_string(),
            dispatch: Dispatch::Bridged {
                package_alias: "rgpkg_m".to_string(),
                go_name: "Fn".to_string(),
                signature: BridgeSignature {
                    params: vec![ParamConv::Int("int32".to_string())],
                    variadic: Some(ParamConv::Bytes),
                    result: ResultShape {
                        value: Some(ValueConv::Strings),
                        error: true,
                    },
                },
            },
        };
        let text = render(&entry);
        assert!(text.contains("if len(args) < 1 {"));
        assert!(text.contains("a0, err := rgArgInt(\"m.fn\", 1, args[0])"));
        assert!(text.contains("if err := rgArgFits(\"m.fn\", 1, a0, \"int32\"); err != nil {"));
        assert!(text.contains("rest := make([][]byte, 0, len(args))"));
        assert!(text.contains("x, err := rgArgString(\"m.fn\", 1+i+1, v)"));
        assert!(text.contains("r, err := rgpkg_m.Fn(int32(a0), rest...)"));
        assert!(text.contains("return nil, rgWrapError(\"m.fn\", err)"));
        assert!(text.contains("return rgArrayFromStrings(r), nil"));
    }

    #[test]
    fn test_narrow_ints_are_range_checked() {
        let entry = |params: Vec<ParamConv>, variadic: Option<ParamConv>| RegistryEntry {
            signature: signature(vec![TypeTag::Int; params.len()], variadic.is_some()),
            wrapper: "rugo_bridge_m_fn".to_string(),
            dispatch: Dispatch::Bridged {
                package_alias: "rgpkg_m".to_string(),
                go_name: "Fn".to_string(),
                signature: BridgeSignature {
                    params,
                    variadic,
                    result: ResultShape {
                        value: None,
                        error: false,
                    },
                },
            },
        };

        let text = render(&entry(
            vec![ParamConv::Int("int64".to_string()), ParamConv::Int("uint64".to_string())],
            Some(ParamConv::Int("uint8".to_string())),
        ));
        assert!(!text.contains("rgArgFits(\"m.fn\", 1,"));
        assert!(text.contains("if err := rgArgFits(\"m.fn\", 2, a1, \"uint64\"); err != nil {"));
        assert!(text.contains("if err := rgArgFits(\"m.fn\", 2+i+1, x, \"uint8\"); err != nil {"));
        assert!(text.contains("rgpkg_m.Fn(a0, uint64(a1), rest...)"));

        let text = render(&entry(vec![ParamConv::Int("int".to_string())], None));
        assert!(!text.contains("rgArgFits"));
    }

    #[test]
    fn test_range_check_exists_in_core_runtime() {
        let core = include_str!("templates/core.go.tmpl");
        assert!(core.contains("func rgArgFits(fn string, pos int, v int64, kind string) error {"));
        assert!(core.contains("out of range for %s"));
    }
}
