//! Deciding which Go signatures convert to and from dynamic values

use super::go_decl::{GoFunc, GoPackage, GoType};
use crate::registry::signature::TypeTag;
use serde::{Deserialize, Serialize};

/// Conversion from a dynamic argument to a Go parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamConv {
    String,
    /// `[]byte` from a string
    Bytes,
    /// Any integer type, named by its Go spelling
    Int(String),
    /// `float32` or `float64`
    Float(String),
    Bool,
    /// `[]string` from an array of strings
    Strings,
}

impl ParamConv {
    /// Coercion tag reported in the module signature
    pub fn tag(&self) -> TypeTag {
        match self {
            ParamConv::String | ParamConv::Bytes => TypeTag::String,
            ParamConv::Int(_) => TypeTag::Int,
            ParamConv::Float(_) => TypeTag::Float,
            ParamConv::Bool => TypeTag::Bool,
            ParamConv::Strings => TypeTag::Any,
        }
    }
}

/// Conversion from a Go result to a dynamic value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueConv {
    String,
    Bytes,
    Int,
    Float,
    Bool,
    Strings,
    /// Single-field struct exposing `String() string`
    Stringer(String),
}

/// What a bridged call returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultShape {
    /// The non-error result, if any
    pub value: Option<ValueConv>,
    /// Whether a trailing `error` is returned
    pub error: bool,
}

/// Conversions for a bridgeable function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSignature {
    pub params: Vec<ParamConv>,
    /// Element conversion of a trailing `...T` parameter
    pub variadic: Option<ParamConv>,
    pub result: ResultShape,
}

/// Decides how Go types cross into Rugo
///
/// Rejections are reason fragments such as `has pointer type *Buf`; the
/// caller prefixes the parameter or result they describe.
pub trait TypeClassifier: Send + Sync {
    /// Name used to key cached introspection results
    fn name(&self) -> &str;

    /// Classify one parameter type
    fn param(&self, ty: &GoType, package: &GoPackage) -> Result<ParamConv, String>;

    /// Classify the non-error result type
    fn result(&self, ty: &GoType, package: &GoPackage) -> Result<ValueConv, String>;

    /// Classify a whole function, or give the reason it cannot be bridged
    fn classify(&self, func: &GoFunc, package: &GoPackage) -> Result<BridgeSignature, String> {
        if let Some(reason) = &func.malformed {
            return Err(format!("unreadable signature: {}", reason));
        }
        if func.generic {
            return Err("generic function (has type parameters)".to_string());
        }

        let mut params = Vec::new();
        let mut variadic = None;
        for (i, param) in func.params.iter().enumerate() {
            match &param.ty {
                GoType::Variadic(inner) if i + 1 == func.params.len() => {
                    variadic = Some(
                        self.param(inner, package)
                            .map_err(|r| format!("variadic parameter {}", r))?,
                    );
                }
                ty => params.push(
                    self.param(ty, package)
                        .map_err(|r| format!("parameter {} {}", i + 1, r))?,
                ),
            }
        }

        let mut results: &[GoType] = &func.results;
        let error = results.last().is_some_and(is_error);
        if error {
            results = &results[..results.len() - 1];
        }
        if results.iter().any(is_error) {
            return Err("return shape: error is not the last result".to_string());
        }
        let value = match results {
            [] => None,
            [single] => Some(
                self.result(single, package)
                    .map_err(|r| format!("result {}", r))?,
            ),
            _ => return Err("return shape: more than one non-error result".to_string()),
        };

        Ok(BridgeSignature {
            params,
            variadic,
            result: ResultShape { value, error },
        })
    }
}

fn is_error(ty: &GoType) -> bool {
    ty.local_name() == Some("error")
}

const INT_TYPES: &[&str] = &[
    "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "byte", "rune",
];

/// The classifier used unless another is plugged in
#[derive(Debug, Clone, Copy, Default)]
pub struct GoTypeClassifier;

impl GoTypeClassifier {
    fn basic(name: &str) -> Option<ParamConv> {
        match name {
            "string" => Some(ParamConv::String),
            "bool" => Some(ParamConv::Bool),
            "float32" | "float64" => Some(ParamConv::Float(name.to_string())),
            n if INT_TYPES.contains(&n) => Some(ParamConv::Int(n.to_string())),
            _ => None,
        }
    }

    /// Reason a type that is not a supported scalar or slice is rejected
    fn unsupported(ty: &GoType) -> String {
        match ty {
            GoType::Pointer(_) => format!("has pointer type {}", ty),
            GoType::Chan(_) => format!("has channel type {}", ty),
            GoType::Map(..) => format!("has map type {}", ty),
            GoType::Func => format!("has function type {}", ty),
            GoType::Struct => format!("has struct type {}", ty),
            GoType::Interface { empty: true } => format!("has bare interface type {}", ty),
            GoType::Interface { empty: false } => format!("has interface type {}", ty),
            GoType::Slice(_) | GoType::Array(..) => format!("has unsupported sequence type {}", ty),
            GoType::Variadic(_) => format!("has misplaced variadic type {}", ty),
            GoType::Named { name, args, .. } if !args.is_empty() => {
                format!("has generic type {} ({} instantiated)", ty, name)
            }
            GoType::Named { package: Some(_), .. } => format!("has foreign named type {}", ty),
            GoType::Named { name, .. } if name == "any" => format!("has bare interface type {}", ty),
            GoType::Named { name, .. } if name == "error" => format!("has interface type {}", ty),
            GoType::Named { .. } => format!("has named type {}", ty),
        }
    }

    /// Whether `name` is a local single-field struct with a value `String() string`
    fn is_stringer(name: &str, package: &GoPackage) -> bool {
        let single_field = package.struct_named(name).is_some_and(|s| s.fields == 1);
        let accessor = package.method(name, "String").is_some_and(|m| {
            !m.pointer_receiver && m.params.is_empty() && m.results == [GoType::named("string")]
        });
        single_field && accessor
    }
}

impl TypeClassifier for GoTypeClassifier {
    fn name(&self) -> &str {
        "go"
    }

    fn param(&self, ty: &GoType, _package: &GoPackage) -> Result<ParamConv, String> {
        if let Some(conv) = ty.local_name().and_then(Self::basic) {
            return Ok(conv);
        }
        if let GoType::Slice(inner) = ty {
            match inner.local_name() {
                Some("string") => return Ok(ParamConv::Strings),
                Some("byte") | Some("uint8") => return Ok(ParamConv::Bytes),
                _ => {}
            }
        }
        Err(Self::unsupported(ty))
    }

    fn result(&self, ty: &GoType, package: &GoPackage) -> Result<ValueConv, String> {
        if let Some(conv) = ty.local_name().and_then(Self::basic) {
            return Ok(match conv {
                ParamConv::String => ValueConv::String,
                ParamConv::Bool => ValueConv::Bool,
                ParamConv::Float(_) => ValueConv::Float,
                _ => ValueConv::Int,
            });
        }
        if let GoType::Slice(inner) = ty {
            match inner.local_name() {
                Some("string") => return Ok(ValueConv::Strings),
                Some("byte") | Some("uint8") => return Ok(ValueConv::Bytes),
                _ => {}
            }
        }
        if let Some(name) = ty.local_name() {
            if Self::is_stringer(name, package) {
                return Ok(ValueConv::Stringer(name.to_string()));
            }
        }
        Err(Self::unsupported(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::bridge::go_decl::scan_package;

    fn classify(src: &str) -> Vec<Result<BridgeSignature, String>> {
        let pkg = scan_package(&[("p.go".to_string(), src.to_string())]).unwrap();
        pkg.funcs
            .iter()
            .map(|f| GoTypeClassifier.classify(f, &pkg))
            .collect()
    }

    #[test]
    fn test_scalars_and_error_result() {
        let out = classify("package p\nfunc Parse(s string, base int32) (uint64, error) { return 0, nil }\n");
        let sig = out[0].as_ref().unwrap();
        assert_eq!(
            sig.params,
            vec![ParamConv::String, ParamConv::Int("int32".to_string())]
        );
        assert_eq!(
            sig.result,
            ResultShape {
                value: Some(ValueConv::Int),
                error: true
            }
        );
    }

    #[test]
    fn test_rejection_reasons_name_the_category() {
        let out = classify(
            "package p
func A(b *Buf) {}
func B(c chan int) {}
func C(v interface{}) {}
func D(m map[string]int) {}
func E(f func()) {}
func F(v other.Thing) {}
func G[T any](v T) {}
func H() (int, string) { return 0, \"\" }
func I(v any) {}
",
        );
        let reasons: Vec<String> = out.into_iter().map(|r| r.unwrap_err()).collect();
        assert_eq!(reasons[0], "parameter 1 has pointer type *Buf");
        assert_eq!(reasons[1], "parameter 1 has channel type chan int");
        assert_eq!(reasons[2], "parameter 1 has bare interface type interface{}");
        assert_eq!(reasons[3], "parameter 1 has map type map[string]int");
        assert_eq!(reasons[4], "parameter 1 has function type func(...)");
        assert_eq!(reasons[5], "parameter 1 has foreign named type other.Thing");
        assert!(reasons[6].starts_with("generic function"));
        assert_eq!(reasons[7], "return shape: more than one non-error result");
        assert_eq!(reasons[8], "parameter 1 has bare interface type any");
    }

    #[test]
    fn test_stringer_escape_hatch() {
        let out = classify(
            "package p
type Name struct { v string }
func (n Name) String() string { return n.v }
type Big struct { a, b string }
func (b Big) String() string { return b.a }
func MakeName() Name { return Name{} }
func MakeBig() Big { return Big{} }
",
        );
        assert_eq!(
            out[0].as_ref().unwrap().result.value,
            Some(ValueConv::Stringer("Name".to_string()))
        );
        assert_eq!(out[1].as_ref().unwrap_err(), "result has named type Big");
    }

    #[test]
    fn test_variadic_and_slices() {
        let out = classify("package p\nfunc Join(sep string, parts ...string) []string { return parts }\n");
        let sig = out[0].as_ref().unwrap();
        assert_eq!(sig.params, vec![ParamConv::String]);
        assert_eq!(sig.variadic, Some(ParamConv::String));
        assert_eq!(sig.result.value, Some(ValueConv::Strings));
        assert!(!sig.result.error);
    }
}
