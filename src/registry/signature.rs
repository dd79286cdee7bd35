use serde::{Deserialize, Serialize};
use std::fmt;

/// Coercion applied to an argument before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeTag {
    String,
    Int,
    Float,
    Bool,
    /// Passed through as a dynamic value
    Any,
}

impl TypeTag {
    /// Go type the argument has after coercion
    pub fn go_type(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Int => "int64",
            TypeTag::Float => "float64",
            TypeTag::Bool => "bool",
            TypeTag::Any => "any",
        }
    }

    /// Runtime helper converting a dynamic value, if one is needed
    pub fn coercion(&self) -> Option<&'static str> {
        match self {
            TypeTag::String => Some("rgArgString"),
            TypeTag::Int => Some("rgArgInt"),
            TypeTag::Float => Some("rgArgFloat"),
            TypeTag::Bool => Some("rgArgBool"),
            TypeTag::Any => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::String => "string",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Any => "any",
        };
        write!(f, "{}", name)
    }
}

/// Callable shape of a module function
///
/// The minimum argument count is the number of declared parameters;
/// a variadic signature accepts any number of further untyped arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSignature {
    /// Rugo-facing function name
    pub name: String,
    /// Namespace the function is called through
    pub module: String,
    /// Declared parameters, in order
    pub params: Vec<TypeTag>,
    /// Accepts extra arguments after `params`
    pub variadic: bool,
    /// One-line description
    pub doc: Option<String>,
}

impl ModuleSignature {
    /// Arguments every call must supply
    pub fn min_args(&self) -> usize {
        self.params.len()
    }

    /// Whether `count` arguments satisfy this signature
    pub fn accepts(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.min_args()
        } else {
            count == self.min_args()
        }
    }
}

impl fmt::Display for ModuleSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        if self.variadic {
            params.push("...".to_string());
        }
        write!(f, "{}.{}({})", self.module, self.name, params.join(", "))
    }
}
