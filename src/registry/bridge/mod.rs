//! Foreign-function bridging of Go packages
//!
//! A package's source is scanned for top-level function declarations and
//! every exported function is either bridged, with the conversions its
//! wrapper needs, or rejected with a reason naming what stands in the way.

mod classify;
mod go_decl;
mod naming;

pub use classify::{
    BridgeSignature, GoTypeClassifier, ParamConv, ResultShape, TypeClassifier, ValueConv,
};
pub use go_decl::{scan_package, GoFunc, GoMethod, GoPackage, GoParam, GoStruct, GoType};
pub use naming::to_snake_case;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An exported Go function and how (or whether) it is bridged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeFunction {
    /// Exported Go name
    pub go_name: String,
    /// snake_case name called from Rugo
    pub rugo_name: String,
    pub params: Vec<GoType>,
    pub results: Vec<GoType>,
    pub bridgeable: bool,
    /// Why the function was rejected
    pub reason: Option<String>,
    /// Conversions, when bridgeable
    pub signature: Option<BridgeSignature>,
}

impl BridgeFunction {
    /// Go-style rendering of the declaration
    pub fn go_signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        let results: Vec<String> = self.results.iter().map(|r| r.to_string()).collect();
        let results = match results.len() {
            0 => String::new(),
            1 => format!(" {}", results[0]),
            _ => format!(" ({})", results.join(", ")),
        };
        format!("func {}({}){}", self.go_name, params.join(", "), results)
    }
}

/// Introspection result for one Go package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeModule {
    /// Import path
    pub path: String,
    /// Package name from the package clause
    pub package: String,
    /// Exported functions, sorted by Go name
    pub functions: Vec<BridgeFunction>,
}

impl BridgeModule {
    /// Bridged function by Rugo name
    pub fn function(&self, rugo_name: &str) -> Option<&BridgeFunction> {
        self.functions
            .iter()
            .find(|f| f.bridgeable && f.rugo_name == rugo_name)
    }

    pub fn bridged(&self) -> impl Iterator<Item = &BridgeFunction> {
        self.functions.iter().filter(|f| f.bridgeable)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &BridgeFunction> {
        self.functions.iter().filter(|f| !f.bridgeable)
    }

    /// Fail with every rejection reason unless something is bridgeable
    pub fn ensure_bridgeable(&self) -> Result<()> {
        if self.bridged().next().is_some() {
            return Ok(());
        }
        Err(Error::BridgeError {
            module: self.path.clone(),
            reasons: self
                .rejected()
                .map(|f| format!("{}: {}", f.go_name, f.reason.as_deref().unwrap_or("rejected")))
                .collect(),
        })
    }
}

/// Scan and classify the files of the package at `path`
///
/// Unexported functions are skipped. When two exported names translate to
/// the same Rugo name, the first bridgeable one in sorted order keeps it.
pub fn introspect(
    path: &str,
    files: &[(String, String)],
    classifier: &dyn TypeClassifier,
) -> Result<BridgeModule> {
    let package = scan_package(files).map_err(|reason| Error::BridgeError {
        module: path.to_string(),
        reasons: vec![reason],
    })?;

    let exported: BTreeMap<&str, &GoFunc> = package
        .funcs
        .iter()
        .filter(|f| f.is_exported())
        .map(|f| (f.name.as_str(), f))
        .collect();

    let mut claimed: BTreeMap<String, String> = BTreeMap::new();
    let mut functions = Vec::with_capacity(exported.len());
    for (go_name, func) in exported {
        let rugo_name = to_snake_case(go_name);
        let classified = classifier
            .classify(func, &package)
            .and_then(|sig| match claimed.get(&rugo_name) {
                Some(owner) => Err(format!(
                    "name collides with {} (both map to {})",
                    owner, rugo_name
                )),
                None => Ok(sig),
            });

        let (bridgeable, reason, signature) = match classified {
            Ok(sig) => {
                claimed.insert(rugo_name.clone(), go_name.to_string());
                (true, None, Some(sig))
            }
            Err(reason) => {
                tracing::warn!(
                    module = path,
                    function = go_name,
                    reason = reason.as_str(),
                    "rejected bridge function"
                );
                (false, Some(reason), None)
            }
        };
        functions.push(BridgeFunction {
            go_name: go_name.to_string(),
            rugo_name,
            params: func.params.iter().map(|p| p.ty.clone()).collect(),
            results: func.results.clone(),
            bridgeable,
            reason,
            signature,
        });
    }

    tracing::debug!(
        module = path,
        package = package.name.as_str(),
        functions = functions.len(),
        "introspected bridge package"
    );
    Ok(BridgeModule {
        path: path.to_string(),
        package: package.name,
        functions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(src: &str) -> BridgeModule {
        introspect(
            "example.com/p",
            &[("p.go".to_string(), src.to_string())],
            &GoTypeClassifier,
        )
        .unwrap()
    }

    #[test]
    fn test_unexported_are_skipped() {
        let m = module("package p\nfunc Greet(name string) string { return name }\nfunc helper() {}\n");
        assert_eq!(m.functions.len(), 1);
        assert_eq!(m.function("greet").unwrap().go_name, "Greet");
        assert!(m.ensure_bridgeable().is_ok());
    }

    #[test]
    fn test_collision_first_sorted_wins() {
        let m = module("package p\nfunc HttpGet(u string) string { return u }\nfunc HTTPGet(u string) string { return u }\n");
        assert_eq!(m.function("http_get").unwrap().go_name, "HTTPGet");
        let loser = m.rejected().next().unwrap();
        assert_eq!(loser.go_name, "HttpGet");
        assert_eq!(
            loser.reason.as_deref(),
            Some("name collides with HTTPGet (both map to http_get)")
        );
    }

    #[test]
    fn test_nothing_bridgeable_lists_reasons() {
        let m = module("package p\nfunc Alloc(b *Buf) {}\nfunc Feed(c chan int) {}\n");
        let err = m.ensure_bridgeable().unwrap_err();
        match err {
            Error::BridgeError { module, reasons } => {
                assert_eq!(module, "example.com/p");
                assert_eq!(
                    reasons,
                    vec![
                        "Alloc: parameter 1 has pointer type *Buf".to_string(),
                        "Feed: parameter 1 has channel type chan int".to_string(),
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_go_signature_rendering() {
        let m = module("package p\nfunc Split(s, sep string) ([]string, error) { return nil, nil }\n");
        assert_eq!(
            m.functions[0].go_signature(),
            "func Split(string, string) ([]string, error)"
        );
    }
}
