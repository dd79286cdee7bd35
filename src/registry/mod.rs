//! Module and bridge registry
//!
//! Maps `namespace.function` call sites to a signature, a deterministic Go
//! wrapper name and the dispatch the wrapper performs. Curated modules are
//! registered by `use`; Go packages by `import`, through introspection.
//! A [`RegistryBuilder`] collects registrations for one compile and is
//! finalized into a read-only [`Registry`] before code generation.

pub mod bridge;
mod curated;
mod signature;
mod source;

pub use bridge::{BridgeModule, GoTypeClassifier, TypeClassifier};
pub use curated::{curated_module, CuratedFunction, CuratedModule, CURATED_MODULES};
pub use signature::{ModuleSignature, TypeTag};
pub use source::{load_bridge, BridgeCache, CacheStats, DeclSource, FsDeclSource, MemoryDeclSource};

use crate::error::{Error, Result};
use bridge::BridgeSignature;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What a wrapper calls after coercing its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A function of a curated module's support section
    Curated { function: String },
    /// An exported function of an imported Go package
    Bridged {
        /// Go import name of the package in the generated file
        package_alias: String,
        go_name: String,
        signature: BridgeSignature,
    },
}

/// A callable module function
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub signature: ModuleSignature,
    /// Go function emitted once per used entry
    pub wrapper: String,
    pub dispatch: Dispatch,
}

/// Where a module's functions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Curated,
    Bridge,
}

#[derive(Debug, Clone)]
enum ModuleSource {
    Curated(&'static CuratedModule),
    Bridge {
        module: Arc<BridgeModule>,
        alias: String,
    },
}

/// Read-only description of one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescription {
    /// Rugo name
    pub name: String,
    /// Go name, for bridged packages
    pub go_name: Option<String>,
    /// Human-readable signature
    pub signature: String,
    pub bridged: bool,
    /// Why the function is unavailable
    pub reason: Option<String>,
    pub doc: Option<String>,
}

/// Read-only description of a module, as returned by `describe_module`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescription {
    /// Namespace the module is called through
    pub name: String,
    pub kind: ModuleKind,
    /// Import path, for bridged packages
    pub path: Option<String>,
    pub doc: Option<String>,
    pub functions: Vec<FunctionDescription>,
}

impl ModuleDescription {
    /// Describe a curated module
    pub fn curated(module: &CuratedModule) -> Self {
        ModuleDescription {
            name: module.name.to_string(),
            kind: ModuleKind::Curated,
            path: None,
            doc: Some(module.doc.to_string()),
            functions: module
                .functions
                .iter()
                .map(|f| FunctionDescription {
                    name: f.name.to_string(),
                    go_name: None,
                    signature: module.signature(f).to_string(),
                    bridged: true,
                    reason: None,
                    doc: Some(f.doc.to_string()),
                })
                .collect(),
        }
    }

    /// Describe an introspected package under `namespace`
    pub fn bridge(namespace: &str, module: &BridgeModule) -> Self {
        ModuleDescription {
            name: namespace.to_string(),
            kind: ModuleKind::Bridge,
            path: Some(module.path.clone()),
            doc: None,
            functions: module
                .functions
                .iter()
                .map(|f| FunctionDescription {
                    name: f.rugo_name.clone(),
                    go_name: Some(f.go_name.clone()),
                    signature: f.go_signature(),
                    bridged: f.bridgeable,
                    reason: f.reason.clone(),
                    doc: None,
                })
                .collect(),
        }
    }
}

/// Wrapper name for a curated module function
pub fn curated_wrapper_name(module: &str, function: &str) -> String {
    format!("rugo_mod_{}_{}", module, function)
}

/// Wrapper name for a bridged function
pub fn bridge_wrapper_name(namespace: &str, function: &str) -> String {
    format!("rugo_bridge_{}_{}", namespace, function)
}

/// Collects `use` and `import` registrations for one compile
pub struct RegistryBuilder {
    modules: BTreeMap<String, ModuleSource>,
    classifier: Box<dyn TypeClassifier>,
    cache: Option<Arc<BridgeCache>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Builder with the default Go classifier and no cache
    pub fn new() -> Self {
        RegistryBuilder {
            modules: BTreeMap::new(),
            classifier: Box::new(GoTypeClassifier),
            cache: None,
        }
    }

    /// Replace the type classifier used for imports
    pub fn with_classifier(mut self, classifier: Box<dyn TypeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Memoize introspection through `cache`
    pub fn with_cache(mut self, cache: Arc<BridgeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Whether `namespace` is already registered
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.modules.contains_key(namespace)
    }

    /// Register a curated module; false if no such module exists
    ///
    /// Using a module twice is a no-op.
    pub fn use_module(&mut self, name: &str) -> bool {
        match curated_module(name) {
            Some(module) => {
                self.modules
                    .entry(name.to_string())
                    .or_insert(ModuleSource::Curated(module));
                true
            }
            None => false,
        }
    }

    /// Introspect and register a Go package, returning its namespace
    ///
    /// The namespace is `alias` or the package name. The package must expose
    /// at least one bridgeable function.
    pub fn import_bridge(
        &mut self,
        path: &str,
        alias: Option<&str>,
        source: &dyn DeclSource,
    ) -> Result<String> {
        let module = match &self.cache {
            Some(cache) => cache.load(path, source, self.classifier.as_ref())?,
            None => Arc::new(load_bridge(path, source, self.classifier.as_ref())?),
        };
        module.ensure_bridgeable()?;

        let namespace = alias.unwrap_or(&module.package).to_string();
        let taken = match self.modules.get(&namespace) {
            Some(ModuleSource::Curated(_)) => true,
            Some(ModuleSource::Bridge { module: existing, .. }) => existing.path != path,
            None => false,
        };
        if taken {
            return Err(Error::BridgeError {
                module: path.to_string(),
                reasons: vec![format!("namespace '{}' is already in use", namespace)],
            });
        }
        let bridged = module.bridged().count();
        self.modules.insert(
            namespace.clone(),
            ModuleSource::Bridge {
                alias: format!("rgpkg_{}", namespace),
                module,
            },
        );
        tracing::debug!(module = path, namespace = namespace.as_str(), bridged, "imported");
        Ok(namespace)
    }

    /// Finalize into a read-only registry
    pub fn finish(self) -> Registry {
        let mut entries = BTreeMap::new();
        for (namespace, source) in &self.modules {
            match source {
                ModuleSource::Curated(module) => {
                    for function in module.functions {
                        entries.insert(
                            (namespace.clone(), function.name.to_string()),
                            RegistryEntry {
                                signature: module.signature(function),
                                wrapper: curated_wrapper_name(namespace, function.name),
                                dispatch: Dispatch::Curated {
                                    function: module.dispatch_name(function),
                                },
                            },
                        );
                    }
                }
                ModuleSource::Bridge { module, alias } => {
                    for function in module.bridged() {
                        let Some(sig) = &function.signature else {
                            continue;
                        };
                        entries.insert(
                            (namespace.clone(), function.rugo_name.clone()),
                            RegistryEntry {
                                signature: ModuleSignature {
                                    name: function.rugo_name.clone(),
                                    module: namespace.clone(),
                                    params: sig.params.iter().map(|p| p.tag()).collect(),
                                    variadic: sig.variadic.is_some(),
                                    doc: Some(function.go_signature()),
                                },
                                wrapper: bridge_wrapper_name(namespace, &function.rugo_name),
                                dispatch: Dispatch::Bridged {
                                    package_alias: alias.clone(),
                                    go_name: function.go_name.clone(),
                                    signature: sig.clone(),
                                },
                            },
                        );
                    }
                }
            }
        }
        tracing::debug!(
            modules = self.modules.len(),
            functions = entries.len(),
            "registry finalized"
        );
        Registry {
            modules: self.modules,
            entries,
        }
    }
}

/// Finalized catalog of module functions for one compile
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: BTreeMap<String, ModuleSource>,
    entries: BTreeMap<(String, String), RegistryEntry>,
}

impl Registry {
    /// An empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entry for `namespace.function`
    pub fn lookup(&self, namespace: &str, function: &str) -> Option<&RegistryEntry> {
        self.entries
            .get(&(namespace.to_string(), function.to_string()))
    }

    /// Whether `namespace` names a registered module
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.modules.contains_key(namespace)
    }

    /// Registered namespaces, sorted
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Number of callable functions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Support section of a curated module registered under `namespace`
    pub fn curated_support(&self, namespace: &str) -> Option<&'static str> {
        match self.modules.get(namespace) {
            Some(ModuleSource::Curated(module)) => Some(module.support),
            _ => None,
        }
    }

    /// `(go import name, import path)` of a bridged package
    pub fn bridge_import(&self, namespace: &str) -> Option<(&str, &str)> {
        match self.modules.get(namespace) {
            Some(ModuleSource::Bridge { module, alias }) => Some((alias, &module.path)),
            _ => None,
        }
    }

    /// Describe the module registered under `namespace`
    pub fn describe_module(&self, namespace: &str) -> Option<ModuleDescription> {
        match self.modules.get(namespace)? {
            ModuleSource::Curated(module) => Some(ModuleDescription::curated(module)),
            ModuleSource::Bridge { module, .. } => Some(ModuleDescription::bridge(namespace, module)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREET: &str = "package greet
func Greet(name string) string { return \"hi \" + name }
func Alloc(n int) *Buf { return nil }
";

    #[test]
    fn test_curated_lookup() {
        let mut builder = RegistryBuilder::new();
        assert!(builder.use_module("str"));
        assert!(builder.use_module("str"));
        assert!(!builder.use_module("nosuch"));
        let registry = builder.finish();
        let entry = registry.lookup("str", "upper").unwrap();
        assert_eq!(entry.wrapper, "rugo_mod_str_upper");
        assert_eq!(
            entry.dispatch,
            Dispatch::Curated {
                function: "rgstr_upper".to_string()
            }
        );
        assert!(registry.lookup("str", "nope").is_none());
        assert!(registry.curated_support("str").is_some());
    }

    #[test]
    fn test_bridge_registration() {
        let source = MemoryDeclSource::new().with_file("example.com/greet", "greet.go", GREET);
        let mut builder = RegistryBuilder::new();
        let ns = builder
            .import_bridge("example.com/greet", None, &source)
            .unwrap();
        assert_eq!(ns, "greet");
        let registry = builder.finish();

        let entry = registry.lookup("greet", "greet").unwrap();
        assert_eq!(entry.wrapper, "rugo_bridge_greet_greet");
        assert_eq!(entry.signature.params, vec![TypeTag::String]);
        assert!(registry.lookup("greet", "alloc").is_none());
        assert_eq!(
            registry.bridge_import("greet"),
            Some(("rgpkg_greet", "example.com/greet"))
        );

        let desc = registry.describe_module("greet").unwrap();
        assert_eq!(desc.kind, ModuleKind::Bridge);
        let alloc = desc.functions.iter().find(|f| f.name == "alloc").unwrap();
        assert!(!alloc.bridged);
        assert_eq!(alloc.reason.as_deref(), Some("result has pointer type *Buf"));
    }

    #[test]
    fn test_bridge_alias() {
        let source = MemoryDeclSource::new().with_file("example.com/greet", "greet.go", GREET);
        let mut builder = RegistryBuilder::new();
        let ns = builder
            .import_bridge("example.com/greet", Some("g"), &source)
            .unwrap();
        assert_eq!(ns, "g");
        assert!(builder.finish().lookup("g", "greet").is_some());
    }

    #[test]
    fn test_description_serializes() {
        let mut builder = RegistryBuilder::new();
        builder.use_module("time");
        let desc = builder.finish().describe_module("time").unwrap();
        let json = serde_json::to_string(&desc).unwrap();
        assert!(json.contains("\"kind\":\"curated\""));
        assert!(json.contains("time.sleep(float)"));
    }
}
