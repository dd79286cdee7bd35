//! # Rugo Compiler - Rugo to Go Source
//!
//! This module drives one complete compile: it preprocesses and parses the
//! main unit, loads every `require`d unit through a [`SourceResolver`],
//! registers `use`d and `import`ed modules, and hands the ordered units to
//! the code generator.
//!
//! ## Architecture
//!
//! ```text
//! Rugo Source → Preprocess → Parse → Walk → Registry → Go Codegen → Go Source
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use rugoc::compiler::{Compiler, CompileOptions};
//!
//! let compiler = Compiler::new(CompileOptions::default());
//! let output = compiler.compile("main.rg", "puts \"hello\"\n")?;
//! std::fs::write("main.go", &output.source)?;
//! ```

use crate::codegen::{builtin_names, BuildMode, CodeGenerator, CodeUnit, GenOptions, RuntimeInfo};
use crate::error::{Error, Result};
use crate::parser::{Parser, StatementKind, DEFAULT_MAX_DEPTH};
use crate::preprocess::Preprocessor;
use crate::registry::{
    load_bridge, BridgeCache, DeclSource, FsDeclSource, GoTypeClassifier, ModuleDescription,
    RegistryBuilder,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compilation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// What the generated `main` runs
    pub mode: BuildMode,
    /// Directories searched, in order, for `import`ed Go packages
    pub bridge_roots: Vec<PathBuf>,
    /// Emit a `// file:line` comment before each statement
    pub line_comments: bool,
    /// Maximum parse-tree depth before a syntax error
    pub max_nesting: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            mode: BuildMode::Program,
            bridge_roots: Vec::new(),
            line_comments: false,
            max_nesting: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CompileOptions {
    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let options: CompileOptions =
            serde_json::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<()> {
        if self.max_nesting == 0 {
            return Err(Error::ConfigError(
                "max_nesting must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compilation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    /// Complete Go source of package `main`
    pub source: String,
    /// Go import paths, sorted
    pub imports: Vec<String>,
    /// Runtime sections embedded in `source`
    pub runtime: Vec<RuntimeInfo>,
    /// SHA-256 of `source`, lowercase hex
    pub digest: String,
}

/// Supplies the text of `require`d units
pub trait SourceResolver: Send + Sync {
    /// Source text for `path` exactly as written in the `require`
    fn resolve(&self, path: &str) -> anyhow::Result<String>;
}

impl<F> SourceResolver for F
where
    F: Fn(&str) -> anyhow::Result<String> + Send + Sync,
{
    fn resolve(&self, path: &str) -> anyhow::Result<String> {
        self(path)
    }
}

/// Resolves required paths relative to a directory
///
/// A path without an extension gets `.rg` appended.
#[derive(Debug, Clone)]
pub struct DirResolver {
    root: PathBuf,
}

impl DirResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirResolver { root: root.into() }
    }
}

impl SourceResolver for DirResolver {
    fn resolve(&self, path: &str) -> anyhow::Result<String> {
        let mut file = self.root.join(path);
        if file.extension().is_none() {
            file.set_extension("rg");
        }
        std::fs::read_to_string(&file).map_err(|e| anyhow::anyhow!("{}: {}", file.display(), e))
    }
}

/// Rugo to Go compiler
pub struct Compiler {
    options: CompileOptions,
    resolver: Option<Box<dyn SourceResolver>>,
    cache: Option<Arc<BridgeCache>>,
    decls: Option<Arc<dyn DeclSource>>,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            resolver: None,
            cache: None,
            decls: None,
        }
    }

    /// Supply required units through `resolver`
    pub fn with_resolver(mut self, resolver: impl SourceResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Memoize bridge introspection through `cache`
    pub fn with_bridge_cache(mut self, cache: Arc<BridgeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Read imported packages from `source` instead of the bridge roots
    pub fn with_decl_source(mut self, source: Arc<dyn DeclSource>) -> Self {
        self.decls = Some(source);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile one source buffer, and everything it requires, to Go
    pub fn compile(&self, name: &str, source: &str) -> Result<CompileOutput> {
        self.options.validate()?;
        let decls = self.decl_source();
        let mut builder = RegistryBuilder::new();
        if let Some(cache) = &self.cache {
            builder = builder.with_cache(Arc::clone(cache));
        }

        let mut loader = Loader {
            compiler: self,
            parser: Parser::rugo(self.options.max_nesting)?,
            preprocessor: Preprocessor::new().with_callables(builtin_names()),
            decls: decls.as_ref(),
            builder,
            units: Vec::new(),
            loaded: HashMap::new(),
            stack: vec![name.to_string()],
            prefixes: BTreeSet::new(),
            required: BTreeSet::new(),
        };
        loader.load(name, source, None)?;

        let Loader { builder, units, .. } = loader;
        let registry = builder.finish();
        tracing::debug!(
            units = units.len(),
            functions = registry.len(),
            "registry finalized"
        );

        let options = GenOptions {
            mode: self.options.mode,
            line_comments: self.options.line_comments,
        };
        let generated = CodeGenerator::new(&units, &registry, options).generate()?;
        let digest = hex::encode(Sha256::digest(generated.source.as_bytes()));
        tracing::debug!(unit = name, digest = digest.as_str(), "compiled");

        Ok(CompileOutput {
            source: generated.source,
            imports: generated.imports,
            runtime: generated.runtime,
            digest,
        })
    }

    /// Introspect a Go package without compiling anything
    pub fn describe_bridge(&self, path: &str) -> Result<ModuleDescription> {
        let decls = self.decl_source();
        let classifier = GoTypeClassifier;
        let module = match &self.cache {
            Some(cache) => cache.load(path, decls.as_ref(), &classifier)?,
            None => Arc::new(load_bridge(path, decls.as_ref(), &classifier)?),
        };
        Ok(ModuleDescription::bridge(&module.package, &module))
    }

    fn decl_source(&self) -> Arc<dyn DeclSource> {
        match &self.decls {
            Some(source) => Arc::clone(source),
            None => Arc::new(FsDeclSource::new(self.options.bridge_roots.clone())),
        }
    }
}

/// Loads units depth-first so that each unit follows the units it requires
struct Loader<'c> {
    compiler: &'c Compiler,
    parser: Parser<'static>,
    preprocessor: Preprocessor,
    decls: &'c dyn DeclSource,
    builder: RegistryBuilder,
    units: Vec<CodeUnit>,
    /// Required path to unit index
    loaded: HashMap<String, usize>,
    /// Units currently being loaded, outermost first
    stack: Vec<String>,
    prefixes: BTreeSet<String>,
    /// Namespaces bound by `require` in any unit
    required: BTreeSet<String>,
}

impl<'c> Loader<'c> {
    fn load(&mut self, name: &str, source: &str, prefix: Option<String>) -> Result<usize> {
        let pre = self.preprocessor.process(source);
        let program = self.parser.parse(name, &pre.text, &pre.line_map, source)?;

        let mut requires = BTreeMap::new();
        for stmt in &program.statements {
            match &stmt.kind {
                StatementKind::Use { module } => {
                    if self.required.contains(module) {
                        return Err(namespace_in_use(name, stmt.start_line, module));
                    }
                    if !self.builder.use_module(module) {
                        return Err(Error::UnknownModule {
                            source_name: name.to_string(),
                            line: stmt.start_line,
                            module: module.clone(),
                        });
                    }
                }
                StatementKind::Import { path, alias } => {
                    let namespace = self
                        .builder
                        .import_bridge(path, alias.as_deref(), self.decls)?;
                    if self.required.contains(&namespace) {
                        return Err(namespace_in_use(name, stmt.start_line, &namespace));
                    }
                }
                StatementKind::Require { path, alias } => {
                    let namespace = match alias {
                        Some(alias) => alias.clone(),
                        None => unit_stem(path),
                    };
                    if self.builder.has_namespace(&namespace) {
                        return Err(namespace_in_use(name, stmt.start_line, &namespace));
                    }
                    let index = self.require(path)?;
                    if let Some(previous) = requires.insert(namespace.clone(), index) {
                        if previous != index {
                            return Err(namespace_in_use(name, stmt.start_line, &namespace));
                        }
                    }
                    self.required.insert(namespace);
                }
                _ => {}
            }
        }

        self.units.push(CodeUnit {
            program,
            prefix,
            requires,
        });
        Ok(self.units.len() - 1)
    }

    fn require(&mut self, path: &str) -> Result<usize> {
        if let Some(start) = self.stack.iter().position(|p| p == path) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(path.to_string());
            return Err(Error::ResolveError {
                path: path.to_string(),
                message: format!("require cycle: {}", chain.join(" -> ")),
            });
        }
        if let Some(&index) = self.loaded.get(path) {
            return Ok(index);
        }

        let resolver = self
            .compiler
            .resolver
            .as_ref()
            .ok_or_else(|| Error::ResolveError {
                path: path.to_string(),
                message: "no source resolver configured".to_string(),
            })?;
        let text = resolver.resolve(path).map_err(|e| Error::ResolveError {
            path: path.to_string(),
            message: format!("{:#}", e),
        })?;

        let prefix = self.unique_prefix(path);
        tracing::debug!(path, prefix = prefix.as_str(), "requiring unit");
        self.stack.push(path.to_string());
        let index = self.load(path, &text, Some(prefix))?;
        self.stack.pop();
        self.loaded.insert(path.to_string(), index);
        Ok(index)
    }

    /// A Go-safe prefix derived from the file stem, unique within the compile
    fn unique_prefix(&mut self, path: &str) -> String {
        let base = unit_stem(path);
        let mut prefix = base.clone();
        let mut n = 1;
        while !self.prefixes.insert(prefix.clone()) {
            n += 1;
            prefix = format!("{}_{}", base, n);
        }
        prefix
    }
}

fn namespace_in_use(source_name: &str, line: usize, namespace: &str) -> Error {
    Error::compile(
        source_name,
        line,
        format!("namespace '{}' is already in use", namespace),
    )
}

/// File stem of a required path, made into a Rugo identifier
fn unit_stem(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut ident: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if !ident.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        ident.insert(0, '_');
    }
    ident
}
