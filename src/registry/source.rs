//! Where bridged Go declarations come from, and their memoization

use super::bridge::{introspect, BridgeModule, TypeClassifier};
use crate::error::{Error, Result};
use anyhow::{bail, Context};
use dashmap::DashMap;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Supplies the Go files of a package by import path
pub trait DeclSource: Send + Sync {
    /// `(file name, text)` pairs sorted by file name; `_test.go` files may be
    /// included and are ignored by the scanner
    fn package_files(&self, import_path: &str) -> anyhow::Result<Vec<(String, String)>>;
}

/// Reads packages from directories under a list of roots; first root wins
#[derive(Debug, Clone, Default)]
pub struct FsDeclSource {
    roots: Vec<PathBuf>,
}

impl FsDeclSource {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        FsDeclSource { roots }
    }
}

impl DeclSource for FsDeclSource {
    fn package_files(&self, import_path: &str) -> anyhow::Result<Vec<(String, String)>> {
        if import_path.is_empty() || import_path.split('/').any(|seg| seg == ".." || seg.is_empty()) {
            bail!("invalid import path");
        }
        if self.roots.is_empty() {
            bail!("no bridge roots configured");
        }

        for root in &self.roots {
            let dir = root.join(import_path);
            if !dir.is_dir() {
                continue;
            }
            let mut files = Vec::new();
            let entries =
                std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))?;
            for entry in entries {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.ends_with(".go") || name.ends_with("_test.go") {
                    continue;
                }
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let text = std::fs::read_to_string(entry.path())
                    .with_context(|| format!("reading {}", entry.path().display()))?;
                files.push((name, text));
            }
            if files.is_empty() {
                bail!("no Go files in {}", dir.display());
            }
            files.sort();
            return Ok(files);
        }
        bail!("package not found under any bridge root")
    }
}

/// Packages held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDeclSource {
    packages: BTreeMap<String, BTreeMap<String, String>>,
}

impl MemoryDeclSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file to the package at `import_path`
    pub fn with_file(
        mut self,
        import_path: impl Into<String>,
        file: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.add_file(import_path, file, text);
        self
    }

    pub fn add_file(
        &mut self,
        import_path: impl Into<String>,
        file: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.packages
            .entry(import_path.into())
            .or_default()
            .insert(file.into(), text.into());
    }
}

impl DeclSource for MemoryDeclSource {
    fn package_files(&self, import_path: &str) -> anyhow::Result<Vec<(String, String)>> {
        match self.packages.get(import_path) {
            Some(files) => Ok(files
                .iter()
                .map(|(name, text)| (name.clone(), text.clone()))
                .collect()),
            None => bail!("package not found"),
        }
    }
}

/// Read and introspect a package without caching
pub fn load_bridge(
    path: &str,
    source: &dyn DeclSource,
    classifier: &dyn TypeClassifier,
) -> Result<BridgeModule> {
    let files = read_package(path, source)?;
    introspect(path, &files, classifier)
}

fn read_package(path: &str, source: &dyn DeclSource) -> Result<Vec<(String, String)>> {
    source.package_files(path).map_err(|e| Error::BridgeError {
        module: path.to_string(),
        reasons: vec![format!("{:#}", e)],
    })
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

lazy_static! {
    static ref GLOBAL_CACHE: Arc<BridgeCache> = Arc::new(BridgeCache::new());
}

/// Memoized introspection results, keyed by classifier, path and file digest
///
/// Safe to share between concurrent compiles. Files are always re-read, so a
/// changed package is introspected again.
#[derive(Debug, Default)]
pub struct BridgeCache {
    entries: DashMap<String, Arc<BridgeModule>>,
    stats: Mutex<CacheStats>,
}

impl BridgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> Arc<BridgeCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    /// Cached introspection of the package at `path`
    pub fn load(
        &self,
        path: &str,
        source: &dyn DeclSource,
        classifier: &dyn TypeClassifier,
    ) -> Result<Arc<BridgeModule>> {
        let files = read_package(path, source)?;
        let key = cache_key(classifier.name(), path, &files);

        if let Some(module) = self.entries.get(&key) {
            self.stats.lock().hits += 1;
            tracing::debug!(module = path, "bridge cache hit");
            return Ok(Arc::clone(module.value()));
        }

        let module = Arc::new(introspect(path, &files, classifier)?);
        self.stats.lock().misses += 1;
        self.entries.insert(key, Arc::clone(&module));
        Ok(module)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        *self.stats.lock() = CacheStats::default();
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }
}

fn cache_key(classifier: &str, path: &str, files: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();
    for (name, text) in files {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{}:{}:{}", classifier, path, hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::bridge::GoTypeClassifier;

    #[test]
    fn test_memory_source() {
        let source = MemoryDeclSource::new()
            .with_file("ex/a", "b.go", "package a")
            .with_file("ex/a", "a.go", "package a");
        let files = source.package_files("ex/a").unwrap();
        assert_eq!(files[0].0, "a.go");
        assert!(source.package_files("ex/missing").is_err());
    }

    #[test]
    fn test_fs_source_rejects_escaping_paths() {
        let source = FsDeclSource::new(vec![PathBuf::from(".")]);
        assert!(source.package_files("../etc").is_err());
        assert!(FsDeclSource::default().package_files("x").is_err());
    }

    #[test]
    fn test_cache_hits_on_unchanged_files() {
        let cache = BridgeCache::new();
        let mut source = MemoryDeclSource::new().with_file(
            "ex/greet",
            "greet.go",
            "package greet\nfunc Greet(n string) string { return n }\n",
        );
        let first = cache.load("ex/greet", &source, &GoTypeClassifier).unwrap();
        let second = cache.load("ex/greet", &source, &GoTypeClassifier).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });

        source.add_file("ex/greet", "more.go", "package greet\nfunc Wave() {}\n");
        let third = cache.load("ex/greet", &source, &GoTypeClassifier).unwrap();
        assert_eq!(third.functions.len(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_missing_package_is_bridge_error() {
        let err = load_bridge("ex/none", &MemoryDeclSource::new(), &GoTypeClassifier).unwrap_err();
        assert!(matches!(err, Error::BridgeError { .. }));
        assert!(err.to_string().contains("package not found"));
    }
}
