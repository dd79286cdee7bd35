//! Versioned Go runtime sections
//!
//! Every section starts with a two-line header:
//!
//! ```text
//! // rugo-runtime: core v1
//! // imports: fmt strings
//! ```
//!
//! The header is stripped on emission and the declared imports are merged
//! into the generated file's import block.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref HEADER: Regex =
        Regex::new(r"\A// rugo-runtime: ([a-z_]+) v(\d+)\r?\n// imports:([ a-z0-9/._]*)\r?\n")
            .expect("runtime header pattern");
}

/// Sections shipped with the compiler; curated modules carry their own
pub static TEMPLATES: &[(&str, &str)] = &[
    ("core", include_str!("templates/core.go.tmpl")),
    ("concurrency", include_str!("templates/concurrency.go.tmpl")),
    ("shell", include_str!("templates/shell.go.tmpl")),
    ("testrunner", include_str!("templates/testrunner.go.tmpl")),
    ("benchrunner", include_str!("templates/benchrunner.go.tmpl")),
];

/// Name and version of an embedded section
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub name: String,
    pub version: u32,
}

/// A parsed runtime template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSection {
    pub name: String,
    pub version: u32,
    /// Go import paths the body relies on
    pub imports: Vec<String>,
    /// Go declarations, header removed
    pub body: &'static str,
}

impl RuntimeSection {
    pub fn parse(text: &'static str) -> Result<Self> {
        let caps = HEADER
            .captures(text)
            .ok_or_else(|| Error::internal("<runtime>", 0, "runtime section without a header"))?;
        let name = caps[1].to_string();
        let version = caps[2]
            .parse()
            .map_err(|_| Error::internal("<runtime>", 0, format!("bad version in section {}", name)))?;
        let imports = caps[3].split_whitespace().map(str::to_string).collect();
        let header_len = caps.get(0).map_or(0, |m| m.end());
        Ok(RuntimeSection {
            name,
            version,
            imports,
            body: &text[header_len..],
        })
    }

    pub fn info(&self) -> RuntimeInfo {
        RuntimeInfo {
            name: self.name.clone(),
            version: self.version,
        }
    }
}

/// One of the sections in [`TEMPLATES`]
pub fn section(name: &str) -> Result<RuntimeSection> {
    let text = TEMPLATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| *text)
        .ok_or_else(|| Error::internal("<runtime>", 0, format!("no runtime section '{}'", name)))?;
    RuntimeSection::parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_template_parses_under_its_own_name() {
        for (name, _) in TEMPLATES {
            let section = section(name).unwrap();
            assert_eq!(section.name, *name);
            assert_eq!(section.version, 1);
            assert!(!section.body.starts_with("//"));
        }
    }

    #[test]
    fn test_header_imports() {
        let core = section("core").unwrap();
        assert!(core.imports.contains(&"fmt".to_string()));
        assert!(core.imports.contains(&"unicode/utf8".to_string()));
        assert!(section("nosuch").is_err());
        assert!(RuntimeSection::parse("func x() {}\n").is_err());
    }
}
