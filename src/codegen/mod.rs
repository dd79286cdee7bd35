//! Go code generation
//!
//! Lowers the AST of one or more compile units into a single Go `main`
//! package. Every Rugo value is a Go `any`; every function and closure
//! returns `(any, error)`, and each fallible operation is assigned to a
//! fresh temporary followed by an `if err != nil` return, so failures flow
//! as values rather than panics.
//!
//! The emitted file is laid out as: header, import block, runtime sections,
//! user functions, module wrappers and finally `main`.

mod builtins;
mod calls;
mod concurrency;
mod context;
mod expr;
mod features;
mod runtime;
mod stmt;
mod wrappers;

pub use builtins::{builtin, builtin_names, Builtin, BUILTINS};
pub use features::Features;
pub use runtime::{section, RuntimeInfo, RuntimeSection, TEMPLATES};

use crate::error::{Error, Result};
use crate::parser::{Program, Statement, StatementKind};
use crate::registry::{Dispatch, Registry, RegistryEntry};
use context::{function_name, go_string, Emitter, Scopes};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use stmt::{assigned_names, Sink};

/// What the generated `main` runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Top-level statements
    #[default]
    Program,
    /// Every `test` block, after the top-level statements
    Test,
    /// Every `bench` block, after the top-level statements
    Bench,
}

/// Generation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenOptions {
    pub mode: BuildMode,
    /// Precede each statement with a `// file:line` comment
    pub line_comments: bool,
}

/// A parsed compile unit and how it is linked to the others
#[derive(Debug, Clone)]
pub struct CodeUnit {
    pub program: Program,
    /// Prefix mangled into function names; `None` for the main unit
    pub prefix: Option<String>,
    /// Namespaces of `require`d units, by index into the unit list
    pub requires: BTreeMap<String, usize>,
}

impl CodeUnit {
    /// A unit that requires nothing and is not prefixed
    pub fn main(program: Program) -> Self {
        CodeUnit {
            program,
            prefix: None,
            requires: BTreeMap::new(),
        }
    }
}

/// Generated Go source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    pub source: String,
    /// Go import paths, sorted
    pub imports: Vec<String>,
    /// Embedded runtime sections, in emission order
    pub runtime: Vec<RuntimeInfo>,
}

/// Generates one Go file from compile units
///
/// Units must be ordered so that every unit comes after the units it
/// requires; the last unit is the main one.
pub struct CodeGenerator<'a> {
    units: &'a [CodeUnit],
    registry: &'a Registry,
    options: GenOptions,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(units: &'a [CodeUnit], registry: &'a Registry, options: GenOptions) -> Self {
        CodeGenerator {
            units,
            registry,
            options,
        }
    }

    pub fn generate(&self) -> Result<GeneratedProgram> {
        let mut gen = Gen::new(self.units, self.registry, &self.options)?;
        let body = gen.user_code()?;
        let program = gen.assemble(body)?;
        tracing::debug!(
            bytes = program.source.len(),
            imports = program.imports.len(),
            sections = program.runtime.len(),
            "generated Go source"
        );
        Ok(program)
    }
}

/// Mutable state of one generation
pub(crate) struct Gen<'a> {
    units: &'a [CodeUnit],
    registry: &'a Registry,
    options: &'a GenOptions,
    /// Per unit: top-level function name to arity
    defs: Vec<BTreeMap<String, usize>>,
    /// Per unit: top-level function name to its `def` line
    def_lines: Vec<BTreeMap<String, usize>>,
    /// Inside a `def`, `test` or `bench` body, where every `def` is callable
    in_function: bool,
    out: Emitter,
    scopes: Scopes,
    temps: usize,
    loop_depth: usize,
    unit: usize,
    line: usize,
    /// Used module functions, by wrapper name
    wrappers: BTreeMap<String, &'a RegistryEntry>,
}

impl<'a> Gen<'a> {
    fn new(units: &'a [CodeUnit], registry: &'a Registry, options: &'a GenOptions) -> Result<Self> {
        if units.is_empty() {
            return Err(Error::internal("<none>", 0, "no compile units to generate"));
        }
        let mut defs = Vec::with_capacity(units.len());
        let mut def_lines = Vec::with_capacity(units.len());
        for unit in units {
            let mut table = BTreeMap::new();
            let mut lines = BTreeMap::new();
            for stmt in &unit.program.statements {
                if let StatementKind::FunctionDef { name, params, .. } = &stmt.kind {
                    lines.insert(name.clone(), stmt.start_line);
                    if table.insert(name.clone(), params.len()).is_some() {
                        return Err(Error::compile(
                            &unit.program.name,
                            stmt.start_line,
                            format!("function '{}' is already defined", name),
                        ));
                    }
                }
            }
            defs.push(table);
            def_lines.push(lines);
        }

        Ok(Gen {
            units,
            registry,
            options,
            defs,
            def_lines,
            in_function: false,
            out: Emitter::new(),
            scopes: Scopes::default(),
            temps: 0,
            loop_depth: 0,
            unit: 0,
            line: 0,
            wrappers: BTreeMap::new(),
        })
    }

    fn source_name(&self) -> &'a str {
        let units = self.units;
        &units[self.unit].program.name
    }

    fn prefix(&self, unit: usize) -> Option<&'a str> {
        let units = self.units;
        units[unit].prefix.as_deref()
    }

    pub(crate) fn compile_error(&self, msg: impl Into<String>) -> Error {
        Error::compile(self.source_name(), self.line, msg)
    }

    pub(crate) fn internal_error(&self, msg: impl Into<String>) -> Error {
        Error::internal(self.source_name(), self.line, msg)
    }

    /// Whether `name` is a `def` of the current unit callable here
    ///
    /// Top-level code sees a `def` only after its line; function bodies
    /// see every `def` of the unit.
    pub(crate) fn callable_def(&self, name: &str) -> bool {
        match self.def_lines[self.unit].get(name) {
            Some(&line) => self.in_function || line < self.line,
            None => false,
        }
    }

    pub(crate) fn temp(&mut self) -> String {
        self.temps += 1;
        format!("_t{}", self.temps)
    }

    fn main_unit(&self) -> usize {
        self.units.len() - 1
    }

    /// Functions, entry points and tests of every unit
    fn user_code(&mut self) -> Result<String> {
        let units = self.units;
        let mut inits = Vec::new();

        for (index, unit) in units.iter().enumerate() {
            self.unit = index;
            let mut top_level = Vec::new();
            for stmt in &unit.program.statements {
                match &stmt.kind {
                    StatementKind::FunctionDef { name, params, body } => {
                        self.line = stmt.start_line;
                        self.function_def(name, params, body)?;
                    }
                    StatementKind::TestDef { .. }
                    | StatementKind::BenchDef { .. }
                    | StatementKind::Use { .. }
                    | StatementKind::Import { .. }
                    | StatementKind::Require { .. } => {}
                    _ => top_level.push(stmt),
                }
            }

            if index == self.main_unit() {
                self.entry_function("rugoMain", &top_level, &inits)?;
            } else {
                let init = format!("rugoinit_{}", self.prefix(index).unwrap_or("unit"));
                self.entry_function(&init, &top_level, &[])?;
                inits.push(init);
            }
        }

        self.unit = self.main_unit();
        let cases = match self.options.mode {
            BuildMode::Program => Vec::new(),
            BuildMode::Test => self.cases("rugotest", |kind| match kind {
                StatementKind::TestDef { name, body } => Some((name, body)),
                _ => None,
            })?,
            BuildMode::Bench => self.cases("rugobench", |kind| match kind {
                StatementKind::BenchDef { name, body } => Some((name, body)),
                _ => None,
            })?,
        };
        self.main_function(&cases);
        Ok(self.out.take_output())
    }

    fn function_def(&mut self, name: &str, params: &'a [String], body: &'a [Statement]) -> Result<()> {
        self.check_params(params)?;
        let go_params: Vec<String> = params
            .iter()
            .map(|p| format!("{} any", context::var_name(p)))
            .collect();
        let header = format!(
            "func {}({}) (any, error) {{",
            function_name(self.prefix(self.unit), name),
            go_params.join(", ")
        );
        self.out.writeln(&header);
        self.out.indent();
        self.scopes.enter_function();
        self.in_function = true;
        for param in params {
            self.scopes.declare(param);
        }
        self.declare_locals(assigned_names(body));
        if !self.body(body, Sink::Return)? {
            self.out.writeln("return nil, nil");
        }
        self.in_function = false;
        self.scopes.exit();
        self.out.dedent();
        self.out.writeln("}");
        self.out.blank();
        Ok(())
    }

    pub(crate) fn check_params(&self, params: &[String]) -> Result<()> {
        for (i, param) in params.iter().enumerate() {
            if params[..i].contains(param) {
                return Err(self.compile_error(format!("duplicate parameter '{}'", param)));
            }
        }
        Ok(())
    }

    /// `rugoMain` or a required unit's initializer
    fn entry_function(&mut self, go_name: &str, stmts: &[&'a Statement], inits: &[String]) -> Result<()> {
        self.out.writeln(&format!("func {}() (any, error) {{", go_name));
        self.out.indent();
        for init in inits {
            self.out.writeln(&format!("if _, err := {}(); err != nil {{", init));
            self.out.indent();
            self.out.writeln("return nil, err");
            self.out.dedent();
            self.out.writeln("}");
        }
        self.scopes.enter_function();
        self.declare_locals(assigned_names(stmts.iter().copied()));
        if !self.sequence(stmts, Sink::Discard)? {
            self.out.writeln("return nil, nil");
        }
        self.scopes.exit();
        self.out.dedent();
        self.out.writeln("}");
        self.out.blank();
        Ok(())
    }

    /// Emit the test or bench blocks of the main unit; returns `(name, go function)`
    fn cases(
        &mut self,
        stem: &str,
        select: impl Fn(&'a StatementKind) -> Option<(&'a String, &'a Vec<Statement>)>,
    ) -> Result<Vec<(String, String)>> {
        let units = self.units;
        let mut cases = Vec::new();
        for stmt in &units[self.main_unit()].program.statements {
            let Some((name, body)) = select(&stmt.kind) else {
                continue;
            };
            self.line = stmt.start_line;
            let go_name = format!("{}_{}", stem, cases.len() + 1);
            self.out.writeln(&format!("// {}", go_string(name)));
            self.out.writeln(&format!("func {}() (any, error) {{", go_name));
            self.out.indent();
            self.scopes.enter_function();
            self.in_function = true;
            self.declare_locals(assigned_names(body));
            if !self.body(body, Sink::Discard)? {
                self.out.writeln("return nil, nil");
            }
            self.in_function = false;
            self.scopes.exit();
            self.out.dedent();
            self.out.writeln("}");
            self.out.blank();
            cases.push((name.clone(), go_name));
        }
        Ok(cases)
    }

    fn main_function(&mut self, cases: &[(String, String)]) {
        self.out.writeln("func main() {");
        self.out.indent();
        self.out.writeln("if _, err := rugoMain(); err != nil {");
        self.out.indent();
        self.out.writeln("fmt.Fprintln(os.Stderr, \"error: \"+err.Error())");
        self.out.writeln("os.Exit(1)");
        self.out.dedent();
        self.out.writeln("}");

        let runner = match self.options.mode {
            BuildMode::Program => None,
            BuildMode::Test => Some(("rgRunTests", "rgTestCase")),
            BuildMode::Bench => Some(("rgRunBenches", "rgBenchCase")),
        };
        if let Some((run, case)) = runner {
            self.out.writeln(&format!("os.Exit({}([]{}{{", run, case));
            self.out.indent();
            for (name, go_name) in cases {
                self.out
                    .writeln(&format!("{{name: {}, body: {}}},", go_string(name), go_name));
            }
            self.out.dedent();
            self.out.writeln("}))");
        }
        self.out.dedent();
        self.out.writeln("}");
    }

    /// Runtime sections in emission order
    fn sections(&self) -> Result<Vec<RuntimeSection>> {
        let features = Features::scan(self.units.iter().map(|u| &u.program));
        let mut sections = vec![section("core")?];
        if features.concurrency {
            sections.push(section("concurrency")?);
        }
        if features.shell {
            sections.push(section("shell")?);
        }
        match self.options.mode {
            BuildMode::Program => {}
            BuildMode::Test => sections.push(section("testrunner")?),
            BuildMode::Bench => sections.push(section("benchrunner")?),
        }
        for namespace in self.registry.namespaces() {
            if let Some(support) = self.registry.curated_support(namespace) {
                sections.push(RuntimeSection::parse(support)?);
            }
        }
        Ok(sections)
    }

    fn assemble(self, body: String) -> Result<GeneratedProgram> {
        let sections = self.sections()?;

        // (import path, alias); one package may be imported under several names
        let mut imports: BTreeSet<(String, Option<String>)> = BTreeSet::new();
        for section in &sections {
            for path in &section.imports {
                imports.insert((path.clone(), None));
            }
        }
        for entry in self.wrappers.values() {
            if let Dispatch::Bridged { .. } = entry.dispatch {
                let (alias, path) = self
                    .registry
                    .bridge_import(&entry.signature.module)
                    .ok_or_else(|| {
                        self.internal_error(format!("no import for module '{}'", entry.signature.module))
                    })?;
                imports.insert((path.to_string(), Some(alias.to_string())));
            }
        }

        let mut out = Emitter::new();
        out.writeln(&format!(
            "// Code generated by rugoc from {}. DO NOT EDIT.",
            self.units[self.main_unit()].program.name
        ));
        out.blank();
        out.writeln("package main");
        out.blank();
        out.writeln("import (");
        out.indent();
        for (path, alias) in &imports {
            match alias {
                Some(alias) => out.writeln(&format!("{} {}", alias, go_string(path))),
                None => out.writeln(&go_string(path)),
            }
        }
        out.dedent();
        out.writeln(")");

        for section in &sections {
            out.blank();
            out.writeln(&format!("// runtime: {} v{}", section.name, section.version));
            out.blank();
            out.write_raw(section.body.trim_start_matches('\n'));
        }
        out.blank();
        out.write_raw(&body);
        for entry in self.wrappers.values() {
            out.blank();
            wrappers::emit_wrapper(&mut out, entry);
        }

        let mut paths: Vec<String> = imports.into_iter().map(|(path, _)| path).collect();
        paths.dedup();

        Ok(GeneratedProgram {
            source: out.take_output(),
            imports: paths,
            runtime: sections.iter().map(RuntimeSection::info).collect(),
        })
    }
}
