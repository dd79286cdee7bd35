//! # rugoc - An Ahead-of-Time Compiler from Rugo to Go
//!
//! Rugo is a small, dynamically-typed, Ruby-flavoured scripting language.
//! `rugoc` translates a Rugo program into a single, self-contained Go
//! `main` package, which `go build` then turns into a native binary.
//!
//! ## Quick Start
//!
//! ```rust
//! use rugoc::{CompileOptions, Compiler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let code = r#"
//! def greet(name)
//!   return "hello, #{name}"
//! end
//!
//! puts greet("world")
//! "#;
//!
//! let output = Compiler::new(CompileOptions::default()).compile("hello.rg", code)?;
//! assert!(output.source.contains("package main"));
//! assert!(output.source.contains("func rugofn_greet("));
//! # Ok(())
//! # }
//! ```
//!
//! ## Language Overview
//!
//! ### Data Types
//!
//! - **Scalars**: integers, floats, strings, `true`/`false`, `nil`
//! - **Collections**: arrays `[1, 2, 3]` and insertion-ordered hashes `{"a" => 1}`
//! - **Closures**: `fn(x) x * 2 end`
//! - **Structs**: `struct Point` blocks become tagged hash constructors
//!
//! ### Control Flow
//!
//! - `if` / `elsif` / `else`, `while`, `for x in xs`, `for k, v in h`
//! - `break`, `next`, `return`
//! - `try expr`, `try expr or default`, `try expr or err ... end`
//!
//! ### Concurrency
//!
//! - `spawn ... end` starts a task; `.value`, `.done` and `.wait(n)` observe it
//! - `parallel ... end` runs each statement concurrently, results in order
//!
//! ### Modules
//!
//! - `use "str"` enables a curated module
//! - `import "github.com/x/y" as y` bridges a Go package by introspection
//! - `require "lib/util"` compiles another Rugo unit into the same program
//!
//! ## Architecture
//!
//! ```text
//! Source → Preprocessor → Scanner → LL(1) Parser → Walker → AST → CodeGenerator → Go
//!                                                              ↑
//!                                                          Registry
//! ```
//!
//! ### Main Components
//!
//! - [`Preprocessor`] - Rewrites surface sugar into the core grammar
//! - [`Scanner`] - Tokenizes preprocessed text
//! - [`Parser`] - Grammar-driven parsing into a [`Program`]
//! - [`RegistryBuilder`] / [`Registry`] - Curated and bridged module functions
//! - [`CodeGenerator`] - Lowers units to Go source
//! - [`Compiler`] - Runs the whole pipeline, including `require`
//!
//! ## Error Handling
//!
//! Every compile-time failure is an [`Error`] carrying the unit name and
//! line where one applies:
//!
//! ```rust
//! use rugoc::{CompileOptions, Compiler, Error};
//!
//! let err = Compiler::new(CompileOptions::default())
//!     .compile("main.rg", "def f(a)\n  a\nend\nf(1, 2)\n")
//!     .unwrap_err();
//! assert!(matches!(err, Error::CompileError { line: 4, .. }));
//! ```
//!
//! Failures of the generated program are Go `error` values; they are
//! reported when the binary runs.

/// Version of the rugoc compiler
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod registry;

// Re-export main types
pub use codegen::{BuildMode, CodeGenerator, CodeUnit, GenOptions, GeneratedProgram, RuntimeInfo};
pub use compiler::{CompileOptions, CompileOutput, Compiler, DirResolver, SourceResolver};
pub use error::{Error, ErrorCategory, Result};
pub use lexer::{Scanner, Token, TokenKind};
pub use parser::{
    BinaryOp, Expr, Parser, Program, Statement, StatementKind, StructDef, TryHandler, UnaryOp,
    DEFAULT_MAX_DEPTH,
};
pub use preprocess::{Preprocessed, Preprocessor};
pub use registry::{
    BridgeCache, DeclSource, FsDeclSource, MemoryDeclSource, ModuleDescription, ModuleSignature,
    Registry, RegistryBuilder, TypeTag,
};
