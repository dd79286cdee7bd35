//! Error types for the rugoc compiler

use thiserror::Error;

/// rugoc compile-time errors
///
/// Failures of the *generated* program are never represented here: they are
/// emitted as Go `error` values and surface when the binary runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // User errors
    /// Syntax error encountered while lexing, parsing or walking
    ///
    /// **Triggered by:** malformed source (unterminated strings, unbalanced blocks)
    /// **Example:** `if x` with no matching `end`
    #[error("{source_name}:{line}:{col}: syntax error: {message}")]
    SyntaxError {
        /// Name of the compile unit
        source_name: String,
        /// Line number in the original source (1-indexed)
        line: usize,
        /// Column number (1-indexed)
        col: usize,
        /// Error description
        message: String,
        /// Tokens that would have been accepted at this position
        expected: Vec<String>,
    },

    /// Well-formed program that cannot be translated
    ///
    /// **Triggered by:** undefined functions or variables, builtin arity
    /// mismatches, `break` outside a loop
    #[error("{source_name}:{line}: {message}")]
    CompileError {
        /// Name of the compile unit
        source_name: String,
        /// Line number in the original source
        line: usize,
        /// Error description
        message: String,
    },

    /// `use` of a module the registry does not know
    #[error("{source_name}:{line}: unknown module '{module}'")]
    UnknownModule {
        /// Name of the compile unit
        source_name: String,
        /// Line of the `use` statement
        line: usize,
        /// Requested module name
        module: String,
    },

    // Bridge errors
    /// A foreign package exposed nothing bridgeable, or could not be read
    #[error("cannot bridge module '{module}': {}", format_reasons(.reasons))]
    BridgeError {
        /// Import path of the package
        module: String,
        /// One entry per rejected function (or a single read failure)
        reasons: Vec<String>,
    },

    // Multi-unit errors
    /// A required unit could not be supplied by the resolver
    #[error("cannot require '{path}': {message}")]
    ResolveError {
        /// Requested path
        path: String,
        /// Resolver failure or cycle description
        message: String,
    },

    // Compiler incompleteness
    /// A parse-tree or AST shape without a translation rule
    ///
    /// Distinct from [`Error::SyntaxError`]: the program is fine, the
    /// compiler is not.
    #[error("{source_name}:{line}: internal compiler error: {message}")]
    InternalError {
        /// Name of the compile unit
        source_name: String,
        /// Line nearest to the failing construct
        line: usize,
        /// Error description
        message: String,
    },

    /// The embedded grammar failed validation
    #[error("internal compiler error: invalid grammar: {0}")]
    GrammarError(String),

    /// Invalid compiler configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

/// Coarse error classification, used by front ends to pick exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed source text
    Syntax,
    /// Well-formed source the compiler rejects
    Compile,
    /// Foreign-function bridging failed
    Bridge,
    /// A required unit was unavailable
    Resolve,
    /// The compiler itself is at fault
    Internal,
}

fn format_reasons(reasons: &[String]) -> String {
    match reasons {
        [] => "no exported functions".to_string(),
        [single] => single.clone(),
        many => {
            let mut out = format!("no bridgeable functions ({} rejected)", many.len());
            for reason in many {
                out.push_str("\n  - ");
                out.push_str(reason);
            }
            out
        }
    }
}

impl Error {
    /// Create a positioned syntax error with no expected-token set
    pub fn syntax(source_name: &str, line: usize, col: usize, msg: impl Into<String>) -> Self {
        Error::SyntaxError {
            source_name: source_name.to_string(),
            line,
            col,
            message: msg.into(),
            expected: Vec::new(),
        }
    }

    /// Create a positioned compile error
    pub fn compile(source_name: &str, line: usize, msg: impl Into<String>) -> Self {
        Error::CompileError {
            source_name: source_name.to_string(),
            line,
            message: msg.into(),
        }
    }

    /// Create a positioned internal error
    pub fn internal(source_name: &str, line: usize, msg: impl Into<String>) -> Self {
        Error::InternalError {
            source_name: source_name.to_string(),
            line,
            message: msg.into(),
        }
    }

    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::SyntaxError { .. } => ErrorCategory::Syntax,
            Error::CompileError { .. } | Error::UnknownModule { .. } => ErrorCategory::Compile,
            Error::ConfigError(_) => ErrorCategory::Compile,
            Error::BridgeError { .. } => ErrorCategory::Bridge,
            Error::ResolveError { .. } => ErrorCategory::Resolve,
            Error::InternalError { .. } | Error::GrammarError(_) => ErrorCategory::Internal,
        }
    }

    /// Line in the original source, when the error has one
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::SyntaxError { line, .. }
            | Error::CompileError { line, .. }
            | Error::UnknownModule { line, .. }
            | Error::InternalError { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Whether the user should be told their program is at fault
    pub fn is_user_error(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Internal)
    }
}

/// Result type for rugoc operations
pub type Result<T> = std::result::Result<T, Error>;
