use serde::{Deserialize, Serialize};

/// A parsed compile unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Name of the compile unit (usually a file name)
    pub name: String,
    /// Raw source text as submitted
    pub source: String,
    /// Top-level statements
    pub statements: Vec<Statement>,
    /// Struct declarations, in source order
    pub structs: Vec<StructDef>,
}

/// A `struct` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    /// Struct name
    pub name: String,
    /// Field names in declaration order
    pub fields: Vec<String>,
    /// Line of the declaration
    pub line: usize,
}

/// A statement with its source span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// What the statement is
    pub kind: StatementKind,
    /// First line in the original source
    pub start_line: usize,
    /// Last line in the original source
    pub end_line: usize,
}

impl Statement {
    /// Creates a statement spanning `start_line..=end_line`
    pub fn new(kind: StatementKind, start_line: usize, end_line: usize) -> Self {
        Statement {
            kind,
            start_line,
            end_line,
        }
    }
}

/// Statement types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// `def name(params) ... end`
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Statement>,
    },

    /// `test "name" ... end`
    TestDef { name: String, body: Vec<Statement> },

    /// `bench "name" ... end`
    BenchDef { name: String, body: Vec<Statement> },

    /// `if` with any number of `elsif` clauses and an optional `else`
    If {
        cond: Expr,
        then_body: Vec<Statement>,
        elsifs: Vec<(Expr, Vec<Statement>)>,
        else_body: Option<Vec<Statement>>,
    },

    /// `while cond ... end`
    While { cond: Expr, body: Vec<Statement> },

    /// `for var in iterable` or `for var, value_var in iterable`
    ///
    /// With one variable, arrays bind the element and hashes the key. With
    /// two, `var` receives the index or key and `value_var` the element.
    For {
        var: String,
        value_var: Option<String>,
        iterable: Expr,
        body: Vec<Statement>,
    },

    /// `return [expr]`
    Return(Option<Expr>),

    /// `break`
    Break,

    /// `next`
    Next,

    /// `name = value`
    Assign { name: String, value: Expr },

    /// `target[index] = value`
    IndexAssign {
        target: Expr,
        index: Expr,
        value: Expr,
    },

    /// `target.field = value`
    DotAssign {
        target: Expr,
        field: String,
        value: Expr,
    },

    /// Expression evaluated for its effect (or as an implicit result)
    ExprStmt(Expr),

    /// `use "module"`
    Use { module: String },

    /// `import "go/package/path" [as alias]`
    Import { path: String, alias: Option<String> },

    /// `require "path" [as alias]`
    Require { path: String, alias: Option<String> },
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Call of any callee with positional arguments
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Variable or function reference
    Ident(String),
    /// `object.field`
    Dot { object: Box<Expr>, field: String },

    // Literals
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    NilLit,

    /// Binary operation
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// `[a, b, c]`
    ArrayLit(Vec<Expr>),
    /// `{k => v}` / `{name: v}`; pairs in source order
    HashLit(Vec<(Expr, Expr)>),
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },

    /// `fn(params) ... end`
    Lambda {
        params: Vec<String>,
        body: Vec<Statement>,
    },
    /// `try expr [or default | rescue name ... end]`
    Try {
        expr: Box<Expr>,
        handler: TryHandler,
    },
    /// `spawn ... end`
    Spawn { body: Vec<Statement> },
    /// `parallel ... end`
    Parallel { body: Vec<Statement> },
}

/// Recovery attached to a `try` expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TryHandler {
    /// Failure yields nil
    None,
    /// Failure yields the default expression
    Or(Box<Expr>),
    /// Failure runs the block with the message bound to `name`
    Rescue { name: String, body: Vec<Statement> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Operator for a source symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::LtEq,
            ">=" => BinaryOp::GtEq,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

impl UnaryOp {
    /// Operator for a source symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "!" => Some(UnaryOp::Not),
            "-" => Some(UnaryOp::Neg),
            _ => None,
        }
    }
}
