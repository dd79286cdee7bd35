//! Parse tree to AST lowering
//!
//! The walker knows the rule names of `rugo.ebnf` and nothing about tokens
//! beyond what a rule node holds. Shapes the grammar cannot produce are
//! reported as internal errors, never as user syntax errors.

use super::ast::{
    BinaryOp, Expr, Program, Statement, StatementKind, StructDef, TryHandler, UnaryOp,
};
use super::tree::{ParseNode, RuleNode};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};

/// Lowers a concrete parse tree into a [`Program`]
pub struct Walker<'a> {
    source_name: &'a str,
    structs: Vec<StructDef>,
}

impl<'a> Walker<'a> {
    /// Creates a walker for one compile unit
    pub fn new(source_name: &'a str) -> Self {
        Walker {
            source_name,
            structs: Vec::new(),
        }
    }

    /// Lower the tree rooted at `Program`
    pub fn walk(mut self, tree: &ParseNode, source: &str) -> Result<Program> {
        let root = self.expect_rule(tree, "Program")?;
        let block = self.child_rule(root, "Block")?;
        let statements = self.block(block)?;
        Ok(Program {
            name: self.source_name.to_string(),
            source: source.to_string(),
            statements,
            structs: self.structs,
        })
    }

    fn block(&mut self, block: &RuleNode) -> Result<Vec<Statement>> {
        let mut out = Vec::new();
        for stmt in block.rules("Statement") {
            if let Some(statement) = self.statement(stmt)? {
                out.push(statement);
            }
        }
        Ok(out)
    }

    /// `None` for declarations that leave no statement behind
    fn statement(&mut self, node: &RuleNode) -> Result<Option<Statement>> {
        let inner = self.only_rule(node)?;
        let start = inner.first_line();
        let end = inner.last_line();

        let kind = match inner.name.as_str() {
            "FuncDef" => {
                let name = self.ident_at(inner, 0)?;
                let params = match inner.rule("ParamList") {
                    Some(list) => list.identifiers(),
                    None => Vec::new(),
                };
                let body = self.block(self.child_rule(inner, "Block")?)?;
                StatementKind::FunctionDef { name, params, body }
            }
            "TestDef" => StatementKind::TestDef {
                name: self.string_at(inner, 0)?,
                body: self.block(self.child_rule(inner, "Block")?)?,
            },
            "BenchDef" => StatementKind::BenchDef {
                name: self.string_at(inner, 0)?,
                body: self.block(self.child_rule(inner, "Block")?)?,
            },
            "StructDecl" => {
                let name = self.ident_at(inner, 0)?;
                let fields = match inner.rule("ParamList") {
                    Some(list) => list.identifiers(),
                    None => Vec::new(),
                };
                self.structs.push(StructDef {
                    name,
                    fields,
                    line: start,
                });
                return Ok(None);
            }
            "IfStmt" => {
                let cond = self.expr(self.child_rule(inner, "Expr")?)?;
                let then_body = self.block(self.child_rule(inner, "Block")?)?;
                let mut elsifs = Vec::new();
                for clause in inner.rules("ElsifClause") {
                    let cond = self.expr(self.child_rule(clause, "Expr")?)?;
                    let body = self.block(self.child_rule(clause, "Block")?)?;
                    elsifs.push((cond, body));
                }
                let else_body = match inner.rule("ElseClause") {
                    Some(clause) => Some(self.block(self.child_rule(clause, "Block")?)?),
                    None => None,
                };
                StatementKind::If {
                    cond,
                    then_body,
                    elsifs,
                    else_body,
                }
            }
            "WhileStmt" => StatementKind::While {
                cond: self.expr(self.child_rule(inner, "Expr")?)?,
                body: self.block(self.child_rule(inner, "Block")?)?,
            },
            "ForStmt" => {
                let names = inner.identifiers();
                let (var, value_var) = match names.as_slice() {
                    [one] => (one.clone(), None),
                    [key, value] => (key.clone(), Some(value.clone())),
                    _ => return Err(self.shape(inner)),
                };
                StatementKind::For {
                    var,
                    value_var,
                    iterable: self.expr(self.child_rule(inner, "Expr")?)?,
                    body: self.block(self.child_rule(inner, "Block")?)?,
                }
            }
            "ReturnStmt" => match inner.rule("Expr") {
                Some(expr) => StatementKind::Return(Some(self.expr(expr)?)),
                None => StatementKind::Return(None),
            },
            "BreakStmt" => StatementKind::Break,
            "NextStmt" => StatementKind::Next,
            "UseStmt" => StatementKind::Use {
                module: self.string_at(inner, 0)?,
            },
            "ImportStmt" => StatementKind::Import {
                path: self.string_at(inner, 0)?,
                alias: inner.identifiers().into_iter().next(),
            },
            "RequireStmt" => StatementKind::Require {
                path: self.string_at(inner, 0)?,
                alias: inner.identifiers().into_iter().next(),
            },
            "SimpleStmt" => self.simple_statement(inner)?,
            _ => return Err(self.shape(inner)),
        };

        Ok(Some(Statement::new(kind, start, end)))
    }

    fn simple_statement(&mut self, node: &RuleNode) -> Result<StatementKind> {
        let mut exprs = node.rules("Expr");
        let first = exprs.next().ok_or_else(|| self.shape(node))?;
        let Some(rhs) = exprs.next() else {
            return Ok(StatementKind::ExprStmt(self.expr(first)?));
        };

        let target = self.expr(first)?;
        let value = self.expr(rhs)?;
        match target {
            Expr::Ident(name) => Ok(StatementKind::Assign { name, value }),
            Expr::Index { object, index } => Ok(StatementKind::IndexAssign {
                target: *object,
                index: *index,
                value,
            }),
            Expr::Dot { object, field } => Ok(StatementKind::DotAssign {
                target: *object,
                field,
                value,
            }),
            _ => {
                let (line, col) = first
                    .first_token()
                    .map(|t| (t.line, t.column))
                    .unwrap_or((node.first_line(), 1));
                Err(Error::syntax(
                    self.source_name,
                    line,
                    col,
                    "invalid assignment target",
                ))
            }
        }
    }

    fn expr(&mut self, node: &RuleNode) -> Result<Expr> {
        match node.name.as_str() {
            "Expr" => self.expr(self.only_rule(node)?),
            "OrExpr" | "AndExpr" | "EqExpr" | "CmpExpr" | "AddExpr" | "MulExpr" => {
                self.binary_chain(node)
            }
            "UnaryExpr" => self.unary(node),
            "PostfixExpr" => self.postfix(node),
            "Primary" => self.primary(node),
            _ => Err(self.shape(node)),
        }
    }

    /// `operand { op operand }`, folded to the left
    fn binary_chain(&mut self, node: &RuleNode) -> Result<Expr> {
        let mut result: Option<Expr> = None;
        let mut pending: Option<BinaryOp> = None;

        for child in &node.children {
            match child {
                ParseNode::Token(tok) => pending = Some(self.binary_op(tok)?),
                ParseNode::Rule(rule) if rule.name.ends_with("Op") => {
                    let tok = rule.tokens().next().ok_or_else(|| self.shape(rule))?;
                    pending = Some(self.binary_op(tok)?);
                }
                ParseNode::Rule(rule) => {
                    let operand = self.expr(rule)?;
                    result = Some(match (result, pending.take()) {
                        (None, None) => operand,
                        (Some(left), Some(op)) => Expr::Binary {
                            op,
                            left: Box::new(left),
                            right: Box::new(operand),
                        },
                        _ => return Err(self.shape(node)),
                    });
                }
            }
        }

        result.ok_or_else(|| self.shape(node))
    }

    fn binary_op(&self, tok: &Token) -> Result<BinaryOp> {
        match &tok.kind {
            TokenKind::Symbol(sym) => BinaryOp::from_symbol(sym),
            _ => None,
        }
        .ok_or_else(|| {
            Error::internal(
                self.source_name,
                tok.line,
                format!("no binary operator for {}", tok.kind),
            )
        })
    }

    fn unary(&mut self, node: &RuleNode) -> Result<Expr> {
        let Some(op_node) = node.rule("UnaryOp") else {
            return self.expr(self.only_rule(node)?);
        };
        let tok = op_node.tokens().next().ok_or_else(|| self.shape(op_node))?;
        let op = match &tok.kind {
            TokenKind::Symbol(sym) => UnaryOp::from_symbol(sym),
            _ => None,
        }
        .ok_or_else(|| self.shape(op_node))?;
        let operand = self.expr(self.child_rule(node, "UnaryExpr")?)?;

        Ok(match (op, operand) {
            (UnaryOp::Neg, Expr::IntLit(n)) => Expr::IntLit(n.wrapping_neg()),
            (UnaryOp::Neg, Expr::FloatLit(f)) => Expr::FloatLit(-f),
            (op, operand) => Expr::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn postfix(&mut self, node: &RuleNode) -> Result<Expr> {
        let mut expr = self.primary(self.child_rule(node, "Primary")?)?;

        for suffix in node.rules("Suffix") {
            let inner = self.only_rule(suffix)?;
            expr = match inner.name.as_str() {
                "CallSuffix" => Expr::Call {
                    callee: Box::new(expr),
                    args: match inner.rule("ArgList") {
                        Some(list) => self.arg_list(list)?,
                        None => Vec::new(),
                    },
                },
                "IndexSuffix" => Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(self.expr(self.child_rule(inner, "Expr")?)?),
                },
                "DotSuffix" => Expr::Dot {
                    object: Box::new(expr),
                    field: self.ident_at(inner, 0)?,
                },
                _ => return Err(self.shape(inner)),
            };
        }

        Ok(expr)
    }

    fn arg_list(&mut self, node: &RuleNode) -> Result<Vec<Expr>> {
        node.rules("Expr").map(|e| self.expr(e)).collect()
    }

    fn primary(&mut self, node: &RuleNode) -> Result<Expr> {
        let child = node.children.first().ok_or_else(|| self.shape(node))?;
        let rule = match child {
            ParseNode::Token(tok) => return self.literal(tok),
            ParseNode::Rule(rule) => rule,
        };

        match rule.name.as_str() {
            "ParenExpr" => self.expr(self.child_rule(rule, "Expr")?),
            "ArrayLit" => Ok(Expr::ArrayLit(match rule.rule("ArgList") {
                Some(list) => self.arg_list(list)?,
                None => Vec::new(),
            })),
            "HashLit" => {
                let mut pairs = Vec::new();
                if let Some(list) = rule.rule("PairList") {
                    for pair in list.rules("Pair") {
                        pairs.push(self.pair(pair)?);
                    }
                }
                Ok(Expr::HashLit(pairs))
            }
            "FnLit" => Ok(Expr::Lambda {
                params: match rule.rule("ParamList") {
                    Some(list) => list.identifiers(),
                    None => Vec::new(),
                },
                body: self.block(self.child_rule(rule, "Block")?)?,
            }),
            "TryExpr" => {
                let expr = Box::new(self.expr(self.child_rule(rule, "Expr")?)?);
                let handler = match rule.rule("TryHandler") {
                    None => TryHandler::None,
                    Some(handler) => {
                        let inner = self.only_rule(handler)?;
                        match inner.name.as_str() {
                            "OrHandler" => TryHandler::Or(Box::new(
                                self.expr(self.child_rule(inner, "Expr")?)?,
                            )),
                            "RescueHandler" => TryHandler::Rescue {
                                name: self.ident_at(inner, 0)?,
                                body: self.block(self.child_rule(inner, "Block")?)?,
                            },
                            _ => return Err(self.shape(inner)),
                        }
                    }
                };
                Ok(Expr::Try { expr, handler })
            }
            "SpawnExpr" => Ok(Expr::Spawn {
                body: self.block(self.child_rule(rule, "Block")?)?,
            }),
            "ParallelExpr" => Ok(Expr::Parallel {
                body: self.block(self.child_rule(rule, "Block")?)?,
            }),
            _ => Err(self.shape(rule)),
        }
    }

    fn pair(&mut self, node: &RuleNode) -> Result<(Expr, Expr)> {
        let values: Vec<&RuleNode> = node.rules("Expr").collect();
        match (node.tokens().next().map(|t| &t.kind), values.as_slice()) {
            (Some(TokenKind::Label(label)), [value]) => {
                Ok((Expr::StringLit(label.clone()), self.expr(value)?))
            }
            (_, [key, value]) => Ok((self.expr(key)?, self.expr(value)?)),
            _ => Err(self.shape(node)),
        }
    }

    fn literal(&self, tok: &Token) -> Result<Expr> {
        Ok(match &tok.kind {
            TokenKind::Identifier(name) => Expr::Ident(name.clone()),
            TokenKind::Integer(n) => Expr::IntLit(*n),
            TokenKind::Float(f) => Expr::FloatLit(*f),
            TokenKind::String(s) => Expr::StringLit(s.clone()),
            TokenKind::Keyword(k) if k == "true" => Expr::BoolLit(true),
            TokenKind::Keyword(k) if k == "false" => Expr::BoolLit(false),
            TokenKind::Keyword(k) if k == "nil" => Expr::NilLit,
            other => {
                return Err(Error::internal(
                    self.source_name,
                    tok.line,
                    format!("no literal rule for {}", other),
                ))
            }
        })
    }

    // Tree access helpers

    fn expect_rule<'n>(&self, node: &'n ParseNode, name: &str) -> Result<&'n RuleNode> {
        match node {
            ParseNode::Rule(rule) if rule.name == name => Ok(rule),
            ParseNode::Rule(rule) => Err(self.shape(rule)),
            ParseNode::Token(tok) => Err(Error::internal(
                self.source_name,
                tok.line,
                format!("expected rule {}, found token {}", name, tok.kind),
            )),
        }
    }

    fn child_rule<'n>(&self, node: &'n RuleNode, name: &str) -> Result<&'n RuleNode> {
        node.rule(name).ok_or_else(|| {
            Error::internal(
                self.source_name,
                node.first_line(),
                format!("{} has no {} child", node.name, name),
            )
        })
    }

    /// The single rule child of a pass-through production
    fn only_rule<'n>(&self, node: &'n RuleNode) -> Result<&'n RuleNode> {
        match node.children.as_slice() {
            [ParseNode::Rule(rule)] => Ok(rule),
            _ => Err(self.shape(node)),
        }
    }

    fn ident_at(&self, node: &RuleNode, index: usize) -> Result<String> {
        node.identifiers()
            .into_iter()
            .nth(index)
            .ok_or_else(|| self.shape(node))
    }

    fn string_at(&self, node: &RuleNode, index: usize) -> Result<String> {
        node.tokens()
            .filter_map(|t| match &t.kind {
                TokenKind::String(s) => Some(s.clone()),
                _ => None,
            })
            .nth(index)
            .ok_or_else(|| self.shape(node))
    }

    fn shape(&self, node: &RuleNode) -> Error {
        Error::internal(
            self.source_name,
            node.first_line(),
            format!("unexpected parse tree shape for {}", node.name),
        )
    }
}
