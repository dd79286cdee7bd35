//! Whole-program scan deciding which optional runtime sections to emit

use super::builtins::needs_shell;
use crate::parser::{Expr, Program, Statement, StatementKind, TryHandler};

/// Task handle members; any use pulls in the concurrency section
const TASK_MEMBERS: &[&str] = &["value", "done", "wait"];

/// Optional runtime sections a program needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    /// `spawn`, `parallel` or a task member
    pub concurrency: bool,
    /// Shell fallback or backtick capture
    pub shell: bool,
}

impl Features {
    pub fn scan<'p>(programs: impl IntoIterator<Item = &'p Program>) -> Self {
        let mut features = Features::default();
        for program in programs {
            features.statements(&program.statements);
        }
        features
    }

    fn statements(&mut self, stmts: &[Statement]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Statement) {
        match &stmt.kind {
            StatementKind::FunctionDef { body, .. }
            | StatementKind::TestDef { body, .. }
            | StatementKind::BenchDef { body, .. } => self.statements(body),
            StatementKind::If {
                cond,
                then_body,
                elsifs,
                else_body,
            } => {
                self.expr(cond);
                self.statements(then_body);
                for (cond, body) in elsifs {
                    self.expr(cond);
                    self.statements(body);
                }
                if let Some(body) = else_body {
                    self.statements(body);
                }
            }
            StatementKind::While { cond, body } => {
                self.expr(cond);
                self.statements(body);
            }
            StatementKind::For { iterable, body, .. } => {
                self.expr(iterable);
                self.statements(body);
            }
            StatementKind::Return(Some(e))
            | StatementKind::Assign { value: e, .. }
            | StatementKind::ExprStmt(e) => self.expr(e),
            StatementKind::IndexAssign {
                target,
                index,
                value,
            } => {
                self.expr(target);
                self.expr(index);
                self.expr(value);
            }
            StatementKind::DotAssign { target, value, .. } => {
                self.expr(target);
                self.expr(value);
            }
            StatementKind::Return(None)
            | StatementKind::Break
            | StatementKind::Next
            | StatementKind::Use { .. }
            | StatementKind::Import { .. }
            | StatementKind::Require { .. } => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Call { callee, args } => {
                if let Expr::Ident(name) = callee.as_ref() {
                    self.shell |= needs_shell(name);
                }
                self.expr(callee);
                args.iter().for_each(|a| self.expr(a));
            }
            Expr::Dot { object, field } => {
                self.concurrency |= TASK_MEMBERS.contains(&field.as_str());
                self.expr(object);
            }
            Expr::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::ArrayLit(items) => items.iter().for_each(|e| self.expr(e)),
            Expr::HashLit(pairs) => {
                for (k, v) in pairs {
                    self.expr(k);
                    self.expr(v);
                }
            }
            Expr::Index { object, index } => {
                self.expr(object);
                self.expr(index);
            }
            Expr::Lambda { body, .. } => self.statements(body),
            Expr::Try { expr, handler } => {
                self.expr(expr);
                match handler {
                    TryHandler::None => {}
                    TryHandler::Or(default) => self.expr(default),
                    TryHandler::Rescue { body, .. } => self.statements(body),
                }
            }
            Expr::Spawn { body } | Expr::Parallel { body } => {
                self.concurrency = true;
                self.statements(body);
            }
            Expr::Ident(_)
            | Expr::StringLit(_)
            | Expr::IntLit(_)
            | Expr::FloatLit(_)
            | Expr::BoolLit(_)
            | Expr::NilLit => {}
        }
    }
}
