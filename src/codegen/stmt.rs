//! Statement lowering

use super::context::{go_string, var_name};
use super::Gen;
use crate::error::Result;
use crate::parser::{Expr, Statement, StatementKind, TryHandler};
use std::collections::BTreeSet;

/// Where the value of a trailing expression statement goes
#[derive(Debug, Clone, Copy)]
pub(crate) enum Sink<'s> {
    /// `return value, nil`
    Return,
    /// Assign to a Go variable
    Assign(&'s str),
    Discard,
}

impl<'a> Gen<'a> {
    /// Lower a statement list; true if it ends in a Go `return`
    pub(crate) fn body(&mut self, stmts: &'a [Statement], sink: Sink<'_>) -> Result<bool> {
        let refs: Vec<&'a Statement> = stmts.iter().collect();
        self.sequence(&refs, sink)
    }

    pub(crate) fn sequence(&mut self, stmts: &[&'a Statement], sink: Sink<'_>) -> Result<bool> {
        let mut terminated = false;
        for (i, stmt) in stmts.iter().enumerate() {
            let sink = if i + 1 == stmts.len() { sink } else { Sink::Discard };
            terminated = self.statement(stmt, sink)?;
        }
        Ok(terminated)
    }

    /// Pre-declare every name the code about to be emitted assigns
    pub(crate) fn declare_locals(&mut self, names: BTreeSet<String>) {
        for name in names {
            if self.scopes.is_visible(&name) {
                continue;
            }
            self.scopes.declare(&name);
            let var = var_name(&name);
            self.out.writeln(&format!("var {} any", var));
            self.out.writeln(&format!("_ = {}", var));
        }
    }

    pub(crate) fn statement(&mut self, stmt: &'a Statement, sink: Sink<'_>) -> Result<bool> {
        let outer_line = std::mem::replace(&mut self.line, stmt.start_line);
        if self.options.line_comments {
            let comment = format!("// {}:{}", self.source_name(), stmt.start_line);
            self.out.writeln(&comment);
        }

        let terminated = match &stmt.kind {
            StatementKind::FunctionDef { .. } => {
                return Err(self.compile_error("def is only allowed at the top level"))
            }
            StatementKind::TestDef { .. } | StatementKind::BenchDef { .. } => {
                return Err(self.compile_error("test and bench blocks are only allowed at the top level"))
            }
            StatementKind::Use { .. } => return Err(self.top_level_only("use")),
            StatementKind::Import { .. } => return Err(self.top_level_only("import")),
            StatementKind::Require { .. } => return Err(self.top_level_only("require")),

            StatementKind::If {
                cond,
                then_body,
                elsifs,
                else_body,
            } => {
                self.if_chain(cond, then_body, elsifs, else_body.as_deref())?;
                false
            }
            StatementKind::While { cond, body } => {
                self.while_loop(cond, body)?;
                false
            }
            StatementKind::For {
                var,
                value_var,
                iterable,
                body,
            } => {
                self.for_loop(var, value_var.as_deref(), iterable, body)?;
                false
            }
            StatementKind::Return(value) => {
                let value = match value {
                    Some(e) => self.expr(e)?,
                    None => "nil".to_string(),
                };
                self.out.writeln(&format!("return {}, nil", value));
                true
            }
            StatementKind::Break => {
                self.loop_jump("break", "break")?;
                false
            }
            StatementKind::Next => {
                self.loop_jump("next", "continue")?;
                false
            }
            StatementKind::Assign { name, value } => {
                let value = self.expr(value)?;
                self.assign_var(name, &value)?;
                false
            }
            StatementKind::IndexAssign {
                target,
                index,
                value,
            } => {
                let parts = self.operands([target, index, value])?;
                self.checked(&format!("rgSetIndex({}, {}, {})", parts[0], parts[1], parts[2]));
                false
            }
            StatementKind::DotAssign {
                target,
                field,
                value,
            } => {
                let parts = self.operands([target, value])?;
                self.checked(&format!(
                    "rgSetField({}, {}, {})",
                    parts[0],
                    go_string(field),
                    parts[1]
                ));
                false
            }
            StatementKind::ExprStmt(e) => {
                let value = self.expr(e)?;
                match sink {
                    Sink::Return => {
                        self.out.writeln(&format!("return {}, nil", value));
                        true
                    }
                    Sink::Assign(target) => {
                        self.out.writeln(&format!("{} = {}", target, value));
                        false
                    }
                    Sink::Discard => {
                        // untyped nil cannot be assigned to the blank identifier
                        if value != "nil" {
                            self.out.writeln(&format!("_ = {}", value));
                        }
                        false
                    }
                }
            }
        };

        self.line = outer_line;
        Ok(terminated)
    }

    fn top_level_only(&self, keyword: &str) -> crate::error::Error {
        self.compile_error(format!("'{}' is only allowed at the top level", keyword))
    }

    pub(crate) fn assign_var(&mut self, name: &str, value: &str) -> Result<()> {
        if !self.scopes.is_visible(name) {
            return Err(self.internal_error(format!("variable '{}' was never declared", name)));
        }
        self.out.writeln(&format!("{} = {}", var_name(name), value));
        Ok(())
    }

    /// A runtime call returning only an error
    fn checked(&mut self, call: &str) {
        self.out
            .writeln(&format!("if err := {}; err != nil {{", call));
        self.out.indent();
        self.out.writeln("return nil, err");
        self.out.dedent();
        self.out.writeln("}");
    }

    fn loop_jump(&mut self, keyword: &str, go: &str) -> Result<()> {
        if self.loop_depth == 0 {
            return Err(self.compile_error(format!("{} outside a loop", keyword)));
        }
        self.out.writeln(go);
        Ok(())
    }

    fn loop_body(&mut self, body: &'a [Statement]) -> Result<()> {
        self.loop_depth += 1;
        self.body(body, Sink::Discard)?;
        self.loop_depth -= 1;
        Ok(())
    }

    fn if_chain(
        &mut self,
        cond: &'a Expr,
        then_body: &'a [Statement],
        elsifs: &'a [(Expr, Vec<Statement>)],
        else_body: Option<&'a [Statement]>,
    ) -> Result<()> {
        let cond = self.expr(cond)?;
        self.out.writeln(&format!("if rgTruthy({}) {{", cond));
        self.out.indent();
        self.body(then_body, Sink::Discard)?;
        self.out.dedent();

        match (elsifs.split_first(), else_body) {
            // each elsif condition is evaluated only once the earlier ones failed
            (Some(((cond, body), rest)), _) => {
                self.out.writeln("} else {");
                self.out.indent();
                self.if_chain(cond, body, rest, else_body)?;
                self.out.dedent();
            }
            (None, Some(body)) => {
                self.out.writeln("} else {");
                self.out.indent();
                self.body(body, Sink::Discard)?;
                self.out.dedent();
            }
            (None, None) => {}
        }
        self.out.writeln("}");
        Ok(())
    }

    fn while_loop(&mut self, cond: &'a Expr, body: &'a [Statement]) -> Result<()> {
        self.out.writeln("for {");
        self.out.indent();
        let cond = self.expr(cond)?;
        self.out.writeln(&format!("if !rgTruthy({}) {{", cond));
        self.out.indent();
        self.out.writeln("break");
        self.out.dedent();
        self.out.writeln("}");
        self.loop_body(body)?;
        self.out.dedent();
        self.out.writeln("}");
        Ok(())
    }

    fn for_loop(
        &mut self,
        var: &str,
        value_var: Option<&str>,
        iterable: &'a Expr,
        body: &'a [Statement],
    ) -> Result<()> {
        let iterable = self.expr(iterable)?;
        let pairs = self.fallible(format!("rgIter({})", iterable));
        let pair = self.temp();
        self.out
            .writeln(&format!("for _, {} := range {} {{", pair, pairs));
        self.out.indent();
        match value_var {
            None => self.assign_var(var, &format!("{}.single", pair))?,
            Some(value_var) => {
                self.assign_var(var, &format!("{}.key", pair))?;
                self.assign_var(value_var, &format!("{}.value", pair))?;
            }
        }
        self.loop_body(body)?;
        self.out.dedent();
        self.out.writeln("}");
        Ok(())
    }
}

/// Variables assigned by `stmts` in the Go function that will contain them
///
/// Function bodies, lambdas and spawn blocks run in their own frames and
/// are skipped; `parallel` branches and rescue blocks assign into the
/// enclosing frame.
pub(crate) fn assigned_names<'s>(stmts: impl IntoIterator<Item = &'s Statement>) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for stmt in stmts {
        collect_statement(stmt, &mut names);
    }
    names
}

fn collect_body(stmts: &[Statement], names: &mut BTreeSet<String>) {
    for stmt in stmts {
        collect_statement(stmt, names);
    }
}

fn collect_statement(stmt: &Statement, names: &mut BTreeSet<String>) {
    match &stmt.kind {
        StatementKind::Assign { name, value } => {
            names.insert(name.clone());
            collect_expr(value, names);
        }
        StatementKind::For {
            var,
            value_var,
            iterable,
            body,
        } => {
            names.insert(var.clone());
            if let Some(value_var) = value_var {
                names.insert(value_var.clone());
            }
            collect_expr(iterable, names);
            collect_body(body, names);
        }
        StatementKind::If {
            cond,
            then_body,
            elsifs,
            else_body,
        } => {
            collect_expr(cond, names);
            collect_body(then_body, names);
            for (cond, body) in elsifs {
                collect_expr(cond, names);
                collect_body(body, names);
            }
            if let Some(body) = else_body {
                collect_body(body, names);
            }
        }
        StatementKind::While { cond, body } => {
            collect_expr(cond, names);
            collect_body(body, names);
        }
        StatementKind::Return(Some(e)) | StatementKind::ExprStmt(e) => collect_expr(e, names),
        StatementKind::IndexAssign {
            target,
            index,
            value,
        } => {
            collect_expr(target, names);
            collect_expr(index, names);
            collect_expr(value, names);
        }
        StatementKind::DotAssign { target, value, .. } => {
            collect_expr(target, names);
            collect_expr(value, names);
        }
        _ => {}
    }
}

fn collect_expr(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Try { expr, handler } => {
            collect_expr(expr, names);
            match handler {
                TryHandler::None => {}
                TryHandler::Or(default) => collect_expr(default, names),
                TryHandler::Rescue { name, body } => {
                    names.insert(name.clone());
                    collect_body(body, names);
                }
            }
        }
        Expr::Parallel { body } => collect_body(body, names),
        Expr::Call { callee, args } => {
            collect_expr(callee, names);
            args.iter().for_each(|a| collect_expr(a, names));
        }
        Expr::Dot { object, .. } => collect_expr(object, names),
        Expr::Binary { left, right, .. } => {
            collect_expr(left, names);
            collect_expr(right, names);
        }
        Expr::Unary { operand, .. } => collect_expr(operand, names),
        Expr::ArrayLit(items) => items.iter().for_each(|e| collect_expr(e, names)),
        Expr::HashLit(pairs) => {
            for (k, v) in pairs {
                collect_expr(k, names);
                collect_expr(v, names);
            }
        }
        Expr::Index { object, index } => {
            collect_expr(object, names);
            collect_expr(index, names);
        }
        _ => {}
    }
}

/// Every name `stmts` reads or assigns, closures included
pub(crate) fn referenced_names<'s>(stmts: impl IntoIterator<Item = &'s Statement>) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for stmt in stmts {
        refs_statement(stmt, &mut names);
    }
    names
}

fn refs_body(stmts: &[Statement], names: &mut BTreeSet<String>) {
    for stmt in stmts {
        refs_statement(stmt, names);
    }
}

fn refs_statement(stmt: &Statement, names: &mut BTreeSet<String>) {
    match &stmt.kind {
        StatementKind::Assign { name, value } => {
            names.insert(name.clone());
            refs_expr(value, names);
        }
        StatementKind::For {
            var,
            value_var,
            iterable,
            body,
        } => {
            names.insert(var.clone());
            names.extend(value_var.iter().cloned());
            refs_expr(iterable, names);
            refs_body(body, names);
        }
        StatementKind::If {
            cond,
            then_body,
            elsifs,
            else_body,
        } => {
            refs_expr(cond, names);
            refs_body(then_body, names);
            for (cond, body) in elsifs {
                refs_expr(cond, names);
                refs_body(body, names);
            }
            if let Some(body) = else_body {
                refs_body(body, names);
            }
        }
        StatementKind::While { cond, body } => {
            refs_expr(cond, names);
            refs_body(body, names);
        }
        StatementKind::Return(Some(e)) | StatementKind::ExprStmt(e) => refs_expr(e, names),
        StatementKind::IndexAssign {
            target,
            index,
            value,
        } => {
            refs_expr(target, names);
            refs_expr(index, names);
            refs_expr(value, names);
        }
        StatementKind::DotAssign { target, value, .. } => {
            refs_expr(target, names);
            refs_expr(value, names);
        }
        _ => {}
    }
}

fn refs_expr(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Ident(name) => {
            names.insert(name.clone());
        }
        Expr::Call { callee, args } => {
            refs_expr(callee, names);
            args.iter().for_each(|a| refs_expr(a, names));
        }
        Expr::Dot { object, .. } => refs_expr(object, names),
        Expr::Binary { left, right, .. } => {
            refs_expr(left, names);
            refs_expr(right, names);
        }
        Expr::Unary { operand, .. } => refs_expr(operand, names),
        Expr::ArrayLit(items) => items.iter().for_each(|e| refs_expr(e, names)),
        Expr::HashLit(pairs) => {
            for (k, v) in pairs {
                refs_expr(k, names);
                refs_expr(v, names);
            }
        }
        Expr::Index { object, index } => {
            refs_expr(object, names);
            refs_expr(index, names);
        }
        Expr::Lambda { body, .. } | Expr::Spawn { body } | Expr::Parallel { body } => {
            refs_body(body, names)
        }
        Expr::Try { expr, handler } => {
            refs_expr(expr, names);
            match handler {
                TryHandler::None => {}
                TryHandler::Or(default) => refs_expr(default, names),
                TryHandler::Rescue { name, body } => {
                    names.insert(name.clone());
                    refs_body(body, names);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(kind: StatementKind) -> Statement {
        Statement::new(kind, 1, 1)
    }

    fn assign(name: &str, value: Expr) -> Statement {
        stmt(StatementKind::Assign {
            name: name.to_string(),
            value,
        })
    }

    #[test]
    fn test_assigned_names_skip_closures() {
        let body = vec![
            assign("a", Expr::IntLit(1)),
            assign(
                "f",
                Expr::Lambda {
                    params: vec![],
                    body: vec![assign("inner", Expr::NilLit)],
                },
            ),
            stmt(StatementKind::ExprStmt(Expr::Parallel {
                body: vec![assign("shared", Expr::NilLit)],
            })),
            stmt(StatementKind::ExprStmt(Expr::Spawn {
                body: vec![assign("task_local", Expr::NilLit)],
            })),
            stmt(StatementKind::For {
                var: "k".to_string(),
                value_var: Some("v".to_string()),
                iterable: Expr::ArrayLit(vec![]),
                body: vec![],
            }),
        ];
        let names: Vec<String> = assigned_names(&body).into_iter().collect();
        assert_eq!(names, vec!["a", "f", "k", "shared", "v"]);
    }

    #[test]
    fn test_referenced_names_enter_closures() {
        let body = vec![
            assign("a", Expr::Ident("b".to_string())),
            stmt(StatementKind::ExprStmt(Expr::Lambda {
                params: vec![],
                body: vec![stmt(StatementKind::ExprStmt(Expr::Call {
                    callee: Box::new(Expr::Ident("f".to_string())),
                    args: vec![Expr::Ident("c".to_string())],
                }))],
            })),
        ];
        let names: Vec<String> = referenced_names(&body).into_iter().collect();
        assert_eq!(names, vec!["a", "b", "c", "f"]);
    }

    #[test]
    fn test_rescue_name_is_collected() {
        let body = vec![assign(
            "r",
            Expr::Try {
                expr: Box::new(Expr::NilLit),
                handler: TryHandler::Rescue {
                    name: "e".to_string(),
                    body: vec![],
                },
            },
        )];
        assert!(assigned_names(&body).contains("e"));
    }
}
