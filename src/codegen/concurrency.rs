//! `spawn` and `parallel` lowering
//!
//! Go closures capture variables by reference. A task body therefore gets
//! its own copies of the enclosing variables it mentions, taken when the
//! task is created: the closure is built by a factory function whose
//! locals shadow the outer variables.

use super::context::var_name;
use super::stmt::{assigned_names, referenced_names, Sink};
use super::Gen;
use crate::error::Result;
use crate::parser::{Statement, StatementKind};
use std::collections::BTreeSet;

impl<'a> Gen<'a> {
    /// A task handle running `body` on its own goroutine
    pub(crate) fn spawn(&mut self, body: &'a [Statement]) -> Result<String> {
        if body.is_empty() {
            return Ok(self.hoist("rgResolved(nil)".to_string()));
        }
        // assignments to copied variables stay task-local
        let snapshot = self.captured(referenced_names(body), &BTreeSet::new());
        let task = self.temp();
        self.open_task(&format!("{} := rgSpawn(", task), &snapshot);
        let loops = self.open_closure();
        self.closure_body(body)?;
        self.close_closure(loops);
        self.close_task(")", &snapshot);
        Ok(task)
    }

    /// One branch per statement, results in textual order
    pub(crate) fn parallel(&mut self, body: &'a [Statement]) -> Result<String> {
        if body.is_empty() {
            return Ok("rgNewArray()".to_string());
        }
        let results = self.temp();
        self.out.writeln(&format!("{}, err := rgParallel(", results));
        self.out.indent();
        for stmt in body {
            // a branch writes its own assignments through to the enclosing scope
            let assigned = assigned_names([stmt]);
            let snapshot = self.captured(referenced_names([stmt]), &assigned);
            self.open_task("", &snapshot);
            let loops = self.open_closure();
            self.declare_locals(assigned);
            let returned = match &stmt.kind {
                StatementKind::Assign { name, .. } => {
                    self.statement(stmt, Sink::Discard)?;
                    self.out
                        .writeln(&format!("return {}, nil", var_name(name)));
                    true
                }
                _ => self.statement(stmt, Sink::Return)?,
            };
            if !returned {
                self.out.writeln("return nil, nil");
            }
            self.close_closure(loops);
            self.close_task(",", &snapshot);
        }
        self.out.dedent();
        self.out.writeln(")");
        self.out.propagate("err");
        Ok(results)
    }

    /// Visible variables among `names`, minus `keep`
    fn captured(&self, names: BTreeSet<String>, keep: &BTreeSet<String>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| self.scopes.is_visible(name) && !keep.contains(name))
            .collect()
    }

    fn open_task(&mut self, head: &str, snapshot: &[String]) {
        if snapshot.is_empty() {
            self.out.writeln(&format!("{}func() (any, error) {{", head));
            return;
        }
        self.out
            .writeln(&format!("{}func() func() (any, error) {{", head));
        self.out.indent();
        for name in snapshot {
            let var = var_name(name);
            self.out.writeln(&format!("{} := {}", var, var));
            self.out.writeln(&format!("_ = {}", var));
        }
        self.out.writeln("return func() (any, error) {");
    }

    fn close_task(&mut self, tail: &str, snapshot: &[String]) {
        if snapshot.is_empty() {
            self.out.writeln(&format!("}}{}", tail));
            return;
        }
        self.out.writeln("}");
        self.out.dedent();
        self.out.writeln(&format!("}}(){}", tail));
    }
}
