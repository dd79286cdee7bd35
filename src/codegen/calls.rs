//! Name resolution for identifiers, calls and member access
//!
//! A bare name resolves to, in order: a visible variable, a function of
//! the current unit, a builtin. Top-level code sees a function only after
//! its `def` line. `ns.name` resolves to a required unit's
//! function or a registry entry when `ns` is not a variable; otherwise it
//! is a dynamic field or method access on a value.

use super::builtins::{builtin, Builtin};
use super::context::{function_name, go_string, var_name};
use super::Gen;
use crate::error::Result;
use crate::parser::Expr;

impl<'a> Gen<'a> {
    pub(crate) fn ident(&mut self, name: &'a str) -> Result<String> {
        if self.scopes.is_visible(name) {
            return Ok(var_name(name));
        }
        if self.callable_def(name) {
            return self.user_call(self.unit, name, name, &[]);
        }
        if let Some(b) = builtin(name) {
            return self.builtin_call(b, &[]);
        }
        if self.is_namespace(name) {
            return Err(self.compile_error(format!("module '{}' cannot be used as a value", name)));
        }
        Err(self.compile_error(format!("undefined variable '{}'", name)))
    }

    pub(crate) fn call(&mut self, callee: &'a Expr, args: &'a [Expr]) -> Result<String> {
        match callee {
            Expr::Ident(name) if !self.scopes.is_visible(name) => self.call_named(name, args),
            Expr::Dot { object, field } => self.call_member(object, field, args),
            other => {
                let parts = self.operands(std::iter::once(other).chain(args))?;
                Ok(self.fallible(format!("rgCall({})", parts.join(", "))))
            }
        }
    }

    pub(crate) fn dot(&mut self, object: &'a Expr, field: &'a str) -> Result<String> {
        if let Some(ns) = self.namespace_of(object) {
            return self.qualified_call(ns, field, &[]);
        }
        let object = self.expr(object)?;
        Ok(self.fallible(format!("rgDot({}, {})", object, go_string(field))))
    }

    fn call_named(&mut self, name: &'a str, args: &'a [Expr]) -> Result<String> {
        if self.callable_def(name) {
            return self.user_call(self.unit, name, name, args);
        }
        match builtin(name) {
            Some(b) => self.builtin_call(b, args),
            None => Err(self.compile_error(format!("undefined function '{}'", name))),
        }
    }

    fn call_member(&mut self, object: &'a Expr, field: &'a str, args: &'a [Expr]) -> Result<String> {
        if let Some(ns) = self.namespace_of(object) {
            return self.qualified_call(ns, field, args);
        }
        let mut parts = self.operands(std::iter::once(object).chain(args))?;
        parts.insert(1, go_string(field));
        Ok(self.fallible(format!("rgCallMethod({})", parts.join(", "))))
    }

    /// The namespace an object expression names, if it is not a variable
    fn namespace_of(&self, object: &'a Expr) -> Option<&'a str> {
        match object {
            Expr::Ident(name) if !self.scopes.is_visible(name) && self.is_namespace(name) => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    fn is_namespace(&self, name: &str) -> bool {
        self.units[self.unit].requires.contains_key(name) || self.registry.has_namespace(name)
    }

    fn qualified_call(&mut self, ns: &'a str, name: &'a str, args: &'a [Expr]) -> Result<String> {
        let units = self.units;
        if let Some(&target) = units[self.unit].requires.get(ns) {
            if !self.defs[target].contains_key(name) {
                return Err(self.compile_error(format!("undefined function '{}.{}'", ns, name)));
            }
            return self.user_call(target, name, &format!("{}.{}", ns, name), args);
        }

        let registry = self.registry;
        let entry = registry
            .lookup(ns, name)
            .ok_or_else(|| self.compile_error(format!("unknown function '{}.{}'", ns, name)))?;
        self.wrappers.insert(entry.wrapper.clone(), entry);
        let args = self.exprs(args)?;
        Ok(self.fallible(format!("{}({})", entry.wrapper, args.join(", "))))
    }

    /// Direct call of a `def` in `unit`, arity-checked
    fn user_call(&mut self, unit: usize, name: &str, shown: &str, args: &'a [Expr]) -> Result<String> {
        let expected = self.defs[unit].get(name).copied().unwrap_or(0);
        if expected != args.len() {
            return Err(self.compile_error(format!(
                "wrong number of arguments for '{}' (expected {}, got {})",
                shown,
                expected,
                args.len()
            )));
        }
        let go_name = function_name(self.prefix(unit), name);
        let args = self.exprs(args)?;
        Ok(self.fallible(format!("{}({})", go_name, args.join(", "))))
    }

    fn builtin_call(&mut self, b: &'static Builtin, args: &'a [Expr]) -> Result<String> {
        if !b.accepts(args.len()) {
            return Err(self.compile_error(format!(
                "wrong number of arguments for '{}' (expected {}, got {})",
                b.name,
                b.arity(),
                args.len()
            )));
        }
        let args = self.exprs(args)?;
        let call = format!("{}({})", b.runtime, args.join(", "));
        Ok(if b.fallible {
            self.fallible(call)
        } else if b.pure {
            call
        } else {
            self.hoist(call)
        })
    }
}
