//! Expression lowering
//!
//! Each lowering returns a Go expression of type `any` (or a Go `bool`,
//! which is also a valid `any`). Anything fallible or effectful is hoisted
//! into a temporary first, so argument order is evaluation order. Operand
//! lists pin variable reads into temporaries before a later operand that
//! could reassign them runs.

use super::builtins::builtin;
use super::context::{go_string, var_name};
use super::stmt::{assigned_names, Sink};
use super::Gen;
use crate::error::Result;
use crate::parser::{BinaryOp, Expr, Statement, TryHandler, UnaryOp};

impl<'a> Gen<'a> {
    pub(crate) fn expr(&mut self, expr: &'a Expr) -> Result<String> {
        match expr {
            Expr::IntLit(n) => Ok(format!("int64({})", n)),
            Expr::FloatLit(f) => Ok(format!("float64({:?})", f)),
            Expr::StringLit(s) => Ok(go_string(s)),
            Expr::BoolLit(b) => Ok(b.to_string()),
            Expr::NilLit => Ok("nil".to_string()),
            Expr::Ident(name) => self.ident(name),
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Dot { object, field } => self.dot(object, field),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Unary { op, operand } => {
                let value = self.expr(operand)?;
                match op {
                    UnaryOp::Not => Ok(format!("!rgTruthy({})", value)),
                    UnaryOp::Neg => Ok(self.fallible(format!("rgNeg({})", value))),
                }
            }
            Expr::ArrayLit(items) => {
                let items = self.exprs(items)?;
                Ok(format!("rgNewArray({})", items.join(", ")))
            }
            Expr::HashLit(pairs) => {
                let parts = self.operands(pairs.iter().flat_map(|(k, v)| [k, v]))?;
                Ok(self.fallible(format!("rgHashOf({})", parts.join(", "))))
            }
            Expr::Index { object, index } => {
                let parts = self.operands([object.as_ref(), index.as_ref()])?;
                Ok(self.fallible(format!("rgIndex({}, {})", parts[0], parts[1])))
            }
            Expr::Lambda { params, body } => self.lambda(params, body),
            Expr::Try { expr, handler } => self.try_expr(expr, handler),
            Expr::Spawn { body } => self.spawn(body),
            Expr::Parallel { body } => self.parallel(body),
        }
    }

    pub(crate) fn exprs(&mut self, exprs: &'a [Expr]) -> Result<Vec<String>> {
        self.operands(exprs)
    }

    /// Lower operands left to right, keeping the values already computed
    /// when a later operand may reassign variables
    pub(crate) fn operands(&mut self, exprs: impl IntoIterator<Item = &'a Expr>) -> Result<Vec<String>> {
        let mut values: Vec<String> = Vec::new();
        for expr in exprs {
            if self.may_reassign(expr) {
                for value in values.iter_mut().filter(|v| !is_settled(v.as_str())) {
                    let temp = self.temp();
                    self.out.writeln(&format!("var {} any = {}", temp, value));
                    *value = temp;
                }
            }
            values.push(self.expr(expr)?);
        }
        Ok(values)
    }

    /// Whether evaluating `expr` can run user code that assigns a variable
    fn may_reassign(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Call { callee, args } => match callee.as_ref() {
                Expr::Ident(name)
                    if !self.scopes.is_visible(name)
                        && !self.callable_def(name)
                        && builtin(name).is_some() =>
                {
                    args.iter().any(|a| self.may_reassign(a))
                }
                _ => true,
            },
            Expr::Try { expr, handler } => match handler {
                TryHandler::None => self.may_reassign(expr),
                TryHandler::Or(default) => self.may_reassign(expr) || self.may_reassign(default),
                TryHandler::Rescue { .. } => true,
            },
            Expr::Parallel { .. } => true,
            Expr::Dot { object, .. } => self.may_reassign(object),
            Expr::Binary { left, right, .. } => self.may_reassign(left) || self.may_reassign(right),
            Expr::Unary { operand, .. } => self.may_reassign(operand),
            Expr::ArrayLit(items) => items.iter().any(|e| self.may_reassign(e)),
            Expr::HashLit(pairs) => pairs
                .iter()
                .any(|(k, v)| self.may_reassign(k) || self.may_reassign(v)),
            Expr::Index { object, index } => self.may_reassign(object) || self.may_reassign(index),
            _ => false,
        }
    }

    /// `_tN, err := call` plus the early return; yields `_tN`
    pub(crate) fn fallible(&mut self, call: String) -> String {
        let temp = self.temp();
        self.out.writeln(&format!("{}, err := {}", temp, call));
        self.out.propagate("err");
        temp
    }

    /// `_tN := value`; yields `_tN`
    pub(crate) fn hoist(&mut self, value: String) -> String {
        let temp = self.temp();
        self.out.writeln(&format!("{} := {}", temp, value));
        temp
    }

    fn binary(&mut self, op: BinaryOp, left: &'a Expr, right: &'a Expr) -> Result<String> {
        let func = match op {
            BinaryOp::And | BinaryOp::Or => return self.logical(op, left, right),
            BinaryOp::Eq | BinaryOp::NotEq => {
                let parts = self.operands([left, right])?;
                let negate = if op == BinaryOp::NotEq { "!" } else { "" };
                return Ok(format!("{}rgEq({}, {})", negate, parts[0], parts[1]));
            }
            BinaryOp::Add => "rgAdd",
            BinaryOp::Sub => "rgSub",
            BinaryOp::Mul => "rgMul",
            BinaryOp::Div => "rgDiv",
            BinaryOp::Mod => "rgMod",
            BinaryOp::Lt => "rgLt",
            BinaryOp::Gt => "rgGt",
            BinaryOp::LtEq => "rgLtEq",
            BinaryOp::GtEq => "rgGtEq",
        };
        let parts = self.operands([left, right])?;
        Ok(self.fallible(format!("{}({}, {})", func, parts[0], parts[1])))
    }

    /// Short-circuit `&&` / `||`, yielding the deciding operand
    fn logical(&mut self, op: BinaryOp, left: &'a Expr, right: &'a Expr) -> Result<String> {
        let left = self.expr(left)?;
        let result = self.temp();
        self.out.writeln(&format!("var {} any = {}", result, left));
        let test = match op {
            BinaryOp::And => format!("rgTruthy({})", result),
            _ => format!("!rgTruthy({})", result),
        };
        self.out.writeln(&format!("if {} {{", test));
        self.out.indent();
        let right = self.expr(right)?;
        self.out.writeln(&format!("{} = {}", result, right));
        self.out.dedent();
        self.out.writeln("}");
        Ok(result)
    }

    /// Enter a Go closure; `break`/`next` cannot cross it
    pub(crate) fn open_closure(&mut self) -> usize {
        self.scopes.enter_closure();
        self.out.indent();
        std::mem::replace(&mut self.loop_depth, 0)
    }

    pub(crate) fn close_closure(&mut self, loop_depth: usize) {
        self.out.dedent();
        self.scopes.exit();
        self.loop_depth = loop_depth;
    }

    /// Locals and statements of a closure whose value is its last expression
    pub(crate) fn closure_body(&mut self, body: &'a [Statement]) -> Result<()> {
        self.declare_locals(assigned_names(body));
        if !self.body(body, Sink::Return)? {
            self.out.writeln("return nil, nil");
        }
        Ok(())
    }

    fn lambda(&mut self, params: &'a [String], body: &'a [Statement]) -> Result<String> {
        self.check_params(params)?;
        let func = self.temp();
        self.out
            .writeln(&format!("{} := rgFunc(func(args ...any) (any, error) {{", func));
        let loops = self.open_closure();
        self.out.writeln(&format!("if len(args) != {} {{", params.len()));
        self.out.indent();
        self.out.writeln(&format!(
            "return nil, rgFail(\"fn expects {} argument(s), got %d\", len(args))",
            params.len()
        ));
        self.out.dedent();
        self.out.writeln("}");
        for (i, param) in params.iter().enumerate() {
            self.scopes.declare(param);
            let var = var_name(param);
            self.out.writeln(&format!("{} := args[{}]", var, i));
            self.out.writeln(&format!("_ = {}", var));
        }
        self.closure_body(body)?;
        self.close_closure(loops);
        self.out.writeln("})");
        Ok(func)
    }

    /// `try` runs its expression in a recovering closure
    fn try_expr(&mut self, expr: &'a Expr, handler: &'a TryHandler) -> Result<String> {
        let value = self.temp();
        let failure = match handler {
            TryHandler::None => "_".to_string(),
            _ => self.temp(),
        };
        self.out.writeln(&format!(
            "{}, {} := rgTry(func() (any, error) {{",
            value, failure
        ));
        let loops = self.open_closure();
        let result = self.expr(expr)?;
        self.out.writeln(&format!("return {}, nil", result));
        self.close_closure(loops);
        self.out.writeln("})");

        match handler {
            TryHandler::None => {}
            TryHandler::Or(default) => {
                self.out.writeln(&format!("if {} != nil {{", failure));
                self.out.indent();
                let default = self.expr(default)?;
                self.out.writeln(&format!("{} = {}", value, default));
                self.out.dedent();
                self.out.writeln("}");
            }
            TryHandler::Rescue { name, body } => {
                self.out.writeln(&format!("if {} != nil {{", failure));
                self.out.indent();
                self.assign_var(name, &format!("{}.Error()", failure))?;
                self.body(body, Sink::Assign(&value))?;
                self.out.dedent();
                self.out.writeln("}");
            }
        }
        Ok(value)
    }
}

/// Go expressions no later evaluation can change
fn is_settled(value: &str) -> bool {
    let temp = value
        .strip_prefix("_t")
        .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    temp || matches!(value, "nil" | "true" | "false")
        || value.starts_with('"')
        || value.starts_with("int64(")
        || value.starts_with("float64(")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_values() {
        for value in ["_t12", "nil", "true", "\"a\"", "int64(3)", "float64(1.5)"] {
            assert!(is_settled(value), "{}", value);
        }
        for value in ["v_x", "rgToS(v_x)", "_tx", "!rgTruthy(v_y)", "rgNewArray(v_a)"] {
            assert!(!is_settled(value), "{}", value);
        }
    }
}
