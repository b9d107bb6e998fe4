//! Tree-walking interpreter for worker programs
//!
//! One [`Interpreter`] runs inside each worker thread against the parsed
//! [`Program`]. Everything it can observe of the outside world goes through
//! the [`ScriptHost`] it is handed for each call.

use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::trace;

use crate::runtime::builtins::BUILTINS;
use crate::runtime::errors::RuntimeError;
use crate::runtime::value::Value;
use crate::script::parser::ast::{
    BinOp, Block, Expr, FnDef, Literal, Place, PlaceStep, Stmt, UnOp,
};
use crate::script::Program;

/// What a running script may ask of its execution context
pub trait ScriptHost {
    /// Post a message back to the owning handle
    fn post(
        &mut self,
        message: serde_json::Value,
    );

    /// The value `self` evaluates to
    fn receiver(&self) -> Value;

    /// Whether the owner has terminated this context
    fn is_terminated(&self) -> bool;

    /// Block for `duration`; returns `false` if interrupted by termination
    fn sleep(
        &mut self,
        duration: Duration,
    ) -> bool;

    /// Worker-side log line from `log(...)`
    fn log(
        &mut self,
        line: &str,
    );
}

/// Control flow out of a statement
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Lexical scopes of one call frame
#[derive(Default)]
struct Env {
    scopes: Vec<HashMap<String, Value>>,
}

impl Env {
    fn new() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn define(
        &mut self,
        name: &str,
        value: Value,
    ) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn get(
        &self,
        name: &str,
    ) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn get_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut Value> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }
}

/// Evaluated assignment path step
enum Key {
    Index(i64),
    Field(String),
}

/// Interpreter for one program
pub struct Interpreter<'p> {
    program: &'p Program,
    max_call_depth: usize,
    depth: usize,
}

impl<'p> Interpreter<'p> {
    pub fn new(
        program: &'p Program,
        max_call_depth: usize,
    ) -> Self {
        Self {
            program,
            max_call_depth,
            depth: 0,
        }
    }

    /// Run method `method` with `args`
    pub fn invoke(
        &mut self,
        host: &mut dyn ScriptHost,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let program = self.program;
        let def = program
            .method(method)
            .ok_or_else(|| RuntimeError::UnknownMethod(method.to_string()))?;
        trace!(method, args = args.len(), "invoke");
        self.depth = 0;
        self.call_function(host, def, method, args)
    }

    fn call_function(
        &mut self,
        host: &mut dyn ScriptHost,
        def: &FnDef,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if self.depth >= self.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded(self.max_call_depth));
        }
        self.depth += 1;

        let mut env = Env::new();
        let mut args = args.into_iter();
        for param in def.param_names() {
            env.define(param, args.next().unwrap_or_default());
        }

        let result = match self.exec_stmts(host, &mut env, &def.body.stmts) {
            Ok(Flow::Normal) => Ok(Value::Null),
            Ok(Flow::Return(value)) => Ok(value),
            Ok(Flow::Break) => Err(RuntimeError::StrayControlFlow("break")),
            Ok(Flow::Continue) => Err(RuntimeError::StrayControlFlow("continue")),
            Err(e) => Err(e),
        };
        self.depth -= 1;
        trace!(function = name, depth = self.depth, "return");
        result
    }

    fn exec_block(
        &mut self,
        host: &mut dyn ScriptHost,
        env: &mut Env,
        block: &Block,
    ) -> Result<Flow, RuntimeError> {
        env.push();
        let flow = self.exec_stmts(host, env, &block.stmts);
        env.pop();
        flow
    }

    fn exec_stmts(
        &mut self,
        host: &mut dyn ScriptHost,
        env: &mut Env,
        stmts: &[Stmt],
    ) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.exec_stmt(host, env, stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(
        &mut self,
        host: &mut dyn ScriptHost,
        env: &mut Env,
        stmt: &Stmt,
    ) -> Result<Flow, RuntimeError> {
        if host.is_terminated() {
            return Err(RuntimeError::Terminated);
        }

        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval(host, env, value)?;
                env.define(name, value);
                Ok(Flow::Normal)
            }
            Stmt::Assign { place, value, .. } => {
                let value = self.eval(host, env, value)?;
                self.assign(host, env, place, value)?;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(host, env, expr)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                cond,
                then_block,
                else_block,
                ..
            } => {
                if self.eval(host, env, cond)?.is_truthy() {
                    self.exec_block(host, env, then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_block(host, env, else_block)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body, .. } => {
                while self.eval(host, env, cond)?.is_truthy() {
                    match self.exec_block(host, env, body)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if host.is_terminated() {
                        return Err(RuntimeError::Terminated);
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                var,
                iterable,
                body,
                ..
            } => {
                let items = match self.eval(host, env, iterable)? {
                    Value::Array(items) => items,
                    Value::Object(map) => map.into_keys().map(Value::String).collect(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot iterate over {}",
                            other.type_name()
                        )))
                    }
                };
                for item in items {
                    env.push();
                    env.define(var, item);
                    let flow = self.exec_stmts(host, env, &body.stmts);
                    env.pop();
                    match flow? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(expr, _) => {
                let value = match expr {
                    Some(expr) => self.eval(host, env, expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),
        }
    }

    fn assign(
        &mut self,
        host: &mut dyn ScriptHost,
        env: &mut Env,
        place: &Place,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let mut keys = Vec::with_capacity(place.path.len());
        for step in &place.path {
            keys.push(match step {
                PlaceStep::Field(name) => Key::Field(name.clone()),
                PlaceStep::Index(expr) => match self.eval(host, env, expr)? {
                    Value::Int(i) => Key::Index(i),
                    Value::String(s) => Key::Field(s),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "cannot index with {}",
                            other.type_name()
                        )))
                    }
                },
            });
        }

        let mut slot = env
            .get_mut(&place.root)
            .ok_or_else(|| RuntimeError::UndefinedVariable(place.root.clone()))?;
        for key in keys {
            slot = match (slot, key) {
                (Value::Array(items), Key::Index(i)) => {
                    let len = items.len();
                    usize::try_from(i)
                        .ok()
                        .and_then(|idx| items.get_mut(idx))
                        .ok_or(RuntimeError::IndexOutOfBounds { index: i, len })?
                }
                (Value::Object(map), Key::Field(name)) => map.entry(name).or_default(),
                (target, _) => {
                    return Err(RuntimeError::type_error(format!(
                        "cannot assign into {}",
                        target.type_name()
                    )))
                }
            };
        }
        *slot = value;
        Ok(())
    }

    fn eval(
        &mut self,
        host: &mut dyn ScriptHost,
        env: &mut Env,
        expr: &Expr,
    ) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Lit(lit, _) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(f) => Value::Float(*f),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expr::Var(name, _) => env
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
            Expr::SelfRef(_) => Ok(host.receiver()),
            Expr::Array(items, _) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(host, env, item)?);
                }
                Ok(Value::Array(values))
            }
            Expr::Object(entries, _) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let value = self.eval(host, env, value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            Expr::BinOp {
                op: BinOp::And,
                left,
                right,
                ..
            } => {
                let truthy = self.eval(host, env, left)?.is_truthy()
                    && self.eval(host, env, right)?.is_truthy();
                Ok(Value::Bool(truthy))
            }
            Expr::BinOp {
                op: BinOp::Or,
                left,
                right,
                ..
            } => {
                let truthy = self.eval(host, env, left)?.is_truthy()
                    || self.eval(host, env, right)?.is_truthy();
                Ok(Value::Bool(truthy))
            }
            Expr::BinOp {
                op, left, right, ..
            } => {
                let lhs = self.eval(host, env, left)?;
                let rhs = self.eval(host, env, right)?;
                binary(*op, lhs, rhs)
            }
            Expr::UnOp { op, expr, .. } => {
                let value = self.eval(host, env, expr)?;
                match (op, value) {
                    (UnOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (UnOp::Neg, Value::Int(n)) => n
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or(RuntimeError::IntegerOverflow("-")),
                    (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                    (UnOp::Neg, other) => Err(RuntimeError::type_error(format!(
                        "cannot negate {}",
                        other.type_name()
                    ))),
                }
            }
            Expr::Call { callee, args, .. } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(host, env, arg)?);
                }
                self.call(host, callee, values)
            }
            Expr::Index { target, index, .. } => {
                let target = self.eval(host, env, target)?;
                let index = self.eval(host, env, index)?;
                index_value(target, index)
            }
            Expr::Field { target, name, .. } => match self.eval(host, env, target)? {
                Value::Object(mut map) => Ok(map.swap_remove(name).unwrap_or_default()),
                other => Err(RuntimeError::type_error(format!(
                    "no field '{}' on {}",
                    name,
                    other.type_name()
                ))),
            },
        }
    }

    /// Helpers shadow built-ins
    fn call(
        &mut self,
        host: &mut dyn ScriptHost,
        callee: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let program = self.program;
        if let Some(def) = program.helper(callee) {
            return self.call_function(host, def, callee, args);
        }
        match BUILTINS.get(callee) {
            Some(builtin) => builtin.call(host, args),
            None => Err(RuntimeError::UndefinedFunction(callee.to_string())),
        }
    }
}

fn index_value(
    target: Value,
    index: Value,
) -> Result<Value, RuntimeError> {
    match (target, index) {
        (Value::Array(mut items), Value::Int(i)) => {
            let len = items.len();
            match usize::try_from(i) {
                Ok(idx) if idx < len => Ok(items.swap_remove(idx)),
                _ => Err(RuntimeError::IndexOutOfBounds { index: i, len }),
            }
        }
        (Value::String(s), Value::Int(i)) => {
            let len = s.chars().count();
            usize::try_from(i)
                .ok()
                .and_then(|idx| s.chars().nth(idx))
                .map(|c| Value::String(c.to_string()))
                .ok_or(RuntimeError::IndexOutOfBounds { index: i, len })
        }
        (Value::Object(mut map), Value::String(key)) => {
            Ok(map.swap_remove(&key).unwrap_or_default())
        }
        (target, index) => Err(RuntimeError::type_error(format!(
            "cannot index {} with {}",
            target.type_name(),
            index.type_name()
        ))),
    }
}

fn binary(
    op: BinOp,
    lhs: Value,
    rhs: Value,
) -> Result<Value, RuntimeError> {
    use Value::*;

    match op {
        BinOp::Eq => return Ok(Bool(values_equal(&lhs, &rhs))),
        BinOp::Neq => return Ok(Bool(!values_equal(&lhs, &rhs))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => return compare(op, &lhs, &rhs),
        _ => {}
    }

    match (op, lhs, rhs) {
        (BinOp::Add, String(a), b) => Ok(String(a + &b.to_display_string())),
        (BinOp::Add, a, String(b)) => Ok(String(a.to_display_string() + &b)),
        (BinOp::Add, Array(mut a), Array(b)) => {
            a.extend(b);
            Ok(Array(a))
        }
        (op, Int(a), Int(b)) => int_arith(op, a, b),
        (op, a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Float(match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                BinOp::Div => x / y,
                BinOp::Rem => x % y,
                _ => unreachable!("comparison and logic handled above"),
            })),
            _ => Err(RuntimeError::type_error(format!(
                "unsupported operands for '{}': {} and {}",
                op.symbol(),
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

fn int_arith(
    op: BinOp,
    a: i64,
    b: i64,
) -> Result<Value, RuntimeError> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div | BinOp::Rem if b == 0 => return Err(RuntimeError::DivisionByZero),
        BinOp::Div => a.checked_div(b),
        BinOp::Rem => a.checked_rem(b),
        _ => unreachable!("comparison and logic handled above"),
    };
    result
        .map(Value::Int)
        .ok_or(RuntimeError::IntegerOverflow(op.symbol()))
}

/// Structural equality; ints and floats compare numerically
fn values_equal(
    a: &Value,
    b: &Value,
) -> bool {
    match (a, b) {
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            a.as_f64() == b.as_f64()
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).map(|w| values_equal(v, w)).unwrap_or(false))
        }
        _ => a == b,
    }
}

fn compare(
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, RuntimeError> {
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => {
                return Err(RuntimeError::type_error(format!(
                    "cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                )))
            }
        },
    };
    // NaN compares false on every operator
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!("only ordering operators reach compare"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::RecordingHost;
    use serde_json::json;

    fn program(methods: &str) -> Program {
        Program::parse(methods).unwrap()
    }

    fn run(
        source: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let program = program(source);
        let mut host = RecordingHost::default();
        Interpreter::new(&program, 64).invoke(&mut host, method, args)
    }

    #[test]
    fn test_echo_posts_reply() {
        let program = program("methods = { 'echo': fn(x) { done('reply', x) } };");
        let mut host = RecordingHost::default();
        Interpreter::new(&program, 64)
            .invoke(&mut host, "echo", vec![Value::Int(42)])
            .unwrap();
        assert_eq!(host.posted, vec![json!({"fn": "reply", "response": [42]})]);
    }

    #[test]
    fn test_unknown_method() {
        assert_eq!(
            run("methods = {};", "nope", vec![]),
            Err(RuntimeError::UnknownMethod("nope".to_string()))
        );
    }

    #[test]
    fn test_missing_args_bind_null_and_extra_ignored() {
        let src = "methods = { 'f': fn(a, b) { return [a, b]; } };";
        assert_eq!(
            run(src, "f", vec![Value::Int(1)]),
            Ok(Value::Array(vec![Value::Int(1), Value::Null]))
        );
        assert_eq!(
            run(src, "f", vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            Ok(Value::Array(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn test_helpers_and_recursion() {
        let src = r#"
            fn fib(n) { if n < 2 { return n; } return fib(n - 1) + fib(n - 2); }
            methods = { 'fib': fn(n) { return fib(n); } };
        "#;
        assert_eq!(run(src, "fib", vec![Value::Int(15)]), Ok(Value::Int(610)));
    }

    #[test]
    fn test_helper_shadows_builtin() {
        let src = "fn len(x) { return 99; } methods = { 'm': fn() { return len([]); } };";
        assert_eq!(run(src, "m", vec![]), Ok(Value::Int(99)));
    }

    #[test]
    fn test_loops_and_assignment() {
        let src = r#"
            methods = { 'm': fn(items) {
                let total = 0;
                let seen = {};
                for x in items {
                    if x == 3 { continue; }
                    if x > 5 { break; }
                    total = total + x;
                    seen[str(x)] = true;
                }
                let i = 0;
                while i < 3 { i = i + 1; }
                return { total: total, seen: keys(seen), i: i };
            } };
        "#;
        let args = vec![Value::from(json!([1, 2, 3, 4, 6, 7]))];
        assert_eq!(
            run(src, "m", args).unwrap().to_json(),
            json!({"total": 7, "seen": ["1", "2", "4"], "i": 3})
        );
    }

    #[test]
    fn test_nested_place_assignment() {
        let src = r#"
            methods = { 'm': fn() {
                let o = { list: [1, 2, 3] };
                o.list[1] = 'two';
                o.extra = null;
                return o;
            } };
        "#;
        assert_eq!(
            run(src, "m", vec![]).unwrap().to_json(),
            json!({"list": [1, "two", 3], "extra": null})
        );
    }

    #[test]
    fn test_value_semantics() {
        let src = r#"
            methods = { 'm': fn() {
                let a = [1];
                let b = a;
                b[0] = 2;
                return a[0];
            } };
        "#;
        assert_eq!(run(src, "m", vec![]), Ok(Value::Int(1)));
    }

    #[test]
    fn test_block_scoping() {
        let src = r#"
            methods = { 'm': fn() {
                let x = 1;
                if true { let x = 2; }
                return x;
            } };
        "#;
        assert_eq!(run(src, "m", vec![]), Ok(Value::Int(1)));
    }

    #[test]
    fn test_arithmetic() {
        let src = "methods = { 'm': fn(a, b) { return a / b; } };";
        assert_eq!(run(src, "m", vec![Value::Int(7), Value::Int(2)]), Ok(Value::Int(3)));
        assert_eq!(
            run(src, "m", vec![Value::Int(7), Value::Float(2.0)]),
            Ok(Value::Float(3.5))
        );
        assert_eq!(
            run(src, "m", vec![Value::Int(1), Value::Int(0)]),
            Err(RuntimeError::DivisionByZero)
        );

        let src = "methods = { 'm': fn(a, b) { return a + b; } };";
        assert_eq!(
            run(src, "m", vec![Value::from("n="), Value::Int(1)]),
            Ok(Value::from("n=1"))
        );
        assert_eq!(
            run(src, "m", vec![Value::Int(i64::MAX), Value::Int(1)]),
            Err(RuntimeError::IntegerOverflow("+"))
        );
        assert!(matches!(
            run(src, "m", vec![Value::Null, Value::Int(1)]),
            Err(RuntimeError::Type(_))
        ));
    }

    #[test]
    fn test_logic_yields_booleans() {
        let src = "methods = { 'm': fn(a, b) { return [a && b, a || b, !a]; } };";
        assert_eq!(
            run(src, "m", vec![Value::Int(1), Value::from("")]).unwrap().to_json(),
            json!([false, true, false])
        );
    }

    #[test]
    fn test_short_circuit_skips_right_side() {
        let src = "methods = { 'm': fn() { return false && fail('evaluated'); } };";
        assert_eq!(run(src, "m", vec![]), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_equality_and_comparison() {
        let src = "methods = { 'm': fn(a, b) { return [a == b, a < b]; } };";
        assert_eq!(
            run(src, "m", vec![Value::Int(1), Value::Float(1.0)]).unwrap().to_json(),
            json!([true, false])
        );
        assert_eq!(
            run(src, "m", vec![Value::from("a"), Value::from("b")]).unwrap().to_json(),
            json!([false, true])
        );
        assert!(run(src, "m", vec![Value::from("a"), Value::Int(1)]).is_err());
    }

    #[test]
    fn test_indexing() {
        let src = "methods = { 'm': fn(x, i) { return x[i]; } };";
        assert_eq!(
            run(src, "m", vec![Value::from("héllo"), Value::Int(1)]),
            Ok(Value::from("é"))
        );
        assert_eq!(
            run(src, "m", vec![Value::from(json!({"a": 1})), Value::from("b")]),
            Ok(Value::Null)
        );
        assert_eq!(
            run(src, "m", vec![Value::from(json!([1])), Value::Int(-1)]),
            Err(RuntimeError::IndexOutOfBounds { index: -1, len: 1 })
        );
    }

    #[test]
    fn test_free_variable_is_undefined() {
        let src = "methods = { 'm': fn() { return captured; } };";
        assert_eq!(
            run(src, "m", vec![]),
            Err(RuntimeError::UndefinedVariable("captured".to_string()))
        );
        let src = "methods = { 'm': fn() { undeclared = 1; } };";
        assert_eq!(
            run(src, "m", vec![]),
            Err(RuntimeError::UndefinedVariable("undeclared".to_string()))
        );
        let src = "methods = { 'm': fn() { nothing(); } };";
        assert_eq!(
            run(src, "m", vec![]),
            Err(RuntimeError::UndefinedFunction("nothing".to_string()))
        );
    }

    #[test]
    fn test_call_depth_limit() {
        let src = "fn down(n) { return down(n + 1); } methods = { 'm': fn() { return down(0); } };";
        assert_eq!(run(src, "m", vec![]), Err(RuntimeError::CallDepthExceeded(64)));
    }

    #[test]
    fn test_stray_break() {
        let src = "methods = { 'm': fn() { break; } };";
        assert_eq!(run(src, "m", vec![]), Err(RuntimeError::StrayControlFlow("break")));
    }

    #[test]
    fn test_self_is_receiver() {
        let program = program("methods = { 'who': fn() { done('who', self.name) } };");
        let mut host = RecordingHost {
            receiver: Value::from(json!({"name": "w1", "id": 1})),
            ..RecordingHost::default()
        };
        Interpreter::new(&program, 8)
            .invoke(&mut host, "who", vec![])
            .unwrap();
        assert_eq!(host.posted, vec![json!({"fn": "who", "response": ["w1"]})]);
    }

    #[test]
    fn test_terminated_host_stops_before_first_statement() {
        let program = program("methods = { 'm': fn() { done('m') } };");
        let mut host = RecordingHost {
            terminated: true,
            ..RecordingHost::default()
        };
        let result = Interpreter::new(&program, 8).invoke(&mut host, "m", vec![]);
        assert_eq!(result, Err(RuntimeError::Terminated));
        assert!(host.posted.is_empty());
    }
}
