//! 内置函数注册表
//!
//! 所有 worker 程序无需声明 helper 即可按名调用的函数。
//! `done` 负责回传 `{fn, response}` 消息，其余函数用于处理参数。

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;

use crate::protocol::WorkerMessage;
use crate::runtime::errors::RuntimeError;
use crate::runtime::value::Value;
use crate::runtime::ScriptHost;

/// Upper bound on arrays produced by `range`
const MAX_RANGE_LEN: i64 = 1_000_000;

type BuiltinFn = fn(&mut dyn ScriptHost, Vec<Value>) -> Result<Value, RuntimeError>;

/// Built-in function definition
pub struct Builtin {
    /// Function name
    pub name: &'static str,
    /// Minimum argument count
    pub min_args: usize,
    /// Maximum argument count, `None` for variadic
    pub max_args: Option<usize>,
    /// Implementation
    pub func: BuiltinFn,
}

impl Builtin {
    /// Check arity, then run
    pub fn call(
        &self,
        host: &mut dyn ScriptHost,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let too_few = args.len() < self.min_args;
        let too_many = self.max_args.map(|max| args.len() > max).unwrap_or(false);
        if too_few || too_many {
            let expected = match self.max_args {
                Some(max) if max == self.min_args => max.to_string(),
                Some(max) => format!("{}..={}", self.min_args, max),
                None => format!("at least {}", self.min_args),
            };
            return Err(RuntimeError::Arity {
                function: self.name.to_string(),
                expected,
                got: args.len(),
            });
        }
        (self.func)(host, args)
    }
}

/// Built-in function registry
pub static BUILTINS: Lazy<BuiltinRegistry> = Lazy::new(|| {
    let mut registry = BuiltinRegistry::default();
    registry.init_builtins();
    registry
});

/// Registry type
#[derive(Default)]
pub struct BuiltinRegistry {
    functions: HashMap<&'static str, Builtin>,
}

impl BuiltinRegistry {
    pub fn register(
        &mut self,
        builtin: Builtin,
    ) {
        self.functions.insert(builtin.name, builtin);
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Builtin> {
        self.functions.get(name)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.functions.contains_key(name)
    }

    fn add(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        func: BuiltinFn,
    ) {
        self.register(Builtin {
            name,
            min_args,
            max_args,
            func,
        });
    }

    fn init_builtins(&mut self) {
        // protocol
        self.add("done", 1, None, builtin_done);
        self.add("log", 0, None, builtin_log);
        self.add("sleep", 1, Some(1), builtin_sleep);
        self.add("fail", 1, Some(1), builtin_fail);

        // collections
        self.add("len", 1, Some(1), builtin_len);
        self.add("push", 2, Some(2), builtin_push);
        self.add("keys", 1, Some(1), builtin_keys);
        self.add("range", 1, Some(2), builtin_range);
        self.add("join", 2, Some(2), builtin_join);
        self.add("split", 2, Some(2), builtin_split);
        self.add("contains", 2, Some(2), builtin_contains);

        // conversion
        self.add("str", 1, Some(1), builtin_str);
        self.add("int", 1, Some(1), builtin_int);
        self.add("float", 1, Some(1), builtin_float);
        self.add("type_of", 1, Some(1), builtin_type_of);

        // math
        self.add("abs", 1, Some(1), builtin_abs);
        self.add("min", 2, Some(2), builtin_min);
        self.add("max", 2, Some(2), builtin_max);
    }
}

// === protocol ===

/// `done(method, ...results)` posts `{fn: method, response: [...results]}`
fn builtin_done(
    host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let mut args = args.into_iter();
    let method = match args.next() {
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(RuntimeError::type_error(format!(
                "done() expects a method name string, got {}",
                other.type_name()
            )))
        }
        None => return Err(RuntimeError::type_error("done() expects a method name")),
    };
    let message = WorkerMessage {
        method,
        response: args.map(|v| v.to_json()).collect(),
    };
    host.post(message.to_payload());
    Ok(Value::Null)
}

fn builtin_log(
    host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let line: Vec<String> = args.iter().map(Value::to_display_string).collect();
    host.log(&line.join(" "));
    Ok(Value::Null)
}

fn builtin_sleep(
    host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let ms = match &args[0] {
        Value::Int(n) if *n >= 0 => *n as u64,
        Value::Float(f) if *f >= 0.0 => *f as u64,
        other => {
            return Err(RuntimeError::type_error(format!(
                "sleep() expects a non-negative number, got {}",
                other
            )))
        }
    };
    if host.sleep(Duration::from_millis(ms)) {
        Ok(Value::Null)
    } else {
        Err(RuntimeError::Terminated)
    }
}

fn builtin_fail(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    Err(RuntimeError::Failed(args[0].to_display_string()))
}

// === collections ===

fn builtin_len(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(RuntimeError::type_error(format!(
                "len() of {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(len as i64))
}

fn builtin_push(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(Value::Array(mut items)), Some(value)) => {
            items.push(value);
            Ok(Value::Array(items))
        }
        (Some(other), _) => Err(RuntimeError::type_error(format!(
            "push() expects an array, got {}",
            other.type_name()
        ))),
        _ => Err(RuntimeError::type_error("push() expects two arguments")),
    }
}

fn builtin_keys(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Object(map) => Ok(Value::Array(
            map.keys().map(|k| Value::String(k.clone())).collect(),
        )),
        other => Err(RuntimeError::type_error(format!(
            "keys() expects an object, got {}",
            other.type_name()
        ))),
    }
}

fn builtin_range(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let bound = |v: &Value| match v {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeError::type_error(format!(
            "range() expects integers, got {}",
            other.type_name()
        ))),
    };
    let (start, end) = match args.as_slice() {
        [end] => (0, bound(end)?),
        [start, end] => (bound(start)?, bound(end)?),
        _ => unreachable!("arity checked by registry"),
    };
    if end.saturating_sub(start) > MAX_RANGE_LEN {
        return Err(RuntimeError::Failed(format!(
            "range() longer than {} elements",
            MAX_RANGE_LEN
        )));
    }
    Ok(Value::Array((start..end).map(Value::Int).collect()))
}

fn builtin_join(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match (&args[0], &args[1]) {
        (Value::Array(items), Value::String(sep)) => Ok(Value::String(
            items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(sep),
        )),
        _ => Err(RuntimeError::type_error(
            "join() expects an array and a separator string",
        )),
    }
}

fn builtin_split(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match (&args[0], &args[1]) {
        (Value::String(s), Value::String(sep)) if !sep.is_empty() => Ok(Value::Array(
            s.split(sep.as_str()).map(Value::from).collect(),
        )),
        _ => Err(RuntimeError::type_error(
            "split() expects a string and a non-empty separator",
        )),
    }
}

fn builtin_contains(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let found = match (&args[0], &args[1]) {
        (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
        (Value::Array(items), needle) => items.iter().any(|item| item == needle),
        (Value::Object(map), Value::String(key)) => map.contains_key(key),
        (other, _) => {
            return Err(RuntimeError::type_error(format!(
                "contains() on {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Bool(found))
}

// === conversion ===

fn builtin_str(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].to_display_string()))
}

fn builtin_int(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
            Ok(Value::Int(f.trunc() as i64))
        }
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| RuntimeError::type_error(format!("cannot convert {:?} to int", s))),
        other => Err(RuntimeError::type_error(format!(
            "cannot convert {} to int",
            other
        ))),
    }
}

fn builtin_float(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Value::Float)
            .map_err(|_| RuntimeError::type_error(format!("cannot convert {:?} to float", s))),
        other => Err(RuntimeError::type_error(format!(
            "cannot convert {} to float",
            other
        ))),
    }
}

fn builtin_type_of(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    Ok(Value::from(args[0].type_name()))
}

// === math ===

fn builtin_abs(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or(RuntimeError::IntegerOverflow("abs")),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(RuntimeError::type_error(format!(
            "abs() of {}",
            other.type_name()
        ))),
    }
}

fn builtin_min(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    pick(args, "min", |a, b| a <= b)
}

fn builtin_max(
    _host: &mut dyn ScriptHost,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    pick(args, "max", |a, b| a >= b)
}

/// Keep the first argument when `keep_first(a, b)`, comparing numerically
fn pick(
    args: Vec<Value>,
    name: &str,
    keep_first: fn(f64, f64) -> bool,
) -> Result<Value, RuntimeError> {
    let mut args = args.into_iter();
    let (a, b) = match (args.next(), args.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => unreachable!("arity checked by registry"),
    };
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(if keep_first(x, y) { a } else { b }),
        _ => Err(RuntimeError::type_error(format!(
            "{}() expects numbers",
            name
        ))),
    }
}
