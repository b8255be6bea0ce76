//! Standard native operations that callers can pre-populate globals with

use crate::error::OpError;
use crate::methods::sort_values;
use crate::ops::{collect_items, is_truthy, order_values, BinaryOp, StandardOps, ValueOps};
use crate::value::{Namespace, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

type Builtin = fn(&[Value]) -> Result<Value, OpError>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("range", builtin_range),
    ("len", builtin_len),
    ("abs", builtin_abs),
    ("min", builtin_min),
    ("max", builtin_max),
    ("sum", builtin_sum),
    ("str", builtin_str),
    ("int", builtin_int),
    ("bool", builtin_bool),
    ("list", builtin_list),
    ("tuple", builtin_tuple),
    ("sorted", builtin_sorted),
];

/// All standard natives keyed by name
pub fn builtins() -> HashMap<String, Value> {
    BUILTINS
        .iter()
        .map(|(name, func)| (name.to_string(), Value::native(name, *func)))
        .collect()
}

/// Insert the standard natives into `globals`, keeping existing bindings
pub fn install(globals: &Namespace) {
    let mut globals = globals.write();
    for (name, value) in builtins() {
        globals.entry(name).or_insert(value);
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), OpError> {
    if args.len() < min || args.len() > max {
        let expected = match (min, max) {
            (min, max) if min == max => min.to_string(),
            (min, usize::MAX) => format!("at least {}", min),
            (min, max) => format!("{} to {}", min, max),
        };
        return Err(OpError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn int_arg(name: &str, value: &Value) -> Result<i64, OpError> {
    value
        .as_int()
        .ok_or_else(|| OpError::type_error(name, "int", value.type_name()))
}

fn builtin_range(args: &[Value]) -> Result<Value, OpError> {
    arity("range", args, 1, 3)?;
    let (start, stop, step) = match args {
        [stop] => (0, int_arg("range", stop)?, 1),
        [start, stop] => (int_arg("range", start)?, int_arg("range", stop)?, 1),
        [start, stop, step] => (
            int_arg("range", start)?,
            int_arg("range", stop)?,
            int_arg("range", step)?,
        ),
        _ => unreachable!("arity checked above"),
    };
    if step == 0 {
        return Err(OpError::Value("range() step argument must not be zero".to_string()));
    }
    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::list(items))
}

fn builtin_len(args: &[Value]) -> Result<Value, OpError> {
    arity("len", args, 1, 1)?;
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.read().len(),
        Value::Tuple(items) => items.len(),
        other => {
            return Err(OpError::type_error("len", "sized value", other.type_name()));
        }
    };
    Ok(Value::Int(len as i64))
}

fn builtin_abs(args: &[Value]) -> Result<Value, OpError> {
    arity("abs", args, 1, 1)?;
    match &args[0] {
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Int(n) => n.checked_abs().map(Value::Int).ok_or(OpError::Overflow("abs")),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(OpError::type_error("abs", "number", other.type_name())),
    }
}

/// Candidates for min/max: a single iterable argument or the arguments themselves
fn candidates(name: &str, args: &[Value]) -> Result<Vec<Value>, OpError> {
    arity(name, args, 1, usize::MAX)?;
    let items = if args.len() == 1 {
        collect_items(&args[0])?
    } else {
        args.to_vec()
    };
    if items.is_empty() {
        return Err(OpError::Value(format!("{}() arg is an empty sequence", name)));
    }
    Ok(items)
}

fn extreme(name: &'static str, args: &[Value], keep: Ordering) -> Result<Value, OpError> {
    let mut items = candidates(name, args)?.into_iter();
    let mut best = items.next().unwrap_or(Value::None);
    for item in items {
        if order_values(name, &item, &best)? == Some(keep) {
            best = item;
        }
    }
    Ok(best)
}

fn builtin_min(args: &[Value]) -> Result<Value, OpError> {
    extreme("min", args, Ordering::Less)
}

fn builtin_max(args: &[Value]) -> Result<Value, OpError> {
    extreme("max", args, Ordering::Greater)
}

fn builtin_sum(args: &[Value]) -> Result<Value, OpError> {
    arity("sum", args, 1, 2)?;
    let mut total = args.get(1).cloned().unwrap_or(Value::Int(0));
    for item in collect_items(&args[0])? {
        total = StandardOps.binary(BinaryOp::Add, &total, &item)?;
    }
    Ok(total)
}

fn builtin_str(args: &[Value]) -> Result<Value, OpError> {
    arity("str", args, 0, 1)?;
    Ok(Value::from(
        args.first().map(|v| v.to_string()).unwrap_or_default(),
    ))
}

fn builtin_int(args: &[Value]) -> Result<Value, OpError> {
    arity("int", args, 0, 1)?;
    match args.first() {
        None => Ok(Value::Int(0)),
        Some(Value::Bool(b)) => Ok(Value::Int(*b as i64)),
        Some(Value::Int(n)) => Ok(Value::Int(*n)),
        Some(Value::Float(x)) => {
            let truncated = x.trunc();
            if truncated.is_finite() && truncated.abs() < 9.2e18 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(OpError::Overflow("int"))
            }
        }
        Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            OpError::Value(format!("invalid literal for int(): {}", Value::Str(s.clone()).repr()))
        }),
        Some(other) => Err(OpError::type_error("int", "number or str", other.type_name())),
    }
}

fn builtin_bool(args: &[Value]) -> Result<Value, OpError> {
    arity("bool", args, 0, 1)?;
    Ok(Value::Bool(args.first().map(is_truthy).unwrap_or(false)))
}

fn builtin_list(args: &[Value]) -> Result<Value, OpError> {
    arity("list", args, 0, 1)?;
    match args.first() {
        None => Ok(Value::list(Vec::new())),
        Some(iterable) => Ok(Value::list(collect_items(iterable)?)),
    }
}

fn builtin_tuple(args: &[Value]) -> Result<Value, OpError> {
    arity("tuple", args, 0, 1)?;
    match args.first() {
        None => Ok(Value::tuple(Vec::new())),
        Some(Value::Tuple(items)) => Ok(Value::Tuple(items.clone())),
        Some(iterable) => Ok(Value::tuple(collect_items(iterable)?)),
    }
}

fn builtin_sorted(args: &[Value]) -> Result<Value, OpError> {
    arity("sorted", args, 1, 1)?;
    let mut items = collect_items(&args[0])?;
    sort_values(&mut items)?;
    Ok(Value::list(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Callable;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, OpError> {
        match builtins().remove(name) {
            Some(Value::Callable(Callable::Native(native))) => native.invoke(args),
            other => panic!("{} is not a native: {:?}", name, other),
        }
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", vec![Value::Int(4)]).unwrap(), ints(&[0, 1, 2, 3]));
        assert_eq!(
            call("range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)]).unwrap(),
            ints(&[5, 3, 1])
        );
        assert!(call("range", vec![Value::Int(1), Value::Int(2), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(call("sum", vec![ints(&[1, 2, 3])]).unwrap(), Value::Int(6));
        assert_eq!(call("min", vec![ints(&[4, 2, 9])]).unwrap(), Value::Int(2));
        assert_eq!(
            call("max", vec![Value::Int(4), Value::Int(11), Value::Int(9)]).unwrap(),
            Value::Int(11)
        );
        assert!(call("max", vec![ints(&[])]).is_err());
        assert_eq!(call("len", vec![Value::from("héllo")]).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("int", vec![Value::from(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(call("int", vec![Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert!(call("int", vec![Value::from("x")]).is_err());
        assert_eq!(call("str", vec![Value::Int(7)]).unwrap(), Value::from("7"));
        assert_eq!(call("bool", vec![Value::from("")]).unwrap(), Value::Bool(false));
        assert_eq!(
            call("sorted", vec![Value::tuple(vec![Value::Int(2), Value::Int(1)])]).unwrap(),
            ints(&[1, 2])
        );
    }

    #[test]
    fn test_install_keeps_existing_bindings() {
        let globals = crate::value::namespace();
        globals.write().insert("len".to_string(), Value::Int(0));
        install(&globals);
        let globals = globals.read();
        assert_eq!(globals.get("len"), Some(&Value::Int(0)));
        assert!(globals.contains_key("range"));
    }
}
