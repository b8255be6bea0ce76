//! Methods reachable through attribute lookup on strings and lists
//!
//! Each method is a native whose first argument is the receiver; attribute
//! lookup binds the receiver so the call site only passes the rest.

use crate::error::OpError;
use crate::ops::{collect_items, order_values};
use crate::value::{NativeFunction, Value};
use std::cmp::Ordering;

type Method = fn(&[Value]) -> Result<Value, OpError>;

/// Bound method `name` of `object`, if it has one
pub(crate) fn lookup(object: &Value, name: &str) -> Option<Value> {
    let method: Method = match (object, name) {
        (Value::Str(_), "upper") => str_upper,
        (Value::Str(_), "lower") => str_lower,
        (Value::Str(_), "strip") => str_strip,
        (Value::Str(_), "split") => str_split,
        (Value::Str(_), "join") => str_join,
        (Value::Str(_), "startswith") => str_startswith,
        (Value::List(_), "append") => list_append,
        (Value::List(_), "extend") => list_extend,
        (Value::List(_), "pop") => list_pop,
        (Value::List(_), "reverse") => list_reverse,
        (Value::List(_), "sort") => list_sort,
        (Value::List(_), "index") => list_index,
        (Value::List(_), "count") => list_count,
        _ => return None,
    };
    let native = NativeFunction::new(name.to_string(), method).bind(object.clone());
    Some(Value::Callable(crate::value::Callable::Native(native)))
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), OpError> {
    // Receiver is args[0] and is not counted
    let given = args.len().saturating_sub(1);
    if given < min || given > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{} to {}", min, max)
        };
        return Err(OpError::Arity {
            name: name.to_string(),
            expected,
            got: given,
        });
    }
    Ok(())
}

fn receiver_str<'a>(args: &'a [Value]) -> Result<&'a str, OpError> {
    match args.first() {
        Some(Value::Str(s)) => Ok(&**s),
        Some(other) => Err(OpError::type_error("str method", "str", other.type_name())),
        None => Err(OpError::type_error("str method", "str", "nothing")),
    }
}

fn receiver_list(args: &[Value]) -> Result<&crate::sync::Shared<Vec<Value>>, OpError> {
    match args.first() {
        Some(Value::List(items)) => Ok(items),
        Some(other) => Err(OpError::type_error("list method", "list", other.type_name())),
        None => Err(OpError::type_error("list method", "list", "nothing")),
    }
}

fn str_arg<'a>(operation: &str, value: &'a Value) -> Result<&'a str, OpError> {
    value
        .as_str()
        .ok_or_else(|| OpError::type_error(operation, "str", value.type_name()))
}

fn str_upper(args: &[Value]) -> Result<Value, OpError> {
    arity("upper", args, 0, 0)?;
    Ok(Value::from(receiver_str(args)?.to_uppercase()))
}

fn str_lower(args: &[Value]) -> Result<Value, OpError> {
    arity("lower", args, 0, 0)?;
    Ok(Value::from(receiver_str(args)?.to_lowercase()))
}

fn str_strip(args: &[Value]) -> Result<Value, OpError> {
    arity("strip", args, 0, 0)?;
    Ok(Value::from(receiver_str(args)?.trim()))
}

fn str_split(args: &[Value]) -> Result<Value, OpError> {
    arity("split", args, 0, 1)?;
    let s = receiver_str(args)?;
    let parts: Vec<Value> = match args.get(1) {
        None | Some(Value::None) => s.split_whitespace().map(Value::from).collect(),
        Some(sep) => {
            let sep = str_arg("split", sep)?;
            if sep.is_empty() {
                return Err(OpError::Value("empty separator".to_string()));
            }
            s.split(sep).map(Value::from).collect()
        }
    };
    Ok(Value::list(parts))
}

fn str_join(args: &[Value]) -> Result<Value, OpError> {
    arity("join", args, 1, 1)?;
    let sep = receiver_str(args)?;
    let items = collect_items(&args[1])?;
    let mut parts = Vec::with_capacity(items.len());
    for item in &items {
        parts.push(str_arg("join", item)?);
    }
    Ok(Value::from(parts.join(sep)))
}

fn str_startswith(args: &[Value]) -> Result<Value, OpError> {
    arity("startswith", args, 1, 1)?;
    let s = receiver_str(args)?;
    Ok(Value::Bool(s.starts_with(str_arg("startswith", &args[1])?)))
}

fn list_append(args: &[Value]) -> Result<Value, OpError> {
    arity("append", args, 1, 1)?;
    receiver_list(args)?.write().push(args[1].clone());
    Ok(Value::None)
}

fn list_extend(args: &[Value]) -> Result<Value, OpError> {
    arity("extend", args, 1, 1)?;
    // Collect first: extending a list with itself must not hold two locks
    let items = collect_items(&args[1])?;
    receiver_list(args)?.write().extend(items);
    Ok(Value::None)
}

fn list_pop(args: &[Value]) -> Result<Value, OpError> {
    arity("pop", args, 0, 1)?;
    let list = receiver_list(args)?;
    let mut items = list.write();
    if items.is_empty() {
        return Err(OpError::Index("pop from empty list"));
    }
    let len = items.len() as i64;
    let index = match args.get(1) {
        None => len - 1,
        Some(value) => {
            let index = value
                .as_int()
                .ok_or_else(|| OpError::type_error("pop", "int", value.type_name()))?;
            if index < 0 {
                index + len
            } else {
                index
            }
        }
    };
    if index < 0 || index >= len {
        return Err(OpError::Index("pop"));
    }
    Ok(items.remove(index as usize))
}

fn list_reverse(args: &[Value]) -> Result<Value, OpError> {
    arity("reverse", args, 0, 0)?;
    receiver_list(args)?.write().reverse();
    Ok(Value::None)
}

fn list_sort(args: &[Value]) -> Result<Value, OpError> {
    arity("sort", args, 0, 0)?;
    let list = receiver_list(args)?;
    let mut items = list.read().clone();
    sort_values(&mut items)?;
    *list.write() = items;
    Ok(Value::None)
}

fn list_index(args: &[Value]) -> Result<Value, OpError> {
    arity("index", args, 1, 1)?;
    let items = receiver_list(args)?.read().clone();
    for (i, item) in items.iter().enumerate() {
        if item.try_eq(&args[1])? {
            return Ok(Value::Int(i as i64));
        }
    }
    Err(OpError::Value(format!("{} is not in list", args[1].repr())))
}

fn list_count(args: &[Value]) -> Result<Value, OpError> {
    arity("count", args, 1, 1)?;
    let items = receiver_list(args)?.read().clone();
    let mut count = 0;
    for item in &items {
        if item.try_eq(&args[1])? {
            count += 1;
        }
    }
    Ok(Value::Int(count))
}

/// Stable ascending sort; the first failed comparison is reported
pub(crate) fn sort_values(items: &mut [Value]) -> Result<(), OpError> {
    let mut failure = None;
    items.sort_by(|a, b| match order_values("<", a, b) {
        Ok(ordering) => ordering.unwrap_or(Ordering::Equal),
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
