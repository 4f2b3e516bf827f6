//! Method implementations for the sandbox value types.
//!
//! Values are plain data, so mutating methods (`list.append`, `dict.pop`)
//! cannot mutate in place; they hand the evaluator an updated receiver to
//! write back through the variable the call was made on.

use crate::builtins::sort_values;
use crate::error::{Error, Result};
use crate::value::PyValue;

/// Outcome of a method call.
pub struct MethodOutcome {
    /// The value the call evaluates to.
    pub returned: PyValue,
    /// Replacement receiver, present when the method mutates.
    pub updated: Option<PyValue>,
}

impl MethodOutcome {
    fn value(returned: PyValue) -> Self {
        Self {
            returned,
            updated: None,
        }
    }

    fn mutation(returned: PyValue, updated: PyValue) -> Self {
        Self {
            returned,
            updated: Some(updated),
        }
    }
}

/// Dispatch `receiver.method(args)`.
pub fn call_method(receiver: PyValue, method: &str, args: Vec<PyValue>) -> Result<MethodOutcome> {
    match receiver {
        PyValue::Str(s) => call_str_method(&s, method, args).map(MethodOutcome::value),
        PyValue::List(items) => call_list_method(items, method, args),
        PyValue::Tuple(items) => call_tuple_method(&items, method, args).map(MethodOutcome::value),
        PyValue::Dict(pairs) => call_dict_method(pairs, method, args),
        other => Err(Error::Unsupported(format!(
            "attribute access: {}.{}",
            other.type_name(),
            method
        ))),
    }
}

pub(crate) fn check_args(name: &str, args: &[PyValue], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::Runtime(format!(
            "{name}() takes exactly {expected} argument{}",
            if expected == 1 { "" } else { "s" }
        )));
    }
    Ok(())
}

pub(crate) fn check_args_range(name: &str, args: &[PyValue], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(Error::Runtime(format!(
            "{name}() takes {min} to {max} arguments"
        )));
    }
    Ok(())
}

pub(crate) fn arg_int(value: &PyValue) -> Result<i64> {
    value.as_int().ok_or_else(|| Error::Type {
        expected: "int".to_string(),
        got: value.type_name().to_string(),
    })
}

fn arg_str(value: &PyValue) -> Result<&str> {
    value.as_str().ok_or_else(|| Error::Type {
        expected: "str".to_string(),
        got: value.type_name().to_string(),
    })
}

fn call_str_method(s: &str, method: &str, args: Vec<PyValue>) -> Result<PyValue> {
    match method {
        "upper" => {
            check_args("upper", &args, 0)?;
            Ok(PyValue::Str(s.to_uppercase()))
        }
        "lower" => {
            check_args("lower", &args, 0)?;
            Ok(PyValue::Str(s.to_lowercase()))
        }
        "strip" => {
            check_args("strip", &args, 0)?;
            Ok(PyValue::Str(s.trim().to_string()))
        }
        "lstrip" => {
            check_args("lstrip", &args, 0)?;
            Ok(PyValue::Str(s.trim_start().to_string()))
        }
        "rstrip" => {
            check_args("rstrip", &args, 0)?;
            Ok(PyValue::Str(s.trim_end().to_string()))
        }
        "split" => {
            check_args_range("split", &args, 0, 1)?;
            let parts: Vec<PyValue> = match args.first() {
                Some(sep) => s
                    .split(arg_str(sep)?)
                    .map(|p| PyValue::Str(p.to_string()))
                    .collect(),
                None => s
                    .split_whitespace()
                    .map(|p| PyValue::Str(p.to_string()))
                    .collect(),
            };
            Ok(PyValue::List(parts))
        }
        "join" => {
            check_args("join", &args, 1)?;
            let items = crate::builtins::to_iterable_items(&args[0])?;
            let mut parts = Vec::with_capacity(items.len());
            for item in &items {
                parts.push(arg_str(item)?.to_string());
            }
            Ok(PyValue::Str(parts.join(s)))
        }
        "replace" => {
            check_args("replace", &args, 2)?;
            let from = arg_str(&args[0])?;
            let to = arg_str(&args[1])?;
            Ok(PyValue::Str(s.replace(from, to)))
        }
        "startswith" => {
            check_args("startswith", &args, 1)?;
            Ok(PyValue::Bool(s.starts_with(arg_str(&args[0])?)))
        }
        "endswith" => {
            check_args("endswith", &args, 1)?;
            Ok(PyValue::Bool(s.ends_with(arg_str(&args[0])?)))
        }
        "find" => {
            check_args("find", &args, 1)?;
            let needle = arg_str(&args[0])?;
            let index = s
                .find(needle)
                .map(|byte| s[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(PyValue::Int(index))
        }
        "count" => {
            check_args("count", &args, 1)?;
            let needle = arg_str(&args[0])?;
            if needle.is_empty() {
                return Ok(PyValue::Int(s.chars().count() as i64 + 1));
            }
            Ok(PyValue::Int(s.matches(needle).count() as i64))
        }
        "isdigit" => {
            check_args("isdigit", &args, 0)?;
            Ok(PyValue::Bool(
                !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
            ))
        }
        _ => Err(Error::Unsupported(format!("str method '{}'", method))),
    }
}

fn call_list_method(
    mut items: Vec<PyValue>,
    method: &str,
    args: Vec<PyValue>,
) -> Result<MethodOutcome> {
    match method {
        "append" => {
            check_args("append", &args, 1)?;
            items.push(args[0].clone());
            Ok(MethodOutcome::mutation(PyValue::None, PyValue::List(items)))
        }
        "extend" => {
            check_args("extend", &args, 1)?;
            items.extend(crate::builtins::to_iterable_items(&args[0])?);
            Ok(MethodOutcome::mutation(PyValue::None, PyValue::List(items)))
        }
        "insert" => {
            check_args("insert", &args, 2)?;
            let index = arg_int(&args[0])?;
            let position = normalize_insert_index(index, items.len());
            items.insert(position, args[1].clone());
            Ok(MethodOutcome::mutation(PyValue::None, PyValue::List(items)))
        }
        "pop" => {
            check_args_range("pop", &args, 0, 1)?;
            let index = match args.first() {
                Some(v) => arg_int(v)?,
                None => -1,
            };
            let len = items.len() as i64;
            let actual = if index < 0 { len + index } else { index };
            if actual < 0 || actual >= len {
                return Err(Error::Runtime("pop index out of range".to_string()));
            }
            let removed = items.remove(actual as usize);
            Ok(MethodOutcome::mutation(removed, PyValue::List(items)))
        }
        "remove" => {
            check_args("remove", &args, 1)?;
            match items.iter().position(|v| v == &args[0]) {
                Some(position) => {
                    items.remove(position);
                    Ok(MethodOutcome::mutation(PyValue::None, PyValue::List(items)))
                }
                None => Err(Error::Runtime(format!(
                    "list.remove(x): {} not in list",
                    args[0]
                ))),
            }
        }
        "reverse" => {
            check_args("reverse", &args, 0)?;
            items.reverse();
            Ok(MethodOutcome::mutation(PyValue::None, PyValue::List(items)))
        }
        "sort" => {
            check_args("sort", &args, 0)?;
            sort_values(&mut items)?;
            Ok(MethodOutcome::mutation(PyValue::None, PyValue::List(items)))
        }
        "count" => {
            check_args("count", &args, 1)?;
            let count = items.iter().filter(|v| *v == &args[0]).count();
            Ok(MethodOutcome::value(PyValue::Int(count as i64)))
        }
        "index" => {
            check_args("index", &args, 1)?;
            match items.iter().position(|v| v == &args[0]) {
                Some(position) => Ok(MethodOutcome::value(PyValue::Int(position as i64))),
                None => Err(Error::Runtime(format!("{} is not in list", args[0]))),
            }
        }
        _ => Err(Error::Unsupported(format!("list method '{}'", method))),
    }
}

fn normalize_insert_index(index: i64, len: usize) -> usize {
    if index < 0 {
        (len as i64 + index).max(0) as usize
    } else {
        (index as usize).min(len)
    }
}

fn call_tuple_method(items: &[PyValue], method: &str, args: Vec<PyValue>) -> Result<PyValue> {
    match method {
        "count" => {
            check_args("count", &args, 1)?;
            let count = items.iter().filter(|v| *v == &args[0]).count();
            Ok(PyValue::Int(count as i64))
        }
        "index" => {
            check_args("index", &args, 1)?;
            match items.iter().position(|v| v == &args[0]) {
                Some(position) => Ok(PyValue::Int(position as i64)),
                None => Err(Error::Runtime(format!("{} is not in tuple", args[0]))),
            }
        }
        _ => Err(Error::Unsupported(format!("tuple method '{}'", method))),
    }
}

fn call_dict_method(
    mut pairs: Vec<(String, PyValue)>,
    method: &str,
    args: Vec<PyValue>,
) -> Result<MethodOutcome> {
    match method {
        "get" => {
            check_args_range("get", &args, 1, 2)?;
            let key = arg_str(&args[0])?;
            let value = pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| args.get(1).cloned().unwrap_or(PyValue::None));
            Ok(MethodOutcome::value(value))
        }
        "keys" => {
            check_args("keys", &args, 0)?;
            Ok(MethodOutcome::value(PyValue::List(
                pairs.iter().map(|(k, _)| PyValue::Str(k.clone())).collect(),
            )))
        }
        "values" => {
            check_args("values", &args, 0)?;
            Ok(MethodOutcome::value(PyValue::List(
                pairs.iter().map(|(_, v)| v.clone()).collect(),
            )))
        }
        "items" => {
            check_args("items", &args, 0)?;
            Ok(MethodOutcome::value(PyValue::List(
                pairs
                    .iter()
                    .map(|(k, v)| PyValue::Tuple(vec![PyValue::Str(k.clone()), v.clone()]))
                    .collect(),
            )))
        }
        "pop" => {
            check_args_range("pop", &args, 1, 2)?;
            let key = arg_str(&args[0])?.to_string();
            match pairs.iter().position(|(k, _)| *k == key) {
                Some(position) => {
                    let (_, value) = pairs.remove(position);
                    Ok(MethodOutcome::mutation(value, PyValue::Dict(pairs)))
                }
                None => match args.get(1) {
                    Some(default) => Ok(MethodOutcome::value(default.clone())),
                    None => Err(Error::Runtime(format!("KeyError: '{}'", key))),
                },
            }
        }
        _ => Err(Error::Unsupported(format!("dict method '{}'", method))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_reports_the_updated_receiver() {
        let outcome = call_method(
            PyValue::List(vec![PyValue::Int(1)]),
            "append",
            vec![PyValue::Int(2)],
        )
        .unwrap();
        assert_eq!(outcome.returned, PyValue::None);
        assert_eq!(
            outcome.updated,
            Some(PyValue::List(vec![PyValue::Int(1), PyValue::Int(2)]))
        );
    }

    #[test]
    fn str_methods_do_not_mutate() {
        let outcome = call_method(PyValue::Str("  hi  ".into()), "strip", vec![]).unwrap();
        assert_eq!(outcome.returned, PyValue::Str("hi".into()));
        assert!(outcome.updated.is_none());
    }

    #[test]
    fn dict_get_falls_back_to_default() {
        let outcome = call_method(
            PyValue::Dict(vec![]),
            "get",
            vec![PyValue::Str("missing".into()), PyValue::Int(7)],
        )
        .unwrap();
        assert_eq!(outcome.returned, PyValue::Int(7));
    }
}
