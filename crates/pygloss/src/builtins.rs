//! Builtin function implementations for the sandbox.
//!
//! Everything the sandbox *can* expose lives here; the [`crate::Policy`]
//! decides which names are actually reachable. The default allow-list covers
//! arithmetic helpers, sequence helpers, and `print`; conversions like
//! `int()` are implemented but only resolve when a policy grants them.

use crate::error::{Error, Result};
use crate::methods::{arg_int, check_args, check_args_range};
use crate::operators::{compare_ordering, compare_values};
use crate::value::PyValue;

/// Items of any iterable value (list, tuple, dict keys, str chars).
pub(crate) fn to_iterable_items(val: &PyValue) -> Result<Vec<PyValue>> {
    match val {
        PyValue::List(items) | PyValue::Tuple(items) => Ok(items.clone()),
        PyValue::Dict(pairs) => Ok(pairs.iter().map(|(k, _)| PyValue::Str(k.clone())).collect()),
        PyValue::Str(s) => Ok(s.chars().map(|c| PyValue::Str(c.to_string())).collect()),
        other => Err(Error::Type {
            expected: "iterable".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

/// Result of attempting to handle a builtin function call.
pub enum BuiltinResult {
    /// The function was handled and returned this value.
    Handled(Result<PyValue>),
    /// Not a builtin function.
    NotBuiltin,
}

/// Dispatch a builtin call with pre-evaluated arguments.
///
/// `max_materialized` bounds how many elements `range()` may produce in one
/// call, so a single expression cannot exhaust memory before the step budget
/// gets a chance to fire.
pub fn try_builtin(
    func_name: &str,
    args: Vec<PyValue>,
    print_buffer: &mut Vec<String>,
    max_materialized: usize,
) -> BuiltinResult {
    match func_name {
        "len" => BuiltinResult::Handled(builtin_len(args)),
        "str" => BuiltinResult::Handled(builtin_str(args)),
        "int" => BuiltinResult::Handled(builtin_int(args)),
        "float" => BuiltinResult::Handled(builtin_float(args)),
        "bool" => BuiltinResult::Handled(builtin_bool(args)),
        "list" => BuiltinResult::Handled(builtin_list(args)),
        "tuple" => BuiltinResult::Handled(builtin_tuple(args)),
        "range" => BuiltinResult::Handled(builtin_range(args, max_materialized)),
        "enumerate" => BuiltinResult::Handled(builtin_enumerate(args)),
        "zip" => BuiltinResult::Handled(builtin_zip(args)),
        "reversed" => BuiltinResult::Handled(builtin_reversed(args)),
        "any" => BuiltinResult::Handled(builtin_any(args)),
        "all" => BuiltinResult::Handled(builtin_all(args)),
        "print" => BuiltinResult::Handled(builtin_print(args, print_buffer)),
        "abs" => BuiltinResult::Handled(builtin_abs(args)),
        "min" => BuiltinResult::Handled(builtin_min(args)),
        "max" => BuiltinResult::Handled(builtin_max(args)),
        "sum" => BuiltinResult::Handled(builtin_sum(args)),
        "sorted" => BuiltinResult::Handled(builtin_sorted(args)),
        _ => BuiltinResult::NotBuiltin,
    }
}

fn builtin_len(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("len", &args, 1)?;
    let arg = &args[0];
    let len = match arg {
        PyValue::Str(s) => s.chars().count(),
        PyValue::List(l) => l.len(),
        PyValue::Tuple(t) => t.len(),
        PyValue::Dict(d) => d.len(),
        _ => {
            return Err(Error::Type {
                expected: "sized".to_string(),
                got: arg.type_name().to_string(),
            });
        }
    };
    Ok(PyValue::Int(len as i64))
}

fn builtin_str(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("str", &args, 1)?;
    Ok(PyValue::Str(args[0].to_print_string()))
}

fn builtin_int(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("int", &args, 1)?;
    let arg = &args[0];
    let val = match arg {
        PyValue::Int(i) => *i,
        PyValue::Float(f) => *f as i64,
        PyValue::Bool(b) => *b as i64,
        PyValue::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::Runtime(format!("invalid literal for int(): '{}'", s)))?,
        _ => {
            return Err(Error::Type {
                expected: "number or string".to_string(),
                got: arg.type_name().to_string(),
            });
        }
    };
    Ok(PyValue::Int(val))
}

fn builtin_float(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("float", &args, 1)?;
    let arg = &args[0];
    let val = match arg {
        PyValue::Float(f) => *f,
        PyValue::Int(i) => *i as f64,
        PyValue::Bool(b) => *b as i64 as f64,
        PyValue::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::Runtime(format!("invalid literal for float(): '{}'", s)))?,
        _ => {
            return Err(Error::Type {
                expected: "number or string".to_string(),
                got: arg.type_name().to_string(),
            });
        }
    };
    Ok(PyValue::Float(val))
}

fn builtin_bool(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("bool", &args, 1)?;
    Ok(PyValue::Bool(args[0].is_truthy()))
}

fn builtin_list(args: Vec<PyValue>) -> Result<PyValue> {
    if args.is_empty() {
        return Ok(PyValue::List(vec![]));
    }
    check_args("list", &args, 1)?;
    Ok(PyValue::List(to_iterable_items(&args[0])?))
}

fn builtin_tuple(args: Vec<PyValue>) -> Result<PyValue> {
    if args.is_empty() {
        return Ok(PyValue::Tuple(vec![]));
    }
    check_args("tuple", &args, 1)?;
    Ok(PyValue::Tuple(to_iterable_items(&args[0])?))
}

fn builtin_range(args: Vec<PyValue>, max_materialized: usize) -> Result<PyValue> {
    let (start, stop, step) = match args.len() {
        1 => (0, arg_int(&args[0])?, 1),
        2 => (arg_int(&args[0])?, arg_int(&args[1])?, 1),
        3 => (arg_int(&args[0])?, arg_int(&args[1])?, arg_int(&args[2])?),
        _ => return Err(Error::Runtime("range() takes 1 to 3 arguments".to_string())),
    };

    if step == 0 {
        return Err(Error::Runtime("range() step cannot be zero".to_string()));
    }

    let span = if step > 0 {
        (stop as i128 - start as i128).max(0) as u128
    } else {
        (start as i128 - stop as i128).max(0) as u128
    };
    let count = span.div_ceil(step.unsigned_abs() as u128);
    if count > max_materialized as u128 {
        return Err(Error::Runtime(format!(
            "range() of {} elements is too large for the sandbox",
            count
        )));
    }

    let mut items = Vec::with_capacity(count as usize);
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        items.push(PyValue::Int(i));
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(PyValue::List(items))
}

fn builtin_enumerate(args: Vec<PyValue>) -> Result<PyValue> {
    check_args_range("enumerate", &args, 1, 2)?;
    let items = to_iterable_items(&args[0])?;
    let start = if args.len() > 1 { arg_int(&args[1])? } else { 0 };

    let result: Vec<PyValue> = items
        .into_iter()
        .enumerate()
        .map(|(i, v)| PyValue::Tuple(vec![PyValue::Int(start + i as i64), v]))
        .collect();

    Ok(PyValue::List(result))
}

fn builtin_zip(args: Vec<PyValue>) -> Result<PyValue> {
    if args.is_empty() {
        return Ok(PyValue::List(vec![]));
    }

    let lists: Result<Vec<Vec<PyValue>>> = args.iter().map(to_iterable_items).collect();
    let lists = lists?;
    let min_len = lists.iter().map(|l| l.len()).min().unwrap_or(0);

    let result: Vec<PyValue> = (0..min_len)
        .map(|i| PyValue::Tuple(lists.iter().map(|l| l[i].clone()).collect()))
        .collect();

    Ok(PyValue::List(result))
}

fn builtin_reversed(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("reversed", &args, 1)?;
    let mut items = to_iterable_items(&args[0])?;
    items.reverse();
    Ok(PyValue::List(items))
}

fn builtin_any(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("any", &args, 1)?;
    let items = to_iterable_items(&args[0])?;
    Ok(PyValue::Bool(items.iter().any(|v| v.is_truthy())))
}

fn builtin_all(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("all", &args, 1)?;
    let items = to_iterable_items(&args[0])?;
    Ok(PyValue::Bool(items.iter().all(|v| v.is_truthy())))
}

fn builtin_print(args: Vec<PyValue>, print_buffer: &mut Vec<String>) -> Result<PyValue> {
    let output: Vec<String> = args.iter().map(|v| v.to_print_string()).collect();
    print_buffer.push(output.join(" "));
    Ok(PyValue::None)
}

fn builtin_abs(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("abs", &args, 1)?;
    match &args[0] {
        PyValue::Int(i) => i
            .checked_abs()
            .map(PyValue::Int)
            .ok_or_else(|| Error::Runtime("integer overflow".to_string())),
        PyValue::Float(f) => Ok(PyValue::Float(f.abs())),
        _ => Err(Error::Type {
            expected: "number".to_string(),
            got: args[0].type_name().to_string(),
        }),
    }
}

fn builtin_min(args: Vec<PyValue>) -> Result<PyValue> {
    extremum("min", args, |candidate, best| {
        compare_values(candidate, best, |a, b| a < b, |a, b| a < b)
    })
}

fn builtin_max(args: Vec<PyValue>) -> Result<PyValue> {
    extremum("max", args, |candidate, best| {
        compare_values(candidate, best, |a, b| a > b, |a, b| a > b)
    })
}

fn extremum<F>(name: &str, args: Vec<PyValue>, better: F) -> Result<PyValue>
where
    F: Fn(&PyValue, &PyValue) -> Result<bool>,
{
    if args.is_empty() {
        return Err(Error::Runtime(format!(
            "{name}() requires at least 1 argument"
        )));
    }

    let items = if args.len() == 1 {
        let items = to_iterable_items(&args[0])?;
        if items.is_empty() {
            return Err(Error::Runtime(format!("{name}() arg is an empty sequence")));
        }
        items
    } else {
        args
    };

    let mut best = items[0].clone();
    for item in &items[1..] {
        if better(item, &best)? {
            best = item.clone();
        }
    }
    Ok(best)
}

fn builtin_sum(args: Vec<PyValue>) -> Result<PyValue> {
    check_args_range("sum", &args, 1, 2)?;
    let items = to_iterable_items(&args[0])?;

    let mut total = match args.get(1) {
        Some(start) => start.clone(),
        None => PyValue::Int(0),
    };
    for item in &items {
        total = crate::operators::apply_binop(
            &rustpython_parser::ast::Operator::Add,
            &total,
            item,
        )?;
    }
    Ok(total)
}

fn builtin_sorted(args: Vec<PyValue>) -> Result<PyValue> {
    check_args("sorted", &args, 1)?;
    let mut items = to_iterable_items(&args[0])?;
    sort_values(&mut items)?;
    Ok(PyValue::List(items))
}

/// Stable sort with Python comparison semantics; mixed incomparable types error.
pub(crate) fn sort_values(items: &mut [PyValue]) -> Result<()> {
    let mut first_err = None;
    items.sort_by(|a, b| match compare_ordering(a, b) {
        Ok(ordering) => ordering,
        Err(e) => {
            first_err.get_or_insert(e);
            std::cmp::Ordering::Equal
        }
    });
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, args: Vec<PyValue>) -> Result<PyValue> {
        let mut buffer = Vec::new();
        match try_builtin(name, args, &mut buffer, 1_000_000) {
            BuiltinResult::Handled(result) => result,
            BuiltinResult::NotBuiltin => panic!("{name} should be a builtin"),
        }
    }

    #[test]
    fn range_is_capped() {
        let err = run("range", vec![PyValue::Int(10_000_000_000)]).unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }

    #[test]
    fn sorted_rejects_mixed_types() {
        let err = run(
            "sorted",
            vec![PyValue::List(vec![PyValue::Int(1), PyValue::Str("a".into())])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Type { .. }));
    }

    #[test]
    fn sum_accepts_floats() {
        let total = run(
            "sum",
            vec![PyValue::List(vec![PyValue::Int(1), PyValue::Float(0.5)])],
        )
        .unwrap();
        assert_eq!(total, PyValue::Float(1.5));
    }

    #[test]
    fn print_joins_with_spaces() {
        let mut buffer = Vec::new();
        let result = try_builtin(
            "print",
            vec![PyValue::Str("x is".into()), PyValue::Int(10)],
            &mut buffer,
            1_000_000,
        );
        assert!(matches!(result, BuiltinResult::Handled(Ok(PyValue::None))));
        assert_eq!(buffer, vec!["x is 10"]);
    }
}
