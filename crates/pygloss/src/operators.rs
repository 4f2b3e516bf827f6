//! Binary and comparison operators for the sandbox.
//!
//! Implements Python operator semantics over [`PyValue`]:
//! - Arithmetic: +, -, *, /, //, %, **
//! - Bitwise: |, ^, &, <<, >>
//! - Comparison: ==, !=, <, <=, >, >=, in, not in, is, is not
//!
//! Integer arithmetic is checked; overflow is reported as a runtime error
//! rather than wrapping or aborting.

use std::cmp::Ordering;

use rustpython_parser::ast::{CmpOp, Operator};

use crate::error::{Error, Result};
use crate::value::PyValue;

fn overflow() -> Error {
    Error::Runtime("integer overflow".to_string())
}

/// Apply a binary operator to two values.
pub fn apply_binop(op: &Operator, left: &PyValue, right: &PyValue) -> Result<PyValue> {
    match op {
        Operator::Add => match (left, right) {
            (PyValue::Int(a), PyValue::Int(b)) => {
                a.checked_add(*b).map(PyValue::Int).ok_or_else(overflow)
            }
            (PyValue::Str(a), PyValue::Str(b)) => Ok(PyValue::Str(format!("{}{}", a, b))),
            (PyValue::List(a), PyValue::List(b)) => {
                let mut result = a.clone();
                result.extend(b.clone());
                Ok(PyValue::List(result))
            }
            (PyValue::Tuple(a), PyValue::Tuple(b)) => {
                let mut result = a.clone();
                result.extend(b.clone());
                Ok(PyValue::Tuple(result))
            }
            _ => float_binop(left, right, "+", |a, b| a + b),
        },
        Operator::Sub => match (left, right) {
            (PyValue::Int(a), PyValue::Int(b)) => {
                a.checked_sub(*b).map(PyValue::Int).ok_or_else(overflow)
            }
            _ => float_binop(left, right, "-", |a, b| a - b),
        },
        Operator::Mult => match (left, right) {
            (PyValue::Int(a), PyValue::Int(b)) => {
                a.checked_mul(*b).map(PyValue::Int).ok_or_else(overflow)
            }
            (PyValue::Str(s), PyValue::Int(n)) | (PyValue::Int(n), PyValue::Str(s)) => {
                if *n <= 0 {
                    Ok(PyValue::Str(String::new()))
                } else {
                    Ok(PyValue::Str(s.repeat(*n as usize)))
                }
            }
            (PyValue::List(l), PyValue::Int(n)) | (PyValue::Int(n), PyValue::List(l)) => {
                if *n <= 0 {
                    Ok(PyValue::List(vec![]))
                } else {
                    let mut result = Vec::with_capacity(l.len() * *n as usize);
                    for _ in 0..*n {
                        result.extend(l.clone());
                    }
                    Ok(PyValue::List(result))
                }
            }
            _ => float_binop(left, right, "*", |a, b| a * b),
        },
        Operator::Div => {
            let a = number(left)?;
            let b = number(right)?;
            if b == 0.0 {
                Err(Error::DivisionByZero)
            } else {
                Ok(PyValue::Float(a / b))
            }
        }
        Operator::FloorDiv => {
            let a = number(left)?;
            let b = number(right)?;
            if b == 0.0 {
                Err(Error::DivisionByZero)
            } else {
                let result = (a / b).floor();
                if both_ints(left, right) {
                    Ok(PyValue::Int(result as i64))
                } else {
                    Ok(PyValue::Float(result))
                }
            }
        }
        Operator::Mod => match (left, right) {
            (PyValue::Int(a), PyValue::Int(b)) => {
                if *b == 0 {
                    Err(Error::DivisionByZero)
                } else {
                    // Python's % follows the sign of the divisor.
                    Ok(PyValue::Int(((a % b) + b) % b))
                }
            }
            _ => {
                let a = number(left)?;
                let b = number(right)?;
                if b == 0.0 {
                    Err(Error::DivisionByZero)
                } else {
                    Ok(PyValue::Float(a - (a / b).floor() * b))
                }
            }
        },
        Operator::Pow => match (left, right) {
            (PyValue::Int(base), PyValue::Int(exp)) => {
                if *exp < 0 {
                    Ok(PyValue::Float((*base as f64).powi(*exp as i32)))
                } else {
                    let exp = u32::try_from(*exp).map_err(|_| overflow())?;
                    base.checked_pow(exp).map(PyValue::Int).ok_or_else(overflow)
                }
            }
            _ => {
                let a = number(left)?;
                let b = number(right)?;
                Ok(PyValue::Float(a.powf(b)))
            }
        },
        Operator::BitOr => int_binop(left, right, |a, b| Ok(a | b)),
        Operator::BitXor => int_binop(left, right, |a, b| Ok(a ^ b)),
        Operator::BitAnd => int_binop(left, right, |a, b| Ok(a & b)),
        Operator::LShift => int_binop(left, right, |a, b| {
            let shift = u32::try_from(b).map_err(|_| negative_shift())?;
            a.checked_shl(shift).ok_or_else(overflow)
        }),
        Operator::RShift => int_binop(left, right, |a, b| {
            let shift = u32::try_from(b).map_err(|_| negative_shift())?;
            a.checked_shr(shift).ok_or_else(overflow)
        }),
        _ => Err(Error::Unsupported(format!("operator {:?}", op))),
    }
}

fn negative_shift() -> Error {
    Error::Runtime("negative shift count".to_string())
}

fn both_ints(left: &PyValue, right: &PyValue) -> bool {
    matches!(left, PyValue::Int(_)) && matches!(right, PyValue::Int(_))
}

fn number(value: &PyValue) -> Result<f64> {
    value.as_float().ok_or_else(|| Error::Type {
        expected: "number".to_string(),
        got: value.type_name().to_string(),
    })
}

fn float_binop<F>(left: &PyValue, right: &PyValue, symbol: &str, op: F) -> Result<PyValue>
where
    F: Fn(f64, f64) -> f64,
{
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => Ok(PyValue::Float(op(a, b))),
        _ => Err(Error::Type {
            expected: format!("compatible types for {}", symbol),
            got: format!("{} and {}", left.type_name(), right.type_name()),
        }),
    }
}

fn int_binop<F>(left: &PyValue, right: &PyValue, op: F) -> Result<PyValue>
where
    F: Fn(i64, i64) -> Result<i64>,
{
    let a = left.as_int().ok_or_else(|| Error::Type {
        expected: "int".to_string(),
        got: left.type_name().to_string(),
    })?;
    let b = right.as_int().ok_or_else(|| Error::Type {
        expected: "int".to_string(),
        got: right.type_name().to_string(),
    })?;
    op(a, b).map(PyValue::Int)
}

/// Apply a comparison operator, returning the boolean outcome.
pub fn apply_cmpop(op: &CmpOp, left: &PyValue, right: &PyValue) -> Result<bool> {
    match op {
        CmpOp::Eq => Ok(left == right),
        CmpOp::NotEq => Ok(left != right),
        CmpOp::Lt => compare_values(left, right, |a, b| a < b, |a, b| a < b),
        CmpOp::LtE => compare_values(left, right, |a, b| a <= b, |a, b| a <= b),
        CmpOp::Gt => compare_values(left, right, |a, b| a > b, |a, b| a > b),
        CmpOp::GtE => compare_values(left, right, |a, b| a >= b, |a, b| a >= b),
        CmpOp::In => match right {
            PyValue::List(items) | PyValue::Tuple(items) => Ok(items.contains(left)),
            PyValue::Str(s) => {
                if let PyValue::Str(needle) = left {
                    Ok(s.contains(needle.as_str()))
                } else {
                    Err(Error::Type {
                        expected: "str".to_string(),
                        got: left.type_name().to_string(),
                    })
                }
            }
            PyValue::Dict(pairs) => {
                if let PyValue::Str(key) = left {
                    Ok(pairs.iter().any(|(k, _)| k == key))
                } else {
                    Err(Error::Type {
                        expected: "str".to_string(),
                        got: left.type_name().to_string(),
                    })
                }
            }
            _ => Err(Error::Type {
                expected: "container".to_string(),
                got: right.type_name().to_string(),
            }),
        },
        CmpOp::NotIn => Ok(!apply_cmpop(&CmpOp::In, left, right)?),
        CmpOp::Is => Ok(matches!((left, right), (PyValue::None, PyValue::None))),
        CmpOp::IsNot => Ok(!apply_cmpop(&CmpOp::Is, left, right)?),
    }
}

/// Ordered comparison used by `<`/`>` and friends, plus `sorted()`.
pub fn compare_values<F, G>(
    left: &PyValue,
    right: &PyValue,
    int_cmp: F,
    float_cmp: G,
) -> Result<bool>
where
    F: Fn(i64, i64) -> bool,
    G: Fn(f64, f64) -> bool,
{
    match (left, right) {
        (PyValue::Int(a), PyValue::Int(b)) => Ok(int_cmp(*a, *b)),
        (PyValue::Str(a), PyValue::Str(b)) => Ok(match a.cmp(b) {
            Ordering::Less => int_cmp(0, 1),
            Ordering::Equal => int_cmp(0, 0),
            Ordering::Greater => int_cmp(1, 0),
        }),
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => Ok(float_cmp(a, b)),
            _ => Err(Error::Type {
                expected: "comparable types".to_string(),
                got: format!("{} and {}", left.type_name(), right.type_name()),
            }),
        },
    }
}

/// Total ordering for homogeneous sequences (`sorted()`, `list.sort()`).
pub fn compare_ordering(left: &PyValue, right: &PyValue) -> Result<Ordering> {
    if compare_values(left, right, |a, b| a < b, |a, b| a < b)? {
        Ok(Ordering::Less)
    } else if compare_values(left, right, |a, b| a > b, |a, b| a > b)? {
        Ok(Ordering::Greater)
    } else {
        Ok(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulo_follows_divisor_sign() {
        let r = apply_binop(&Operator::Mod, &PyValue::Int(-7), &PyValue::Int(3)).unwrap();
        assert_eq!(r, PyValue::Int(2));
        let r = apply_binop(&Operator::Mod, &PyValue::Int(7), &PyValue::Int(3)).unwrap();
        assert_eq!(r, PyValue::Int(1));
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let r = apply_binop(&Operator::Add, &PyValue::Int(i64::MAX), &PyValue::Int(1));
        assert!(r.is_err());
        let r = apply_binop(&Operator::Pow, &PyValue::Int(2), &PyValue::Int(500));
        assert!(r.is_err());
    }

    #[test]
    fn chained_comparable_kinds() {
        assert!(apply_cmpop(&CmpOp::Lt, &PyValue::Int(1), &PyValue::Float(1.5)).unwrap());
        assert!(apply_cmpop(&CmpOp::In, &PyValue::Str("a".into()), &PyValue::Str("cat".into()))
            .unwrap());
    }
}
