//! Python slice semantics for lists, tuples, and strings.

use crate::error::{Error, Result};
use crate::value::PyValue;

/// Evaluate `value[lower:upper:step]` with Python's clamping rules.
pub(crate) fn slice_value(
    value: &PyValue,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<PyValue> {
    match value {
        PyValue::List(items) => Ok(PyValue::List(slice_items(items, lower, upper, step)?)),
        PyValue::Tuple(items) => Ok(PyValue::Tuple(slice_items(items, lower, upper, step)?)),
        PyValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let sliced = slice_items(&chars, lower, upper, step)?;
            Ok(PyValue::Str(sliced.into_iter().collect()))
        }
        other => Err(Error::Type {
            expected: "sliceable".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn slice_items<T: Clone>(
    items: &[T],
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<T>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Error::Runtime("slice step cannot be zero".to_string()));
    }

    let len = items.len() as i64;
    let norm = |x: i64| if x < 0 { x + len } else { x };
    let mut out = Vec::new();

    if step > 0 {
        let start = norm(lower.unwrap_or(0)).clamp(0, len);
        let stop = norm(upper.unwrap_or(len)).clamp(0, len);
        let mut i = start;
        while i < stop {
            out.push(items[i as usize].clone());
            i += step;
        }
    } else {
        let start = match lower {
            Some(x) => norm(x).clamp(-1, len - 1),
            None => len - 1,
        };
        let stop = match upper {
            Some(x) => norm(x).clamp(-1, len - 1),
            None => -1,
        };
        let mut i = start;
        while i > stop {
            out.push(items[i as usize].clone());
            i += step;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> PyValue {
        PyValue::List(values.iter().map(|&i| PyValue::Int(i)).collect())
    }

    #[test]
    fn forward_slices() {
        let list = ints(&[0, 1, 2, 3, 4]);
        assert_eq!(slice_value(&list, Some(1), Some(3), None).unwrap(), ints(&[1, 2]));
        assert_eq!(slice_value(&list, Some(-2), None, None).unwrap(), ints(&[3, 4]));
        assert_eq!(slice_value(&list, None, Some(-1), None).unwrap(), ints(&[0, 1, 2, 3]));
    }

    #[test]
    fn reverse_slice() {
        let list = ints(&[0, 1, 2, 3, 4]);
        assert_eq!(
            slice_value(&list, None, None, Some(-1)).unwrap(),
            ints(&[4, 3, 2, 1, 0])
        );
    }

    #[test]
    fn string_slices_are_char_based() {
        let s = PyValue::Str("héllo".into());
        assert_eq!(
            slice_value(&s, Some(1), Some(3), None).unwrap(),
            PyValue::Str("él".into())
        );
    }
}
