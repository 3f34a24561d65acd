//! FILENAME: core/engine/src/functions/lookup.rs
//! PURPOSE: Lookup and reference built-ins (VLOOKUP, HLOOKUP, MATCH, INDEX, CHOOSE).
//! CONTEXT: A value that cannot be found is #N/A. An index that points
//! outside the table is #REF!. A malformed index (below 1) is #VALUE!.

use std::cmp::Ordering;

use super::{boolean, integer, optional, scalar, table, FnResult, FunctionRegistry};
use crate::cell::CellError;
use crate::evaluator::{compare_values, values_equal, EvalResult};

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_builtin("VLOOKUP", 3, Some(4), fn_vlookup);
    registry.register_builtin("HLOOKUP", 3, Some(4), fn_hlookup);
    registry.register_builtin("MATCH", 2, Some(3), fn_match);
    registry.register_builtin("INDEX", 2, Some(3), fn_index);
    registry.register_builtin("CHOOSE", 2, None, fn_choose);
    registry.register_builtin("ROWS", 1, Some(1), fn_rows);
    registry.register_builtin("COLUMNS", 1, Some(1), fn_columns);
}

/// 1-based index argument converted to 0-based; below 1 is #VALUE!.
fn position(arg: &EvalResult) -> Result<usize, CellError> {
    let n = integer(arg)?;
    if n < 1 {
        return Err(CellError::Value);
    }
    usize::try_from(n - 1).map_err(|_| CellError::Value)
}

/// Exact match: first value equal to `target` (text is case-insensitive).
fn find_exact(values: &[EvalResult], target: &EvalResult) -> Option<usize> {
    values.iter().position(|v| values_equal(v, target))
}

/// Approximate match over ascending data: the last value that is not
/// greater than `target`. Blanks are skipped.
fn find_last_not_greater(values: &[EvalResult], target: &EvalResult) -> Option<usize> {
    let mut found = None;
    for (i, value) in values.iter().enumerate() {
        if matches!(value, EvalResult::Empty) {
            continue;
        }
        if compare_values(value, target) == Ordering::Greater {
            break;
        }
        found = Some(i);
    }
    found
}

/// Approximate match over descending data: the last value that is not
/// less than `target`.
fn find_last_not_less(values: &[EvalResult], target: &EvalResult) -> Option<usize> {
    let mut found = None;
    for (i, value) in values.iter().enumerate() {
        if matches!(value, EvalResult::Empty) {
            continue;
        }
        if compare_values(value, target) == Ordering::Less {
            break;
        }
        found = Some(i);
    }
    found
}

/// VLOOKUP(value, table, col_index, [approximate = TRUE])
/// Searches the first column; returns from column `col_index` of the same row.
fn fn_vlookup(args: &[EvalResult]) -> FnResult {
    let target = scalar(&args[0])?;
    let rows = table(&args[1])?;
    let col = position(&args[2])?;
    let approximate = optional(args, 3, true, boolean)?;

    let width = rows.first().map_or(0, Vec::len);
    if col >= width {
        return Err(CellError::Ref);
    }

    let keys: Vec<EvalResult> = rows.iter().map(|row| row[0].clone()).collect();
    let hit = if approximate {
        find_last_not_greater(&keys, &target)
    } else {
        find_exact(&keys, &target)
    };

    hit.map(|row| rows[row][col].clone()).ok_or(CellError::NA)
}

/// HLOOKUP(value, table, row_index, [approximate = TRUE])
/// Searches the first row; returns from row `row_index` of the same column.
fn fn_hlookup(args: &[EvalResult]) -> FnResult {
    let target = scalar(&args[0])?;
    let rows = table(&args[1])?;
    let row = position(&args[2])?;
    let approximate = optional(args, 3, true, boolean)?;

    if row >= rows.len() {
        return Err(CellError::Ref);
    }

    let keys = &rows[0];
    let hit = if approximate {
        find_last_not_greater(keys, &target)
    } else {
        find_exact(keys, &target)
    };

    hit.map(|col| rows[row][col].clone()).ok_or(CellError::NA)
}

/// MATCH(value, vector, [type = 1])
/// Type 0 is exact, 1 finds the largest value <= target in ascending data,
/// -1 finds the smallest value >= target in descending data.
/// The vector must be a single row or column, otherwise #N/A.
fn fn_match(args: &[EvalResult]) -> FnResult {
    let target = scalar(&args[0])?;
    let rows = table(&args[1])?;
    let match_type = optional(args, 2, 1, integer)?;

    let vector: Vec<EvalResult> = if rows.len() == 1 {
        rows[0].clone()
    } else if rows.iter().all(|row| row.len() == 1) {
        rows.iter().map(|row| row[0].clone()).collect()
    } else {
        return Err(CellError::NA);
    };

    let hit = match match_type.signum() {
        0 => find_exact(&vector, &target),
        1 => find_last_not_greater(&vector, &target),
        _ => find_last_not_less(&vector, &target),
    };

    hit.map(|i| EvalResult::Number((i + 1) as f64))
        .ok_or(CellError::NA)
}

/// INDEX(table, row, [col])
/// For a single-row table, one index selects the column.
fn fn_index(args: &[EvalResult]) -> FnResult {
    let rows = table(&args[0])?;
    let first = position(&args[1]).map_err(|_| CellError::Ref)?;

    let (row, col) = match args.get(2) {
        Some(col_arg) => (first, position(col_arg).map_err(|_| CellError::Ref)?),
        None if rows.len() == 1 => (0, first),
        None => (first, 0),
    };

    rows.get(row)
        .and_then(|r| r.get(col))
        .cloned()
        .ok_or(CellError::Ref)
}

/// CHOOSE(index, value1, value2, ...)
fn fn_choose(args: &[EvalResult]) -> FnResult {
    let index = position(&args[0])?;
    args.get(index + 1).cloned().ok_or(CellError::Value)
}

fn fn_rows(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(table(&args[0])?.len() as f64))
}

fn fn_columns(args: &[EvalResult]) -> FnResult {
    let rows = table(&args[0])?;
    Ok(EvalResult::Number(rows.first().map_or(0, Vec::len) as f64))
}

#[cfg(test)]
mod tests {
    use crate::cell::CellError;
    use crate::evaluator::EvalResult;
    use crate::functions::FunctionRegistry;

    fn call(name: &str, args: &[EvalResult]) -> EvalResult {
        FunctionRegistry::new().call(name, args)
    }

    fn t(s: &str) -> EvalResult {
        EvalResult::Text(s.to_string())
    }

    fn n(v: f64) -> EvalResult {
        EvalResult::Number(v)
    }

    fn b(v: bool) -> EvalResult {
        EvalResult::Boolean(v)
    }

    /// | 1  | apple  |
    /// | 5  | banana |
    /// | 10 | cherry |
    fn fruit_table() -> EvalResult {
        EvalResult::Array(vec![
            vec![n(1.0), t("apple")],
            vec![n(5.0), t("banana")],
            vec![n(10.0), t("cherry")],
        ])
    }

    #[test]
    fn test_vlookup_exact() {
        assert_eq!(call("VLOOKUP", &[n(5.0), fruit_table(), n(2.0), b(false)]), t("banana"));
        assert_eq!(
            call("VLOOKUP", &[n(4.0), fruit_table(), n(2.0), b(false)]),
            EvalResult::Error(CellError::NA)
        );
    }

    #[test]
    fn test_vlookup_approximate() {
        assert_eq!(call("VLOOKUP", &[n(7.0), fruit_table(), n(2.0)]), t("banana"));
        assert_eq!(call("VLOOKUP", &[n(100.0), fruit_table(), n(2.0)]), t("cherry"));
        assert_eq!(
            call("VLOOKUP", &[n(0.0), fruit_table(), n(2.0)]),
            EvalResult::Error(CellError::NA)
        );
    }

    #[test]
    fn test_vlookup_bad_column() {
        assert_eq!(
            call("VLOOKUP", &[n(5.0), fruit_table(), n(3.0)]),
            EvalResult::Error(CellError::Ref)
        );
        assert_eq!(
            call("VLOOKUP", &[n(5.0), fruit_table(), n(0.0)]),
            EvalResult::Error(CellError::Value)
        );
    }

    #[test]
    fn test_hlookup() {
        let table = EvalResult::Array(vec![
            vec![t("Q1"), t("Q2"), t("Q3")],
            vec![n(100.0), n(200.0), n(300.0)],
        ]);
        assert_eq!(call("HLOOKUP", &[t("q2"), table.clone(), n(2.0), b(false)]), n(200.0));
        assert_eq!(
            call("HLOOKUP", &[t("Q2"), table, n(3.0), b(false)]),
            EvalResult::Error(CellError::Ref)
        );
    }

    #[test]
    fn test_match() {
        let column = EvalResult::Array(vec![vec![n(10.0)], vec![n(20.0)], vec![n(30.0)]]);
        assert_eq!(call("MATCH", &[n(20.0), column.clone(), n(0.0)]), n(2.0));
        assert_eq!(call("MATCH", &[n(25.0), column.clone()]), n(2.0));
        assert_eq!(call("MATCH", &[n(5.0), column.clone()]), EvalResult::Error(CellError::NA));

        let descending = EvalResult::Array(vec![vec![n(30.0), n(20.0), n(10.0)]]);
        assert_eq!(call("MATCH", &[n(25.0), descending, n(-1.0)]), n(1.0));
    }

    #[test]
    fn test_index_and_choose() {
        assert_eq!(call("INDEX", &[fruit_table(), n(3.0), n(2.0)]), t("cherry"));
        assert_eq!(call("INDEX", &[fruit_table(), n(2.0)]), n(5.0));
        assert_eq!(
            call("INDEX", &[fruit_table(), n(4.0), n(1.0)]),
            EvalResult::Error(CellError::Ref)
        );
        let row = EvalResult::Array(vec![vec![t("a"), t("b"), t("c")]]);
        assert_eq!(call("INDEX", &[row, n(3.0)]), t("c"));

        assert_eq!(call("CHOOSE", &[n(2.0), t("x"), t("y")]), t("y"));
        assert_eq!(call("CHOOSE", &[n(3.0), t("x"), t("y")]), EvalResult::Error(CellError::Value));
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(call("ROWS", &[fruit_table()]), n(3.0));
        assert_eq!(call("COLUMNS", &[fruit_table()]), n(2.0));
        assert_eq!(call("ROWS", &[n(1.0)]), n(1.0));
    }
}
