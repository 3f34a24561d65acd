//! FILENAME: core/engine/src/functions/logical.rs
//! PURPOSE: Logical and information built-ins (IF, AND, IFERROR, ISBLANK, ...).
//! CONTEXT: IFERROR/IFNA and the IS* family are the functions that inspect
//! error sentinels instead of passing them through.

use super::{boolean, FnResult, FunctionRegistry};
use crate::cell::CellError;
use crate::evaluator::EvalResult;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_builtin("IF", 2, Some(3), fn_if);
    registry.register_builtin("AND", 1, None, fn_and);
    registry.register_builtin("OR", 1, None, fn_or);
    registry.register_builtin("XOR", 1, None, fn_xor);
    registry.register_builtin("NOT", 1, Some(1), fn_not);
    registry.register_builtin("TRUE", 0, Some(0), |_| Ok(EvalResult::Boolean(true)));
    registry.register_builtin("FALSE", 0, Some(0), |_| Ok(EvalResult::Boolean(false)));
    registry.register_builtin("IFERROR", 2, Some(2), fn_iferror);
    registry.register_builtin("IFNA", 2, Some(2), fn_ifna);
    registry.register_builtin("ISERROR", 1, Some(1), fn_iserror);
    registry.register_builtin("ISNA", 1, Some(1), fn_isna);
    registry.register_builtin("ISNUMBER", 1, Some(1), fn_isnumber);
    registry.register_builtin("ISTEXT", 1, Some(1), fn_istext);
    registry.register_builtin("ISLOGICAL", 1, Some(1), fn_islogical);
    registry.register_builtin("ISBLANK", 1, Some(1), fn_isblank);
}

/// Without a false branch, a false condition yields FALSE.
fn fn_if(args: &[EvalResult]) -> FnResult {
    if boolean(&args[0])? {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(EvalResult::Boolean(false)))
    }
}

/// Truth values of every argument. Inside ranges only booleans and numbers
/// count; an error anywhere is returned.
fn truth_values(args: &[EvalResult]) -> Result<Vec<bool>, CellError> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            EvalResult::Array(_) => {
                for item in arg.flatten() {
                    match item {
                        EvalResult::Error(e) => return Err(e),
                        EvalResult::Boolean(b) => values.push(b),
                        EvalResult::Number(n) => values.push(n != 0.0),
                        _ => {}
                    }
                }
            }
            other => values.push(boolean(other)?),
        }
    }
    if values.is_empty() {
        return Err(CellError::Value);
    }
    Ok(values)
}

fn fn_and(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(truth_values(args)?.iter().all(|b| *b)))
}

fn fn_or(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(truth_values(args)?.iter().any(|b| *b)))
}

/// TRUE when an odd number of arguments are true.
fn fn_xor(args: &[EvalResult]) -> FnResult {
    let count = truth_values(args)?.iter().filter(|b| **b).count();
    Ok(EvalResult::Boolean(count % 2 == 1))
}

fn fn_not(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(!boolean(&args[0])?))
}

fn fn_iferror(args: &[EvalResult]) -> FnResult {
    match args[0].scalar() {
        EvalResult::Error(_) => Ok(args[1].clone()),
        _ => Ok(args[0].clone()),
    }
}

fn fn_ifna(args: &[EvalResult]) -> FnResult {
    match args[0].scalar() {
        EvalResult::Error(CellError::NA) => Ok(args[1].clone()),
        _ => Ok(args[0].clone()),
    }
}

fn fn_iserror(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(args[0].scalar().is_error()))
}

fn fn_isna(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(
        args[0].scalar().error() == Some(CellError::NA),
    ))
}

fn fn_isnumber(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(matches!(args[0].scalar(), EvalResult::Number(_))))
}

fn fn_istext(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(matches!(args[0].scalar(), EvalResult::Text(_))))
}

fn fn_islogical(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(matches!(args[0].scalar(), EvalResult::Boolean(_))))
}

fn fn_isblank(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Boolean(matches!(args[0].scalar(), EvalResult::Empty)))
}
