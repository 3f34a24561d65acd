//! FILENAME: core/engine/src/functions/math.rs
//! PURPOSE: Arithmetic built-ins (SUM, ROUND, MOD, ...).

use super::{collect_numbers, integer, number, optional, FnResult, FunctionRegistry};
use crate::cell::CellError;
use crate::evaluator::EvalResult;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_builtin("SUM", 1, None, fn_sum);
    registry.register_builtin("PRODUCT", 1, None, fn_product);
    registry.register_builtin("ABS", 1, Some(1), fn_abs);
    registry.register_builtin("ROUND", 1, Some(2), fn_round);
    registry.register_builtin("ROUNDUP", 1, Some(2), fn_roundup);
    registry.register_builtin("ROUNDDOWN", 1, Some(2), fn_rounddown);
    registry.register_builtin("TRUNC", 1, Some(2), fn_rounddown);
    registry.register_builtin("INT", 1, Some(1), fn_int);
    registry.register_builtin("FLOOR", 1, Some(2), fn_floor);
    registry.register_builtin("CEILING", 1, Some(2), fn_ceiling);
    registry.register_builtin("SQRT", 1, Some(1), fn_sqrt);
    registry.register_builtin("POWER", 2, Some(2), fn_power);
    registry.register_builtin("MOD", 2, Some(2), fn_mod);
    registry.register_builtin("SIGN", 1, Some(1), fn_sign);
    registry.register_builtin("PI", 0, Some(0), |_| Ok(EvalResult::Number(std::f64::consts::PI)));
    registry.register_builtin("EXP", 1, Some(1), fn_exp);
    registry.register_builtin("LN", 1, Some(1), fn_ln);
    registry.register_builtin("LOG", 1, Some(2), fn_log);
    registry.register_builtin("LOG10", 1, Some(1), fn_log10);
}

/// Wraps a numeric result, mapping NaN/infinity to #NUM!.
fn finite(value: f64) -> FnResult {
    if value.is_finite() {
        Ok(EvalResult::Number(value))
    } else {
        Err(CellError::Num)
    }
}

fn fn_sum(args: &[EvalResult]) -> FnResult {
    finite(collect_numbers(args)?.iter().sum())
}

fn fn_product(args: &[EvalResult]) -> FnResult {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Ok(EvalResult::Number(0.0));
    }
    finite(numbers.iter().product())
}

fn fn_abs(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(number(&args[0])?.abs()))
}

fn digits_factor(args: &[EvalResult]) -> Result<f64, CellError> {
    let digits = optional(args, 1, 0, integer)?;
    Ok(10_f64.powi(digits.clamp(-308, 308) as i32))
}

/// Rounds half away from zero.
fn fn_round(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    let factor = digits_factor(args)?;
    finite((num * factor).round() / factor)
}

fn fn_roundup(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    let factor = digits_factor(args)?;
    let scaled = num * factor;
    let rounded = if scaled >= 0.0 { scaled.ceil() } else { scaled.floor() };
    finite(rounded / factor)
}

/// Also serves as TRUNC.
fn fn_rounddown(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    let factor = digits_factor(args)?;
    finite((num * factor).trunc() / factor)
}

fn fn_int(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(number(&args[0])?.floor()))
}

fn significance(args: &[EvalResult], num: f64) -> Result<f64, CellError> {
    let default = if num < 0.0 { -1.0 } else { 1.0 };
    let sig = optional(args, 1, default, number)?;
    if sig == 0.0 {
        return Err(CellError::Div0);
    }
    if num > 0.0 && sig < 0.0 {
        return Err(CellError::Num);
    }
    Ok(sig)
}

fn fn_floor(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    let sig = significance(args, num)?;
    finite((num / sig).floor() * sig)
}

fn fn_ceiling(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    let sig = significance(args, num)?;
    finite((num / sig).ceil() * sig)
}

fn fn_sqrt(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    if num < 0.0 {
        return Err(CellError::Num);
    }
    Ok(EvalResult::Number(num.sqrt()))
}

fn fn_power(args: &[EvalResult]) -> FnResult {
    let base = number(&args[0])?;
    let exponent = number(&args[1])?;
    finite(base.powf(exponent))
}

/// Result takes the sign of the divisor.
fn fn_mod(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    let divisor = number(&args[1])?;
    if divisor == 0.0 {
        return Err(CellError::Div0);
    }
    finite(num - divisor * (num / divisor).floor())
}

fn fn_sign(args: &[EvalResult]) -> FnResult {
    let num = number(&args[0])?;
    let sign = if num > 0.0 {
        1.0
    } else if num < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(EvalResult::Number(sign))
}

fn fn_exp(args: &[EvalResult]) -> FnResult {
    finite(number(&args[0])?.exp())
}

fn positive(args: &[EvalResult], index: usize) -> Result<f64, CellError> {
    let num = number(&args[index])?;
    if num <= 0.0 {
        return Err(CellError::Num);
    }
    Ok(num)
}

fn fn_ln(args: &[EvalResult]) -> FnResult {
    finite(positive(args, 0)?.ln())
}

fn fn_log(args: &[EvalResult]) -> FnResult {
    let num = positive(args, 0)?;
    let base = if args.len() > 1 { positive(args, 1)? } else { 10.0 };
    if base == 1.0 {
        return Err(CellError::Div0);
    }
    finite(num.log(base))
}

fn fn_log10(args: &[EvalResult]) -> FnResult {
    finite(positive(args, 0)?.log10())
}
