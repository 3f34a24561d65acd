//! FILENAME: core/engine/src/functions/statistical.rs
//! PURPOSE: Statistical built-ins (AVERAGE, COUNT, MEDIAN, COUNTIF, ...).
//! CONTEXT: Numeric aggregates go through `collect_numbers`, which skips
//! non-numeric values inside ranges. COUNTA and COUNTBLANK look at every value.

use std::cmp::Ordering;

use super::{collect_numbers, integer, scalar, table, FnResult, FunctionRegistry};
use crate::cell::{parse_plain_number, CellError};
use crate::evaluator::{compare_values, values_equal, EvalResult};

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_builtin("AVERAGE", 1, None, fn_average);
    registry.register_builtin("MIN", 1, None, fn_min);
    registry.register_builtin("MAX", 1, None, fn_max);
    registry.register_builtin("COUNT", 1, None, fn_count);
    registry.register_builtin("COUNTA", 1, None, fn_counta);
    registry.register_builtin("COUNTBLANK", 1, Some(1), fn_countblank);
    registry.register_builtin("MEDIAN", 1, None, fn_median);
    registry.register_builtin("STDEV", 1, None, fn_stdev);
    registry.register_builtin("VAR", 1, None, fn_var);
    registry.register_builtin("LARGE", 2, Some(2), fn_large);
    registry.register_builtin("SMALL", 2, Some(2), fn_small);
    registry.register_builtin("COUNTIF", 2, Some(2), fn_countif);
    registry.register_builtin("SUMIF", 2, Some(3), fn_sumif);
    registry.register_builtin("AVERAGEIF", 2, Some(3), fn_averageif);
}

fn fn_average(args: &[EvalResult]) -> FnResult {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(CellError::Div0);
    }
    Ok(EvalResult::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

/// MIN and MAX of no numbers is 0.
fn fn_min(args: &[EvalResult]) -> FnResult {
    let numbers = collect_numbers(args)?;
    Ok(EvalResult::Number(numbers.into_iter().reduce(f64::min).unwrap_or(0.0)))
}

fn fn_max(args: &[EvalResult]) -> FnResult {
    let numbers = collect_numbers(args)?;
    Ok(EvalResult::Number(numbers.into_iter().reduce(f64::max).unwrap_or(0.0)))
}

/// Counts numbers. Errors are counted as not-numbers rather than returned.
fn fn_count(args: &[EvalResult]) -> FnResult {
    let count = args
        .iter()
        .flat_map(EvalResult::flatten)
        .filter(|v| matches!(v, EvalResult::Number(_)))
        .count();
    Ok(EvalResult::Number(count as f64))
}

/// Counts every non-empty value, errors included.
fn fn_counta(args: &[EvalResult]) -> FnResult {
    let count = args
        .iter()
        .flat_map(EvalResult::flatten)
        .filter(|v| !matches!(v, EvalResult::Empty))
        .count();
    Ok(EvalResult::Number(count as f64))
}

/// Empty cells and empty strings both count as blank.
fn fn_countblank(args: &[EvalResult]) -> FnResult {
    let count = args[0]
        .flatten()
        .iter()
        .filter(|v| match v {
            EvalResult::Empty => true,
            EvalResult::Text(s) => s.is_empty(),
            _ => false,
        })
        .count();
    Ok(EvalResult::Number(count as f64))
}

fn sorted_numbers(args: &[EvalResult]) -> Result<Vec<f64>, CellError> {
    let mut numbers = collect_numbers(args)?;
    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    Ok(numbers)
}

fn fn_median(args: &[EvalResult]) -> FnResult {
    let numbers = sorted_numbers(args)?;
    if numbers.is_empty() {
        return Err(CellError::Num);
    }
    let mid = numbers.len() / 2;
    let median = if numbers.len() % 2 == 0 {
        (numbers[mid - 1] + numbers[mid]) / 2.0
    } else {
        numbers[mid]
    };
    Ok(EvalResult::Number(median))
}

/// Sample variance (n - 1 denominator).
fn sample_variance(args: &[EvalResult]) -> Result<f64, CellError> {
    let numbers = collect_numbers(args)?;
    if numbers.len() < 2 {
        return Err(CellError::Div0);
    }
    let n = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / n;
    let squares: f64 = numbers.iter().map(|x| (x - mean).powi(2)).sum();
    Ok(squares / (n - 1.0))
}

fn fn_var(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(sample_variance(args)?))
}

fn fn_stdev(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(sample_variance(args)?.sqrt()))
}

/// K-th value counting from the requested end; k outside 1..=n is #NUM!.
fn kth(args: &[EvalResult], largest: bool) -> FnResult {
    let mut numbers = sorted_numbers(&args[..1])?;
    if largest {
        numbers.reverse();
    }
    let k = integer(&args[1])?;
    if k < 1 || k as usize > numbers.len() {
        return Err(CellError::Num);
    }
    Ok(EvalResult::Number(numbers[k as usize - 1]))
}

fn fn_large(args: &[EvalResult]) -> FnResult {
    kth(args, true)
}

fn fn_small(args: &[EvalResult]) -> FnResult {
    kth(args, false)
}

// ============================================================================
// CRITERIA (COUNTIF / SUMIF / AVERAGEIF)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum CriteriaOp {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

/// A parsed criteria such as `">5"`, `"<>apple"`, `"=x"`, or a plain value.
#[derive(Debug, Clone, PartialEq)]
struct Criteria {
    op: CriteriaOp,
    operand: EvalResult,
}

impl Criteria {
    fn parse(arg: &EvalResult) -> Result<Self, CellError> {
        let value = scalar(arg)?;
        if !matches!(value, EvalResult::Text(_)) {
            return Ok(Criteria {
                op: CriteriaOp::Equal,
                operand: value,
            });
        }
        let s = value.as_text();

        let (op, rest) = [
            ("<>", CriteriaOp::NotEqual),
            ("<=", CriteriaOp::LessEqual),
            (">=", CriteriaOp::GreaterEqual),
            ("<", CriteriaOp::Less),
            (">", CriteriaOp::Greater),
            ("=", CriteriaOp::Equal),
        ]
        .iter()
        .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (*op, rest)))
        .unwrap_or((CriteriaOp::Equal, s.as_str()));

        let operand = match parse_plain_number(rest) {
            Some(n) => EvalResult::Number(n),
            None if rest.is_empty() => EvalResult::Empty,
            None => EvalResult::Text(rest.to_string()),
        };
        Ok(Criteria { op, operand })
    }

    fn matches(&self, value: &EvalResult) -> bool {
        if let EvalResult::Empty = self.operand {
            let blank = matches!(value, EvalResult::Empty)
                || matches!(value, EvalResult::Text(s) if s.is_empty());
            return match self.op {
                CriteriaOp::NotEqual => !blank,
                _ => blank,
            };
        }
        if value.is_error() {
            return false;
        }

        match self.op {
            CriteriaOp::Equal => values_equal(value, &self.operand),
            CriteriaOp::NotEqual => !values_equal(value, &self.operand),
            _ => {
                // Ordering comparisons only apply between values of one kind.
                let same_kind = matches!(
                    (value, &self.operand),
                    (EvalResult::Number(_), EvalResult::Number(_))
                        | (EvalResult::Text(_), EvalResult::Text(_))
                );
                if !same_kind {
                    return false;
                }
                let ordering = compare_values(value, &self.operand);
                match self.op {
                    CriteriaOp::Less => ordering == Ordering::Less,
                    CriteriaOp::Greater => ordering == Ordering::Greater,
                    CriteriaOp::LessEqual => ordering != Ordering::Greater,
                    CriteriaOp::GreaterEqual => ordering != Ordering::Less,
                    CriteriaOp::Equal | CriteriaOp::NotEqual => false,
                }
            }
        }
    }
}

/// Values from the optional sum range that line up with matching cells
/// of the criteria range.
fn matched_numbers(args: &[EvalResult]) -> Result<Vec<f64>, CellError> {
    let criteria = Criteria::parse(&args[1])?;
    let tested = table(&args[0])?;
    let summed = match args.get(2) {
        Some(arg) => table(arg)?,
        None => tested.clone(),
    };

    let mut numbers = Vec::new();
    for (r, row) in tested.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !criteria.matches(value) {
                continue;
            }
            if let Some(EvalResult::Number(n)) = summed.get(r).and_then(|row| row.get(c)) {
                numbers.push(*n);
            }
        }
    }
    Ok(numbers)
}

fn fn_countif(args: &[EvalResult]) -> FnResult {
    let criteria = Criteria::parse(&args[1])?;
    let count = args[0]
        .flatten()
        .iter()
        .filter(|v| criteria.matches(v))
        .count();
    Ok(EvalResult::Number(count as f64))
}

fn fn_sumif(args: &[EvalResult]) -> FnResult {
    Ok(EvalResult::Number(matched_numbers(args)?.iter().sum()))
}

fn fn_averageif(args: &[EvalResult]) -> FnResult {
    let numbers = matched_numbers(args)?;
    if numbers.is_empty() {
        return Err(CellError::Div0);
    }
    Ok(EvalResult::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}
