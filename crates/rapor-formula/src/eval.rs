//! Row-scoped expression evaluator
//!
//! Evaluates a compiled expression against one student row. Coercion rules
//! differ per function and are part of the observable contract:
//! - `RATA2`/`AVERAGE` exclude non-numeric/blank arguments from both the sum
//!   and the count
//! - `SUM` coerces non-numeric/blank arguments to 0
//! - `MIN`/`MAX` consider numeric arguments only
//!
//! `RANK` never reaches this evaluator; the compiler extracts it into a
//! ranking declaration handled by the cohort-wide pass.

use ahash::AHashMap;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{FormulaError, FormulaResult};
use crate::value::FieldValue;

/// Evaluate an expression against one row's field values
pub fn evaluate(expr: &Expr, fields: &AHashMap<String, String>) -> FormulaResult<FieldValue> {
    match expr {
        Expr::Number { value } => Ok(FieldValue::Number(*value)),
        Expr::Text { value } => Ok(FieldValue::Text(value.clone())),
        Expr::Field { key } => Ok(fields
            .get(key)
            .map(|raw| FieldValue::from_field(raw))
            .unwrap_or(FieldValue::Empty)),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, fields)?;
            match op {
                UnaryOp::Neg => {
                    let n = value.as_number().ok_or_else(|| {
                        FormulaError::Evaluation(format!("Cannot negate {:?}", value))
                    })?;
                    Ok(FieldValue::Number(-n))
                }
            }
        }
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, fields)?;
            let r = evaluate(right, fields)?;
            eval_binary(*op, &l, &r)
        }
        Expr::Call { name, args } => {
            let values = args
                .iter()
                .map(|a| evaluate(a, fields))
                .collect::<FormulaResult<Vec<_>>>()?;
            eval_call(name, &values)
        }
    }
}

fn eval_binary(op: BinaryOp, left: &FieldValue, right: &FieldValue) -> FormulaResult<FieldValue> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let l = numeric_operand(left)?;
            let r = numeric_operand(right)?;
            let result = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(FormulaError::Evaluation("Division by zero".into()));
                    }
                    l / r
                }
                _ => unreachable!(),
            };
            Ok(FieldValue::Number(result))
        }
        BinaryOp::Concat => Ok(FieldValue::Text(format!(
            "{}{}",
            left.to_field_string(),
            right.to_field_string()
        ))),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right);
            let truth = match op {
                BinaryOp::Eq => ordering == std::cmp::Ordering::Equal,
                BinaryOp::Ne => ordering != std::cmp::Ordering::Equal,
                BinaryOp::Lt => ordering == std::cmp::Ordering::Less,
                BinaryOp::Le => ordering != std::cmp::Ordering::Greater,
                BinaryOp::Gt => ordering == std::cmp::Ordering::Greater,
                BinaryOp::Ge => ordering != std::cmp::Ordering::Less,
                _ => unreachable!(),
            };
            Ok(FieldValue::Number(if truth { 1.0 } else { 0.0 }))
        }
    }
}

/// Numeric compare when both sides are numeric, string compare otherwise
fn compare(left: &FieldValue, right: &FieldValue) -> std::cmp::Ordering {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(std::cmp::Ordering::Equal),
        _ => left.to_field_string().cmp(&right.to_field_string()),
    }
}

/// Arithmetic operand coercion: blank counts as zero, text must be numeric
fn numeric_operand(value: &FieldValue) -> FormulaResult<f64> {
    match value {
        FieldValue::Empty => Ok(0.0),
        _ => value
            .as_number()
            .ok_or_else(|| FormulaError::Evaluation(format!("Not a number: {:?}", value))),
    }
}

fn eval_call(name: &str, args: &[FieldValue]) -> FormulaResult<FieldValue> {
    match name {
        "RATA2" | "AVERAGE" => {
            // Non-numeric/blank arguments drop out of both sum and count
            let numbers: Vec<f64> = args.iter().filter_map(|v| v.as_number()).collect();
            if numbers.is_empty() {
                return Ok(FieldValue::Empty);
            }
            Ok(FieldValue::Number(
                numbers.iter().sum::<f64>() / numbers.len() as f64,
            ))
        }
        "SUM" => {
            // Non-numeric/blank arguments coerce to zero
            let total: f64 = args.iter().map(|v| v.as_number().unwrap_or(0.0)).sum();
            Ok(FieldValue::Number(total))
        }
        "MIN" => Ok(args
            .iter()
            .filter_map(|v| v.as_number())
            .fold(None::<f64>, |acc, n| Some(acc.map_or(n, |a| a.min(n))))
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Empty)),
        "MAX" => Ok(args
            .iter()
            .filter_map(|v| v.as_number())
            .fold(None::<f64>, |acc, n| Some(acc.map_or(n, |a| a.max(n))))
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Empty)),
        "IF" => {
            if args.len() != 3 {
                return Err(FormulaError::Evaluation(format!(
                    "IF expects 3 arguments, got {}",
                    args.len()
                )));
            }
            if args[0].is_truthy() {
                Ok(args[1].clone())
            } else {
                Ok(args[2].clone())
            }
        }
        "AND" => Ok(FieldValue::Number(
            if args.iter().all(|v| v.is_truthy()) { 1.0 } else { 0.0 },
        )),
        "OR" => Ok(FieldValue::Number(
            if args.iter().any(|v| v.is_truthy()) { 1.0 } else { 0.0 },
        )),
        "RANK" => Err(FormulaError::Evaluation(
            "RANK is cohort-wide and cannot be evaluated per row".into(),
        )),
        other => Err(FormulaError::Evaluation(format!(
            "Unknown function '{}'",
            other
        ))),
    }
}
