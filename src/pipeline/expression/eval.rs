//! Evaluation of parsed expressions against a variable environment

use super::parser::{BinaryOp, Expr, Function, UnaryOp};
use super::{ExpressionError, Scalar};

/// Source of variable values during evaluation
pub trait Environment {
    /// `None` means the name is not a known variable
    fn lookup(&self, name: &str) -> Option<Scalar>;
}

impl Environment for std::collections::HashMap<String, Scalar> {
    fn lookup(&self, name: &str) -> Option<Scalar> {
        self.get(name).cloned()
    }
}

/// Evaluate an expression.
///
/// An absent operand makes the enclosing operation absent, all the way up to
/// the root, including through `&&`/`||`.
pub fn evaluate(expr: &Expr, env: &dyn Environment) -> Result<Scalar, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => env
            .lookup(name)
            .ok_or_else(|| ExpressionError::UndefinedVariable { name: name.clone() }),
        Expr::Unary(op, inner) => {
            let value = evaluate(inner, env)?;
            if value.is_absent() {
                return Ok(Scalar::Absent);
            }
            match op {
                UnaryOp::Neg => Ok(Scalar::Number(-numeric(&value, "-")?)),
                UnaryOp::Not => Ok(Scalar::Bool(!value.truthy())),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = evaluate(lhs, env)?;
            if left.is_absent() {
                return Ok(Scalar::Absent);
            }
            // Short-circuit only when the right side cannot change the result
            match op {
                BinaryOp::And if !left.truthy() => return Ok(Scalar::Bool(false)),
                BinaryOp::Or if left.truthy() => return Ok(Scalar::Bool(true)),
                _ => {}
            }
            let right = evaluate(rhs, env)?;
            if right.is_absent() {
                return Ok(Scalar::Absent);
            }
            binary(*op, &left, &right)
        }
        Expr::Call(function, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                let value = evaluate(arg, env)?;
                if value.is_absent() {
                    return Ok(Scalar::Absent);
                }
                values.push(numeric(&value, "function argument")?);
            }
            Ok(Scalar::Number(call(*function, &values)))
        }
    }
}

fn numeric(value: &Scalar, context: &str) -> Result<f64, ExpressionError> {
    value.as_number().ok_or_else(|| ExpressionError::TypeMismatch {
        operation: context.to_string(),
        value: value.to_string(),
    })
}

fn binary(op: BinaryOp, left: &Scalar, right: &Scalar) -> Result<Scalar, ExpressionError> {
    let result = match op {
        BinaryOp::Add => {
            if matches!(left, Scalar::Text(_)) || matches!(right, Scalar::Text(_)) {
                Scalar::Text(format!("{}{}", left, right))
            } else {
                Scalar::Number(numeric(left, "+")? + numeric(right, "+")?)
            }
        }
        BinaryOp::Sub => Scalar::Number(numeric(left, "-")? - numeric(right, "-")?),
        BinaryOp::Mul => Scalar::Number(numeric(left, "*")? * numeric(right, "*")?),
        BinaryOp::Div => Scalar::Number(numeric(left, "/")? / numeric(right, "/")?),
        BinaryOp::Rem => Scalar::Number(numeric(left, "%")? % numeric(right, "%")?),
        BinaryOp::Eq => Scalar::Bool(loosely_equal(left, right)),
        BinaryOp::NotEq => Scalar::Bool(!loosely_equal(left, right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right)?;
            Scalar::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
        BinaryOp::And | BinaryOp::Or => Scalar::Bool(right.truthy()),
    };
    Ok(result)
}

fn loosely_equal(left: &Scalar, right: &Scalar) -> bool {
    match (left, right) {
        (Scalar::Text(a), Scalar::Text(b)) => a == b,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare(left: &Scalar, right: &Scalar) -> Result<std::cmp::Ordering, ExpressionError> {
    if let (Scalar::Text(a), Scalar::Text(b)) = (left, right) {
        // Numeric strings order numerically, anything else lexicographically
        return Ok(match (left.as_number(), right.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            _ => a.cmp(b),
        });
    }
    let x = numeric(left, "comparison")?;
    let y = numeric(right, "comparison")?;
    x.partial_cmp(&y).ok_or_else(|| ExpressionError::TypeMismatch {
        operation: "comparison".to_string(),
        value: "NaN".to_string(),
    })
}

fn call(function: Function, args: &[f64]) -> f64 {
    match function {
        Function::Abs => args[0].abs(),
        Function::Sqrt => args[0].sqrt(),
        Function::Exp => args[0].exp(),
        Function::Ln => args[0].ln(),
        Function::Log10 => args[0].log10(),
        Function::Pow => args[0].powf(args[1]),
        Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
        Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Function::Round => args[0].round(),
        Function::Floor => args[0].floor(),
        Function::Ceil => args[0].ceil(),
    }
}
