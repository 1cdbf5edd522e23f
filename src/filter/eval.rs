use log::trace;

use crate::error::{Result, VcfError};
use crate::filter::token::{Operator, RuleToken};
use crate::record::Variant;

/// A resolved operand. Numbers and strings carry `None` when the context has no value
/// for them; flags are never missing.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Option<f64>),
    String(Option<String>),
    Boolean(bool),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
        }
    }
}

/// Where variables are looked up: INFO of the record without a sample, the sample's
/// FORMAT values otherwise; at an alternate allele if `allele` is set.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub variant: &'a Variant,
    pub sample: Option<&'a str>,
    pub allele: Option<usize>,
}

impl<'a> Context<'a> {
    fn resolve(&self, token: &RuleToken) -> Result<Value> {
        let Context {
            variant,
            sample,
            allele,
        } = *self;
        let value = match token {
            RuleToken::Number(n) => Value::Number(Some(*n)),
            RuleToken::NumericVariable(key) => {
                Value::Number(variant.value_float(key, sample, allele)?)
            }
            RuleToken::StringVariable(key) => {
                Value::String(variant.value_string(key, sample, allele)?)
            }
            RuleToken::BooleanVariable(key) => Value::Boolean(variant.value_bool(key, sample)?),
            RuleToken::Operand(lexeme) => {
                return Err(VcfError::MalformedFilter(format!(
                    "unclassified operand {}",
                    lexeme
                )))
            }
            RuleToken::Operator(_) | RuleToken::LeftParenthesis | RuleToken::RightParenthesis => {
                return Err(VcfError::MalformedFilter(format!(
                    "{:?} is not an operand",
                    token
                )))
            }
        };
        if let Value::Number(None) | Value::String(None) = value {
            trace!("no value for {:?}", token);
        }
        Ok(value)
    }
}

fn pop(stack: &mut Vec<Value>, op: Operator) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| VcfError::MalformedFilter(format!("missing operand for '{}'", op)))
}

fn arithmetic(l: Option<f64>, r: Option<f64>, f: impl FnOnce(f64, f64) -> f64) -> Value {
    Value::Number(l.zip(r).map(|(l, r)| f(l, r)))
}

/// A comparison involving a missing value is false.
fn compare<T>(l: Option<T>, r: Option<T>, f: impl FnOnce(T, T) -> bool) -> Value {
    Value::Boolean(l.zip(r).map_or(false, |(l, r)| f(l, r)))
}

fn apply(op: Operator, stack: &mut Vec<Value>) -> Result<Value> {
    use Value::{Boolean, Number};

    if op == Operator::Not {
        return match pop(stack, op)? {
            Boolean(b) => Ok(Boolean(!b)),
            other => Err(VcfError::TypeMismatch {
                operator: op,
                operands: other.kind().into(),
            }),
        };
    }

    let right = pop(stack, op)?;
    let left = pop(stack, op)?;
    Ok(match (op, left, right) {
        (Operator::Add, Number(l), Number(r)) => arithmetic(l, r, |l, r| l + r),
        (Operator::Subtract, Number(l), Number(r)) => arithmetic(l, r, |l, r| l - r),
        (Operator::Multiply, Number(l), Number(r)) => arithmetic(l, r, |l, r| l * r),
        (Operator::Divide, Number(_), Number(Some(r))) if r == 0.0 => {
            return Err(VcfError::DivisionByZero)
        }
        (Operator::Divide, Number(l), Number(r)) => arithmetic(l, r, |l, r| l / r),
        (Operator::Equal, Number(l), Number(r)) => compare(l, r, |l, r| l == r),
        (Operator::GreaterThan, Number(l), Number(r)) => compare(l, r, |l, r| l > r),
        (Operator::LessThan, Number(l), Number(r)) => compare(l, r, |l, r| l < r),
        (Operator::Equal, Value::String(l), Value::String(r)) => compare(l, r, |l, r| l == r),
        (Operator::GreaterThan, Value::String(l), Value::String(r)) => compare(l, r, |l, r| l > r),
        (Operator::LessThan, Value::String(l), Value::String(r)) => compare(l, r, |l, r| l < r),
        (Operator::And, Boolean(l), Boolean(r)) => Boolean(l && r),
        (Operator::Or, Boolean(l), Boolean(r)) => Boolean(l || r),
        (op, left, right) => {
            return Err(VcfError::TypeMismatch {
                operator: op,
                operands: format!("{} and {}", left.kind(), right.kind()),
            })
        }
    })
}

/// Runs a postfix rule sequence in `context`.
///
/// Operand types are checked whether or not the context holds a value for them. A missing
/// value propagates through arithmetic and makes any comparison it takes part in false;
/// `&`, `|` and `!` then combine the results as usual.
pub fn evaluate(rules: &[RuleToken], context: Context) -> Result<bool> {
    let mut stack: Vec<Value> = Vec::new();
    for token in rules {
        let value = match token {
            RuleToken::Operator(op) => apply(*op, &mut stack)?,
            operand => context.resolve(operand)?,
        };
        stack.push(value);
    }
    match stack.as_slice() {
        [Value::Boolean(verdict)] => Ok(*verdict),
        [other] => Err(VcfError::MalformedFilter(format!(
            "filter yields a {} instead of a boolean",
            other.kind()
        ))),
        remaining => Err(VcfError::MalformedFilter(format!(
            "{} values left after evaluation",
            remaining.len()
        ))),
    }
}
