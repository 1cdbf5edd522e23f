use log::trace;

use crate::error::{Result, VcfError};
use crate::filter::token::RuleToken;

/// Reorders an infix token sequence into postfix (reverse-Polish) order, so that every
/// operator follows its operands and a single operand stack suffices for evaluation.
///
/// Parentheses only group and never reach the output.
pub fn to_postfix(spec: &str, infix: Vec<RuleToken>) -> Result<Vec<RuleToken>> {
    let unbalanced = || VcfError::UnbalancedParentheses { spec: spec.into() };
    let mut output = Vec::with_capacity(infix.len());
    let mut operators: Vec<RuleToken> = Vec::new();

    for token in infix {
        match token {
            RuleToken::LeftParenthesis => operators.push(token),
            RuleToken::RightParenthesis => loop {
                match operators.pop() {
                    Some(RuleToken::LeftParenthesis) => break,
                    Some(op) => output.push(op),
                    None => return Err(unbalanced()),
                }
            },
            RuleToken::Operator(op) => {
                while let Some(RuleToken::Operator(top)) = operators.last() {
                    if top.precedence() > op.precedence()
                        || (top.precedence() == op.precedence() && op.is_left_associative())
                    {
                        output.push(RuleToken::Operator(*top));
                        operators.pop();
                    } else {
                        break;
                    }
                }
                operators.push(token);
            }
            operand => {
                debug_assert!(operand.is_operand());
                output.push(operand);
            }
        }
    }

    while let Some(token) = operators.pop() {
        if token == RuleToken::LeftParenthesis {
            return Err(unbalanced());
        }
        output.push(token);
    }
    trace!("{} in postfix order: {:?}", spec, output);
    Ok(output)
}
