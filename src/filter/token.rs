use strum::{Display, EnumString};

use crate::error::{Result, VcfError};
use crate::parser;
use crate::types::{FieldType, FieldTypes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum Operator {
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "|")]
    Or,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "<")]
    LessThan,
}

impl Operator {
    /// Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Multiply | Operator::Divide => 8,
            Operator::Add | Operator::Subtract => 7,
            Operator::Not => 6,
            Operator::Equal | Operator::GreaterThan | Operator::LessThan => 5,
            Operator::And => 4,
            Operator::Or => 3,
        }
    }

    pub fn is_left_associative(self) -> bool {
        self != Operator::Not
    }
}

/// A lexical unit of a filter spec. Operands are classified against the field registry
/// before they reach the parser; `Operand` only exists between lexing and classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleToken {
    Operand(String),
    Number(f64),
    BooleanVariable(String),
    NumericVariable(String),
    StringVariable(String),
    Operator(Operator),
    LeftParenthesis,
    RightParenthesis,
}

impl RuleToken {
    pub fn is_operand(&self) -> bool {
        match self {
            RuleToken::Operand(_)
            | RuleToken::Number(_)
            | RuleToken::BooleanVariable(_)
            | RuleToken::NumericVariable(_)
            | RuleToken::StringVariable(_) => true,
            RuleToken::Operator(_) | RuleToken::LeftParenthesis | RuleToken::RightParenthesis => {
                false
            }
        }
    }
}

fn classify(lexeme: String, position: usize, variables: &FieldTypes) -> Result<RuleToken> {
    match variables.get(&lexeme) {
        Some(FieldType::Boolean) => Ok(RuleToken::BooleanVariable(lexeme)),
        Some(FieldType::Float) | Some(FieldType::Integer) => Ok(RuleToken::NumericVariable(lexeme)),
        Some(FieldType::String) | Some(FieldType::Unknown) => Ok(RuleToken::StringVariable(lexeme)),
        None => match lexeme.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(RuleToken::Number(number)),
            _ => Err(VcfError::UnrecognizedOperand { lexeme, position }),
        },
    }
}

/// Lexes `spec` into infix order, resolving identifiers against `variables`.
pub fn tokenize(spec: &str, variables: &FieldTypes) -> Result<Vec<RuleToken>> {
    parser::filter_lexemes(spec)?
        .into_iter()
        .map(|(position, token)| match token {
            RuleToken::Operand(lexeme) => classify(lexeme, position, variables),
            token => Ok(token),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn variables() -> FieldTypes {
        vec![
            ("DP", FieldType::Integer),
            ("AF", FieldType::Float),
            ("DB", FieldType::Boolean),
            ("FILTER", FieldType::String),
            ("ANN", FieldType::Unknown),
        ]
        .into_iter()
        .map(|(k, t)| (k.to_owned(), t))
        .collect()
    }

    #[test]
    fn test_classification() {
        let tokens = tokenize("DP AF DB FILTER ANN 3 0.25 2-3", &variables()).unwrap();
        assert_eq!(
            tokens,
            vec![
                RuleToken::NumericVariable("DP".into()),
                RuleToken::NumericVariable("AF".into()),
                RuleToken::BooleanVariable("DB".into()),
                RuleToken::StringVariable("FILTER".into()),
                RuleToken::StringVariable("ANN".into()),
                RuleToken::Number(3.0),
                RuleToken::Number(0.25),
                // '-' always separates tokens
                RuleToken::Number(2.0),
                RuleToken::Operator(Operator::Subtract),
                RuleToken::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_registry_wins_over_number() {
        let mut variables = variables();
        variables.insert("10".into(), FieldType::String);
        assert_eq!(
            tokenize("10", &variables).unwrap(),
            vec![RuleToken::StringVariable("10".into())]
        );
    }

    #[test]
    fn test_unknown_identifier() {
        assert_eq!(
            tokenize("DP > 3 & FOO > 3", &variables()),
            Err(VcfError::UnrecognizedOperand {
                lexeme: "FOO".into(),
                position: 9
            })
        );
        assert!(tokenize("DP > 3x", &variables()).is_err());
        assert!(tokenize("DP > inf", &variables()).is_err());
        // lexes as "1e", "-", "3"
        assert!(tokenize("AF < 1e-3", &variables()).is_err());
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!("&".parse::<Operator>().unwrap(), Operator::And);
        assert_eq!(Operator::LessThan.to_string(), "<");
        assert!(Operator::Multiply.precedence() > Operator::Add.precedence());
        assert!(Operator::And.precedence() > Operator::Or.precedence());
        assert!(!Operator::Not.is_left_associative());
    }
}
