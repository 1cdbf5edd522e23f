use thiserror::Error;

use crate::filter::Operator;

pub type Result<T> = std::result::Result<T, VcfError>;

/// Everything that can go wrong while reading headers and records, compiling filters or
/// evaluating them. None of these are fatal for a batch; callers decide whether to skip
/// the offending record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VcfError {
    #[error("unrecognized operand '{lexeme}' at position {position}")]
    UnrecognizedOperand { lexeme: String, position: usize },

    #[error("unbalanced parentheses in filter '{spec}'")]
    UnbalancedParentheses { spec: String },

    #[error("operator '{operator}' cannot be applied to {operands}")]
    TypeMismatch { operator: Operator, operands: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    #[error("a {expected} filter cannot be applied here")]
    WrongFilterKind { expected: String },

    #[error("field {key} declares {expected} values but has {found}")]
    CardinalityMismatch {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed genotype '{0}'")]
    MalformedGenotype(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("malformed header line '{0}'")]
    MalformedHeader(String),

    #[error("no field {0} is declared in the header")]
    UnknownField(String),

    #[error("no sample named {0}")]
    UnknownSample(String),

    #[error("cannot read '{value}' of field {key} as {kind}")]
    InvalidValue {
        key: String,
        value: String,
        kind: String,
    },

    #[error("field {0} holds several values; an allele index is required")]
    MultiValued(String),

    #[error("field {key} has no value for allele index {index}")]
    IndexOutOfRange { key: String, index: usize },
}
