use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{escaped, is_not, tag, take_till1};
use nom::character::complete::{char, digit1, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, rest, value};
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::IResult;

use crate::error::{Result, VcfError};
use crate::filter::{Operator, RuleToken};
use crate::types::FieldNumber;

const OPERATOR_CHARS: &str = "!&|=><+-*/";

fn number(input: &str) -> IResult<&str, FieldNumber> {
    alt((
        map_res(digit1, |d: &str| d.parse::<usize>().map(FieldNumber::Count)),
        value(FieldNumber::AlternateAlleles, char('A')),
        value(FieldNumber::Alleles, char('R')),
        value(FieldNumber::Genotypes, char('G')),
        value(FieldNumber::Unknown, char('.')),
    ))(input)
}

/// Parses the value of a `Number=` header attribute.
pub(crate) fn field_number(input: &str) -> Result<FieldNumber> {
    all_consuming(number)(input)
        .map(|(_, number)| number)
        .map_err(|_| VcfError::MalformedHeader(format!("Number={}", input)))
}

fn index(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |d: &str| d.parse::<u32>())(input)
}

/// An allele index of a genotype call: ASCII digits only, no sign.
pub(crate) fn allele_index(input: &str) -> Option<u32> {
    all_consuming(index)(input).map(|(_, index)| index).ok()
}

fn string(input: &str) -> IResult<&str, &str> {
    delimited(
        char('"'),
        map(opt(escaped(is_not("\\\""), '\\', one_of("\\\""))), |s: Option<&str>| {
            s.unwrap_or("")
        }),
        char('"'),
    )(input)
}

fn keys_and_values(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
        separated_pair(is_not("<,=>"), char('='), alt((string, is_not(",>"))))(input)
    }
    separated_list0(char(','), key_value)(input)
}

/// Splits `##key=value` into its key and value.
pub(crate) fn meta_line(line: &str) -> Result<(&str, &str)> {
    fn meta(input: &str) -> IResult<&str, (&str, &str)> {
        preceded(tag("##"), separated_pair(is_not("="), char('='), rest))(input)
    }
    meta(line)
        .map(|(_, kv)| kv)
        .map_err(|_| VcfError::MalformedHeader(line.into()))
}

/// Reads a structured meta value such as `<ID=DP,Number=1,Type=Integer,Description="...">`.
pub(crate) fn structured_value(value: &str) -> Result<Vec<(&str, &str)>> {
    all_consuming(delimited(char('<'), keys_and_values, char('>')))(value)
        .map(|(_, data)| data)
        .map_err(|_| VcfError::MalformedHeader(value.into()))
}

fn ends_operand(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')' || OPERATOR_CHARS.contains(c)
}

fn lexeme(input: &str) -> IResult<&str, RuleToken> {
    alt((
        map_res(one_of(OPERATOR_CHARS), |c: char| {
            Operator::from_str(c.encode_utf8(&mut [0; 4])).map(RuleToken::Operator)
        }),
        value(RuleToken::LeftParenthesis, char('(')),
        value(RuleToken::RightParenthesis, char(')')),
        map(take_till1(ends_operand), |s: &str| RuleToken::Operand(s.into())),
    ))(input)
}

/// Splits a filter spec into operator, parenthesis and (still unclassified) operand tokens,
/// each paired with its byte offset into `spec`.
pub(crate) fn filter_lexemes(spec: &str) -> Result<Vec<(usize, RuleToken)>> {
    let mut tokens = Vec::new();
    let mut input = spec.trim_start();
    while !input.is_empty() {
        let position = spec.len() - input.len();
        let (remaining, token) = lexeme(input).map_err(|_| VcfError::UnrecognizedOperand {
            lexeme: input.chars().take_while(|c| !c.is_whitespace()).collect(),
            position,
        })?;
        tokens.push((position, token));
        input = remaining.trim_start();
    }
    Ok(tokens)
}
