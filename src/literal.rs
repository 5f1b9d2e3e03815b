//! Numeric literals: bare decimal (`42`) or hexadecimal prefixed with a slash (`/02A`).
//!
//! The same grammar is used for assembly operands and for values typed into the input channel,
//! so both reject anything that does not fit in 12 bits instead of truncating it.

use std::fmt;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    combinator::{all_consuming, map},
    sequence::preceded,
};

/// Largest value a literal may have.
pub const MAX_VALUE: u16 = 0xFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    /// The literal is well formed but does not fit in 12 bits.
    TooLarge {
        literal: String,
    },
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LiteralError::TooLarge { literal } =>
                write!(f, "{} cannot be represented in 12 bits", literal),
        }
    }
}

pub type ParseError = crate::error::ParseError<LiteralError>;
type Result<'a, T> = IResult<&'a str, T, ParseError>;

fn hexadecimal(input: &str) -> Result<(u32, &str)> {
    map(
        preceded(tag("/"), take_while1(|c: char| c.is_ascii_hexdigit())),
        |digits| (16, digits),
    )(input)
}

fn decimal(input: &str) -> Result<(u32, &str)> {
    map(
        take_while1(|c: char| c.is_ascii_digit()),
        |digits| (10, digits),
    )(input)
}

fn literal(input: &str) -> Result<(u32, &str)> {
    alt((hexadecimal, decimal))(input)
}

/// Parses a complete literal, ignoring surrounding whitespace.
///
/// # Errors
/// A grammar error if `input` is not a literal, [LiteralError::TooLarge] if its value is above
/// [MAX_VALUE].
pub fn parse_word(input: &str) -> std::result::Result<u16, ParseError> {
    let input = input.trim();

    let (radix, digits) = match all_consuming(literal)(input) {
        Ok((_, parsed)) => parsed,
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => return Err(err),
        Err(nom::Err::Incomplete(_)) => return Err(ParseError::incomplete()),
    };

    // Digits are validated already, so a conversion failure can only be an overflow.
    match u64::from_str_radix(digits, radix) {
        Ok(value) if value <= MAX_VALUE as u64 => Ok(value as u16),
        _ => Err(ParseError::from_kind(
            input.to_string(),
            LiteralError::TooLarge { literal: input.to_string() },
        )),
    }
}

#[test]
fn test_parse_word() {
    assert_eq!(parse_word("0"), Ok(0));
    assert_eq!(parse_word("4095"), Ok(4095));
    assert_eq!(parse_word("/fff"), Ok(0xFFF));
    assert_eq!(parse_word("/00A"), Ok(10));
    assert_eq!(parse_word("  12\n"), Ok(12));
}

#[test]
fn test_parse_word_too_large() {
    let err = parse_word("4096").unwrap_err();
    assert_eq!(err.kind(), Some(&LiteralError::TooLarge { literal: "4096".into() }));

    let err = parse_word("/1000").unwrap_err();
    assert!(err.kind().is_some());

    let err = parse_word("99999999999999999999999").unwrap_err();
    assert!(err.kind().is_some());
}

#[test]
fn test_parse_word_malformed() {
    for input in &["", "abc", "/", "12a", "-1", "/xyz", "1 2"] {
        let err = parse_word(input).unwrap_err();
        assert_eq!(err.kind(), None, "input {:?}", input);
    }
}

#[test]
fn test_error_location() {
    let err = parse_word("/12G").unwrap_err();
    let verbose = err.verbose("/12G");

    assert_eq!(verbose.column, 4);
    assert_eq!(verbose.to_string(), "at col 4: unexpected input, at 'G'");
}
