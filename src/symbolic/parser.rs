//! Line grammar of the assembly language.
//!
//! ```text
//! line      := ε | '@' literal | '#' [name] | name 'K' literal
//!            | name | [name] mnemonic [argument]
//! argument  := literal | name
//! literal   := decimal | '/' hexdigits
//! ```

use logos::Logos;

use crate::instruction::OpCode;
use crate::parsing::{self, ErrorExt, Parser, Span, TokenStream};

use super::token::Token;

pub type ParseError = parsing::Error<&'static str>;
type Result<T> = std::result::Result<T, ParseError>;

/// A name together with its location in the line.
#[derive(Clone, Debug, PartialEq)]
pub struct Name<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// An argument exactly as written. Literals are validated later.
#[derive(Clone, Debug, PartialEq)]
pub enum Argument<'a> {
    Literal(Name<'a>),
    Symbol(Name<'a>),
}

/// Syntax tree of a single source line.
#[derive(Clone, Debug, PartialEq)]
pub enum Line<'a> {
    /// A blank or comment-only line.
    Empty,
    Origin(Argument<'a>),
    End(Option<Name<'a>>),
    Constant {
        name: Name<'a>,
        value: Argument<'a>,
    },
    Label(Name<'a>),
    Statement {
        label: Option<Name<'a>>,
        opcode: OpCode,
        mnemonic: Name<'a>,
        argument: Option<Argument<'a>>,
    },
}

/// Returns true for words that can never be used as symbols.
pub fn is_reserved(word: &str) -> bool {
    word.eq_ignore_ascii_case("K") || OpCode::from_mnemonic(word).is_some()
}

pub struct LineParser<'a> {
    tokens: TokenStream<Token<'a>>,
}

impl<'a> Parser for LineParser<'a> {
    type Token = Token<'a>;

    fn tokens(&mut self) -> &mut TokenStream<Token<'a>> {
        &mut self.tokens
    }
}

impl<'a> LineParser<'a> {
    pub fn new(line: &'a str) -> LineParser<'a> {
        LineParser {
            tokens: TokenStream::new(Token::lexer(line).spanned()),
        }
    }

    /// Parses the whole line. Fails if anything is left over.
    pub fn parse_line(&mut self) -> Result<Line<'a>> {
        let line = self.line()?;
        self.assert_end("end of line")?;
        Ok(line)
    }

    fn line(&mut self) -> Result<Line<'a>> {
        let (token, span) = match self.next_token() {
            None => return Ok(Line::Empty),
            Some(item) => item,
        };

        match token {
            Token::OriginMarker => {
                let argument = self.argument().context("origin")?;
                Ok(Line::Origin(argument))
            },
            Token::EndMarker => {
                let name = self.apply(|p: &mut LineParser<'a>| p.name())
                    .or_else(|err| if err.is_end_of_stream() { Ok(None) } else { Err(err) })
                    .context("end marker")?;
                Ok(Line::End(name))
            },
            Token::Operator(text) | Token::Word(text) if OpCode::from_mnemonic(text).is_some() => {
                let mnemonic = Name { text, span };
                self.statement(None, mnemonic)
            },
            Token::Word(text) if text.eq_ignore_ascii_case("K") =>
                Err(ParseError::new(span, "constant without a name")),
            Token::Word(text) => {
                let label = Name { text, span };
                self.after_label(label)
            },
            _ => Err(ParseError::new(span, "start of line")),
        }
    }

    fn after_label(&mut self, label: Name<'a>) -> Result<Line<'a>> {
        let (token, span) = match self.next_token() {
            None => return Ok(Line::Label(label)),
            Some(item) => item,
        };

        match token {
            Token::Word(text) if text.eq_ignore_ascii_case("K") => {
                let value = self.argument().context("constant")?;
                Ok(Line::Constant { name: label, value })
            },
            Token::Operator(text) | Token::Word(text) if OpCode::from_mnemonic(text).is_some() => {
                let mnemonic = Name { text, span };
                self.statement(Some(label), mnemonic)
            },
            _ => Err(ParseError::new(span, "mnemonic or K after a label")),
        }
    }

    fn statement(&mut self, label: Option<Name<'a>>, mnemonic: Name<'a>) -> Result<Line<'a>> {
        let opcode = match OpCode::from_mnemonic(mnemonic.text) {
            Some(opcode) => opcode,
            None => return Err(ParseError::new(mnemonic.span, "mnemonic")),
        };

        let argument = match self.apply(|p: &mut LineParser<'a>| p.argument()) {
            Ok(argument) => Some(argument),
            Err(err) if err.is_end_of_stream() && opcode.operand_optional() => None,
            Err(err) => return Err(err).context("statement"),
        };

        Ok(Line::Statement { label, opcode, mnemonic, argument })
    }

    fn name(&mut self) -> Result<Option<Name<'a>>> {
        match self.next_token() {
            Some((Token::Word(text), span)) if !is_reserved(text) => Ok(Some(Name { text, span })),
            Some((_, span)) => Err(ParseError::new(span, "name")),
            None => Err(ParseError::eos("name")),
        }
    }

    fn argument(&mut self) -> Result<Argument<'a>> {
        match self.next_token() {
            Some((Token::Decimal(text), span)) | Some((Token::Hexadecimal(text), span)) =>
                Ok(Argument::Literal(Name { text, span })),
            Some((Token::Word(text), span)) if !is_reserved(text) =>
                Ok(Argument::Symbol(Name { text, span })),
            Some((_, span)) => Err(ParseError::new(span, "argument")),
            None => Err(ParseError::eos("argument")),
        }
    }
}

#[cfg(test)]
fn parse(line: &str) -> Result<Line> {
    LineParser::new(line).parse_line()
}

#[test]
fn test_parse_statements() {
    match parse("LOOP ld /005 ; load").unwrap() {
        Line::Statement { label, opcode, argument, .. } => {
            assert_eq!(label.map(|l| l.text), Some("LOOP"));
            assert_eq!(opcode, OpCode::Load);
            assert!(matches!(argument, Some(Argument::Literal(Name { text: "/005", .. }))));
        },
        line => panic!("unexpected line {:?}", line),
    }

    match parse("  / X").unwrap() {
        Line::Statement { label: None, opcode: OpCode::Divide, argument: Some(Argument::Symbol(name)), .. } =>
            assert_eq!(name.text, "X"),
        line => panic!("unexpected line {:?}", line),
    }

    match parse("PD").unwrap() {
        Line::Statement { opcode: OpCode::PutData, argument: None, .. } => (),
        line => panic!("unexpected line {:?}", line),
    }
}

#[test]
fn test_parse_pseudo_ops() {
    assert_eq!(parse("").unwrap(), Line::Empty);
    assert_eq!(parse("   ; only a comment").unwrap(), Line::Empty);
    assert!(matches!(parse("@ /100").unwrap(), Line::Origin(Argument::Literal(_))));
    assert_eq!(parse("#").unwrap(), Line::End(None));
    assert!(matches!(parse("# MAIN").unwrap(), Line::End(Some(Name { text: "MAIN", .. }))));
    assert!(matches!(parse("TEN K 10").unwrap(), Line::Constant { .. }));
    assert!(matches!(parse("DONE").unwrap(), Line::Label(Name { text: "DONE", .. })));
}

#[test]
fn test_parse_errors() {
    let err = parse("LD").unwrap_err();
    assert!(err.is_end_of_stream());

    let err = parse("LD X Y").unwrap_err();
    assert_eq!(err.span(), Some(&(5..6)));

    assert!(parse("LD L").is_err());
    assert!(parse("K 5").is_err());
    assert!(parse("X Y").is_err());
    assert!(parse("# 12").is_err());
    assert!(parse("LD $").is_err());
}
