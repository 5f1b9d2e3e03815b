//! Tokens and a tokenizer for assembly source lines.

use logos::Logos;

use std::fmt;

/// Enumeration of all tokens of the assembly language.
///
/// Mnemonics are not distinguished from symbols here; a [Token::Word] is classified by the
/// parser, which knows where a mnemonic may appear.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
pub enum Token<'a> {
    /// Errorneous token that could not be interpreted as any of the other variants.
    #[error]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[regex(r";[^\n]*", logos::skip)]
    Error,

    /// A mnemonic, the `K` pseudo-op or a symbol. Begins with a letter or an underscore and can
    /// contain the characters `A-Za-z0-9_`.
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Word(&'a str),

    /// One of the arithmetic mnemonics `+`, `-`, `*` and `/`.
    #[regex("[-+*/]")]
    Operator(&'a str),

    /// An unsigned decimal literal.
    #[regex("[0-9]+")]
    Decimal(&'a str),

    /// A hexadecimal literal prefixed with a slash. (Eg. `/0FF`).
    #[regex("/[0-9A-Fa-f]+")]
    Hexadecimal(&'a str),

    /// Token (`@`) of the origin pseudo-op.
    #[token("@")]
    OriginMarker,

    /// Token (`#`) of the end pseudo-op.
    #[token("#")]
    EndMarker,
}

impl<'t> fmt::Display for Token<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Word(word) => write!(f, "{}", word),
            Token::Operator(op) => write!(f, "{}", op),
            Token::Decimal(num) => write!(f, "{}", num),
            Token::Hexadecimal(num) => write!(f, "{}", num),
            Token::OriginMarker => write!(f, "@"),
            Token::EndMarker => write!(f, "#"),
        }
    }
}

#[test]
fn test_tokenize_line() {
    let tokens = Token::lexer("LOOP + /00A ; add ten").collect::<Vec<_>>();

    assert_eq!(tokens, vec![
        Token::Word("LOOP"),
        Token::Operator("+"),
        Token::Hexadecimal("/00A"),
    ]);
}

#[test]
fn test_tokenize_divide_and_hex() {
    let tokens = Token::lexer("/ /005").collect::<Vec<_>>();
    assert_eq!(tokens, vec![Token::Operator("/"), Token::Hexadecimal("/005")]);

    let tokens = Token::lexer("@ 256").collect::<Vec<_>>();
    assert_eq!(tokens, vec![Token::OriginMarker, Token::Decimal("256")]);

    let tokens = Token::lexer("X K 5 $").collect::<Vec<_>>();
    assert_eq!(tokens, vec![Token::Word("X"), Token::Word("K"), Token::Decimal("5"), Token::Error]);
}
