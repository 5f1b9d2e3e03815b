//! Backtracking helpers for the per-line recursive descent parser.

use std::fmt;
use std::ops::Range;
use itertools::Itertools;

#[derive(Clone, Debug, PartialEq)]
pub struct Error<Context> {
    pub kind: ErrorKind,
    pub context: Vec<Context>,
}

impl<C> Error<C> {
    pub fn new<T>(span: Span, ctx: T) -> Error<C> where T: Into<C> {
        Error {
            kind: ErrorKind::UnexpectedToken { span },
            context: vec![ctx.into()],
        }
    }

    pub fn eos<T>(ctx: T) -> Error<C> where T: Into<C> {
        Error {
            kind: ErrorKind::EndOfStream,
            context: vec![ctx.into()],
        }
    }

    pub fn span(&self) -> Option<&Span> {
        match self.kind {
            ErrorKind::EndOfStream => None,
            ErrorKind::UnexpectedToken { ref span } => Some(span),
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.kind == ErrorKind::EndOfStream
    }
}

impl<C: fmt::Display> Error<C> {
    /// Describes the error without position information, outermost context first.
    pub fn reason(&self) -> String {
        let ctx = self.context.iter()
            .rev()
            .join(": ");

        match self.kind {
            ErrorKind::EndOfStream => format!("{}: unexpected end of line", ctx),
            ErrorKind::UnexpectedToken { .. } => format!("{}: unexpected token", ctx),
        }
    }
}

pub trait ErrorExt<R,C> {
    fn context<T>(self, ctx: T) -> Self where T: Into<C>;
}

impl<R,C> ErrorExt<R,C> for Result<R, Error<C>> {
    fn context<T>(mut self, ctx: T) -> Self where T: Into<C> {
        if let Err(ref mut err) = self {
            err.context.push(ctx.into());
        }

        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    EndOfStream,
    UnexpectedToken {
        span: Span,
    },
}

pub type Span = Range<usize>;

impl<C> fmt::Display for Error<C>
where
    C: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::EndOfStream =>
                write!(f, "{}", self.reason()),
            ErrorKind::UnexpectedToken { ref span } =>
                write!(f, "error at position {}-{}: {}", span.start, span.end, self.reason()),
        }
    }
}

/// The tokens of one source line with a cursor that can be moved back.
#[derive(Clone, Debug)]
pub struct TokenStream<T> {
    tokens: Vec<(T, Span)>,
    position: usize,
}

impl<T: Clone> TokenStream<T> {
    pub fn new<I>(tokens: I) -> TokenStream<T> where I: IntoIterator<Item=(T, Span)> {
        TokenStream {
            tokens: tokens.into_iter().collect(),
            position: 0,
        }
    }

    pub fn next_token(&mut self) -> Option<(T, Span)> {
        let token = self.tokens.get(self.position).cloned()?;
        self.position += 1;
        Some(token)
    }
}

/// A recursive descent parser over a [TokenStream].
pub trait Parser: Sized {
    type Token: Clone;

    fn tokens(&mut self) -> &mut TokenStream<Self::Token>;

    /// Takes the next token from the line.
    fn next_token(&mut self) -> Option<(Self::Token, Span)> {
        self.tokens().next_token()
    }

    /// Runs `op` and moves the cursor back to where it was if `op` fails.
    fn apply<F,O,X>(&mut self, op: F) -> Result<O, Error<X>>
    where
        F: FnOnce(&mut Self) -> Result<O, Error<X>>,
    {
        let position = self.tokens().position;

        let result = op(self);

        if result.is_err() {
            self.tokens().position = position;
        }

        result
    }

    /// Fails unless every token of the line has been taken.
    fn assert_end<X>(&mut self, ctx: X) -> Result<(), Error<X>> {
        match self.next_token() {
            None => Ok(()),
            Some((_, span)) => Err(Error::new(span, ctx)),
        }
    }
}

#[cfg(test)]
struct Digits {
    tokens: TokenStream<char>,
}

#[cfg(test)]
impl Parser for Digits {
    type Token = char;

    fn tokens(&mut self) -> &mut TokenStream<char> {
        &mut self.tokens
    }
}

#[cfg(test)]
impl Digits {
    fn new(text: &str) -> Digits {
        Digits {
            tokens: TokenStream::new(text.char_indices().map(|(i, c)| (c, i..i + 1))),
        }
    }

    fn digit(&mut self) -> Result<u32, Error<&'static str>> {
        match self.next_token() {
            Some((c, span)) => c.to_digit(10).ok_or_else(|| Error::new(span, "digit")),
            None => Err(Error::eos("digit")),
        }
    }
}

#[test]
fn test_apply_rewinds() {
    let mut parser = Digits::new("4x");

    assert_eq!(parser.apply(|p: &mut Digits| p.digit()), Ok(4));

    let err = parser.apply(|p: &mut Digits| p.digit()).unwrap_err();
    assert_eq!(err.span(), Some(&(1..2)));
    assert_eq!(parser.assert_end("end"), Err(Error::new(1..2, "end")));

    assert_eq!(parser.next_token(), None);
    assert_eq!(parser.assert_end("end"), Ok(()));
}

#[test]
fn test_error_reason() {
    let err: Result<(), Error<&'static str>> = Err(Error::new(3..5, "operand"));
    let err = err.context("statement").unwrap_err();

    assert_eq!(err.reason(), "statement: operand: unexpected token");
    assert_eq!(err.to_string(), "error at position 3-5: statement: operand: unexpected token");
    assert_eq!(Error::<&'static str>::eos("origin").reason(), "origin: unexpected end of line");
}
