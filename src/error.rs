use std::fmt::{Display, self};
use nom::error::ErrorKind;

#[derive(Debug, Clone, PartialEq)]
enum InnerError<Kind> {
    Incomplete,
    Context(&'static str),
    Other(Kind),
    Nom(ErrorKind),
}

impl<Kind: Display> fmt::Display for InnerError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InnerError::Context(ctx) => write!(f, "invalid {}", ctx),
            InnerError::Nom(_err) => write!(f, "unexpected input"),
            InnerError::Other(kind) => fmt::Display::fmt(kind, f),
            InnerError::Incomplete => write!(f, "expected more input"),
        }
    }
}

/// Error type that contains the reason of the error and the unconsumed input.
///
/// For error location information see [ParseError::verbose].
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError<Kind> {
    stack: Vec<(String, InnerError<Kind>)>,
}

impl<Kind> ParseError<Kind> {
    pub(crate) fn from_kind(input: String, kind: Kind) -> ParseError<Kind> {
        ParseError {
            stack: vec![(input, InnerError::Other(kind))],
        }
    }

    pub(crate) fn incomplete() -> ParseError<Kind> {
        ParseError {
            stack: vec![(String::new(), InnerError::Incomplete)],
        }
    }

    /// Returns the domain specific reason of the error, if the error was not raised by the
    /// grammar itself.
    pub fn kind(&self) -> Option<&Kind> {
        self.stack.iter().find_map(|(_, inner)| match inner {
            InnerError::Other(kind) => Some(kind),
            _ => None,
        })
    }
}

/// Error type containing location information in addition to the reason of the error.
///
/// Created from a [ParseError] with [ParseError::verbose].
#[derive(Clone, Debug)]
pub struct VerboseParseError<'a, Kind> {
    /// The column number of the error location, starting from 1.
    pub column: usize,
    kind: InnerError<Kind>,
    rest: &'a str,
}

impl<'a, Kind: Display> fmt::Display for VerboseParseError<'a, Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "at col {}: {}, at '{}'", self.column, self.kind, self.rest)
    }
}

impl<Kind> ParseError<Kind> {
    /// Calculates the error location from the [ParseError] and the original input.
    ///
    /// # Parameters
    /// - `input`: The original input buffer or an exact copy of it.
    pub fn verbose(self, input: &str) -> VerboseParseError<Kind> {
        let (rest, kind) = self.stack
            .into_iter()
            .next()
            .unwrap_or((String::new(), InnerError::Incomplete));

        let start = input.len().saturating_sub(rest.len());
        let column = input.get(..start).map(|s| s.chars().count()).unwrap_or(start) + 1;

        VerboseParseError {
            column,
            kind,
            rest: input.get(start..).unwrap_or(""),
        }
    }
}

impl<Kind: Display> fmt::Display for ParseError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (input, kind) = &self.stack[0];

        let end = input
            .char_indices()
            .nth(20)
            .map(|(i, _)| i)
            .unwrap_or(input.len());

        if end == 0 {
            write!(f, "{}", kind)
        } else {
            write!(f, "{} at: {}", kind, &input[..end])
        }
    }
}

impl<Kind: Display + fmt::Debug> std::error::Error for ParseError<Kind> {}

impl<Kind> nom::error::ParseError<&str> for ParseError<Kind> {
    fn from_error_kind(input: &str, kind: ErrorKind) -> Self {
        ParseError {
            stack: vec![(input.to_string(), InnerError::Nom(kind))],
        }
    }

    fn append(input: &str, kind: ErrorKind, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Nom(kind)));
        other
    }

    fn add_context(input: &str, ctx: &'static str, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Context(ctx)));
        other
    }
}

/// Reason of an [AssemblyError].
#[derive(Clone, Debug, PartialEq)]
pub enum AssemblyErrorKind {
    /// The line does not follow the grammar.
    ParseFault(String),

    /// A symbol was declared a second time.
    NameConflict {
        symbol: String,
        previous_line: usize,
    },

    /// A symbol was referenced but never declared.
    UndeclaredSymbol {
        symbol: String,
        /// The declared symbol closest to the misspelled one, if any is close enough.
        suggestion: Option<String>,
    },

    CapacityExceeded(Capacity),
}

/// What exactly did not fit.
#[derive(Clone, Debug, PartialEq)]
pub enum Capacity {
    /// The program would reach past the last memory cell.
    Program {
        origin: u16,
        length: usize,
        address: usize,
    },

    /// A literal is larger than its field allows.
    Literal {
        literal: String,
        limit: u16,
    },

    /// The program has more words than the one byte length field of the image can count.
    ImageLength {
        words: usize,
    },
}

/// Error raised while assembling a program. Aborts the whole assembly run.
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyError {
    /// Line number in the source, starting from 1.
    pub line: usize,

    /// The offending token or, if no single token is to blame, the offending line.
    pub token: String,

    pub kind: AssemblyErrorKind,
}

impl AssemblyError {
    pub fn new<T: Into<String>>(line: usize, token: T, kind: AssemblyErrorKind) -> AssemblyError {
        AssemblyError {
            line,
            token: token.into(),
            kind,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Capacity::Program { origin, length, address } => write!(
                f,
                "the program will not fit in memory (initial address: {}, program length: {}, {} >= {})",
                origin, length, address, crate::memory::MEMORY_SIZE,
            ),
            Capacity::Literal { literal, limit } =>
                write!(f, "{} does not fit in the range 0..={}", literal, limit),
            Capacity::ImageLength { words } =>
                write!(f, "{} words do not fit in the length field of the image", words),
        }
    }
}

impl fmt::Display for AssemblyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssemblyErrorKind::ParseFault(reason) => write!(f, "parse fault: {}", reason),
            AssemblyErrorKind::NameConflict { symbol, previous_line } => write!(
                f,
                "name conflict: symbol '{}' already declared on line {}",
                symbol, previous_line,
            ),
            AssemblyErrorKind::UndeclaredSymbol { symbol, suggestion: None } =>
                write!(f, "symbol '{}' was never declared", symbol),
            AssemblyErrorKind::UndeclaredSymbol { symbol, suggestion: Some(suggestion) } => write!(
                f,
                "symbol '{}' was never declared, did you mean '{}'?",
                symbol, suggestion,
            ),
            AssemblyErrorKind::CapacityExceeded(capacity) =>
                write!(f, "capacity exceeded: {}", capacity),
        }
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}, at '{}'", self.line, self.kind, self.token)
    }
}

impl std::error::Error for AssemblyError {}
