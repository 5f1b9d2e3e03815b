use slog::Logger;

use crate::bytecode;
use crate::compiler::{self, Listing};
use crate::error::{AssemblyError, AssemblyErrorKind, Capacity};
use crate::instruction::OpCode;
use crate::literal::{self, LiteralError};

use super::parser::{Argument, Line, LineParser, Name, ParseError};

/// Largest value a constant cell can hold.
pub const MAX_CONSTANT: u16 = 0xFF;

/// The argument of an instruction after literal validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(u16),
    Symbol(String),
}

/// A parsed but not yet placed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `@ ARG`, sets the address the program is assembled for.
    Origin(u16),

    /// A bare label, names the next free address.
    Label(String),

    /// `NAME K ARG`, reserves one cell holding `value`.
    Constant {
        name: String,
        value: u8,
    },

    Instruction {
        opcode: OpCode,
        operand: Operand,
    },

    /// `# [NAME]`, ends the program. `NAME` is the entry point.
    End(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Line number in the source, starting from 1.
    pub line: usize,
    /// The source line, trimmed.
    pub source: String,
    pub statement: Statement,
}

/// An assembly program as an ordered sequence of statements.
#[derive(Debug, Default, Clone)]
pub struct Program {
    pub entries: Vec<Entry>,
}

fn literal_value(line: usize, name: &Name) -> Result<u16, AssemblyError> {
    literal::parse_word(name.text).map_err(|err| {
        let kind = match err.kind().cloned() {
            Some(LiteralError::TooLarge { literal: text }) =>
                AssemblyErrorKind::CapacityExceeded(Capacity::Literal {
                    literal: text,
                    limit: literal::MAX_VALUE,
                }),
            None => AssemblyErrorKind::ParseFault(format!("invalid literal {}", err.verbose(name.text))),
        };

        AssemblyError::new(line, name.text, kind)
    })
}

fn parse_fault(line: usize, source: &str, err: ParseError) -> AssemblyError {
    let token = err.span()
        .and_then(|span| source.get(span.clone()))
        .unwrap_or_else(|| source.trim());

    AssemblyError::new(line, token, AssemblyErrorKind::ParseFault(err.reason()))
}

/// Checks the parts of a parsed line the grammar cannot, and lowers it to statements.
pub fn validate_line(line: usize, parsed: Line) -> Result<Vec<Statement>, AssemblyError> {
    match parsed {
        Line::Empty => Ok(Vec::new()),
        Line::Origin(Argument::Literal(name)) =>
            Ok(vec![Statement::Origin(literal_value(line, &name)?)]),
        Line::Origin(Argument::Symbol(name)) => Err(AssemblyError::new(
            line,
            name.text,
            AssemblyErrorKind::ParseFault("the origin must be a literal".into()),
        )),
        Line::End(name) => Ok(vec![Statement::End(name.map(|name| name.text.to_string()))]),
        Line::Constant { name, value: Argument::Literal(value) } => {
            let number = literal_value(line, &value)?;

            if number > MAX_CONSTANT {
                let kind = AssemblyErrorKind::CapacityExceeded(Capacity::Literal {
                    literal: value.text.to_string(),
                    limit: MAX_CONSTANT,
                });

                return Err(AssemblyError::new(line, value.text, kind));
            }

            Ok(vec![Statement::Constant {
                name: name.text.to_string(),
                value: number as u8,
            }])
        },
        Line::Constant { value: Argument::Symbol(value), .. } => Err(AssemblyError::new(
            line,
            value.text,
            AssemblyErrorKind::ParseFault("the value of a constant must be a literal".into()),
        )),
        Line::Label(name) => Ok(vec![Statement::Label(name.text.to_string())]),
        Line::Statement { label, opcode, argument, .. } => {
            let mut statements = Vec::new();

            if let Some(label) = label {
                statements.push(Statement::Label(label.text.to_string()));
            }

            let operand = match argument {
                None => Operand::Literal(0),
                Some(Argument::Literal(name)) => Operand::Literal(literal_value(line, &name)?),
                Some(Argument::Symbol(name)) => Operand::Symbol(name.text.to_string()),
            };

            statements.push(Statement::Instruction { opcode, operand });

            Ok(statements)
        },
    }
}

fn parse_source_line(line: usize, source: &str) -> Result<Vec<Entry>, AssemblyError> {
    let parsed = LineParser::new(source)
        .parse_line()
        .map_err(|err| parse_fault(line, source, err))?;

    let entries = validate_line(line, parsed)?
        .into_iter()
        .map(|statement| Entry {
            line,
            source: source.trim().to_string(),
            statement,
        })
        .collect();

    Ok(entries)
}

impl Program {
    /// Parses assembly source. Stops at the first faulty line.
    pub fn parse(source: &str) -> Result<Program, AssemblyError> {
        let mut entries = Vec::new();

        for (index, text) in source.lines().enumerate() {
            entries.extend(parse_source_line(index + 1, text)?);
        }

        Ok(Program { entries })
    }

    /// Parses assembly source and reports every faulty line instead of only the first one.
    pub fn parse_verbose(source: &str) -> Result<Program, Vec<AssemblyError>> {
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for (index, text) in source.lines().enumerate() {
            match parse_source_line(index + 1, text) {
                Ok(parsed) => entries.extend(parsed),
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Program { entries })
    }

    /// Assembles the program into a binary image.
    pub fn compile(&self) -> Result<bytecode::Program, AssemblyError> {
        compiler::compile(self)
    }

    /// Assembles the program and keeps the symbols and the source map.
    pub fn compile_listing(&self) -> Result<Listing, AssemblyError> {
        compiler::compile_listing(self, None::<Logger>)
    }
}

#[test]
fn test_parse_program() {
    let program = Program::parse(r#"
        ; countdown
        @ /100
        LOOP LD COUNT
             PD
        COUNT K 3
        # LOOP
    "#).unwrap();

    let statements = program.entries.iter()
        .map(|entry| entry.statement.clone())
        .collect::<Vec<_>>();

    assert_eq!(statements, vec![
        Statement::Origin(0x100),
        Statement::Label("LOOP".into()),
        Statement::Instruction { opcode: OpCode::Load, operand: Operand::Symbol("COUNT".into()) },
        Statement::Instruction { opcode: OpCode::PutData, operand: Operand::Literal(0) },
        Statement::Constant { name: "COUNT".into(), value: 3 },
        Statement::End(Some("LOOP".into())),
    ]);

    assert_eq!(program.entries[1].line, 4);
    assert_eq!(program.entries[1].source, "LOOP LD COUNT");
}

#[test]
fn test_parse_literal_range() {
    let err = Program::parse("LV 4096").unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.token, "4096");
    assert!(matches!(err.kind, AssemblyErrorKind::CapacityExceeded(Capacity::Literal { limit: 4095, .. })));

    let err = Program::parse("\nBIG K 256").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, AssemblyErrorKind::CapacityExceeded(Capacity::Literal { limit: 255, .. })));

    assert!(Program::parse("LV /FFF\nMAX K /FF").is_ok());
}

#[test]
fn test_parse_faults() {
    let err = Program::parse("LD X\nLD X Y\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.token, "Y");
    assert!(matches!(err.kind, AssemblyErrorKind::ParseFault(_)));

    let err = Program::parse("@ START").unwrap_err();
    assert!(matches!(err.kind, AssemblyErrorKind::ParseFault(_)));

    let errors = Program::parse_verbose("LD\nLV 1\nK 1\nMM 9999").unwrap_err();
    assert_eq!(errors.iter().map(|err| err.line).collect::<Vec<_>>(), vec![1, 3, 4]);
}
