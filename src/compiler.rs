//! Two-pass compilation from assembly source to a program image.
//!
//! The first pass places every statement at its address and fills the [SymbolTable]. The second
//! pass resolves symbolic operands against the finished table and emits the image bytes. Both
//! passes are plain functions over the ordered [Entry] records of a [symbolic::Program].

use slog::{debug, o, trace, Discard, Logger};

use crate::bytecode::{self, ImageError, MAX_WORDS};
use crate::error::{AssemblyError, AssemblyErrorKind, Capacity};
use crate::instruction::{Instruction, OpCode};
use crate::memory::MEMORY_SIZE;
use crate::source_map::SourceMap;
use crate::symbol_table::SymbolTable;
use crate::symbolic::{self, Entry, Operand, Statement};

/// Content of a placed record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A single data cell declared with `K`.
    Cell(u8),
    Instruction {
        opcode: OpCode,
        operand: Operand,
    },
}

impl Record {
    /// Number of memory cells the record occupies.
    pub fn size(&self) -> usize {
        match self {
            Record::Cell(_) => 1,
            Record::Instruction { .. } => 2,
        }
    }
}

/// A record with its final address.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub line: usize,
    pub source: String,
    pub address: u16,
    pub record: Record,
}

/// Result of the first pass.
#[derive(Debug, Clone)]
pub struct Layout {
    pub origin: u16,
    /// Number of cells the records occupy.
    pub cells: usize,
    pub records: Vec<Placed>,
    pub symbols: SymbolTable,
    /// Entry point named by the end marker, with the line of the marker.
    pub entry: Option<(usize, String)>,
}

/// Output of a full compilation run.
#[derive(Debug, Clone)]
pub struct Listing {
    pub program: bytecode::Program,
    /// Every declared symbol, ordered by address.
    pub symbols: Vec<(String, u16)>,
    /// Source line of every emitted record.
    pub source_map: SourceMap<usize>,
}

fn parse_fault(entry: &Entry, reason: &str) -> AssemblyError {
    AssemblyError::new(entry.line, entry.source.clone(), AssemblyErrorKind::ParseFault(reason.into()))
}

/// Places every record and declares every symbol.
///
/// Fails on the first redeclared symbol, misplaced pseudo-op or record that would not fit in
/// memory. Nothing is emitted.
pub fn first_pass(program: &symbolic::Program, logger: &Logger) -> Result<Layout, AssemblyError> {
    let logger = logger.new(o!("stage" => "pass1"));

    let mut origin: Option<u16> = None;
    let mut started = false;
    let mut ended = false;

    let mut layout = Layout {
        origin: 0,
        cells: 0,
        records: Vec::new(),
        symbols: SymbolTable::new(),
        entry: None,
    };

    for entry in &program.entries {
        if ended {
            return Err(parse_fault(entry, "statement after the end marker"));
        }

        let base = origin.unwrap_or(0);
        let address = base as usize + layout.cells;

        let record = match &entry.statement {
            Statement::Origin(value) => {
                if started || origin.is_some() {
                    return Err(parse_fault(entry, "the origin must precede every label, constant and statement"));
                }

                trace!(logger, "set origin"; "origin" => value);

                origin = Some(*value);
                layout.origin = *value;
                continue;
            },
            Statement::End(name) => {
                trace!(logger, "end of program"; "line" => entry.line, "entry" => ?name);

                ended = true;
                layout.entry = name.clone().map(|name| (entry.line, name));
                continue;
            },
            Statement::Label(label) => {
                started = true;
                declare(&mut layout.symbols, entry, label, address, &logger)?;
                continue;
            },
            Statement::Constant { name, value } => {
                declare(&mut layout.symbols, entry, name, address, &logger)?;
                Record::Cell(*value)
            },
            Statement::Instruction { opcode, operand } => Record::Instruction {
                opcode: *opcode,
                operand: operand.clone(),
            },
        };

        started = true;

        // The image pads an odd body, so the padding byte has to fit as well.
        let length = layout.cells + record.size();
        let padded = (length + 1) & !1;

        if base as usize + padded >= MEMORY_SIZE {
            let kind = AssemblyErrorKind::CapacityExceeded(Capacity::Program {
                origin: base,
                length: padded,
                address: base as usize + padded,
            });

            return Err(AssemblyError::new(entry.line, entry.source.clone(), kind));
        }

        trace!(logger, "place record"; "address" => address, "size" => record.size(), "line" => entry.line);

        layout.records.push(Placed {
            line: entry.line,
            source: entry.source.clone(),
            address: address as u16,
            record,
        });

        layout.cells = length;
    }

    debug!(logger, "layout complete"; "origin" => layout.origin, "cells" => layout.cells, "symbols" => layout.symbols.len());

    Ok(layout)
}

fn declare(symbols: &mut SymbolTable, entry: &Entry, label: &str, address: usize, logger: &Logger) -> Result<(), AssemblyError> {
    trace!(logger, "declare symbol"; "symbol" => label, "address" => address);

    match symbols.define_symbol(entry.line, label, address as u16) {
        Ok(_) => Ok(()),
        Err(previous) => {
            let kind = AssemblyErrorKind::NameConflict {
                symbol: label.to_string(),
                previous_line: previous.defined,
            };

            Err(AssemblyError::new(entry.line, label, kind))
        },
    }
}

fn resolve(symbols: &SymbolTable, line: usize, label: &str) -> Result<u16, AssemblyError> {
    symbols.address_of(label).ok_or_else(|| {
        let kind = AssemblyErrorKind::UndeclaredSymbol {
            symbol: label.to_string(),
            suggestion: symbols.suggest(label).map(str::to_string),
        };

        AssemblyError::new(line, label, kind)
    })
}

/// Resolves every symbolic operand and emits the image.
pub fn second_pass(layout: Layout, logger: &Logger) -> Result<Listing, AssemblyError> {
    let logger = logger.new(o!("stage" => "pass2"));

    let mut body = Vec::with_capacity(layout.cells);
    let mut source_map = SourceMap::default();

    for placed in &layout.records {
        match &placed.record {
            Record::Cell(value) => body.push(*value),
            Record::Instruction { opcode, operand } => {
                let operand = match operand {
                    Operand::Literal(value) => *value,
                    Operand::Symbol(label) => {
                        let address = resolve(&layout.symbols, placed.line, label)?;
                        trace!(logger, "resolve symbol"; "symbol" => label, "address" => address);
                        address
                    },
                };

                body.extend_from_slice(&Instruction::new(*opcode, operand).to_bytes());
            },
        }

        if body.len() > 2 * MAX_WORDS {
            let kind = AssemblyErrorKind::CapacityExceeded(Capacity::ImageLength {
                words: (body.len() + 1) / 2,
            });

            return Err(AssemblyError::new(placed.line, placed.source.clone(), kind));
        }

        trace!(logger, "emit record"; "address" => placed.address, "line" => placed.line);

        source_map.insert(placed.address, placed.line);
    }

    let entry = match &layout.entry {
        Some((line, label)) => resolve(&layout.symbols, *line, label)?,
        None => layout.origin,
    };

    let program = bytecode::Program::new(layout.origin, body, entry).map_err(|err| {
        let line = layout.records.last().map(|placed| placed.line).unwrap_or(0);

        let kind = match err {
            ImageError::TooLong { words } => AssemblyErrorKind::CapacityExceeded(Capacity::ImageLength { words }),
            err => AssemblyErrorKind::ParseFault(err.to_string()),
        };

        AssemblyError::new(line, "", kind)
    })?;

    let mut symbols = layout.symbols
        .iter()
        .map(|info| (info.label.clone(), info.address))
        .collect::<Vec<_>>();

    symbols.sort_by(|(a_label, a_addr), (b_label, b_addr)| a_addr.cmp(b_addr).then(a_label.cmp(b_label)));

    debug!(logger, "image complete"; "words" => program.length(), "checksum" => program.checksum());

    Ok(Listing {
        program,
        symbols,
        source_map,
    })
}

/// Compiles the given assembly program into a program image.
pub fn compile(program: &symbolic::Program) -> Result<bytecode::Program, AssemblyError> {
    compile_with_logger(program, None::<Logger>)
}

pub fn compile_with_logger<L>(program: &symbolic::Program, logger: L) -> Result<bytecode::Program, AssemblyError>
where
    L: Into<Option<Logger>>,
{
    compile_listing(program, logger).map(|listing| listing.program)
}

/// Compiles the program and keeps the symbol list and the source map along with the image.
pub fn compile_listing<L>(program: &symbolic::Program, logger: L) -> Result<Listing, AssemblyError>
where
    L: Into<Option<Logger>>,
{
    let logger = logger
        .into()
        .unwrap_or_else(|| Logger::root(Discard, o!()))
        .new(o!("stage" => "compilation"));

    let layout = first_pass(program, &logger)?;
    second_pass(layout, &logger)
}

#[cfg(test)]
fn assemble(source: &str) -> Result<Listing, AssemblyError> {
    let program = symbolic::Program::parse(source)?;
    compile_listing(&program, None::<Logger>)
}

#[test]
fn test_compile() {
    let listing = assemble("@ /000\nLD /005\n#\n").unwrap();

    assert_eq!(listing.program.origin, 0);
    assert_eq!(listing.program.length(), 1);
    assert_eq!(listing.program.checksum(), 0x01);
    assert_eq!(listing.program.to_bytes(), vec![0x00, 0x00, 0x01, 0x01, 0x80, 0x05]);
}

#[test]
fn test_forward_reference() {
    let forward = assemble(r#"
        @ /100
        START LD VALUE
              PD
              JP START
        VALUE K 7
        # START
    "#).unwrap();

    let backward = assemble(r#"
        @ /100
        JP START
        VALUE K 7
        START LD VALUE
        # START
    "#).unwrap();

    assert_eq!(forward.symbols, vec![("START".to_string(), 0x100), ("VALUE".to_string(), 0x106)]);
    assert_eq!(forward.program.body, vec![0x81, 0x06, 0xE0, 0x00, 0x01, 0x00, 0x07, 0x00]);
    assert_eq!(forward.program.entry, 0x100);

    assert_eq!(backward.symbols, vec![("VALUE".to_string(), 0x102), ("START".to_string(), 0x103)]);
    assert_eq!(&backward.program.body[..3], &[0x01, 0x03, 0x07]);
    assert_eq!(&backward.program.body[3..5], &[0x81, 0x02]);

    assert_eq!(forward.source_map.get_source_span(0x104), Some(&5));
    assert_eq!(forward.source_map.get_source_span(0x106), Some(&6));
}

#[test]
fn test_name_conflict() {
    let err = assemble("X K 1\nLD X\nX LV 2\n").unwrap_err();

    assert_eq!(err.line, 3);
    assert_eq!(err.kind, AssemblyErrorKind::NameConflict {
        symbol: "X".into(),
        previous_line: 1,
    });
}

#[test]
fn test_undeclared_symbol() {
    let err = assemble("LD COUNTR\nCOUNTER K 3\n").unwrap_err();

    assert_eq!(err.line, 1);
    assert_eq!(err.kind, AssemblyErrorKind::UndeclaredSymbol {
        symbol: "COUNTR".into(),
        suggestion: Some("COUNTER".into()),
    });

    let err = assemble("OS 0\n# MAIN\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, AssemblyErrorKind::UndeclaredSymbol { suggestion: None, .. }));
}

#[test]
fn test_capacity() {
    assert!(assemble("@ /FFC\nLD 0\n").is_ok());

    let err = assemble("@ /FFC\nLD 0\nLD 0\n").unwrap_err();
    assert_eq!(err.line, 3);
    assert_eq!(err.kind, AssemblyErrorKind::CapacityExceeded(Capacity::Program {
        origin: 0xFFC,
        length: 4,
        address: 0x1000,
    }));

    let err = assemble("@ /FFA\nLV 7\nOS 0\nA K 1\n#\n").unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.kind, AssemblyErrorKind::CapacityExceeded(Capacity::Program {
        origin: 0xFFA,
        length: 6,
        address: 0x1000,
    }));

    let source = "LV 0\n".repeat(MAX_WORDS + 1);
    let err = assemble(&source).unwrap_err();
    assert_eq!(err.line, MAX_WORDS + 1);
    assert_eq!(err.kind, AssemblyErrorKind::CapacityExceeded(Capacity::ImageLength { words: MAX_WORDS + 1 }));
}

#[test]
fn test_pseudo_op_placement() {
    let err = assemble("LV 1\n@ /100\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, AssemblyErrorKind::ParseFault(_)));

    let err = assemble("@ /100\n@ /200\n").unwrap_err();
    assert_eq!(err.line, 2);

    let err = assemble("LV 1\n#\nPD\n").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(matches!(err.kind, AssemblyErrorKind::ParseFault(_)));

    let listing = assemble("ONE K 1\nTWO K 2\nLV 3\n").unwrap();
    assert_eq!(listing.program.body, vec![1, 2, 0x30, 0x03]);
    assert_eq!(listing.program.entry, 0);
}
