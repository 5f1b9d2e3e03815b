//! A crate for assembling and running programs of a minimal 12-bit stored-program machine.
//!
//! The machine has 4096 byte-sized memory cells, a program counter and a single accumulator.
//! Instructions take two cells: a 4-bit opcode followed by a 12-bit operand.
//!
//! Currently this crate provides the functionality to:
//! - Parse assembly source into [symbolic programs](symbolic::Program).
//! - Compile them in two passes into [program images](bytecode::Program).
//! - Read and write program images.
//! - Load images into [Memory](memory::Memory) and execute them with the [Emulator](emulator::Emulator).
//!
//! # Example
//! ```
//! use mvn::{
//!     symbolic::Program,
//!     emulator::{Emulator, TestIo},
//!     memory::Memory,
//! };
//!
//! // Adds 13 and 15 together and outputs the answer.
//! let source = r#"
//!     @ /100
//!     MAIN    LD   X
//!             +    Y
//!             PD
//!             OS   0
//!     X       K    13
//!     Y       K    15
//!     # MAIN
//! "#;
//!
//! // Parse the assembly into an ordered list of statements.
//! let program = Program::parse(source).unwrap();
//!
//! // Resolve the symbols and emit the image.
//! let image = program.compile().unwrap();
//!
//! // Load the image into an emulator which records its output.
//! let mut emulator = Emulator::new(Memory::new(), TestIo::new());
//! emulator.load_program(&image).unwrap();
//!
//! emulator.run()
//!     .expect("an error occured while emulating the program");
//!
//! assert_eq!(emulator.io.output(), &[28][..]);
//! ```
//!
//! # Executables
//!
//! ## `mvnasm`
//!
//! Assembles a source file into a program image. `--listing` prints the placed records and the
//! symbol table.
//!
//! ## `mvnrun`
//!
//! Runs a source file (`.asm`) or a program image using the terminal for input and output.
//! Faults are reported together with the source line of the faulting instruction.
pub mod parsing;
pub mod literal;
pub mod memory;
pub mod instruction;
pub mod symbol_table;
pub mod source_map;
pub mod emulator;
pub mod bytecode;
pub mod symbolic;
pub mod compiler;
pub mod error;
pub mod event;
