//! Parsing and storing symbolic assembly programs.

pub mod token;
pub mod parser;
pub mod program;

pub use self::program::{Entry, Operand, Program, Statement};
