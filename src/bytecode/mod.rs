//! Binary program images produced by the assembler and consumed by the loader.

mod program;

pub use self::program::{
    ImageError,
    Program,
    HEADER_SIZE,
    MAX_WORDS,
};
