//! The flat, byte-addressed [Memory] of the machine and its [Byte] and [Word] views.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::bytecode::Program;

/// Number of addressable cells.
pub const MEMORY_SIZE: usize = 4096;

/// A single 8-bit memory cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Byte(u8);

impl Byte {
    pub fn new(value: u8) -> Byte {
        Byte(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Bits 4-7. Holds the opcode when the byte is the first byte of an instruction.
    pub fn first_nibble(self) -> u8 {
        self.0 >> 4
    }

    /// Bits 0-3. Holds the high part of the operand in the first byte of an instruction.
    pub fn second_nibble(self) -> u8 {
        self.0 & 0x0F
    }
}

impl From<u8> for Byte {
    fn from(value: u8) -> Byte {
        Byte(value)
    }
}

impl From<Byte> for u8 {
    fn from(byte: Byte) -> u8 {
        byte.0
    }
}

impl fmt::Display for Byte {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// Two consecutive memory cells read together as one instruction or one 12-bit address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Word {
    pub first_byte: Byte,
    pub second_byte: Byte,
}

impl Word {
    pub fn new(first_byte: Byte, second_byte: Byte) -> Word {
        Word { first_byte, second_byte }
    }

    /// The 4-bit opcode selector.
    pub fn opcode(&self) -> u8 {
        self.first_byte.first_nibble()
    }

    /// The unsigned 12-bit operand.
    pub fn operand(&self) -> u16 {
        (self.first_byte.second_nibble() as u16) * 0x100 + self.second_byte.value() as u16
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.first_byte, self.second_byte)
    }
}

/// Returned when an access falls outside of the memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryError {
    pub address: usize,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "address 0x{:x} is outside of memory", self.address)
    }
}

impl std::error::Error for MemoryError {}

/// Errors produced by the loader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// The data would not fit in memory when placed at `origin`.
    CapacityExceeded {
        origin: usize,
        length: usize,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::CapacityExceeded { origin, length } => write!(
                f,
                "capacity exceeded: {} bytes at origin 0x{:03x} do not fit in {} cells",
                length, origin, MEMORY_SIZE,
            ),
        }
    }
}

impl std::error::Error for LoadError {}

/// The 4096 cells of the machine. Every cell always holds a defined [Byte].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<Byte>,
}

impl Default for Memory {
    fn default() -> Memory {
        Memory::new()
    }
}

impl Memory {
    /// Creates a zeroed memory.
    pub fn new() -> Memory {
        Memory {
            cells: vec![Byte::default(); MEMORY_SIZE],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reads the cell at `address`.
    pub fn get(&self, address: usize) -> Result<Byte, MemoryError> {
        self.cells
            .get(address)
            .copied()
            .ok_or(MemoryError { address })
    }

    /// Overwrites the cell at `address`.
    pub fn set<B: Into<Byte>>(&mut self, address: usize, value: B) -> Result<(), MemoryError> {
        match self.cells.get_mut(address) {
            Some(cell) => {
                *cell = value.into();
                Ok(())
            }
            None => Err(MemoryError { address }),
        }
    }

    /// Reads the two cells at `address` and `address + 1` as a [Word].
    pub fn word(&self, address: usize) -> Result<Word, MemoryError> {
        match self.cells.get(address..address + 2) {
            Some(&[first_byte, second_byte]) => Ok(Word { first_byte, second_byte }),
            _ => Err(MemoryError { address: std::cmp::max(address, self.cells.len()) }),
        }
    }

    /// Copies `bytes` into memory starting at `origin`.
    ///
    /// # Errors
    /// [LoadError::CapacityExceeded] if `origin + bytes.len()` reaches the end of memory. Memory is
    /// left untouched in that case.
    pub fn load(&mut self, bytes: &[u8], origin: usize) -> Result<(), LoadError> {
        if origin + bytes.len() >= self.cells.len() {
            return Err(LoadError::CapacityExceeded {
                origin,
                length: bytes.len(),
            });
        }

        for (cell, byte) in self.cells[origin..].iter_mut().zip(bytes) {
            *cell = Byte(*byte);
        }

        Ok(())
    }

    /// Copies the body of an assembled program to its origin.
    ///
    /// # Returns
    /// The entry point of the program.
    pub fn load_program(&mut self, program: &Program) -> Result<u16, LoadError> {
        self.load(&program.body, program.origin as usize)?;
        Ok(program.entry)
    }
}

impl Index<usize> for Memory {
    type Output = Byte;

    fn index(&self, address: usize) -> &Byte {
        &self.cells[address]
    }
}

impl IndexMut<usize> for Memory {
    fn index_mut(&mut self, address: usize) -> &mut Byte {
        &mut self.cells[address]
    }
}

#[test]
fn test_byte_nibbles() {
    let byte = Byte::new(0xA7);

    assert_eq!(byte.first_nibble(), 0xA);
    assert_eq!(byte.second_nibble(), 0x7);
    assert_eq!(byte.to_string(), "a7");
}

#[test]
fn test_word_operand() {
    let word = Word::new(Byte::new(0x8A), Byte::new(0xBC));

    assert_eq!(word.opcode(), 0x8);
    assert_eq!(word.operand(), 0xABC);
}

#[test]
fn test_memory_word_bounds() {
    let mut memory = Memory::new();
    memory[4094] = Byte::new(1);
    memory[4095] = Byte::new(2);

    assert_eq!(memory.word(4094), Ok(Word::new(Byte::new(1), Byte::new(2))));
    assert_eq!(memory.word(4095), Err(MemoryError { address: 4096 }));
    assert_eq!(memory.get(4096), Err(MemoryError { address: 4096 }));
    assert!(memory.set(4096, 0).is_err());
}

#[test]
fn test_load() {
    let mut memory = Memory::new();

    memory.load(&[1, 2, 3], 0x100).unwrap();
    assert_eq!(memory[0x100].value(), 1);
    assert_eq!(memory[0x102].value(), 3);

    assert_eq!(
        memory.load(&[0; 16], 4080),
        Err(LoadError::CapacityExceeded { origin: 4080, length: 16 }),
    );
    assert_eq!(memory[4080].value(), 0);

    memory.load(&[9; 15], 4080).unwrap();
    assert_eq!(memory[4094].value(), 9);
}
