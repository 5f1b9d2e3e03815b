//! types for representing instructions and their parts

use std::fmt;

use crate::memory::{Byte, Word};

/// The sixteen operations of the machine, one per value of the opcode nibble.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Unconditional jump. (`JP`)
    Jump,

    /// Jump if the accumulator is zero. (`JZ`)
    JumpIfZero,

    /// Jump if the accumulator is negative. (`JN`)
    JumpIfNegative,

    /// Loads the operand itself into the accumulator. (`LV`)
    LoadValue,

    /// Adds a memory cell to the accumulator. (`+`)
    Add,

    /// Subtracts a memory cell from the accumulator. (`-`)
    Subtract,

    /// Multiplies the accumulator by a memory cell. (`*`)
    Multiply,

    /// Divides the accumulator by a memory cell, truncating toward zero. (`/`)
    Divide,

    /// Loads a memory cell into the accumulator. (`LD`)
    Load,

    /// Writes the accumulator into two memory cells. (`MM`)
    MoveToMemory,

    /// Stores the return address at the operand and jumps right past it. (`SC`)
    SubroutineCall,

    /// Jumps to the return address stored at the operand. (`RS`)
    ReturnFromSubroutine,

    /// Waits for an external resume signal, then jumps. (`HM`)
    HaltMachine,

    /// Reads a value from the input channel. (`GD`)
    GetData,

    /// Writes the accumulator to the output channel. (`PD`)
    PutData,

    /// Operating system call. Only call `0`, terminate, exists. (`OS`)
    OperatingSystemCall,
}

const OPCODES: [OpCode; 16] = [
    OpCode::Jump,
    OpCode::JumpIfZero,
    OpCode::JumpIfNegative,
    OpCode::LoadValue,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Load,
    OpCode::MoveToMemory,
    OpCode::SubroutineCall,
    OpCode::ReturnFromSubroutine,
    OpCode::HaltMachine,
    OpCode::GetData,
    OpCode::PutData,
    OpCode::OperatingSystemCall,
];

impl OpCode {
    pub fn as_nibble(&self) -> u8 {
        match self {
            OpCode::Jump => 0x0,
            OpCode::JumpIfZero => 0x1,
            OpCode::JumpIfNegative => 0x2,
            OpCode::LoadValue => 0x3,
            OpCode::Add => 0x4,
            OpCode::Subtract => 0x5,
            OpCode::Multiply => 0x6,
            OpCode::Divide => 0x7,
            OpCode::Load => 0x8,
            OpCode::MoveToMemory => 0x9,
            OpCode::SubroutineCall => 0xA,
            OpCode::ReturnFromSubroutine => 0xB,
            OpCode::HaltMachine => 0xC,
            OpCode::GetData => 0xD,
            OpCode::PutData => 0xE,
            OpCode::OperatingSystemCall => 0xF,
        }
    }

    /// Every nibble is a valid opcode; only the low four bits of `nibble` are used.
    pub fn from_nibble(nibble: u8) -> OpCode {
        OPCODES[(nibble & 0x0F) as usize]
    }

    /// All opcodes in nibble order.
    pub fn all() -> impl Iterator<Item = OpCode> {
        OPCODES.iter().copied()
    }

    /// The canonical mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Jump => "JP",
            OpCode::JumpIfZero => "JZ",
            OpCode::JumpIfNegative => "JN",
            OpCode::LoadValue => "LV",
            OpCode::Add => "+",
            OpCode::Subtract => "-",
            OpCode::Multiply => "*",
            OpCode::Divide => "/",
            OpCode::Load => "LD",
            OpCode::MoveToMemory => "MM",
            OpCode::SubroutineCall => "SC",
            OpCode::ReturnFromSubroutine => "RS",
            OpCode::HaltMachine => "HM",
            OpCode::GetData => "GD",
            OpCode::PutData => "PD",
            OpCode::OperatingSystemCall => "OS",
        }
    }

    /// Looks up an opcode by any of its accepted spellings, ignoring case.
    ///
    /// Accepts the canonical mnemonic, the single-letter shorthand and the spelled out
    /// arithmetic names (`JMP`, `ADD`, `SUB`, `MUL`, `DIV`).
    pub fn from_mnemonic(name: &str) -> Option<OpCode> {
        let opcode = match name.to_uppercase().as_ref() {
            "JP" | "JMP" | "J" => OpCode::Jump,
            "JZ" | "Z" => OpCode::JumpIfZero,
            "JN" | "N" => OpCode::JumpIfNegative,
            "LV" | "V" => OpCode::LoadValue,
            "+" | "ADD" => OpCode::Add,
            "-" | "SUB" => OpCode::Subtract,
            "*" | "MUL" => OpCode::Multiply,
            "/" | "DIV" => OpCode::Divide,
            "LD" | "L" => OpCode::Load,
            "MM" | "M" => OpCode::MoveToMemory,
            "SC" | "S" => OpCode::SubroutineCall,
            "RS" | "R" => OpCode::ReturnFromSubroutine,
            "HM" | "H" => OpCode::HaltMachine,
            "GD" | "G" => OpCode::GetData,
            "PD" | "P" => OpCode::PutData,
            "OS" | "O" => OpCode::OperatingSystemCall,
            _ => return None,
        };

        Some(opcode)
    }

    /// Whether the operand may be left out in assembly source.
    pub fn operand_optional(&self) -> bool {
        match self {
            OpCode::GetData | OpCode::PutData => true,
            _ => false,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// A decoded instruction: an opcode and its unsigned 12-bit operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: u16,
}

impl Instruction {
    /// Largest value representable by the operand field.
    pub const MAX_OPERAND: u16 = 0xFFF;

    pub fn new(opcode: OpCode, operand: u16) -> Instruction {
        Instruction {
            opcode,
            operand: operand & Instruction::MAX_OPERAND,
        }
    }

    /// Encodes the instruction into its two bytes, opcode nibble first.
    pub fn to_bytes(&self) -> [u8; 2] {
        let [high, low] = self.operand.to_be_bytes();
        [(self.opcode.as_nibble() << 4) | (high & 0x0F), low]
    }
}

impl From<Word> for Instruction {
    fn from(word: Word) -> Instruction {
        Instruction {
            opcode: OpCode::from_nibble(word.opcode()),
            operand: word.operand(),
        }
    }
}

impl From<Instruction> for Word {
    fn from(instruction: Instruction) -> Word {
        let [first, second] = instruction.to_bytes();
        Word::new(Byte::new(first), Byte::new(second))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} /{:03X}", self.opcode, self.operand)
    }
}

#[test]
fn test_nibble_roundtrip() {
    for (nibble, opcode) in OpCode::all().enumerate() {
        assert_eq!(opcode.as_nibble() as usize, nibble);
        assert_eq!(OpCode::from_nibble(nibble as u8), opcode);
    }
}

#[test]
fn test_mnemonics() {
    assert_eq!(OpCode::from_mnemonic("ld"), Some(OpCode::Load));
    assert_eq!(OpCode::from_mnemonic("L"), Some(OpCode::Load));
    assert_eq!(OpCode::from_mnemonic("Jmp"), Some(OpCode::Jump));
    assert_eq!(OpCode::from_mnemonic("/"), Some(OpCode::Divide));
    assert_eq!(OpCode::from_mnemonic("os"), Some(OpCode::OperatingSystemCall));
    assert_eq!(OpCode::from_mnemonic("K"), None);
    assert_eq!(OpCode::from_mnemonic("LOOP"), None);

    for opcode in OpCode::all() {
        assert_eq!(OpCode::from_mnemonic(opcode.mnemonic()), Some(opcode));
    }
}

#[test]
fn test_encoding() {
    let ins = Instruction::new(OpCode::Load, 0x005);
    assert_eq!(ins.to_bytes(), [0x80, 0x05]);

    let ins = Instruction::new(OpCode::SubroutineCall, 0xABC);
    assert_eq!(ins.to_bytes(), [0xAA, 0xBC]);

    let word = Word::new(Byte::new(0xAA), Byte::new(0xBC));
    assert_eq!(Instruction::from(word), ins);
    assert_eq!(Word::from(ins), word);
    assert_eq!(ins.to_string(), "SC /ABC");
}
