//! [Emulator] for executing [program images](crate::bytecode::Program).

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};

use slog::{debug, o, trace, warn, Discard, Logger};

use crate::bytecode::Program;
use crate::event::{Event, EventDispatcher, EventListener};
use crate::instruction::Instruction;
use crate::literal;
use crate::memory::{LoadError, Memory, MemoryError, MEMORY_SIZE};

/// Keeps the low 12 bits of `value` and interprets them as a two's-complement number.
pub fn sign_extend(value: i32) -> i16 {
    let value = value & 0xFFF;

    if value & 0x800 != 0 {
        (value - 0x1000) as i16
    } else {
        value as i16
    }
}

/// The registers of the processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    /// The Program Counter stores the address of the next instruction to be fetched.
    pub pc: u16,

    /// The accumulator, a 12-bit two's-complement value sign-extended to 16 bits.
    pub ac: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    /// Halted by HM, waiting for [InputOutput::halt] to return.
    Waiting,
    /// Terminated by an OS call. Further steps do nothing.
    Terminated,
}

/// Where GD stores the value it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Load the value into the accumulator.
    Accumulator,
    /// Jump to the value.
    ProgramCounter,
}

impl Default for InputMode {
    fn default() -> InputMode {
        InputMode::Accumulator
    }
}

/// Interface to the input and output devices and the operator.
pub trait InputOutput {
    /// Called when a GD instruction is executed. Blocks until a line of input is available.
    ///
    /// # Parameters
    /// - `device`: The device number specified in the operand of the instruction.
    ///
    /// # Returns
    /// The raw input or `None` if the input has been closed.
    fn input(&mut self, device: u16) -> Option<String>;

    /// Called when the value returned by [input](InputOutput::input) is not a valid literal.
    /// The emulator asks for input again afterwards.
    fn reject(&mut self, _input: &str, _reason: &str) {}

    /// Called when a PD instruction is executed.
    fn output(&mut self, device: u16, data: i16);

    /// Called when an HM instruction is executed. Execution continues when this returns.
    ///
    /// # Returns
    /// `false` if the input has been closed and the machine can not be resumed.
    fn halt(&mut self) -> bool;
}

impl<T> InputOutput for &mut T where T: InputOutput + ?Sized {
    fn input(&mut self, device: u16) -> Option<String> {
        (**self).input(device)
    }

    fn reject(&mut self, input: &str, reason: &str) {
        (**self).reject(input, reason)
    }

    fn output(&mut self, device: u16, data: i16) {
        (**self).output(device, data)
    }

    fn halt(&mut self) -> bool {
        (**self).halt()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionErrorKind {
    /// Control was transferred to an odd address.
    InvalidAddress {
        address: usize,
    },

    /// An access or control transfer beyond the last memory cell.
    OutOfRange {
        address: usize,
    },

    DivideByZero,

    /// A return address does not fit in 12 bits.
    Overflow {
        value: usize,
    },

    /// An OS call other than 0.
    Unimplemented {
        code: u16,
    },

    /// GD was executed after the input had been closed.
    InputClosed,
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecutionErrorKind::InvalidAddress { address } =>
                write!(f, "invalid address: {:#05x} is not instruction aligned", address),
            ExecutionErrorKind::OutOfRange { address } =>
                write!(f, "out of range: {:#05x} is outside of memory", address),
            ExecutionErrorKind::DivideByZero => write!(f, "divide by zero"),
            ExecutionErrorKind::Overflow { value } =>
                write!(f, "overflow: {:#x} does not fit in 12 bits", value),
            ExecutionErrorKind::Unimplemented { code } =>
                write!(f, "unimplemented operating system call {}", code),
            ExecutionErrorKind::InputClosed => write!(f, "the input channel has been closed"),
        }
    }
}

impl From<MemoryError> for ExecutionErrorKind {
    fn from(err: MemoryError) -> ExecutionErrorKind {
        ExecutionErrorKind::OutOfRange { address: err.address }
    }
}

/// A fault that stopped the execution, with the registers at the time of the fault.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,

    /// Address of the faulting instruction.
    pub pc: u16,

    pub ac: i16,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (PC = {:#05x}, AC = {})", self.kind, self.pc, self.ac)
    }
}

impl std::error::Error for ExecutionError {}

type Operation<IO> = fn(&mut Emulator<IO>, u16) -> Result<(), ExecutionErrorKind>;

/// The emulator contains all the state of the machine and the interfaces for doing IO.
pub struct Emulator<IO> {
    /// The memory of the emulated machine.
    /// Contains all the instructions and data required by the program.
    pub memory: Memory,

    /// The registers of the processor.
    pub context: Context,

    /// Interface for doing IO operations and waiting for the operator.
    pub io: IO,

    pub state: State,

    input_mode: InputMode,

    /// Indexed by the opcode nibble.
    operations: [Operation<IO>; 16],

    events: EventDispatcher,

    logger: Logger,
}

impl<IO> fmt::Debug for Emulator<IO> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Emulator")
            .field("context", &self.context)
            .field("state", &self.state)
            .field("input_mode", &self.input_mode)
            .finish()
    }
}

impl<IO> Emulator<IO> where IO: InputOutput {
    /// Create a new emulator. Execution starts from address 0.
    pub fn new(memory: Memory, io: IO) -> Emulator<IO> {
        Emulator::with_logger(memory, io, None::<Logger>)
    }

    pub fn with_logger<L>(memory: Memory, io: IO, logger: L) -> Emulator<IO>
    where
        L: Into<Option<Logger>>,
    {
        let logger = logger
            .into()
            .unwrap_or_else(|| Logger::root(Discard, o!()))
            .new(o!("stage" => "execution"));

        let operations: [Operation<IO>; 16] = [
            Emulator::jump,
            Emulator::jump_if_zero,
            Emulator::jump_if_negative,
            Emulator::load_value,
            Emulator::add,
            Emulator::subtract,
            Emulator::multiply,
            Emulator::divide,
            Emulator::load,
            Emulator::move_to_memory,
            Emulator::subroutine_call,
            Emulator::return_from_subroutine,
            Emulator::halt_machine,
            Emulator::get_data,
            Emulator::put_data,
            Emulator::operating_system_call,
        ];

        Emulator {
            memory,
            context: Context::default(),
            io,
            state: State::Running,
            input_mode: InputMode::default(),
            operations,
            events: EventDispatcher::new(),
            logger,
        }
    }

    /// Loads `program` into memory and moves the program counter to its entry point.
    ///
    /// The accumulator is cleared and a terminated machine is made runnable again.
    pub fn load_program(&mut self, program: &Program) -> Result<(), LoadError> {
        let entry = self.memory.load_program(program)?;

        debug!(self.logger, "program loaded"; "origin" => program.origin, "words" => program.length(), "entry" => entry);

        self.context = Context { pc: entry, ac: 0 };
        self.state = State::Running;
        Ok(())
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.input_mode = mode;
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.events.add_listener(listener);
    }

    /// Reads the instruction at the program counter and advances the program counter past it.
    pub fn fetch(&mut self) -> Result<Instruction, ExecutionErrorKind> {
        let pc = self.context.pc as usize;

        if pc + 2 > MEMORY_SIZE {
            return Err(ExecutionErrorKind::OutOfRange { address: pc });
        }

        if pc % 2 != 0 {
            return Err(ExecutionErrorKind::InvalidAddress { address: pc });
        }

        let word = self.memory.word(pc)?;
        self.context.pc += 2;

        Ok(Instruction::from(word))
    }

    fn decode(&self, instruction: &Instruction) -> (Operation<IO>, u16) {
        let operation = self.operations[instruction.opcode.as_nibble() as usize];
        (operation, instruction.operand)
    }

    /// Fetches, decodes and executes a single instruction.
    ///
    /// # Returns
    /// The state of the machine after the instruction.
    ///
    /// # Errors
    /// Any fault stops the instruction. The error carries the address of the instruction and the
    /// accumulator as they were before it.
    pub fn step(&mut self) -> Result<State, ExecutionError> {
        if self.state == State::Terminated {
            return Ok(State::Terminated);
        }

        let pc = self.context.pc;
        let ac = self.context.ac;
        let fault = move |kind| ExecutionError { kind, pc, ac };

        let instruction = self.fetch().map_err(fault)?;

        trace!(self.logger, "execute"; "pc" => pc, "instruction" => %instruction, "ac" => ac);

        let (operation, operand) = self.decode(&instruction);
        operation(self, operand).map_err(fault)?;

        Ok(self.state)
    }

    /// Executes the program until it terminates or faults.
    pub fn run(&mut self) -> Result<(), ExecutionError> {
        while self.state != State::Terminated {
            self.step()?;
        }

        Ok(())
    }

    fn read(&self, address: u16) -> Result<i32, ExecutionErrorKind> {
        let byte = self.memory.get(address as usize)?;
        Ok(sign_extend(byte.value() as i32) as i32)
    }

    fn write(&mut self, address: u16, data: u8) -> Result<(), ExecutionErrorKind> {
        self.memory.set(address as usize, data)?;
        self.events.dispatch(Event::MemoryChange { address, data });
        Ok(())
    }

    fn set_accumulator(&mut self, value: i32) {
        let data = sign_extend(value);
        self.context.ac = data;
        self.events.dispatch(Event::AccumulatorChange { data });
    }

    /// Validates `target` as an instruction address.
    fn check_target(target: usize) -> Result<u16, ExecutionErrorKind> {
        if target >= MEMORY_SIZE {
            return Err(ExecutionErrorKind::OutOfRange { address: target });
        }

        if target % 2 != 0 {
            return Err(ExecutionErrorKind::InvalidAddress { address: target });
        }

        Ok(target as u16)
    }

    fn jump_to(&mut self, target: usize) -> Result<(), ExecutionErrorKind> {
        let to = Emulator::<IO>::check_target(target)?;
        let from = self.context.pc;

        self.context.pc = to;
        self.events.dispatch(Event::Jump { from, to });

        Ok(())
    }

    fn jump(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        self.jump_to(address as usize)
    }

    fn jump_if_zero(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        if self.context.ac == 0 {
            self.jump_to(address as usize)?;
        }

        Ok(())
    }

    fn jump_if_negative(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        if self.context.ac < 0 {
            self.jump_to(address as usize)?;
        }

        Ok(())
    }

    fn load_value(&mut self, value: u16) -> Result<(), ExecutionErrorKind> {
        self.set_accumulator(value as i32);
        Ok(())
    }

    fn add(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let operand = self.read(address)?;
        self.set_accumulator(self.context.ac as i32 + operand);
        Ok(())
    }

    fn subtract(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let operand = self.read(address)?;
        self.set_accumulator(self.context.ac as i32 - operand);
        Ok(())
    }

    fn multiply(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let operand = self.read(address)?;
        self.set_accumulator(self.context.ac as i32 * operand);
        Ok(())
    }

    /// Truncates toward zero.
    fn divide(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let operand = self.read(address)?;

        if operand == 0 {
            return Err(ExecutionErrorKind::DivideByZero);
        }

        self.set_accumulator(self.context.ac as i32 / operand);
        Ok(())
    }

    fn load(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let value = self.read(address)?;
        self.set_accumulator(value);
        Ok(())
    }

    /// Stores the accumulator big-endian into two cells.
    fn move_to_memory(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let last = address as usize + 1;

        if last >= MEMORY_SIZE {
            return Err(ExecutionErrorKind::OutOfRange { address: last });
        }

        let [high, low] = self.context.ac.to_be_bytes();

        self.write(address, high)?;
        self.write(address + 1, low)
    }

    /// Stashes the return address at `address` and continues right after it.
    fn subroutine_call(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let ret = self.context.pc as usize;

        if ret > Instruction::MAX_OPERAND as usize {
            return Err(ExecutionErrorKind::Overflow { value: ret });
        }

        let target = Emulator::<IO>::check_target(address as usize + 2)?;

        self.write(address, (ret >> 8) as u8)?;
        self.write(address + 1, (ret & 0xFF) as u8)?;

        trace!(self.logger, "subroutine call"; "return" => ret, "target" => target);

        self.jump_to(target as usize)
    }

    fn return_from_subroutine(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let high = self.memory.get(address as usize)?.value() as usize;

        if high > 0xF {
            return Err(ExecutionErrorKind::Overflow { value: high });
        }

        let low = self.memory.get(address as usize + 1)?.value() as usize;

        self.jump_to((high << 8) | low)
    }

    fn halt_machine(&mut self, address: u16) -> Result<(), ExecutionErrorKind> {
        let resume = Emulator::<IO>::check_target(address as usize)?;

        debug!(self.logger, "halted"; "resume" => resume);

        self.state = State::Waiting;
        self.events.dispatch(Event::Halted { resume });

        if !self.io.halt() {
            return Err(ExecutionErrorKind::InputClosed);
        }

        debug!(self.logger, "resumed");

        self.state = State::Running;
        self.events.dispatch(Event::Resumed);

        self.jump_to(resume as usize)
    }

    fn get_data(&mut self, device: u16) -> Result<(), ExecutionErrorKind> {
        let value = loop {
            let raw = match self.io.input(device) {
                Some(raw) => raw,
                None => return Err(ExecutionErrorKind::InputClosed),
            };

            match literal::parse_word(&raw) {
                Ok(value) => break value,
                Err(err) => {
                    let reason = err.verbose(raw.trim()).to_string();
                    warn!(self.logger, "rejected input"; "input" => raw.trim(), "reason" => &reason);
                    self.io.reject(&raw, &reason);
                },
            }
        };

        trace!(self.logger, "input"; "device" => device, "value" => value);

        match self.input_mode {
            InputMode::Accumulator => {
                self.set_accumulator(value as i32);
                Ok(())
            },
            InputMode::ProgramCounter => self.jump_to(value as usize),
        }
    }

    fn put_data(&mut self, device: u16) -> Result<(), ExecutionErrorKind> {
        let data = self.context.ac;

        self.io.output(device, data);
        self.events.dispatch(Event::Output { data });

        Ok(())
    }

    fn operating_system_call(&mut self, code: u16) -> Result<(), ExecutionErrorKind> {
        if code != 0 {
            return Err(ExecutionErrorKind::Unimplemented { code });
        }

        debug!(self.logger, "terminated"; "pc" => self.context.pc);

        self.state = State::Terminated;
        self.events.dispatch(Event::Terminated);

        Ok(())
    }
}

/// An IO handler for testing purposes.
///
/// Reads input from a pre-determined input buffer and appends printed values to an output
/// buffer. Halts return immediately and are only counted.
#[derive(Debug, Clone, Default)]
pub struct TestIo {
    input_buffer: VecDeque<String>,
    output_buffer: Vec<i16>,
    rejected: Vec<String>,
    halts: usize,
}

impl TestIo {
    pub fn new() -> TestIo {
        TestIo::default()
    }

    pub fn with_input<I, S>(input: I) -> TestIo
    where
        I: IntoIterator<Item=S>,
        S: Into<String>,
    {
        TestIo {
            input_buffer: input.into_iter().map(Into::into).collect(),
            ..TestIo::default()
        }
    }

    pub fn push_input<S: Into<String>>(&mut self, value: S) {
        self.input_buffer.push_back(value.into());
    }

    pub fn output(&self) -> &[i16] {
        &self.output_buffer[..]
    }

    pub fn into_output(self) -> Vec<i16> {
        self.output_buffer
    }

    /// Inputs rejected as malformed, in order.
    pub fn rejected(&self) -> &[String] {
        &self.rejected[..]
    }

    pub fn halts(&self) -> usize {
        self.halts
    }
}

impl InputOutput for TestIo {
    fn input(&mut self, _device: u16) -> Option<String> {
        self.input_buffer.pop_front()
    }

    fn reject(&mut self, input: &str, _reason: &str) {
        self.rejected.push(input.to_string());
    }

    fn output(&mut self, _device: u16, data: i16) {
        self.output_buffer.push(data);
    }

    fn halt(&mut self) -> bool {
        self.halts += 1;
        true
    }
}

/// An IO handler using the terminal.
///
/// GD prompts for a line on the standard input, PD prints the value on its own line and HM
/// waits for Enter. The device numbers are ignored.
pub struct StdIo;

impl InputOutput for StdIo {
    fn input(&mut self, device: u16) -> Option<String> {
        print!("input ({}): ", device);
        let _ = io::stdout().flush();

        let mut line = String::new();

        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }

    fn reject(&mut self, input: &str, reason: &str) {
        eprintln!("invalid input '{}': {}", input.trim(), reason);
    }

    fn output(&mut self, _device: u16, data: i16) {
        println!("{}", data);
    }

    fn halt(&mut self) -> bool {
        print!("halted, press enter to continue");
        let _ = io::stdout().flush();

        let mut line = String::new();

        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => true,
        }
    }
}

#[cfg(test)]
use crate::instruction::OpCode;

#[cfg(test)]
fn boot(code: &[(OpCode, u16)], io: TestIo) -> Emulator<TestIo> {
    let mut memory = Memory::new();

    for (index, (opcode, operand)) in code.iter().enumerate() {
        let [first, second] = Instruction::new(*opcode, *operand).to_bytes();
        memory.set(index * 2, first).unwrap();
        memory.set(index * 2 + 1, second).unwrap();
    }

    Emulator::new(memory, io)
}

#[test]
fn test_sign_extend() {
    assert_eq!(sign_extend(0), 0);
    assert_eq!(sign_extend(0x7FF), 2047);
    assert_eq!(sign_extend(0x800), -2048);
    assert_eq!(sign_extend(0xFFF), -1);
    assert_eq!(sign_extend(0x1005), 5);
    assert_eq!(sign_extend(-1), -1);
}

#[test]
fn test_arithmetic() {
    let mut emulator = boot(&[
        (OpCode::LoadValue, 0xFFE),
        (OpCode::Add, 0x100),
        (OpCode::Multiply, 0x101),
        (OpCode::Divide, 0x102),
        (OpCode::Subtract, 0x100),
        (OpCode::OperatingSystemCall, 0),
    ], TestIo::new());

    emulator.memory.set(0x100, 7u8).unwrap();
    emulator.memory.set(0x101, 100u8).unwrap();
    emulator.memory.set(0x102, 3u8).unwrap();

    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, -2);

    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, 5);

    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, 500);

    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, 166);

    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, 159);

    assert_eq!(emulator.step(), Ok(State::Terminated));
}

#[test]
fn test_wrapping_and_truncation() {
    let mut emulator = boot(&[
        (OpCode::LoadValue, 0x7FF),
        (OpCode::Add, 0x100),
        (OpCode::Divide, 0x101),
    ], TestIo::new());

    emulator.memory.set(0x100, 1u8).unwrap();
    emulator.memory.set(0x101, 3u8).unwrap();

    emulator.step().unwrap();
    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, -2048);

    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, -682);
}

#[test]
fn test_jumps() {
    let mut emulator = boot(&[
        (OpCode::JumpIfZero, 0x008),
        (OpCode::OperatingSystemCall, 1),
        (OpCode::OperatingSystemCall, 1),
        (OpCode::OperatingSystemCall, 1),
        (OpCode::LoadValue, 0xFFF),
        (OpCode::JumpIfNegative, 0x010),
        (OpCode::OperatingSystemCall, 1),
        (OpCode::OperatingSystemCall, 1),
        (OpCode::JumpIfZero, 0x000),
        (OpCode::Jump, 0x003),
    ], TestIo::new());

    let err = emulator.run().unwrap_err();
    assert_eq!(err, ExecutionError {
        kind: ExecutionErrorKind::InvalidAddress { address: 3 },
        pc: 0x012,
        ac: -1,
    });
    assert_eq!(emulator.context.pc, 0x014);
}

#[test]
fn test_fetch_bounds() {
    let mut emulator = boot(&[], TestIo::new());

    let [first, second] = Instruction::new(OpCode::LoadValue, 0).to_bytes();
    emulator.memory.set(4094, first).unwrap();
    emulator.memory.set(4095, second).unwrap();

    emulator.context.pc = 4094;
    emulator.step().unwrap();
    assert_eq!(emulator.context.pc, 4096);

    let err = emulator.step().unwrap_err();
    assert_eq!(err.kind, ExecutionErrorKind::OutOfRange { address: 4096 });
    assert_eq!(err.pc, 4096);

    emulator.context.pc = 5;
    assert_eq!(emulator.fetch(), Err(ExecutionErrorKind::InvalidAddress { address: 5 }));
}

#[test]
fn test_move_to_memory() {
    let mut emulator = boot(&[
        (OpCode::LoadValue, 0xFFD),
        (OpCode::MoveToMemory, 0x200),
        (OpCode::MoveToMemory, 0xFFF),
    ], TestIo::new());

    emulator.step().unwrap();
    emulator.step().unwrap();

    assert_eq!(emulator.memory[0x200].value(), 0xFF);
    assert_eq!(emulator.memory[0x201].value(), 0xFD);

    let err = emulator.step().unwrap_err();
    assert_eq!(err.kind, ExecutionErrorKind::OutOfRange { address: 0x1000 });
    assert_eq!(err.pc, 4);
}

#[test]
fn test_subroutine() {
    let mut emulator = boot(&[
        (OpCode::SubroutineCall, 0x100),
        (OpCode::OperatingSystemCall, 0),
    ], TestIo::new());

    let [first, second] = Instruction::new(OpCode::ReturnFromSubroutine, 0x100).to_bytes();
    emulator.memory.set(0x102, first).unwrap();
    emulator.memory.set(0x103, second).unwrap();

    emulator.step().unwrap();
    assert_eq!(emulator.context.pc, 0x102);
    assert_eq!(emulator.memory[0x100].value(), 0x00);
    assert_eq!(emulator.memory[0x101].value(), 0x02);

    emulator.run().unwrap();
    assert_eq!(emulator.context.pc, 0x004);
    assert_eq!(emulator.state, State::Terminated);
}

#[test]
fn test_subroutine_faults() {
    let mut emulator = boot(&[(OpCode::ReturnFromSubroutine, 0x100)], TestIo::new());
    emulator.memory.set(0x100, 0x10u8).unwrap();

    let err = emulator.step().unwrap_err();
    assert_eq!(err.kind, ExecutionErrorKind::Overflow { value: 0x10 });

    let mut emulator = boot(&[(OpCode::SubroutineCall, 0x101)], TestIo::new());
    let err = emulator.step().unwrap_err();
    assert_eq!(err.kind, ExecutionErrorKind::InvalidAddress { address: 0x103 });
    assert_eq!(emulator.memory[0x101].value(), 0);

    let mut emulator = boot(&[], TestIo::new());
    let [first, second] = Instruction::new(OpCode::SubroutineCall, 0x100).to_bytes();
    emulator.memory.set(4094, first).unwrap();
    emulator.memory.set(4095, second).unwrap();
    emulator.context.pc = 4094;

    let err = emulator.step().unwrap_err();
    assert_eq!(err.kind, ExecutionErrorKind::Overflow { value: 4096 });
    assert_eq!(err.pc, 4094);
}

#[test]
fn test_input_output() {
    let io = TestIo::with_input(vec!["abc", "5000", " /01F \n", "12"]);

    let mut emulator = boot(&[
        (OpCode::GetData, 0),
        (OpCode::PutData, 0),
        (OpCode::GetData, 0),
    ], io);

    assert_eq!(emulator.input_mode(), InputMode::Accumulator);

    emulator.step().unwrap();
    assert_eq!(emulator.context.ac, 31);
    assert_eq!(emulator.io.rejected(), &["abc".to_string(), "5000".to_string()][..]);

    emulator.step().unwrap();
    assert_eq!(emulator.io.output(), &[31i16][..]);

    emulator.set_input_mode(InputMode::ProgramCounter);
    emulator.step().unwrap();
    assert_eq!(emulator.context.pc, 12);
    assert_eq!(emulator.context.ac, 31);

    emulator.context.pc = 0;
    let err = emulator.step().unwrap_err();
    assert_eq!(err.kind, ExecutionErrorKind::InputClosed);
}

#[test]
fn test_halt_and_events() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut emulator = boot(&[
        (OpCode::LoadValue, 4),
        (OpCode::HaltMachine, 0x006),
        (OpCode::OperatingSystemCall, 1),
        (OpCode::OperatingSystemCall, 0),
    ], TestIo::new());

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    emulator.add_listener(move |event: &Event| sink.borrow_mut().push(event.clone()));

    emulator.run().unwrap();

    assert_eq!(emulator.io.halts(), 1);
    assert_eq!(*events.borrow(), vec![
        Event::AccumulatorChange { data: 4 },
        Event::Halted { resume: 6 },
        Event::Resumed,
        Event::Jump { from: 4, to: 6 },
        Event::Terminated,
    ]);

    assert_eq!(emulator.step(), Ok(State::Terminated));
}

#[test]
fn test_halt_on_closed_input() {
    struct Closed;

    impl InputOutput for Closed {
        fn input(&mut self, _device: u16) -> Option<String> {
            None
        }

        fn output(&mut self, _device: u16, _data: i16) {}

        fn halt(&mut self) -> bool {
            false
        }
    }

    let mut memory = Memory::new();
    memory.load(&Instruction::new(OpCode::HaltMachine, 0x002).to_bytes(), 0).unwrap();

    let mut emulator = Emulator::new(memory, Closed);

    let err = emulator.run().unwrap_err();
    assert_eq!(err.kind, ExecutionErrorKind::InputClosed);
    assert_eq!(err.pc, 0);
    assert_eq!(emulator.state, State::Waiting);
}

#[test]
fn test_unimplemented_call() {
    let mut emulator = boot(&[(OpCode::LoadValue, 9), (OpCode::OperatingSystemCall, 2)], TestIo::new());

    assert_eq!(emulator.run(), Err(ExecutionError {
        kind: ExecutionErrorKind::Unimplemented { code: 2 },
        pc: 2,
        ac: 9,
    }));
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn even_address(max: u16) -> impl Strategy<Value = u16> {
        (0..=max / 2).prop_map(|half| half * 2)
    }

    proptest! {
        #[test]
        fn sign_extend_is_idempotent(value in 0..0x1000i32) {
            let once = sign_extend(value);
            prop_assert_eq!(sign_extend(once as i32), once);
        }

        #[test]
        fn fetch_advances_without_writing(pc in even_address(4094), cells in proptest::collection::vec(any::<u8>(), 2)) {
            let mut emulator = boot(&[], TestIo::new());
            emulator.memory.set(pc as usize, cells[0]).unwrap();
            emulator.memory.set(pc as usize + 1, cells[1]).unwrap();
            emulator.context.pc = pc;

            let before = emulator.memory.clone();
            let instruction = emulator.fetch().unwrap();

            prop_assert_eq!(emulator.context.pc, pc + 2);
            prop_assert_eq!(&emulator.memory, &before);
            prop_assert_eq!(instruction.to_bytes(), [cells[0], cells[1]]);
        }

        #[test]
        fn add_then_subtract_restores(ac in -2048..2048i16, operand in any::<u8>()) {
            let mut emulator = boot(&[(OpCode::Add, 0x100), (OpCode::Subtract, 0x100)], TestIo::new());
            emulator.memory.set(0x100, operand).unwrap();
            emulator.context.ac = ac;

            emulator.step().unwrap();
            emulator.step().unwrap();

            prop_assert_eq!(emulator.context.ac, ac);
        }

        #[test]
        fn divide_by_zero_keeps_accumulator(ac in -2048..2048i16) {
            let mut emulator = boot(&[(OpCode::Divide, 0x100)], TestIo::new());
            emulator.context.ac = ac;

            let err = emulator.step().unwrap_err();

            prop_assert_eq!(err.kind, ExecutionErrorKind::DivideByZero);
            prop_assert_eq!(err.ac, ac);
            prop_assert_eq!(emulator.context.ac, ac);
        }

        #[test]
        fn call_then_return_restores(pc in even_address(4092), target in even_address(4090)) {
            let call = pc as usize..pc as usize + 2;
            let frame = target as usize..target as usize + 4;
            prop_assume!(call.end <= frame.start || frame.end <= call.start);

            let mut emulator = boot(&[], TestIo::new());

            let [first, second] = Instruction::new(OpCode::SubroutineCall, target).to_bytes();
            emulator.memory.set(pc as usize, first).unwrap();
            emulator.memory.set(pc as usize + 1, second).unwrap();

            let [first, second] = Instruction::new(OpCode::ReturnFromSubroutine, target).to_bytes();
            emulator.memory.set(target as usize + 2, first).unwrap();
            emulator.memory.set(target as usize + 3, second).unwrap();

            emulator.context.pc = pc;
            emulator.step().unwrap();
            emulator.step().unwrap();

            prop_assert_eq!(emulator.context.pc, pc + 2);
        }
    }
}
