use mvn::{
    compiler,
    emulator::{Emulator, InputMode, TestIo},
    memory::Memory,
    symbolic,
};

use slog::{o, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

fn logger() -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

#[test]
fn test_squares() {
    let source_code = include_str!("squares.asm");

    let program = symbolic::Program::parse(source_code)
        .expect("could not parse the source code");

    let listing = compiler::compile_listing(&program, logger())
        .expect("could not compile the source code");

    assert_eq!(listing.program.entry, 0x000);
    assert!(listing.symbols.contains(&("SQUARE".to_string(), 0x00C)));
    assert!(listing.symbols.contains(&("VALUE".to_string(), 0x015)));

    let mut io = TestIo::with_input(vec!["3", "/0A", "oops", "12", "0"]);

    {
        let mut emulator = Emulator::with_logger(Memory::new(), &mut io, logger());
        emulator.load_program(&listing.program)
            .expect("could not load the program");

        emulator.run()
            .expect("an error occurred while emulating the program");

        assert_eq!(emulator.memory[0x00C].value(), 0x00);
        assert_eq!(emulator.memory[0x00D].value(), 0x06);
    }

    assert_eq!(io.output(), &[9, 100, 144][..]);
    assert_eq!(io.rejected(), &["oops".to_string()][..]);
}

#[test]
fn test_squares_input_closed() {
    let program = symbolic::Program::parse(include_str!("squares.asm"))
        .and_then(|program| program.compile())
        .unwrap();

    let mut emulator = Emulator::new(Memory::new(), TestIo::with_input(vec!["4"]));
    emulator.load_program(&program).unwrap();

    let err = emulator.run().unwrap_err();

    assert_eq!(err.to_string(), "the input channel has been closed (PC = 0x000, AC = 16)");
    assert_eq!(emulator.io.output(), &[16][..]);
}

#[test]
fn test_input_as_jump_target() {
    let program = symbolic::Program::parse("GD\nOS 1\nPD\nOS 0\n")
        .and_then(|program| program.compile())
        .unwrap();

    let mut emulator = Emulator::new(Memory::new(), TestIo::with_input(vec!["4"]));
    emulator.set_input_mode(InputMode::ProgramCounter);
    emulator.load_program(&program).unwrap();

    emulator.run().unwrap();
    assert_eq!(emulator.context.pc, 8);
    assert_eq!(emulator.io.output(), &[0][..]);
}
