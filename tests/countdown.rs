use mvn::{
    bytecode,
    emulator::{Emulator, State, TestIo},
    memory::Memory,
    symbolic,
};

fn compile_program() -> bytecode::Program {
    let source_code = include_str!("countdown.asm");

    symbolic::Program::parse(source_code)
        .expect("could not parse countdown.asm")
        .compile()
        .expect("could not compile countdown.asm")
}

fn execute(program: &bytecode::Program) -> Emulator<TestIo> {
    let mut emulator = Emulator::new(Memory::new(), TestIo::new());

    emulator.load_program(program)
        .expect("could not load the program");

    emulator.run()
        .expect("an error occurred while emulating the program");

    emulator
}

#[test]
fn test_countdown_image() {
    let program = compile_program();

    assert_eq!(program.origin, 0x100);
    assert_eq!(program.entry, 0x100);
    assert_eq!(program.length(), 7);

    let bytes = program.to_bytes();
    assert_eq!(&bytes[..4], &[0x01, 0x00, 0x07, 0x08]);
    assert_eq!(&bytes[4..8], &[0x81, 0x0C, 0x11, 0x0A]);
    assert_eq!(&bytes[16..], &[0x05, 0x01]);
}

#[test]
fn test_countdown_output() {
    let program = compile_program();
    let emulator = execute(&program);

    assert_eq!(emulator.state, State::Terminated);
    assert_eq!(emulator.context.ac, 0);
    assert_eq!(emulator.io.into_output(), vec![5, 4, 3, 2, 1]);
}

#[test]
fn test_countdown_from_image() {
    let program = compile_program();
    let decoded = bytecode::Program::from_bytes(&program.to_bytes())
        .expect("could not decode the image");

    assert_eq!(decoded, program);
    assert_eq!(execute(&decoded).io.output(), &[5, 4, 3, 2, 1][..]);
}

#[test]
fn test_minimal_image() {
    let program = symbolic::Program::parse("@ /000\nLD /005\n#\n")
        .and_then(|program| program.compile())
        .unwrap();

    assert_eq!(program.origin, 0x000);
    assert_eq!(program.length(), 1);
    assert_eq!(program.checksum(), 0x00u8.wrapping_add(0x00).wrapping_add(0x01));
    assert_eq!(program.to_bytes(), vec![0x00, 0x00, 0x01, 0x01, 0x80, 0x05]);
}

#[test]
fn test_reload_after_termination() {
    let program = compile_program();
    let mut emulator = execute(&program);

    emulator.context.ac = 3;
    emulator.load_program(&program).unwrap();

    assert_eq!(emulator.state, State::Running);
    assert_eq!(emulator.context.pc, 0x100);
    assert_eq!(emulator.context.ac, 0);

    emulator.run().unwrap();
    assert_eq!(emulator.io.output(), &[5, 4, 3, 2, 1, 5, 4, 3, 2, 1][..]);
}

#[test]
fn test_odd_program_at_top_of_memory() {
    let program = symbolic::Program::parse("@ /FF6\nLD NINE\nPD\nOS 0\nNINE K 9\n#\n")
        .and_then(|program| program.compile())
        .unwrap();

    assert_eq!(program.body.len(), 8);

    let emulator = execute(&program);
    assert_eq!(emulator.io.output(), &[9][..]);
}
