use mvn::{
    emulator::{Emulator, ExecutionErrorKind, TestIo},
    error::{AssemblyErrorKind, Capacity},
    memory::Memory,
    symbolic,
};

#[test]
fn test_fault_reports_source_line() {
    let source = r#"
        LV   12
        /    ZERO
        OS   0
ZERO    K    0
    "#;

    let listing = symbolic::Program::parse(source)
        .and_then(|program| program.compile_listing())
        .unwrap();

    let mut emulator = Emulator::new(Memory::new(), TestIo::new());
    emulator.load_program(&listing.program).unwrap();

    let err = emulator.run().unwrap_err();

    assert_eq!(err.kind, ExecutionErrorKind::DivideByZero);
    assert_eq!(err.pc, 2);
    assert_eq!(err.ac, 12);
    assert_eq!(listing.source_map.get_source_span(err.pc), Some(&3));
}

#[test]
fn test_name_conflict_stops_assembly() {
    let source = "LOOP LD X\n     JP LOOP\nLOOP OS 0\nX K 1\nJP MISSING\n";

    let err = symbolic::Program::parse(source)
        .and_then(|program| program.compile())
        .unwrap_err();

    assert_eq!(err.line, 3);
    assert_eq!(err.token, "LOOP");
    assert_eq!(err.kind, AssemblyErrorKind::NameConflict {
        symbol: "LOOP".into(),
        previous_line: 1,
    });
    assert_eq!(err.to_string(), "line 3: name conflict: symbol 'LOOP' already declared on line 1, at 'LOOP'");
}

#[test]
fn test_every_faulty_line_is_reported() {
    let source = "@ /100\nLD 5000\nK 3\nPD\nJP\n";

    let errors = symbolic::Program::parse_verbose(source).unwrap_err();

    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0].line, 2);
    assert!(matches!(
        errors[0].kind,
        AssemblyErrorKind::CapacityExceeded(Capacity::Literal { limit: 4095, .. })
    ));
    assert_eq!(errors[1].line, 3);
    assert_eq!(errors[2].line, 5);
}

#[test]
fn test_undeclared_symbol_suggestion() {
    let err = symbolic::Program::parse("LD COUNTER\nOS 0\nCOUNT K 1\n")
        .and_then(|program| program.compile())
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "line 1: symbol 'COUNTER' was never declared, did you mean 'COUNT'?, at 'COUNTER'",
    );
}
