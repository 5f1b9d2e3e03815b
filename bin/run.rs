use mvn::{
    bytecode::{self, ImageError},
    emulator::{Emulator, ExecutionError, InputMode, StdIo},
    error::AssemblyError,
    memory::{LoadError, Memory},
    source_map::SourceMap,
    symbolic,
};

use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

enum Error {
    Assembly(AssemblyError),
    Image(ImageError),
    Load(LoadError),
    Execution(ExecutionError, Option<String>),
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<AssemblyError> for Error {
    fn from(e: AssemblyError) -> Error {
        Error::Assembly(e)
    }
}

impl From<ImageError> for Error {
    fn from(e: ImageError) -> Error {
        Error::Image(e)
    }
}

impl From<LoadError> for Error {
    fn from(e: LoadError) -> Error {
        Error::Load(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("mvnrun")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility for assembling and executing programs")
        .arg(Arg::with_name("source")
             .help("File containing assembly source (.asm) or a program image")
             .value_name("SOURCE")
             .required(true)
             .index(1))
        .arg(Arg::with_name("input-mode")
             .help("Whether GD loads the accumulator or jumps")
             .long("input-mode")
             .possible_values(&["ac", "pc"])
             .default_value("ac"))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

fn main() {
    let args = parse_arguments();

    let logger = if args.is_present("verbose") {
        let decorator = TermDecorator::new().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        Logger::root(drain, o!())
    } else {
        Logger::root(Discard, o!())
    };

    let input_mode = match args.value_of("input-mode") {
        Some("pc") => InputMode::ProgramCounter,
        _ => InputMode::Accumulator,
    };

    let file_path = match args.value_of("source") {
        Some(path) => path,
        None => return,
    };

    let code = match run(file_path, input_mode, logger) {
        Ok(()) => 0,
        Err(Error::IO(io)) => {
            eprintln!("IO error: {}", io);
            2
        },
        Err(Error::Assembly(err)) => {
            eprintln!("{}: {}", file_path, err);
            1
        },
        Err(Error::Image(err)) => {
            eprintln!("{}: invalid image: {}", file_path, err);
            1
        },
        Err(Error::Load(err)) => {
            eprintln!("{}: {}", file_path, err);
            1
        },
        Err(Error::Execution(err, line)) => {
            eprintln!("execution error: {}", err);

            if let Some(line) = line {
                eprintln!("    at: {}", line);
            }

            1
        },
    };

    std::process::exit(code);
}

fn run(file_path: &str, input_mode: InputMode, logger: Logger) -> Result<(), Error> {
    let source;
    let program;
    let source_map: SourceMap<usize>;

    if file_path.ends_with(".asm") {
        source = Some(std::fs::read_to_string(file_path)?);
        let text = source.as_deref().unwrap_or("");

        let listing = symbolic::Program::parse(text)?
            .compile_listing()?;

        program = listing.program;
        source_map = listing.source_map;
    } else {
        source = None;
        program = bytecode::Program::from_bytes(&std::fs::read(file_path)?)?;
        source_map = SourceMap::default();
    }

    let mut emulator = Emulator::with_logger(Memory::new(), StdIo, logger);
    emulator.set_input_mode(input_mode);
    emulator.load_program(&program)?;

    emulator.run().map_err(|err| {
        let line = source_map.get_source_span(err.pc)
            .and_then(|line| {
                let text = source.as_deref()?.lines().nth(line - 1)?;
                Some(format!("line {}: {}", line, text.trim()))
            });

        Error::Execution(err, line)
    })
}
