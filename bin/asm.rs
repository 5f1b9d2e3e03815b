use mvn::{
    compiler::Listing,
    error::AssemblyError,
    symbolic,
};

use std::path::{Path, PathBuf};

use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

enum Error {
    Assembly(Vec<AssemblyError>),
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<AssemblyError> for Error {
    fn from(e: AssemblyError) -> Error {
        Error::Assembly(vec![e])
    }
}

impl From<Vec<AssemblyError>> for Error {
    fn from(e: Vec<AssemblyError>) -> Error {
        Error::Assembly(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("mvnasm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Assembles a source file into a program image")
        .arg(Arg::with_name("source")
             .help("File containing assembly source")
             .value_name("SOURCE")
             .required(true)
             .index(1))
        .arg(Arg::with_name("output")
             .help("Where to write the image, defaults to SOURCE with the extension .bin")
             .value_name("OUT")
             .long("output")
             .short("o")
             .takes_value(true))
        .arg(Arg::with_name("listing")
             .help("Prints the symbols and the placed records")
             .long("listing"))
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

    let source = match args.value_of("source") {
        Some(source) => Path::new(source),
        None => return,
    };

    let output = args.value_of("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| source.with_extension("bin"));

    match assemble(source, &output, args.is_present("listing"), logger) {
        Ok(()) => (),
        Err(Error::IO(io)) => {
            eprintln!("IO error: {}", io);
            std::process::exit(2);
        },
        Err(Error::Assembly(errors)) => {
            for error in errors {
                eprintln!("{}: {}", source.display(), error);
            }
            std::process::exit(1);
        },
    }
}

fn assemble(source_path: &Path, output: &Path, listing: bool, logger: Logger) -> Result<(), Error> {
    let source = std::fs::read_to_string(source_path)?;

    let program = symbolic::Program::parse_verbose(&source)?;
    let compiled = mvn::compiler::compile_listing(&program, logger)?;

    if listing {
        print_listing(&source, &compiled);
    }

    std::fs::write(output, compiled.program.to_bytes())?;

    Ok(())
}

fn print_listing(source: &str, listing: &Listing) {
    let program = &listing.program;
    let end = program.origin as usize + program.body.len();

    println!("origin {:03X}  words {}  checksum {:02X}", program.origin, program.length(), program.checksum());
    println!();

    let records = listing.source_map.iter().collect::<Vec<_>>();

    for (index, (address, line)) in records.iter().enumerate() {
        let next = records.get(index + 1)
            .map(|(next, _)| *next as usize)
            .unwrap_or(end);

        let start = *address as usize - program.origin as usize;
        let stop = next - program.origin as usize;

        let bytes = program.body[start..stop]
            .iter()
            .map(|byte| format!("{:02X}", byte))
            .collect::<Vec<_>>()
            .join(" ");

        let text = source.lines().nth(**line - 1).unwrap_or("").trim();

        println!("{:03X}  {:<6} {:>4}  {}", address, bytes, line, text);
    }

    println!();

    for (label, address) in &listing.symbols {
        println!("{:<16} {:03X}", label, address);
    }
}
