
extern crate clap;
#[macro_use] extern crate log;
#[macro_use] extern crate lazy_static;
extern crate fern;
extern crate chrono;
extern crate term_grid;

pub mod assembler;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use assembler::ast::Instruction;

/// Source files must carry this extension.
const SOURCE_EXTENSION: &str = "s";
/// Default extension of the assembled image.
const BINARY_EXTENSION: &str = "bin";

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tOutfile: {}\n\tInfile: {}",
        verbosity_filter(args.occurrences_of("verbose")),
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap_or("None")
    );

    let ipath = match check_input(args.value_of("INPUT")) {
        Err(err) => {
            error!("fatal: {}", err);
            std::process::exit(1);
        },
        Ok(path) => path,
    };

    // Open the path in read-only mode, returns `io::Result<File>`
    let ifile = match File::open(&ipath) {
        Err(err) => {
            error!("fatal: unable to open input file `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    let program = match assembler::assemble(ifile) {
        Err(err) => {
            error!("fatal: {}", err);
            error!("Stopped assembly of `{}`; no output was written.", ipath.display());
            std::process::exit(1);
        },
        Ok(program) => program,
    };

    if args.is_present("print-debug") {
        print_listing(&program);
    }

    let opath = output_path(ipath, args.value_of("output"));

    // Only written once the whole input has assembled.
    let image = assembler::emit(&program);

    let mut ofile = match File::create(&opath) {
        Err(err) => {
            error!("fatal: unable to open output file `{}`: {}", opath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    if let Err(err) = ofile.write_all(&image) {
        error!("fatal: unable to write to output file `{}`: {}", opath.display(), err);
        std::process::exit(1);
    }

    println!("File {} assembled with success: {} word(s) written to `{}`.",
        ipath.display(), program.len(), opath.display());
}

/// Rejects a missing path, a path without the source extension
/// and a path that does not name an existing file.
fn check_input(ifile: Option<&str>) -> Result<&Path, String> {
    let usage = format!("usage: {} <FILE.{}>", env!("CARGO_PKG_NAME"), SOURCE_EXTENSION);

    let ipath = match ifile {
        Some(ifile) => Path::new(ifile),
        None => return Err(format!("missing input file\n{}", usage)),
    };

    if ipath.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
        return Err(format!("input file `{}` must have the .{} extension\n{}",
            ipath.display(), SOURCE_EXTENSION, usage));
    }

    if !ipath.is_file() {
        return Err(format!("input file `{}` does not exist", ipath.display()));
    }

    Ok(ipath)
}

/// `-o` wins; otherwise the input path with its extension swapped.
fn output_path(ipath: &Path, requested: Option<&str>) -> PathBuf {
    match requested {
        Some(filename) => PathBuf::from(filename),
        None => ipath.with_extension(BINARY_EXTENSION),
    }
}

fn print_listing(program: &[Instruction]) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for (idx, ins) in program.iter().enumerate() {
        let bytes = ins.to_be_bytes();
        grid.add(Cell::from(format!("0x{:04X}:", idx * 4)));
        grid.add(Cell::from(format!("{}", ins)));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(format!("{:02X} {:02X} {:02X} {:02X}", bytes[0], bytes[1], bytes[2], bytes[3])));
    }

    println!("{}", grid.fit_into_columns(4));
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use (must end in .s)")
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile instead of <INPUT>.bin"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .long("show")
            .takes_value(false)
            .help("prints the debug information alongside the assembly to STDOUT"))
        .get_matches()
}

fn verbosity_filter(verbosity: u64) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    }
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(verbosity_filter(verbosity))
        .chain(std::io::stderr())
        .apply().ok();
}
