use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

mod repl;

use sprig_core::error::{format_error, SprigError};
use sprig_core::{EvalOptions, Interpreter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn help() -> ! {
    println!("Usage: sprig [--repl] [--no-std] [-e CODE] [--version] [file...]");
    println!();
    println!("Options:");
    println!("  --repl       Start the REPL, or enter it after running the given files");
    println!("               in the same root environment");
    println!("  --no-std     Skip the standard-library bootstrap");
    println!("  -e CODE      Evaluate CODE, print the result, and exit");
    println!("  --version    Show version");
    println!("  -h, --help   Show this help");
    std::process::exit(0);
}

fn unknown_option(opt: &str) -> ! {
    eprintln!("unknown option: {}", opt);
    help();
}

struct Args {
    repl: bool,
    no_std: bool,
    expression: Option<String>,
    files: Vec<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        repl: false,
        no_std: false,
        expression: None,
        files: Vec::new(),
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--repl" => args.repl = true,
            "--no-std" => args.no_std = true,
            "-e" => match iter.next() {
                Some(code) => args.expression = Some(code),
                None => {
                    eprintln!("-e expects an expression");
                    std::process::exit(2);
                }
            },
            "--version" => {
                println!("sprig {}", VERSION);
                std::process::exit(0);
            }
            "-h" | "--help" => help(),
            other if other.starts_with('-') => unknown_option(other),
            file => args.files.push(PathBuf::from(file)),
        }
    }
    args
}

fn report(err: &SprigError) {
    for line in format_error(err) {
        eprintln!("{}", line);
    }
}

fn main() -> ExitCode {
    let args = parse_args();
    let options = EvalOptions {
        no_std: args.no_std,
        source_name: None,
    };
    let interp = match Interpreter::new(options) {
        Ok(interp) => interp,
        Err(err) => {
            report(&err);
            return ExitCode::FAILURE;
        }
    };

    for file in &args.files {
        if let Err(err) = interp.eval_file(file) {
            report(&err);
            return ExitCode::FAILURE;
        }
    }

    if let Some(code) = &args.expression {
        match interp.eval_named(code, Some("<cmdline>")) {
            Ok(value) => println!("{}", value),
            Err(err) => {
                report(&err);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if args.repl || args.files.is_empty() {
        if let Err(err) = repl::run(&interp) {
            eprintln!("repl error: {}", err);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
