use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox_runtime as lox;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::scanner::Scanner;

/// Exit code for malformed input (scan or parse errors).
const EXIT_DATA_ERR: i32 = 65;

/// Exit code for runtime errors.
const EXIT_SOFTWARE: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses a program and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Print the AST as JSON instead of S-expressions
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Reads statements from stdin line by line, sharing one global scope
    Repl,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox_runtime::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report_all(errors: &[LoxError]) {
    for e in errors {
        debug!("Reporting: {}", e);
        eprintln!("{}", e);
    }
}

fn no_input() -> ! {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;
            let mut tokenized = true;

            for token in Scanner::new(&buf) {
                match token {
                    Ok(token) => println!("{}", token),

                    Err(e) => {
                        tokenized = false;
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code {}", EXIT_DATA_ERR);
                std::process::exit(EXIT_DATA_ERR);
            }
        }

        Commands::Parse { filename, json } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;

            match lox::parse_program(&buf) {
                Ok(statements) => {
                    if json {
                        let rendered = serde_json::to_string_pretty(&statements)
                            .context("Failed to serialize AST")?;
                        println!("{}", rendered);
                    } else {
                        for stmt in &statements {
                            println!("{}", AstPrinter::print_stmt(stmt));
                        }
                    }
                }

                Err(errors) => {
                    report_all(&errors);
                    std::process::exit(EXIT_DATA_ERR);
                }
            }
        }

        Commands::Evaluate { filename } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;

            let expr = match lox::scan(&buf) {
                Ok(tokens) => Parser::new(tokens).parse_expression(),
                Err(errors) => {
                    report_all(&errors);
                    std::process::exit(EXIT_DATA_ERR);
                }
            };

            match expr {
                Ok(expr) => match Interpreter::new().evaluate(&expr) {
                    Ok(value) => println!("{}", value),

                    Err(e) => {
                        eprintln!("{}", e);
                        std::process::exit(EXIT_SOFTWARE);
                    }
                },

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(EXIT_DATA_ERR);
                }
            }
        }

        Commands::Run { filename } => {
            let buf = read_file(filename.unwrap_or_else(|| no_input()))?;

            let statements = match lox::parse_program(&buf) {
                Ok(statements) => statements,
                Err(errors) => {
                    report_all(&errors);
                    std::process::exit(EXIT_DATA_ERR);
                }
            };

            info!("Parsed {} statements", statements.len());

            if let Err(errors) = Interpreter::new().interpret(&statements) {
                for e in &errors {
                    eprintln!("{}", e);
                }
                std::process::exit(EXIT_SOFTWARE);
            }
        }

        Commands::Repl => repl()?,
    }

    Ok(())
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    print!("> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;

        match lox::parse_program(line.as_bytes()) {
            Ok(statements) => {
                if let Err(errors) = interpreter.interpret(&statements) {
                    for e in &errors {
                        eprintln!("{}", e);
                    }
                }
            }
            Err(errors) => report_all(&errors),
        }

        print!("> ");
        io::stdout().flush()?;
    }

    println!();
    Ok(())
}
