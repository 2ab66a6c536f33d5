//! cfront
//!
//! Single-pass semantic front end for a small C subset: scoped symbol
//! table, constant folding with conversion warnings, and an abstract
//! syntax tree assembled from parser reductions.

mod frontend;
mod report;
mod semantic;
mod types;
mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use report::tree_printer::print_tree;
use report::{render_diagnostics, render_summary, render_symbol_table, AnalysisReport};
use semantic::{analyze_source, AnalyzerOptions};

/// cfront semantic analyzer
#[derive(Parser, Debug)]
#[command(name = "cfront")]
#[command(version = "0.1.0")]
#[command(about = "Semantic front end for a small C subset")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input source file (.c)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Emit the full report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Do not echo diagnostics to stderr while analyzing
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Skip the leveled tree diagram
    #[arg(long, global = true)]
    no_tree: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report diagnostics only
    Check {
        /// Input source file
        input: PathBuf,
    },
    /// Report diagnostics, symbol table and syntax tree
    Analyze {
        /// Input source file
        input: PathBuf,
    },
    /// Print version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Check,
    Analyze,
}

/// Exit status: clean or warnings only
const EXIT_OK: i32 = 0;
/// Exit status: at least one semantic error
const EXIT_ERRORS: i32 = 1;
/// Exit status: the pass aborted
const EXIT_FATAL: i32 = 2;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match &cli.command {
        Some(Commands::Check { input }) => run(input, Mode::Check, &cli),
        Some(Commands::Analyze { input }) => run(input, Mode::Analyze, &cli),
        Some(Commands::Version) => {
            println!("cfront 0.1.0");
            println!("Semantic front end for a small C subset");
            Ok(EXIT_OK)
        }
        None => match cli.input {
            Some(ref input) => run(input, Mode::Analyze, &cli),
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: cfront <FILE> or cfront analyze <FILE>");
                Ok(EXIT_FATAL)
            }
        },
    };

    match outcome {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(EXIT_FATAL);
        }
    }
}

/// Analyze one file and print the requested views
fn run(input: &Path, mode: Mode, cli: &Cli) -> anyhow::Result<i32> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let file_name = input.display().to_string();
    info!("analyzing {} ({} bytes)", file_name, source.len());

    let echo = !cli.quiet && !cli.json;
    let options = AnalyzerOptions { echo_diagnostics: echo };

    let start = Instant::now();
    let result = analyze_source(&source, options);
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let analysis = match result {
        Ok(analysis) => analysis,
        Err(e) => {
            if e.is_internal() {
                error!("internal consistency failure: {}", e);
            }
            info!("analysis aborted after {} ms", elapsed_ms);
            if cli.json {
                let report = AnalysisReport::from_error(&e, &file_name, &source)
                    .with_elapsed_ms(elapsed_ms);
                println!("{}", report.to_json());
            } else {
                eprintln!("{}: fatal: {}", file_name, e);
            }
            return Ok(EXIT_FATAL);
        }
    };

    let report = AnalysisReport::from_analysis(&analysis, &file_name, &source)
        .with_elapsed_ms(elapsed_ms);
    info!("analysis finished in {} ms", elapsed_ms);

    if cli.json {
        println!("{}", report.to_json());
    } else {
        if !echo {
            print!("{}", render_diagnostics(&report.diagnostics));
        }
        if mode == Mode::Analyze {
            println!("\nSymbol Table\n");
            print!("{}", render_symbol_table(&report.symbols));
            if !cli.no_tree {
                println!("\nAbstract Syntax Tree\n");
                print!("{}", print_tree(&analysis.ast, analysis.root));
            }
            println!("\nPreorder Traversal\n");
            println!("{}", report.preorder.as_deref().unwrap_or_default());
        }
        println!("\n{}: {}", file_name, render_summary(&report.stats));
    }

    Ok(if report.success { EXIT_OK } else { EXIT_ERRORS })
}
