//! Command-line entry point: parse a problem, run the reverse search, print
//! the result.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use basil::driver::{DfsOptions, Mode};
use basil::{output, parse_problem, run};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    PolytopeH,
    PolytopeV,
    Arrangement,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::PolytopeH => Mode::PolytopeH,
            ModeArg::PolytopeV => Mode::PolytopeV,
            ModeArg::Arrangement => Mode::Arrangement,
        }
    }
}

/// Symmetric reverse-search enumeration of polyhedron vertices, rays, and
/// bases under a permutation symmetry group.
#[derive(Debug, Parser)]
#[command(name = "basil", version, about)]
struct Cli {
    /// Input problem file (defaults to stdin).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output file (defaults to stdout).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Alternative source of `symmetry begin .. symmetry end` generators,
    /// read instead of any inline symmetry block.
    #[arg(long)]
    group_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Representation/arrangement mode.
    #[arg(long, value_enum, default_value_t = ModeArg::PolytopeH)]
    mode: ModeArg,

    /// Maximum number of vertex orbits to discover before truncating.
    #[arg(long)]
    basis_limit: Option<usize>,

    /// Cobasis cache capacity.
    #[arg(long)]
    cache_size: Option<usize>,

    /// Enable the dual-facet trick (prunes symmetric images entirely instead
    /// of folding them into the known orbit).
    #[arg(long)]
    dual_facet_trick: bool,

    /// Disable Gram-vector fingerprinting (every candidate becomes "all
    /// stored", degrading pruning to invariant-free image search).
    #[arg(long)]
    no_gram_vec: bool,

    /// Expand symmetry search to setwise stabilizers when plain image search
    /// fails.
    #[arg(long)]
    stab_search: bool,

    /// Restrict the search to the lexicographically-first leaving index per
    /// cobasis (unsafe: forfeits the orbit-coverage invariant).
    #[arg(long)]
    lex_only: bool,

    /// Maximum number of fundamental-domain constraints to accumulate.
    #[arg(long)]
    fund_domain_limit: Option<usize>,

    /// Skip symmetry computation entirely and run as if G were trivial.
    #[arg(long)]
    assume_no_symmetry: bool,

    /// Emit a progress line every N work items (0 disables).
    #[arg(long)]
    progress_interval: Option<usize>,

    /// Parse and re-emit the canonical form, then exit without searching.
    #[arg(long)]
    preprocess_only: bool,

    /// Number of worker threads (1 runs the single-threaded driver).
    #[arg(long, default_value_t = 1)]
    num_threads: usize,

    /// Raise the log level (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    match run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run_cli(cli: Cli) -> Result<ExitCode, basil::BasilError> {
    let input = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut problem = parse_problem(&input)?;

    if let Some(group_file) = &cli.group_file {
        let group_text = fs::read_to_string(group_file)?;
        let group_problem = parse_problem(&group_text)?;
        problem.symmetry = group_problem.symmetry;
    }

    let mut options = DfsOptions { mode: cli.mode.into(), ..DfsOptions::default() };
    if let Some(v) = cli.basis_limit {
        options.basis_limit = v;
    }
    if let Some(v) = cli.cache_size {
        options.cache_size = v;
    }
    options.dual_facet_trick = cli.dual_facet_trick;
    options.gram_vec = !cli.no_gram_vec;
    options.stab_search = cli.stab_search;
    options.lex_only = cli.lex_only;
    if let Some(v) = cli.fund_domain_limit {
        options.fund_domain_limit = v;
    }
    options.assume_no_symmetry = cli.assume_no_symmetry;
    if let Some(v) = cli.progress_interval {
        options.progress_interval = v;
    }
    options.preprocess_only = cli.preprocess_only;
    options.num_threads = cli.num_threads;

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(io::stdout()),
    };

    if options.preprocess_only {
        writeln!(out, "{}", output::pretty_print_problem(&problem))?;
        return Ok(ExitCode::SUCCESS);
    }

    let report = run(&problem, options)?;

    match cli.format {
        OutputFormat::Text => writeln!(out, "{}", output::pretty_print_report(&report))?,
        OutputFormat::Json => writeln!(out, "{}", output::to_json(&report)?)?,
    }

    if !report.is_finished {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
