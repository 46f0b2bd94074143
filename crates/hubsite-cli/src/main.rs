use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use hubsite_core::{
    validate, AssignmentExtreme, AssignmentSolution, BatchSummary, ObjectiveMode, Pipeline, PipelineError,
    SolveOutcome,
};
use hubsite_solver::Solver;
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hubsite")]
#[command(about = "Choose distribution centers among candidate locations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance file and report the chosen centers
    Solve {
        /// The instance file
        file: PathBuf,
        #[command(flatten)]
        options: SolveOptions,
    },
    /// Solve several instance files; one failure does not stop the others
    Batch {
        /// The instance files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        options: SolveOptions,
    },
    /// Check an instance file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
}

#[derive(Args)]
struct SolveOptions {
    /// Objective (total, balance)
    #[arg(short, long, default_value = "total", value_parser = ["total", "balance"])]
    mode: String,
    /// Output format (json, pretty)
    #[arg(short, long, default_value = "pretty", value_parser = ["pretty", "json"])]
    format: String,
    /// Branch-and-bound node limit
    #[arg(long)]
    max_nodes: Option<usize>,
    /// Minimum simplex pivots per phase at each node
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Wall-clock limit in seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Relative tolerance when cross-checking the solver's answer
    #[arg(long, default_value_t = 1e-6)]
    tolerance: f64,
}

impl SolveOptions {
    fn pipeline(&self) -> Pipeline<Solver> {
        let mut solver = Solver::new();
        if let Some(max) = self.max_nodes {
            solver = solver.with_max_nodes(max);
        }
        if let Some(max) = self.max_iterations {
            solver = solver.with_max_iterations(max);
        }
        if let Some(secs) = self.time_limit {
            match Duration::try_from_secs_f64(secs) {
                Ok(limit) => solver = solver.with_time_limit(limit),
                Err(e) => {
                    eprintln!("Invalid time limit {}: {}", secs, e);
                    std::process::exit(1);
                }
            }
        }

        let mode = match self.mode.as_str() {
            "balance" => ObjectiveMode::MinMaxBalance,
            _ => ObjectiveMode::MinTotalWeightedDistance,
        };
        Pipeline::new(solver).with_mode(mode).with_tolerance(self.tolerance)
    }

    fn json(&self) -> bool {
        self.format == "json"
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Solve { file, options } => {
            let name = file.display().to_string();
            let result = options.pipeline().solve_file(&file);

            if options.json() {
                println!("{}", to_json(&report_json(&name, &result)));
            } else {
                print_report(&name, &result);
            }

            if !matches!(result, Ok(SolveOutcome::Solved(_))) {
                std::process::exit(1);
            }
        }
        Commands::Batch { files, options } => {
            let entries = hubsite_core::run_batch_files(&options.pipeline(), &files);
            let summary = BatchSummary::from_entries(&entries);

            if options.json() {
                let reports: Vec<_> = entries.iter().map(|e| report_json(&e.name, &e.result)).collect();
                println!("{}", to_json(&json!({ "instances": reports, "summary": summary })));
            } else {
                for entry in &entries {
                    print_report(&entry.name, &entry.result);
                    println!();
                }
                println!(
                    "{} instances: {} solved, {} infeasible, {} unknown, {} failed",
                    summary.total(),
                    summary.solved,
                    summary.infeasible,
                    summary.unknown,
                    summary.failed
                );
            }

            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let checked = hubsite_core::Parser::parse_file(&file)
                .map_err(PipelineError::from)
                .and_then(|parsed| Ok(parsed.into_instance(file.display().to_string())?))
                .and_then(|instance| {
                    validate(&instance)?;
                    Ok(instance)
                });

            match checked {
                Ok(instance) => {
                    println!("✓ {} is valid", file.display());
                    println!("  {} locations", instance.len());
                    println!("  {} eligible", instance.eligible_count());
                    println!("  {} centers required", instance.centers());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn to_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

fn report_json(name: &str, result: &Result<SolveOutcome, PipelineError>) -> serde_json::Value {
    match result {
        Ok(SolveOutcome::Solved(solution)) => json!({
            "instance": name,
            "status": "optimal",
            "solution": solution,
        }),
        Ok(SolveOutcome::Infeasible) => json!({ "instance": name, "status": "infeasible" }),
        Ok(SolveOutcome::Unknown) => json!({ "instance": name, "status": "unknown" }),
        Err(e) => json!({
            "instance": name,
            "status": "error",
            "kind": e.kind(),
            "error": e.to_string(),
        }),
    }
}

fn print_report(name: &str, result: &Result<SolveOutcome, PipelineError>) {
    let mut out = std::io::stdout().lock();
    if let Err(e) = write_report(&mut out, name, result) {
        eprintln!("Error writing report: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = result {
        eprintln!("{}", e);
    }
}

fn write_report(out: &mut impl Write, name: &str, result: &Result<SolveOutcome, PipelineError>) -> io::Result<()> {
    writeln!(out, "Instance: {}", name)?;
    match result {
        Ok(SolveOutcome::Solved(solution)) => write_solution(out, solution),
        Ok(SolveOutcome::Infeasible) => {
            writeln!(out, "Status: INFEASIBLE")?;
            writeln!(out, "No choice of centers satisfies every constraint.")
        }
        Ok(SolveOutcome::Unknown) => {
            writeln!(out, "Status: UNKNOWN")?;
            writeln!(out, "The solver stopped before proving optimality (node or time limit).")
        }
        Err(e) => writeln!(out, "Status: ERROR ({:?})", e.kind()),
    }
}

fn write_solution(out: &mut impl Write, solution: &AssignmentSolution) -> io::Result<()> {
    writeln!(out, "Status: OPTIMAL")?;
    let centers: Vec<String> = solution.centers.iter().map(|c| c.to_string()).collect();
    writeln!(out, "Selected centers: {}", centers.join(", "))?;
    writeln!(out, "Total weighted distance: {:.2}", solution.total_weighted_distance)?;
    if let Some(balance) = &solution.balance {
        writeln!(
            out,
            "Load spread: {:.2} (max {:.2}, min {:.2})",
            solution.objective_value, balance.max_load, balance.min_load
        )?;
    }
    writeln!(out)?;

    let extremes = &solution.extremes;
    write_extreme(out, "Longest assignment", extremes.max_distance)?;
    write_extreme(out, "Shortest assignment", extremes.min_distance)?;
    write_extreme(out, "Largest weighted assignment", extremes.max_weighted)?;
    write_extreme(out, "Smallest weighted assignment", extremes.min_weighted)?;
    writeln!(out)?;

    writeln!(out, "Centers:")?;
    for load in &solution.center_loads {
        let served: Vec<String> = load.served.iter().map(|l| l.to_string()).collect();
        writeln!(out, "  {:6} load {:12.2}  serves {}", load.center, load.load, served.join(", "))?;
    }
    Ok(())
}

fn write_extreme(out: &mut impl Write, label: &str, extreme: Option<AssignmentExtreme>) -> io::Result<()> {
    match extreme {
        Some(e) => writeln!(
            out,
            "{:30} {:10.2} (center {} -> location {})",
            label, e.value, e.center, e.location
        ),
        None => writeln!(out, "{:30} {:>10} (every location is a center)", label, "-"),
    }
}
