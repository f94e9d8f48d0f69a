//! cck - circuit construction kit solver
//!
//! Loads a netlist, runs it for a number of frames and prints the result.
//!
//! # Usage
//!
//! ```bash
//! cck circuit.cck --steps 120 --dt 0.016
//! cck circuit.cck --json > snapshot.json
//! RUST_LOG=debug cck circuit.cck --trace > currents.csv
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use cck_core::{
    circuit::{validate_circuit, Circuit},
    components::IntegrationMethod,
    dsl,
    error::Result,
    report::{Snapshot, TraceWriter},
    solver::DEFAULT_MAX_ITERATIONS,
    Simulator, SimulatorConfig,
};

/// Frame length used when neither the netlist nor the command line set one.
const DEFAULT_DT: f64 = 1.0 / 60.0;

/// Frames run when neither the netlist nor the command line set a count.
const DEFAULT_STEPS: usize = 60;

/// Circuit construction kit solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file
    #[arg(value_name = "NETLIST")]
    netlist: PathBuf,

    /// Frame length in seconds
    #[arg(long)]
    dt: Option<f64>,

    /// Number of frames to run
    #[arg(short = 'n', long)]
    steps: Option<usize>,

    /// Integrate capacitors and inductors with the trapezoidal rule
    #[arg(long)]
    trapezoidal: bool,

    /// Maximum non-linear iterations per island
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Absolute current tolerance in amperes
    #[arg(long)]
    tolerance: Option<f64>,

    /// Print the final snapshot as JSON
    #[arg(long, conflicts_with = "trace")]
    json: bool,

    /// Print element currents after every frame as CSV
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // Parse the netlist
    let ast = dsl::parse_file(&args.netlist)?;
    let options = ast.options.clone();

    // Build the circuit
    let circuit = Circuit::from_ast(ast)?;

    // Validate; the solver skips offending elements, so only report them
    for issue in validate_circuit(&circuit) {
        log::warn!("{}", issue);
    }

    // Command-line flags override netlist options
    let dt = args.dt.or(options.dt).unwrap_or(DEFAULT_DT);
    let steps = args.steps.or(options.steps).unwrap_or(DEFAULT_STEPS);
    let integration = if args.trapezoidal || options.trapezoidal {
        IntegrationMethod::Trapezoidal
    } else {
        IntegrationMethod::BackwardEuler
    };
    let mut config = SimulatorConfig::new()
        .with_max_iterations(
            args.max_iterations
                .or(options.max_iterations)
                .unwrap_or(DEFAULT_MAX_ITERATIONS),
        )
        .with_integration(integration);
    if let Some(tolerance) = args.tolerance.or(options.tolerance) {
        config = config.with_tolerance(tolerance);
    }

    // Create simulator
    let mut simulator = Simulator::with_config(circuit, config);
    log::info!(
        "running {} frames of {} s ({} vertices, {} elements)",
        steps,
        dt,
        simulator.circuit().vertex_count(),
        simulator.circuit().element_count()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.trace {
        let mut trace = TraceWriter::new(&mut out, simulator.circuit())?;
        for _ in 0..steps {
            simulator.step(dt);
            trace.write_row(simulator.time(), simulator.circuit())?;
        }
        return trace.flush();
    }

    let mut last = None;
    for _ in 0..steps {
        let report = simulator.step(dt);
        for diagnostic in &report.diagnostics {
            log::debug!("t = {:.6}: {}", report.time, diagnostic);
        }
        if report.solution.is_some() {
            last = report.solution;
        }
    }

    let snapshot = Snapshot::capture(&simulator, last.as_ref());
    if args.json {
        snapshot.write_json(&mut out)?;
    } else {
        snapshot.write_table(&mut out)?;
    }
    out.flush().map_err(|e| cck_core::CckError::OutputError {
        message: e.to_string(),
    })
}
