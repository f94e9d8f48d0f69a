//! MNA (Modified Nodal Analysis) solver.
//!
//! This module provides the numerical engine for circuit simulation.
//!
//! ## Modified Nodal Analysis
//!
//! MNA assembles a system of equations Ax = z where:
//! - x contains vertex voltages and voltage-source branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (vertex equations)
//! - B, C connect ideal voltage sources to vertices
//! - D is 0 (ideal sources only)
//! - v is the vector of vertex voltages
//! - j is the vector of voltage source currents
//! - i is the sum of injected currents into each vertex
//! - e is the vector of voltage source values
//!
//! ## Islands
//!
//! The circuit is split into islands of conducting elements before
//! assembly. Each island gets its own matrix with one vertex grounded, so a
//! disconnected sub-circuit never makes the whole system singular.
//!
//! ## Pipeline
//!
//! ```text
//! Simulator::step ─▶ partition ─▶ FixedPointIteration ─▶ IslandSystem ─▶ MnaMatrix
//!        ▲                               (per island)
//!        └──── commit currents, voltages, history ◀────────────┘
//! ```

mod island;
mod mna;
mod nonlinear;
mod simulator;

#[cfg(test)]
mod tests;

pub use island::{partition, Island, IslandSystem, StampedElement};
pub use mna::{MnaMatrix, PIVOT_EPSILON};
pub use nonlinear::{snap, ElementReading, FixedPointIteration, IslandSolution, IslandStatus};
pub use simulator::{
    solve_circuit, IslandReport, Simulator, SimulatorConfig, Solution, StepOutcome, StepReport,
};

/// Maximum fixed-point iterations per island solve.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Absolute convergence tolerance on bulb currents (amperes).
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Relative convergence tolerance on bulb currents and resistances.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-3;

/// Under-relaxation factor for bulb resistance updates.
pub const DEFAULT_RELAXATION: f64 = 0.5;

/// Longest step the simulator will integrate in one call (seconds).
pub const DEFAULT_MAX_DT: f64 = 0.1;

/// Frames longer than this are treated as a pause and skipped (seconds).
pub const DEFAULT_PAUSE_THRESHOLD: f64 = 1.0;

/// Longest single companion-model substep (seconds).
pub const DEFAULT_MAX_SUBSTEP: f64 = 1.0 / 120.0;

/// Floor for `max_dt` and `max_substep` (seconds).
pub const MIN_STEP: f64 = 1e-6;

/// Most substeps a single frame is split into.
pub const MAX_SUBSTEPS: usize = 1000;
