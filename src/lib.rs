//! # CCK Core
//!
//! The circuit-solving core of an interactive DC/AC circuit construction
//! simulation.
//!
//! This library provides:
//! - A circuit graph of vertices and elements with the edits a construction
//!   kit needs (connect, cut, prune, connectivity queries)
//! - Modified Nodal Analysis (MNA) based circuit solving, island by island
//! - Companion models for capacitors and inductors, iterated real bulbs
//! - A netlist DSL for describing circuits in text
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`dsl`] - Parser for the netlist language
//! - [`circuit`] - Circuit graph representation and validation
//! - [`components`] - Element models (batteries, bulbs, capacitors, fuses, etc.)
//! - [`solver`] - MNA assembly, non-linear iteration and time stepping
//! - [`report`] - Snapshot and trace output (CLI only)
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! cck circuit.cck --steps 60 --dt 0.016
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use cck_core::{dsl, Circuit, Simulator};
//!
//! let ast = dsl::parse("B1 0 top 9\nR1 top 0 30\n").unwrap();
//! let mut sim = Simulator::new(Circuit::from_ast(ast).unwrap());
//! sim.step(1.0 / 60.0);
//! assert!((sim.element_current("R1").unwrap() - 0.3).abs() < 1e-6);
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmCircuitSim } from 'cck_core';
//!
//! const sim = new WasmCircuitSim(netlist);
//! sim.step(1 / 60);
//! const amps = sim.element_current("R1");
//! ```
//!
//! ## Circuit Simulation Method
//!
//! For each frame of length dt:
//!
//! 1. Split the circuit into islands of conducting elements
//! 2. Assemble each island's system matrix A and source vector z
//! 3. Solve Ax = z for vertex voltages and source branch currents
//! 4. For real bulbs, iterate resistance against power until it settles
//! 5. Commit currents and capacitor/inductor history, advance the clock
//!
//! Reactive elements (C, L) are discretized with backward Euler by default,
//! or the trapezoidal rule on request.

pub mod circuit;
pub mod components;
pub mod dsl;
pub mod error;
pub mod solver;

#[cfg(feature = "cli")]
pub mod report;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use error::{CckError, Result};
pub use solver::{Simulator, SimulatorConfig};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmCircuitSim;

/// Smallest resistance stamped into a matrix (Ω). Wires and closed switches
/// sit here.
pub const MIN_RESISTANCE: f64 = 1e-8;

/// Largest resistance stamped into a matrix (Ω).
pub const MAX_RESISTANCE: f64 = 1e12;

/// Conductance floor for elements that must not fully disconnect.
pub const MIN_CONDUCTANCE: f64 = 1e-12;

/// Solved values smaller than this are reported as zero.
pub const DISPLAY_EPSILON: f64 = 1e-9;
