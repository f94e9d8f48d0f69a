//! WASM bindings for CCK Core.
//!
//! This module provides JavaScript-friendly bindings for driving the solver
//! from a browser animation loop.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCircuitSim } from 'cck_core';
//!
//! await init();
//!
//! const netlist = `
//!   B1  0 a 9
//!   SW1 a b closed
//!   LB1 b 0 10 real
//! `;
//!
//! const sim = new WasmCircuitSim(netlist);
//!
//! // In requestAnimationFrame:
//! sim.step(elapsedSeconds);
//! const amps = sim.element_current("LB1");
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::Circuit;
use crate::dsl;
use crate::error::CckError;
use crate::solver::{Simulator, SimulatorConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(e: CckError) -> JsValue {
    let e = match e {
        e @ CckError::WasmError { .. } => e,
        other => CckError::WasmError {
            message: other.to_string(),
        },
    };
    JsValue::from_str(&e.to_string())
}

/// WASM-compatible circuit simulator.
///
/// Wraps the native `Simulator` with a name-based API so a page can step
/// the circuit each animation frame and read meters by element name.
#[wasm_bindgen]
pub struct WasmCircuitSim {
    simulator: Simulator,
}

#[wasm_bindgen]
impl WasmCircuitSim {
    /// Create a new simulator from a netlist string.
    ///
    /// # Returns
    /// A new `WasmCircuitSim` instance or an error if the netlist is invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(netlist: &str) -> Result<WasmCircuitSim, JsValue> {
        Self::with_config(netlist, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE)
    }

    /// Create a new simulator with custom iteration settings.
    ///
    /// # Arguments
    /// * `netlist` - The circuit in netlist format
    /// * `max_iterations` - Maximum bulb iterations per island (default: 100)
    /// * `tolerance` - Absolute current tolerance in amperes (default: 1e-6)
    #[wasm_bindgen]
    pub fn with_config(
        netlist: &str,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<WasmCircuitSim, JsValue> {
        let ast = dsl::parse(netlist).map_err(to_js)?;
        let circuit = Circuit::from_ast(ast).map_err(to_js)?;

        let config = SimulatorConfig::new()
            .with_max_iterations(max_iterations)
            .with_tolerance(tolerance);
        let simulator = Simulator::with_config(circuit, config);

        Ok(WasmCircuitSim { simulator })
    }

    /// Advance by `dt` seconds of wall-clock time.
    ///
    /// Returns `false` if the frame was skipped (too long, e.g. after the
    /// tab was hidden).
    #[wasm_bindgen]
    pub fn step(&mut self, dt: f64) -> bool {
        !self.simulator.step(dt).is_skipped()
    }

    /// Simulation clock in seconds.
    #[wasm_bindgen]
    pub fn time(&self) -> f64 {
        self.simulator.time()
    }

    /// Get the voltage at a named vertex, or `undefined` if it doesn't exist.
    #[wasm_bindgen]
    pub fn vertex_voltage(&self, name: &str) -> Option<f64> {
        self.simulator.vertex_voltage(name)
    }

    /// Get the current through a named element, or `undefined` if it
    /// doesn't exist.
    #[wasm_bindgen]
    pub fn element_current(&self, name: &str) -> Option<f64> {
        self.simulator.element_current(name)
    }

    /// Open or close a switch.
    #[wasm_bindgen]
    pub fn set_switch(&mut self, name: &str, closed: bool) -> Result<(), JsValue> {
        self.simulator.set_switch(name, closed).map_err(to_js)?;
        // Meters should reflect the edit even while paused
        self.simulator.refresh();
        Ok(())
    }

    /// Replace a blown fuse.
    #[wasm_bindgen]
    pub fn reset_fuse(&mut self, name: &str) -> Result<(), JsValue> {
        self.simulator.reset_fuse(name).map_err(to_js)?;
        self.simulator.refresh();
        Ok(())
    }

    /// Return to time zero with everything powered off.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.simulator.reset();
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
