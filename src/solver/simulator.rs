//! Main simulator interface.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::circuit::{check_element, Circuit, ElementId, VertexId};
use crate::components::{ElementKind, IntegrationMethod, StampContext};
use crate::error::{CckError, Result};

use super::island::partition;
use super::nonlinear::{FixedPointIteration, IslandStatus};
use super::{
    DEFAULT_MAX_DT, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_SUBSTEP, DEFAULT_PAUSE_THRESHOLD,
    DEFAULT_RELATIVE_TOLERANCE, DEFAULT_RELAXATION, DEFAULT_TOLERANCE, MAX_SUBSTEPS, MIN_STEP,
};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Maximum fixed-point iterations per island solve.
    pub max_iterations: usize,
    /// Absolute convergence tolerance on bulb currents (amperes).
    pub tolerance: f64,
    /// Relative convergence tolerance.
    pub relative_tolerance: f64,
    /// Under-relaxation factor for bulb resistance updates.
    pub relaxation: f64,
    /// Longest step integrated in one call (seconds).
    pub max_dt: f64,
    /// Steps longer than this are skipped as a pause (seconds).
    pub pause_threshold: f64,
    /// Longest companion-model substep (seconds).
    pub max_substep: f64,
    /// Integration rule for capacitors and inductors.
    pub integration: IntegrationMethod,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
            relaxation: DEFAULT_RELAXATION,
            max_dt: DEFAULT_MAX_DT,
            pause_threshold: DEFAULT_PAUSE_THRESHOLD,
            max_substep: DEFAULT_MAX_SUBSTEP,
            integration: IntegrationMethod::default(),
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum fixed-point iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Set the absolute convergence tolerance (in amperes).
    ///
    /// Higher tolerance = faster convergence but less accuracy.
    /// - 1e-6 (default): Very precise, may need more iterations
    /// - 1e-4: Good balance for interactive use
    /// - 1e-3: Fast, visible error on dim bulbs
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }

    /// Set the relative convergence tolerance.
    pub fn with_relative_tolerance(mut self, relative_tolerance: f64) -> Self {
        self.relative_tolerance = relative_tolerance.abs();
        self
    }

    /// Set the under-relaxation factor, clamped to (0, 1].
    pub fn with_relaxation(mut self, relaxation: f64) -> Self {
        self.relaxation = relaxation.clamp(f64::EPSILON, 1.0);
        self
    }

    /// Set the longest step integrated per call, at least [`MIN_STEP`].
    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = max_dt.max(MIN_STEP);
        self
    }

    /// Set the pause threshold above which steps are skipped.
    pub fn with_pause_threshold(mut self, pause_threshold: f64) -> Self {
        self.pause_threshold = pause_threshold;
        self
    }

    /// Set the longest substep, at least [`MIN_STEP`]. A frame is never
    /// split into more than [`MAX_SUBSTEPS`] parts.
    pub fn with_max_substep(mut self, max_substep: f64) -> Self {
        self.max_substep = max_substep.max(MIN_STEP);
        self
    }

    /// Set the integration rule for capacitors and inductors.
    pub fn with_integration(mut self, integration: IntegrationMethod) -> Self {
        self.integration = integration;
        self
    }

    fn driver(&self) -> FixedPointIteration {
        FixedPointIteration {
            max_iterations: self.max_iterations.max(1),
            tolerance: self.tolerance,
            relative_tolerance: self.relative_tolerance,
            relaxation: self.relaxation,
        }
    }
}

/// Summary of one island in a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandReport {
    /// Grounded vertex
    pub reference: VertexId,
    pub vertex_count: usize,
    pub element_count: usize,
    pub status: IslandStatus,
}

/// Result of one solve. Nothing in the circuit is changed by producing it.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    /// Time the sources were evaluated at
    pub time: f64,
    /// Step length used for companion models
    pub dt: f64,
    pub vertex_voltages: BTreeMap<VertexId, f64>,
    /// Current through each element, start → end
    pub element_currents: BTreeMap<ElementId, f64>,
    /// V(start) - V(end) for each element
    pub element_voltages: BTreeMap<ElementId, f64>,
    /// Resistance each real bulb settled at
    pub bulb_resistances: BTreeMap<ElementId, f64>,
    pub islands: Vec<IslandReport>,
    /// Elements left out for violating the graph invariants
    pub skipped: Vec<ElementId>,
    /// Elements whose readings are placeholders (skipped, or in a singular
    /// island). Their history is not advanced on commit.
    pub held: BTreeSet<ElementId>,
}

impl Solution {
    pub fn vertex_voltage(&self, id: VertexId) -> Option<f64> {
        self.vertex_voltages.get(&id).copied()
    }

    pub fn element_current(&self, id: ElementId) -> Option<f64> {
        self.element_currents.get(&id).copied()
    }

    pub fn element_voltage(&self, id: ElementId) -> Option<f64> {
        self.element_voltages.get(&id).copied()
    }

    /// True when `id` was not actually solved, so committing its readings
    /// must leave its history alone.
    pub fn is_held(&self, id: ElementId) -> bool {
        self.held.contains(&id)
    }

    /// Number of islands whose matrix was singular.
    pub fn singular_islands(&self) -> usize {
        self.islands
            .iter()
            .filter(|i| i.status == IslandStatus::Singular)
            .count()
    }

    /// Number of islands that hit the iteration cap.
    pub fn non_converged_islands(&self) -> usize {
        self.islands
            .iter()
            .filter(|i| matches!(i.status, IslandStatus::MaxIterationsExceeded { .. }))
            .count()
    }

    /// Recovered numeric failures and skipped elements, as errors.
    pub fn diagnostics(&self) -> Vec<CckError> {
        let mut out: Vec<CckError> = self
            .skipped
            .iter()
            .map(|id| CckError::topology(format!("element {} skipped", id)))
            .collect();
        for island in &self.islands {
            match island.status {
                IslandStatus::Singular => out.push(CckError::SingularSystem),
                IslandStatus::MaxIterationsExceeded {
                    iterations,
                    residual,
                } => out.push(CckError::non_convergence(iterations, residual)),
                _ => {}
            }
        }
        out
    }
}

/// Solve every island of `circuit` at the given stamping context.
pub fn solve_circuit(circuit: &Circuit, ctx: &StampContext, config: &SimulatorConfig) -> Solution {
    let mut solution = Solution {
        time: ctx.time,
        dt: ctx.dt,
        ..Solution::default()
    };

    // Elements violating the graph invariants are left out of the solve
    let mut skip = HashSet::new();
    for element in circuit.elements() {
        if let Err(e) = check_element(circuit, element) {
            log::warn!("skipping element: {}", e);
            skip.insert(element.id);
            solution.skipped.push(element.id);
            solution.held.insert(element.id);
        }
    }

    let driver = config.driver();
    for island in partition(circuit, &skip) {
        let result = driver.solve_island(circuit, &island, ctx);
        if result.status == IslandStatus::Singular {
            solution.held.extend(island.elements.iter().copied());
        }

        solution.vertex_voltages.extend(result.vertex_voltages);
        for reading in result.readings {
            solution.element_currents.insert(reading.id, reading.current);
            solution.element_voltages.insert(reading.id, reading.voltage_drop);
        }
        solution.bulb_resistances.extend(result.bulb_resistances);
        solution.islands.push(IslandReport {
            reference: island.reference,
            vertex_count: island.vertices.len(),
            element_count: island.elements.len(),
            status: result.status,
        });
    }

    // Open and skipped elements carry no current; open ones still see the
    // voltage between their terminals.
    for element in circuit.elements() {
        if solution.element_currents.contains_key(&element.id) {
            continue;
        }
        let drop = match (
            solution.vertex_voltages.get(&element.start()),
            solution.vertex_voltages.get(&element.end()),
        ) {
            (Some(a), Some(b)) if !skip.contains(&element.id) => a - b,
            _ => 0.0,
        };
        solution.element_currents.insert(element.id, 0.0);
        solution.element_voltages.insert(element.id, drop);
    }

    solution
}

/// Write a solution back into the circuit. Returns the fuses that tripped.
///
/// History (capacitor and inductor state, fuse timers) only advances for a
/// positive `dt`, and never for held elements; a static re-solve commits
/// readouts alone.
fn commit(circuit: &mut Circuit, solution: &Solution, dt: f64) -> Vec<ElementId> {
    for (id, &voltage) in &solution.vertex_voltages {
        if let Some(vertex) = circuit.vertex_mut(*id) {
            vertex.voltage = voltage;
        }
    }

    let mut tripped = Vec::new();
    for element in circuit.elements_mut() {
        let current = solution.element_current(element.id).unwrap_or(0.0);
        let voltage_drop = solution.element_voltage(element.id).unwrap_or(0.0);
        element.current = current;
        element.voltage_drop = voltage_drop;
        element.update_current_sense();
        let advance = dt > 0.0 && !solution.is_held(element.id);

        match &mut element.kind {
            ElementKind::LightBulb(bulb) => {
                if let Some(&r) = solution.bulb_resistances.get(&element.id) {
                    bulb.resistance = r;
                }
            }
            ElementKind::Capacitor(c) if advance => c.update_state(voltage_drop, current),
            ElementKind::Inductor(l) if advance => l.update_state(voltage_drop, current),
            ElementKind::Fuse(f) if advance => {
                if f.observe(current, dt) {
                    log::info!(
                        "fuse '{}' tripped at {:.3} A (rating {:.3} A)",
                        element.name,
                        current.abs(),
                        f.current_rating
                    );
                    tripped.push(element.id);
                }
            }
            _ => {}
        }
    }
    tripped
}

/// What a call to [`Simulator::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The clock advanced by `dt` in `substeps` equal parts
    Stepped { substeps: usize, dt: f64 },
    /// The step was rejected and nothing changed
    Skipped { requested_dt: f64 },
}

/// Report for one call to [`Simulator::step`].
#[derive(Debug)]
pub struct StepReport {
    pub outcome: StepOutcome,
    /// Clock after the step
    pub time: f64,
    /// Fuses that tripped during the step
    pub tripped_fuses: Vec<ElementId>,
    /// Recovered failures from the final substep
    pub diagnostics: Vec<CckError>,
    /// Final substep's solution, if the step ran
    pub solution: Option<Solution>,
}

impl StepReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, StepOutcome::Skipped { .. })
    }
}

/// The main circuit simulator.
#[derive(Debug)]
pub struct Simulator {
    /// The circuit being simulated
    circuit: Circuit,
    config: SimulatorConfig,
    /// Simulation clock (seconds)
    time: f64,
}

impl Simulator {
    /// Create a new simulator for the given circuit with default configuration.
    pub fn new(circuit: Circuit) -> Self {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    /// Create a new simulator for the given circuit with custom configuration.
    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Self {
        Self {
            circuit,
            config,
            time: 0.0,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Mutable access for topology and parameter edits between steps.
    pub fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }

    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SimulatorConfig) {
        self.config = config;
    }

    /// Simulation clock in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    fn context(&self, dt: f64) -> StampContext {
        StampContext {
            dt,
            time: self.time + dt,
            integration: self.config.integration,
        }
    }

    /// Compute the state one step of `dt` ahead without committing it.
    ///
    /// `dt` is clamped to `[0, max_dt]`; sources are evaluated at
    /// `time + dt`. Calling this twice in a row gives identical results.
    pub fn solve(&self, dt: f64) -> Solution {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_dt.max(MIN_STEP))
        } else {
            0.0
        };
        solve_circuit(&self.circuit, &self.context(dt), &self.config)
    }

    /// Re-solve at the present instant and commit readouts, leaving the
    /// clock and all history untouched. Use after an edit while paused.
    pub fn refresh(&mut self) -> Solution {
        let solution = solve_circuit(&self.circuit, &self.context(0.0), &self.config);
        commit(&mut self.circuit, &solution, 0.0);
        solution
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) -> StepReport {
        if !dt.is_finite() || dt <= 0.0 || dt > self.config.pause_threshold {
            if dt != 0.0 {
                log::warn!("skipping step of {} s", dt);
            }
            return StepReport {
                outcome: StepOutcome::Skipped { requested_dt: dt },
                time: self.time,
                tripped_fuses: Vec::new(),
                diagnostics: Vec::new(),
                solution: None,
            };
        }

        // Same floors as the builder; the fields are public
        let dt = dt.min(self.config.max_dt.max(MIN_STEP));
        // Tolerate rounding so 0.1 s at 1/120 s is 12 substeps, not 13
        let ratio = dt / self.config.max_substep.max(MIN_STEP);
        let substeps = ((ratio - 1e-9).ceil() as usize).clamp(1, MAX_SUBSTEPS);
        let h = dt / substeps as f64;

        let mut tripped_fuses = Vec::new();
        let mut last = None;
        for _ in 0..substeps {
            let solution = solve_circuit(&self.circuit, &self.context(h), &self.config);
            tripped_fuses.extend(commit(&mut self.circuit, &solution, h));
            self.time += h;
            last = Some(solution);
        }

        let diagnostics = last.as_ref().map(Solution::diagnostics).unwrap_or_default();
        StepReport {
            outcome: StepOutcome::Stepped { substeps, dt },
            time: self.time,
            tripped_fuses,
            diagnostics,
            solution: last,
        }
    }

    /// Return to time zero with every dynamic element powered off.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.circuit.reset_dynamics();
    }

    /// Committed voltage of a named vertex.
    pub fn vertex_voltage(&self, name: &str) -> Option<f64> {
        let id = self.circuit.find_vertex(name)?;
        self.circuit.vertex(id).map(|v| v.voltage)
    }

    /// Committed current of a named element.
    pub fn element_current(&self, name: &str) -> Option<f64> {
        let id = self.circuit.find_element(name)?;
        self.circuit.element(id).map(|e| e.current)
    }

    /// Open or close a named switch.
    pub fn set_switch(&mut self, name: &str, closed: bool) -> Result<()> {
        let id = self
            .circuit
            .find_element(name)
            .ok_or_else(|| CckError::unknown_name(name))?;
        let element = self
            .circuit
            .element_mut(id)
            .ok_or(CckError::ElementNotFound(id))?;
        match &mut element.kind {
            ElementKind::Switch(s) => {
                s.set_state(closed);
                Ok(())
            }
            other => Err(CckError::InvalidParameter {
                element: name.to_string(),
                param: "state".to_string(),
                message: format!("{} is not a switch", other.type_name()),
            }),
        }
    }

    /// Replace a named fuse's blown element.
    pub fn reset_fuse(&mut self, name: &str) -> Result<()> {
        let id = self
            .circuit
            .find_element(name)
            .ok_or_else(|| CckError::unknown_name(name))?;
        let element = self
            .circuit
            .element_mut(id)
            .ok_or(CckError::ElementNotFound(id))?;
        match &mut element.kind {
            ElementKind::Fuse(f) => {
                f.reset();
                Ok(())
            }
            other => Err(CckError::InvalidParameter {
                element: name.to_string(),
                param: "tripped".to_string(),
                message: format!("{} is not a fuse", other.type_name()),
            }),
        }
    }
}
