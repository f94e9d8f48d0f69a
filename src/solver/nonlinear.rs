//! Fixed-point iteration for non-ohmic elements.
//!
//! A real bulb's resistance depends on its power, which depends on its
//! current, which depends on its resistance. Each island is driven through
//!
//! ```text
//! Stamping -> Solving -> Converged
//!                     -> Diverged (max iterations exceeded)
//! ```
//!
//! by successive substitution: stamp the present resistances, solve, move
//! each bulb's resistance toward its curve value for the new power, and
//! repeat until the bulb currents stop changing. Under-relaxation keeps the
//! iteration from oscillating when the filament curve is steep.
//!
//! Islands without non-ohmic elements are linear and solved once.

use crate::circuit::{Circuit, ElementId, VertexId};
use crate::components::{ElementKind, LightBulb, StampContext};
use crate::error::CckError;
use crate::{DISPLAY_EPSILON, MIN_RESISTANCE};

use super::island::{Island, IslandSystem};
use super::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_RELATIVE_TOLERANCE, DEFAULT_RELAXATION, DEFAULT_TOLERANCE,
};

/// How an island's solve ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IslandStatus {
    /// Nothing to solve (single vertex, no conducting elements)
    Trivial,
    /// Linear island solved directly
    Linear,
    /// Non-linear iteration settled
    Converged { iterations: usize },
    /// Iteration cap hit; the last iterate was accepted
    MaxIterationsExceeded { iterations: usize, residual: f64 },
    /// Singular matrix; the island was zeroed
    Singular,
}

impl IslandStatus {
    /// Whether the island's values are trustworthy.
    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            IslandStatus::Trivial | IslandStatus::Linear | IslandStatus::Converged { .. }
        )
    }
}

/// Solved values for one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementReading {
    pub id: ElementId,
    pub current: f64,
    pub voltage_drop: f64,
}

/// Everything produced by solving one island.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandSolution {
    pub reference: VertexId,
    pub status: IslandStatus,
    pub vertex_voltages: Vec<(VertexId, f64)>,
    pub readings: Vec<ElementReading>,
    /// Resistances the real bulbs ended at
    pub bulb_resistances: Vec<(ElementId, f64)>,
}

/// Snap floating-point noise to zero for display.
pub fn snap(value: f64) -> f64 {
    if value.abs() < DISPLAY_EPSILON {
        0.0
    } else {
        value
    }
}

/// Successive-substitution driver.
#[derive(Debug, Clone)]
pub struct FixedPointIteration {
    /// Maximum iterations per island solve
    pub max_iterations: usize,
    /// Absolute current tolerance (A)
    pub tolerance: f64,
    /// Relative current/resistance tolerance
    pub relative_tolerance: f64,
    /// Fraction of the step toward the curve taken each iteration (0, 1]
    pub relaxation: f64,
}

impl Default for FixedPointIteration {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedPointIteration {
    /// Create a driver with default settings.
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
            relaxation: DEFAULT_RELAXATION,
        }
    }

    /// Create a driver with a custom cap and tolerance.
    pub fn with_config(max_iterations: usize, tolerance: f64, relative_tolerance: f64) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            tolerance,
            relative_tolerance,
            relaxation: DEFAULT_RELAXATION,
        }
    }

    /// Current change within the absolute (amperes) or relative tolerance.
    fn current_settled(&self, old: f64, new: f64) -> bool {
        let diff = (new - old).abs();
        diff <= self.tolerance || diff <= self.relative_tolerance * new.abs()
    }

    /// Resistance change within the relative tolerance. The only absolute
    /// floor is the solver's resistance resolution.
    fn resistance_settled(&self, old: f64, new: f64) -> bool {
        let diff = (new - old).abs();
        diff <= MIN_RESISTANCE || diff <= self.relative_tolerance * new.abs()
    }

    /// Solve one island. Never fails: singular systems and non-convergence
    /// are reported through [`IslandStatus`].
    pub fn solve_island(&self, circuit: &Circuit, island: &Island, ctx: &StampContext) -> IslandSolution {
        if island.is_trivial() {
            return IslandSolution {
                reference: island.reference,
                status: IslandStatus::Trivial,
                vertex_voltages: island.vertices.iter().map(|&v| (v, 0.0)).collect(),
                readings: Vec::new(),
                bulb_resistances: Vec::new(),
            };
        }

        let mut system = IslandSystem::build(circuit, island, ctx);

        // Real bulbs in this island with their committed state as the seed
        let bulbs: Vec<(ElementId, &LightBulb, f64)> = island
            .elements
            .iter()
            .filter_map(|&id| circuit.element(id))
            .filter_map(|e| match &e.kind {
                ElementKind::LightBulb(b) if b.is_real() => Some((e.id, b, e.current)),
                _ => None,
            })
            .collect();

        if bulbs.is_empty() {
            return match system.solve() {
                Ok(()) => Self::collect(island, &system, IslandStatus::Linear, Vec::new()),
                Err(e) => Self::singular(island, e),
            };
        }

        let mut resistances: Vec<f64> = bulbs
            .iter()
            .map(|(_, b, _)| crate::components::clamp_resistance(b.resistance))
            .collect();
        let mut currents: Vec<f64> = bulbs.iter().map(|(_, _, i)| *i).collect();
        let mut residual = f64::INFINITY;

        for iteration in 1..=self.max_iterations {
            // Stamping
            for ((id, _, _), &r) in bulbs.iter().zip(&resistances) {
                system.set_resistance(*id, r);
            }

            // Solving
            if let Err(e) = system.solve() {
                return Self::singular(island, e);
            }

            let mut converged = true;
            let mut targets = Vec::with_capacity(bulbs.len());
            residual = 0.0;
            for (k, (id, bulb, _)) in bulbs.iter().enumerate() {
                let current = system.element_current(*id);
                let target = bulb.resistance_at_power(LightBulb::power(current, resistances[k]));

                residual = residual.max((current - currents[k]).abs());
                if !self.current_settled(currents[k], current)
                    || !self.resistance_settled(resistances[k], target)
                {
                    converged = false;
                }

                currents[k] = current;
                targets.push(target);
            }

            if converged {
                log::debug!(
                    "island at {} converged in {} iterations",
                    island.reference,
                    iteration
                );
                // Report the resistances the accepted solve was stamped with
                let settled: Vec<(ElementId, f64)> = bulbs
                    .iter()
                    .map(|(id, _, _)| *id)
                    .zip(resistances.iter().copied())
                    .collect();
                return Self::collect(
                    island,
                    &system,
                    IslandStatus::Converged {
                        iterations: iteration,
                    },
                    settled,
                );
            }

            for (r, target) in resistances.iter_mut().zip(targets) {
                *r += self.relaxation * (target - *r);
            }
        }

        let diagnostic = CckError::non_convergence(self.max_iterations, residual);
        log::warn!("island at {}: {}", island.reference, diagnostic);

        let last: Vec<(ElementId, f64)> = bulbs.iter().map(|(id, _, _)| *id).zip(resistances).collect();
        Self::collect(
            island,
            &system,
            IslandStatus::MaxIterationsExceeded {
                iterations: self.max_iterations,
                residual,
            },
            last,
        )
    }

    fn collect(
        island: &Island,
        system: &IslandSystem,
        status: IslandStatus,
        bulb_resistances: Vec<(ElementId, f64)>,
    ) -> IslandSolution {
        IslandSolution {
            reference: island.reference,
            status,
            vertex_voltages: island
                .vertices
                .iter()
                .map(|&v| (v, snap(system.vertex_voltage(v))))
                .collect(),
            readings: system
                .elements()
                .iter()
                .map(|el| ElementReading {
                    id: el.id,
                    current: snap(system.current(el)),
                    voltage_drop: snap(system.voltage_drop(el)),
                })
                .collect(),
            bulb_resistances,
        }
    }

    fn singular(island: &Island, error: CckError) -> IslandSolution {
        log::warn!(
            "island at {} ({} vertices): {}; assigning 0 V",
            island.reference,
            island.vertices.len(),
            error
        );
        IslandSolution {
            reference: island.reference,
            status: IslandStatus::Singular,
            vertex_voltages: island.vertices.iter().map(|&v| (v, 0.0)).collect(),
            readings: island
                .elements
                .iter()
                .map(|&id| ElementReading {
                    id,
                    current: 0.0,
                    voltage_drop: 0.0,
                })
                .collect(),
            bulb_resistances: Vec::new(),
        }
    }
}
