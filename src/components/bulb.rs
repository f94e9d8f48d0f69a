//! Light bulb model.
//!
//! An ideal bulb is a fixed resistor. A real bulb is non-ohmic: its filament
//! heats up with dissipated power, so its resistance is a function of the
//! power flowing through it:
//!   R = f(P),  P = I² R
//!
//! Since R depends on I and I depends on R, the solver iterates a real bulb
//! to a fixed point (see `solver::nonlinear`). The resistance-vs-power
//! relationship is supplied by a [`ResistanceCurve`], so calibrations can be
//! swapped without touching the solver.

use std::fmt;
use std::sync::Arc;

use crate::{MAX_RESISTANCE, MIN_RESISTANCE};

/// Default bulb resistance in ohms.
pub const DEFAULT_BULB_RESISTANCE: f64 = 10.0;

/// Default filament heating coefficient (per watt).
pub const DEFAULT_HEATING_COEFFICIENT: f64 = 0.1;

/// Maps dissipated power (W) to filament resistance (Ω).
pub trait ResistanceCurve: fmt::Debug + Send + Sync {
    /// Resistance at the given dissipated power.
    fn resistance(&self, power: f64) -> f64;

    /// Resistance with no power flowing.
    fn cold_resistance(&self) -> f64 {
        self.resistance(0.0)
    }
}

/// Filament curve that grows linearly with power:
///   R(P) = R_cold * (1 + k * |P|)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPowerCurve {
    pub cold_resistance: f64,
    /// Heating coefficient `k` in 1/W
    pub coefficient: f64,
}

impl LinearPowerCurve {
    pub fn new(cold_resistance: f64, coefficient: f64) -> Self {
        Self {
            cold_resistance,
            coefficient: coefficient.max(0.0),
        }
    }
}

impl Default for LinearPowerCurve {
    fn default() -> Self {
        Self::new(DEFAULT_BULB_RESISTANCE, DEFAULT_HEATING_COEFFICIENT)
    }
}

impl ResistanceCurve for LinearPowerCurve {
    fn resistance(&self, power: f64) -> f64 {
        self.cold_resistance * (1.0 + self.coefficient * power.abs())
    }
}

/// Electrical behaviour of a bulb.
#[derive(Debug, Clone)]
pub enum BulbModel {
    /// Fixed resistance
    Ideal,
    /// Resistance follows a power curve
    Real(Arc<dyn ResistanceCurve>),
}

/// A light bulb.
#[derive(Debug, Clone)]
pub struct LightBulb {
    /// Present resistance. For a real bulb this is the last converged value
    /// and seeds the next non-linear solve.
    pub resistance: f64,
    pub model: BulbModel,
}

impl LightBulb {
    /// Create an ideal (ohmic) bulb.
    pub fn ideal(resistance: f64) -> Self {
        Self {
            resistance,
            model: BulbModel::Ideal,
        }
    }

    /// Create a real bulb following `curve`, starting cold.
    pub fn real(curve: Arc<dyn ResistanceCurve>) -> Self {
        Self {
            resistance: curve.cold_resistance(),
            model: BulbModel::Real(curve),
        }
    }

    /// Create a real bulb with the default linear filament curve.
    pub fn real_linear(cold_resistance: f64, coefficient: f64) -> Self {
        Self::real(Arc::new(LinearPowerCurve::new(cold_resistance, coefficient)))
    }

    pub fn is_real(&self) -> bool {
        matches!(self.model, BulbModel::Real(_))
    }

    /// Resistance the bulb settles at when dissipating `power`, clamped to
    /// solver-safe bounds.
    pub fn resistance_at_power(&self, power: f64) -> f64 {
        let r = match &self.model {
            BulbModel::Ideal => self.resistance,
            BulbModel::Real(curve) => curve.resistance(power),
        };
        r.clamp(MIN_RESISTANCE, MAX_RESISTANCE)
    }

    /// Power dissipated when `current` flows through `resistance`.
    pub fn power(current: f64, resistance: f64) -> f64 {
        current * current * resistance
    }

    /// Return a real bulb to its cold resistance.
    pub fn cool_down(&mut self) {
        if let BulbModel::Real(curve) = &self.model {
            self.resistance = curve.cold_resistance();
        }
    }
}
