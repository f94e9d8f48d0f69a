//! Voltage sources: DC battery and AC voltage source.
//!
//! Both raise the potential from the start vertex (negative terminal) to the
//! end vertex (positive terminal). A source whose internal resistance is at
//! or below [`MIN_RESISTANCE`] is ideal and needs an extra branch-current
//! row/column in the MNA matrix. Otherwise it is stamped as its Norton
//! equivalent and needs no extra unknown.

use std::f64::consts::PI;

use super::Stamp;
use crate::MIN_RESISTANCE;

fn source_stamp(voltage: f64, internal_resistance: f64) -> Stamp {
    if internal_resistance <= MIN_RESISTANCE {
        Stamp::VoltageSource(voltage)
    } else {
        let g = 1.0 / internal_resistance;
        Stamp::Norton {
            conductance: g,
            current: g * voltage,
        }
    }
}

/// A DC battery.
#[derive(Debug, Clone)]
pub struct Battery {
    pub voltage: f64,
    /// Series internal resistance; zero for an ideal battery
    pub internal_resistance: f64,
}

impl Battery {
    /// Create an ideal battery.
    pub fn new(voltage: f64) -> Self {
        Self {
            voltage,
            internal_resistance: 0.0,
        }
    }

    /// Create a battery with a series internal resistance.
    pub fn with_internal_resistance(voltage: f64, internal_resistance: f64) -> Self {
        Self {
            voltage,
            internal_resistance: internal_resistance.max(0.0),
        }
    }

    pub fn is_ideal(&self) -> bool {
        self.internal_resistance <= MIN_RESISTANCE
    }

    pub fn stamp(&self) -> Stamp {
        source_stamp(self.voltage, self.internal_resistance)
    }
}

/// A sinusoidal AC voltage source: `V(t) = amplitude * sin(2π f t + phase)`.
#[derive(Debug, Clone)]
pub struct AcVoltageSource {
    /// Peak voltage
    pub amplitude: f64,
    /// Frequency in Hz
    pub frequency: f64,
    /// Phase offset in radians
    pub phase: f64,
    pub internal_resistance: f64,
}

impl AcVoltageSource {
    pub fn new(amplitude: f64, frequency: f64, phase: f64) -> Self {
        Self {
            amplitude,
            frequency,
            phase,
            internal_resistance: 0.0,
        }
    }

    /// Set the phase from degrees, as entered in a UI.
    pub fn with_phase_degrees(mut self, degrees: f64) -> Self {
        self.phase = degrees.to_radians();
        self
    }

    pub fn with_internal_resistance(mut self, internal_resistance: f64) -> Self {
        self.internal_resistance = internal_resistance.max(0.0);
        self
    }

    /// Instantaneous voltage at simulation time `t` (seconds).
    pub fn voltage_at(&self, t: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency * t + self.phase).sin()
    }

    pub fn is_ideal(&self) -> bool {
        self.internal_resistance <= MIN_RESISTANCE
    }

    pub fn stamp(&self, t: f64) -> Stamp {
        source_stamp(self.voltage_at(t), self.internal_resistance)
    }
}
