//! Linear passive elements: Wire, Resistor, Capacitor, Inductor.

use super::IntegrationMethod;
use crate::{MIN_CONDUCTANCE, MIN_RESISTANCE};

/// Smallest capacitance accepted before stamping (1 pF).
pub const MIN_CAPACITANCE: f64 = 1e-12;

/// Smallest inductance accepted before stamping (1 nH).
pub const MIN_INDUCTANCE: f64 = 1e-9;

/// A wire. Stamped as a near-zero resistance.
#[derive(Debug, Clone)]
pub struct Wire {
    pub resistance: f64,
}

impl Wire {
    pub fn new() -> Self {
        Self {
            resistance: MIN_RESISTANCE,
        }
    }

    /// A wire with an explicit (e.g. resistivity-derived) resistance.
    pub fn with_resistance(resistance: f64) -> Self {
        Self {
            resistance: resistance.max(MIN_RESISTANCE),
        }
    }
}

impl Default for Wire {
    fn default() -> Self {
        Self::new()
    }
}

/// A resistor.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub resistance: f64,
}

impl Resistor {
    pub fn new(resistance: f64) -> Self {
        Self { resistance }
    }

    /// Set a new resistance (e.g. from a slider edit).
    pub fn set_resistance(&mut self, resistance: f64) {
        self.resistance = resistance;
    }
}

/// A capacitor.
///
/// In discrete-time simulation a capacitor is replaced by a Norton companion
/// model: a conductance `G` in parallel with a history current source, so
/// that the element current is `i = G * v + I_hist`.
///
/// Backward Euler:
///   G = C/dt,  I_hist = -G * v_prev
///
/// Trapezoidal:
///   G = 2C/dt, I_hist = -(G * v_prev + i_prev)
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub capacitance: f64,

    // State for discrete-time model
    /// Voltage across the capacitor after the previous committed step
    pub v_prev: f64,
    /// Current through the capacitor after the previous committed step
    pub i_prev: f64,
}

impl Capacitor {
    /// Create a new, uncharged capacitor.
    pub fn new(capacitance: f64) -> Self {
        Self {
            capacitance,
            v_prev: 0.0,
            i_prev: 0.0,
        }
    }

    fn effective_capacitance(&self) -> f64 {
        self.capacitance.max(MIN_CAPACITANCE)
    }

    /// Companion model `(G, I_hist)` for a step of length `dt`.
    ///
    /// With `dt <= 0` the capacitor holds its voltage through a stiff
    /// conductance, which is the backward Euler limit as `dt -> 0`.
    pub fn companion(&self, dt: f64, method: IntegrationMethod) -> (f64, f64) {
        if dt <= 0.0 {
            let g = 1.0 / MIN_RESISTANCE;
            return (g, -g * self.v_prev);
        }
        let c = self.effective_capacitance();
        match method {
            IntegrationMethod::BackwardEuler => {
                let g = c / dt;
                (g, -g * self.v_prev)
            }
            IntegrationMethod::Trapezoidal => {
                let g = 2.0 * c / dt;
                (g, -(g * self.v_prev + self.i_prev))
            }
        }
    }

    /// Update the history after a committed step.
    pub fn update_state(&mut self, v_new: f64, i_new: f64) {
        self.v_prev = v_new;
        self.i_prev = i_new;
    }

    /// Discharge the capacitor.
    pub fn reset(&mut self) {
        self.v_prev = 0.0;
        self.i_prev = 0.0;
    }

    /// Energy stored at the last committed voltage.
    pub fn stored_energy(&self) -> f64 {
        0.5 * self.capacitance * self.v_prev * self.v_prev
    }
}

/// An inductor.
///
/// The dual of the capacitor companion model:
///
/// Backward Euler:
///   G = dt/L,     I_hist = i_prev
///
/// Trapezoidal:
///   G = dt/(2L),  I_hist = i_prev + G * v_prev
#[derive(Debug, Clone)]
pub struct Inductor {
    pub inductance: f64,

    // State for discrete-time model
    /// Current through the inductor after the previous committed step
    pub i_prev: f64,
    /// Voltage across the inductor after the previous committed step
    pub v_prev: f64,
}

impl Inductor {
    /// Create a new inductor carrying no current.
    pub fn new(inductance: f64) -> Self {
        Self {
            inductance,
            i_prev: 0.0,
            v_prev: 0.0,
        }
    }

    fn effective_inductance(&self) -> f64 {
        self.inductance.max(MIN_INDUCTANCE)
    }

    /// Companion model `(G, I_hist)` for a step of length `dt`.
    ///
    /// With `dt <= 0` the inductor holds its current.
    pub fn companion(&self, dt: f64, method: IntegrationMethod) -> (f64, f64) {
        if dt <= 0.0 {
            return (MIN_CONDUCTANCE, self.i_prev);
        }
        let l = self.effective_inductance();
        match method {
            IntegrationMethod::BackwardEuler => (dt / l, self.i_prev),
            IntegrationMethod::Trapezoidal => {
                let g = dt / (2.0 * l);
                (g, self.i_prev + g * self.v_prev)
            }
        }
    }

    /// Update the history after a committed step.
    pub fn update_state(&mut self, v_new: f64, i_new: f64) {
        self.v_prev = v_new;
        self.i_prev = i_new;
    }

    pub fn reset(&mut self) {
        self.v_prev = 0.0;
        self.i_prev = 0.0;
    }

    /// Energy stored at the last committed current.
    pub fn stored_energy(&self) -> f64 {
        0.5 * self.inductance * self.i_prev * self.i_prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wire_never_below_floor() {
        let w = Wire::with_resistance(0.0);
        assert_eq!(w.resistance, MIN_RESISTANCE);
    }

    #[test]
    fn test_capacitor_backward_euler_companion() {
        let mut c = Capacitor::new(0.1);
        let dt = 0.01;
        let (g, i_hist) = c.companion(dt, IntegrationMethod::BackwardEuler);

        // G_eq = C/dt = 10 S
        assert_relative_eq!(g, 10.0);
        assert_eq!(i_hist, 0.0);

        c.update_state(2.0, 0.5);
        let (g, i_hist) = c.companion(dt, IntegrationMethod::BackwardEuler);
        assert_relative_eq!(i_hist, -g * 2.0);
    }

    #[test]
    fn test_capacitor_trapezoidal_companion() {
        let mut c = Capacitor::new(1e-6);
        let dt = 1e-3;
        c.update_state(1.0, 0.25);
        let (g, i_hist) = c.companion(dt, IntegrationMethod::Trapezoidal);
        assert_relative_eq!(g, 2e-3);
        assert_relative_eq!(i_hist, -(2e-3 + 0.25));
    }

    #[test]
    fn test_capacitor_holds_voltage_without_elapsed_time() {
        let mut c = Capacitor::new(1e-3);
        c.update_state(5.0, 0.0);
        let (g, i_hist) = c.companion(0.0, IntegrationMethod::BackwardEuler);
        // Zero current exactly when the voltage is unchanged
        assert_relative_eq!(g * 5.0 + i_hist, 0.0);
    }

    #[test]
    fn test_inductor_companion_models() {
        let mut l = Inductor::new(2.0);
        l.update_state(4.0, 1.5);

        let (g, i_hist) = l.companion(0.1, IntegrationMethod::BackwardEuler);
        assert_relative_eq!(g, 0.05);
        assert_relative_eq!(i_hist, 1.5);

        let (g, i_hist) = l.companion(0.1, IntegrationMethod::Trapezoidal);
        assert_relative_eq!(g, 0.025);
        assert_relative_eq!(i_hist, 1.5 + 0.025 * 4.0);
    }

    #[test]
    fn test_stored_energy() {
        let mut c = Capacitor::new(2.0);
        c.update_state(3.0, 0.0);
        assert_relative_eq!(c.stored_energy(), 9.0);

        let mut l = Inductor::new(4.0);
        l.update_state(0.0, 0.5);
        assert_relative_eq!(l.stored_energy(), 0.5);
    }
}
