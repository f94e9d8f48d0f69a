//! Circuit element models.
//!
//! This module provides models for all supported circuit elements:
//! - Linear: Wire, Resistor, Capacitor, Inductor
//! - Sources: Battery, AC voltage source
//! - Non-ohmic: Light bulb (real or ideal)
//! - Controls: Switch, Fuse, Series ammeter
//!
//! Every element reduces, for one solve, to a [`Stamp`]: the contribution it
//! makes to the MNA system. The solver dispatches on the stamp, never on the
//! element type.

mod bulb;
mod controls;
mod linear;
mod sources;

pub use bulb::{
    BulbModel, LightBulb, LinearPowerCurve, ResistanceCurve, DEFAULT_BULB_RESISTANCE,
    DEFAULT_HEATING_COEFFICIENT,
};
pub use controls::{Fuse, SeriesAmmeter, Switch};
pub use linear::{Capacitor, Inductor, Resistor, Wire, MIN_CAPACITANCE, MIN_INDUCTANCE};
pub use sources::{AcVoltageSource, Battery};

use crate::circuit::{CurrentSense, ElementId, VertexId};
use crate::dsl::{ElementDef, ElementType};
use crate::error::{CckError, Result};
use crate::{DISPLAY_EPSILON, MAX_RESISTANCE, MIN_RESISTANCE};

/// Clamp a resistance into solver-safe bounds.
pub fn clamp_resistance(resistance: f64) -> f64 {
    if resistance.is_nan() {
        return MAX_RESISTANCE;
    }
    resistance.clamp(MIN_RESISTANCE, MAX_RESISTANCE)
}

/// Numerical integration rule for companion models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationMethod {
    /// First order, L-stable. Never rings.
    #[default]
    BackwardEuler,
    /// Second order, A-stable.
    Trapezoidal,
}

/// Everything an element needs to know about the solve it is stamped into.
#[derive(Debug, Clone, Copy)]
pub struct StampContext {
    /// Step length in seconds (0 for a static re-solve)
    pub dt: f64,
    /// Time at which sources are evaluated
    pub time: f64,
    pub integration: IntegrationMethod,
}

/// An element's contribution to the MNA system for one solve.
///
/// Current is positive when flowing through the element from its start
/// vertex to its end vertex; `v` below is `V(start) - V(end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stamp {
    /// Contributes nothing (open switch, tripped fuse)
    Open,
    /// `i = G * v`
    Conductance(f64),
    /// `i = G * v + I`. Companion models and resistive sources.
    Norton { conductance: f64, current: f64 },
    /// Ideal source: `V(end) - V(start) = E`, with an extra branch unknown
    VoltageSource(f64),
}

impl Stamp {
    /// A resistor stamp with the resistance clamped to safe bounds.
    pub fn resistor(resistance: f64) -> Self {
        Stamp::Conductance(1.0 / clamp_resistance(resistance))
    }

    /// Whether this stamp needs a branch-current unknown.
    pub fn needs_branch(&self) -> bool {
        matches!(self, Stamp::VoltageSource(_))
    }

    /// Whether current can flow through this stamp.
    pub fn conducts(&self) -> bool {
        !matches!(self, Stamp::Open)
    }

    /// Recover the element current from the solved voltage drop `v` and,
    /// for ideal sources, the branch unknown (current entering the positive
    /// terminal from outside).
    pub fn current(&self, v: f64, branch_current: Option<f64>) -> f64 {
        match *self {
            Stamp::Open => 0.0,
            Stamp::Conductance(g) => g * v,
            Stamp::Norton {
                conductance,
                current,
            } => conductance * v + current,
            Stamp::VoltageSource(_) => -branch_current.unwrap_or(0.0),
        }
    }
}

/// The closed set of element kinds, each with its own parameters.
#[derive(Debug, Clone)]
pub enum ElementKind {
    Wire(Wire),
    Resistor(Resistor),
    Battery(Battery),
    AcVoltage(AcVoltageSource),
    LightBulb(LightBulb),
    Capacitor(Capacitor),
    Inductor(Inductor),
    Switch(Switch),
    Fuse(Fuse),
    SeriesAmmeter(SeriesAmmeter),
}

impl ElementKind {
    /// Build an element kind from a netlist definition.
    pub fn from_def(def: &ElementDef) -> Result<Self> {
        let require_value = |what: &str| {
            def.value.ok_or_else(|| {
                CckError::invalid_element(&def.name, def.line, format!("{} requires a value", what))
            })
        };
        let positive = |param: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(value)
            } else {
                Err(CckError::InvalidParameter {
                    element: def.name.clone(),
                    param: param.to_string(),
                    message: format!("must be positive, got {}", value),
                })
            }
        };

        match def.element_type {
            ElementType::Wire => Ok(match def.value {
                Some(r) => ElementKind::Wire(Wire::with_resistance(r)),
                None => ElementKind::Wire(Wire::new()),
            }),

            ElementType::Resistor => {
                let r = positive("resistance", require_value("resistor")?)?;
                Ok(ElementKind::Resistor(Resistor::new(r)))
            }

            ElementType::Battery => {
                let v = require_value("battery")?;
                let r = def.params.get("r").copied().unwrap_or(0.0);
                Ok(ElementKind::Battery(Battery::with_internal_resistance(v, r)))
            }

            ElementType::AcVoltage => {
                let amplitude = require_value("AC source")?;
                let frequency = positive("freq", def.params.get("freq").copied().unwrap_or(1.0))?;
                let phase = def.params.get("phase").copied().unwrap_or(0.0);
                let r = def.params.get("r").copied().unwrap_or(0.0);
                Ok(ElementKind::AcVoltage(
                    AcVoltageSource::new(amplitude, frequency, 0.0)
                        .with_phase_degrees(phase)
                        .with_internal_resistance(r),
                ))
            }

            ElementType::LightBulb => {
                let r = positive("resistance", def.value.unwrap_or(DEFAULT_BULB_RESISTANCE))?;
                if def.has_flag("real") {
                    let k = def.params.get("k").copied().unwrap_or(DEFAULT_HEATING_COEFFICIENT);
                    Ok(ElementKind::LightBulb(LightBulb::real_linear(r, k)))
                } else {
                    Ok(ElementKind::LightBulb(LightBulb::ideal(r)))
                }
            }

            ElementType::Capacitor => {
                let c = positive("capacitance", require_value("capacitor")?)?;
                Ok(ElementKind::Capacitor(Capacitor::new(c)))
            }

            ElementType::Inductor => {
                let l = positive("inductance", require_value("inductor")?)?;
                Ok(ElementKind::Inductor(Inductor::new(l)))
            }

            ElementType::Switch => {
                let closed = if def.has_flag("open") {
                    false
                } else if def.has_flag("closed") {
                    true
                } else {
                    def.params.get("state").map(|v| *v > 0.5).unwrap_or(true)
                };
                Ok(ElementKind::Switch(Switch::new(closed)))
            }

            ElementType::Fuse => {
                let rating = positive("rating", require_value("fuse")?)?;
                let mut fuse = Fuse::new(rating);
                if let Some(&delay) = def.params.get("delay") {
                    fuse = fuse.with_trip_delay(delay);
                }
                Ok(ElementKind::Fuse(fuse))
            }

            ElementType::SeriesAmmeter => Ok(ElementKind::SeriesAmmeter(SeriesAmmeter::new())),
        }
    }

    /// Short human-readable type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Wire(_) => "wire",
            ElementKind::Resistor(_) => "resistor",
            ElementKind::Battery(_) => "battery",
            ElementKind::AcVoltage(_) => "ac-source",
            ElementKind::LightBulb(_) => "light-bulb",
            ElementKind::Capacitor(_) => "capacitor",
            ElementKind::Inductor(_) => "inductor",
            ElementKind::Switch(_) => "switch",
            ElementKind::Fuse(_) => "fuse",
            ElementKind::SeriesAmmeter(_) => "ammeter",
        }
    }
}

/// A circuit element placed between two vertices.
#[derive(Debug, Clone)]
pub struct CircuitElement {
    pub id: ElementId,
    pub name: String,
    /// [start, end]
    pub vertices: [VertexId; 2],
    pub kind: ElementKind,

    /// Current through the element, start → end (solved output)
    pub current: f64,
    /// V(start) - V(end) (solved output)
    pub voltage_drop: f64,
    pub current_sense: CurrentSense,
}

impl CircuitElement {
    pub fn new(id: ElementId, name: String, vertices: [VertexId; 2], kind: ElementKind) -> Self {
        Self {
            id,
            name,
            vertices,
            kind,
            current: 0.0,
            voltage_drop: 0.0,
            current_sense: CurrentSense::Unspecified,
        }
    }

    pub fn start(&self) -> VertexId {
        self.vertices[0]
    }

    pub fn end(&self) -> VertexId {
        self.vertices[1]
    }

    /// Whether `vertex` is one of this element's terminals.
    pub fn touches(&self, vertex: VertexId) -> bool {
        self.vertices[0] == vertex || self.vertices[1] == vertex
    }

    /// The terminal opposite `vertex`, if `vertex` is a terminal.
    pub fn opposite(&self, vertex: VertexId) -> Option<VertexId> {
        if self.vertices[0] == vertex {
            Some(self.vertices[1])
        } else if self.vertices[1] == vertex {
            Some(self.vertices[0])
        } else {
            None
        }
    }

    /// Check if this element is non-ohmic (requires non-linear iteration).
    pub fn is_non_ohmic(&self) -> bool {
        matches!(&self.kind, ElementKind::LightBulb(b) if b.is_real())
    }

    /// Check if this element carries companion-model history.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, ElementKind::Capacitor(_) | ElementKind::Inductor(_))
    }

    /// Wires stretch when dragged; everything else has a fixed length.
    pub fn is_flexible(&self) -> bool {
        matches!(self.kind, ElementKind::Wire(_))
    }

    /// Whether the element conducts in its present state.
    pub fn conducts(&self) -> bool {
        match &self.kind {
            ElementKind::Switch(s) => s.closed,
            ElementKind::Fuse(f) => !f.tripped,
            _ => true,
        }
    }

    /// The element's contribution to the MNA system.
    pub fn stamp(&self, ctx: &StampContext) -> Stamp {
        match &self.kind {
            ElementKind::Wire(w) => Stamp::resistor(w.resistance),
            ElementKind::Resistor(r) => Stamp::resistor(r.resistance),
            ElementKind::Battery(b) => b.stamp(),
            ElementKind::AcVoltage(s) => s.stamp(ctx.time),
            ElementKind::LightBulb(b) => Stamp::resistor(b.resistance),
            ElementKind::Capacitor(c) => {
                let (conductance, current) = c.companion(ctx.dt, ctx.integration);
                Stamp::Norton {
                    conductance,
                    current,
                }
            }
            ElementKind::Inductor(l) => {
                let (conductance, current) = l.companion(ctx.dt, ctx.integration);
                Stamp::Norton {
                    conductance,
                    current,
                }
            }
            ElementKind::Switch(s) => {
                if s.closed {
                    Stamp::resistor(Switch::R_CLOSED)
                } else {
                    Stamp::Open
                }
            }
            ElementKind::Fuse(f) => {
                if f.tripped {
                    Stamp::Open
                } else {
                    Stamp::resistor(f.resistance)
                }
            }
            ElementKind::SeriesAmmeter(a) => Stamp::resistor(a.resistance),
        }
    }

    /// Current as a meter would display it, using the latched sense.
    pub fn displayed_current(&self) -> f64 {
        self.current * self.current_sense.sign()
    }

    /// Latch the current sense on first observed current and release it
    /// when the current dies away.
    pub fn update_current_sense(&mut self) {
        if self.current.abs() <= DISPLAY_EPSILON {
            self.current_sense = CurrentSense::Unspecified;
        } else if self.current_sense == CurrentSense::Unspecified {
            self.current_sense = if self.current > 0.0 {
                CurrentSense::Forward
            } else {
                CurrentSense::Backward
            };
        }
    }

    /// Power dissipated (positive) or delivered (negative) by the element.
    pub fn power(&self) -> f64 {
        self.current * self.voltage_drop
    }
}
