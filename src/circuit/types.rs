//! Core types for circuit representation.

use std::fmt;

/// A unique identifier for a vertex in the circuit.
///
/// Ids index the circuit's vertex arena and are never reused while the
/// circuit lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// A unique identifier for a circuit element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Index for extra variables in an island's MNA matrix (voltage source currents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.0)
    }
}

/// Display position of a vertex. Irrelevant to the solve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Sign convention used when displaying an element's current.
///
/// The sense is latched the first time current is observed so that meters
/// read positive for the direction the current started flowing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentSense {
    /// Current flows start → end
    Forward,
    /// Current flows end → start
    Backward,
    /// No current observed yet
    #[default]
    Unspecified,
}

impl CurrentSense {
    /// Sign applied to the raw current for display.
    pub fn sign(&self) -> f64 {
        match self {
            CurrentSense::Backward => -1.0,
            CurrentSense::Forward | CurrentSense::Unspecified => 1.0,
        }
    }
}
