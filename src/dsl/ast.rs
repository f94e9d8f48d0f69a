//! Abstract Syntax Tree types for the netlist DSL.

use std::collections::HashMap;

use crate::circuit::Position;

/// Complete AST representation of a parsed netlist.
#[derive(Debug, Clone, Default)]
pub struct CircuitAst {
    /// All element instances, in source order
    pub elements: Vec<ElementDef>,
    /// Explicitly declared vertices
    pub vertices: Vec<VertexDecl>,
    /// Simulation options from `.options`
    pub options: SimOptions,
}

impl CircuitAst {
    /// Create a new empty circuit AST.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an element definition by name.
    pub fn element(&self, name: &str) -> Option<&ElementDef> {
        self.elements.iter().find(|e| e.name == name)
    }
}

/// A `.vertex` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexDecl {
    pub name: String,
    /// Display position, if given
    pub position: Option<Position>,
    pub line: usize,
}

/// Values set by `.options`. Unset fields fall back to the caller's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimOptions {
    /// Frame length in seconds
    pub dt: Option<f64>,
    /// Number of frames to run
    pub steps: Option<usize>,
    pub max_iterations: Option<usize>,
    /// Absolute convergence tolerance (A)
    pub tolerance: Option<f64>,
    /// Use the trapezoidal rule for capacitors and inductors
    pub trapezoidal: bool,
}

/// An element definition from the DSL.
#[derive(Debug, Clone)]
pub struct ElementDef {
    /// Element type, from the name prefix
    pub element_type: ElementType,
    /// Unique element name
    pub name: String,
    /// [start, end] vertex names
    pub vertices: Vec<String>,
    /// Primary value (resistance, voltage, capacitance, rating, ...)
    pub value: Option<f64>,
    /// `key=value` parameters, keys lowercased
    pub params: HashMap<String, f64>,
    /// Bare words such as `real` or `open`, lowercased
    pub flags: Vec<String>,
    /// Source line number for error reporting
    pub line: usize,
}

impl ElementDef {
    /// Whether a bare flag word was given.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }
}

/// Element types supported by the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Wire,
    Resistor,
    Battery,
    AcVoltage,
    LightBulb,
    Capacitor,
    Inductor,
    Switch,
    Fuse,
    SeriesAmmeter,
}

impl ElementType {
    /// Two-letter prefixes, checked before single letters.
    const KEYWORDS: [(&'static str, ElementType); 4] = [
        ("SW", ElementType::Switch),
        ("AC", ElementType::AcVoltage),
        ("AM", ElementType::SeriesAmmeter),
        ("LB", ElementType::LightBulb),
    ];

    /// Parse an element type from a single-letter prefix.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix.to_ascii_uppercase() {
            'W' => Some(Self::Wire),
            'R' => Some(Self::Resistor),
            'B' | 'V' => Some(Self::Battery),
            'C' => Some(Self::Capacitor),
            'L' => Some(Self::Inductor),
            'F' => Some(Self::Fuse),
            _ => None,
        }
    }

    /// Determine the element type from an element name such as `LB2`.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        for (keyword, ty) in Self::KEYWORDS {
            if upper.starts_with(keyword) {
                return Some(ty);
            }
        }
        upper.chars().next().and_then(Self::from_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_name() {
        assert_eq!(ElementType::from_name("R1"), Some(ElementType::Resistor));
        assert_eq!(ElementType::from_name("sw_main"), Some(ElementType::Switch));
        assert_eq!(ElementType::from_name("LB2"), Some(ElementType::LightBulb));
        assert_eq!(ElementType::from_name("L1"), Some(ElementType::Inductor));
        assert_eq!(ElementType::from_name("AC1"), Some(ElementType::AcVoltage));
        assert_eq!(ElementType::from_name("AM1"), Some(ElementType::SeriesAmmeter));
        assert_eq!(ElementType::from_name("V1"), Some(ElementType::Battery));
        assert_eq!(ElementType::from_name("Q1"), None);
    }
}
