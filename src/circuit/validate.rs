//! Circuit validation.
//!
//! The graph edit API keeps elements attached to two distinct live vertices,
//! but the arenas are public. The solver re-checks every element at solve
//! entry and leaves out the ones that fail instead of feeding them to the
//! numeric code.

use crate::components::CircuitElement;
use crate::error::{CckError, Result};

use super::Circuit;

/// Check one element against the graph invariants.
pub fn check_element(circuit: &Circuit, element: &CircuitElement) -> Result<()> {
    let [start, end] = element.vertices;
    for v in [start, end] {
        if !circuit.contains_vertex(v) {
            return Err(CckError::topology(format!(
                "element '{}' references missing vertex {}",
                element.name, v
            )));
        }
    }
    if start == end {
        return Err(CckError::topology(format!(
            "element '{}' has both terminals on {}",
            element.name, start
        )));
    }
    Ok(())
}

/// Validate a circuit for solving.
///
/// Returns one `InvalidTopology` error per offending element; an empty list
/// means the circuit is well formed.
pub fn validate_circuit(circuit: &Circuit) -> Vec<CckError> {
    circuit
        .elements()
        .filter_map(|e| check_element(circuit, e).err())
        .collect()
}
