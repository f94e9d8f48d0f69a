//! Circuit graph representation and validation.
//!
//! This module provides the arena-based graph the solver works on. The
//! [`Circuit`] struct owns every vertex and element; elements refer to their
//! two vertices by id.

mod graph;
mod types;
mod validate;

pub use graph::{Circuit, Vertex};
pub use types::*;
pub use validate::{check_element, validate_circuit};
