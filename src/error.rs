//! Error types for the circuit solver.
//!
//! This module provides a unified error type [`CckError`] that covers
//! all error conditions that can occur during netlist parsing, topology
//! edits, and solving.
//!
//! Numeric failures inside a solve ([`CckError::SingularSystem`],
//! [`CckError::NonConvergence`]) are recovered by the solver and only
//! surface as diagnostics in a step report. They never abort a frame.

use thiserror::Error;

use crate::circuit::{ElementId, VertexId};

/// Result type alias using [`CckError`].
pub type Result<T> = std::result::Result<T, CckError>;

/// Unified error type for all solver operations.
#[derive(Error, Debug)]
pub enum CckError {
    // ============ Netlist Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid element definition
    #[error("Invalid element '{name}' at line {line}: {message}")]
    InvalidElement {
        name: String,
        line: usize,
        message: String,
    },

    /// Unknown element type prefix
    #[error("Unknown element type '{element_type}' at line {line}")]
    UnknownElementType { element_type: String, line: usize },

    /// Duplicate element name
    #[error("Duplicate element name '{name}'")]
    DuplicateElement { name: String },

    /// Duplicate vertex declaration
    #[error("Duplicate vertex '{name}'")]
    DuplicateVertex { name: String },

    /// Invalid parameter value
    #[error("Invalid parameter '{param}' for element '{element}': {message}")]
    InvalidParameter {
        element: String,
        param: String,
        message: String,
    },

    // ============ Topology Errors ============
    /// Vertex not present in the circuit
    #[error("Vertex {0} not found in circuit")]
    VertexNotFound(VertexId),

    /// Element not present in the circuit
    #[error("Element {0} not found in circuit")]
    ElementNotFound(ElementId),

    /// No vertex or element carries this name
    #[error("No vertex or element named '{name}'")]
    UnknownName { name: String },

    /// Element or edit that would break the graph invariants
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Solver Errors ============
    /// Island matrix is singular and cannot be solved
    #[error("Singular system - island has a voltage source loop or a floating sub-circuit")]
    SingularSystem,

    /// Non-linear iteration did not settle
    #[error("Non-linear iteration did not converge after {iterations} iterations (residual: {residual:.2e})")]
    NonConvergence { iterations: usize, residual: f64 },

    // ============ I/O Errors ============
    /// Error reading a netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a report
    #[error("Output error: {message}")]
    OutputError { message: String },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl CckError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid element error
    pub fn invalid_element(name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidElement {
            name: name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid topology error
    pub fn topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create an unknown-name error
    pub fn unknown_name(name: impl Into<String>) -> Self {
        Self::UnknownName { name: name.into() }
    }

    /// Create a non-convergence diagnostic
    pub fn non_convergence(iterations: usize, residual: f64) -> Self {
        Self::NonConvergence {
            iterations,
            residual,
        }
    }
}
