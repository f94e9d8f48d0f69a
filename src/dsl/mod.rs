//! DSL (Domain Specific Language) parser for netlists.
//!
//! This module provides a SPICE-inspired text-based language for describing
//! construction-kit circuits. The DSL is line-oriented and human-editable.
//!
//! # Grammar Overview
//!
//! ```text
//! netlist     = { line }
//! line        = comment | directive | element | empty
//! comment     = ('#' | ';') { any_char }
//! directive   = '.' directive_name { argument }
//! element     = name vertex vertex [value] { setting }
//! setting     = key '=' number | flag
//!
//! directive_name = "vertex" | "options" | "end"
//! name        = type_prefix { letter | digit | '_' }
//! vertex      = identifier | number | "GND"
//! value       = number [unit_suffix]
//!
//! number      = ['-'] digit+ ['.' digit+] [('e'|'E') ['-'|'+'] digit+]
//! unit_suffix = 'p' | 'n' | 'u' | 'm' | 'k' | 'M' | 'G'
//! ```
//!
//! # Element Types
//!
//! The type comes from the start of the element name. Two-letter prefixes
//! win over one-letter ones, so `LB1` is a bulb and `L1` an inductor.
//!
//! | Prefix | Description | Syntax |
//! |--------|-------------|--------|
//! | W | Wire | `W<name> <a> <b> [resistance]` |
//! | R | Resistor | `R<name> <a> <b> <resistance>` |
//! | B, V | Battery | `B<name> <-> <+> <voltage> [r=<internal>]` |
//! | AC | AC source | `AC<name> <-> <+> <amplitude> [freq=<Hz>] [phase=<deg>] [r=<internal>]` |
//! | LB | Light bulb | `LB<name> <a> <b> [resistance] [real] [k=<1/W>]` |
//! | C | Capacitor | `C<name> <a> <b> <capacitance>` |
//! | L | Inductor | `L<name> <a> <b> <inductance>` |
//! | SW | Switch | `SW<name> <a> <b> [open \| closed]` |
//! | F | Fuse | `F<name> <a> <b> <rating> [delay=<s>]` |
//! | AM | Series ammeter | `AM<name> <a> <b>` |
//!
//! # Directives
//!
//! | Directive | Description | Syntax |
//! |-----------|-------------|--------|
//! | .vertex | Declare a vertex | `.vertex <name> [x y]` |
//! | .options | Simulation defaults | `.options [dt=] [steps=] [maxiter=] [tol=] [trap]` |
//! | .end | Stop reading | `.end` |
//!
//! # Example
//!
//! ```text
//! # Battery, switch and a real bulb
//! .options dt=16m steps=60
//!
//! B1   0    a    9
//! SW1  a    b    closed
//! LB1  b    0    10 real
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{parse_value, Lexer, Token, TokenKind};
pub use parser::Parser;

use crate::error::Result;

/// Parse a netlist string into an AST.
pub fn parse(input: &str) -> Result<CircuitAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a netlist file.
#[cfg(feature = "cli")]
pub fn parse_file(path: &std::path::Path) -> Result<CircuitAst> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::error::CckError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Circuit, Simulator};
    use approx::assert_relative_eq;

    #[test]
    fn test_netlist_to_running_circuit() {
        let input = "\
# Two bulbs in parallel behind a switch
B1   0 a 9
SW1  a b closed
LB1  b 0 10
LB2  b 0 10
AM1  0 c
R1   c a 100
";
        let circuit = Circuit::from_ast(parse(input).unwrap()).unwrap();
        assert_eq!(circuit.element_count(), 6);

        let mut sim = Simulator::new(circuit);
        sim.step(0.01);
        assert_relative_eq!(sim.element_current("LB1").unwrap(), 0.9, epsilon = 1e-6);
        assert_relative_eq!(sim.element_current("LB2").unwrap(), 0.9, epsilon = 1e-6);
        // 9 V across 100 Ω, read through the ammeter from 0 to c
        assert_relative_eq!(sim.element_current("AM1").unwrap(), -0.09, epsilon = 1e-6);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let ast = parse("R1 a b 1\nR1 b c 1").unwrap();
        assert!(matches!(
            Circuit::from_ast(ast),
            Err(crate::CckError::DuplicateElement { .. })
        ));
    }
}
