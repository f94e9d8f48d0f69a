//! Snapshot and trace output for the CLI frontend.
//!
//! Writes the committed state of a simulator as a text table, as JSON, or
//! as one CSV row of element currents per step.

use std::io::Write;

use serde::Serialize;

use crate::circuit::Circuit;
use crate::error::{CckError, Result};
use crate::solver::{IslandStatus, Simulator, Solution};

fn output_error(e: impl std::fmt::Display) -> CckError {
    CckError::OutputError {
        message: e.to_string(),
    }
}

/// One vertex in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct VertexRow {
    pub name: String,
    pub voltage: f64,
}

/// One element in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ElementRow {
    pub name: String,
    pub kind: &'static str,
    pub start: String,
    pub end: String,
    /// Current start → end (A)
    pub current: f64,
    /// V(start) - V(end)
    pub voltage: f64,
    pub power: f64,
}

/// One island in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct IslandRow {
    pub reference: String,
    pub vertices: usize,
    pub elements: usize,
    pub status: String,
}

/// The committed state of a simulator at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub time: f64,
    pub vertices: Vec<VertexRow>,
    pub elements: Vec<ElementRow>,
    pub islands: Vec<IslandRow>,
}

fn status_label(status: &IslandStatus) -> String {
    match status {
        IslandStatus::Trivial => "trivial".to_string(),
        IslandStatus::Linear => "linear".to_string(),
        IslandStatus::Converged { iterations } => format!("converged ({} it)", iterations),
        IslandStatus::MaxIterationsExceeded {
            iterations,
            residual,
        } => format!("not converged ({} it, residual {:.2e})", iterations, residual),
        IslandStatus::Singular => "singular".to_string(),
    }
}

fn vertex_name(circuit: &Circuit, id: crate::circuit::VertexId) -> String {
    circuit
        .vertex(id)
        .map(|v| v.name.clone())
        .unwrap_or_else(|| id.to_string())
}

impl Snapshot {
    /// Capture the simulator's committed state. Island rows come from
    /// `solution` when one is given.
    pub fn capture(sim: &Simulator, solution: Option<&Solution>) -> Self {
        let circuit = sim.circuit();

        let vertices = circuit
            .vertices()
            .map(|v| VertexRow {
                name: v.name.clone(),
                voltage: v.voltage,
            })
            .collect();

        let elements = circuit
            .elements()
            .map(|e| ElementRow {
                name: e.name.clone(),
                kind: e.kind.type_name(),
                start: vertex_name(circuit, e.start()),
                end: vertex_name(circuit, e.end()),
                current: e.current,
                voltage: e.voltage_drop,
                power: e.power(),
            })
            .collect();

        let islands = solution
            .map(|s| {
                s.islands
                    .iter()
                    .map(|i| IslandRow {
                        reference: vertex_name(circuit, i.reference),
                        vertices: i.vertex_count,
                        elements: i.element_count,
                        status: status_label(&i.status),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            time: sim.time(),
            vertices,
            elements,
            islands,
        }
    }

    /// Write a human-readable table.
    pub fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "t = {:.6} s", self.time).map_err(output_error)?;
        writeln!(out).map_err(output_error)?;

        writeln!(out, "{:<12} {:>12}", "vertex", "voltage (V)").map_err(output_error)?;
        for v in &self.vertices {
            writeln!(out, "{:<12} {:>12.6}", v.name, v.voltage).map_err(output_error)?;
        }
        writeln!(out).map_err(output_error)?;

        writeln!(
            out,
            "{:<10} {:<11} {:>6} {:>6} {:>12} {:>12} {:>12}",
            "element", "kind", "start", "end", "current (A)", "voltage (V)", "power (W)"
        )
        .map_err(output_error)?;
        for e in &self.elements {
            writeln!(
                out,
                "{:<10} {:<11} {:>6} {:>6} {:>12.6} {:>12.6} {:>12.6}",
                e.name, e.kind, e.start, e.end, e.current, e.voltage, e.power
            )
            .map_err(output_error)?;
        }

        if !self.islands.is_empty() {
            writeln!(out).map_err(output_error)?;
            for (idx, island) in self.islands.iter().enumerate() {
                writeln!(
                    out,
                    "island {} @ {}: {} vertices, {} elements, {}",
                    idx, island.reference, island.vertices, island.elements, island.status
                )
                .map_err(output_error)?;
            }
        }
        Ok(())
    }

    /// Write the snapshot as pretty-printed JSON.
    pub fn write_json<W: Write>(&self, out: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self).map_err(output_error)?;
        writeln!(out).map_err(output_error)
    }
}

/// CSV trace of element currents, one row per step.
pub struct TraceWriter<W: Write> {
    out: W,
}

impl<W: Write> TraceWriter<W> {
    /// Start a trace and write the header row.
    pub fn new(mut out: W, circuit: &Circuit) -> Result<Self> {
        let mut header = String::from("time");
        for e in circuit.elements() {
            header.push(',');
            header.push_str(&e.name);
        }
        writeln!(out, "{}", header).map_err(output_error)?;
        Ok(Self { out })
    }

    /// Append the committed currents at `time`.
    pub fn write_row(&mut self, time: f64, circuit: &Circuit) -> Result<()> {
        let mut row = format!("{:.6}", time);
        for e in circuit.elements() {
            row.push_str(&format!(",{:.9}", e.current));
        }
        writeln!(self.out, "{}", row).map_err(output_error)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(output_error)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl;

    fn running_sim() -> Simulator {
        let ast = dsl::parse("B1 0 top 9\nR1 top mid 10\nR2 mid 0 20\n").unwrap();
        let mut sim = Simulator::new(Circuit::from_ast(ast).unwrap());
        sim.step(0.01);
        sim
    }

    #[test]
    fn test_table_lists_everything() {
        let sim = running_sim();
        let solution = sim.solve(0.0);
        let snapshot = Snapshot::capture(&sim, Some(&solution));

        let mut buf = Vec::new();
        snapshot.write_table(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        for name in ["top", "mid", "B1", "R1", "R2", "resistor", "linear"] {
            assert!(text.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_json_snapshot() {
        let sim = running_sim();
        let snapshot = Snapshot::capture(&sim, None);

        let mut buf = Vec::new();
        snapshot.write_json(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        let elements = value["elements"].as_array().unwrap();
        assert_eq!(elements.len(), 3);
        let r1 = elements.iter().find(|e| e["name"] == "R1").unwrap();
        assert!((r1["current"].as_f64().unwrap() - 0.3).abs() < 1e-9);
        assert_eq!(r1["start"], "top");
    }

    #[test]
    fn test_trace_rows() {
        let mut sim = running_sim();
        let mut trace = TraceWriter::new(Vec::new(), sim.circuit()).unwrap();
        for _ in 0..3 {
            sim.step(0.01);
            trace.write_row(sim.time(), sim.circuit()).unwrap();
        }

        let text = String::from_utf8(trace.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "time,B1,R1,R2");
        assert!(lines[1].starts_with("0.020000,"));
    }
}
