//! Island partitioning and per-island MNA assembly.
//!
//! An island is a maximal set of vertices joined by conducting elements.
//! Islands share no unknowns, so each one is assembled and solved on its
//! own with its lowest-id vertex grounded as the 0 V reference.
//!
//! Unknown layout for an island with `n` vertices and `k` ideal sources:
//! ```text
//! [ v_1 .. v_(n-1) | j_1 .. j_k ]
//! ```

use std::collections::{HashMap, HashSet};

use crate::circuit::{BranchId, Circuit, ElementId, VertexId};
use crate::components::{Stamp, StampContext};
use crate::error::Result;

use super::mna::MnaMatrix;

/// A connected, independently solvable part of the circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct Island {
    /// Member vertices in id order
    pub vertices: Vec<VertexId>,
    /// Conducting elements with both terminals in this island
    pub elements: Vec<ElementId>,
    /// Grounded vertex
    pub reference: VertexId,
}

impl Island {
    /// A lone vertex with nothing conducting attached has nothing to solve.
    pub fn is_trivial(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Split the circuit into islands of conducting elements, leaving out the
/// elements in `skip`.
pub fn partition(circuit: &Circuit, skip: &HashSet<ElementId>) -> Vec<Island> {
    let groups = circuit.conducting_islands();

    let mut island_of: HashMap<VertexId, usize> = HashMap::new();
    let mut islands: Vec<Island> = groups
        .into_iter()
        .enumerate()
        .map(|(idx, vertices)| {
            for v in &vertices {
                island_of.insert(*v, idx);
            }
            Island {
                reference: vertices[0],
                vertices,
                elements: Vec::new(),
            }
        })
        .collect();

    for element in circuit.elements() {
        if skip.contains(&element.id) || !element.conducts() {
            continue;
        }
        if let Some(&idx) = island_of.get(&element.start()) {
            islands[idx].elements.push(element.id);
        }
    }

    islands
}

/// One element as stamped into an island system.
#[derive(Debug, Clone, Copy)]
pub struct StampedElement {
    pub id: ElementId,
    /// Matrix rows of [start, end]; `None` for the reference vertex
    pub nodes: [Option<usize>; 2],
    /// Matrix row of the branch unknown for ideal sources
    pub branch: Option<usize>,
    pub stamp: Stamp,
}

/// The linear system for one island.
#[derive(Debug)]
pub struct IslandSystem {
    node_index: HashMap<VertexId, usize>,
    element_index: HashMap<ElementId, usize>,
    elements: Vec<StampedElement>,
    matrix: MnaMatrix,
}

impl IslandSystem {
    /// Collect stamps for every element in the island and size the matrix.
    pub fn build(circuit: &Circuit, island: &Island, ctx: &StampContext) -> Self {
        let node_index: HashMap<VertexId, usize> = island
            .vertices
            .iter()
            .filter(|&&v| v != island.reference)
            .enumerate()
            .map(|(i, &v)| (v, i))
            .collect();
        let num_nodes = node_index.len();

        let mut elements = Vec::with_capacity(island.elements.len());
        let mut element_index = HashMap::with_capacity(island.elements.len());
        let mut num_branches = 0usize;

        for element in island.elements.iter().filter_map(|&id| circuit.element(id)) {
            let stamp = element.stamp(ctx);
            let branch = if stamp.needs_branch() {
                let br = BranchId(num_branches);
                num_branches += 1;
                Some(num_nodes + br.0)
            } else {
                None
            };
            element_index.insert(element.id, elements.len());
            elements.push(StampedElement {
                id: element.id,
                nodes: [
                    node_index.get(&element.start()).copied(),
                    node_index.get(&element.end()).copied(),
                ],
                branch,
                stamp,
            });
        }

        Self {
            node_index,
            element_index,
            elements,
            matrix: MnaMatrix::new(num_nodes + num_branches),
        }
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.matrix.size
    }

    pub fn elements(&self) -> &[StampedElement] {
        &self.elements
    }

    /// Replace an element's stamp with a resistor of the given resistance.
    /// Used by the non-linear driver for real bulbs.
    pub fn set_resistance(&mut self, id: ElementId, resistance: f64) {
        if let Some(&idx) = self.element_index.get(&id) {
            self.elements[idx].stamp = Stamp::resistor(resistance);
        }
    }

    /// Stamp every element into a fresh matrix.
    pub fn assemble(&mut self) {
        self.matrix.clear();
        for el in &self.elements {
            let [n1, n2] = el.nodes;
            match el.stamp {
                Stamp::Open => {}
                Stamp::Conductance(g) => self.matrix.stamp_conductance(n1, n2, g),
                Stamp::Norton {
                    conductance,
                    current,
                } => {
                    self.matrix.stamp_conductance(n1, n2, conductance);
                    self.matrix.stamp_current_source(n1, n2, current);
                }
                Stamp::VoltageSource(v) => {
                    if let Some(br) = el.branch {
                        // Potential rises from start to end
                        self.matrix.stamp_voltage_source(n2, n1, br, v);
                    }
                }
            }
        }
    }

    /// Assemble, factor and solve.
    pub fn solve(&mut self) -> Result<()> {
        self.assemble();
        self.matrix.factor_and_solve()
    }

    /// Solved potential of an island vertex.
    pub fn vertex_voltage(&self, vertex: VertexId) -> f64 {
        self.matrix.voltage(self.node_index.get(&vertex).copied())
    }

    /// V(start) - V(end) for a stamped element.
    pub fn voltage_drop(&self, el: &StampedElement) -> f64 {
        self.matrix.voltage(el.nodes[0]) - self.matrix.voltage(el.nodes[1])
    }

    /// Current through a stamped element, start → end.
    pub fn current(&self, el: &StampedElement) -> f64 {
        let branch_current = el.branch.map(|br| self.matrix.x[br]);
        el.stamp.current(self.voltage_drop(el), branch_current)
    }

    /// Current through an element by id (0 if not in this island).
    pub fn element_current(&self, id: ElementId) -> f64 {
        self.element_index
            .get(&id)
            .map(|&idx| self.current(&self.elements[idx]))
            .unwrap_or(0.0)
    }
}
