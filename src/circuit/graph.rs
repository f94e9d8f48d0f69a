//! Circuit graph structure.
//!
//! Vertices and elements live in dense arenas indexed by their ids. Elements
//! refer to vertices by id only, so there are no ownership cycles and a
//! removed slot simply becomes `None`.

use std::collections::{HashMap, HashSet, VecDeque};

use super::types::{ElementId, Position, VertexId};
use crate::components::{CircuitElement, ElementKind};
use crate::dsl::CircuitAst;
use crate::error::{CckError, Result};

/// A junction where element terminals meet.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub name: String,
    /// Display position; never read by the solver
    pub position: Position,
    /// Solved potential relative to the island's reference vertex
    pub voltage: f64,
    pub is_dragged: bool,
    /// Vertices inside a true black box cannot be cut
    pub inside_true_black_box: bool,
}

impl Vertex {
    pub fn new(id: VertexId, name: String, position: Position) -> Self {
        Self {
            id,
            name,
            position,
            voltage: 0.0,
            is_dragged: false,
            inside_true_black_box: false,
        }
    }
}

/// Simple union-find for grouping vertices into islands.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Keep the smaller index as root so groups order deterministically
            if ra < rb {
                self.parent[rb] = ra;
            } else {
                self.parent[ra] = rb;
            }
        }
    }
}

/// A circuit: the full vertex set and element set.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    /// Vertex arena, indexed by `VertexId`
    pub vertices: Vec<Option<Vertex>>,
    /// Element arena, indexed by `ElementId`
    pub elements: Vec<Option<CircuitElement>>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a circuit from a parsed netlist.
    pub fn from_ast(ast: CircuitAst) -> Result<Self> {
        let mut circuit = Circuit::new();
        let mut vertex_map: HashMap<String, VertexId> = HashMap::new();

        for decl in &ast.vertices {
            if vertex_map.contains_key(&decl.name) {
                return Err(CckError::DuplicateVertex {
                    name: decl.name.clone(),
                });
            }
            let id = circuit.add_vertex(decl.name.clone(), decl.position.unwrap_or_default());
            vertex_map.insert(decl.name.clone(), id);
        }

        let mut names = HashSet::new();
        for def in &ast.elements {
            if !names.insert(def.name.clone()) {
                return Err(CckError::DuplicateElement {
                    name: def.name.clone(),
                });
            }

            let mut ends = [VertexId(0); 2];
            for (slot, vertex_name) in ends.iter_mut().zip(&def.vertices) {
                *slot = match vertex_map.get(vertex_name) {
                    Some(&id) => id,
                    None => {
                        let id = circuit.add_vertex(vertex_name.clone(), Position::default());
                        vertex_map.insert(vertex_name.clone(), id);
                        id
                    }
                };
            }

            let kind = ElementKind::from_def(def)?;
            circuit
                .add_element(def.name.clone(), ends[0], ends[1], kind)
                .map_err(|e| CckError::invalid_element(&def.name, def.line, e.to_string()))?;
        }

        Ok(circuit)
    }

    // ============ Arena access ============

    /// Add a vertex and return its id.
    pub fn add_vertex(&mut self, name: impl Into<String>, position: Position) -> VertexId {
        let id = VertexId(self.vertices.len());
        self.vertices.push(Some(Vertex::new(id, name.into(), position)));
        id
    }

    /// Place an element between two existing, distinct vertices.
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        start: VertexId,
        end: VertexId,
        kind: ElementKind,
    ) -> Result<ElementId> {
        let name = name.into();
        if !self.contains_vertex(start) {
            return Err(CckError::VertexNotFound(start));
        }
        if !self.contains_vertex(end) {
            return Err(CckError::VertexNotFound(end));
        }
        if start == end {
            return Err(CckError::topology(format!(
                "element '{}' would connect {} to itself",
                name, start
            )));
        }

        let id = ElementId(self.elements.len());
        self.elements
            .push(Some(CircuitElement::new(id, name, [start, end], kind)));
        Ok(id)
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        matches!(self.vertices.get(id.0), Some(Some(_)))
    }

    pub fn contains_element(&self, id: ElementId) -> bool {
        matches!(self.elements.get(id.0), Some(Some(_)))
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0).and_then(|v| v.as_ref())
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(id.0).and_then(|v| v.as_mut())
    }

    pub fn element(&self, id: ElementId) -> Option<&CircuitElement> {
        self.elements.get(id.0).and_then(|e| e.as_ref())
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut CircuitElement> {
        self.elements.get_mut(id.0).and_then(|e| e.as_mut())
    }

    /// Iterate over live vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().flatten()
    }

    /// Iterate over live elements in id order.
    pub fn elements(&self) -> impl Iterator<Item = &CircuitElement> {
        self.elements.iter().flatten()
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut CircuitElement> {
        self.elements.iter_mut().flatten()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    pub fn element_count(&self) -> usize {
        self.elements().count()
    }

    /// Find a vertex by name.
    pub fn find_vertex(&self, name: &str) -> Option<VertexId> {
        self.vertices().find(|v| v.name == name).map(|v| v.id)
    }

    /// Find an element by name.
    pub fn find_element(&self, name: &str) -> Option<ElementId> {
        self.elements().find(|e| e.name == name).map(|e| e.id)
    }

    // ============ Topology edits ============

    /// Remove an element. Its vertices stay.
    pub fn remove_element(&mut self, id: ElementId) -> Result<CircuitElement> {
        self.elements
            .get_mut(id.0)
            .and_then(|slot| slot.take())
            .ok_or(CckError::ElementNotFound(id))
    }

    /// Remove an element and any of its vertices left without neighbours.
    pub fn remove_element_and_prune(&mut self, id: ElementId) -> Result<CircuitElement> {
        let element = self.remove_element(id)?;
        for v in element.vertices {
            if self.neighbors_of(v).is_empty() {
                if let Some(slot) = self.vertices.get_mut(v.0) {
                    *slot = None;
                }
            }
        }
        Ok(element)
    }

    /// Remove an isolated vertex.
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<Vertex> {
        if !self.contains_vertex(id) {
            return Err(CckError::VertexNotFound(id));
        }
        if !self.neighbors_of(id).is_empty() {
            return Err(CckError::topology(format!(
                "{} still has elements attached",
                id
            )));
        }
        self.vertices[id.0].take().ok_or(CckError::VertexNotFound(id))
    }

    /// Merge `source` into `target`: every element attached to `source` is
    /// re-attached to `target` and `source` is removed.
    pub fn connect(&mut self, target: VertexId, source: VertexId) -> Result<()> {
        if !self.contains_vertex(target) {
            return Err(CckError::VertexNotFound(target));
        }
        if !self.contains_vertex(source) {
            return Err(CckError::VertexNotFound(source));
        }
        if target == source {
            return Ok(());
        }
        if self
            .elements()
            .any(|e| e.touches(target) && e.touches(source))
        {
            return Err(CckError::topology(format!(
                "{} and {} are terminals of the same element",
                target, source
            )));
        }

        for element in self.elements_mut() {
            for v in element.vertices.iter_mut() {
                if *v == source {
                    *v = target;
                }
            }
        }
        self.vertices[source.0] = None;
        Ok(())
    }

    /// Split a vertex: every attached element except the first receives its
    /// own fresh copy of the vertex. Returns the new vertices.
    pub fn cut_vertex(&mut self, id: VertexId) -> Result<Vec<VertexId>> {
        let vertex = self.vertex(id).ok_or(CckError::VertexNotFound(id))?.clone();
        if vertex.inside_true_black_box {
            return Err(CckError::topology(format!(
                "{} is inside a black box and cannot be cut",
                id
            )));
        }

        let neighbors = self.neighbors_of(id);
        let mut created = Vec::new();
        for element_id in neighbors.into_iter().skip(1) {
            let new_id = self.add_vertex(vertex.name.clone(), vertex.position);
            if let Some(element) = self.element_mut(element_id) {
                for v in element.vertices.iter_mut() {
                    if *v == id {
                        *v = new_id;
                    }
                }
            }
            created.push(new_id);
        }
        Ok(created)
    }

    // ============ Connectivity queries ============

    /// Elements attached to `vertex`.
    pub fn neighbors_of(&self, vertex: VertexId) -> Vec<ElementId> {
        self.elements()
            .filter(|e| e.touches(vertex))
            .map(|e| e.id)
            .collect()
    }

    /// Vertices one element away from `vertex`.
    pub fn neighbor_vertices(&self, vertex: VertexId) -> Vec<VertexId> {
        let mut out: Vec<VertexId> = self
            .elements()
            .filter_map(|e| e.opposite(vertex))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// The other terminal of `element`, seen from `vertex`.
    pub fn opposite_vertex(&self, element: ElementId, vertex: VertexId) -> Option<VertexId> {
        self.element(element).and_then(|e| e.opposite(vertex))
    }

    /// Partition vertices into connected groups using elements accepted by
    /// `include`. Groups and their members are ordered by vertex id.
    fn components_where<F>(&self, include: F) -> Vec<Vec<VertexId>>
    where
        F: Fn(&CircuitElement) -> bool,
    {
        let mut uf = UnionFind::new(self.vertices.len());
        for element in self.elements().filter(|e| include(e)) {
            let [a, b] = element.vertices;
            if self.contains_vertex(a) && self.contains_vertex(b) {
                uf.union(a.0, b.0);
            }
        }

        let mut groups: Vec<Vec<VertexId>> = Vec::new();
        let mut root_to_group: HashMap<usize, usize> = HashMap::new();
        for vertex in self.vertices() {
            let root = uf.find(vertex.id.0);
            let idx = *root_to_group.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[idx].push(vertex.id);
        }
        groups
    }

    /// Connected components over all elements, open or closed.
    pub fn find_connected_components(&self) -> Vec<Vec<VertexId>> {
        self.components_where(|_| true)
    }

    /// Connected components over elements that conduct right now. These are
    /// the islands the solver treats independently.
    pub fn conducting_islands(&self) -> Vec<Vec<VertexId>> {
        self.components_where(|e| e.conducts())
    }

    /// Breadth-first search from `start`, crossing elements accepted by
    /// `cross` and never entering vertices in `blocked`.
    fn search_vertices<F>(&self, start: VertexId, blocked: &HashSet<VertexId>, cross: F) -> Vec<VertexId>
    where
        F: Fn(&CircuitElement) -> bool,
    {
        if !self.contains_vertex(start) {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);

        while let Some(v) = queue.pop_front() {
            for element in self.elements().filter(|e| cross(e)) {
                if let Some(next) = element.opposite(v) {
                    if !blocked.contains(&next) && seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        let mut out: Vec<VertexId> = seen.into_iter().collect();
        out.sort();
        out
    }

    /// All vertices reachable from `vertex`, including itself.
    pub fn find_all_connected_vertices(&self, vertex: VertexId) -> Vec<VertexId> {
        self.search_vertices(vertex, &HashSet::new(), |_| true)
    }

    /// Vertices that move rigidly with `vertex`: reachable through
    /// fixed-length elements only. Wires are flexible and break the group.
    pub fn find_all_fixed_vertices(&self, vertex: VertexId) -> Vec<VertexId> {
        self.search_vertices(vertex, &HashSet::new(), |e| !e.is_flexible())
    }

    /// Whether removing `vertex` would disconnect its neighbours from each
    /// other.
    pub fn is_cut_vertex(&self, vertex: VertexId) -> bool {
        let neighbors = self.neighbor_vertices(vertex);
        let Some(&first) = neighbors.first() else {
            return false;
        };
        let blocked: HashSet<VertexId> = [vertex].into_iter().collect();
        let reachable: HashSet<VertexId> = self
            .search_vertices(first, &blocked, |_| true)
            .into_iter()
            .collect();
        neighbors.iter().any(|n| !reachable.contains(n))
    }

    /// Reset solved outputs and dynamic history to the power-off state.
    pub fn reset_dynamics(&mut self) {
        for vertex in self.vertices.iter_mut().flatten() {
            vertex.voltage = 0.0;
        }
        for element in self.elements_mut() {
            element.current = 0.0;
            element.voltage_drop = 0.0;
            element.update_current_sense();
            match &mut element.kind {
                ElementKind::Capacitor(c) => c.reset(),
                ElementKind::Inductor(l) => l.reset(),
                ElementKind::LightBulb(b) => b.cool_down(),
                ElementKind::Fuse(f) => f.reset(),
                _ => {}
            }
        }
    }
}
