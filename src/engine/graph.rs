//! # Scene Graph
//!
//! Directed graph over entities encoding parent→child edges, plus the
//! breadth-first traversal the descendant queries build on.
//!
//! ## Purpose
//! The graph is the authoritative record of which entities exist and how
//! they are parented. Vertices are keyed by entity id and carry a string
//! label equal to the decimal id. Edges are directed from parent to child.
//!
//! ## Invariants
//! - The manager maintains at most one in-edge per vertex (at most one
//!   parent); the graph structure itself does not forbid more.
//! - Parenting is a tree contract enforced by the caller. Cycles are not
//!   detected, but [`EntityGraph::breadth_first_sort`] guards traversal
//!   with a visited set so it terminates regardless.
//!
//! ## Concurrency
//! This type is **not thread-safe** and must be externally synchronized.
//! In practice it is owned by the manager and mutated only under the
//! single-writer tick discipline.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::engine::types::Entity;

struct Vertex {
    label: String,
    children: BTreeSet<Entity>,
    parents: BTreeSet<Entity>,
}

/// Directed parent→child graph of entities.
#[derive(Default)]
pub struct EntityGraph {
    vertices: BTreeMap<Entity, Vertex>,
}

impl EntityGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex for `entity`, labelled with its decimal id.
    ///
    /// Returns `false` if the vertex already exists.
    pub fn add_vertex(&mut self, entity: Entity) -> bool {
        if self.vertices.contains_key(&entity) {
            return false;
        }
        self.vertices.insert(
            entity,
            Vertex {
                label: entity.to_string(),
                children: BTreeSet::new(),
                parents: BTreeSet::new(),
            },
        );
        true
    }

    /// Returns `true` if `entity` has a vertex.
    pub fn has_vertex(&self, entity: Entity) -> bool {
        self.vertices.contains_key(&entity)
    }

    /// Removes `entity`'s vertex and every edge touching it.
    pub fn remove_vertex(&mut self, entity: Entity) -> bool {
        let Some(vertex) = self.vertices.remove(&entity) else {
            return false;
        };
        for parent in &vertex.parents {
            if let Some(p) = self.vertices.get_mut(parent) {
                p.children.remove(&entity);
            }
        }
        for child in &vertex.children {
            if let Some(c) = self.vertices.get_mut(child) {
                c.parents.remove(&entity);
            }
        }
        true
    }

    /// Adds a directed edge `parent → child`.
    ///
    /// Returns `false` if either vertex is missing.
    pub fn add_edge(&mut self, parent: Entity, child: Entity) -> bool {
        if !self.vertices.contains_key(&parent) || !self.vertices.contains_key(&child) {
            return false;
        }
        if let Some(p) = self.vertices.get_mut(&parent) {
            p.children.insert(child);
        }
        if let Some(c) = self.vertices.get_mut(&child) {
            c.parents.insert(parent);
        }
        true
    }

    /// Removes the directed edge `parent → child`, if present.
    pub fn remove_edge(&mut self, parent: Entity, child: Entity) -> bool {
        let mut removed = false;
        if let Some(p) = self.vertices.get_mut(&parent) {
            removed = p.children.remove(&child);
        }
        if let Some(c) = self.vertices.get_mut(&child) {
            c.parents.remove(&parent);
        }
        removed
    }

    /// Vertices adjacent via out-edges of `entity`: its children.
    pub fn adjacents_from(&self, entity: Entity) -> Vec<Entity> {
        self.vertices
            .get(&entity)
            .map(|v| v.children.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Vertices adjacent via in-edges of `entity`: its parents.
    pub fn adjacents_to(&self, entity: Entity) -> Vec<Entity> {
        self.vertices
            .get(&entity)
            .map(|v| v.parents.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Iterates over all vertex ids in ascending order.
    pub fn vertices(&self) -> impl Iterator<Item = Entity> + '_ {
        self.vertices.keys().copied()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the label of `entity`'s vertex.
    pub fn label(&self, entity: Entity) -> Option<&str> {
        self.vertices.get(&entity).map(|v| v.label.as_str())
    }

    /// Breadth-first traversal from `start` along out-edges, including
    /// `start` itself.
    ///
    /// Returns an empty vector when `start` has no vertex. A visited set
    /// guards against revisiting vertices, so traversal terminates even on
    /// graphs where the caller violated the tree contract.
    pub fn breadth_first_sort(&self, start: Entity) -> Vec<Entity> {
        if !self.vertices.contains_key(&start) {
            return Vec::new();
        }

        let mut visited = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(entity) = queue.pop_front() {
            order.push(entity);
            if let Some(vertex) = self.vertices.get(&entity) {
                for &child in &vertex.children {
                    if visited.insert(child) {
                        queue.push_back(child);
                    }
                }
            }
        }

        order
    }
}
