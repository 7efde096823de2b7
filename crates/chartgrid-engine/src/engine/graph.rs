//! Dependency graph over formula cells.
//!
//! Nodes are formula cells; an edge `dep -> cell` means `cell` reads `dep`.
//! Only edges between formula cells matter for ordering: a plain value cell
//! is always ready.

use std::collections::{BTreeMap, BTreeSet};

use super::cell_ref::CellRef;
use super::deps::extract_dependencies;

#[derive(Clone, Debug, Default)]
pub struct DepGraph {
    /// formula cell -> formula cells it reads
    preds: BTreeMap<CellRef, BTreeSet<CellRef>>,
    /// formula cell -> formula cells that read it
    succs: BTreeMap<CellRef, BTreeSet<CellRef>>,
}

/// Result of ordering a graph: cells safe to evaluate in sequence, and the
/// cells that can never be ordered because they sit on or behind a cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalOrder {
    pub ordered: Vec<CellRef>,
    pub cyclic: Vec<CellRef>,
}

impl DepGraph {
    /// Build the graph for a set of formulas (`cell -> formula text`).
    pub fn from_formulas<'a, I>(formulas: I) -> Self
    where
        I: IntoIterator<Item = (CellRef, &'a str)>,
    {
        let formulas: BTreeMap<CellRef, &str> = formulas.into_iter().collect();
        let mut graph = DepGraph::default();

        for (&cell, formula) in &formulas {
            graph.preds.entry(cell).or_default();
            graph.succs.entry(cell).or_default();
            for dep in extract_dependencies(formula) {
                if formulas.contains_key(&dep) {
                    graph.add_edge(dep, cell);
                }
            }
        }
        graph
    }

    fn add_edge(&mut self, from: CellRef, to: CellRef) {
        self.preds.entry(to).or_default().insert(from);
        self.succs.entry(from).or_default().insert(to);
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.preds.contains_key(cell)
    }

    /// Formula cells `cell` reads.
    pub fn precedents(&self, cell: &CellRef) -> impl Iterator<Item = &CellRef> {
        self.preds.get(cell).into_iter().flatten()
    }

    /// Formula cells that read `cell`.
    pub fn dependents(&self, cell: &CellRef) -> impl Iterator<Item = &CellRef> {
        self.succs.get(cell).into_iter().flatten()
    }

    /// Kahn's algorithm. Ready cells are taken in row-major order so the
    /// result is deterministic; whatever is left once nothing is ready is
    /// reported as cyclic.
    pub fn evaluation_order(&self) -> EvalOrder {
        let mut in_degree: BTreeMap<CellRef, usize> = self
            .preds
            .iter()
            .map(|(cell, preds)| (*cell, preds.len()))
            .collect();

        let mut ready: BTreeSet<CellRef> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(cell, _)| *cell)
            .collect();

        let mut ordered = Vec::with_capacity(in_degree.len());
        while let Some(cell) = ready.pop_first() {
            ordered.push(cell);
            for succ in self.dependents(&cell) {
                if let Some(degree) = in_degree.get_mut(succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*succ);
                    }
                }
            }
        }

        let placed: BTreeSet<CellRef> = ordered.iter().copied().collect();
        let cyclic = in_degree
            .into_keys()
            .filter(|cell| !placed.contains(cell))
            .collect();

        EvalOrder { ordered, cyclic }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(a1: &str) -> CellRef {
        CellRef::from_a1(a1).unwrap()
    }

    #[test]
    fn test_chain_is_ordered_by_dependency() {
        let graph = DepGraph::from_formulas([
            (cell("A3"), "=A2+1"),
            (cell("A2"), "=A1*2"),
            (cell("A1"), "=5"),
        ]);
        let order = graph.evaluation_order();
        assert_eq!(order.ordered, vec![cell("A1"), cell("A2"), cell("A3")]);
        assert!(order.cyclic.is_empty());
    }

    #[test]
    fn test_independent_cells_are_row_major() {
        let graph = DepGraph::from_formulas([
            (cell("B2"), "=1"),
            (cell("A2"), "=1"),
            (cell("C1"), "=1"),
        ]);
        assert_eq!(
            graph.evaluation_order().ordered,
            vec![cell("C1"), cell("A2"), cell("B2")]
        );
    }

    #[test]
    fn test_cycle_and_downstream_are_cyclic() {
        let graph = DepGraph::from_formulas([
            (cell("A1"), "=B1"),
            (cell("B1"), "=A1"),
            (cell("C1"), "=A1+1"),
            (cell("D1"), "=7"),
        ]);
        let order = graph.evaluation_order();
        assert_eq!(order.ordered, vec![cell("D1")]);
        assert_eq!(order.cyclic, vec![cell("A1"), cell("B1"), cell("C1")]);
    }

    #[test]
    fn test_self_reference_is_cyclic() {
        let graph = DepGraph::from_formulas([(cell("A1"), "=A1+1")]);
        assert_eq!(graph.evaluation_order().cyclic, vec![cell("A1")]);
    }

    #[test]
    fn test_value_cells_are_not_nodes() {
        let graph = DepGraph::from_formulas([(cell("B1"), "=SUM(A1:A5)")]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.precedents(&cell("B1")).count(), 0);
    }
}
