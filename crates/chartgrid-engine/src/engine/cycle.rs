//! Circular dependency detection for formula cells.
//!
//! Ordering already tells us *which* cells can't be evaluated; this finds an
//! actual loop so it can be reported (e.g. `A1 -> B1 -> A1`).

use std::collections::HashSet;

use super::cell_ref::CellRef;
use super::graph::DepGraph;

/// Detect a circular dependency reachable from `start`.
/// Returns Some(cycle_path) ending with the repeated cell, None otherwise.
pub fn detect_cycle(start: &CellRef, graph: &DepGraph) -> Option<Vec<CellRef>> {
    let mut visiting = HashSet::new();
    let mut path = Vec::new();

    if detect_cycle_dfs(start, graph, &mut visiting, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn detect_cycle_dfs(
    current: &CellRef,
    graph: &DepGraph,
    visiting: &mut HashSet<CellRef>,
    path: &mut Vec<CellRef>,
) -> bool {
    if visiting.contains(current) {
        path.push(*current);
        return true;
    }
    if !graph.contains(current) {
        return false;
    }

    visiting.insert(*current);
    path.push(*current);

    for dep in graph.precedents(current) {
        if detect_cycle_dfs(dep, graph, visiting, path) {
            return true;
        }
    }

    path.pop();
    visiting.remove(current);
    false
}

/// Render a cycle path as `A1 -> B1 -> A1`.
pub fn describe_cycle(path: &[CellRef]) -> String {
    path.iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(a1: &str) -> CellRef {
        CellRef::from_a1(a1).unwrap()
    }

    #[test]
    fn test_detects_two_cell_loop() {
        let graph = DepGraph::from_formulas([(cell("A1"), "=B1+1"), (cell("B1"), "=A1")]);
        let path = detect_cycle(&cell("A1"), &graph).unwrap();
        assert_eq!(describe_cycle(&path), "A1 -> B1 -> A1");
    }

    #[test]
    fn test_downstream_cell_reaches_loop() {
        let graph = DepGraph::from_formulas([
            (cell("A1"), "=B1"),
            (cell("B1"), "=A1"),
            (cell("C1"), "=A1"),
        ]);
        let path = detect_cycle(&cell("C1"), &graph).unwrap();
        assert_eq!(path.first(), Some(&cell("C1")));
        assert_eq!(path.last(), Some(&cell("A1")));
    }

    #[test]
    fn test_acyclic_chain() {
        let graph = DepGraph::from_formulas([(cell("A2"), "=A1"), (cell("A3"), "=A2")]);
        assert_eq!(detect_cycle(&cell("A3"), &graph), None);
    }
}
