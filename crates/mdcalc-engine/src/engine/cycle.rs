//! Circular dependency detection for formula cells.
//!
//! Before a cell is evaluated we must verify that nothing reachable from it
//! forms a cycle (e.g., `A1` → `Costs!B1` → `A1`), because evaluation follows
//! references recursively. This module uses depth-first search across all
//! sheets of a workbook.

use std::collections::HashSet;

use super::{CellAddress, Sheet};

/// Detect circular dependencies reachable from a cell.
/// Returns Some(cycle_path) if a cycle is found, None otherwise.
pub fn detect_cycle(start: &CellAddress, sheets: &[Sheet]) -> Option<Vec<CellAddress>> {
    let mut visiting = HashSet::new();
    let mut finished = HashSet::new();
    let mut path = Vec::new();

    if detect_cycle_dfs(start, sheets, &mut visiting, &mut finished, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn detect_cycle_dfs(
    current: &CellAddress,
    sheets: &[Sheet],
    visiting: &mut HashSet<CellAddress>,
    finished: &mut HashSet<CellAddress>,
    path: &mut Vec<CellAddress>,
) -> bool {
    if visiting.contains(current) {
        path.push(current.clone());
        return true;
    }
    if finished.contains(current) {
        return false;
    }

    let deps = match sheets
        .get(current.sheet.0)
        .and_then(|sheet| sheet.grid.get(&current.cell))
    {
        Some(entry) => entry.depends_on.clone(),
        None => return false,
    };

    visiting.insert(current.clone());
    path.push(current.clone());

    for dep in &deps {
        if detect_cycle_dfs(dep, sheets, visiting, finished, path) {
            return true;
        }
    }

    path.pop();
    visiting.remove(current);
    finished.insert(current.clone());
    false
}
