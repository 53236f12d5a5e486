//! FK-aware topological ordering, shared by the Seed Applier (spec §4.9) and
//! the Anonymisation Pipeline's "tables synced in topologically sorted
//! order" rule (spec §4.6).
//!
//! Kahn's algorithm, generalized from a table-name+dependency-list shape so
//! the same orderer works whether the caller is sequencing seed files or
//! sync batches. Unlike a seeding-order helper that papers over cycles by
//! appending them at the end, a cyclic FK graph here is reported as an
//! error: the spec requires seeding/sync to fail fast rather than guess an
//! order that might violate a constraint.

use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cyclic foreign-key dependency among tables: {0:?}")]
pub struct CycleError(pub Vec<String>);

/// One table and the names of the tables (within the same call) it depends
/// on via foreign key.
pub struct TableNode {
    pub name: String,
    pub depends_on: Vec<String>,
}

/// Returns table names ordered so that every table appears after all tables
/// it depends on, breaking ties alphabetically for determinism. Fails with
/// `CycleError` naming the tables that could not be ordered.
pub fn topological_order(tables: &[TableNode]) -> Result<Vec<String>, CycleError> {
    let known: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for table in tables {
        in_degree.entry(&table.name).or_insert(0);
        for dep in &table.depends_on {
            if known.contains(dep.as_str()) && dep != &table.name {
                *in_degree.entry(&table.name).or_insert(0) += 1;
                dependents.entry(dep.as_str()).or_default().push(&table.name);
            }
        }
    }

    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(&name, _)| name)
        .collect();
    ready.sort_unstable();
    let mut queue: VecDeque<&str> = ready.into();

    let mut result = Vec::with_capacity(tables.len());
    while let Some(name) = queue.pop_front() {
        result.push(name.to_string());
        if let Some(deps) = dependents.get(name) {
            let mut next = Vec::new();
            for &dep in deps {
                let deg = in_degree.get_mut(dep).expect("dependent was indexed from in_degree");
                *deg -= 1;
                if *deg == 0 {
                    next.push(dep);
                }
            }
            next.sort_unstable();
            queue.extend(next);
        }
    }

    if result.len() != tables.len() {
        let resolved: HashSet<&str> = result.iter().map(|s| s.as_str()).collect();
        let mut remaining: Vec<String> = tables
            .iter()
            .map(|t| t.name.clone())
            .filter(|name| !resolved.contains(name.as_str()))
            .collect();
        remaining.sort();
        return Err(CycleError(remaining));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, deps: &[&str]) -> TableNode {
        TableNode {
            name: name.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn linear_chain_orders_parents_first() {
        let tables = vec![node("c", &["b"]), node("b", &["a"]), node("a", &[])];
        assert_eq!(topological_order(&tables).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_break_alphabetically() {
        let tables = vec![node("c", &[]), node("b", &[]), node("a", &[])];
        assert_eq!(topological_order(&tables).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond_dependency_resolves() {
        let tables = vec![
            node("d", &["b", "c"]),
            node("c", &["a"]),
            node("a", &[]),
            node("b", &["a"]),
        ];
        assert_eq!(topological_order(&tables).unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn cycle_is_an_explicit_error() {
        let tables = vec![node("a", &["b"]), node("b", &["c"]), node("c", &["a"])];
        let err = topological_order(&tables).unwrap_err();
        assert_eq!(err.0.len(), 3);
    }

    #[test]
    fn self_reference_is_ignored() {
        let tables = vec![node("a", &["a"])];
        assert_eq!(topological_order(&tables).unwrap(), vec!["a"]);
    }
}
