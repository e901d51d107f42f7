//! Module dependency resolution
//!
//! Validates that every declared dependency is present among the candidate
//! modules, detects dependency cycles and produces the load order
//! (dependencies before dependents).

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::module::traits::ModuleRef;

/// One module together with the dependencies it is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    /// Module declaring the dependencies
    pub module: String,
    /// Declared dependency ids absent from the candidate set
    pub missing: Vec<String>,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires [{}]", self.module, self.missing.join(", "))
    }
}

/// Errors that make activation of a module set impossible
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// Modules declare dependencies that are not among the candidates
    #[error("Missing module dependencies: {}", format_missing(.0))]
    MissingDependency(Vec<MissingDependency>),

    /// The candidate set contains a dependency cycle
    #[error("Circular module dependency: {}", format_cycle(.cycle))]
    CircularDependency {
        /// Module ids on the cycle, starting at the re-entered module
        cycle: Vec<String>,
    },
}

fn format_missing(missing: &[MissingDependency]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {}", cycle.join(" -> "), first),
        None => String::new(),
    }
}

/// DFS node color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Not visited yet
    White,
    /// On the current recursion stack
    Gray,
    /// Fully processed
    Black,
}

/// Dependency graph resolver
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Validate a candidate module set
    ///
    /// Missing dependencies are collected over every module first; only a
    /// set without missing dependencies is checked for cycles.
    pub fn validate(modules: &[ModuleRef]) -> Result<(), ActivationError> {
        let missing = Self::find_missing(modules);
        if !missing.is_empty() {
            return Err(ActivationError::MissingDependency(missing));
        }

        if let Some(cycle) = Self::find_cycle(modules) {
            return Err(ActivationError::CircularDependency { cycle });
        }

        Ok(())
    }

    /// Modules declaring dependencies that are not in the candidate set
    pub fn find_missing(modules: &[ModuleRef]) -> Vec<MissingDependency> {
        let index = Self::index(modules);

        modules
            .iter()
            .filter_map(|module| {
                let missing: Vec<String> = module
                    .dependencies()
                    .iter()
                    .filter(|dep| !index.contains_key(dep.as_str()))
                    .cloned()
                    .collect();

                if missing.is_empty() {
                    None
                } else {
                    debug!(
                        "Module {} is missing dependencies {:?}",
                        module.module_id(),
                        missing
                    );
                    Some(MissingDependency {
                        module: module.module_id().to_string(),
                        missing,
                    })
                }
            })
            .collect()
    }

    /// First dependency cycle found by a three-color DFS, if any
    ///
    /// Dependencies absent from the candidate set are ignored here.
    pub fn find_cycle(modules: &[ModuleRef]) -> Option<Vec<String>> {
        let index = Self::index(modules);
        let mut marks = vec![Mark::White; modules.len()];
        let mut stack = Vec::new();

        for start in 0..modules.len() {
            if marks[start] == Mark::White {
                if let Some(cycle) =
                    Self::visit_for_cycle(start, modules, &index, &mut marks, &mut stack)
                {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn visit_for_cycle(
        node: usize,
        modules: &[ModuleRef],
        index: &HashMap<&str, usize>,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        marks[node] = Mark::Gray;
        stack.push(node);

        for dep in modules[node].dependencies() {
            let Some(&next) = index.get(dep.as_str()) else {
                continue;
            };

            match marks[next] {
                Mark::Gray => {
                    // Unwind the recursion stack back to the re-entry point
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    return Some(
                        stack[start..]
                            .iter()
                            .map(|&n| modules[n].module_id().to_string())
                            .collect(),
                    );
                }
                Mark::White => {
                    if let Some(cycle) = Self::visit_for_cycle(next, modules, index, marks, stack)
                    {
                        return Some(cycle);
                    }
                }
                Mark::Black => {}
            }
        }

        stack.pop();
        marks[node] = Mark::Black;
        None
    }

    /// Dependency-first ordering of the candidate set
    ///
    /// Independent modules keep their input order. Dependencies missing from
    /// the candidate set are skipped, and a cycle does not loop forever, so
    /// run [`ModuleDependencies::validate`] first for a pass/fail signal.
    pub fn sort(modules: &[ModuleRef]) -> Vec<ModuleRef> {
        let index = Self::index(modules);
        let mut visited = vec![false; modules.len()];
        let mut order = Vec::with_capacity(modules.len());

        for node in 0..modules.len() {
            Self::visit_for_sort(node, modules, &index, &mut visited, &mut order);
        }

        debug!(
            "Dependency order: {:?}",
            order.iter().map(|m| m.module_id()).collect::<Vec<_>>()
        );
        order
    }

    fn visit_for_sort(
        node: usize,
        modules: &[ModuleRef],
        index: &HashMap<&str, usize>,
        visited: &mut [bool],
        order: &mut Vec<ModuleRef>,
    ) {
        if visited[node] {
            return;
        }
        visited[node] = true;

        for dep in modules[node].dependencies() {
            if let Some(&next) = index.get(dep.as_str()) {
                Self::visit_for_sort(next, modules, index, visited, order);
            }
        }

        order.push(modules[node].clone());
    }

    /// Map module id to position; the first occurrence of an id wins
    fn index(modules: &[ModuleRef]) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(modules.len());
        for (i, module) in modules.iter().enumerate() {
            index.entry(module.module_id()).or_insert(i);
        }
        index
    }
}
