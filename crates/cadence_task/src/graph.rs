//! Pipeline graph: conflict-forced ordering between systems.
//!
//! Built once from the ordered system list. Each system is a node, and an
//! edge `i -> j` exists when an earlier system `i` conflicts with a later
//! system `j`, so `j` only starts after `i` has finished. Redundant edges are
//! removed by transitive reduction, and the result is validated so that every
//! conflicting pair is still ordered by some path.

use std::collections::HashSet;
use std::sync::Arc;

use cadence_ecs::Access;
use tracing::info;

use crate::error::{Result, TaskError};
use crate::system::System;

/// A group of systems at the same longest-path depth. Systems in a stage
/// have no ordering between them and may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Indices into the pipeline's system list.
    pub system_indices: Vec<usize>,
}

struct Node {
    system: Arc<dyn System>,
    access: Access,
    /// Systems released when this one finishes.
    dependents: Vec<usize>,
    /// Systems that must finish first.
    dependencies: usize,
}

/// The validated, immutable system pipeline.
pub struct PipelineGraph {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    edges: usize,
}

impl std::fmt::Debug for PipelineGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineGraph")
            .field("systems", &self.names())
            .field("roots", &self.roots)
            .field("edges", &self.edges)
            .finish()
    }
}

impl PipelineGraph {
    /// Build the graph from systems in pipeline order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::DuplicateSystem`] if two systems share a name, or
    /// [`TaskError::SchedulingConflict`] if a conflicting pair ends up
    /// unordered.
    pub fn build(systems: Vec<Arc<dyn System>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for system in &systems {
            if !seen.insert(system.name().to_owned()) {
                return Err(TaskError::DuplicateSystem(system.name().to_owned()));
            }
        }

        let accesses: Vec<Access> = systems.iter().map(|s| s.access()).collect();
        let n = systems.len();
        let conflicts = |i: usize, j: usize| accesses[i].conflicts_with(&accesses[j]);

        // Transitive reduction. Walking nodes back to front means every
        // successor's reach set is final when it is consulted, and walking
        // successors in ascending order means any path i -> k -> .. -> j
        // (with k < j) is known before edge i -> j is considered.
        let mut reach: Vec<Vec<bool>> = vec![vec![false; n]; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                if !conflicts(i, j) || reach[i][j] {
                    continue;
                }
                dependents[i].push(j);
                reach[i][j] = true;
                for k in (j + 1)..n {
                    if reach[j][k] {
                        reach[i][k] = true;
                    }
                }
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if conflicts(i, j) && !reach[i][j] {
                    return Err(TaskError::SchedulingConflict {
                        first: systems[i].name().to_owned(),
                        second: systems[j].name().to_owned(),
                    });
                }
            }
        }

        let mut dependencies = vec![0usize; n];
        for targets in &dependents {
            for &j in targets {
                dependencies[j] += 1;
            }
        }
        let edges = dependents.iter().map(Vec::len).sum();
        let roots = (0..n).filter(|&j| dependencies[j] == 0).collect();

        let nodes = systems
            .into_iter()
            .zip(accesses)
            .zip(dependents.into_iter().zip(dependencies))
            .map(|((system, access), (dependents, dependencies))| Node {
                system,
                access,
                dependents,
                dependencies,
            })
            .collect();

        let graph = Self {
            nodes,
            roots,
            edges,
        };
        info!(
            system_count = graph.len(),
            stage_count = graph.levels().len(),
            edge_count = graph.edges,
            "built pipeline graph"
        );
        Ok(graph)
    }

    /// Number of systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the pipeline has no systems.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The system at `index`.
    #[must_use]
    pub fn system(&self, index: usize) -> &Arc<dyn System> {
        &self.nodes[index].system
    }

    /// The access profile captured for the system at `index`.
    #[must_use]
    pub fn access(&self, index: usize) -> &Access {
        &self.nodes[index].access
    }

    /// Systems with no dependencies, released at dispatch.
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Systems that wait for `index` to finish.
    #[must_use]
    pub fn dependents(&self, index: usize) -> &[usize] {
        &self.nodes[index].dependents
    }

    /// Number of systems `index` waits for.
    #[must_use]
    pub fn dependency_count(&self, index: usize) -> usize {
        self.nodes[index].dependencies
    }

    /// Number of edges after reduction.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// System names in pipeline order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.system.name()).collect()
    }

    /// Returns `true` if `later` can only start after `earlier` finished.
    #[must_use]
    pub fn is_ordered(&self, earlier: usize, later: usize) -> bool {
        let mut stack = vec![earlier];
        let mut visited = vec![false; self.len()];
        while let Some(i) = stack.pop() {
            for &j in &self.nodes[i].dependents {
                if j == later {
                    return true;
                }
                if !visited[j] {
                    visited[j] = true;
                    stack.push(j);
                }
            }
        }
        false
    }

    /// Group systems by longest-path depth from the roots.
    #[must_use]
    pub fn levels(&self) -> Vec<Stage> {
        let mut depth = vec![0usize; self.len()];
        // Edges always point forward, so pipeline order is a topological order.
        for i in 0..self.len() {
            for &j in &self.nodes[i].dependents {
                depth[j] = depth[j].max(depth[i] + 1);
            }
        }
        let mut stages: Vec<Stage> = Vec::new();
        for (index, &level) in depth.iter().enumerate() {
            if stages.len() <= level {
                stages.resize_with(level + 1, || Stage {
                    system_indices: Vec::new(),
                });
            }
            stages[level].system_indices.push(index);
        }
        stages
    }
}
