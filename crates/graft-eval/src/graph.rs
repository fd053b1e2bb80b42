//! Dependency graph between call sites
//!
//! Nodes are call-site indices in document order. An edge `a -> b` means `a`
//! must wait until `b` has run and its response has been applied.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// `dependencies[a]` holds every `b` with an edge `a -> b`
    dependencies: Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    pub fn new(nodes: usize) -> Self {
        Self {
            dependencies: vec![BTreeSet::new(); nodes],
        }
    }

    pub fn node_count(&self) -> usize {
        self.dependencies.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(BTreeSet::len).sum()
    }

    /// Record that `dependent` waits on `dependency`.
    pub fn add_edge(&mut self, dependent: usize, dependency: usize) {
        self.dependencies[dependent].insert(dependency);
    }

    pub fn dependencies_of(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.dependencies[node].iter().copied()
    }

    /// Layers of nodes that can run once every earlier layer is done (Kahn's
    /// algorithm). Each layer is in ascending node order.
    ///
    /// On a cycle, returns one cycle as a node list whose first node is
    /// repeated at the end.
    pub fn waves(&self) -> Result<Vec<Vec<usize>>, Vec<usize>> {
        let count = self.node_count();
        let mut remaining: Vec<usize> = self.dependencies.iter().map(BTreeSet::len).collect();
        let mut dependents = vec![Vec::new(); count];
        for (node, deps) in self.dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(node);
            }
        }

        let mut waves = Vec::new();
        let mut current: Vec<usize> = (0..count).filter(|&n| remaining[n] == 0).collect();
        let mut done = 0;

        while !current.is_empty() {
            done += current.len();
            let mut next = Vec::new();
            for &node in &current {
                for &dependent in &dependents[node] {
                    remaining[dependent] -= 1;
                    if remaining[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            next.sort_unstable();
            waves.push(std::mem::replace(&mut current, next));
        }

        if done == count {
            Ok(waves)
        } else {
            Err(self.find_cycle(&remaining))
        }
    }

    /// Walk from the first unfinished node along unfinished dependencies until
    /// a node repeats. Every unfinished node has at least one unfinished
    /// dependency, so the walk cannot stall.
    fn find_cycle(&self, remaining: &[usize]) -> Vec<usize> {
        let unfinished = |node: usize| remaining[node] > 0;
        let Some(start) = (0..self.node_count()).find(|&n| unfinished(n)) else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut node = start;
        loop {
            let Some(next) = self.dependencies_of(node).find(|&dep| unfinished(dep)) else {
                return path;
            };
            if let Some(pos) = path.iter().position(|&seen| seen == next) {
                let mut cycle = path.split_off(pos);
                cycle.push(next);
                return cycle;
            }
            path.push(next);
            node = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_independent_nodes_share_a_wave() {
        let graph = DependencyGraph::new(3);
        assert_eq!(graph.waves().unwrap(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_chain() {
        let mut graph = DependencyGraph::new(3);
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        assert_eq!(graph.waves().unwrap(), vec![vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn test_diamond() {
        let mut graph = DependencyGraph::new(4);
        graph.add_edge(0, 1);
        graph.add_edge(0, 2);
        graph.add_edge(1, 3);
        graph.add_edge(2, 3);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.waves().unwrap(), vec![vec![3], vec![1, 2], vec![0]]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut graph = DependencyGraph::new(4);
        graph.add_edge(0, 3);
        graph.add_edge(1, 2);
        graph.add_edge(2, 1);
        graph.add_edge(3, 1);
        assert_eq!(graph.waves().unwrap_err(), vec![1, 2, 1]);
    }

    #[test]
    fn test_self_loop() {
        let mut graph = DependencyGraph::new(2);
        graph.add_edge(1, 1);
        assert_eq!(graph.waves().unwrap_err(), vec![1, 1]);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = DependencyGraph::new(2);
        graph.add_edge(0, 1);
        graph.add_edge(0, 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.waves().unwrap(), vec![vec![1], vec![0]]);
    }
}
