//! Dependency ordering.
//!
//! Dependencies form a DAG through their `after` lists. Ordering uses Kahn's
//! algorithm with a min-heap on declaration index, so independent
//! dependencies keep the order the formula declared them in.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::formula::DependencyDecl;

/// Order dependencies so every dependency follows the ones it names in `after`.
///
/// Edges to dependencies outside `decls` are ignored (they were excluded by
/// their conditions). Returns indices into `decls`.
///
/// # Errors
///
/// Returns the name of a dependency on a cycle.
pub(crate) fn order_dependencies(decls: &[&DependencyDecl]) -> Result<Vec<usize>, String> {
  let mut graph: DiGraph<usize, ()> = DiGraph::new();
  let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

  for (i, decl) in decls.iter().enumerate() {
    nodes.insert(decl.name.as_str(), graph.add_node(i));
  }

  for decl in decls {
    let dependent = nodes[decl.name.as_str()];
    for after in &decl.after {
      if let Some(&before) = nodes.get(after.as_str()) {
        graph.add_edge(before, dependent, ());
      }
    }
  }

  toposort(&graph, None).map_err(|cycle| decls[graph[cycle.node_id()]].name.clone())?;

  let mut in_degree: Vec<usize> = graph
    .node_indices()
    .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
    .collect();

  let mut ready: BinaryHeap<Reverse<usize>> = graph
    .node_indices()
    .filter(|idx| in_degree[idx.index()] == 0)
    .map(|idx| Reverse(idx.index()))
    .collect();

  let mut order = Vec::with_capacity(decls.len());
  while let Some(Reverse(index)) = ready.pop() {
    let idx = NodeIndex::new(index);
    order.push(graph[idx]);
    for next in graph.neighbors_directed(idx, Direction::Outgoing) {
      in_degree[next.index()] -= 1;
      if in_degree[next.index()] == 0 {
        ready.push(Reverse(next.index()));
      }
    }
  }

  Ok(order)
}
