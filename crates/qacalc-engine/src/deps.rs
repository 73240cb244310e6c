//! Dependency extraction and calculation ordering.
//!
//! A composite procedure depends on another test when the other test's slug
//! appears as an identifier-like token in its source. Dependencies form a
//! directed graph (edge: dependency -> dependent); the calculation order is
//! a round-based Kahn topological sort with lexicographic tie-breaking, and
//! everything a completed sort leaves behind is cyclic.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;
use qacalc_lang::scan_identifiers;

/// A dependency map: slug -> set of slugs it references.
pub type DependencyMap = BTreeMap<String, BTreeSet<String>>;

/// The outcome of ordering a dependency map.
///
/// `order` and `cyclic` are disjoint; every slug of the input map lands in
/// exactly one of them. Slugs referenced as dependencies but absent from
/// the map's keys are implicit leaves and appear at the front of the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcOrder {
    /// Evaluation order: every slug strictly after all its dependencies,
    /// lexicographic among peers that become available in the same round.
    pub order: Vec<String>,
    /// Slugs participating (directly or transitively) in a dependency
    /// cycle. Never scheduled.
    pub cyclic: BTreeSet<String>,
}

/// Extracts the dependencies of one procedure: identifier tokens in its
/// source intersected with the known slugs, minus the procedure itself
/// (self-references are ignored).
///
/// The scan is best-effort and never fails; a procedure that would not
/// parse still yields the dependencies its recognizable tokens imply.
pub fn extract_dependencies(
    slug: &str,
    source: &str,
    known_slugs: &BTreeSet<String>,
) -> BTreeSet<String> {
    let tokens = scan_identifiers(source);
    let deps: BTreeSet<String> = known_slugs
        .iter()
        .filter(|s| s.as_str() != slug && tokens.contains(s.as_str()))
        .cloned()
        .collect();
    tracing::trace!(slug, ?deps, "extracted dependencies");
    deps
}

/// Computes the calculation order and cyclic set for a dependency map.
///
/// Round-based Kahn sort: each round gathers every slug whose dependencies
/// have all been scheduled, appends them in lexicographic order, and
/// removes them from the graph. When a round produces nothing, the
/// remaining slugs all sit on at least one cycle. The lexicographic
/// tie-break makes the order reproducible for identical input sets.
pub fn build_order(deps: &DependencyMap) -> CalcOrder {
    let mut graph: StableGraph<String, ()> = StableGraph::new();
    let mut indices: BTreeMap<&str, NodeIndex> = BTreeMap::new();

    // Nodes for every key; dependency targets outside the keys become
    // implicit zero-dependency leaves.
    for (slug, targets) in deps {
        let dependent = ensure_node(&mut graph, &mut indices, slug);
        for target in targets {
            if target == slug {
                continue; // self-dependencies are discarded
            }
            let dependency = ensure_node(&mut graph, &mut indices, target);
            graph.add_edge(dependency, dependent, ());
        }
    }

    let mut order = Vec::with_capacity(graph.node_count());
    let mut scheduled: BTreeSet<NodeIndex> = BTreeSet::new();
    let mut remaining: BTreeSet<NodeIndex> = graph.node_indices().collect();

    loop {
        // All still-unscheduled slugs whose dependencies are scheduled.
        let mut ready: Vec<(String, NodeIndex)> = remaining
            .iter()
            .copied()
            .filter(|&idx| {
                graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .all(|dep| scheduled.contains(&dep))
            })
            .map(|idx| (graph[idx].clone(), idx))
            .collect();

        if ready.is_empty() {
            break;
        }

        ready.sort();
        for (slug, idx) in ready {
            order.push(slug);
            scheduled.insert(idx);
            remaining.remove(&idx);
        }
    }

    let cyclic: BTreeSet<String> = remaining.iter().map(|&idx| graph[idx].clone()).collect();
    tracing::debug!(?order, ?cyclic, "resolved calculation order");
    CalcOrder { order, cyclic }
}

fn ensure_node<'g>(
    graph: &mut StableGraph<String, ()>,
    indices: &mut BTreeMap<&'g str, NodeIndex>,
    slug: &'g str,
) -> NodeIndex {
    *indices
        .entry(slug)
        .or_insert_with(|| graph.add_node(slug.to_string()))
}
