// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Dependency registry between metadata identifiers
//!
//! Edges point from upstream to downstream: a downstream item's value is
//! computed from its upstreams. The registry refuses any edge that would
//! close a cycle, and fans change notifications out to registered listeners.
//!
//! A notification for an instance identifier also reaches the downstreams of
//! its class identifier. That is how a provider registered against
//! `MID:...PhysicalTypeIdentifier` hears about every physical type.

use crate::id::MetadataId;
use parking_lot::RwLock;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Weak};
use tracing::{trace, warn};

/// Receives `(upstream, downstream)` pairs when an upstream changes
pub trait MetadataNotificationListener: Send + Sync {
    /// Called synchronously for each affected downstream
    fn notify(&self, upstream: &MetadataId, downstream: &MetadataId);
}

struct ListenerEntry {
    only_class: Option<MetadataId>,
    key: usize,
    listener: Weak<dyn MetadataNotificationListener>,
}

fn accepts(only_class: Option<&MetadataId>, downstream: &MetadataId) -> bool {
    only_class.map_or(true, |class| *class == downstream.class_id())
}

fn listener_key<L>(listener: &Arc<L>) -> usize {
    Arc::as_ptr(listener) as usize
}

/// Counts for status output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Identifiers with at least one edge
    pub nodes: usize,
    /// Registered dependencies
    pub edges: usize,
    /// Live notification listeners
    pub listeners: usize,
}

#[derive(Default)]
struct DependencyGraph {
    graph: StableDiGraph<MetadataId, ()>,
    nodes: HashMap<MetadataId, NodeIndex>,
}

impl DependencyGraph {
    fn node(&self, id: &MetadataId) -> Option<NodeIndex> {
        self.nodes.get(id).copied()
    }

    fn ensure_node(&mut self, id: &MetadataId) -> NodeIndex {
        if let Some(idx) = self.node(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.nodes.insert(id.clone(), idx);
        idx
    }

    fn has_edge(&self, upstream: &MetadataId, downstream: &MetadataId) -> bool {
        match (self.node(upstream), self.node(downstream)) {
            (Some(u), Some(d)) => self.graph.find_edge(u, d).is_some(),
            _ => false,
        }
    }

    fn neighbours(&self, id: &MetadataId, direction: Direction) -> BTreeSet<MetadataId> {
        self.node(id)
            .map(|idx| {
                self.graph
                    .neighbors_directed(idx, direction)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop a node once nothing references it
    fn prune(&mut self, idx: NodeIndex) {
        if self.graph.neighbors_undirected(idx).next().is_none() {
            if let Some(id) = self.graph.remove_node(idx) {
                self.nodes.remove(&id);
            }
        }
    }

    /// Whether `upstream` would be notified again by a change to `start`,
    /// following explicit edges and the instance-to-class fan-out used by
    /// notifications
    fn reaches(&self, start: &MetadataId, upstream: &MetadataId) -> bool {
        let upstream_class = upstream.class_id();
        let mut stack = vec![start.clone()];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == *upstream || current == upstream_class {
                return true;
            }
            // an instance of a class upstream fans out to that class's downstreams
            if upstream.is_class() && current.class_id() == upstream_class {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.neighbours(&current, Direction::Outgoing));
            if current.is_instance() {
                stack.extend(self.neighbours(&current.class_id(), Direction::Outgoing));
            }
        }
        false
    }

    fn is_valid(&self, upstream: &MetadataId, downstream: &MetadataId) -> bool {
        if upstream == downstream {
            return false;
        }
        if self.has_edge(upstream, downstream) {
            return true;
        }
        !self.reaches(downstream, upstream)
    }
}

/// Directed acyclic graph of metadata dependencies
#[derive(Default)]
pub struct DependencyRegistry {
    graph: RwLock<DependencyGraph>,
    listeners: RwLock<Vec<ListenerEntry>>,
}

impl DependencyRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether registering `upstream -> downstream` keeps the graph acyclic
    #[must_use]
    pub fn is_valid_dependency(&self, upstream: &MetadataId, downstream: &MetadataId) -> bool {
        self.graph.read().is_valid(upstream, downstream)
    }

    /// Register that `downstream` depends on `upstream`.
    ///
    /// Returns whether the edge is present afterwards. Cycles are refused
    /// and logged, never raised.
    pub fn register_dependency(&self, upstream: &MetadataId, downstream: &MetadataId) -> bool {
        let mut graph = self.graph.write();
        if graph.has_edge(upstream, downstream) {
            return true;
        }
        if !graph.is_valid(upstream, downstream) {
            warn!("Rejected dependency {} -> {}: would create a cycle", upstream, downstream);
            return false;
        }
        let u = graph.ensure_node(upstream);
        let d = graph.ensure_node(downstream);
        graph.graph.add_edge(u, d, ());
        trace!("Registered dependency {} -> {}", upstream, downstream);
        true
    }

    /// Remove exactly one edge; absent edges are ignored
    pub fn deregister_dependency(&self, upstream: &MetadataId, downstream: &MetadataId) {
        let mut graph = self.graph.write();
        let (Some(u), Some(d)) = (graph.node(upstream), graph.node(downstream)) else {
            return;
        };
        if let Some(edge) = graph.graph.find_edge(u, d) {
            graph.graph.remove_edge(edge);
            graph.prune(u);
            graph.prune(d);
        }
    }

    /// Remove every edge where `upstream` is the upstream node
    pub fn deregister_dependencies(&self, upstream: &MetadataId) {
        self.deregister_all(upstream, Direction::Outgoing);
    }

    /// Remove every edge where `downstream` is the downstream node
    pub fn deregister_upstream_dependencies(&self, downstream: &MetadataId) {
        self.deregister_all(downstream, Direction::Incoming);
    }

    fn deregister_all(&self, id: &MetadataId, direction: Direction) {
        let mut graph = self.graph.write();
        let Some(idx) = graph.node(id) else {
            return;
        };
        let others: Vec<NodeIndex> = graph.graph.neighbors_directed(idx, direction).collect();
        for other in others {
            let edge = match direction {
                Direction::Outgoing => graph.graph.find_edge(idx, other),
                Direction::Incoming => graph.graph.find_edge(other, idx),
            };
            if let Some(edge) = edge {
                graph.graph.remove_edge(edge);
            }
            graph.prune(other);
        }
        graph.prune(idx);
    }

    /// Direct downstreams of an identifier
    #[must_use]
    pub fn get_downstream(&self, upstream: &MetadataId) -> BTreeSet<MetadataId> {
        self.graph.read().neighbours(upstream, Direction::Outgoing)
    }

    /// Direct upstreams of an identifier
    #[must_use]
    pub fn get_upstream(&self, downstream: &MetadataId) -> BTreeSet<MetadataId> {
        self.graph.read().neighbours(downstream, Direction::Incoming)
    }

    /// Register a listener, optionally restricted to downstreams of one metadata class.
    ///
    /// The registry keeps a weak reference; dropping the listener unregisters it.
    pub fn add_notification_listener<L>(&self, listener: &Arc<L>, only_class: Option<&MetadataId>)
    where
        L: MetadataNotificationListener + 'static,
    {
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn MetadataNotificationListener> = weak;
        self.listeners.write().push(ListenerEntry {
            only_class: only_class.map(MetadataId::class_id),
            key: listener_key(listener),
            listener: weak,
        });
    }

    /// Unregister a listener previously added
    pub fn remove_notification_listener<L>(&self, listener: &Arc<L>)
    where
        L: MetadataNotificationListener + 'static,
    {
        let key = listener_key(listener);
        self.listeners.write().retain(|entry| entry.key != key);
    }

    /// Tell every listener that each downstream of `upstream` is affected.
    ///
    /// Instance identifiers also notify the downstreams of their class.
    pub fn notify_downstream(&self, upstream: &MetadataId) {
        let mut downstreams = self.get_downstream(upstream);
        if upstream.is_instance() {
            downstreams.extend(self.get_downstream(&upstream.class_id()));
        }
        if downstreams.is_empty() {
            return;
        }

        let listeners: Vec<(Option<MetadataId>, Arc<dyn MetadataNotificationListener>)> = {
            let mut entries = self.listeners.write();
            entries.retain(|entry| entry.listener.strong_count() > 0);
            entries
                .iter()
                .filter_map(|entry| {
                    entry
                        .listener
                        .upgrade()
                        .map(|l| (entry.only_class.clone(), l))
                })
                .collect()
        };

        for downstream in &downstreams {
            trace!("Notifying {} of change to {}", downstream, upstream);
            for (only_class, listener) in &listeners {
                if accepts(only_class.as_ref(), downstream) {
                    listener.notify(upstream, downstream);
                }
            }
        }
    }

    /// Node, edge and listener counts
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let graph = self.graph.read();
        RegistryStats {
            nodes: graph.graph.node_count(),
            edges: graph.graph.edge_count(),
            listeners: self
                .listeners
                .read()
                .iter()
                .filter(|e| e.listener.strong_count() > 0)
                .count(),
        }
    }

    /// Export to DOT format for Graphviz
    #[must_use]
    pub fn to_dot(&self) -> String {
        let graph = self.graph.read();
        let mut ids: Vec<&MetadataId> = graph.nodes.keys().collect();
        ids.sort();

        let mut dot = String::from("digraph metadata {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=rounded];\n\n");

        for id in &ids {
            let shape = if id.is_class() { "ellipse" } else { "box" };
            dot.push_str(&format!("  \"{id}\" [shape={shape}];\n"));
        }

        dot.push('\n');

        let mut edges: Vec<(&MetadataId, &MetadataId)> = graph
            .graph
            .edge_references()
            .map(|e| (&graph.graph[e.source()], &graph.graph[e.target()]))
            .collect();
        edges.sort();
        for (from, to) in edges {
            dot.push_str(&format!("  \"{from}\" -> \"{to}\";\n"));
        }

        dot.push_str("}\n");
        dot
    }

    /// Every `(upstream, downstream)` edge, sorted
    #[must_use]
    pub fn dependencies(&self) -> Vec<(MetadataId, MetadataId)> {
        let graph = self.graph.read();
        let mut edges: Vec<(MetadataId, MetadataId)> = graph
            .graph
            .edge_references()
            .map(|e| (graph.graph[e.source()].clone(), graph.graph[e.target()].clone()))
            .collect();
        edges.sort();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn mid(s: &str) -> MetadataId {
        MetadataId::parse(s).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl MetadataNotificationListener for Recorder {
        fn notify(&self, upstream: &MetadataId, downstream: &MetadataId) {
            self.seen
                .lock()
                .push((upstream.to_string(), downstream.to_string()));
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = DependencyRegistry::new();
        let a = mid("MID:test.A#1");
        let b = mid("MID:test.B#1");

        assert!(registry.register_dependency(&a, &b));
        assert!(registry.register_dependency(&a, &b));
        assert_eq!(registry.stats().edges, 1);
    }

    #[test]
    fn test_reverse_edge_rejected() {
        let registry = DependencyRegistry::new();
        let a = mid("MID:test.A#1");
        let b = mid("MID:test.B#1");

        registry.register_dependency(&a, &b);
        assert!(!registry.is_valid_dependency(&b, &a));
        assert!(!registry.register_dependency(&b, &a));
        assert!(registry.get_downstream(&b).is_empty());
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let registry = DependencyRegistry::new();
        let a = mid("MID:test.A#1");
        let b = mid("MID:test.B#1");
        let c = mid("MID:test.C#1");

        registry.register_dependency(&a, &b);
        registry.register_dependency(&b, &c);
        assert!(!registry.is_valid_dependency(&c, &a));
        assert!(registry.is_valid_dependency(&a, &c));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let registry = DependencyRegistry::new();
        let a = mid("MID:test.A#1");
        assert!(!registry.is_valid_dependency(&a, &a));
    }

    #[test]
    fn test_class_depending_on_own_instance_rejected() {
        let registry = DependencyRegistry::new();
        let instance = mid("MID:test.A#1");
        let class = mid("MID:test.A");
        assert!(!registry.is_valid_dependency(&instance, &class));
    }

    #[test]
    fn test_cycle_through_class_fanout_rejected() {
        let registry = DependencyRegistry::new();
        // Any A instance notifies B's class, so B instances may not feed A
        registry.register_dependency(&mid("MID:test.A"), &mid("MID:test.B"));
        assert!(!registry.is_valid_dependency(&mid("MID:test.B#1"), &mid("MID:test.A#1")));
    }

    #[test]
    fn test_class_feeding_its_own_instance_rejected() {
        let registry = DependencyRegistry::new();
        // Z feeds A#1, and A#1 would fan out to every downstream of A
        registry.register_dependency(&mid("MID:test.Z#1"), &mid("MID:test.A#1"));
        assert!(!registry.is_valid_dependency(&mid("MID:test.A"), &mid("MID:test.Z#1")));
        assert!(registry.is_valid_dependency(&mid("MID:test.B"), &mid("MID:test.Z#1")));
    }

    #[test]
    fn test_deregister_single_edge() {
        let registry = DependencyRegistry::new();
        let a = mid("MID:test.A#1");
        let b = mid("MID:test.B#1");
        let c = mid("MID:test.C#1");

        registry.register_dependency(&a, &b);
        registry.register_dependency(&b, &c);
        registry.deregister_dependency(&a, &b);

        assert!(registry.get_downstream(&a).is_empty());
        assert!(registry.get_downstream(&b).contains(&c));
        // absent edges are fine
        registry.deregister_dependency(&a, &b);
    }

    #[test]
    fn test_bulk_deregistration_keeps_incoming_edges() {
        let registry = DependencyRegistry::new();
        let w = mid("MID:test.W#1");
        let x = mid("MID:test.X#1");
        let y = mid("MID:test.Y#1");
        let z = mid("MID:test.Z#1");

        registry.register_dependency(&w, &x);
        registry.register_dependency(&x, &y);
        registry.register_dependency(&x, &z);
        registry.deregister_dependencies(&x);

        assert!(registry.get_downstream(&x).is_empty());
        assert!(registry.get_downstream(&w).contains(&x));
        assert!(registry.get_upstream(&y).is_empty());
    }

    #[test]
    fn test_deregister_upstream_dependencies() {
        let registry = DependencyRegistry::new();
        let a = mid("MID:test.A#1");
        let b = mid("MID:test.B#1");
        let c = mid("MID:test.C#1");

        registry.register_dependency(&a, &c);
        registry.register_dependency(&b, &c);
        registry.deregister_upstream_dependencies(&c);

        assert!(registry.get_upstream(&c).is_empty());
        assert_eq!(registry.stats().nodes, 0);
    }

    #[test]
    fn test_unknown_identifier_has_no_edges() {
        let registry = DependencyRegistry::new();
        assert!(registry.get_downstream(&mid("MID:test.Unknown#1")).is_empty());
        assert!(registry.get_upstream(&mid("MID:test.Unknown#1")).is_empty());
    }

    #[test]
    fn test_notify_reaches_class_downstreams() {
        let registry = DependencyRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.add_notification_listener(&recorder, None);

        registry.register_dependency(&mid("MID:test.Type"), &mid("MID:test.Bean"));
        registry.register_dependency(&mid("MID:test.Type#Foo"), &mid("MID:test.Other#Foo"));
        registry.notify_downstream(&mid("MID:test.Type#Foo"));

        let seen = recorder.seen.lock().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&("MID:test.Type#Foo".into(), "MID:test.Bean".into())));
        assert!(seen.contains(&("MID:test.Type#Foo".into(), "MID:test.Other#Foo".into())));
    }

    #[test]
    fn test_listener_class_filter() {
        let registry = DependencyRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.add_notification_listener(&recorder, Some(&mid("MID:test.Bean#ignored")));

        registry.register_dependency(&mid("MID:test.Type#Foo"), &mid("MID:test.Bean#Foo"));
        registry.register_dependency(&mid("MID:test.Type#Foo"), &mid("MID:test.Other#Foo"));
        registry.notify_downstream(&mid("MID:test.Type#Foo"));

        let seen = recorder.seen.lock().clone();
        assert_eq!(seen, vec![("MID:test.Type#Foo".into(), "MID:test.Bean#Foo".into())]);
    }

    #[test]
    fn test_dropped_listener_is_forgotten() {
        let registry = DependencyRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.add_notification_listener(&recorder, None);
        assert_eq!(registry.stats().listeners, 1);

        drop(recorder);
        assert_eq!(registry.stats().listeners, 0);
    }

    #[test]
    fn test_remove_listener() {
        let registry = DependencyRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.add_notification_listener(&recorder, None);
        registry.remove_notification_listener(&recorder);

        registry.register_dependency(&mid("MID:test.A#1"), &mid("MID:test.B#1"));
        registry.notify_downstream(&mid("MID:test.A#1"));
        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn test_to_dot() {
        let registry = DependencyRegistry::new();
        registry.register_dependency(&mid("MID:test.A#1"), &mid("MID:test.B#1"));

        let dot = registry.to_dot();
        assert!(dot.contains("digraph metadata"));
        assert!(dot.contains("\"MID:test.A#1\" -> \"MID:test.B#1\""));
    }

    #[test]
    fn test_dependencies_sorted() {
        let registry = DependencyRegistry::new();
        registry.register_dependency(&mid("MID:test.B#1"), &mid("MID:test.C#1"));
        registry.register_dependency(&mid("MID:test.A#1"), &mid("MID:test.B#1"));

        assert_eq!(
            registry.dependencies(),
            vec![
                (mid("MID:test.A#1"), mid("MID:test.B#1")),
                (mid("MID:test.B#1"), mid("MID:test.C#1")),
            ]
        );
    }
}
