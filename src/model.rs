use std::collections::{BTreeMap, HashSet};

use crate::error::LayoutError;

/// Node type tag. Affects body size and link pad geometry only; the layout
/// stages never branch on biology beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Gene,
    Bubble,
    Box,
    Intercell,
    Slash,
}

impl NodeKind {
    /// Body footprint in diagram units. Multiples of the routing cell so
    /// node edges land on cell boundaries.
    pub fn size(self) -> (f32, f32) {
        match self {
            NodeKind::Gene => (60.0, 20.0),
            NodeKind::Bubble => (30.0, 30.0),
            NodeKind::Box => (50.0, 30.0),
            NodeKind::Intercell => (50.0, 30.0),
            NodeKind::Slash => (30.0, 20.0),
        }
    }

    /// Number of distinct link anchor pads along each horizontal edge.
    pub fn pad_count(self) -> usize {
        match self {
            NodeKind::Gene => 5,
            NodeKind::Box | NodeKind::Intercell => 3,
            NodeKind::Bubble | NodeKind::Slash => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    /// Hierarchy parent. The parent relation must be acyclic; a child's
    /// layer index is constrained to be >= its parent's.
    pub parent: Option<String>,
    /// Position pinned by the host; the engine never moves a locked node.
    pub locked: Option<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: String,
    pub from: String,
    pub to: String,
    pub from_pad: usize,
    pub to_pad: usize,
    /// Links sharing a tree id form a bus and may share trunk cells
    /// without counting as conflicts against each other.
    pub tree_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayModule {
    pub id: String,
    pub members: Vec<String>,
}

/// A module grouping drawn over the base diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub id: String,
    pub modules: Vec<OverlayModule>,
}

/// Read-only view over the host's network data. The engine treats it as
/// immutable input; computed geometry comes back in the `LayoutResult`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
    pub nodes: BTreeMap<String, GraphNode>,
    /// Declaration order of node ids, used for deterministic tie-breaks.
    pub node_order: Vec<String>,
    pub links: Vec<Link>,
    pub overlays: Vec<Overlay>,
    /// Positions from a prior layout, if the diagram was laid out before.
    pub prior_positions: BTreeMap<String, (f32, f32)>,
    /// Committed routes from a prior layout, keyed by link id.
    pub prior_routes: BTreeMap<String, Vec<(f32, f32)>>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_node(&mut self, id: &str, kind: NodeKind) -> &mut GraphNode {
        if !self.nodes.contains_key(id) {
            self.node_order.push(id.to_string());
        }
        self.nodes.entry(id.to_string()).or_insert(GraphNode {
            id: id.to_string(),
            kind,
            parent: None,
            locked: None,
        })
    }

    pub fn add_link(&mut self, id: &str, from: &str, to: &str) {
        self.links.push(Link {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            from_pad: 0,
            to_pad: 0,
            tree_id: None,
        });
    }

    pub fn set_parent(&mut self, child: &str, parent: &str) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent.to_string());
        }
    }

    /// Declaration index per node id.
    pub fn order_index(&self) -> BTreeMap<String, usize> {
        self.node_order
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect()
    }

    /// Precondition checks. A malformed graph is fatal: no partial layout
    /// is attempted on top of dangling links or a cyclic hierarchy.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for link in &self.links {
            for endpoint in [&link.from, &link.to] {
                if !self.nodes.contains_key(endpoint) {
                    return Err(LayoutError::DanglingLink {
                        link: link.id.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }

        for node in self.nodes.values() {
            if let Some(parent) = &node.parent
                && !self.nodes.contains_key(parent)
            {
                return Err(LayoutError::UnknownParent {
                    node: node.id.clone(),
                    parent: parent.clone(),
                });
            }
        }

        // Walk every parent chain; revisiting a node inside the same walk
        // means the hierarchy loops.
        let mut cleared: HashSet<&str> = HashSet::new();
        for node in self.nodes.values() {
            if cleared.contains(node.id.as_str()) {
                continue;
            }
            let mut chain: Vec<&str> = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            let mut current = node.id.as_str();
            loop {
                if cleared.contains(current) {
                    break;
                }
                if !seen.insert(current) {
                    return Err(LayoutError::HierarchyCycle {
                        node: current.to_string(),
                    });
                }
                chain.push(current);
                match self.nodes.get(current).and_then(|n| n.parent.as_deref()) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
            cleared.extend(chain);
        }

        Ok(())
    }

    /// Hierarchy depth of a node (0 for roots). Callers must have run
    /// `validate` first; an unexpected cycle is treated as depth 0.
    pub(crate) fn hierarchy_depth(&self, id: &str) -> usize {
        let mut depth = 0usize;
        let mut current = id;
        let mut guard = self.nodes.len() + 1;
        while let Some(parent) = self.nodes.get(current).and_then(|n| n.parent.as_deref()) {
            depth += 1;
            current = parent;
            guard -= 1;
            if guard == 0 {
                return 0;
            }
        }
        depth
    }
}
