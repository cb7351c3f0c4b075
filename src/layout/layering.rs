use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::model::GraphModel;
use crate::options::{LayeringMethod, LayoutOptions};

/// Assign every node to a layer. Layers come back ordered by rank, nodes
/// within a layer ordered by declaration; empty ranks are kept so the
/// compression stage has gaps to remove. Hierarchy constraint: a child's
/// layer index is >= its parent's. Pure-linkage cycles are broken
/// deterministically by treating edges against the declaration-ordered
/// topological order as back-edges.
pub(super) fn assign_layers(model: &GraphModel, options: &LayoutOptions) -> Vec<Vec<String>> {
    let order_index = model.order_index();
    let order = topo_order(model);
    let order_pos: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();

    let mut ranks: HashMap<String, usize> = HashMap::new();
    match options.layering_method {
        LayeringMethod::LongestPath => {
            relax_forward(model, &order, &order_pos, &mut ranks, true);
        }
        LayeringMethod::Topological => {
            relax_forward(model, &order, &order_pos, &mut ranks, false);
        }
        LayeringMethod::HierarchyConstrained => {
            for id in &model.node_order {
                ranks.insert(id.clone(), model.hierarchy_depth(id));
            }
        }
    }

    enforce_hierarchy(model, &mut ranks);
    if options.inheritance_squash {
        squash_inheritance(model, &mut ranks);
        enforce_hierarchy(model, &mut ranks);
    }

    let max_rank = ranks.values().copied().max().unwrap_or(0);
    let mut layers: Vec<Vec<String>> = vec![Vec::new(); max_rank + 1];
    for id in &model.node_order {
        let rank = ranks.get(id).copied().unwrap_or(0);
        layers[rank].push(id.clone());
    }
    for layer in &mut layers {
        layer.sort_by_key(|id| order_index.get(id).copied().unwrap_or(usize::MAX));
    }

    split_oversized(layers, options.max_per_layer, model)
}

/// Rank relaxation over forward edges in topological order. `longest`
/// selects max-over-predecessors (longest path) vs min (BFS depth).
fn relax_forward(
    model: &GraphModel,
    order: &[String],
    order_pos: &HashMap<&str, usize>,
    ranks: &mut HashMap<String, usize>,
    longest: bool,
) {
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in &model.links {
        if link.from != link.to {
            adj.entry(link.from.as_str())
                .or_default()
                .push(link.to.as_str());
        }
    }

    for node in order {
        let rank = *ranks.entry(node.clone()).or_insert(0);
        let Some(nexts) = adj.get(node.as_str()) else {
            continue;
        };
        let from_idx = order_pos.get(node.as_str()).copied().unwrap_or(0);
        for next in nexts {
            let to_idx = order_pos.get(next).copied().unwrap_or(from_idx);
            if to_idx <= from_idx {
                // Back-edge from a linkage cycle; ignored for ranking.
                continue;
            }
            let entry = ranks.entry(next.to_string()).or_insert(rank + 1);
            if longest {
                *entry = (*entry).max(rank + 1);
            } else {
                *entry = (*entry).min(rank + 1);
            }
        }
    }
}

/// Deterministic topological order: indegree queue keyed by declaration
/// order; when only cycle members remain, the earliest-declared one is
/// forced as the next source.
fn topo_order(model: &GraphModel) -> Vec<String> {
    let order_index = model.order_index();
    let order_key = |id: &str| order_index.get(id).copied().unwrap_or(usize::MAX);

    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indeg: HashMap<&str, usize> = HashMap::new();
    for id in &model.node_order {
        indeg.insert(id.as_str(), 0);
    }
    for link in &model.links {
        if link.from == link.to {
            continue;
        }
        adj.entry(link.from.as_str())
            .or_default()
            .push(link.to.as_str());
        if let Some(deg) = indeg.get_mut(link.to.as_str()) {
            *deg += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<(usize, &str)>> = BinaryHeap::new();
    for id in &model.node_order {
        if *indeg.get(id.as_str()).unwrap_or(&0) == 0 {
            ready.push(Reverse((order_key(id), id.as_str())));
        }
    }

    let mut order: Vec<String> = Vec::with_capacity(model.node_order.len());
    let mut processed: HashSet<&str> = HashSet::new();
    loop {
        while let Some(Reverse((_key, id))) = ready.pop() {
            if !processed.insert(id) {
                continue;
            }
            order.push(id.to_string());
            if let Some(nexts) = adj.get(id) {
                for next in nexts {
                    if processed.contains(next) {
                        continue;
                    }
                    if let Some(deg) = indeg.get_mut(next) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.push(Reverse((order_key(next), next)));
                        }
                    }
                }
            }
        }

        if processed.len() >= model.node_order.len() {
            break;
        }

        // Linkage cycle: force the earliest-declared unprocessed node.
        let mut best: Option<(usize, &str)> = None;
        for id in &model.node_order {
            if !processed.contains(id.as_str()) {
                let key = order_key(id);
                if best.is_none_or(|(bk, _)| key < bk) {
                    best = Some((key, id.as_str()));
                }
            }
        }
        match best {
            Some((key, id)) => ready.push(Reverse((key, id))),
            None => break,
        }
    }

    order
}

/// Raise every child to at least its hierarchy parent's rank. Parents are
/// processed before children (depth order), so one pass suffices.
fn enforce_hierarchy(model: &GraphModel, ranks: &mut HashMap<String, usize>) {
    let mut by_depth: Vec<&str> = model.node_order.iter().map(|id| id.as_str()).collect();
    by_depth.sort_by_key(|id| model.hierarchy_depth(id));
    for id in by_depth {
        let Some(parent) = model.nodes.get(id).and_then(|n| n.parent.as_deref()) else {
            continue;
        };
        let parent_rank = ranks.get(parent).copied().unwrap_or(0);
        let entry = ranks.entry(id.to_string()).or_insert(0);
        *entry = (*entry).max(parent_rank);
    }
}

/// Inheritance squash: a node fed only by its hierarchy parent sits in the
/// layer directly below that parent, shortening inheritance chains.
fn squash_inheritance(model: &GraphModel, ranks: &mut HashMap<String, usize>) {
    for id in &model.node_order {
        let Some(parent) = model.nodes.get(id).and_then(|n| n.parent.as_deref()) else {
            continue;
        };
        let mut incoming = model
            .links
            .iter()
            .filter(|link| link.to == *id && link.from != *id);
        let (Some(only), None) = (incoming.next(), incoming.next()) else {
            continue;
        };
        if only.from == parent {
            let parent_rank = ranks.get(parent).copied().unwrap_or(0);
            ranks.insert(id.clone(), parent_rank + 1);
        }
    }
}

/// Split any layer over the cap into consecutive sub-layers. An oversized
/// layer is first reordered so hierarchy ancestors precede their
/// descendants (stable, so declaration order holds within a depth), since
/// a child sharing a rank with its parent must not land in an earlier
/// sub-layer.
fn split_oversized(
    layers: Vec<Vec<String>>,
    max_per_layer: usize,
    model: &GraphModel,
) -> Vec<Vec<String>> {
    let cap = max_per_layer.max(1);
    let mut out: Vec<Vec<String>> = Vec::with_capacity(layers.len());
    for mut layer in layers {
        if layer.len() <= cap {
            out.push(layer);
        } else {
            layer.sort_by_key(|id| model.hierarchy_depth(id));
            for chunk in layer.chunks(cap) {
                out.push(chunk.to_vec());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn chain(ids: &[&str]) -> GraphModel {
        let mut model = GraphModel::new();
        for id in ids {
            model.ensure_node(id, NodeKind::Gene);
        }
        for pair in ids.windows(2) {
            model.add_link(&format!("{}-{}", pair[0], pair[1]), pair[0], pair[1]);
        }
        model
    }

    #[test]
    fn chain_gets_one_node_per_layer() {
        let model = chain(&["a", "b", "c", "d", "e"]);
        let layers = assign_layers(&model, &LayoutOptions::default());
        let flat: Vec<&str> = layers
            .iter()
            .flat_map(|layer| layer.iter().map(|s| s.as_str()))
            .collect();
        assert_eq!(flat, vec!["a", "b", "c", "d", "e"]);
        assert!(layers.iter().all(|layer| layer.len() == 1));
    }

    #[test]
    fn layers_cover_each_node_once() {
        let mut model = chain(&["a", "b", "c"]);
        model.ensure_node("x", NodeKind::Bubble);
        model.add_link("a-c", "a", "c");
        let layers = assign_layers(&model, &LayoutOptions::default());
        let mut seen = HashSet::new();
        let mut total = 0usize;
        for layer in &layers {
            for id in layer {
                assert!(seen.insert(id.clone()), "{id} appears twice");
                total += 1;
            }
        }
        assert_eq!(total, model.node_order.len());
    }

    #[test]
    fn child_never_above_parent() {
        let mut model = chain(&["p", "c"]);
        model.set_parent("c", "p");
        // Linkage pulling the child toward rank 0 must lose to hierarchy.
        model.ensure_node("z", NodeKind::Box);
        model.add_link("z-p", "z", "p");
        let layers = assign_layers(&model, &LayoutOptions::default());
        let rank_of = |target: &str| {
            layers
                .iter()
                .position(|layer| layer.iter().any(|id| id == target))
                .unwrap()
        };
        assert!(rank_of("c") >= rank_of("p"));
    }

    #[test]
    fn linkage_cycle_does_not_loop() {
        let mut model = chain(&["a", "b"]);
        model.add_link("b-a", "b", "a");
        let layers = assign_layers(&model, &LayoutOptions::default());
        let total: usize = layers.iter().map(|layer| layer.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn oversized_layer_splits_in_order() {
        let mut model = GraphModel::new();
        model.ensure_node("root", NodeKind::Gene);
        for i in 0..12 {
            let id = format!("n{i:02}");
            model.ensure_node(&id, NodeKind::Bubble);
            model.add_link(&format!("l{i:02}"), "root", &id);
        }
        let options = LayoutOptions {
            max_per_layer: 5,
            ..LayoutOptions::default()
        };
        let layers = assign_layers(&model, &options);
        assert_eq!(layers[0], vec!["root".to_string()]);
        assert_eq!(layers[1].len(), 5);
        assert_eq!(layers[2].len(), 5);
        assert_eq!(layers[3].len(), 2);
        assert_eq!(layers[1][0], "n00");
        assert_eq!(layers[3][1], "n11");
    }

    #[test]
    fn split_never_puts_child_above_same_rank_parent() {
        // No links: everything shares rank 0, and the child is declared
        // before its parent, so a naive declaration-order split would push
        // the parent into a later sub-layer.
        let mut model = GraphModel::new();
        model.ensure_node("c", NodeKind::Bubble);
        for i in 0..5 {
            model.ensure_node(&format!("f{i}"), NodeKind::Bubble);
        }
        model.ensure_node("p", NodeKind::Gene);
        model.set_parent("c", "p");
        let options = LayoutOptions {
            max_per_layer: 5,
            ..LayoutOptions::default()
        };
        let layers = assign_layers(&model, &options);
        let rank_of = |target: &str| {
            layers
                .iter()
                .position(|layer| layer.iter().any(|id| id == target))
                .unwrap()
        };
        assert!(rank_of("c") >= rank_of("p"));
    }

    #[test]
    fn inheritance_squash_pulls_child_below_parent() {
        let mut model = chain(&["a", "b", "c", "d"]);
        model.ensure_node("leaf", NodeKind::Slash);
        model.set_parent("leaf", "a");
        model.add_link("a-leaf", "a", "leaf");
        // Extra path pushing leaf deep without squash.
        model.add_link("d-leaf2", "d", "leaf");
        let deep = assign_layers(&model, &LayoutOptions::default());
        let squashed = assign_layers(
            &model,
            &LayoutOptions {
                inheritance_squash: true,
                ..LayoutOptions::default()
            },
        );
        let rank_of = |layers: &[Vec<String>], target: &str| {
            layers
                .iter()
                .position(|layer| layer.iter().any(|id| id == target))
                .unwrap()
        };
        assert!(rank_of(&deep, "leaf") > 1);
        // Two incoming links: squash does not apply.
        assert_eq!(rank_of(&deep, "leaf"), rank_of(&squashed, "leaf"));

        let mut single = chain(&["a", "b", "c", "d"]);
        single.ensure_node("leaf", NodeKind::Slash);
        single.set_parent("leaf", "d");
        single.add_link("d-leaf", "d", "leaf");
        let layers = assign_layers(
            &single,
            &LayoutOptions {
                inheritance_squash: true,
                ..LayoutOptions::default()
            },
        );
        assert_eq!(rank_of(&layers, "leaf"), rank_of(&layers, "d") + 1);
    }
}
