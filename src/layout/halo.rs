use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::f32::consts::TAU;

use crate::model::GraphModel;
use crate::options::HaloParams;

use super::grid::{CELL, snap};
use super::types::NodePlacement;

/// Halo layout: the core set sits at the center, everything else on
/// concentric rings ordered by undirected link distance from the core.
/// Nodes unreachable from the core land on one outermost ring. Angles are
/// assigned in discovery order so identical input gives identical output.
pub(super) fn halo_placements(
    model: &GraphModel,
    params: &HaloParams,
) -> BTreeMap<String, NodePlacement> {
    let mut placements = BTreeMap::new();
    if model.node_order.is_empty() {
        return placements;
    }

    let mut core: Vec<&str> = params
        .core
        .iter()
        .filter(|id| model.nodes.contains_key(*id))
        .map(|id| id.as_str())
        .collect();
    core.dedup();
    if core.is_empty() {
        core.push(model.node_order[0].as_str());
    }

    let order_index = model.order_index();
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in &model.links {
        if link.from == link.to {
            continue;
        }
        adj.entry(link.from.as_str()).or_default().push(link.to.as_str());
        adj.entry(link.to.as_str()).or_default().push(link.from.as_str());
    }
    for neighbors in adj.values_mut() {
        neighbors.sort_by_key(|id| order_index.get(*id).copied().unwrap_or(usize::MAX));
    }

    let mut distance: HashMap<&str, usize> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let core_set: HashSet<&str> = core.iter().copied().collect();
    for &id in &core {
        distance.insert(id, 0);
        queue.push_back(id);
    }
    while let Some(current) = queue.pop_front() {
        let next_dist = distance[current] + 1;
        if let Some(neighbors) = adj.get(current) {
            for &neighbor in neighbors {
                if !distance.contains_key(neighbor) {
                    distance.insert(neighbor, next_dist);
                    queue.push_back(neighbor);
                }
            }
        }
    }

    let max_ring = distance.values().copied().max().unwrap_or(0);
    let mut rings: Vec<Vec<&str>> = vec![Vec::new(); max_ring + 2];
    for id in &model.node_order {
        if core_set.contains(id.as_str()) {
            continue;
        }
        match distance.get(id.as_str()) {
            Some(&dist) => rings[dist].push(id.as_str()),
            None => rings[max_ring + 1].push(id.as_str()),
        }
    }
    while rings.last().is_some_and(|ring| ring.is_empty()) {
        rings.pop();
    }

    let start = params.start_angle_deg.to_radians();
    let spacing = params.ring_spacing.max(2.0 * CELL);

    if core.len() == 1 {
        placements.insert(core[0].to_string(), NodePlacement { x: 0.0, y: 0.0 });
    } else {
        let radius = spacing * 0.5;
        for (idx, id) in core.iter().enumerate() {
            let angle = start + idx as f32 * TAU / core.len() as f32;
            placements.insert(
                id.to_string(),
                NodePlacement {
                    x: snap(radius * angle.cos()),
                    y: snap(radius * angle.sin()),
                },
            );
        }
    }

    for (ring_idx, ring) in rings.iter().enumerate().skip(1) {
        if ring.is_empty() {
            continue;
        }
        let radius = ring_idx as f32 * spacing;
        for (idx, id) in ring.iter().enumerate() {
            let angle = start + idx as f32 * TAU / ring.len() as f32;
            placements.insert(
                id.to_string(),
                NodePlacement {
                    x: snap(radius * angle.cos()),
                    y: snap(radius * angle.sin()),
                },
            );
        }
    }

    // Shift into positive coordinates for grid-friendly extents.
    let min_x = placements.values().map(|p| p.x).fold(f32::INFINITY, f32::min);
    let min_y = placements.values().map(|p| p.y).fold(f32::INFINITY, f32::min);
    if min_x.is_finite() && min_y.is_finite() {
        let dx = snap(-min_x) + 8.0 * CELL;
        let dy = snap(-min_y) + 8.0 * CELL;
        for placement in placements.values_mut() {
            placement.x = snap(placement.x + dx);
            placement.y = snap(placement.y + dy);
        }
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    fn star() -> GraphModel {
        let mut model = GraphModel::new();
        model.ensure_node("hub", NodeKind::Gene);
        for i in 0..4 {
            let id = format!("s{i}");
            model.ensure_node(&id, NodeKind::Bubble);
            model.add_link(&format!("l{i}"), "hub", &id);
        }
        model
    }

    #[test]
    fn core_is_centered_and_leaves_ring_out() {
        let model = star();
        let params = HaloParams {
            core: vec!["hub".to_string()],
            ring_spacing: 120.0,
            ..HaloParams::default()
        };
        let placements = halo_placements(&model, &params);
        let hub = placements["hub"];
        for i in 0..4 {
            let leaf = placements[&format!("s{i}")];
            let dist = ((leaf.x - hub.x).powi(2) + (leaf.y - hub.y).powi(2)).sqrt();
            // Snapping moves each coordinate at most half a cell.
            assert!((dist - 120.0).abs() <= CELL, "leaf {i} at distance {dist}");
        }
    }

    #[test]
    fn unreachable_nodes_get_outermost_ring() {
        let mut model = star();
        model.ensure_node("lone", NodeKind::Slash);
        let params = HaloParams {
            core: vec!["hub".to_string()],
            ring_spacing: 100.0,
            ..HaloParams::default()
        };
        let placements = halo_placements(&model, &params);
        let hub = placements["hub"];
        let lone = placements["lone"];
        let dist = ((lone.x - hub.x).powi(2) + (lone.y - hub.y).powi(2)).sqrt();
        assert!(dist > 150.0);
    }

    #[test]
    fn empty_core_falls_back_to_first_node() {
        let model = star();
        let first = halo_placements(&model, &HaloParams::default());
        let explicit = halo_placements(
            &model,
            &HaloParams {
                core: vec!["hub".to_string()],
                ..HaloParams::default()
            },
        );
        assert_eq!(first, explicit);
    }
}
