use std::collections::{BTreeMap, BTreeSet};

use crate::options::LayoutOptions;

use super::types::NodePlacement;

/// Topological compression: drop empty ranks so consecutive layers pull
/// together. Relative vertical order is untouched. Idempotent.
pub(super) fn topo_compress(layers: &mut Vec<Vec<String>>) {
    layers.retain(|layer| !layer.is_empty());
}

/// Slot-based coordinate assignment. Pinned nodes keep their pinned
/// geometry; everything else lands at slot * node_spacing within its
/// layer row.
pub(super) fn assign_coordinates(
    layers: &[Vec<String>],
    options: &LayoutOptions,
    pinned: &BTreeMap<String, (f32, f32)>,
) -> BTreeMap<String, NodePlacement> {
    let mut placements = BTreeMap::new();
    for (rank, layer) in layers.iter().enumerate() {
        for (slot, id) in layer.iter().enumerate() {
            let placement = match pinned.get(id) {
                Some(&(x, y)) => NodePlacement { x, y },
                None => NodePlacement {
                    x: slot as f32 * options.node_spacing,
                    y: rank as f32 * options.rank_spacing,
                },
            };
            placements.insert(id.clone(), placement);
        }
    }
    placements
}

/// Row normalization that leaves rows containing pinned nodes alone, so a
/// locked or previously placed node is never dragged by its row.
pub(super) fn normalize_rows_skipping(
    placements: &mut BTreeMap<String, NodePlacement>,
    layers: &[Vec<String>],
    pinned: &BTreeSet<String>,
    spacing: f32,
) {
    for layer in layers {
        if layer.iter().any(|id| pinned.contains(id)) {
            continue;
        }
        normalize_rows(placements, std::slice::from_ref(layer), spacing);
    }
}

/// Row normalization: re-space the nodes of each row uniformly from the
/// row's left edge, preserving left-to-right order. Idempotent.
pub(super) fn normalize_rows(
    placements: &mut BTreeMap<String, NodePlacement>,
    layers: &[Vec<String>],
    spacing: f32,
) {
    for layer in layers {
        let mut row: Vec<(String, f32)> = layer
            .iter()
            .filter_map(|id| placements.get(id).map(|p| (id.clone(), p.x)))
            .collect();
        if row.len() < 2 {
            continue;
        }
        let min_x = row
            .iter()
            .map(|(_, x)| *x)
            .fold(f32::INFINITY, f32::min);
        row.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        for (idx, (id, _)) in row.iter().enumerate() {
            if let Some(placement) = placements.get_mut(id) {
                placement.x = min_x + idx as f32 * spacing;
            }
        }
    }
}

/// Incremental compression: pack only the nodes a prior layout has not
/// pinned, scanning each row left to right for the first free slot. Pinned
/// nodes never move, so an edit disturbs just its own region. Idempotent:
/// the result depends only on pinned geometry and slot order.
pub(super) fn incremental_compress(
    placements: &mut BTreeMap<String, NodePlacement>,
    layers: &[Vec<String>],
    pinned: &BTreeSet<String>,
    spacing: f32,
) {
    let half = spacing * 0.5;
    for layer in layers {
        let mut used: Vec<f32> = layer
            .iter()
            .filter(|id| pinned.contains(*id))
            .filter_map(|id| placements.get(id).map(|p| p.x))
            .collect();
        for id in layer {
            if pinned.contains(id) {
                continue;
            }
            let mut x = 0.0f32;
            while used.iter().any(|u| (u - x).abs() < half) {
                x += spacing;
            }
            used.push(x);
            if let Some(placement) = placements.get_mut(id) {
                placement.x = x;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers(spec: &[&[&str]]) -> Vec<Vec<String>> {
        spec.iter()
            .map(|layer| layer.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn topo_compress_drops_gaps_and_is_idempotent() {
        let mut with_gaps = layers(&[&["a"], &[], &["b"], &[], &[], &["c"]]);
        topo_compress(&mut with_gaps);
        assert_eq!(with_gaps, layers(&[&["a"], &["b"], &["c"]]));
        let again = {
            let mut copy = with_gaps.clone();
            topo_compress(&mut copy);
            copy
        };
        assert_eq!(again, with_gaps);
    }

    #[test]
    fn normalize_rows_is_idempotent() {
        let layer_set = layers(&[&["a", "b", "c"]]);
        let mut placements = BTreeMap::new();
        placements.insert("a".to_string(), NodePlacement { x: 10.0, y: 0.0 });
        placements.insert("b".to_string(), NodePlacement { x: 250.0, y: 0.0 });
        placements.insert("c".to_string(), NodePlacement { x: 90.0, y: 0.0 });
        normalize_rows(&mut placements, &layer_set, 80.0);
        let first = placements.clone();
        normalize_rows(&mut placements, &layer_set, 80.0);
        assert_eq!(first, placements);
        assert_eq!(placements["a"].x, 10.0);
        assert_eq!(placements["c"].x, 90.0);
        assert_eq!(placements["b"].x, 170.0);
    }

    #[test]
    fn incremental_compress_moves_only_unpinned() {
        let layer_set = layers(&[&["keep", "new1", "new2"]]);
        let mut placements = BTreeMap::new();
        placements.insert("keep".to_string(), NodePlacement { x: 80.0, y: 0.0 });
        placements.insert("new1".to_string(), NodePlacement { x: 500.0, y: 0.0 });
        placements.insert("new2".to_string(), NodePlacement { x: 700.0, y: 0.0 });
        let pinned: BTreeSet<String> = ["keep".to_string()].into();
        incremental_compress(&mut placements, &layer_set, &pinned, 80.0);
        assert_eq!(placements["keep"].x, 80.0);
        assert_eq!(placements["new1"].x, 0.0);
        assert_eq!(placements["new2"].x, 160.0);
        let first = placements.clone();
        incremental_compress(&mut placements, &layer_set, &pinned, 80.0);
        assert_eq!(first, placements);
    }
}
