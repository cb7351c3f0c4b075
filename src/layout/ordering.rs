use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::GraphModel;

/// Median-sweep crossing reduction. Each pass sweeps layers top-to-bottom
/// against incoming neighbors, then bottom-to-top against outgoing ones; a
/// pass is kept only if it lowers the crossing count, so the count is
/// monotonically non-increasing and the loop stops on the first pass with
/// no improvement. Returns the final crossing count.
///
/// Tie-breaks, in order: median of neighbor slots (mean of the middle two
/// when even), current slot, declaration order. A node with no neighbors
/// in play keeps its current slot.
pub(super) fn reduce_crossings(
    layers: &mut Vec<Vec<String>>,
    model: &GraphModel,
    passes: usize,
) -> usize {
    let node_order = model.order_index();
    if layers.len() <= 1 || passes == 0 {
        return count_crossings(layers, model);
    }

    let mut incoming: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<String>> = HashMap::new();
    for link in &model.links {
        if link.from == link.to {
            continue;
        }
        outgoing
            .entry(link.from.clone())
            .or_default()
            .push(link.to.clone());
        incoming
            .entry(link.to.clone())
            .or_default()
            .push(link.from.clone());
    }

    let mut positions: HashMap<String, usize> = HashMap::new();
    let update_positions =
        |layers: &[Vec<String>], positions: &mut HashMap<String, usize>| {
            positions.clear();
            for layer in layers {
                for (idx, id) in layer.iter().enumerate() {
                    positions.insert(id.clone(), idx);
                }
            }
        };
    update_positions(layers, &mut positions);

    let sort_layer = |layer: &mut Vec<String>,
                      neighbors: &HashMap<String, Vec<String>>,
                      positions: &HashMap<String, usize>| {
        let current: HashMap<String, usize> = layer
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();
        layer.sort_by(|a, b| {
            let a_score = median_slot(a, neighbors, positions, &current);
            let b_score = median_slot(b, neighbors, positions, &current);
            match a_score.partial_cmp(&b_score) {
                Some(Ordering::Equal) | None => {
                    let a_pos = current.get(a).copied().unwrap_or(0);
                    let b_pos = current.get(b).copied().unwrap_or(0);
                    match a_pos.cmp(&b_pos) {
                        Ordering::Equal => node_order
                            .get(a)
                            .copied()
                            .unwrap_or(usize::MAX)
                            .cmp(&node_order.get(b).copied().unwrap_or(usize::MAX)),
                        other => other,
                    }
                }
                Some(ordering) => ordering,
            }
        });
    };

    let mut best_layers = layers.clone();
    let mut best = count_crossings(layers, model);

    for _ in 0..passes {
        if best == 0 {
            break;
        }
        for rank in 1..layers.len() {
            if layers[rank].len() > 1 {
                sort_layer(&mut layers[rank], &incoming, &positions);
                update_positions(layers, &mut positions);
            }
        }
        for rank in (0..layers.len().saturating_sub(1)).rev() {
            if layers[rank].len() > 1 {
                sort_layer(&mut layers[rank], &outgoing, &positions);
                update_positions(layers, &mut positions);
            }
        }

        let count = count_crossings(layers, model);
        if count < best {
            best = count;
            best_layers = layers.clone();
        } else {
            *layers = best_layers.clone();
            update_positions(layers, &mut positions);
            break;
        }
    }

    *layers = best_layers;
    best
}

fn median_slot(
    node_id: &str,
    neighbors: &HashMap<String, Vec<String>>,
    positions: &HashMap<String, usize>,
    current: &HashMap<String, usize>,
) -> f32 {
    let Some(list) = neighbors.get(node_id) else {
        return *current.get(node_id).unwrap_or(&0) as f32;
    };
    let mut values: Vec<f32> = list
        .iter()
        .filter_map(|neighbor| positions.get(neighbor).map(|pos| *pos as f32))
        .collect();
    if values.is_empty() {
        return *current.get(node_id).unwrap_or(&0) as f32;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

/// Pairwise crossings between each pair of adjacent layers.
pub(super) fn count_crossings(layers: &[Vec<String>], model: &GraphModel) -> usize {
    let mut layer_of: HashMap<&str, (usize, usize)> = HashMap::new();
    for (rank, layer) in layers.iter().enumerate() {
        for (slot, id) in layer.iter().enumerate() {
            layer_of.insert(id.as_str(), (rank, slot));
        }
    }

    let mut total = 0usize;
    for rank in 0..layers.len().saturating_sub(1) {
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for link in &model.links {
            let (Some(&from), Some(&to)) = (
                layer_of.get(link.from.as_str()),
                layer_of.get(link.to.as_str()),
            ) else {
                continue;
            };
            if from.0 == rank && to.0 == rank + 1 {
                spans.push((from.1, to.1));
            } else if to.0 == rank && from.0 == rank + 1 {
                spans.push((to.1, from.1));
            }
        }
        for i in 0..spans.len() {
            for j in (i + 1)..spans.len() {
                let (a, b) = (spans[i], spans[j]);
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    total += 1;
                }
            }
        }
    }
    total
}
