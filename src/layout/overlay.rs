use std::collections::BTreeMap;

use crate::cancel::CancelToken;
use crate::error::LayoutError;
use crate::model::GraphModel;
use crate::options::{LayoutOptions, OverlayOption};

use super::types::{NodePlacement, OverlayBoxLayout};
use super::{compress, grid, layering, ordering};

/// Padding between member node extents and the module box edge.
const MODULE_PAD: f32 = 20.0;

/// Apply the overlay re-layout policy chosen for this run. `Refit` only
/// rebuilds module boxes around the members' final positions;
/// `FullRelayout` first re-lays each module's members with a nested
/// layered pass anchored at the module's current corner.
pub(super) fn apply_overlay_policy(
    model: &GraphModel,
    placements: &mut BTreeMap<String, NodePlacement>,
    option: OverlayOption,
    options: &LayoutOptions,
    cancel: &CancelToken,
) -> Result<Vec<OverlayBoxLayout>, LayoutError> {
    match option {
        OverlayOption::None => Ok(Vec::new()),
        OverlayOption::Refit => Ok(refit_boxes(model, placements)),
        OverlayOption::FullRelayout => {
            for overlay in &model.overlays {
                for module in &overlay.modules {
                    if cancel.is_cancelled() {
                        return Err(LayoutError::Cancelled);
                    }
                    relayout_module(model, placements, &module.members, options);
                }
            }
            Ok(refit_boxes(model, placements))
        }
    }
}

/// Tight padded bounding box per module, around the members' node bodies.
/// Empty modules (or modules whose members all lack placements) emit no
/// box.
pub(super) fn refit_boxes(
    model: &GraphModel,
    placements: &BTreeMap<String, NodePlacement>,
) -> Vec<OverlayBoxLayout> {
    let mut boxes = Vec::new();
    for overlay in &model.overlays {
        for module in &overlay.modules {
            let mut min_x = f32::INFINITY;
            let mut min_y = f32::INFINITY;
            let mut max_x = f32::NEG_INFINITY;
            let mut max_y = f32::NEG_INFINITY;
            for member in &module.members {
                let (Some(placement), Some(node)) =
                    (placements.get(member), model.nodes.get(member))
                else {
                    continue;
                };
                let (width, height) = node.kind.size();
                min_x = min_x.min(placement.x - width / 2.0);
                max_x = max_x.max(placement.x + width / 2.0);
                min_y = min_y.min(placement.y - height / 2.0);
                max_y = max_y.max(placement.y + height / 2.0);
            }
            if !min_x.is_finite() {
                continue;
            }
            boxes.push(OverlayBoxLayout {
                overlay: overlay.id.clone(),
                module: module.id.clone(),
                x: min_x - MODULE_PAD,
                y: min_y - MODULE_PAD,
                width: (max_x - min_x) + 2.0 * MODULE_PAD,
                height: (max_y - min_y) + 2.0 * MODULE_PAD,
            });
        }
    }
    boxes
}

/// Nested layered pass over one module's induced subgraph. The result is
/// translated so the module keeps its current top-left corner; locked
/// members stay put.
fn relayout_module(
    model: &GraphModel,
    placements: &mut BTreeMap<String, NodePlacement>,
    members: &[String],
    options: &LayoutOptions,
) {
    if members.len() < 2 {
        return;
    }
    let mut sub = GraphModel::new();
    for id in &model.node_order {
        if !members.contains(id) {
            continue;
        }
        let Some(node) = model.nodes.get(id) else {
            continue;
        };
        let entry = sub.ensure_node(id, node.kind);
        entry.locked = node.locked;
        if let Some(parent) = &node.parent
            && members.contains(parent)
        {
            entry.parent = Some(parent.clone());
        }
    }
    for link in &model.links {
        if sub.nodes.contains_key(&link.from) && sub.nodes.contains_key(&link.to) {
            sub.links.push(link.clone());
        }
    }

    let anchor_x = members
        .iter()
        .filter_map(|id| placements.get(id).map(|p| p.x))
        .fold(f32::INFINITY, f32::min);
    let anchor_y = members
        .iter()
        .filter_map(|id| placements.get(id).map(|p| p.y))
        .fold(f32::INFINITY, f32::min);
    if !anchor_x.is_finite() || !anchor_y.is_finite() {
        return;
    }

    let nested = LayoutOptions {
        overlay_option: OverlayOption::None,
        ..options.clone()
    };
    let mut layers = layering::assign_layers(&sub, &nested);
    if nested.do_crossing_reduction {
        ordering::reduce_crossings(&mut layers, &sub, nested.optimization_passes);
    }
    compress::topo_compress(&mut layers);

    let mut pinned = BTreeMap::new();
    for node in sub.nodes.values() {
        if let Some(pos) = node.locked {
            pinned.insert(node.id.clone(), pos);
        }
    }
    let mut sub_placements = compress::assign_coordinates(&layers, &nested, &pinned);
    let sub_min_x = sub_placements
        .values()
        .map(|p| p.x)
        .fold(f32::INFINITY, f32::min);
    let sub_min_y = sub_placements
        .values()
        .map(|p| p.y)
        .fold(f32::INFINITY, f32::min);
    for (id, placement) in &mut sub_placements {
        if pinned.contains_key(id) {
            continue;
        }
        placements.insert(
            id.clone(),
            NodePlacement {
                x: grid::snap(placement.x - sub_min_x + anchor_x),
                y: grid::snap(placement.y - sub_min_y + anchor_y),
            },
        );
    }
}
