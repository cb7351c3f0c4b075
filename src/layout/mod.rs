mod compress;
mod grid;
mod halo;
mod layering;
mod ordering;
mod overlay;
mod stacked;
pub(crate) mod types;
mod worksheet;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};

use crate::cancel::CancelToken;
use crate::error::LayoutError;
use crate::model::GraphModel;
use crate::options::{LayoutOptions, LayoutStrategy, MAX_OPT_PASSES};

/// Run one layout. Validates the model, dispatches the selected strategy
/// once, routes links on the placement grid, applies the overlay policy,
/// and emits delta records against any prior geometry. All output is
/// produced atomically at the end; a cancelled run returns
/// `Err(Cancelled)` with nothing applied.
pub fn compute_layout(
    model: &GraphModel,
    strategy: &LayoutStrategy,
    cancel: &CancelToken,
) -> Result<LayoutResult, LayoutError> {
    model.validate()?;
    if cancel.is_cancelled() {
        return Err(LayoutError::Cancelled);
    }

    let (mut placements, crossings, goodness, passes, overlay_option, options) = match strategy {
        LayoutStrategy::Layered(options) => {
            let options = options.clone().clamped();
            let (placements, crossings) = layered_placements(model, &options, cancel)?;
            (
                placements,
                crossings,
                options.goodness,
                options.optimization_passes,
                options.overlay_option,
                options,
            )
        }
        LayoutStrategy::Worksheet(params) => (
            worksheet::worksheet_placements(model, params),
            0,
            params.goodness,
            params.optimization_passes.min(MAX_OPT_PASSES),
            params.overlay_option,
            LayoutOptions::default(),
        ),
        LayoutStrategy::Halo(params) => (
            halo::halo_placements(model, params),
            0,
            params.goodness,
            params.optimization_passes.min(MAX_OPT_PASSES),
            params.overlay_option,
            LayoutOptions::default(),
        ),
        LayoutStrategy::StackedBlock(params) => (
            stacked::stacked_placements(model, params),
            0,
            params.goodness,
            params.optimization_passes.min(MAX_OPT_PASSES),
            params.overlay_option,
            LayoutOptions::default(),
        ),
    };

    // Locked nodes are never moved, whatever the strategy computed.
    for node in model.nodes.values() {
        if let Some((x, y)) = node.locked {
            placements.insert(node.id.clone(), NodePlacement { x, y });
        }
    }

    if cancel.is_cancelled() {
        return Err(LayoutError::Cancelled);
    }
    let overlay_boxes =
        overlay::apply_overlay_policy(model, &mut placements, overlay_option, &options, cancel)?;

    if cancel.is_cancelled() {
        return Err(LayoutError::Cancelled);
    }
    let routed = grid::route_links(model, &placements, &goodness, passes, cancel)?;

    let (width, height) = extents(model, &placements, &routed.routes, &overlay_boxes);
    let deltas = collect_deltas(model, &placements, &routed.routes);

    Ok(LayoutResult {
        placements,
        routes: routed.routes,
        overlay_boxes,
        goodness: routed.goodness,
        crossings,
        deltas,
        width,
        height,
    })
}

/// The layered pipeline: layering, crossing reduction, compression,
/// coordinates. Returns placements plus the final crossing count.
fn layered_placements(
    model: &GraphModel,
    options: &LayoutOptions,
    cancel: &CancelToken,
) -> Result<(BTreeMap<String, NodePlacement>, usize), LayoutError> {
    let mut layers = layering::assign_layers(model, options);
    if cancel.is_cancelled() {
        return Err(LayoutError::Cancelled);
    }

    let crossings = if options.first_pass && options.do_crossing_reduction {
        ordering::reduce_crossings(&mut layers, model, options.optimization_passes)
    } else {
        ordering::count_crossings(&layers, model)
    };
    if cancel.is_cancelled() {
        return Err(LayoutError::Cancelled);
    }

    if options.topo_compress {
        compress::topo_compress(&mut layers);
    }

    let mut pinned: BTreeMap<String, (f32, f32)> = BTreeMap::new();
    if !options.first_pass {
        for (id, pos) in &model.prior_positions {
            pinned.insert(id.clone(), *pos);
        }
    }
    for node in model.nodes.values() {
        if let Some(pos) = node.locked {
            pinned.insert(node.id.clone(), pos);
        }
    }

    let mut placements = compress::assign_coordinates(&layers, options, &pinned);
    let pinned_set: BTreeSet<String> = pinned.keys().cloned().collect();
    if options.normalize_rows {
        compress::normalize_rows_skipping(&mut placements, &layers, &pinned_set, options.node_spacing);
    }
    if options.incremental_compress {
        compress::incremental_compress(&mut placements, &layers, &pinned_set, options.node_spacing);
    }

    Ok((placements, crossings))
}

/// Diagram extents covering node bodies, routed points, and overlay boxes.
fn extents(
    model: &GraphModel,
    placements: &BTreeMap<String, NodePlacement>,
    routes: &[LinkRoute],
    overlay_boxes: &[OverlayBoxLayout],
) -> (f32, f32) {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for (id, placement) in placements {
        let (width, height) = model
            .nodes
            .get(id)
            .map(|node| node.kind.size())
            .unwrap_or((0.0, 0.0));
        min_x = min_x.min(placement.x - width / 2.0);
        max_x = max_x.max(placement.x + width / 2.0);
        min_y = min_y.min(placement.y - height / 2.0);
        max_y = max_y.max(placement.y + height / 2.0);
    }
    for route in routes {
        if let Some(points) = route.points() {
            for &(x, y) in points {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
    }
    for module_box in overlay_boxes {
        min_x = min_x.min(module_box.x);
        max_x = max_x.max(module_box.x + module_box.width);
        min_y = min_y.min(module_box.y);
        max_y = max_y.max(module_box.y + module_box.height);
    }
    if !min_x.is_finite() {
        return (0.0, 0.0);
    }
    (max_x - min_x, max_y - min_y)
}

/// Before/after deltas for the host undo log: one entry per node that
/// moved relative to the prior layout and per link whose route changed.
fn collect_deltas(
    model: &GraphModel,
    placements: &BTreeMap<String, NodePlacement>,
    routes: &[LinkRoute],
) -> Vec<PropChange> {
    let mut deltas = Vec::new();
    for id in &model.node_order {
        let Some(placement) = placements.get(id) else {
            continue;
        };
        let after = (placement.x, placement.y);
        let before = model.prior_positions.get(id).copied();
        if before != Some(after) {
            deltas.push(PropChange::NodeMoved {
                id: id.clone(),
                before,
                after,
            });
        }
    }
    for route in routes {
        let Some(points) = route.points() else {
            continue;
        };
        let before = model.prior_routes.get(&route.link);
        if before.map(|b| b.as_slice()) != Some(points) {
            deltas.push(PropChange::LinkRerouted {
                id: route.link.clone(),
                before: before.cloned(),
                after: points.to_vec(),
            });
        }
    }
    deltas
}
