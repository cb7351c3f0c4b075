use std::collections::{BTreeMap, HashMap, HashSet};

use crate::cancel::CancelToken;
use crate::error::LayoutError;
use crate::model::{GraphModel, NodeKind};
use crate::options::GoodnessParams;

use super::types::{LinkRoute, NodePlacement, RouteOutcome};

/// Routing cell edge length in diagram units. Node sizes and spacing knobs
/// are multiples of this so node edges land on cell boundaries.
pub(crate) const CELL: f32 = 10.0;
/// A re-route must beat the incumbent by at least this much.
const IMPROVE_EPS: f32 = 1e-4;
/// Channel offsets (in cells) tried around the midpoint for Z candidates.
const CHANNEL_OFFSETS: [i32; 5] = [0, -1, 1, -2, 2];

pub(crate) fn snap(value: f32) -> f32 {
    (value / CELL).round() * CELL
}

type Cell = (i32, i32);
/// Occupant identity: link index plus interned bus-tree key. Links on the
/// same tree share trunk cells without conflicting.
type Occupant = (usize, Option<usize>);

/// Discretized occupancy surface for link routing. All state is scoped to
/// one router run.
#[derive(Debug, Default)]
pub(super) struct LinkPlacementGrid {
    blocked: HashSet<Cell>,
    occupancy: HashMap<Cell, Vec<Occupant>>,
    terminals: HashMap<Cell, Occupant>,
}

impl LinkPlacementGrid {
    fn cell_of(x: f32, y: f32) -> Cell {
        ((x / CELL).round() as i32, (y / CELL).round() as i32)
    }

    fn block_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let cx0 = (x0 / CELL).round() as i32;
        let cy0 = (y0 / CELL).round() as i32;
        let cx1 = ((x1 / CELL).round() as i32 - 1).max(cx0);
        let cy1 = ((y1 / CELL).round() as i32 - 1).max(cy0);
        for ix in cx0..=cx1 {
            for iy in cy0..=cy1 {
                self.blocked.insert((ix, iy));
            }
        }
    }

    /// Claim a terminal pad cell. No two terminals may resolve to the same
    /// cell unless they belong to the same bus tree.
    fn claim_terminal(&mut self, cell: Cell, claimant: Occupant) -> bool {
        if self.blocked.contains(&cell) {
            return false;
        }
        match self.terminals.get(&cell) {
            None => {
                self.terminals.insert(cell, claimant);
                true
            }
            Some(&(_, existing_tree)) => {
                existing_tree.is_some() && existing_tree == claimant.1
            }
        }
    }

    fn release_terminal(&mut self, cell: Cell, link_idx: usize) {
        if self.terminals.get(&cell).is_some_and(|&(idx, _)| idx == link_idx) {
            self.terminals.remove(&cell);
        }
    }

    fn path_is_legal(&self, cells: &[Cell], this: Occupant) -> bool {
        for cell in cells {
            if self.blocked.contains(cell) {
                return false;
            }
            if let Some(&(idx, tree)) = self.terminals.get(cell)
                && idx != this.0
                && !(tree.is_some() && tree == this.1)
            {
                return false;
            }
        }
        true
    }

    /// Grid-cell conflicts of a candidate against committed routes of
    /// other links (same-tree occupants excluded).
    fn conflicts(&self, cells: &[Cell], this: Occupant) -> u32 {
        let mut count = 0u32;
        for cell in cells {
            let Some(occupants) = self.occupancy.get(cell) else {
                continue;
            };
            for &(idx, tree) in occupants {
                if idx == this.0 {
                    continue;
                }
                if tree.is_some() && tree == this.1 {
                    continue;
                }
                count += 1;
            }
        }
        count
    }

    fn add_path(&mut self, cells: &[Cell], occupant: Occupant) {
        for cell in cells {
            self.occupancy.entry(*cell).or_default().push(occupant);
        }
    }

    fn remove_path(&mut self, cells: &[Cell], link_idx: usize) {
        for cell in cells {
            if let Some(occupants) = self.occupancy.get_mut(cell) {
                occupants.retain(|&(idx, _)| idx != link_idx);
                if occupants.is_empty() {
                    self.occupancy.remove(cell);
                }
            }
        }
    }
}

/// Cells under an orthogonal path, deduplicated in visit order.
fn cells_of_path(points: &[(f32, f32)]) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    let mut seen: HashSet<Cell> = HashSet::new();
    for segment in points.windows(2) {
        let (x1, y1) = segment[0];
        let (x2, y2) = segment[1];
        let dx = x2 - x1;
        let dy = y2 - y1;
        let len = (dx * dx + dy * dy).sqrt();
        let steps = ((len / CELL).ceil() as usize).max(1);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let cell = LinkPlacementGrid::cell_of(x1 + dx * t, y1 + dy * t);
            if seen.insert(cell) {
                cells.push(cell);
            }
        }
    }
    cells
}

/// Max perpendicular deviation of intermediate waypoints from the straight
/// start-to-end line.
fn path_deviation(points: &[(f32, f32)]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let (sx, sy) = points[0];
    let (ex, ey) = points[points.len() - 1];
    let dx = ex - sx;
    let dy = ey - sy;
    let len = (dx * dx + dy * dy).sqrt();
    let mut worst = 0.0f32;
    for &(px, py) in &points[1..points.len() - 1] {
        let dist = if len < 1e-6 {
            ((px - sx).powi(2) + (py - sy).powi(2)).sqrt()
        } else {
            ((px - sx) * dy - (py - sy) * dx).abs() / len
        };
        worst = worst.max(dist);
    }
    worst
}

fn clean_path(points: Vec<(f32, f32)>) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for point in points {
        if out.last() != Some(&point) {
            out.push(point);
        }
    }
    out
}

/// Orthogonal candidate paths between two pad points, in fixed order:
/// straight, the two L elbows, then Z detours through horizontal and
/// vertical channels near the midpoint.
fn candidate_paths(start: (f32, f32), end: (f32, f32)) -> Vec<Vec<(f32, f32)>> {
    let (sx, sy) = start;
    let (ex, ey) = end;
    let mut out: Vec<Vec<(f32, f32)>> = Vec::new();

    if (sx - ex).abs() < 1e-3 || (sy - ey).abs() < 1e-3 {
        out.push(vec![start, end]);
    }
    out.push(clean_path(vec![start, (sx, ey), end]));
    out.push(clean_path(vec![start, (ex, sy), end]));

    let mid_y = snap((sy + ey) * 0.5);
    for offset in CHANNEL_OFFSETS {
        let yc = mid_y + offset as f32 * CELL;
        out.push(clean_path(vec![start, (sx, yc), (ex, yc), end]));
    }
    let mid_x = snap((sx + ex) * 0.5);
    for offset in CHANNEL_OFFSETS {
        let xc = mid_x + offset as f32 * CELL;
        out.push(clean_path(vec![start, (xc, sy), (xc, ey), end]));
    }

    out.retain(|path| path.len() >= 2);
    out
}

/// Loop path hugging the right side of a node, for self-links.
fn self_loop_path(placement: &NodePlacement, kind: NodeKind) -> Vec<(f32, f32)> {
    let (width, height) = kind.size();
    let right = snap(placement.x + width / 2.0 + CELL);
    let out = right + 2.0 * CELL;
    let y_top = snap(placement.y - height / 4.0);
    let y_bottom = snap(placement.y + height / 4.0);
    clean_path(vec![
        (right, y_top),
        (out, y_top),
        (out, y_bottom),
        (right, y_bottom),
    ])
}

fn pad_offset(kind: NodeKind, pad: usize) -> f32 {
    let count = kind.pad_count();
    let pad = pad.min(count.saturating_sub(1));
    snap((pad as f32 - (count as f32 - 1.0) / 2.0) * CELL)
}

/// Source pads sit one cell below the bottom edge, target pads one cell
/// above the top edge.
fn source_pad(placement: &NodePlacement, kind: NodeKind, pad: usize) -> (f32, f32) {
    let (_, height) = kind.size();
    (
        snap(placement.x) + pad_offset(kind, pad),
        snap(placement.y + height / 2.0 + CELL),
    )
}

fn target_pad(placement: &NodePlacement, kind: NodeKind, pad: usize) -> (f32, f32) {
    let (_, height) = kind.size();
    (
        snap(placement.x) + pad_offset(kind, pad),
        snap(placement.y - height / 2.0 - CELL),
    )
}

struct Committed {
    points: Vec<(f32, f32)>,
    cells: Vec<Cell>,
    score: f32,
}

pub(super) struct RouterOutput {
    pub(super) routes: Vec<LinkRoute>,
    pub(super) goodness: f32,
}

/// Route every link on the placement grid, then run up to `passes`
/// hill-climbing improvement sweeps. Routing order and re-route order are
/// by link id, so identical input yields identical routes. A link with no
/// legal candidate is reported failed; the run continues.
pub(super) fn route_links(
    model: &GraphModel,
    placements: &BTreeMap<String, NodePlacement>,
    goodness: &GoodnessParams,
    passes: usize,
    cancel: &CancelToken,
) -> Result<RouterOutput, LayoutError> {
    let goodness = goodness.clamped();
    let mut grid = LinkPlacementGrid::default();
    for (id, placement) in placements {
        let Some(node) = model.nodes.get(id) else {
            continue;
        };
        let (width, height) = node.kind.size();
        grid.block_rect(
            snap(placement.x - width / 2.0),
            snap(placement.y - height / 2.0),
            snap(placement.x + width / 2.0),
            snap(placement.y + height / 2.0),
        );
    }

    let mut tree_keys: BTreeMap<&str, usize> = BTreeMap::new();
    for link in &model.links {
        if let Some(tree) = &link.tree_id {
            let next = tree_keys.len();
            tree_keys.entry(tree.as_str()).or_insert(next);
        }
    }
    let occupant_of = |idx: usize| -> Occupant {
        let tree = model.links[idx]
            .tree_id
            .as_deref()
            .and_then(|t| tree_keys.get(t).copied());
        (idx, tree)
    };

    let mut order: Vec<usize> = (0..model.links.len()).collect();
    order.sort_by(|&a, &b| {
        model.links[a]
            .id
            .cmp(&model.links[b].id)
            .then(a.cmp(&b))
    });

    let mut committed: Vec<Option<Committed>> = Vec::new();
    committed.resize_with(model.links.len(), || None);
    let mut failed: Vec<bool> = vec![false; model.links.len()];
    let mut endpoints: Vec<Option<((f32, f32), (f32, f32))>> = vec![None; model.links.len()];

    // Initial greedy routing.
    for &idx in &order {
        let link = &model.links[idx];
        let this = occupant_of(idx);
        let (Some(from), Some(to)) = (placements.get(&link.from), placements.get(&link.to))
        else {
            failed[idx] = true;
            continue;
        };
        let from_kind = model.nodes[&link.from].kind;
        let to_kind = model.nodes[&link.to].kind;

        if link.from == link.to {
            let points = self_loop_path(from, from_kind);
            let cells = cells_of_path(&points);
            if !grid.path_is_legal(&cells, this) {
                failed[idx] = true;
                continue;
            }
            let score = goodness.score(grid.conflicts(&cells, this), path_deviation(&points));
            grid.add_path(&cells, this);
            committed[idx] = Some(Committed { points, cells, score });
            continue;
        }

        let start = source_pad(from, from_kind, link.from_pad);
        let end = target_pad(to, to_kind, link.to_pad);
        let start_cell = LinkPlacementGrid::cell_of(start.0, start.1);
        let end_cell = LinkPlacementGrid::cell_of(end.0, end.1);
        if !grid.claim_terminal(start_cell, this) {
            failed[idx] = true;
            continue;
        }
        if !grid.claim_terminal(end_cell, this) {
            grid.release_terminal(start_cell, idx);
            failed[idx] = true;
            continue;
        }
        endpoints[idx] = Some((start, end));

        match best_candidate(&grid, &goodness, this, start, end) {
            Some((points, cells, score)) => {
                grid.add_path(&cells, this);
                committed[idx] = Some(Committed { points, cells, score });
            }
            None => {
                grid.release_terminal(start_cell, idx);
                grid.release_terminal(end_cell, idx);
                endpoints[idx] = None;
                failed[idx] = true;
            }
        }
    }

    // Hill-climbing improvement: re-route one link at a time with all
    // others fixed, keeping a re-route only on strict improvement. No
    // global optimum is promised; the budget bounds the work.
    for _ in 0..passes {
        if cancel.is_cancelled() {
            return Err(LayoutError::Cancelled);
        }
        let mut improved = false;
        for &idx in &order {
            let Some((start, end)) = endpoints[idx] else {
                continue;
            };
            let Some(current) = committed[idx].take() else {
                continue;
            };
            let this = occupant_of(idx);
            grid.remove_path(&current.cells, idx);
            let incumbent_score =
                goodness.score(grid.conflicts(&current.cells, this), path_deviation(&current.points));
            let replacement = best_candidate(&grid, &goodness, this, start, end);
            let chosen = match replacement {
                Some((points, cells, score)) if score + IMPROVE_EPS < incumbent_score => {
                    improved = true;
                    Committed { points, cells, score }
                }
                _ => Committed {
                    score: incumbent_score,
                    ..current
                },
            };
            grid.add_path(&chosen.cells, this);
            committed[idx] = Some(chosen);
        }
        if !improved {
            break;
        }
    }

    // Final scores against the settled occupancy.
    let mut total = 0.0f32;
    let mut routes: Vec<LinkRoute> = Vec::with_capacity(model.links.len());
    for (idx, link) in model.links.iter().enumerate() {
        let outcome = match &committed[idx] {
            Some(route) => {
                let this = occupant_of(idx);
                let own_cells = &route.cells;
                // Own entries are skipped by occupant identity, so no
                // removal is needed to score in place.
                let score =
                    goodness.score(grid.conflicts(own_cells, this), path_deviation(&route.points));
                total += score;
                RouteOutcome::Routed {
                    points: route.points.clone(),
                    score,
                }
            }
            None => {
                debug_assert!(failed[idx]);
                RouteOutcome::Failed
            }
        };
        routes.push(LinkRoute {
            link: link.id.clone(),
            outcome,
        });
    }

    Ok(RouterOutput {
        routes,
        goodness: total,
    })
}

/// Lowest-scoring legal candidate; the fixed generation order breaks
/// score ties deterministically.
fn best_candidate(
    grid: &LinkPlacementGrid,
    goodness: &GoodnessParams,
    this: Occupant,
    start: (f32, f32),
    end: (f32, f32),
) -> Option<(Vec<(f32, f32)>, Vec<Cell>, f32)> {
    let mut best: Option<(Vec<(f32, f32)>, Vec<Cell>, f32)> = None;
    for points in candidate_paths(start, end) {
        let cells = cells_of_path(&points);
        if !grid.path_is_legal(&cells, this) {
            continue;
        }
        let score = goodness.score(grid.conflicts(&cells, this), path_deviation(&points));
        if best.as_ref().is_none_or(|(_, _, b)| score + IMPROVE_EPS < *b) {
            best = Some((points, cells, score));
        }
    }
    best
}
