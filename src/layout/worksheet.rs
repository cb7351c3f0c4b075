use std::collections::BTreeMap;

use crate::model::GraphModel;
use crate::options::WorksheetParams;

use super::grid::snap;
use super::types::NodePlacement;

/// Worksheet layout: nodes in declaration order, row-major on a fixed
/// grid. The diagonal variant staggers each row by half a column pitch so
/// long rows read as a diagonal band; it is a mode of this algorithm, not
/// a separate one.
pub(super) fn worksheet_placements(
    model: &GraphModel,
    params: &WorksheetParams,
) -> BTreeMap<String, NodePlacement> {
    let columns = params.columns.max(1);
    let mut placements = BTreeMap::new();
    for (idx, id) in model.node_order.iter().enumerate() {
        let row = idx / columns;
        let col = idx % columns;
        let mut x = col as f32 * params.node_spacing;
        if params.diagonal {
            x += row as f32 * params.node_spacing * 0.5;
        }
        placements.insert(
            id.clone(),
            NodePlacement {
                x: snap(x),
                y: snap(row as f32 * params.row_spacing),
            },
        );
    }
    placements
}
