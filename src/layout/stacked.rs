use std::collections::{BTreeMap, HashMap};

use crate::model::GraphModel;
use crate::options::StackedBlockParams;

use super::grid::snap;
use super::types::NodePlacement;

/// StackedBlock layout: one block per hierarchy root (the root plus all of
/// its descendants, in declaration order), members in row-major rows,
/// blocks stacked top to bottom with a gap between them.
pub(super) fn stacked_placements(
    model: &GraphModel,
    params: &StackedBlockParams,
) -> BTreeMap<String, NodePlacement> {
    let per_row = params.max_per_row.max(1);
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for id in &model.node_order {
        if let Some(parent) = model.nodes.get(id).and_then(|n| n.parent.as_deref()) {
            children.entry(parent).or_default().push(id.as_str());
        }
    }

    let mut placements = BTreeMap::new();
    let mut block_y = 0.0f32;
    for root in &model.node_order {
        if model.nodes.get(root).and_then(|n| n.parent.as_deref()).is_some() {
            continue;
        }
        let mut members: Vec<&str> = Vec::new();
        let mut stack = vec![root.as_str()];
        while let Some(current) = stack.pop() {
            members.push(current);
            if let Some(kids) = children.get(current) {
                // Reverse push keeps declaration order on pop.
                for kid in kids.iter().rev() {
                    stack.push(kid);
                }
            }
        }

        let rows = members.len().div_ceil(per_row);
        for (idx, id) in members.iter().enumerate() {
            let row = idx / per_row;
            let col = idx % per_row;
            placements.insert(
                id.to_string(),
                NodePlacement {
                    x: snap(col as f32 * params.node_spacing),
                    y: snap(block_y + row as f32 * params.row_spacing),
                },
            );
        }
        block_y += rows as f32 * params.row_spacing + params.block_gap;
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;

    #[test]
    fn blocks_stack_with_gap() {
        let mut model = GraphModel::new();
        model.ensure_node("r1", NodeKind::Gene);
        model.ensure_node("c1", NodeKind::Bubble);
        model.ensure_node("r2", NodeKind::Gene);
        model.set_parent("c1", "r1");
        let params = StackedBlockParams {
            max_per_row: 4,
            block_gap: 60.0,
            node_spacing: 100.0,
            row_spacing: 70.0,
            ..StackedBlockParams::default()
        };
        let placements = stacked_placements(&model, &params);
        assert_eq!(placements["r1"].y, 0.0);
        assert_eq!(placements["c1"].y, 0.0);
        assert_eq!(placements["c1"].x, 100.0);
        // One row in block 1, then the gap.
        assert_eq!(placements["r2"].y, 130.0);
    }

    #[test]
    fn rows_wrap_at_cap() {
        let mut model = GraphModel::new();
        model.ensure_node("r", NodeKind::Gene);
        for i in 0..5 {
            let id = format!("c{i}");
            model.ensure_node(&id, NodeKind::Bubble);
            model.set_parent(&id, "r");
        }
        let params = StackedBlockParams {
            max_per_row: 3,
            node_spacing: 100.0,
            row_spacing: 70.0,
            ..StackedBlockParams::default()
        };
        let placements = stacked_placements(&model, &params);
        assert_eq!(placements["r"].y, 0.0);
        assert_eq!(placements["c2"].y, 70.0);
        assert_eq!(placements["c2"].x, 0.0);
        assert_eq!(placements["c4"].x, 200.0);
    }
}
