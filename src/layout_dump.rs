use std::path::Path;

use crate::layout::LayoutResult;

/// Pretty-printed JSON snapshot of a layout result, for eyeballing what
/// the engine produced on a problem diagram.
pub fn layout_dump_string(result: &LayoutResult) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn write_layout_dump(path: &Path, result: &LayoutResult) -> anyhow::Result<()> {
    std::fs::write(path, layout_dump_string(result)?)?;
    Ok(())
}
