use std::collections::BTreeMap;

use serde::Serialize;

/// Computed node position (center of the node body).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodePlacement {
    pub x: f32,
    pub y: f32,
}

/// Outcome of routing a single link. A failure here never aborts the run;
/// the caller decides whether to retry coarser or accept a fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteOutcome {
    Routed { points: Vec<(f32, f32)>, score: f32 },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkRoute {
    pub link: String,
    pub outcome: RouteOutcome,
}

impl LinkRoute {
    pub fn points(&self) -> Option<&[(f32, f32)]> {
        match &self.outcome {
            RouteOutcome::Routed { points, .. } => Some(points),
            RouteOutcome::Failed => None,
        }
    }
}

/// Overlay module box after the selected re-layout policy ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayBoxLayout {
    pub overlay: String,
    pub module: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Before/after geometry delta, emitted for an external undo log. The
/// engine creates these at the end of a run and never retains them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropChange {
    NodeMoved {
        id: String,
        before: Option<(f32, f32)>,
        after: (f32, f32),
    },
    LinkRerouted {
        id: String,
        before: Option<Vec<(f32, f32)>>,
        after: Vec<(f32, f32)>,
    },
}

/// Complete, atomically produced output of one layout run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub placements: BTreeMap<String, NodePlacement>,
    pub routes: Vec<LinkRoute>,
    pub overlay_boxes: Vec<OverlayBoxLayout>,
    /// Total routing goodness (lower is better) after the pass budget.
    pub goodness: f32,
    /// Edge crossings between adjacent layers after crossing reduction;
    /// zero for the alternate strategies, which do not layer.
    pub crossings: usize,
    pub deltas: Vec<PropChange>,
    pub width: f32,
    pub height: f32,
}
