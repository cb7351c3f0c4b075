pub mod cancel;
pub mod error;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod options;

pub use cancel::CancelToken;
pub use error::LayoutError;
pub use layout::{
    LayoutResult, LinkRoute, NodePlacement, OverlayBoxLayout, PropChange, RouteOutcome,
    compute_layout,
};
pub use model::{GraphModel, GraphNode, Link, NodeKind, Overlay, OverlayModule};
pub use options::{
    GoodnessParams, HaloParams, LayeringMethod, LayoutOptions, LayoutStrategy, MAX_OPT_PASSES,
    OverlayOption, StackedBlockParams, WorksheetParams, preset,
};
