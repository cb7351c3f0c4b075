use thiserror::Error;

/// Fatal layout failures. Per-link routing trouble is not here: it is
/// reported inside the result so the rest of the run can still complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("link `{link}` endpoint `{endpoint}` does not resolve to a node")]
    DanglingLink { link: String, endpoint: String },

    #[error("node `{node}` names unknown hierarchy parent `{parent}`")]
    UnknownParent { node: String, parent: String },

    #[error("hierarchy cycle through node `{node}`")]
    HierarchyCycle { node: String },

    #[error("layout cancelled")]
    Cancelled,
}
