//! Taxonomy tree export

use axum::{extract::State, routing::get, Json, Router};

use crate::services::TreeNodeView;
use crate::AppState;

/// GET /api/tree
///
/// Whole tree from the root; branches without photos are omitted.
pub async fn get_tree(State(state): State<AppState>) -> Json<TreeNodeView> {
    let view = state.registry.render_tree();
    tracing::debug!(photos = view.photocount, "Tree exported");
    Json(view)
}

pub fn tree_routes() -> Router<AppState> {
    Router::new().route("/api/tree", get(get_tree))
}
