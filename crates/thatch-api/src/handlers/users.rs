use axum::extract::State;

use thatch_core::wire::UsersResponse;

use super::ApiState;
use crate::error::Json;

/// Every known user, the local one included, sorted by name.
pub async fn handle_list_users(State(state): State<ApiState>) -> Json<UsersResponse> {
    let mut users = state.node.list_users();
    users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Json(UsersResponse { users })
}
