use axum::extract::State;

use crate::handlers::AppState;

pub async fn prometheus(State(state): State<AppState>) -> String {
    state.metrics.render()
}
