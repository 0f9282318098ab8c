use axum::routing::get;
use axum::Router;

use crate::ServiceState;

mod upcheck;
mod version;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/upcheck", get(upcheck::handler))
        .route("/version", get(version::handler))
        .with_state(state)
}
