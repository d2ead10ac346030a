use std::sync::Arc;

use axum::{Router, extract::State, response::Redirect, routing::get};

use crate::config::config_model::Landing;

pub fn routes(landing: Landing) -> Router {
    Router::new()
        .route("/", get(redirect_to_authentication))
        .with_state(Arc::new(landing))
}

/// The landing page has no content of its own; visitors go straight to sign-in.
pub async fn redirect_to_authentication(State(landing): State<Arc<Landing>>) -> Redirect {
    Redirect::temporary(&landing.authentication_path)
}
