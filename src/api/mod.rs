use crate::core::{AppState, Environment};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod dispatch;
mod docs;
mod routes;

pub fn router(state: AppState) -> Router {
    let mut app = Router::new().merge(routes::router());

    if state.profile.environment == Environment::Development {
        app = app.merge(docs::router());
        tracing::info!("Swagger UI has been registered at {}.", docs::SWAGGER_URL);
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
