use axum::{routing::get, Router};

pub fn router() -> Router<crate::core::AppState> {
    Router::new().route("/service/stack/health", get(health::health))
}

mod health {
    use serde_json::json;

    use crate::api::dispatch::{dispatch, DispatchResult};

    /// Liveness only; the database is not consulted.
    pub async fn health() -> DispatchResult {
        dispatch("health", || async { Ok(DispatchResult::ok(json!({"status": "OK"}))) }).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_support::{get, send, state_for};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn health_reports_ok() {
        for env in ["development", "staging", "production"] {
            let (status, _, body) =
                send(router(state_for(env)), get("/service/stack/health")).await;
            assert_eq!(status, StatusCode::OK);
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body, json!({"status": "OK"}));
        }
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _, _) =
            send(router(state_for("production")), get("/service/stack/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
