use axum::{
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::core::AppState;

pub const SWAGGER_URL: &str = "/api/docs";
pub const API_URL: &str = "/static/swagger.yaml";

const OPENAPI_DOC: &str = include_str!("../../static/swagger.yaml");

pub fn router() -> Router<AppState> {
    Router::new()
        .route(SWAGGER_URL, get(swagger_ui))
        .route(API_URL, get(openapi_doc))
}

async fn swagger_ui() -> Html<String> {
    Html(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Stack Service</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "{API_URL}", dom_id: "#swagger-ui" }});
  </script>
</body>
</html>"##
    ))
}

async fn openapi_doc() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], OPENAPI_DOC)
}
