use axum::http::Uri;
use axum::response::{Html, IntoResponse};

use crate::core::errors::ApiError;

const INDEX_HTML: &str = include_str!("../../../static/index.html");

pub async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
