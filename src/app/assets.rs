use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

pub(crate) async fn index() -> Response {
    const INDEX_HTML: &str = "<!doctype html><html><head><title>Property Desk</title>\
<link rel=\"manifest\" href=\"/manifest.json\"></head><body></body></html>";
    (
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        INDEX_HTML,
    )
        .into_response()
}

pub(crate) async fn manifest() -> Response {
    let manifest = serde_json::json!({
        "name": "Property Desk",
        "short_name": "PropDesk",
        "start_url": "/agent-pannel",
        "display": "standalone",
        "icons": [{ "src": "/logo192.png", "sizes": "192x192", "type": "image/png" }],
    });
    (
        [
            (CONTENT_TYPE, "application/manifest+json"),
            (CACHE_CONTROL, "public, max-age=3600"),
        ],
        manifest.to_string(),
    )
        .into_response()
}

pub(crate) async fn favicon() -> Response {
    (StatusCode::NO_CONTENT, [(CACHE_CONTROL, "public, max-age=86400")]).into_response()
}
