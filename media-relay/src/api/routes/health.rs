//! Liveness routes for external uptime monitors.

use axum::{Json, Router, extract::State, response::Html, routing::get};
use chrono::Utc;

use crate::api::models::UptimeResponse;
use crate::api::server::AppState;

/// Create the liveness router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/uptime", get(uptime_check))
}

/// Small HTML status page for browser-based monitoring.
async fn home(State(state): State<AppState>) -> Html<String> {
    let (last_check, served) = state.touch_liveness();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Service Status</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body {{
            font-family: Arial, sans-serif;
            text-align: center;
            padding: 50px;
            background-color: #f5f5f5;
        }}
        .container {{
            background-color: white;
            padding: 30px;
            border-radius: 10px;
            box-shadow: 0 0 10px rgba(0,0,0,0.1);
            display: inline-block;
        }}
        h1 {{
            color: #333;
        }}
        .status {{
            font-size: 24px;
            margin: 20px 0;
            padding: 10px;
            border-radius: 5px;
            background-color: #4CAF50;
            color: white;
        }}
        .info {{
            margin: 10px 0;
            color: #666;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Service Status</h1>
        <div class="status">ONLINE</div>
        <div class="info">Last check: {last_check}</div>
        <div class="info">Requests served: {served}</div>
        <div class="info">Server time: {now}</div>
    </div>
</body>
</html>"#,
        now = Utc::now(),
    ))
}

/// Liveness probe, exempt from rate limiting.
#[utoipa::path(
    get,
    path = "/uptime",
    tag = "health",
    responses(
        (status = 200, description = "Service is online", body = UptimeResponse)
    )
)]
pub async fn uptime_check(State(state): State<AppState>) -> Json<UptimeResponse> {
    let (last_check, served) = state.touch_liveness();

    Json(UptimeResponse {
        status: "online".to_string(),
        last_check,
        requests_served: served,
        server_time: Utc::now(),
    })
}
