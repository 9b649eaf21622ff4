use axum::extract::{FromRef, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use reflector_core::RoomId;
use reflector_server::{ws_handler, RoomRegistry, ServerConfig};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub registry: RoomRegistry,
    pub config: ServerConfig,
}

impl FromRef<AppState> for RoomRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(lobby))
        .route("/conference/create", get(create_conference).post(create_conference))
        .route("/room/:room_id", get(room_page))
        .route("/websocket/:room_id/join", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

async fn lobby() -> impl IntoResponse {
    render("templates/lobby.html", "{{title}}", "Conference - Lobby").await
}

async fn create_conference() -> impl IntoResponse {
    let room_id = RoomId::generate();
    (
        StatusCode::FOUND,
        [(header::LOCATION, format!("/room/{room_id}"))],
    )
}

async fn room_page(
    Path(room_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let websocket_url = format!(
        "{}://{}/websocket/{}/join",
        state.config.schema.websocket_scheme(),
        state.config.host,
        room_id,
    );
    render("templates/room.html", "{{websocket_url}}", &websocket_url).await
}

/// Pages are plain HTML files with a single placeholder, read per request
/// so they can be edited without a rebuild.
async fn render(path: &str, placeholder: &str, value: &str) -> axum::response::Response {
    match tokio::fs::read_to_string(path).await {
        Ok(page) => Html(page.replace(placeholder, value)).into_response(),
        Err(e) => {
            error!("failed to read template {path}: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
