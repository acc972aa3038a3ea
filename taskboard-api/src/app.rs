/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use taskboard_shared::store::MemoryBoardStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryBoardStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use taskboard_shared::{
    auth::middleware::{jwt_auth_middleware, AuthError},
    live::Broadcaster,
    services::{BoardService, MutationService},
    store::BoardStore,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Record store
    pub store: Arc<dyn BoardStore>,

    /// Board lifecycle service
    pub boards: BoardService,

    /// Column and card mutation service
    pub mutations: MutationService,

    /// Live connection registry
    pub broadcaster: Broadcaster,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services and a fresh broadcaster around `store`
    pub fn new(store: Arc<dyn BoardStore>, config: Config) -> Self {
        let broadcaster = Broadcaster::new(config.live.channel_capacity);
        Self::with_broadcaster(store, broadcaster, config)
    }

    pub fn with_broadcaster(
        store: Arc<dyn BoardStore>,
        broadcaster: Broadcaster,
        config: Config,
    ) -> Self {
        Self {
            boards: BoardService::new(store.clone()),
            mutations: MutationService::new(store.clone(), broadcaster.clone()),
            store,
            broadcaster,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # Health check (public)
/// ├── /ws/boards/:board_id?token=     # Live updates (token in query)
/// └── /v1/
///     ├── /auth/                      # register, login, refresh (public), me
///     └── /boards/                    # Boards, members, columns, cards (JWT)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let live_routes = Router::new().route("/ws/boards/:board_id", get(routes::live::board_socket));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let auth = middleware::from_fn_with_state(state.clone(), jwt_auth_layer);

    let session_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route_layer(auth.clone());

    let board_routes = Router::new()
        .route(
            "/",
            post(routes::boards::create_board).get(routes::boards::list_boards),
        )
        .route(
            "/:board_id",
            get(routes::boards::get_board)
                .put(routes::boards::update_board)
                .delete(routes::boards::delete_board),
        )
        .route("/:board_id/invite", post(routes::boards::invite_member))
        .route("/:board_id/members", get(routes::boards::list_members))
        .route("/:board_id/columns", post(routes::columns::create_column))
        .route(
            "/:board_id/columns/:column_id",
            put(routes::columns::update_column).delete(routes::columns::delete_column),
        )
        .route("/:board_id/cards", post(routes::cards::create_card))
        .route(
            "/:board_id/cards/:card_id",
            put(routes::cards::update_card).delete(routes::cards::delete_card),
        )
        .route("/:board_id/cards/:card_id/move", put(routes::cards::move_card))
        .route_layer(auth);

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_routes))
        .nest("/boards", board_routes);

    Router::new()
        .merge(health_routes)
        .merge(live_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS policy for the configured origins; `*` is permissive
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Runs the bearer-token check with the configured secret
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.config.jwt.secret.clone(), req, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskboard_shared::store::MemoryBoardStore;

    #[tokio::test]
    async fn test_app_state_shares_broadcaster() {
        let config = Config::in_memory("test-secret-key-at-least-32-bytes-long");
        let state = AppState::new(Arc::new(MemoryBoardStore::new()), config);

        let board_id = uuid::Uuid::new_v4();
        let _subscription = state.broadcaster.register(board_id).await;

        let clone = state.clone();
        assert_eq!(clone.broadcaster.connection_count(board_id).await, 1);
        assert_eq!(clone.jwt_secret(), "test-secret-key-at-least-32-bytes-long");
    }
}
