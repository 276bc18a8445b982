//! StakeChess Web Server
//!
//! HTTP API over the in-memory session registry.
//! Endpoints:
//! - GET  /health                          - Health check
//! - GET  /metrics                         - Prometheus metrics
//! - GET  /sessions                        - List every session
//! - GET  /sessions/available              - Public lobby
//! - GET  /sessions/active                 - Sessions in play
//! - POST /sessions                        - Create a session
//! - GET  /sessions/:id                    - Session state and board
//! - POST /sessions/:id/join               - Take a seat (password for private sessions)
//! - POST /sessions/:id/stake              - Record a confirmed stake
//! - POST /sessions/:id/status             - Change session status
//! - POST /sessions/:id/pool               - Reconcile the prize pool
//! - POST /sessions/:id/spectators/join    - Spectator arrives
//! - POST /sessions/:id/spectators/leave   - Spectator leaves
//! - POST /sessions/:id/move               - Play a move
//! - GET  /sessions/:id/moves?x=&y=        - Legal destinations for a square

use anyhow::Context;
use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use engine_config::{load_config, CentralConfig};
use match_core::SessionRegistry;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

mod background;
mod handlers;
mod metrics;
mod storage;
mod types;

use handlers::{
    create_session, get_session, health, join_session, join_spectator, leave_spectator,
    list_active, list_available, list_sessions, make_move, metrics_handler, possible_moves,
    record_stake, update_pool, update_status,
};
use storage::{JsonFileStore, SessionStore};

/// Shared application state
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    /// Seats per session when a create request leaves it out
    pub default_max_players: usize,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        warn!("No allowed_origins configured, accepting requests from any origin");
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {:?}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the application router with the given state.
pub fn create_app(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/available", get(list_available))
        .route("/sessions/active", get(list_active))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/join", post(join_session))
        .route("/sessions/:id/stake", post(record_stake))
        .route("/sessions/:id/status", post(update_status))
        .route("/sessions/:id/pool", post(update_pool))
        .route("/sessions/:id/spectators/join", post(join_spectator))
        .route("/sessions/:id/spectators/leave", post(leave_spectator))
        .route("/sessions/:id/move", post(make_move))
        .route("/sessions/:id/moves", get(possible_moves))
        .route_layer(middleware::from_fn(metrics::track_latency))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Create application state for testing (fresh registry, no persistence)
#[cfg(test)]
pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState {
        registry: Arc::new(SessionRegistry::new()),
        default_max_players: match_core::DEFAULT_MAX_PLAYERS,
    })
}

/// Completes when Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}

fn init_tracing(config: &CentralConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.common.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from config.toml with env var overrides
    let config = load_config();
    init_tracing(&config);
    metrics::init_metrics();

    let waiting_ttl = chrono::Duration::from_std(config.session.waiting_ttl())
        .context("session.waiting_ttl_secs is out of range")?;
    let registry = Arc::new(SessionRegistry::with_waiting_ttl(waiting_ttl));

    let store: Arc<dyn SessionStore> = Arc::new(JsonFileStore::new(config.snapshot_path()));
    let restored = store
        .load()
        .await
        .with_context(|| format!("loading sessions from {}", config.snapshot_path().display()))?;
    let count = registry.restore(restored)?;
    info!(
        "Configuration: data_dir={}, snapshot={}, restored_sessions={}",
        config.common.data_dir,
        config.snapshot_path().display(),
        count
    );

    let mut tasks = vec![background::spawn_cleanup(
        Arc::clone(&registry),
        config.session.cleanup_interval(),
    )];
    if let Some(every) = config.session.snapshot_interval() {
        tasks.push(background::spawn_snapshots(
            Arc::clone(&registry),
            Arc::clone(&store),
            every,
        ));
    }

    let state = Arc::new(AppState {
        registry: Arc::clone(&registry),
        default_max_players: config.session.max_players,
    });
    let app = create_app(state, &config.web.allowed_origins);

    let addr = format!("{}:{}", config.web.host, config.web.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in tasks {
        task.abort();
    }
    let final_state = registry.shutdown();
    store
        .save(&final_state)
        .await
        .context("writing final snapshot")?;

    info!(sessions = final_state.len(), "Server shut down gracefully");
    Ok(())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        HealthResponse, MoveResponse, PossibleMovesResponse, SessionListResponse,
        SessionResponse,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use games_xiangqi::{Color, PieceKind};
    use match_core::{SessionId, Status};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(state: &Arc<AppState>) -> Router {
        create_app(Arc::clone(state), &[])
    }

    /// Helper to make a GET request and return response body as string
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    /// Helper to make a POST request with JSON body and return response
    async fn post_json(app: Router, uri: &str, json: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn create(state: &Arc<AppState>, json: &str) -> SessionResponse {
        let (status, body) = post_json(app(state), "/sessions", json).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        serde_json::from_str(&body).unwrap()
    }

    async fn create_public(state: &Arc<AppState>) -> SessionId {
        create(
            state,
            r#"{"title": "Lunch match", "stakeAmount": 0.1, "host": "0xHOST"}"#,
        )
        .await
        .id
    }

    async fn stake(state: &Arc<AppState>, id: SessionId, wallet: &str) -> (StatusCode, String) {
        post_json(
            app(state),
            &format!("/sessions/{id}/stake"),
            &format!(r#"{{"wallet": "{wallet}", "amount": 0.1}}"#),
        )
        .await
    }

    async fn activated(state: &Arc<AppState>) -> SessionId {
        let id = create_public(state).await;
        assert_eq!(stake(state, id, "0xA").await.0, StatusCode::OK);
        assert_eq!(stake(state, id, "0xB").await.0, StatusCode::OK);
        id
    }

    async fn play(
        state: &Arc<AppState>,
        id: SessionId,
        from: (u8, u8),
        to: (u8, u8),
    ) -> (StatusCode, String) {
        post_json(
            app(state),
            &format!("/sessions/{id}/move"),
            &format!(
                r#"{{"from": {{"x": {}, "y": {}}}, "to": {{"x": {}, "y": {}}}}}"#,
                from.0, from.1, to.0, to.1
            ),
        )
        .await
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state();
        let (status, body) = get(app(&state), "/health").await;

        assert_eq!(status, StatusCode::OK);
        let response: HealthResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.status, "ok");
        assert_eq!(response.sessions, 0);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        metrics::init_metrics();
        let state = create_test_state();
        let (status, body) = get(app(&state), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("web_sessions_created_total"));
    }

    #[tokio::test]
    async fn test_create_session_returns_initial_board() {
        let state = create_test_state();
        let session = create(
            &state,
            r#"{"title": "Lunch match", "stakeAmount": 0.1, "host": "0xHOST"}"#,
        )
        .await;

        assert_eq!(session.status, Status::Waiting);
        assert_eq!(session.max_players, 2);
        assert_eq!(session.stake_count, 0);
        assert_eq!(session.current_player, Color::Red);
        assert_eq!(session.move_count, 0);
        assert_eq!(session.board.len(), 10);
        assert!(session.board.iter().all(|row| row.len() == 9));
        let red_general = session.board[9][4].unwrap();
        assert_eq!(red_general.kind, PieceKind::General);
        assert_eq!(red_general.color, Color::Red);
    }

    #[tokio::test]
    async fn test_create_session_invalid() {
        let state = create_test_state();
        let (status, body) = post_json(
            app(&state),
            "/sessions",
            r#"{"title": "", "stakeAmount": 0.1, "host": "0xHOST"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("title"));
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_session_json_shape_hides_password() {
        let state = create_test_state();
        let session = create(
            &state,
            r#"{"title": "Secret", "stakeAmount": 1.0, "host": "0xHOST",
                "isPrivate": true, "password": "hunter2"}"#,
        )
        .await;

        let (status, body) = get(app(&state), &format!("/sessions/{}", session.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("hunter2"));
        assert!(!body.contains("password"));

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        for key in [
            "id",
            "title",
            "stakeAmount",
            "players",
            "maxPlayers",
            "status",
            "isPrivate",
            "createdAt",
            "host",
            "spectators",
            "poolAmount",
            "stakeCount",
            "board",
            "currentPlayer",
            "moveCount",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["board"][0][0]["type"], "chariot");
        assert_eq!(value["board"][0][0]["color"], "black");
        assert!(value["board"][4][0].is_null());
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let state = create_test_state();
        let (status, body) = get(app(&state), &format!("/sessions/{}", SessionId::new())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("not found"));

        let (status, _) = get(app(&state), "/sessions/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listings() {
        let state = create_test_state();
        let open = create_public(&state).await;
        create(
            &state,
            r#"{"title": "Secret", "stakeAmount": 1.0, "host": "0xHOST",
                "isPrivate": true, "password": "pw"}"#,
        )
        .await;
        let live = activated(&state).await;

        let (_, body) = get(app(&state), "/sessions").await;
        let all: SessionListResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(all.sessions.len(), 3);

        let (_, body) = get(app(&state), "/sessions/available").await;
        let available: SessionListResponse = serde_json::from_str(&body).unwrap();
        let ids: Vec<_> = available.sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![open]);

        let (_, body) = get(app(&state), "/sessions/active").await;
        let active: SessionListResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(active.sessions.len(), 1);
        assert_eq!(active.sessions[0].id, live);
    }

    #[tokio::test]
    async fn test_join_private_session() {
        let state = create_test_state();
        let id = create(
            &state,
            r#"{"title": "Secret", "stakeAmount": 1.0, "host": "0xHOST",
                "isPrivate": true, "password": "pw"}"#,
        )
        .await
        .id;
        let uri = format!("/sessions/{id}/join");

        let (status, _) = post_json(app(&state), &uri, r#"{"wallet": "0xA"}"#).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) =
            post_json(app(&state), &uri, r#"{"wallet": "0xA", "password": "pw"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let session: SessionResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(session.players, vec!["0xA".to_string()]);
    }

    #[tokio::test]
    async fn test_staking_activates_and_rejects_third_wallet() {
        let state = create_test_state();
        let id = create_public(&state).await;

        let (_, body) = stake(&state, id, "0xA").await;
        let session: SessionResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(session.status, Status::Waiting);

        let (_, body) = stake(&state, id, "0xB").await;
        let session: SessionResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(session.status, Status::Active);
        assert_eq!(session.stake_count, 2);
        assert_eq!(session.pool_amount, 0.2);

        let (status, body) = stake(&state, id, "0xC").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("full"));
    }

    #[tokio::test]
    async fn test_stake_invalid_amount() {
        let state = create_test_state();
        let id = create_public(&state).await;
        let (status, _) = post_json(
            app(&state),
            &format!("/sessions/{id}/stake"),
            r#"{"wallet": "0xA", "amount": -1}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_move_before_activation_conflicts() {
        let state = create_test_state();
        let id = create_public(&state).await;
        let (status, body) = play(&state, id, (1, 9), (2, 7)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("not active"));
    }

    #[tokio::test]
    async fn test_move_flow() {
        let state = create_test_state();
        let id = activated(&state).await;

        let (status, body) = play(&state, id, (1, 9), (2, 7)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let response: MoveResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.record.sequence_number, 1);
        assert!(!response.finished);
        assert_eq!(response.session.current_player, Color::Black);
        assert_eq!(response.session.move_count, 1);
        assert!(response.session.board[9][1].is_none());

        // Red may not move twice
        let (status, body) = play(&state, id, (7, 9), (6, 7)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("illegal move"));
    }

    #[tokio::test]
    async fn test_capturing_general_finishes_session() {
        let state = create_test_state();
        let id = activated(&state).await;

        // Red cannon to the centre file, takes the centre soldier over its
        // own soldier, then takes the General using the Black advisor as screen
        for (from, to) in [
            ((1, 7), (4, 7)),
            ((3, 0), (4, 1)),
            ((4, 7), (4, 3)),
            ((8, 3), (8, 4)),
        ] {
            let (status, body) = play(&state, id, from, to).await;
            assert_eq!(status, StatusCode::OK, "{body}");
        }
        let (status, body) = play(&state, id, (4, 3), (4, 0)).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        let response: MoveResponse = serde_json::from_str(&body).unwrap();
        assert!(response.finished);
        assert_eq!(response.winner, Some(Color::Red));
        assert_eq!(response.session.status, Status::Finished);
        assert_eq!(
            state.registry.get(id).unwrap().status(),
            Status::Finished
        );

        // The beaten side cannot keep playing
        let (status, body) = play(&state, id, (4, 1), (3, 2)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("not active"));
        assert_eq!(state.registry.get(id).unwrap().board().moves().len(), 5);
    }

    #[tokio::test]
    async fn test_finish_twice_conflicts() {
        let state = create_test_state();
        let id = activated(&state).await;
        let uri = format!("/sessions/{id}/status");

        let (status, body) = post_json(app(&state), &uri, r#"{"status": "finished"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let session: SessionResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(session.status, Status::Finished);

        let (status, body) = post_json(app(&state), &uri, r#"{"status": "finished"}"#).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("finished -> finished"));
    }

    #[tokio::test]
    async fn test_possible_moves_endpoint() {
        let state = create_test_state();
        let id = create_public(&state).await;

        let (status, body) = get(app(&state), &format!("/sessions/{id}/moves?x=1&y=9")).await;
        assert_eq!(status, StatusCode::OK);
        let response: PossibleMovesResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(response.moves.len(), 2);

        // Black piece while Red is to move
        let (_, body) = get(app(&state), &format!("/sessions/{id}/moves?x=1&y=0")).await;
        let response: PossibleMovesResponse = serde_json::from_str(&body).unwrap();
        assert!(response.moves.is_empty());
    }

    #[tokio::test]
    async fn test_status_and_pool_updates() {
        let state = create_test_state();
        let id = activated(&state).await;

        let (status, body) = post_json(
            app(&state),
            &format!("/sessions/{id}/pool"),
            r#"{"amount": 0.19}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session: SessionResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(session.pool_amount, 0.19);

        let uri = format!("/sessions/{id}/status");
        let (status, _) = post_json(app(&state), &uri, r#"{"status": "waiting"}"#).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = post_json(app(&state), &uri, r#"{"status": "finished"}"#).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = post_json(app(&state), &uri, r#"{"status": "active"}"#).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_spectator_counter() {
        let state = create_test_state();
        let id = create_public(&state).await;

        post_json(app(&state), &format!("/sessions/{id}/spectators/join"), "").await;
        let (status, body) =
            post_json(app(&state), &format!("/sessions/{id}/spectators/join"), "").await;
        assert_eq!(status, StatusCode::OK);
        let session: SessionResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(session.spectators, 2);

        for _ in 0..3 {
            post_json(app(&state), &format!("/sessions/{id}/spectators/leave"), "").await;
        }
        assert_eq!(state.registry.get(id).unwrap().spectator_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_registry_rejects_writes() {
        let state = create_test_state();
        let id = create_public(&state).await;
        state.registry.shutdown();

        let (status, _) = stake(&state, id, "0xA").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = get(app(&state), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
