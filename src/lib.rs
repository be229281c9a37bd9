//! Application assembly: wires every protocol crate's routes into one
//! dispatcher, builds the `AppState`, and exposes the axum `Router` plus the
//! bootstrap task `main.rs` drives to completion and shutdown.

pub mod admin;
pub mod bootstrap;
pub mod config;
pub mod persistence;

use std::sync::Arc;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use eyre::Result;
use mediator_core::{AppState, MessageRouter, ProxyConfig};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use admin::ServerState;
use bootstrap::Bootstrap;
use config::Settings;
use persistence::Persistence;

fn protocol_routes() -> MessageRouter {
    connections_legacy::routes()
        .merge(oob_didexchange::routes())
        .merge(mediator_coordination::routes())
        .merge(routing::routes())
        .merge(basic_message::routes())
}

/// Everything `main.rs` needs to run the process: the HTTP router, the
/// one-shot bootstrap future to spawn alongside the server, and the
/// persistence handle (if any) to flush the registry to on shutdown.
pub struct Application {
    pub router: Router,
    pub app: Arc<AppState>,
    pub bootstrap_task: tokio::task::JoinHandle<()>,
    pub bootstrap: Arc<Bootstrap>,
    pub persistence: Option<Arc<Persistence>>,
}

/// Builds the application: loads (or opens fresh) the persistence backend,
/// recalls any stored connections, and spawns the bootstrap sequence that
/// establishes the mediator and agent connections this process still lacks.
pub async fn app(settings: Settings) -> Result<Application> {
    let config = ProxyConfig {
        endpoint: settings.endpoint.clone(),
        poll_interval_secs: settings.poll_interval.as_secs(),
    };
    let app_state = Arc::new(AppState::new(config, protocol_routes()));

    let persistence = Persistence::open(&settings).await?;
    if let Some(p) = &persistence {
        p.restore(&app_state.registry).await?;
    }

    let (bootstrap, mediator_invite_rx) = Bootstrap::new(app_state.clone());

    let bootstrap_task = {
        let bootstrap = bootstrap.clone();
        let config_invite = settings.mediator_invite.clone();
        let poll_interval = settings.poll_interval;
        let persistence = persistence.clone();
        tokio::spawn(async move {
            if let Err(e) = bootstrap::run(bootstrap, mediator_invite_rx, config_invite, poll_interval, persistence).await {
                tracing::error!(error = %e, "bootstrap sequence failed");
            }
        })
    };

    let server_state = ServerState {
        app: app_state.clone(),
        bootstrap: bootstrap.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let router = Router::new()
        .route("/", post(admin::receive_message))
        .route("/retrieve_agent_invitation", get(admin::retrieve_agent_invitation))
        .route("/receive_mediator_invitation", post(admin::receive_mediator_invitation))
        .route("/status", get(admin::status))
        .with_state(server_state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(cors);

    Ok(Application {
        router,
        app: app_state,
        bootstrap_task,
        bootstrap,
        persistence,
    })
}
