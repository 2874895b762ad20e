//! API server initialization

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthState, require_api_key};
use super::routes::{MeterApiState, health, latency, relays};
use crate::core::ShutdownService;
use crate::domain::{IngestService, Meter};

pub struct ApiServer {
    state: MeterApiState,
    auth: AuthState,
    port: u16,
    shutdown: ShutdownService,
}

impl ApiServer {
    pub fn new(
        api_keys: HashSet<String>,
        port: u16,
        meter: Arc<Meter>,
        ingest: Arc<IngestService>,
        shutdown: ShutdownService,
    ) -> Self {
        Self {
            state: MeterApiState { meter, ingest },
            auth: AuthState {
                api_keys: Arc::new(api_keys),
            },
            port,
            shutdown,
        }
    }

    /// Serve until the shutdown signal fires
    pub async fn start(self) -> Result<()> {
        let Self {
            state,
            auth,
            port,
            shutdown,
        } = self;

        let v1 = Router::new()
            .route("/relays", get(relays::total_relays))
            .route("/relays/portal_apps", get(relays::all_portal_apps_relays))
            .route("/relays/portal_apps/{id}", get(relays::portal_app_relays))
            .route("/relays/users/{id}", get(relays::user_relays))
            .route(
                "/relays/origin-classification",
                get(relays::all_relays_origin),
            )
            .route(
                "/relays/origin-classification/{origin}",
                get(relays::relays_origin),
            )
            .route("/relays/counts", post(relays::ingest_relay_counts))
            .route("/latency/portal_apps", get(latency::all_apps_latencies))
            .route("/latency/portal_apps/{id}", get(latency::app_latency))
            .layer(axum::middleware::from_fn_with_state(auth, require_api_key))
            .with_state(state);

        let router = Router::new()
            .route("/", get(health::health))
            .route("/healthz", get(health::health))
            .nest("/v1", v1)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::debug!("API server stopped");
        Ok(())
    }
}
