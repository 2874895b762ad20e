//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::traits::{RelaySource, UsageReporter, UsageWriter};
use crate::data::{HttpRelaySource, PortalClient, PostgresService, TelemetryService};
use crate::domain::{Collector, IngestService, Meter, MeterConfig};

/// Shared bootstrap for the two processes
///
/// The meter (API server) and the collector deploy as independent binaries
/// sharing only the durable store; both start from the same configuration
/// and PostgreSQL pool wiring.
pub struct CoreApp {
    pub config: AppConfig,
    pub shutdown: ShutdownService,
    pub postgres: Arc<PostgresService>,
}

impl CoreApp {
    async fn init() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let config = AppConfig::load().context("loading configuration")?;
        let postgres = Arc::new(
            PostgresService::init(&config.postgres)
                .await
                .context("initializing PostgreSQL")?,
        );
        let shutdown = ShutdownService::new();

        Ok(Self {
            config,
            shutdown,
            postgres,
        })
    }

    /// Entry point for the meter API server process
    pub async fn run_meter() -> Result<()> {
        let app = Self::init().await?;
        app.shutdown.install_signal_handlers();

        let portal = Arc::new(
            PortalClient::new(&app.config.portal).context("initializing portal client")?,
        );

        let reporter: Arc<dyn UsageReporter> = app.postgres.clone();
        let meter = Arc::new(Meter::new(
            reporter,
            portal,
            MeterConfig {
                load_interval: Duration::from_secs(app.config.meter.load_interval_secs),
                daily_ttl: Duration::from_secs(app.config.meter.daily_ttl_secs),
                todays_ttl: Duration::from_secs(app.config.meter.todays_ttl_secs),
                max_past_days: app.config.meter.max_past_days,
            },
        ));
        app.shutdown
            .register(meter.start_loader(app.shutdown.subscribe()))
            .await;

        let writer: Arc<dyn UsageWriter> = app.postgres.clone();
        let ingest = Arc::new(IngestService::new(writer));

        let server = ApiServer::new(
            app.config.api_keys.clone(),
            app.config.server.port,
            meter,
            ingest,
            app.shutdown.clone(),
        );
        server.start().await?;

        app.shutdown.shutdown().await;
        app.postgres.close().await;
        Ok(())
    }

    /// Entry point for the collector process
    pub async fn run_collector() -> Result<()> {
        let app = Self::init().await?;
        app.shutdown.install_signal_handlers();

        let telemetry: Arc<dyn RelaySource> = Arc::new(
            TelemetryService::init(&app.config.clickhouse)
                .context("initializing ClickHouse client")?,
        );
        let http_ingest: Arc<dyn RelaySource> = Arc::new(HttpRelaySource::new(&app.postgres));
        let writer: Arc<dyn UsageWriter> = app.postgres.clone();

        let collector = Arc::new(Collector::new(
            vec![telemetry, http_ingest],
            writer,
            chrono::Duration::days(app.config.collector.max_archive_age_days),
            Duration::from_secs(app.config.collector.collection_interval_secs),
            Duration::from_secs(app.config.collector.report_interval_secs),
        )?);
        app.shutdown
            .register(collector.start(app.shutdown.subscribe()))
            .await;

        tracing::info!(
            interval_secs = app.config.collector.collection_interval_secs,
            "Collector running"
        );

        app.shutdown.wait().await;
        app.shutdown.shutdown().await;
        app.postgres.close().await;
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
