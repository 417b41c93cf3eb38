//! Main application orchestration.
//!
//! Wires configuration into live components and runs the quoting loop:
//! - Endpoint registry built from config, probed in the background
//! - HTTP book source behind the caching price feed
//! - Ledger client for position and slot reads
//! - Wallet-signed HTTP gateway, or a recording mock in dry-run mode
//! - Telemetry server plus signal-driven graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use maker_exec::{
    DynExecutionClient, DynSigner, EnvelopeSigner, HttpGateway, MockGateway, NoopSigner,
    WalletSigner,
};
use maker_feed::{
    DynBookSource, DynPositionSource, DynSlotSource, HttpBookSource, LedgerClient, PriceFeed,
};
use maker_registry::EndpointRegistry;
use maker_telemetry::{DynMetricsSink, HealthState, NoopSink, PrometheusSink};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::engine::QuotingEngine;
use crate::error::{AppError, AppResult};

/// Interval between background endpoint health probes.
const PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Main application.
pub struct Application {
    engine: QuotingEngine,
    health: HealthState,
    registry: Arc<EndpointRegistry>,
    metrics_port: Option<u16>,
}

impl Application {
    /// Wire all components from the merged configuration.
    ///
    /// In dry-run mode orders go to a recording mock and no signing key
    /// is required; market data still flows through the real endpoints.
    pub fn new(config: AppConfig, dry_run: bool, no_metrics: bool) -> AppResult<Self> {
        if config.endpoints.is_empty() {
            return Err(AppError::Preflight(
                "No read endpoints configured; add at least one [[endpoints]] entry".to_string(),
            ));
        }
        let registry = Arc::new(EndpointRegistry::new(config.endpoints.clone()));
        info!(endpoints = registry.len(), "Endpoint registry ready");

        let metrics: DynMetricsSink = if no_metrics {
            warn!("Metrics disabled, using noop sink");
            Arc::new(NoopSink)
        } else {
            Arc::new(PrometheusSink)
        };
        let metrics_port = (!no_metrics).then_some(config.telemetry.metrics_port);

        // Per-request timeouts come from the endpoint entries, so the
        // shared client carries no global deadline.
        let client = reqwest::Client::new();

        let book_source: DynBookSource = Arc::new(HttpBookSource::new(
            client.clone(),
            registry.clone(),
            config.symbol.clone(),
        ));
        let feed = PriceFeed::new(book_source, config.feed.clone(), metrics.clone());

        let signer = build_signer(&config, dry_run)?;
        let ledger = Arc::new(LedgerClient::new(
            client,
            registry.clone(),
            signer.authority(),
            config.market_id,
        ));
        let position_source: DynPositionSource = ledger.clone();

        let exec: DynExecutionClient = if dry_run {
            info!("Dry-run mode: orders go to a recording mock gateway");
            Arc::new(MockGateway::new())
        } else {
            let slot_source: DynSlotSource = ledger;
            Arc::new(HttpGateway::new(
                &config.execution,
                slot_source,
                signer,
                metrics.clone(),
            ))
        };

        let health = HealthState::new();
        let engine = QuotingEngine::new(
            config,
            feed,
            position_source,
            exec,
            metrics,
            health.clone(),
        );

        Ok(Self {
            engine,
            health,
            registry,
            metrics_port,
        })
    }

    /// Run until SIGINT or SIGTERM, then drain and stop.
    pub async fn run(mut self) -> AppResult<()> {
        let token = CancellationToken::new();

        let server_handle = self.metrics_port.map(|port| {
            let health = self.health.clone();
            let server_token = token.clone();
            tokio::spawn(async move {
                if let Err(e) = maker_telemetry::run_server(port, health, server_token).await {
                    error!(error = %e, "Telemetry server failed");
                }
            })
        });

        let probe_handle = {
            let registry = self.registry.clone();
            let probe_token = token.clone();
            tokio::spawn(async move {
                let client = reqwest::Client::new();
                let mut interval = tokio::time::interval(PROBE_INTERVAL);
                loop {
                    tokio::select! {
                        _ = probe_token.cancelled() => break,
                        _ = interval.tick() => registry.probe_all(&client).await,
                    }
                }
            })
        };

        tokio::spawn(cancel_on_signal(token.clone()));

        // Blocks until the token is cancelled, then drains live orders.
        self.engine.run(token.clone()).await;

        token.cancel();
        let _ = probe_handle.await;
        if let Some(handle) = server_handle {
            let _ = handle.await;
        }

        info!("Application stopped");
        Ok(())
    }
}

fn build_signer(config: &AppConfig, dry_run: bool) -> AppResult<DynSigner> {
    if dry_run {
        return Ok(Arc::new(NoopSigner));
    }
    match &config.execution.key {
        Some(source) => {
            let signer = WalletSigner::load(source, config.execution.authority.as_deref())
                .map_err(|e| AppError::Exec(e.into()))?;
            info!(authority = %signer.authority(), "Signing key loaded");
            Ok(Arc::new(signer))
        }
        None if config.execution.allow_degraded => {
            warn!("No signing key configured, envelopes will carry a placeholder signature");
            Ok(Arc::new(NoopSigner))
        }
        None => Err(AppError::Preflight(
            "No signing key configured; set execution.key or start with --dry-run".to_string(),
        )),
    }
}

/// Cancel the token on the first SIGINT or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = ctrl_c => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for interrupt");
            }
            info!("Interrupt received, shutting down");
        }
        _ = terminate => {
            info!("Terminate signal received, shutting down");
        }
    }
    token.cancel();
}
