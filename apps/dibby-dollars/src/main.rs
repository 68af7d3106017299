// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, fs, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dibby_dollars::{
    api::router,
    auth::SessionKeys,
    config::{LogFormat, ServerConfig, DEFAULT_LOG_FILTER},
    scheduler::InterestScheduler,
    seed::{seed_defaults, seed_demo_data},
    state::AppState,
    storage::Ledger,
};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format);

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    fs::create_dir_all(&config.data_dir)?;
    let ledger_path = config.ledger_path();
    let ledger = Ledger::open(&ledger_path)?;
    tracing::info!(path = %ledger_path.display(), "Ledger opened");

    let report = if config.seed_demo_data {
        seed_demo_data(&ledger)?
    } else {
        seed_defaults(&ledger)?
    };
    tracing::info!(
        behaviors = report.behaviors,
        settings = report.settings,
        users = report.users,
        welcome_bonuses = report.welcome_bonuses,
        demo = config.seed_demo_data,
        "Seeding complete"
    );

    let ttl = chrono::Duration::hours(config.session_ttl_hours);
    let secure_cookie = config.tls.is_some();
    let sessions = match &config.session_secret {
        Some(secret) => SessionKeys::new(secret.as_bytes(), ttl, secure_cookie),
        None => {
            tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
            SessionKeys::ephemeral(ttl, secure_cookie)?
        }
    };

    let state = AppState::new(ledger, sessions);
    let app = router(state.clone(), &config.cors_origins);

    let shutdown = CancellationToken::new();
    let scheduler_task = if config.scheduler_enabled {
        let scheduler = InterestScheduler::new(state.ledger.clone());
        Some(tokio::spawn(scheduler.run(shutdown.clone())))
    } else {
        tracing::info!("Interest scheduler disabled");
        None
    };

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    let addr = config.bind_addr;
    match &config.tls {
        Some((cert, key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key).await?;
            tracing::info!(%addr, "Dibby Dollars server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "Dibby Dollars server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    shutdown.cancel();
    if let Some(task) = scheduler_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
