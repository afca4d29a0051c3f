pub mod backup;
pub mod client;
pub mod config;
pub mod debounce;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod sorting;
pub mod storage;

use std::sync::Arc;

use anyhow::Context;

use crate::backup::BackupRotator;
use crate::config::Config;
use crate::models::Document;
use crate::scheduler::start_backup_scheduler;
use crate::server::{create_router, AppState};
use crate::storage::TaskStore;

/// Serves the task API and runs the daily backup job until Ctrl+C/SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = TaskStore::new(config.data_file.clone());
    if config.init && store.init_if_missing(&Document::seed())? {
        log::info!("created starter document {}", store.path().display());
    }
    if !store.exists() {
        log::warn!(
            "task document {} does not exist; reads will fail until a client saves",
            store.path().display()
        );
    }

    let rotator = BackupRotator::new(
        config.data_file.clone(),
        config.backup_dir.clone(),
        config.max_backups,
    );
    if let Err(err) = rotator.ensure_dir() {
        log::error!(
            "cannot create backup directory {}: {err}",
            rotator.dir().display()
        );
    }
    let scheduler = start_backup_scheduler(rotator.clone(), config.schedule);

    let state = Arc::new(AppState::new(store, rotator));
    let app = create_router(state, &config.public_dir);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    log::info!("server is running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    scheduler.abort();
    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                log::error!("failed to install SIGTERM handler: {err}");
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

    log::info!("shutting down");
}
