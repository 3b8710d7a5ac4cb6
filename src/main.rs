use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use push_dispatch_service::config::Settings;
use push_dispatch_service::server::{create_app, AppState};
use push_dispatch_service::tasks::SchedulerTask;
use push_dispatch_service::telemetry::init_telemetry;
use push_dispatch_service::triggers::RedisSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing; the guard flushes spans on exit
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    let state = AppState::build(settings.clone()).await;
    tracing::info!(
        templates = state.templates.backend_name(),
        schedules = state.schedules.backend_name(),
        channels = state.dispatcher.channels().backend_name(),
        "Application state initialized"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut handles = Vec::new();

    if settings.redis.enabled {
        let subscriber = RedisSubscriber::new(
            settings.redis.clone(),
            state.dispatcher.clone(),
            shutdown_tx.clone(),
        );
        handles.push(tokio::spawn(async move {
            if let Err(e) = subscriber.start().await {
                tracing::error!(error = %e, "Redis subscriber failed");
            }
        }));
    } else {
        tracing::info!("Redis trigger disabled");
    }

    if settings.scheduler.enabled {
        let scheduler = SchedulerTask::new(
            settings.scheduler.clone(),
            Arc::clone(&state.driver),
            shutdown_tx.subscribe(),
        );
        handles.push(tokio::spawn(scheduler.run()));
    } else {
        tracing::info!("Scheduler disabled");
    }

    let postgres = state.postgres.clone();
    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    futures::future::join_all(handles).await;

    if let Some(pool) = postgres {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the scheduler and the Redis subscriber
    let _ = shutdown_tx.send(());
}
