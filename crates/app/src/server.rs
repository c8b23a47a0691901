use std::{future::Future, time::Duration};

use axum::Router;
use thiserror::Error;
use tokio::{net::TcpListener, sync::oneshot, task::JoinError};
use tracing::{error, info, warn};

/// How long in-flight requests may run after a shutdown signal.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("http server failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("http server task failed: {0}")]
    Task(#[from] JoinError),
    #[error("in-flight requests did not finish within {0:?}")]
    DrainTimeout(Duration),
}

/// Serves `app` until `shutdown` resolves, then drains for at most `drain_timeout`.
///
/// Connections still open when the timeout expires are dropped and
/// [`ServeError::DrainTimeout`] is returned.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    drain_timeout: Duration,
) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let graceful = async move {
        shutdown.await;
        let _ = signalled_tx.send(());
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(graceful);
    let mut task = tokio::spawn(async move { server.await });

    tokio::select! {
        finished = &mut task => return Ok(finished??),
        _ = signalled_rx => {}
    }

    info!(
        stage = "app",
        timeout_secs = drain_timeout.as_secs_f64(),
        "draining in-flight requests"
    );
    match tokio::time::timeout(drain_timeout, &mut task).await {
        Ok(finished) => Ok(finished??),
        Err(_) => {
            task.abort();
            warn!(stage = "app", "drain timeout elapsed, closing remaining connections");
            Err(ServeError::DrainTimeout(drain_timeout))
        }
    }
}

/// Resolves on CTRL+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(stage = "app", error = %err, "failed to install CTRL+C handler");
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
                error!(stage = "app", error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(stage = "app", "received CTRL+C, shutting down"),
        () = terminate => info!(stage = "app", "received SIGTERM, shutting down"),
    }
}
