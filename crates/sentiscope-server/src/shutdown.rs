//! Graceful shutdown on OS signals.
//!
//! A single [`CancellationToken`] is the shutdown broadcast: the signal
//! listener cancels it, the HTTP server drains on it, and the engine is told
//! to cancel any in-flight run.

use sentiscope_engine::SentimentEngine;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Resolve once SIGTERM or SIGINT arrives (Ctrl-C off Unix), or once `token`
/// is cancelled elsewhere. The token is cancelled on return either way.
pub async fn shutdown_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Shutdown signal received (SIGTERM)"),
                    _ = sigint.recv() => info!("Shutdown signal received (SIGINT)"),
                    _ = token.cancelled() => info!("Shutdown signal received (token cancelled)"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers, waiting for cancellation only");
                token.cancelled().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Shutdown signal received (Ctrl-C)"),
            _ = token.cancelled() => info!("Shutdown signal received (token cancelled)"),
        }
    }

    token.cancel();
}

/// Wait for shutdown, then stop the engine so that in-flight runs are
/// cancelled instead of holding the server open.
pub async fn shutdown_engine(engine: Arc<SentimentEngine>, token: CancellationToken) {
    shutdown_signal(token).await;
    engine.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentiscope_core::{EngineConfig, RunState};
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_signal_via_token_cancellation() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        shutdown_signal(token.clone()).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_engine_stops_the_engine() {
        let engine =
            Arc::new(SentimentEngine::new(&EngineConfig::default().with_api_token("t")).unwrap());
        let token = CancellationToken::new();
        token.cancel();

        shutdown_engine(Arc::clone(&engine), token).await;
        assert_eq!(engine.state(), RunState::Idle);
        assert!(engine.compute_distribution(&[]).await.is_err());
    }
}
