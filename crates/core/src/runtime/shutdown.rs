use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Owns the process-wide cancellation token. Producers, timers and the
/// inbox loop all stop when it is cancelled.
#[derive(Debug)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel on SIGTERM or Ctrl+C. The listener exits on its own once the
    /// token is cancelled by anyone else.
    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                reason = wait_for_signal() => {
                    tracing::info!(signal = reason, "shutdown signal received");
                }
            }
            token.cancel();
        });
    }
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = signal::ctrl_c() => "SIGINT",
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                let _ = signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        "ctrl-c"
    }
}
