//! OS signal handling.

/// Wait for Ctrl-C. Errors installing the handler are logged and treated as
/// an immediate shutdown request.
pub async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
    }
    tracing::info!("Shutdown signal received");
}
