//! Debug log sink for request/response lines.

/// Receives one line per request and one per response.
///
/// Logging is observational only: the pipeline behaves identically with or
/// without a logger.
pub trait Logger: Send + Sync {
    fn debug(&self, line: &str);
}

/// Forwards lines to `tracing` at debug level under the `keycloak_admin` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, line: &str) {
        tracing::debug!(target: "keycloak_admin", "{line}");
    }
}
