//! Injectable collaborators shared by `CliAuth` and `KeyCloakManagement`.

use std::sync::Arc;

use crate::http::Transport;
use crate::logger::{Logger, TracingLogger};
use crate::transport::UreqTransport;

/// Transport and logger used by a client instance.
///
/// `Default` uses a ureq agent and the tracing logger.
#[derive(Clone)]
pub struct ClientOptions {
    pub transport: Arc<dyn Transport>,
    pub logger: Option<Arc<dyn Logger>>,
}

impl ClientOptions {
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn without_logger(mut self) -> Self {
        self.logger = None;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            transport: Arc::new(UreqTransport::default()),
            logger: Some(Arc::new(TracingLogger)),
        }
    }
}
