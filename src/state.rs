//! Shared gateway state for request handlers.

use std::sync::Arc;

use crate::config::{ContentConfig, GatewayConfig};
use crate::policy::HostPolicy;
use crate::vhosts::VhostTable;

/// Shared gateway state, cloneable across handlers via Arc-wrapped fields.
///
/// Everything here is immutable after startup, so requests never contend on it.
#[derive(Clone)]
pub struct GatewayState {
    pub vhosts: Arc<VhostTable>,
    pub content: Arc<ContentConfig>,
    /// Port of the TLS listener, used when composing https redirects
    pub https_port: u16,
}

impl GatewayState {
    /// Creates the gateway state from the loaded vhost table and configuration.
    pub fn new(vhosts: VhostTable, config: &GatewayConfig) -> Self {
        Self {
            vhosts: Arc::new(vhosts),
            content: Arc::new(config.content.clone()),
            https_port: config.http.https_port,
        }
    }

    /// Host policy sharing this state's vhost table.
    pub fn host_policy(&self) -> HostPolicy {
        HostPolicy::new(Arc::clone(&self.vhosts))
    }
}
