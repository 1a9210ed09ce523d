use std::sync::Arc;

use async_trait::async_trait;
use harvest_core::{BrokerClient, ClientError, CoordinationClient};

use crate::config::ServiceConfig;

/// Builds the service's external clients from its configuration.
#[async_trait]
pub trait ClientConnector: Send + Sync {
    async fn broker(&self, config: &ServiceConfig) -> Result<Arc<dyn BrokerClient>, ClientError>;

    async fn coordination(
        &self,
        config: &ServiceConfig,
    ) -> Result<Arc<dyn CoordinationClient>, ClientError>;
}
