use async_trait::async_trait;

use super::types::{ModelError, ModelReply, ModelRequest};

/// Core trait that all model backends must implement
///
/// Transport, streaming and provider switching are the implementor's
/// business; the agent loop only needs a completed reply or a final,
/// tagged error. Implementations retry transient faults with bounded
/// backoff before surfacing anything.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a request to the model and await the complete reply
    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
