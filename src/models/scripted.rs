use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::traits::ModelClient;
use super::types::{ModelError, ModelReply, ModelRequest};

/// A model client that replays canned replies in order
///
/// Used for dry runs and deterministic loop tests; exhausting the script is
/// a fatal model error, which exercises the loop's failure path the same
/// way a dead provider would.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
        }
    }

    /// Script both replies and injected failures
    pub fn with_results(results: impl IntoIterator<Item = Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(results.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, _request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let next = self
            .replies
            .lock()
            .expect("scripted replies lock")
            .pop_front();

        match next {
            Some(Ok(content)) => Ok(ModelReply {
                content,
                usage: None,
                model_name: self.name().to_string(),
            }),
            Some(Err(e)) => Err(e),
            None => Err(ModelError::Fatal("scripted model exhausted".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::GenerationParams;

    fn request() -> ModelRequest {
        ModelRequest {
            messages: Vec::new(),
            params: GenerationParams {
                temperature: 0.0,
                max_tokens: 16,
            },
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let model = ScriptedModel::new(["first", "second"]);

        assert_eq!(model.complete(&request()).await.unwrap().content, "first");
        assert_eq!(model.complete(&request()).await.unwrap().content, "second");
        assert!(model.complete(&request()).await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_scripted_errors_surface() {
        let model = ScriptedModel::with_results([
            Err(ModelError::Transient("connection refused".to_string())),
        ]);

        let err = model.complete(&request()).await.unwrap_err();
        assert!(!err.is_fatal());
    }
}
