// Gateway module for the model-client contract
//
// Transport lives outside this crate; backends plug in by implementing
// `ModelClient`.
mod scripted;
mod traits;
mod types;

pub use scripted::ScriptedModel;
pub use traits::ModelClient;
#[cfg(test)]
pub use traits::MockModelClient;
pub use types::{
    ChatMessage, GenerationParams, MessageRole, ModelError, ModelReply, ModelRequest, TokenUsage,
};
