pub mod agent;
pub mod app;
pub mod cli;
pub mod constants;
pub mod context;
pub mod models;
pub mod safety;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{InterruptHandle, LoopOutcome, ReactLoop};
pub use app::{load_config, Config};
pub use context::{ContextPacker, PackedContext};
pub use models::{ModelClient, ModelError};
pub use safety::{SafetyGate, SandboxRoot};
pub use session::{Session, SessionStore};
pub use tools::{ToolExecutor, ToolResult};
pub use utils::AgentError;
