// Gateway module for the agent loop
mod interrupt;
mod prompt;
mod react;

pub use interrupt::InterruptHandle;
pub use prompt::{build_request, system_prompt};
pub use react::{LoopOutcome, ReactLoop};
