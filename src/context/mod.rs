// Gateway module for context selection
mod packer;
mod scanner;

pub use packer::{ContextCandidate, ContextPacker, PackedContext, PackedSection};
pub use scanner::CandidateScanner;
