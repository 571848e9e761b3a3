use anyhow::Result;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Token estimation for context budgeting
///
/// Uses the cl100k BPE as a model-agnostic approximation. Exact counts per
/// provider vary; the budget math only needs a stable, conservative
/// estimate, so a chars/4 fallback is acceptable when the BPE cannot load.
pub struct TokenEstimator {
    bpe: Option<CoreBPE>,
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            bpe: cl100k_base().ok(),
        }
    }

    /// Estimate the token cost of a piece of text
    pub fn estimate(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => text.len() / 4,
        }
    }

    /// Estimate the combined cost of several sections
    pub fn estimate_all<'a>(&self, sections: impl IntoIterator<Item = &'a str>) -> usize {
        sections.into_iter().map(|s| self.estimate(s)).sum()
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Count tokens in file contents (convenience function)
pub fn count_text_tokens(content: &str) -> usize {
    TokenEstimator::new().estimate(content)
}

/// Fallible variant for callers that want to know the BPE loaded
pub fn try_estimator() -> Result<TokenEstimator> {
    Ok(TokenEstimator {
        bpe: Some(cl100k_base()?),
    })
}
