use std::path::PathBuf;
use std::time::SystemTime;

use crate::app::PackerConfig;
use crate::constants::{MEMORY_FILE, MIN_CANDIDATE_SCORE};
use crate::session::Session;
use crate::utils::TokenEstimator;

/// A file (or excerpt) competing for a slot in the packed context
///
/// Transient: recomputed on every packing call, never persisted.
#[derive(Debug, Clone)]
pub struct ContextCandidate {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the sandbox root, as shown to the model
    pub relative: String,
    pub content: String,
    pub modified: Option<SystemTime>,
    pub score: f64,
}

impl ContextCandidate {
    pub fn new(
        path: PathBuf,
        relative: impl Into<String>,
        content: impl Into<String>,
        modified: Option<SystemTime>,
    ) -> Self {
        Self {
            path,
            relative: relative.into(),
            content: content.into(),
            modified,
            score: 0.0,
        }
    }
}

/// One packed context section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSection {
    pub source: String,
    pub content: String,
}

/// The packer's output, surfaced to the agent loop for logging
#[derive(Debug, Clone)]
pub struct PackedContext {
    pub sections: Vec<PackedSection>,
    /// Candidates that scored well enough but did not fit the budget
    pub dropped: usize,
    pub token_count: usize,
}

impl PackedContext {
    /// Render all sections into one prompt-ready block
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("=== {} ===\n{}\n\n", section.source, section.content));
        }
        out
    }
}

/// Selects the context subset that best informs the next model call
///
/// Pure with respect to the session: scoring and packing read state but
/// never mutate it, so the packer can be invoked freely without locking.
pub struct ContextPacker {
    config: PackerConfig,
    estimator: TokenEstimator,
}

impl ContextPacker {
    pub fn new(config: PackerConfig) -> Self {
        Self {
            config,
            estimator: TokenEstimator::new(),
        }
    }

    /// Pack candidates plus recent session history into the token budget
    pub fn pack(
        &self,
        task: &str,
        mut candidates: Vec<ContextCandidate>,
        session: &Session,
    ) -> PackedContext {
        let budget = self.config.max_context_tokens;

        // Recent history gets a reserved slice of the budget first, so file
        // content can never starve out short-term action memory.
        let history_budget = (budget as f64 * self.config.history_reserve) as usize;
        let (history_sections, history_cost) = self.pack_history(session, history_budget);

        let mut remaining = budget.saturating_sub(history_cost);

        // Score everything against the task and session
        let keywords = task_keywords(task);
        let touched = session.touched_paths();
        for candidate in &mut candidates {
            candidate.score = self.score(candidate, &keywords, &touched);
        }

        // The project memory artifact is highest-priority by convention
        let mut sections = Vec::new();
        let mut token_count = history_cost;
        if let Some(pos) = candidates.iter().position(|c| c.relative == MEMORY_FILE) {
            let memory = candidates.swap_remove(pos);
            let cost = self.estimator.estimate(&memory.content);
            if cost <= remaining {
                remaining -= cost;
                token_count += cost;
                sections.push(PackedSection {
                    source: memory.relative,
                    content: memory.content,
                });
            }
        }

        // Deterministic ranking: score desc, then shallower path, then lexical
        let mut ranked: Vec<ContextCandidate> = candidates
            .into_iter()
            .filter(|c| c.score >= MIN_CANDIDATE_SCORE)
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| path_depth(&a.relative).cmp(&path_depth(&b.relative)))
                .then_with(|| a.relative.cmp(&b.relative))
        });

        // Greedy inclusion in rank order, stopping at the first overflow
        let mut dropped = 0usize;
        let mut stopped = false;
        for candidate in ranked {
            if stopped {
                dropped += 1;
                continue;
            }
            let cost = self.estimator.estimate(&candidate.content);
            if cost > remaining {
                dropped += 1;
                stopped = true;
                continue;
            }
            remaining -= cost;
            token_count += cost;
            sections.push(PackedSection {
                source: candidate.relative,
                content: candidate.content,
            });
        }

        // History goes last so the freshest steps sit closest to the prompt
        sections.extend(history_sections);

        tracing::debug!(
            "Packed {} sections (~{} tokens), dropped {} for budget",
            sections.len(),
            token_count,
            dropped
        );

        PackedContext {
            sections,
            dropped,
            token_count,
        }
    }

    /// Pack the most recent steps, newest first, within the reserve
    fn pack_history(&self, session: &Session, budget: usize) -> (Vec<PackedSection>, usize) {
        let mut picked = Vec::new();
        let mut used = 0usize;

        for step in session.recent_steps(self.config.recent_steps).iter().rev() {
            let rendered = step.render();
            let cost = self.estimator.estimate(&rendered);
            if used + cost > budget {
                break;
            }
            used += cost;
            picked.push((step.index, rendered));
        }

        // Oldest first in the final output
        picked.reverse();
        let sections = picked
            .into_iter()
            .map(|(index, content)| PackedSection {
                source: format!("step {}", index),
                content,
            })
            .collect();

        (sections, used)
    }

    /// Weighted relevance of one candidate
    ///
    /// The weights are configuration, not constants; see `PackerConfig`.
    fn score(&self, candidate: &ContextCandidate, keywords: &[String], touched: &[String]) -> f64 {
        let overlap = overlap_score(candidate, keywords);
        let recency = recency_score(candidate.modified);
        let was_touched = touched
            .iter()
            .any(|t| candidate.relative == *t || candidate.path.ends_with(t));

        let score = self.config.overlap_weight * overlap
            + self.config.recency_weight * recency
            + self.config.touched_weight * if was_touched { 1.0 } else { 0.0 };

        score.min(1.0)
    }
}

/// Split the task text into lowercase keywords worth matching on
fn task_keywords(task: &str) -> Vec<String> {
    task.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of task keywords found in the candidate; path hits count double
fn overlap_score(candidate: &ContextCandidate, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }

    let path = candidate.relative.to_lowercase();
    let content = candidate.content.to_lowercase();

    let mut hits = 0.0;
    for keyword in keywords {
        if path.contains(keyword) {
            hits += 1.0;
        } else if content.contains(keyword) {
            hits += 0.5;
        }
    }

    (hits / keywords.len() as f64).min(1.0)
}

/// Bucketed modification recency: fresh edits rank far above stale files
fn recency_score(modified: Option<SystemTime>) -> f64 {
    let Some(modified) = modified else {
        return 0.0;
    };
    let Ok(age) = SystemTime::now().duration_since(modified) else {
        return 1.0; // clock skew: treat as brand new
    };

    let days = age.as_secs() as f64 / 86_400.0;
    if days < 1.0 {
        1.0
    } else if days < 7.0 {
        0.6
    } else if days < 30.0 {
        0.3
    } else {
        0.0
    }
}

fn path_depth(relative: &str) -> usize {
    relative.matches('/').count()
}
