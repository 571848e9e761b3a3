use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::SENSITIVE_PATTERNS;

/// The containment boundary for every filesystem and command operation
///
/// Constructed once at session start from a canonicalized absolute path and
/// immutable afterwards. All path arguments coming from the model are
/// resolved against it before anything touches the disk.
#[derive(Debug, Clone)]
pub struct SandboxRoot {
    root: PathBuf,
}

impl SandboxRoot {
    /// Create a sandbox rooted at the given directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root
            .as_ref()
            .canonicalize()
            .with_context(|| format!("Failed to resolve sandbox root: {}", root.as_ref().display()))?;

        if !root.is_dir() {
            anyhow::bail!("Sandbox root is not a directory: {}", root.display());
        }

        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path to an absolute path inside the sandbox
    ///
    /// Relative paths are joined onto the root. Symlinks and `..` segments
    /// are followed; nonexistent paths are resolved through their nearest
    /// existing ancestor so that a to-be-created file can still be checked.
    /// Returns `None` when the resolved location escapes the root.
    pub fn resolve(&self, raw: &str) -> Option<PathBuf> {
        // Normalize Windows-style separators coming out of model text
        let normalized = raw.replace('\\', "/");
        let candidate = Path::new(&normalized);

        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let resolved = resolve_through_ancestors(&joined)?;

        if resolved.starts_with(&self.root) {
            Some(resolved)
        } else {
            None
        }
    }

    /// Check whether a path hits a known sensitive location
    ///
    /// Keys, credentials and dotfile secrets stay off-limits even when they
    /// physically live inside the project tree.
    pub fn is_sensitive(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        SENSITIVE_PATTERNS.iter().any(|p| path_str.contains(p))
    }
}

/// Canonicalize a possibly-nonexistent path via its nearest existing ancestor
fn resolve_through_ancestors(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return path.canonicalize().ok();
    }

    // Walk up until something exists, canonicalize that, then re-append the
    // missing tail. Lexically strips `.` and `..` from the tail so a
    // nonexistent `sub/../../etc` cannot sneak past.
    let mut existing = path.parent();
    let mut tail = vec![path.file_name()?];

    while let Some(ancestor) = existing {
        if ancestor.exists() {
            let mut resolved = ancestor.canonicalize().ok()?;
            for part in tail.iter().rev() {
                let part_str = part.to_string_lossy();
                if part_str == ".." {
                    resolved.pop();
                } else if part_str != "." {
                    resolved.push(part);
                }
            }
            return Some(resolved);
        }
        tail.push(ancestor.file_name()?);
        existing = ancestor.parent();
    }

    None
}
