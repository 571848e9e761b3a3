use anyhow::Result;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;

use crate::app::PackerConfig;
use crate::constants::{
    BACKUP_SUFFIX, DEFAULT_EXCLUDE_PATTERNS, DELETED_SUFFIX, MEMORY_FILE, STATE_DIR,
};

use super::packer::ContextCandidate;

/// Collects candidate files for the context packer
///
/// Walks the sandbox gitignore-aware and filters out artifacts, binaries
/// and oversized files. Scoring is the packer's job; candidates leave here
/// unscored.
pub struct CandidateScanner {
    max_file_size: u64,
}

impl CandidateScanner {
    pub fn new(config: &PackerConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
        }
    }

    /// Scan the sandbox for candidate files
    pub fn scan(&self, root: &Path) -> Result<Vec<ContextCandidate>> {
        let mut candidates = Vec::new();

        let mut overrides = OverrideBuilder::new(root);
        for pattern in DEFAULT_EXCLUDE_PATTERNS {
            // Leading '!' makes the pattern an exclusion in override syntax
            overrides.add(&format!("!{}", pattern))?;
        }

        let walker = WalkBuilder::new(root)
            .standard_filters(true) // Respect .gitignore, .ignore, etc.
            .hidden(true)
            .overrides(overrides.build()?)
            .build();

        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || !self.should_include(path) {
                continue;
            }

            let Ok(metadata) = fs::metadata(path) else {
                continue;
            };
            if metadata.len() > self.max_file_size {
                continue;
            }

            // Skip binary-ish content silently; the model cannot use it
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };

            let relative = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            candidates.push(ContextCandidate::new(
                path.to_path_buf(),
                relative,
                content,
                metadata.modified().ok(),
            ));
        }

        // The project memory artifact lives under the state directory the
        // walk above skips, so it is pulled in explicitly.
        let memory_path = root.join(STATE_DIR).join(MEMORY_FILE);
        if let Ok(content) = fs::read_to_string(&memory_path) {
            let modified = fs::metadata(&memory_path).and_then(|m| m.modified()).ok();
            candidates.push(ContextCandidate::new(
                memory_path,
                MEMORY_FILE,
                content,
                modified,
            ));
        }

        tracing::debug!("Scanned {} candidate files under {}", candidates.len(), root.display());

        Ok(candidates)
    }

    fn should_include(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        // Our own state and backup artifacts never feed back into context
        if path_str.contains(STATE_DIR) {
            return false;
        }
        if let Some(ext) = path.extension().map(|e| e.to_string_lossy()) {
            if ext == BACKUP_SUFFIX || ext == DELETED_SUFFIX {
                return false;
            }
            if BINARY_EXTENSIONS.contains(&ext.as_ref()) {
                return false;
            }
        }

        true
    }
}

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "pdf", "zip", "tar", "gz", "rar", "7z",
    "so", "dylib", "dll", "exe", "o", "a", "lib", "pyc", "pyo", "pyd", "class", "wasm",
];
