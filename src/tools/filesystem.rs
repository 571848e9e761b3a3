use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    BACKUP_SUFFIX, DELETED_SUFFIX, LISTING_ENTRY_CAP, READ_OUTPUT_CAP, SEARCH_MATCHES_PER_FILE,
    SEARCH_RESULT_CAP,
};
use crate::safety::SandboxRoot;

/// Read a file, truncating oversized content with an explicit marker
pub fn read_file(sandbox: &SandboxRoot, path: &str) -> Result<String> {
    let path = contained_path(sandbox, path)?;

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    if content.len() > READ_OUTPUT_CAP {
        let cut = floor_char_boundary(&content, READ_OUTPUT_CAP);
        Ok(format!(
            "{}...\n[truncated: showing first {} of {} bytes]",
            &content[..cut],
            cut,
            content.len()
        ))
    } else {
        Ok(content)
    }
}

/// Write content to a file, backing up any existing content first
///
/// The backup is written before the file is touched; a crash between the
/// two leaves the original recoverable. Parent directories are created as
/// needed. Returns the backup path when one was taken.
pub fn write_file(sandbox: &SandboxRoot, path: &str, content: &str) -> Result<Option<PathBuf>> {
    let path = contained_path(sandbox, path)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "Failed to create parent directories for: {}",
                path.display()
            )
        })?;
    }

    let backup = if path.exists() {
        Some(backup_before_mutation(&path, BACKUP_SUFFIX)?)
    } else {
        None
    };

    fs::write(&path, content).with_context(|| format!("Failed to write file: {}", path.display()))?;

    Ok(backup)
}

/// Replace an inclusive 1-indexed line range, backing the file up first
pub fn edit_file(
    sandbox: &SandboxRoot,
    path: &str,
    start_line: usize,
    end_line: usize,
    content: &str,
) -> Result<(String, PathBuf)> {
    let path = contained_path(sandbox, path)?;

    let original = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read file for editing: {}", path.display()))?;

    let mut lines: Vec<&str> = original.lines().collect();
    if start_line > lines.len() {
        anyhow::bail!(
            "Line range {}-{} is out of bounds (file has {} lines)",
            start_line,
            end_line,
            lines.len()
        );
    }

    let backup = backup_before_mutation(&path, BACKUP_SUFFIX)?;

    let end = end_line.min(lines.len());
    let replacement: Vec<&str> = content.lines().collect();
    lines.splice(start_line - 1..end, replacement);

    let mut edited = lines.join("\n");
    if original.ends_with('\n') {
        edited.push('\n');
    }

    fs::write(&path, edited).with_context(|| format!("Failed to write file: {}", path.display()))?;

    let summary = format!(
        "Replaced lines {}-{} of {}",
        start_line,
        end,
        path.display()
    );
    Ok((summary, backup))
}

/// Delete a file, preserving its content in a backup first
pub fn delete_file(sandbox: &SandboxRoot, path: &str) -> Result<PathBuf> {
    let path = contained_path(sandbox, path)?;

    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }

    let backup = backup_before_mutation(&path, DELETED_SUFFIX)?;

    fs::remove_file(&path).with_context(|| format!("Failed to delete file: {}", path.display()))?;

    Ok(backup)
}

/// Create a directory (and any missing parents)
pub fn create_directory(sandbox: &SandboxRoot, path: &str) -> Result<PathBuf> {
    let path = contained_path(sandbox, path)?;

    fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    Ok(path)
}

/// List the entries of a directory, capped and sorted
pub fn list_files(sandbox: &SandboxRoot, path: &str) -> Result<String> {
    let dir = contained_path(sandbox, path)?;

    let mut entries: Vec<String> = Vec::new();
    let read_dir = fs::read_dir(&dir)
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?;

    let mut items: Vec<_> = read_dir.filter_map(|e| e.ok()).collect();
    items.sort_by_key(|e| e.file_name());

    for item in items {
        let name = item.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let kind = item.file_type();
        if kind.as_ref().map(|k| k.is_dir()).unwrap_or(false) {
            entries.push(format!("{}/", name));
        } else {
            let size = item.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(format!("{} ({} bytes)", name, size));
        }

        if entries.len() >= LISTING_ENTRY_CAP {
            entries.push(format!("... (capped at {} entries)", LISTING_ENTRY_CAP));
            break;
        }
    }

    if entries.is_empty() {
        Ok(format!("{} is empty", path))
    } else {
        Ok(format!("Files in {}:\n{}", path, entries.join("\n")))
    }
}

/// Search for a text pattern in files under a directory
pub fn search_files(sandbox: &SandboxRoot, pattern: &str, path: &str) -> Result<String> {
    let dir = contained_path(sandbox, path)?;
    let needle = pattern.to_lowercase();

    let mut results: Vec<String> = Vec::new();
    let mut hits = 0usize;

    let walker = ignore::WalkBuilder::new(&dir).standard_filters(true).build();
    for entry in walker.filter_map(|e| e.ok()) {
        if hits >= SEARCH_RESULT_CAP {
            break;
        }
        let file = entry.path();
        if !file.is_file() {
            continue;
        }

        let Ok(content) = fs::read_to_string(file) else {
            continue; // binary or unreadable, skip
        };
        if !content.to_lowercase().contains(&needle) {
            continue;
        }

        let rel = file.strip_prefix(sandbox.path()).unwrap_or(file);
        results.push(format!("{}:", rel.display()));
        let mut file_hits = 0usize;
        for (i, line) in content.lines().enumerate() {
            if line.to_lowercase().contains(&needle) {
                results.push(format!("  L{}: {}", i + 1, line.trim()));
                hits += 1;
                file_hits += 1;
                if file_hits >= SEARCH_MATCHES_PER_FILE || hits >= SEARCH_RESULT_CAP {
                    break;
                }
            }
        }
    }

    if results.is_empty() {
        Ok(format!("No matches found for '{}'", pattern))
    } else {
        Ok(format!("Search results:\n{}", results.join("\n")))
    }
}

/// Suggest neighbors when the model asks for a file that is not there
///
/// Gives the model something concrete to correct against instead of a bare
/// not-found error.
pub fn missing_file_hint(sandbox: &SandboxRoot, path: &str) -> Option<String> {
    let resolved = sandbox.resolve(path)?;
    if resolved.exists() {
        return None;
    }

    let parent = resolved.parent()?;
    if !parent.exists() {
        return Some(format!(
            "Neither '{}' nor its directory exists. Use [LIST_FILES] to see the current structure.",
            path
        ));
    }

    let names: Vec<String> = fs::read_dir(parent)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .take(10)
        .collect();

    let rel_parent = parent.strip_prefix(sandbox.path()).unwrap_or(parent);
    Some(format!(
        "File '{}' not found. Files in {}: {}",
        path,
        if rel_parent.as_os_str().is_empty() {
            ".".to_string()
        } else {
            rel_parent.display().to_string()
        },
        if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        }
    ))
}

/// Resolve and contain a path, with a uniform error for escapes
fn contained_path(sandbox: &SandboxRoot, path: &str) -> Result<PathBuf> {
    sandbox
        .resolve(path)
        .ok_or_else(|| anyhow::anyhow!("Access denied: path outside of project directory: {}", path))
}

/// Copy the file aside before mutating it, keeping the original bytes
fn backup_before_mutation(path: &Path, suffix: &str) -> Result<PathBuf> {
    let backup_path = match path.extension() {
        Some(ext) => path.with_extension(format!("{}.{}", ext.to_string_lossy(), suffix)),
        None => path.with_extension(suffix),
    };
    fs::copy(path, &backup_path)
        .with_context(|| format!("Failed to create backup of: {}", path.display()))?;
    Ok(backup_path)
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
