use anyhow::{Context, Result};
use git2::{DiffOptions, Repository, StatusOptions};
use std::path::Path;

/// Get git status for the sandboxed repository
pub fn status(root: &Path) -> Result<String> {
    let repo = Repository::open(root).context("Failed to open git repository. Is this a git repo?")?;

    let mut status_options = StatusOptions::new();
    status_options.include_untracked(true);
    status_options.include_ignored(false);

    let statuses = repo.statuses(Some(&mut status_options))?;

    let mut output = String::new();
    output.push_str("Git Status:\n");
    output.push_str("-----------\n");

    let mut has_changes = false;

    for entry in statuses.iter() {
        let entry_status = entry.status();
        let path = entry.path().unwrap_or("<unknown>");

        let status_str = if entry_status.is_wt_new() {
            format!("  new file: {}", path)
        } else if entry_status.is_wt_modified() {
            format!("  modified: {}", path)
        } else if entry_status.is_wt_deleted() {
            format!("  deleted:  {}", path)
        } else if entry_status.is_wt_renamed() {
            format!("  renamed:  {}", path)
        } else if entry_status.is_index_new()
            || entry_status.is_index_modified()
            || entry_status.is_index_deleted()
        {
            format!("  staged:   {}", path)
        } else if entry_status.is_conflicted() {
            format!("  conflict: {}", path)
        } else {
            continue;
        };

        output.push_str(&status_str);
        output.push('\n');
        has_changes = true;
    }

    if !has_changes {
        output.push_str("  (working directory clean)\n");
    }

    if let Ok(head) = repo.head() {
        if let Some(name) = head.shorthand() {
            output.push_str(&format!("\nOn branch: {}\n", name));
        }
    }

    Ok(output)
}

/// Get git diff between HEAD and the working directory
pub fn diff(root: &Path, path: Option<&str>) -> Result<String> {
    let repo = Repository::open(root).context("Failed to open git repository. Is this a git repo?")?;

    let mut diff_options = DiffOptions::new();
    if let Some(path) = path {
        diff_options.pathspec(path);
    }

    let head = repo.head()?.peel_to_tree()?;
    let diff = repo.diff_tree_to_workdir_with_index(Some(&head), Some(&mut diff_options))?;

    let mut output = String::new();
    diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
        output.push_str(std::str::from_utf8(line.content()).unwrap_or("<invalid UTF-8>"));
        true
    })?;

    if output.is_empty() {
        output = "No changes detected".to_string();
    }

    Ok(output)
}

/// Stage everything and commit with the given message
pub fn commit(root: &Path, message: &str) -> Result<String> {
    let repo = Repository::open(root).context("Failed to open git repository. Is this a git repo?")?;

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)?;
    index.write()?;

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent_commit = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None, // First commit
    };

    let signature = repo
        .signature()
        .or_else(|_| git2::Signature::now("Selkie Agent", "selkie@local"))?;

    let parents: Vec<&git2::Commit> = parent_commit.iter().collect();
    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

    Ok(format!("Committed {} with message: {}", oid, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_status_diff_commit_cycle() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("test.txt"), "Hello, Git!").unwrap();

        let out = status(temp_dir.path()).unwrap();
        assert!(out.contains("new file"));

        let out = commit(temp_dir.path(), "Initial commit").unwrap();
        assert!(out.contains("Initial commit"));

        let out = status(temp_dir.path()).unwrap();
        assert!(out.contains("working directory clean"));

        fs::write(temp_dir.path().join("test.txt"), "Hello, again!").unwrap();
        let out = diff(temp_dir.path(), None).unwrap();
        assert!(out.contains("Hello, again!"));
    }

    #[test]
    fn test_non_repo_errors() {
        let temp_dir = TempDir::new().unwrap();
        assert!(status(temp_dir.path()).is_err());
    }
}
