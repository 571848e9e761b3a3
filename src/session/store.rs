use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{SESSIONS_DIR, STATE_DIR};

use super::record::Session;

/// Manages session persistence for a project
///
/// Sessions land as pretty JSON under `.selkie/sessions/<id>.json`; loading
/// one restores the step history bit-for-bit (replay history, not
/// re-execution).
pub struct SessionStore {
    sessions_dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at the project directory
    pub fn new(project_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = project_dir.as_ref().join(STATE_DIR).join(SESSIONS_DIR);

        fs::create_dir_all(&sessions_dir).with_context(|| {
            format!("Failed to create sessions directory: {}", sessions_dir.display())
        })?;

        Ok(Self { sessions_dir })
    }

    /// Save a session to disk
    pub fn save(&self, session: &Session) -> Result<PathBuf> {
        let path = self.sessions_dir.join(format!("{}.json", session.id));

        let json = serde_json::to_string_pretty(session)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write session: {}", path.display()))?;

        Ok(path)
    }

    /// Load a specific session by id
    pub fn load(&self, id: &str) -> Result<Session> {
        let path = self.sessions_dir.join(format!("{}.json", id));

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session: {}", path.display()))?;
        let session = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse session: {}", path.display()))?;

        Ok(session)
    }

    /// Load the most recently updated session, if any
    pub fn load_last(&self) -> Result<Option<Session>> {
        let sessions = self.list()?;
        Ok(sessions.into_iter().next())
    }

    /// List all sessions, newest first
    pub fn list(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.sessions_dir) {
            for entry in entries.flatten() {
                if entry.path().extension().map(|e| e == "json").unwrap_or(false) {
                    if let Ok(json) = fs::read_to_string(entry.path()) {
                        if let Ok(session) = serde_json::from_str::<Session>(&json) {
                            sessions.push(session);
                        }
                    }
                }
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(sessions)
    }

    /// Delete a session
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.sessions_dir.join(format!("{}.json", id));

        if path.exists() {
            fs::remove_file(path)?;
        }

        Ok(())
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionStatus, Step};
    use crate::tools::{ToolInvocation, ToolResult};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_session(root: &Path) -> Session {
        let mut session = Session::new("rewrite the readme", root.to_path_buf());
        session.push_step(Step::new(
            0,
            "look at the current readme",
            Some(ToolInvocation::new("read_file", "[READ_FILE: README.md]").with_arg("path", "README.md")),
            Some(ToolResult::success("# Old")),
        ));
        session.push_step(Step::new(1, "that is all", None, None));
        session.mark(SessionStatus::Completed);
        session
    }

    #[test]
    fn test_round_trip_preserves_step_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path()).unwrap();

        let session = sample_session(temp_dir.path());
        store.save(&session).unwrap();

        let loaded = store.load(&session.id).unwrap();
        assert_eq!(loaded.steps, session.steps);
        assert_eq!(loaded.status, session.status);
        assert_eq!(loaded.task, session.task);
    }

    #[test]
    fn test_list_is_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path()).unwrap();

        let mut first = Session::new("first", temp_dir.path().to_path_buf());
        first.id = "20240101_000000".to_string();
        let mut second = Session::new("second", temp_dir.path().to_path_buf());
        second.id = "20240102_000000".to_string();
        second.updated_at = first.updated_at + chrono::Duration::hours(1);

        store.save(&first).unwrap();
        store.save(&second).unwrap();

        let sessions = store.list().unwrap();
        assert_eq!(sessions[0].task, "second");
    }

    #[test]
    fn test_load_last_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path()).unwrap();

        assert!(store.load_last().unwrap().is_none());

        let session = sample_session(temp_dir.path());
        store.save(&session).unwrap();
        assert!(store.load_last().unwrap().is_some());

        store.delete(&session.id).unwrap();
        assert!(store.load_last().unwrap().is_none());
    }
}
