//! The external contract for the agent CLI invoked inside each container.
//!
//! Pure data and string matching; no process control of its own. The PTY
//! layer spawns the agent (through [`crate::container::Engine`]'s `docker
//! exec` argv) and feeds its output through [`is_ready`] to decide when a
//! pane's initialization spinner can clear.

/// Readiness-marker substrings scanned for in PTY output. Matching any one
/// of these means the agent has finished its startup sequence and is
/// waiting on the user.
const READINESS_MARKERS: &[&str] = &[
    "What would you like to do?",
    "bypass permissions",
    "cwd:",
];

/// Returns true if `text` (a chunk, or accumulated buffer, of PTY output)
/// contains any recognized readiness marker.
pub fn is_ready(text: &str) -> bool {
    READINESS_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Configuration for invoking the agent CLI inside a container.
///
/// `command` is the binary name or path (default `claude`); `resume_flag`
/// is the flag name paired with a session id to resume a prior session
/// (`--resume <SESSION_ID>`); `session_files_path` is where the agent
/// writes its session state inside the container, copied out via
/// `PersistSessionFiles` before the container is recreated or removed.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub command: String,
    pub resume_flag: String,
    pub session_files_path: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            resume_flag: "--resume".to_string(),
            session_files_path: "/root/.claude".to_string(),
        }
    }
}

impl AgentConfig {
    /// Builds the argv to exec inside the container: the command, an
    /// optional `--resume <session_id>` pair, and the initial prompt as the
    /// final positional argument.
    pub fn build_argv(&self, prompt: &str, resume_session_id: Option<&str>) -> Vec<String> {
        let mut argv = vec![self.command.clone()];
        if let Some(session_id) = resume_session_id {
            argv.push(self.resume_flag.clone());
            argv.push(session_id.to_string());
        }
        argv.push(prompt.to_string());
        argv
    }
}

/// Recovers an agent's session id from the `.jsonl` transcript files it
/// writes under `session_files_path` inside the container, by copying that
/// directory out via [`crate::container::ContainerAdapter::persist_session_files`]
/// and taking the most recently modified file's stem. Used both to resume a
/// workstream whose `agent_session_id` wasn't persisted (container recreated
/// out-of-band) and by [`crate::persistence::Store::repair`] at startup.
pub async fn extract_session_id(
    adapter: &dyn crate::container::ContainerAdapter,
    container_id: &str,
    session_files_path: &str,
) -> Option<String> {
    let dest = std::env::temp_dir().join(format!("ringleader-session-{container_id}"));
    if let Err(e) = adapter.persist_session_files(container_id, session_files_path, &dest).await {
        log::debug!("could not read agent session files for container {container_id}: {e}");
        return None;
    }
    let id = session_id_from_dir(&dest);
    let _ = std::fs::remove_dir_all(&dest);
    id
}

/// Picks the stem of the most-recently-modified `.jsonl` file in `dir`
/// (the agent CLI names its transcript files `<session-id>.jsonl`).
fn session_id_from_dir(dir: &std::path::Path) -> Option<String> {
    let mut newest: Option<(std::time::SystemTime, String)> = None;
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let modified = match entry.metadata().ok().and_then(|m| m.modified().ok()) {
            Some(m) => m,
            None => continue,
        };
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            newest = Some((modified, stem));
        }
    }
    newest.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_from_dir_picks_newest_jsonl_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old-session.jsonl"), "{}").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(dir.path().join("new-session.jsonl"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        assert_eq!(session_id_from_dir(dir.path()), Some("new-session".to_string()));
    }

    #[test]
    fn session_id_from_dir_is_none_for_empty_or_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(session_id_from_dir(dir.path()), None);
        assert_eq!(session_id_from_dir(&dir.path().join("nope")), None);
    }

    #[test]
    fn is_ready_matches_any_marker() {
        assert!(is_ready("some noise\nWhat would you like to do?\n"));
        assert!(!is_ready("still booting up"));
    }

    #[test]
    fn build_argv_without_resume_ends_in_prompt() {
        let config = AgentConfig::default();
        let argv = config.build_argv("fix the bug", None);
        assert_eq!(argv, vec!["claude".to_string(), "fix the bug".to_string()]);
    }

    #[test]
    fn build_argv_with_resume_inserts_flag_and_session_id() {
        let config = AgentConfig::default();
        let argv = config.build_argv("continue", Some("sess-123"));
        assert_eq!(
            argv,
            vec![
                "claude".to_string(),
                "--resume".to_string(),
                "sess-123".to_string(),
                "continue".to_string(),
            ]
        );
    }
}
