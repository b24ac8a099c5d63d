/// All possible errors from container engine operations.
///
/// Shaped like [`crate::vcs::GitError`] and [`crate::github::GitHubError`]:
/// binary-not-found, spawn failures, non-zero exits, plus the domain-specific
/// conditions the orchestration loop needs to distinguish (a missing
/// container is not the same failure as an engine that's not running).
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Neither `docker` nor the configured engine binary is on `$PATH`.
    #[error("container engine '{engine}' not found. Is it installed and on PATH?")]
    EngineNotFound { engine: String },

    /// The engine binary exists but its daemon/service is unreachable.
    #[error("container engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A container command exited with a non-zero status code.
    #[error("container command failed (exit code {code}): {stderr}")]
    CommandFailed {
        code: i32,
        stderr: String,
        command: String,
    },

    /// The engine process could not be spawned.
    #[error("failed to spawn container engine process: {source}")]
    SpawnError {
        source: std::io::Error,
        command: String,
    },

    /// Output was not valid UTF-8.
    #[error("invalid UTF-8 in container engine output")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Structured (JSON) output could not be parsed as expected.
    #[error("failed to parse container engine output: {message}")]
    ParseError { message: String },

    /// No container exists with the given label/ID.
    #[error("container not found: {0}")]
    NotFound(String),

    /// A `Start` was requested for a container that is already running.
    #[error("container already running: {0}")]
    AlreadyRunning(String),

    /// The operation did not complete within its allotted time.
    #[error("container operation timed out: {0}")]
    Timeout(String),
}

impl serde::Serialize for ContainerError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
