use std::path::PathBuf;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::error::ContainerError;

/// Captured stdout/stderr from a completed container-engine subprocess.
#[derive(Debug)]
pub struct EngineOutput {
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().filter(|l| !l.is_empty()).collect()
    }

    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Low-level container engine command runner.
///
/// Wraps whichever CLI the configured engine exposes (`docker` by default,
/// `podman` as a drop-in alternative — both speak the same subcommand
/// surface this runner needs) via `tokio::process::Command`, the same
/// shelling-out discipline [`crate::vcs::Git`] and
/// [`crate::github::GitHub`] use for their external tools: `kill_on_drop`,
/// a bounded timeout, and UTF-8 decoded output.
#[derive(Debug, Clone)]
pub struct Engine {
    binary: PathBuf,
}

impl Engine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn docker() -> Self {
        Self::new("docker")
    }

    pub fn binary_name(&self) -> String {
        self.binary.to_string_lossy().to_string()
    }

    /// Executes a subcommand with a 30-second timeout, the same bound the
    /// git/gh runners use for ordinary CLI calls.
    pub async fn run(&self, args: &[&str]) -> Result<EngineOutput, ContainerError> {
        self.run_with_timeout(args, Duration::from_secs(30)).await
    }

    /// Executes a subcommand with a caller-supplied timeout — used by
    /// `exec`/`logs`-style calls that may legitimately run longer.
    pub async fn run_with_timeout(
        &self,
        args: &[&str],
        dur: Duration,
    ) -> Result<EngineOutput, ContainerError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).kill_on_drop(true);

        let command_str = format!("{} {}", self.binary_name(), args.join(" "));

        let output = timeout(dur, cmd.output())
            .await
            .map_err(|_| ContainerError::Timeout(command_str.clone()))?
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    ContainerError::EngineNotFound {
                        engine: self.binary_name(),
                    }
                } else {
                    ContainerError::SpawnError {
                        source,
                        command: command_str.clone(),
                    }
                }
            })?;

        let stdout = String::from_utf8(output.stdout)?;
        let stderr = String::from_utf8(output.stderr)?;

        if output.status.success() {
            Ok(EngineOutput { stdout, stderr })
        } else {
            let lower = stderr.to_lowercase();
            if lower.contains("no such container") {
                return Err(ContainerError::NotFound(command_str));
            }
            if lower.contains("cannot connect to the docker daemon")
                || lower.contains("is the docker daemon running")
            {
                return Err(ContainerError::EngineUnavailable(stderr.trim().to_string()));
            }
            Err(ContainerError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
                command: command_str,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_output_lines_skips_blanks() {
        let output = EngineOutput {
            stdout: "a\n\nb\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.lines(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn missing_binary_reports_engine_not_found() {
        let engine = Engine::new("ringleader-definitely-not-a-real-binary");
        let result = engine.run(&["version"]).await;
        assert!(matches!(result, Err(ContainerError::EngineNotFound { .. })));
    }
}
