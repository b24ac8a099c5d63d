use serde::Serialize;

use super::error::ContainerError;
use super::runner::Engine;

/// Resource usage snapshot for a single container, as reported by `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerStats {
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    pub memory_limit_bytes: u64,
}

/// Disk usage for a container's writable layer, as reported by `DiskUsage`.
#[derive(Debug, Clone, Serialize)]
pub struct DiskUsage {
    pub size_bytes: u64,
    pub virtual_size_bytes: u64,
}

/// Summary row for `List`.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    pub id: String,
    pub label: String,
    pub running: bool,
}

/// Lifecycle state returned by `Start`/`Resume`/`Stop`, mirroring the subset
/// of Docker's own status strings the orchestrator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRunState {
    Running,
    Paused,
    Stopped,
}

impl Engine {
    /// Starts a fresh container from `image`, labeled with `label` so later
    /// calls can address it without tracking IDs independently, and returns
    /// its engine-assigned ID.
    pub async fn start(
        &self,
        image: &str,
        label: &str,
        workdir: &str,
        mounts: &[(String, String)],
    ) -> Result<String, ContainerError> {
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--label".into(),
            format!("ringleader.workstream={label}"),
            "-w".into(),
            workdir.into(),
        ];
        for (host, container) in mounts {
            args.push("-v".into());
            args.push(format!("{host}:{container}"));
        }
        args.push(image.into());

        let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        let output = self.run(&arg_refs).await?;
        Ok(output.trimmed().to_string())
    }

    /// Resumes a previously paused or stopped container.
    pub async fn resume(&self, id: &str) -> Result<(), ContainerError> {
        self.run(&["start", id]).await?;
        Ok(())
    }

    /// Pauses a running container without destroying it.
    pub async fn pause(&self, id: &str) -> Result<(), ContainerError> {
        self.run(&["pause", id]).await?;
        Ok(())
    }

    /// Stops a running container, giving it `grace_secs` to shut down
    /// cleanly before the engine escalates to a forced kill.
    pub async fn stop(&self, id: &str, grace_secs: u32) -> Result<(), ContainerError> {
        self.run(&["stop", "-t", &grace_secs.to_string(), id]).await?;
        Ok(())
    }

    /// Removes a container permanently. `force` removes even if running.
    pub async fn remove(&self, id: &str, force: bool) -> Result<(), ContainerError> {
        let mut args = vec!["rm"];
        if force {
            args.push("-f");
        }
        args.push(id);
        self.run(&args).await?;
        Ok(())
    }

    /// Sends a signal (e.g. `"TERM"`, `"KILL"`, `"INT"`) to the container's
    /// root process.
    pub async fn signal_process(&self, id: &str, signal: &str) -> Result<(), ContainerError> {
        self.run(&["kill", "-s", signal, id]).await?;
        Ok(())
    }

    /// Returns the trailing `lines` of stdout/stderr from the container.
    pub async fn logs(&self, id: &str, lines: u32) -> Result<String, ContainerError> {
        let output = self.run(&["logs", "--tail", &lines.to_string(), id]).await?;
        Ok(output.stdout)
    }

    /// Returns a one-shot CPU/memory snapshot, parsed from
    /// `docker stats --no-stream --format`.
    pub async fn stats(&self, id: &str) -> Result<ContainerStats, ContainerError> {
        let output = self
            .run(&[
                "stats",
                "--no-stream",
                "--format",
                "{{.CPUPerc}}|{{.MemUsage}}",
                id,
            ])
            .await?;
        let line = output.trimmed();
        let mut parts = line.splitn(2, '|');
        let cpu_percent = parts
            .next()
            .unwrap_or("0")
            .trim_end_matches('%')
            .parse::<f64>()
            .unwrap_or(0.0);
        let mem_part = parts.next().unwrap_or("0MiB / 0MiB");
        let (used, limit) = parse_mem_usage(mem_part);
        Ok(ContainerStats {
            cpu_percent,
            memory_bytes: used,
            memory_limit_bytes: limit,
        })
    }

    /// Returns the writable layer size for a container via `docker system df -v`-style sizing.
    pub async fn disk_usage(&self, id: &str) -> Result<DiskUsage, ContainerError> {
        let output = self
            .run(&["inspect", id, "--format", "{{.SizeRw}}|{{.SizeRootFs}}"])
            .await?;
        let line = output.trimmed();
        let mut parts = line.splitn(2, '|');
        let size_bytes = parts.next().unwrap_or("0").parse().unwrap_or(0);
        let virtual_size_bytes = parts.next().unwrap_or("0").parse().unwrap_or(0);
        Ok(DiskUsage {
            size_bytes,
            virtual_size_bytes,
        })
    }

    /// Lists all containers Ringleader has labeled, regardless of state.
    pub async fn list(&self) -> Result<Vec<ContainerSummary>, ContainerError> {
        let output = self
            .run(&[
                "ps",
                "-a",
                "--filter",
                "label=ringleader.workstream",
                "--format",
                "{{.ID}}|{{.Label \"ringleader.workstream\"}}|{{.State}}",
            ])
            .await?;
        Ok(output
            .lines()
            .iter()
            .filter_map(|line| {
                let mut parts = line.splitn(3, '|');
                let id = parts.next()?.to_string();
                let label = parts.next()?.to_string();
                let state = parts.next().unwrap_or("");
                Some(ContainerSummary {
                    id,
                    label,
                    running: state.contains("running"),
                })
            })
            .collect())
    }

    /// Copies session files out of the container's filesystem into `dest`
    /// on the host, used before a workstream is torn down so agent session
    /// history survives container removal.
    pub async fn persist_session_files(
        &self,
        id: &str,
        container_path: &str,
        dest: &std::path::Path,
    ) -> Result<(), ContainerError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| ContainerError::SpawnError {
                source: e,
                command: format!("create_dir_all {:?}", parent),
            })?;
        }
        self.run(&["cp", &format!("{id}:{container_path}"), &dest.to_string_lossy()])
            .await?;
        Ok(())
    }
}

/// Parses Docker's `"12.3MiB / 512MiB"` memory usage string into bytes.
fn parse_mem_usage(s: &str) -> (u64, u64) {
    let mut parts = s.split('/').map(str::trim);
    let used = parts.next().map(parse_size).unwrap_or(0);
    let limit = parts.next().map(parse_size).unwrap_or(0);
    (used, limit)
}

fn parse_size(s: &str) -> u64 {
    let s = s.trim();
    let (num_part, unit) = s.split_at(s.find(|c: char| c.is_alphabetic()).unwrap_or(s.len()));
    let num: f64 = num_part.parse().unwrap_or(0.0);
    let multiplier: f64 = match unit.to_ascii_uppercase().as_str() {
        "KIB" | "KB" => 1024.0,
        "MIB" | "MB" => 1024.0 * 1024.0,
        "GIB" | "GB" => 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    };
    (num * multiplier) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mem_usage_pair() {
        let (used, limit) = parse_mem_usage("128MiB / 2GiB");
        assert_eq!(used, 128 * 1024 * 1024);
        assert_eq!(limit, 2 * 1024 * 1024 * 1024);
    }
}
