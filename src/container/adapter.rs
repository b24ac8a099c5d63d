use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::ContainerError;
use super::ops::{ContainerStats, ContainerSummary, DiskUsage};
use super::runner::Engine;

/// The full container lifecycle surface the command dispatcher and
/// workstream manager depend on. A trait so tests can inject
/// [`FakeContainer`] instead of shelling out to a real engine — the same
/// pattern [`crate::vcs::VcsAdapter`] uses for git.
#[async_trait]
pub trait ContainerAdapter: Send + Sync {
    async fn start(
        &self,
        image: &str,
        label: &str,
        workdir: &str,
        mounts: &[(String, String)],
    ) -> Result<String, ContainerError>;
    async fn resume(&self, id: &str) -> Result<(), ContainerError>;
    async fn pause(&self, id: &str) -> Result<(), ContainerError>;
    async fn stop(&self, id: &str, grace_secs: u32) -> Result<(), ContainerError>;
    async fn remove(&self, id: &str, force: bool) -> Result<(), ContainerError>;
    async fn signal_process(&self, id: &str, signal: &str) -> Result<(), ContainerError>;
    async fn logs(&self, id: &str, lines: u32) -> Result<String, ContainerError>;
    async fn stats(&self, id: &str) -> Result<ContainerStats, ContainerError>;
    async fn disk_usage(&self, id: &str) -> Result<DiskUsage, ContainerError>;
    async fn list(&self) -> Result<Vec<ContainerSummary>, ContainerError>;
    async fn persist_session_files(
        &self,
        id: &str,
        container_path: &str,
        dest: &Path,
    ) -> Result<(), ContainerError>;
    /// Builds the full argv for an interactive `exec` into a running
    /// container, binary name resolved from whichever engine the adapter
    /// wraps (docker, podman, ...). Pure argv construction, no I/O — the
    /// caller (the PTY layer) spawns it.
    fn exec_argv(&self, id: &str, argv: &[String]) -> Vec<String>;
}

#[async_trait]
impl ContainerAdapter for Engine {
    async fn start(
        &self,
        image: &str,
        label: &str,
        workdir: &str,
        mounts: &[(String, String)],
    ) -> Result<String, ContainerError> {
        Engine::start(self, image, label, workdir, mounts).await
    }
    async fn resume(&self, id: &str) -> Result<(), ContainerError> {
        Engine::resume(self, id).await
    }
    async fn pause(&self, id: &str) -> Result<(), ContainerError> {
        Engine::pause(self, id).await
    }
    async fn stop(&self, id: &str, grace_secs: u32) -> Result<(), ContainerError> {
        Engine::stop(self, id, grace_secs).await
    }
    async fn remove(&self, id: &str, force: bool) -> Result<(), ContainerError> {
        Engine::remove(self, id, force).await
    }
    async fn signal_process(&self, id: &str, signal: &str) -> Result<(), ContainerError> {
        Engine::signal_process(self, id, signal).await
    }
    async fn logs(&self, id: &str, lines: u32) -> Result<String, ContainerError> {
        Engine::logs(self, id, lines).await
    }
    async fn stats(&self, id: &str) -> Result<ContainerStats, ContainerError> {
        Engine::stats(self, id).await
    }
    async fn disk_usage(&self, id: &str) -> Result<DiskUsage, ContainerError> {
        Engine::disk_usage(self, id).await
    }
    async fn list(&self) -> Result<Vec<ContainerSummary>, ContainerError> {
        Engine::list(self).await
    }
    async fn persist_session_files(
        &self,
        id: &str,
        container_path: &str,
        dest: &Path,
    ) -> Result<(), ContainerError> {
        Engine::persist_session_files(self, id, container_path, dest).await
    }
    fn exec_argv(&self, id: &str, argv: &[String]) -> Vec<String> {
        let mut full = vec![self.binary_name(), "exec".to_string(), "-it".to_string(), id.to_string()];
        full.extend_from_slice(argv);
        full
    }
}

/// In-memory fake container engine for unit tests: tracks running/paused/
/// removed IDs without touching a real engine.
#[derive(Default)]
pub struct FakeContainer {
    next_id: Mutex<u32>,
    state: Mutex<HashMap<String, bool>>, // id -> running
}

impl FakeContainer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContainerAdapter for FakeContainer {
    async fn start(
        &self,
        _image: &str,
        _label: &str,
        _workdir: &str,
        _mounts: &[(String, String)],
    ) -> Result<String, ContainerError> {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let id = format!("fake-{}", *next_id);
        self.state.lock().unwrap().insert(id.clone(), true);
        Ok(id)
    }
    async fn resume(&self, id: &str) -> Result<(), ContainerError> {
        let mut state = self.state.lock().unwrap();
        if !state.contains_key(id) {
            return Err(ContainerError::NotFound(id.to_string()));
        }
        state.insert(id.to_string(), true);
        Ok(())
    }
    async fn pause(&self, id: &str) -> Result<(), ContainerError> {
        let mut state = self.state.lock().unwrap();
        state
            .get_mut(id)
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))
            .map(|running| *running = false)
    }
    async fn stop(&self, id: &str, _grace_secs: u32) -> Result<(), ContainerError> {
        self.pause(id).await
    }
    async fn remove(&self, id: &str, _force: bool) -> Result<(), ContainerError> {
        self.state
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ContainerError::NotFound(id.to_string()))
    }
    async fn signal_process(&self, id: &str, _signal: &str) -> Result<(), ContainerError> {
        if self.state.lock().unwrap().contains_key(id) {
            Ok(())
        } else {
            Err(ContainerError::NotFound(id.to_string()))
        }
    }
    async fn logs(&self, _id: &str, _lines: u32) -> Result<String, ContainerError> {
        Ok(String::new())
    }
    async fn stats(&self, _id: &str) -> Result<ContainerStats, ContainerError> {
        Ok(ContainerStats {
            cpu_percent: 0.0,
            memory_bytes: 0,
            memory_limit_bytes: 0,
        })
    }
    async fn disk_usage(&self, _id: &str) -> Result<DiskUsage, ContainerError> {
        Ok(DiskUsage {
            size_bytes: 0,
            virtual_size_bytes: 0,
        })
    }
    async fn list(&self) -> Result<Vec<ContainerSummary>, ContainerError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .iter()
            .map(|(id, running)| ContainerSummary {
                id: id.clone(),
                label: id.clone(),
                running: *running,
            })
            .collect())
    }
    async fn persist_session_files(
        &self,
        _id: &str,
        _container_path: &str,
        _dest: &Path,
    ) -> Result<(), ContainerError> {
        Ok(())
    }
    fn exec_argv(&self, id: &str, argv: &[String]) -> Vec<String> {
        let mut full = vec!["fake-exec".to_string(), id.to_string()];
        full.extend_from_slice(argv);
        full
    }
}
