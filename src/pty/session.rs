use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use dashmap::DashMap;
use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use tokio::sync::{mpsc, Notify};

#[cfg(unix)]
use libc;

use super::decoder::Utf8Decoder;
use super::error::PtyError;

/// Output chunk emitted by a PTY reader task, consumed by the UI event loop
/// and fed into that workstream's terminal grid.
#[derive(Debug, Clone)]
pub struct PtyOutput {
    pub session_id: u32,
    pub text: String,
}

/// Upper bound on a coalesced-but-unsent `PtyOutput` chunk. A consumer
/// stalled longer than this many bytes' worth of output has the oldest
/// bytes dropped rather than growing `pending` without limit.
const PENDING_COALESCE_CAP: usize = 1024 * 1024;

/// Keeps `text` at or under [`PENDING_COALESCE_CAP`] by dropping bytes from
/// the front, snapped to a char boundary so the string stays valid UTF-8.
fn trim_to_cap(text: &mut String) {
    if text.len() <= PENDING_COALESCE_CAP {
        return;
    }
    let excess = text.len() - PENDING_COALESCE_CAP;
    let mut cut = excess;
    while cut < text.len() && !text.is_char_boundary(cut) {
        cut += 1;
    }
    text.drain(0..cut);
}

/// A single PTY session with its associated resources.
struct PtySession {
    /// Writer half of the PTY master — used for stdin.
    writer: Mutex<Box<dyn Write + Send>>,
    /// Master PTY handle — used for resize operations.
    master: Mutex<Box<dyn MasterPty + Send>>,
    /// PID of the child process (the container engine's `exec`/`run` client).
    child_pid: i32,
    /// Process group ID for signal delivery (Unix only). portable-pty calls
    /// setsid() on spawn, so the child becomes a session+group leader (PGID == child PID).
    #[cfg(unix)]
    pgid: i32,
    /// Signal to shut down the reader thread.
    shutdown: Arc<Notify>,
    /// Handle to the dedicated reader OS thread.
    reader_handle: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    sessions: DashMap<u32, PtySession>,
    next_id: AtomicU32,
}

/// Owns and manages all PTY sessions for the process lifetime.
///
/// Each workstream's terminal is backed by one session here, opened against
/// the container engine's `exec` client (e.g. `docker exec -it <id> <agent>`)
/// rather than a raw host shell — the PTY itself is still native to this
/// process, only the child command differs from a desktop terminal's.
/// Session IDs are monotonically increasing and never reused.
#[derive(Clone)]
pub struct PtyManager {
    inner: Arc<Inner>,
}

impl Default for PtyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PtyManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                next_id: AtomicU32::new(1),
            }),
        }
    }

    /// Opens a PTY and spawns `argv[0] argv[1..]` inside it (typically a
    /// container engine's `exec -it` invocation), returning the new session
    /// ID. Output flows through `tx` as [`PtyOutput`] chunks; if the bounded
    /// channel is momentarily full, chunks are coalesced into one pending
    /// buffer and retried rather than dropped — only a closed receiver ends
    /// the emitter task.
    pub fn spawn_exec(
        &self,
        argv: &[String],
        cwd: Option<&str>,
        env: Option<HashMap<String, String>>,
        tx: mpsc::Sender<PtyOutput>,
    ) -> Result<u32, PtyError> {
        let id = self
            .inner
            .next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            })
            .map_err(|_| PtyError::id_overflow())?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::spawn_failed(format!("Failed to open PTY: {e}")))?;

        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| PtyError::spawn_failed("empty argv"))?;
        let mut cmd = CommandBuilder::new(program);
        cmd.args(rest);

        if let Some(envs) = env {
            for (key, value) in envs {
                cmd.env(&key, &value);
            }
        }
        if let Some(dir) = cwd {
            cmd.cwd(dir);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::spawn_failed(format!("Failed to spawn: {e}")))?;

        let child_pid = child
            .process_id()
            .map(|pid| pid as i32)
            .ok_or_else(|| PtyError::spawn_failed("Could not obtain child PID"))?;

        #[cfg(unix)]
        let pgid = pair.master.process_group_leader().unwrap_or(child_pid);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::spawn_failed(format!("Failed to take PTY writer: {e}")))?;

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::spawn_failed(format!("Failed to clone PTY reader: {e}")))?;

        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();

        let (byte_tx, mut byte_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(256);

        // Dropping the master/writer closes the PTY fd, which EOFs the
        // blocking `reader.read()` below — the primary way this thread ends.
        let reader_handle = std::thread::Builder::new()
            .name(format!("pty-reader-{id}"))
            .spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if byte_tx.blocking_send(buf[..n].to_vec()).is_err() {
                                log::warn!(
                                    "PTY reader {id}: channel send failed, dropping {n} bytes"
                                );
                                break;
                            }
                        }
                        Err(e) => {
                            #[cfg(unix)]
                            {
                                let raw = e.raw_os_error().unwrap_or(0);
                                if raw == libc::EAGAIN || raw == libc::EINTR {
                                    continue;
                                }
                            }
                            log::debug!("PTY reader {id} error: {e}");
                            break;
                        }
                    }
                }
                log::debug!("PTY reader {id} exited");
            })
            .map_err(|e| PtyError::spawn_failed(format!("Failed to spawn reader thread: {e}")))?;

        tokio::spawn(async move {
            let mut decoder = Utf8Decoder::new();
            // Coalesces output that can't be sent immediately rather than
            // dropping it; the short retry interval keeps a backed-up
            // consumer from seeing stale output balloon unboundedly. If the
            // consumer stays stalled long enough for the coalesced chunk to
            // exceed PENDING_COALESCE_CAP, the oldest bytes are trimmed —
            // the most recent terminal output is what matters once a pane
            // this far behind catches up, not the full scrollback.
            let mut pending: Option<String> = None;
            let mut retry = tokio::time::interval(std::time::Duration::from_millis(20));
            loop {
                tokio::select! {
                    data = byte_rx.recv() => {
                        match data {
                            Some(bytes) => {
                                let text = decoder.decode(&bytes);
                                if text.is_empty() && pending.is_none() {
                                    continue;
                                }
                                let mut merged = match pending.take() {
                                    Some(mut buffered) => {
                                        buffered.push_str(&text);
                                        buffered
                                    }
                                    None => text,
                                };
                                trim_to_cap(&mut merged);
                                match tx.try_send(PtyOutput { session_id: id, text: merged }) {
                                    Ok(()) => {}
                                    Err(mpsc::error::TrySendError::Full(PtyOutput { text, .. })) => {
                                        log::debug!("PTY output channel for session {id} full, coalescing chunk");
                                        pending = Some(text);
                                    }
                                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                                }
                            }
                            None => break,
                        }
                    }
                    _ = retry.tick(), if pending.is_some() => {
                        if let Some(text) = pending.take() {
                            match tx.try_send(PtyOutput { session_id: id, text }) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(PtyOutput { text, .. })) => pending = Some(text),
                                Err(mpsc::error::TrySendError::Closed(_)) => break,
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
            log::debug!("PTY event emitter {id} exited");
        });

        drop(pair.slave);

        let session = PtySession {
            writer: Mutex::new(writer),
            master: Mutex::new(pair.master),
            child_pid,
            #[cfg(unix)]
            pgid,
            shutdown,
            reader_handle: Mutex::new(Some(reader_handle)),
        };

        self.inner.sessions.insert(id, session);
        log::info!("Spawned PTY session {id} (pid={child_pid}, argv[0]={program})");

        Ok(id)
    }

    pub fn write_stdin(&self, session_id: u32, data: &str) -> Result<(), PtyError> {
        let session = self
            .inner
            .sessions
            .get(&session_id)
            .ok_or_else(|| PtyError::session_not_found(session_id))?;

        let mut writer = session
            .writer
            .lock()
            .map_err(|e| PtyError::write_failed(format!("Writer lock poisoned: {e}")))?;

        writer
            .write_all(data.as_bytes())
            .map_err(|e| PtyError::write_failed(format!("Write failed: {e}")))?;
        writer
            .flush()
            .map_err(|e| PtyError::write_failed(format!("Flush failed: {e}")))?;
        Ok(())
    }

    /// Resizes the PTY. Callers must validate 0 < rows,cols <= 500 first.
    pub fn resize_pty(&self, session_id: u32, rows: u16, cols: u16) -> Result<(), PtyError> {
        let session = self
            .inner
            .sessions
            .get(&session_id)
            .ok_or_else(|| PtyError::session_not_found(session_id))?;

        let master = session
            .master
            .lock()
            .map_err(|e| PtyError::resize_failed(format!("Master lock poisoned: {e}")))?;

        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::resize_failed(format!("Resize failed: {e}")))?;
        Ok(())
    }

    /// Terminates a PTY session with graceful escalation: SIGTERM to the
    /// process group, up to 3s grace, then SIGKILL. Idempotent — the
    /// session is removed from the map before signaling, so a concurrent or
    /// repeated call with the same ID returns `SessionNotFound` rather than
    /// signaling a PID that may have been reused by the OS.
    pub async fn kill_session(&self, session_id: u32) -> Result<(), PtyError> {
        let session = self
            .inner
            .sessions
            .remove(&session_id)
            .ok_or_else(|| PtyError::session_not_found(session_id))?
            .1;

        let pid = session.child_pid;

        #[cfg(unix)]
        {
            let pgid = session.pgid;
            let term_result = unsafe { libc::kill(-pgid, libc::SIGTERM) };
            if term_result != 0 {
                log::warn!(
                    "Failed to SIGTERM session {session_id} (pgid={pgid}): {}",
                    std::io::Error::last_os_error()
                );
            }

            let exited = tokio::time::timeout(std::time::Duration::from_secs(3), async {
                loop {
                    let result = unsafe { libc::kill(pid, 0) };
                    if result != 0 {
                        return;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            })
            .await;

            if exited.is_err() {
                let kill_result = unsafe { libc::kill(-pgid, libc::SIGKILL) };
                if kill_result != 0 {
                    log::warn!(
                        "Failed to SIGKILL session {session_id} (pgid={pgid}): {}",
                        std::io::Error::last_os_error()
                    );
                }
                log::warn!("Session {session_id} (pid={pid}, pgid={pgid}) required SIGKILL");
            }
        }

        session.shutdown.notify_one();
        drop(session.writer);
        drop(session.master);

        let reader_handle = session
            .reader_handle
            .lock()
            .map_err(|e| log::warn!("Reader handle lock poisoned during cleanup: {e}"))
            .ok()
            .and_then(|mut h| h.take());

        if let Some(handle) = reader_handle {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }

        log::info!("Killed PTY session {session_id}");
        Ok(())
    }

    pub fn get_session_pid(&self, session_id: u32) -> Option<i32> {
        self.inner.sessions.get(&session_id).map(|s| s.child_pid)
    }

    pub fn get_all_session_pids(&self) -> Vec<(u32, i32)> {
        self.inner
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().child_pid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kill_unknown_session_returns_not_found() {
        let manager = PtyManager::new();
        let result = manager.kill_session(999).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn repeated_kill_is_idempotent_not_double_free() {
        let manager = PtyManager::new();
        let (tx, _rx) = mpsc::channel(16);
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 1".to_string()];
        let id = manager
            .spawn_exec(&argv, None, None, tx)
            .expect("spawn should succeed in test sandbox");

        manager.kill_session(id).await.expect("first kill succeeds");
        let second = manager.kill_session(id).await;
        assert!(second.is_err(), "second kill of the same id must not succeed silently");
    }

    #[test]
    fn trim_to_cap_leaves_short_text_untouched() {
        let mut text = "hello".to_string();
        trim_to_cap(&mut text);
        assert_eq!(text, "hello");
    }

    #[test]
    fn trim_to_cap_drops_oldest_bytes_on_a_char_boundary() {
        let mut text = "a".repeat(PENDING_COALESCE_CAP + 5);
        trim_to_cap(&mut text);
        assert_eq!(text.len(), PENDING_COALESCE_CAP);

        let mut multibyte = String::new();
        multibyte.push_str(&"a".repeat(PENDING_COALESCE_CAP - 1));
        multibyte.push('\u{20ac}');
        trim_to_cap(&mut multibyte);
        assert!(multibyte.len() <= PENDING_COALESCE_CAP);
        assert!(multibyte.is_char_boundary(0));
    }
}
