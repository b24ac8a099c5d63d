use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Size of the bounded channel the main event loop reads from. Sized well
/// above any burst a PTY or the terminal backend could plausibly produce in
/// one scheduler tick; producers fail open (drop + log) rather than block
/// once it's full, consistent with every other backpressure point in the
/// app.
pub const EVENT_CHANNEL_CAP: usize = 4096;

/// Everything the central event loop reacts to: terminal input, PTY output,
/// background task completions, and internal timers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(crossterm::event::KeyEvent),
    Mouse(crossterm::event::MouseEvent),
    Resize(u16, u16),
    /// Decoded PTY output for one workstream's pane, ready to feed into its
    /// terminal emulator.
    PtyOutput { workstream_id: u32, text: String },
    /// A workstream's agent process printed one of the configured readiness
    /// markers.
    AgentReady { workstream_id: u32 },
    /// The process inside a workstream's container exited.
    ContainerExited { workstream_id: u32, code: Option<i32> },
    /// Fires `auto_continue_delay` after a workstream becomes ready, when
    /// either it was interrupted mid-work or its initial prompt begins with
    /// "continue" — the loop sends a bare `continue` line to the PTY.
    AutoContinue { workstream_id: u32 },
    Tick,
    Shutdown,
}

/// Implemented by any background task that feeds [`AppEvent`]s into the main
/// loop's channel — the PTY reader bridge, the pairing health-check timer,
/// the tick source. Mirrors the async-source registration pattern used for
/// terminal input/tick events elsewhere in the ecosystem: one trait, one
/// spawned task per source, clean exit on channel closure.
pub trait AsyncEventSource: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<AppEvent>) -> JoinHandle<()>;
}

#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: impl AsyncEventSource) {
        self.sources.push(Box::new(source));
    }

    pub fn spawn_all(self, tx: &Sender<AppEvent>) -> Vec<JoinHandle<()>> {
        self.sources
            .into_iter()
            .map(|source| {
                log::debug!("spawning event source: {}", source.name());
                source.spawn(tx.clone())
            })
            .collect()
    }
}

/// Emits [`AppEvent::Tick`] on a fixed interval, driving spinner animation,
/// toast expiry, and the pairing health-check schedule without a busy loop.
pub struct TickEventSource {
    interval: Duration,
}

impl TickEventSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<AppEvent>) -> JoinHandle<()> {
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if tx.send(AppEvent::Tick).await.is_err() {
                    return;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn tick_source_emits_and_exits_on_channel_drop() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut registry = EventSourceRegistry::new();
        registry.register(TickEventSource::new(Duration::from_millis(5)));
        let handles = registry.spawn_all(&tx);

        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AppEvent::Tick));

        drop(tx);
        drop(rx);
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_millis(50), handle).await;
        }
    }
}
