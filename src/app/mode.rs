use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Whether keystrokes are routed to the focused pane's PTY (`Input`) or
/// interpreted as app commands (`Navigation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigation,
    Input,
}

/// What [`InputRouter::handle_key`] decided to do with a keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterOutcome {
    /// Forward the key to the focused pane's PTY unchanged.
    ForwardToPty(KeyEvent),
    /// Leave the key alone; the caller's mode-specific logic handles it.
    Ignored,
    /// A double Escape within the disambiguation window; switch modes.
    SwitchMode(Mode),
    /// The prefix key was just pressed; armed and waiting for the next key.
    PrefixArmed,
    /// The key following an armed prefix key, to be interpreted as a pane
    /// command (split, navigate, etc.) by the caller.
    PrefixCommand(KeyEvent),
}

fn is_prefix_key(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('b')
}

/// Resolves two ambiguous keystrokes shared with terminal programs running
/// inside a pane:
///
/// - `Escape` alone is usually meant for the program inside the pane (e.g.
///   exiting insert mode in an editor), but two Escapes within
///   `escape_window` mean "actually, take me back to Navigation mode".
/// - `Ctrl+B` arms a 2-second window (tmux's prefix-key convention) during
///   which the next keystroke is a pane command rather than PTY input.
///
/// Pure aside from its own armed-timer state: callers pass in `now`, so
/// tests can drive it without real sleeps.
pub struct InputRouter {
    mode: Mode,
    pending_escape_at: Option<Instant>,
    pending_prefix_at: Option<Instant>,
    escape_window: Duration,
    prefix_window: Duration,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::with_windows(Duration::from_millis(300), Duration::from_secs(2))
    }

    pub fn with_windows(escape_window: Duration, prefix_window: Duration) -> Self {
        Self {
            mode: Mode::Navigation,
            pending_escape_at: None,
            pending_prefix_at: None,
            escape_window,
            prefix_window,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.pending_escape_at = None;
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> RouterOutcome {
        if let Some(armed_at) = self.pending_prefix_at {
            self.pending_prefix_at = None;
            if now.duration_since(armed_at) <= self.prefix_window {
                return RouterOutcome::PrefixCommand(key);
            }
            // Expired: fall through and re-evaluate this key normally.
        }

        if is_prefix_key(&key) {
            self.pending_prefix_at = Some(now);
            return RouterOutcome::PrefixArmed;
        }

        if key.code == KeyCode::Esc {
            return self.handle_escape(now);
        }

        self.pending_escape_at = None;

        match self.mode {
            Mode::Input => RouterOutcome::ForwardToPty(key),
            Mode::Navigation => RouterOutcome::Ignored,
        }
    }

    fn handle_escape(&mut self, now: Instant) -> RouterOutcome {
        match self.mode {
            Mode::Navigation => RouterOutcome::Ignored,
            Mode::Input => {
                if let Some(first_at) = self.pending_escape_at {
                    if now.duration_since(first_at) <= self.escape_window {
                        self.pending_escape_at = None;
                        self.mode = Mode::Navigation;
                        return RouterOutcome::SwitchMode(Mode::Navigation);
                    }
                }
                self.pending_escape_at = Some(now);
                RouterOutcome::ForwardToPty(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))
            }
        }
    }

    /// Clears an armed prefix key once `prefix_window` has elapsed without a
    /// follow-up keystroke. Call on every `Tick`.
    pub fn expire_prefix(&mut self, now: Instant) -> bool {
        if let Some(armed_at) = self.pending_prefix_at {
            if now.duration_since(armed_at) > self.prefix_window {
                self.pending_prefix_at = None;
                return true;
            }
        }
        false
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn single_escape_in_input_mode_forwards_to_pty_and_arms_timer() {
        let mut router = InputRouter::new();
        router.set_mode(Mode::Input);
        let now = Instant::now();
        let outcome = router.handle_key(key(KeyCode::Esc), now);
        assert!(matches!(outcome, RouterOutcome::ForwardToPty(_)));
    }

    #[test]
    fn double_escape_within_window_switches_to_navigation() {
        let mut router = InputRouter::new();
        router.set_mode(Mode::Input);
        let now = Instant::now();
        router.handle_key(key(KeyCode::Esc), now);
        let outcome = router.handle_key(key(KeyCode::Esc), now + Duration::from_millis(50));
        assert_eq!(outcome, RouterOutcome::SwitchMode(Mode::Navigation));
    }

    #[test]
    fn double_escape_outside_window_is_two_separate_forwards() {
        let mut router = InputRouter::new();
        router.set_mode(Mode::Input);
        let now = Instant::now();
        router.handle_key(key(KeyCode::Esc), now);
        let outcome = router.handle_key(key(KeyCode::Esc), now + Duration::from_millis(500));
        assert!(matches!(outcome, RouterOutcome::ForwardToPty(_)));
    }

    #[test]
    fn prefix_key_then_command_within_window_is_prefix_command() {
        let mut router = InputRouter::new();
        let now = Instant::now();
        let armed = router.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL), now);
        assert_eq!(armed, RouterOutcome::PrefixArmed);
        let outcome = router.handle_key(key(KeyCode::Char('h')), now + Duration::from_millis(100));
        assert!(matches!(outcome, RouterOutcome::PrefixCommand(_)));
    }

    #[test]
    fn prefix_key_expires_after_window() {
        let mut router = InputRouter::new();
        router.set_mode(Mode::Navigation);
        let now = Instant::now();
        router.handle_key(KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL), now);
        let outcome = router.handle_key(key(KeyCode::Char('h')), now + Duration::from_secs(3));
        assert_eq!(outcome, RouterOutcome::Ignored);
    }
}
