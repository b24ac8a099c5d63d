use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{Event as CtEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect as RtRect;
use ratatui::style::{Color as RtColor, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal as RatatuiTerminal;
use tokio::sync::mpsc;

use crate::agent::{self, AgentConfig};
use crate::command::{CommandDispatcher, CommandError, CommandOutcome};
use crate::config::Config;
use crate::pane::{Pane, PaneSet};
use crate::pty::PtyManager;
use crate::terminal::{Cell, Color as GridColor};
use crate::vcs::GitError;
use crate::workstream::WorkstreamStatus;

use super::dispatch::{dispatch, AppRuntime, Command, Msg};
use super::event::{AppEvent, EventSourceRegistry, TickEventSource, EVENT_CHANNEL_CAP};
use super::mode::{Mode, RouterOutcome};

const AGENT_READY_BUFFER_CAP: usize = 8 * 1024;

/// Wires the pure `dispatch` state machine, the PTY manager, and the
/// command dispatcher into one running process: owns the terminal backend,
/// the pane set mirroring the workstream set, and the bookkeeping needed to
/// route async results back to the right pane.
pub struct App {
    runtime: AppRuntime,
    panes: PaneSet,
    dispatcher: Arc<CommandDispatcher>,
    pty: Arc<PtyManager>,
    agent_config: AgentConfig,
    config: Config,
    session_to_workstream: HashMap<u32, u32>,
    /// Accumulated PTY output per workstream since its last readiness check,
    /// trimmed once it exceeds [`AGENT_READY_BUFFER_CAP`] — ready markers
    /// appear early in startup output, so an unbounded buffer isn't needed.
    ready_buffers: HashMap<u32, String>,
    /// The in-progress text of the "new workstream" prompt dialog, `Some`
    /// only while it's open. A minimal stand-in for a full modal widget:
    /// captures raw characters until Enter (submit) or Esc (cancel).
    composing_prompt: Option<String>,
    /// Armed by a first `q` press in Navigation mode; a second `q` before
    /// the next unrelated keystroke confirms the quit.
    pending_quit: bool,
}

impl App {
    pub fn new(runtime: AppRuntime, dispatcher: Arc<CommandDispatcher>, config: Config) -> Self {
        Self {
            runtime,
            panes: PaneSet::new(),
            dispatcher,
            pty: Arc::new(PtyManager::new()),
            agent_config: AgentConfig::default(),
            config,
            session_to_workstream: HashMap::new(),
            ready_buffers: HashMap::new(),
            composing_prompt: None,
            pending_quit: false,
        }
    }

    /// Runs the event loop until a `Quit` is confirmed or the terminal
    /// backend fails. Always restores the terminal on the way out, even on
    /// error, so a panic or an early return never leaves the user's shell
    /// in raw/alternate-screen mode.
    pub async fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = RatatuiTerminal::new(backend)?;
        if self.config.mouse_enabled {
            execute!(terminal.backend_mut(), crossterm::event::EnableMouseCapture)?;
        }

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        if self.config.mouse_enabled {
            let _ = execute!(terminal.backend_mut(), crossterm::event::DisableMouseCapture);
        }
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut RatatuiTerminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(EVENT_CHANNEL_CAP);

        let mut registry = EventSourceRegistry::new();
        registry.register(TickEventSource::new(self.config.spinner_interval));
        let _source_handles = registry.spawn_all(&event_tx);

        let input_tx = event_tx.clone();
        std::thread::spawn(move || input_reader_thread(input_tx));

        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<(Command, Result<CommandOutcome, CommandError>)>();

        let to_resume: Vec<u32> = self
            .runtime
            .workstreams
            .iter()
            .filter(|ws| ws.container_id.is_some())
            .map(|ws| ws.id)
            .collect();
        for id in to_resume {
            self.apply(Msg::ResumeWorkstream { id }, &outcome_tx);
        }

        terminal.draw(|f| self.render(f))?;

        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    if matches!(event, AppEvent::Shutdown) {
                        break;
                    }
                    let quit = self.handle_event(event, &outcome_tx, &event_tx);
                    terminal.draw(|f| self.render(f))?;
                    if quit {
                        break;
                    }
                }
                Some((command, result)) = outcome_rx.recv() => {
                    self.handle_outcome(command, result, &outcome_tx, &event_tx);
                    terminal.draw(|f| self.render(f))?;
                }
                else => break,
            }
        }

        Ok(())
    }

    fn handle_event(
        &mut self,
        event: AppEvent,
        outcome_tx: &mpsc::UnboundedSender<(Command, Result<CommandOutcome, CommandError>)>,
        event_tx: &mpsc::Sender<AppEvent>,
    ) -> bool {
        match event {
            AppEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    return false;
                }
                return self.handle_key(key, outcome_tx);
            }
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Resize(cols, rows) => self.resize_panes(cols, rows),
            AppEvent::PtyOutput { workstream_id, text } => self.handle_pty_output(workstream_id, text),
            AppEvent::AgentReady { workstream_id } => self.handle_agent_ready(workstream_id),
            AppEvent::ContainerExited { workstream_id, code } => {
                log::info!("container for workstream {workstream_id} exited (code {code:?})");
                let was_running = self
                    .runtime
                    .workstreams
                    .get(workstream_id)
                    .map(|ws| ws.status == WorkstreamStatus::Running)
                    .unwrap_or(false);
                if was_running {
                    let _ = self.runtime.workstreams.set_was_interrupted(workstream_id, true);
                }
                let _ = self.runtime.workstreams.transition(workstream_id, WorkstreamStatus::Stopped);
            }
            AppEvent::AutoContinue { workstream_id } => self.send_auto_continue(workstream_id),
            AppEvent::Tick => self.handle_tick(),
            AppEvent::Shutdown => return true,
        }
        false
    }

    fn handle_key(
        &mut self,
        key: crossterm::event::KeyEvent,
        outcome_tx: &mpsc::UnboundedSender<(Command, Result<CommandOutcome, CommandError>)>,
    ) -> bool {
        use crossterm::event::KeyCode;

        if let Some(draft) = self.composing_prompt.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let prompt = std::mem::take(draft);
                    self.composing_prompt = None;
                    if !prompt.trim().is_empty() {
                        self.create_workstream_from_prompt(prompt, outcome_tx);
                    }
                }
                KeyCode::Esc => self.composing_prompt = None,
                KeyCode::Backspace => {
                    draft.pop();
                }
                KeyCode::Char(c) => draft.push(c),
                _ => {}
            }
            return false;
        }

        let outcome = self.runtime.router.handle_key(key, Instant::now());
        match outcome {
            RouterOutcome::ForwardToPty(key) => {
                self.forward_key_to_focused_pty(key);
                return false;
            }
            RouterOutcome::SwitchMode(mode) => {
                self.apply(Msg::EnterNavigationMode, outcome_tx);
                if mode == Mode::Navigation {
                    return false;
                }
            }
            RouterOutcome::PrefixArmed => return false,
            RouterOutcome::PrefixCommand(key) => {
                self.handle_prefix_command(key, outcome_tx);
                return false;
            }
            RouterOutcome::Ignored => {}
        }

        if self.runtime.router.mode() == Mode::Input {
            if let KeyCode::Char(_) | KeyCode::Enter | KeyCode::Backspace | KeyCode::Tab = key.code {
                self.forward_key_to_focused_pty(key);
                return false;
            }
        }

        if !matches!(key.code, KeyCode::Char('q')) {
            self.pending_quit = false;
        }

        match key.code {
            KeyCode::Char('q') => {
                if self.pending_quit {
                    self.apply(Msg::Quit, outcome_tx);
                    return true;
                }
                self.pending_quit = true;
                log::info!("press 'q' again to quit");
            }
            KeyCode::Char('n') => self.composing_prompt = Some(String::new()),
            KeyCode::Char('i') | KeyCode::Enter => self.apply(Msg::EnterInputMode, outcome_tx),
            KeyCode::Char('d') => {
                if let Some(ws) = self.runtime.workstreams.focused() {
                    let id = ws.id;
                    if let Some(session_id) = ws.pty_session_id {
                        self.kill_pty_session(session_id);
                    }
                    self.panes.remove(id);
                    self.apply(Msg::RemoveWorkstream { id }, outcome_tx);
                }
            }
            KeyCode::Char('m') => {
                if let Some(ws) = self.runtime.workstreams.focused() {
                    self.apply(Msg::MergeWorkstream { id: ws.id, squash: false }, outcome_tx);
                }
            }
            KeyCode::Char('p') => {
                if let Some(ws) = self.runtime.workstreams.focused() {
                    if ws.pairing_enabled {
                        self.apply(Msg::DisablePairing, outcome_tx);
                    } else {
                        self.apply(Msg::EnablePairing { id: ws.id }, outcome_tx);
                    }
                }
            }
            KeyCode::Char('L') => {
                let next = next_layout(self.runtime.workstreams.layout());
                self.apply(Msg::SetLayout { layout: next }, outcome_tx);
            }
            KeyCode::Char(' ') => self.swap_focused_with_main(),
            KeyCode::Char('[') => {
                if let Some(ws) = self.runtime.workstreams.focused() {
                    if let Some(pane) = self.panes.get_mut(ws.id) {
                        pane.enter_scroll_mode();
                    }
                }
            }
            KeyCode::PageUp => self.scroll_focused(10),
            KeyCode::PageDown => self.scroll_focused(-10),
            KeyCode::Char('u') if key.modifiers.contains(crossterm::event::KeyModifiers::CONTROL) => {
                self.scroll_focused(20);
            }
            KeyCode::Char('d') if key.modifiers.contains(crossterm::event::KeyModifiers::CONTROL) => {
                self.scroll_focused(-20);
            }
            KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                let index = c.to_digit(10).expect("ascii digit") ;
                if let Some(pane) = self.panes.by_display_index(index) {
                    let id = pane.workstream_id;
                    self.apply(Msg::FocusWorkstream { id }, outcome_tx);
                }
            }
            KeyCode::Tab => {
                self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Right }, outcome_tx);
            }
            KeyCode::Up => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Up }, outcome_tx),
            KeyCode::Down => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Down }, outcome_tx),
            KeyCode::Left => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Left }, outcome_tx),
            KeyCode::Right => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Right }, outcome_tx),
            _ => {}
        }
        false
    }

    /// Generates a uniqueness-disambiguated branch slug from a prompt (the
    /// synchronous stand-in for the teacher's agent-backed title-generation
    /// round trip — see DESIGN.md) and creates the workstream on it.
    fn create_workstream_from_prompt(
        &mut self,
        prompt: String,
        outcome_tx: &mpsc::UnboundedSender<(Command, Result<CommandOutcome, CommandError>)>,
    ) {
        let existing: Vec<String> = self.runtime.workstreams.branch_names().map(str::to_string).collect();
        let branch = unique_branch_slug(&prompt, &existing);
        let now = chrono::Utc::now().timestamp();
        self.apply(
            Msg::CreateWorkstream { branch, initial_prompt: prompt, now_epoch_secs: now },
            outcome_tx,
        );
    }

    /// Handles the keystroke following an armed `Ctrl+B` prefix: pane
    /// navigation, pane-by-number switch, entering scroll mode, toggling
    /// mouse capture, or exiting Input mode back to Navigation.
    fn handle_prefix_command(
        &mut self,
        key: crossterm::event::KeyEvent,
        outcome_tx: &mpsc::UnboundedSender<(Command, Result<CommandOutcome, CommandError>)>,
    ) {
        use crossterm::event::KeyCode;
        match key.code {
            KeyCode::Left => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Left }, outcome_tx),
            KeyCode::Right => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Right }, outcome_tx),
            KeyCode::Up => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Up }, outcome_tx),
            KeyCode::Down => self.apply(Msg::FocusNeighbor { direction: crate::pane::Direction::Down }, outcome_tx),
            KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                let index = c.to_digit(10).expect("ascii digit");
                if let Some(pane) = self.panes.by_display_index(index) {
                    let id = pane.workstream_id;
                    self.apply(Msg::FocusWorkstream { id }, outcome_tx);
                }
            }
            KeyCode::Char('[') => {
                if let Some(ws) = self.runtime.workstreams.focused() {
                    if let Some(pane) = self.panes.get_mut(ws.id) {
                        pane.enter_scroll_mode();
                    }
                }
            }
            KeyCode::Esc => self.apply(Msg::EnterNavigationMode, outcome_tx),
            _ => {}
        }
    }

    fn swap_focused_with_main(&mut self) {
        let Some(focused_id) = self.runtime.workstreams.focused().map(|ws| ws.id) else { return };
        let Some(main_pane) = self.panes.by_display_index(1) else { return };
        if main_pane.workstream_id == focused_id {
            return;
        }
        let main_id = main_pane.workstream_id;
        self.panes.swap_display_index(focused_id, main_id);
    }

    fn scroll_focused(&mut self, delta: i64) {
        let Some(ws) = self.runtime.workstreams.focused() else { return };
        if let Some(pane) = self.panes.get_mut(ws.id) {
            pane.scroll_by(delta);
        }
    }

    /// Applies a `Msg` through the pure dispatcher, then carries out the
    /// resulting `Command` (if any) as a spawned async task reporting back
    /// through `outcome_tx` — the event loop never awaits a command itself.
    fn apply(&mut self, msg: Msg, outcome_tx: &mpsc::UnboundedSender<(Command, Result<CommandOutcome, CommandError>)>) {
        if let Some(command) = dispatch(&mut self.runtime, msg) {
            self.spawn_command(command, outcome_tx);
        }
    }

    fn spawn_command(&self, command: Command, outcome_tx: &mpsc::UnboundedSender<(Command, Result<CommandOutcome, CommandError>)>) {
        let dispatcher = self.dispatcher.clone();
        let state = self.runtime.workstreams.state().clone();
        let outcome_tx = outcome_tx.clone();
        let command_for_result = command.clone();
        tokio::spawn(async move {
            let result = dispatcher.execute(command, &state).await;
            let _ = outcome_tx.send((command_for_result, result));
        });
    }

    fn handle_outcome(
        &mut self,
        command: Command,
        result: Result<CommandOutcome, CommandError>,
        outcome_tx: &mpsc::UnboundedSender<(Command, Result<CommandOutcome, CommandError>)>,
        event_tx: &mpsc::Sender<AppEvent>,
    ) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(CommandError::Vcs(GitError::MergeConflict { files })) => {
                log::warn!("merge conflict in {} file(s): {}", files.len(), files.join(", "));
                if let Some(id) = command_workstream_id(&command) {
                    self.ask_agent_to_resolve_conflict(id, &files);
                }
                return;
            }
            Err(e) => {
                log::warn!("command {command:?} failed: {e}");
                if let Some(id) = command_workstream_id(&command) {
                    let _ = self.runtime.workstreams.transition(id, WorkstreamStatus::Error);
                }
                return;
            }
        };

        match outcome {
            CommandOutcome::ContainerStarted { workstream_id, container_id, worktree_path } => {
                let _ = self.runtime.workstreams.set_container_id(workstream_id, Some(container_id.clone()));
                let _ = self.runtime.workstreams.set_worktree_path(workstream_id, Some(worktree_path));
                let _ = self.runtime.workstreams.transition(workstream_id, WorkstreamStatus::Running);
                self.panes.insert(workstream_id, 80, 24);
                self.start_agent_session(workstream_id, &container_id, None, event_tx);
            }
            CommandOutcome::ContainerResumed { workstream_id, agent_session_id } => {
                if let Some(session_id) = agent_session_id.clone() {
                    let _ = self.runtime.workstreams.set_agent_session_id(workstream_id, session_id);
                }
                let _ = self.runtime.workstreams.transition(workstream_id, WorkstreamStatus::Running);
                if self.panes.get_mut(workstream_id).is_none() {
                    self.panes.insert(workstream_id, 80, 24);
                }
                let container_id = self.runtime.workstreams.get(workstream_id).and_then(|ws| ws.container_id.clone());
                if let Some(container_id) = container_id {
                    self.start_agent_session(workstream_id, &container_id, agent_session_id.as_deref(), event_tx);
                }
            }
            CommandOutcome::ContainerStopped { workstream_id } => {
                let _ = self.runtime.workstreams.transition(workstream_id, WorkstreamStatus::Stopped);
                let _ = self.runtime.workstreams.set_container_id(workstream_id, None);
                let _ = self.runtime.workstreams.set_worktree_path(workstream_id, None);
            }
            CommandOutcome::TitleGenerated { .. } => {}
            CommandOutcome::UncommittedChanges { .. } => {}
            CommandOutcome::UntrackedFiles { .. } => {}
            CommandOutcome::BranchConflict { workstream_id, name, info } => {
                log::warn!("branch '{name}' already exists, picking a new one for workstream {workstream_id}: {info}");
                let existing: Vec<String> = self.runtime.workstreams.branch_names().map(str::to_string).collect();
                let renamed = disambiguate_branch_name(&name, &existing);
                if self.runtime.workstreams.rename_branch_before_start(workstream_id, &renamed).is_ok() {
                    self.spawn_command(Command::StartContainer { workstream_id, branch: renamed, force: false }, outcome_tx);
                } else {
                    let _ = self.runtime.workstreams.transition(workstream_id, WorkstreamStatus::Error);
                }
            }
            CommandOutcome::UntrackedFilesPrompt { workstream_id, files } => {
                log::warn!(
                    "untracked files present before starting workstream {workstream_id}, proceeding anyway: {}",
                    files.join(", ")
                );
                if let Some(branch) = self.runtime.workstreams.get(workstream_id).map(|ws| ws.branch.clone()) {
                    self.spawn_command(Command::StartContainer { workstream_id, branch, force: true }, outcome_tx);
                }
            }
            CommandOutcome::Merged { .. } => {}
            CommandOutcome::Pushed { workstream_id } => {
                let _ = self.runtime.workstreams.mark_pushed(workstream_id);
            }
            CommandOutcome::PullRequestOpened { .. } => {}
            CommandOutcome::Pruned { removed } => {
                log::info!("pruned {removed} stopped containers");
            }
            CommandOutcome::StatePersisted => {}
            CommandOutcome::PairingBegun { workstream_id } => {
                log::info!("pairing enabled for workstream {workstream_id}");
            }
            CommandOutcome::PairingEnded { stash_pending } => {
                log::info!("pairing disabled");
                if stash_pending {
                    log::info!("a stash is still pending from pairing; run `git stash pop` to reapply it");
                }
            }
            CommandOutcome::Exited => {}
        }
    }

    /// Spawns the agent CLI inside the container via `docker exec` and
    /// registers the resulting PTY session against the workstream. A
    /// per-session bridging task forwards decoded PTY output into the
    /// shared `AppEvent` channel as [`AppEvent::PtyOutput`], tagged with
    /// `workstream_id` — the only thing the bridge needs to know, since a
    /// PTY session belongs to exactly one workstream for its whole life.
    fn start_agent_session(
        &mut self,
        workstream_id: u32,
        container_id: &str,
        resume_session_id: Option<&str>,
        event_tx: &mpsc::Sender<AppEvent>,
    ) {
        let prompt = self
            .runtime
            .workstreams
            .get(workstream_id)
            .map(|ws| ws.initial_prompt.as_str())
            .unwrap_or("");
        let argv = self.agent_config.build_argv(prompt, resume_session_id);
        let full_argv = self.dispatcher.exec_argv(container_id, &argv);

        let (tx, mut rx) = mpsc::channel(256);
        match self.pty.spawn_exec(&full_argv, None, None, tx) {
            Ok(session_id) => {
                let _ = self.runtime.workstreams.set_pty_session(workstream_id, Some(session_id));
                self.session_to_workstream.insert(session_id, workstream_id);
                self.ready_buffers.insert(workstream_id, String::new());

                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    while let Some(output) = rx.recv().await {
                        if event_tx
                            .send(AppEvent::PtyOutput { workstream_id, text: output.text })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    let _ = event_tx.send(AppEvent::ContainerExited { workstream_id, code: None }).await;
                });
            }
            Err(e) => {
                log::error!("failed to spawn agent PTY for workstream {workstream_id}: {e}");
                let _ = self.runtime.workstreams.transition(workstream_id, WorkstreamStatus::Error);
            }
        }
    }

    fn handle_pty_output(&mut self, workstream_id: u32, text: String) {
        if let Some(pane) = self.panes.get_mut(workstream_id) {
            pane.feed(text.as_bytes());
        }

        let mut became_ready = false;
        if let Some(buffer) = self.ready_buffers.get_mut(&workstream_id) {
            buffer.push_str(&text);
            if buffer.len() > AGENT_READY_BUFFER_CAP {
                let excess = buffer.len() - AGENT_READY_BUFFER_CAP;
                buffer.drain(0..excess);
            }
            became_ready = agent::is_ready(buffer);
        }
        if became_ready {
            self.ready_buffers.remove(&workstream_id);
            self.handle_agent_ready(workstream_id);
        }
    }

    fn handle_agent_ready(&mut self, workstream_id: u32) {
        if let Some(pane) = self.panes.get_mut(workstream_id) {
            pane.mark_ready();
            if pane.focused {
                self.runtime.router.set_mode(Mode::Input);
            }
        }
        self.maybe_schedule_auto_continue(workstream_id);
    }

    /// Schedules a delayed `continue` line for a workstream that either
    /// picked back up mid-work after an interruption or was explicitly
    /// started with a prompt beginning "continue" — resolves the open
    /// question of how eagerly to nudge a freshly-ready agent (see
    /// DESIGN.md). The delay itself is a plain sleep on a spawned task;
    /// the send still lands through `send_auto_continue` so the PTY write
    /// has one call site regardless of trigger.
    fn maybe_schedule_auto_continue(&mut self, workstream_id: u32) {
        let Some(ws) = self.runtime.workstreams.get(workstream_id) else { return };
        let should_continue = ws.was_interrupted || ws.initial_prompt.trim_start().to_lowercase().starts_with("continue");
        if !should_continue || ws.pty_session_id.is_none() {
            return;
        }
        let delay = self.config.auto_continue_delay;
        let pty = self.pty.clone();
        let session_id = ws.pty_session_id.expect("checked above");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = pty.write_stdin(session_id, "continue\r");
        });
        let _ = self.runtime.workstreams.set_was_interrupted(workstream_id, false);
    }

    /// Sends the canned `continue` line to a workstream's PTY directly,
    /// for callers that already routed the delay through an
    /// [`AppEvent::AutoContinue`] (e.g. a future health-check-driven retry).
    fn send_auto_continue(&mut self, workstream_id: u32) {
        let Some(ws) = self.runtime.workstreams.get(workstream_id) else { return };
        let Some(session_id) = ws.pty_session_id else { return };
        let _ = self.pty.write_stdin(session_id, "continue\r");
    }

    /// Longest a workstream may sit in `Starting` before it's considered
    /// stuck and moved to `Error` — the container or agent process never
    /// reached a ready marker.
    const INIT_TIMEOUT_SECS: i64 = 5 * 60;

    fn handle_tick(&mut self) {
        for pane in self.panes.iter_mut() {
            pane.spinner.tick();
        }
        self.runtime.router.expire_prefix(Instant::now());
        self.expire_stalled_starts();
    }

    fn expire_stalled_starts(&mut self) {
        let now = chrono::Utc::now().timestamp();
        let stalled: Vec<u32> = self
            .runtime
            .workstreams
            .iter()
            .filter(|ws| {
                ws.status == WorkstreamStatus::Starting && now - ws.created_at_epoch_secs > Self::INIT_TIMEOUT_SECS
            })
            .map(|ws| ws.id)
            .collect();
        for id in stalled {
            log::warn!("workstream {id} did not become ready within the init timeout");
            let _ = self.runtime.workstreams.transition(id, WorkstreamStatus::Error);
        }
    }

    fn kill_pty_session(&mut self, session_id: u32) {
        self.session_to_workstream.remove(&session_id);
        let pty = self.pty.clone();
        tokio::spawn(async move {
            if let Err(e) = pty.kill_session(session_id).await {
                log::warn!("failed to kill pty session {session_id}: {e}");
            }
        });
    }

    /// Delegates merge-conflict resolution to the in-container agent:
    /// writes a canned instruction listing the conflicting files, followed
    /// by Enter, to the workstream's PTY. Mirrors the "Ask agent" choice in
    /// the spec's merge-conflict dialog — the only option this build wires
    /// automatically, since there is no modal dialog widget to offer the
    /// other choices.
    fn ask_agent_to_resolve_conflict(&mut self, workstream_id: u32, files: &[String]) {
        let Some(ws) = self.runtime.workstreams.get(workstream_id) else { return };
        let Some(session_id) = ws.pty_session_id else { return };
        let message = format!(
            "Please run `git fetch origin` and resolve conflicts in these files: {}\r",
            files.join(", ")
        );
        let _ = self.pty.write_stdin(session_id, &message);
    }

    fn forward_key_to_focused_pty(&mut self, key: crossterm::event::KeyEvent) {
        let Some(ws) = self.runtime.workstreams.focused() else { return };
        let Some(session_id) = ws.pty_session_id else { return };
        if let Some(text) = key_to_pty_text(key) {
            let _ = self.pty.write_stdin(session_id, &text);
        }
    }

    fn handle_mouse(&mut self, mouse: crossterm::event::MouseEvent) {
        use crossterm::event::MouseEventKind;
        if let MouseEventKind::Down(_) = mouse.kind {
            let rects = self.runtime.pane_rects(200, 80);
            if let Some(index) = crate::pane::find_pane_at_position(&rects, mouse.column, mouse.row) {
                if let Some(pane) = self.panes.by_display_index(index as u32 + 1) {
                    let id = pane.workstream_id;
                    let _ = self.runtime.workstreams.focus(id);
                }
            }
        }
    }

    fn resize_panes(&mut self, cols: u16, rows: u16) {
        let n = self.panes.len();
        if n == 0 {
            return;
        }
        let rects = crate::pane::calculate_layout(self.runtime.workstreams.layout(), n, cols, rows);
        for (pane, rect) in self.panes.iter_mut().zip(rects.iter()) {
            pane.resize(rect.w, rect.h.saturating_sub(1));
        }
    }

    fn render(&self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let n = self.panes.len();
        if n == 0 {
            frame.render_widget(Paragraph::new("No workstreams. Press 'n' to create one."), area);
            return;
        }
        let rects = crate::pane::calculate_layout(self.runtime.workstreams.layout(), n, area.width, area.height);
        for (pane, rect) in self.panes.iter().zip(rects.iter()) {
            let rt_rect = RtRect { x: rect.x, y: rect.y, width: rect.w, height: rect.h };
            render_pane(frame, pane, rt_rect, &self.runtime);
        }
    }
}

fn render_pane(frame: &mut ratatui::Frame, pane: &Pane, rect: RtRect, runtime: &AppRuntime) {
    let title = runtime
        .workstreams
        .get(pane.workstream_id)
        .map(|ws| format!(" {} #{} ", ws.branch, pane.display_index))
        .unwrap_or_default();
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    if pane.initializing {
        let line = Line::from(Span::raw(format!("{} initializing\u{2026}", pane.spinner.glyph())));
        frame.render_widget(Paragraph::new(line), inner);
        return;
    }

    let grid = pane.terminal.grid();
    let mut lines = Vec::with_capacity(grid.rows as usize);
    for row in 0..grid.rows.min(inner.height) {
        let mut spans = Vec::with_capacity(grid.cols as usize);
        for col in 0..grid.cols.min(inner.width) {
            if let Some(cell) = grid.cell(row, col) {
                spans.push(cell_to_span(cell));
            }
        }
        lines.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn cell_to_span(cell: &Cell) -> Span<'static> {
    let mut style = Style::default().fg(grid_color(cell.fg)).bg(grid_color(cell.bg));
    if cell.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.dim {
        style = style.add_modifier(Modifier::DIM);
    }
    if cell.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.reverse {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(cell.ch.to_string(), style)
}

fn grid_color(color: GridColor) -> RtColor {
    match color {
        GridColor::Default => RtColor::Reset,
        GridColor::Indexed(i) => RtColor::Indexed(i),
        GridColor::Rgb(r, g, b) => RtColor::Rgb(r, g, b),
    }
}

/// Turns a free-form prompt into a short kebab-case branch slug, then
/// disambiguates it against `existing` branch names with a `-2`, `-3`, ...
/// suffix. A synchronous stand-in for the agent-generated title the full
/// spec calls for — see DESIGN.md.
fn unique_branch_slug(prompt: &str, existing: &[String]) -> String {
    let words: Vec<String> = prompt
        .split_whitespace()
        .take(5)
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    let base = if words.is_empty() { "workstream".to_string() } else { words.join("-") };

    if !existing.iter().any(|b| b == &base) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !existing.iter().any(|b| b == &candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Appends a numeric suffix to `name` until it no longer collides with
/// `existing` — used to recover from a [`CommandOutcome::BranchConflict`]
/// without re-prompting the user. The dispatcher re-checks the real
/// repository on retry, so a collision it didn't know about here just comes
/// back around for another suffix.
fn disambiguate_branch_name(name: &str, existing: &[String]) -> String {
    let mut suffix = 2;
    loop {
        let candidate = format!("{name}-{suffix}");
        if !existing.iter().any(|b| b == &candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

fn next_layout(current: crate::pane::Layout) -> crate::pane::Layout {
    use crate::pane::Layout::*;
    match current {
        Grid => MainStack,
        MainStack => MainRow,
        MainRow => Rows,
        Rows => Columns,
        Columns => Grid,
    }
}

fn command_workstream_id(command: &Command) -> Option<u32> {
    match command {
        Command::StartContainer { workstream_id, .. }
        | Command::ResumeContainer { workstream_id }
        | Command::StopContainer { workstream_id }
        | Command::GenerateTitle { workstream_id }
        | Command::CheckUncommittedChanges { workstream_id }
        | Command::CheckUntrackedFiles { workstream_id }
        | Command::MergeBranch { workstream_id, .. }
        | Command::Rebase { workstream_id, .. }
        | Command::Push { workstream_id, .. }
        | Command::CreatePullRequest { workstream_id, .. }
        | Command::BeginPairing { workstream_id, .. } => Some(*workstream_id),
        _ => None,
    }
}

fn key_to_pty_text(key: crossterm::event::KeyEvent) -> Option<String> {
    use crossterm::event::{KeyCode, KeyModifiers};
    match key.code {
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                let byte = (c.to_ascii_uppercase() as u8).wrapping_sub(b'@') & 0x1f;
                Some((byte as char).to_string())
            } else {
                Some(c.to_string())
            }
        }
        KeyCode::Enter => Some("\r".to_string()),
        KeyCode::Backspace => Some("\u{8}".to_string()),
        KeyCode::Tab => Some("\t".to_string()),
        KeyCode::Esc => Some("\u{1b}".to_string()),
        KeyCode::Up => Some("\u{1b}[A".to_string()),
        KeyCode::Down => Some("\u{1b}[B".to_string()),
        KeyCode::Left => Some("\u{1b}[D".to_string()),
        KeyCode::Right => Some("\u{1b}[C".to_string()),
        _ => None,
    }
}

/// Reads terminal input on a dedicated OS thread, since `crossterm::event`
/// is blocking and the app isn't built against its `event-stream` feature.
/// Bridges into the async event channel via `blocking_send`.
fn input_reader_thread(tx: mpsc::Sender<AppEvent>) {
    loop {
        match crossterm::event::poll(Duration::from_millis(100)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(_) => return,
        }
        let event = match crossterm::event::read() {
            Ok(event) => event,
            Err(_) => return,
        };
        let app_event = match event {
            CtEvent::Key(key) => AppEvent::Key(key),
            CtEvent::Mouse(mouse) => AppEvent::Mouse(mouse),
            CtEvent::Resize(cols, rows) => AppEvent::Resize(cols, rows),
            _ => continue,
        };
        if tx.blocking_send(app_event).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugifies_the_first_few_words_of_the_prompt() {
        assert_eq!(unique_branch_slug("add retry to http client please", &[]), "add-retry-to-http-client");
    }

    #[test]
    fn disambiguates_collisions_with_a_numeric_suffix() {
        let existing = vec!["add-http-retry".to_string()];
        assert_eq!(unique_branch_slug("add http retry", &existing), "add-http-retry-2");
    }

    #[test]
    fn falls_back_to_a_generic_slug_for_empty_prompts() {
        assert_eq!(unique_branch_slug("   ", &[]), "workstream");
    }
}
