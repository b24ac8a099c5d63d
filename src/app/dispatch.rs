use crate::pane::{self, Direction, Layout};
use crate::workstream::{WorkstreamError, WorkstreamManager, WorkstreamStatus};

use super::mode::{InputRouter, Mode};

/// A user-facing or system-triggered intent the dispatcher resolves against
/// the current runtime state. Distinct from [`AppEvent`](super::AppEvent):
/// an event is raw input, a `Msg` is what that input (or a background task's
/// completion) means for the app.
#[derive(Debug, Clone)]
pub enum Msg {
    CreateWorkstream { branch: String, initial_prompt: String, now_epoch_secs: i64 },
    RemoveWorkstream { id: u32 },
    FocusWorkstream { id: u32 },
    FocusNeighbor { direction: Direction },
    TransitionWorkstream { id: u32, next: WorkstreamStatus },
    SetLayout { layout: Layout },
    EnterInputMode,
    EnterNavigationMode,
    EnablePairing { id: u32 },
    DisablePairing,
    ResumeWorkstream { id: u32 },
    MergeWorkstream { id: u32, squash: bool },
    PushWorkstream { id: u32, force: bool },
    OpenPullRequest { id: u32, title: String, body: String, base: String },
    PruneStopped,
    PruneProject,
    PruneAll,
    Quit,
}

/// A side effect the dispatcher wants performed outside the pure state
/// update — started by the async command dispatcher in
/// [`crate::command`]. `dispatch` never awaits anything itself; it only
/// describes what should happen next.
#[derive(Debug, Clone)]
pub enum Command {
    StartContainer { workstream_id: u32, branch: String, force: bool },
    ResumeContainer { workstream_id: u32 },
    StopContainer { workstream_id: u32 },
    GenerateTitle { workstream_id: u32 },
    CheckUncommittedChanges { workstream_id: u32 },
    CheckUntrackedFiles { workstream_id: u32 },
    MergeBranch { workstream_id: u32, squash: bool },
    Rebase { workstream_id: u32, onto: String },
    Push { workstream_id: u32, force: bool },
    CreatePullRequest { workstream_id: u32, title: String, body: String, base: String },
    PruneStopped,
    PruneProject,
    PruneAll,
    PersistState,
    BeginPairing { workstream_id: u32, branch: String },
    EndPairing,
    Exit,
}

/// Everything `dispatch` needs mutable access to: the workstream set, the
/// key-routing state machine, and the pane layout. Owned by the main event
/// loop and threaded through one message at a time. The pairing FSM itself
/// lives in [`crate::command::CommandDispatcher`], since enabling/disabling
/// it is inherently an async side effect `dispatch` only requests via
/// [`Command::BeginPairing`]/[`Command::EndPairing`].
pub struct AppRuntime {
    pub workstreams: WorkstreamManager,
    pub router: InputRouter,
}

impl AppRuntime {
    pub fn new(workstreams: WorkstreamManager) -> Self {
        Self {
            workstreams,
            router: InputRouter::new(),
        }
    }

    pub fn pane_rects(&self, width: u16, height: u16) -> Vec<pane::Rect> {
        pane::calculate_layout(self.workstreams.layout(), self.workstreams.len(), width, height)
    }
}

/// Applies one `Msg` to `runtime`, mutating it in place, and returns the
/// [`Command`] (if any) the caller should carry out asynchronously. Pane
/// navigation, layout switches, and lifecycle transitions are resolved
/// synchronously here; anything that shells out (container/git/agent
/// process calls) is deferred to a returned `Command`.
pub fn dispatch(runtime: &mut AppRuntime, msg: Msg) -> Option<Command> {
    match msg {
        Msg::CreateWorkstream { branch, initial_prompt, now_epoch_secs } => {
            match runtime.workstreams.create_with_prompt(&branch, now_epoch_secs, &initial_prompt) {
                Ok(id) => Some(Command::StartContainer { workstream_id: id, branch, force: false }),
                Err(e) => {
                    log::warn!("could not create workstream on '{branch}': {e}");
                    None
                }
            }
        }
        Msg::RemoveWorkstream { id } => {
            match runtime.workstreams.remove(id) {
                Ok(_) => Some(Command::PersistState),
                Err(e) => {
                    log::warn!("could not remove workstream {id}: {e}");
                    None
                }
            }
        }
        Msg::FocusWorkstream { id } => {
            if let Err(e) = runtime.workstreams.focus(id) {
                log::warn!("could not focus workstream {id}: {e}");
            }
            None
        }
        Msg::FocusNeighbor { direction } => {
            focus_neighbor(runtime, direction);
            None
        }
        Msg::TransitionWorkstream { id, next } => match runtime.workstreams.transition(id, next) {
            Ok(()) => Some(Command::PersistState),
            Err(e) => {
                log::warn!("rejected transition for workstream {id}: {e}");
                None
            }
        },
        Msg::SetLayout { layout } => {
            runtime.workstreams.set_layout(layout);
            Some(Command::PersistState)
        }
        Msg::EnterInputMode => {
            runtime.router.set_mode(Mode::Input);
            None
        }
        Msg::EnterNavigationMode => {
            runtime.router.set_mode(Mode::Navigation);
            None
        }
        Msg::EnablePairing { id } => {
            let branch = runtime.workstreams.get(id)?.branch.clone();
            match runtime.workstreams_enable_pairing(id) {
                Ok(()) => Some(Command::BeginPairing { workstream_id: id, branch }),
                Err(e) => {
                    log::warn!("could not enable pairing on workstream {id}: {e}");
                    None
                }
            }
        }
        Msg::DisablePairing => Some(Command::EndPairing),
        Msg::ResumeWorkstream { id } => {
            if runtime.workstreams.get(id).is_none() {
                log::warn!("could not resume unknown workstream {id}");
                return None;
            }
            Some(Command::ResumeContainer { workstream_id: id })
        }
        Msg::MergeWorkstream { id, squash } => {
            runtime.workstreams.get(id)?;
            Some(Command::MergeBranch { workstream_id: id, squash })
        }
        Msg::PushWorkstream { id, force } => {
            runtime.workstreams.get(id)?;
            Some(Command::Push { workstream_id: id, force })
        }
        Msg::OpenPullRequest { id, title, body, base } => {
            runtime.workstreams.get(id)?;
            Some(Command::CreatePullRequest { workstream_id: id, title, body, base })
        }
        Msg::PruneStopped => Some(Command::PruneStopped),
        Msg::PruneProject => Some(Command::PruneProject),
        Msg::PruneAll => Some(Command::PruneAll),
        Msg::Quit => Some(Command::Exit),
    }
}

impl AppRuntime {
    fn workstreams_enable_pairing(&mut self, id: u32) -> Result<(), WorkstreamError> {
        self.workstreams.enable_pairing(id)
    }
}

fn focus_neighbor(runtime: &mut AppRuntime, direction: Direction) {
    let Some(current) = runtime.workstreams.focused_index() else {
        return;
    };
    // A fixed reference size; the caller's renderer recomputes real rects
    // per-frame, but navigation only needs relative geometry, which is
    // size-invariant for these layouts.
    let rects = pane::calculate_layout(runtime.workstreams.layout(), runtime.workstreams.len(), 200, 80);
    if let Some(next) = pane::find_neighbor(&rects, current, direction) {
        runtime.workstreams.focus_index(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> AppRuntime {
        AppRuntime::new(WorkstreamManager::new("repo", 9))
    }

    #[test]
    fn create_workstream_returns_start_container_command() {
        let mut rt = runtime();
        let cmd = dispatch(
            &mut rt,
            Msg::CreateWorkstream {
                branch: "feature-a".to_string(),
                initial_prompt: String::new(),
                now_epoch_secs: 0,
            },
        );
        assert!(matches!(cmd, Some(Command::StartContainer { .. })));
        assert_eq!(rt.workstreams.len(), 1);
    }

    #[test]
    fn duplicate_branch_create_is_rejected_without_command() {
        let mut rt = runtime();
        dispatch(
            &mut rt,
            Msg::CreateWorkstream {
                branch: "feature-a".to_string(),
                initial_prompt: String::new(),
                now_epoch_secs: 0,
            },
        );
        let cmd = dispatch(
            &mut rt,
            Msg::CreateWorkstream {
                branch: "feature-a".to_string(),
                initial_prompt: String::new(),
                now_epoch_secs: 0,
            },
        );
        assert!(cmd.is_none());
        assert_eq!(rt.workstreams.len(), 1);
    }

    #[test]
    fn set_layout_persists_and_updates_state() {
        let mut rt = runtime();
        let cmd = dispatch(&mut rt, Msg::SetLayout { layout: Layout::Rows });
        assert!(matches!(cmd, Some(Command::PersistState)));
        assert_eq!(rt.workstreams.layout(), Layout::Rows);
    }

    #[test]
    fn quit_produces_exit_command() {
        let mut rt = runtime();
        let cmd = dispatch(&mut rt, Msg::Quit);
        assert!(matches!(cmd, Some(Command::Exit)));
    }
}
