//! Lifecycle of a single pipeline run.

use serde::Serialize;
use tracing::{debug, warn};

use trendbot_shared::RunMode;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Init,
    Fetching,
    Analyzing,
    Publishing,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Fetching => "fetching",
            Self::Analyzing => "analyzing",
            Self::Publishing => "publishing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow `self`.
    ///
    /// A batch run loops `Publishing -> Analyzing` once per article, and may
    /// finish straight from `Fetching` when nothing was fetched. Any
    /// non-terminal state may fail.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Init, Fetching)
            | (Fetching, Analyzing)
            | (Fetching, Done)
            | (Analyzing, Publishing)
            | (Publishing, Analyzing)
            | (Publishing, Done) => true,
            (s, Failed) => !s.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and traces the state of one run.
///
/// In batch mode `Failed` marks a single article and the run resumes with
/// `Analyzing` for the next one, or finishes with `Done`.
#[derive(Debug)]
pub struct RunTracker {
    mode: RunMode,
    state: RunState,
    history: Vec<RunState>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::for_mode(RunMode::Context)
    }

    pub fn for_mode(mode: RunMode) -> Self {
        Self {
            mode,
            state: RunState::Init,
            history: vec![RunState::Init],
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state visited so far, starting with `Init`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    /// Whether `next` may follow the current state in this run's mode.
    pub fn allows(&self, next: RunState) -> bool {
        if self.mode == RunMode::Batch && self.state == RunState::Failed {
            return matches!(next, RunState::Analyzing | RunState::Done);
        }
        self.state.can_transition_to(next)
    }

    /// Move to `next`. Unexpected transitions are logged but still applied.
    pub fn advance(&mut self, next: RunState) {
        if self.state == next {
            return;
        }
        if self.allows(next) {
            debug!(from = %self.state, to = %next, "run state");
        } else {
            warn!(from = %self.state, to = %next, "unexpected run state transition");
        }
        self.state = next;
        self.history.push(next);
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RunState::*;

    #[test]
    fn context_path_is_valid() {
        let path = [Init, Fetching, Analyzing, Publishing, Done];
        assert!(path.windows(2).all(|w| w[0].can_transition_to(w[1])));
    }

    #[test]
    fn batch_loops_per_article() {
        assert!(Publishing.can_transition_to(Analyzing));
        assert!(Fetching.can_transition_to(Done));
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(!Done.can_transition_to(Fetching));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Init));
        assert!(Analyzing.can_transition_to(Failed));
    }

    #[test]
    fn skipping_stages_is_rejected() {
        assert!(!Init.can_transition_to(Publishing));
        assert!(!Fetching.can_transition_to(Publishing));
    }

    #[test]
    fn tracker_records_history() {
        let mut t = RunTracker::new();
        t.advance(Fetching);
        t.advance(Fetching);
        t.advance(Done);
        assert_eq!(t.state(), Done);
        assert_eq!(t.history(), &[Init, Fetching, Done]);
    }

    #[test]
    fn batch_resumes_after_item_failure() {
        let mut t = RunTracker::for_mode(RunMode::Batch);
        for s in [Fetching, Analyzing, Publishing, Failed] {
            t.advance(s);
        }
        assert!(t.allows(Analyzing));
        assert!(t.allows(Done));
        assert!(!t.allows(Fetching));
        t.advance(Analyzing);
        assert_eq!(t.state(), Analyzing);
    }

    #[test]
    fn context_failure_is_final() {
        let mut t = RunTracker::new();
        assert_eq!(t.mode(), RunMode::Context);
        for s in [Fetching, Analyzing, Publishing, Failed] {
            t.advance(s);
        }
        assert!(!t.allows(Analyzing));
        assert!(!t.allows(Done));
    }
}
