//! Top-level game flow: menu, play, pause, level transitions and load failures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GameTuning;
use crate::error::{LoadError, PhysicsError};
use crate::level::{FIRST_LEVEL, LevelId};
use crate::repository::LevelRepository;
use crate::session::{GameSession, SessionEvent};
use crate::tilt::TiltSample;

/// Player intents forwarded by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "level", rename_all = "camelCase")]
pub enum Action {
    /// Start from the first level.
    Start,
    /// Start from a chosen level.
    StartAt(LevelId),
    Pause,
    Resume,
    /// Go on to the next level after a completion.
    Continue,
    /// Replay the current level (after a completion or a load failure).
    Retry,
    /// Back to the main menu.
    Exit,
}

#[derive(Debug)]
pub enum GameState {
    MainMenu,
    Playing(GameSession),
    Paused(GameSession),
    /// Level finished, waiting for `Continue`, `Retry` or `Exit`.
    Transitioning { level: LevelId, elapsed: f32 },
    Failed { level: LevelId, error: LoadError },
}

/// Payload-free view of [`GameState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStateKind {
    MainMenu,
    Playing,
    Paused,
    Transitioning,
    Failed,
}

impl fmt::Display for GameStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MainMenu => "main menu",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Transitioning => "transitioning",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl GameState {
    pub fn kind(&self) -> GameStateKind {
        match self {
            Self::MainMenu => GameStateKind::MainMenu,
            Self::Playing(_) => GameStateKind::Playing,
            Self::Paused(_) => GameStateKind::Paused,
            Self::Transitioning { .. } => GameStateKind::Transitioning,
            Self::Failed { .. } => GameStateKind::Failed,
        }
    }
}

pub struct GameStateMachine {
    repository: LevelRepository,
    tuning: GameTuning,
    state: GameState,
}

impl fmt::Debug for GameStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameStateMachine")
            .field("state", &self.state.kind())
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl GameStateMachine {
    /// Creates a machine in the main menu.
    pub fn new(repository: LevelRepository, tuning: GameTuning) -> Self {
        Self {
            repository,
            tuning,
            state: GameState::MainMenu,
        }
    }

    /// Applies an action. Returns `false` (and leaves the state untouched) when
    /// the action does not apply to the current state.
    pub fn handle(&mut self, action: Action) -> bool {
        let from = self.state.kind();
        let state = std::mem::replace(&mut self.state, GameState::MainMenu);

        let (next, applied) = match (state, action) {
            (GameState::MainMenu, Action::Start) => (self.start_level(FIRST_LEVEL), true),
            (GameState::MainMenu, Action::StartAt(level)) => (self.start_level(level), true),
            (GameState::Playing(session), Action::Pause) => (GameState::Paused(session), true),
            (GameState::Paused(mut session), Action::Resume) => {
                session.reset_input();
                (GameState::Playing(session), true)
            }
            (GameState::Transitioning { level, .. }, Action::Continue) => {
                (self.next_level_state(level), true)
            }
            (
                GameState::Transitioning { level, .. } | GameState::Failed { level, .. },
                Action::Retry,
            ) => (self.start_level(level), true),
            (
                GameState::Playing(_)
                | GameState::Paused(_)
                | GameState::Transitioning { .. }
                | GameState::Failed { .. },
                Action::Exit,
            ) => (GameState::MainMenu, true),
            (state, action) => {
                tracing::debug!("[machine] Ignoring {:?} in {}", action, from);
                (state, false)
            }
        };

        self.state = next;
        if applied {
            tracing::info!("[machine] {:?}: {} -> {}", action, from, self.state.kind());
        }
        applied
    }

    /// Advances the running session, if any. A completed level moves the machine
    /// to [`GameState::Transitioning`].
    pub fn update(
        &mut self,
        dt: f32,
        sample: Option<TiltSample>,
    ) -> Result<Option<SessionEvent>, PhysicsError> {
        let GameState::Playing(session) = &mut self.state else {
            return Ok(None);
        };

        let event = session.update(dt, sample)?;
        if let Some(SessionEvent::LevelComplete { level, elapsed }) = event {
            self.state = GameState::Transitioning { level, elapsed };
            tracing::info!("[machine] Level {} complete: playing -> transitioning", level);
        }
        Ok(event)
    }

    fn start_level(&self, level: LevelId) -> GameState {
        let mut session = GameSession::new(self.tuning);
        match session.load_level(&self.repository, level) {
            Ok(()) => GameState::Playing(session),
            Err(error) => GameState::Failed { level, error },
        }
    }

    fn next_level_state(&self, level: LevelId) -> GameState {
        match level.checked_add(1) {
            Some(next) if self.repository.has_level(next) => self.start_level(next),
            _ => {
                tracing::info!("[machine] No level after {}, back to menu", level);
                GameState::MainMenu
            }
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn kind(&self) -> GameStateKind {
        self.state.kind()
    }

    /// The active or paused session.
    pub fn session(&self) -> Option<&GameSession> {
        match &self.state {
            GameState::Playing(session) | GameState::Paused(session) => Some(session),
            _ => None,
        }
    }

    pub fn repository(&self) -> &LevelRepository {
        &self.repository
    }
}
