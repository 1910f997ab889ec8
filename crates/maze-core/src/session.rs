//! One attempt at one level.
//!
//! A [`GameSession`] owns the level, its [`PhysicsWorld`] and the tilt input. The
//! per-frame [`GameSession::update`] steps physics, then applies the fall and win
//! rules and moves the camera.

use rapier2d::prelude::Vector;
use serde::{Deserialize, Serialize};

use crate::config::GameTuning;
use crate::error::{LoadError, PhysicsError};
use crate::level::{Level, LevelId};
use crate::physics::{BodyId, PhysicsWorld};
use crate::repository::LevelRepository;
use crate::tilt::{TiltInput, TiltSample, TiltSignalProcessor};

/// Lifecycle of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Loading,
    Playing,
    /// Terminal. `elapsed` is the completion time in seconds.
    LevelComplete { elapsed: f32 },
    Failed(LoadError),
}

/// Notable things that happened during an update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// The marble fell off the board and was put back at the start.
    MarbleReset { falls: u32 },
    LevelComplete { level: LevelId, elapsed: f32 },
}

/// Mutable per-attempt state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub elapsed_time: f32,
    pub marble_position: [f32; 2],
    pub has_won: bool,
    pub current_level_id: Option<LevelId>,
    pub camera_position: [f32; 2],
    pub fall_count: u32,
}

/// Everything the presentation layer needs to draw a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub level_id: Option<LevelId>,
    pub level_name: Option<String>,
    pub marble_position: [f32; 2],
    pub marble_rotation: f32,
    pub camera_position: [f32; 2],
    pub end_position: Option<[f32; 2]>,
    pub obstacle_positions: Vec<[f32; 2]>,
    pub elapsed_time: f32,
    /// `elapsed_time` as `MM:SS`.
    pub timer: String,
    pub has_won: bool,
    pub fall_count: u32,
}

/// Renders seconds as `MM:SS`. Negative and non-finite values render as `00:00`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_elapsed(seconds: f32) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[derive(Debug)]
pub struct GameSession {
    tuning: GameTuning,
    phase: SessionPhase,
    state: SessionState,
    level: Option<Level>,
    world: Option<PhysicsWorld>,
    input: TiltInput,
}

impl GameSession {
    pub fn new(tuning: GameTuning) -> Self {
        Self {
            tuning,
            phase: SessionPhase::Loading,
            state: SessionState::default(),
            level: None,
            world: None,
            input: TiltInput::new(TiltSignalProcessor::new(tuning.tilt)),
        }
    }

    /// Loads `id` and starts playing it.
    ///
    /// On failure the session moves to [`SessionPhase::Failed`] and the error is
    /// also returned.
    pub fn load_level(&mut self, repository: &LevelRepository, id: LevelId) -> Result<(), LoadError> {
        let level = match repository.load(id) {
            Ok(level) => level,
            Err(err) => {
                tracing::warn!("[session] Failed to load level {}: {}", id, err);
                self.level = None;
                self.world = None;
                self.phase = SessionPhase::Failed(err.clone());
                return Err(err);
            }
        };

        self.world = Some(PhysicsWorld::from_level(&level, self.tuning.physics));
        self.state = SessionState {
            marble_position: level.start_position,
            current_level_id: Some(level.id),
            camera_position: level.start_position,
            ..SessionState::default()
        };
        self.input.reset();
        self.phase = SessionPhase::Playing;

        tracing::info!("[session] Playing level {} \"{}\"", level.id, level.name);
        self.level = Some(level);
        Ok(())
    }

    /// Advances the session by `dt` seconds.
    ///
    /// `sample` is the newest tilt reading, if one arrived since the last frame.
    /// Outside [`SessionPhase::Playing`] this does nothing.
    ///
    /// At most one event is returned. When a fall reset and a win happen in the
    /// same frame, [`SessionEvent::LevelComplete`] is returned; the reset is still
    /// counted in [`SessionState::fall_count`].
    pub fn update(
        &mut self,
        dt: f32,
        sample: Option<TiltSample>,
    ) -> Result<Option<SessionEvent>, PhysicsError> {
        if self.phase != SessionPhase::Playing {
            return Ok(None);
        }
        let (Some(world), Some(level)) = (self.world.as_mut(), self.level.as_ref()) else {
            return Err(PhysicsError::MissingBody(BodyId::Marble));
        };

        let force = self.input.latest_force(sample);
        world.step(dt, force)?;
        self.state.elapsed_time += dt;

        let rules = self.tuning.session;
        let mut event = None;
        let mut position = world.marble_position()?;

        if position.y < rules.fall_threshold {
            let start = Vector::new(level.start_position[0], level.start_position[1]);
            world.reset_marble(start)?;
            self.state.fall_count += 1;
            tracing::info!(
                "[session] Marble fell at ({:.1}, {:.1}), reset to start (falls: {})",
                position.x,
                position.y,
                self.state.fall_count
            );
            event = Some(SessionEvent::MarbleReset {
                falls: self.state.fall_count,
            });
            position = start;
        }
        self.state.marble_position = [position.x, position.y];

        let dx = position.x - level.end_position[0];
        let dy = position.y - level.end_position[1];
        if (dx * dx + dy * dy).sqrt() < rules.win_radius {
            world.freeze_marble()?;
            let elapsed = self.state.elapsed_time;
            self.state.has_won = true;
            self.phase = SessionPhase::LevelComplete { elapsed };
            tracing::info!(
                "[session] Level {} complete in {}",
                level.id,
                format_elapsed(elapsed)
            );
            event = Some(SessionEvent::LevelComplete {
                level: level.id,
                elapsed,
            });
        }

        let camera = &mut self.state.camera_position;
        camera[0] += (position.x - camera[0]) * rules.camera_smoothing;
        camera[1] += (position.y - camera[1]) * rules.camera_smoothing;

        Ok(event)
    }

    /// Forgets the last tilt force so a resumed session starts level.
    pub fn reset_input(&mut self) {
        self.input.reset();
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn world(&self) -> Option<&PhysicsWorld> {
        self.world.as_ref()
    }

    pub fn tuning(&self) -> &GameTuning {
        &self.tuning
    }

    pub fn current_level_id(&self) -> Option<LevelId> {
        self.state.current_level_id
    }

    pub fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Playing
    }

    pub fn has_won(&self) -> bool {
        self.state.has_won
    }

    pub fn elapsed(&self) -> f32 {
        self.state.elapsed_time
    }

    pub fn fall_count(&self) -> u32 {
        self.state.fall_count
    }

    /// Current state in a presentation-friendly form.
    pub fn snapshot(&self) -> Result<SessionSnapshot, PhysicsError> {
        let (marble_rotation, obstacle_positions) = match &self.world {
            Some(world) => {
                let positions = (0..world.obstacle_count())
                    .map(|i| world.obstacle_position(i).map(|p| [p.x, p.y]))
                    .collect::<Result<Vec<_>, _>>()?;
                (world.marble_rotation()?, positions)
            }
            None => (0.0, Vec::new()),
        };

        Ok(SessionSnapshot {
            level_id: self.state.current_level_id,
            level_name: self.level.as_ref().map(|l| l.name.clone()),
            marble_position: self.state.marble_position,
            marble_rotation,
            camera_position: self.state.camera_position,
            end_position: self.level.as_ref().map(|l| l.end_position),
            obstacle_positions,
            elapsed_time: self.state.elapsed_time,
            timer: format_elapsed(self.state.elapsed_time),
            has_won: self.state.has_won,
            fall_count: self.state.fall_count,
        })
    }
}
