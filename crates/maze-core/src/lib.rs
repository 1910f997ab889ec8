//! Tilt Maze Core Library
//!
//! Gameplay core of a tilt-controlled marble maze: device orientation becomes a
//! gravity-like force on a marble simulated with `Rapier2D` inside walled levels.
//!
//! The presentation layer drives a [`FrameDriver`] (or a [`GameStateMachine`]
//! directly), forwards [`Action`]s and draws [`SessionSnapshot`]s.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod driver;
pub mod error;
pub mod level;
pub mod machine;
pub mod physics;
pub mod repository;
pub mod sensor;
pub mod session;
pub mod tilt;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{GameTuning, Material, PhysicsTuning, SessionTuning, TiltTuning};
pub use driver::FrameDriver;
pub use error::{LoadError, PhysicsError, TiltError};
pub use level::{FIRST_LEVEL, Level, LevelId, Obstacle, ObstacleKind};
pub use machine::{Action, GameState, GameStateKind, GameStateMachine};
pub use physics::{BodyId, CollisionEvent, PHYSICS_DT, PhysicsWorld};
pub use repository::{DirectoryLevels, EmbeddedLevels, LevelRepository, LevelSource, MemoryLevels};
pub use sensor::{OrientationSensor, SampleSlot, ScriptedSensor};
pub use session::{GameSession, SessionEvent, SessionPhase, SessionSnapshot, SessionState, format_elapsed};
pub use tilt::{TiltInput, TiltSample, TiltSignalProcessor};
