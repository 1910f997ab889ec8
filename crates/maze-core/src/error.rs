//! Error types for the tilt, level and physics layers.

use crate::level::LevelId;
use crate::physics::BodyId;

/// Error produced when an orientation sample cannot be turned into a force.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TiltError {
    #[error("invalid tilt sample (roll={roll}, pitch={pitch})")]
    InvalidSignal { roll: f32, pitch: f32 },
}

/// Error produced while loading a level definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("level {0} not found")]
    NotFound(LevelId),
    #[error("level {id}: malformed data: {reason}")]
    Parse { id: LevelId, reason: String },
    #[error("level {id}: invalid level: {reason}")]
    Validation { id: LevelId, reason: String },
}

impl LoadError {
    /// The level id this error refers to.
    pub fn level_id(&self) -> LevelId {
        match self {
            Self::NotFound(id) | Self::Parse { id, .. } | Self::Validation { id, .. } => *id,
        }
    }
}

/// Programming errors raised by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("invalid timestep: {0}")]
    InvalidTimestep(f32),
    #[error("missing rigid body for {0:?}")]
    MissingBody(BodyId),
}
