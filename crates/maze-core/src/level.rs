//! Level data model.
//!
//! A `Level` is an immutable value produced by the repository after decoding and
//! validation. Coordinates are stored as `[x, y]` with y pointing up.

use serde::{Deserialize, Serialize};

/// Identifier of a level in the data source.
pub type LevelId = u32;

/// The first level of the game.
pub const FIRST_LEVEL: LevelId = 1;

/// Closed set of obstacle kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObstacleKind {
    /// Sensor zone the marble rolls over.
    Hole,
    /// Solid, bouncy post.
    Bumper,
    /// Rectangle oscillating vertically.
    MovingPlatform,
}

impl ObstacleKind {
    /// Parses the data-source spelling. Unknown names are rejected.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hole" => Some(Self::Hole),
            "bumper" => Some(Self::Bumper),
            "movingPlatform" => Some(Self::MovingPlatform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hole => "hole",
            Self::Bumper => "bumper",
            Self::MovingPlatform => "movingPlatform",
        }
    }
}

/// A placed obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: [f32; 2],
    /// Rotation in radians.
    pub rotation: f32,
}

/// A validated level definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    pub description: String,
    /// Open polylines, each with at least two points.
    pub walls: Vec<Vec<[f32; 2]>>,
    pub start_position: [f32; 2],
    pub end_position: [f32; 2],
    pub obstacles: Vec<Obstacle>,
}

impl Level {
    /// Number of straight segments across all walls.
    pub fn segment_count(&self) -> usize {
        self.walls.iter().map(|w| w.len().saturating_sub(1)).sum()
    }

    /// Checks the level invariants, returning a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        for (index, wall) in self.walls.iter().enumerate() {
            if wall.len() < 2 {
                return Err(format!("wall {index} has {} point(s), needs at least 2", wall.len()));
            }
            if let Some(point) = wall.iter().find(|p| !is_finite_point(**p)) {
                return Err(format!("wall {index} has non-finite point {point:?}"));
            }
        }
        if !is_finite_point(self.start_position) {
            return Err(format!("start position {:?} is not finite", self.start_position));
        }
        if !is_finite_point(self.end_position) {
            return Err(format!("end position {:?} is not finite", self.end_position));
        }
        for (index, obstacle) in self.obstacles.iter().enumerate() {
            if !is_finite_point(obstacle.position) || !obstacle.rotation.is_finite() {
                return Err(format!("obstacle {index} has a non-finite transform"));
            }
        }
        Ok(())
    }
}

fn is_finite_point(point: [f32; 2]) -> bool {
    point[0].is_finite() && point[1].is_finite()
}
