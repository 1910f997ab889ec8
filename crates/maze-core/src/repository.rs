//! Level loading.
//!
//! Level records are JSON documents keyed by level id:
//!
//! ```json
//! {
//!   "id": 1, "name": "First Steps", "description": "...",
//!   "walls": [[[-150, -150], [150, -150]]],
//!   "startPosition": { "x": -80, "y": -80 },
//!   "endPosition": { "x": 80, "y": 80 },
//!   "obstacles": [{ "type": "hole", "position": { "x": 0, "y": 0 }, "rotation": 0 }]
//! }
//! ```
//!
//! Records are decoded, converted into a [`Level`] and validated. Unknown obstacle
//! types are rejected rather than mapped to a default.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::LoadError;
use crate::level::{Level, LevelId, Obstacle, ObstacleKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LevelRecord {
    id: LevelId,
    name: String,
    description: String,
    walls: Vec<Vec<Vec<f32>>>,
    start_position: PositionRecord,
    end_position: PositionRecord,
    obstacles: Vec<ObstacleRecord>,
}

#[derive(Debug, Deserialize)]
struct PositionRecord {
    x: f32,
    y: f32,
}

impl PositionRecord {
    fn to_point(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

#[derive(Debug, Deserialize)]
struct ObstacleRecord {
    #[serde(rename = "type")]
    kind: String,
    position: PositionRecord,
    rotation: f32,
}

/// Decodes and validates a single level record.
pub fn decode_level(id: LevelId, json: &str) -> Result<Level, LoadError> {
    let record: LevelRecord = serde_json::from_str(json).map_err(|e| LoadError::Parse {
        id,
        reason: e.to_string(),
    })?;

    let mut walls = Vec::with_capacity(record.walls.len());
    for (wall_index, wall) in record.walls.iter().enumerate() {
        let mut points = Vec::with_capacity(wall.len());
        for (point_index, coords) in wall.iter().enumerate() {
            let &[x, y] = coords.as_slice() else {
                return Err(LoadError::Parse {
                    id,
                    reason: format!(
                        "wall {wall_index} point {point_index} has {} coordinate(s), expected 2",
                        coords.len()
                    ),
                });
            };
            points.push([x, y]);
        }
        walls.push(points);
    }

    let mut obstacles = Vec::with_capacity(record.obstacles.len());
    for (index, obstacle) in record.obstacles.iter().enumerate() {
        let kind = ObstacleKind::from_name(&obstacle.kind).ok_or_else(|| LoadError::Validation {
            id,
            reason: format!("obstacle {index} has unknown type {:?}", obstacle.kind),
        })?;
        obstacles.push(Obstacle {
            kind,
            position: obstacle.position.to_point(),
            rotation: obstacle.rotation,
        });
    }

    if record.id != id {
        return Err(LoadError::Validation {
            id,
            reason: format!("record declares id {}", record.id),
        });
    }

    let level = Level {
        id: record.id,
        name: record.name,
        description: record.description,
        walls,
        start_position: record.start_position.to_point(),
        end_position: record.end_position.to_point(),
        obstacles,
    };
    level
        .validate()
        .map_err(|reason| LoadError::Validation { id, reason })?;

    Ok(level)
}

/// External store of level records.
pub trait LevelSource: Send + Sync {
    /// Returns the raw record for `id`, or `None` when no such level exists.
    fn fetch(&self, id: LevelId) -> io::Result<Option<String>>;

    /// Whether a record exists for `id`.
    fn contains(&self, id: LevelId) -> bool {
        matches!(self.fetch(id), Ok(Some(_)))
    }
}

/// Levels compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedLevels;

impl EmbeddedLevels {
    const LEVELS: [&'static str; 3] = [
        include_str!("../levels/level1.json"),
        include_str!("../levels/level2.json"),
        include_str!("../levels/level3.json"),
    ];

    fn record(id: LevelId) -> Option<&'static str> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        Self::LEVELS.get(index).copied()
    }

    /// Number of built-in levels.
    pub fn count() -> usize {
        Self::LEVELS.len()
    }
}

impl LevelSource for EmbeddedLevels {
    fn fetch(&self, id: LevelId) -> io::Result<Option<String>> {
        Ok(Self::record(id).map(str::to_string))
    }

    fn contains(&self, id: LevelId) -> bool {
        Self::record(id).is_some()
    }
}

/// Levels stored as `level<N>.json` files in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryLevels {
    root: PathBuf,
}

impl DirectoryLevels {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, id: LevelId) -> PathBuf {
        self.root.join(format!("level{id}.json"))
    }
}

impl LevelSource for DirectoryLevels {
    fn fetch(&self, id: LevelId) -> io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(id)) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn contains(&self, id: LevelId) -> bool {
        self.path(id).is_file()
    }
}

/// In-memory level records.
#[derive(Debug, Clone, Default)]
pub struct MemoryLevels {
    records: HashMap<LevelId, String>,
}

impl MemoryLevels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a record.
    #[must_use]
    pub fn with_record(mut self, id: LevelId, json: impl Into<String>) -> Self {
        self.records.insert(id, json.into());
        self
    }
}

impl LevelSource for MemoryLevels {
    fn fetch(&self, id: LevelId) -> io::Result<Option<String>> {
        Ok(self.records.get(&id).cloned())
    }
}

/// Loads levels from a source, caching decoded levels by id.
pub struct LevelRepository {
    source: Box<dyn LevelSource>,
    cache: RwLock<HashMap<LevelId, Level>>,
}

impl std::fmt::Debug for LevelRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelRepository")
            .field("cached_levels", &self.cache.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for LevelRepository {
    fn default() -> Self {
        Self::new(EmbeddedLevels)
    }
}

impl LevelRepository {
    pub fn new(source: impl LevelSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Loads a level by id.
    pub fn load(&self, id: LevelId) -> Result<Level, LoadError> {
        if let Some(level) = self.cache.read().get(&id) {
            return Ok(level.clone());
        }

        let json = self
            .source
            .fetch(id)
            .map_err(|e| LoadError::Parse {
                id,
                reason: format!("failed to read record: {e}"),
            })?
            .ok_or(LoadError::NotFound(id))?;

        let level = decode_level(id, &json)?;
        tracing::info!(
            "[levels] Loaded level {} \"{}\" ({} walls, {} obstacles)",
            id,
            level.name,
            level.walls.len(),
            level.obstacles.len()
        );

        self.cache.write().insert(id, level.clone());
        Ok(level)
    }

    /// Whether a level with this id exists.
    pub fn has_level(&self, id: LevelId) -> bool {
        self.cache.read().contains_key(&id) || self.source.contains(id)
    }

    /// Drops every cached level.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }
}
