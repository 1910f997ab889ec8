//! Shared fixtures for unit tests.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::level::{Level, LevelId};
use crate::repository::{LevelRepository, MemoryLevels};

/// Installs a test-writer subscriber once per test binary. Later calls are no-ops.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .try_init();
}

/// Builds a complete level record around the given walls and obstacles JSON.
pub(crate) fn level_json(id: LevelId, walls_json: &str, obstacles_json: &str) -> String {
    format!(
        r#"{{
            "id": {id},
            "name": "Test Level {id}",
            "description": "fixture",
            "walls": {walls_json},
            "startPosition": {{ "x": 0, "y": 50 }},
            "endPosition": {{ "x": 100, "y": 50 }},
            "obstacles": {obstacles_json}
        }}"#
    )
}

/// One horizontal wall from (0,0) to (100,0), marble starting 50 above its left end.
pub(crate) fn straight_wall_level() -> Level {
    Level {
        id: 1,
        name: "Straight".to_string(),
        description: String::new(),
        walls: vec![vec![[0.0, 0.0], [100.0, 0.0]]],
        start_position: [0.0, 50.0],
        end_position: [100.0, 50.0],
        obstacles: Vec::new(),
    }
}

/// Floor with the end marker a few units from the start.
pub(crate) fn near_win_level_json(id: LevelId) -> String {
    format!(
        r#"{{
            "id": {id},
            "name": "Almost There",
            "description": "fixture",
            "walls": [[[-100, 0], [100, 0]]],
            "startPosition": {{ "x": 0, "y": 12 }},
            "endPosition": {{ "x": 5, "y": 12 }},
            "obstacles": []
        }}"#
    )
}

/// Repository with levels `1..=count`, each a straight wall level.
pub(crate) fn memory_repository(count: LevelId) -> LevelRepository {
    let mut source = MemoryLevels::new();
    for id in 1..=count {
        source = source.with_record(id, level_json(id, "[[[0, 0], [100, 0]]]", "[]"));
    }
    LevelRepository::new(source)
}
