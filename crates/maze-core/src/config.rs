//! Gameplay tuning.
//!
//! Every field has a default matching the shipped game feel. Tuning files only
//! need to list the values they override:
//!
//! ```json
//! { "physics": { "gravity_multiplier": 1.5 }, "session": { "win_radius": 25 } }
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

/// Surface material applied to a collider.
///
/// Fields missing from a tuning file take rapier's collider defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.5,
        }
    }
}

/// Tilt-to-force response curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiltTuning {
    /// Components with a smaller magnitude are treated as zero.
    pub dead_zone: f32,
    /// Multiplier applied after the cubic curve.
    pub scale_factor: f32,
    /// Standard gravity magnitude (m/s²).
    pub gravity: f32,
}

impl Default for TiltTuning {
    fn default() -> Self {
        Self {
            dead_zone: 0.1,
            scale_factor: 12.0,
            gravity: 9.81,
        }
    }
}

/// Rigid body configuration for the marble and the level geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub marble_radius: f32,
    pub marble_material: Material,
    pub marble_linear_damping: f32,
    pub marble_angular_damping: f32,
    pub marble_mass: f32,
    pub wall_material: Material,
    /// Half of the wall stroke width.
    pub wall_half_thickness: f32,
    pub bumper_radius: f32,
    pub bumper_restitution: f32,
    pub hole_radius: f32,
    pub platform_size: [f32; 2],
    /// Vertical travel of a moving platform.
    pub platform_amplitude: f32,
    /// Time for one rise (or one fall) of a moving platform.
    pub platform_half_period: f32,
    /// Tilt force to gravity multiplier.
    pub gravity_multiplier: f32,
    /// Per-axis linear speed limit.
    pub max_linear_speed: f32,
    pub max_angular_speed: f32,
    /// Longest single integration step; larger frame deltas are sub-stepped.
    pub max_substep: f32,
    pub max_substeps: u32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            marble_radius: 10.0,
            marble_material: Material {
                restitution: 0.3,
                friction: 0.4,
            },
            marble_linear_damping: 0.5,
            marble_angular_damping: 0.7,
            marble_mass: 1.0,
            wall_material: Material {
                restitution: 0.1,
                friction: 0.6,
            },
            wall_half_thickness: 1.5,
            bumper_radius: 10.0,
            bumper_restitution: 0.9,
            hole_radius: 15.0,
            platform_size: [60.0, 10.0],
            platform_amplitude: 50.0,
            platform_half_period: 1.0,
            gravity_multiplier: 2.0,
            max_linear_speed: 1000.0,
            max_angular_speed: 20.0,
            max_substep: 1.0 / 60.0,
            max_substeps: 16,
        }
    }
}

/// Per-frame rules of a level attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionTuning {
    /// The marble is reset once its y drops below this value.
    pub fall_threshold: f32,
    /// Distance to the end marker that completes the level.
    pub win_radius: f32,
    /// Fraction of the camera-to-marble gap closed each frame.
    pub camera_smoothing: f32,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            fall_threshold: -200.0,
            win_radius: 20.0,
            camera_smoothing: 0.1,
        }
    }
}

/// Complete tuning set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub tilt: TiltTuning,
    pub physics: PhysicsTuning,
    pub session: SessionTuning,
}

impl GameTuning {
    /// Loads tuning overrides from a JSON string. Values that would break the
    /// simulation are rejected.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate().map_err(serde_json::Error::custom)?;
        Ok(tuning)
    }

    /// Checks every value, returning a description of the first bad one.
    pub fn validate(&self) -> Result<(), String> {
        let tilt = &self.tilt;
        require(tilt.dead_zone.is_finite() && (0.0..1.0).contains(&tilt.dead_zone), "tilt.dead_zone", tilt.dead_zone)?;
        require(tilt.scale_factor.is_finite(), "tilt.scale_factor", tilt.scale_factor)?;
        require(tilt.gravity.is_finite(), "tilt.gravity", tilt.gravity)?;

        let physics = &self.physics;
        for (name, value) in [
            ("physics.marble_radius", physics.marble_radius),
            ("physics.marble_mass", physics.marble_mass),
            ("physics.wall_half_thickness", physics.wall_half_thickness),
            ("physics.bumper_radius", physics.bumper_radius),
            ("physics.hole_radius", physics.hole_radius),
            ("physics.platform_size[0]", physics.platform_size[0]),
            ("physics.platform_size[1]", physics.platform_size[1]),
            ("physics.platform_half_period", physics.platform_half_period),
            ("physics.max_linear_speed", physics.max_linear_speed),
            ("physics.max_angular_speed", physics.max_angular_speed),
            ("physics.max_substep", physics.max_substep),
        ] {
            require(value.is_finite() && value > 0.0, name, value)?;
        }
        for (name, value) in [
            ("physics.marble_material.restitution", physics.marble_material.restitution),
            ("physics.marble_material.friction", physics.marble_material.friction),
            ("physics.wall_material.restitution", physics.wall_material.restitution),
            ("physics.wall_material.friction", physics.wall_material.friction),
            ("physics.marble_linear_damping", physics.marble_linear_damping),
            ("physics.marble_angular_damping", physics.marble_angular_damping),
            ("physics.bumper_restitution", physics.bumper_restitution),
        ] {
            require(value.is_finite() && value >= 0.0, name, value)?;
        }
        require(physics.platform_amplitude.is_finite(), "physics.platform_amplitude", physics.platform_amplitude)?;
        require(physics.gravity_multiplier.is_finite(), "physics.gravity_multiplier", physics.gravity_multiplier)?;
        if physics.max_substeps == 0 {
            return Err("physics.max_substeps must be at least 1".to_string());
        }

        let session = &self.session;
        require(session.fall_threshold.is_finite(), "session.fall_threshold", session.fall_threshold)?;
        require(session.win_radius.is_finite() && session.win_radius >= 0.0, "session.win_radius", session.win_radius)?;
        require(
            (0.0..=1.0).contains(&session.camera_smoothing),
            "session.camera_smoothing",
            session.camera_smoothing,
        )?;
        Ok(())
    }

    /// Serializes the tuning to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn require(ok: bool, name: &str, value: f32) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(format!("{name} is out of range: {value}"))
    }
}
