//! Tilt-to-force signal processing.
//!
//! Orientation samples are normalized gravity projections in [-1, 1]. They go
//! through a dead zone and a cubic response curve, then get scaled by standard
//! gravity. Clamping happens later, in the physics world.

use rapier2d::prelude::Vector;
use serde::{Deserialize, Serialize};

use crate::config::TiltTuning;
use crate::error::TiltError;

/// One orientation reading from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TiltSample {
    /// Left/right tilt, drives the x axis.
    pub roll: f32,
    /// Forward/back tilt, drives the y axis.
    pub pitch: f32,
}

impl TiltSample {
    pub const fn new(roll: f32, pitch: f32) -> Self {
        Self { roll, pitch }
    }

    /// Device lying flat.
    pub const LEVEL: TiltSample = TiltSample::new(0.0, 0.0);
}

/// Stateless tilt-to-force converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiltSignalProcessor {
    tuning: TiltTuning,
}

impl TiltSignalProcessor {
    pub fn new(tuning: TiltTuning) -> Self {
        Self { tuning }
    }

    /// Converts a roll/pitch pair into a force vector.
    pub fn compute_force(&self, roll: f32, pitch: f32) -> Result<Vector, TiltError> {
        if !is_valid_component(roll) || !is_valid_component(pitch) {
            return Err(TiltError::InvalidSignal { roll, pitch });
        }

        Ok(Vector::new(self.shape(roll), self.shape(pitch)))
    }

    /// Converts a full sample.
    pub fn compute_sample(&self, sample: TiltSample) -> Result<Vector, TiltError> {
        self.compute_force(sample.roll, sample.pitch)
    }

    fn shape(&self, value: f32) -> f32 {
        if value.abs() <= self.tuning.dead_zone {
            return 0.0;
        }
        value.powi(3) * self.tuning.scale_factor * self.tuning.gravity
    }
}

fn is_valid_component(value: f32) -> bool {
    value.is_finite() && (-1.0..=1.0).contains(&value)
}

/// Tracks the last good force so ticks without a usable sample keep the marble
/// under the previous tilt instead of stalling.
#[derive(Debug, Clone)]
pub struct TiltInput {
    processor: TiltSignalProcessor,
    force: Vector,
    rejected: u64,
}

impl TiltInput {
    pub fn new(processor: TiltSignalProcessor) -> Self {
        Self {
            processor,
            force: Vector::new(0.0, 0.0),
            rejected: 0,
        }
    }

    /// Folds the newest sample (if any) in and returns the force for this tick.
    pub fn latest_force(&mut self, sample: Option<TiltSample>) -> Vector {
        let Some(sample) = sample else {
            return self.force;
        };

        match self.processor.compute_sample(sample) {
            Ok(force) => self.force = force,
            Err(err) => {
                self.rejected += 1;
                tracing::warn!("[tilt] Dropping sample: {}", err);
            }
        }
        self.force
    }

    /// Force used on the previous tick.
    pub fn current_force(&self) -> Vector {
        self.force
    }

    /// Number of samples rejected as invalid.
    pub fn rejected_samples(&self) -> u64 {
        self.rejected
    }

    /// Forgets the previous force (new level, resume after pause).
    pub fn reset(&mut self) {
        self.force = Vector::new(0.0, 0.0);
    }
}
