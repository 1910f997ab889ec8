//! Per-frame glue between the state machine and an orientation sensor.

use crate::error::PhysicsError;
use crate::machine::{Action, GameStateKind, GameStateMachine};
use crate::sensor::{OrientationSensor, SampleSlot};
use crate::session::SessionEvent;

/// Runs the state machine once per frame and keeps the sensor polling only while
/// a level is being played.
#[derive(Debug)]
pub struct FrameDriver<S: OrientationSensor> {
    machine: GameStateMachine,
    slot: SampleSlot,
    sensor: S,
}

impl<S: OrientationSensor> FrameDriver<S> {
    pub fn new(machine: GameStateMachine, sensor: S) -> Self {
        let mut driver = Self {
            machine,
            slot: SampleSlot::new(),
            sensor,
        };
        driver.sync_sensor();
        driver
    }

    /// Forwards an action to the machine.
    pub fn handle(&mut self, action: Action) -> bool {
        let applied = self.machine.handle(action);
        self.sync_sensor();
        applied
    }

    /// Runs one frame of `dt` seconds with the newest sensor sample.
    ///
    /// Never blocks on the sensor. Physics errors are returned as-is.
    pub fn frame(&mut self, dt: f32) -> Result<Option<SessionEvent>, PhysicsError> {
        let sample = self.slot.take();
        let event = self.machine.update(dt, sample)?;
        self.sync_sensor();
        Ok(event)
    }

    fn sync_sensor(&mut self) {
        let playing = self.machine.kind() == GameStateKind::Playing;
        if playing && !self.sensor.is_running() {
            self.slot.clear();
            self.sensor.start(self.slot.clone());
        } else if !playing && self.sensor.is_running() {
            self.sensor.stop();
            self.slot.clear();
        }
    }

    pub fn machine(&self) -> &GameStateMachine {
        &self.machine
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Slot the sensor publishes into.
    pub fn slot(&self) -> &SampleSlot {
        &self.slot
    }
}
