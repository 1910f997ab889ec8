//! Orientation sensor hand-off.
//!
//! Sensors publish into a [`SampleSlot`] from their own thread; the update loop
//! takes whatever is newest once per frame. Older unread samples are overwritten.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::tilt::TiltSample;

/// Single-slot, last-value-wins sample buffer shared between a sensor and the
/// update loop.
#[derive(Debug, Clone, Default)]
pub struct SampleSlot {
    inner: Arc<Mutex<Option<TiltSample>>>,
}

impl SampleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a sample, replacing any unread one.
    pub fn publish(&self, sample: TiltSample) {
        *self.inner.lock() = Some(sample);
    }

    /// Takes the newest sample, leaving the slot empty.
    pub fn take(&self) -> Option<TiltSample> {
        self.inner.lock().take()
    }

    /// Discards any unread sample.
    pub fn clear(&self) {
        self.inner.lock().take();
    }
}

/// A source of orientation samples.
///
/// `start` and `stop` are idempotent: starting a running sensor or stopping a
/// stopped one does nothing.
pub trait OrientationSensor: Send {
    fn start(&mut self, slot: SampleSlot);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

type Script = dyn Fn(f32) -> TiltSample + Send + Sync;

/// Background sensor replaying a function of time since `start`.
pub struct ScriptedSensor {
    script: Arc<Script>,
    interval: Duration,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ScriptedSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedSensor")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ScriptedSensor {
    /// Default polling interval (~60Hz).
    pub const DEFAULT_INTERVAL: Duration = Duration::from_micros(16_667);

    pub fn new(script: impl Fn(f32) -> TiltSample + Send + Sync + 'static) -> Self {
        Self {
            script: Arc::new(script),
            interval: Self::DEFAULT_INTERVAL,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Sensor that always reports the same tilt.
    pub fn constant(sample: TiltSample) -> Self {
        Self::new(move |_| sample)
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl OrientationSensor for ScriptedSensor {
    fn start(&mut self, slot: SampleSlot) {
        if self.worker.is_some() {
            return;
        }

        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = Arc::clone(&stop_flag);
        let script = Arc::clone(&self.script);
        let interval = self.interval;

        self.worker = Some(thread::spawn(move || {
            let started = Instant::now();
            while !stop_flag.load(Ordering::Acquire) {
                slot.publish((*script)(started.elapsed().as_secs_f32()));
                thread::sleep(interval);
            }
        }));
        tracing::debug!("[sensor] Started polling every {:?}", interval);
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.stop_flag.store(true, Ordering::Release);
        if worker.join().is_err() {
            tracing::warn!("[sensor] Sensor thread panicked");
        }
        tracing::debug!("[sensor] Stopped");
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for ScriptedSensor {
    fn drop(&mut self) {
        self.stop();
    }
}
