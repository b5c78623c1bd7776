use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::TrackingDataProvider;
use crate::emulator::SimulatedPoseSource;
use crate::{
    EmulatorConfig, EmulatorScene, FramePresentPose, Lifecycle, LostTrackingReason,
    MainThreadQueue, Pose, TrackingMode,
};

/// Head tracking backed by the emulator scene.
///
/// `start` only schedules the simulated head; it appears on the next
/// main-thread tick. Until then every pose query fails.
pub struct EmulatedTrackingProvider {
    main_thread: MainThreadQueue,
    scene: EmulatorScene,
    origin: Pose,
    source: Arc<Mutex<Option<SimulatedPoseSource>>>,
    clock: AtomicU64,
    time_step: u64,
}

impl EmulatedTrackingProvider {
    pub fn new(main_thread: MainThreadQueue, scene: EmulatorScene, config: &EmulatorConfig) -> Self {
        Self {
            main_thread,
            scene,
            origin: config.initial_pose,
            source: Arc::new(Mutex::new(None)),
            clock: AtomicU64::new(0),
            time_step: config.hmd_time_step_nanos,
        }
    }

    /// The simulated head this provider reads, once spawned.
    pub fn pose_source(&self) -> Option<SimulatedPoseSource> {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Saturates at `u64::MAX` rather than wrapping.
    fn advance_clock(&self) -> u64 {
        let step = self.time_step;
        let previous = self
            .clock
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |now| {
                Some(now.saturating_add(step))
            })
            .unwrap_or_else(|now| now);
        previous.saturating_add(step)
    }
}

impl Lifecycle for EmulatedTrackingProvider {
    fn start(&mut self) -> bool {
        let scene = self.scene.clone();
        let slot = self.source.clone();
        let origin = self.origin;
        self.main_thread.enqueue(move || {
            if let Err(err) = scene.ensure_manager() {
                tracing::warn!(%err, "emulator manager unavailable");
                return;
            }
            match scene.ensure_head_pose(origin) {
                Ok(source) => {
                    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(source);
                }
                Err(err) => tracing::warn!(%err, "emulated head pose unavailable"),
            }
        });
        tracing::debug!("scheduled emulated head pose");
        true
    }

    fn pause(&mut self) -> bool {
        true
    }

    fn resume(&mut self) -> bool {
        true
    }

    fn stop(&mut self) -> bool {
        true
    }
}

impl TrackingDataProvider for EmulatedTrackingProvider {
    fn head_pose(&self, _timestamp: u64) -> Option<Pose> {
        self.pose_source().map(|source| source.pose())
    }

    fn hmd_time_nanos(&self) -> u64 {
        self.advance_clock()
    }

    fn frame_present_head_pose(&self) -> Option<FramePresentPose> {
        let source = self.pose_source()?;
        Some(FramePresentPose {
            pose: source.pose(),
            lost_reason: LostTrackingReason::None,
            timestamp: self.advance_clock(),
        })
    }

    fn frame_present_time_by_count(&self, count: i32) -> Option<u64> {
        let count = u64::try_from(count).ok()?;
        self.time_step
            .checked_mul(count)?
            .checked_add(self.clock.load(Ordering::Relaxed))
    }

    fn init_tracking_mode(&mut self, _mode: TrackingMode) -> bool {
        true
    }

    fn switch_tracking_mode(&mut self, _mode: TrackingMode) -> bool {
        true
    }

    fn recenter(&mut self) -> bool {
        if let Some(source) = self.pose_source() {
            source.reset();
        }
        true
    }
}
