use std::sync::Arc;

use super::TrackingDataProvider;
use crate::native::{NativeHeadTracking, NativeResult, NativeTracking};
use crate::{FramePresentPose, Lifecycle, NativeInterface, Pose, Result, TrackingMode};

/// Head tracking backed by the native runtime.
///
/// Native tracking is created together with the provider; a failure there is
/// a construction failure. `stop` destroys the native objects and is safe to
/// repeat; a later `start` creates them again. Pause is refused until a start
/// has succeeded, and resume without one performs that start.
pub struct NativeTrackingProvider {
    tracking: Arc<dyn NativeTracking>,
    head: Arc<dyn NativeHeadTracking>,
    created: bool,
    started: bool,
}

impl NativeTrackingProvider {
    pub fn new(native: &NativeInterface) -> Result<Self> {
        native.tracking.create().into_result("tracking.create")?;
        Ok(Self {
            tracking: native.tracking.clone(),
            head: native.head_tracking.clone(),
            created: true,
            started: false,
        })
    }
}

impl Lifecycle for NativeTrackingProvider {
    fn start(&mut self) -> bool {
        if !self.created {
            if !self.tracking.create().succeeded("tracking.create") {
                return false;
            }
            self.created = true;
        }
        let tracking = self.tracking.start().succeeded("tracking.start");
        let head = self.head.start().succeeded("head_tracking.start");
        self.started = tracking && head;
        self.started
    }

    fn pause(&mut self) -> bool {
        if !self.started {
            tracing::debug!("native tracking not started, nothing to pause");
            return false;
        }
        self.tracking.pause().succeeded("tracking.pause")
    }

    fn resume(&mut self) -> bool {
        if !self.started {
            return self.start();
        }
        self.tracking.resume().succeeded("tracking.resume")
    }

    fn stop(&mut self) -> bool {
        if !self.created {
            tracing::debug!("native tracking already destroyed");
            return true;
        }
        self.created = false;
        self.started = false;
        let head = self.head.destroy().succeeded("head_tracking.destroy");
        let tracking = self.tracking.destroy().succeeded("tracking.destroy");
        head && tracking
    }
}

impl TrackingDataProvider for NativeTrackingProvider {
    fn head_pose(&self, timestamp: u64) -> Option<Pose> {
        logged(self.head.head_pose(timestamp), "head_tracking.head_pose")
    }

    fn hmd_time_nanos(&self) -> u64 {
        self.head.hmd_time_nanos()
    }

    fn frame_present_head_pose(&self) -> Option<FramePresentPose> {
        logged(
            self.head.frame_present_head_pose(),
            "head_tracking.frame_present_head_pose",
        )
    }

    fn frame_present_time_by_count(&self, count: i32) -> Option<u64> {
        logged(
            self.head.frame_present_time_by_count(count),
            "head_tracking.frame_present_time",
        )
    }

    fn init_tracking_mode(&mut self, mode: TrackingMode) -> bool {
        self.tracking.init_tracking_mode(mode).succeeded("tracking.init_mode")
    }

    fn switch_tracking_mode(&mut self, mode: TrackingMode) -> bool {
        self.tracking
            .switch_tracking_mode(mode)
            .succeeded("tracking.switch_mode")
    }

    fn recenter(&mut self) -> bool {
        self.tracking.recenter().succeeded("tracking.recenter")
    }
}

fn logged<T>(result: std::result::Result<T, NativeResult>, operation: &'static str) -> Option<T> {
    result
        .map_err(|code| tracing::trace!(operation, result = ?code, "native query failed"))
        .ok()
}
