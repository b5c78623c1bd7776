use crate::{FramePresentPose, Lifecycle, Pose, TrackingMode};

/// Capability contract every head-tracking backend implements.
///
/// Queries report failure as `None` / `false`; they never block.
pub trait TrackingDataProvider: Lifecycle {
    /// Head pose at `timestamp` (nanoseconds on the HMD clock).
    fn head_pose(&self, timestamp: u64) -> Option<Pose>;

    fn hmd_time_nanos(&self) -> u64;

    fn frame_present_head_pose(&self) -> Option<FramePresentPose>;

    fn frame_present_time_by_count(&self, count: i32) -> Option<u64>;

    fn init_tracking_mode(&mut self, mode: TrackingMode) -> bool;

    fn switch_tracking_mode(&mut self, mode: TrackingMode) -> bool;

    fn recenter(&mut self) -> bool;
}
