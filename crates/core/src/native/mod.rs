//! Boundary to the native glasses runtime.
//!
//! The hardware-backed providers talk to the device exclusively through the
//! traits in this module. The embedding application supplies the concrete
//! implementation as a [`NativeInterface`]; [`InMemoryDevice`] is a complete
//! in-process stand-in used when no glasses are attached and by the tests.
//!
//! Every call may fail. Results are handed back unmodified; turning them into
//! the boolean outcomes the subsystems expose happens in the providers.

mod memory;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    DisplayEye, FramePresentPose, GlassesError, GlassesEvent, GlassesModel, HandState, Pose, Resolution,
    Result, TrackingMode,
};

pub use memory::InMemoryDevice;

/// Opaque handle returned by native `create` calls.
pub type NativeHandle = u64;

/// Invoked by the display runtime whenever the main screen changes resolution.
pub type ResolutionCallback = Arc<dyn Fn(Resolution) + Send + Sync>;

/// Invoked by the glasses controller on wear changes and disconnects. May
/// run on a runtime thread.
pub type GlassesEventCallback = Arc<dyn Fn(GlassesEvent) + Send + Sync>;

/// Return code of a native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeResult {
    Success,
    Failure,
    InvalidArgument,
    NotEnoughMemory,
    Unsupported,
    GlassesDisconnected,
    SdkVersionMismatch,
    SensorNotReady,
}

impl NativeResult {
    pub fn is_success(self) -> bool {
        self == NativeResult::Success
    }

    /// Converts the code into a crate error tagged with the failing operation.
    pub fn into_result(self, operation: &'static str) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(GlassesError::Native {
                operation,
                result: self,
            })
        }
    }

    /// Boolean view of the code. Failures are logged, never raised.
    pub fn succeeded(self, operation: &'static str) -> bool {
        if !self.is_success() {
            tracing::warn!(operation, result = ?self, "native call failed");
        }
        self.is_success()
    }
}

pub trait NativeTracking: Send + Sync {
    fn create(&self) -> NativeResult;
    fn start(&self) -> NativeResult;
    fn pause(&self) -> NativeResult;
    fn resume(&self) -> NativeResult;
    fn recenter(&self) -> NativeResult;
    fn destroy(&self) -> NativeResult;
    fn init_tracking_mode(&self, mode: TrackingMode) -> NativeResult;
    fn switch_tracking_mode(&self, mode: TrackingMode) -> NativeResult;
}

pub trait NativeHeadTracking: Send + Sync {
    fn start(&self) -> NativeResult;
    fn destroy(&self) -> NativeResult;
    fn head_pose(&self, timestamp: u64) -> std::result::Result<Pose, NativeResult>;
    fn frame_present_head_pose(&self) -> std::result::Result<FramePresentPose, NativeResult>;
    /// Predicted present time of the `count`-th upcoming frame.
    fn frame_present_time_by_count(&self, count: i32) -> std::result::Result<u64, NativeResult>;
    fn hmd_time_nanos(&self) -> u64;
}

pub trait NativeDisplay: Send + Sync {
    fn create(&self) -> NativeResult;
    fn start(&self) -> NativeResult;
    fn pause(&self) -> NativeResult;
    fn resume(&self) -> NativeResult;
    fn stop(&self) -> NativeResult;
    fn destroy(&self) -> NativeResult;
    fn listen_main_screen_resolution_changed(&self, callback: ResolutionCallback) -> NativeResult;
}

pub trait NativeGlasses: Send + Sync {
    fn create(&self) -> NativeResult;
    fn start(&self) -> NativeResult;
    fn pause(&self) -> NativeResult;
    fn resume(&self) -> NativeResult;
    fn stop(&self) -> NativeResult;
    fn destroy(&self) -> NativeResult;
    fn glasses_model(&self) -> std::result::Result<GlassesModel, NativeResult>;
    fn brightness(&self) -> std::result::Result<i32, NativeResult>;
    fn set_brightness(&self, brightness: i32) -> NativeResult;
    fn eye_resolution(&self, eye: DisplayEye) -> std::result::Result<Resolution, NativeResult>;
    /// Registration is bound to the current controller and dropped by `destroy`.
    fn listen_glasses_events(&self, callback: GlassesEventCallback) -> NativeResult;
}

pub trait NativeHandTracking: Send + Sync {
    fn create(&self) -> std::result::Result<NativeHandle, NativeResult>;
    fn start(&self, handle: NativeHandle) -> NativeResult;
    fn stop(&self, handle: NativeHandle) -> NativeResult;
    fn pause(&self, handle: NativeHandle) -> NativeResult;
    fn resume(&self, handle: NativeHandle) -> NativeResult;
    fn destroy(&self, handle: NativeHandle) -> NativeResult;
    /// Writes the latest hand data into `states`.
    fn update(&self, handle: NativeHandle, states: &mut [HandState]) -> NativeResult;
}

/// Bundle of native capabilities handed to a session.
#[derive(Clone)]
pub struct NativeInterface {
    pub tracking: Arc<dyn NativeTracking>,
    pub head_tracking: Arc<dyn NativeHeadTracking>,
    pub display: Arc<dyn NativeDisplay>,
    pub glasses: Arc<dyn NativeGlasses>,
    pub hand_tracking: Arc<dyn NativeHandTracking>,
}

impl NativeInterface {
    /// Uses a single object for every capability.
    pub fn from_device<D>(device: Arc<D>) -> Self
    where
        D: NativeTracking
            + NativeHeadTracking
            + NativeDisplay
            + NativeGlasses
            + NativeHandTracking
            + 'static,
    {
        Self {
            tracking: device.clone(),
            head_tracking: device.clone(),
            display: device.clone(),
            glasses: device.clone(),
            hand_tracking: device,
        }
    }
}

impl fmt::Debug for NativeInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeInterface").finish_non_exhaustive()
    }
}
