//! Core library of the XR glasses SDK.
//!
//! Hardware features (head tracking, display, glasses control, hand
//! tracking) are exposed as lifecycle-managed subsystems. Each subsystem is
//! acquired through a [`Session`], which caches exactly one instance per
//! subsystem id, and wraps one provider: either the native runtime or an
//! in-process emulator, chosen once from [`ProviderBackend`].
//!
//! ```text
//! Session::tracking() ─► SubsystemRegistry::create(descriptor)
//!                           ├─ cached ─► same handle
//!                           └─ miss   ─► factory(context) ─► TrackingSubsystem
//!                                                              └─ Box<dyn TrackingDataProvider>
//!                                                                   ├─ NativeTrackingProvider
//!                                                                   └─ EmulatedTrackingProvider
//! ```

pub mod config;
pub mod device;
pub mod dispatch;
pub mod display;
pub mod emulator;
pub mod error;
pub mod hand;
pub mod lifecycle;
pub mod native;
pub mod registry;
pub mod session;
pub mod tracking;
pub mod types;

pub use config::{DeviceConfig, EmulatorConfig, ProviderBackend, SdkConfig};
pub use device::{DeviceProvider, DeviceSubsystem, BRIGHTNESS_MAX, BRIGHTNESS_MIN, DEVICE_SUBSYSTEM_ID};
pub use dispatch::MainThreadQueue;
pub use display::{DisplayProvider, DisplaySubsystem, DISPLAY_SUBSYSTEM_ID};
pub use emulator::{EmulatorScene, SimulatedPoseSource};
pub use error::{GlassesError, Result};
pub use hand::{HandEnum, HandGesture, HandJointId, HandState, HandStatesService, NativeHandStatesService};
pub use lifecycle::{Lifecycle, LifecycleState, Subsystem, SubsystemCore, SubsystemState};
pub use native::{InMemoryDevice, NativeInterface};
pub use registry::{SubsystemContext, SubsystemDescriptor, SubsystemHandle, SubsystemRegistry};
pub use session::Session;
pub use tracking::{TrackingDataProvider, TrackingSubsystem, TRACKING_SUBSYSTEM_ID};
pub use types::{
    DisplayEye, FramePresentPose, GlassesDisconnectReason, GlassesEvent, GlassesModel,
    LostTrackingReason, Pose, Quaternion, Resolution, TrackingMode, Vector3,
};
