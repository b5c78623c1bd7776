//! Head tracking subsystem.
//!
//! The provider is picked once from the session's [`ProviderBackend`] and
//! stays bound for the subsystem's lifetime. Queries are forwarded whatever
//! the lifecycle state; callers decide whether a stopped subsystem's answer
//! is meaningful.

mod emulated;
mod hardware;
mod provider;

use crate::{
    FramePresentPose, Pose, ProviderBackend, Result, Subsystem, SubsystemContext, SubsystemCore,
    SubsystemDescriptor, SubsystemState, TrackingMode,
};

pub use emulated::EmulatedTrackingProvider;
pub use hardware::NativeTrackingProvider;
pub use provider::TrackingDataProvider;

pub const TRACKING_SUBSYSTEM_ID: &str = "Subsystem.Tracking";

pub struct TrackingSubsystem {
    core: SubsystemCore<dyn TrackingDataProvider>,
    backend: ProviderBackend,
}

impl TrackingSubsystem {
    pub fn descriptor() -> SubsystemDescriptor<Self> {
        SubsystemDescriptor::new(TRACKING_SUBSYSTEM_ID, Self::from_context)
    }

    /// Binds the provider matching the context's backend.
    pub fn from_context(context: &SubsystemContext) -> Result<Self> {
        let provider: Box<dyn TrackingDataProvider> = match context.backend() {
            ProviderBackend::Hardware => {
                Box::new(NativeTrackingProvider::new(context.native("tracking")?)?)
            }
            ProviderBackend::Emulated => Box::new(EmulatedTrackingProvider::new(
                context.main_thread().clone(),
                context.scene().clone(),
                &context.config().emulator,
            )),
        };
        Ok(Self::with_provider(context.backend(), provider))
    }

    pub fn with_provider(backend: ProviderBackend, provider: Box<dyn TrackingDataProvider>) -> Self {
        tracing::debug!(?backend, "binding tracking provider");
        Self {
            core: SubsystemCore::new(TRACKING_SUBSYSTEM_ID, provider),
            backend,
        }
    }

    pub fn backend(&self) -> ProviderBackend {
        self.backend
    }

    pub fn head_pose(&self, timestamp: u64) -> Option<Pose> {
        self.core.provider().head_pose(timestamp)
    }

    pub fn hmd_time_nanos(&self) -> u64 {
        self.core.provider().hmd_time_nanos()
    }

    pub fn frame_present_head_pose(&self) -> Option<FramePresentPose> {
        self.core.provider().frame_present_head_pose()
    }

    pub fn frame_present_time_by_count(&self, count: i32) -> Option<u64> {
        self.core.provider().frame_present_time_by_count(count)
    }

    pub fn init_tracking_mode(&mut self, mode: TrackingMode) -> bool {
        self.core.provider_mut().init_tracking_mode(mode)
    }

    pub fn switch_tracking_mode(&mut self, mode: TrackingMode) -> bool {
        self.core.provider_mut().switch_tracking_mode(mode)
    }

    pub fn recenter(&mut self) -> bool {
        self.core.provider_mut().recenter()
    }
}

impl Subsystem for TrackingSubsystem {
    fn id(&self) -> &'static str {
        self.core.id()
    }

    fn state(&self) -> SubsystemState {
        self.core.state()
    }

    fn start(&mut self) -> bool {
        self.core.start()
    }

    fn pause(&mut self) -> bool {
        self.core.pause()
    }

    fn resume(&mut self) -> bool {
        self.core.resume()
    }

    fn stop(&mut self) -> bool {
        self.core.stop()
    }
}

impl std::fmt::Debug for TrackingSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSubsystem")
            .field("backend", &self.backend)
            .field("state", &self.core.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::native::NativeResult;
    use crate::{GlassesError, InMemoryDevice, NativeInterface, SdkConfig, SubsystemRegistry};

    fn hardware_context(device: &Arc<InMemoryDevice>) -> SubsystemContext {
        SubsystemContext::new(
            SdkConfig::default(),
            Some(NativeInterface::from_device(device.clone())),
        )
    }

    #[test]
    fn hardware_lifecycle_drives_native_calls_in_order() {
        let device = Arc::new(InMemoryDevice::new());
        let mut tracking = TrackingSubsystem::from_context(&hardware_context(&device)).unwrap();
        assert_eq!(tracking.backend(), ProviderBackend::Hardware);

        tracking.start();
        tracking.start();
        tracking.pause();
        tracking.resume();
        tracking.stop();
        tracking.stop();

        assert_eq!(
            device.calls(),
            vec![
                "tracking.create",
                "tracking.start",
                "head_tracking.start",
                "tracking.pause",
                "tracking.resume",
                "head_tracking.destroy",
                "tracking.destroy",
            ]
        );
    }

    #[test]
    fn hardware_backend_without_native_layer_cannot_be_built() {
        let context = SubsystemContext::new(SdkConfig::default(), None);
        let err = TrackingSubsystem::from_context(&context).unwrap_err();
        assert!(matches!(err, GlassesError::MissingNativeLayer("tracking")));
    }

    #[test]
    fn native_create_failure_is_raised_once_and_not_cached() {
        let device = Arc::new(InMemoryDevice::new());
        device.fail("tracking.create", NativeResult::GlassesDisconnected);
        let context = hardware_context(&device);
        let mut registry = SubsystemRegistry::new();

        let err = registry
            .create(&TrackingSubsystem::descriptor(), &context)
            .unwrap_err();
        assert!(matches!(err, GlassesError::Construction { .. }));
        assert!(!registry.contains(TRACKING_SUBSYSTEM_ID));
        assert_eq!(device.call_count("tracking.create"), 1);

        device.heal("tracking.create");
        assert!(registry
            .create(&TrackingSubsystem::descriptor(), &context)
            .is_ok());
        assert_eq!(device.call_count("tracking.create"), 2);
    }

    #[test]
    fn failed_native_start_leaves_subsystem_running() {
        let device = Arc::new(InMemoryDevice::new());
        device.fail("tracking.start", NativeResult::SensorNotReady);
        let mut tracking = TrackingSubsystem::from_context(&hardware_context(&device)).unwrap();

        assert!(!tracking.start());
        assert!(tracking.running());
    }

    #[test]
    fn emulated_scenario_reads_simulated_pose_after_tick() {
        let context = SubsystemContext::new(SdkConfig::emulated(), None);
        let mut registry = SubsystemRegistry::new();
        let handle = registry
            .create(&TrackingSubsystem::descriptor(), &context)
            .unwrap();
        let mut tracking = handle.lock().unwrap();
        assert_eq!(tracking.backend(), ProviderBackend::Emulated);

        assert!(tracking.start());
        assert_eq!(tracking.head_pose(0), None);

        context.main_thread().tick(0.0);
        let expected = context.scene().head_pose().unwrap().pose();
        assert_eq!(tracking.head_pose(0), Some(expected));

        assert!(tracking.stop());
        assert_eq!(tracking.state(), SubsystemState::Stopped);
        assert_eq!(tracking.head_pose(0), Some(expected));
    }
}
