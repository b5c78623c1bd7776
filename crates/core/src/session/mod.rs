//! Explicit owner of everything that lives for one SDK session.
//!
//! The registry, its context and the main-thread queue are created with the
//! session and released by [`Session::teardown`] (also run on drop), so a new
//! session always starts from an empty cache.

use std::sync::Arc;

use crate::registry::SubsystemHandle;
use crate::{
    DeviceSubsystem, DisplaySubsystem, NativeHandStatesService, NativeInterface, Result,
    SdkConfig, Subsystem, SubsystemContext, SubsystemDescriptor, SubsystemRegistry,
    TrackingSubsystem,
};

#[derive(Debug)]
pub struct Session {
    context: SubsystemContext,
    registry: SubsystemRegistry,
}

impl Session {
    pub fn new(config: SdkConfig, native: Option<NativeInterface>) -> Self {
        tracing::info!(backend = ?config.backend, "opening session");
        Self {
            context: SubsystemContext::new(config, native),
            registry: SubsystemRegistry::new(),
        }
    }

    pub fn context(&self) -> &SubsystemContext {
        &self.context
    }

    pub fn registry(&self) -> &SubsystemRegistry {
        &self.registry
    }

    /// Acquires the subsystem for `descriptor`, building it on first use.
    pub fn create<S: Subsystem + 'static>(
        &mut self,
        descriptor: &SubsystemDescriptor<S>,
    ) -> Result<SubsystemHandle<S>> {
        self.registry.create(descriptor, &self.context)
    }

    pub fn tracking(&mut self) -> Result<SubsystemHandle<TrackingSubsystem>> {
        self.create(&TrackingSubsystem::descriptor())
    }

    pub fn display(&mut self) -> Result<SubsystemHandle<DisplaySubsystem>> {
        self.create(&DisplaySubsystem::descriptor())
    }

    pub fn device(&mut self) -> Result<SubsystemHandle<DeviceSubsystem>> {
        self.create(&DeviceSubsystem::descriptor())
    }

    /// A fresh hand-state service bound to the native hand tracker.
    pub fn hand_states_service(&self) -> Result<NativeHandStatesService> {
        let native = self.context.native("hand tracking")?;
        Ok(NativeHandStatesService::new(Arc::clone(&native.hand_tracking)))
    }

    /// Host per-frame hook: runs deferred main-thread work.
    pub fn tick(&self, time_seconds: f32) -> usize {
        self.context.main_thread().tick(time_seconds)
    }

    /// Pauses every running subsystem. Subsystems that were never started
    /// stay stopped.
    ///
    /// A subsystem whose handle is locked by the caller is skipped with a
    /// warning and the call returns `false`; drop outstanding guards first.
    pub fn pause(&mut self) -> bool {
        tracing::info!("pausing session");
        self.registry.pause_all()
    }

    /// Resumes only what the last [`Session::pause`] paused. Without a prior
    /// pause this does nothing. Locked handles are skipped as in `pause`.
    pub fn resume(&mut self) -> bool {
        tracing::info!("resuming session");
        self.registry.resume_all()
    }

    /// Stops every subsystem and empties the cache. A subsystem locked by the
    /// caller at this point is dropped from the cache without being stopped.
    pub fn teardown(&mut self) -> bool {
        if self.registry.is_empty() {
            return true;
        }
        tracing::info!(subsystems = self.registry.len(), "tearing down session");
        self.registry.clear()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}
