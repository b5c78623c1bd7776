use std::sync::Arc;

use super::HandState;
use crate::native::{NativeHandTracking, NativeHandle};

/// Lifecycle plus data push for hand tracking.
///
/// `is_running` is the only state exposed; it changes only when the backing
/// call succeeds.
pub trait HandStatesService {
    fn is_running(&self) -> bool;
    fn run_service(&mut self) -> bool;
    fn stop_service(&mut self) -> bool;
    fn update_states(&mut self, states: &mut [HandState]);
    fn pause_service(&mut self);
    fn resume_service(&mut self);
    /// Terminal: releases the native handle for good.
    fn destroy_service(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleSlot {
    Unallocated,
    Live(NativeHandle),
    Destroyed,
}

/// Hand tracking service that owns its native handle directly.
pub struct NativeHandStatesService {
    native: Arc<dyn NativeHandTracking>,
    slot: HandleSlot,
    running: bool,
}

impl NativeHandStatesService {
    pub fn new(native: Arc<dyn NativeHandTracking>) -> Self {
        Self {
            native,
            slot: HandleSlot::Unallocated,
            running: false,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.slot == HandleSlot::Destroyed
    }

    fn handle(&self) -> Option<NativeHandle> {
        match self.slot {
            HandleSlot::Live(handle) => Some(handle),
            _ => None,
        }
    }

    fn allocate(&mut self) -> Option<NativeHandle> {
        match self.slot {
            HandleSlot::Live(handle) => Some(handle),
            HandleSlot::Destroyed => {
                tracing::warn!("hand tracking service was destroyed; construct a new one");
                None
            }
            HandleSlot::Unallocated => match self.native.create() {
                Ok(handle) => {
                    tracing::debug!(handle, "created native hand tracking");
                    self.slot = HandleSlot::Live(handle);
                    Some(handle)
                }
                Err(result) => {
                    tracing::warn!(?result, "native hand tracking create failed");
                    None
                }
            },
        }
    }
}

impl HandStatesService for NativeHandStatesService {
    fn is_running(&self) -> bool {
        self.running
    }

    fn run_service(&mut self) -> bool {
        let Some(handle) = self.allocate() else {
            return false;
        };
        let started = self.native.start(handle).succeeded("hand_tracking.start");
        if started {
            self.running = true;
        }
        started
    }

    fn stop_service(&mut self) -> bool {
        let Some(handle) = self.handle() else {
            return false;
        };
        let stopped = self.native.stop(handle).succeeded("hand_tracking.stop");
        if stopped {
            self.running = false;
        }
        stopped
    }

    fn update_states(&mut self, states: &mut [HandState]) {
        if let Some(handle) = self.handle() {
            self.native
                .update(handle, states)
                .succeeded("hand_tracking.update");
        }
    }

    fn pause_service(&mut self) {
        if let Some(handle) = self.handle() {
            if self.native.pause(handle).succeeded("hand_tracking.pause") {
                self.running = false;
            }
        }
    }

    fn resume_service(&mut self) {
        if let Some(handle) = self.handle() {
            if self.native.resume(handle).succeeded("hand_tracking.resume") {
                self.running = true;
            }
        }
    }

    fn destroy_service(&mut self) {
        if let Some(handle) = self.handle() {
            if self.native.destroy(handle).succeeded("hand_tracking.destroy") {
                self.running = false;
                self.slot = HandleSlot::Destroyed;
            }
        }
    }
}

impl std::fmt::Debug for NativeHandStatesService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandStatesService")
            .field("slot", &self.slot)
            .field("running", &self.running)
            .finish()
    }
}
