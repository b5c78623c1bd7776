use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{
    GlassesEventCallback, NativeDisplay, NativeGlasses, NativeHandTracking, NativeHandle, NativeHeadTracking,
    NativeResult, NativeTracking, ResolutionCallback,
};
use crate::{
    DisplayEye, FramePresentPose, GlassesEvent, GlassesModel, HandState, LostTrackingReason, Pose, Resolution,
    TrackingMode,
};

/// Most recent calls kept by [`InMemoryDevice`]; older entries are dropped.
pub const CALL_LOG_CAPACITY: usize = 1024;

/// Native layer that lives entirely in process memory.
///
/// Every call is appended to a log (`"tracking.start"`, `"display.destroy"`,
/// ...) so callers can assert on exactly which native operations ran and in
/// which order. The log keeps the last [`CALL_LOG_CAPACITY`] entries. Any
/// operation can be made to fail with [`InMemoryDevice::fail`].
#[derive(Default)]
pub struct InMemoryDevice {
    state: Mutex<DeviceState>,
}

struct DeviceState {
    calls: VecDeque<&'static str>,
    failures: HashMap<&'static str, NativeResult>,
    head_pose: Pose,
    lost_reason: LostTrackingReason,
    hmd_time_nanos: u64,
    frame_interval_nanos: u64,
    tracking_mode: TrackingMode,
    glasses_model: GlassesModel,
    brightness: i32,
    eye_resolution: Resolution,
    resolution_listeners: Vec<ResolutionCallback>,
    glasses_listeners: Vec<GlassesEventCallback>,
    next_hand_handle: NativeHandle,
    hand_pose: Option<Pose>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            calls: VecDeque::new(),
            failures: HashMap::new(),
            head_pose: Pose::IDENTITY,
            lost_reason: LostTrackingReason::None,
            hmd_time_nanos: 0,
            frame_interval_nanos: 16_666_667,
            tracking_mode: TrackingMode::SixDof,
            glasses_model: GlassesModel::Light,
            brightness: 3,
            eye_resolution: Resolution::new(1920, 1080),
            resolution_listeners: Vec::new(),
            glasses_listeners: Vec::new(),
            next_hand_handle: 1,
            hand_pose: None,
        }
    }
}

impl DeviceState {
    fn push_call(&mut self, operation: &'static str) {
        if self.calls.len() == CALL_LOG_CAPACITY {
            self.calls.pop_front();
        }
        self.calls.push_back(operation);
    }
}

impl InMemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call to `operation` return `result`.
    pub fn fail(&self, operation: &'static str, result: NativeResult) {
        self.lock().failures.insert(operation, result);
    }

    /// Lets `operation` succeed again.
    pub fn heal(&self, operation: &'static str) {
        self.lock().failures.remove(operation);
    }

    /// Native operations invoked so far, oldest first.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.iter().copied().collect()
    }

    /// Number of times `operation` has been invoked.
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn set_head_pose(&self, pose: Pose) {
        self.lock().head_pose = pose;
    }

    pub fn set_lost_reason(&self, reason: LostTrackingReason) {
        self.lock().lost_reason = reason;
    }

    pub fn set_hmd_time_nanos(&self, nanos: u64) {
        self.lock().hmd_time_nanos = nanos;
    }

    pub fn set_glasses_model(&self, model: GlassesModel) {
        self.lock().glasses_model = model;
    }

    /// Pose reported for tracked hands; `None` leaves hands untracked.
    pub fn set_hand_pose(&self, pose: Option<Pose>) {
        self.lock().hand_pose = pose;
    }

    pub fn tracking_mode(&self) -> TrackingMode {
        self.lock().tracking_mode
    }

    /// Simulates the runtime reporting a new main-screen resolution.
    pub fn emit_resolution_change(&self, resolution: Resolution) {
        let listeners = self.lock().resolution_listeners.clone();
        for listener in listeners {
            listener(resolution);
        }
    }

    /// Simulates the glasses controller reporting `event`.
    pub fn emit_glasses_event(&self, event: GlassesEvent) {
        let listeners = self.lock().glasses_listeners.clone();
        for listener in listeners {
            listener(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: &'static str) -> NativeResult {
        let mut state = self.lock();
        state.push_call(operation);
        state
            .failures
            .get(operation)
            .copied()
            .unwrap_or(NativeResult::Success)
    }

    fn query<T>(
        &self,
        operation: &'static str,
        read: impl FnOnce(&DeviceState) -> T,
    ) -> Result<T, NativeResult> {
        match self.record(operation) {
            NativeResult::Success => Ok(read(&*self.lock())),
            failure => Err(failure),
        }
    }
}

impl std::fmt::Debug for InMemoryDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryDevice")
            .field("calls", &state.calls.len())
            .field("failures", &state.failures)
            .field("tracking_mode", &state.tracking_mode)
            .finish()
    }
}

impl NativeTracking for InMemoryDevice {
    fn create(&self) -> NativeResult {
        self.record("tracking.create")
    }

    fn start(&self) -> NativeResult {
        self.record("tracking.start")
    }

    fn pause(&self) -> NativeResult {
        self.record("tracking.pause")
    }

    fn resume(&self) -> NativeResult {
        self.record("tracking.resume")
    }

    fn recenter(&self) -> NativeResult {
        self.record("tracking.recenter")
    }

    fn destroy(&self) -> NativeResult {
        self.record("tracking.destroy")
    }

    fn init_tracking_mode(&self, mode: TrackingMode) -> NativeResult {
        let result = self.record("tracking.init_mode");
        if result.is_success() {
            self.lock().tracking_mode = mode;
        }
        result
    }

    fn switch_tracking_mode(&self, mode: TrackingMode) -> NativeResult {
        let result = self.record("tracking.switch_mode");
        if result.is_success() {
            self.lock().tracking_mode = mode;
        }
        result
    }
}

impl NativeHeadTracking for InMemoryDevice {
    fn start(&self) -> NativeResult {
        self.record("head_tracking.start")
    }

    fn destroy(&self) -> NativeResult {
        self.record("head_tracking.destroy")
    }

    fn head_pose(&self, _timestamp: u64) -> Result<Pose, NativeResult> {
        self.query("head_tracking.head_pose", |state| state.head_pose)
    }

    fn frame_present_head_pose(&self) -> Result<FramePresentPose, NativeResult> {
        self.query("head_tracking.frame_present_head_pose", |state| {
            FramePresentPose {
                pose: state.head_pose,
                lost_reason: state.lost_reason,
                timestamp: state.hmd_time_nanos,
            }
        })
    }

    fn frame_present_time_by_count(&self, count: i32) -> Result<u64, NativeResult> {
        if count < 0 {
            self.record("head_tracking.frame_present_time");
            return Err(NativeResult::InvalidArgument);
        }
        self.query("head_tracking.frame_present_time", |state| {
            state
                .frame_interval_nanos
                .saturating_mul(count as u64)
                .saturating_add(state.hmd_time_nanos)
        })
    }

    fn hmd_time_nanos(&self) -> u64 {
        let mut state = self.lock();
        state.push_call("head_tracking.hmd_time");
        state.hmd_time_nanos
    }
}

impl NativeDisplay for InMemoryDevice {
    fn create(&self) -> NativeResult {
        self.record("display.create")
    }

    fn start(&self) -> NativeResult {
        self.record("display.start")
    }

    fn pause(&self) -> NativeResult {
        self.record("display.pause")
    }

    fn resume(&self) -> NativeResult {
        self.record("display.resume")
    }

    fn stop(&self) -> NativeResult {
        self.record("display.stop")
    }

    fn destroy(&self) -> NativeResult {
        self.record("display.destroy")
    }

    fn listen_main_screen_resolution_changed(&self, callback: ResolutionCallback) -> NativeResult {
        let result = self.record("display.listen_resolution");
        if result.is_success() {
            self.lock().resolution_listeners.push(callback);
        }
        result
    }
}

impl NativeGlasses for InMemoryDevice {
    fn create(&self) -> NativeResult {
        self.record("glasses.create")
    }

    fn start(&self) -> NativeResult {
        self.record("glasses.start")
    }

    fn pause(&self) -> NativeResult {
        self.record("glasses.pause")
    }

    fn resume(&self) -> NativeResult {
        self.record("glasses.resume")
    }

    fn stop(&self) -> NativeResult {
        self.record("glasses.stop")
    }

    fn destroy(&self) -> NativeResult {
        let result = self.record("glasses.destroy");
        if result.is_success() {
            self.lock().glasses_listeners.clear();
        }
        result
    }

    fn glasses_model(&self) -> Result<GlassesModel, NativeResult> {
        self.query("glasses.model", |state| state.glasses_model)
    }

    fn brightness(&self) -> Result<i32, NativeResult> {
        self.query("glasses.brightness", |state| state.brightness)
    }

    fn set_brightness(&self, brightness: i32) -> NativeResult {
        let result = self.record("glasses.set_brightness");
        if result.is_success() {
            self.lock().brightness = brightness;
        }
        result
    }

    fn eye_resolution(&self, _eye: DisplayEye) -> Result<Resolution, NativeResult> {
        self.query("glasses.eye_resolution", |state| state.eye_resolution)
    }

    fn listen_glasses_events(&self, callback: GlassesEventCallback) -> NativeResult {
        let result = self.record("glasses.listen_events");
        if result.is_success() {
            self.lock().glasses_listeners.push(callback);
        }
        result
    }
}

impl NativeHandTracking for InMemoryDevice {
    fn create(&self) -> Result<NativeHandle, NativeResult> {
        match self.record("hand_tracking.create") {
            NativeResult::Success => {
                let mut state = self.lock();
                let handle = state.next_hand_handle;
                state.next_hand_handle += 1;
                Ok(handle)
            }
            failure => Err(failure),
        }
    }

    fn start(&self, _handle: NativeHandle) -> NativeResult {
        self.record("hand_tracking.start")
    }

    fn stop(&self, _handle: NativeHandle) -> NativeResult {
        self.record("hand_tracking.stop")
    }

    fn pause(&self, _handle: NativeHandle) -> NativeResult {
        self.record("hand_tracking.pause")
    }

    fn resume(&self, _handle: NativeHandle) -> NativeResult {
        self.record("hand_tracking.resume")
    }

    fn destroy(&self, _handle: NativeHandle) -> NativeResult {
        self.record("hand_tracking.destroy")
    }

    fn update(&self, _handle: NativeHandle, states: &mut [HandState]) -> NativeResult {
        let result = self.record("hand_tracking.update");
        if !result.is_success() {
            return result;
        }
        let hand_pose = self.lock().hand_pose;
        for hand in states.iter_mut() {
            hand.reset();
            if let Some(pose) = hand_pose {
                hand.is_tracked = true;
                hand.pointer_pose = pose;
                hand.pointer_pose_valid = true;
            }
        }
        result
    }
}
