//! In-process stand-in for the glasses used during development.
//!
//! The scene holds the simulated objects the emulated providers read from.
//! Objects may only be spawned while the main-thread queue is draining, so
//! creation never races the host's update loop.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dispatch::ensure_main_thread;
use crate::{GlassesError, Pose, Quaternion, Result, Vector3};

pub const EMULATOR_MANAGER: &str = "EmulatorManager";
pub const EMULATOR_HEAD_POSE: &str = "EmulatorHeadPose";

/// Head pose driven by developer input instead of sensors.
#[derive(Clone)]
pub struct SimulatedPoseSource {
    pose: Arc<Mutex<Pose>>,
    origin: Pose,
}

impl SimulatedPoseSource {
    fn new(origin: Pose) -> Self {
        Self {
            pose: Arc::new(Mutex::new(origin)),
            origin,
        }
    }

    pub fn pose(&self) -> Pose {
        *self.lock()
    }

    pub fn set_pose(&self, pose: Pose) {
        *self.lock() = pose;
    }

    pub fn translate(&self, delta: Vector3) {
        let mut pose = self.lock();
        pose.position.x += delta.x;
        pose.position.y += delta.y;
        pose.position.z += delta.z;
    }

    /// Sets the head to look `radians` around the vertical axis.
    pub fn set_yaw(&self, radians: f32) {
        self.lock().rotation = Quaternion::from_yaw(radians);
    }

    /// Returns to the pose the source was spawned with.
    pub fn reset(&self) {
        *self.lock() = self.origin;
    }

    fn lock(&self) -> MutexGuard<'_, Pose> {
        self.pose.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SimulatedPoseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedPoseSource")
            .field("pose", &self.pose())
            .finish()
    }
}

#[derive(Default)]
struct SceneState {
    objects: Vec<&'static str>,
    head_pose: Option<SimulatedPoseSource>,
}

/// Shared simulated scene. Clones refer to the same scene.
#[derive(Clone, Default)]
pub struct EmulatorScene {
    shared: Arc<Mutex<SceneState>>,
}

impl EmulatorScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock()
            .map(|scene| scene.objects.iter().any(|object| *object == name))
            .unwrap_or(false)
    }

    pub fn object_count(&self) -> usize {
        self.lock().map(|scene| scene.objects.len()).unwrap_or(0)
    }

    /// The simulated head, once it has been spawned.
    pub fn head_pose(&self) -> Option<SimulatedPoseSource> {
        self.lock().ok()?.head_pose.clone()
    }

    /// Spawns the emulator manager unless it already exists. Returns whether
    /// this call created it.
    pub fn ensure_manager(&self) -> Result<bool> {
        ensure_main_thread("spawn emulator manager")?;
        let mut scene = self.lock()?;
        if scene.objects.contains(&EMULATOR_MANAGER) {
            return Ok(false);
        }
        scene.objects.push(EMULATOR_MANAGER);
        tracing::debug!(object = EMULATOR_MANAGER, "spawned emulator object");
        Ok(true)
    }

    /// Spawns the simulated head at `origin` unless it already exists, and
    /// returns it either way.
    pub fn ensure_head_pose(&self, origin: Pose) -> Result<SimulatedPoseSource> {
        ensure_main_thread("spawn emulator head pose")?;
        let mut scene = self.lock()?;
        if let Some(existing) = &scene.head_pose {
            return Ok(existing.clone());
        }
        let source = SimulatedPoseSource::new(origin);
        scene.objects.push(EMULATOR_HEAD_POSE);
        scene.head_pose = Some(source.clone());
        tracing::debug!(object = EMULATOR_HEAD_POSE, "spawned emulator object");
        Ok(source)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SceneState>> {
        self.shared
            .lock()
            .map_err(|_| GlassesError::Poisoned("emulator scene"))
    }
}

impl fmt::Debug for EmulatorScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatorScene")
            .field("objects", &self.object_count())
            .finish()
    }
}
