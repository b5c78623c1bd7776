//! Plain value types shared by the subsystems and the native layer.
//!
//! Everything here is `Copy` and carries no identity: query results are
//! copied out to the caller and never retained by the core.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `radians` around the vertical axis.
    pub fn from_yaw(radians: f32) -> Self {
        let half = radians * 0.5;
        Self::new(0.0, half.sin(), 0.0, half.cos())
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position and orientation in the tracking space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3,
    pub rotation: Quaternion,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vector3::ZERO,
        rotation: Quaternion::IDENTITY,
    };

    pub const fn new(position: Vector3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    #[default]
    SixDof,
    /// Rotation only.
    ThreeDof,
    ZeroDof,
    ZeroDofStable,
}

/// Why head tracking is (or is not) currently reliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LostTrackingReason {
    PreInitializing,
    #[default]
    None,
    Initializing,
    ExcessiveMotion,
    InsufficientFeatures,
    Relocalizing,
    EnterVrMode,
}

/// Head pose predicted for the frame that is about to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FramePresentPose {
    pub pose: Pose,
    pub lost_reason: LostTrackingReason,
    /// Nanoseconds on the HMD clock.
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayEye {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlassesModel {
    Light,
    Air,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlassesDisconnectReason {
    /// The glasses were unplugged.
    DeviceDisconnected,
    /// The runtime asked the application to quit.
    NotifyToQuitApp,
}

/// Notification pushed by the glasses controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlassesEvent {
    PutOn,
    PutOff,
    Disconnected(GlassesDisconnectReason),
}
