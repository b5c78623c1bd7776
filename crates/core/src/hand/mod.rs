//! Hand tracking data and the service that pulls it from the glasses.

mod service;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Pose;

pub use service::{HandStatesService, NativeHandStatesService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandEnum {
    RightHand,
    LeftHand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HandGesture {
    #[default]
    None,
    OpenHand,
    Point,
    Grab,
    Victory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandJointId {
    Wrist,
    Palm,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexProximal,
    IndexMiddle,
    IndexDistal,
    IndexTip,
    MiddleProximal,
    MiddleMiddle,
    MiddleDistal,
    MiddleTip,
    RingProximal,
    RingMiddle,
    RingDistal,
    RingTip,
    PinkyMetacarpal,
    PinkyProximal,
    PinkyMiddle,
    PinkyDistal,
    PinkyTip,
}

/// Snapshot of one hand, refreshed in place by [`HandStatesService::update_states`].
#[derive(Debug, Clone, PartialEq)]
pub struct HandState {
    pub hand: HandEnum,
    pub is_tracked: bool,
    pub pointer_pose: Pose,
    pub pointer_pose_valid: bool,
    pub is_pinching: bool,
    pub pinch_strength: f32,
    pub current_gesture: HandGesture,
    pub joints: HashMap<HandJointId, Pose>,
}

impl HandState {
    pub fn new(hand: HandEnum) -> Self {
        Self {
            hand,
            is_tracked: false,
            pointer_pose: Pose::IDENTITY,
            pointer_pose_valid: false,
            is_pinching: false,
            pinch_strength: 0.0,
            current_gesture: HandGesture::None,
            joints: HashMap::new(),
        }
    }

    /// Back to the untracked state; the hand side is kept.
    pub fn reset(&mut self) {
        *self = Self::new(self.hand);
    }

    /// Pose of `joint`, or identity when the joint was not reported.
    pub fn joint_pose(&self, joint: HandJointId) -> Pose {
        self.joints.get(&joint).copied().unwrap_or(Pose::IDENTITY)
    }
}
