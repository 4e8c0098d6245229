use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandId {
    Left,
    Right,
}

impl HandId {
    /// Slot in a `[left, right]` hand array.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            HandId::Left => 0,
            HandId::Right => 1,
        }
    }

    /// Parse a WebXR `handedness` string. `"none"` and anything unknown yield `None`.
    pub fn from_handedness(handedness: &str) -> Option<Self> {
        match handedness {
            "left" => Some(HandId::Left),
            "right" => Some(HandId::Right),
            other => {
                log::warn!("[input] could not determine handedness from {other:?}");
                None
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Joint {
    Wrist,
    ThumbTip,
    IndexFingerTip,
}

/// Source of tracked hand joints in world space.
///
/// Returning `None` means there is no tracking data for that joint this frame.
pub trait HandTracker {
    fn joint_position(&self, hand: HandId, joint: Joint) -> Option<Vec3>;
}

/// Tracker that never has data; useful for controller-only sessions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTracking;

impl HandTracker for NoTracking {
    fn joint_position(&self, _hand: HandId, _joint: Joint) -> Option<Vec3> {
        None
    }
}

/// Latest joint positions for both hands, written by the host each frame.
#[derive(Clone, Debug, Default)]
pub struct TrackedHands {
    pub index_tips: [Option<Vec3>; 2],
    pub thumb_tips: [Option<Vec3>; 2],
    pub wrists: [Option<Vec3>; 2],
}

impl TrackedHands {
    pub fn set_joint(&mut self, hand: HandId, joint: Joint, position: Option<Vec3>) {
        let slot = match joint {
            Joint::Wrist => &mut self.wrists,
            Joint::ThumbTip => &mut self.thumb_tips,
            Joint::IndexFingerTip => &mut self.index_tips,
        };
        slot[hand.index()] = position;
    }
}

impl HandTracker for TrackedHands {
    fn joint_position(&self, hand: HandId, joint: Joint) -> Option<Vec3> {
        let slot = match joint {
            Joint::Wrist => &self.wrists,
            Joint::ThumbTip => &self.thumb_tips,
            Joint::IndexFingerTip => &self.index_tips,
        };
        slot[hand.index()]
    }
}

/// Select events forwarded from the input system to a trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureEvent {
    Begin(HandId),
    Sustained,
    End(HandId),
}
