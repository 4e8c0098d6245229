//! Synthetic room and gesture track for the headless run.

use glam::{Vec2, Vec3};
use xr_core::{DepthBuffer, DepthError, HandId, Joint, XrCamera};

// Room geometry (meters)
const FLOOR_Y: f32 = 0.0;
const WALL_Z: f32 = -3.0;
const TABLE_TOP_Y: f32 = 0.75;
const TABLE_HALF_EXTENT: f32 = 0.5;
const TABLE_CENTER: [f32; 2] = [0.0, -1.2]; // x, z

/// Render the room (floor, back wall, a table) into a depth image as seen from `camera`.
pub fn room_depth(camera: &XrCamera, width: u32, height: u32) -> Result<DepthBuffer, DepthError> {
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height {
        // Row 0 is the top edge.
        let v = 1.0 - (row as f32 + 0.5) / height as f32;
        for col in 0..width {
            let u = (col as f32 + 0.5) / width as f32;
            let ndc = Vec2::new(u * 2.0 - 1.0, v * 2.0 - 1.0);
            let (origin, dir) = camera.ray_from_ndc(ndc);
            let depth = nearest_hit(origin, dir)
                .map(|p| camera.distance_to_view_plane(p))
                .unwrap_or(0.0);
            data.push(depth);
        }
    }
    DepthBuffer::from_meters(width, height, data)
}

/// A frame from a sensor that is still warming up: everything reads as 5 cm.
pub fn warmup_depth(width: u32, height: u32) -> Result<DepthBuffer, DepthError> {
    DepthBuffer::filled(width, height, 0.05)
}

fn nearest_hit(origin: Vec3, dir: Vec3) -> Option<Vec3> {
    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if t > 0.0 && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    };
    if dir.y.abs() > f32::EPSILON {
        consider((FLOOR_Y - origin.y) / dir.y);
        let t = (TABLE_TOP_Y - origin.y) / dir.y;
        let p = origin + dir * t;
        if (p.x - TABLE_CENTER[0]).abs() <= TABLE_HALF_EXTENT
            && (p.z - TABLE_CENTER[1]).abs() <= TABLE_HALF_EXTENT
        {
            consider(t);
        }
    }
    if dir.z.abs() > f32::EPSILON {
        consider((WALL_Z - origin.z) / dir.z);
    }
    best.map(|t| origin + dir * t)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Select {
    Start,
    End,
}

/// Select events as the runtime reports them: `(seconds, kind, handedness)`,
/// sorted by time.
pub fn gesture_script() -> Vec<(f32, Select, &'static str)> {
    vec![
        // Full hold: fires once.
        (0.50, Select::Start, "right"),
        (2.00, Select::End, "right"),
        // Second hold inside the cooldown: ignored.
        (2.50, Select::Start, "right"),
        (4.00, Select::End, "right"),
        // A gamepad without handedness.
        (5.00, Select::Start, "none"),
        // Early release.
        (6.80, Select::Start, "left"),
        (7.20, Select::End, "left"),
        // Released inside the confirm window: aborted.
        (7.50, Select::Start, "left"),
        (8.53, Select::End, "left"),
        // Cooldown over: fires again.
        (8.80, Select::Start, "right"),
        (10.20, Select::End, "right"),
    ]
}

/// Tracked joints of a pinching hand.
pub fn hand_pose(hand: HandId, seconds: f32) -> [(Joint, Vec3); 3] {
    let tip = index_tip(hand, seconds);
    let side = tip.x.signum();
    [
        (Joint::IndexFingerTip, tip),
        (Joint::ThumbTip, tip + Vec3::new(-0.015 * side, -0.02, 0.01)),
        (Joint::Wrist, tip + Vec3::new(0.03 * side, -0.09, 0.12)),
    ]
}

/// Index finger tip drifting slowly in front of the viewer.
fn index_tip(hand: HandId, seconds: f32) -> Vec3 {
    let side = match hand {
        HandId::Left => -0.2,
        HandId::Right => 0.2,
    };
    Vec3::new(
        side + 0.01 * (seconds * 1.3).sin(),
        1.3 + 0.01 * (seconds * 0.7).cos(),
        -0.4,
    )
}
