// Shared tuning constants for dwell triggers, occlusion tests and rain particles.

// Dwell trigger timing (milliseconds)
pub const DWELL_DURATION_MS: u64 = 1000; // hold time before a trigger is confirmed
pub const DWELL_COOLDOWN_MS: u64 = 5000; // refractory period after a trigger fires
pub const DWELL_PULSE_MS: u64 = 400; // post-trigger pulse animation length
pub const DWELL_CONFIRM_DELAY_MS: u64 = 75; // window for the tactile/audio cue before firing
pub const DWELL_MAX_DURATION_SECS: u64 = 86_400; // upper bound for any configured dwell timing

// Dwell indicator look
pub const INDICATOR_COLOR: u32 = 0x4970ff;
pub const INDICATOR_RADIUS: f32 = 0.028; // meters
pub const INDICATOR_OUTER_OPACITY: f32 = 0.3;
pub const INDICATOR_INNER_OPACITY: f32 = 0.6;
pub const INDICATOR_INNER_MIN_SCALE: f32 = 0.01; // inner sphere size right after creation
pub const PULSE_SCALE_GAIN: f32 = 0.2; // inner sphere grows to 1 + gain during the pulse
pub const PULSE_OUTER_OPACITY: f32 = 0.2;
pub const PULSE_INNER_OPACITY: f32 = 0.5;

// Occlusion field-of-view window in NDC, narrowed to avoid near-edge artifacts
pub const FOV_X_MIN: f32 = -0.8;
pub const FOV_X_MAX: f32 = 0.6;
pub const FOV_Y_MIN: f32 = -1.0;
pub const FOV_Y_MAX: f32 = 1.0;
pub const FOV_Z_MIN: f32 = 0.0;
pub const FOV_Z_MAX: f32 = 1.0;

// A depth frame whose nearest sample is closer than this is treated as invalid
pub const MIN_DEPTH_GUARD_M: f32 = 0.1;

// Rain particles
pub const PARTICLE_COUNT: usize = 200;
pub const PARTICLE_RANGE: f32 = 4.0; // half-extent of the initial spawn box
pub const PARTICLE_SPAWN_HEIGHT: f32 = 4.0;
pub const PARTICLE_FALL_SPEED_MIN: f32 = 0.2; // meters per frame
pub const PARTICLE_FALL_SPEED_JITTER: f32 = 0.05;
pub const MAX_ANIMATION_FRAMES: f32 = 15.0;
pub const ANIMATION_SPEED: f32 = 2.0;
pub const HIGH_ALTITUDE_Y: f32 = 2.0; // occlusion never lands particles above this
pub const NEAR_HIDE_DEPTH_M: f32 = 0.3; // landing this close to the viewer is hidden
pub const FAR_DIM_DEPTH_M: f32 = 2.0; // landing beyond this is dimmed
pub const OCCLUDED_VISIBILITY_MAX: f32 = 0.6;
pub const DEPTH_RESPAWN_PROBABILITY: f64 = 0.1;
pub const DEPTH_RESPAWN_UV_MARGIN: f32 = 0.1;

// Sprite atlas used by the rain shader (cells per side)
pub const SPRITE_ATLAS_CELLS: u32 = 4;
