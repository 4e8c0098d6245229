//! Depth-aware rain.
//!
//! A fixed pool of drops falls at per-drop speeds. Each frame every drop is
//! tested against the depth frame: a drop that slips behind a sensed surface
//! (or reaches the floor) stops and plays a short splash animation, counted
//! in frames by its age weight, then respawns. Most respawns land on random
//! rings above the viewer; a few are raycast straight onto the sensed surface
//! and skip the fall.

use crate::camera::XrCamera;
use crate::constants::*;
use crate::depth::DepthSource;
use crate::error::{check_range, ConfigError};
use crate::occlusion::{OcclusionResult, OcclusionSampler};
use glam::{Vec2, Vec3};
use rand::prelude::*;
use std::f32::consts::TAU;

/// One respawn ring: picked when the band roll is below `below`,
/// radius is `sqrt(v) * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingBand {
    pub below: f64,
    pub scale: f32,
    pub offset: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParticleConfig {
    pub count: usize,
    pub range: f32,
    pub spawn_height: f32,
    pub fall_speed_min: f32,
    pub fall_speed_jitter: f32,
    pub max_animation_frames: f32,
    pub animation_speed: f32,
    pub high_altitude_y: f32,
    pub near_hide_depth: f32,
    pub far_dim_depth: f32,
    pub occluded_visibility_max: f32,
    pub depth_respawn_probability: f64,
    pub depth_respawn_uv_margin: f32,
    pub rings: [RingBand; 3],
    pub sampler: OcclusionSampler,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: PARTICLE_COUNT,
            range: PARTICLE_RANGE,
            spawn_height: PARTICLE_SPAWN_HEIGHT,
            fall_speed_min: PARTICLE_FALL_SPEED_MIN,
            fall_speed_jitter: PARTICLE_FALL_SPEED_JITTER,
            max_animation_frames: MAX_ANIMATION_FRAMES,
            animation_speed: ANIMATION_SPEED,
            high_altitude_y: HIGH_ALTITUDE_Y,
            near_hide_depth: NEAR_HIDE_DEPTH_M,
            far_dim_depth: FAR_DIM_DEPTH_M,
            occluded_visibility_max: OCCLUDED_VISIBILITY_MAX,
            depth_respawn_probability: DEPTH_RESPAWN_PROBABILITY,
            depth_respawn_uv_margin: DEPTH_RESPAWN_UV_MARGIN,
            // Half the drops land close to the viewer, a fifth a bit further out.
            rings: [
                RingBand {
                    below: 0.5,
                    scale: 0.7,
                    offset: 0.3,
                },
                RingBand {
                    below: 0.7,
                    scale: 1.5,
                    offset: 0.3,
                },
                RingBand {
                    below: 1.0,
                    scale: PARTICLE_RANGE,
                    offset: 0.2,
                },
            ],
            sampler: OcclusionSampler::default(),
        }
    }
}

impl ParticleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::Empty { name: "count" });
        }
        check_range("range", self.range, 0.0, f32::MAX)?;
        check_range("fall_speed_min", self.fall_speed_min, 0.0, f32::MAX)?;
        check_range("fall_speed_jitter", self.fall_speed_jitter, 0.0, f32::MAX)?;
        check_range(
            "max_animation_frames",
            self.max_animation_frames,
            1.0,
            f32::MAX,
        )?;
        check_range(
            "animation_speed",
            self.animation_speed,
            f32::MIN_POSITIVE,
            f32::MAX,
        )?;
        check_range(
            "occluded_visibility_max",
            self.occluded_visibility_max,
            0.0,
            1.0,
        )?;
        // Checked at full precision; `gen_bool` rejects anything above 1.
        check_range(
            "depth_respawn_probability",
            self.depth_respawn_probability,
            0.0,
            1.0,
        )?;
        check_range(
            "depth_respawn_uv_margin",
            self.depth_respawn_uv_margin,
            0.0,
            0.49,
        )?;
        let mut prev = 0.0;
        for ring in &self.rings {
            check_range("rings.below", ring.below, prev, 1.0)?;
            check_range("rings.scale", ring.scale, 0.0, f32::MAX)?;
            check_range("rings.offset", ring.offset, 0.0, f32::MAX)?;
            prev = ring.below;
        }
        self.sampler.fov.validate()
    }

    /// Age weight at which a landed drop respawns.
    pub fn max_age_weight(&self) -> f32 {
        self.max_animation_frames * self.animation_speed
    }

    /// Peak visibility for a drop landing on a surface `depth` meters away:
    /// hidden right in front of the viewer, dimmed with distance.
    pub fn landing_visibility(&self, depth: f32) -> f32 {
        if depth < self.near_hide_depth {
            0.0
        } else if depth > self.far_dim_depth {
            let span = 2.0 * self.far_dim_depth;
            (0.5 + (span - depth) / span).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticlePhase {
    Falling,
    Landing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    /// Meters per frame.
    pub fall_speed: f32,
    /// 0 while falling; counts frames of the landing animation.
    pub age_weight: f32,
    pub visibility: f32,
    pub max_visibility: f32,
}

impl Particle {
    pub fn phase(&self) -> ParticlePhase {
        if self.age_weight > 0.0 {
            ParticlePhase::Landing
        } else {
            ParticlePhase::Falling
        }
    }
}

/// Per-instance record for the renderer's instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub weight: f32,
    pub visibility: f32,
    pub _pad: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleUniforms {
    pub camera_position: [f32; 4],
    pub inverse_pitch_roll: [[f32; 4]; 4],
}

impl ParticleUniforms {
    pub fn from_camera(camera: &XrCamera) -> Self {
        Self {
            camera_position: camera.position.extend(1.0).to_array(),
            inverse_pitch_roll: camera.pitch_roll_inverse().to_cols_array_2d(),
        }
    }
}

/// Cell of the splash sprite atlas to show for an age weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteFrame {
    pub index: u32,
    pub uv_offset: Vec2,
    pub uv_scale: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParticleStats {
    pub falling: usize,
    pub landing: usize,
    pub visible: usize,
    pub respawned: usize,
    pub depth_respawns: usize,
    pub depth_frame_valid: bool,
}

#[derive(Clone, Debug)]
pub struct ParticleField {
    config: ParticleConfig,
    particles: Vec<Particle>,
    rng: StdRng,
    frame: u64,
}

impl ParticleField {
    pub fn new(config: ParticleConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let particles = (0..config.count)
            .map(|_| initial_particle(&config, &mut rng))
            .collect();
        Ok(Self {
            config,
            particles,
            rng,
            frame: 0,
        })
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle_mut(&mut self, index: usize) -> Option<&mut Particle> {
        self.particles.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    /// Advance every drop by one frame.
    pub fn update(&mut self, camera: &XrCamera, depth: &dyn DepthSource) -> ParticleStats {
        let Self {
            config,
            particles,
            rng,
            frame,
        } = self;
        *frame += 1;
        let mut stats = ParticleStats {
            depth_frame_valid: config.sampler.depth_frame_is_valid(depth),
            ..ParticleStats::default()
        };
        for p in particles.iter_mut() {
            let hit = step(p, config, camera, depth, stats.depth_frame_valid);
            if p.age_weight > config.max_age_weight() {
                stats.respawned += 1;
                if respawn(p, config, rng, camera, depth) {
                    stats.depth_respawns += 1;
                }
            }
            match p.phase() {
                ParticlePhase::Falling => stats.falling += 1,
                ParticlePhase::Landing => stats.landing += 1,
            }
            if p.visibility > 0.0 {
                stats.visible += 1;
            }
            log::trace!(
                "[rain] y={:.2} w={} v={:.2} occluded={}",
                p.position.y,
                p.age_weight,
                p.visibility,
                hit.is_occluded
            );
        }
        if !stats.depth_frame_valid {
            log::debug!("[rain] depth frame rejected ({:.3} m)", depth.min_depth());
        }
        stats
    }

    pub fn write_instances(&self, out: &mut Vec<ParticleInstance>) {
        out.clear();
        out.extend(self.particles.iter().map(|p| ParticleInstance {
            position: p.position.to_array(),
            weight: p.age_weight,
            visibility: p.visibility,
            _pad: [0.0; 3],
        }));
    }

    pub fn sprite_frame(&self, weight: f32) -> SpriteFrame {
        let cells = SPRITE_ATLAS_CELLS;
        let last = cells * cells - 1;
        let index = ((weight.max(0.0) / self.config.animation_speed).floor() as u32).min(last);
        let col = index % cells;
        let row = index / cells;
        let uv_scale = 1.0 / cells as f32;
        SpriteFrame {
            index,
            uv_offset: Vec2::new(col as f32, (cells - 1 - row) as f32) * uv_scale,
            uv_scale,
        }
    }
}

fn initial_particle(config: &ParticleConfig, rng: &mut StdRng) -> Particle {
    let r = config.range;
    Particle {
        position: Vec3::new(
            rng.gen::<f32>() * r * 2.0 - r,
            rng.gen::<f32>() * r * 2.0,
            rng.gen::<f32>() * r * 2.0 - r,
        ),
        fall_speed: rng.gen::<f32>() * config.fall_speed_jitter + config.fall_speed_min,
        age_weight: 0.0,
        visibility: 1.0,
        max_visibility: 1.0,
    }
}

fn step(
    p: &mut Particle,
    config: &ParticleConfig,
    camera: &XrCamera,
    depth: &dyn DepthSource,
    depth_frame_valid: bool,
) -> OcclusionResult {
    if p.phase() == ParticlePhase::Falling {
        p.position.y -= p.fall_speed;
    }

    let hit = config.sampler.sample(p.position, camera, depth);
    let is_high = p.position.y > config.high_altitude_y;
    let occluded = hit.is_within_fov && hit.is_occluded && !is_high;

    if occluded && p.phase() == ParticlePhase::Falling && p.visibility > 0.5 {
        p.age_weight = 1.0;
        p.max_visibility = config.landing_visibility(hit.measured_depth);
    }

    p.visibility = if !hit.is_within_fov {
        0.0
    } else if occluded {
        let max = config.occluded_visibility_max;
        (max - hit.delta_depth).clamp(0.0, max)
    } else {
        p.max_visibility
    };

    if p.position.y < 0.0 {
        p.position.y = 0.0;
        if p.phase() == ParticlePhase::Falling {
            p.age_weight = 1.0;
        }
        p.visibility = if hit.is_within_fov && !occluded {
            p.max_visibility
        } else {
            0.0
        };
    }

    if p.age_weight > 0.0 {
        p.age_weight += 1.0;
    }

    if !depth_frame_valid {
        p.visibility = 0.0;
    }
    hit
}

/// Returns true when the drop was placed on the sensed surface.
fn respawn(
    p: &mut Particle,
    config: &ParticleConfig,
    rng: &mut StdRng,
    camera: &XrCamera,
    depth: &dyn DepthSource,
) -> bool {
    let mut u: f32 = rng.gen();
    let mut v: f32 = rng.gen();
    let band: f64 = rng.gen();
    p.max_visibility = 1.0;

    if rng.gen_bool(config.depth_respawn_probability) {
        let m = config.depth_respawn_uv_margin;
        u = u * (1.0 - 2.0 * m) + m;
        v = v * (1.0 - 2.0 * m) + m;
        let ndc = Vec2::new(u * 2.0 - 1.0, v * 2.0 - 1.0);
        if let Some(point) = depth.raycast(camera, ndc) {
            p.position = point;
            p.age_weight = 1.0;
            return true;
        }
    }

    let [.., last] = &config.rings;
    let ring = config.rings.iter().find(|r| band < r.below).unwrap_or(last);
    let theta = u * TAU;
    let radius = v.sqrt() * ring.scale + ring.offset;
    p.position = Vec3::new(
        radius * theta.cos(),
        config.spawn_height,
        radius * theta.sin(),
    );
    p.age_weight = 0.0;
    false
}
