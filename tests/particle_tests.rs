// Rain particle lifecycle: falling, occlusion landing, floor hits and respawn placement.

use glam::{Vec2, Vec3};
use xr_core::*;

struct ConstDepth {
    depth: f32,
    min: f32,
}

impl ConstDepth {
    fn new(depth: f32) -> Self {
        Self { depth, min: depth }
    }
}

impl DepthSource for ConstDepth {
    fn depth_at(&self, _u: f32, _v: f32) -> f32 {
        self.depth
    }

    fn min_depth(&self) -> f32 {
        self.min
    }
}

fn camera() -> XrCamera {
    XrCamera {
        position: Vec3::new(0.0, 1.0, 0.0),
        ..XrCamera::default()
    }
}

fn single(config: ParticleConfig) -> ParticleField {
    ParticleField::new(
        ParticleConfig {
            count: 1,
            ..config
        },
        7,
    )
    .unwrap()
}

fn place(field: &mut ParticleField, position: Vec3) {
    let p = field.particle_mut(0).unwrap();
    p.position = position;
    p.fall_speed = 0.2;
    p.age_weight = 0.0;
    p.visibility = 1.0;
    p.max_visibility = 1.0;
}

#[test]
fn new_field_starts_falling_inside_the_spawn_box() {
    let field = ParticleField::new(ParticleConfig::default(), 1).unwrap();
    assert_eq!(field.len(), 200);
    for p in field.particles() {
        assert_eq!(p.phase(), ParticlePhase::Falling);
        assert_eq!(p.visibility, 1.0);
        assert!(p.position.x >= -4.0 && p.position.x <= 4.0);
        assert!(p.position.y >= 0.0 && p.position.y <= 8.0);
        assert!(p.position.z >= -4.0 && p.position.z <= 4.0);
        assert!(p.fall_speed >= 0.2 && p.fall_speed <= 0.25);
    }
}

#[test]
fn falling_drop_moves_down_by_its_speed() {
    let mut field = single(ParticleConfig::default());
    place(&mut field, Vec3::new(0.0, 1.5, -2.0));
    field.update(&camera(), &ConstDepth::new(10.0));
    let p = field.particles()[0];
    assert!((p.position.y - 1.3).abs() < 1e-5);
    assert_eq!(p.phase(), ParticlePhase::Falling);
    assert_eq!(p.visibility, 1.0);
}

#[test]
fn drop_below_floor_is_clamped_and_lands() {
    let mut field = single(ParticleConfig::default());
    place(&mut field, Vec3::new(0.0, -0.01, -2.0));
    field.update(&camera(), &ConstDepth::new(10.0));
    let p = field.particles()[0];
    assert_eq!(p.position.y, 0.0);
    assert_eq!(p.phase(), ParticlePhase::Landing);
}

#[test]
fn occluded_drop_lands_and_fades_with_depth_gap() {
    let mut field = single(ParticleConfig::default());
    place(&mut field, Vec3::new(0.0, 1.0, -2.0));
    // Surface 1.8 m away, drop 2 m away.
    field.update(&camera(), &ConstDepth::new(1.8));
    let p = field.particles()[0];
    assert_eq!(p.phase(), ParticlePhase::Landing);
    assert!((p.visibility - 0.4).abs() < 1e-3);

    // Landed drops stop moving.
    let y = p.position.y;
    field.update(&camera(), &ConstDepth::new(1.8));
    assert_eq!(field.particles()[0].position.y, y);
}

#[test]
fn high_drops_ignore_occlusion() {
    let mut field = single(ParticleConfig::default());
    place(&mut field, Vec3::new(0.0, 3.0, -2.0));
    field.update(&camera(), &ConstDepth::new(1.0));
    let p = field.particles()[0];
    assert_eq!(p.phase(), ParticlePhase::Falling);
    assert_eq!(p.visibility, 1.0);
}

#[test]
fn drops_outside_the_window_are_invisible() {
    let mut field = single(ParticleConfig::default());
    place(&mut field, Vec3::new(0.0, 1.0, 2.0));
    field.update(&camera(), &ConstDepth::new(10.0));
    assert_eq!(field.particles()[0].visibility, 0.0);
}

#[test]
fn invalid_depth_frame_hides_everything() {
    let mut field = ParticleField::new(ParticleConfig::default(), 3).unwrap();
    let stats = field.update(&camera(), &ConstDepth::new(0.05));
    assert!(!stats.depth_frame_valid);
    assert_eq!(stats.visible, 0);
    assert!(field.particles().iter().all(|p| p.visibility == 0.0));
}

#[test]
fn age_and_visibility_stay_in_bounds() {
    let mut field = ParticleField::new(ParticleConfig::default(), 11).unwrap();
    let cam = camera();
    let depth = ConstDepth::new(1.5);
    let max_age = field.config().max_age_weight();
    let mut respawned = 0;
    for _ in 0..600 {
        let stats = field.update(&cam, &depth);
        respawned += stats.respawned;
        assert_eq!(stats.falling + stats.landing, field.len());
        for p in field.particles() {
            assert!(p.age_weight >= 0.0 && p.age_weight <= max_age);
            assert!((0.0..=1.0).contains(&p.visibility));
        }
    }
    assert!(respawned > 0);
    assert_eq!(field.frames(), 600);
}

#[test]
fn landing_animation_runs_for_max_frames_then_respawns() {
    let config = ParticleConfig {
        depth_respawn_probability: 0.0,
        ..ParticleConfig::default()
    };
    let mut field = single(config);
    place(&mut field, Vec3::new(0.0, -0.01, -2.0));
    let depth = ConstDepth::new(10.0);
    let mut frames = 0;
    loop {
        let stats = field.update(&camera(), &depth);
        frames += 1;
        if stats.respawned > 0 {
            break;
        }
        assert!(frames < 100, "never respawned");
    }
    // Lands at weight 2 and respawns once the weight passes 30.
    assert_eq!(frames, 30);
    let p = field.particles()[0];
    assert_eq!(p.phase(), ParticlePhase::Falling);
    assert_eq!(p.position.y, 4.0);
    let r = Vec2::new(p.position.x, p.position.z).length();
    assert!((0.2..=4.2 + 1e-4).contains(&r), "ring radius {r}");
}

#[test]
fn depth_respawn_places_drop_on_the_surface() {
    let config = ParticleConfig {
        depth_respawn_probability: 1.0,
        ..ParticleConfig::default()
    };
    let mut field = single(config);
    place(&mut field, Vec3::new(0.0, 0.5, -1.0));
    field.particle_mut(0).unwrap().age_weight = 30.0;

    let cam = XrCamera {
        position: Vec3::ZERO,
        ..XrCamera::default()
    };
    let stats = field.update(&cam, &ConstDepth::new(2.0));
    assert_eq!(stats.respawned, 1);
    assert_eq!(stats.depth_respawns, 1);
    let p = field.particles()[0];
    assert_eq!(p.age_weight, 1.0);
    assert!((cam.distance_to_view_plane(p.position) - 2.0).abs() < 1e-3);
}

#[test]
fn ring_respawn_when_depth_has_no_hit() {
    let config = ParticleConfig {
        depth_respawn_probability: 1.0,
        ..ParticleConfig::default()
    };
    let mut field = single(config);
    place(&mut field, Vec3::new(0.0, 0.5, -1.0));
    field.particle_mut(0).unwrap().age_weight = 30.0;
    let stats = field.update(&camera(), &ConstDepth { depth: 0.0, min: 1.0 });
    assert_eq!(stats.respawned, 1);
    assert_eq!(stats.depth_respawns, 0);
    assert_eq!(field.particles()[0].position.y, 4.0);
    assert_eq!(field.particles()[0].age_weight, 0.0);
}

#[test]
fn landing_visibility_hides_near_and_dims_far() {
    let config = ParticleConfig::default();
    assert_eq!(config.landing_visibility(0.0), 0.0);
    assert_eq!(config.landing_visibility(0.2), 0.0);
    assert_eq!(config.landing_visibility(1.0), 1.0);
    assert_eq!(config.landing_visibility(2.0), 1.0);
    assert!((config.landing_visibility(3.0) - 0.75).abs() < 1e-6);
    assert_eq!(config.landing_visibility(10.0), 0.0);
}

#[test]
fn same_seed_same_rain() {
    let cam = camera();
    let depth = ConstDepth::new(1.5);
    let mut a = ParticleField::new(ParticleConfig::default(), 99).unwrap();
    let mut b = ParticleField::new(ParticleConfig::default(), 99).unwrap();
    for _ in 0..120 {
        a.update(&cam, &depth);
        b.update(&cam, &depth);
    }
    assert_eq!(a.particles(), b.particles());
}

#[test]
fn instance_records_match_particles() {
    let field = ParticleField::new(ParticleConfig::default(), 5).unwrap();
    let mut instances = Vec::new();
    field.write_instances(&mut instances);
    assert_eq!(instances.len(), field.len());
    assert_eq!(std::mem::size_of::<ParticleInstance>(), 32);
    assert_eq!(std::mem::size_of::<ParticleUniforms>(), 80);
    let bytes: &[u8] = bytemuck::cast_slice(&instances);
    assert_eq!(bytes.len(), field.len() * 32);
    let first = field.particles()[0];
    assert_eq!(instances[0].position, first.position.to_array());
    assert_eq!(instances[0].visibility, first.visibility);

    let uniforms = ParticleUniforms::from_camera(&camera());
    assert_eq!(uniforms.camera_position, [0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn sprite_frames_walk_the_atlas() {
    let field = ParticleField::new(ParticleConfig::default(), 5).unwrap();
    let f0 = field.sprite_frame(0.0);
    assert_eq!(f0.index, 0);
    assert_eq!(f0.uv_offset, Vec2::new(0.0, 0.75));
    assert_eq!(f0.uv_scale, 0.25);

    let f5 = field.sprite_frame(10.0);
    assert_eq!(f5.index, 5);
    assert_eq!(f5.uv_offset, Vec2::new(0.25, 0.5));

    assert_eq!(field.sprite_frame(1000.0).index, 15);
}

#[test]
fn invalid_particle_configs_are_rejected() {
    let empty = ParticleConfig {
        count: 0,
        ..ParticleConfig::default()
    };
    assert!(matches!(
        ParticleField::new(empty, 0),
        Err(ConfigError::Empty { name: "count" })
    ));

    let odds = ParticleConfig {
        depth_respawn_probability: 1.5,
        ..ParticleConfig::default()
    };
    assert!(ParticleField::new(odds, 0).is_err());

    let mut rings = ParticleConfig::default();
    rings.rings[1].below = 0.2;
    assert!(ParticleField::new(rings, 0).is_err());

    // Rounds to exactly 1.0 in single precision.
    let barely_over = ParticleConfig {
        depth_respawn_probability: 1.0 + 1e-9,
        ..ParticleConfig::default()
    };
    assert!(matches!(
        ParticleField::new(barely_over, 0),
        Err(ConfigError::OutOfRange {
            name: "depth_respawn_probability",
            ..
        })
    ));

    let mut last_ring = ParticleConfig::default();
    last_ring.rings[2].below = 1.0 + 1e-9;
    assert!(ParticleField::new(last_ring, 0).is_err());
}
