//! Headless host: runs the rain field and one dwell button against a
//! synthetic room for a fixed number of frames and logs what happened.
//!
//! Set `RUST_LOG=debug` to see every trigger transition.

mod scene;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use glam::Vec3;
use instant::Instant;
use xr_core::{
    AffordanceEvent, DwellConfig, DwellEvent, DwellRegistry, DwellTrigger, GestureEvent, HandId,
    HandTracker, Joint, ParticleConfig, ParticleField, ParticleInstance, ParticleUniforms,
    TrackedHands, XrCamera,
};

use scene::Select;

const FRAME_RATE_HZ: u32 = 72;
const RUN_SECONDS: f32 = 11.0;
const WARMUP_FRAMES: u32 = 5;
const DEPTH_SIZE: (u32, u32) = (160, 120);
const SEED: u64 = 0x5EED_2A1B;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let eye = Vec3::new(0.0, 1.6, 0.0);
    let target = Vec3::new(0.0, 1.1, -2.0);
    let camera = XrCamera::look_at(eye, target, Vec3::Y)
        .with_projection(90f32.to_radians(), 1.0, 0.05, 50.0);
    let room = scene::room_depth(&camera, DEPTH_SIZE.0, DEPTH_SIZE.1)?;
    let warmup = scene::warmup_depth(DEPTH_SIZE.0, DEPTH_SIZE.1)?;
    log::info!(
        "depth frame {}x{}, nearest surface {:.2} m",
        room.width(),
        room.height(),
        xr_core::DepthSource::min_depth(&room)
    );

    let mut rain = ParticleField::new(ParticleConfig::default(), SEED)?;
    let fired = Rc::new(Cell::new(0u32));
    let mut registry = DwellRegistry::new();
    let button = {
        let fired = fired.clone();
        registry.insert(DwellTrigger::new(DwellConfig::default(), move || {
            fired.set(fired.get() + 1);
        })?)
    };

    let script = scene::gesture_script();
    let mut next_event = 0;
    let mut held: Vec<HandId> = Vec::new();
    let mut hands = TrackedHands::default();
    let mut events: Vec<AffordanceEvent> = Vec::new();
    let mut instances: Vec<ParticleInstance> = Vec::new();
    let mut landed_total = 0usize;
    let mut depth_respawns = 0usize;

    let frame_dt = Duration::from_secs_f64(1.0 / FRAME_RATE_HZ as f64);
    let frames = (RUN_SECONDS * FRAME_RATE_HZ as f32) as u32;
    let start = Instant::now();

    for frame in 0..frames {
        let now = start + frame_dt * frame;
        let seconds = frame as f32 / FRAME_RATE_HZ as f32;

        for hand in [HandId::Left, HandId::Right] {
            for (joint, position) in scene::hand_pose(hand, seconds) {
                hands.set_joint(hand, joint, Some(position));
            }
        }

        while let Some(&(at, select, handedness)) = script.get(next_event) {
            if at > seconds {
                break;
            }
            next_event += 1;
            let Some(hand) = HandId::from_handedness(handedness) else {
                continue;
            };
            let event = match select {
                Select::Start => {
                    held.push(hand);
                    GestureEvent::Begin(hand)
                }
                Select::End => {
                    held.retain(|h| *h != hand);
                    GestureEvent::End(hand)
                }
            };
            registry.dispatch(button, event, now, &hands, &mut events);
        }
        if !held.is_empty() {
            registry.dispatch(button, GestureEvent::Sustained, now, &hands, &mut events);
        }
        registry.update_all(now, &hands, &mut events);

        for ev in events.drain(..) {
            match ev.event {
                DwellEvent::Triggered => {
                    log::info!("[{seconds:5.2}s] affordance {} triggered", ev.affordance.0);
                }
                DwellEvent::Cue(cue) => log::debug!("[{seconds:5.2}s] play {cue:?}"),
                DwellEvent::IndicatorCreated(ind) => {
                    let pinch = hands
                        .joint_position(ind.hand, Joint::ThumbTip)
                        .map_or(0.0, |thumb| thumb.distance(ind.anchor));
                    let wrist = hands.joint_position(ind.hand, Joint::Wrist);
                    let due = registry
                        .get(ev.affordance)
                        .and_then(|t| t.fires_at())
                        .map_or(0.0, |at| at.duration_since(start).as_secs_f32());
                    log::debug!(
                        "[{seconds:5.2}s] indicator for {:?}, pinch {pinch:.3} m, due {due:.2}s",
                        ind.hand
                    );
                    log::trace!("[{seconds:5.2}s] wrist at {wrist:?}");
                }
                DwellEvent::IndicatorRemoved => log::debug!("[{seconds:5.2}s] indicator removed"),
                DwellEvent::IndicatorUpdated(_) => {}
            }
        }

        let depth = if frame < WARMUP_FRAMES { &warmup } else { &room };
        let stats = rain.update(&camera, depth);
        landed_total += stats.respawned;
        depth_respawns += stats.depth_respawns;

        rain.write_instances(&mut instances);
        let uniforms = ParticleUniforms::from_camera(&camera);
        let upload: &[u8] = bytemuck::cast_slice(&instances);
        let uniform_bytes = bytemuck::bytes_of(&uniforms);

        if frame % FRAME_RATE_HZ == 0 {
            log::info!(
                "[{seconds:5.2}s] rain falling={} landing={} visible={} depth_ok={} ({}+{} B)",
                stats.falling,
                stats.landing,
                stats.visible,
                stats.depth_frame_valid,
                upload.len(),
                uniform_bytes.len()
            );
        }
    }

    log::info!(
        "done: {} frames, {} triggers, {} drops respawned ({} onto surfaces)",
        frames,
        fired.get(),
        landed_total,
        depth_respawns
    );
    Ok(())
}
