//! Long-press ("dwell") trigger.
//!
//! A sustained select gesture grows an indicator sphere at the index finger tip.
//! Once the hold lasts `dwell_duration`, a short confirm window lets the host
//! play a cue, then the trigger fires exactly once, the indicator pulses out and
//! a cooldown blocks new dwells. Releasing the hand at any point before the
//! trigger fires (confirm window included) aborts it.
//!
//! All timing is driven by the `now` values the host passes in; nothing fires
//! between calls.

use crate::constants::*;
use crate::error::{check_range, ConfigError};
use crate::input::{GestureEvent, HandId, HandTracker, Joint};
use crate::timer::{Scheduler, TimerId};
use glam::Vec3;
use instant::Instant;
use smallvec::SmallVec;
use std::time::Duration;

#[inline]
pub fn ease_in_quad(x: f32) -> f32 {
    x * x
}

#[inline]
pub fn ease_out_quint(x: f32) -> f32 {
    1.0 - (1.0 - x).powi(5)
}

#[derive(Clone, Debug, PartialEq)]
pub struct DwellConfig {
    pub dwell_duration: Duration,
    pub cooldown_duration: Duration,
    pub pulse_duration: Duration,
    pub confirm_delay: Duration,
    pub pulse_scale_gain: f32,
    pub color: u32,
    pub radius: f32,
    pub outer_opacity: f32,
    pub inner_opacity: f32,
    pub pulse_outer_opacity: f32,
    pub pulse_inner_opacity: f32,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            dwell_duration: Duration::from_millis(DWELL_DURATION_MS),
            cooldown_duration: Duration::from_millis(DWELL_COOLDOWN_MS),
            pulse_duration: Duration::from_millis(DWELL_PULSE_MS),
            confirm_delay: Duration::from_millis(DWELL_CONFIRM_DELAY_MS),
            pulse_scale_gain: PULSE_SCALE_GAIN,
            color: INDICATOR_COLOR,
            radius: INDICATOR_RADIUS,
            outer_opacity: INDICATOR_OUTER_OPACITY,
            inner_opacity: INDICATOR_INNER_OPACITY,
            pulse_outer_opacity: PULSE_OUTER_OPACITY,
            pulse_inner_opacity: PULSE_INNER_OPACITY,
        }
    }
}

impl DwellConfig {
    /// Zero durations are rejected: an instant dwell would fire on the first
    /// frame of every touch. Every timing is capped at one day.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = Duration::from_secs(DWELL_MAX_DURATION_SECS);
        for (name, value) in [
            ("dwell_duration", self.dwell_duration),
            ("cooldown_duration", self.cooldown_duration),
            ("pulse_duration", self.pulse_duration),
            ("confirm_delay", self.confirm_delay),
        ] {
            if value > max {
                return Err(ConfigError::OutOfRange {
                    name,
                    value: value.as_secs_f64(),
                    min: 0.0,
                    max: max.as_secs_f64(),
                });
            }
        }
        if self.dwell_duration.is_zero() {
            return Err(ConfigError::NonPositiveDuration {
                name: "dwell_duration",
            });
        }
        if self.pulse_duration.is_zero() {
            return Err(ConfigError::NonPositiveDuration {
                name: "pulse_duration",
            });
        }
        check_range("pulse_scale_gain", self.pulse_scale_gain, 0.0, 10.0)?;
        check_range("radius", self.radius, f32::MIN_POSITIVE, 1.0)?;
        check_range("outer_opacity", self.outer_opacity, 0.0, 1.0)?;
        check_range("inner_opacity", self.inner_opacity, 0.0, 1.0)?;
        check_range("pulse_outer_opacity", self.pulse_outer_opacity, 0.0, 1.0)?;
        check_range("pulse_inner_opacity", self.pulse_inner_opacity, 0.0, 1.0)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DwellPhase {
    Idle,
    Dwelling,
    Pulsing,
}

/// Two concentric spheres: a fixed translucent shell and a growing core.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Indicator {
    pub hand: HandId,
    pub anchor: Vec3,
    pub color: u32,
    pub radius: f32,
    pub outer_opacity: f32,
    pub inner_scale: f32,
    pub inner_opacity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackCue {
    Activate,
}

/// Side effects for the rendering/audio adapter, in the order they happened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DwellEvent {
    IndicatorCreated(Indicator),
    IndicatorUpdated(Indicator),
    IndicatorRemoved,
    Cue(FeedbackCue),
    Triggered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DwellTimer {
    DwellElapsed,
    Confirm,
    PulseEnd,
}

#[derive(Clone, Copy, Debug)]
struct HeldHand {
    hand: HandId,
    // Already fired during this hold; must end and begin again to dwell.
    spent: bool,
}

pub struct DwellTrigger {
    config: DwellConfig,
    on_trigger: Box<dyn FnMut()>,
    phase: DwellPhase,
    active_hand: Option<HandId>,
    dwell_started_at: Option<Instant>,
    pulse_started_at: Option<Instant>,
    last_fired_at: Option<Instant>,
    held: SmallVec<[HeldHand; 2]>,
    timers: Scheduler<DwellTimer>,
    dwell_timer: Option<TimerId>,
    confirm_timer: Option<TimerId>,
    pulse_timer: Option<TimerId>,
    indicator: Option<Indicator>,
    trigger_count: u64,
}

impl std::fmt::Debug for DwellTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DwellTrigger")
            .field("phase", &self.phase)
            .field("active_hand", &self.active_hand)
            .field("dwell_started_at", &self.dwell_started_at)
            .field("last_fired_at", &self.last_fired_at)
            .field("trigger_count", &self.trigger_count)
            .finish_non_exhaustive()
    }
}

impl DwellTrigger {
    pub fn new(
        config: DwellConfig,
        on_trigger: impl FnMut() + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            on_trigger: Box::new(on_trigger),
            phase: DwellPhase::Idle,
            active_hand: None,
            dwell_started_at: None,
            pulse_started_at: None,
            last_fired_at: None,
            held: SmallVec::new(),
            timers: Scheduler::new(),
            dwell_timer: None,
            confirm_timer: None,
            pulse_timer: None,
            indicator: None,
            trigger_count: 0,
        })
    }

    pub fn config(&self) -> &DwellConfig {
        &self.config
    }

    pub fn phase(&self) -> DwellPhase {
        self.phase
    }

    pub fn active_hand(&self) -> Option<HandId> {
        self.active_hand
    }

    pub fn dwell_started_at(&self) -> Option<Instant> {
        self.dwell_started_at
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.last_fired_at
            .and_then(|at| at.checked_add(self.config.cooldown_duration))
    }

    pub fn is_cooling_down(&self, now: Instant) -> bool {
        self.last_fired_at
            .is_some_and(|at| since(at, now) < self.config.cooldown_duration)
    }

    pub fn indicator(&self) -> Option<&Indicator> {
        self.indicator.as_ref()
    }

    pub fn trigger_count(&self) -> u64 {
        self.trigger_count
    }

    /// True between the end of the hold and the moment the trigger fires.
    pub fn is_confirming(&self) -> bool {
        self.confirm_timer.is_some_and(|id| self.timers.is_pending(id))
    }

    /// When the current hold will fire if it is not released first.
    pub fn fires_at(&self) -> Option<Instant> {
        if let Some(at) = self.confirm_timer.and_then(|id| self.timers.deadline(id)) {
            return Some(at);
        }
        self.dwell_timer
            .and_then(|id| self.timers.deadline(id))
            .and_then(|at| at.checked_add(self.config.confirm_delay))
    }

    /// Hold progress in \[0, 1\]; 1 while pulsing.
    pub fn progress(&self, now: Instant) -> f32 {
        match (self.phase, self.dwell_started_at) {
            (DwellPhase::Dwelling, Some(start)) => {
                let elapsed = since(start, now).as_secs_f32();
                (elapsed / self.config.dwell_duration.as_secs_f32()).clamp(0.0, 1.0)
            }
            (DwellPhase::Pulsing, _) => 1.0,
            _ => 0.0,
        }
    }

    pub fn handle(
        &mut self,
        event: GestureEvent,
        now: Instant,
        tracker: &dyn HandTracker,
        out: &mut Vec<DwellEvent>,
    ) {
        match event {
            GestureEvent::Begin(hand) => self.on_gesture_begin(hand, now, out),
            GestureEvent::Sustained => self.on_gesture_sustained(now, tracker, out),
            GestureEvent::End(hand) => self.on_gesture_end(hand, now, out),
        }
    }

    /// Record a hand starting a select gesture. The dwell itself starts on
    /// the first sustained frame.
    pub fn on_gesture_begin(&mut self, hand: HandId, now: Instant, out: &mut Vec<DwellEvent>) {
        self.advance(now, out);
        if self.held.iter().any(|h| h.hand == hand) {
            log::debug!("[dwell] {hand:?} began twice without ending; ignoring");
            return;
        }
        self.held.push(HeldHand { hand, spent: false });
    }

    pub fn on_gesture_sustained(
        &mut self,
        now: Instant,
        tracker: &dyn HandTracker,
        out: &mut Vec<DwellEvent>,
    ) {
        self.advance(now, out);
        if self.phase == DwellPhase::Idle {
            self.try_start_dwell(now, tracker, out);
        }
        self.refresh_indicator(now, tracker, out);
    }

    pub fn on_gesture_end(&mut self, hand: HandId, now: Instant, out: &mut Vec<DwellEvent>) {
        self.advance(now, out);
        self.held.retain(|h| h.hand != hand);
        if self.active_hand != Some(hand) {
            return;
        }
        if self.phase == DwellPhase::Dwelling {
            let aborted_confirm = self.timers.cancel_slot(&mut self.confirm_timer);
            self.timers.cancel_slot(&mut self.dwell_timer);
            if aborted_confirm {
                log::debug!("[dwell] {hand:?} released while confirming; aborted");
            } else {
                log::debug!("[dwell] {hand:?} released early");
            }
            self.remove_indicator(out);
            self.dwell_started_at = None;
            self.phase = DwellPhase::Idle;
        }
        // A running pulse finishes on its own timer.
        self.active_hand = None;
    }

    /// Per-frame tick: fires due timers and animates the indicator even when
    /// no select events arrive.
    pub fn update(&mut self, now: Instant, tracker: &dyn HandTracker, out: &mut Vec<DwellEvent>) {
        self.advance(now, out);
        self.refresh_indicator(now, tracker, out);
    }

    /// Back to a fresh `Idle` state: timers, held hands and cooldown cleared.
    pub fn reset(&mut self, out: &mut Vec<DwellEvent>) {
        self.timers.clear();
        self.dwell_timer = None;
        self.confirm_timer = None;
        self.pulse_timer = None;
        self.remove_indicator(out);
        self.held.clear();
        self.active_hand = None;
        self.dwell_started_at = None;
        self.pulse_started_at = None;
        self.last_fired_at = None;
        self.phase = DwellPhase::Idle;
    }

    fn try_start_dwell(
        &mut self,
        now: Instant,
        tracker: &dyn HandTracker,
        out: &mut Vec<DwellEvent>,
    ) {
        if self.is_cooling_down(now) {
            return;
        }
        // First held hand that has not fired yet and whose tip is tracked.
        let candidate = self
            .held
            .iter()
            .filter(|h| !h.spent)
            .find_map(|h| {
                let tip = tracker.joint_position(h.hand, Joint::IndexFingerTip)?;
                Some((h.hand, tip))
            });
        let Some((hand, tip)) = candidate else {
            return;
        };
        let Some(deadline) = later(now, self.config.dwell_duration) else {
            return;
        };
        if self
            .timers
            .arm(&mut self.dwell_timer, deadline, DwellTimer::DwellElapsed)
            .is_err()
        {
            return;
        }
        log::debug!("[dwell] {hand:?} started dwelling");
        self.phase = DwellPhase::Dwelling;
        self.active_hand = Some(hand);
        self.dwell_started_at = Some(now);
        let indicator = Indicator {
            hand,
            anchor: tip,
            color: self.config.color,
            radius: self.config.radius,
            outer_opacity: self.config.outer_opacity,
            inner_scale: INDICATOR_INNER_MIN_SCALE,
            inner_opacity: self.config.inner_opacity,
        };
        self.indicator = Some(indicator);
        out.push(DwellEvent::IndicatorCreated(indicator));
    }

    fn advance(&mut self, now: Instant, out: &mut Vec<DwellEvent>) {
        while let Some(due) = self.timers.pop_due(now) {
            match due.event {
                DwellTimer::DwellElapsed => {
                    self.dwell_timer = None;
                    self.on_dwell_elapsed(due.deadline, out);
                }
                DwellTimer::Confirm => {
                    self.confirm_timer = None;
                    self.fire(due.deadline, out);
                }
                DwellTimer::PulseEnd => {
                    self.pulse_timer = None;
                    self.finish_pulse(out);
                }
            }
        }
    }

    fn on_dwell_elapsed(&mut self, at: Instant, out: &mut Vec<DwellEvent>) {
        if self.is_cooling_down(at) {
            log::debug!("[dwell] hold completed during cooldown; ignoring");
            self.abandon_dwell(out);
            return;
        }
        let Some(deadline) = later(at, self.config.confirm_delay) else {
            self.abandon_dwell(out);
            return;
        };
        if self
            .timers
            .arm(&mut self.confirm_timer, deadline, DwellTimer::Confirm)
            .is_err()
        {
            self.abandon_dwell(out);
        }
    }

    fn fire(&mut self, at: Instant, out: &mut Vec<DwellEvent>) {
        let hand = self.active_hand;
        if let Some(held) = self.held.iter_mut().find(|h| Some(h.hand) == hand) {
            held.spent = true;
        }
        self.last_fired_at = Some(at);
        self.trigger_count += 1;
        self.dwell_started_at = None;
        log::info!("[dwell] triggered by {hand:?} (#{})", self.trigger_count);

        out.push(DwellEvent::Cue(FeedbackCue::Activate));
        (self.on_trigger)();
        out.push(DwellEvent::Triggered);

        self.phase = DwellPhase::Pulsing;
        self.pulse_started_at = Some(at);
        let Some(deadline) = later(at, self.config.pulse_duration) else {
            self.finish_pulse(out);
            return;
        };
        if self
            .timers
            .arm(&mut self.pulse_timer, deadline, DwellTimer::PulseEnd)
            .is_err()
        {
            self.finish_pulse(out);
            return;
        }
        self.apply_pulse(at, out);
    }

    fn finish_pulse(&mut self, out: &mut Vec<DwellEvent>) {
        self.remove_indicator(out);
        self.pulse_started_at = None;
        self.active_hand = None;
        self.phase = DwellPhase::Idle;
    }

    fn abandon_dwell(&mut self, out: &mut Vec<DwellEvent>) {
        if let Some(held) = self
            .held
            .iter_mut()
            .find(|h| Some(h.hand) == self.active_hand)
        {
            held.spent = true;
        }
        self.remove_indicator(out);
        self.dwell_started_at = None;
        self.active_hand = None;
        self.phase = DwellPhase::Idle;
    }

    fn refresh_indicator(
        &mut self,
        now: Instant,
        tracker: &dyn HandTracker,
        out: &mut Vec<DwellEvent>,
    ) {
        let Some(indicator) = self.indicator.as_mut() else {
            return;
        };
        if let Some(tip) = tracker.joint_position(indicator.hand, Joint::IndexFingerTip) {
            indicator.anchor = tip;
        }
        match self.phase {
            DwellPhase::Dwelling => {
                let eased = ease_in_quad(self.progress(now));
                if let Some(indicator) = self.indicator.as_mut() {
                    indicator.inner_scale = eased.max(INDICATOR_INNER_MIN_SCALE);
                    out.push(DwellEvent::IndicatorUpdated(*indicator));
                }
            }
            DwellPhase::Pulsing => self.apply_pulse(now, out),
            DwellPhase::Idle => {}
        }
    }

    fn apply_pulse(&mut self, now: Instant, out: &mut Vec<DwellEvent>) {
        let Some(start) = self.pulse_started_at else {
            return;
        };
        let Some(indicator) = self.indicator.as_mut() else {
            return;
        };
        let t = (since(start, now).as_secs_f32() / self.config.pulse_duration.as_secs_f32())
            .clamp(0.0, 1.0);
        indicator.inner_scale = 1.0 + ease_out_quint(t) * self.config.pulse_scale_gain;
        indicator.inner_opacity = self.config.pulse_inner_opacity * (1.0 - t);
        indicator.outer_opacity = self.config.pulse_outer_opacity * (1.0 - t);
        out.push(DwellEvent::IndicatorUpdated(*indicator));
    }

    fn remove_indicator(&mut self, out: &mut Vec<DwellEvent>) {
        if self.indicator.take().is_some() {
            out.push(DwellEvent::IndicatorRemoved);
        }
    }
}

fn later(at: Instant, delay: Duration) -> Option<Instant> {
    let deadline = at.checked_add(delay);
    if deadline.is_none() {
        log::warn!("[dwell] {delay:?} after {at:?} overflows the clock");
    }
    deadline
}

#[inline]
fn since(start: Instant, now: Instant) -> Duration {
    if now > start {
        now - start
    } else {
        Duration::ZERO
    }
}
