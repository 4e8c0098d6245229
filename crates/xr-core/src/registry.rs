use crate::dwell::{DwellEvent, DwellTrigger};
use crate::input::{GestureEvent, HandTracker};
use fnv::FnvHashMap;
use instant::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AffordanceId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffordanceEvent {
    pub affordance: AffordanceId,
    pub event: DwellEvent,
}

/// Owns one dwell trigger per interactive affordance in the scene.
#[derive(Debug, Default)]
pub struct DwellRegistry {
    triggers: FnvHashMap<AffordanceId, DwellTrigger>,
    next_id: u32,
    scratch: Vec<DwellEvent>,
}

impl DwellRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, trigger: DwellTrigger) -> AffordanceId {
        let id = AffordanceId(self.next_id);
        self.next_id += 1;
        self.triggers.insert(id, trigger);
        log::debug!("[registry] added affordance {}", id.0);
        id
    }

    /// Drop an affordance, removing its indicator if one is showing.
    pub fn dispose(&mut self, id: AffordanceId, out: &mut Vec<AffordanceEvent>) -> bool {
        let Some(mut trigger) = self.triggers.remove(&id) else {
            return false;
        };
        self.scratch.clear();
        trigger.reset(&mut self.scratch);
        tag(id, &mut self.scratch, out);
        log::debug!("[registry] disposed affordance {}", id.0);
        true
    }

    pub fn get(&self, id: AffordanceId) -> Option<&DwellTrigger> {
        self.triggers.get(&id)
    }

    pub fn get_mut(&mut self, id: AffordanceId) -> Option<&mut DwellTrigger> {
        self.triggers.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Route one input event to an affordance. Unknown ids are ignored.
    pub fn dispatch(
        &mut self,
        id: AffordanceId,
        event: GestureEvent,
        now: Instant,
        tracker: &dyn HandTracker,
        out: &mut Vec<AffordanceEvent>,
    ) -> bool {
        let Some(trigger) = self.triggers.get_mut(&id) else {
            log::debug!("[registry] event for unknown affordance {}", id.0);
            return false;
        };
        self.scratch.clear();
        trigger.handle(event, now, tracker, &mut self.scratch);
        tag(id, &mut self.scratch, out);
        true
    }

    /// Tick every trigger in id order.
    pub fn update_all(
        &mut self,
        now: Instant,
        tracker: &dyn HandTracker,
        out: &mut Vec<AffordanceEvent>,
    ) {
        let mut ids: Vec<AffordanceId> = self.triggers.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(trigger) = self.triggers.get_mut(&id) {
                self.scratch.clear();
                trigger.update(now, tracker, &mut self.scratch);
                tag(id, &mut self.scratch, out);
            }
        }
    }
}

fn tag(id: AffordanceId, events: &mut Vec<DwellEvent>, out: &mut Vec<AffordanceEvent>) {
    out.extend(events.drain(..).map(|event| AffordanceEvent {
        affordance: id,
        event,
    }));
}
