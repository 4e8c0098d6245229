//! One-shot timers for cooperative, single-threaded hosts.
//!
//! Nothing here spawns threads or registers OS timers. The owner polls the
//! queue with the current frame time and handles whatever came due, which keeps
//! every state transition on the host's update loop.

use crate::error::TimerError;
use instant::Instant;
use smallvec::SmallVec;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A timer taken off the queue because its deadline passed.
#[derive(Clone, Debug, PartialEq)]
pub struct Due<E> {
    pub id: TimerId,
    pub deadline: Instant,
    pub event: E,
}

#[derive(Clone, Debug)]
struct Entry<E> {
    id: TimerId,
    deadline: Instant,
    event: E,
}

/// Pending one-shot timers, each carrying an event payload.
#[derive(Clone, Debug)]
pub struct Scheduler<E> {
    entries: SmallVec<[Entry<E>; 4]>,
    next_id: u64,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
            next_id: 1,
        }
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Instant, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline,
            event,
        });
        id
    }

    /// Schedule into `slot` unless the slot still holds a pending timer.
    ///
    /// A slot whose timer already fired or was cancelled counts as free.
    pub fn arm(
        &mut self,
        slot: &mut Option<TimerId>,
        deadline: Instant,
        event: E,
    ) -> Result<TimerId, TimerError> {
        if let Some(id) = *slot {
            if self.is_pending(id) {
                log::warn!("[timer] {id} is already armed; refusing to arm again");
                return Err(TimerError::AlreadyArmed(id.raw()));
            }
        }
        let id = self.schedule(deadline, event);
        *slot = Some(id);
        Ok(id)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Cancel whatever `slot` refers to and leave it empty.
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerId>) -> bool {
        slot.take().map(|id| self.cancel(id)).unwrap_or(false)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// When the pending timer `id` comes due.
    pub fn deadline(&self, id: TimerId) -> Option<Instant> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.deadline)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove and return the earliest timer whose deadline is `<= now`.
    ///
    /// Ties go to the timer scheduled first. Handlers may schedule or cancel
    /// timers between calls, so looping on this sees follow-ups that are
    /// already due.
    pub fn pop_due(&mut self, now: Instant) -> Option<Due<E>> {
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(_, e)| (e.deadline, e.id))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(pos);
        Some(Due {
            id: entry.id,
            deadline: entry.deadline,
            event: entry.event,
        })
    }

    /// Move every due timer into `out`, earliest first.
    pub fn drain_due(&mut self, now: Instant, out: &mut Vec<Due<E>>) {
        while let Some(fired) = self.pop_due(now) {
            out.push(fired);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn due_timers_come_out_in_deadline_order() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(t0 + ms(30), "c");
        s.schedule(t0 + ms(10), "a");
        s.schedule(t0 + ms(20), "b");
        s.schedule(t0 + ms(99), "late");

        let mut out = Vec::new();
        s.drain_due(t0 + ms(50), &mut out);
        let names: Vec<_> = out.iter().map(|d| d.event).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.next_deadline(), Some(t0 + ms(99)));
    }

    #[test]
    fn equal_deadlines_keep_scheduling_order() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.schedule(t0, 1);
        s.schedule(t0, 2);
        assert_eq!(s.pop_due(t0).map(|d| d.event), Some(1));
        assert_eq!(s.pop_due(t0).map(|d| d.event), Some(2));
        assert!(s.pop_due(t0).is_none());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        let id = s.schedule(t0 + ms(5), ());
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.pop_due(t0 + ms(10)).is_none());
    }

    #[test]
    fn arm_refuses_a_pending_slot() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        let mut slot = None;
        let first = s.arm(&mut slot, t0 + ms(10), 'x').unwrap();
        assert_eq!(
            s.arm(&mut slot, t0 + ms(20), 'y'),
            Err(TimerError::AlreadyArmed(first.raw()))
        );
        assert_eq!(s.len(), 1);
        assert_eq!(slot, Some(first));
    }

    #[test]
    fn arm_reuses_a_slot_after_it_fired() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        let mut slot = None;
        s.arm(&mut slot, t0, 1).unwrap();
        let fired = s.pop_due(t0).unwrap();
        assert_eq!(fired.deadline, t0);
        let second = s.arm(&mut slot, t0 + ms(1), 2).unwrap();
        assert_eq!(slot, Some(second));
        assert!(s.cancel_slot(&mut slot));
        assert!(slot.is_none());
        assert!(s.is_empty());
    }
}
