//! Deterministic tick scheduler for deferred puzzle work.
//!
//! Pop staggering, delayed board events and drop sequencing are all expressed
//! as tasks due at a future tick. The board drains due tasks once per tick,
//! so the whole sequence replays identically in tests without a wall clock.

use std::{cmp::Ordering, collections::BinaryHeap};

/// Logical time, counted in board ticks.
pub type Tick = u64;

#[derive(Debug)]
struct Entry<T> {
    due: Tick,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the max-heap yields the earliest entry first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of `(due tick, task)` entries. Tasks due on the same tick
/// run in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Tick,
    seq: u64,
    queue: BinaryHeap<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: 0,
            seq: 0,
            queue: BinaryHeap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Schedule a task `delay` ticks from now. A delay of zero runs on the
    /// next drain.
    pub fn schedule_in(&mut self, delay: Tick, task: T) {
        let due = self.now + delay;
        self.queue.push(Entry {
            due,
            seq: self.seq,
            task,
        });
        self.seq += 1;
    }

    /// Take the next task due at or before the current tick.
    pub fn pop_due(&mut self) -> Option<T> {
        if self.queue.peek()?.due > self.now {
            return None;
        }
        self.queue.pop().map(|entry| entry.task)
    }

    /// Move the clock forward by one tick.
    pub fn advance(&mut self) {
        self.now += 1;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every pending task. The clock keeps running.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut Scheduler<&'static str>) -> Vec<&'static str> {
        std::iter::from_fn(|| scheduler.pop_due()).collect()
    }

    #[test]
    fn test_tasks_fire_in_due_order() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule_in(2, "late");
        scheduler.schedule_in(1, "early");
        scheduler.schedule_in(0, "now");

        assert_eq!(drain(&mut scheduler), vec!["now"]);
        scheduler.advance();
        assert_eq!(drain(&mut scheduler), vec!["early"]);
        scheduler.advance();
        assert_eq!(drain(&mut scheduler), vec!["late"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_same_tick_keeps_insertion_order() {
        let mut scheduler = Scheduler::default();
        for task in ["a", "b", "c", "d"] {
            scheduler.schedule_in(3, task);
        }
        for _ in 0..3 {
            scheduler.advance();
        }
        assert_eq!(drain(&mut scheduler), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_clear_discards_pending_work() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule_in(1, "pop");
        scheduler.clear();
        scheduler.advance();
        assert!(scheduler.pop_due().is_none());
        assert_eq!(scheduler.now(), 1);
    }
}
