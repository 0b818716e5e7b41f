//! Priority-driven list scheduler.
//!
//! Pops the ready task with the smallest `ready_time` (allocation index
//! breaks ties, so repeated runs schedule identically on every platform),
//! serializes it on its device's timeline, and releases successors whose
//! in-edge counters drain to zero.

use crate::arena::{TaskArena, TaskId};
use std::collections::BinaryHeap;

/// A task waiting in the ready queue.
#[derive(Debug, Clone, Copy)]
struct ReadyTask {
    ready_time: f64,
    id: TaskId,
}

impl PartialEq for ReadyTask {
    fn eq(&self, other: &Self) -> bool {
        self.ready_time == other.ready_time && self.id == other.id
    }
}

impl Eq for ReadyTask {}

impl PartialOrd for ReadyTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReadyTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; we want min-heap by (ready_time, id).
        other
            .ready_time
            .total_cmp(&self.ready_time)
            .then(other.id.cmp(&self.id))
    }
}

/// Scheduled `[start, end)` interval of one task.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TaskSpan {
    pub start: f64,
    pub end: f64,
}

/// Result of one scheduling pass.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Maximum task end time.
    pub makespan: f64,
    /// Per-task spans, indexed by task id.
    pub spans: Vec<TaskSpan>,
}

/// Schedule every task in the arena onto `device_count` device timelines.
///
/// # Panics
///
/// Panics when fewer tasks are scheduled than were allocated — the DAG had
/// a cycle or a dangling predecessor.
pub fn schedule(arena: &mut TaskArena, device_count: usize) -> Timeline {
    let total = arena.len();
    let mut device_times = vec![0.0f64; device_count];
    let mut spans = vec![TaskSpan::default(); total];
    let mut queue = BinaryHeap::with_capacity(total);

    for id in 0..total as TaskId {
        if arena.task(id).counter == 0 {
            queue.push(ReadyTask {
                ready_time: arena.task(id).ready_time,
                id,
            });
        }
    }

    let mut makespan = 0.0f64;
    let mut executed = 0usize;
    while let Some(ReadyTask { ready_time, id }) = queue.pop() {
        let task = arena.task(id);
        let device = task.device as usize;
        let start = device_times[device].max(ready_time);
        let end = start + task.run_time;
        device_times[device] = end;
        spans[id as usize] = TaskSpan { start, end };
        makespan = makespan.max(end);
        executed += 1;

        for i in 0..arena.task(id).next.len() {
            let succ = arena.task(id).next[i];
            let s = arena.task_mut(succ);
            s.ready_time = s.ready_time.max(end);
            s.counter -= 1;
            if s.counter == 0 {
                queue.push(ReadyTask {
                    ready_time: s.ready_time,
                    id: succ,
                });
            }
        }
    }

    assert_eq!(
        executed, total,
        "scheduler finished with {} of {} tasks unreached: the task graph \
         has a cycle or a dangling predecessor",
        total - executed,
        total,
    );

    Timeline { makespan, spans }
}
