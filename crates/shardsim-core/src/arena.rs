//! Task records, the pre-allocated task arena, and the task registry.
//!
//! Every simulation run rebuilds its DAG inside one fixed-capacity pool of
//! task slots. `reset` rewinds the cursor without deallocating, so edge
//! lists keep their heap capacity across the thousands of runs an outer
//! search performs. Task handles are plain indices into the pool; the index
//! doubles as the allocation-order tie-break key during scheduling.

use crate::machine::DeviceIdx;
use shardsim_model::OpId;
use std::collections::HashMap;

/// Handle to a task slot, stable for the duration of one run.
pub type TaskId = u32;

/// What a task models.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    #[default]
    Forward,
    Backward,
    Comm,
    Update,
    Barrier,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Forward => "Forward",
            TaskKind::Backward => "Backward",
            TaskKind::Comm => "Comm",
            TaskKind::Update => "Update",
            TaskKind::Barrier => "Barrier",
        }
    }
}

/// One atomic scheduling unit.
#[derive(Debug, Default, Clone)]
pub struct Task {
    pub kind: TaskKind,
    pub device: DeviceIdx,
    /// Intrinsic duration in seconds.
    pub run_time: f64,
    /// Earliest moment all predecessors have completed; raised as they do.
    pub ready_time: f64,
    /// Not-yet-completed in-edges. Equals the in-degree when scheduling starts.
    pub counter: u32,
    /// Successor tasks.
    pub next: Vec<TaskId>,
    /// Operator label for graph export.
    pub op: Option<OpId>,
}

/// Fixed pool of task slots with a resettable cursor, plus the
/// fingerprint-indexed registry of forward and backward tasks.
pub struct TaskArena {
    tasks: Vec<Task>,
    cursor: usize,
    forward: HashMap<(OpId, u32), TaskId>,
    backward: HashMap<(OpId, u32), TaskId>,
}

impl TaskArena {
    /// Pre-construct `capacity` task slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: vec![Task::default(); capacity],
            cursor: 0,
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }

    /// Rewind the cursor and clear the registry. Frees nothing.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.forward.clear();
        self.backward.clear();
    }

    fn alloc(&mut self, kind: TaskKind, device: DeviceIdx, run_time: f64) -> TaskId {
        assert!(
            self.cursor < self.tasks.len(),
            "task arena exhausted at {} tasks; size the simulator for the largest plan",
            self.tasks.len(),
        );
        let id = self.cursor as TaskId;
        let task = &mut self.tasks[self.cursor];
        task.kind = kind;
        task.device = device;
        task.run_time = run_time;
        task.ready_time = 0.0;
        task.counter = 0;
        task.next.clear();
        task.op = None;
        self.cursor += 1;
        id
    }

    pub fn new_forward_task(
        &mut self,
        op: OpId,
        shard: u32,
        device: DeviceIdx,
        run_time: f64,
    ) -> TaskId {
        let id = self.alloc(TaskKind::Forward, device, run_time);
        self.tasks[id as usize].op = Some(op);
        self.forward.insert((op, shard), id);
        id
    }

    pub fn new_backward_task(
        &mut self,
        op: OpId,
        shard: u32,
        device: DeviceIdx,
        run_time: f64,
    ) -> TaskId {
        let id = self.alloc(TaskKind::Backward, device, run_time);
        self.tasks[id as usize].op = Some(op);
        self.backward.insert((op, shard), id);
        id
    }

    pub fn new_comm_task(&mut self, device: DeviceIdx, run_time: f64) -> TaskId {
        self.alloc(TaskKind::Comm, device, run_time)
    }

    pub fn new_update_task(&mut self, device: DeviceIdx) -> TaskId {
        self.alloc(TaskKind::Update, device, 0.0)
    }

    pub fn new_barrier_task(&mut self, device: DeviceIdx) -> TaskId {
        self.alloc(TaskKind::Barrier, device, 0.0)
    }

    /// Registered forward task of `(op, shard)`.
    ///
    /// # Panics
    ///
    /// Panics when the task was never created — a cross-layer edge to a
    /// nonexistent shard is a builder bug.
    pub fn forward_task(&self, op: OpId, shard: u32) -> TaskId {
        *self
            .forward
            .get(&(op, shard))
            .unwrap_or_else(|| panic!("no forward task registered for op {op} shard {shard}"))
    }

    /// Registered backward task of `(op, shard)`. Panics like [`Self::forward_task`].
    pub fn backward_task(&self, op: OpId, shard: u32) -> TaskId {
        *self
            .backward
            .get(&(op, shard))
            .unwrap_or_else(|| panic!("no backward task registered for op {op} shard {shard}"))
    }

    /// Add the edge `src -> dst` and bump the destination's in-edge counter.
    pub fn add_edge(&mut self, src: TaskId, dst: TaskId) {
        self.tasks[src as usize].next.push(dst);
        self.tasks[dst as usize].counter += 1;
    }

    /// Number of tasks allocated since the last reset.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn capacity(&self) -> usize {
        self.tasks.len()
    }

    pub fn task(&self, id: TaskId) -> &Task {
        debug_assert!((id as usize) < self.cursor);
        &self.tasks[id as usize]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut Task {
        debug_assert!((id as usize) < self.cursor);
        &mut self.tasks[id as usize]
    }
}
