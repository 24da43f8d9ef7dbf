// Cancellable timed tasks polled on a simulated clock
//
// Tasks are plain values handed back by `poll` once their fire time is
// reached. The owner polls once per tick and dispatches the returned tasks
// itself, so a cancelled task never touches torn-down state.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Handle returned by `schedule`, used to cancel a single task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Heap entry: fire time plus insertion sequence for stable ordering
#[derive(Debug, Clone, Copy)]
struct Entry {
    fire_at: f32,
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .total_cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of pending tasks keyed by owner
#[derive(Debug)]
pub struct Scheduler<O, T> {
    queue: BinaryHeap<Reverse<Entry>>,
    /// Live tasks. Cancelled entries stay in the heap until popped.
    live: HashMap<u64, (O, T)>,
    next_seq: u64,
}

impl<O, T> Scheduler<O, T>
where
    O: PartialEq,
{
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            live: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `task` to fire `delay` seconds after `now`
    pub fn schedule(&mut self, now: f32, delay: f32, owner: O, task: T) -> TaskHandle {
        let seq = self.next_seq;
        self.next_seq += 1;

        let fire_at = now + delay.max(0.0);
        self.queue.push(Reverse(Entry { fire_at, seq }));
        self.live.insert(seq, (owner, task));

        TaskHandle(seq)
    }

    /// Cancel one task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.live.remove(&handle.0).is_some()
    }

    /// Cancel every task belonging to `owner`, returns how many were dropped
    pub fn cancel_owner(&mut self, owner: &O) -> usize {
        self.cancel_where(|o, _| o == owner)
    }

    /// Cancel every task matching the predicate
    pub fn cancel_where<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&O, &T) -> bool,
    {
        let before = self.live.len();
        self.live.retain(|_, (owner, task)| !pred(owner, task));
        before - self.live.len()
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }

    /// Pop every live task due at `now` (fire time <= now), earliest first
    pub fn poll(&mut self, now: f32) -> Vec<T> {
        let mut fired = Vec::new();

        while let Some(Reverse(entry)) = self.queue.peek().copied() {
            if entry.fire_at > now {
                break;
            }
            self.queue.pop();

            if let Some((_, task)) = self.live.remove(&entry.seq) {
                fired.push(task);
            }
        }

        fired
    }

    /// Number of live (not cancelled, not fired) tasks
    pub fn pending(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Whether any live task matches the predicate
    pub fn any<F>(&self, mut pred: F) -> bool
    where
        F: FnMut(&O, &T) -> bool,
    {
        self.live.values().any(|(owner, task)| pred(owner, task))
    }
}

impl<O, T> Default for Scheduler<O, T>
where
    O: PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}
