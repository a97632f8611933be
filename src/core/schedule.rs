//! Tick scheduler for delayed simulation work
//!
//! Delayed actions (reinforcement countdowns, squad ETAs) are entries that
//! fire at a simulation time. Every entry has a `TaskHandle` so the owner
//! can cancel it; dropping the scheduler drops all pending work with it.

/// Handle to a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    handle: TaskHandle,
    fire_at: f32,
    payload: T,
}

/// Fire-at-time queue owned by a single component
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<ScheduledTask<T>>,
    next_handle: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_handle: 1,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire once simulation time reaches `fire_at`
    pub fn schedule(&mut self, fire_at: f32, payload: T) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.push(ScheduledTask {
            handle,
            fire_at,
            payload,
        });
        handle
    }

    /// Cancel a pending task. Returns the payload if it was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let idx = self.tasks.iter().position(|t| t.handle == handle)?;
        Some(self.tasks.remove(idx).payload)
    }

    /// Cancel every pending task matching the predicate
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !predicate(&t.payload));
        before - self.tasks.len()
    }

    /// Cancel everything
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    /// Time at which a pending task fires
    pub fn fire_time(&self, handle: TaskHandle) -> Option<f32> {
        self.tasks
            .iter()
            .find(|t| t.handle == handle)
            .map(|t| t.fire_at)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove and return every task due at `now`, earliest first
    pub fn drain_due(&mut self, now: f32) -> Vec<(TaskHandle, T)> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.tasks.len() {
            if self.tasks[i].fire_at <= now {
                due.push(self.tasks.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at));
        due.into_iter().map(|t| (t.handle, t.payload)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_due_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(3.0, "late");
        scheduler.schedule(1.0, "early");
        scheduler.schedule(10.0, "future");

        let due: Vec<_> = scheduler.drain_due(5.0).into_iter().map(|(_, p)| p).collect();
        assert_eq!(due, vec!["early", "late"]);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(2.0, 7);
        assert!(scheduler.is_pending(handle));
        assert_eq!(scheduler.cancel(handle), Some(7));
        assert!(!scheduler.is_pending(handle));
        assert!(scheduler.drain_due(100.0).is_empty());
    }

    #[test]
    fn test_cancel_where() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, 1);
        scheduler.schedule(1.0, 2);
        scheduler.schedule(1.0, 3);
        assert_eq!(scheduler.cancel_where(|p| *p % 2 == 1), 2);
        assert_eq!(scheduler.drain_due(1.0).len(), 1);
    }
}
