//! Debounced tasks.
//!
//! Each [`Task`] has at most one pending deadline. Scheduling a task that is
//! already pending replaces its deadline, so only the latest request survives.

use std::time::{Duration, Instant};

/// Deferred work performed by an editor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Task {
    /// Highlight dirty nodes for one pass.
    Highlight,

    /// Commit touched lines to the edit history.
    Commit,

    /// Advance the continuous scan of the document.
    Scan,
}

pub struct Timers {
    pending: Vec<(Task, Instant)>,
}

impl Timers {
    pub fn new() -> Timers {
        Timers {
            pending: Vec::new(),
        }
    }

    /// Schedules `task` to be due `delay` after `now`, replacing any pending deadline.
    pub fn schedule(&mut self, task: Task, now: Instant, delay: Duration) {
        self.cancel(task);
        self.pending.push((task, now + delay));
    }

    pub fn cancel(&mut self, task: Task) {
        self.pending.retain(|(t, _)| *t != task);
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.pending.iter().any(|(t, _)| *t == task)
    }

    /// Returns the earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, at)| *at).min()
    }

    /// Removes and returns all tasks due at `now`, earliest first.
    pub fn due(&mut self, now: Instant) -> Vec<Task> {
        let (mut due, pending) = self
            .pending
            .drain(..)
            .partition::<Vec<_>, _>(|(_, at)| *at <= now);
        self.pending = pending;
        due.sort_by_key(|(_, at)| *at);
        due.into_iter().map(|(task, _)| task).collect()
    }
}

impl Default for Timers {
    fn default() -> Timers {
        Timers::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn latest_request_wins() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.schedule(Task::Highlight, now, 10 * MS);
        timers.schedule(Task::Highlight, now, 50 * MS);
        assert_eq!(timers.due(now + 20 * MS), vec![]);
        assert_eq!(timers.due(now + 50 * MS), vec![Task::Highlight]);
        assert!(!timers.is_pending(Task::Highlight));
    }

    #[test]
    fn due_in_deadline_order() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.schedule(Task::Commit, now, 30 * MS);
        timers.schedule(Task::Scan, now, 5 * MS);
        timers.schedule(Task::Highlight, now, 100 * MS);
        assert_eq!(timers.next_deadline(), Some(now + 5 * MS));
        assert_eq!(timers.due(now + 40 * MS), vec![Task::Scan, Task::Commit]);
        assert!(timers.is_pending(Task::Highlight));
    }

    #[test]
    fn cancel_removes_deadline() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.schedule(Task::Commit, now, MS);
        timers.cancel(Task::Commit);
        assert_eq!(timers.next_deadline(), None);
        assert_eq!(timers.due(now + MS), vec![]);
    }
}
