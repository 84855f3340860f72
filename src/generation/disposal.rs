use std::time::Duration;

/// A resource waiting out its grace period
#[derive(Debug)]
struct Pending<R> {
    resource: R,
    retired_at: Duration,
    due_at: Duration,
}

/// Releases resources no earlier than a delay after they were retired.
///
/// Timestamps are offsets from an arbitrary clock origin (the app's
/// elapsed real time), so the queue itself never reads a clock.
#[derive(Debug)]
pub struct DisposalQueue<R> {
    pending: Vec<Pending<R>>,
}

impl<R> Default for DisposalQueue<R> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<R> DisposalQueue<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, resource: R, now: Duration, delay: Duration) {
        self.pending.push(Pending {
            resource,
            retired_at: now,
            due_at: now + delay,
        });
    }

    /// Removes and returns everything whose delay has elapsed at `now`,
    /// oldest retirement first.
    pub fn take_due(&mut self, now: Duration) -> Vec<R> {
        let mut due: Vec<Pending<R>> = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].due_at <= now {
                due.push(self.pending.remove(index));
            } else {
                index += 1;
            }
        }

        due.sort_by_key(|p| p.retired_at);
        due.into_iter().map(|p| p.resource).collect()
    }

    /// Empties the queue regardless of delays, for shutdown.
    pub fn drain(&mut self) -> Vec<R> {
        self.pending.drain(..).map(|p| p.resource).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest moment something becomes releasable.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.due_at).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn nothing_is_released_early() {
        let mut queue = DisposalQueue::new();
        queue.schedule("old", secs(1.0), secs(2.0));

        assert!(queue.take_due(secs(2.9)).is_empty());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take_due(secs(3.0)), vec!["old"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn mixed_delays_release_independently() {
        let mut queue = DisposalQueue::new();
        queue.schedule("teardown", secs(0.0), secs(5.0));
        queue.schedule("superseded", secs(1.0), secs(2.0));

        assert_eq!(queue.next_due(), Some(secs(3.0)));
        assert_eq!(queue.take_due(secs(3.5)), vec!["superseded"]);
        assert_eq!(queue.take_due(secs(5.0)), vec!["teardown"]);
    }

    #[test]
    fn due_items_come_out_in_retirement_order() {
        let mut queue = DisposalQueue::new();
        queue.schedule(2, secs(2.0), secs(1.0));
        queue.schedule(1, secs(1.0), secs(1.5));
        assert_eq!(queue.take_due(secs(10.0)), vec![1, 2]);
    }

    #[test]
    fn drain_ignores_delays() {
        let mut queue = DisposalQueue::new();
        queue.schedule('a', secs(0.0), secs(100.0));
        queue.schedule('b', secs(0.0), secs(200.0));
        assert_eq!(queue.drain(), vec!['a', 'b']);
        assert_eq!(queue.next_due(), None);
    }
}
