//! Queue scheduler: delayed-activation statement queue.
//!
//! DESIGN
//! ======
//! The queue is an append-only list of `(statement_id, activation_time)`.
//! Which statement is "active" is never stored: `active_id` derives it from
//! the items whose activation time has passed. Any cached copy elsewhere (the
//! simulator's change detector) is a hint, not truth.
//!
//! TRADE-OFFS
//! ==========
//! `clear_future` collapses the queue to the currently showing item instead
//! of emptying it, so a host can drop pending statements without blanking
//! the audience's screen. There is no reset-to-empty operation.

use crate::protocol::{QueueItem, SENTINEL_STATEMENT_ID};

#[derive(Debug, Clone)]
pub struct Queue {
    items: Vec<QueueItem>,
    activation_delay_ms: i64,
    fallback_id: i64,
}

impl Queue {
    #[must_use]
    pub fn new(activation_delay_ms: i64, fallback_id: i64) -> Self {
        Self { items: Vec::new(), activation_delay_ms, fallback_id }
    }

    #[cfg(test)]
    #[must_use]
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Schedule a statement. Activates immediately when the session has been
    /// ended with the sentinel, otherwise after the activation delay.
    pub fn enqueue(&mut self, statement_id: i64, now: i64) -> QueueItem {
        let activation_time = if self.active_id(now) == SENTINEL_STATEMENT_ID {
            now
        } else {
            now + self.activation_delay_ms
        };
        self.push(statement_id, activation_time)
    }

    /// Legacy path: make a statement active right now, skipping the delay.
    pub fn activate_now(&mut self, statement_id: i64, now: i64) -> QueueItem {
        self.push(statement_id, now)
    }

    fn push(&mut self, statement_id: i64, activation_time: i64) -> QueueItem {
        let item = QueueItem { statement_id, activation_time };
        self.items.push(item);
        item
    }

    /// The statement showing at `now`: the latest activated item, or the
    /// fallback id when nothing has activated yet.
    #[must_use]
    pub fn active_id(&self, now: i64) -> i64 {
        self.current_item(now).map_or(self.fallback_id, |item| item.statement_id)
    }

    /// Most recently activated item at `now`. Equal activation times resolve
    /// to the item appended last.
    fn current_item(&self, now: i64) -> Option<QueueItem> {
        self.items
            .iter()
            .filter(|item| item.activation_time <= now)
            .fold(None, |best: Option<QueueItem>, item| match best {
                Some(b) if b.activation_time > item.activation_time => Some(b),
                _ => Some(*item),
            })
    }

    /// Earliest activation strictly after `now`, if any is scheduled.
    #[must_use]
    pub fn next_activation_after(&self, now: i64) -> Option<i64> {
        self.items
            .iter()
            .map(|item| item.activation_time)
            .filter(|t| *t > now)
            .min()
    }

    /// Drop every pending item and every superseded past item, keeping only
    /// the one currently showing. Returns the number of removed items.
    pub fn clear_future(&mut self, now: i64) -> usize {
        let before = self.items.len();
        self.items = self.current_item(now).into_iter().collect();
        before - self.items.len()
    }

    /// Items sorted by activation time, for clients rendering the schedule.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueueItem> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| item.activation_time);
        items
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
