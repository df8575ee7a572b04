// storefront/src/realtime/debounce.rs

use super::hub::{ChangeEvent, ChangeKey};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

/// Remembers recently seen row versions, bounded by count and by age.
///
/// A publisher that replays a change (a commission entry re-run after its
/// settle failed republishes the stored earning) produces the same key, so the
/// listener refetches once.
pub struct EventDeduper {
  seen: LruCache<ChangeKey, Instant>,
  window: Duration,
}

impl EventDeduper {
  pub fn new(capacity: usize, window: Duration) -> Self {
    let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
    Self {
      seen: LruCache::new(capacity),
      window,
    }
  }

  /// `true` the first time `key` shows up within the window.
  pub fn first_sighting(&mut self, key: ChangeKey, now: Instant) -> bool {
    if let Some(seen_at) = self.seen.get(&key) {
      if now.saturating_duration_since(*seen_at) < self.window {
        return false;
      }
    }
    self.seen.put(key, now);
    true
  }

  pub fn len(&self) -> usize {
    self.seen.len()
  }

  pub fn is_empty(&self) -> bool {
    self.seen.is_empty()
  }
}

/// Trailing-edge debounce of refetch signals for one listener.
///
/// Every accepted event pushes the deadline out by `debounce`. After a resume the
/// listener gets a single refetch at the end of the grace window and events arriving
/// inside the window only fold into it.
pub struct RefetchDebouncer {
  debounce: Duration,
  grace: Duration,
  deduper: EventDeduper,
  deadline: Option<Instant>,
  suppress_until: Option<Instant>,
}

impl RefetchDebouncer {
  pub fn new(debounce: Duration, grace: Duration, deduper: EventDeduper) -> Self {
    Self {
      debounce,
      grace,
      deduper,
      deadline: None,
      suppress_until: None,
    }
  }

  fn in_grace(&self, now: Instant) -> bool {
    self.suppress_until.is_some_and(|until| now < until)
  }

  /// Returns whether the event counted. Duplicates and events swallowed by the grace
  /// window return `false`.
  pub fn on_event(&mut self, event: &ChangeEvent, now: Instant) -> bool {
    if !self.deduper.first_sighting(event.key(), now) {
      return false;
    }
    if self.in_grace(now) {
      return false;
    }
    self.deadline = Some(now + self.debounce);
    true
  }

  /// The listener came back to the foreground, possibly after missing events.
  pub fn on_resume(&mut self, now: Instant) {
    let until = now + self.grace;
    self.suppress_until = Some(until);
    self.deadline = Some(until);
  }

  /// The listener fell behind and dropped events; refetch once things settle.
  pub fn on_lagged(&mut self, now: Instant) {
    if self.deadline.is_none() {
      self.deadline = Some(now + self.debounce);
    }
  }

  pub fn deadline(&self) -> Option<Instant> {
    self.deadline
  }

  /// `true` exactly once per elapsed deadline.
  pub fn poll(&mut self, now: Instant) -> bool {
    match self.deadline {
      Some(deadline) if deadline <= now => {
        self.deadline = None;
        if !self.in_grace(now) {
          self.suppress_until = None;
        }
        true
      }
      _ => false,
    }
  }
}
