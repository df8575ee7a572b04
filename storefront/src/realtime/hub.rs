// storefront/src/realtime/hub.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
  Orders,
  AffiliateEarnings,
}

/// One version of one row. Publishing the same version twice yields equal keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeKey {
  pub table: ChangeTable,
  pub row_id: Uuid,
  pub version: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
  pub store_id: Uuid,
  pub table: ChangeTable,
  pub row_id: Uuid,
  /// The row's `updated_at` after the change.
  pub version: DateTime<Utc>,
}

impl ChangeEvent {
  pub fn new(store_id: Uuid, table: ChangeTable, row_id: Uuid, version: DateTime<Utc>) -> Self {
    Self {
      store_id,
      table,
      row_id,
      version,
    }
  }

  pub fn key(&self) -> ChangeKey {
    ChangeKey {
      table: self.table,
      row_id: self.row_id,
      version: self.version,
    }
  }
}

/// Fan-out of row changes to every open event stream in this process.
#[derive(Clone)]
pub struct RealtimeHub {
  sender: broadcast::Sender<ChangeEvent>,
}

impl RealtimeHub {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity.max(1));
    Self { sender }
  }

  /// Returns how many listeners received the event. Zero listeners is not an error.
  pub fn publish(&self, event: ChangeEvent) -> usize {
    trace!(table = ?event.table, row_id = %event.row_id, "Publishing change event.");
    self.sender.send(event).unwrap_or(0)
  }

  pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
    self.sender.subscribe()
  }

  pub fn listener_count(&self) -> usize {
    self.sender.receiver_count()
  }
}
