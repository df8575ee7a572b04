// storefront/src/realtime/sse.rs

//! Server-Sent Events stream of debounced `refetch` signals for one store.

use super::debounce::RefetchDebouncer;
use super::hub::{ChangeEvent, ChangeTable};
use actix_web::web::Bytes;
use futures_util::stream::{self, Stream};
use serde_json::json;
use std::collections::BTreeSet;
use std::convert::Infallible;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Client reconnect delay advertised in the first frame.
const RECONNECT_MS: u64 = 3000;

struct RefetchStream {
  receiver: Receiver<ChangeEvent>,
  debouncer: RefetchDebouncer,
  store_id: Uuid,
  pending: BTreeSet<ChangeTable>,
  opened: bool,
}

async fn wait_until(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending::<()>().await,
  }
}

impl RefetchStream {
  fn refetch_frame(&mut self) -> Bytes {
    let tables: Vec<ChangeTable> = std::mem::take(&mut self.pending).into_iter().collect();
    let payload = json!({ "storeId": self.store_id, "tables": tables });
    Bytes::from(format!("event: refetch\ndata: {}\n\n", payload))
  }

  async fn next_frame(&mut self) -> Option<Bytes> {
    if !self.opened {
      self.opened = true;
      return Some(Bytes::from(format!("retry: {}\n\n", RECONNECT_MS)));
    }
    loop {
      let deadline = self.debouncer.deadline();
      tokio::select! {
        received = self.receiver.recv() => match received {
          Ok(event) => {
            if event.store_id != self.store_id {
              continue;
            }
            self.pending.insert(event.table);
            if !self.debouncer.on_event(&event, Instant::now()) {
              debug!(row_id = %event.row_id, table = ?event.table, "Change event folded into pending refetch.");
            }
          }
          Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, store_id = %self.store_id, "Event listener lagged behind.");
            self.pending.insert(ChangeTable::Orders);
            self.pending.insert(ChangeTable::AffiliateEarnings);
            self.debouncer.on_lagged(Instant::now());
          }
          Err(RecvError::Closed) => return None,
        },
        _ = wait_until(deadline) => {
          if self.debouncer.poll(Instant::now()) {
            return Some(self.refetch_frame());
          }
        }
      }
    }
  }
}

/// Ends when the hub goes away.
pub fn refetch_stream(
  receiver: Receiver<ChangeEvent>,
  debouncer: RefetchDebouncer,
  store_id: Uuid,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
  let state = RefetchStream {
    receiver,
    debouncer,
    store_id,
    pending: BTreeSet::new(),
    opened: false,
  };
  stream::unfold(state, |mut state| async move {
    let frame = state.next_frame().await?;
    Some((Ok(frame), state))
  })
}
