// flowline/src/core/context_data.rs

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// The state one pipeline run threads through its steps.
///
/// `run` hands every handler its own handle to the same value. Guards are
/// blocking `parking_lot` guards and are not `Send`, so a handler copies what
/// it needs out of a scoped `read()`, awaits, then writes its results back:
///
/// ```ignore
/// let order_id = ctx.read().order_id;
/// let order = repository.find_order(order_id).await?;
/// ctx.write().order = order;
/// ```
#[derive(Debug)]
pub struct ContextData<T: Send + Sync + 'static> {
  inner: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> ContextData<T> {
  pub fn new(data: T) -> Self {
    Self {
      inner: Arc::new(RwLock::new(data)),
    }
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.inner.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.inner.write()
  }

  /// `None` while a writer holds the lock.
  pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
    self.inner.try_read()
  }

  /// `None` while any guard is out.
  pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
    self.inner.try_write()
  }

  /// Borrows one field, e.g. `ctx.map_read(|c| &c.order)`.
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.inner.read(), f)
  }

  pub fn map_write<F, U: ?Sized>(&self, f: F) -> MappedRwLockWriteGuard<'_, U>
  where
    F: FnOnce(&mut T) -> &mut U,
  {
    RwLockWriteGuard::map(self.inner.write(), f)
  }

  /// Handles alive right now, this one included.
  pub fn handle_count(&self) -> usize {
    Arc::strong_count(&self.inner)
  }
}

impl<T: Send + Sync + Clone + 'static> ContextData<T> {
  pub fn snapshot(&self) -> T {
    self.inner.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for ContextData<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T: Send + Sync + Default + 'static> Default for ContextData<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}
