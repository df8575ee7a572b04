// flowline/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` type and its structural editing methods.

use crate::core::handler::Handler;
use crate::core::step::StepDef;
use crate::error::FlowError;
use std::collections::HashMap;

/// Handlers attached to one step, grouped by phase.
pub(crate) struct StepHooks<TData: 'static + Send + Sync, Err> {
  pub(crate) before: Vec<Handler<TData, Err>>,
  pub(crate) on: Vec<Handler<TData, Err>>,
  pub(crate) after: Vec<Handler<TData, Err>>,
}

impl<TData: 'static + Send + Sync, Err> Default for StepHooks<TData, Err> {
  fn default() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }
}

impl<TData: 'static + Send + Sync, Err> StepHooks<TData, Err> {
  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }
}

/// An ordered set of named steps over context `TData`.
///
/// `Err` is what handlers fail with and what `run` returns. It must absorb
/// `FlowError` so that engine-level failures (a required step without
/// handlers) surface through the same type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) hooks: HashMap<String, StepHooks<TData, Err>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// # Panics
  /// If two steps share a name.
  pub fn new(steps: Vec<StepDef<TData>>) -> Self {
    let mut pipeline = Self {
      steps: Vec::with_capacity(steps.len()),
      hooks: HashMap::new(),
    };
    for step in steps {
      pipeline.ensure_step_not_exists(&step.name);
      pipeline.steps.push(step);
    }
    pipeline
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.position(step_name).is_some()
  }

  fn position(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Setup misuse (a typo in a step name) is a programming error, so it panics.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) -> usize {
    match self.position(step_name) {
      Some(idx) => idx,
      None => panic!("flowline setup error: step '{}' is not part of this pipeline", step_name),
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.has_step(step_name) {
      panic!("flowline setup error: step '{}' is already defined", step_name);
    }
  }

  pub fn insert_before_step(&mut self, existing_step_name: &str, step: StepDef<TData>) {
    let idx = self.ensure_step_exists(existing_step_name);
    self.ensure_step_not_exists(&step.name);
    self.steps.insert(idx, step);
  }

  pub fn insert_after_step(&mut self, existing_step_name: &str, step: StepDef<TData>) {
    let idx = self.ensure_step_exists(existing_step_name);
    self.ensure_step_not_exists(&step.name);
    self.steps.insert(idx + 1, step);
  }

  /// Removes the step and its handlers. Unknown names are a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.position(step_name) {
      self.steps.remove(idx);
      self.hooks.remove(step_name);
    }
  }
}
