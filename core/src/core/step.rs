// flowline/src/core/step.rs

use super::ContextData;
use std::sync::Arc;

/// Evaluated before a step runs; returning `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(&ContextData<TData>) -> bool + Send + Sync + 'static>;

/// What a run does when one of a step's handlers returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
  /// Return the error from `run`.
  #[default]
  Abort,
  /// Log the error, abandon the rest of this step and continue with the next one.
  Tolerate,
}

#[derive(Clone)]
pub struct StepDef<TData: 'static + Send + Sync> {
  pub name: String,
  pub optional: bool,
  pub failure_policy: FailurePolicy,
  pub skip_if: Option<SkipCondition<TData>>,
}

impl<TData: 'static + Send + Sync> StepDef<TData> {
  /// A step that must have at least one handler when the pipeline runs.
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      failure_policy: FailurePolicy::Abort,
      skip_if: None,
    }
  }

  /// A step that is silently passed over when nothing is registered for it.
  pub fn optional(name: impl Into<String>) -> Self {
    Self {
      optional: true,
      ..Self::required(name)
    }
  }

  pub fn tolerate_failures(mut self) -> Self {
    self.failure_policy = FailurePolicy::Tolerate;
    self
  }

  pub fn skip_if(mut self, condition: impl Fn(&ContextData<TData>) -> bool + Send + Sync + 'static) -> Self {
    self.skip_if = Some(Arc::new(condition));
    self
  }
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for StepDef<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("failure_policy", &self.failure_policy)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
