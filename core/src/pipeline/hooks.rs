// flowline/src/pipeline/hooks.rs

//! Registration of `before`, `on` and `after` handlers.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::pipeline::definition::{Pipeline, StepHooks};
use std::future::Future;
use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub(crate) fn as_str(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Wraps a user handler so its error converts into the pipeline's `Err`.
  fn boxed_handler<F, HandlerErr>(
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Handler<TData, Err>
  where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + 'static,
  {
    Box::new(move |ctx_data| {
      let fut = handler_fn(ctx_data);
      Box::pin(async move { fut.await.map_err(Into::into) })
    })
  }

  fn push_handler(&mut self, step_name: &str, phase: Phase, handler: Handler<TData, Err>) {
    self.ensure_step_exists(step_name);
    let hooks = self.hooks.entry(step_name.to_string()).or_insert_with(StepHooks::default);
    match phase {
      Phase::Before => hooks.before.push(handler),
      Phase::On => hooks.on.push(handler),
      Phase::After => hooks.after.push(handler),
    }
    event!(Level::TRACE, %step_name, phase = phase.as_str(), "Handler registered.");
  }

  /// Runs ahead of the step's `on` handlers.
  pub fn before<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + 'static,
  {
    let handler = Self::boxed_handler(handler_fn);
    self.push_handler(step_name, Phase::Before, handler);
  }

  /// The step's main work. Several `on` handlers run in registration order.
  pub fn on<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + 'static,
  {
    let handler = Self::boxed_handler(handler_fn);
    self.push_handler(step_name, Phase::On, handler);
  }

  pub fn after<F, HandlerErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, HandlerErr>> + Send + 'static,
    HandlerErr: Into<Err> + Send + 'static,
  {
    let handler = Self::boxed_handler(handler_fn);
    self.push_handler(step_name, Phase::After, handler);
  }

  /// Number of handlers attached to a step across all phases.
  pub fn handler_count(&self, step_name: &str) -> usize {
    self
      .hooks
      .get(step_name)
      .map_or(0, |h| h.before.len() + h.on.len() + h.after.len())
  }
}
