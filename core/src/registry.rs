// flowline/src/registry.rs

//! `Flowline<E>`: pipelines keyed by their context type.
//!
//! Each registered `Pipeline<TData, HandlerErr>` is stored behind a runner
//! that converts its errors into the registry's application error `E`, so a
//! service holds one registry and dispatches any workflow by handing it a
//! `ContextData<TData>`.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait Runner<TData, E>: Send + Sync
where
  TData: 'static + Send + Sync,
  E: Send + 'static,
{
  async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, E>;
}

struct PipelineRunner<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, HandlerErr>>,
}

#[async_trait]
impl<TData, HandlerErr, E> Runner<TData, E> for PipelineRunner<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  E: From<HandlerErr> + Send + 'static,
{
  async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, E> {
    self.pipeline.run(ctx_data).await.map_err(E::from)
  }
}

/// Type-keyed pipeline registry returning `E` from every run.
pub struct Flowline<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  // Values are `Arc<dyn Runner<TData, E>>` for the keyed `TData`.
  runners: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
  _err: PhantomData<fn() -> E>,
}

impl<E> Default for Flowline<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<E> Flowline<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
      _err: PhantomData,
    }
  }

  /// Registers `pipeline` for context type `TData`, replacing any previous one.
  pub fn register_pipeline<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    E: From<HandlerErr>,
  {
    let runner: Arc<dyn Runner<TData, E>> = Arc::new(PipelineRunner {
      pipeline: Arc::new(pipeline),
    });
    let replaced = self
      .runners
      .write()
      .insert(TypeId::of::<TData>(), Box::new(runner))
      .is_some();
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      replaced,
      "Pipeline registered."
    );
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<TData>())
  }

  pub fn len(&self) -> usize {
    self.runners.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.runners.read().is_empty()
  }

  /// Runs the pipeline registered for `TData`.
  #[instrument(
    name = "Flowline::run",
    skip_all,
    fields(context_type = %std::any::type_name::<TData>()),
    err(Display)
  )]
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, E>
  where
    TData: 'static + Send + Sync,
  {
    let runner = {
      let runners = self.runners.read();
      let entry = runners.get(&TypeId::of::<TData>()).ok_or(FlowError::PipelineNotRegistered {
        context_type: std::any::type_name::<TData>(),
      })?;
      entry
        .downcast_ref::<Arc<dyn Runner<TData, E>>>()
        .cloned()
        .ok_or(FlowError::TypeMismatch {
          expected_type: std::any::type_name::<TData>(),
        })?
    };
    runner.run(ctx_data).await
  }
}
