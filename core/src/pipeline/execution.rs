// flowline/src/pipeline/execution.rs

//! `Pipeline::run`: walks the steps in order and drives their handlers.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::core::handler::Handler;
use crate::core::step::{FailurePolicy, StepDef};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::hooks::Phase;
use tracing::{event, info_span, instrument, Instrument, Level};

/// How a single step ended.
enum StepOutcome {
  Finished,
  Stopped,
  Tolerated,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes every step against `ctx_data`.
  ///
  /// A handler error aborts the run unless its step tolerates failures. A
  /// required step with no handlers fails with `FlowError::HandlerMissing`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_span = info_span!(
        "pipeline_step",
        step_name = step_def.name.as_str(),
        step_index = step_idx,
        optional = step_def.optional,
      );

      match self.run_step(step_def, &ctx_data).instrument(step_span).await? {
        StepOutcome::Finished | StepOutcome::Tolerated => {}
        StepOutcome::Stopped => {
          event!(Level::INFO, step = %step_def.name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped {
            step: step_def.name.clone(),
          });
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<StepOutcome, Err> {
    if let Some(skip_if) = &step_def.skip_if {
      if skip_if(ctx_data) {
        event!(Level::INFO, "Step skipped by its skip condition.");
        return Ok(StepOutcome::Finished);
      }
    }

    let hooks = match self.hooks.get(&step_def.name).filter(|h| !h.is_empty()) {
      Some(hooks) => hooks,
      None if step_def.optional => {
        event!(Level::DEBUG, "Optional step has no handlers, passing over it.");
        return Ok(StepOutcome::Finished);
      }
      None => {
        event!(Level::ERROR, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }
    };

    for (phase, handlers) in [
      (Phase::Before, &hooks.before),
      (Phase::On, &hooks.on),
      (Phase::After, &hooks.after),
    ] {
      match Self::run_phase(phase, handlers, ctx_data).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => return Ok(StepOutcome::Stopped),
        Err(e) if step_def.failure_policy == FailurePolicy::Tolerate => {
          event!(Level::WARN, error = %e, phase = phase.as_str(), "Handler failed; step tolerates failures, continuing.");
          return Ok(StepOutcome::Tolerated);
        }
        Err(e) => {
          event!(Level::ERROR, error = %e, phase = phase.as_str(), "Handler failed.");
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Step finished.");
    Ok(StepOutcome::Finished)
  }

  async fn run_phase(
    phase: Phase,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      let span = info_span!("handler", phase = phase.as_str(), handler_index = handler_idx);
      if handler_fn(ctx_data.clone()).instrument(span).await? == PipelineControl::Stop {
        return Ok(PipelineControl::Stop);
      }
    }
    Ok(PipelineControl::Continue)
  }
}
