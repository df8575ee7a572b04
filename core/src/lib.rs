// src/lib.rs

//! Flowline: an async, type-safe step pipeline engine.
//!
//! A pipeline is an ordered list of named steps over a shared context
//! (`ContextData<T>`). Each step carries `before`/`on`/`after` handlers and
//! may be:
//!  - optional (no handlers registered is not an error),
//!  - skipped by a condition evaluated against the context,
//!  - failure tolerant (a handler error is logged and the run moves on to the
//!    next step instead of aborting).
//!
//! Pipelines are registered in a `Flowline<E>` registry keyed by their
//! context type, so callers only need the context to dispatch a run.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{FailurePolicy, SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Flowline;

/*
    Typical wiring:
    1. Define a context struct `MyCtx` holding the inputs and the slots steps fill in.
    2. Build `Pipeline::<MyCtx, MyError>::new(vec![StepDef::required("a"), StepDef::optional("b")])`.
    3. Attach handlers with `.on("a", handler)`; `.before()`/`.after()` wrap a step.
    4. Register the pipeline: `flowline.register_pipeline(pipeline)`.
    5. Run: `flowline.run(ContextData::new(my_ctx)).await`, then read results from the context.
*/
