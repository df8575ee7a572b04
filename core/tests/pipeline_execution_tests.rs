// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use flowline::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, StepDef};
use serial_test::serial;
use std::sync::atomic::Ordering;

#[tokio::test]
#[serial]
async fn runs_steps_in_declaration_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(vec![
    StepDef::required("step1"),
    StepDef::required("step2"),
    StepDef::required("step3"),
  ]);
  pipeline.on("step1", recording_handler("step1", " S1"));
  pipeline.on("step2", recording_handler("step2", " S2"));
  pipeline.on("step3", recording_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn stop_signal_halts_remaining_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(vec![
    StepDef::required("stepA"),
    StepDef::required("stopStep"),
    StepDef::required("stepC"),
  ]);
  pipeline.on("stepA", recording_handler("stepA", "A"));
  pipeline.on("stopStep", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("stopStep".to_string());
      Ok::<_, TestError>(PipelineControl::Stop)
    })
  });
  pipeline.on("stepC", recording_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(
    result,
    PipelineResult::Stopped {
      step: "stopStep".to_string()
    }
  );
  assert_eq!(ctx.read().steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn handler_error_aborts_by_default() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(vec![
    StepDef::required("good_step"),
    StepDef::required("bad_step"),
    StepDef::required("never_step"),
  ]);
  pipeline.on("good_step", recording_handler("good_step", "Good"));
  pipeline.on("bad_step", failing_handler("bad_step", "boom"));
  pipeline.on("never_step", recording_handler("never_step", "Never"));

  let ctx = ContextData::new(TestContext::default());
  let err = pipeline.run(ctx.clone()).await.unwrap_err();

  assert_eq!(err, TestError::Handler("boom".to_string()));
  assert_eq!(ctx.read().steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn tolerant_step_failure_lets_the_run_continue() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(vec![
    StepDef::required("commit"),
    StepDef::optional("notify").tolerate_failures(),
    StepDef::required("respond"),
  ]);
  pipeline.on("commit", recording_handler("commit", "C"));
  pipeline.on("notify", failing_handler("notify", "gateway down"));
  pipeline.after("notify", recording_handler("notify_after", "X"));
  pipeline.on("respond", recording_handler("respond", "R"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Completed);
  let guard = ctx.read();
  // The failing step's after-hook is abandoned with the rest of the step.
  assert_eq!(guard.steps_executed, vec!["commit", "notify", "respond"]);
  assert_eq!(guard.message, "CR");
}

#[tokio::test]
#[serial]
async fn skip_condition_passes_over_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(vec![
    StepDef::required("step1"),
    StepDef::required("step_to_skip").skip_if(|ctx: &ContextData<TestContext>| ctx.read().counter > 0),
    StepDef::required("step3"),
  ]);
  pipeline.on("step1", recording_handler("step1", "1"));
  pipeline.on("step_to_skip", recording_handler("step_to_skip", "skipped?"));
  pipeline.on("step3", recording_handler("step3", "3"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn optional_step_without_handlers_is_not_an_error() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(vec![StepDef::optional("maybe"), StepDef::required("always")]);
  pipeline.on("always", recording_handler("always", "A"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await.unwrap();

  assert!(result.is_completed());
  assert_eq!(ctx.read().steps_executed, vec!["always"]);
}

#[tokio::test]
#[serial]
async fn required_step_without_handlers_reports_handler_missing() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(vec![StepDef::required("missing")]);

  let err = pipeline.run(ContextData::new(TestContext::default())).await.unwrap_err();

  match err {
    TestError::Flow(text) => {
      assert!(text.contains("HandlerMissing"));
      assert!(text.contains("missing"));
    }
    other => panic!("expected a flow error, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn phases_run_before_on_after() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(vec![StepDef::required("work")]);
  pipeline.after("work", recording_handler("after", "c"));
  pipeline.on("work", recording_handler("on", "b"));
  pipeline.before("work", recording_handler("before", "a"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().message, "abc");
  assert_eq!(pipeline.handler_count("work"), 3);
}

#[tokio::test]
#[serial]
async fn steps_can_be_inserted_and_removed() {
  setup_tracing();
  reset_counter(&HANDLER_EXEC_COUNTER);
  let mut pipeline = Pipeline::<TestContext, TestError>::new(vec![StepDef::required("first"), StepDef::required("last")]);
  pipeline.insert_after_step("first", StepDef::required("middle"));
  pipeline.insert_before_step("first", StepDef::optional("zeroth"));
  assert_eq!(pipeline.step_names(), vec!["zeroth", "first", "middle", "last"]);

  pipeline.on("first", recording_handler("first", "F"));
  pipeline.on("middle", counting_handler(HANDLER_EXEC_COUNTER.clone()));
  pipeline.on("last", recording_handler("last", "L"));
  pipeline.remove_step("middle");
  pipeline.remove_step("does_not_exist");

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(pipeline.step_names(), vec!["zeroth", "first", "last"]);
  assert_eq!(HANDLER_EXEC_COUNTER.load(Ordering::SeqCst), 0);
  assert_eq!(ctx.read().message, "FL");
}

#[tokio::test]
#[serial]
async fn pipeline_can_use_flow_error_directly() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(vec![StepDef::required("task")]);
  pipeline.on("task", |_ctx: ContextData<TestContext>| {
    Box::pin(async move { Err::<PipelineControl, _>(FlowError::from(anyhow::anyhow!("intentional"))) })
  });

  let err = pipeline.run(ContextData::new(TestContext::default())).await.unwrap_err();
  assert!(matches!(err, FlowError::Handler { .. }));
  assert!(err.to_string().contains("intentional"));
}

#[test]
#[should_panic(expected = "already defined")]
fn duplicate_step_names_panic() {
  let _ = Pipeline::<TestContext, TestError>::new(vec![StepDef::required("same"), StepDef::optional("same")]);
}
