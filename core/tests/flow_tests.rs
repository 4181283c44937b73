// tests/flow_tests.rs
mod common;

use common::*;
use once_cell::sync::Lazy;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use storefront::flow::{ContextData, FlowError, Flows, Pipeline, PipelineControl, PipelineResult};

#[derive(Debug, Default)]
struct TraceContext {
  steps_executed: Vec<String>,
  stop_at: Option<&'static str>,
}

#[derive(Debug, Default)]
struct OtherContext;

#[derive(Debug, thiserror::Error)]
enum TestError {
  #[error("flow: {0}")]
  Flow(#[from] FlowError),
  #[error("handler: {0}")]
  Handler(String),
}

static HANDLER_EXEC_COUNTER: Lazy<AtomicUsize> = Lazy::new(|| AtomicUsize::new(0));

fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
}

async fn record(ctx: ContextData<TraceContext>, name: &'static str) -> Result<PipelineControl, TestError> {
  HANDLER_EXEC_COUNTER.fetch_add(1, Ordering::SeqCst);
  let mut guard = ctx.write();
  guard.steps_executed.push(name.to_string());
  if guard.stop_at == Some(name) {
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

fn three_step_pipeline() -> Pipeline<TraceContext, TestError> {
  let mut p = Pipeline::<TraceContext, TestError>::new(&[("first", false), ("second", false), ("third", false)]);
  p.on_step("first", |ctx| record(ctx, "first"))
    .and_then(|p| p.on_step("second", |ctx| record(ctx, "second")))
    .and_then(|p| p.on_step("third", |ctx| record(ctx, "third")))
    .expect("steps exist");
  p
}

#[tokio::test]
#[serial]
async fn steps_run_in_declaration_order() {
  setup_tracing();
  reset_counters();
  let ctx = ContextData::new(TraceContext::default());

  let result = three_step_pipeline().run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["first", "second", "third"]);
  assert_eq!(HANDLER_EXEC_COUNTER.load(Ordering::SeqCst), 3);
}

#[tokio::test]
#[serial]
async fn stop_halts_remaining_steps() {
  setup_tracing();
  reset_counters();
  let ctx = ContextData::new(TraceContext {
    stop_at: Some("second"),
    ..Default::default()
  });

  let result = three_step_pipeline().run(ctx.clone()).await.unwrap();

  assert_eq!(result, PipelineResult::Stopped);
  assert_eq!(ctx.read().steps_executed, vec!["first", "second"]);
  assert_eq!(HANDLER_EXEC_COUNTER.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[serial]
async fn handler_error_aborts_the_run() {
  setup_tracing();
  reset_counters();
  let mut p = Pipeline::<TraceContext, TestError>::new(&[("ok", false), ("boom", false), ("never", false)]);
  p.on_step("ok", |ctx| record(ctx, "ok")).unwrap();
  p.on_step("boom", |_ctx: ContextData<TraceContext>| async {
    Err::<PipelineControl, _>(TestError::Handler("exploded".to_string()))
  })
  .unwrap();
  p.on_step("never", |ctx| record(ctx, "never")).unwrap();

  let ctx = ContextData::new(TraceContext::default());
  let err = p.run(ctx.clone()).await.unwrap_err();

  assert!(matches!(err, TestError::Handler(ref m) if m == "exploded"));
  assert_eq!(ctx.read().steps_executed, vec!["ok"]);
  assert_eq!(HANDLER_EXEC_COUNTER.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn after_handlers_run_once_the_step_succeeded() {
  setup_tracing();
  reset_counters();
  let mut p = Pipeline::<TraceContext, TestError>::new(&[("main", false)]);
  p.on_step("main", |ctx| record(ctx, "main"))
    .and_then(|p| p.after_step("main", |ctx| record(ctx, "main:after")))
    .unwrap();

  let ctx = ContextData::new(TraceContext::default());
  p.run(ctx.clone()).await.unwrap();

  assert_eq!(ctx.read().steps_executed, vec!["main", "main:after"]);
}

#[tokio::test]
async fn optional_steps_without_handlers_are_skipped() {
  setup_tracing();
  let mut p = Pipeline::<TraceContext, TestError>::new(&[("hook", true), ("work", false)]);
  p.on_step("work", |ctx| record(ctx, "work")).unwrap();

  let ctx = ContextData::new(TraceContext::default());
  assert_eq!(p.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed, vec!["work"]);
}

#[tokio::test]
async fn required_step_without_handler_fails() {
  setup_tracing();
  let p = Pipeline::<TraceContext, TestError>::new(&[("unwired", false)]);

  let err = p.run(ContextData::new(TraceContext::default())).await.unwrap_err();
  assert!(matches!(err, TestError::Flow(FlowError::HandlerMissing { ref step_name }) if step_name == "unwired"));
}

#[test]
fn registering_an_unknown_step_is_rejected() {
  let mut p = Pipeline::<TraceContext, TestError>::new(&[("known", false)]);
  let err = p.on_step("unknown", |ctx| record(ctx, "unknown")).err().unwrap();
  assert!(matches!(err, FlowError::StepNotFound { ref step_name } if step_name == "unknown"));
}

#[tokio::test]
#[serial]
async fn registry_dispatches_by_context_type() {
  setup_tracing();
  reset_counters();
  let flows = Flows::<TestError>::new();
  flows.register(three_step_pipeline());
  assert!(flows.is_registered::<TraceContext>());
  assert!(!flows.is_registered::<OtherContext>());

  let ctx = ContextData::new(TraceContext::default());
  assert_eq!(flows.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().steps_executed.len(), 3);

  let err = flows.run(ContextData::new(OtherContext)).await.unwrap_err();
  assert!(matches!(err, TestError::Flow(FlowError::NotRegistered { .. })));
}
